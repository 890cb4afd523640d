//! Maps bridge/port names from the control socket and config files to the
//! ifindexes the Orchestrator keys its state by. The kernel only gives us
//! ifindexes over netlink; operators only know interface names.

use std::collections::HashMap;

use mstp_proto::{ErrorKind, MstpError, MstpResult};

#[derive(Debug, Default)]
pub(crate) struct BridgeNames {
    bridges: HashMap<String, u32>,
    bridge_names: HashMap<u32, String>,
    ports: HashMap<u32, HashMap<String, u32>>,
    port_names: HashMap<u32, HashMap<u32, String>>,
}

impl BridgeNames {
    pub(crate) fn bridge_added(&mut self, name: &str, ifindex: u32) {
        self.bridges.insert(name.to_string(), ifindex);
        self.bridge_names.insert(ifindex, name.to_string());
        self.ports.entry(ifindex).or_default();
        self.port_names.entry(ifindex).or_default();
    }

    pub(crate) fn bridge_removed(&mut self, ifindex: u32) {
        if let Some(name) = self.bridge_names.remove(&ifindex) {
            self.bridges.remove(&name);
        }
        self.ports.remove(&ifindex);
        self.port_names.remove(&ifindex);
    }

    pub(crate) fn port_added(&mut self, br_ifindex: u32, name: &str, port_ifindex: u32) {
        self.ports.entry(br_ifindex).or_default().insert(name.to_string(), port_ifindex);
        self.port_names.entry(br_ifindex).or_default().insert(port_ifindex, name.to_string());
    }

    pub(crate) fn port_removed(&mut self, br_ifindex: u32, port_ifindex: u32) {
        if let Some(name) = self.port_names.get_mut(&br_ifindex).and_then(|m| m.remove(&port_ifindex)) {
            if let Some(by_name) = self.ports.get_mut(&br_ifindex) {
                by_name.remove(&name);
            }
        }
    }

    pub(crate) fn bridge_name(&self, ifindex: u32) -> Option<&str> {
        self.bridge_names.get(&ifindex).map(String::as_str)
    }

    pub(crate) fn port_name(&self, br_ifindex: u32, port_ifindex: u32) -> Option<&str> {
        self.port_names.get(&br_ifindex).and_then(|m| m.get(&port_ifindex)).map(String::as_str)
    }

    pub(crate) fn resolve(&self, name: &str) -> MstpResult<u32> {
        self.bridges
            .get(name)
            .copied()
            .ok_or_else(|| MstpError::new(ErrorKind::UnknownEntity, format!("unknown bridge {name}")))
    }

    pub(crate) fn resolve_port(&self, br_ifindex: u32, name: &str) -> MstpResult<u32> {
        self.ports
            .get(&br_ifindex)
            .and_then(|m| m.get(name))
            .copied()
            .ok_or_else(|| MstpError::new(ErrorKind::UnknownEntity, format!("unknown port {name}")))
    }

    pub(crate) fn port_names(&self, br_ifindex: u32) -> HashMap<u32, String> {
        self.port_names.get(&br_ifindex).cloned().unwrap_or_default()
    }

    /// Which bridge (if any) currently tracks `port_ifindex` as a member
    /// port, for link events that arrive without a controller hint (an
    /// interface removed from a bridge, or deleted outright).
    pub(crate) fn bridge_ifindex_owning_port(&self, port_ifindex: u32) -> Option<u32> {
        self.port_names
            .iter()
            .find(|(_, ports)| ports.contains_key(&port_ifindex))
            .map(|(br_ifindex, _)| *br_ifindex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_bridge_and_port_by_name() {
        let mut names = BridgeNames::default();
        names.bridge_added("br0", 5);
        names.port_added(5, "eth0", 10);
        assert_eq!(names.resolve("br0").unwrap(), 5);
        assert_eq!(names.resolve_port(5, "eth0").unwrap(), 10);
        assert_eq!(names.bridge_name(5), Some("br0"));
        assert_eq!(names.port_name(5, 10), Some("eth0"));
    }

    #[test]
    fn unknown_bridge_name_is_rejected() {
        let names = BridgeNames::default();
        assert!(names.resolve("br0").is_err());
    }

    #[test]
    fn removing_a_bridge_forgets_its_ports() {
        let mut names = BridgeNames::default();
        names.bridge_added("br0", 5);
        names.port_added(5, "eth0", 10);
        names.bridge_removed(5);
        assert!(names.resolve("br0").is_err());
        assert!(names.port_names(5).is_empty());
    }
}
