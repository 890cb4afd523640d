//! Bridge Detection (spec.md §4.E): decides `operEdge`.

use crate::model::Port;
use crate::sm::StepResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BdmState {
    Edge,
    NotEdge,
}

pub fn step(port: &mut Port) -> StepResult {
    let prev = port.bdm_state;

    match port.bdm_state {
        BdmState::NotEdge => {
            if port.admin_edge && port.edge_delay_while.expired() {
                port.oper_edge = true;
                port.bdm_state = BdmState::Edge;
            }
        }
        BdmState::Edge => {
            // Any BPDU reception reverts an edge port to non-edge within
            // one tick, including an admin-edge port (spec.md S5).
            if port.rcvd_bpdu {
                port.oper_edge = false;
                port.bdm_state = BdmState::NotEdge;
            } else if !port.admin_edge && !port.auto_edge {
                port.oper_edge = false;
                port.bdm_state = BdmState::NotEdge;
            }
        }
    }

    StepResult::changed(prev != port.bdm_state)
}

/// Called when a port first comes up: `adminEdge` ports start in `Edge`
/// immediately (spec.md S5), others start `NotEdge` and arm
/// `edgeDelayWhile` for `autoEdge` detection.
pub fn port_enabled(port: &mut Port, migrate_time: u8) {
    if port.admin_edge {
        port.oper_edge = true;
        port.bdm_state = BdmState::Edge;
    } else {
        port.oper_edge = false;
        port.bdm_state = BdmState::NotEdge;
        if port.auto_edge {
            port.edge_delay_while.set(migrate_time as u16);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::PortIdentifier;

    fn fresh_port() -> Port {
        let mut bridge = crate::model::Bridge::new(1, [0; 6]);
        let idx = bridge.add_port(1, PortIdentifier::new(0x80, 1), [1; 6]);
        bridge.ports.remove(idx).unwrap()
    }

    #[test]
    fn admin_edge_port_starts_as_edge() {
        let mut port = fresh_port();
        port.admin_edge = true;
        port_enabled(&mut port, 3);
        assert_eq!(port.bdm_state, BdmState::Edge);
        assert!(port.oper_edge);
    }

    #[test]
    fn receiving_bpdu_on_auto_edge_reverts_to_not_edge() {
        let mut port = fresh_port();
        port.admin_edge = false;
        port.auto_edge = true;
        port.bdm_state = BdmState::Edge;
        port.oper_edge = true;
        port.rcvd_bpdu = true;
        step(&mut port);
        assert_eq!(port.bdm_state, BdmState::NotEdge);
        assert!(!port.oper_edge);
    }

    #[test]
    fn receiving_bpdu_on_admin_edge_reverts_to_not_edge() {
        let mut port = fresh_port();
        port.admin_edge = true;
        port.auto_edge = false;
        port_enabled(&mut port, 3);
        assert!(port.oper_edge);
        port.rcvd_bpdu = true;
        step(&mut port);
        assert_eq!(port.bdm_state, BdmState::NotEdge);
        assert!(!port.oper_edge);
    }
}
