//! Port Protocol Migration (spec.md §4.E).

use crate::model::Port;
use crate::sm::StepResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PpmState {
    CheckingRstp,
    SelectingStp,
    Sensing,
}

/// Advances PPM by one step. `legacy_stp_bridge` is true when the bridge's
/// configured protocol version is plain STP (spec.md §3 Bridge
/// `protocol version`).
pub fn step(port: &mut Port, migrate_time: u8, legacy_stp_bridge: bool) -> StepResult {
    let prev = port.ppm_state;

    if !port.port_enabled {
        port.ppm_state = PpmState::CheckingRstp;
    }

    match port.ppm_state {
        PpmState::CheckingRstp => {
            port.send_rstp = !legacy_stp_bridge;
            port.mdelay_while.set(migrate_time as u16);
            port.ppm_rcvd_bpdu = false;
            port.rcvd_rstp = false;
            port.rcvd_stp = false;
            port.ppm_state = PpmState::Sensing;
        }
        PpmState::Sensing => {
            if port.ppm_rcvd_bpdu {
                port.ppm_rcvd_bpdu = false;
                if port.rcvd_stp && !legacy_stp_bridge && port.send_rstp {
                    port.send_rstp = false;
                    port.mdelay_while.set(migrate_time as u16);
                    port.ppm_state = PpmState::SelectingStp;
                } else if port.rcvd_rstp {
                    port.send_rstp = !legacy_stp_bridge;
                }
            }
        }
        PpmState::SelectingStp => {
            if port.mdelay_while.expired() {
                port.ppm_state = PpmState::Sensing;
            }
        }
    }

    StepResult::changed(prev != port.ppm_state)
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
    fn begins_sending_rstp_on_non_legacy_bridge() {
        let mut port = fresh_port();
        port.port_enabled = true;
        step(&mut port, 3, false);
        assert!(port.send_rstp);
        assert_eq!(port.ppm_state, PpmState::Sensing);
    }

    #[test]
    fn downgrades_on_receiving_legacy_stp() {
        let mut port = fresh_port();
        port.port_enabled = true;
        step(&mut port, 3, false); // -> Sensing, send_rstp=true
        port.ppm_rcvd_bpdu = true;
        port.rcvd_stp = true;
        step(&mut port, 3, false);
        assert!(!port.send_rstp);
        assert_eq!(port.ppm_state, PpmState::SelectingStp);
    }

    #[test]
    fn reconsiders_rstp_after_migrate_time() {
        let mut port = fresh_port();
        port.port_enabled = true;
        step(&mut port, 3, false);
        port.ppm_rcvd_bpdu = true;
        port.rcvd_stp = true;
        step(&mut port, 3, false);
        assert_eq!(port.ppm_state, PpmState::SelectingStp);
        port.mdelay_while.set(0);
        step(&mut port, 3, false);
        assert_eq!(port.ppm_state, PpmState::Sensing);
    }
}
