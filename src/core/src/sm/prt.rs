//! Port Role Transitions (spec.md §4.F): one instance per PTP, with
//! sub-machines for each assigned role.

use crate::model::PerTreePort;
use crate::sm::StepResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrtRole {
    Disabled,
    Root,
    Designated,
    Alternate,
    Backup,
    /// MSTI-only: applies when the CIST root port exits the MST region
    /// (spec.md §4.G).
    Master,
}

/// One PRT step. `is_edge`/`is_p2p` feed the rapid handshake; `fast_age`
/// requests the accelerated edge-port path (spec.md S5). Alternate/Backup/
/// Disabled never set `forwarding` (spec.md P4) regardless of handshake
/// state.
pub fn step(
    ptp: &mut PerTreePort,
    forward_delay: u8,
    is_edge: bool,
    is_p2p: bool,
) -> StepResult {
    let prev_role_state = (ptp.learning, ptp.forwarding, ptp.sync, ptp.synced, ptp.agreed);

    match ptp.role {
        PrtRole::Disabled => {
            ptp.learning = false;
            ptp.forwarding = false;
            ptp.synced = true;
            ptp.sync = false;
            ptp.re_root = false;
            ptp.fd_while.set(0);
        }
        PrtRole::Alternate | PrtRole::Backup => {
            ptp.learning = false;
            ptp.forwarding = false;
            ptp.synced = true;
            ptp.sync = false;
        }
        PrtRole::Root | PrtRole::Master => {
            if ptp.sync && !ptp.synced {
                ptp.learning = false;
                ptp.forwarding = false;
                ptp.fd_while.set(forward_delay as u16);
                ptp.synced = true;
                ptp.sync = false;
            }
            ptp.agree = ptp.agree || ptp.proposed || (is_p2p && ptp.agreed);
            advance_handshake_forwarding(ptp, forward_delay, is_edge);
        }
        PrtRole::Designated => {
            if ptp.sync && !ptp.synced {
                ptp.learning = false;
                ptp.forwarding = false;
                ptp.fd_while.set(forward_delay as u16);
                ptp.synced = true;
                ptp.sync = false;
            }
            if !ptp.forwarding && !ptp.learning && !is_edge {
                ptp.proposing = true;
            }
            advance_handshake_forwarding(ptp, forward_delay, is_edge);
        }
    }

    let next = (ptp.learning, ptp.forwarding, ptp.sync, ptp.synced, ptp.agreed);
    StepResult::changed(prev_role_state != next)
}

/// The shared learning->forwarding ramp used by Root/Master/Designated:
/// an edge port (admin or rapidly agreed) skips `fdWhile` entirely
/// (spec.md S5); otherwise it must elapse twice (once per stage).
fn advance_handshake_forwarding(ptp: &mut PerTreePort, forward_delay: u8, is_edge: bool) {
    let fast = is_edge || ptp.agreed;
    if !ptp.learning && !ptp.forwarding {
        if fast || ptp.fd_while.expired() {
            ptp.learning = true;
            if !fast {
                ptp.fd_while.set(forward_delay as u16);
            }
        }
    } else if ptp.learning && !ptp.forwarding {
        if fast || ptp.fd_while.expired() {
            ptp.forwarding = true;
            ptp.agreed = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::PortIdentifier;
    use crate::model::PerTreePort;

    fn fresh(role: PrtRole) -> PerTreePort {
        let mut ptp = PerTreePort::new(PortIdentifier::new(0x80, 1), true);
        ptp.role = role;
        ptp
    }

    #[test]
    fn alternate_never_forwards() {
        let mut ptp = fresh(PrtRole::Alternate);
        for _ in 0..50 {
            step(&mut ptp, 15, false, true);
            assert!(!ptp.forwarding);
        }
    }

    #[test]
    fn backup_never_forwards() {
        let mut ptp = fresh(PrtRole::Backup);
        for _ in 0..50 {
            step(&mut ptp, 15, false, true);
            assert!(!ptp.forwarding);
        }
    }

    #[test]
    fn disabled_never_forwards() {
        let mut ptp = fresh(PrtRole::Disabled);
        for _ in 0..50 {
            step(&mut ptp, 15, false, true);
            assert!(!ptp.forwarding);
        }
    }

    #[test]
    fn edge_designated_port_forwards_without_waiting_for_forward_delay() {
        let mut ptp = fresh(PrtRole::Designated);
        step(&mut ptp, 15, true, true); // sync handshake + immediate learning (fast path)
        assert!(ptp.learning);
        assert!(!ptp.forwarding);
        step(&mut ptp, 15, true, true); // -> forwarding
        assert!(ptp.forwarding);
    }

    #[test]
    fn non_edge_designated_port_waits_for_forward_delay() {
        let mut ptp = fresh(PrtRole::Designated);
        // First step consumes the pending sync handshake and arms
        // fd_while; no forwarding progress happens on this same pass.
        step(&mut ptp, 2, false, true);
        assert!(!ptp.learning);
        assert_eq!(ptp.fd_while.value(), 2);
        ptp.fd_while.tick();
        ptp.fd_while.tick();
        step(&mut ptp, 2, false, true);
        assert!(ptp.learning);
        assert!(!ptp.forwarding);
    }
}
