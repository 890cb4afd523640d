//! Port State Transition (spec.md §4.F): derives the kernel-visible
//! forwarding state from role + the PRT handshake booleans.

use crate::model::PerTreePort;
use crate::sm::prt::PrtRole;

/// Kernel forwarding state, the argument to `set_port_state` (spec.md
/// §4.H).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelPortState {
    Disabled,
    Blocking,
    Listening,
    Learning,
    Forwarding,
}

fn derive(ptp: &PerTreePort) -> KernelPortState {
    if ptp.forwarding {
        KernelPortState::Forwarding
    } else if ptp.learning {
        KernelPortState::Learning
    } else {
        match ptp.role {
            PrtRole::Disabled => KernelPortState::Disabled,
            // Role selected but handshake not yet past the Listening
            // phase: block.
            _ => KernelPortState::Blocking,
        }
    }
}

/// Computes the current kernel state and whether it differs from the one
/// last pushed down (`previous`); if so the Orchestrator must call
/// `set_port_state` (spec.md §4.H) and this function's caller should store
/// the returned state as the new `previous`.
pub fn step(ptp: &PerTreePort, previous: KernelPortState) -> (KernelPortState, bool) {
    let current = derive(ptp);
    (current, current != previous)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::PortIdentifier;
    use crate::model::PerTreePort;

    #[test]
    fn disabled_role_is_disabled_state() {
        let mut ptp = PerTreePort::new(PortIdentifier::new(0x80, 1), true);
        ptp.role = PrtRole::Disabled;
        let (state, changed) = step(&ptp, KernelPortState::Forwarding);
        assert_eq!(state, KernelPortState::Disabled);
        assert!(changed);
    }

    #[test]
    fn forwarding_flag_wins_over_role() {
        let mut ptp = PerTreePort::new(PortIdentifier::new(0x80, 1), true);
        ptp.role = PrtRole::Designated;
        ptp.learning = true;
        ptp.forwarding = true;
        let (state, _) = step(&ptp, KernelPortState::Blocking);
        assert_eq!(state, KernelPortState::Forwarding);
    }

    #[test]
    fn no_change_reports_false() {
        let ptp = PerTreePort::new(PortIdentifier::new(0x80, 1), true);
        let (state, changed) = step(&ptp, KernelPortState::Disabled);
        assert_eq!(state, KernelPortState::Disabled);
        assert!(!changed);
    }
}
