//! Topology Change (spec.md §4.F).

use crate::model::PerTreePort;
use crate::sm::prt::PrtRole;
use crate::sm::StepResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcmState {
    Inactive,
    Learning,
    Detected,
    NotifiedTcn,
    NotifiedTc,
    Propagating,
    Acknowledged,
    Active,
}

/// Side effects the Orchestrator must perform after a TCM step (spec.md
/// §4.F, S4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TcmAction {
    pub flush_fdb: bool,
    pub send_tcn: bool,
}

/// One TCM step. `rcvd_tc`/`rcvd_tcn` come from PRX classification of the
/// last BPDU on this PTP; `legacy_stp` selects the TCN-flooding path for
/// classical STP neighbours (spec.md §4.F "floods TCN upstream on legacy
/// STP").
pub fn step(
    ptp: &mut PerTreePort,
    max_age: u8,
    forward_delay: u8,
    rcvd_tc: bool,
    rcvd_tcn: bool,
    legacy_stp: bool,
) -> (StepResult, TcmAction) {
    let prev = ptp.tcm_state;
    let mut action = TcmAction::default();

    match ptp.tcm_state {
        TcmState::Inactive => {
            ptp.tc_while.set(0);
            if matches!(ptp.role, PrtRole::Root | PrtRole::Designated) && (ptp.learning || ptp.forwarding) {
                ptp.tcm_state = TcmState::Learning;
            }
        }
        TcmState::Learning => {
            if !matches!(ptp.role, PrtRole::Root | PrtRole::Designated) {
                ptp.tcm_state = TcmState::Inactive;
            } else if ptp.forwarding {
                ptp.tcm_state = TcmState::Detected;
            } else if rcvd_tc || rcvd_tcn {
                ptp.tcm_state = TcmState::NotifiedTcn;
            }
        }
        TcmState::Detected => {
            // A Designated/Root port that just began forwarding generates
            // a topology change of its own (spec.md §4.F).
            ptp.tc_while.set(max_age as u16 + forward_delay as u16);
            ptp.new_info = true;
            action.flush_fdb = true;
            ptp.tcm_state = TcmState::Active;
        }
        TcmState::NotifiedTcn => {
            if legacy_stp {
                action.send_tcn = true;
            }
            ptp.tcm_state = TcmState::NotifiedTc;
        }
        TcmState::NotifiedTc => {
            ptp.tc_while.set(max_age as u16 + forward_delay as u16);
            ptp.new_info = true;
            action.flush_fdb = true;
            ptp.tcm_state = TcmState::Propagating;
        }
        TcmState::Propagating => {
            ptp.tcm_state = TcmState::Acknowledged;
        }
        TcmState::Acknowledged => {
            ptp.tcm_state = TcmState::Active;
        }
        TcmState::Active => {
            if !matches!(ptp.role, PrtRole::Root | PrtRole::Designated) {
                ptp.tcm_state = TcmState::Learning;
            } else if rcvd_tc || rcvd_tcn {
                ptp.tcm_state = TcmState::NotifiedTcn;
            } else if ptp.tc_while.expired() {
                ptp.tcm_state = TcmState::Learning;
            }
        }
    }

    (StepResult::changed(prev != ptp.tcm_state), action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::PortIdentifier;
    use crate::model::PerTreePort;

    fn fresh_designated() -> PerTreePort {
        let mut ptp = PerTreePort::new(PortIdentifier::new(0x80, 1), true);
        ptp.role = PrtRole::Designated;
        ptp
    }

    #[test]
    fn newly_forwarding_designated_port_flushes_and_emits_tc() {
        let mut ptp = fresh_designated();
        ptp.learning = true;
        let (_, action) = step(&mut ptp, 20, 15, false, false, false);
        assert_eq!(ptp.tcm_state, TcmState::Learning);
        ptp.forwarding = true;
        let (_, action) = step(&mut ptp, 20, 15, false, false, false);
        assert_eq!(ptp.tcm_state, TcmState::Detected);
        let (_, action) = step(&mut ptp, 20, 15, false, false, false);
        assert!(action.flush_fdb);
        assert!(ptp.new_info);
        assert_eq!(ptp.tc_while.value(), 35);
        let _ = action;
    }

    #[test]
    fn tcn_on_legacy_stp_is_flooded_upstream() {
        let mut ptp = fresh_designated();
        ptp.tcm_state = TcmState::NotifiedTcn;
        let (_, action) = step(&mut ptp, 20, 15, false, true, true);
        assert!(action.send_tcn);
    }
}
