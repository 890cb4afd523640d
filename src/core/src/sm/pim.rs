//! Port Information (spec.md §4.F), one instance per (Port, Tree).

use crate::model::PerTreePort;
use crate::priority::VecCmp;
use crate::sm::StepResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PimState {
    Disabled,
    Aged,
    Update,
    Current,
    Receive,
    SuperiorDesignated,
    RepeatedDesignated,
    InferiorDesignated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Classification {
    Superior,
    Repeated,
    Inferior,
}

fn classify(ptp: &PerTreePort, is_cist: bool) -> Classification {
    match ptp.msg_priority.compare(&ptp.port_priority, is_cist) {
        VecCmp::Superior => Classification::Superior,
        VecCmp::Same => Classification::Repeated,
        VecCmp::Inferior => Classification::Inferior,
    }
}

/// One PIM step. `is_cist` selects CIST vs MSTI comparison rules
/// (spec.md §4.A). `designated_here` is true when role selection (§4.G)
/// has just made this PTP Designated, which feeds the Update state with
/// this bridge's own vector instead of a received one.
pub fn step(ptp: &mut PerTreePort, port_enabled: bool, is_cist: bool, designated_here: bool) -> StepResult {
    let prev = ptp.pim_state;

    match ptp.pim_state {
        PimState::Disabled => {
            ptp.rcvd_msg = false;
            ptp.proposing = false;
            ptp.proposed = false;
            ptp.agree = false;
            ptp.agreed = false;
            if port_enabled {
                ptp.pim_state = PimState::Aged;
            }
        }
        PimState::Aged => {
            ptp.updt_info = true;
            ptp.pim_state = PimState::Update;
        }
        PimState::Update => {
            ptp.proposing = false;
            ptp.proposed = false;
            ptp.agree = ptp.agree && designated_here;
            ptp.new_info = true;
            ptp.updt_info = false;
            ptp.pim_state = PimState::Current;
        }
        PimState::Current => {
            if !port_enabled {
                ptp.pim_state = PimState::Disabled;
            } else if ptp.rcvd_msg {
                ptp.pim_state = PimState::Receive;
            } else if ptp.updt_info {
                ptp.pim_state = PimState::Update;
            } else if ptp.msg_times.is_aged() {
                ptp.pim_state = PimState::Aged;
            }
        }
        PimState::Receive => {
            ptp.rcvd_msg = false;
            ptp.pim_state = match classify(ptp, is_cist) {
                Classification::Superior => PimState::SuperiorDesignated,
                Classification::Repeated => PimState::RepeatedDesignated,
                Classification::Inferior => PimState::InferiorDesignated,
            };
        }
        PimState::SuperiorDesignated => {
            ptp.agreed = false;
            ptp.proposing = false;
            ptp.port_priority = ptp.msg_priority;
            ptp.port_times = ptp.msg_times;
            ptp.updt_info = true;
            ptp.pim_state = PimState::Current;
        }
        PimState::RepeatedDesignated => {
            ptp.port_times = ptp.msg_times;
            ptp.pim_state = PimState::Current;
        }
        PimState::InferiorDesignated => {
            ptp.pim_state = PimState::Current;
        }
    }

    StepResult::changed(prev != ptp.pim_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::{BridgeIdentifier, PortIdentifier};
    use crate::priority::PriorityVector;

    fn fresh() -> PerTreePort {
        PerTreePort::new(PortIdentifier::new(0x80, 1), true)
    }

    #[test]
    fn disabled_to_aged_on_enable() {
        let mut ptp = fresh();
        assert_eq!(ptp.pim_state, PimState::Disabled);
        step(&mut ptp, true, true, false);
        assert_eq!(ptp.pim_state, PimState::Aged);
    }

    #[test]
    fn superior_received_vector_replaces_port_priority() {
        let mut ptp = fresh();
        ptp.pim_state = PimState::Receive;
        ptp.msg_priority = PriorityVector {
            root: BridgeIdentifier::new(0x0000, [1; 6]),
            ..Default::default()
        };
        ptp.port_priority = PriorityVector {
            root: BridgeIdentifier::new(0x8000, [2; 6]),
            ..Default::default()
        };
        ptp.rcvd_msg = true;
        step(&mut ptp, true, true, false);
        assert_eq!(ptp.pim_state, PimState::SuperiorDesignated);
        step(&mut ptp, true, true, false);
        assert_eq!(ptp.port_priority, ptp.msg_priority);
        assert_eq!(ptp.pim_state, PimState::Current);
    }
}
