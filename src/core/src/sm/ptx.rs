//! Port Transmit (spec.md §4.E): honours TxHoldCount and `helloWhen`,
//! transmits a CIST BPDU aggregating all MSTI records whenever any
//! `newInfoCist`/`newInfoMsti` is set.

use crate::model::Port;
use crate::sm::StepResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PtxState {
    Idle,
    TransmitInit,
    TransmitPeriodic,
    TransmitConfig,
    TransmitTcn,
    TransmitRstp,
}

/// One pass of PTX. `has_new_info` aggregates `newInfo` across the CIST
/// PTP and every MSTI PTP of this port (spec.md §4.E). `hello_elapsed`
/// signals the per-tree `helloWhen` reaching zero. Returns whether a
/// transmission should be requested this pass (the caller builds and
/// sends the actual frame via PIM/role state it already has).
pub fn step(
    port: &mut Port,
    tx_hold_count: u8,
    has_new_info: bool,
    hello_elapsed: bool,
) -> (StepResult, bool) {
    let prev = port.ptx_state;
    let mut should_transmit = false;

    match port.ptx_state {
        PtxState::Idle => {
            if (has_new_info || hello_elapsed) && !port.dont_txmt {
                port.ptx_state = PtxState::TransmitInit;
            }
        }
        PtxState::TransmitInit => {
            port.tx_count = 0;
            port.ptx_state = PtxState::TransmitPeriodic;
        }
        PtxState::TransmitPeriodic => {
            if port.tx_count < tx_hold_count {
                should_transmit = true;
                port.tx_count += 1;
                port.ptx_state = PtxState::Idle;
            }
            // else: token bucket exhausted this second; retry next tick.
        }
        PtxState::TransmitConfig | PtxState::TransmitTcn | PtxState::TransmitRstp => {
            // Legacy sub-states retained for protocol-fidelity but folded
            // into the RSTP/MSTP path above; unreachable with send_rstp.
            port.ptx_state = PtxState::Idle;
        }
    }

    (StepResult::changed(prev != port.ptx_state), should_transmit)
}

/// Resets the token bucket; called once per tick before PTX runs (spec.md
/// §4.E "TxHoldCount (token bucket reset every second)").
pub fn reset_tx_count(port: &mut Port) {
    port.tx_count = 0;
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
    fn transmits_when_new_info_present() {
        let mut port = fresh_port();
        let (_, tx) = step(&mut port, 6, true, false);
        assert!(!tx); // Idle -> TransmitInit this pass, no frame yet
        let (_, tx) = step(&mut port, 6, true, false);
        assert!(!tx); // TransmitInit -> TransmitPeriodic
        let (_, tx) = step(&mut port, 6, true, false);
        assert!(tx); // TransmitPeriodic -> Idle, frame requested
    }

    #[test]
    fn respects_tx_hold_count() {
        let mut port = fresh_port();
        port.ptx_state = PtxState::TransmitPeriodic;
        port.tx_count = 6;
        let (_, tx) = step(&mut port, 6, true, false);
        assert!(!tx);
    }

    #[test]
    fn does_not_transmit_when_dont_txmt_set() {
        let mut port = fresh_port();
        port.dont_txmt = true;
        let (result, tx) = step(&mut port, 6, true, false);
        assert!(!tx);
        assert_eq!(result, StepResult::Quiescent);
    }
}
