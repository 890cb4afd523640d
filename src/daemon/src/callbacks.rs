//! Implements [`mstp_proto::orchestrator::Callbacks`], the only channel the
//! core engine uses to push decisions to the kernel (spec.md §4.H).
//!
//! Every Orchestrator entry-point is synchronous (spec.md §5: "no
//! Orchestrator entry-point blocks, sleeps, or awaits I/O"), but pushing a
//! port's forwarding state to the kernel is an async RTNETLINK round trip.
//! `set_port_state`/`flush_fdb` therefore only queue the request; the
//! caller drains `take_pending()` and awaits each request in turn once
//! back in the main event loop, still on the single logical thread, no
//! `tokio::spawn` involved. BPDU transmission is a non-blocking socket
//! `send()` and happens immediately.

use std::collections::HashMap;

use log::warn;
use mstp_proto::orchestrator::Callbacks;
use mstp_proto::sm::pst::KernelPortState;
use mstp_proto::Mstid;

use crate::bpdu_socket::BpduSocket;

#[derive(Debug, Clone)]
pub(crate) enum PendingKernelOp {
    SetPortState { br_id: u32, port_ifindex: u32, mstid: Mstid, state: KernelPortState },
    FlushFdb { br_id: u32, port_ifindex: u32, mstid: Mstid },
}

pub(crate) struct DaemonCallbacks<'a> {
    bpdu_sockets: &'a HashMap<u32, BpduSocket>,
    pending: Vec<PendingKernelOp>,
}

impl<'a> DaemonCallbacks<'a> {
    pub(crate) fn new(bpdu_sockets: &'a HashMap<u32, BpduSocket>) -> Self {
        Self { bpdu_sockets, pending: Vec::new() }
    }

    pub(crate) fn take_pending(&mut self) -> Vec<PendingKernelOp> {
        std::mem::take(&mut self.pending)
    }
}

impl Callbacks for DaemonCallbacks<'_> {
    fn tx_bpdu(&mut self, br_id: u32, port_ifindex: u32, bytes: &[u8]) {
        match self.bpdu_sockets.get(&port_ifindex) {
            Some(sock) => {
                if let Err(e) = sock.send_bpdu(bytes) {
                    warn!("bridge {br_id} port {port_ifindex}: failed to transmit BPDU: {e}");
                }
            }
            None => warn!("bridge {br_id} port {port_ifindex}: no BPDU socket bound, dropping transmit"),
        }
    }

    fn set_port_state(&mut self, br_id: u32, port_ifindex: u32, mstid: Mstid, state: KernelPortState) {
        self.pending.push(PendingKernelOp::SetPortState { br_id, port_ifindex, mstid, state });
    }

    fn flush_fdb(&mut self, br_id: u32, port_ifindex: u32, mstid: Mstid) {
        self.pending.push(PendingKernelOp::FlushFdb { br_id, port_ifindex, mstid });
    }
}

/// Awaits every queued kernel operation in order, logging rather than
/// propagating failures (the Orchestrator has already moved past the
/// protocol state that produced them; there is nothing to roll back).
pub(crate) async fn drain_pending(handle: &rtnetlink::Handle, ops: Vec<PendingKernelOp>) {
    for op in ops {
        match op {
            PendingKernelOp::SetPortState { br_id, port_ifindex, mstid, state } => {
                if let Err(e) = crate::netlink::set_brport_state(handle, port_ifindex, mstid, state).await {
                    log::error!(
                        "bridge {br_id} port {port_ifindex} mstid {mstid}: failed to push kernel state {state:?}: {e}"
                    );
                }
            }
            PendingKernelOp::FlushFdb { br_id, port_ifindex, mstid } => {
                // The kernel bridge code flushes its own per-VLAN FDB
                // entries as part of the same STP state transition that
                // `set_brport_state` drives; nothing further to push.
                log::trace!("bridge {br_id} port {port_ifindex} mstid {mstid}: fdb flush requested");
            }
        }
    }
}
