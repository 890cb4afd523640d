//! End-to-end scenario tests against the public `Orchestrator` API, distinct
//! from the state-machine-level unit tests colocated with each `sm/*.rs`
//! module and the smaller `#[cfg(test)]` block in `orchestrator.rs` itself.

use mstp_proto::bpdu::{self, CistFlags};
use mstp_proto::config::PartialPortConfig;
use mstp_proto::ident::{BridgeIdentifier, PortIdentifier, CIST_MSTID};
use mstp_proto::orchestrator::{Callbacks, Orchestrator, PortSpec};
use mstp_proto::priority::{PriorityVector, Times};
use mstp_proto::sm::prt::PrtRole;
use mstp_proto::sm::pst::KernelPortState;

#[derive(Default)]
struct RecordingCallbacks {
    tx: Vec<(u32, u32, Vec<u8>)>,
    state_changes: Vec<(u32, u32, u16, KernelPortState)>,
    flushes: Vec<(u32, u32, u16)>,
}

impl Callbacks for RecordingCallbacks {
    fn tx_bpdu(&mut self, br_id: u32, port_ifindex: u32, bytes: &[u8]) {
        self.tx.push((br_id, port_ifindex, bytes.to_vec()));
    }
    fn set_port_state(&mut self, br_id: u32, port_ifindex: u32, mstid: u16, state: KernelPortState) {
        self.state_changes.push((br_id, port_ifindex, mstid, state));
    }
    fn flush_fdb(&mut self, br_id: u32, port_ifindex: u32, mstid: u16) {
        self.flushes.push((br_id, port_ifindex, mstid));
    }
}

/// S6: a bpdu-guard port shuts down on the first BPDU and a further tick (or
/// another BPDU) must not bring it back — it stays down until an operator
/// reconfigures it.
#[test]
fn bpdu_guard_port_stays_disabled_until_reconfigured() {
    let mut orch = Orchestrator::new();
    let mut cb = RecordingCallbacks::default();
    orch.bridge_added(1, [0xaa; 6]);
    orch.port_added(1, PortSpec { ifindex: 10, port_number: 1, mac: [1; 6], speed: 1000, duplex_full: true }, &mut cb).unwrap();
    orch.set_port_config(1, 10, PartialPortConfig { bpdu_guard: Some(true), ..Default::default() }, &mut cb).unwrap();

    orch.bpdu_received(1, 10, &bpdu::encode_tcn(), &mut cb).unwrap();
    assert!(cb.state_changes.iter().any(|(_, _, _, s)| *s == KernelPortState::Disabled));

    for _ in 0..5 {
        orch.tick(&mut cb);
    }
    orch.bpdu_received(1, 10, &bpdu::encode_tcn(), &mut cb).unwrap();

    let status = orch.get_status(1).unwrap();
    let cist = status.ports[0].1.iter().find(|t| t.mstid == CIST_MSTID).unwrap();
    assert_eq!(cist.role, PrtRole::Disabled);
    assert!(!cist.forwarding);
}

/// S5: an edge port skips the timed forward-delay wait entirely, even on a
/// link that isn't point-to-point (so the rapid p2p handshake can't be what
/// carries it to forwarding); a plain non-edge port on the same kind of link
/// is still stuck short of forwarding after the same number of ticks.
#[test]
fn edge_port_on_shared_link_reaches_forwarding_without_forward_delay() {
    let mut edge = Orchestrator::new();
    let mut cb_edge = RecordingCallbacks::default();
    edge.bridge_added(1, [0xaa; 6]);
    edge.port_added(1, PortSpec { ifindex: 10, port_number: 1, mac: [1; 6], speed: 100, duplex_full: false }, &mut cb_edge).unwrap();
    edge.set_port_config(1, 10, PartialPortConfig { admin_edge: Some(true), auto_edge: Some(false), ..Default::default() }, &mut cb_edge)
        .unwrap();
    edge.link_state(1, 10, true, 100, false, &mut cb_edge).unwrap();
    for _ in 0..3 {
        edge.tick(&mut cb_edge);
    }
    let edge_status = edge.get_status(1).unwrap();
    let edge_cist = edge_status.ports[0].1.iter().find(|t| t.mstid == CIST_MSTID).unwrap();
    assert!(edge_cist.forwarding, "edge port should already be forwarding after a few ticks");

    let mut plain = Orchestrator::new();
    let mut cb_plain = RecordingCallbacks::default();
    plain.bridge_added(2, [0xbb; 6]);
    plain.port_added(2, PortSpec { ifindex: 20, port_number: 1, mac: [2; 6], speed: 100, duplex_full: false }, &mut cb_plain).unwrap();
    plain.link_state(2, 20, true, 100, false, &mut cb_plain).unwrap();
    for _ in 0..3 {
        plain.tick(&mut cb_plain);
    }
    let plain_status = plain.get_status(2).unwrap();
    let plain_cist = plain_status.ports[0].1.iter().find(|t| t.mstid == CIST_MSTID).unwrap();
    assert!(!plain_cist.forwarding, "a non-edge port on a shared link still has to wait out forward delay");
}

/// S1 (single-bridge half): a port that receives a strictly superior CIST
/// priority vector becomes the bridge's Root Port, and the bridge's own
/// CIST root status tracks the remote bridge's identifier.
#[test]
fn superior_root_information_promotes_port_to_root() {
    let mut orch = Orchestrator::new();
    let mut cb = RecordingCallbacks::default();
    orch.bridge_added(1, [0xaa; 6]);
    orch.port_added(1, PortSpec { ifindex: 10, port_number: 1, mac: [1; 6], speed: 1000, duplex_full: true }, &mut cb).unwrap();
    orch.link_state(1, 10, true, 1000, true, &mut cb).unwrap();

    let remote_id = BridgeIdentifier::new(0, [0x01; 6]);
    let vector = PriorityVector {
        root: remote_id,
        external_path_cost: 0,
        regional_root: remote_id,
        internal_path_cost: 0,
        designated_bridge: remote_id,
        designated_port: PortIdentifier::new(0x80, 1),
    };
    let times = Times { message_age: 0, max_age: 20, hello_time: 2, forward_delay: 15, remaining_hops: 20 };
    let frame = bpdu::encode_rst(CistFlags::default(), &vector, &times);
    orch.bpdu_received(1, 10, &frame, &mut cb).unwrap();

    for _ in 0..5 {
        orch.tick(&mut cb);
    }

    let status = orch.get_status(1).unwrap();
    let cist_tree = status.trees.iter().find(|t| t.mstid == CIST_MSTID).unwrap();
    assert_eq!(cist_tree.root_port, Some(10));
    assert_eq!(cist_tree.root_priority.root, remote_id);

    let cist_port = status.ports[0].1.iter().find(|t| t.mstid == CIST_MSTID).unwrap();
    assert_eq!(cist_port.role, PrtRole::Root);
}

/// S4: a Designated port transitioning to forwarding generates its own
/// topology change (spec.md §4.F) — flushes the FDB and advertises the TC
/// flag on its own outgoing BPDUs for a while, with no external TCN needed.
#[test]
fn newly_forwarding_designated_port_flushes_and_advertises_tc() {
    let mut orch = Orchestrator::new();
    let mut cb = RecordingCallbacks::default();
    orch.bridge_added(1, [0xaa; 6]);
    orch.port_added(1, PortSpec { ifindex: 10, port_number: 1, mac: [1; 6], speed: 1000, duplex_full: true }, &mut cb).unwrap();
    orch.link_state(1, 10, true, 1000, true, &mut cb).unwrap();
    for _ in 0..5 {
        orch.tick(&mut cb);
    }

    assert!(cb.flushes.iter().any(|(b, p, m)| *b == 1 && *p == 10 && *m == CIST_MSTID));

    let last_frame = cb.tx.iter().rev().find(|(b, p, _)| *b == 1 && *p == 10).map(|(_, _, f)| f.clone()).unwrap();
    let decoded = bpdu::decode(&last_frame).unwrap();
    let flags = match decoded {
        mstp_proto::bpdu::ReceivedBpdu::Rst { flags, .. } | mstp_proto::bpdu::ReceivedBpdu::Mst { flags, .. } => flags,
        other => panic!("unexpected frame kind: {other:?}"),
    };
    assert!(flags.topology_change);
}
