//! Orchestrator (spec.md §4.H): the only way external code mutates core
//! state. Applies one event, runs every state machine of the affected
//! bridge to a fixed point, and reports forwarding-state changes and
//! outgoing BPDUs through the [`Callbacks`] the adaptation layer provides.

use std::collections::HashMap;

use log::{debug, info, warn};

use crate::bpdu::{self, CistFlags, MstiRecord, PortRoleFlag, ReceivedBpdu};
use crate::config::{PartialBridgeConfig, PartialPortConfig, PartialTreeConfig};
use crate::error::{ErrorKind, MstpError, MstpResult};
use crate::ident::{BridgeIdentifier, Mstid, PortIdentifier, VidToMstidTable, CIST_MSTID};
use crate::model::{AdminP2P, Bridge, Port, PortIdx, TreeIdx};
use crate::priority::{PriorityVector, Times};
use crate::sm::pst::KernelPortState;
use crate::sm::{bdm, pim, ppm, prs, prt, pst, pti, ptx, tcm};

/// Callbacks the Orchestrator invokes to push decisions out to the kernel
/// (spec.md §4.H "Callbacks the Orchestrator uses").
pub trait Callbacks {
    fn tx_bpdu(&mut self, br_id: u32, port_ifindex: u32, bytes: &[u8]);
    fn set_port_state(&mut self, br_id: u32, port_ifindex: u32, mstid: Mstid, state: KernelPortState);
    fn flush_fdb(&mut self, br_id: u32, port_ifindex: u32, mstid: Mstid);
}

/// Minimal description of a newly-joined kernel bridge-port (spec.md §4.H
/// `port_added`).
#[derive(Debug, Clone)]
pub struct PortSpec {
    pub ifindex: u32,
    pub port_number: u16,
    pub mac: [u8; 6],
    pub speed: u64,
    pub duplex_full: bool,
}

/// Read-only snapshot of a tree's root-side state, for `get_status`.
#[derive(Debug, Clone)]
pub struct TreeStatus {
    pub mstid: Mstid,
    pub bridge_id: BridgeIdentifier,
    pub root_priority: PriorityVector,
    pub root_port: Option<u32>,
}

/// Read-only per-port-per-tree snapshot, for `get_status`.
#[derive(Debug, Clone)]
pub struct PortTreeStatus {
    pub mstid: Mstid,
    pub role: prt::PrtRole,
    pub learning: bool,
    pub forwarding: bool,
}

/// Read-only snapshot of one managed bridge, for the CLI (spec.md §4.H
/// `get_status`).
#[derive(Debug, Clone)]
pub struct BridgeStatus {
    pub ifindex: u32,
    pub bridge_id: BridgeIdentifier,
    pub digest: [u8; 16],
    pub trees: Vec<TreeStatus>,
    pub ports: Vec<(u32, Vec<PortTreeStatus>)>,
}

fn unknown_bridge(br_id: u32) -> MstpError {
    MstpError::new(ErrorKind::UnknownEntity, format!("unknown bridge ifindex {br_id}"))
}

fn unknown_port(br_id: u32, port_ifindex: u32) -> MstpError {
    MstpError::new(
        ErrorKind::UnknownEntity,
        format!("unknown port ifindex {port_ifindex} on bridge {br_id}"),
    )
}

/// Registry of managed bridges; the single owner of all protocol state
/// (spec.md §9 "Global state").
#[derive(Debug, Default)]
pub struct Orchestrator {
    bridges: HashMap<u32, Bridge>,
    /// Last kernel state pushed per (bridge, port, tree), to suppress
    /// redundant `set_port_state` calls.
    pushed_state: HashMap<(u32, PortIdx, TreeIdx), KernelPortState>,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    fn bridge_mut(&mut self, br_id: u32) -> MstpResult<&mut Bridge> {
        self.bridges.get_mut(&br_id).ok_or_else(|| unknown_bridge(br_id))
    }

    pub fn bridge_added(&mut self, br_id: u32, mac: [u8; 6]) {
        info!("bridge {br_id} added, mac={mac:02x?}");
        self.bridges.insert(br_id, Bridge::new(br_id, mac));
    }

    pub fn bridge_removed(&mut self, br_id: u32) {
        info!("bridge {br_id} removed");
        self.bridges.remove(&br_id);
        self.pushed_state.retain(|(b, _, _), _| *b != br_id);
    }

    pub fn port_added<C: Callbacks>(
        &mut self,
        br_id: u32,
        spec: PortSpec,
        callbacks: &mut C,
    ) -> MstpResult<()> {
        let bridge = self.bridge_mut(br_id)?;
        if bridge.ports.len() as u32 >= 0x0fff {
            return Err(MstpError::new(
                ErrorKind::ResourceExhaustion,
                format!("bridge {br_id} already has the maximum {} ports a 12-bit PortIdentifier can address", 0x0fffu32),
            ));
        }
        let port_id = PortIdentifier::new(0x80, spec.port_number);
        bridge.add_port(spec.ifindex, port_id, spec.mac);
        if let Some(port) = bridge.port_by_ifindex.get(&spec.ifindex).copied().and_then(|i| bridge.ports.get_mut(i)) {
            port.speed = spec.speed;
            port.duplex_full = spec.duplex_full;
        }
        self.run_to_fixed_point(br_id, callbacks)
    }

    pub fn port_removed<C: Callbacks>(&mut self, br_id: u32, port_ifindex: u32, callbacks: &mut C) -> MstpResult<()> {
        let bridge = self.bridge_mut(br_id)?;
        if !bridge.remove_port(port_ifindex) {
            return Err(unknown_port(br_id, port_ifindex));
        }
        self.run_to_fixed_point(br_id, callbacks)
    }

    pub fn link_state<C: Callbacks>(
        &mut self,
        br_id: u32,
        port_ifindex: u32,
        up: bool,
        speed: u64,
        duplex_full: bool,
        callbacks: &mut C,
    ) -> MstpResult<()> {
        let bridge = self.bridge_mut(br_id)?;
        let idx = *bridge.port_by_ifindex.get(&port_ifindex).ok_or_else(|| unknown_port(br_id, port_ifindex))?;
        let migrate_time = bridge.migrate_time;
        let port = bridge.ports.get_mut(idx).expect("index from port_by_ifindex is always live");
        port.speed = speed;
        port.duplex_full = duplex_full;
        let was_enabled = port.port_enabled;
        port.port_enabled = up;
        if up && !was_enabled {
            bdm::port_enabled(port, migrate_time);
            for (_, ptp) in port.ptps.iter_mut() {
                ptp.reselect = true;
            }
        }
        self.run_to_fixed_point(br_id, callbacks)
    }

    /// Decodes and ingests a received frame, driving PRX (spec.md §4.H
    /// `bpdu_received`). A malformed frame is dropped without mutating
    /// state (spec.md §7.1).
    pub fn bpdu_received<C: Callbacks>(
        &mut self,
        br_id: u32,
        port_ifindex: u32,
        frame_bytes: &[u8],
        callbacks: &mut C,
    ) -> MstpResult<()> {
        let decoded = match bpdu::decode(frame_bytes) {
            Ok(d) => d,
            Err(e) => {
                debug!("dropping malformed BPDU on bridge {br_id} port {port_ifindex}: {e}");
                return Ok(());
            }
        };

        let bridge = self.bridge_mut(br_id)?;
        let idx = *bridge.port_by_ifindex.get(&port_ifindex).ok_or_else(|| unknown_port(br_id, port_ifindex))?;

        if let Some(port) = bridge.ports.get_mut(idx) {
            if port.bpdu_guard {
                warn!("bpdu-guard: shutting down bridge {br_id} port {port_ifindex}");
                port.shut_down_by_bpdu_guard = true;
                port.port_enabled = false;
                callbacks.set_port_state(br_id, port_ifindex, CIST_MSTID, KernelPortState::Disabled);
                return Ok(());
            }
            if port.bpdu_filter {
                return Ok(());
            }

            port.rcvd_bpdu = true;
            port.ppm_rcvd_bpdu = true;
            port.rcvd_rstp = decoded.is_rstp_or_better();
            port.rcvd_stp = matches!(decoded, ReceivedBpdu::Config { .. } | ReceivedBpdu::Tcn);

            ingest_bpdu(bridge, idx, &decoded);
        }

        self.run_to_fixed_point(br_id, callbacks)
    }

    pub fn set_bridge_config<C: Callbacks>(
        &mut self,
        br_id: u32,
        partial: PartialBridgeConfig,
        callbacks: &mut C,
    ) -> MstpResult<()> {
        let bridge = self.bridge_mut(br_id)?;
        if let Some(v) = partial.max_age {
            bridge.max_age = v;
        }
        if let Some(v) = partial.forward_delay {
            bridge.forward_delay = v;
        }
        if let Some(v) = partial.hello_time {
            bridge.hello_time = v;
        }
        if let Some(v) = partial.tx_hold_count {
            bridge.tx_hold_count = v;
        }
        if let Some(v) = partial.max_hops {
            bridge.max_hops = v;
        }
        if let Some(v) = partial.ageing_time {
            bridge.ageing_time = v;
        }
        if let Some(v) = partial.bridge_priority {
            bridge.bridge_id.priority = v;
        }
        if let Some((name, len)) = partial.mst_name {
            bridge.mst_name = name;
            bridge.mst_name_len = len;
        }
        if let Some(v) = partial.mst_revision {
            bridge.mst_revision = v;
        }
        if let Some(v) = partial.protocol_version {
            bridge.protocol_version = v;
        }
        for (_, tree) in bridge.trees.iter_mut() {
            tree.bridge_id = bridge.bridge_id.for_tree(tree.mstid);
        }
        self.run_to_fixed_point(br_id, callbacks)
    }

    pub fn set_port_config<C: Callbacks>(
        &mut self,
        br_id: u32,
        port_ifindex: u32,
        partial: PartialPortConfig,
        callbacks: &mut C,
    ) -> MstpResult<()> {
        let bridge = self.bridge_mut(br_id)?;
        let idx = *bridge.port_by_ifindex.get(&port_ifindex).ok_or_else(|| unknown_port(br_id, port_ifindex))?;
        let port = bridge.ports.get_mut(idx).expect("index from port_by_ifindex is always live");
        if let Some(v) = partial.admin_edge {
            port.admin_edge = v;
        }
        if let Some(v) = partial.auto_edge {
            port.auto_edge = v;
        }
        if let Some(v) = partial.admin_p2p {
            port.admin_p2p = v;
            port.oper_p2p = matches!(v, AdminP2P::ForceTrue) || (matches!(v, AdminP2P::Auto) && port.duplex_full);
        }
        if let Some(v) = partial.restricted_role {
            port.restricted_role = v;
        }
        if let Some(v) = partial.restricted_tcn {
            port.restricted_tcn = v;
        }
        if let Some(v) = partial.bpdu_guard {
            port.bpdu_guard = v;
        }
        if let Some(v) = partial.bpdu_filter {
            port.bpdu_filter = v;
        }
        if let Some(v) = partial.network_port {
            port.network_port = v;
        }
        if let Some(v) = partial.dont_txmt {
            port.dont_txmt = v;
        }
        if let Some(v) = partial.port_priority {
            port.port_id.priority = v;
        }
        if let Some(v) = partial.external_path_cost {
            port.admin_external_path_cost = Some(v);
        }
        if let Some(v) = partial.internal_path_cost {
            port.admin_internal_path_cost = Some(v);
        }
        for (_, ptp) in port.ptps.iter_mut() {
            ptp.reselect = true;
        }
        self.run_to_fixed_point(br_id, callbacks)
    }

    /// Per-MSTI port priority (spec.md §6 "MSTI port" opcode): unlike path
    /// cost, a port's priority can differ across trees because each
    /// [`crate::model::PerTreePort`] carries its own [`PortIdentifier`].
    pub fn set_msti_port_config<C: Callbacks>(
        &mut self,
        br_id: u32,
        port_ifindex: u32,
        mstid: Mstid,
        port_priority: Option<u8>,
        callbacks: &mut C,
    ) -> MstpResult<()> {
        let bridge = self.bridge_mut(br_id)?;
        let idx = *bridge.port_by_ifindex.get(&port_ifindex).ok_or_else(|| unknown_port(br_id, port_ifindex))?;
        let tree_idx = *bridge
            .tree_by_mstid
            .get(&mstid)
            .ok_or_else(|| MstpError::new(ErrorKind::UnknownEntity, format!("unknown MSTID {mstid}")))?;
        let port = bridge.ports.get_mut(idx).expect("index from port_by_ifindex is always live");
        if let Some(priority) = port_priority {
            if let Some(ptp) = port.ptps.get_mut(&tree_idx) {
                ptp.port_id.priority = priority;
                ptp.reselect = true;
            }
        }
        self.run_to_fixed_point(br_id, callbacks)
    }

    pub fn set_tree_config<C: Callbacks>(
        &mut self,
        br_id: u32,
        mstid: Mstid,
        partial: PartialTreeConfig,
        callbacks: &mut C,
    ) -> MstpResult<()> {
        let bridge = self.bridge_mut(br_id)?;
        let idx = *bridge
            .tree_by_mstid
            .get(&mstid)
            .ok_or_else(|| MstpError::new(ErrorKind::UnknownEntity, format!("unknown MSTID {mstid}")))?;
        if let Some(v) = partial.bridge_priority {
            bridge.bridge_id.priority = v;
            if let Some(tree) = bridge.trees.get_mut(idx) {
                tree.bridge_id = bridge.bridge_id.for_tree(mstid);
            }
        }
        self.run_to_fixed_point(br_id, callbacks)
    }

    /// Whole-table replacement of the VID→MSTID map (spec.md §4.H
    /// `set_vid_to_mstid`, §5 "replaced atomically").
    pub fn set_vid_to_mstid<C: Callbacks>(
        &mut self,
        br_id: u32,
        table: VidToMstidTable,
        callbacks: &mut C,
    ) -> MstpResult<()> {
        let bridge = self.bridge_mut(br_id)?;
        bridge.vid_to_mstid = table;
        bridge.recompute_digest();
        for (_, port) in bridge.ports.iter_mut() {
            for (_, ptp) in port.ptps.iter_mut() {
                ptp.reselect = true;
            }
        }
        self.run_to_fixed_point(br_id, callbacks)
    }

    pub fn create_msti<C: Callbacks>(&mut self, br_id: u32, mstid: Mstid, callbacks: &mut C) -> MstpResult<()> {
        let bridge = self.bridge_mut(br_id)?;
        if mstid == CIST_MSTID || mstid > crate::ident::MAX_MSTID {
            return Err(MstpError::new(ErrorKind::OutOfRange, format!("MSTID {mstid} out of range")));
        }
        if bridge.tree_by_mstid.contains_key(&mstid) {
            return Ok(());
        }
        bridge.create_msti(mstid);
        self.run_to_fixed_point(br_id, callbacks)
    }

    pub fn delete_msti<C: Callbacks>(&mut self, br_id: u32, mstid: Mstid, callbacks: &mut C) -> MstpResult<()> {
        let bridge = self.bridge_mut(br_id)?;
        bridge.delete_msti(mstid);
        self.run_to_fixed_point(br_id, callbacks)
    }

    /// One-second tick across every managed bridge (spec.md §4.H `tick`,
    /// §5 "a late tick catches up by invoking `tick()` multiple times").
    pub fn tick<C: Callbacks>(&mut self, callbacks: &mut C) {
        let ids: Vec<u32> = self.bridges.keys().copied().collect();
        for br_id in ids {
            if let Some(bridge) = self.bridges.get_mut(&br_id) {
                for (_, port) in bridge.ports.iter_mut() {
                    pti::tick_port(port);
                    ptx::reset_tx_count(port);
                    for (_, ptp) in port.ptps.iter_mut() {
                        pti::tick_ptp(ptp);
                    }
                }
            }
            let _ = self.run_to_fixed_point(br_id, callbacks);
        }
    }

    /// VIDs grouped by MSTID, for the CLI's `showmstid`-style dump
    /// (spec.md §6 `GetVidToMstid`).
    pub fn get_vid_to_mstid(&self, br_id: u32) -> MstpResult<Vec<(Mstid, Vec<u16>)>> {
        let bridge = self.bridges.get(&br_id).ok_or_else(|| unknown_bridge(br_id))?;
        Ok(bridge
            .tree_order
            .iter()
            .filter_map(|idx| bridge.trees.get(*idx))
            .map(|t| (t.mstid, bridge.vid_to_mstid.vids_for(t.mstid)))
            .collect())
    }

    pub fn get_status(&self, br_id: u32) -> MstpResult<BridgeStatus> {
        let bridge = self.bridges.get(&br_id).ok_or_else(|| unknown_bridge(br_id))?;
        let trees = bridge
            .tree_order
            .iter()
            .filter_map(|idx| bridge.trees.get(*idx))
            .map(|t| TreeStatus {
                mstid: t.mstid,
                bridge_id: t.bridge_id,
                root_priority: t.root_priority,
                root_port: t.root_port.and_then(|pidx| bridge.ports.get(pidx)).map(|p| p.ifindex),
            })
            .collect();
        let ports = bridge
            .ports
            .iter()
            .map(|(_, port)| {
                let per_tree = bridge
                    .tree_order
                    .iter()
                    .filter_map(|tidx| port.ptps.get(tidx).map(|ptp| (tidx, ptp)))
                    .filter_map(|(tidx, ptp)| {
                        bridge.trees.get(*tidx).map(|t| PortTreeStatus {
                            mstid: t.mstid,
                            role: ptp.role,
                            learning: ptp.learning,
                            forwarding: ptp.forwarding,
                        })
                    })
                    .collect();
                (port.ifindex, per_tree)
            })
            .collect();
        Ok(BridgeStatus { ifindex: bridge.ifindex, bridge_id: bridge.bridge_id, digest: bridge.digest, trees, ports })
    }

    /// Runs every state machine of `br_id` to a fixed point (spec.md §4.D),
    /// pushing out forwarding-state changes and queued transmissions
    /// through `callbacks`.
    fn run_to_fixed_point<C: Callbacks>(&mut self, br_id: u32, callbacks: &mut C) -> MstpResult<()> {
        loop {
            let mut any_transitioned = false;
            let Self { bridges, pushed_state } = self;
            let bridge = bridges.get_mut(&br_id).ok_or_else(|| unknown_bridge(br_id))?;
            let legacy_stp = matches!(bridge.protocol_version, crate::model::ProtocolVersion::Stp);
            let migrate_time = bridge.migrate_time;
            let forward_delay = bridge.forward_delay;
            let max_age = bridge.max_age;
            let tx_hold_count = bridge.tx_hold_count;
            let cist_idx = bridge.cist_idx();

            // E: per-port machines (PPM, BDM).
            for (_, port) in bridge.ports.iter_mut() {
                any_transitioned |= ppm::step(port, migrate_time, legacy_stp).is_transitioned();
                any_transitioned |= bdm::step(port).is_transitioned();
            }

            // F: per-tree-per-port PIM, one pass per tree.
            for &tree_idx in &bridge.tree_order {
                let is_cist = tree_idx == cist_idx;
                for (_, port) in bridge.ports.iter_mut() {
                    let port_enabled = port.port_enabled;
                    if let Some(ptp) = port.ptps.get_mut(&tree_idx) {
                        let designated_here = ptp.role == prt::PrtRole::Designated;
                        any_transitioned |= pim::step(ptp, port_enabled, is_cist, designated_here).is_transitioned();
                    }
                }
            }

            // G: role selection, one pass per tree.
            for tree_idx in bridge.tree_order.clone() {
                any_transitioned |= prs::update_roles(bridge, tree_idx);
            }

            // F: PRT/PST/TCM per tree-port.
            let tree_order = bridge.tree_order.clone();
            for tree_idx in tree_order {
                let mstid = bridge.trees.get(tree_idx).map(|t| t.mstid).unwrap_or(CIST_MSTID);
                for (port_idx, port) in bridge.ports.iter_mut() {
                    let is_edge = port.oper_edge;
                    let is_p2p = port.oper_p2p;
                    let ifindex = port.ifindex;
                    let Some(ptp) = port.ptps.get_mut(&tree_idx) else { continue };

                    any_transitioned |= prt::step(ptp, forward_delay, is_edge, is_p2p).is_transitioned();

                    let prev_kernel = pushed_state
                        .get(&(br_id, port_idx, tree_idx))
                        .copied()
                        .unwrap_or(KernelPortState::Disabled);
                    let (kernel_state, changed) = pst::step(ptp, prev_kernel);
                    if changed {
                        debug!(
                            "bridge {br_id} port {ifindex} mstid {mstid}: role={:?} state {prev_kernel:?} -> {kernel_state:?}",
                            ptp.role
                        );
                        pushed_state.insert((br_id, port_idx, tree_idx), kernel_state);
                        callbacks.set_port_state(br_id, ifindex, mstid, kernel_state);
                        any_transitioned = true;
                    }

                    let (tcm_result, action) =
                        tcm::step(ptp, max_age, forward_delay, ptp.rcvd_tc, ptp.rcvd_tcn, legacy_stp);
                    ptp.rcvd_tc = false;
                    ptp.rcvd_tcn = false;
                    any_transitioned |= tcm_result.is_transitioned();
                    if action.flush_fdb {
                        callbacks.flush_fdb(br_id, ifindex, mstid);
                    }
                    if action.send_tcn {
                        callbacks.tx_bpdu(br_id, ifindex, &bpdu::encode_tcn());
                    }
                }
            }

            // E: PTX, transmit aggregated CIST+MSTI BPDUs per port.
            let hello_time = bridge.hello_time as u16;
            let is_rstp = matches!(bridge.protocol_version, crate::model::ProtocolVersion::Rstp);
            let msti_list: Vec<(TreeIdx, Mstid)> = bridge
                .tree_order
                .iter()
                .filter_map(|idx| bridge.trees.get(*idx).map(|t| (*idx, t.mstid)))
                .filter(|(_, mstid)| *mstid != CIST_MSTID)
                .collect();
            let mst_name = bridge.mst_name;
            let mst_name_len = bridge.mst_name_len;
            let mst_revision = bridge.mst_revision;
            let digest = bridge.digest;

            for (_port_idx, port) in bridge.ports.iter_mut() {
                port.rcvd_bpdu = false;
                let has_new_info = port.ptps.values().any(|p| p.new_info);
                let hello_elapsed = port
                    .ptps
                    .get(&cist_idx)
                    .map(|p| p.hello_when.expired())
                    .unwrap_or(false);
                let (ptx_result, should_transmit) = ptx::step(port, tx_hold_count, has_new_info, hello_elapsed);
                any_transitioned |= ptx_result.is_transitioned();
                if should_transmit {
                    if let Some(cist_ptp) = port.ptps.get_mut(&cist_idx) {
                        cist_ptp.hello_when.set(hello_time);
                    }
                    let frame = build_outgoing_frame(
                        port,
                        cist_idx,
                        &msti_list,
                        &mst_name,
                        mst_name_len,
                        mst_revision,
                        &digest,
                        legacy_stp,
                        is_rstp,
                    );
                    for (_, ptp) in port.ptps.iter_mut() {
                        ptp.new_info = false;
                    }
                    callbacks.tx_bpdu(br_id, port.ifindex, &frame);
                }
            }

            if !any_transitioned {
                break;
            }
        }
        Ok(())
    }
}

/// Applies a decoded BPDU to the addressed port's PTPs (spec.md §4.F PIM
/// `rcvdMsg` ingestion). Boundary ports whose digest does not match the
/// local configuration fall back to CIST-only treatment (spec.md S3).
fn ingest_bpdu(bridge: &mut Bridge, port_idx: PortIdx, decoded: &ReceivedBpdu) {
    let cist_idx = bridge.cist_idx();
    match decoded {
        ReceivedBpdu::Tcn => {
            if let Some(port) = bridge.ports.get_mut(port_idx) {
                if let Some(ptp) = port.ptps.get_mut(&cist_idx) {
                    ptp.rcvd_msg = true;
                    ptp.rcvd_tcn = true;
                }
            }
        }
        ReceivedBpdu::Config { flags, vector, times } | ReceivedBpdu::Rst { flags, vector, times } => {
            apply_cist_message(bridge, port_idx, cist_idx, *vector, *times, flags.topology_change);
        }
        ReceivedBpdu::Mst { flags, vector, times, digest, mstis, .. } => {
            apply_cist_message(bridge, port_idx, cist_idx, *vector, *times, flags.topology_change);
            if *digest != bridge.digest {
                debug!("MST digest mismatch on ifindex {port_idx:?}; treating as boundary/CIST-only (S3)");
                return;
            }
            for rec in mstis {
                let Some(&tree_idx) = bridge.tree_by_mstid.get(&rec.mstid) else { continue };
                let msg_priority = PriorityVector {
                    root: vector.root,
                    external_path_cost: vector.external_path_cost,
                    regional_root: rec.regional_root_priority,
                    internal_path_cost: rec.internal_path_cost,
                    designated_bridge: BridgeIdentifier { priority: (rec.bridge_id_priority as u16) << 8, sys_id_ext: rec.mstid, mac: rec.regional_root_priority.mac },
                    designated_port: PortIdentifier::new(rec.port_id_priority, 0),
                };
                let msg_times = Times {
                    message_age: times.message_age,
                    max_age: times.max_age,
                    hello_time: times.hello_time,
                    forward_delay: times.forward_delay,
                    remaining_hops: rec.remaining_hops,
                };
                if let Some(port) = bridge.ports.get_mut(port_idx) {
                    if let Some(ptp) = port.ptps.get_mut(&tree_idx) {
                        ptp.msg_priority = msg_priority;
                        ptp.msg_times = msg_times;
                        ptp.rcvd_msg = true;
                        ptp.rcvd_tc |= rec.flags.topology_change;
                    }
                }
            }
        }
    }
}

fn apply_cist_message(
    bridge: &mut Bridge,
    port_idx: PortIdx,
    cist_idx: TreeIdx,
    vector: PriorityVector,
    times: Times,
    topology_change: bool,
) {
    if let Some(port) = bridge.ports.get_mut(port_idx) {
        if let Some(ptp) = port.ptps.get_mut(&cist_idx) {
            ptp.msg_priority = vector;
            ptp.msg_times = times.aged_for_cist();
            ptp.rcvd_msg = true;
            ptp.rcvd_tc |= topology_change;
        }
    }
}

/// Builds the single outgoing frame for a port: an RST/Config frame if the
/// bridge runs plain RSTP/STP, or an MST frame aggregating every MSTI's
/// record if it runs MSTP (spec.md §4.E PTX "aggregating all MSTI
/// records"). `msti_list` is every non-CIST tree's (index, MSTID), taken
/// as a snapshot before iterating ports mutably.
#[allow(clippy::too_many_arguments)]
fn build_outgoing_frame(
    port: &Port,
    cist_idx: TreeIdx,
    msti_list: &[(TreeIdx, Mstid)],
    mst_name: &[u8; 32],
    mst_name_len: u8,
    mst_revision: u16,
    digest: &[u8; 16],
    legacy_stp: bool,
    is_rstp: bool,
) -> Vec<u8> {
    let cist_ptp = port.ptps.get(&cist_idx);
    let flags = cist_ptp.map(role_flags).unwrap_or_default();
    let vector = cist_ptp.map(|p| p.designated_priority).unwrap_or_default();
    let times = cist_ptp.map(|p| p.designated_times).unwrap_or_default();

    if legacy_stp {
        return bpdu::encode_config(flags, &vector, &times);
    }
    if is_rstp {
        return bpdu::encode_rst(flags, &vector, &times);
    }

    let mut mstis: Vec<MstiRecord> = msti_list
        .iter()
        .filter_map(|(idx, mstid)| port.ptps.get(idx).map(|ptp| (*mstid, ptp)))
        .map(|(mstid, ptp)| MstiRecord {
            mstid,
            flags: role_flags(ptp),
            regional_root_priority: ptp.designated_priority.regional_root,
            internal_path_cost: ptp.designated_priority.internal_path_cost,
            bridge_id_priority: (ptp.designated_priority.designated_bridge.priority >> 8) as u8,
            port_id_priority: ptp.designated_priority.designated_port.priority,
            remaining_hops: ptp.designated_times.remaining_hops,
        })
        .collect();
    mstis.sort_by_key(|m| m.mstid);

    bpdu::encode_mst(flags, &vector, &times, mst_name, mst_name_len, mst_revision, digest, &mstis)
}

fn role_flags(ptp: &crate::model::PerTreePort) -> CistFlags {
    let port_role = match ptp.role {
        prt::PrtRole::Root | prt::PrtRole::Master => PortRoleFlag::Root,
        prt::PrtRole::Designated => PortRoleFlag::Designated,
        prt::PrtRole::Alternate | prt::PrtRole::Backup => PortRoleFlag::AlternateOrBackup,
        prt::PrtRole::Disabled => PortRoleFlag::Unknown,
    };
    CistFlags {
        topology_change: !ptp.tc_while.expired(),
        proposal: ptp.proposing,
        port_role,
        learning: ptp.learning,
        forwarding: ptp.forwarding,
        agreement: ptp.agreed,
        tc_ack: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingCallbacks {
        tx: Vec<(u32, u32, Vec<u8>)>,
        state_changes: Vec<(u32, u32, Mstid, KernelPortState)>,
        flushes: Vec<(u32, u32, Mstid)>,
    }

    impl Callbacks for RecordingCallbacks {
        fn tx_bpdu(&mut self, br_id: u32, port_ifindex: u32, bytes: &[u8]) {
            self.tx.push((br_id, port_ifindex, bytes.to_vec()));
        }
        fn set_port_state(&mut self, br_id: u32, port_ifindex: u32, mstid: Mstid, state: KernelPortState) {
            self.state_changes.push((br_id, port_ifindex, mstid, state));
        }
        fn flush_fdb(&mut self, br_id: u32, port_ifindex: u32, mstid: Mstid) {
            self.flushes.push((br_id, port_ifindex, mstid));
        }
    }

    #[test]
    fn sole_enabled_port_becomes_forwarding_designated() {
        let mut orch = Orchestrator::new();
        let mut cb = RecordingCallbacks::default();
        orch.bridge_added(1, [0xaa; 6]);
        orch.port_added(
            1,
            PortSpec { ifindex: 10, port_number: 1, mac: [1; 6], speed: 1000, duplex_full: true },
            &mut cb,
        )
        .unwrap();
        orch.link_state(1, 10, true, 1000, true, &mut cb).unwrap();
        for _ in 0..5 {
            orch.tick(&mut cb);
        }
        let status = orch.get_status(1).unwrap();
        let cist = status.ports[0].1.iter().find(|t| t.mstid == CIST_MSTID).unwrap();
        assert_eq!(cist.role, prt::PrtRole::Designated);
        assert!(cist.forwarding);
        assert!(cb.tx.iter().any(|(b, p, _)| *b == 1 && *p == 10));
    }

    #[test]
    fn unknown_bridge_is_rejected() {
        let mut orch = Orchestrator::new();
        let mut cb = RecordingCallbacks::default();
        let err = orch
            .port_added(99, PortSpec { ifindex: 1, port_number: 1, mac: [0; 6], speed: 0, duplex_full: false }, &mut cb)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownEntity);
    }

    #[test]
    fn port_table_exhaustion_is_rejected_with_resource_exhaustion() {
        let mut orch = Orchestrator::new();
        let mut cb = RecordingCallbacks::default();
        orch.bridge_added(1, [0xaa; 6]);
        for i in 0..0x0fffu32 {
            orch.port_added(1, PortSpec { ifindex: i + 1, port_number: 1, mac: [0; 6], speed: 0, duplex_full: false }, &mut cb)
                .unwrap();
        }
        let err = orch
            .port_added(1, PortSpec { ifindex: 0x0fff + 1, port_number: 1, mac: [0; 6], speed: 0, duplex_full: false }, &mut cb)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ResourceExhaustion);
    }

    #[test]
    fn bpdu_guard_port_shuts_down_on_any_bpdu() {
        let mut orch = Orchestrator::new();
        let mut cb = RecordingCallbacks::default();
        orch.bridge_added(1, [0xaa; 6]);
        orch.port_added(1, PortSpec { ifindex: 10, port_number: 1, mac: [1; 6], speed: 1000, duplex_full: true }, &mut cb).unwrap();
        orch.set_port_config(1, 10, PartialPortConfig { bpdu_guard: Some(true), ..Default::default() }, &mut cb).unwrap();
        let frame = bpdu::encode_tcn();
        orch.bpdu_received(1, 10, &frame, &mut cb).unwrap();
        assert!(cb.state_changes.iter().any(|(_, _, _, s)| *s == KernelPortState::Disabled));
    }
}
