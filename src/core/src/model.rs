//! Bridge / Port / Tree / PerTreePort data model (spec.md §3).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::arena::{Arena, ArenaIdx};
use crate::ident::{BridgeIdentifier, ConfigurationDigest, Mstid, PortIdentifier, VidToMstidTable, CIST_MSTID};
use crate::priority::{PriorityVector, Times};
use crate::sm::{
    bdm::BdmState, pim::PimState, ppm::PpmState, prt::PrtRole, ptx::PtxState, tcm::TcmState,
};
use crate::timer::Timer;

pub type PortIdx = ArenaIdx;
pub type TreeIdx = ArenaIdx;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolVersion {
    Stp,
    Rstp,
    Mstp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminP2P {
    ForceTrue,
    ForceFalse,
    Auto,
}

/// One managed Linux bridge (spec.md §3 Bridge).
#[derive(Debug)]
pub struct Bridge {
    pub ifindex: u32,
    pub bridge_id: BridgeIdentifier,
    pub mac: [u8; 6],
    pub protocol_version: ProtocolVersion,

    pub max_age: u8,
    pub forward_delay: u8,
    pub hello_time: u8,
    pub tx_hold_count: u8,
    pub migrate_time: u8,
    pub max_hops: u8,
    pub ageing_time: u32,

    pub mst_name: [u8; 32],
    pub mst_name_len: u8,
    pub mst_revision: u16,
    pub vid_to_mstid: VidToMstidTable,
    pub digest: ConfigurationDigest,

    pub ports: Arena<Port>,
    pub port_by_ifindex: HashMap<u32, PortIdx>,

    pub trees: Arena<Tree>,
    pub tree_by_mstid: HashMap<Mstid, TreeIdx>,
    pub tree_order: Vec<TreeIdx>,
}

impl Bridge {
    pub fn new(ifindex: u32, mac: [u8; 6]) -> Self {
        let bridge_id = BridgeIdentifier::new(0x8000, mac);
        let mut trees = Arena::new();
        let mut tree_by_mstid = HashMap::new();
        let cist_idx = trees.insert(Tree::new(CIST_MSTID, bridge_id.for_tree(CIST_MSTID)));
        tree_by_mstid.insert(CIST_MSTID, cist_idx);

        Self {
            ifindex,
            bridge_id,
            mac,
            protocol_version: ProtocolVersion::Mstp,
            max_age: 20,
            forward_delay: 15,
            hello_time: 2,
            tx_hold_count: 6,
            migrate_time: 3,
            max_hops: 20,
            ageing_time: 300,
            mst_name: [0u8; 32],
            mst_name_len: 0,
            mst_revision: 0,
            vid_to_mstid: VidToMstidTable::default(),
            digest: crate::ident::compute_digest(&VidToMstidTable::default()),
            ports: Arena::new(),
            port_by_ifindex: HashMap::new(),
            trees,
            tree_by_mstid,
            tree_order: vec![cist_idx],
        }
    }

    pub fn cist_idx(&self) -> TreeIdx {
        *self.tree_by_mstid.get(&CIST_MSTID).expect("CIST tree always present (I2)")
    }

    pub fn recompute_digest(&mut self) {
        self.digest = crate::ident::compute_digest(&self.vid_to_mstid);
    }

    /// Creates an MSTI tree and a matching PerTreePort on every existing
    /// port (spec.md §3 Tree lifecycle, I1).
    pub fn create_msti(&mut self, mstid: Mstid) -> TreeIdx {
        let tree = Tree::new(mstid, self.bridge_id.for_tree(mstid));
        let idx = self.trees.insert(tree);
        self.tree_by_mstid.insert(mstid, idx);
        self.tree_order.push(idx);
        for (_, port) in self.ports.iter_mut() {
            port.ptps.insert(idx, PerTreePort::new(port.port_id, mstid == CIST_MSTID));
        }
        idx
    }

    /// Destroys an MSTI, remapping its VIDs back to the CIST (spec.md §3).
    pub fn delete_msti(&mut self, mstid: Mstid) -> bool {
        if mstid == CIST_MSTID {
            return false;
        }
        if let Some(idx) = self.tree_by_mstid.remove(&mstid) {
            self.trees.remove(idx);
            self.tree_order.retain(|t| *t != idx);
            for (_, port) in self.ports.iter_mut() {
                port.ptps.remove(&idx);
            }
            self.vid_to_mstid.remap_to_cist(mstid);
            self.recompute_digest();
            true
        } else {
            false
        }
    }

    pub fn add_port(&mut self, ifindex: u32, port_id: PortIdentifier, mac: [u8; 6]) -> PortIdx {
        let mut port = Port::new(ifindex, port_id, mac);
        for tree_idx in self.tree_order.clone() {
            let is_cist = self.trees.get(tree_idx).map(|t| t.mstid == CIST_MSTID).unwrap_or(false);
            port.ptps.insert(tree_idx, PerTreePort::new(port_id, is_cist));
        }
        let idx = self.ports.insert(port);
        self.port_by_ifindex.insert(ifindex, idx);
        idx
    }

    pub fn remove_port(&mut self, ifindex: u32) -> bool {
        if let Some(idx) = self.port_by_ifindex.remove(&ifindex) {
            self.ports.remove(idx);
            true
        } else {
            false
        }
    }
}

/// One CIST or MSTI (spec.md §3 Tree).
#[derive(Debug)]
pub struct Tree {
    pub mstid: Mstid,
    pub bridge_id: BridgeIdentifier,
    pub root_priority: PriorityVector,
    pub root_times: Times,
    pub time_since_tc: u32,
    pub tc_count: u32,
    pub root_port: Option<PortIdx>,
}

impl Tree {
    fn new(mstid: Mstid, bridge_id: BridgeIdentifier) -> Self {
        Self {
            mstid,
            bridge_id,
            root_priority: PriorityVector {
                regional_root: bridge_id,
                root: bridge_id,
                ..Default::default()
            },
            root_times: Times { max_age: 20, hello_time: 2, forward_delay: 15, ..Default::default() },
            time_since_tc: 0,
            tc_count: 0,
            root_port: None,
        }
    }

    pub fn is_cist(&self) -> bool {
        self.mstid == CIST_MSTID
    }
}

/// One kernel bridge-port (spec.md §3 Port).
#[derive(Debug)]
pub struct Port {
    pub ifindex: u32,
    pub port_id: PortIdentifier,
    pub mac: [u8; 6],
    pub speed: u64,
    pub duplex_full: bool,

    pub admin_edge: bool,
    pub auto_edge: bool,
    pub admin_p2p: AdminP2P,
    pub restricted_role: bool,
    pub restricted_tcn: bool,
    pub bpdu_guard: bool,
    pub bpdu_filter: bool,
    pub network_port: bool,
    pub dont_txmt: bool,

    pub port_enabled: bool,
    pub oper_p2p: bool,
    pub oper_edge: bool,
    pub admin_external_path_cost: Option<u32>,
    pub admin_internal_path_cost: Option<u32>,

    pub send_rstp: bool,
    pub rcvd_bpdu: bool,
    pub rcvd_rstp: bool,
    pub rcvd_stp: bool,
    /// PPM's own copy of the migration-sensing signal. `rcvd_bpdu` is
    /// shared with BDM/TCM and is cleared once, by PTX, after every
    /// consumer has run a fixed-point pass; PPM must not clear it early.
    pub ppm_rcvd_bpdu: bool,

    pub tx_count: u8,
    pub edge_delay_while: Timer,
    pub mdelay_while: Timer,

    pub ppm_state: PpmState,
    pub bdm_state: BdmState,
    pub ptx_state: PtxState,

    pub shut_down_by_bpdu_guard: bool,

    pub ptps: HashMap<TreeIdx, PerTreePort>,
}

impl Port {
    fn new(ifindex: u32, port_id: PortIdentifier, mac: [u8; 6]) -> Self {
        Self {
            ifindex,
            port_id,
            mac,
            speed: 0,
            duplex_full: true,
            admin_edge: false,
            auto_edge: true,
            admin_p2p: AdminP2P::Auto,
            restricted_role: false,
            restricted_tcn: false,
            bpdu_guard: false,
            bpdu_filter: false,
            network_port: false,
            dont_txmt: false,
            port_enabled: false,
            oper_p2p: false,
            oper_edge: false,
            admin_external_path_cost: None,
            admin_internal_path_cost: None,
            send_rstp: true,
            rcvd_bpdu: false,
            rcvd_rstp: false,
            rcvd_stp: false,
            ppm_rcvd_bpdu: false,
            tx_count: 0,
            edge_delay_while: Timer::default(),
            mdelay_while: Timer::default(),
            ppm_state: PpmState::CheckingRstp,
            bdm_state: BdmState::NotEdge,
            ptx_state: PtxState::Idle,
            shut_down_by_bpdu_guard: false,
            ptps: HashMap::new(),
        }
    }

    pub fn path_cost_for(&self, is_cist: bool, default_cost: u32) -> u32 {
        if is_cist {
            self.admin_external_path_cost.unwrap_or(default_cost)
        } else {
            self.admin_internal_path_cost.unwrap_or(default_cost)
        }
    }
}

/// Default path cost from link speed, IEEE 802.1D table (megabit/s
/// thresholds), spec.md §4.H/§4.I context ("speed").
pub fn default_path_cost(speed_mbps: u64) -> u32 {
    match speed_mbps {
        0 => 200_000_000,
        s if s <= 10 => 2_000_000,
        s if s <= 100 => 200_000,
        s if s <= 1_000 => 20_000,
        s if s <= 10_000 => 2_000,
        s if s <= 100_000 => 200,
        s if s <= 1_000_000 => 20,
        _ => 2,
    }
}

/// Per-Tree-Per-Port bundle (spec.md §3 PerTreePort).
#[derive(Debug)]
pub struct PerTreePort {
    pub port_id: PortIdentifier,
    pub role: PrtRole,

    pub designated_priority: PriorityVector,
    pub port_priority: PriorityVector,
    pub msg_priority: PriorityVector,

    pub port_times: Times,
    pub designated_times: Times,
    pub msg_times: Times,

    pub learning: bool,
    pub forwarding: bool,

    pub rcvd_msg: bool,
    /// Set from the last received BPDU's topology-change bit/TCN
    /// classification (PRX, spec.md §4.F) and consumed (cleared) by the
    /// TCM step that reads it — not the PPM/BDM shared `rcvd_bpdu`.
    pub rcvd_tc: bool,
    pub rcvd_tcn: bool,
    pub updt_info: bool,
    pub new_info: bool,
    pub proposing: bool,
    pub proposed: bool,
    pub agree: bool,
    pub agreed: bool,
    pub sync: bool,
    pub synced: bool,
    pub re_root: bool,
    pub selected: bool,
    pub reselect: bool,
    pub disputed: bool,

    pub fd_while: Timer,
    pub rr_while: Timer,
    pub rb_while: Timer,
    pub tc_while: Timer,
    pub hello_when: Timer,

    pub pim_state: PimState,
    pub tcm_state: TcmState,
}

impl PerTreePort {
    pub(crate) fn new(port_id: PortIdentifier, is_cist: bool) -> Self {
        let _ = is_cist;
        Self {
            port_id,
            role: PrtRole::Disabled,
            designated_priority: PriorityVector::default(),
            port_priority: PriorityVector::default(),
            msg_priority: PriorityVector::default(),
            port_times: Times::default(),
            designated_times: Times::default(),
            msg_times: Times::default(),
            learning: false,
            forwarding: false,
            rcvd_msg: false,
            rcvd_tc: false,
            rcvd_tcn: false,
            updt_info: false,
            new_info: false,
            proposing: false,
            proposed: false,
            agree: false,
            agreed: false,
            sync: true,
            synced: false,
            re_root: false,
            selected: false,
            reselect: true,
            disputed: false,
            fd_while: Timer::default(),
            rr_while: Timer::default(),
            rb_while: Timer::default(),
            tc_while: Timer::default(),
            hello_when: Timer::default(),
            pim_state: PimState::Disabled,
            tcm_state: TcmState::Inactive,
        }
    }
}
