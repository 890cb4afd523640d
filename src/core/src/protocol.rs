//! Control-socket wire contract shared between the daemon and `mstpctl`
//! (spec.md §6 "Control socket"). Framing (length-prefix, write-loop) is the
//! daemon's concern; this module only defines the opcode/payload shapes so
//! the two binaries agree on them without a third shared crate.

use serde::{Deserialize, Serialize};

use crate::config::{PartialBridgeConfig, PartialPortConfig, PartialTreeConfig};
use crate::ident::Mstid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DebugLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// One control-socket request (spec.md §6 "Opcodes cover get/set of CIST
/// bridge, MSTI bridge, CIST port, MSTI port, mstilist, create/delete MSTI,
/// mstconfid, vid2mstid table, port mcheck, debug level"). `SetMstiPort`
/// only carries `port_priority`: per-MSTI port cost is set the same way the
/// config-file loader sets it, by re-sending `SetCistPort`'s
/// `internal_path_cost` (see DESIGN.md, `Port` has one `internal_path_cost`
/// slot, not one per tree).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Request {
    GetCistBridge { bridge: String },
    SetCistBridge { bridge: String, config: PartialBridgeConfig },
    GetMstiBridge { bridge: String, mstid: Mstid },
    SetMstiBridge { bridge: String, mstid: Mstid, config: PartialTreeConfig },
    GetCistPort { bridge: String, port: String },
    SetCistPort { bridge: String, port: String, config: PartialPortConfig },
    GetMstiPort { bridge: String, port: String, mstid: Mstid },
    SetMstiPort { bridge: String, port: String, mstid: Mstid, port_priority: Option<u8> },
    ListMsti { bridge: String },
    CreateMsti { bridge: String, mstid: Mstid },
    DeleteMsti { bridge: String, mstid: Mstid },
    GetMstConfigId { bridge: String },
    SetMstConfigId { bridge: String, name: String, revision: u16 },
    GetVidToMstid { bridge: String },
    SetVidToMstid { bridge: String, table: VidRangeTable },
    PortMcheck { bridge: String, port: String },
    SetDebugLevel { level: DebugLevel },
}

/// A VID→MSTID mapping expressed as ranges per MSTID (the config-file shape,
/// spec.md §6 "VID ranges"), so the wire payload stays small instead of
/// serializing all 4096 table slots.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VidRangeTable {
    pub assignments: Vec<(Mstid, Vec<(u16, u16)>)>,
}

/// Read-only bridge/port snapshot returned by the `Get*`/`ListMsti` opcodes.
/// Deliberately a flat DTO rather than `mstp_proto::orchestrator::BridgeStatus`
/// itself, so the internal arena-backed types never need to be wire-shaped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TreeSnapshot {
    pub mstid: Mstid,
    pub root_priority: u16,
    pub root_mac: [u8; 6],
    pub root_port: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PortRole {
    Root,
    Designated,
    Alternate,
    Backup,
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortTreeSnapshot {
    pub mstid: Mstid,
    pub role: PortRole,
    pub learning: bool,
    pub forwarding: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BridgeSnapshot {
    pub name: String,
    pub priority: u16,
    pub mac: [u8; 6],
    pub digest: [u8; 16],
    pub trees: Vec<TreeSnapshot>,
    pub ports: Vec<(String, Vec<PortTreeSnapshot>)>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Reply {
    Ok,
    Bridge(Box<BridgeSnapshot>),
    MstiList(Vec<Mstid>),
    VidToMstid(VidRangeTable),
    Error { kind: String, msg: String },
}

impl VidRangeTable {
    /// Compresses a sorted list of VIDs into inclusive `(start, end)` runs,
    /// the same shorthand the config file parser accepts (spec.md §6).
    pub fn compress(vids: &[u16]) -> Vec<(u16, u16)> {
        let mut ranges = Vec::new();
        let mut iter = vids.iter().copied();
        let Some(mut start) = iter.next() else { return ranges };
        let mut end = start;
        for vid in iter {
            if vid == end + 1 {
                end = vid;
            } else {
                ranges.push((start, end));
                start = vid;
                end = vid;
            }
        }
        ranges.push((start, end));
        ranges
    }

    /// Expands the ranges back into an ascending list of individual VIDs.
    pub fn expand(ranges: &[(u16, u16)]) -> Vec<u16> {
        ranges.iter().flat_map(|&(a, b)| a..=b).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compress_and_expand_round_trip_contiguous_runs() {
        let vids = vec![1, 2, 3, 5, 6, 10];
        let ranges = VidRangeTable::compress(&vids);
        assert_eq!(ranges, vec![(1, 3), (5, 6), (10, 10)]);
        assert_eq!(VidRangeTable::expand(&ranges), vids);
    }

    #[test]
    fn compress_empty_is_empty() {
        assert!(VidRangeTable::compress(&[]).is_empty());
    }
}
