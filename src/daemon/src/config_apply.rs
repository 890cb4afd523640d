//! Applies a parsed [`crate::conf::BridgeConf`]/[`crate::conf::PortConf`]
//! onto a bridge already registered with the Orchestrator (spec.md §6
//! config-file semantics, applied the same way a control-socket `Set*`
//! opcode would be).

use mstp_proto::config::{validate_bridge_priority, validate_port_priority};
use mstp_proto::orchestrator::{Callbacks, Orchestrator};
use mstp_proto::{MstpResult, VidToMstidTable};

use crate::conf::{BridgeConf, PortConf};

/// Applies every bridge-level key, creates declared MSTIs, and replaces
/// the VID→MSTID table from the union of the top-level `vids` line (MSTID
/// 0) and every `mstid` sub-block's `vids` line.
pub(crate) fn apply_bridge_conf<C: Callbacks>(
    orchestrator: &mut Orchestrator,
    br_id: u32,
    conf: &BridgeConf,
    callbacks: &mut C,
) -> MstpResult<()> {
    let mut config = conf.config.clone();
    if let Some(mode) = conf.mode {
        config.protocol_version = Some(mode);
    }
    if let (Some(revision), Some(name)) = (conf.confid_revision, conf.confid_name.as_ref()) {
        let mut bytes = [0u8; 32];
        let len = name.as_bytes().len().min(32);
        bytes[..len].copy_from_slice(&name.as_bytes()[..len]);
        config.mst_name = Some((bytes, len as u8));
        config.mst_revision = Some(revision);
    }
    orchestrator.set_bridge_config(br_id, config, callbacks)?;

    for (mstid, block) in &conf.mstis {
        if *mstid != 0 {
            orchestrator.create_msti(br_id, *mstid, callbacks)?;
        }
        if let Some(priority) = block.priority {
            orchestrator.set_tree_config(
                br_id,
                *mstid,
                mstp_proto::config::PartialTreeConfig { bridge_priority: Some(validate_bridge_priority(priority)) },
                callbacks,
            )?;
        }
    }

    let mut raw = [0u16; 4096];
    for (mstid, block) in &conf.mstis {
        for (start, end) in &block.vids {
            for vid in *start..=*end {
                if (vid as usize) < raw.len() {
                    raw[vid as usize] = *mstid;
                }
            }
        }
    }
    orchestrator.set_vid_to_mstid(br_id, VidToMstidTable::from_table(raw), callbacks)?;
    Ok(())
}

/// Applies every port-level key, then per-MSTI port priority (spec.md §6
/// port `mstid` sub-scope `prio`/`int-cost`). `int-cost` is modelled at
/// port granularity rather than per-tree (see DESIGN.md): the last
/// processed MSTI block's value wins, matching `internal_path_cost`'s
/// single-slot representation on `Port`.
pub(crate) fn apply_port_conf<C: Callbacks>(
    orchestrator: &mut Orchestrator,
    br_id: u32,
    port_ifindex: u32,
    conf: &PortConf,
    callbacks: &mut C,
) -> MstpResult<()> {
    let mut config = conf.config.clone();
    for (_, block) in &conf.mstis {
        if let Some(cost) = block.internal_cost {
            config.internal_path_cost = Some(mstp_proto::config::validate_path_cost(cost));
        }
    }
    orchestrator.set_port_config(br_id, port_ifindex, config, callbacks)?;

    for (mstid, block) in &conf.mstis {
        if let Some(priority) = block.port_priority {
            orchestrator.set_msti_port_config(
                br_id,
                port_ifindex,
                *mstid,
                Some(validate_port_priority(priority)),
                callbacks,
            )?;
        }
    }
    Ok(())
}
