//! Translates one [`Request`] into Orchestrator calls and a [`Reply`]
//! (spec.md §6 control-socket opcodes; status/debug queries are thin
//! read-only snapshot builders over the arena, SPEC_FULL.md "Supplemented
//! features").

use std::collections::HashMap;

use mstp_proto::orchestrator::{Callbacks, Orchestrator};
use mstp_proto::protocol::{BridgeSnapshot, PortRole, PortTreeSnapshot, Reply, Request, TreeSnapshot, VidRangeTable};
use mstp_proto::sm::prt::PrtRole;

use crate::names::BridgeNames;

pub(crate) fn handle<C: Callbacks>(
    orchestrator: &mut Orchestrator,
    names: &BridgeNames,
    request: Request,
    callbacks: &mut C,
) -> Reply {
    match dispatch(orchestrator, names, request, callbacks) {
        Ok(reply) => reply,
        Err(e) => Reply::Error { kind: format!("{:?}", e.kind), msg: e.msg },
    }
}

fn dispatch<C: Callbacks>(
    orchestrator: &mut Orchestrator,
    names: &BridgeNames,
    request: Request,
    callbacks: &mut C,
) -> mstp_proto::MstpResult<Reply> {
    match request {
        Request::GetCistBridge { bridge } => Ok(Reply::Bridge(Box::new(snapshot(orchestrator, names, &bridge)?))),
        Request::SetCistBridge { bridge, config } => {
            let br_id = names.resolve(&bridge)?;
            orchestrator.set_bridge_config(br_id, config, callbacks)?;
            Ok(Reply::Ok)
        }
        Request::GetMstiBridge { bridge, .. } => Ok(Reply::Bridge(Box::new(snapshot(orchestrator, names, &bridge)?))),
        Request::SetMstiBridge { bridge, mstid, config } => {
            let br_id = names.resolve(&bridge)?;
            orchestrator.set_tree_config(br_id, mstid, config, callbacks)?;
            Ok(Reply::Ok)
        }
        Request::GetCistPort { bridge, .. } => Ok(Reply::Bridge(Box::new(snapshot(orchestrator, names, &bridge)?))),
        Request::SetCistPort { bridge, port, config } => {
            let br_id = names.resolve(&bridge)?;
            let port_ifindex = names.resolve_port(br_id, &port)?;
            orchestrator.set_port_config(br_id, port_ifindex, config, callbacks)?;
            Ok(Reply::Ok)
        }
        Request::GetMstiPort { bridge, .. } => Ok(Reply::Bridge(Box::new(snapshot(orchestrator, names, &bridge)?))),
        Request::SetMstiPort { bridge, port, mstid, port_priority } => {
            let br_id = names.resolve(&bridge)?;
            let port_ifindex = names.resolve_port(br_id, &port)?;
            orchestrator.set_msti_port_config(br_id, port_ifindex, mstid, port_priority, callbacks)?;
            Ok(Reply::Ok)
        }
        Request::ListMsti { bridge } => {
            let status = orchestrator.get_status(names.resolve(&bridge)?)?;
            Ok(Reply::MstiList(status.trees.iter().map(|t| t.mstid).filter(|m| *m != mstp_proto::CIST_MSTID).collect()))
        }
        Request::CreateMsti { bridge, mstid } => {
            let br_id = names.resolve(&bridge)?;
            orchestrator.create_msti(br_id, mstid, callbacks)?;
            Ok(Reply::Ok)
        }
        Request::DeleteMsti { bridge, mstid } => {
            let br_id = names.resolve(&bridge)?;
            orchestrator.delete_msti(br_id, mstid, callbacks)?;
            Ok(Reply::Ok)
        }
        Request::GetMstConfigId { bridge } => Ok(Reply::Bridge(Box::new(snapshot(orchestrator, names, &bridge)?))),
        Request::SetMstConfigId { bridge, name, revision } => {
            let br_id = names.resolve(&bridge)?;
            let mut bytes = [0u8; 32];
            let len = name.as_bytes().len().min(32);
            bytes[..len].copy_from_slice(&name.as_bytes()[..len]);
            orchestrator.set_bridge_config(
                br_id,
                mstp_proto::config::PartialBridgeConfig {
                    mst_name: Some((bytes, len as u8)),
                    mst_revision: Some(revision),
                    ..Default::default()
                },
                callbacks,
            )?;
            Ok(Reply::Ok)
        }
        Request::GetVidToMstid { bridge } => {
            let br_id = names.resolve(&bridge)?;
            let by_mstid = orchestrator.get_vid_to_mstid(br_id)?;
            let assignments = by_mstid.into_iter().map(|(mstid, vids)| (mstid, VidRangeTable::compress(&vids))).collect();
            Ok(Reply::VidToMstid(VidRangeTable { assignments }))
        }
        Request::SetVidToMstid { bridge, table } => {
            let br_id = names.resolve(&bridge)?;
            let mut raw = [0u16; 4096];
            for (mstid, ranges) in &table.assignments {
                for vid in VidRangeTable::expand(ranges) {
                    if (vid as usize) < raw.len() {
                        raw[vid as usize] = *mstid;
                    }
                }
            }
            orchestrator.set_vid_to_mstid(br_id, mstp_proto::VidToMstidTable::from_table(raw), callbacks)?;
            Ok(Reply::Ok)
        }
        Request::PortMcheck { bridge, port } => {
            let br_id = names.resolve(&bridge)?;
            let port_ifindex = names.resolve_port(br_id, &port)?;
            // Forces a protocol-migration re-check the way the standard's
            // mcheck administrative action does: re-enter PPM's Sending
            // path by toggling link state through the same edge PIM/BDM
            // already react to.
            orchestrator.link_state(br_id, port_ifindex, true, 0, true, callbacks)?;
            Ok(Reply::Ok)
        }
        Request::SetDebugLevel { level } => {
            set_log_level(level);
            Ok(Reply::Ok)
        }
    }
}

fn snapshot(orchestrator: &Orchestrator, names: &BridgeNames, bridge: &str) -> mstp_proto::MstpResult<BridgeSnapshot> {
    let br_id = names.resolve(bridge)?;
    let status = orchestrator.get_status(br_id)?;
    let port_name_by_ifindex: HashMap<u32, String> = names.port_names(br_id);
    Ok(BridgeSnapshot {
        name: bridge.to_string(),
        priority: status.bridge_id.priority,
        mac: status.bridge_id.mac,
        digest: status.digest,
        trees: status
            .trees
            .iter()
            .map(|t| TreeSnapshot {
                mstid: t.mstid,
                root_priority: t.root_priority.root.priority,
                root_mac: t.root_priority.root.mac,
                root_port: t.root_port.and_then(|ifx| port_name_by_ifindex.get(&ifx).cloned()),
            })
            .collect(),
        ports: status
            .ports
            .iter()
            .map(|(ifindex, trees)| {
                let name = port_name_by_ifindex.get(ifindex).cloned().unwrap_or_else(|| ifindex.to_string());
                let trees = trees
                    .iter()
                    .map(|pt| PortTreeSnapshot {
                        mstid: pt.mstid,
                        role: map_role(pt.role),
                        learning: pt.learning,
                        forwarding: pt.forwarding,
                    })
                    .collect();
                (name, trees)
            })
            .collect(),
    })
}

fn map_role(role: PrtRole) -> PortRole {
    match role {
        PrtRole::Root | PrtRole::Master => PortRole::Root,
        PrtRole::Designated => PortRole::Designated,
        PrtRole::Alternate => PortRole::Alternate,
        PrtRole::Backup => PortRole::Backup,
        PrtRole::Disabled => PortRole::Disabled,
    }
}

fn set_log_level(level: mstp_proto::protocol::DebugLevel) {
    use mstp_proto::protocol::DebugLevel;
    let filter = match level {
        DebugLevel::Error => log::LevelFilter::Error,
        DebugLevel::Warn => log::LevelFilter::Warn,
        DebugLevel::Info => log::LevelFilter::Info,
        DebugLevel::Debug => log::LevelFilter::Debug,
        DebugLevel::Trace => log::LevelFilter::Trace,
    };
    log::set_max_level(filter);
}
