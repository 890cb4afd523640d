//! Parsed bridge/port configuration files (spec.md §6), in the shape of the
//! teacher's `conf_manager.rs` (owns the parsed tree) + `conf_worker.rs`
//! (does the line-oriented loading) split — collapsed here into one module
//! since there is no async worker actor in a single-threaded daemon.

use std::path::Path;

use mstp_proto::config::{PartialBridgeConfig, PartialPortConfig};
use mstp_proto::model::{AdminP2P, ProtocolVersion};
use mstp_proto::Mstid;

use super::parser::{parse_bool, parse_u32, parse_vid_ranges, tokenize};
use crate::error::DaemonError;

/// One MSTI's config-file sub-scope (spec.md §6, `original_source/
/// mstpd_conf.c`'s `conf_process_mstid_block`): a `mstid <id>` line opens
/// it, a blank `mstid` line or EOF closes it.
#[derive(Debug, Clone, Default)]
pub(crate) struct MstiBlock {
    pub(crate) vids: Vec<(u16, u16)>,
    pub(crate) priority: Option<u32>,
    pub(crate) port_priority: Option<u32>,
    pub(crate) internal_cost: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct BridgeConf {
    pub(crate) mode: Option<ProtocolVersion>,
    pub(crate) config: PartialBridgeConfig,
    pub(crate) confid_revision: Option<u16>,
    pub(crate) confid_name: Option<String>,
    pub(crate) mstis: Vec<(Mstid, MstiBlock)>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct PortConf {
    pub(crate) config: PartialPortConfig,
    pub(crate) mstis: Vec<(Mstid, MstiBlock)>,
}

pub(crate) fn load_bridge_conf(path: &Path) -> Result<BridgeConf, DaemonError> {
    let text = std::fs::read_to_string(path)?;
    let mut conf = BridgeConf::default();
    let mut current_mstid: Option<Mstid> = None;

    for line in text.lines() {
        let Some(tokens) = tokenize(line) else { continue };
        let key = tokens[0];
        let rest = &tokens[1..];

        if key == "mstid" {
            if rest.is_empty() {
                current_mstid = None;
                continue;
            }
            let mstid: Mstid = rest[0].parse().map_err(|_| format!("invalid mstid '{}'", rest[0]))?;
            conf.mstis.push((mstid, MstiBlock::default()));
            current_mstid = Some(mstid);
            continue;
        }

        if let Some(mstid) = current_mstid {
            let block = &mut conf.mstis.iter_mut().find(|(m, _)| *m == mstid).expect("just pushed").1;
            match key {
                "vids" => block.vids = parse_vid_ranges(rest.first().copied().unwrap_or(""))?,
                "prio" => block.priority = Some(parse_u32("prio", rest.first().copied().unwrap_or(""))?),
                other => return Err(format!("unknown key '{other}' inside mstid block").into()),
            }
            continue;
        }

        match key {
            "mode" => {
                conf.mode = Some(match rest.first().copied() {
                    Some("stp") => ProtocolVersion::Stp,
                    Some("rstp") => ProtocolVersion::Rstp,
                    Some("mstp") => ProtocolVersion::Mstp,
                    other => return Err(format!("unknown mode '{other:?}'").into()),
                });
            }
            "max-age" => conf.config.max_age = Some(clamp_u8(parse_u32(key, rest[0])?)),
            "forward-delay" => conf.config.forward_delay = Some(clamp_u8(parse_u32(key, rest[0])?)),
            "max-hops" => conf.config.max_hops = Some(clamp_u8(parse_u32(key, rest[0])?)),
            "hello" => conf.config.hello_time = Some(clamp_u8(parse_u32(key, rest[0])?)),
            "ageing" => conf.config.ageing_time = Some(parse_u32(key, rest[0])?),
            "tx-hold-count" => conf.config.tx_hold_count = Some(clamp_u8(parse_u32(key, rest[0])?)),
            "prio" => {
                conf.config.bridge_priority = Some(mstp_proto::config::validate_bridge_priority(parse_u32(key, rest[0])?))
            }
            "confid" => {
                let revision: u16 = rest.first().ok_or("confid needs a revision")?.parse().map_err(|_| "invalid confid revision")?;
                let name = rest.get(1).copied().unwrap_or("").to_string();
                conf.confid_revision = Some(revision);
                conf.confid_name = Some(name);
            }
            "vids" => {
                // A `vids` line outside any mstid block assigns to the CIST
                // (MSTID 0), matching the default entry of spec.md §3.
                conf.mstis.push((0, MstiBlock { vids: parse_vid_ranges(rest.first().copied().unwrap_or(""))?, ..Default::default() }));
            }
            other => return Err(format!("unknown bridge config key '{other}'").into()),
        }
    }
    Ok(conf)
}

pub(crate) fn load_port_conf(path: &Path) -> Result<PortConf, DaemonError> {
    let text = std::fs::read_to_string(path)?;
    let mut conf = PortConf::default();
    let mut current_mstid: Option<Mstid> = None;

    for line in text.lines() {
        let Some(tokens) = tokenize(line) else { continue };
        let key = tokens[0];
        let rest = &tokens[1..];

        if key == "mstid" {
            if rest.is_empty() {
                current_mstid = None;
                continue;
            }
            let mstid: Mstid = rest[0].parse().map_err(|_| format!("invalid mstid '{}'", rest[0]))?;
            conf.mstis.push((mstid, MstiBlock::default()));
            current_mstid = Some(mstid);
            continue;
        }

        if let Some(mstid) = current_mstid {
            let block = &mut conf.mstis.iter_mut().find(|(m, _)| *m == mstid).expect("just pushed").1;
            match key {
                "prio" => block.port_priority = Some(parse_u32("prio", rest.first().copied().unwrap_or(""))?),
                "int-cost" => block.internal_cost = Some(parse_u32("int-cost", rest.first().copied().unwrap_or(""))?),
                other => return Err(format!("unknown key '{other}' inside mstid block").into()),
            }
            continue;
        }

        match key {
            "admin-edge" => conf.config.admin_edge = Some(parse_bool(rest[0])?),
            "auto-edge" => conf.config.auto_edge = Some(parse_bool(rest[0])?),
            "p2p" => {
                conf.config.admin_p2p = Some(match rest.first().copied() {
                    Some("yes") => AdminP2P::ForceTrue,
                    Some("no") => AdminP2P::ForceFalse,
                    Some("auto") => AdminP2P::Auto,
                    other => return Err(format!("unknown p2p value '{other:?}'").into()),
                });
            }
            "rest-role" => conf.config.restricted_role = Some(parse_bool(rest[0])?),
            "rest-tcn" => conf.config.restricted_tcn = Some(parse_bool(rest[0])?),
            "bpdu-guard" => conf.config.bpdu_guard = Some(parse_bool(rest[0])?),
            "bpdu-filter" => conf.config.bpdu_filter = Some(parse_bool(rest[0])?),
            "network" => conf.config.network_port = Some(parse_bool(rest[0])?),
            "dont-txmt" => conf.config.dont_txmt = Some(parse_bool(rest[0])?),
            "prio" => {
                conf.config.port_priority = Some(mstp_proto::config::validate_port_priority(parse_u32(key, rest[0])?))
            }
            "int-cost" => conf.config.internal_path_cost = Some(mstp_proto::config::validate_path_cost(parse_u32(key, rest[0])?)),
            "ext-cost" => conf.config.external_path_cost = Some(mstp_proto::config::validate_path_cost(parse_u32(key, rest[0])?)),
            other => return Err(format!("unknown port config key '{other}'").into()),
        }
    }
    Ok(conf)
}

fn clamp_u8(v: u32) -> u8 {
    v.min(255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn bridge_conf_parses_basic_keys_and_mstid_block() {
        let f = write_temp(
            "mode mstp\nmax-age 20\nprio 4096\nmstid 10\nvids 100-110\nprio 8192\n\nmstid\nvids 5\n",
        );
        let conf = load_bridge_conf(f.path()).unwrap();
        assert_eq!(conf.mode, Some(ProtocolVersion::Mstp));
        assert_eq!(conf.config.max_age, Some(20));
        assert_eq!(conf.config.bridge_priority, Some(4096));
        assert_eq!(conf.mstis.len(), 2);
        assert_eq!(conf.mstis[0].0, 10);
        assert_eq!(conf.mstis[0].1.vids, vec![(100, 110)]);
        assert_eq!(conf.mstis[0].1.priority, Some(8192));
        assert_eq!(conf.mstis[1].1.vids, vec![(5, 5)]);
    }

    #[test]
    fn port_conf_parses_edge_and_p2p() {
        let f = write_temp("admin-edge yes\nauto-edge no\np2p auto\nbpdu-guard yes\n");
        let conf = load_port_conf(f.path()).unwrap();
        assert_eq!(conf.config.admin_edge, Some(true));
        assert_eq!(conf.config.auto_edge, Some(false));
        assert_eq!(conf.config.admin_p2p, Some(AdminP2P::Auto));
        assert_eq!(conf.config.bpdu_guard, Some(true));
    }
}
