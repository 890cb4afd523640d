//! `vlan` subcommand: the VID→MSTID table (spec.md §6 opcodes
//! `GetVidToMstid`, `SetVidToMstid`), using the same comma-separated
//! `N` / `N-M` range grammar the config file accepts.

use mstp_proto::protocol::{Reply, Request, VidRangeTable};
use mstp_proto::Mstid;

use crate::client::MstpClient;
use crate::error::CliError;

pub(crate) struct CommandVlan;

impl CommandVlan {
    pub(crate) const CMD: &str = "vlan";

    pub(crate) fn new_cmd() -> clap::Command {
        clap::Command::new(Self::CMD)
            .about("Show or change the VID-to-MSTID mapping")
            .subcommand_required(true)
            .subcommand(clap::Command::new("show").arg(clap::Arg::new("BRIDGE").index(1).required(true)))
            .subcommand(
                clap::Command::new("set")
                    .arg(clap::Arg::new("BRIDGE").index(1).required(true))
                    .arg(clap::Arg::new("MSTID").index(2).required(true).value_parser(clap::value_parser!(u16)))
                    .arg(clap::Arg::new("VIDS").index(3).required(true).help("e.g. 10-20,30,40-45")),
            )
    }

    pub(crate) async fn handle(matches: &clap::ArgMatches, client: &MstpClient) -> Result<(), CliError> {
        let Some((sub, sub_matches)) = matches.subcommand() else {
            return Err("vlan requires a subcommand".into());
        };
        match sub {
            "show" => {
                let bridge = sub_matches.get_one::<String>("BRIDGE").expect("required").clone();
                let reply = client.call(Request::GetVidToMstid { bridge }).await?;
                let Reply::VidToMstid(table) = reply else {
                    return Err("unexpected reply to GetVidToMstid".into());
                };
                for (mstid, ranges) in &table.assignments {
                    println!("{mstid}: {}", format_ranges(ranges));
                }
                Ok(())
            }
            "set" => {
                let bridge = sub_matches.get_one::<String>("BRIDGE").expect("required").clone();
                let mstid: Mstid = *sub_matches.get_one::<u16>("MSTID").expect("required");
                let vids_arg = sub_matches.get_one::<String>("VIDS").expect("required");
                let mut vids = parse_vid_ranges(vids_arg)?;
                vids.sort_unstable();
                vids.dedup();
                let ranges = VidRangeTable::compress(&vids);
                client.call(Request::SetVidToMstid { bridge, table: VidRangeTable { assignments: vec![(mstid, ranges)] } }).await?;
                Ok(())
            }
            other => Err(format!("unknown vlan subcommand {other}").into()),
        }
    }
}

fn format_ranges(ranges: &[(u16, u16)]) -> String {
    ranges
        .iter()
        .map(|&(a, b)| if a == b { a.to_string() } else { format!("{a}-{b}") })
        .collect::<Vec<_>>()
        .join(",")
}

/// Parses `10-20,30,40-45` into an expanded, unsorted VID list (the same
/// grammar `conf::parser::parse_vid_ranges` accepts in `<brname>.conf`).
fn parse_vid_ranges(text: &str) -> Result<Vec<u16>, CliError> {
    let mut vids = Vec::new();
    for part in text.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match part.split_once('-') {
            Some((start, end)) => {
                let start: u16 = start.trim().parse().map_err(|_| format!("invalid vid range {part}"))?;
                let end: u16 = end.trim().parse().map_err(|_| format!("invalid vid range {part}"))?;
                if start > end {
                    return Err(format!("invalid vid range {part}: start > end").into());
                }
                vids.extend(start..=end);
            }
            None => {
                let vid: u16 = part.parse().map_err(|_| format!("invalid vid {part}"))?;
                vids.push(vid);
            }
        }
    }
    Ok(vids)
}
