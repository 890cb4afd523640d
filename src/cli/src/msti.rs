//! `msti` subcommand: list/create/delete MSTIs and per-tree bridge/port
//! priority (spec.md §6 opcodes `ListMsti`, `CreateMsti`, `DeleteMsti`,
//! `SetMstiBridge`, `SetMstiPort`).

use mstp_proto::config::{validate_bridge_priority, validate_port_priority, PartialTreeConfig};
use mstp_proto::protocol::Request;
use mstp_proto::Mstid;

use crate::client::MstpClient;
use crate::error::CliError;

pub(crate) struct CommandMsti;

impl CommandMsti {
    pub(crate) const CMD: &str = "msti";

    pub(crate) fn new_cmd() -> clap::Command {
        clap::Command::new(Self::CMD)
            .about("List, create, delete, or configure MST instances")
            .subcommand_required(true)
            .subcommand(
                clap::Command::new("list")
                    .about("List the MSTIs configured on a bridge")
                    .arg(clap::Arg::new("BRIDGE").index(1).required(true)),
            )
            .subcommand(
                clap::Command::new("create")
                    .about("Create an MST instance")
                    .arg(clap::Arg::new("BRIDGE").index(1).required(true))
                    .arg(clap::Arg::new("MSTID").index(2).required(true).value_parser(clap::value_parser!(u16))),
            )
            .subcommand(
                clap::Command::new("delete")
                    .about("Delete an MST instance")
                    .arg(clap::Arg::new("BRIDGE").index(1).required(true))
                    .arg(clap::Arg::new("MSTID").index(2).required(true).value_parser(clap::value_parser!(u16))),
            )
            .subcommand(
                clap::Command::new("setbridge")
                    .about("Set an MSTI's bridge priority")
                    .arg(clap::Arg::new("BRIDGE").index(1).required(true))
                    .arg(clap::Arg::new("MSTID").index(2).required(true).value_parser(clap::value_parser!(u16)))
                    .arg(clap::Arg::new("priority").long("priority").required(true).value_parser(clap::value_parser!(u32))),
            )
            .subcommand(
                clap::Command::new("setport")
                    .about("Set an MSTI's port priority")
                    .arg(clap::Arg::new("BRIDGE").index(1).required(true))
                    .arg(clap::Arg::new("PORT").index(2).required(true))
                    .arg(clap::Arg::new("MSTID").index(3).required(true).value_parser(clap::value_parser!(u16)))
                    .arg(clap::Arg::new("priority").long("priority").required(true).value_parser(clap::value_parser!(u32))),
            )
    }

    pub(crate) async fn handle(matches: &clap::ArgMatches, client: &MstpClient) -> Result<(), CliError> {
        let Some((sub, sub_matches)) = matches.subcommand() else {
            return Err("msti requires a subcommand".into());
        };
        match sub {
            "list" => {
                let bridge = sub_matches.get_one::<String>("BRIDGE").expect("required").clone();
                let reply = client.call(Request::ListMsti { bridge }).await?;
                let mstp_proto::protocol::Reply::MstiList(mstids) = reply else {
                    return Err("unexpected reply to ListMsti".into());
                };
                for mstid in mstids {
                    println!("{mstid}");
                }
                Ok(())
            }
            "create" => {
                let (bridge, mstid) = bridge_and_mstid(sub_matches);
                client.call(Request::CreateMsti { bridge, mstid }).await?;
                Ok(())
            }
            "delete" => {
                let (bridge, mstid) = bridge_and_mstid(sub_matches);
                client.call(Request::DeleteMsti { bridge, mstid }).await?;
                Ok(())
            }
            "setbridge" => {
                let (bridge, mstid) = bridge_and_mstid(sub_matches);
                let priority = validate_bridge_priority(*sub_matches.get_one::<u32>("priority").expect("required"));
                client
                    .call(Request::SetMstiBridge { bridge, mstid, config: PartialTreeConfig { bridge_priority: Some(priority) } })
                    .await?;
                Ok(())
            }
            "setport" => {
                let bridge = sub_matches.get_one::<String>("BRIDGE").expect("required").clone();
                let port = sub_matches.get_one::<String>("PORT").expect("required").clone();
                let mstid: Mstid = *sub_matches.get_one::<u16>("MSTID").expect("required");
                let priority = validate_port_priority(*sub_matches.get_one::<u32>("priority").expect("required"));
                client.call(Request::SetMstiPort { bridge, port, mstid, port_priority: Some(priority) }).await?;
                Ok(())
            }
            other => Err(format!("unknown msti subcommand {other}").into()),
        }
    }
}

fn bridge_and_mstid(matches: &clap::ArgMatches) -> (String, Mstid) {
    let bridge = matches.get_one::<String>("BRIDGE").expect("required").clone();
    let mstid: Mstid = *matches.get_one::<u16>("MSTID").expect("required");
    (bridge, mstid)
}
