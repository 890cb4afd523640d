//! `show`/`setbridge`/`mstconfid` subcommands: CIST bridge query and the
//! whole-bridge config keys (spec.md §6 opcodes `GetCistBridge`,
//! `SetCistBridge`, `GetMstConfigId`, `SetMstConfigId`).

use mstp_proto::config::{
    validate_forward_delay, validate_hello_time, validate_max_age, validate_max_hops, validate_tx_hold_count,
};
use mstp_proto::config::{validate_bridge_priority, PartialBridgeConfig};
use mstp_proto::model::ProtocolVersion;
use mstp_proto::protocol::{PortRole, Reply, Request};

use crate::client::MstpClient;
use crate::error::CliError;

pub(crate) struct CommandShow;

impl CommandShow {
    pub(crate) const CMD: &str = "show";

    pub(crate) fn new_cmd() -> clap::Command {
        clap::Command::new(Self::CMD)
            .about("Show a bridge's CIST and MSTI state")
            .arg(clap::Arg::new("BRIDGE").index(1).required(true).help("Bridge name"))
    }

    pub(crate) async fn handle(matches: &clap::ArgMatches, client: &MstpClient) -> Result<(), CliError> {
        let bridge = matches.get_one::<String>("BRIDGE").expect("required").clone();
        let reply = client.call(Request::GetCistBridge { bridge }).await?;
        let Reply::Bridge(snapshot) = reply else {
            return Err("unexpected reply to GetCistBridge".into());
        };
        println!("bridge {} (priority {}, mac {})", snapshot.name, snapshot.priority, format_mac(&snapshot.mac));
        println!("  mst configuration digest: {}", format_digest(&snapshot.digest));
        for tree in &snapshot.trees {
            let label = if tree.mstid == mstp_proto::CIST_MSTID { "CIST".to_string() } else { format!("MSTI {}", tree.mstid) };
            println!(
                "  {label}: root priority {} mac {} root port {}",
                tree.root_priority,
                format_mac(&tree.root_mac),
                tree.root_port.as_deref().unwrap_or("(self)")
            );
        }
        for (port, trees) in &snapshot.ports {
            print!("  port {port}:");
            for pt in trees {
                print!(" [mstid {} role {} {}{}]", pt.mstid, format_role(pt.role), if pt.learning { "L" } else { "-" }, if pt.forwarding { "F" } else { "-" });
            }
            println!();
        }
        Ok(())
    }
}

fn format_role(role: PortRole) -> &'static str {
    match role {
        PortRole::Root => "root",
        PortRole::Designated => "designated",
        PortRole::Alternate => "alternate",
        PortRole::Backup => "backup",
        PortRole::Disabled => "disabled",
    }
}

fn format_mac(mac: &[u8; 6]) -> String {
    mac.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(":")
}

fn format_digest(digest: &[u8; 16]) -> String {
    digest.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join("")
}

pub(crate) struct CommandSetBridge;

impl CommandSetBridge {
    pub(crate) const CMD: &str = "setbridge";

    pub(crate) fn new_cmd() -> clap::Command {
        clap::Command::new(Self::CMD)
            .about("Change CIST bridge parameters")
            .arg(clap::Arg::new("BRIDGE").index(1).required(true).help("Bridge name"))
            .arg(clap::Arg::new("mode").long("mode").value_parser(["stp", "rstp", "mstp"]).help("Protocol version"))
            .arg(clap::Arg::new("max-age").long("max-age").value_parser(clap::value_parser!(u32)))
            .arg(clap::Arg::new("forward-delay").long("forward-delay").value_parser(clap::value_parser!(u32)))
            .arg(clap::Arg::new("hello-time").long("hello-time").value_parser(clap::value_parser!(u32)))
            .arg(clap::Arg::new("tx-hold-count").long("tx-hold-count").value_parser(clap::value_parser!(u32)))
            .arg(clap::Arg::new("max-hops").long("max-hops").value_parser(clap::value_parser!(u32)))
            .arg(clap::Arg::new("ageing-time").long("ageing-time").value_parser(clap::value_parser!(u32)))
            .arg(clap::Arg::new("priority").long("priority").value_parser(clap::value_parser!(u32)))
    }

    pub(crate) async fn handle(matches: &clap::ArgMatches, client: &MstpClient) -> Result<(), CliError> {
        let bridge = matches.get_one::<String>("BRIDGE").expect("required").clone();
        let config = PartialBridgeConfig {
            max_age: matches.get_one::<u32>("max-age").copied().map(validate_max_age),
            forward_delay: matches.get_one::<u32>("forward-delay").copied().map(validate_forward_delay),
            hello_time: matches.get_one::<u32>("hello-time").copied().map(validate_hello_time),
            tx_hold_count: matches.get_one::<u32>("tx-hold-count").copied().map(validate_tx_hold_count),
            max_hops: matches.get_one::<u32>("max-hops").copied().map(validate_max_hops),
            ageing_time: matches.get_one::<u32>("ageing-time").copied(),
            bridge_priority: matches.get_one::<u32>("priority").copied().map(validate_bridge_priority),
            mst_name: None,
            mst_revision: None,
            protocol_version: matches.get_one::<String>("mode").map(|m| match m.as_str() {
                "stp" => ProtocolVersion::Stp,
                "rstp" => ProtocolVersion::Rstp,
                _ => ProtocolVersion::Mstp,
            }),
        };
        client.call(Request::SetCistBridge { bridge, config }).await?;
        Ok(())
    }
}

pub(crate) struct CommandMstConfigId;

impl CommandMstConfigId {
    pub(crate) const CMD: &str = "mstconfid";

    pub(crate) fn new_cmd() -> clap::Command {
        clap::Command::new(Self::CMD)
            .about("Show or change the MST configuration identifier")
            .arg(clap::Arg::new("BRIDGE").index(1).required(true).help("Bridge name"))
            .arg(clap::Arg::new("name").long("name").value_name("NAME").help("MST configuration name"))
            .arg(clap::Arg::new("revision").long("revision").value_parser(clap::value_parser!(u16)).help("MST configuration revision"))
    }

    pub(crate) async fn handle(matches: &clap::ArgMatches, client: &MstpClient) -> Result<(), CliError> {
        let bridge = matches.get_one::<String>("BRIDGE").expect("required").clone();
        match (matches.get_one::<String>("name"), matches.get_one::<u16>("revision")) {
            (Some(name), Some(&revision)) => {
                client.call(Request::SetMstConfigId { bridge, name: name.clone(), revision }).await?;
                Ok(())
            }
            (None, None) => {
                let reply = client.call(Request::GetMstConfigId { bridge }).await?;
                let Reply::Bridge(snapshot) = reply else {
                    return Err("unexpected reply to GetMstConfigId".into());
                };
                println!("digest: {}", format_digest(&snapshot.digest));
                Ok(())
            }
            _ => Err("--name and --revision must be given together".into()),
        }
    }
}
