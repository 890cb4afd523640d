//! `setportcist`/`mcheck` subcommands: per-port config and the mcheck
//! administrative action (spec.md §6 opcodes `SetCistPort`, `PortMcheck`).

use mstp_proto::config::{validate_path_cost, PartialPortConfig};
use mstp_proto::model::AdminP2P;
use mstp_proto::protocol::Request;

use crate::client::MstpClient;
use crate::error::CliError;

pub(crate) struct CommandSetPort;

impl CommandSetPort {
    pub(crate) const CMD: &str = "setportcist";

    pub(crate) fn new_cmd() -> clap::Command {
        clap::Command::new(Self::CMD)
            .about("Change CIST port parameters")
            .arg(clap::Arg::new("BRIDGE").index(1).required(true).help("Bridge name"))
            .arg(clap::Arg::new("PORT").index(2).required(true).help("Port name"))
            .arg(clap::Arg::new("admin-edge").long("admin-edge").value_parser(clap::value_parser!(bool)))
            .arg(clap::Arg::new("auto-edge").long("auto-edge").value_parser(clap::value_parser!(bool)))
            .arg(clap::Arg::new("p2p").long("p2p").value_parser(["yes", "no", "auto"]))
            .arg(clap::Arg::new("restricted-role").long("restricted-role").value_parser(clap::value_parser!(bool)))
            .arg(clap::Arg::new("restricted-tcn").long("restricted-tcn").value_parser(clap::value_parser!(bool)))
            .arg(clap::Arg::new("bpdu-guard").long("bpdu-guard").value_parser(clap::value_parser!(bool)))
            .arg(clap::Arg::new("bpdu-filter").long("bpdu-filter").value_parser(clap::value_parser!(bool)))
            .arg(clap::Arg::new("network-port").long("network-port").value_parser(clap::value_parser!(bool)))
            .arg(clap::Arg::new("dont-txmt").long("dont-txmt").value_parser(clap::value_parser!(bool)))
            .arg(clap::Arg::new("external-cost").long("external-cost").value_parser(clap::value_parser!(u32)))
            .arg(clap::Arg::new("internal-cost").long("internal-cost").value_parser(clap::value_parser!(u32)))
    }

    pub(crate) async fn handle(matches: &clap::ArgMatches, client: &MstpClient) -> Result<(), CliError> {
        let bridge = matches.get_one::<String>("BRIDGE").expect("required").clone();
        let port = matches.get_one::<String>("PORT").expect("required").clone();
        let config = PartialPortConfig {
            admin_edge: matches.get_one::<bool>("admin-edge").copied(),
            auto_edge: matches.get_one::<bool>("auto-edge").copied(),
            admin_p2p: matches.get_one::<String>("p2p").map(|v| match v.as_str() {
                "yes" => AdminP2P::ForceTrue,
                "no" => AdminP2P::ForceFalse,
                _ => AdminP2P::Auto,
            }),
            restricted_role: matches.get_one::<bool>("restricted-role").copied(),
            restricted_tcn: matches.get_one::<bool>("restricted-tcn").copied(),
            bpdu_guard: matches.get_one::<bool>("bpdu-guard").copied(),
            bpdu_filter: matches.get_one::<bool>("bpdu-filter").copied(),
            network_port: matches.get_one::<bool>("network-port").copied(),
            dont_txmt: matches.get_one::<bool>("dont-txmt").copied(),
            port_priority: None,
            external_path_cost: matches.get_one::<u32>("external-cost").copied().map(validate_path_cost),
            internal_path_cost: matches.get_one::<u32>("internal-cost").copied().map(validate_path_cost),
        };
        client.call(Request::SetCistPort { bridge, port, config }).await?;
        Ok(())
    }
}

pub(crate) struct CommandMcheck;

impl CommandMcheck {
    pub(crate) const CMD: &str = "mcheck";

    pub(crate) fn new_cmd() -> clap::Command {
        clap::Command::new(Self::CMD)
            .about("Force a protocol migration check on a port")
            .arg(clap::Arg::new("BRIDGE").index(1).required(true).help("Bridge name"))
            .arg(clap::Arg::new("PORT").index(2).required(true).help("Port name"))
    }

    pub(crate) async fn handle(matches: &clap::ArgMatches, client: &MstpClient) -> Result<(), CliError> {
        let bridge = matches.get_one::<String>("BRIDGE").expect("required").clone();
        let port = matches.get_one::<String>("PORT").expect("required").clone();
        client.call(Request::PortMcheck { bridge, port }).await?;
        Ok(())
    }
}
