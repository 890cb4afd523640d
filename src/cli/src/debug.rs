//! `debug` subcommand: runtime log level (spec.md §6 opcode
//! `SetDebugLevel`).

use mstp_proto::protocol::{DebugLevel, Request};

use crate::client::MstpClient;
use crate::error::CliError;

pub(crate) struct CommandDebug;

impl CommandDebug {
    pub(crate) const CMD: &str = "debug";

    pub(crate) fn new_cmd() -> clap::Command {
        clap::Command::new(Self::CMD)
            .about("Change the running daemon's log level")
            .arg(clap::Arg::new("LEVEL").index(1).required(true).value_parser(["error", "warn", "info", "debug", "trace"]))
    }

    pub(crate) async fn handle(matches: &clap::ArgMatches, client: &MstpClient) -> Result<(), CliError> {
        let level = match matches.get_one::<String>("LEVEL").expect("required").as_str() {
            "error" => DebugLevel::Error,
            "warn" => DebugLevel::Warn,
            "info" => DebugLevel::Info,
            "debug" => DebugLevel::Debug,
            _ => DebugLevel::Trace,
        };
        client.call(Request::SetDebugLevel { level }).await?;
        Ok(())
    }
}
