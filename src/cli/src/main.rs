mod bridge;
mod client;
mod debug;
mod error;
mod framing;
mod msti;
mod port;
mod vlan;

use self::bridge::{CommandMstConfigId, CommandSetBridge, CommandShow};
use self::client::MstpClient;
use self::debug::CommandDebug;
use self::error::CliError;
use self::msti::CommandMsti;
use self::port::{CommandMcheck, CommandSetPort};
use self::vlan::CommandVlan;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), CliError> {
    let mut cli_cmd = clap::Command::new("mstpctl")
        .about("Query and configure the mstpd userspace MSTP daemon")
        .arg_required_else_help(true)
        .subcommand_required(true)
        .arg(
            clap::Arg::new("control-socket")
                .long("control-socket")
                .value_name("PATH")
                .default_value(MstpClient::DEFAULT_SOCKET_PATH)
                .help("Path to mstpd's control socket")
                .global(true),
        )
        .arg(clap::Arg::new("quiet").short('q').action(clap::ArgAction::SetTrue).help("Disable logging").global(true))
        .arg(
            clap::Arg::new("verbose")
                .short('v')
                .action(clap::ArgAction::Count)
                .help("Increase verbose level")
                .global(true),
        )
        .subcommand(CommandShow::new_cmd())
        .subcommand(CommandSetBridge::new_cmd())
        .subcommand(CommandMstConfigId::new_cmd())
        .subcommand(CommandSetPort::new_cmd())
        .subcommand(CommandMcheck::new_cmd())
        .subcommand(CommandMsti::new_cmd())
        .subcommand(CommandVlan::new_cmd())
        .subcommand(CommandDebug::new_cmd());

    let matches = cli_cmd.get_matches_mut();

    if !matches.get_flag("quiet") {
        let level = match matches.get_count("verbose") {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };
        let mut log_builder = env_logger::Builder::new();
        log_builder.filter(Some("mstpctl"), level);
        log_builder.init();
    }

    log::info!("mstpctl version: {}", clap::crate_version!());

    let socket_path = matches.get_one::<String>("control-socket").expect("has default").clone();
    let client = MstpClient::new(socket_path);

    if let Err(e) = call_subcommand(&matches, &client).await {
        eprintln!("{e}");
        std::process::exit(1);
    }
    Ok(())
}

async fn call_subcommand(matches: &clap::ArgMatches, client: &MstpClient) -> Result<(), CliError> {
    if let Some(m) = matches.subcommand_matches(CommandShow::CMD) {
        CommandShow::handle(m, client).await
    } else if let Some(m) = matches.subcommand_matches(CommandSetBridge::CMD) {
        CommandSetBridge::handle(m, client).await
    } else if let Some(m) = matches.subcommand_matches(CommandMstConfigId::CMD) {
        CommandMstConfigId::handle(m, client).await
    } else if let Some(m) = matches.subcommand_matches(CommandSetPort::CMD) {
        CommandSetPort::handle(m, client).await
    } else if let Some(m) = matches.subcommand_matches(CommandMcheck::CMD) {
        CommandMcheck::handle(m, client).await
    } else if let Some(m) = matches.subcommand_matches(CommandMsti::CMD) {
        CommandMsti::handle(m, client).await
    } else if let Some(m) = matches.subcommand_matches(CommandVlan::CMD) {
        CommandVlan::handle(m, client).await
    } else if let Some(m) = matches.subcommand_matches(CommandDebug::CMD) {
        CommandDebug::handle(m, client).await
    } else {
        Err(CliError::from("unknown command"))
    }
}
