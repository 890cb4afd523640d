// SPDX-License-Identifier: GPL-2.0-or-later

mod bpdu_socket;
mod callbacks;
mod conf;
mod config_apply;
mod daemon;
mod error;
mod names;
mod netlink;
mod sock;

use std::path::PathBuf;

use self::daemon::MstpDaemon;
use self::error::DaemonError;

const DEFAULT_CONTROL_SOCKET: &str = "/run/mstpd.sock";
const DEFAULT_CONFDIR: &str = "/etc/mstpd";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), DaemonError> {
    let matches = clap::Command::new("mstpd")
        .about("Userspace IEEE 802.1Q MSTP daemon for Linux bridges")
        .arg(
            clap::Arg::new("control-socket")
                .long("control-socket")
                .value_name("PATH")
                .default_value(DEFAULT_CONTROL_SOCKET)
                .help("Path to the control socket"),
        )
        .arg(
            clap::Arg::new("confdir")
                .long("confdir")
                .value_name("DIR")
                .default_value(DEFAULT_CONFDIR)
                .help("Directory holding <brname>.conf and <brname>/<portname>.conf files"),
        )
        .arg(
            clap::Arg::new("verbose")
                .short('v')
                .action(clap::ArgAction::Count)
                .help("Increase verbose level")
                .global(true),
        )
        .arg(
            clap::Arg::new("quiet")
                .short('q')
                .action(clap::ArgAction::SetTrue)
                .help("Disable logging")
                .global(true),
        )
        .get_matches();

    if !matches.get_flag("quiet") {
        enable_logging(matches.get_count("verbose"));
    }

    log::info!("mstpd version: {}", clap::crate_version!());

    let control_socket = PathBuf::from(matches.get_one::<String>("control-socket").expect("has default"));
    let confdir = PathBuf::from(matches.get_one::<String>("confdir").expect("has default"));

    let mut daemon = MstpDaemon::new(&control_socket, confdir).await?;
    daemon.run().await
}

fn enable_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    let mut log_builder = env_logger::Builder::new();
    log_builder.filter(Some("mstpd"), level);
    log_builder.filter(Some("mstp_proto"), level);
    log_builder.init();
}
