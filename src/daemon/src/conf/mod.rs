//! Bridge/port configuration file loading (spec.md §6).

mod manager;
mod parser;

use std::path::{Path, PathBuf};

pub(crate) use manager::{load_bridge_conf, load_port_conf, BridgeConf, MstiBlock, PortConf};

use crate::error::DaemonError;

/// Resolves the two file locations spec.md §6 defines: `<confdir>/<brname>.conf`
/// and `<confdir>/<brname>/<portname>.conf`.
#[derive(Debug, Clone)]
pub(crate) struct ConfDir {
    root: PathBuf,
}

impl ConfDir {
    pub(crate) fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub(crate) fn bridge_conf_path(&self, br_name: &str) -> PathBuf {
        self.root.join(format!("{br_name}.conf"))
    }

    pub(crate) fn port_conf_path(&self, br_name: &str, port_name: &str) -> PathBuf {
        self.root.join(br_name).join(format!("{port_name}.conf"))
    }

    pub(crate) fn load_bridge(&self, br_name: &str) -> Result<Option<BridgeConf>, DaemonError> {
        load_if_present(&self.bridge_conf_path(br_name), load_bridge_conf)
    }

    pub(crate) fn load_port(&self, br_name: &str, port_name: &str) -> Result<Option<PortConf>, DaemonError> {
        load_if_present(&self.port_conf_path(br_name, port_name), load_port_conf)
    }
}

fn load_if_present<T>(path: &Path, loader: impl Fn(&Path) -> Result<T, DaemonError>) -> Result<Option<T>, DaemonError> {
    if path.exists() {
        loader(path).map(Some)
    } else {
        Ok(None)
    }
}
