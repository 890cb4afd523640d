//! The single-threaded daemon event loop (spec.md §5). Grounded on
//! `daemon.rs`'s `NipartDaemon` shape — one struct owning every I/O source,
//! one `run()` method driving a top-level `tokio::select!` — but unlike the
//! teacher, no branch here ever `tokio::spawn`s a per-connection or
//! per-event task; every branch runs its handler to completion in-line,
//! draining any queued kernel pushes before the loop goes back to
//! `select!`. The sole exception is the connection-driving future
//! `NetlinkMonitor::start` hands to `tokio::spawn` once at startup, a
//! mandatory I/O pump rather than business logic.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use futures_util::stream::FuturesUnordered;
use futures_util::StreamExt;
use mstp_proto::orchestrator::{Orchestrator, PortSpec};

use crate::bpdu_socket::BpduSocket;
use crate::callbacks::{drain_pending, DaemonCallbacks};
use crate::conf::ConfDir;
use crate::config_apply::{apply_bridge_conf, apply_port_conf};
use crate::error::DaemonError;
use crate::names::BridgeNames;
use crate::netlink::{LinkEvent, LinkSnapshot, NetlinkMonitor};
use crate::sock::{self, ControlListener};

pub(crate) struct MstpDaemon {
    orchestrator: Orchestrator,
    names: BridgeNames,
    netlink: NetlinkMonitor,
    bpdu_sockets: HashMap<u32, BpduSocket>,
    control: ControlListener,
    confdir: ConfDir,
    tick: tokio::time::Interval,
}

impl MstpDaemon {
    pub(crate) async fn new(control_socket: &std::path::Path, confdir: PathBuf) -> Result<Self, DaemonError> {
        let netlink = NetlinkMonitor::start()?;
        let control = ControlListener::bind(control_socket)?;
        let mut daemon = Self {
            orchestrator: Orchestrator::new(),
            names: BridgeNames::default(),
            netlink,
            bpdu_sockets: HashMap::new(),
            control,
            confdir: ConfDir::new(confdir),
            tick: tokio::time::interval(Duration::from_secs(1)),
        };
        daemon.discover_existing_links().await?;
        Ok(daemon)
    }

    /// Enumerates interfaces already present at startup, registering every
    /// Linux bridge and its enslaved ports the same way a live netlink
    /// event would (spec.md §4.H lifecycle).
    async fn discover_existing_links(&mut self) -> Result<(), DaemonError> {
        let links = self.netlink.dump().await?;
        for link in links.iter().filter(|l| l.is_bridge) {
            self.add_bridge(link).await?;
        }
        for link in links.iter().filter(|l| l.controller_ifindex.is_some()) {
            if let Some(br_ifindex) = link.controller_ifindex {
                if self.names.bridge_name(br_ifindex).is_some() {
                    self.add_port(br_ifindex, link).await?;
                    if link.up {
                        self.set_link_state(br_ifindex, link).await?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Runs forever. Every branch calls exactly one synchronous
    /// Orchestrator entry-point, then drains whatever kernel pushes that
    /// call queued, then loops (spec.md §5).
    pub(crate) async fn run(&mut self) -> Result<(), DaemonError> {
        log::info!("mstpd started");
        loop {
            tokio::select! {
                event = self.netlink.next_event() => {
                    match event {
                        Some(event) => self.handle_link_event(event).await?,
                        None => return Err("netlink monitor channel closed".into()),
                    }
                }
                accepted = self.control.accept() => {
                    if let Err(e) = accepted {
                        log::warn!("control-socket accept failed: {e}");
                    }
                }
                (idx, request) = self.control.next_request() => {
                    self.handle_control_request(idx, request).await;
                }
                (port_ifindex, frame) = next_bpdu(&self.bpdu_sockets) => {
                    self.handle_bpdu(port_ifindex, frame).await;
                }
                _ = self.tick.tick() => {
                    let mut callbacks = DaemonCallbacks::new(&self.bpdu_sockets);
                    self.orchestrator.tick(&mut callbacks);
                    let pending = callbacks.take_pending();
                    drain_pending(self.netlink.handle(), pending).await;
                }
            }
        }
    }

    async fn handle_bpdu(&mut self, port_ifindex: u32, frame: Result<Option<Vec<u8>>, DaemonError>) {
        let frame = match frame {
            Ok(Some(f)) => f,
            Ok(None) => return,
            Err(e) => {
                log::warn!("port {port_ifindex}: bpdu recv failed: {e}");
                return;
            }
        };
        let Some(br_ifindex) = self.names.bridge_ifindex_owning_port(port_ifindex) else {
            return;
        };
        let mut callbacks = DaemonCallbacks::new(&self.bpdu_sockets);
        if let Err(e) = self.orchestrator.bpdu_received(br_ifindex, port_ifindex, &frame, &mut callbacks) {
            log::warn!("bridge {br_ifindex} port {port_ifindex}: bpdu_received failed: {e}");
        }
        let pending = callbacks.take_pending();
        drain_pending(self.netlink.handle(), pending).await;
    }

    async fn handle_control_request(&mut self, idx: usize, request: Result<Option<mstp_proto::protocol::Request>, DaemonError>) {
        let request = match request {
            Ok(Some(r)) => r,
            Ok(None) => {
                self.control.drop_conn(idx);
                return;
            }
            Err(e) => {
                log::warn!("control-socket connection {idx}: {e}");
                self.control.drop_conn(idx);
                return;
            }
        };

        let mut callbacks = DaemonCallbacks::new(&self.bpdu_sockets);
        let reply = sock::handle(&mut self.orchestrator, &self.names, request, &mut callbacks);
        let pending = callbacks.take_pending();
        drain_pending(self.netlink.handle(), pending).await;

        if let Err(e) = self.control.send_reply(idx, &reply).await {
            log::warn!("control-socket connection {idx}: failed to send reply: {e}");
            self.control.drop_conn(idx);
        }
    }

    async fn handle_link_event(&mut self, event: LinkEvent) -> Result<(), DaemonError> {
        match event {
            LinkEvent::NewOrChanged(link) => self.handle_link_change(link).await,
            LinkEvent::Deleted { ifindex } => self.handle_link_deleted(ifindex).await,
        }
    }

    async fn handle_link_change(&mut self, link: LinkSnapshot) -> Result<(), DaemonError> {
        if link.is_bridge {
            if self.names.bridge_name(link.ifindex).is_none() {
                self.add_bridge(&link).await?;
            }
            return Ok(());
        }

        let Some(br_ifindex) = link.controller_ifindex else {
            // Not enslaved to any bridge (or just removed from one);
            // nothing to do unless we were already tracking it.
            if let Some(br_ifindex) = self.names.bridge_ifindex_owning_port(link.ifindex) {
                self.remove_port(br_ifindex, link.ifindex).await?;
            }
            return Ok(());
        };
        if self.names.bridge_name(br_ifindex).is_none() {
            return Ok(());
        }

        if self.names.port_name(br_ifindex, link.ifindex).is_none() {
            self.add_port(br_ifindex, &link).await?;
        }
        self.set_link_state(br_ifindex, &link).await
    }

    async fn handle_link_deleted(&mut self, ifindex: u32) -> Result<(), DaemonError> {
        if self.names.bridge_name(ifindex).is_some() {
            self.orchestrator.bridge_removed(ifindex);
            self.names.bridge_removed(ifindex);
            self.bpdu_sockets.retain(|_, sock| sock.ifindex() != ifindex);
            return Ok(());
        }
        if let Some(br_ifindex) = self.names.bridge_ifindex_owning_port(ifindex) {
            self.remove_port(br_ifindex, ifindex).await?;
        }
        Ok(())
    }

    async fn add_bridge(&mut self, link: &LinkSnapshot) -> Result<(), DaemonError> {
        self.orchestrator.bridge_added(link.ifindex, link.mac);
        self.names.bridge_added(&link.name, link.ifindex);

        if let Some(conf) = self.confdir.load_bridge(&link.name)? {
            let mut callbacks = DaemonCallbacks::new(&self.bpdu_sockets);
            apply_bridge_conf(&mut self.orchestrator, link.ifindex, &conf, &mut callbacks)?;
            let pending = callbacks.take_pending();
            drain_pending(self.netlink.handle(), pending).await;
        }
        Ok(())
    }

    async fn add_port(&mut self, br_ifindex: u32, link: &LinkSnapshot) -> Result<(), DaemonError> {
        let socket = BpduSocket::bind(link.ifindex, &link.name, link.mac)?;
        self.bpdu_sockets.insert(link.ifindex, socket);
        self.names.port_added(br_ifindex, &link.name, link.ifindex);

        let spec = PortSpec {
            ifindex: link.ifindex,
            port_number: next_port_number(&self.names, br_ifindex),
            mac: link.mac,
            speed: link.speed_mbps,
            duplex_full: link.duplex_full,
        };
        {
            let mut callbacks = DaemonCallbacks::new(&self.bpdu_sockets);
            self.orchestrator.port_added(br_ifindex, spec, &mut callbacks)?;
            let pending = callbacks.take_pending();
            drain_pending(self.netlink.handle(), pending).await;
        }

        let br_name = self.names.bridge_name(br_ifindex).unwrap_or_default().to_string();
        if let Some(conf) = self.confdir.load_port(&br_name, &link.name)? {
            let mut callbacks = DaemonCallbacks::new(&self.bpdu_sockets);
            apply_port_conf(&mut self.orchestrator, br_ifindex, link.ifindex, &conf, &mut callbacks)?;
            let pending = callbacks.take_pending();
            drain_pending(self.netlink.handle(), pending).await;
        }
        Ok(())
    }

    async fn remove_port(&mut self, br_ifindex: u32, port_ifindex: u32) -> Result<(), DaemonError> {
        let mut callbacks = DaemonCallbacks::new(&self.bpdu_sockets);
        self.orchestrator.port_removed(br_ifindex, port_ifindex, &mut callbacks)?;
        let pending = callbacks.take_pending();
        drain_pending(self.netlink.handle(), pending).await;

        self.names.port_removed(br_ifindex, port_ifindex);
        self.bpdu_sockets.remove(&port_ifindex);
        Ok(())
    }

    async fn set_link_state(&mut self, br_ifindex: u32, link: &LinkSnapshot) -> Result<(), DaemonError> {
        let mut callbacks = DaemonCallbacks::new(&self.bpdu_sockets);
        self.orchestrator.link_state(br_ifindex, link.ifindex, link.up, link.speed_mbps, link.duplex_full, &mut callbacks)?;
        let pending = callbacks.take_pending();
        drain_pending(self.netlink.handle(), pending).await;
        Ok(())
    }
}

/// Polls every bound BPDU socket at once without a per-socket
/// `tokio::spawn`, mirroring `ControlListener::next_request`'s
/// rebuild-the-stream-every-poll approach (`recv_bpdu` takes `&self`, so a
/// fresh `FuturesUnordered` per call is cheap). Takes the map directly
/// rather than `&MstpDaemon` so this borrows only `bpdu_sockets`, leaving
/// the other fields free for the sibling `select!` branches.
async fn next_bpdu(bpdu_sockets: &HashMap<u32, BpduSocket>) -> (u32, Result<Option<Vec<u8>>, DaemonError>) {
    if bpdu_sockets.is_empty() {
        std::future::pending().await
    } else {
        let mut futs: FuturesUnordered<_> = bpdu_sockets
            .iter()
            .map(|(ifindex, sock)| {
                let ifindex = *ifindex;
                async move { (ifindex, sock.recv_bpdu().await) }
            })
            .collect();
        futs.next().await.expect("non-empty")
    }
}

/// Ports are numbered by join order within a bridge (spec.md §3 Port
/// Identifier, 12-bit port number); the kernel's own bridge-port number
/// isn't exposed over plain RTNETLINK link attributes, so this assigns a
/// stable local counter instead.
fn next_port_number(names: &BridgeNames, br_ifindex: u32) -> u16 {
    (names.port_names(br_ifindex).len() as u16) + 1
}
