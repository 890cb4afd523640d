//! IEEE 802.1Q MSTP protocol engine: data model, BPDU codec, and the
//! complete set of per-port/per-tree state machines.
//!
//! This crate has no I/O and is not async; it is driven entirely through
//! [`orchestrator::Orchestrator`]. An OS adaptation layer (see the
//! `mstpd` binary) feeds it netlink/packet-socket events and implements
//! [`orchestrator::Callbacks`] to push forwarding-state decisions back to
//! the kernel.

pub mod arena;
pub mod bpdu;
pub mod config;
pub mod error;
pub mod ident;
pub mod model;
pub mod orchestrator;
pub mod priority;
pub mod protocol;
pub mod sm;
pub mod timer;

pub use error::{ErrorKind, MstpError, MstpResult};
pub use ident::{BridgeIdentifier, Mstid, PortIdentifier, VidToMstidTable, CIST_MSTID, MAX_MSTID};
pub use orchestrator::{BridgeStatus, Callbacks, Orchestrator, PortSpec, PortTreeStatus, TreeStatus};
