//! Control-socket transport (spec.md §6 "Control socket").

mod dispatch;
mod framing;
mod server;

pub(crate) use dispatch::handle;
pub(crate) use server::ControlListener;
