//! Per-port raw packet socket for BPDU tx/rx (spec.md §4.H "raw packet
//! sockets to send/receive BPDUs bound to each port").
//!
//! Bridge ports are already put into promiscuous mode by the kernel
//! bridging code, so unlike a plain listener we never call
//! `PACKET_ADD_MEMBERSHIP`; destination-MAC filtering for the bridge group
//! address happens here in userspace instead. Binding to a specific
//! interface goes through `socket2`'s safe `bind_device` (`SO_BINDTODEVICE`)
//! rather than hand-building a `sockaddr_ll`.

use std::os::fd::AsRawFd;

use nix::sys::socket::{recv, send, MsgFlags};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::io::unix::AsyncFd;

use crate::error::DaemonError;

/// IEEE 802.1D Bridge Group Address, the destination MAC every BPDU uses.
pub(crate) const BPDU_DEST_MAC: [u8; 6] = [0x01, 0x80, 0xc2, 0x00, 0x00, 0x00];
const ETHERTYPE_OR_LENGTH_MAX: u16 = 1500;
/// `ETH_P_ALL`, the wildcard ethertype filter: STP/MSTP frames carry a
/// length (not an ethertype) in that header field, so a socket bound to a
/// specific ethertype would never see them.
const ETH_P_ALL: i32 = 0x0003;

pub(crate) struct BpduSocket {
    fd: AsyncFd<Socket>,
    ifindex: u32,
    src_mac: [u8; 6],
}

impl BpduSocket {
    pub(crate) fn bind(ifindex: u32, iface_name: &str, src_mac: [u8; 6]) -> Result<Self, DaemonError> {
        let protocol = Protocol::from((ETH_P_ALL as u16).to_be() as i32);
        let socket = Socket::new(Domain::PACKET, Type::RAW, Some(protocol))
            .map_err(|e| DaemonError::from(format!("socket(AF_PACKET) failed for {iface_name}: {e}")))?;
        socket
            .bind_device(Some(iface_name.as_bytes()))
            .map_err(|e| DaemonError::from(format!("SO_BINDTODEVICE({iface_name}) failed: {e}")))?;
        socket.set_nonblocking(true)?;

        let fd = AsyncFd::new(socket)?;
        Ok(Self { fd, ifindex, src_mac })
    }

    pub(crate) fn ifindex(&self) -> u32 {
        self.ifindex
    }

    /// Waits for the socket to become readable, then reads one frame and
    /// strips the 14-byte Ethernet header, returning `None` for anything
    /// not addressed to the bridge group address (spec.md §4.B frames
    /// start at the LLC header).
    pub(crate) async fn recv_bpdu(&self) -> Result<Option<Vec<u8>>, DaemonError> {
        loop {
            let mut guard = self.fd.readable().await?;
            let mut buf = [0u8; 1600];
            let result =
                guard.try_io(|fd| recv(fd.get_ref().as_raw_fd(), &mut buf, MsgFlags::empty()).map_err(std::io::Error::from));
            let n = match result {
                Ok(Ok(n)) => n,
                Ok(Err(e)) => return Err(e.into()),
                Err(_would_block) => continue,
            };
            if n < 14 || buf[0..6] != BPDU_DEST_MAC {
                continue;
            }
            return Ok(Some(buf[14..n].to_vec()));
        }
    }

    /// Prepends a 14-byte Ethernet header (destination bridge-group
    /// address, our MAC, length field) and transmits.
    pub(crate) fn send_bpdu(&self, payload: &[u8]) -> Result<(), DaemonError> {
        let mut frame = Vec::with_capacity(14 + payload.len());
        frame.extend_from_slice(&BPDU_DEST_MAC);
        frame.extend_from_slice(&self.src_mac);
        let len = (payload.len() as u16).min(ETHERTYPE_OR_LENGTH_MAX);
        frame.extend_from_slice(&len.to_be_bytes());
        frame.extend_from_slice(payload);

        send(self.fd.get_ref().as_raw_fd(), &frame, MsgFlags::empty())
            .map_err(|e| DaemonError::from(format!("send(AF_PACKET) failed on ifindex {}: {e}", self.ifindex)))?;
        Ok(())
    }
}
