//! BPDU codec (spec.md §4.B, wire layout in §6).
//!
//! Frames handed to [`decode`] and produced by [`encode`] start at the LLC
//! header (`42 42 03`); the adaptation layer is responsible for stripping
//! the Ethernet header and multicast destination address before handing
//! the payload to the core, and for prepending them again before sending.

use crate::error::{ErrorKind, MstpError};
use crate::ident::{BridgeIdentifier, Mstid, PortIdentifier};
use crate::priority::{PriorityVector, Times};

pub const LLC_HEADER: [u8; 3] = [0x42, 0x42, 0x03];
pub const MAX_FRAME_LEN: usize = 1500;

const PROTO_VERSION_STP: u8 = 0;
const PROTO_VERSION_RSTP: u8 = 2;
const PROTO_VERSION_MSTP: u8 = 3;

const TYPE_CONFIG: u8 = 0x00;
const TYPE_TCN: u8 = 0x80;
const TYPE_RST_OR_MST: u8 = 0x02;

const MIN_LEN_CONFIG: usize = 38; // LLC(3) + 35 bytes of Config body
const MIN_LEN_TCN: usize = 7; // LLC(3) + 4 bytes of TCN body
const MIN_LEN_RST: usize = 39; // LLC(3) + 36 bytes of RST body
/// LLC(3) + fixed CIST portion through `CIST Remaining Hops` (offset 102,
/// i.e. 103 bytes), the byte-offset table in spec.md §6 being authoritative
/// over the `102 + 16·k` shorthand in §4.B (resolved as an off-by-one in
/// the prose; see DESIGN.md).
const MST_FIXED_LEN: usize = 3 + 103;
const MSTI_RECORD_LEN: usize = 16;

/// CIST flags octet (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CistFlags {
    pub topology_change: bool,
    pub proposal: bool,
    pub port_role: PortRoleFlag,
    pub learning: bool,
    pub forwarding: bool,
    pub agreement: bool,
    pub tc_ack: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PortRoleFlag {
    #[default]
    Unknown,
    AlternateOrBackup,
    Root,
    Designated,
}

impl CistFlags {
    fn from_byte(b: u8) -> Self {
        let port_role = match (b >> 2) & 0b11 {
            0b00 => PortRoleFlag::Unknown,
            0b01 => PortRoleFlag::AlternateOrBackup,
            0b10 => PortRoleFlag::Root,
            _ => PortRoleFlag::Designated,
        };
        Self {
            topology_change: b & 0x01 != 0,
            proposal: b & 0x02 != 0,
            port_role,
            learning: b & 0x10 != 0,
            forwarding: b & 0x20 != 0,
            agreement: b & 0x40 != 0,
            tc_ack: b & 0x80 != 0,
        }
    }

    fn to_byte(self) -> u8 {
        let role_bits = match self.port_role {
            PortRoleFlag::Unknown => 0b00,
            PortRoleFlag::AlternateOrBackup => 0b01,
            PortRoleFlag::Root => 0b10,
            PortRoleFlag::Designated => 0b11,
        };
        (self.topology_change as u8)
            | ((self.proposal as u8) << 1)
            | (role_bits << 2)
            | ((self.learning as u8) << 4)
            | ((self.forwarding as u8) << 5)
            | ((self.agreement as u8) << 6)
            | ((self.tc_ack as u8) << 7)
    }
}

/// One MSTI Config Message (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MstiRecord {
    pub mstid: Mstid,
    pub flags: CistFlags,
    pub regional_root_priority: BridgeIdentifier,
    pub internal_path_cost: u32,
    pub bridge_id_priority: u8,
    pub port_id_priority: u8,
    pub remaining_hops: u8,
}

/// A decoded BPDU, spec.md §4.B.
#[derive(Debug, Clone, PartialEq)]
pub enum ReceivedBpdu {
    Tcn,
    Config {
        flags: CistFlags,
        vector: PriorityVector,
        times: Times,
    },
    Rst {
        flags: CistFlags,
        vector: PriorityVector,
        times: Times,
    },
    Mst {
        flags: CistFlags,
        vector: PriorityVector,
        times: Times,
        config_name: [u8; 32],
        config_name_len: u8,
        revision: u16,
        digest: [u8; 16],
        mstis: Vec<MstiRecord>,
    },
}

impl ReceivedBpdu {
    pub fn is_rstp_or_better(&self) -> bool {
        !matches!(self, ReceivedBpdu::Tcn | ReceivedBpdu::Config { .. })
    }

    pub fn cist_flags(&self) -> Option<CistFlags> {
        match self {
            ReceivedBpdu::Tcn => None,
            ReceivedBpdu::Config { flags, .. }
            | ReceivedBpdu::Rst { flags, .. }
            | ReceivedBpdu::Mst { flags, .. } => Some(*flags),
        }
    }
}

fn malformed(msg: impl Into<String>) -> MstpError {
    MstpError::new(ErrorKind::MalformedFrame, msg)
}

fn be16(b: &[u8]) -> u16 {
    u16::from_be_bytes([b[0], b[1]])
}

fn be32(b: &[u8]) -> u32 {
    u32::from_be_bytes([b[0], b[1], b[2], b[3]])
}

/// Decodes a frame starting at the LLC header (spec.md §4.B).
pub fn decode(frame: &[u8]) -> Result<ReceivedBpdu, MstpError> {
    if frame.len() > MAX_FRAME_LEN {
        return Err(malformed(format!(
            "frame of {} bytes exceeds {MAX_FRAME_LEN}",
            frame.len()
        )));
    }
    if frame.len() < 3 || frame[0..3] != LLC_HEADER {
        return Err(malformed("missing or invalid LLC header"));
    }
    let body = &frame[3..];
    if body.len() < 4 {
        return Err(malformed("frame truncated before protocol header"));
    }
    let proto_id = be16(&body[0..2]);
    if proto_id != 0 {
        return Err(malformed(format!("unexpected protocol identifier {proto_id:#06x}")));
    }
    let version = body[2];
    let bpdu_type = body[3];

    match (version, bpdu_type) {
        (PROTO_VERSION_STP, TYPE_TCN) => {
            if frame.len() < MIN_LEN_TCN {
                return Err(malformed("TCN BPDU truncated"));
            }
            Ok(ReceivedBpdu::Tcn)
        }
        (PROTO_VERSION_STP, TYPE_CONFIG) => {
            if frame.len() < MIN_LEN_CONFIG {
                return Err(malformed("Config BPDU truncated"));
            }
            let (flags, vector, times) = decode_cist_config_body(body)?;
            Ok(ReceivedBpdu::Config { flags, vector, times })
        }
        (PROTO_VERSION_RSTP, TYPE_RST_OR_MST) => {
            if frame.len() < MIN_LEN_RST {
                return Err(malformed("RST BPDU truncated"));
            }
            let (flags, vector, times) = decode_cist_config_body(body)?;
            Ok(ReceivedBpdu::Rst { flags, vector, times })
        }
        (PROTO_VERSION_MSTP, TYPE_RST_OR_MST) => decode_mst(frame, body),
        (v, t) => Err(malformed(format!(
            "unknown protocol-version/bpdu-type pair ({v}, {t:#04x})"
        ))),
    }
}

/// Decodes the CIST fields common to Config/RST/MST bodies (offsets are
/// relative to the start of `body`, i.e. after the LLC header).
fn decode_cist_config_body(
    body: &[u8],
) -> Result<(CistFlags, PriorityVector, Times), MstpError> {
    let flags = CistFlags::from_byte(body[4]);
    let mut root_bytes = [0u8; 8];
    root_bytes.copy_from_slice(&body[5..13]);
    let root = BridgeIdentifier::from_bytes(&root_bytes);
    let external_path_cost = be32(&body[13..17]);
    let mut bridge_bytes = [0u8; 8];
    bridge_bytes.copy_from_slice(&body[17..25]);
    let designated_bridge = BridgeIdentifier::from_bytes(&bridge_bytes);
    let mut port_bytes = [0u8; 2];
    port_bytes.copy_from_slice(&body[25..27]);
    let designated_port = PortIdentifier::from_bytes(&port_bytes);
    let message_age = be16(&body[27..29]) / 256;
    let max_age = (be16(&body[29..31]) / 256) as u8;
    let hello_time = (be16(&body[31..33]) / 256) as u8;
    let forward_delay = (be16(&body[33..35]) / 256) as u8;

    let vector = PriorityVector {
        root,
        external_path_cost,
        // For a plain Config/RST BPDU (no region) the regional root
        // coincides with the root and internal cost is zero.
        regional_root: root,
        internal_path_cost: 0,
        designated_bridge,
        designated_port,
    };
    let times = Times { message_age, max_age, hello_time, forward_delay, remaining_hops: 0 };
    Ok((flags, vector, times))
}

fn decode_mst(frame: &[u8], body: &[u8]) -> Result<ReceivedBpdu, MstpError> {
    if frame.len() < MST_FIXED_LEN {
        return Err(malformed("MST BPDU truncated before fixed CIST portion"));
    }
    let (flags, mut vector, mut times) = decode_cist_config_body(body)?;

    let v3len = be16(&body[36..38]) as usize;
    if v3len < 64 {
        return Err(malformed(format!("version 3 length {v3len} below minimum 64")));
    }
    let k_numer = v3len - 64;
    if k_numer % 16 != 0 {
        return Err(malformed(format!(
            "version 3 length {v3len} does not yield an integral MSTI count"
        )));
    }
    let k = k_numer / 16;

    let name_len = body[39];
    let mut config_name = [0u8; 32];
    config_name.copy_from_slice(&body[40..72]);
    let revision = be16(&body[72..74]);
    let mut digest = [0u8; 16];
    digest.copy_from_slice(&body[74..90]);
    let internal_path_cost = be32(&body[90..94]);
    let mut cist_bridge_bytes = [0u8; 8];
    cist_bridge_bytes.copy_from_slice(&body[94..102]);
    let regional_root = BridgeIdentifier::from_bytes(&cist_bridge_bytes);
    let remaining_hops = body[102];

    vector.regional_root = regional_root;
    vector.internal_path_cost = internal_path_cost;
    times.remaining_hops = remaining_hops;

    let mstis_start = 103;
    let required_len = MST_FIXED_LEN + k * MSTI_RECORD_LEN;
    if frame.len() < required_len {
        return Err(malformed(format!(
            "MST BPDU declares {k} MSTI records but frame is too short"
        )));
    }

    let mut mstis = Vec::with_capacity(k);
    for i in 0..k {
        let off = mstis_start + i * MSTI_RECORD_LEN;
        let rec = &body[off..off + MSTI_RECORD_LEN];
        let flags = CistFlags::from_byte(rec[0]);
        let mut rr_bytes = [0u8; 8];
        rr_bytes.copy_from_slice(&rec[1..9]);
        let internal_path_cost = be32(&rec[9..13]);
        let bridge_id_priority = rec[13];
        let port_id_priority = rec[14];
        let remaining_hops = rec[15];
        let regional_root_priority = BridgeIdentifier::from_bytes(&rr_bytes);
        // The MSTID rides in the low 12 bits of the MSTI Regional Root
        // Identifier, the same sys-id-extension field a CIST BridgeID uses
        // for its per-tree priority (spec.md §3).
        mstis.push(MstiRecord {
            mstid: regional_root_priority.sys_id_ext,
            flags,
            regional_root_priority,
            internal_path_cost,
            bridge_id_priority,
            port_id_priority,
            remaining_hops,
        });
    }

    Ok(ReceivedBpdu::Mst {
        flags,
        vector,
        times,
        config_name,
        config_name_len: name_len,
        revision,
        digest,
        mstis,
    })
}

/// Encodes a TCN BPDU.
pub fn encode_tcn() -> Vec<u8> {
    let mut out = Vec::with_capacity(MIN_LEN_TCN);
    out.extend_from_slice(&LLC_HEADER);
    out.extend_from_slice(&0u16.to_be_bytes());
    out.push(PROTO_VERSION_STP);
    out.push(TYPE_TCN);
    out
}

fn encode_cist_body(
    version: u8,
    bpdu_type: u8,
    flags: CistFlags,
    vector: &PriorityVector,
    times: &Times,
    is_cist_only: bool,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(39);
    out.extend_from_slice(&LLC_HEADER);
    out.extend_from_slice(&0u16.to_be_bytes());
    out.push(version);
    out.push(bpdu_type);
    out.push(flags.to_byte());
    out.extend_from_slice(&vector.root.to_bytes());
    out.extend_from_slice(&vector.external_path_cost.to_be_bytes());
    let designated = if is_cist_only { vector.root } else { vector.designated_bridge };
    out.extend_from_slice(&designated.to_bytes());
    out.extend_from_slice(&vector.designated_port.to_bytes());
    out.extend_from_slice(&(times.message_age as u16 * 256).to_be_bytes());
    out.extend_from_slice(&((times.max_age as u16) * 256).to_be_bytes());
    out.extend_from_slice(&((times.hello_time as u16) * 256).to_be_bytes());
    out.extend_from_slice(&((times.forward_delay as u16) * 256).to_be_bytes());
    out.push(0); // Version 1 Length
    out
}

/// Encodes a Config BPDU.
pub fn encode_config(flags: CistFlags, vector: &PriorityVector, times: &Times) -> Vec<u8> {
    encode_cist_body(PROTO_VERSION_STP, TYPE_CONFIG, flags, vector, times, true)
}

/// Encodes an RST BPDU.
pub fn encode_rst(flags: CistFlags, vector: &PriorityVector, times: &Times) -> Vec<u8> {
    encode_cist_body(PROTO_VERSION_RSTP, TYPE_RST_OR_MST, flags, vector, times, true)
}

/// Encodes an MST BPDU, always carrying the full MSTI list in
/// MSTID-ascending order (spec.md §4.B). `mstis` must already be sorted.
pub fn encode_mst(
    flags: CistFlags,
    vector: &PriorityVector,
    times: &Times,
    config_name: &[u8; 32],
    config_name_len: u8,
    revision: u16,
    digest: &[u8; 16],
    mstis: &[MstiRecord],
) -> Vec<u8> {
    let mut out = encode_cist_body(
        PROTO_VERSION_MSTP,
        TYPE_RST_OR_MST,
        flags,
        vector,
        times,
        false,
    );
    let v3len = 64 + mstis.len() * MSTI_RECORD_LEN;
    out.extend_from_slice(&(v3len as u16).to_be_bytes());
    out.push(0); // MST Config Format Selector
    out.push(config_name_len);
    out.extend_from_slice(config_name);
    out.extend_from_slice(&revision.to_be_bytes());
    out.extend_from_slice(digest);
    out.extend_from_slice(&vector.internal_path_cost.to_be_bytes());
    out.extend_from_slice(&vector.regional_root.to_bytes());
    out.push(times.remaining_hops);
    debug_assert!(
        mstis.windows(2).all(|w| w[0].mstid < w[1].mstid),
        "MSTI records must be supplied in MSTID-ascending order"
    );
    for m in mstis {
        out.push(m.flags.to_byte());
        out.extend_from_slice(&m.regional_root_priority.for_tree(m.mstid).to_bytes());
        out.extend_from_slice(&m.internal_path_cost.to_be_bytes());
        out.push(m.bridge_id_priority);
        out.push(m.port_id_priority);
        out.push(m.remaining_hops);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_vector() -> PriorityVector {
        PriorityVector {
            root: BridgeIdentifier::new(0x0000, [1, 2, 3, 4, 5, 6]),
            external_path_cost: 0,
            regional_root: BridgeIdentifier::new(0x0000, [1, 2, 3, 4, 5, 6]),
            internal_path_cost: 4,
            designated_bridge: BridgeIdentifier::new(0x8000, [7, 8, 9, 10, 11, 12]),
            designated_port: PortIdentifier::new(0x80, 3),
        }
    }

    fn sample_times() -> Times {
        Times { message_age: 0, max_age: 20, hello_time: 2, forward_delay: 15, remaining_hops: 19 }
    }

    #[test]
    fn tcn_round_trips() {
        let bytes = encode_tcn();
        assert_eq!(decode(&bytes).unwrap(), ReceivedBpdu::Tcn);
    }

    #[test]
    fn config_round_trips() {
        let flags = CistFlags { topology_change: true, ..Default::default() };
        let vector = sample_vector();
        let times = sample_times();
        let bytes = encode_config(flags, &vector, &times);
        match decode(&bytes).unwrap() {
            ReceivedBpdu::Config { flags: f, vector: v, times: t } => {
                assert_eq!(f, flags);
                assert_eq!(v.root, vector.root);
                assert_eq!(v.designated_bridge, vector.root); // CIST-only: designated=root on wire
                assert_eq!(t.max_age, times.max_age);
                assert_eq!(t.forward_delay, times.forward_delay);
            }
            other => panic!("unexpected decode {other:?}"),
        }
    }

    #[test]
    fn rst_round_trips() {
        let flags = CistFlags { proposal: true, agreement: true, ..Default::default() };
        let vector = sample_vector();
        let times = sample_times();
        let bytes = encode_rst(flags, &vector, &times);
        assert!(matches!(decode(&bytes).unwrap(), ReceivedBpdu::Rst { .. }));
    }

    #[test]
    fn mst_round_trips_with_mstis() {
        let flags = CistFlags::default();
        let vector = sample_vector();
        let times = sample_times();
        let mut name = [0u8; 32];
        name[0..4].copy_from_slice(b"rgn1");
        let digest = [0xAAu8; 16];
        let mstis = vec![
            MstiRecord {
                mstid: 1,
                flags: CistFlags::default(),
                regional_root_priority: BridgeIdentifier::new(0x1000, [0; 6]),
                internal_path_cost: 10,
                bridge_id_priority: 0x80,
                port_id_priority: 0x80,
                remaining_hops: 18,
            },
            MstiRecord {
                mstid: 2,
                flags: CistFlags::default(),
                regional_root_priority: BridgeIdentifier::new(0x2000, [0; 6]),
                internal_path_cost: 20,
                bridge_id_priority: 0x80,
                port_id_priority: 0x90,
                remaining_hops: 17,
            },
        ];
        let bytes = encode_mst(flags, &vector, &times, &name, 4, 7, &digest, &mstis);
        match decode(&bytes).unwrap() {
            ReceivedBpdu::Mst { config_name, revision, digest: d, mstis: decoded, .. } => {
                assert_eq!(config_name, name);
                assert_eq!(revision, 7);
                assert_eq!(d, digest);
                assert_eq!(decoded.len(), 2);
                assert_eq!(decoded[0].internal_path_cost, 10);
                assert_eq!(decoded[1].internal_path_cost, 20);
            }
            other => panic!("unexpected decode {other:?}"),
        }
    }

    #[test]
    fn rejects_bad_llc_header() {
        let mut bytes = encode_tcn();
        bytes[0] = 0xff;
        assert_eq!(decode(&bytes).unwrap_err().kind, ErrorKind::MalformedFrame);
    }

    #[test]
    fn rejects_truncated_config() {
        let bytes = encode_config(CistFlags::default(), &sample_vector(), &sample_times());
        assert_eq!(decode(&bytes[..10]).unwrap_err().kind, ErrorKind::MalformedFrame);
    }

    #[test]
    fn rejects_oversized_frame() {
        let bytes = vec![0u8; MAX_FRAME_LEN + 1];
        assert_eq!(decode(&bytes).unwrap_err().kind, ErrorKind::MalformedFrame);
    }

    #[test]
    fn rejects_non_integral_msti_count() {
        let flags = CistFlags::default();
        let vector = sample_vector();
        let times = sample_times();
        let name = [0u8; 32];
        let digest = [0u8; 16];
        let mut bytes = encode_mst(flags, &vector, &times, &name, 0, 0, &digest, &[]);
        // Corrupt v3len so (v3len - 64) isn't a multiple of 16.
        let v3len_off = 3 + 36;
        bytes[v3len_off..v3len_off + 2].copy_from_slice(&70u16.to_be_bytes());
        assert_eq!(decode(&bytes).unwrap_err().kind, ErrorKind::MalformedFrame);
    }
}
