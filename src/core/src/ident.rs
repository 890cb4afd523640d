//! Bridge/port identifiers and VLAN-to-instance mapping (spec.md §3).

use std::cmp::Ordering;

/// 8-byte Bridge Identifier: 4-bit priority, 12-bit system-id-extension,
/// 48-bit MAC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BridgeIdentifier {
    pub priority: u16,
    pub sys_id_ext: u16,
    pub mac: [u8; 6],
}

impl BridgeIdentifier {
    /// Builds the identifier from its CIST priority (a multiple of 4096)
    /// and the 48-bit MAC, with no per-tree extension.
    pub fn new(priority: u16, mac: [u8; 6]) -> Self {
        Self { priority, sys_id_ext: 0, mac }
    }

    /// Returns this identifier re-primed for a given MSTID: bits 0..12 of
    /// the priority field carry the MSTID, bits 12..16 carry the 4-bit
    /// priority (spec.md §3 "priority field distinct per tree").
    pub fn for_tree(&self, mstid: u16) -> Self {
        Self { priority: self.priority, sys_id_ext: mstid & 0x0fff, mac: self.mac }
    }

    /// 8-byte on-wire encoding: priority<<4|sys_id_ext in the first two
    /// octets, MAC in the trailing six.
    pub fn to_bytes(&self) -> [u8; 8] {
        let mut out = [0u8; 8];
        let field = ((self.priority & 0xf000) | (self.sys_id_ext & 0x0fff)) as u16;
        out[0..2].copy_from_slice(&field.to_be_bytes());
        out[2..8].copy_from_slice(&self.mac);
        out
    }

    pub fn from_bytes(b: &[u8; 8]) -> Self {
        let field = u16::from_be_bytes([b[0], b[1]]);
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&b[2..8]);
        Self { priority: field & 0xf000, sys_id_ext: field & 0x0fff, mac }
    }
}

impl PartialOrd for BridgeIdentifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BridgeIdentifier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_bytes().cmp(&other.to_bytes())
    }
}

/// 2-byte Port Identifier: 4-bit priority, 12-bit port number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct PortIdentifier {
    pub priority: u8,
    pub port_number: u16,
}

impl PortIdentifier {
    pub fn new(priority: u8, port_number: u16) -> Self {
        Self { priority, port_number: port_number & 0x0fff }
    }

    pub fn to_bytes(&self) -> [u8; 2] {
        let field = (((self.priority as u16) & 0xf0) << 8) | (self.port_number & 0x0fff);
        field.to_be_bytes()
    }

    pub fn from_bytes(b: &[u8; 2]) -> Self {
        let field = u16::from_be_bytes(*b);
        Self { priority: ((field >> 8) & 0xf0) as u8, port_number: field & 0x0fff }
    }
}

/// 16-bit MST Instance identifier. `0` is the CIST.
pub type Mstid = u16;

pub const CIST_MSTID: Mstid = 0;
pub const MAX_MSTID: Mstid = 4094;

/// Full 4096-entry VID→MSTID table (spec.md §3 invariant: `map[0] =
/// map[4095] = 0`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VidToMstidTable {
    map: Box<[Mstid; 4096]>,
}

impl Default for VidToMstidTable {
    fn default() -> Self {
        Self { map: Box::new([0u16; 4096]) }
    }
}

impl VidToMstidTable {
    /// Builds a table from a full 4096-entry mapping, enforcing the
    /// reserved-VID invariant.
    pub fn from_table(mut table: [Mstid; 4096]) -> Self {
        table[0] = 0;
        table[4095] = 0;
        Self { map: Box::new(table) }
    }

    pub fn get(&self, vid: u16) -> Mstid {
        self.map[(vid & 0x0fff) as usize]
    }

    pub fn set(&mut self, vid: u16, mstid: Mstid) {
        let vid = (vid & 0x0fff) as usize;
        if vid == 0 || vid == 4095 {
            return;
        }
        self.map[vid] = mstid;
    }

    /// Remaps every VID currently pointing at `mstid` back to the CIST.
    /// Used when an MSTI is deleted (spec.md §3 Tree lifecycle).
    pub fn remap_to_cist(&mut self, mstid: Mstid) {
        for v in self.map.iter_mut() {
            if *v == mstid {
                *v = CIST_MSTID;
            }
        }
    }

    /// VIDs assigned to a given MSTID, ascending.
    pub fn vids_for(&self, mstid: Mstid) -> Vec<u16> {
        self.map
            .iter()
            .enumerate()
            .filter(|(_, m)| **m == mstid)
            .map(|(v, _)| v as u16)
            .collect()
    }

    /// 16-bit big-endian encoding of the table, the digest input (spec.md
    /// §3, §6).
    pub fn to_wire(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4096 * 2);
        for m in self.map.iter() {
            out.extend_from_slice(&m.to_be_bytes());
        }
        out
    }
}

/// 16-byte MST configuration digest: HMAC-MD5 over the VID→MSTID table
/// under the fixed key from the standard (spec.md §6).
pub type ConfigurationDigest = [u8; 16];

const DIGEST_KEY: [u8; 16] = [
    0x13, 0xAC, 0x06, 0xA6, 0x2E, 0x47, 0xFD, 0x51, 0xF9, 0x5D, 0x2B, 0xA2,
    0x43, 0xCD, 0x03, 0x46,
];

/// Computes the configuration digest (spec.md §3 `ConfigurationDigest`,
/// §8 P2).
pub fn compute_digest(table: &VidToMstidTable) -> ConfigurationDigest {
    use hmac::{Hmac, Mac};
    use md5::Md5;

    let mut mac = <Hmac<Md5> as Mac>::new_from_slice(&DIGEST_KEY)
        .expect("HMAC can take a key of any length");
    mac.update(&table.to_wire());
    let result = mac.finalize().into_bytes();
    let mut digest = [0u8; 16];
    digest.copy_from_slice(&result);
    digest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bridge_id_round_trip() {
        let id = BridgeIdentifier::new(0x8000, [0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        let bytes = id.to_bytes();
        assert_eq!(BridgeIdentifier::from_bytes(&bytes), id);
    }

    #[test]
    fn bridge_id_orders_by_priority_first() {
        let low = BridgeIdentifier::new(0x0000, [0xff; 6]);
        let high = BridgeIdentifier::new(0x8000, [0x00; 6]);
        assert!(low < high);
    }

    #[test]
    fn port_id_round_trip() {
        let id = PortIdentifier::new(0x80, 12);
        assert_eq!(PortIdentifier::from_bytes(&id.to_bytes()), id);
    }

    #[test]
    fn vid_table_default_reserves_edges() {
        let t = VidToMstidTable::default();
        assert_eq!(t.get(0), 0);
        assert_eq!(t.get(4095), 0);
    }

    #[test]
    fn vid_table_set_ignores_reserved_vids() {
        let mut t = VidToMstidTable::default();
        t.set(0, 7);
        t.set(4095, 7);
        assert_eq!(t.get(0), 0);
        assert_eq!(t.get(4095), 0);
    }

    #[test]
    fn vid_table_remap_to_cist_clears_deleted_msti() {
        let mut t = VidToMstidTable::default();
        t.set(10, 3);
        t.set(20, 3);
        t.set(30, 4);
        t.remap_to_cist(3);
        assert_eq!(t.get(10), 0);
        assert_eq!(t.get(20), 0);
        assert_eq!(t.get(30), 4);
    }

    #[test]
    fn digest_is_deterministic_and_key_sensitive() {
        let mut t = VidToMstidTable::default();
        t.set(5, 1);
        let d1 = compute_digest(&t);
        let d2 = compute_digest(&t);
        assert_eq!(d1, d2);
        t.set(6, 2);
        let d3 = compute_digest(&t);
        assert_ne!(d1, d3);
    }
}
