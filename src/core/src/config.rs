//! Validated configuration set-points (spec.md §4.I).
//!
//! Every field of a partial struct is an `Option`: `None` means "leave as
//! is", mirroring the "set flag" the standard pairs with each field. Bounds
//! violations are clamped with a warning rather than rejected, except for
//! `mode`/enum-like fields which are rejected outright (§7.3).

use log::warn;
use serde::{Deserialize, Serialize};

use crate::model::{AdminP2P, ProtocolVersion};

/// Clamps `value` into `0..=max` and reports whether clamping occurred
/// (spec.md §9 Open Question (a): preserve the source's permissive clamp,
/// but warn).
fn clamp_u8(value: u32, max: u8, field: &str) -> u8 {
    if value > max as u32 {
        warn!("{field}={value} exceeds maximum {max}, clamping");
        max
    } else {
        value as u8
    }
}

/// Rounds `value` to the nearest multiple of `step`, clamped to
/// `0..=max` (spec.md §9 Open Question (b)).
fn quantize(value: u32, step: u32, max: u32, field: &str) -> u16 {
    let clamped = value.min(max);
    let rounded = ((clamped + step / 2) / step * step).min(max);
    if rounded != value {
        warn!("{field}={value} rounded to nearest multiple of {step} ({rounded})");
    }
    rounded as u16
}

/// Clamps a path cost into the standard's `1..=210000000` range.
pub fn validate_path_cost(value: u32) -> u32 {
    value.clamp(1, 210_000_000)
}

/// Quantizes a bridge priority to the nearest multiple of 4096.
pub fn validate_bridge_priority(value: u32) -> u16 {
    quantize(value, 4096, 65535, "bridge priority")
}

/// Quantizes a port priority to the nearest multiple of 16, within 0..240.
pub fn validate_port_priority(value: u32) -> u8 {
    quantize(value, 16, 240, "port priority") as u8
}

pub fn validate_max_age(value: u32) -> u8 {
    clamp_u8(value, 255, "max-age")
}

pub fn validate_forward_delay(value: u32) -> u8 {
    clamp_u8(value, 255, "forward-delay")
}

pub fn validate_hello_time(value: u32) -> u8 {
    // The standard permits 1..2s; the source clamps only the upper bound
    // to 255 and warns rather than rejecting out-of-range values.
    clamp_u8(value, 255, "hello-time")
}

pub fn validate_max_hops(value: u32) -> u8 {
    clamp_u8(value, 255, "max-hops")
}

pub fn validate_tx_hold_count(value: u32) -> u8 {
    clamp_u8(value, 255, "tx-hold-count")
}

/// Partial update to a [`crate::model::Bridge`] (spec.md §4.I). Unset
/// fields are left untouched by the Orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PartialBridgeConfig {
    pub max_age: Option<u8>,
    pub forward_delay: Option<u8>,
    pub hello_time: Option<u8>,
    pub tx_hold_count: Option<u8>,
    pub max_hops: Option<u8>,
    pub ageing_time: Option<u32>,
    pub bridge_priority: Option<u16>,
    pub mst_name: Option<([u8; 32], u8)>,
    pub mst_revision: Option<u16>,
    pub protocol_version: Option<ProtocolVersion>,
}

/// Partial update to a [`crate::model::Port`] (spec.md §4.I, §6 port keys).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PartialPortConfig {
    pub admin_edge: Option<bool>,
    pub auto_edge: Option<bool>,
    pub admin_p2p: Option<AdminP2P>,
    pub restricted_role: Option<bool>,
    pub restricted_tcn: Option<bool>,
    pub bpdu_guard: Option<bool>,
    pub bpdu_filter: Option<bool>,
    pub network_port: Option<bool>,
    pub dont_txmt: Option<bool>,
    pub port_priority: Option<u8>,
    pub external_path_cost: Option<u32>,
    pub internal_path_cost: Option<u32>,
}

/// Partial update to a [`crate::model::Tree`] (a single MSTI's or the
/// CIST's per-tree bridge priority; spec.md §6 `mstid` sub-scope `prio`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PartialTreeConfig {
    pub bridge_priority: Option<u16>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_cost_clamps_to_standard_bounds() {
        assert_eq!(validate_path_cost(0), 1);
        assert_eq!(validate_path_cost(999_999_999), 210_000_000);
        assert_eq!(validate_path_cost(1234), 1234);
    }

    #[test]
    fn bridge_priority_rounds_to_nearest_4096() {
        assert_eq!(validate_bridge_priority(100), 0);
        assert_eq!(validate_bridge_priority(4000), 4096);
        assert_eq!(validate_bridge_priority(61000), 61440);
    }

    #[test]
    fn port_priority_rounds_to_nearest_16_within_240() {
        assert_eq!(validate_port_priority(10), 16);
        assert_eq!(validate_port_priority(250), 240);
    }

    #[test]
    fn max_age_clamps_at_255() {
        assert_eq!(validate_max_age(300), 255);
        assert_eq!(validate_max_age(20), 20);
    }
}
