//! Priority vector algebra (spec.md §4.A).

use std::cmp::Ordering;

use crate::ident::{BridgeIdentifier, PortIdentifier};

/// Result of comparing two priority vectors (spec.md §4.A).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VecCmp {
    Superior,
    Same,
    Inferior,
}

/// A priority vector, spec.md §3: `(Root, ExternalPathCost, RegionalRoot,
/// InternalPathCost, DesignatedBridge, DesignatedPort)`.
///
/// For MSTIs `root` and `external_path_cost` are meaningless (the regional
/// root doubles as root within the region); comparisons on an MSTI vector
/// skip those two fields, matching spec.md §4.A.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityVector {
    pub root: BridgeIdentifier,
    pub external_path_cost: u32,
    pub regional_root: BridgeIdentifier,
    pub internal_path_cost: u32,
    pub designated_bridge: BridgeIdentifier,
    pub designated_port: PortIdentifier,
}

impl Default for PriorityVector {
    fn default() -> Self {
        Self {
            root: BridgeIdentifier::default(),
            external_path_cost: 0,
            regional_root: BridgeIdentifier::default(),
            internal_path_cost: 0,
            designated_bridge: BridgeIdentifier::default(),
            designated_port: PortIdentifier::default(),
        }
    }
}

impl PriorityVector {
    /// Compares `self` against `other`; `is_cist` selects whether the
    /// RootID/ExternalPathCost fields participate (spec.md §4.A).
    pub fn compare(&self, other: &Self, is_cist: bool) -> VecCmp {
        let ord = self.cmp_key(is_cist).cmp(&other.cmp_key(is_cist));
        match ord {
            Ordering::Less => VecCmp::Superior,
            Ordering::Equal => VecCmp::Same,
            Ordering::Greater => VecCmp::Inferior,
        }
    }

    /// True iff `self` is strictly better than `other`.
    pub fn is_better_than(&self, other: &Self, is_cist: bool) -> bool {
        self.compare(other, is_cist) == VecCmp::Superior
    }

    fn cmp_key(&self, is_cist: bool) -> (
        BridgeIdentifier,
        u32,
        BridgeIdentifier,
        u32,
        BridgeIdentifier,
        PortIdentifier,
    ) {
        if is_cist {
            (
                self.root,
                self.external_path_cost,
                self.regional_root,
                self.internal_path_cost,
                self.designated_bridge,
                self.designated_port,
            )
        } else {
            (
                BridgeIdentifier::default(),
                0,
                self.regional_root,
                self.internal_path_cost,
                self.designated_bridge,
                self.designated_port,
            )
        }
    }
}

/// Timer values carried alongside a priority vector (spec.md §3 `Times`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Times {
    pub message_age: u16,
    pub max_age: u8,
    pub hello_time: u8,
    pub forward_delay: u8,
    /// MSTI remaining hops; meaningless for the CIST.
    pub remaining_hops: u8,
}

impl Times {
    /// Ages the CIST message time by at least one second, rounded up
    /// (spec.md §4.A).
    pub fn aged_for_cist(&self) -> Self {
        Self { message_age: self.message_age.saturating_add(1), ..*self }
    }

    /// Message age exceeding max age makes the information stale
    /// (used by PIM to decide Aged vs Current).
    pub fn is_aged(&self) -> bool {
        self.message_age > self.max_age as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vec_with_root(priority: u16) -> PriorityVector {
        PriorityVector {
            root: BridgeIdentifier::new(priority, [0; 6]),
            ..Default::default()
        }
    }

    #[test]
    fn lower_root_id_is_superior_for_cist() {
        let a = vec_with_root(0x0000);
        let b = vec_with_root(0x8000);
        assert_eq!(a.compare(&b, true), VecCmp::Superior);
        assert_eq!(b.compare(&a, true), VecCmp::Inferior);
    }

    #[test]
    fn equal_vectors_compare_same() {
        let a = vec_with_root(0x1000);
        let b = vec_with_root(0x1000);
        assert_eq!(a.compare(&b, true), VecCmp::Same);
    }

    #[test]
    fn msti_comparison_ignores_root_and_external_cost() {
        let mut a = vec_with_root(0x0000);
        let mut b = vec_with_root(0x8000);
        a.external_path_cost = 5;
        b.external_path_cost = 999;
        // Root/external differ but regional root etc are equal -> Same
        assert_eq!(a.compare(&b, false), VecCmp::Same);
    }

    #[test]
    fn total_order_is_reflexive_antisymmetric_transitive() {
        let a = vec_with_root(0x0000);
        let b = vec_with_root(0x4000);
        let c = vec_with_root(0x8000);
        assert_eq!(a.compare(&a, true), VecCmp::Same);
        assert_eq!(a.compare(&b, true), VecCmp::Superior);
        assert_eq!(b.compare(&c, true), VecCmp::Superior);
        assert_eq!(a.compare(&c, true), VecCmp::Superior);
    }

    #[test]
    fn message_age_ages_by_at_least_one_second() {
        let t = Times { message_age: 3, max_age: 20, ..Default::default() };
        assert_eq!(t.aged_for_cist().message_age, 4);
    }

    #[test]
    fn message_age_beyond_max_age_is_aged() {
        let t = Times { message_age: 21, max_age: 20, ..Default::default() };
        assert!(t.is_aged());
        let t2 = Times { message_age: 20, max_age: 20, ..Default::default() };
        assert!(!t2.is_aged());
    }
}
