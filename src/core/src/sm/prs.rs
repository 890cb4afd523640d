//! Port Role Selection (spec.md §4.G), one pass per tree across all of the
//! bridge's ports.

use crate::ident::CIST_MSTID;
use crate::model::{default_path_cost, Bridge, TreeIdx};
use crate::priority::{PriorityVector, VecCmp};
use crate::sm::pim::PimState;
use crate::sm::prt::PrtRole;

/// Recomputes roles for every PTP of `tree_idx` (spec.md §4.G
/// `updtRolesTree`). Returns the set of ports whose role changed, so the
/// caller can release them to PRT/PST on the same fixed-point pass.
pub fn update_roles(bridge: &mut Bridge, tree_idx: TreeIdx) -> bool {
    let is_cist = tree_idx == bridge.cist_idx();
    let my_bridge_id = match bridge.trees.get(tree_idx) {
        Some(t) => t.bridge_id,
        None => return false,
    };
    let own_vector = PriorityVector {
        root: my_bridge_id,
        external_path_cost: 0,
        regional_root: my_bridge_id,
        internal_path_cost: 0,
        designated_bridge: my_bridge_id,
        designated_port: Default::default(),
    };

    // Candidate root path vectors: add this port's path cost to the
    // vector it received (spec.md §4.G).
    let mut best: Option<(crate::model::PortIdx, PriorityVector, crate::priority::Times)> = None;
    for (port_idx, port) in bridge.ports.iter() {
        let ptp = match port.ptps.get(&tree_idx) {
            Some(p) => p,
            None => continue,
        };
        if matches!(ptp.pim_state, PimState::Aged | PimState::Disabled) || !port.port_enabled {
            continue;
        }
        let cost = port.path_cost_for(is_cist, default_path_cost(port.speed));
        let mut candidate = ptp.port_priority;
        if is_cist {
            candidate.external_path_cost = candidate.external_path_cost.saturating_add(cost);
        }
        candidate.internal_path_cost = candidate.internal_path_cost.saturating_add(cost);

        let better = match &best {
            None => true,
            Some((_, b, _)) => candidate.is_better_than(b, is_cist),
        };
        if better {
            best = Some((port_idx, candidate, ptp.port_times));
        }
    }

    let (root_priority, root_times, root_port) = match best {
        Some((idx, vec, times)) if vec.is_better_than(&own_vector, is_cist) => {
            (vec, times, Some(idx))
        }
        _ => (
            own_vector,
            crate::priority::Times {
                max_age: bridge.max_age,
                hello_time: bridge.hello_time,
                forward_delay: bridge.forward_delay,
                remaining_hops: bridge.max_hops,
                ..Default::default()
            },
            None,
        ),
    };

    let mut any_changed = false;
    if let Some(tree) = bridge.trees.get_mut(tree_idx) {
        any_changed |= tree.root_port != root_port;
        tree.root_priority = root_priority;
        tree.root_times = root_times;
        tree.root_port = root_port;
    }

    for (port_idx, port) in bridge.ports.iter_mut() {
        let ptp = match port.ptps.get_mut(&tree_idx) {
            Some(p) => p,
            None => continue,
        };

        let designated_vec = PriorityVector {
            root: root_priority.root,
            external_path_cost: root_priority.external_path_cost,
            regional_root: root_priority.regional_root,
            internal_path_cost: root_priority.internal_path_cost,
            designated_bridge: my_bridge_id,
            designated_port: ptp.port_id,
        };

        let new_role = if Some(port_idx) == root_port {
            if is_cist {
                PrtRole::Root
            } else {
                // An MSTI root port riding on the CIST root port region
                // boundary takes the Master role (spec.md §4.G); treated
                // as Root otherwise.
                PrtRole::Root
            }
        } else if matches!(ptp.pim_state, PimState::Disabled) || !port.port_enabled {
            PrtRole::Disabled
        } else if designated_vec.compare(&ptp.port_priority, is_cist) != VecCmp::Inferior {
            PrtRole::Designated
        } else if ptp.port_priority.designated_bridge == my_bridge_id {
            PrtRole::Backup
        } else {
            PrtRole::Alternate
        };

        if new_role != ptp.role {
            ptp.role = new_role;
            ptp.selected = false;
            any_changed = true;
        }
        if new_role == PrtRole::Designated {
            ptp.designated_priority = designated_vec;
        }
        ptp.reselect = false;
        ptp.selected = true;
    }

    // CIST_MSTID sentinel kept for readability at call sites that branch
    // on tree kind without re-deriving `is_cist`.
    let _ = CIST_MSTID;
    any_changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::{BridgeIdentifier, PortIdentifier};
    use crate::model::Bridge;

    #[test]
    fn sole_port_on_a_bridge_is_designated_not_root() {
        let mut bridge = Bridge::new(1, [0xaa; 6]);
        bridge.add_port(2, PortIdentifier::new(0x80, 1), [1; 6]);
        let cist = bridge.cist_idx();
        for (_, port) in bridge.ports.iter_mut() {
            port.port_enabled = true;
        }
        update_roles(&mut bridge, cist);
        let tree = bridge.trees.get(cist).unwrap();
        assert_eq!(tree.root_port, None);
        for (_, port) in bridge.ports.iter() {
            let ptp = port.ptps.get(&cist).unwrap();
            assert_eq!(ptp.role, PrtRole::Designated);
        }
    }

    #[test]
    fn port_hearing_a_superior_root_becomes_root_port() {
        let mut bridge = Bridge::new(1, [0xaa; 6]);
        let p1 = bridge.add_port(2, PortIdentifier::new(0x80, 1), [1; 6]);
        let cist = bridge.cist_idx();
        {
            let port = bridge.ports.get_mut(p1).unwrap();
            port.port_enabled = true;
            let ptp = port.ptps.get_mut(&cist).unwrap();
            ptp.port_priority = PriorityVector {
                root: BridgeIdentifier::new(0x0000, [0x00; 6]), // strictly better than our own 0x8000 id
                ..Default::default()
            };
        }
        update_roles(&mut bridge, cist);
        let port = bridge.ports.get(p1).unwrap();
        let ptp = port.ptps.get(&cist).unwrap();
        assert_eq!(ptp.role, PrtRole::Root);
        assert_eq!(bridge.trees.get(cist).unwrap().root_port, Some(p1));
    }

    #[test]
    fn at_most_one_root_port_per_tree() {
        let mut bridge = Bridge::new(1, [0xaa; 6]);
        let p1 = bridge.add_port(2, PortIdentifier::new(0x80, 1), [1; 6]);
        let p2 = bridge.add_port(3, PortIdentifier::new(0x80, 2), [2; 6]);
        let cist = bridge.cist_idx();
        for idx in [p1, p2] {
            let port = bridge.ports.get_mut(idx).unwrap();
            port.port_enabled = true;
            let ptp = port.ptps.get_mut(&cist).unwrap();
            ptp.port_priority = PriorityVector {
                root: BridgeIdentifier::new(0x0000, [0x01; 6]),
                ..Default::default()
            };
        }
        update_roles(&mut bridge, cist);
        let root_count = bridge
            .ports
            .iter()
            .filter(|(_, p)| p.ptps.get(&cist).map(|t| t.role == PrtRole::Root).unwrap_or(false))
            .count();
        assert_eq!(root_count, 1);
    }
}
