// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Property-based tests for path selection, the attribute overlay and
//! adjacency RIB accounting.

use crate::adj::AdjRib;
use crate::bestpath::{BestPathReason, COMPARATORS};
use crate::config::{RibConfig, SelectionOptions};
use crate::destination::Destination;
use crate::path::Path;
use crate::test::{attrs, ebgp_peer, ibgp_peer, new_path, prefix4, test_logger, withdraw};
use crate::types::PolicyDirection;
use bgp::messages::{
    As4PathSegment, AsPathType, Community, PathAttribute,
    PathAttributeValue, PathOrigin,
};
use bgp::nlri::RouteFamily;
use chrono::Utc;
use proptest::prelude::*;
use std::collections::HashSet;
use std::rc::Rc;

const NLRI: &str = "10.10.10.0/24";

/// One advertisement or withdrawal against a single destination.
#[derive(Debug, Clone)]
struct Op {
    peer: u8,
    ibgp: bool,
    path_id: u32,
    withdraw: bool,
    as_path: Vec<u32>,
    med: Option<u32>,
    local_pref: Option<u32>,
    nexthop_invalid: bool,
    no_implicit_withdraw: bool,
}

impl Op {
    fn path(&self) -> Rc<Path> {
        let source = if self.ibgp {
            ibgp_peer(self.peer)
        } else {
            ebgp_peer(self.peer)
        };
        if self.withdraw {
            let w = withdraw(source, prefix4(NLRI));
            w.set_path_identifier(self.path_id);
            return w;
        }
        let mut p = Path::new(
            source,
            prefix4(NLRI),
            false,
            attrs(&self.as_path, "192.0.2.1"),
            Utc::now(),
            self.no_implicit_withdraw,
        );
        if let Some(med) = self.med {
            p.set_path_attr(PathAttributeValue::MultiExitDisc(med).into());
        }
        if let Some(lp) = self.local_pref {
            p.set_path_attr(PathAttributeValue::LocalPref(lp).into());
        }
        p.set_path_identifier(self.path_id);
        p.set_nexthop_invalid(self.nexthop_invalid);
        Rc::new(p)
    }
}

fn as_path_strategy() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(prop_oneof![Just(1299u32), Just(3356), Just(174)], 0..4)
}

fn op_strategy() -> impl Strategy<Value = Op> {
    (
        1u8..5,
        any::<bool>(),
        0u32..3,
        prop::bool::weighted(0.3),
        as_path_strategy(),
        prop::option::of(0u32..3),
        prop::option::of(prop_oneof![Just(100u32), Just(200)]),
        prop::bool::weighted(0.1),
        prop::bool::weighted(0.1),
    )
        .prop_map(
            |(
                peer,
                ibgp,
                path_id,
                withdraw,
                as_path,
                med,
                local_pref,
                nexthop_invalid,
                no_implicit_withdraw,
            )| {
                Op {
                    peer,
                    ibgp,
                    path_id,
                    withdraw,
                    as_path,
                    med,
                    local_pref,
                    nexthop_invalid,
                    no_implicit_withdraw,
                }
            },
        )
}

fn attribute_strategy() -> impl Strategy<Value = PathAttribute> {
    prop_oneof![
        prop_oneof![
            Just(PathOrigin::Igp),
            Just(PathOrigin::Egp),
            Just(PathOrigin::Incomplete)
        ]
        .prop_map(|o| PathAttributeValue::Origin(o).into()),
        as_path_strategy().prop_map(|asns| {
            PathAttributeValue::AsPath(vec![As4PathSegment::new(
                AsPathType::AsSequence,
                asns,
            )])
            .into()
        }),
        any::<u32>().prop_map(|m| PathAttributeValue::MultiExitDisc(m).into()),
        any::<u32>().prop_map(|lp| PathAttributeValue::LocalPref(lp).into()),
        prop::collection::vec(any::<u32>(), 1..4).prop_map(|c| {
            PathAttributeValue::Communities(
                c.into_iter().map(Community::UserDefined).collect(),
            )
            .into()
        }),
    ]
}

fn verdict_strategy() -> impl Strategy<Value = PolicyDirection> {
    prop_oneof![
        Just(PolicyDirection::None),
        Just(PolicyDirection::In),
        Just(PolicyDirection::Import),
        Just(PolicyDirection::Export),
    ]
}

proptest! {
    /// Property: as long as every path may implicitly withdraw its
    /// predecessor, a destination never holds two paths with the same
    /// source and path identifier.
    #[test]
    fn prop_no_duplicate_keys(ops in prop::collection::vec(op_strategy(), 1..30)) {
        let log = test_logger();
        let mut d = Destination::new(prefix4(NLRI), 64, Vec::new(), RibConfig::default());
        for op in ops.iter().filter(|op| !op.no_implicit_withdraw) {
            d.calculate(&log, op.path());
            let mut seen = HashSet::new();
            for p in d.all_known_paths() {
                let key = (p.source().address, p.source().asn, p.path_identifier());
                prop_assert!(seen.insert(key), "duplicate path {}", p);
            }
        }
    }

    /// Property: after a withdrawal no known path keeps the withdrawn
    /// source and path identifier, and every removed path's local
    /// identifier is released.
    #[test]
    fn prop_withdraw_clears_key(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let log = test_logger();
        let mut d = Destination::new(prefix4(NLRI), 64, Vec::new(), RibConfig::default());
        for op in &ops {
            let p = op.path();
            let key = (p.source().address, p.source().asn, p.path_identifier());
            let matching = d
                .all_known_paths()
                .iter()
                .filter(|k| (k.source().address, k.source().asn, k.path_identifier()) == key)
                .count();
            let u = d.calculate(&log, p);
            if !op.withdraw {
                continue;
            }
            prop_assert_eq!(u.withdrawn.len(), matching);
            prop_assert!(d
                .all_known_paths()
                .iter()
                .all(|k| (k.source().address, k.source().asn, k.path_identifier()) != key));
            let freed: HashSet<u32> = u.withdrawn.iter().map(|w| w.local_identifier()).collect();
            prop_assert!(d.all_known_paths().iter().all(|k| !freed.contains(&k.local_identifier())));
        }
    }

    /// Property: the reported best path is the first known path, and it is
    /// missing exactly when there are no paths or the first one has an
    /// unreachable next hop.
    #[test]
    fn prop_best_is_first(ops in prop::collection::vec(op_strategy(), 1..30)) {
        let log = test_logger();
        let mut d = Destination::new(prefix4(NLRI), 64, Vec::new(), RibConfig::default());
        for op in &ops {
            let u = d.calculate(&log, op.path());
            match u.known_paths.first() {
                None => prop_assert!(u.best.is_none()),
                Some(first) if first.is_nexthop_invalid() => {
                    prop_assert!(u.best.is_none());
                    prop_assert_eq!(u.reason, BestPathReason::ReachableNextHop);
                }
                Some(first) => {
                    let best = u.best.as_ref();
                    prop_assert!(best.is_some_and(|b| Rc::ptr_eq(b, first)));
                }
            }
        }
    }

    /// Property: local identifiers of known paths are non-zero and unique.
    #[test]
    fn prop_local_identifiers_unique(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let log = test_logger();
        let mut d = Destination::new(prefix4(NLRI), 4, Vec::new(), RibConfig::default());
        for op in &ops {
            d.calculate(&log, op.path());
            let ids: Vec<u32> = d.all_known_paths().iter().map(|p| p.local_identifier()).collect();
            let unique: HashSet<u32> = ids.iter().copied().collect();
            prop_assert!(!ids.contains(&0));
            prop_assert_eq!(unique.len(), ids.len());
        }
    }

    /// Property: setting an attribute on a layer shows it exactly once and
    /// leaves every other attribute of the parent unchanged.
    #[test]
    fn prop_attribute_round_trip(
        base in prop::collection::vec(attribute_strategy(), 0..5),
        a in attribute_strategy(),
    ) {
        let mut p1 = new_path(ebgp_peer(1), prefix4(NLRI), attrs(&[1299], "192.0.2.1"));
        for b in base {
            p1.set_path_attr(b);
        }
        let p1 = Rc::new(p1);
        let mut p2 = p1.clone_path(false);
        p2.set_path_attr(a.clone());

        let resolved = p2.path_attrs();
        prop_assert_eq!(resolved.iter().filter(|x| x.type_code() == a.type_code()).count(), 1);
        prop_assert!(resolved.contains(&a));
        let others: Vec<&PathAttribute> = resolved.iter().filter(|x| x.type_code() != a.type_code()).collect();
        let expected: Vec<PathAttribute> =
            p1.path_attrs().into_iter().filter(|x| x.type_code() != a.type_code()).collect();
        prop_assert_eq!(others.len(), expected.len());
        for e in &expected {
            prop_assert!(resolved.contains(e));
        }
    }

    /// Property: MED only decides between paths from the same neighboring
    /// AS, between paths without AS hops, or when always compared.
    #[test]
    fn prop_med_gating(
        a in as_path_strategy(),
        b in as_path_strategy(),
        med_a in 0u32..3,
        med_b in 0u32..3,
        always_compare_med in any::<bool>(),
    ) {
        let mut pa = new_path(ebgp_peer(1), prefix4(NLRI), attrs(&a, "192.0.2.1"));
        pa.set_path_attr(PathAttributeValue::MultiExitDisc(med_a).into());
        let mut pb = new_path(ebgp_peer(2), prefix4(NLRI), attrs(&b, "192.0.2.2"));
        pb.set_path_attr(PathAttributeValue::MultiExitDisc(med_b).into());
        let opts = SelectionOptions {
            always_compare_med,
            ..Default::default()
        };

        let Some((_, rule)) = COMPARATORS.iter().find(|(r, _)| *r == BestPathReason::Med) else {
            return Err(TestCaseError::fail("no MED rule"));
        };
        let result = rule(&pa, &pb, &opts).unwrap();
        let comparable = always_compare_med
            || (a.is_empty() && b.is_empty())
            || (!a.is_empty() && a.first() == b.first());
        if !comparable {
            prop_assert!(result.is_none());
        } else {
            prop_assert_eq!(result.is_some(), med_a != med_b);
        }
    }

    /// Property: the accepted count of an adjacency RIB always equals the
    /// number of entries not rejected on import.
    #[test]
    fn prop_adj_accounting(
        ops in prop::collection::vec((0u8..4, prop::bool::weighted(0.3), verdict_strategy()), 1..40)
    ) {
        let families = [RouteFamily::Ipv4Unicast];
        let mut adj = AdjRib::new("10.0.0.9", &families, test_logger());
        let source = ebgp_peer(1);
        for (n, is_withdraw, verdict) in ops {
            let nlri = prefix4(&format!("10.{n}.0.0/16"));
            let p = if is_withdraw {
                withdraw(source.clone(), nlri)
            } else {
                let p = new_path(source.clone(), nlri, attrs(&[1299], "192.0.2.1"));
                p.filter(adj.id(), verdict);
                Rc::new(p)
            };
            adj.update(&[p]);
            let expected = adj
                .path_list(&families, false)
                .iter()
                .filter(|p| p.filtered(adj.id()) != PolicyDirection::In)
                .count();
            prop_assert_eq!(adj.accepted(&families), expected);
            prop_assert_eq!(adj.path_list(&families, true).len(), expected);
        }
    }
}
