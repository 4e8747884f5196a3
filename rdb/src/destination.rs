// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per prefix path state and best path bookkeeping.

use crate::bestpath::{compute_best, is_equal_cost, BestPathReason};
use crate::bitmap::Bitmap;
use crate::config::RibConfig;
use crate::error::Error;
use crate::log::rdb_log;
use crate::path::Path;
use crate::radix::addr_to_radix_key;
use crate::types::{can_import_to_vrf, PolicyDirection, Vrf};
use crate::{GLOBAL_RIB_NAME, MOD_DESTINATION};
use bgp::nlri::{Nlri, RouteFamily};
use slog::Logger;
use std::fmt;
use std::rc::Rc;

/// All known paths to one NLRI. After `calculate` the paths are ranked,
/// best first.
#[derive(Debug)]
pub struct Destination {
    family: RouteFamily,
    nlri: Nlri,
    known_paths: Vec<Rc<Path>>,
    local_ids: Bitmap,
    radix_key: Option<String>,
    config: RibConfig,
}

/// Filters for `Destination::select`. An empty `id` selects the global
/// RIB.
#[derive(Debug, Clone, Default)]
pub struct DestinationSelectOption {
    pub id: String,
    pub asn: u32,
    pub vrf: Option<Vrf>,
    /// Every known path, ignoring policy verdicts and VRF import.
    pub adj: bool,
    pub best: bool,
    pub multipath: bool,
}

impl DestinationSelectOption {
    fn rib_id(&self) -> &str {
        if self.id.is_empty() {
            GLOBAL_RIB_NAME
        } else {
            &self.id
        }
    }
}

impl Destination {
    /// Identifiers up to `map_size` are tracked without growing. Identifier
    /// zero marks a path without one and is never handed out.
    pub fn new(
        nlri: Nlri,
        map_size: usize,
        known_paths: Vec<Rc<Path>>,
        config: RibConfig,
    ) -> Self {
        let mut local_ids = Bitmap::new(map_size);
        if map_size != 0 {
            local_ids.flag(0);
        }
        let radix_key = match &nlri {
            Nlri::Ipv4(_) | Nlri::Ipv6(_) => {
                nlri.ip_prefix().as_ref().map(addr_to_radix_key)
            }
            _ => None,
        };
        Self {
            family: nlri.family(),
            nlri,
            known_paths,
            local_ids,
            radix_key,
            config,
        }
    }

    pub fn family(&self) -> RouteFamily {
        self.family
    }

    pub fn nlri(&self) -> &Nlri {
        &self.nlri
    }

    pub fn radix_key(&self) -> Option<&str> {
        self.radix_key.as_deref()
    }

    pub fn config(&self) -> &RibConfig {
        &self.config
    }

    pub fn is_empty(&self) -> bool {
        self.known_paths.is_empty()
    }

    /// Every known path regardless of policy.
    pub fn all_known_paths(&self) -> &[Rc<Path>] {
        &self.known_paths
    }

    /// Known paths visible to consumer `id` with AS `asn`.
    pub fn known_path_list(&self, id: &str, asn: u32) -> Vec<Rc<Path>> {
        self.known_paths
            .iter()
            .filter(|p| is_visible(p, id, asn))
            .cloned()
            .collect()
    }

    pub fn best_path(&self, id: &str, asn: u32) -> Option<Rc<Path>> {
        best_of(&self.known_paths, id, asn)
    }

    pub fn multi_best_path(&self, id: &str, asn: u32) -> Vec<Rc<Path>> {
        multi_best_of(&self.known_paths, id, asn)
    }

    /// Apply one advertisement or withdrawal and rerank.
    pub fn calculate(&mut self, log: &Logger, new_path: Rc<Path>) -> Update {
        let old_known_paths = self.known_paths.clone();
        let mut new_paths = Vec::new();
        let withdrawn = if new_path.is_withdraw() {
            self.explicit_withdraw(log, new_path)
        } else {
            self.implicit_withdraw(log, &new_path);
            self.known_paths.push(new_path.clone());
            new_paths.push(new_path);
            Vec::new()
        };

        for p in &withdrawn {
            let id = p.local_identifier();
            if id != 0 {
                self.local_ids.unflag(id as usize);
            }
        }
        for p in &self.known_paths {
            if p.local_identifier() == 0 {
                p.set_local_identifier(self.local_ids.allocate() as u32);
            }
        }

        let (best, reason, selection_error) =
            if self.config.selection.disable_best_path_selection {
                (None, BestPathReason::Disabled, None)
            } else {
                let s = compute_best(
                    &mut self.known_paths,
                    &self.config.selection,
                );
                (s.best, s.reason, s.error)
            };
        if let Some(e) = &selection_error {
            rdb_log!(log, error, MOD_DESTINATION,
                "could not rank paths: {}", e;
                "nlri" => self.nlri.to_string()
            );
        }

        Update {
            family: self.family,
            nlri: self.nlri.clone(),
            known_paths: self.known_paths.clone(),
            old_known_paths,
            new_paths,
            withdrawn,
            best,
            reason,
            selection_error,
            use_multiple_paths: self.config.use_multiple_paths,
        }
    }

    /// Drop every known path sharing the withdrawal's source and path
    /// identifier. Returns one withdrawal per removed path, each carrying
    /// the removed path's local identifier.
    fn explicit_withdraw(
        &mut self,
        log: &Logger,
        withdraw: Rc<Path>,
    ) -> Vec<Rc<Path>> {
        if self.known_paths.is_empty() {
            rdb_log!(log, debug, MOD_DESTINATION,
                "withdrawal for a path that was never installed";
                "nlri" => self.nlri.to_string()
            );
            return Vec::new();
        }
        let (removed, kept): (Vec<_>, Vec<_>) = self
            .known_paths
            .drain(..)
            .partition(|p| same_origin(p, &withdraw));
        self.known_paths = kept;

        let Some((first, rest)) = removed.split_first() else {
            rdb_log!(log, warn, MOD_DESTINATION,
                "no matching path for withdrawal";
                "nlri" => self.nlri.to_string(),
                "path" => withdraw.to_string()
            );
            return Vec::new();
        };
        withdraw.set_local_identifier(first.local_identifier());
        let mut withdrawn = vec![withdraw];
        withdrawn.extend(rest.iter().map(|p| Rc::new(p.clone_path(true))));
        withdrawn
    }

    /// Drop the known path the new path replaces, handing its local
    /// identifier over.
    fn implicit_withdraw(&mut self, log: &Logger, new_path: &Path) {
        if new_path.no_implicit_withdraw() {
            return;
        }
        let Some(i) = self.known_paths.iter().position(|p| same_origin(p, new_path))
        else {
            return;
        };
        let old = self.known_paths.remove(i);
        rdb_log!(log, debug, MOD_DESTINATION,
            "implicit withdrawal of old path";
            "nlri" => self.nlri.to_string(),
            "path" => old.to_string()
        );
        new_path.set_local_identifier(old.local_identifier());
    }

    /// A detached copy restricted by `opt`. `None` when no path survives
    /// the filters.
    pub fn select(&self, opt: &DestinationSelectOption) -> Option<Destination> {
        let id = opt.rib_id();
        let mut paths = if opt.adj {
            self.known_paths.clone()
        } else {
            let mut paths = self.known_path_list(id, opt.asn);
            if let Some(vrf) = &opt.vrf {
                paths = paths
                    .iter()
                    .filter(|p| can_import_to_vrf(vrf, p))
                    .map(|p| p.to_local())
                    .collect();
            }
            if paths.is_empty() {
                return None;
            }
            paths
        };
        if !opt.adj && opt.best {
            paths = if opt.multipath {
                let first = paths[0].clone();
                paths
                    .into_iter()
                    .filter(|p| is_equal_cost(&first, p))
                    .collect()
            } else {
                paths.truncate(1);
                paths
            };
        }

        let known_paths = paths
            .iter()
            .map(|p| {
                let c = p.clone_path(p.is_withdraw());
                c.filter("", p.filtered(id));
                Rc::new(c)
            })
            .collect();
        Some(Destination::new(self.nlri.clone(), 0, known_paths, self.config))
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Destination NLRI: {}", self.nlri)
    }
}

/// Same advertising peer and same received path identifier.
fn same_origin(a: &Path, b: &Path) -> bool {
    a.source() == b.source() && a.path_identifier() == b.path_identifier()
}

/// Paths a route server client must not see: its own routes and routes
/// that already crossed its AS.
fn rs_filter(p: &Path, id: &str, asn: u32) -> bool {
    if id == GLOBAL_RIB_NAME {
        return false;
    }
    let own = p.source().address.is_some_and(|a| a.to_string() == id);
    own || (asn != 0 && p.as_list().contains(&asn))
}

fn is_visible(p: &Path, id: &str, asn: u32) -> bool {
    p.filtered(id) == PolicyDirection::None && !rs_filter(p, id, asn)
}

fn best_of(paths: &[Rc<Path>], id: &str, asn: u32) -> Option<Rc<Path>> {
    paths
        .iter()
        .find(|p| is_visible(p, id, asn) && !p.is_nexthop_invalid())
        .cloned()
}

fn multi_best_of(paths: &[Rc<Path>], id: &str, asn: u32) -> Vec<Rc<Path>> {
    let mut candidates = paths
        .iter()
        .filter(|p| is_visible(p, id, asn) && !p.is_nexthop_invalid());
    let Some(best) = candidates.next() else {
        return Vec::new();
    };
    std::iter::once(best)
        .chain(candidates.filter(|p| is_equal_cost(best, p)))
        .cloned()
        .collect()
}

/// What a consumer should send after a change to one destination.
#[derive(Debug, Default)]
pub struct Changes {
    /// Path to advertise, or a withdrawal when the best path went away.
    pub best: Option<Rc<Path>>,
    /// The previous best path.
    pub old: Option<Rc<Path>>,
    /// The new equal cost set when multipath is on and it changed.
    pub multi: Vec<Rc<Path>>,
}

/// Snapshot of a destination before and after one `calculate`.
#[derive(Debug)]
pub struct Update {
    pub family: RouteFamily,
    pub nlri: Nlri,
    pub known_paths: Vec<Rc<Path>>,
    pub old_known_paths: Vec<Rc<Path>>,
    pub new_paths: Vec<Rc<Path>>,
    pub withdrawn: Vec<Rc<Path>>,
    /// Globally best path, `None` when there is none or it is unreachable.
    pub best: Option<Rc<Path>>,
    pub reason: BestPathReason,
    pub selection_error: Option<Error>,
    pub use_multiple_paths: bool,
}

impl Update {
    /// Compare old and new best paths as seen by consumer `id` with AS
    /// `asn`.
    pub fn get_changes(&self, id: &str, asn: u32, peer_down: bool) -> Changes {
        let old = best_of(&self.old_known_paths, id, asn);
        let best = best_of(&self.known_paths, id, asn);

        let (best, old) = match (best, old) {
            (Some(best), Some(old)) if best.equal(&old) => {
                // Route target membership is always readvertised. A change in
                // next hop reachability is readvertised as well.
                if best.family() == RouteFamily::RouteTargetConstraint
                    || best.is_nexthop_invalid() != old.is_nexthop_invalid()
                {
                    (Some(best), Some(old))
                } else {
                    (None, Some(old))
                }
            }
            (None, None) => (None, None),
            (None, Some(old)) if peer_down => {
                // Paths of a peer that went down are never withdrawn one by
                // one.
                old.set_withdraw(true);
                (Some(old.clone()), Some(old))
            }
            (None, Some(old)) => {
                (Some(Rc::new(old.clone_path(true))), Some(old))
            }
            (best, old) => (best, old),
        };

        let mut multi = Vec::new();
        if id == GLOBAL_RIB_NAME && self.use_multiple_paths {
            let old_multi = multi_best_of(&self.old_known_paths, id, asn);
            let new_multi = multi_best_of(&self.known_paths, id, asn);
            let changed = old_multi.len() != new_multi.len()
                || old_multi.iter().zip(&new_multi).any(|(a, b)| !a.equal(b));
            if changed {
                multi = if new_multi.is_empty() {
                    best.iter().cloned().collect()
                } else {
                    new_multi
                };
            }
        }

        Changes { best, old, multi }
    }

    /// Paths to send to an add-path capable consumer: every new path and a
    /// withdrawal for every removed one.
    pub fn get_add_path_changes(&self) -> Vec<Rc<Path>> {
        self.new_paths
            .iter()
            .cloned()
            .chain(self.withdrawn.iter().map(|p| Rc::new(p.clone_path(true))))
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::SelectionOptions;
    use crate::test::{
        attrs, ebgp_peer, ibgp_peer, new_path, prefix4, test_logger, vrf,
        withdraw,
    };
    use bgp::messages::{PathAttributeValue, PathAttributeTypeCode};
    use bgp::nlri::ExtendedCommunity;
    use pretty_assertions::assert_eq;

    fn dest(config: RibConfig) -> Destination {
        Destination::new(prefix4("10.10.10.0/24"), 64, Vec::new(), config)
    }

    fn ebgp(n: u8, as_path: &[u32]) -> Rc<Path> {
        Rc::new(new_path(
            ebgp_peer(n),
            prefix4("10.10.10.0/24"),
            attrs(as_path, "192.0.2.1"),
        ))
    }

    #[test]
    fn higher_local_pref_wins() {
        let log = test_logger();
        let mut d = dest(RibConfig::default());

        let mut p1 = new_path(
            ibgp_peer(1),
            prefix4("10.10.10.0/24"),
            attrs(&[65001], "192.0.2.1"),
        );
        p1.set_path_attr(PathAttributeValue::LocalPref(100).into());
        let mut p2 = new_path(
            ibgp_peer(2),
            prefix4("10.10.10.0/24"),
            attrs(&[65001], "192.0.2.2"),
        );
        p2.set_path_attr(PathAttributeValue::LocalPref(200).into());
        let p2 = Rc::new(p2);

        let u = d.calculate(&log, Rc::new(p1));
        assert_eq!(u.reason, BestPathReason::OnlyPath);
        let u = d.calculate(&log, p2.clone());
        assert!(Rc::ptr_eq(u.best.as_ref().unwrap(), &p2));
        assert_eq!(u.reason, BestPathReason::LocalPref);
        assert_eq!(p2.reason(), BestPathReason::LocalPref);
        assert!(Rc::ptr_eq(&d.all_known_paths()[0], &p2));
    }

    #[test]
    fn withdraw_of_unknown_path_is_a_noop() {
        let log = test_logger();
        let mut d = dest(RibConfig::default());
        let u = d.calculate(&log, withdraw(ebgp_peer(1), prefix4("10.10.10.0/24")));
        assert!(u.known_paths.is_empty());
        assert!(u.withdrawn.is_empty());
        assert!(u.best.is_none());
        assert!(u.selection_error.is_none());

        d.calculate(&log, ebgp(1, &[65001]));
        let u = d.calculate(&log, withdraw(ebgp_peer(2), prefix4("10.10.10.0/24")));
        assert_eq!(u.known_paths.len(), 1);
        assert!(u.withdrawn.is_empty());
    }

    #[test]
    fn implicit_withdraw_replaces_and_keeps_local_id() {
        let log = test_logger();
        let mut d = dest(RibConfig::default());
        let peer = ebgp_peer(1);
        let a = Rc::new(new_path(
            peer.clone(),
            prefix4("10.10.10.0/24"),
            attrs(&[65001], "192.0.2.1"),
        ));
        d.calculate(&log, a.clone());
        assert_eq!(a.local_identifier(), 1);

        let b = Rc::new(new_path(
            peer.clone(),
            prefix4("10.10.10.0/24"),
            attrs(&[65001, 65009], "192.0.2.1"),
        ));
        let u = d.calculate(&log, b.clone());
        assert_eq!(u.known_paths.len(), 1);
        assert!(Rc::ptr_eq(&u.known_paths[0], &b));
        assert_eq!(b.local_identifier(), 1);

        // a different add-path id is a different path
        let c = new_path(
            peer,
            prefix4("10.10.10.0/24"),
            attrs(&[65001], "192.0.2.1"),
        );
        c.set_path_identifier(2);
        d.calculate(&log, Rc::new(c));
        assert_eq!(d.all_known_paths().len(), 2);
        let mut ids: Vec<u32> = d
            .all_known_paths()
            .iter()
            .map(|p| p.local_identifier())
            .collect();
        ids.sort();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn no_implicit_withdraw_keeps_both() {
        let log = test_logger();
        let mut d = dest(RibConfig::default());
        let peer = ebgp_peer(1);
        d.calculate(&log, ebgp(1, &[65001]));
        let p = Path::new(
            peer,
            prefix4("10.10.10.0/24"),
            false,
            attrs(&[65001], "192.0.2.9"),
            chrono::Utc::now(),
            true,
        );
        d.calculate(&log, Rc::new(p));
        assert_eq!(d.all_known_paths().len(), 2);
    }

    #[test]
    fn explicit_withdraw_frees_local_id() {
        let log = test_logger();
        let mut d = dest(RibConfig::default());
        d.calculate(&log, ebgp(1, &[65001]));
        d.calculate(&log, ebgp(2, &[65002]));
        let u = d.calculate(&log, withdraw(ebgp_peer(1), prefix4("10.10.10.0/24")));
        assert_eq!(u.withdrawn.len(), 1);
        assert_eq!(u.withdrawn[0].local_identifier(), 1);
        assert_eq!(u.known_paths.len(), 1);
        assert_eq!(u.old_known_paths.len(), 2);

        // the freed identifier is handed out again
        let p = ebgp(3, &[65003]);
        d.calculate(&log, p.clone());
        assert_eq!(p.local_identifier(), 1);
    }

    #[test]
    fn explicit_withdraw_removes_every_match() {
        let log = test_logger();
        let mut d = dest(RibConfig::default());
        d.calculate(&log, ebgp(1, &[65001]));
        let dup = Path::new(
            ebgp_peer(1),
            prefix4("10.10.10.0/24"),
            false,
            attrs(&[65001], "192.0.2.9"),
            chrono::Utc::now(),
            true,
        );
        d.calculate(&log, Rc::new(dup));
        d.calculate(&log, ebgp(2, &[65002]));
        assert_eq!(d.all_known_paths().len(), 3);

        let u = d.calculate(&log, withdraw(ebgp_peer(1), prefix4("10.10.10.0/24")));
        assert_eq!(u.withdrawn.len(), 2);
        assert!(u.withdrawn.iter().all(|p| p.is_withdraw()));
        let mut ids: Vec<u32> =
            u.withdrawn.iter().map(|p| p.local_identifier()).collect();
        ids.sort();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(u.known_paths.len(), 1);
        assert_eq!(**d.all_known_paths()[0].source(), *ebgp_peer(2));

        // both identifiers are free again
        let a = ebgp(3, &[65003]);
        d.calculate(&log, a.clone());
        let b = ebgp(4, &[65004]);
        d.calculate(&log, b.clone());
        assert_eq!(a.local_identifier(), 1);
        assert_eq!(b.local_identifier(), 2);
    }

    #[test]
    fn unreachable_best_is_not_reported() {
        let log = test_logger();
        let mut d = dest(RibConfig::default());
        let p = ebgp(1, &[65001]);
        p.set_nexthop_invalid(true);
        let u = d.calculate(&log, p);
        assert!(u.best.is_none());
        assert_eq!(u.reason, BestPathReason::ReachableNextHop);
        assert!(d.best_path(GLOBAL_RIB_NAME, 0).is_none());
    }

    #[test]
    fn disabled_selection_keeps_arrival_order() {
        let log = test_logger();
        let mut d = dest(RibConfig {
            selection: SelectionOptions {
                disable_best_path_selection: true,
                ..Default::default()
            },
            ..Default::default()
        });
        d.calculate(&log, ebgp(1, &[65001, 65002, 65003]));
        let u = d.calculate(&log, ebgp(2, &[65002]));
        assert!(u.best.is_none());
        assert_eq!(u.reason, BestPathReason::Disabled);
        assert_eq!(u.known_paths[0].as_path_len(), 3);
    }

    #[test]
    fn changes_for_new_and_removed_best() {
        let log = test_logger();
        let mut d = dest(RibConfig::default());
        let a = ebgp(1, &[65001]);
        let u = d.calculate(&log, a.clone());
        let c = u.get_changes(GLOBAL_RIB_NAME, 0, false);
        assert!(Rc::ptr_eq(c.best.as_ref().unwrap(), &a));
        assert!(c.old.is_none());
        assert!(c.multi.is_empty());

        // same content again: nothing to send
        let a2 = Rc::new(a.clone_path(false));
        let u = d.calculate(&log, a2);
        let c = u.get_changes(GLOBAL_RIB_NAME, 0, false);
        assert!(c.best.is_none());
        assert!(c.old.is_some());

        let u = d.calculate(&log, withdraw(ebgp_peer(1), prefix4("10.10.10.0/24")));
        let c = u.get_changes(GLOBAL_RIB_NAME, 0, false);
        let best = c.best.unwrap();
        assert!(best.is_withdraw());
        assert!(!Rc::ptr_eq(&best, c.old.as_ref().unwrap()));
        assert!(!c.old.unwrap().is_withdraw());
    }

    #[test]
    fn peer_down_marks_old_best_withdrawn() {
        let log = test_logger();
        let mut d = dest(RibConfig::default());
        let a = ebgp(1, &[65001]);
        d.calculate(&log, a.clone());
        let u = d.calculate(&log, Rc::new(a.clone_path(true)));
        let c = u.get_changes(GLOBAL_RIB_NAME, 0, true);
        assert!(Rc::ptr_eq(c.best.as_ref().unwrap(), c.old.as_ref().unwrap()));
        assert!(a.is_withdraw());
    }

    #[test]
    fn unreachable_only_path_is_withdrawn() {
        let log = test_logger();
        let mut d = dest(RibConfig::default());
        let a = ebgp(1, &[65001]);
        d.calculate(&log, a.clone());
        let b = Rc::new(a.clone_path(false));
        b.set_nexthop_invalid(true);
        let u = d.calculate(&log, b);
        // the only path is now unreachable
        let c = u.get_changes(GLOBAL_RIB_NAME, 0, false);
        assert!(c.best.unwrap().is_withdraw());
    }

    #[test]
    fn multipath_changes() {
        let log = test_logger();
        let mut d = dest(RibConfig {
            use_multiple_paths: true,
            ..Default::default()
        });
        let u = d.calculate(&log, ebgp(1, &[65001]));
        assert_eq!(u.get_changes(GLOBAL_RIB_NAME, 0, false).multi.len(), 1);

        let u = d.calculate(&log, ebgp(2, &[65002]));
        let c = u.get_changes(GLOBAL_RIB_NAME, 0, false);
        assert_eq!(c.multi.len(), 2);
        // the older path stays best so the best path did not change
        assert!(c.best.is_none());

        let u = d.calculate(&log, withdraw(ebgp_peer(1), prefix4("10.10.10.0/24")));
        let c = u.get_changes(GLOBAL_RIB_NAME, 0, false);
        assert_eq!(c.multi.len(), 1);
        assert_eq!(c.best.as_ref().unwrap().source_as(), 65002);
        assert!(Rc::ptr_eq(c.best.as_ref().unwrap(), &c.multi[0]));

        // multipath is only reported for the global RIB
        let u = d.calculate(&log, ebgp(3, &[65003]));
        assert!(u.get_changes("10.0.0.9", 0, false).multi.is_empty());

        let u = d.calculate(&log, withdraw(ebgp_peer(2), prefix4("10.10.10.0/24")));
        let u2 = d.calculate(&log, withdraw(ebgp_peer(3), prefix4("10.10.10.0/24")));
        assert_eq!(u.get_changes(GLOBAL_RIB_NAME, 0, false).multi.len(), 1);
        let c = u2.get_changes(GLOBAL_RIB_NAME, 0, false);
        assert_eq!(c.multi.len(), 1);
        assert!(c.multi[0].is_withdraw());
    }

    #[test]
    fn route_server_filter() {
        let log = test_logger();
        let mut d = dest(RibConfig::default());
        d.calculate(&log, ebgp(1, &[65001]));
        d.calculate(&log, ebgp(2, &[65002, 65009]));

        let own = ebgp_peer(1).address.unwrap().to_string();
        let seen: Vec<u32> = d
            .known_path_list(&own, 0)
            .iter()
            .map(|p| p.source_as())
            .collect();
        assert_eq!(seen, vec![65009]);

        let seen = d.known_path_list("10.0.0.99", 65009);
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].source_as(), 65001);

        // the global RIB sees everything
        assert_eq!(d.known_path_list(GLOBAL_RIB_NAME, 65009).len(), 2);

        d.all_known_paths()[0].filter("10.0.0.99", PolicyDirection::Import);
        assert!(d.best_path("10.0.0.99", 65009).is_none());
    }

    #[test]
    fn select_filters_and_detaches() {
        let log = test_logger();
        let mut d = dest(RibConfig::default());
        d.calculate(&log, ebgp(1, &[65001]));
        d.calculate(&log, ebgp(2, &[65002]));
        d.calculate(&log, ebgp(3, &[65003, 65004]));
        d.all_known_paths()[1].filter(GLOBAL_RIB_NAME, PolicyDirection::Import);

        let all = d.select(&DestinationSelectOption::default()).unwrap();
        assert_eq!(all.all_known_paths().len(), 2);
        assert_eq!(all.all_known_paths()[0].filtered(""), PolicyDirection::None);

        let adj = d
            .select(&DestinationSelectOption {
                adj: true,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(adj.all_known_paths().len(), 3);
        assert_eq!(
            adj.all_known_paths()[1].filtered(""),
            PolicyDirection::Import
        );

        let best = d
            .select(&DestinationSelectOption {
                best: true,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(best.all_known_paths().len(), 1);

        let multi = d
            .select(&DestinationSelectOption {
                best: true,
                multipath: true,
                ..Default::default()
            })
            .unwrap();
        // the filtered path is hidden, the longer AS path is not equal cost
        assert_eq!(multi.all_known_paths().len(), 1);
    }

    #[test]
    fn select_into_vrf() {
        let log = test_logger();
        let red = vrf("red", "65000:100", &["65000:1"], &["65000:1"]);
        let vpn = Nlri::Vpn4(bgp::nlri::LabeledVpnPrefix {
            rd: "65000:100".parse().unwrap(),
            labels: bgp::nlri::LabelStack(vec![100]),
            prefix: "10.1.0.0/16".parse().unwrap(),
        });
        let mut d =
            Destination::new(vpn.clone(), 64, Vec::new(), RibConfig::default());
        let mut p = new_path(ebgp_peer(1), vpn.clone(), attrs(&[65001], "192.0.2.1"));
        p.set_ext_communities(&red.export_communities(), false);
        d.calculate(&log, Rc::new(p));
        let mut q = new_path(ebgp_peer(2), vpn, attrs(&[65002], "192.0.2.2"));
        q.set_ext_communities(
            &[ExtendedCommunity::RouteTarget("65000:7".parse().unwrap())],
            false,
        );
        d.calculate(&log, Rc::new(q));
        assert!(d.radix_key().is_none());

        let local = d
            .select(&DestinationSelectOption {
                vrf: Some(red),
                ..Default::default()
            })
            .unwrap();
        let paths = local.all_known_paths();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].nlri(), &prefix4("10.1.0.0/16"));
        assert!(paths[0]
            .get_path_attr(PathAttributeTypeCode::ExtendedCommunities)
            .is_none());

        let none = d.select(&DestinationSelectOption {
            vrf: Some(vrf("blue", "65000:200", &["65000:9"], &[])),
            ..Default::default()
        });
        assert!(none.is_none());
    }

    #[test]
    fn add_path_changes() {
        let log = test_logger();
        let mut d = dest(RibConfig::default());
        let a = ebgp(1, &[65001]);
        let u = d.calculate(&log, a.clone());
        let l = u.get_add_path_changes();
        assert_eq!(l.len(), 1);
        assert!(Rc::ptr_eq(&l[0], &a));

        let u = d.calculate(&log, withdraw(ebgp_peer(1), prefix4("10.10.10.0/24")));
        let l = u.get_add_path_changes();
        assert_eq!(l.len(), 1);
        assert!(l[0].is_withdraw());
    }

    #[test]
    fn display_and_radix_key() {
        let d = dest(RibConfig::default());
        assert_eq!(d.to_string(), "Destination NLRI: 10.10.10.0/24");
        assert_eq!(d.radix_key(), Some("000010100000101000001010"));
    }
}
