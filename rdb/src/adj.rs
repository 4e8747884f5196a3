// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per peer adjacency RIB.

use crate::config::RibConfig;
use crate::destination::Destination;
use crate::error::Error;
use crate::log::rdb_log;
use crate::path::Path;
use crate::table::{Table, TableSelectOption};
use crate::types::PolicyDirection;
use crate::MOD_ADJ;
use bgp::nlri::RouteFamily;
use slog::Logger;
use std::collections::BTreeMap;
use std::rc::Rc;

/// The current path for every (path identifier, prefix) a peer sent or was
/// sent, with a per family count of the entries that passed import policy.
#[derive(Debug)]
pub struct AdjRib {
    id: String,
    table: BTreeMap<RouteFamily, BTreeMap<String, Rc<Path>>>,
    accepted: BTreeMap<RouteFamily, usize>,
    log: Logger,
}

fn adj_key(p: &Path) -> String {
    format!("{}:{}", p.path_identifier(), p.nlri())
}

impl AdjRib {
    pub fn new(id: impl Into<String>, families: &[RouteFamily], log: Logger) -> Self {
        Self {
            id: id.into(),
            table: families.iter().map(|f| (*f, BTreeMap::new())).collect(),
            accepted: families.iter().map(|f| (*f, 0)).collect(),
            log,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    fn is_accepted(&self, p: &Path) -> bool {
        p.filtered(&self.id) != PolicyDirection::In
    }

    /// Record advertisements and withdrawals. A path that replaces one
    /// with identical content keeps the original timestamp.
    pub fn update(&mut self, paths: &[Rc<Path>]) {
        for path in paths {
            let family = path.family();
            let key = adj_key(path);
            let accepted = self.is_accepted(path);
            let old = self.table.get(&family).and_then(|t| t.get(&key)).cloned();
            let count = self.accepted.entry(family).or_default();

            if path.is_withdraw() {
                if let Some(old) = old {
                    if old.filtered(&self.id) != PolicyDirection::In {
                        decrement(count);
                    }
                    if let Some(t) = self.table.get_mut(&family) {
                        t.remove(&key);
                    }
                }
                continue;
            }

            match &old {
                Some(old) => {
                    let was = old.filtered(&self.id) != PolicyDirection::In;
                    match (was, accepted) {
                        (false, true) => *count += 1,
                        (true, false) => decrement(count),
                        _ => {}
                    }
                    if old.equal(path) {
                        path.set_timestamp(old.timestamp());
                    }
                }
                None if accepted => *count += 1,
                None => {}
            }
            self.table.entry(family).or_default().insert(key, path.clone());
        }
    }

    /// Entries of `families`. With `accepted_only`, entries rejected by
    /// import policy are left out.
    pub fn path_list(
        &self,
        families: &[RouteFamily],
        accepted_only: bool,
    ) -> Vec<Rc<Path>> {
        families
            .iter()
            .filter_map(|f| self.table.get(f))
            .flat_map(|t| t.values())
            .filter(|p| !accepted_only || self.is_accepted(p))
            .cloned()
            .collect()
    }

    pub fn count(&self, families: &[RouteFamily]) -> usize {
        families
            .iter()
            .filter_map(|f| self.table.get(f))
            .map(|t| t.len())
            .sum()
    }

    pub fn accepted(&self, families: &[RouteFamily]) -> usize {
        families
            .iter()
            .filter_map(|f| self.accepted.get(f))
            .sum()
    }

    /// Forget every entry of `families`.
    pub fn drop(&mut self, families: &[RouteFamily]) {
        for f in families {
            if let Some(t) = self.table.get_mut(f) {
                t.clear();
                self.accepted.insert(*f, 0);
            }
        }
    }

    /// Recount accepted entries after policy verdicts changed outside of
    /// `update`.
    pub fn refresh_accepted_number(&mut self, families: &[RouteFamily]) {
        for f in families {
            if let Some(t) = self.table.get(f) {
                let n = t.values().filter(|p| self.is_accepted(p)).count();
                self.accepted.insert(*f, n);
            }
        }
    }

    /// Replace every entry of `families` with a stale copy keeping this
    /// RIB's verdict, and return the copies.
    pub fn stale_all(&mut self, families: &[RouteFamily]) -> Vec<Rc<Path>> {
        let mut stale = Vec::new();
        for f in families {
            let Some(t) = self.table.get_mut(f) else {
                continue;
            };
            for p in t.values_mut() {
                let n = Rc::new(p.clone_path(false));
                n.filter(&self.id, p.filtered(&self.id));
                n.mark_stale(true);
                *p = n.clone();
                stale.push(n);
            }
        }
        stale
    }

    /// Remove the entries of `families` still marked stale and return a
    /// withdrawal for each.
    pub fn drop_stale(&mut self, families: &[RouteFamily]) -> Vec<Rc<Path>> {
        let mut withdrawn = Vec::new();
        for f in families {
            let Some(t) = self.table.get_mut(f) else {
                continue;
            };
            let keys: Vec<String> = t
                .iter()
                .filter(|(_, p)| p.is_stale())
                .map(|(k, _)| k.clone())
                .collect();
            let count = self.accepted.entry(*f).or_default();
            for k in keys {
                let Some(p) = t.remove(&k) else {
                    continue;
                };
                if p.filtered(&self.id) != PolicyDirection::In {
                    decrement(count);
                }
                withdrawn.push(Rc::new(p.clone_path(true)));
            }
        }
        if !withdrawn.is_empty() {
            rdb_log!(self.log, debug, MOD_ADJ,
                "dropped {} stale paths", withdrawn.len();
                "id" => &self.id
            );
        }
        withdrawn
    }

    /// A table of the entries of `family`, one destination per prefix,
    /// filtered by `option`.
    pub fn select(
        &self,
        family: RouteFamily,
        accepted: bool,
        option: TableSelectOption,
    ) -> Result<Table, Error> {
        let mut by_nlri: BTreeMap<String, Vec<Rc<Path>>> = BTreeMap::new();
        for p in self.path_list(&[family], accepted) {
            by_nlri.entry(p.nlri().to_string()).or_default().push(p);
        }
        let config = RibConfig::default();
        let destinations = by_nlri.into_values().filter_map(|paths| {
            let nlri = paths.first()?.nlri().clone();
            Some(Destination::new(nlri, 0, paths, config))
        });
        let table =
            Table::with_destinations(self.log.clone(), family, config, destinations);
        table.select(&TableSelectOption { adj: true, ..option })
    }
}

/// Remove one accepted entry from a family's count. The count can never
/// be zero here while the table holds an accepted entry.
fn decrement(count: &mut usize) {
    debug_assert!(*count > 0, "accepted count underflow");
    *count = count.saturating_sub(1);
}
