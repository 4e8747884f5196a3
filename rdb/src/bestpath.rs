// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::config::SelectionOptions;
use crate::error::Error;
use crate::path::Path;
use bgp::messages::AsPathType;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

/// The rule that ranked a path ahead of the runner up.
#[derive(
    Debug,
    Default,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
)]
pub enum BestPathReason {
    #[default]
    Unknown,
    OnlyPath,
    ReachableNextHop,
    HighestWeight,
    LocalPref,
    LocalOrigin,
    AsPath,
    Origin,
    Med,
    Asn,
    IgpCost,
    RouterId,
    Older,
    NonLlgrStale,
    Disabled,
}

impl fmt::Display for BestPathReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unknown => "Unknown",
            Self::OnlyPath => "Only Path",
            Self::ReachableNextHop => "Reachable Next Hop",
            Self::HighestWeight => "Highest Weight",
            Self::LocalPref => "Local Pref",
            Self::LocalOrigin => "Local Origin",
            Self::AsPath => "AS Path",
            Self::Origin => "Origin",
            Self::Med => "MED",
            Self::Asn => "ASN",
            Self::IgpCost => "IGP Cost",
            Self::RouterId => "Router ID",
            Self::Older => "Older",
            Self::NonLlgrStale => "no LLGR Stale",
            Self::Disabled => "Best Path Calculation Disabled",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Winner {
    First,
    Second,
}

/// A single tie breaking rule. `Ok(None)` means the rule cannot tell the
/// two paths apart.
pub type Comparator =
    fn(&Path, &Path, &SelectionOptions) -> Result<Option<Winner>, Error>;

/// Tie breaking rules in the order they are tried.
pub const COMPARATORS: &[(BestPathReason, Comparator)] = &[
    (BestPathReason::NonLlgrStale, compare_by_llgr_stale),
    (BestPathReason::ReachableNextHop, compare_by_reachable_nexthop),
    (BestPathReason::HighestWeight, compare_by_highest_weight),
    (BestPathReason::LocalPref, compare_by_local_pref),
    (BestPathReason::LocalOrigin, compare_by_local_origin),
    (BestPathReason::AsPath, compare_by_as_path),
    (BestPathReason::Origin, compare_by_origin),
    (BestPathReason::Med, compare_by_med),
    (BestPathReason::Asn, compare_by_asn),
    (BestPathReason::IgpCost, compare_by_igp_cost),
    (BestPathReason::Older, compare_by_age),
    (BestPathReason::RouterId, compare_by_router_id),
];

/// Outcome of ranking the paths of one destination.
#[derive(Debug)]
pub struct Selection {
    pub best: Option<Rc<Path>>,
    pub reason: BestPathReason,
    /// Set when a rule could not order some pair of paths. That pair is
    /// left in the order it was given.
    pub error: Option<Error>,
}

/// Run the rules over `a` and `b` until one decides.
pub fn decide(
    a: &Path,
    b: &Path,
    opts: &SelectionOptions,
) -> Result<Option<(Winner, BestPathReason)>, Error> {
    for (reason, rule) in COMPARATORS {
        if let Some(w) = rule(a, b, opts)? {
            return Ok(Some((w, *reason)));
        }
    }
    Ok(None)
}

/// Stable sort, best first. Paths no rule can separate keep their relative
/// order, as do pairs a rule failed on. The sort always completes; the first
/// failure is returned afterwards.
pub fn sort_paths(
    paths: &mut [Rc<Path>],
    opts: &SelectionOptions,
) -> Result<(), Error> {
    let mut failure = None;
    for i in 1..paths.len() {
        let mut j = i;
        while j > 0 {
            match decide(&paths[j], &paths[j - 1], opts) {
                Ok(Some((Winner::First, _))) => paths.swap(j, j - 1),
                Ok(_) => break,
                Err(e) => {
                    failure.get_or_insert(e);
                    break;
                }
            }
            j -= 1;
        }
    }
    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Rank `paths` in place and pick the best one. A best path whose next hop
/// is unreachable is not reported.
pub fn compute_best(
    paths: &mut [Rc<Path>],
    opts: &SelectionOptions,
) -> Selection {
    let mut selection = Selection {
        best: None,
        reason: BestPathReason::Unknown,
        error: None,
    };
    match paths.len() {
        0 => return selection,
        1 => selection.reason = BestPathReason::OnlyPath,
        _ => {
            selection.error = sort_paths(paths, opts).err();
            if let Ok(Some((_, reason))) = decide(&paths[0], &paths[1], opts)
            {
                selection.reason = reason;
            }
        }
    }

    let first = &paths[0];
    first.set_reason(selection.reason);
    if first.is_nexthop_invalid() {
        selection.reason = BestPathReason::ReachableNextHop;
        return selection;
    }
    selection.best = Some(first.clone());
    selection
}

fn prefer_lower<T: Ord>(a: T, b: T) -> Option<Winner> {
    match a.cmp(&b) {
        Ordering::Less => Some(Winner::First),
        Ordering::Greater => Some(Winner::Second),
        Ordering::Equal => None,
    }
}

fn prefer_true(a: bool, b: bool) -> Option<Winner> {
    prefer_lower(!a, !b)
}

fn compare_by_llgr_stale(
    a: &Path,
    b: &Path,
    _: &SelectionOptions,
) -> Result<Option<Winner>, Error> {
    Ok(prefer_true(!a.is_llgr_stale(), !b.is_llgr_stale()))
}

fn compare_by_reachable_nexthop(
    a: &Path,
    b: &Path,
    _: &SelectionOptions,
) -> Result<Option<Winner>, Error> {
    Ok(prefer_true(!a.is_nexthop_invalid(), !b.is_nexthop_invalid()))
}

// No weight attribute exists.
fn compare_by_highest_weight(
    _: &Path,
    _: &Path,
    _: &SelectionOptions,
) -> Result<Option<Winner>, Error> {
    Ok(None)
}

fn compare_by_local_pref(
    a: &Path,
    b: &Path,
    _: &SelectionOptions,
) -> Result<Option<Winner>, Error> {
    Ok(prefer_lower(b.local_pref(), a.local_pref()))
}

fn compare_by_local_origin(
    a: &Path,
    b: &Path,
    _: &SelectionOptions,
) -> Result<Option<Winner>, Error> {
    if a.source() == b.source() {
        return Ok(None);
    }
    Ok(prefer_true(a.is_local(), b.is_local()))
}

fn compare_by_as_path(
    a: &Path,
    b: &Path,
    opts: &SelectionOptions,
) -> Result<Option<Winner>, Error> {
    if opts.ignore_as_path_length {
        return Ok(None);
    }
    Ok(prefer_lower(a.as_path_len(), b.as_path_len()))
}

fn compare_by_origin(
    a: &Path,
    b: &Path,
    _: &SelectionOptions,
) -> Result<Option<Winner>, Error> {
    let (Some(oa), Some(ob)) = (a.origin(), b.origin()) else {
        return Ok(None);
    };
    Ok(prefer_lower(oa, ob))
}

/// First AS of the first non-empty, non-confederation segment.
fn neighbor_as(p: &Path) -> u32 {
    p.as_path()
        .unwrap_or_default()
        .iter()
        .filter(|s| {
            !matches!(
                s.typ,
                AsPathType::AsConfedSequence | AsPathType::AsConfedSet
            )
        })
        .find_map(|s| s.value.first().copied())
        .unwrap_or(0)
}

/// MED is only meaningful between paths from the same neighboring AS,
/// unless configured otherwise. Missing MED counts as zero.
fn compare_by_med(
    a: &Path,
    b: &Path,
    opts: &SelectionOptions,
) -> Result<Option<Winner>, Error> {
    let internal = a.as_path_len() == 0 && b.as_path_len() == 0;
    let same_as = {
        let asn = neighbor_as(a);
        asn != 0 && asn == neighbor_as(b)
    };
    if !(opts.always_compare_med || internal || same_as) {
        return Ok(None);
    }
    Ok(prefer_lower(a.med().unwrap_or(0), b.med().unwrap_or(0)))
}

fn is_internal(p: &Path) -> bool {
    p.source().confederation || p.is_ibgp()
}

fn compare_by_asn(
    a: &Path,
    b: &Path,
    _: &SelectionOptions,
) -> Result<Option<Winner>, Error> {
    Ok(prefer_true(!is_internal(a), !is_internal(b)))
}

// IGP metrics are not tracked.
fn compare_by_igp_cost(
    _: &Path,
    _: &Path,
    _: &SelectionOptions,
) -> Result<Option<Winner>, Error> {
    Ok(None)
}

/// Between external paths the one received first wins.
fn compare_by_age(
    a: &Path,
    b: &Path,
    opts: &SelectionOptions,
) -> Result<Option<Winner>, Error> {
    if a.is_ibgp() || b.is_ibgp() || opts.external_compare_router_id {
        return Ok(None);
    }
    Ok(prefer_lower(a.timestamp(), b.timestamp()))
}

/// Lowest router id wins. External paths are only compared this way when
/// configured to; comparing an internal with an external path is an error.
fn compare_by_router_id(
    a: &Path,
    b: &Path,
    opts: &SelectionOptions,
) -> Result<Option<Winner>, Error> {
    if a.is_local() && b.is_local() {
        return Ok(None);
    }
    if !opts.external_compare_router_id {
        if !a.is_ibgp() && !b.is_ibgp() {
            return Ok(None);
        }
        if a.is_ibgp() != b.is_ibgp() {
            return Err(Error::RouterIdComparison);
        }
    }
    Ok(prefer_lower(
        u32::from(a.source().id),
        u32::from(b.source().id),
    ))
}

/// True when `a` and `b` are ranked equally for multipath purposes.
pub fn is_equal_cost(a: &Path, b: &Path) -> bool {
    a.compare(b) == Ordering::Equal
}
