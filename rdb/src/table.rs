// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per family destination store.

use crate::config::RibConfig;
use crate::destination::{Destination, DestinationSelectOption, Update};
use crate::error::{Error, InvalidPathError};
use crate::log::rdb_log;
use crate::path::Path;
use crate::radix::{cidr_to_radix_key, RadixTree};
use crate::types::{
    is_last_target_user, LookupOption, LookupPrefix, TableInfo, Vrf,
};
use crate::MOD_TABLE;
use bgp::messages::{PathAttributeTypeCode, PathAttributeValue};
use bgp::nlri::{compare_flowspec, EvpnRouteType, Nlri, Prefix, RouteFamily};
use itertools::Itertools;
use slog::Logger;
use std::collections::HashMap;
use std::net::IpAddr;
use std::rc::Rc;

/// Local identifiers a new destination can hand out before growing.
const DESTINATION_ID_MAP_SIZE: usize = 64;

/// Options for `Table::select`. An empty `id` selects the global RIB.
#[derive(Debug, Clone, Default)]
pub struct TableSelectOption {
    pub id: String,
    pub asn: u32,
    pub vrf: Option<Vrf>,
    pub lookup_prefixes: Vec<LookupPrefix>,
    pub best: bool,
    pub multipath: bool,
    /// Keep every known path, as adjacency RIB views do.
    pub adj: bool,
}

impl TableSelectOption {
    fn destination_option(&self) -> DestinationSelectOption {
        DestinationSelectOption {
            id: self.id.clone(),
            asn: self.asn,
            vrf: self.vrf.clone(),
            adj: self.adj,
            best: self.best,
            multipath: self.multipath,
        }
    }
}

/// Every destination of one route family, keyed by NLRI string.
#[derive(Debug)]
pub struct Table {
    family: RouteFamily,
    destinations: HashMap<String, Destination>,
    config: RibConfig,
    log: Logger,
}

impl Table {
    pub fn new(log: Logger, family: RouteFamily, config: RibConfig) -> Self {
        Self {
            family,
            destinations: HashMap::new(),
            config,
            log,
        }
    }

    pub fn with_destinations(
        log: Logger,
        family: RouteFamily,
        config: RibConfig,
        destinations: impl IntoIterator<Item = Destination>,
    ) -> Self {
        let mut t = Self::new(log, family, config);
        for d in destinations {
            t.set_destination(d);
        }
        t
    }

    pub fn family(&self) -> RouteFamily {
        self.family
    }

    pub fn config(&self) -> &RibConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }

    fn set_destination(&mut self, d: Destination) {
        self.destinations.insert(d.nlri().to_string(), d);
    }

    /// Reject paths that do not belong in this table or still carry
    /// attributes the codec should have normalized.
    pub fn validate_path(&self, path: &Path) -> Result<(), InvalidPathError> {
        if path.family() != self.family {
            return Err(InvalidPathError::FamilyMismatch {
                table: self.family,
                path: path.family(),
            });
        }
        if let Some(a) = path.get_path_attr(PathAttributeTypeCode::AsPath) {
            if matches!(a.value, PathAttributeValue::As2Path(_)) {
                return Err(InvalidPathError::UnnormalizedAsPath);
            }
        }
        if path.get_path_attr(PathAttributeTypeCode::As4Path).is_some() {
            return Err(InvalidPathError::As4PathPresent);
        }
        Ok(())
    }

    /// Apply an advertisement or withdrawal to the destination of its
    /// NLRI. Destinations left without paths are removed.
    pub fn update(&mut self, path: Rc<Path>) -> Result<Update, Error> {
        if let Err(e) = self.validate_path(&path) {
            rdb_log!(self.log, error, MOD_TABLE,
                "rejected path: {}", e;
                "family" => self.family.to_string(),
                "path" => path.to_string()
            );
            return Err(e.into());
        }

        let key = path.nlri().to_string();
        let dest = self.destinations.entry(key.clone()).or_insert_with(|| {
            rdb_log!(self.log, debug, MOD_TABLE,
                "create destination";
                "nlri" => &key
            );
            Destination::new(
                path.nlri().clone(),
                DESTINATION_ID_MAP_SIZE,
                Vec::new(),
                self.config,
            )
        });
        let update = dest.calculate(&self.log, path);
        if dest.is_empty() {
            self.destinations.remove(&key);
        }
        Ok(update)
    }

    pub fn destination(&self, nlri: &Nlri) -> Option<&Destination> {
        self.destinations.get(&nlri.to_string())
    }

    pub fn destinations(&self) -> impl Iterator<Item = &Destination> {
        self.destinations.values()
    }

    pub fn delete_destination(&mut self, nlri: &Nlri) -> Option<Destination> {
        self.destinations.remove(&nlri.to_string())
    }

    fn radix_tree(&self) -> RadixTree<&Destination> {
        self.destinations
            .values()
            .filter_map(|d| d.radix_key().map(|k| (k.to_string(), d)))
            .collect()
    }

    /// Destinations in prefix order. Unicast prefixes come covering
    /// prefix first, flow specifications by precedence, anything else by
    /// NLRI string.
    pub fn sorted_destinations(&self) -> Vec<&Destination> {
        match self.family {
            RouteFamily::Ipv4Unicast | RouteFamily::Ipv6Unicast => {
                self.radix_tree().walk().map(|(_, d)| *d).collect()
            }
            f if f.is_flowspec() => self
                .destinations
                .values()
                .sorted_by(|a, b| match (a.nlri(), b.nlri()) {
                    (Nlri::FlowSpec(x), Nlri::FlowSpec(y)) => {
                        compare_flowspec(y, x)
                    }
                    (x, y) => x.to_string().cmp(&y.to_string()),
                })
                .collect(),
            _ => self
                .destinations
                .iter()
                .sorted_by(|(a, _), (b, _)| a.cmp(b))
                .map(|(_, d)| d)
                .collect(),
        }
    }

    /// Destinations covered by the prefix `key`, including `key` itself.
    /// Families without IP prefixes return every destination.
    pub fn longer_prefix_destinations(
        &self,
        key: &str,
    ) -> Result<Vec<&Destination>, Error> {
        match self.family {
            RouteFamily::Ipv4Unicast | RouteFamily::Ipv6Unicast => {
                let k = cidr_to_radix_key(key)?;
                Ok(self.radix_tree().walk_prefix(&k).map(|(_, d)| *d).collect())
            }
            _ => Ok(self.destinations.values().collect()),
        }
    }

    /// EVPN destinations of the route type named by `typ`. Other families
    /// return every destination.
    pub fn evpn_destinations_with_route_type(
        &self,
        typ: &str,
    ) -> Result<Vec<&Destination>, Error> {
        let route_type: EvpnRouteType = typ.parse()?;
        if self.family != RouteFamily::Evpn {
            return Ok(self.destinations.values().collect());
        }
        let mut result = Vec::new();
        for d in self.destinations.values() {
            let Nlri::Evpn(e) = d.nlri() else {
                return Err(Error::Lookup(format!(
                    "invalid evpn nlri type detected: {}",
                    d.nlri()
                )));
            };
            if e.route_type() == route_type {
                result.push(d);
            }
        }
        Ok(result)
    }

    /// Withdrawals for the locally originated paths carrying the route
    /// distinguisher of `vrf`, one per destination.
    pub fn delete_paths_by_vrf(&self, vrf: &Vrf) -> Vec<Rc<Path>> {
        let mut withdrawn = Vec::new();
        for d in self.destinations.values() {
            let rd = match d.nlri() {
                Nlri::Vpn4(_) | Nlri::Vpn6(_) | Nlri::Evpn(_) => d.nlri().rd(),
                _ => return withdrawn,
            };
            if rd != Some(vrf.rd) {
                continue;
            }
            if let Some(p) = d.all_known_paths().iter().find(|p| p.is_local()) {
                withdrawn.push(Rc::new(p.clone_path(true)));
            }
        }
        withdrawn
    }

    /// Withdrawals for the local route target membership advertisements of
    /// the import targets of `vrf` that no VRF in `vrfs` still uses.
    pub fn delete_rtc_paths_by_vrf(&self, vrf: &Vrf, vrfs: &[Vrf]) -> Vec<Rc<Path>> {
        let mut withdrawn = Vec::new();
        if self.family != RouteFamily::RouteTargetConstraint {
            return withdrawn;
        }
        for target in &vrf.import_rt {
            if !is_last_target_user(vrfs, target) {
                continue;
            }
            for d in self.destinations.values() {
                let Nlri::RouteTargetMembership(m) = d.nlri() else {
                    continue;
                };
                if m.route_target.as_ref() != Some(target) {
                    continue;
                }
                if let Some(p) = d.all_known_paths().iter().find(|p| p.is_local())
                {
                    withdrawn.push(Rc::new(p.clone_path(true)));
                }
            }
        }
        withdrawn
    }

    /// The best path of every destination as seen by `id`.
    pub fn bests(&self, id: &str, asn: u32) -> Vec<Rc<Path>> {
        self.destinations
            .values()
            .filter_map(|d| d.best_path(id, asn))
            .collect()
    }

    /// The equal cost set of every destination as seen by `id`.
    pub fn multi_bests(&self, id: &str, asn: u32) -> Vec<Vec<Rc<Path>>> {
        self.destinations
            .values()
            .map(|d| d.multi_best_path(id, asn))
            .filter(|paths| !paths.is_empty())
            .collect()
    }

    pub fn known_path_list(&self, id: &str, asn: u32) -> Vec<Rc<Path>> {
        self.destinations
            .values()
            .flat_map(|d| d.known_path_list(id, asn))
            .collect()
    }

    /// A detached copy holding the destinations that match `option`.
    /// Prefix lookups are supported for unicast and EVPN tables only.
    pub fn select(&self, option: &TableSelectOption) -> Result<Table, Error> {
        let dopt = option.destination_option();
        let mut result = Table::new(self.log.clone(), self.family, self.config);

        if option.lookup_prefixes.is_empty() {
            for d in self.destinations.values() {
                if let Some(d) = d.select(&dopt) {
                    result.set_destination(d);
                }
            }
            return Ok(result);
        }

        match self.family {
            RouteFamily::Ipv4Unicast | RouteFamily::Ipv6Unicast => {
                for lookup in &option.lookup_prefixes {
                    self.select_prefix(lookup, &dopt, &mut result)?;
                }
            }
            RouteFamily::Evpn => {
                for lookup in &option.lookup_prefixes {
                    for d in self.evpn_destinations_with_route_type(&lookup.prefix)? {
                        if let Some(d) = d.select(&dopt) {
                            result.set_destination(d);
                        }
                    }
                }
            }
            family => return Err(Error::UnsupportedFamily(family)),
        }
        Ok(result)
    }

    fn select_prefix(
        &self,
        lookup: &LookupPrefix,
        dopt: &DestinationSelectOption,
        result: &mut Table,
    ) -> Result<(), Error> {
        let tree = self.radix_tree();
        let select_into = |result: &mut Table, d: &Destination| -> bool {
            match d.select(dopt) {
                Some(d) => {
                    result.set_destination(d);
                    true
                }
                None => false,
            }
        };

        match lookup.option {
            LookupOption::Longer => {
                let key = cidr_to_radix_key(&lookup.prefix)?;
                for (_, d) in tree.walk_prefix(&key) {
                    select_into(result, *d);
                }
            }
            LookupOption::Shorter => {
                let key = cidr_to_radix_key(&lookup.prefix)?;
                for (_, d) in tree.walk_path(&key) {
                    select_into(result, *d);
                }
            }
            LookupOption::Exact if !lookup.prefix.contains('/') => {
                // A host address matches its longest covering prefix.
                let addr: IpAddr = lookup.prefix.parse().map_err(|_| {
                    Error::Lookup(format!("invalid address: {}", lookup.prefix))
                })?;
                let max = match addr {
                    IpAddr::V4(_) => 32,
                    IpAddr::V6(_) => 128,
                };
                let key = crate::radix::addr_to_radix_key(&Prefix::new(addr, max));
                for (_, d) in tree.walk_path(&key).rev() {
                    if select_into(result, *d) {
                        break;
                    }
                }
            }
            LookupOption::Exact => {
                let prefix: Prefix = lookup.prefix.parse()?;
                if let Some(d) = self.destination(&Nlri::from(prefix)) {
                    select_into(result, d);
                }
            }
        }
        Ok(())
    }

    /// Destination and path counts as seen by `id`. Destinations with no
    /// visible path are not counted.
    pub fn info(&self, id: &str, asn: u32) -> TableInfo {
        let mut info = TableInfo::default();
        for d in self.destinations.values() {
            let n = d.known_path_list(id, asn).len();
            if n > 0 {
                info.num_destination += 1;
                info.num_path += n;
            }
        }
        info
    }
}
