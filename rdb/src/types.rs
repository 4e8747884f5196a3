// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use bgp::messages::PathAttributeValue;
use bgp::nlri::{ExtendedCommunity, Prefix, RouteDistinguisher, RouteTarget};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::net::{IpAddr, Ipv4Addr};

/// Identity of the speaker a path was learned from. Locally originated
/// paths have no `address`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PeerInfo {
    pub asn: u32,
    pub id: Ipv4Addr,
    pub local_as: u32,
    pub local_id: Ipv4Addr,
    pub address: Option<IpAddr>,
    pub local_address: Option<IpAddr>,
    pub route_reflector_client: bool,
    pub route_reflector_cluster_id: Ipv4Addr,
    pub multihop_ttl: u8,
    pub confederation: bool,
}

impl Default for PeerInfo {
    fn default() -> Self {
        Self {
            asn: 0,
            id: Ipv4Addr::UNSPECIFIED,
            local_as: 0,
            local_id: Ipv4Addr::UNSPECIFIED,
            address: None,
            local_address: None,
            route_reflector_client: false,
            route_reflector_cluster_id: Ipv4Addr::UNSPECIFIED,
            multihop_ttl: 0,
            confederation: false,
        }
    }
}

impl PeerInfo {
    pub fn is_local(&self) -> bool {
        self.address.is_none()
    }
}

/// Two peers are the same when their AS, router id, local router id and
/// session address agree. The remaining fields describe the session, not
/// the peer.
impl PartialEq for PeerInfo {
    fn eq(&self, other: &Self) -> bool {
        self.asn == other.asn
            && self.id == other.id
            && self.local_id == other.local_id
            && self.address == other.address
    }
}

impl Eq for PeerInfo {}

impl Display for PeerInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Some(address) = self.address else {
            return write!(f, "local");
        };
        write!(f, "{{ {address} | as: {}, id: {}", self.asn, self.id)?;
        if self.route_reflector_client {
            write!(f, ", cluster-id: {}", self.route_reflector_cluster_id)?;
        }
        write!(f, " }}")
    }
}

/// Verdict recorded on a path by the policy engine for one consumer.
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
pub enum PolicyDirection {
    #[default]
    None,
    In,
    Import,
    Export,
}

#[derive(
    Debug,
    Default,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    JsonSchema,
)]
pub enum RpkiValidationResult {
    #[default]
    None,
    NotFound,
    Valid,
    Invalid,
}

impl Display for RpkiValidationResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::NotFound => "not-found",
            Self::Valid => "valid",
            Self::Invalid => "invalid",
        };
        write!(f, "{s}")
    }
}

/// Why an origin was found invalid.
#[derive(
    Debug,
    Default,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    JsonSchema,
)]
pub enum RpkiValidationReason {
    #[default]
    None,
    As,
    Length,
}

#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema,
)]
pub struct Roa {
    pub asn: u32,
    pub prefix: Prefix,
    pub max_length: u8,
}

/// Result of an origin validation run elsewhere. The RIB only carries it.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema,
)]
pub struct Validation {
    pub status: RpkiValidationResult,
    pub reason: RpkiValidationReason,
    pub matched: Vec<Roa>,
    pub unmatched_as: Vec<Roa>,
    pub unmatched_length: Vec<Roa>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vrf {
    pub name: String,
    pub id: u32,
    pub rd: RouteDistinguisher,
    pub import_rt: Vec<RouteTarget>,
    pub export_rt: Vec<RouteTarget>,
}

impl Vrf {
    /// Export route targets as extended communities.
    pub fn export_communities(&self) -> Vec<ExtendedCommunity> {
        self.export_rt
            .iter()
            .copied()
            .map(ExtendedCommunity::RouteTarget)
            .collect()
    }
}

/// A path may be imported into a VRF when any of its route target
/// extended communities is one of the VRF's import targets.
pub fn can_import_to_vrf(vrf: &Vrf, path: &crate::Path) -> bool {
    let Some(attr) = path.get_path_attr(
        bgp::messages::PathAttributeTypeCode::ExtendedCommunities,
    ) else {
        return false;
    };
    let PathAttributeValue::ExtendedCommunities(communities) = &attr.value
    else {
        return false;
    };
    communities.iter().any(|c| match c {
        ExtendedCommunity::RouteTarget(rt) => vrf.import_rt.contains(rt),
        _ => false,
    })
}

/// True when no VRF in `vrfs` still imports `target`. The VRF being torn
/// down must already have been removed from `vrfs`.
pub fn is_last_target_user<'a>(
    vrfs: impl IntoIterator<Item = &'a Vrf>,
    target: &RouteTarget,
) -> bool {
    !vrfs.into_iter().any(|v| v.import_rt.contains(target))
}

/// Counters reported by `Table::info`.
#[derive(
    Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema,
)]
pub struct TableInfo {
    pub num_destination: usize,
    pub num_path: usize,
    pub num_accepted: usize,
}

#[derive(
    Debug,
    Default,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    JsonSchema,
)]
pub enum LookupOption {
    #[default]
    Exact,
    Longer,
    Shorter,
}

/// A prefix query against a table. For EVPN tables `prefix` holds a route
/// type keyword instead of a CIDR.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema,
)]
pub struct LookupPrefix {
    pub prefix: String,
    pub option: LookupOption,
}

impl LookupPrefix {
    pub fn new(prefix: impl Into<String>, option: LookupOption) -> Self {
        Self {
            prefix: prefix.into(),
            option,
        }
    }
}
