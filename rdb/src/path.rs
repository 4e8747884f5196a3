// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Route instances and their copy-on-write attribute overlay.
//!
//! A [`Path`] is either a root, which owns the attributes as they were
//! received, or a layer over a parent created by [`Path::clone_path`]. A
//! layer only records the attributes it sets and the attribute types it
//! deletes. Reads resolve from the layer toward the root, so untouched
//! attributes are shared by every version of a route.

use crate::bestpath::BestPathReason;
use crate::bitmap::Bitmap;
use crate::config::RemovePrivateAs;
use crate::error::Error;
use crate::types::{
    PeerInfo, PolicyDirection, RpkiValidationResult, Validation, Vrf,
};
use crate::DEFAULT_LOCAL_PREF;
use bgp::messages::{
    As4PathSegment, AsPathType, Community, LargeCommunity, MpReachNlri,
    PathAttribute, PathAttributeTypeCode, PathAttributeValue, PathOrigin,
};
use bgp::nlri::{
    EvpnRoute, ExtendedCommunity, LabelStack, LabeledVpnPrefix, Nlri, Prefix,
    RouteFamily,
};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::rc::Rc;
use uuid::Uuid;

/// Maximum number of AS numbers in one AS_PATH segment.
const MAX_SEGMENT_LEN: usize = u8::MAX as usize;

/// State shared by every version of a route.
#[derive(Debug)]
pub struct OriginInfo {
    nlri: Nlri,
    source: Rc<PeerInfo>,
    timestamp: Cell<DateTime<Utc>>,
    no_implicit_withdraw: bool,
    validation: RefCell<Option<Validation>>,
    is_from_external: Cell<bool>,
    uuid: Cell<Uuid>,
    stale: Cell<bool>,
    /// Path identifier received from the peer (RFC 7911).
    path_identifier: Cell<u32>,
    /// Identifier assigned by the destination holding the route. Zero
    /// means unassigned.
    local_identifier: Cell<u32>,
}

#[derive(Debug)]
pub struct Path {
    info: Rc<OriginInfo>,
    parent: Option<Rc<Path>>,
    attrs: Vec<PathAttribute>,
    dels: Vec<PathAttributeTypeCode>,
    is_withdraw: Cell<bool>,
    is_nexthop_invalid: Cell<bool>,
    reason: Cell<BestPathReason>,
    filtered: RefCell<HashMap<String, PolicyDirection>>,
}

impl Path {
    pub fn new(
        source: Rc<PeerInfo>,
        nlri: Nlri,
        is_withdraw: bool,
        attrs: Vec<PathAttribute>,
        timestamp: DateTime<Utc>,
        no_implicit_withdraw: bool,
    ) -> Self {
        Self {
            info: Rc::new(OriginInfo {
                nlri,
                source,
                timestamp: Cell::new(timestamp),
                no_implicit_withdraw,
                validation: RefCell::new(None),
                is_from_external: Cell::new(false),
                uuid: Cell::new(Uuid::nil()),
                stale: Cell::new(false),
                path_identifier: Cell::new(0),
                local_identifier: Cell::new(0),
            }),
            parent: None,
            attrs,
            dels: Vec::new(),
            is_withdraw: Cell::new(is_withdraw),
            is_nexthop_invalid: Cell::new(false),
            reason: Cell::new(BestPathReason::default()),
            filtered: RefCell::new(HashMap::new()),
        }
    }

    /// A new layer over this path. Nothing is copied: the layer starts
    /// with no attribute changes and no policy verdicts, and inherits next
    /// hop reachability.
    pub fn clone_path(self: &Rc<Self>, is_withdraw: bool) -> Path {
        Path {
            info: self.info.clone(),
            parent: Some(self.clone()),
            attrs: Vec::new(),
            dels: Vec::new(),
            is_withdraw: Cell::new(is_withdraw),
            is_nexthop_invalid: Cell::new(self.is_nexthop_invalid()),
            reason: Cell::new(BestPathReason::default()),
            filtered: RefCell::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        let mut p = self;
        while let Some(parent) = &p.parent {
            p = parent;
        }
        p
    }

    pub fn origin_info(&self) -> &OriginInfo {
        &self.info
    }

    pub fn nlri(&self) -> &Nlri {
        &self.info.nlri
    }

    pub fn family(&self) -> RouteFamily {
        self.info.nlri.family()
    }

    pub fn source(&self) -> &Rc<PeerInfo> {
        &self.info.source
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.info.timestamp.get()
    }

    pub fn set_timestamp(&self, t: DateTime<Utc>) {
        self.info.timestamp.set(t);
    }

    pub fn is_local(&self) -> bool {
        self.info.source.is_local()
    }

    pub fn is_ibgp(&self) -> bool {
        self.info.source.asn == self.info.source.local_as
    }

    pub fn no_implicit_withdraw(&self) -> bool {
        self.info.no_implicit_withdraw
    }

    pub fn validation(&self) -> Option<Validation> {
        self.info.validation.borrow().clone()
    }

    pub fn validation_status(&self) -> RpkiValidationResult {
        self.info
            .validation
            .borrow()
            .as_ref()
            .map(|v| v.status)
            .unwrap_or_default()
    }

    pub fn set_validation(&self, v: Validation) {
        self.info.validation.replace(Some(v));
    }

    pub fn is_from_external(&self) -> bool {
        self.info.is_from_external.get()
    }

    pub fn set_is_from_external(&self, y: bool) {
        self.info.is_from_external.set(y);
    }

    pub fn uuid(&self) -> Uuid {
        self.info.uuid.get()
    }

    pub fn set_uuid(&self, id: Uuid) {
        self.info.uuid.set(id);
    }

    pub fn assign_new_uuid(&self) {
        self.info.uuid.set(Uuid::new_v4());
    }

    pub fn mark_stale(&self, stale: bool) {
        self.info.stale.set(stale);
    }

    pub fn is_stale(&self) -> bool {
        self.info.stale.get()
    }

    pub fn path_identifier(&self) -> u32 {
        self.info.path_identifier.get()
    }

    pub fn set_path_identifier(&self, id: u32) {
        self.info.path_identifier.set(id);
    }

    pub fn local_identifier(&self) -> u32 {
        self.info.local_identifier.get()
    }

    pub fn set_local_identifier(&self, id: u32) {
        self.info.local_identifier.set(id);
    }

    pub fn is_withdraw(&self) -> bool {
        self.is_withdraw.get()
    }

    pub fn set_withdraw(&self, y: bool) {
        self.is_withdraw.set(y);
    }

    /// Set by next hop tracking when the IGP cannot reach the next hop.
    pub fn is_nexthop_invalid(&self) -> bool {
        self.is_nexthop_invalid.get()
    }

    pub fn set_nexthop_invalid(&self, y: bool) {
        self.is_nexthop_invalid.set(y);
    }

    /// The rule that last ranked this path first.
    pub fn reason(&self) -> BestPathReason {
        self.reason.get()
    }

    pub(crate) fn set_reason(&self, reason: BestPathReason) {
        self.reason.set(reason);
    }

    /// Record the policy verdict for consumer `id`.
    pub fn filter(&self, id: &str, direction: PolicyDirection) {
        self.filtered.borrow_mut().insert(id.to_string(), direction);
    }

    pub fn filtered(&self, id: &str) -> PolicyDirection {
        self.filtered.borrow().get(id).copied().unwrap_or_default()
    }

    /// Resolve one attribute. Deletions at a layer hide everything below
    /// it.
    pub fn get_path_attr(
        &self,
        typ: PathAttributeTypeCode,
    ) -> Option<&PathAttribute> {
        let mut p = self;
        loop {
            if p.dels.contains(&typ) {
                return None;
            }
            if let Some(a) = p.attrs.iter().find(|a| a.type_code() == typ) {
                return Some(a);
            }
            p = p.parent.as_deref()?;
        }
    }

    /// Resolve every attribute. Attributes present at the root keep their
    /// received order; attributes added by later layers follow, ordered by
    /// type code.
    pub fn path_attrs(&self) -> Vec<PathAttribute> {
        let mut deleted = Bitmap::new(u8::MAX as usize + 1);
        let mut modified: BTreeMap<PathAttributeTypeCode, &PathAttribute> =
            BTreeMap::new();
        let mut p = self;
        loop {
            for t in &p.dels {
                deleted.flag(u8::from(*t) as usize);
            }
            let Some(parent) = p.parent.as_deref() else {
                break;
            };
            for a in &p.attrs {
                let t = a.type_code();
                if !deleted.get_flag(u8::from(t) as usize) {
                    modified.entry(t).or_insert(a);
                }
            }
            p = parent;
        }

        let mut list = Vec::with_capacity(p.attrs.len() + modified.len());
        for a in &p.attrs {
            let t = a.type_code();
            if let Some(m) = modified.remove(&t) {
                list.push(m.clone());
            } else if !deleted.get_flag(u8::from(t) as usize) {
                list.push(a.clone());
            }
        }
        list.extend(modified.into_values().cloned());
        list
    }

    /// Set an attribute on this layer, replacing one of the same type.
    pub fn set_path_attr(&mut self, a: PathAttribute) {
        let t = a.type_code();
        self.dels.retain(|d| *d != t);
        match self.attrs.iter_mut().find(|x| x.type_code() == t) {
            Some(x) => *x = a,
            None => self.attrs.push(a),
        }
    }

    /// Delete an attribute type from this layer down.
    pub fn del_path_attr(&mut self, typ: PathAttributeTypeCode) {
        self.attrs.retain(|a| a.type_code() != typ);
        if !self.dels.contains(&typ) {
            self.dels.push(typ);
        }
    }

    pub fn as_path(&self) -> Option<&[As4PathSegment]> {
        match &self.get_path_attr(PathAttributeTypeCode::AsPath)?.value {
            PathAttributeValue::AsPath(segments) => Some(segments),
            _ => None,
        }
    }

    /// Number of AS hops, counting a set as one and ignoring confederation
    /// segments.
    pub fn as_path_len(&self) -> usize {
        self.as_path()
            .map(|segments| segments.iter().map(|s| s.as_len()).sum())
            .unwrap_or(0)
    }

    /// The AS path as operators read it: `{}` around sets, `()` around
    /// confederation sequences and `[]` around confederation sets.
    pub fn as_string(&self) -> String {
        let Some(segments) = self.as_path() else {
            return String::new();
        };
        segments
            .iter()
            .map(|s| match s.typ {
                AsPathType::AsSequence => s.value.iter().join(" "),
                AsPathType::AsSet => format!("{{{}}}", s.value.iter().join(",")),
                AsPathType::AsConfedSequence => {
                    format!("({})", s.value.iter().join(" "))
                }
                AsPathType::AsConfedSet => {
                    format!("[{}]", s.value.iter().join(","))
                }
            })
            .join(" ")
    }

    /// AS numbers of sequences and sets. Confederation segments contribute
    /// a single zero.
    pub fn as_list(&self) -> Vec<u32> {
        self.as_list_of(true)
    }

    /// AS numbers of sequences. Every other segment contributes a single
    /// zero.
    pub fn as_seq_list(&self) -> Vec<u32> {
        self.as_list_of(false)
    }

    fn as_list_of(&self, include_sets: bool) -> Vec<u32> {
        let mut list = Vec::new();
        for s in self.as_path().unwrap_or_default() {
            match s.typ {
                AsPathType::AsSequence => list.extend_from_slice(&s.value),
                AsPathType::AsSet if include_sets => {
                    list.extend_from_slice(&s.value)
                }
                _ => list.push(0),
            }
        }
        list
    }

    /// The originating AS: the last AS of the last segment.
    pub fn source_as(&self) -> u32 {
        self.as_path()
            .and_then(|segments| segments.last())
            .and_then(|s| s.value.last())
            .copied()
            .unwrap_or(0)
    }

    pub fn label_string(&self) -> String {
        match self.nlri() {
            Nlri::Vpn4(v) | Nlri::Vpn6(v) => v.labels.to_string(),
            Nlri::Evpn(EvpnRoute::EthernetAutoDiscovery { label, .. })
            | Nlri::Evpn(EvpnRoute::IpPrefix { label, .. }) => {
                format!("[{label}]")
            }
            Nlri::Evpn(EvpnRoute::MacIpAdvertisement { labels, .. }) => {
                format!("[{}]", labels.0.iter().join(","))
            }
            _ => String::new(),
        }
    }

    /// Prepend `asn` `repeat` times. The AS numbers are merged into the
    /// leading segment when it has the right type, up to the segment size
    /// limit. Whatever does not fit goes into new leading segments.
    pub fn prepend_asn(&mut self, asn: u32, repeat: usize, confed: bool) {
        let typ = if confed {
            AsPathType::AsConfedSequence
        } else {
            AsPathType::AsSequence
        };
        let mut segments = self.as_path().map(<[_]>::to_vec).unwrap_or_default();
        let mut remaining = repeat;

        if let Some(first) = segments.first_mut() {
            if first.typ == typ {
                let room = MAX_SEGMENT_LEN.saturating_sub(first.value.len());
                let n = remaining.min(room);
                let mut value = vec![asn; n];
                value.extend_from_slice(&first.value);
                first.value = value;
                remaining -= n;
            }
        }
        while remaining > 0 {
            let n = remaining.min(MAX_SEGMENT_LEN);
            segments.insert(0, As4PathSegment::new(typ, vec![asn; n]));
            remaining -= n;
        }
        self.set_path_attr(PathAttributeValue::AsPath(segments).into());
    }

    pub fn remove_private_as(&mut self, local_as: u32, option: RemovePrivateAs) {
        if option == RemovePrivateAs::None {
            return;
        }
        let Some(original) = self.as_path() else {
            return;
        };
        let segments = original
            .iter()
            .filter_map(|s| {
                let value: Vec<u32> = s
                    .value
                    .iter()
                    .filter_map(|asn| match is_private_as(*asn) {
                        false => Some(*asn),
                        true if option == RemovePrivateAs::Replace => {
                            Some(local_as)
                        }
                        true => None,
                    })
                    .collect();
                (!value.is_empty()).then(|| As4PathSegment::new(s.typ, value))
            })
            .collect();
        self.set_path_attr(PathAttributeValue::AsPath(segments).into());
    }

    /// Drop confederation segments, keeping sequences and sets.
    pub fn remove_confed_as(&mut self) {
        let Some(original) = self.as_path() else {
            return;
        };
        let segments = original
            .iter()
            .filter(|s| {
                matches!(s.typ, AsPathType::AsSequence | AsPathType::AsSet)
            })
            .cloned()
            .collect();
        self.set_path_attr(PathAttributeValue::AsPath(segments).into());
    }

    /// Replace every occurrence of `peer_as` with `local_as`. Returns this
    /// path when nothing changes, a new layer otherwise.
    pub fn replace_as(self: &Rc<Self>, local_as: u32, peer_as: u32) -> Rc<Path> {
        let Some(original) = self.as_path() else {
            return self.clone();
        };
        if !original.iter().any(|s| s.value.contains(&peer_as)) {
            return self.clone();
        }
        let segments = original
            .iter()
            .map(|s| {
                let value = s
                    .value
                    .iter()
                    .map(|asn| if *asn == peer_as { local_as } else { *asn })
                    .collect();
                As4PathSegment::new(s.typ, value)
            })
            .collect();
        let mut path = self.clone_path(self.is_withdraw());
        path.set_path_attr(PathAttributeValue::AsPath(segments).into());
        Rc::new(path)
    }

    pub fn communities(&self) -> Vec<Community> {
        match self.get_path_attr(PathAttributeTypeCode::Communities) {
            Some(PathAttribute {
                value: PathAttributeValue::Communities(c),
                ..
            }) => c.clone(),
            _ => Vec::new(),
        }
    }

    /// Add to or replace the communities. Replacing with nothing removes
    /// the attribute.
    pub fn set_communities(&mut self, communities: &[Community], replace: bool) {
        if communities.is_empty() && replace {
            self.del_path_attr(PathAttributeTypeCode::Communities);
            return;
        }
        let mut list = if replace { Vec::new() } else { self.communities() };
        list.extend_from_slice(communities);
        self.set_path_attr(PathAttributeValue::Communities(list).into());
    }

    /// Remove the given communities and return how many were removed. The
    /// attribute is deleted when it ends up empty.
    pub fn remove_communities(&mut self, communities: &[Community]) -> usize {
        if communities.is_empty()
            || self
                .get_path_attr(PathAttributeTypeCode::Communities)
                .is_none()
        {
            return 0;
        }
        let (removed, kept): (Vec<_>, Vec<_>) = self
            .communities()
            .into_iter()
            .partition(|c| communities.contains(c));
        if kept.is_empty() {
            self.del_path_attr(PathAttributeTypeCode::Communities);
        } else {
            self.set_path_attr(PathAttributeValue::Communities(kept).into());
        }
        removed.len()
    }

    pub fn is_llgr_stale(&self) -> bool {
        self.communities().contains(&Community::LlgrStale)
    }

    pub fn ext_communities(&self) -> Vec<ExtendedCommunity> {
        match self.get_path_attr(PathAttributeTypeCode::ExtendedCommunities) {
            Some(PathAttribute {
                value: PathAttributeValue::ExtendedCommunities(c),
                ..
            }) => c.clone(),
            _ => Vec::new(),
        }
    }

    pub fn set_ext_communities(
        &mut self,
        exts: &[ExtendedCommunity],
        replace: bool,
    ) {
        let mut list =
            if replace { Vec::new() } else { self.ext_communities() };
        list.extend_from_slice(exts);
        self.set_path_attr(PathAttributeValue::ExtendedCommunities(list).into());
    }

    pub fn large_communities(&self) -> Vec<LargeCommunity> {
        match self.get_path_attr(PathAttributeTypeCode::LargeCommunities) {
            Some(PathAttribute {
                value: PathAttributeValue::LargeCommunities(c),
                ..
            }) => c.clone(),
            _ => Vec::new(),
        }
    }

    pub fn set_large_communities(
        &mut self,
        cs: &[LargeCommunity],
        replace: bool,
    ) {
        let mut list =
            if replace { Vec::new() } else { self.large_communities() };
        list.extend_from_slice(cs);
        self.set_path_attr(PathAttributeValue::LargeCommunities(list).into());
    }

    pub fn med(&self) -> Option<u32> {
        match self.get_path_attr(PathAttributeTypeCode::MultiExitDisc)?.value {
            PathAttributeValue::MultiExitDisc(med) => Some(med),
            _ => None,
        }
    }

    /// Replace the MED with `med`, or add `med` to the current value
    /// (missing counts as zero).
    pub fn set_med(&mut self, med: i64, replace: bool) -> Result<(), Error> {
        let value = if replace { med } else { i64::from(self.med().unwrap_or(0)) + med };
        if value < 0 {
            return Err(Error::MedUnderflow);
        }
        let value = u32::try_from(value).map_err(|_| Error::MedOverflow)?;
        self.set_path_attr(PathAttributeValue::MultiExitDisc(value).into());
        Ok(())
    }

    /// LOCAL_PREF, or the default when the attribute is absent.
    pub fn local_pref(&self) -> u32 {
        match self.get_path_attr(PathAttributeTypeCode::LocalPref) {
            Some(PathAttribute {
                value: PathAttributeValue::LocalPref(lp),
                ..
            }) => *lp,
            _ => DEFAULT_LOCAL_PREF,
        }
    }

    pub fn remove_local_pref(&mut self) {
        if self.get_path_attr(PathAttributeTypeCode::LocalPref).is_some() {
            self.del_path_attr(PathAttributeTypeCode::LocalPref);
        }
    }

    pub fn origin(&self) -> Option<PathOrigin> {
        match self.get_path_attr(PathAttributeTypeCode::Origin)?.value {
            PathAttributeValue::Origin(o) => Some(o),
            _ => None,
        }
    }

    pub fn originator_id(&self) -> Option<Ipv4Addr> {
        match self.get_path_attr(PathAttributeTypeCode::OriginatorId)?.value {
            PathAttributeValue::OriginatorId(id) => Some(id),
            _ => None,
        }
    }

    pub fn cluster_list(&self) -> Option<&[Ipv4Addr]> {
        match &self.get_path_attr(PathAttributeTypeCode::ClusterList)?.value {
            PathAttributeValue::ClusterList(ids) => Some(ids),
            _ => None,
        }
    }

    /// NEXT_HOP, falling back to the MP_REACH_NLRI next hop.
    pub fn nexthop(&self) -> Option<IpAddr> {
        if let Some(PathAttribute {
            value: PathAttributeValue::NextHop(nh),
            ..
        }) = self.get_path_attr(PathAttributeTypeCode::NextHop)
        {
            return Some(*nh);
        }
        match &self.get_path_attr(PathAttributeTypeCode::MpReachNlri)?.value {
            PathAttributeValue::MpReachNlri(mp) => Some(mp.nexthop),
            _ => None,
        }
    }

    /// IPv4 unicast routes with an IPv6 next hop move to MP_REACH_NLRI.
    /// Otherwise whichever next hop attributes are present are rewritten.
    pub fn set_nexthop(&mut self, nexthop: IpAddr) {
        if self.family() == RouteFamily::Ipv4Unicast && nexthop.is_ipv6() {
            self.del_path_attr(PathAttributeTypeCode::NextHop);
            let mp = MpReachNlri::new(nexthop, vec![self.nlri().clone()]);
            self.set_path_attr(PathAttributeValue::MpReachNlri(mp).into());
            return;
        }
        if self.get_path_attr(PathAttributeTypeCode::NextHop).is_some() {
            self.set_path_attr(PathAttributeValue::NextHop(nexthop).into());
        }
        if let Some(PathAttribute {
            value: PathAttributeValue::MpReachNlri(old),
            ..
        }) = self.get_path_attr(PathAttributeTypeCode::MpReachNlri)
        {
            let mp = MpReachNlri::new(nexthop, old.nlri.clone());
            self.set_path_attr(PathAttributeValue::MpReachNlri(mp).into());
        }
    }

    /// Canonical encoding of the resolved attributes. `None` when an
    /// attribute cannot be encoded.
    fn attrs_to_wire(&self) -> Option<Vec<u8>> {
        let mut buf = Vec::new();
        for a in self.path_attrs() {
            buf.extend_from_slice(&a.to_wire().ok()?);
        }
        Some(buf)
    }

    /// Same source object and byte identical attributes.
    pub fn equal(&self, other: &Path) -> bool {
        if !Rc::ptr_eq(self.source(), other.source()) {
            return false;
        }
        match (self.attrs_to_wire(), other.attrs_to_wire()) {
            (Some(a), Some(b)) => a == b,
            _ => self.path_attrs() == other.path_attrs(),
        }
    }

    /// Coarse ranking used to group equal cost paths. `Greater` means this
    /// path is preferred.
    pub fn compare(&self, other: &Path) -> Ordering {
        self.is_local()
            .cmp(&other.is_local())
            .then_with(|| other.is_ibgp().cmp(&self.is_ibgp()))
            .then_with(|| self.local_pref().cmp(&other.local_pref()))
            .then_with(|| other.as_path_len().cmp(&self.as_path_len()))
            .then_with(|| {
                let o = |p: &Path| p.origin().unwrap_or(PathOrigin::Igp);
                o(other).cmp(&o(self))
            })
            .then_with(|| {
                other.med().unwrap_or(0).cmp(&self.med().unwrap_or(0))
            })
    }

    /// Move a VRF route into the global VPN table: unicast prefixes gain
    /// the VRF route distinguisher and a zero label, EVPN MAC/IP and
    /// multicast routes have their route distinguisher rewritten. Other
    /// families are returned as is.
    pub fn to_global(self: &Rc<Self>, vrf: &Vrf) -> Rc<Path> {
        let nlri = match self.nlri() {
            Nlri::Ipv4(p) => Nlri::Vpn4(LabeledVpnPrefix {
                rd: vrf.rd,
                labels: LabelStack(vec![0]),
                prefix: Prefix::V4(*p),
            }),
            Nlri::Ipv6(p) => Nlri::Vpn6(LabeledVpnPrefix {
                rd: vrf.rd,
                labels: LabelStack(vec![0]),
                prefix: Prefix::V6(*p),
            }),
            Nlri::Evpn(e) => Nlri::Evpn(e.with_rd(vrf.rd)),
            _ => return self.clone(),
        };
        let nexthop =
            self.nexthop().unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        let mut path = Path::new(
            self.source().clone(),
            nlri.clone(),
            self.is_withdraw(),
            self.path_attrs(),
            self.timestamp(),
            false,
        );
        path.set_ext_communities(&vrf.export_communities(), false);
        path.del_path_attr(PathAttributeTypeCode::NextHop);
        path.set_path_attr(
            PathAttributeValue::MpReachNlri(MpReachNlri::new(nexthop, vec![nlri]))
                .into(),
        );
        path.set_nexthop_invalid(self.is_nexthop_invalid());
        Rc::new(path)
    }

    /// Move a VPN route into a VRF: the route distinguisher and extended
    /// communities are dropped. Other families are returned as is.
    pub fn to_local(self: &Rc<Self>) -> Rc<Path> {
        let nlri = match self.nlri() {
            Nlri::Vpn4(v) | Nlri::Vpn6(v) => Nlri::from(v.prefix),
            _ => return self.clone(),
        };
        let mut path = Path::new(
            self.source().clone(),
            nlri,
            self.is_withdraw(),
            self.path_attrs(),
            self.timestamp(),
            false,
        );
        path.del_path_attr(PathAttributeTypeCode::ExtendedCommunities);
        if self.family() == RouteFamily::Ipv4Vpn {
            let nexthop = path.nexthop();
            path.del_path_attr(PathAttributeTypeCode::MpReachNlri);
            if let Some(nh) = nexthop {
                path.set_path_attr(PathAttributeValue::NextHop(nh).into());
            }
        }
        path.set_nexthop_invalid(self.is_nexthop_invalid());
        Rc::new(path)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ {} | src: {}", self.nlri(), self.source())?;
        match self.nexthop() {
            Some(nh) => write!(f, ", nh: {nh}")?,
            None => write!(f, ", nh: none")?,
        }
        if self.is_nexthop_invalid() {
            write!(f, " (not reachable)")?;
        }
        if self.is_withdraw() {
            write!(f, ", withdraw")?;
        }
        write!(f, " }}")
    }
}

pub fn is_private_as(asn: u32) -> bool {
    (64512..=65534).contains(&asn) || (4200000000..=4294967294).contains(&asn)
}
