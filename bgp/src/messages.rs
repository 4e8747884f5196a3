// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Path attributes as handed to the RIB by the packet codec, with the
//! canonical encoding used to compare attribute sets byte for byte.

use crate::error::Error;
use crate::nlri::{ExtendedCommunity, Nlri, RouteFamily};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct PathAttribute {
    pub typ: PathAttributeType,
    pub value: PathAttributeValue,
}

impl From<PathAttributeValue> for PathAttribute {
    fn from(v: PathAttributeValue) -> Self {
        let flags = match v {
            PathAttributeValue::Origin(_)
            | PathAttributeValue::AsPath(_)
            | PathAttributeValue::As2Path(_)
            | PathAttributeValue::NextHop(_)
            | PathAttributeValue::LocalPref(_)
            | PathAttributeValue::AtomicAggregate => {
                path_attribute_flags::TRANSITIVE
            }
            PathAttributeValue::Aggregator(_)
            | PathAttributeValue::Communities(_)
            | PathAttributeValue::ExtendedCommunities(_)
            | PathAttributeValue::LargeCommunities(_)
            | PathAttributeValue::As4Path(_)
            | PathAttributeValue::As4Aggregator(_) => {
                path_attribute_flags::OPTIONAL
                    | path_attribute_flags::TRANSITIVE
            }
            _ => path_attribute_flags::OPTIONAL,
        };
        Self {
            typ: PathAttributeType {
                flags,
                type_code: v.type_code(),
            },
            value: v,
        }
    }
}

impl PathAttribute {
    pub fn type_code(&self) -> PathAttributeTypeCode {
        self.typ.type_code
    }

    /// Encode flags, type, length and value. The extended length flag is
    /// set whenever the value does not fit a one octet length.
    pub fn to_wire(&self) -> Result<Vec<u8>, Error> {
        let val = self.value.to_wire()?;
        let mut flags = self.typ.flags & !path_attribute_flags::EXTENDED_LENGTH;
        if val.len() > u8::MAX as usize {
            flags |= path_attribute_flags::EXTENDED_LENGTH;
        }
        let mut buf = vec![flags, self.typ.type_code as u8];
        if flags & path_attribute_flags::EXTENDED_LENGTH != 0 {
            if val.len() > u16::MAX as usize {
                return Err(Error::TooLarge("extended path attribute".into()));
            }
            buf.extend_from_slice(&(val.len() as u16).to_be_bytes());
        } else {
            buf.push(val.len() as u8);
        }
        buf.extend_from_slice(&val);
        Ok(buf)
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct PathAttributeType {
    pub flags: u8,
    pub type_code: PathAttributeTypeCode,
}

pub mod path_attribute_flags {
    pub const OPTIONAL: u8 = 0b10000000;
    pub const TRANSITIVE: u8 = 0b01000000;
    pub const PARTIAL: u8 = 0b00100000;
    pub const EXTENDED_LENGTH: u8 = 0b00010000;
}

#[derive(
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Copy,
    Clone,
    TryFromPrimitive,
    IntoPrimitive,
)]
#[repr(u8)]
pub enum PathAttributeTypeCode {
    /// RFC 4271
    Origin = 1,
    AsPath = 2,
    NextHop = 3,
    MultiExitDisc = 4,
    LocalPref = 5,
    AtomicAggregate = 6,
    Aggregator = 7,

    /// RFC 1997
    Communities = 8,

    /// RFC 4456
    OriginatorId = 9,
    ClusterList = 10,

    /// RFC 4760
    MpReachNlri = 14,

    /// RFC 4360
    ExtendedCommunities = 16,

    /// RFC 6793
    As4Path = 17,
    As4Aggregator = 18,

    /// RFC 8092
    LargeCommunities = 32,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum PathAttributeValue {
    Origin(PathOrigin),
    /// AS_PATH with four octet AS numbers, the form the RIB stores.
    AsPath(Vec<As4PathSegment>),
    /// AS_PATH as received from a two octet speaker, before it has been
    /// merged with AS4_PATH.
    As2Path(Vec<AsPathSegment>),
    NextHop(IpAddr),
    MultiExitDisc(u32),
    LocalPref(u32),
    AtomicAggregate,
    Aggregator(Aggregator),
    Communities(Vec<Community>),
    OriginatorId(Ipv4Addr),
    ClusterList(Vec<Ipv4Addr>),
    MpReachNlri(MpReachNlri),
    ExtendedCommunities(Vec<ExtendedCommunity>),
    As4Path(Vec<As4PathSegment>),
    As4Aggregator(Aggregator),
    LargeCommunities(Vec<LargeCommunity>),
}

impl PathAttributeValue {
    pub fn type_code(&self) -> PathAttributeTypeCode {
        match self {
            Self::Origin(_) => PathAttributeTypeCode::Origin,
            Self::AsPath(_) | Self::As2Path(_) => PathAttributeTypeCode::AsPath,
            Self::NextHop(_) => PathAttributeTypeCode::NextHop,
            Self::MultiExitDisc(_) => PathAttributeTypeCode::MultiExitDisc,
            Self::LocalPref(_) => PathAttributeTypeCode::LocalPref,
            Self::AtomicAggregate => PathAttributeTypeCode::AtomicAggregate,
            Self::Aggregator(_) => PathAttributeTypeCode::Aggregator,
            Self::Communities(_) => PathAttributeTypeCode::Communities,
            Self::OriginatorId(_) => PathAttributeTypeCode::OriginatorId,
            Self::ClusterList(_) => PathAttributeTypeCode::ClusterList,
            Self::MpReachNlri(_) => PathAttributeTypeCode::MpReachNlri,
            Self::ExtendedCommunities(_) => {
                PathAttributeTypeCode::ExtendedCommunities
            }
            Self::As4Path(_) => PathAttributeTypeCode::As4Path,
            Self::As4Aggregator(_) => PathAttributeTypeCode::As4Aggregator,
            Self::LargeCommunities(_) => PathAttributeTypeCode::LargeCommunities,
        }
    }

    pub fn to_wire(&self) -> Result<Vec<u8>, Error> {
        match self {
            Self::Origin(x) => Ok(vec![*x as u8]),
            Self::AsPath(segments) | Self::As4Path(segments) => {
                let mut buf = Vec::new();
                for s in segments {
                    buf.extend_from_slice(&s.to_wire()?);
                }
                Ok(buf)
            }
            Self::As2Path(segments) => {
                let mut buf = Vec::new();
                for s in segments {
                    buf.extend_from_slice(&s.to_wire()?);
                }
                Ok(buf)
            }
            Self::NextHop(addr) => Ok(ip_to_wire(addr)),
            Self::MultiExitDisc(v) | Self::LocalPref(v) => {
                Ok(v.to_be_bytes().into())
            }
            Self::AtomicAggregate => Ok(Vec::new()),
            Self::Aggregator(a) | Self::As4Aggregator(a) => Ok(a.to_wire()),
            Self::Communities(communities) => {
                let mut buf = Vec::new();
                for community in communities {
                    buf.extend_from_slice(&u32::from(*community).to_be_bytes());
                }
                Ok(buf)
            }
            Self::OriginatorId(id) => Ok(id.octets().into()),
            Self::ClusterList(ids) => {
                Ok(ids.iter().flat_map(|id| id.octets()).collect())
            }
            Self::MpReachNlri(mp) => mp.to_wire(),
            Self::ExtendedCommunities(communities) => {
                Ok(communities.iter().flat_map(|c| c.to_wire()).collect())
            }
            Self::LargeCommunities(communities) => {
                Ok(communities.iter().flat_map(|c| c.to_wire()).collect())
            }
        }
    }
}

fn ip_to_wire(addr: &IpAddr) -> Vec<u8> {
    match addr {
        IpAddr::V4(a) => a.octets().into(),
        IpAddr::V6(a) => a.octets().into(),
    }
}

#[derive(
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Clone,
    Copy,
    TryFromPrimitive,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[repr(u8)]
pub enum PathOrigin {
    Igp = 0,
    Egp = 1,
    Incomplete = 2,
}

/// A standard RFC 1997 community. Well known values get their own variant,
/// everything else is carried as `UserDefined`.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Community {
    /// All routes received carrying a communities attribute
    /// containing this value MUST NOT be advertised outside a BGP
    /// confederation boundary.
    NoExport,

    /// All routes received carrying a communities attribute
    /// containing this value MUST NOT be advertised to other BGP
    /// peers.
    NoAdvertise,

    /// All routes received carrying a communities attribute
    /// containing this value MUST NOT be advertised to external BGP
    /// peers.
    NoExportSubConfed,

    /// RFC 8326 graceful shutdown.
    GracefulShutdown,

    /// RFC 9494 long-lived graceful restart stale marker.
    LlgrStale,

    /// RFC 9494 opt out of long-lived graceful restart.
    NoLlgr,

    UserDefined(u32),
}

impl From<u32> for Community {
    fn from(v: u32) -> Self {
        match v {
            0xFFFFFF01 => Self::NoExport,
            0xFFFFFF02 => Self::NoAdvertise,
            0xFFFFFF03 => Self::NoExportSubConfed,
            0xFFFF0000 => Self::GracefulShutdown,
            0xFFFF0006 => Self::LlgrStale,
            0xFFFF0007 => Self::NoLlgr,
            x => Self::UserDefined(x),
        }
    }
}

impl From<Community> for u32 {
    fn from(c: Community) -> u32 {
        match c {
            Community::NoExport => 0xFFFFFF01,
            Community::NoAdvertise => 0xFFFFFF02,
            Community::NoExportSubConfed => 0xFFFFFF03,
            Community::GracefulShutdown => 0xFFFF0000,
            Community::LlgrStale => 0xFFFF0006,
            Community::NoLlgr => 0xFFFF0007,
            Community::UserDefined(x) => x,
        }
    }
}

impl fmt::Display for Community {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoExport => write!(f, "no-export"),
            Self::NoAdvertise => write!(f, "no-advertise"),
            Self::NoExportSubConfed => write!(f, "no-export-subconfed"),
            Self::GracefulShutdown => write!(f, "graceful-shutdown"),
            Self::LlgrStale => write!(f, "llgr-stale"),
            Self::NoLlgr => write!(f, "no-llgr"),
            Self::UserDefined(x) => write!(f, "{}:{}", x >> 16, x & 0xFFFF),
        }
    }
}

/// RFC 8092 large community.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct LargeCommunity {
    pub global_admin: u32,
    pub local_data1: u32,
    pub local_data2: u32,
}

impl LargeCommunity {
    pub fn to_wire(&self) -> [u8; 12] {
        let mut buf = [0u8; 12];
        buf[..4].copy_from_slice(&self.global_admin.to_be_bytes());
        buf[4..8].copy_from_slice(&self.local_data1.to_be_bytes());
        buf[8..].copy_from_slice(&self.local_data2.to_be_bytes());
        buf
    }
}

impl fmt::Display for LargeCommunity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.global_admin, self.local_data1, self.local_data2
        )
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Aggregator {
    pub asn: u32,
    pub address: Ipv4Addr,
}

impl Aggregator {
    pub fn to_wire(&self) -> Vec<u8> {
        let mut buf = self.asn.to_be_bytes().to_vec();
        buf.extend_from_slice(&self.address.octets());
        buf
    }
}

/// RFC 4760 multiprotocol reachable NLRI.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MpReachNlri {
    pub family: RouteFamily,
    pub nexthop: IpAddr,
    pub nlri: Vec<Nlri>,
}

impl MpReachNlri {
    pub fn new(nexthop: IpAddr, nlri: Vec<Nlri>) -> Self {
        let family = match nlri.first() {
            Some(n) => n.family(),
            None if nexthop.is_ipv4() => RouteFamily::Ipv4Unicast,
            None => RouteFamily::Ipv6Unicast,
        };
        Self {
            family,
            nexthop,
            nlri,
        }
    }

    pub fn to_wire(&self) -> Result<Vec<u8>, Error> {
        let mut buf = u16::from(self.family.afi()).to_be_bytes().to_vec();
        buf.push(self.family.safi().into());
        let mut nh = Vec::new();
        if matches!(self.family, RouteFamily::Ipv4Vpn | RouteFamily::Ipv6Vpn)
        {
            // VPN next hops carry a zero route distinguisher.
            nh.extend_from_slice(&[0u8; 8]);
        }
        nh.extend_from_slice(&ip_to_wire(&self.nexthop));
        buf.push(nh.len() as u8);
        buf.extend_from_slice(&nh);
        buf.push(0);
        for n in &self.nlri {
            buf.extend_from_slice(&n.to_wire()?);
        }
        Ok(buf)
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct AsPathSegment {
    pub typ: AsPathType,
    pub value: Vec<u16>,
}

impl AsPathSegment {
    pub fn to_wire(&self) -> Result<Vec<u8>, Error> {
        if self.value.len() > u8::MAX as usize {
            return Err(Error::TooLarge("AS path segment".into()));
        }
        let mut buf = vec![self.typ as u8, self.value.len() as u8];
        for v in &self.value {
            buf.extend_from_slice(&v.to_be_bytes());
        }
        Ok(buf)
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct As4PathSegment {
    pub typ: AsPathType,
    pub value: Vec<u32>,
}

impl As4PathSegment {
    pub fn new(typ: AsPathType, value: Vec<u32>) -> Self {
        Self { typ, value }
    }

    pub fn to_wire(&self) -> Result<Vec<u8>, Error> {
        if self.value.len() > u8::MAX as usize {
            return Err(Error::TooLarge("AS4 path segment".into()));
        }
        let mut buf = vec![self.typ as u8, self.value.len() as u8];
        for v in &self.value {
            buf.extend_from_slice(&v.to_be_bytes());
        }
        Ok(buf)
    }

    /// Number of hops this segment contributes to the AS path length. A set
    /// counts as a single hop and confederation segments do not count.
    pub fn as_len(&self) -> usize {
        match self.typ {
            AsPathType::AsSequence => self.value.len(),
            AsPathType::AsSet => 1,
            AsPathType::AsConfedSequence | AsPathType::AsConfedSet => 0,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, TryFromPrimitive)]
#[repr(u8)]
pub enum AsPathType {
    AsSet = 1,
    AsSequence = 2,
    /// RFC 5065
    AsConfedSequence = 3,
    AsConfedSet = 4,
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::nlri::{Prefix4, RouteTarget};
    use lazy_static::lazy_static;
    use pretty_assertions::assert_eq;
    use pretty_hex::PrettyHex;

    lazy_static! {
        static ref BASE_ATTRS: Vec<PathAttribute> = vec![
            PathAttributeValue::Origin(PathOrigin::Igp).into(),
            PathAttributeValue::AsPath(vec![As4PathSegment::new(
                AsPathType::AsSequence,
                vec![65001, 65002],
            )])
            .into(),
            PathAttributeValue::NextHop(Ipv4Addr::new(192, 0, 2, 1).into())
                .into(),
            PathAttributeValue::MultiExitDisc(10).into(),
        ];
    }

    #[test]
    fn attribute_flags_follow_category() {
        let wk = PathAttribute::from(PathAttributeValue::LocalPref(100));
        assert_eq!(wk.typ.flags, path_attribute_flags::TRANSITIVE);
        let ont = PathAttribute::from(PathAttributeValue::MultiExitDisc(1));
        assert_eq!(ont.typ.flags, path_attribute_flags::OPTIONAL);
        let ot = PathAttribute::from(PathAttributeValue::Communities(vec![
            Community::NoExport,
        ]));
        assert_eq!(
            ot.typ.flags,
            path_attribute_flags::OPTIONAL | path_attribute_flags::TRANSITIVE
        );
    }

    #[test]
    fn base_attributes_to_wire() {
        let mut buf = Vec::new();
        for a in BASE_ATTRS.iter() {
            buf.extend_from_slice(&a.to_wire().unwrap());
        }
        println!("{:?}", buf.hex_dump());
        let expected: Vec<u8> = vec![
            0x40, 1, 1, 0, // origin
            0x40, 2, 10, 2, 2, 0, 0, 0xfd, 0xe9, 0, 0, 0xfd, 0xea, // as path
            0x40, 3, 4, 192, 0, 2, 1, // next hop
            0x80, 4, 4, 0, 0, 0, 10, // med
        ];
        assert_eq!(buf, expected);
    }

    #[test]
    fn extended_length_is_set_for_long_values() {
        let communities = (0..100).map(Community::UserDefined).collect();
        let a = PathAttribute::from(PathAttributeValue::Communities(
            communities,
        ));
        let buf = a.to_wire().unwrap();
        assert_ne!(buf[0] & path_attribute_flags::EXTENDED_LENGTH, 0);
        assert_eq!(u16::from_be_bytes([buf[2], buf[3]]), 400);
    }

    #[test]
    fn community_well_known_values() {
        assert_eq!(Community::from(0xFFFF0006), Community::LlgrStale);
        assert_eq!(u32::from(Community::NoExport), 0xFFFFFF01);
        assert_eq!(Community::from(0x00010002).to_string(), "1:2");
    }

    #[test]
    fn as_segment_lengths() {
        let seq = As4PathSegment::new(AsPathType::AsSequence, vec![1, 2, 3]);
        let set = As4PathSegment::new(AsPathType::AsSet, vec![1, 2, 3]);
        let confed =
            As4PathSegment::new(AsPathType::AsConfedSequence, vec![1, 2]);
        assert_eq!(seq.as_len(), 3);
        assert_eq!(set.as_len(), 1);
        assert_eq!(confed.as_len(), 0);
        let big = As4PathSegment::new(AsPathType::AsSequence, vec![1; 256]);
        assert!(big.to_wire().is_err());
    }

    #[test]
    fn mp_reach_family_from_nlri() {
        let nlri: Nlri = "10.0.0.0/24".parse::<Prefix4>().unwrap().into();
        let mp = MpReachNlri::new("2001:db8::1".parse().unwrap(), vec![nlri]);
        assert_eq!(mp.family, RouteFamily::Ipv4Unicast);
        let buf = mp.to_wire().unwrap();
        // afi 1, safi 1, 16 byte next hop
        assert_eq!(&buf[..4], &[0, 1, 1, 16]);
    }

    #[test]
    fn route_target_extended_community() {
        let rt: RouteTarget = "65000:100".parse().unwrap();
        let ec = ExtendedCommunity::RouteTarget(rt);
        assert_eq!(ec.to_wire(), [0, 2, 0xfd, 0xe8, 0, 0, 0, 100]);
        assert_eq!(ec.to_string(), "RT:65000:100");
    }
}
