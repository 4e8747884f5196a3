// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Network layer reachability information and the identifiers that scope
//! it: address families, route distinguishers and route targets.

use crate::error::Error;
use itertools::Itertools;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

#[derive(
    Debug,
    PartialEq,
    Eq,
    Copy,
    Clone,
    TryFromPrimitive,
    IntoPrimitive,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[repr(u16)]
pub enum Afi {
    Ipv4 = 1,
    Ipv6 = 2,
    L2Vpn = 25,
}

#[derive(
    Debug,
    PartialEq,
    Eq,
    Copy,
    Clone,
    TryFromPrimitive,
    IntoPrimitive,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[repr(u8)]
pub enum Safi {
    Unicast = 1,
    Evpn = 70,
    MplsVpn = 128,
    RouteTargetConstraint = 132,
    FlowSpecUnicast = 133,
    FlowSpecVpn = 134,
}

/// The address family and subsequent address family pairs a RIB table can
/// be scoped to.
#[derive(
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Copy,
    Clone,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum RouteFamily {
    Ipv4Unicast,
    Ipv6Unicast,
    Ipv4Vpn,
    Ipv6Vpn,
    Evpn,
    RouteTargetConstraint,
    FlowSpecIpv4Unicast,
    FlowSpecIpv6Unicast,
    FlowSpecIpv4Vpn,
    FlowSpecIpv6Vpn,
}

impl RouteFamily {
    pub fn afi(&self) -> Afi {
        match self {
            Self::Ipv4Unicast
            | Self::Ipv4Vpn
            | Self::RouteTargetConstraint
            | Self::FlowSpecIpv4Unicast
            | Self::FlowSpecIpv4Vpn => Afi::Ipv4,
            Self::Ipv6Unicast
            | Self::Ipv6Vpn
            | Self::FlowSpecIpv6Unicast
            | Self::FlowSpecIpv6Vpn => Afi::Ipv6,
            Self::Evpn => Afi::L2Vpn,
        }
    }

    pub fn safi(&self) -> Safi {
        match self {
            Self::Ipv4Unicast | Self::Ipv6Unicast => Safi::Unicast,
            Self::Ipv4Vpn | Self::Ipv6Vpn => Safi::MplsVpn,
            Self::Evpn => Safi::Evpn,
            Self::RouteTargetConstraint => Safi::RouteTargetConstraint,
            Self::FlowSpecIpv4Unicast | Self::FlowSpecIpv6Unicast => {
                Safi::FlowSpecUnicast
            }
            Self::FlowSpecIpv4Vpn | Self::FlowSpecIpv6Vpn => Safi::FlowSpecVpn,
        }
    }

    pub fn is_flowspec(&self) -> bool {
        matches!(
            self,
            Self::FlowSpecIpv4Unicast
                | Self::FlowSpecIpv6Unicast
                | Self::FlowSpecIpv4Vpn
                | Self::FlowSpecIpv6Vpn
        )
    }
}

impl fmt::Display for RouteFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Ipv4Unicast => "ipv4-unicast",
            Self::Ipv6Unicast => "ipv6-unicast",
            Self::Ipv4Vpn => "l3vpn-ipv4-unicast",
            Self::Ipv6Vpn => "l3vpn-ipv6-unicast",
            Self::Evpn => "l2vpn-evpn",
            Self::RouteTargetConstraint => "rtc",
            Self::FlowSpecIpv4Unicast => "ipv4-flowspec",
            Self::FlowSpecIpv6Unicast => "ipv6-flowspec",
            Self::FlowSpecIpv4Vpn => "l3vpn-ipv4-flowspec",
            Self::FlowSpecIpv6Vpn => "l3vpn-ipv6-flowspec",
        };
        write!(f, "{s}")
    }
}

#[derive(
    Debug, Copy, Clone, Serialize, Deserialize, Eq, Hash, PartialEq, JsonSchema,
)]
pub struct Prefix4 {
    pub value: Ipv4Addr,
    pub length: u8,
}

impl PartialOrd for Prefix4 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Prefix4 {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.value != other.value {
            return self.value.cmp(&other.value);
        }
        self.length.cmp(&other.length)
    }
}

impl Prefix4 {
    /// Create a new `Prefix4` from an IP address and net mask. Host bits are
    /// zeroed upon creation.
    /// ```
    /// use bgp::nlri::Prefix4;
    /// use std::net::Ipv4Addr;
    /// let p4 = Prefix4::new(Ipv4Addr::new(10, 0, 0, 10), 24);
    /// assert_eq!(p4.value, Ipv4Addr::new(10, 0, 0, 0));
    /// ```
    pub fn new(ip: Ipv4Addr, length: u8) -> Self {
        let mut new = Self {
            value: ip,
            length: length.min(32),
        };
        new.unset_host_bits();
        new
    }

    pub fn host_bits_are_unset(&self) -> bool {
        let mask = match self.length {
            0 => 0,
            _ => (!0u32) << (32 - self.length),
        };

        self.value.to_bits() & mask == self.value.to_bits()
    }

    pub fn unset_host_bits(&mut self) {
        let mask = match self.length {
            0 => 0,
            _ => (!0u32) << (32 - self.length),
        };

        self.value = Ipv4Addr::from_bits(self.value.to_bits() & mask)
    }

    /// Check if this prefix is contained within another prefix.
    pub fn within(&self, other: &Prefix4) -> bool {
        if self.length < other.length {
            return false;
        }
        if other.length == 0 {
            return true;
        }
        let mask = !0u32 << (32 - other.length);
        self.value.to_bits() & mask == other.value.to_bits() & mask
    }

    /// Length byte followed by the minimum number of prefix octets.
    pub fn to_wire(&self) -> Vec<u8> {
        let n = (self.length as usize).div_ceil(8);
        let mut buf = vec![self.length];
        buf.extend_from_slice(&self.value.octets()[..n]);
        buf
    }
}

impl fmt::Display for Prefix4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.value, self.length)
    }
}

impl FromStr for Prefix4 {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (value, length) = s
            .split_once('/')
            .ok_or(Error::InvalidPrefix(s.to_string()))?;
        let value: Ipv4Addr = value
            .parse()
            .map_err(|_| Error::InvalidPrefix(s.to_string()))?;
        let length: u8 = length
            .parse()
            .map_err(|_| Error::InvalidPrefix(s.to_string()))?;
        if length > 32 {
            return Err(Error::InvalidPrefix(s.to_string()));
        }
        Ok(Self::new(value, length))
    }
}

#[derive(
    Debug, Copy, Clone, Serialize, Deserialize, Hash, Eq, PartialEq, JsonSchema,
)]
pub struct Prefix6 {
    pub value: Ipv6Addr,
    pub length: u8,
}

impl PartialOrd for Prefix6 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Prefix6 {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.value != other.value {
            return self.value.cmp(&other.value);
        }
        self.length.cmp(&other.length)
    }
}

impl fmt::Display for Prefix6 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.value, self.length)
    }
}

impl Prefix6 {
    /// Create a new `Prefix6` from an IP address and net mask. Host bits are
    /// zeroed upon creation.
    pub fn new(ip: Ipv6Addr, length: u8) -> Self {
        let mut new = Self {
            value: ip,
            length: length.min(128),
        };
        new.unset_host_bits();
        new
    }

    pub fn host_bits_are_unset(&self) -> bool {
        let mask = match self.length {
            0 => 0,
            _ => (!0u128) << (128 - self.length),
        };

        self.value.to_bits() & mask == self.value.to_bits()
    }

    pub fn unset_host_bits(&mut self) {
        let mask = match self.length {
            0 => 0,
            _ => (!0u128) << (128 - self.length),
        };

        self.value = Ipv6Addr::from_bits(self.value.to_bits() & mask)
    }

    /// Check if this prefix is contained within another prefix.
    pub fn within(&self, other: &Prefix6) -> bool {
        if self.length < other.length {
            return false;
        }
        if other.length == 0 {
            return true;
        }
        let mask = !0u128 << (128 - other.length);
        self.value.to_bits() & mask == other.value.to_bits() & mask
    }

    pub fn to_wire(&self) -> Vec<u8> {
        let n = (self.length as usize).div_ceil(8);
        let mut buf = vec![self.length];
        buf.extend_from_slice(&self.value.octets()[..n]);
        buf
    }
}

impl FromStr for Prefix6 {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (value, length) = s
            .split_once('/')
            .ok_or(Error::InvalidPrefix(s.to_string()))?;
        let value: Ipv6Addr = value
            .parse()
            .map_err(|_| Error::InvalidPrefix(s.to_string()))?;
        let length: u8 = length
            .parse()
            .map_err(|_| Error::InvalidPrefix(s.to_string()))?;
        if length > 128 {
            return Err(Error::InvalidPrefix(s.to_string()));
        }
        Ok(Self::new(value, length))
    }
}

#[derive(
    Debug,
    Copy,
    Clone,
    Serialize,
    Deserialize,
    Eq,
    Hash,
    PartialEq,
    JsonSchema,
    PartialOrd,
    Ord,
)]
pub enum Prefix {
    V4(Prefix4),
    V6(Prefix6),
}

impl Prefix {
    pub fn new(ip: IpAddr, length: u8) -> Self {
        match ip {
            IpAddr::V4(ip4) => Self::V4(Prefix4::new(ip4, length)),
            IpAddr::V6(ip6) => Self::V6(Prefix6::new(ip6, length)),
        }
    }

    pub fn addr(&self) -> IpAddr {
        match self {
            Self::V4(p) => p.value.into(),
            Self::V6(p) => p.value.into(),
        }
    }

    pub fn length(&self) -> u8 {
        match self {
            Self::V4(p) => p.length,
            Self::V6(p) => p.length,
        }
    }

    pub fn to_wire(&self) -> Vec<u8> {
        match self {
            Self::V4(p) => p.to_wire(),
            Self::V6(p) => p.to_wire(),
        }
    }
}

impl From<Prefix4> for Prefix {
    fn from(value: Prefix4) -> Self {
        Self::V4(value)
    }
}

impl From<Prefix6> for Prefix {
    fn from(value: Prefix6) -> Self {
        Self::V6(value)
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V4(p) => write!(f, "{p}"),
            Self::V6(p) => write!(f, "{p}"),
        }
    }
}

impl FromStr for Prefix {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(prefix4) = s.parse::<Prefix4>() {
            return Ok(Self::V4(prefix4));
        }
        Ok(Self::V6(s.parse::<Prefix6>()?))
    }
}

/// The administrator half of a route distinguisher or route target.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    JsonSchema,
)]
pub enum Administrator {
    TwoOctetAs(u16),
    Ipv4(Ipv4Addr),
    FourOctetAs(u32),
}

impl Administrator {
    fn type_code(&self) -> u8 {
        match self {
            Self::TwoOctetAs(_) => 0,
            Self::Ipv4(_) => 1,
            Self::FourOctetAs(_) => 2,
        }
    }

    /// Six octets of administrator followed by the assigned number.
    fn to_wire(&self, assigned: u32) -> [u8; 6] {
        let mut buf = [0u8; 6];
        match self {
            Self::TwoOctetAs(asn) => {
                buf[..2].copy_from_slice(&asn.to_be_bytes());
                buf[2..].copy_from_slice(&assigned.to_be_bytes());
            }
            Self::Ipv4(addr) => {
                buf[..4].copy_from_slice(&addr.octets());
                buf[4..].copy_from_slice(&(assigned as u16).to_be_bytes());
            }
            Self::FourOctetAs(asn) => {
                buf[..4].copy_from_slice(&asn.to_be_bytes());
                buf[4..].copy_from_slice(&(assigned as u16).to_be_bytes());
            }
        }
        buf
    }

    fn parse(s: &str) -> Result<(Self, u32), Error> {
        let (admin, assigned) = s
            .rsplit_once(':')
            .ok_or(Error::InvalidAdministrator(s.to_string()))?;
        let assigned: u32 = assigned
            .parse()
            .map_err(|_| Error::InvalidAdministrator(s.to_string()))?;
        if let Ok(addr) = admin.parse::<Ipv4Addr>() {
            if assigned > u16::MAX as u32 {
                return Err(Error::InvalidAdministrator(s.to_string()));
            }
            return Ok((Self::Ipv4(addr), assigned));
        }
        let asn: u32 = admin
            .parse()
            .map_err(|_| Error::InvalidAdministrator(s.to_string()))?;
        match u16::try_from(asn) {
            Ok(asn) => Ok((Self::TwoOctetAs(asn), assigned)),
            Err(_) if assigned <= u16::MAX as u32 => {
                Ok((Self::FourOctetAs(asn), assigned))
            }
            Err(_) => Err(Error::InvalidAdministrator(s.to_string())),
        }
    }
}

impl fmt::Display for Administrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TwoOctetAs(asn) => write!(f, "{asn}"),
            Self::Ipv4(addr) => write!(f, "{addr}"),
            Self::FourOctetAs(asn) => write!(f, "{asn}"),
        }
    }
}

/// RFC 4364 route distinguisher.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    JsonSchema,
)]
pub struct RouteDistinguisher {
    pub admin: Administrator,
    pub assigned: u32,
}

impl RouteDistinguisher {
    pub fn new(admin: Administrator, assigned: u32) -> Self {
        Self { admin, assigned }
    }

    pub fn to_wire(&self) -> [u8; 8] {
        let mut buf = [0u8; 8];
        buf[1] = self.admin.type_code();
        buf[2..].copy_from_slice(&self.admin.to_wire(self.assigned));
        buf
    }
}

impl Default for RouteDistinguisher {
    fn default() -> Self {
        Self::new(Administrator::TwoOctetAs(0), 0)
    }
}

impl fmt::Display for RouteDistinguisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.admin, self.assigned)
    }
}

impl FromStr for RouteDistinguisher {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (admin, assigned) = Administrator::parse(s)?;
        Ok(Self { admin, assigned })
    }
}

/// RFC 4360 route target, carried as a transitive extended community.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    JsonSchema,
)]
pub struct RouteTarget {
    pub admin: Administrator,
    pub assigned: u32,
}

impl RouteTarget {
    pub fn new(admin: Administrator, assigned: u32) -> Self {
        Self { admin, assigned }
    }

    pub fn to_wire(&self) -> [u8; 8] {
        self.to_wire_subtype(0x02)
    }

    fn to_wire_subtype(&self, subtype: u8) -> [u8; 8] {
        let mut buf = [0u8; 8];
        buf[0] = self.admin.type_code();
        buf[1] = subtype;
        buf[2..].copy_from_slice(&self.admin.to_wire(self.assigned));
        buf
    }
}

impl fmt::Display for RouteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.admin, self.assigned)
    }
}

impl FromStr for RouteTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (admin, assigned) = Administrator::parse(s)?;
        Ok(Self { admin, assigned })
    }
}

/// RFC 4360 extended community.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtendedCommunity {
    RouteTarget(RouteTarget),
    RouteOrigin(RouteTarget),
    Opaque([u8; 8]),
}

impl ExtendedCommunity {
    pub fn to_wire(&self) -> [u8; 8] {
        match self {
            Self::RouteTarget(rt) => rt.to_wire_subtype(0x02),
            Self::RouteOrigin(ro) => ro.to_wire_subtype(0x03),
            Self::Opaque(raw) => *raw,
        }
    }
}

impl fmt::Display for ExtendedCommunity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RouteTarget(rt) => write!(f, "RT:{rt}"),
            Self::RouteOrigin(ro) => write!(f, "SoO:{ro}"),
            Self::Opaque(raw) => write!(f, "{:02x}", raw.iter().format("")),
        }
    }
}

/// A stack of MPLS labels. Each label occupies three octets on the wire
/// with the bottom-of-stack bit set on the last one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct LabelStack(pub Vec<u32>);

impl LabelStack {
    pub fn to_wire(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.0.len() * 3);
        for (i, label) in self.0.iter().enumerate() {
            let mut v = (label & 0xFFFFF) << 4;
            if i == self.0.len() - 1 {
                v |= 1;
            }
            buf.extend_from_slice(&v.to_be_bytes()[1..]);
        }
        buf
    }
}

impl fmt::Display for LabelStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.iter().join(", "))
    }
}

/// RFC 4364 labeled VPN prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LabeledVpnPrefix {
    pub rd: RouteDistinguisher,
    pub labels: LabelStack,
    pub prefix: Prefix,
}

impl LabeledVpnPrefix {
    pub fn to_wire(&self) -> Vec<u8> {
        let labels = self.labels.to_wire();
        let bits = (labels.len() + 8) * 8 + self.prefix.length() as usize;
        let mut buf = vec![bits as u8];
        buf.extend_from_slice(&labels);
        buf.extend_from_slice(&self.rd.to_wire());
        buf.extend_from_slice(&self.prefix.to_wire()[1..]);
        buf
    }
}

/// An Ethernet segment identifier.
pub type Esi = [u8; 10];

fn fmt_esi(esi: &Esi) -> String {
    format!("{:02x}", esi.iter().format(":"))
}

fn fmt_mac(mac: &[u8; 6]) -> String {
    format!("{:02x}", mac.iter().format(":"))
}

fn ip_to_wire(ip: &IpAddr) -> Vec<u8> {
    match ip {
        IpAddr::V4(a) => a.octets().into(),
        IpAddr::V6(a) => a.octets().into(),
    }
}

fn ip_bits(ip: &IpAddr) -> u8 {
    match ip {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

#[derive(
    Debug, PartialEq, Eq, Copy, Clone, TryFromPrimitive, IntoPrimitive,
)]
#[repr(u8)]
pub enum EvpnRouteType {
    EthernetAutoDiscovery = 1,
    MacIpAdvertisement = 2,
    InclusiveMulticastEthernetTag = 3,
    EthernetSegment = 4,
    IpPrefix = 5,
}

impl FromStr for EvpnRouteType {
    type Err = Error;

    /// Parse the keywords operators use to pick an EVPN route type.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "a-d" => Ok(Self::EthernetAutoDiscovery),
            "macadv" => Ok(Self::MacIpAdvertisement),
            "multicast" => Ok(Self::InclusiveMulticastEthernetTag),
            "esi" => Ok(Self::EthernetSegment),
            "prefix" => Ok(Self::IpPrefix),
            _ => Err(Error::UnsupportedEvpnRouteType(s.to_string())),
        }
    }
}

/// RFC 7432 / RFC 9136 EVPN routes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EvpnRoute {
    EthernetAutoDiscovery {
        rd: RouteDistinguisher,
        esi: Esi,
        etag: u32,
        label: u32,
    },
    MacIpAdvertisement {
        rd: RouteDistinguisher,
        esi: Esi,
        etag: u32,
        mac: [u8; 6],
        ip: Option<IpAddr>,
        labels: LabelStack,
    },
    InclusiveMulticastEthernetTag {
        rd: RouteDistinguisher,
        etag: u32,
        ip: IpAddr,
    },
    EthernetSegment {
        rd: RouteDistinguisher,
        esi: Esi,
        ip: IpAddr,
    },
    IpPrefix {
        rd: RouteDistinguisher,
        esi: Esi,
        etag: u32,
        prefix: Prefix,
        gateway: IpAddr,
        label: u32,
    },
}

impl EvpnRoute {
    pub fn route_type(&self) -> EvpnRouteType {
        match self {
            Self::EthernetAutoDiscovery { .. } => {
                EvpnRouteType::EthernetAutoDiscovery
            }
            Self::MacIpAdvertisement { .. } => EvpnRouteType::MacIpAdvertisement,
            Self::InclusiveMulticastEthernetTag { .. } => {
                EvpnRouteType::InclusiveMulticastEthernetTag
            }
            Self::EthernetSegment { .. } => EvpnRouteType::EthernetSegment,
            Self::IpPrefix { .. } => EvpnRouteType::IpPrefix,
        }
    }

    pub fn rd(&self) -> RouteDistinguisher {
        match self {
            Self::EthernetAutoDiscovery { rd, .. }
            | Self::MacIpAdvertisement { rd, .. }
            | Self::InclusiveMulticastEthernetTag { rd, .. }
            | Self::EthernetSegment { rd, .. }
            | Self::IpPrefix { rd, .. } => *rd,
        }
    }

    /// Rewrite the route distinguisher of MAC/IP advertisement and inclusive
    /// multicast routes. Other route types are returned unchanged.
    pub fn with_rd(&self, new_rd: RouteDistinguisher) -> Self {
        let mut route = self.clone();
        match &mut route {
            Self::MacIpAdvertisement { rd, .. }
            | Self::InclusiveMulticastEthernetTag { rd, .. } => *rd = new_rd,
            _ => {}
        }
        route
    }

    fn body_to_wire(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        match self {
            Self::EthernetAutoDiscovery {
                rd,
                esi,
                etag,
                label,
            } => {
                buf.extend_from_slice(&rd.to_wire());
                buf.extend_from_slice(esi);
                buf.extend_from_slice(&etag.to_be_bytes());
                buf.extend_from_slice(&LabelStack(vec![*label]).to_wire());
            }
            Self::MacIpAdvertisement {
                rd,
                esi,
                etag,
                mac,
                ip,
                labels,
            } => {
                buf.extend_from_slice(&rd.to_wire());
                buf.extend_from_slice(esi);
                buf.extend_from_slice(&etag.to_be_bytes());
                buf.push(48);
                buf.extend_from_slice(mac);
                match ip {
                    Some(ip) => {
                        buf.push(ip_bits(ip));
                        buf.extend_from_slice(&ip_to_wire(ip));
                    }
                    None => buf.push(0),
                }
                buf.extend_from_slice(&labels.to_wire());
            }
            Self::InclusiveMulticastEthernetTag { rd, etag, ip } => {
                buf.extend_from_slice(&rd.to_wire());
                buf.extend_from_slice(&etag.to_be_bytes());
                buf.push(ip_bits(ip));
                buf.extend_from_slice(&ip_to_wire(ip));
            }
            Self::EthernetSegment { rd, esi, ip } => {
                buf.extend_from_slice(&rd.to_wire());
                buf.extend_from_slice(esi);
                buf.push(ip_bits(ip));
                buf.extend_from_slice(&ip_to_wire(ip));
            }
            Self::IpPrefix {
                rd,
                esi,
                etag,
                prefix,
                gateway,
                label,
            } => {
                buf.extend_from_slice(&rd.to_wire());
                buf.extend_from_slice(esi);
                buf.extend_from_slice(&etag.to_be_bytes());
                buf.push(prefix.length());
                buf.extend_from_slice(&ip_to_wire(&prefix.addr()));
                buf.extend_from_slice(&ip_to_wire(gateway));
                buf.extend_from_slice(&LabelStack(vec![*label]).to_wire());
            }
        }
        buf
    }

    pub fn to_wire(&self) -> Result<Vec<u8>, Error> {
        let body = self.body_to_wire();
        if body.len() > u8::MAX as usize {
            return Err(Error::TooLarge("evpn route".into()));
        }
        let mut buf = vec![u8::from(self.route_type()), body.len() as u8];
        buf.extend_from_slice(&body);
        Ok(buf)
    }
}

impl fmt::Display for EvpnRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EthernetAutoDiscovery {
                rd,
                esi,
                etag,
                label,
            } => write!(
                f,
                "[type:A-D][rd:{rd}][esi:{}][etag:{etag}][label:{label}]",
                fmt_esi(esi)
            ),
            Self::MacIpAdvertisement {
                rd, etag, mac, ip, ..
            } => {
                let ip = ip.map(|ip| ip.to_string()).unwrap_or_default();
                write!(
                    f,
                    "[type:macadv][rd:{rd}][etag:{etag}][mac:{}][ip:{ip}]",
                    fmt_mac(mac)
                )
            }
            Self::InclusiveMulticastEthernetTag { rd, etag, ip } => {
                write!(f, "[type:multicast][rd:{rd}][etag:{etag}][ip:{ip}]")
            }
            Self::EthernetSegment { rd, esi, ip } => {
                write!(f, "[type:esi][rd:{rd}][esi:{}][ip:{ip}]", fmt_esi(esi))
            }
            Self::IpPrefix {
                rd,
                esi,
                etag,
                prefix,
                gateway,
                ..
            } => write!(
                f,
                "[type:Prefix][rd:{rd}][esi:{}][etag:{etag}][prefix:{prefix}][gw:{gateway}]",
                fmt_esi(esi)
            ),
        }
    }
}

/// RFC 4684 route target membership.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteTargetMembership {
    pub origin_as: u32,
    /// `None` is the default route target membership advertisement.
    pub route_target: Option<RouteTarget>,
}

impl RouteTargetMembership {
    pub fn to_wire(&self) -> Vec<u8> {
        match &self.route_target {
            None => vec![0],
            Some(rt) => {
                let mut buf = vec![96];
                buf.extend_from_slice(&self.origin_as.to_be_bytes());
                buf.extend_from_slice(&rt.to_wire());
                buf
            }
        }
    }
}

impl fmt::Display for RouteTargetMembership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.route_target {
            None => write!(f, "default"),
            Some(rt) => write!(f, "{}:{rt}", self.origin_as),
        }
    }
}

/// Flow specification component types from RFC 5575 §4.
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
pub enum FlowSpecComponentType {
    DestinationPrefix = 1,
    SourcePrefix = 2,
    IpProtocol = 3,
    Port = 4,
    DestinationPort = 5,
    SourcePort = 6,
    IcmpType = 7,
    IcmpCode = 8,
    TcpFlags = 9,
    PacketLength = 10,
    Dscp = 11,
    Fragment = 12,
}

impl fmt::Display for FlowSpecComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::DestinationPrefix => "destination",
            Self::SourcePrefix => "source",
            Self::IpProtocol => "protocol",
            Self::Port => "port",
            Self::DestinationPort => "destination-port",
            Self::SourcePort => "source-port",
            Self::IcmpType => "icmp-type",
            Self::IcmpCode => "icmp-code",
            Self::TcpFlags => "tcp-flags",
            Self::PacketLength => "packet-length",
            Self::Dscp => "dscp",
            Self::Fragment => "fragment",
        };
        write!(f, "{s}")
    }
}

pub mod flowspec_op {
    pub const END_OF_LIST: u8 = 0b10000000;
    pub const AND: u8 = 0b01000000;
    pub const LENGTH_MASK: u8 = 0b00110000;
    pub const LT: u8 = 0b00000100;
    pub const GT: u8 = 0b00000010;
    pub const EQ: u8 = 0b00000001;
    pub const NOT: u8 = 0b00000010;
    pub const MATCH: u8 = 0b00000001;
}

/// A single numeric or bitmask operator/value pair. `op` carries the AND
/// bit and the comparison bits; the end-of-list and length bits are
/// computed on encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowSpecOperator {
    pub op: u8,
    pub value: u64,
}

impl FlowSpecOperator {
    fn to_wire(&self, last: bool) -> Vec<u8> {
        let (len_code, bytes): (u8, Vec<u8>) = if self.value <= u8::MAX as u64
        {
            (0, vec![self.value as u8])
        } else if self.value <= u16::MAX as u64 {
            (1, (self.value as u16).to_be_bytes().into())
        } else if self.value <= u32::MAX as u64 {
            (2, (self.value as u32).to_be_bytes().into())
        } else {
            (3, self.value.to_be_bytes().into())
        };
        let mut op = self.op
            & !(flowspec_op::END_OF_LIST | flowspec_op::LENGTH_MASK);
        op |= len_code << 4;
        if last {
            op |= flowspec_op::END_OF_LIST;
        }
        let mut buf = vec![op];
        buf.extend_from_slice(&bytes);
        buf
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FlowSpecComponent {
    DestinationPrefix(Prefix),
    SourcePrefix(Prefix),
    Operators {
        typ: FlowSpecComponentType,
        ops: Vec<FlowSpecOperator>,
    },
}

impl FlowSpecComponent {
    pub fn typ(&self) -> FlowSpecComponentType {
        match self {
            Self::DestinationPrefix(_) => FlowSpecComponentType::DestinationPrefix,
            Self::SourcePrefix(_) => FlowSpecComponentType::SourcePrefix,
            Self::Operators { typ, .. } => *typ,
        }
    }

    /// The encoded component without its leading type octet.
    fn value_to_wire(&self) -> Vec<u8> {
        match self {
            Self::DestinationPrefix(p) | Self::SourcePrefix(p) => match p {
                Prefix::V4(p4) => p4.to_wire(),
                Prefix::V6(p6) => {
                    // RFC 8956 prefix offset precedes the pattern.
                    let wire = p6.to_wire();
                    let mut buf = vec![wire[0], 0];
                    buf.extend_from_slice(&wire[1..]);
                    buf
                }
            },
            Self::Operators { ops, .. } => {
                let mut buf = Vec::new();
                for (i, op) in ops.iter().enumerate() {
                    buf.extend_from_slice(&op.to_wire(i == ops.len() - 1));
                }
                buf
            }
        }
    }

    pub fn to_wire(&self) -> Vec<u8> {
        let mut buf = vec![u8::from(self.typ())];
        buf.extend_from_slice(&self.value_to_wire());
        buf
    }
}

impl fmt::Display for FlowSpecComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DestinationPrefix(p) | Self::SourcePrefix(p) => {
                write!(f, "[{}: {p}]", self.typ())
            }
            Self::Operators { typ, ops } => {
                write!(f, "[{typ}:")?;
                for op in ops {
                    let cmp = match op.op & 0x07 {
                        flowspec_op::EQ => "==",
                        x if x == flowspec_op::LT => "<",
                        x if x == flowspec_op::GT => ">",
                        x if x == flowspec_op::LT | flowspec_op::EQ => "<=",
                        x if x == flowspec_op::GT | flowspec_op::EQ => ">=",
                        x if x == flowspec_op::LT | flowspec_op::GT => "!=",
                        _ => "",
                    };
                    let and = if op.op & flowspec_op::AND != 0 { "&" } else { " " };
                    write!(f, "{and}{cmp}{}", op.value)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// RFC 5575 flow specification.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FlowSpecNlri {
    pub family: RouteFamily,
    pub rd: Option<RouteDistinguisher>,
    pub components: Vec<FlowSpecComponent>,
}

impl FlowSpecNlri {
    pub fn to_wire(&self) -> Result<Vec<u8>, Error> {
        let mut body = Vec::new();
        if let Some(rd) = &self.rd {
            body.extend_from_slice(&rd.to_wire());
        }
        for c in &self.components {
            body.extend_from_slice(&c.to_wire());
        }
        let mut buf = Vec::with_capacity(body.len() + 2);
        if body.len() < 240 {
            buf.push(body.len() as u8);
        } else if body.len() < 4096 {
            buf.extend_from_slice(&(0xF000 | body.len() as u16).to_be_bytes());
        } else {
            return Err(Error::TooLarge("flowspec nlri".into()));
        }
        buf.extend_from_slice(&body);
        Ok(buf)
    }
}

impl fmt::Display for FlowSpecNlri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(rd) = &self.rd {
            write!(f, "[rd: {rd}]")?;
        }
        for c in &self.components {
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

/// Order two flow specifications by RFC 5575 §5.1 precedence. `Greater`
/// means `a` takes precedence over `b`.
pub fn compare_flowspec(a: &FlowSpecNlri, b: &FlowSpecNlri) -> Ordering {
    for (ca, cb) in a.components.iter().zip(b.components.iter()) {
        if ca.typ() != cb.typ() {
            // Lower component types take precedence.
            return cb.typ().cmp(&ca.typ());
        }
        let ord = match (ca, cb) {
            (
                FlowSpecComponent::DestinationPrefix(pa)
                | FlowSpecComponent::SourcePrefix(pa),
                FlowSpecComponent::DestinationPrefix(pb)
                | FlowSpecComponent::SourcePrefix(pb),
            ) => compare_flowspec_prefix(pa, pb),
            _ => {
                let wa = ca.value_to_wire();
                let wb = cb.value_to_wire();
                let common = wa.len().min(wb.len());
                match wa[..common].cmp(&wb[..common]) {
                    // Longer strings are more specific.
                    Ordering::Equal => wa.len().cmp(&wb.len()),
                    // Lowest value takes precedence.
                    ord => ord.reverse(),
                }
            }
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.components.len().cmp(&b.components.len())
}

fn compare_flowspec_prefix(a: &Prefix, b: &Prefix) -> Ordering {
    let common = a.length().min(b.length());
    let ma = Prefix::new(a.addr(), common);
    let mb = Prefix::new(b.addr(), common);
    if ma == mb {
        // Overlapping prefixes: the more specific one wins.
        a.length().cmp(&b.length())
    } else {
        // Disjoint prefixes: the lowest address wins.
        b.addr().cmp(&a.addr())
    }
}

/// Reachability information for a single route.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Nlri {
    Ipv4(Prefix4),
    Ipv6(Prefix6),
    Vpn4(LabeledVpnPrefix),
    Vpn6(LabeledVpnPrefix),
    Evpn(EvpnRoute),
    RouteTargetMembership(RouteTargetMembership),
    FlowSpec(FlowSpecNlri),
}

impl Nlri {
    pub fn family(&self) -> RouteFamily {
        match self {
            Self::Ipv4(_) => RouteFamily::Ipv4Unicast,
            Self::Ipv6(_) => RouteFamily::Ipv6Unicast,
            Self::Vpn4(_) => RouteFamily::Ipv4Vpn,
            Self::Vpn6(_) => RouteFamily::Ipv6Vpn,
            Self::Evpn(_) => RouteFamily::Evpn,
            Self::RouteTargetMembership(_) => {
                RouteFamily::RouteTargetConstraint
            }
            Self::FlowSpec(fs) => fs.family,
        }
    }

    /// The IP prefix carried by unicast and VPN routes.
    pub fn ip_prefix(&self) -> Option<Prefix> {
        match self {
            Self::Ipv4(p) => Some(Prefix::V4(*p)),
            Self::Ipv6(p) => Some(Prefix::V6(*p)),
            Self::Vpn4(v) | Self::Vpn6(v) => Some(v.prefix),
            _ => None,
        }
    }

    /// The route distinguisher of VPN and EVPN routes.
    pub fn rd(&self) -> Option<RouteDistinguisher> {
        match self {
            Self::Vpn4(v) | Self::Vpn6(v) => Some(v.rd),
            Self::Evpn(e) => Some(e.rd()),
            Self::FlowSpec(fs) => fs.rd,
            _ => None,
        }
    }

    pub fn labels(&self) -> Option<&LabelStack> {
        match self {
            Self::Vpn4(v) | Self::Vpn6(v) => Some(&v.labels),
            _ => None,
        }
    }

    pub fn to_wire(&self) -> Result<Vec<u8>, Error> {
        match self {
            Self::Ipv4(p) => Ok(p.to_wire()),
            Self::Ipv6(p) => Ok(p.to_wire()),
            Self::Vpn4(v) | Self::Vpn6(v) => Ok(v.to_wire()),
            Self::Evpn(e) => e.to_wire(),
            Self::RouteTargetMembership(r) => Ok(r.to_wire()),
            Self::FlowSpec(fs) => fs.to_wire(),
        }
    }
}

impl From<Prefix4> for Nlri {
    fn from(value: Prefix4) -> Self {
        Self::Ipv4(value)
    }
}

impl From<Prefix6> for Nlri {
    fn from(value: Prefix6) -> Self {
        Self::Ipv6(value)
    }
}

impl From<Prefix> for Nlri {
    fn from(value: Prefix) -> Self {
        match value {
            Prefix::V4(p) => Self::Ipv4(p),
            Prefix::V6(p) => Self::Ipv6(p),
        }
    }
}

impl fmt::Display for Nlri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ipv4(p) => write!(f, "{p}"),
            Self::Ipv6(p) => write!(f, "{p}"),
            Self::Vpn4(v) | Self::Vpn6(v) => write!(f, "{}:{}", v.rd, v.prefix),
            Self::Evpn(e) => write!(f, "{e}"),
            Self::RouteTargetMembership(r) => write!(f, "{r}"),
            Self::FlowSpec(fs) => write!(f, "{fs}"),
        }
    }
}
