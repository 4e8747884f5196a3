// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Property-based tests for prefix handling, attribute encoding and
//! flow-spec ordering.

use crate::messages::{
    As4PathSegment, AsPathType, PathAttribute, PathAttributeValue,
    path_attribute_flags,
};
use crate::nlri::{
    compare_flowspec, FlowSpecComponent, FlowSpecComponentType,
    FlowSpecNlri, FlowSpecOperator, Prefix, Prefix4, Prefix6, RouteFamily,
    flowspec_op,
};
use proptest::prelude::*;
use std::cmp::Ordering;
use std::net::{Ipv4Addr, Ipv6Addr};

fn ipv4_prefix_strategy() -> impl Strategy<Value = Prefix4> {
    (any::<u32>(), 0u8..=32u8).prop_map(|(addr_bits, length)| {
        Prefix4::new(Ipv4Addr::from(addr_bits), length)
    })
}

fn ipv6_prefix_strategy() -> impl Strategy<Value = Prefix6> {
    (any::<u128>(), 0u8..=128u8).prop_map(|(addr_bits, length)| {
        Prefix6::new(Ipv6Addr::from(addr_bits), length)
    })
}

fn flowspec_component_strategy() -> impl Strategy<Value = FlowSpecComponent>
{
    prop_oneof![
        ipv4_prefix_strategy()
            .prop_map(|p| FlowSpecComponent::DestinationPrefix(p.into())),
        ipv4_prefix_strategy()
            .prop_map(|p| FlowSpecComponent::SourcePrefix(p.into())),
        (any::<u8>(), 3u8..=12u8).prop_map(|(v, t)| {
            FlowSpecComponent::Operators {
                typ: FlowSpecComponentType::try_from(t)
                    .unwrap_or(FlowSpecComponentType::IpProtocol),
                ops: vec![FlowSpecOperator {
                    op: flowspec_op::EQ,
                    value: v as u64,
                }],
            }
        }),
    ]
}

fn flowspec_strategy() -> impl Strategy<Value = FlowSpecNlri> {
    prop::collection::vec(flowspec_component_strategy(), 1..4).prop_map(
        |mut components| {
            components.sort_by_key(|c| c.typ());
            components.dedup_by_key(|c| c.typ());
            FlowSpecNlri {
                family: RouteFamily::FlowSpecIpv4Unicast,
                rd: None,
                components,
            }
        },
    )
}

proptest! {
    /// Property: prefix wire form is a length octet plus ceil(len/8) octets
    #[test]
    fn prop_prefix4_wire_length(prefix in ipv4_prefix_strategy()) {
        let wire = prefix.to_wire();
        prop_assert_eq!(wire.len(), 1 + (prefix.length as usize).div_ceil(8));
        prop_assert_eq!(wire[0], prefix.length);
    }

    /// Property: parsing the display form yields the same prefix
    #[test]
    fn prop_prefix_display_parse(
        p4 in ipv4_prefix_strategy(),
        p6 in ipv6_prefix_strategy(),
    ) {
        let parsed: Prefix = p4.to_string().parse().unwrap();
        prop_assert_eq!(parsed, Prefix::V4(p4));
        let parsed: Prefix = p6.to_string().parse().unwrap();
        prop_assert_eq!(parsed, Prefix::V6(p6));
    }

    /// Property: a prefix is within every shorter prefix of itself
    #[test]
    fn prop_prefix4_within_shorter(prefix in ipv4_prefix_strategy(), cut in 0u8..=32u8) {
        let shorter = Prefix4::new(prefix.value, cut.min(prefix.length));
        prop_assert!(prefix.within(&shorter));
    }

    /// Property: attribute length field matches the encoded value
    #[test]
    fn prop_as_path_attribute_length(asns in prop::collection::vec(any::<u32>(), 0..255)) {
        let n = asns.len();
        let a = PathAttribute::from(PathAttributeValue::AsPath(vec![
            As4PathSegment::new(AsPathType::AsSequence, asns),
        ]));
        let wire = a.to_wire().unwrap();
        let value_len = 2 + 4 * n;
        if value_len > u8::MAX as usize {
            prop_assert!(wire[0] & path_attribute_flags::EXTENDED_LENGTH != 0);
            prop_assert_eq!(u16::from_be_bytes([wire[2], wire[3]]) as usize, value_len);
            prop_assert_eq!(wire.len(), 4 + value_len);
        } else {
            prop_assert_eq!(wire[2] as usize, value_len);
            prop_assert_eq!(wire.len(), 3 + value_len);
        }
    }

    /// Property: flow-spec precedence is antisymmetric
    #[test]
    fn prop_flowspec_antisymmetric(a in flowspec_strategy(), b in flowspec_strategy()) {
        let ab = compare_flowspec(&a, &b);
        let ba = compare_flowspec(&b, &a);
        prop_assert_eq!(ab, ba.reverse());
        if a == b {
            prop_assert_eq!(ab, Ordering::Equal);
        }
    }
}
