// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bit string keys for prefix ordered iteration.
//!
//! A prefix is keyed by the first `length` bits of its address written out
//! as `0`/`1` characters. Sorting keys lexically then visits a covering
//! prefix before everything it covers, and every prefix covered by `p`
//! has a key starting with the key of `p`.

use crate::error::Error;
use bgp::nlri::Prefix;
use std::collections::BTreeMap;
use std::net::IpAddr;

/// Key of the first `max` bits of `bytes`.
pub fn ip_to_radix_key(bytes: &[u8], max: u8) -> String {
    let mut key: String = bytes.iter().map(|b| format!("{b:08b}")).collect();
    key.truncate(usize::from(max));
    key
}

/// Key of a prefix in `a.b.c.d/n` or `x::/n` form. Host bits are ignored.
pub fn cidr_to_radix_key(cidr: &str) -> Result<String, Error> {
    let prefix: Prefix = cidr.parse()?;
    Ok(addr_to_radix_key(&prefix))
}

pub fn addr_to_radix_key(prefix: &Prefix) -> String {
    match prefix.addr() {
        IpAddr::V4(a) => ip_to_radix_key(&a.octets(), prefix.length()),
        IpAddr::V6(a) => ip_to_radix_key(&a.octets(), prefix.length()),
    }
}

/// An ordered map over radix keys.
#[derive(Debug, Clone)]
pub struct RadixTree<V> {
    nodes: BTreeMap<String, V>,
}

impl<V> Default for RadixTree<V> {
    fn default() -> Self {
        Self {
            nodes: BTreeMap::new(),
        }
    }
}

impl<V> RadixTree<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: String, value: V) -> Option<V> {
        self.nodes.insert(key, value)
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.nodes.get(key)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every entry in key order.
    pub fn walk(&self) -> impl Iterator<Item = (&str, &V)> {
        self.nodes.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Entries whose key starts with `prefix`, in key order. These are the
    /// prefixes covered by the one `prefix` was built from.
    pub fn walk_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a V)> {
        self.nodes
            .range::<str, _>((std::ops::Bound::Included(prefix), std::ops::Bound::Unbounded))
            .take_while(move |(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.as_str(), v))
    }

    /// Entries whose key is a prefix of `key`, shortest first. These are
    /// the prefixes covering the one `key` was built from.
    pub fn walk_path<'a>(
        &'a self,
        key: &'a str,
    ) -> impl DoubleEndedIterator<Item = (&'a str, &'a V)> {
        (0..=key.len()).filter_map(move |i| {
            let k = &key[..i];
            self.nodes.get(k).map(|v| (k, v))
        })
    }
}

impl<V> FromIterator<(String, V)> for RadixTree<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        Self {
            nodes: iter.into_iter().collect(),
        }
    }
}
