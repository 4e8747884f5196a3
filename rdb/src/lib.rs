// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory routing information base: per-peer adjacency stores,
//! per-prefix best path selection and per-family prefix tables.

pub mod adj;
pub mod bestpath;
pub mod bitmap;
pub mod config;
pub mod destination;
pub mod error;
pub mod export;
pub mod log;
pub mod path;
pub mod radix;
pub mod table;
pub mod types;

pub use adj::AdjRib;
pub use bitmap::Bitmap;
pub use config::{RibConfig, SelectionOptions};
pub use destination::{Changes, Destination, DestinationSelectOption, Update};
pub use path::Path;
pub use table::{Table, TableSelectOption};
pub use types::*;

#[cfg(test)]
mod proptest;


/// The consumer id of the global RIB. Paths are filtered per consumer;
/// this one sees every path.
pub const GLOBAL_RIB_NAME: &str = "global";

/// LOCAL_PREF assumed for paths that do not carry the attribute.
pub const DEFAULT_LOCAL_PREF: u32 = 100;

pub const COMPONENT_RDB: &str = "rdb";
pub const MOD_TABLE: &str = "table";
pub const MOD_DESTINATION: &str = "destination";
pub const MOD_ADJ: &str = "adj";
