// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// Knobs that alter best path selection.
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
pub struct SelectionOptions {
    /// Keep paths in arrival order and report no best path.
    pub disable_best_path_selection: bool,
    pub ignore_as_path_length: bool,
    /// Compare MED between paths from different neighboring ASes.
    pub always_compare_med: bool,
    /// Break ties between external paths by router id instead of age.
    pub external_compare_router_id: bool,
}

/// Configuration handed to a table and copied into each of its
/// destinations.
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
pub struct RibConfig {
    pub selection: SelectionOptions,
    /// Report equal cost paths alongside the best path.
    pub use_multiple_paths: bool,
}

#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema,
)]
pub enum PeerType {
    Internal,
    External,
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
pub enum RemovePrivateAs {
    #[default]
    None,
    /// Drop private AS numbers.
    All,
    /// Replace private AS numbers with the local AS.
    Replace,
}

/// What the export side needs to know about a neighbor to rewrite the
/// attributes of a path sent to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NeighborExportConfig {
    pub peer_type: PeerType,
    pub local_as: u32,
    pub route_server_client: bool,
    pub route_reflector_client: bool,
    pub route_reflector_cluster_id: Ipv4Addr,
    pub remove_private_as: RemovePrivateAs,
    pub confederation_member: bool,
}

impl NeighborExportConfig {
    pub fn new(peer_type: PeerType, local_as: u32) -> Self {
        Self {
            peer_type,
            local_as,
            route_server_client: false,
            route_reflector_client: false,
            route_reflector_cluster_id: Ipv4Addr::UNSPECIFIED,
            remove_private_as: RemovePrivateAs::None,
            confederation_member: false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_select_normally() {
        let c = RibConfig::default();
        assert!(!c.use_multiple_paths);
        assert!(!c.selection.disable_best_path_selection);
        assert!(!c.selection.ignore_as_path_length);
        assert!(!c.selection.always_compare_med);
        assert!(!c.selection.external_compare_router_id);
    }
}
