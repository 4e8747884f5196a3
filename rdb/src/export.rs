// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Outbound attribute rewriting.

use crate::config::{NeighborExportConfig, PeerType};
use crate::path::Path;
use crate::types::PeerInfo;
use crate::DEFAULT_LOCAL_PREF;
use bgp::messages::{PathAttributeTypeCode, PathAttributeValue};
use bgp::nlri::RouteFamily;
use std::rc::Rc;

/// The version of `original` to send to the neighbor described by
/// `neighbor` over the session described by `info`. Route server clients
/// get the path untouched, everyone else gets a new layer over it.
pub fn update_path_attrs(
    neighbor: &NeighborExportConfig,
    info: &PeerInfo,
    original: &Rc<Path>,
) -> Rc<Path> {
    if neighbor.route_server_client {
        return original.clone();
    }
    let mut path = original.clone_path(original.is_withdraw());

    // ORIGINATOR_ID and CLUSTER_LIST only go to route reflector clients.
    if !(neighbor.peer_type == PeerType::Internal
        && neighbor.route_reflector_client)
    {
        path.del_path_attr(PathAttributeTypeCode::OriginatorId);
        path.del_path_attr(PathAttributeTypeCode::ClusterList);
    }

    let unspecified_nexthop =
        path.nexthop().map_or(true, |nh| nh.is_unspecified());

    match neighbor.peer_type {
        PeerType::External => {
            if !path.is_local() || unspecified_nexthop {
                if let Some(addr) = info.local_address {
                    path.set_nexthop(addr);
                }
            }

            path.remove_private_as(neighbor.local_as, neighbor.remove_private_as);

            let confed = neighbor.confederation_member;
            path.prepend_asn(neighbor.local_as, 1, confed);
            if !confed {
                path.remove_confed_as();
            }

            // MED is not transitive across AS boundaries.
            if !path.is_local() {
                path.del_path_attr(PathAttributeTypeCode::MultiExitDisc);
            }
        }
        PeerType::Internal => {
            if path.is_local() && unspecified_nexthop {
                if let Some(addr) = info.local_address {
                    path.set_nexthop(addr);
                }
            }

            if path.get_path_attr(PathAttributeTypeCode::AsPath).is_none() {
                path.prepend_asn(0, 0, false);
            }

            if path.get_path_attr(PathAttributeTypeCode::LocalPref).is_none() {
                path.set_path_attr(
                    PathAttributeValue::LocalPref(DEFAULT_LOCAL_PREF).into(),
                );
            }

            if neighbor.route_reflector_client {
                reflect(neighbor, info, &mut path);
            }
        }
    }
    Rc::new(path)
}

/// RFC 4456 loop prevention attributes, and the RFC 4684 next hop and
/// originator for route target membership.
fn reflect(neighbor: &NeighborExportConfig, info: &PeerInfo, path: &mut Path) {
    if path.family() == RouteFamily::RouteTargetConstraint {
        if let Some(addr) = info.local_address {
            path.set_nexthop(addr);
        }
        path.set_path_attr(PathAttributeValue::OriginatorId(info.local_id).into());
    } else if path.originator_id().is_none() {
        let id = path.source().id;
        path.set_path_attr(PathAttributeValue::OriginatorId(id).into());
    }

    let mut cluster_list = vec![neighbor.route_reflector_cluster_id];
    if let Some(ids) = path.cluster_list() {
        cluster_list.extend_from_slice(ids);
    }
    path.set_path_attr(PathAttributeValue::ClusterList(cluster_list).into());
}
