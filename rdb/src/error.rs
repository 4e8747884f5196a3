// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use bgp::nlri::RouteFamily;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid path: {0}")]
    InvalidPath(#[from] InvalidPathError),

    #[error("no space")]
    NoSpace,

    #[error("router id comparison between ebgp and ibgp paths is not supported")]
    RouterIdComparison,

    #[error("med value invalid. it's underflow threshold")]
    MedUnderflow,

    #[error("med value invalid. it's overflow threshold")]
    MedOverflow,

    #[error("route filtering is not supported for this family")]
    UnsupportedFamily(RouteFamily),

    #[error("lookup error: {0}")]
    Lookup(String),

    #[error("bgp error: {0}")]
    Bgp(#[from] bgp::error::Error),
}

/// Reasons a path is refused by a table before it reaches best path
/// selection.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidPathError {
    #[error("route family mismatch: table {table}, path {path}")]
    FamilyMismatch {
        table: RouteFamily,
        path: RouteFamily,
    },

    #[error("AS_PATH must be converted to four octet segments")]
    UnnormalizedAsPath,

    #[error("AS4_PATH must be merged into AS_PATH")]
    As4PathPresent,
}
