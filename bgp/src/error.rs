// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("too large: {0}")]
    TooLarge(String),

    #[error("invalid prefix: {0}")]
    InvalidPrefix(String),

    #[error("invalid administrator field: {0}")]
    InvalidAdministrator(String),

    #[error("unsupported evpn route type: {0}")]
    UnsupportedEvpnRouteType(String),
}
