// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decoded BGP data as exchanged between the packet codec and the RIB:
//! path attributes, NLRI and the identifiers that scope them.

pub mod error;
pub mod messages;
pub mod nlri;

#[cfg(test)]
mod proptest;
