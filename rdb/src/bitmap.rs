// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A growable bit vector used to hand out small integer identifiers.

use crate::error::Error;

const WORD_BITS: usize = u64::BITS as usize;

/// Bit `i` set means identifier `i` is in use.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bitmap {
    words: Vec<u64>,
}

impl Bitmap {
    /// Create a bitmap able to track at least `size` identifiers without
    /// growing.
    pub fn new(size: usize) -> Self {
        Self {
            words: vec![0; size.div_ceil(WORD_BITS)],
        }
    }

    /// Number of identifiers this bitmap can currently track.
    pub fn capacity(&self) -> usize {
        self.words.len() * WORD_BITS
    }

    /// Mark `i` as used. Identifiers beyond the current capacity are
    /// ignored.
    pub fn flag(&mut self, i: usize) {
        if let Some(w) = self.words.get_mut(i / WORD_BITS) {
            *w |= 1 << (i % WORD_BITS);
        }
    }

    /// Mark `i` as free.
    pub fn unflag(&mut self, i: usize) {
        if let Some(w) = self.words.get_mut(i / WORD_BITS) {
            *w &= !(1 << (i % WORD_BITS));
        }
    }

    pub fn get_flag(&self, i: usize) -> bool {
        self.words
            .get(i / WORD_BITS)
            .is_some_and(|w| w & (1 << (i % WORD_BITS)) != 0)
    }

    /// Claim the lowest free identifier. When every identifier is taken
    /// this fails with `Error::NoSpace`; call `expand` and retry.
    pub fn find_and_set_zero_bit(&mut self) -> Result<usize, Error> {
        for (i, w) in self.words.iter_mut().enumerate() {
            if *w == u64::MAX {
                continue;
            }
            let j = w.trailing_ones() as usize;
            *w |= 1 << j;
            return Ok(i * WORD_BITS + j);
        }
        Err(Error::NoSpace)
    }

    /// Grow by one word.
    pub fn expand(&mut self) {
        self.words.push(0);
    }

    /// Claim the lowest free identifier, growing first if needed.
    pub fn allocate(&mut self) -> usize {
        match self.find_and_set_zero_bit() {
            Ok(id) => id,
            Err(_) => {
                self.expand();
                let id = self.capacity() - WORD_BITS;
                self.flag(id);
                id
            }
        }
    }
}
