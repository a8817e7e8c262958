//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! A seekable, random-access view over the bytes of a candidate bplist document.
//!
//! Every object in a bplist may be visited in any order via the offset table, so
//! the reader is built over the whole input held in memory rather than a forward-only
//! stream. Short reads never raise; callers receive however many bytes were actually
//! available and decide locally whether that constitutes corruption.

use std::convert::TryFrom;
use std::io;

use num_bigint::BigUint;

/// A random-access view over the bytes of a document under decode.
#[derive(Debug)]
pub struct ByteReader<'a> {
    input: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    /// Wraps a borrowed byte slice for random access.
    pub fn new(input: &'a [u8]) -> Self {
        ByteReader { input, position: 0 }
    }

    /// The total length of the input, in bytes.
    pub fn len(&self) -> usize {
        self.input.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input.is_empty()
    }

    /// The reader's current absolute position.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Moves the reader to an absolute byte offset. Offsets past the end of the
    /// input are accepted; subsequent reads simply return no bytes.
    pub fn seek(&mut self, offset: usize) {
        self.position = offset;
    }

    /// Reads up to `n` bytes starting at the current position and advances past
    /// them. Returns fewer than `n` bytes (possibly zero) if the input is
    /// exhausted first; never fails.
    pub fn read_bytes(&mut self, n: usize) -> &'a [u8] {
        if self.position >= self.input.len() {
            return &self.input[self.input.len()..];
        }
        let end = (self.position + n).min(self.input.len());
        let slice = &self.input[self.position..end];
        self.position = end;
        slice
    }

    /// Reads a single byte, returning `None` at end of input.
    pub fn read_u8(&mut self) -> Option<u8> {
        let bytes = self.read_bytes(1);
        bytes.first().copied()
    }

    /// Returns a slice of `n` bytes starting at the current position without
    /// advancing, for peeking purposes.
    pub fn peek_bytes(&self, n: usize) -> &'a [u8] {
        if self.position >= self.input.len() {
            return &self.input[self.input.len()..];
        }
        let end = (self.position + n).min(self.input.len());
        &self.input[self.position..end]
    }

    /// Interprets the next `n` bytes as a big-endian unsigned integer, for
    /// `n` in `{1, 2, 4, 8, 16}`. Returns `None` (the "generic sized-int" escape
    /// that callers turn into a `Raw` sentinel) for any other width or on a short
    /// read.
    pub fn read_sized_uint(&mut self, n: usize) -> Option<BigUint> {
        if !matches!(n, 1 | 2 | 4 | 8 | 16) {
            return None;
        }
        let bytes = self.read_bytes(n);
        if bytes.len() != n {
            return None;
        }
        Some(BigUint::from_bytes_be(bytes))
    }

    /// Interprets the next `n` bytes as a big-endian unsigned integer for any
    /// width, including zero (which reads no bytes and yields zero). Used for
    /// offset-table entries and object references, whose declared widths are
    /// not restricted to the object-format's fixed set of sizes. Returns `None`
    /// on a short read, distinguishing "entry absent" from "entry present".
    pub fn read_uint(&mut self, n: usize) -> Option<BigUint> {
        if n == 0 {
            return Some(BigUint::from(0u8));
        }
        let bytes = self.read_bytes(n);
        if bytes.len() != n {
            return None;
        }
        Some(BigUint::from_bytes_be(bytes))
    }

    /// Reads the whole remaining input as bytes, without advancing the position
    /// past what was actually consumed by the caller's own bookkeeping.
    pub fn remaining(&self) -> &'a [u8] {
        if self.position >= self.input.len() {
            &self.input[self.input.len()..]
        } else {
            &self.input[self.position..]
        }
    }
}

/// Reads an entire `Read` source into an owned buffer, for callers that start
/// from a file handle or other stream rather than an in-memory slice.
pub fn read_to_owned_buffer<R: io::Read>(mut source: R) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    source.read_to_end(&mut buffer)?;
    Ok(buffer)
}

/// Converts a `BigUint` offset/count value into a `usize`, saturating to
/// `usize::MAX` rather than panicking on platforms narrower than the encoded
/// width; callers treat an out-of-range result as corruption or EOF downstream.
pub fn biguint_to_usize(value: &BigUint) -> usize {
    usize::try_from(value.clone()).unwrap_or(usize::MAX)
}
