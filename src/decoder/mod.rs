//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! The decoder: header/trailer/offset-table parsing and parse orchestration.
//! Object-level decode logic lives in [`object`]; array/dict reference
//! resolution and cycle detection live in [`container`].

mod container;
mod object;

use std::collections::BTreeSet;

use log::{debug, trace, warn};

use crate::document::{Header, OffsetTable, Trailer, HEADER_MAGIC_NUMBER, HEADER_SIZE, TRAILER_SIZE};
use crate::error::{FormatError, Result};
use crate::options::DecoderOptions;
use crate::reader::{biguint_to_usize, ByteReader};
use crate::value::Value;

/// Decodes a single binary property list document held in memory.
///
/// A `Decoder` borrows its input for its entire lifetime; construct one per
/// document. All decoder state is discarded when `parse` returns.
pub struct Decoder<'a> {
    reader: ByteReader<'a>,
    options: DecoderOptions,

    version: [u8; 2],
    offset_int_size: usize,
    object_ref_size: usize,
    object_count: usize,
    top_object_index: usize,
    object_offsets: OffsetTable,

    objects_traversed: BTreeSet<usize>,
    is_corrupt: bool,
}

impl<'a> Decoder<'a> {
    /// Creates a decoder over a borrowed byte slice, using default options.
    ///
    /// Callers starting from a `Read + Seek` source (a file, a cursor over a
    /// network buffer) should read it fully into an owned buffer first -
    /// [`crate::reader::read_to_owned_buffer`] does this - and construct the
    /// decoder over that buffer, since the offset-table model requires random
    /// access to the whole document.
    pub fn new(input: &'a [u8]) -> Self {
        Self::with_options(input, DecoderOptions::default())
    }

    /// Creates a decoder with explicit [`DecoderOptions`].
    pub fn with_options(input: &'a [u8], options: DecoderOptions) -> Self {
        Decoder {
            reader: ByteReader::new(input),
            options,
            version: [0, 0],
            offset_int_size: 0,
            object_ref_size: 0,
            object_count: 0,
            top_object_index: 0,
            object_offsets: Vec::new(),
            objects_traversed: BTreeSet::new(),
            is_corrupt: false,
        }
    }

    /// True if any recoverable anomaly was observed during `parse`.
    pub fn is_corrupt(&self) -> bool {
        self.is_corrupt
    }

    /// Runs the full decode pipeline: header, trailer, offset table, then the
    /// root object and everything reachable from it.
    pub fn parse(&mut self) -> Result<Value> {
        let header = self.read_header()?;
        self.version = header.version;
        trace!("bplist header version {:?}", self.version);

        let trailer = self.read_trailer()?;
        self.offset_int_size = trailer.offset_int_size;
        self.object_ref_size = trailer.object_ref_size;
        self.object_count = trailer.object_count;
        self.top_object_index = trailer.top_object_index;
        debug!(
            "trailer: object_count={} top_object_index={} offset_int_size={} object_ref_size={}",
            self.object_count, self.top_object_index, self.offset_int_size, self.object_ref_size
        );

        self.object_offsets = self.read_offset_table(&trailer)?;
        debug!("offset table has {} entries", self.object_offsets.len());

        self.objects_traversed.insert(self.top_object_index);

        if self.top_object_index >= self.object_offsets.len() {
            warn!(
                "top_object_index {} is out of range of the offset table ({} entries)",
                self.top_object_index,
                self.object_offsets.len()
            );
            self.mark_corrupt();
            return Ok(Value::CorruptRef(self.top_object_index));
        }

        let offset = self.object_offsets[self.top_object_index];
        Ok(self.decode_object_at(offset))
    }

    /// True for documents whose integer version tag precedes `"01"`, in which
    /// 8- and 16-byte integers decode as two's-complement signed rather than
    /// unsigned.
    fn integers_are_signed(&self) -> bool {
        Header { version: self.version }.integers_are_signed()
    }

    fn mark_corrupt(&mut self) {
        self.is_corrupt = true;
    }

    fn read_header(&mut self) -> Result<Header> {
        if self.reader.len() < HEADER_SIZE {
            warn!("input is shorter than a bplist header ({} bytes)", self.reader.len());
            return Err(FormatError::Eof);
        }
        self.reader.seek(0);
        let magic = self.reader.read_bytes(HEADER_MAGIC_NUMBER.len());
        if magic != HEADER_MAGIC_NUMBER {
            warn!("missing bplist magic number");
            return Err(FormatError::MissingMagic);
        }
        let version_bytes = self.reader.read_bytes(2);
        let mut version = [0u8; 2];
        version.copy_from_slice(version_bytes);
        Ok(Header { version })
    }

    fn read_trailer(&mut self) -> Result<Trailer> {
        if self.reader.len() < TRAILER_SIZE {
            warn!("input is shorter than a bplist trailer ({} bytes)", self.reader.len());
            return Err(FormatError::MissingTrailer);
        }
        let trailer_offset = self.reader.len() - TRAILER_SIZE;
        self.reader.seek(trailer_offset);

        // 5 unused bytes, then sort_version.
        self.reader.read_bytes(5);
        let sort_version = self.reader.read_u8().unwrap_or(0);
        let offset_int_size = self.reader.read_u8().unwrap_or(0) as usize;
        let object_ref_size = self.reader.read_u8().unwrap_or(0) as usize;
        let object_count = biguint_to_usize(&self.reader.read_uint(8).unwrap_or_default());
        let top_object_index = biguint_to_usize(&self.reader.read_uint(8).unwrap_or_default());
        let offset_table_offset = biguint_to_usize(&self.reader.read_uint(8).unwrap_or_default());

        Ok(Trailer {
            sort_version,
            offset_int_size,
            object_ref_size,
            object_count,
            top_object_index,
            offset_table_offset,
        })
    }

    fn read_offset_table(&mut self, trailer: &Trailer) -> Result<OffsetTable> {
        if trailer.object_count > 0 && trailer.offset_table_offset >= self.reader.len() {
            warn!(
                "offset_table_offset {} is past end of file ({} bytes)",
                trailer.offset_table_offset,
                self.reader.len()
            );
            return Err(FormatError::OffsetTablePastEndOfFile(0));
        }
        self.reader.seek(trailer.offset_table_offset);
        let mut offsets = Vec::new();
        for index in 0..trailer.object_count {
            match self.reader.read_uint(trailer.offset_int_size) {
                Some(value) => {
                    let offset = biguint_to_usize(&value);
                    if offset >= self.reader.len() {
                        warn!(
                            "offset table entry {} points to {}, past end of file ({} bytes)",
                            index,
                            offset,
                            self.reader.len()
                        );
                        return Err(FormatError::OffsetTablePastEndOfFile(index));
                    }
                    offsets.push(offset);
                }
                None => {
                    debug!("offset table truncated after {} of {} entries", offsets.len(), trailer.object_count);
                    break;
                }
            }
        }
        Ok(offsets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Layout: `bplist00` (8) + object byte `0x09` (idx 8) + one-byte offset
    /// table entry `0x08` (idx 9) + 32-byte trailer (idx 10..42).
    fn minimal_single_bool() -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"bplist00");
        bytes.push(0x09); // object 0: `true`, at absolute offset 8
        bytes.push(0x08); // offset table entry 0: object 0 lives at offset 8
        bytes.extend_from_slice(&[0u8; 5]); // trailer: 5 unused bytes
        bytes.push(0); // sort_version
        bytes.push(1); // offset_int_size
        bytes.push(0); // object_ref_size (unused, no containers)
        bytes.extend_from_slice(&1u64.to_be_bytes()); // object_count
        bytes.extend_from_slice(&0u64.to_be_bytes()); // top_object_index
        bytes.extend_from_slice(&9u64.to_be_bytes()); // offset_table_offset
        bytes
    }

    #[test]
    fn test_parse_minimal_single_bool() {
        let bytes = minimal_single_bool();
        let mut decoder = Decoder::new(&bytes);
        let value = decoder.parse().expect("well-formed minimal document");
        assert_eq!(value, Value::Bool(true));
        assert!(!decoder.is_corrupt());
    }

    #[test]
    fn test_parse_rejects_missing_magic() {
        let bytes = b"not a plist at all, but long enough to hold a trailer region!!".to_vec();
        let mut decoder = Decoder::new(&bytes);
        assert_eq!(decoder.parse().unwrap_err(), FormatError::MissingMagic);
    }

    #[test]
    fn test_parse_rejects_too_short_input() {
        let mut decoder = Decoder::new(b"bla");
        assert_eq!(decoder.parse().unwrap_err(), FormatError::Eof);

        let mut decoder = Decoder::new(b"");
        assert_eq!(decoder.parse().unwrap_err(), FormatError::Eof);
    }

    #[test]
    fn test_parse_rejects_offset_table_past_end_of_file() {
        let mut bytes = b"bplist00".to_vec();
        bytes.extend_from_slice(&[0u8; 32]); // pad to a plausible size
        let len = bytes.len();
        let trailer_start = len - 32;
        bytes[trailer_start + 5] = 0; // sort_version
        bytes[trailer_start + 6] = 1; // offset_int_size
        bytes[trailer_start + 7] = 1; // object_ref_size
        bytes[trailer_start + 8..trailer_start + 16].copy_from_slice(&1u64.to_be_bytes());
        bytes[trailer_start + 16..trailer_start + 24].copy_from_slice(&0u64.to_be_bytes());
        bytes[trailer_start + 24..trailer_start + 32].copy_from_slice(&0xFFFFu64.to_be_bytes());

        let mut decoder = Decoder::new(&bytes);
        assert_eq!(decoder.parse().unwrap_err(), FormatError::OffsetTablePastEndOfFile(0));
    }
}
