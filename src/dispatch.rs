//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! Top-level entry points: detect binary vs. XML property lists and route
//! to whichever parser applies. The XML side is an external collaborator,
//! reached only through the [`XmlFallback`] trait boundary defined here.

use std::io::{Read, Seek, SeekFrom};

use log::debug;

use crate::decoder::Decoder;
use crate::document::HEADER_MAGIC_NUMBER;
use crate::error::{FormatError, Result};
use crate::options::DecoderOptions;
use crate::reader::read_to_owned_buffer;
use crate::value::Value;

/// An external XML property-list parser, supplied by the caller.
///
/// This crate implements only the bplist side; a caller that also wants XML
/// support provides its own implementation of this trait. [`NoXmlFallback`]
/// is provided for callers that have none.
pub trait XmlFallback {
    /// Attempts to parse `bytes` as an XML property list.
    fn parse(&self, bytes: &[u8]) -> Result<Value>;
}

/// An [`XmlFallback`] that never succeeds, for callers with no XML parser
/// available. Every input that is not a recognizable bplist is reported as
/// [`FormatError::XmlNotAvailable`].
pub struct NoXmlFallback;

impl XmlFallback for NoXmlFallback {
    fn parse(&self, _bytes: &[u8]) -> Result<Value> {
        Err(FormatError::XmlNotAvailable)
    }
}

/// Reads a property list from `source`, starting at its current position.
///
/// Detects the `bplist` magic number; if present, decodes with [`Decoder`].
/// Otherwise hands the remaining bytes to `xml_fallback`. `source` is read
/// fully into memory, since the bplist offset-table model requires random
/// access.
pub fn read_plist<R: Read, X: XmlFallback>(mut source: R, xml_fallback: &X) -> Result<Value> {
    let buffer = read_to_owned_buffer(&mut source).map_err(|_| FormatError::Eof)?;
    read_plist_bytes(&buffer, xml_fallback)
}

/// Like [`read_plist`], but first seeks `source` to `offset` - for property
/// lists embedded at an arbitrary position within a larger container.
///
/// The remaining bytes from `offset` onward are copied into a fresh buffer
/// before parsing, so `source` need only support seeking to `offset` once
/// rather than arbitrary absolute seeks throughout the decode.
pub fn read_plist_at<R: Read + Seek, X: XmlFallback>(mut source: R, offset: u64, xml_fallback: &X) -> Result<Value> {
    source.seek(SeekFrom::Start(offset)).map_err(|_| FormatError::Eof)?;
    let buffer = read_to_owned_buffer(&mut source).map_err(|_| FormatError::Eof)?;
    debug!("scanning for plist at offset {}", offset);
    read_plist_bytes(&buffer, xml_fallback)
}

fn read_plist_bytes<X: XmlFallback>(bytes: &[u8], xml_fallback: &X) -> Result<Value> {
    if bytes.starts_with(HEADER_MAGIC_NUMBER) {
        debug!("bplist magic number found, decoding as binary plist");
        let mut decoder = Decoder::with_options(bytes, DecoderOptions::default());
        return decoder.parse();
    }
    debug!("no bplist magic number, trying the XML fallback");
    xml_fallback.parse(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn minimal_single_bool() -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"bplist00");
        bytes.push(0x09);
        bytes.push(0x08);
        bytes.extend_from_slice(&[0u8; 5]);
        bytes.push(0);
        bytes.push(1);
        bytes.push(0);
        bytes.extend_from_slice(&1u64.to_be_bytes());
        bytes.extend_from_slice(&0u64.to_be_bytes());
        bytes.extend_from_slice(&9u64.to_be_bytes());
        bytes
    }

    #[test]
    fn test_read_plist_decodes_binary_plist() {
        let bytes = minimal_single_bool();
        let value = read_plist(Cursor::new(bytes), &NoXmlFallback).expect("valid bplist");
        assert_eq!(value, Value::Bool(true));
    }

    #[test]
    fn test_read_plist_falls_back_to_xml_when_no_magic() {
        let value = read_plist(Cursor::new(b"<?xml not really".to_vec()), &NoXmlFallback);
        assert_eq!(value.unwrap_err(), FormatError::XmlNotAvailable);
    }

    #[test]
    fn test_read_plist_at_scans_past_leading_padding() {
        let mut padded = vec![0xAB; 16];
        padded.extend_from_slice(&minimal_single_bool());
        let value = read_plist_at(Cursor::new(padded), 16, &NoXmlFallback).expect("valid bplist after padding");
        assert_eq!(value, Value::Bool(true));
    }
}
