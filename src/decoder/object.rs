//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! Per-object decoding: reads one marker byte at a given offset and produces
//! a [`Value`], dispatched by the marker's high nibble. Never fails; anything
//! it cannot make sense of becomes a sentinel and flags the document corrupt.

use chrono::{DateTime, NaiveDate, Utc};
use log::{trace, warn};
use num_bigint::{BigInt, Sign};
use num_traits::ToPrimitive;
use ordered_float::OrderedFloat;

use crate::document::{split_marker, ObjectFormat};
use crate::value::Value;

use super::Decoder;

/// Low-nibble values with defined meaning under the `Singleton` (`0x0`) format.
const SINGLETON_NULL: u8 = 0x0;
const SINGLETON_FALSE: u8 = 0x8;
const SINGLETON_TRUE: u8 = 0x9;
const SINGLETON_FILL: u8 = 0xF;

/// Low nibble signaling that the true count follows as an embedded integer object.
const EXTENDED_COUNT_MARKER: u8 = 0xF;

fn plist_epoch() -> DateTime<Utc> {
    let date = NaiveDate::from_ymd_opt(2001, 1, 1).expect("2001-01-01 is a valid date");
    let naive = date.and_hms_opt(0, 0, 0).expect("midnight is a valid time");
    DateTime::from_utc(naive, Utc)
}

/// Converts a non-negative `BigInt` to `usize`, saturating on overflow and
/// flooring negative values to zero (an extended-count object is never
/// meaningfully negative; a negative value here is itself a corruption signal
/// the caller already flags).
fn bigint_to_usize_saturating(value: &BigInt) -> usize {
    if value.sign() == Sign::Minus {
        0
    } else {
        value.to_usize().unwrap_or(usize::MAX)
    }
}

impl<'a> Decoder<'a> {
    /// Decodes exactly one object whose marker byte begins at `offset`.
    pub(super) fn decode_object_at(&mut self, offset: usize) -> Value {
        self.reader.seek(offset);
        let marker = match self.reader.read_u8() {
            Some(marker) => marker,
            None => {
                warn!("object at offset {} has no marker byte (end of file)", offset);
                self.mark_corrupt();
                return Value::Raw(Vec::new());
            }
        };
        let (high, low) = split_marker(marker);
        trace!("object at offset {}: marker {:#04x} (high={:#x} low={:#x})", offset, marker, high, low);

        match ObjectFormat::from_high_nibble(high) {
            ObjectFormat::Singleton => self.decode_singleton(low, marker),
            ObjectFormat::Integer => self.decode_integer(low),
            ObjectFormat::Real => self.decode_real(low),
            ObjectFormat::Date => self.decode_date(),
            ObjectFormat::Data => {
                let count = self.read_extended_count(low);
                self.decode_data(count)
            }
            ObjectFormat::AsciiString => {
                let count = self.read_extended_count(low);
                self.decode_ascii_string(count)
            }
            ObjectFormat::Utf16String => {
                let count = self.read_extended_count(low);
                self.decode_utf16_string(count)
            }
            ObjectFormat::Uid => self.decode_uid(low),
            ObjectFormat::Array => {
                let count = self.read_extended_count(low);
                self.decode_array(count)
            }
            ObjectFormat::Dictionary => {
                let count = self.read_extended_count(low);
                self.decode_dict(count)
            }
            ObjectFormat::Unrecognized => {
                warn!("marker {:#04x} has an unrecognized high nibble", marker);
                self.mark_corrupt();
                Value::Unknown(marker)
            }
        }
    }

    fn decode_singleton(&mut self, low: u8, marker: u8) -> Value {
        match low {
            SINGLETON_NULL => Value::Null,
            SINGLETON_FALSE => Value::Bool(false),
            SINGLETON_TRUE => Value::Bool(true),
            SINGLETON_FILL => Value::Fill,
            _ => {
                warn!("singleton marker {:#04x} has no defined meaning", marker);
                self.mark_corrupt();
                Value::Unknown(marker)
            }
        }
    }

    fn decode_integer(&mut self, low: u8) -> Value {
        let size = 1usize << low;
        let bytes = self.reader.read_bytes(size);
        if bytes.len() != size {
            warn!("integer object truncated: wanted {} bytes, got {}", size, bytes.len());
            self.mark_corrupt();
            return Value::Raw(bytes.to_vec());
        }
        if !matches!(size, 1 | 2 | 4 | 8 | 16) {
            warn!("integer object has unsupported width {} bytes", size);
            self.mark_corrupt();
            return Value::Raw(bytes.to_vec());
        }
        let value = if (size == 8 || size == 16) && self.integers_are_signed() {
            BigInt::from_signed_bytes_be(bytes)
        } else {
            BigInt::from_bytes_be(Sign::Plus, bytes)
        };
        Value::Integer(value)
    }

    fn decode_real(&mut self, low: u8) -> Value {
        let size = 1usize << low;
        let bytes = self.reader.read_bytes(size);
        if bytes.len() != size {
            warn!("real object truncated: wanted {} bytes, got {}", size, bytes.len());
            self.mark_corrupt();
            return Value::Raw(bytes.to_vec());
        }
        let value = match size {
            4 => {
                let mut buf = [0u8; 4];
                buf.copy_from_slice(bytes);
                f32::from_be_bytes(buf) as f64
            }
            8 => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(bytes);
                f64::from_be_bytes(buf)
            }
            _ => {
                warn!("real object has unsupported width {} bytes", size);
                self.mark_corrupt();
                return Value::Raw(bytes.to_vec());
            }
        };
        Value::Real(OrderedFloat(value))
    }

    fn decode_date(&mut self) -> Value {
        let bytes = self.reader.read_bytes(8);
        if bytes.len() != 8 {
            warn!("date object truncated: wanted 8 bytes, got {}", bytes.len());
            self.mark_corrupt();
            return Value::Raw(bytes.to_vec());
        }
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        let seconds = f64::from_be_bytes(buf);
        let micros = (seconds * 1_000_000.0).round() as i64;
        Value::Date(plist_epoch() + chrono::Duration::microseconds(micros))
    }

    fn decode_data(&mut self, count: usize) -> Value {
        let bytes = self.reader.read_bytes(count);
        if bytes.len() != count {
            warn!("data object truncated: wanted {} bytes, got {}", count, bytes.len());
            self.mark_corrupt();
        }
        Value::Data(bytes.to_vec())
    }

    fn decode_ascii_string(&mut self, count: usize) -> Value {
        let bytes = self.reader.read_bytes(count);
        if bytes.len() != count {
            warn!("ascii string truncated: wanted {} bytes, got {}", count, bytes.len());
            self.mark_corrupt();
        }
        Value::AsciiString(bytes.to_vec())
    }

    fn decode_utf16_string(&mut self, count: usize) -> Value {
        let byte_len = count.checked_mul(2).unwrap_or(usize::MAX);
        let bytes = self.reader.read_bytes(byte_len);
        if bytes.len() != byte_len {
            warn!("utf-16 string truncated: wanted {} bytes, got {}", byte_len, bytes.len());
            self.mark_corrupt();
            return Value::Raw(bytes.to_vec());
        }
        let units: Vec<u16> = bytes.chunks_exact(2).map(|pair| u16::from_be_bytes([pair[0], pair[1]])).collect();
        match String::from_utf16(&units) {
            Ok(string) => Value::Utf16String(string),
            Err(_) => {
                warn!("utf-16 string contains an invalid code unit sequence");
                self.mark_corrupt();
                Value::Raw(bytes.to_vec())
            }
        }
    }

    fn decode_uid(&mut self, low: u8) -> Value {
        let size = low as usize + 1;
        let bytes = self.reader.read_bytes(size);
        if bytes.len() != size {
            warn!("uid object truncated: wanted {} bytes, got {}", size, bytes.len());
            self.mark_corrupt();
            return Value::Raw(bytes.to_vec());
        }
        Value::Uid(BigInt::from_bytes_be(Sign::Plus, bytes))
    }

    /// Resolves the low-nibble count field, following the extended-count
    /// object when the low nibble is `0xF`.
    pub(super) fn read_extended_count(&mut self, low: u8) -> usize {
        if low != EXTENDED_COUNT_MARKER {
            return low as usize;
        }
        let offset = self.reader.position();
        match self.decode_object_at(offset) {
            Value::Integer(count) => bigint_to_usize_saturating(&count),
            other => {
                warn!("extended count object was not an integer: {:?}", other);
                self.mark_corrupt();
                0
            }
        }
    }
}
