//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! # The parsed-value model.
//!
//! A bplist document decodes into a tree of [`Value`]. In addition to the object
//! kinds a well-formed document can contain, the tree may also hold one of three
//! sentinels (`Raw`, `CorruptRef`, `Unknown`) produced in place of data the decoder
//! could not make sense of. Forensic consumers are expected to detect these by tag
//! rather than by catching an error, since a single corrupt object should not prevent
//! the rest of the document from being recovered.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use num_bigint::BigInt;
use ordered_float::OrderedFloat;

/// An ordered mapping from parsed values to parsed values.
///
/// Backed by an [`IndexMap`] so that the order in which key/value pairs were
/// encountered during parsing is preserved, rather than being scrambled by a
/// hash-bucket layout.
pub type Dict = IndexMap<Value, Value>;

/// Any value which can appear in a decoded bplist document, including the
/// forensic sentinels produced when part of the document cannot be decoded.
#[derive(Clone, Debug)]
pub enum Value {
    /// An explicit null marker (`0x00`).
    Null,
    /// A boolean literal.
    Bool(bool),
    /// A platform "fill" byte (`0x0F`), used for padding. Rendered as absent/null.
    Fill,
    /// An arbitrary-precision signed or unsigned integer.
    Integer(BigInt),
    /// A 32- or 64-bit IEEE-754 floating point value.
    Real(OrderedFloat<f64>),
    /// An instant in UTC, decoded from seconds (with sub-second precision) since
    /// the plist epoch, 2001-01-01T00:00:00Z.
    Date(DateTime<Utc>),
    /// An opaque byte string.
    Data(Vec<u8>),
    /// An 8-bit byte string. Stored as raw bytes rather than `String` because a
    /// forensic input may contain bytes not valid in whatever encoding a downstream
    /// consumer ultimately chooses to render them with.
    AsciiString(Vec<u8>),
    /// A Unicode string decoded from big-endian UTF-16.
    Utf16String(String),
    /// An unsigned integer tagged as a UID reference (used by `NSKeyedArchiver`).
    Uid(BigInt),
    /// An ordered sequence of values.
    Array(Vec<Value>),
    /// An ordered mapping of values to values.
    Dict(Dict),

    /// Sentinel: bytes that were expected to form a typed object but could not be
    /// decoded as one (wrong size, truncated, or otherwise malformed).
    Raw(Vec<u8>),
    /// Sentinel: a container slot whose reference could not be resolved, either
    /// because it pointed outside the offset table or because it would have
    /// formed a cycle. Carries the offending reference index for diagnostics.
    CorruptRef(usize),
    /// Sentinel: a marker byte whose low nibble has no defined meaning. Carries
    /// the raw marker byte for diagnostics.
    Unknown(u8),
}

impl Value {
    /// True if this value is one of the forensic sentinels rather than data
    /// recovered from the document.
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Value::Raw(_) | Value::CorruptRef(_) | Value::Unknown(_))
    }

    /// A short string key standing in for a value that cannot be used directly
    /// as a dictionary key (a corrupt reference, or a container value).
    ///
    /// `CorruptRef` keys become `"corrupt:<index>"` per the documented convention;
    /// anything else not otherwise hashable in practice (an `Array` or `Dict`
    /// used as a key, which a well-formed plist never produces) becomes a short
    /// debug rendering instead.
    pub fn coerced_key(&self) -> Value {
        match self {
            Value::CorruptRef(index) => Value::AsciiString(format!("corrupt:{}", index).into_bytes()),
            Value::Array(_) | Value::Dict(_) => {
                Value::AsciiString(format!("{:?}", self).into_bytes())
            }
            other => other.clone(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Fill, Fill) => true,
            (Integer(a), Integer(b)) => a == b,
            (Real(a), Real(b)) => a == b,
            (Date(a), Date(b)) => a == b,
            (Data(a), Data(b)) => a == b,
            (AsciiString(a), AsciiString(b)) => a == b,
            (Utf16String(a), Utf16String(b)) => a == b,
            (Uid(a), Uid(b)) => a == b,
            (Array(a), Array(b)) => a == b,
            (Dict(a), Dict(b)) => a.len() == b.len() && a.iter().all(|(k, v)| b.get(k) == Some(v)),
            (Raw(a), Raw(b)) => a == b,
            (CorruptRef(a), CorruptRef(b)) => a == b,
            (Unknown(a), Unknown(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

/// Manual implementation is required because [`IndexMap`] does not implement
/// [`Hash`] (a hash map's hash would need to be independent of iteration order).
/// The `Dict` arm combines per-entry hashes with `wrapping_add`, which is
/// commutative, so two maps with the same entries in different orders hash
/// identically.
impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null | Value::Fill => {}
            Value::Bool(b) => b.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Real(f) => f.hash(state),
            Value::Date(d) => d.hash(state),
            Value::Data(bytes) => bytes.hash(state),
            Value::AsciiString(bytes) => bytes.hash(state),
            Value::Utf16String(s) => s.hash(state),
            Value::Uid(i) => i.hash(state),
            Value::Array(values) => values.hash(state),
            Value::Dict(map) => {
                let combined = map.iter().fold(0u64, |acc, (k, v)| {
                    let mut hasher = DefaultHasher::new();
                    k.hash(&mut hasher);
                    v.hash(&mut hasher);
                    acc.wrapping_add(hasher.finish())
                });
                combined.hash(state);
            }
            Value::Raw(bytes) => bytes.hash(state),
            Value::CorruptRef(index) => index.hash(state),
            Value::Unknown(marker) => marker.hash(state),
        }
    }
}
