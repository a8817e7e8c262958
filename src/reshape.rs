//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! Post-processing of a decoded [`Value`] tree into a form with a stable,
//! encoding-independent textual rendering. Serializing that rendering to
//! JSON, a report, or anything else is left to the caller; this module only
//! defines what the leaves look like as text, particularly the sentinels.

use std::fmt;

use crate::value::Value;

/// A decoded value, reshaped for display. Structurally identical to
/// [`Value`]; the distinct type exists so downstream rendering code depends
/// on this stable surface rather than reaching into the parser's internals.
#[derive(Clone, Debug)]
pub struct ReshapedValue(Value);

/// Wraps `value` for display. The tree itself is unchanged; only `Display`
/// rendering is affected.
pub fn reshape(value: &Value) -> ReshapedValue {
    ReshapedValue(value.clone())
}

impl fmt::Display for ReshapedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        display_value(&self.0, f)
    }
}

fn display_value(value: &Value, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match value {
        Value::Null | Value::Fill => write!(f, "NULL"),
        Value::Bool(b) => write!(f, "{}", b),
        Value::Integer(i) => write!(f, "{}", i),
        Value::Real(n) => write!(f, "{}", n.into_inner()),
        Value::Date(d) => write!(f, "{}", d.to_rfc3339()),
        Value::Data(bytes) => write!(f, "{}", hex_encode(bytes)),
        Value::AsciiString(bytes) => write!(f, "{}", String::from_utf8_lossy(bytes)),
        Value::Utf16String(s) => write!(f, "{}", s),
        Value::Uid(i) => write!(f, "{}", i),
        Value::Array(items) => {
            write!(f, "[")?;
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    write!(f, ", ")?;
                }
                display_value(item, f)?;
            }
            write!(f, "]")
        }
        Value::Dict(entries) => {
            write!(f, "{{")?;
            for (index, (key, entry)) in entries.iter().enumerate() {
                if index > 0 {
                    write!(f, ", ")?;
                }
                display_value(key, f)?;
                write!(f, ": ")?;
                display_value(entry, f)?;
            }
            write!(f, "}}")
        }
        Value::Raw(bytes) => write!(f, "RAW({})", hex_encode(bytes)),
        Value::CorruptRef(_) => write!(f, "CORRUPTREF()"),
        Value::Unknown(_) => write!(f, "UNKNOWN()"),
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Dict;

    #[test]
    fn test_reshape_renders_all_sentinels() {
        let mut dict = Dict::new();
        dict.insert(Value::AsciiString(b"k".to_vec()), Value::Null);

        let tree = Value::Array(vec![
            Value::Null,
            Value::Raw(vec![0xDE, 0xAD]),
            Value::CorruptRef(3),
            Value::Unknown(0x07),
            Value::Dict(dict),
        ]);

        let rendered = reshape(&tree).to_string();
        assert!(rendered.contains("NULL"));
        assert!(rendered.contains("RAW(dead)"));
        assert!(rendered.contains("CORRUPTREF()"));
        assert!(rendered.contains("UNKNOWN()"));
    }

    #[test]
    fn test_reshape_renders_scalars() {
        assert_eq!(reshape(&Value::Bool(true)).to_string(), "true");
        assert_eq!(reshape(&Value::AsciiString(b"hi".to_vec())).to_string(), "hi");
    }
}
