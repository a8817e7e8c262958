//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! Array and dictionary decoding: reads fixed-width object references and
//! resolves each through the offset table under cycle-detection discipline.
//!
//! Reference resolution pushes the resolved index onto `objects_traversed`
//! for the duration of the recursive decode and pops it on every return path.
//! A true RAII guard that borrows `objects_traversed` can't also permit the
//! recursive `&mut self` call it wraps, so the push/pop is written out by
//! hand instead; it is safe because nothing in this decoder panics or returns
//! early via `?` between the two.

use log::warn;

use crate::options::ZeroRefSizePolicy;
use crate::value::{Dict, Value};

use super::Decoder;

/// A reference read from a container, or `None` if its bytes could not be
/// read at all (as opposed to being read but pointing out of range).
type MaybeReference = Option<usize>;

impl<'a> Decoder<'a> {
    pub(super) fn decode_array(&mut self, count: usize) -> Value {
        let refs = self.read_references(count);
        let items = refs.into_iter().map(|r| self.resolve_reference(r)).collect();
        Value::Array(items)
    }

    pub(super) fn decode_dict(&mut self, count: usize) -> Value {
        let key_refs = self.read_references(count);
        let value_refs = self.read_references(count);

        let mut dict = Dict::new();
        for (key_ref, value_ref) in key_refs.into_iter().zip(value_refs.into_iter()) {
            let key = self.resolve_reference(key_ref).coerced_key();
            let value = self.resolve_reference(value_ref);
            dict.insert(key, value);
        }
        Value::Dict(dict)
    }

    fn read_references(&mut self, count: usize) -> Vec<MaybeReference> {
        (0..count).map(|_| self.read_reference()).collect()
    }

    fn read_reference(&mut self) -> MaybeReference {
        if self.object_ref_size == 0 {
            return match self.options.zero_ref_size_policy {
                ZeroRefSizePolicy::TreatAsIndexZeroAndFlagCorrupt => {
                    warn!("object_ref_size is zero; treating every reference as index 0");
                    self.mark_corrupt();
                    Some(0)
                }
                ZeroRefSizePolicy::TreatAsIndexZeroSilently => Some(0),
            };
        }
        match self.reader.read_uint(self.object_ref_size) {
            Some(value) => Some(crate::reader::biguint_to_usize(&value)),
            None => {
                warn!("object reference truncated ({} bytes wide)", self.object_ref_size);
                self.mark_corrupt();
                None
            }
        }
    }

    /// Resolves one reference to its decoded value, enforcing range and cycle checks.
    fn resolve_reference(&mut self, reference: MaybeReference) -> Value {
        let index = match reference {
            Some(index) => index,
            None => return Value::CorruptRef(usize::MAX),
        };

        if index >= self.object_count || index >= self.object_offsets.len() {
            warn!("reference {} is out of range ({} declared objects)", index, self.object_count);
            self.mark_corrupt();
            return Value::CorruptRef(index);
        }

        if self.objects_traversed.contains(&index) {
            warn!("reference {} would form a cycle", index);
            self.mark_corrupt();
            return Value::CorruptRef(index);
        }

        self.objects_traversed.insert(index);
        let offset = self.object_offsets[index];
        let value = self.decode_object_at(offset);
        self.objects_traversed.remove(&index);
        value
    }
}

#[cfg(test)]
mod tests {
    use num_bigint::BigInt;

    use super::*;

    #[test]
    fn test_decode_array_with_nested_array() {
        // refs: [0, 1] | obj0 `true` | obj1 array(low=1) -> ref [0]
        let bytes = [0x00u8, 0x01, 0x09, 0xA1, 0x00];
        let mut decoder = Decoder::new(&bytes);
        decoder.object_ref_size = 1;
        decoder.object_count = 2;
        decoder.object_offsets = vec![2, 3];
        decoder.reader.seek(0);

        let value = decoder.decode_array(2);
        assert_eq!(value, Value::Array(vec![Value::Bool(true), Value::Array(vec![Value::Bool(true)])]));
        assert!(!decoder.is_corrupt());
    }

    #[test]
    fn test_decode_dict_preserves_key_value_pairing_and_order() {
        // key refs [0, 1], value refs [2, 3] | obj0 "a" | obj1 "b" | obj2 1 | obj3 2
        let bytes = [
            0x00u8, 0x01, 0x02, 0x03, // references
            0x51, b'a', // obj0: AsciiString "a"
            0x51, b'b', // obj1: AsciiString "b"
            0x11, 0x00, 0x01, // obj2: Integer 1
            0x11, 0x00, 0x02, // obj3: Integer 2
        ];
        let mut decoder = Decoder::new(&bytes);
        decoder.object_ref_size = 1;
        decoder.object_count = 4;
        decoder.object_offsets = vec![4, 6, 8, 11];
        decoder.reader.seek(0);

        let value = decoder.decode_dict(2);
        let mut expected = Dict::new();
        expected.insert(Value::AsciiString(b"a".to_vec()), Value::Integer(BigInt::from(1)));
        expected.insert(Value::AsciiString(b"b".to_vec()), Value::Integer(BigInt::from(2)));
        assert_eq!(value, Value::Dict(expected));
        assert!(!decoder.is_corrupt());

        match value {
            Value::Dict(map) => {
                let keys: Vec<&Value> = map.keys().collect();
                assert_eq!(keys, vec![&Value::AsciiString(b"a".to_vec()), &Value::AsciiString(b"b".to_vec())]);
            }
            other => panic!("expected a Dict, got {:?}", other),
        }
    }
}
