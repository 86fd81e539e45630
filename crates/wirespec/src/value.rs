//! Decoded value tree.

use std::ops::Index;

use wirespec_buffers::ChunkedBytes;

use crate::spec::Spec;

/// The tree produced by decoding, and accepted by encoding.
///
/// Integer values are unsigned and widened to 64 bits. `Stop` records the
/// spec node that aborted the stream together with the offending selector
/// value (zero for a bare `Stop` node).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedValue {
    Empty,
    Integer(u64),
    Bytes(ChunkedBytes),
    Seq(Vec<DecodedValue>),
    Stop(Spec, u64),
}

impl DecodedValue {
    /// True for the `Stop` variant.
    pub fn is_stop(&self) -> bool {
        matches!(self, DecodedValue::Stop(..))
    }

    /// Returns the integer value. Panics on any other variant.
    pub fn as_integer(&self) -> u64 {
        match self {
            DecodedValue::Integer(value) => *value,
            other => panic!("expected an integer value, got {other:?}"),
        }
    }

    /// Returns the byte payload. Panics on any other variant.
    pub fn as_bytes(&self) -> &ChunkedBytes {
        match self {
            DecodedValue::Bytes(bytes) => bytes,
            other => panic!("expected a bytes value, got {other:?}"),
        }
    }

    /// Returns the child values of a sequence. Panics on any other variant.
    pub fn as_seq(&self) -> &[DecodedValue] {
        match self {
            DecodedValue::Seq(children) => children,
            other => panic!("expected a sequence value, got {other:?}"),
        }
    }
}

impl Index<usize> for DecodedValue {
    type Output = DecodedValue;

    fn index(&self, index: usize) -> &DecodedValue {
        &self.as_seq()[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        assert_eq!(DecodedValue::Integer(7).as_integer(), 7);
        let bytes = DecodedValue::Bytes(ChunkedBytes::from(vec![1, 2]));
        assert_eq!(bytes.as_bytes().to_vec(), vec![1, 2]);
        let seq = DecodedValue::Seq(vec![DecodedValue::Empty, DecodedValue::Integer(9)]);
        assert_eq!(seq.as_seq().len(), 2);
        assert_eq!(seq[1].as_integer(), 9);
    }

    #[test]
    fn test_is_stop() {
        assert!(DecodedValue::Stop(Spec::Stop, 0).is_stop());
        assert!(!DecodedValue::Empty.is_stop());
    }

    #[test]
    fn test_bytes_equality_ignores_chunking() {
        let mut split = ChunkedBytes::from(vec![1]);
        split.append(ChunkedBytes::from(vec![2, 3]));
        let whole = ChunkedBytes::from(vec![1, 2, 3]);
        assert_eq!(DecodedValue::Bytes(split), DecodedValue::Bytes(whole));
    }

    #[test]
    #[should_panic(expected = "expected an integer value")]
    fn test_as_integer_wrong_variant_panics() {
        DecodedValue::Empty.as_integer();
    }

    #[test]
    #[should_panic(expected = "expected a sequence value")]
    fn test_index_non_seq_panics() {
        let _ = DecodedValue::Integer(1)[0];
    }
}
