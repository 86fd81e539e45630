//! Format description tree and fixed-width integer primitives.

use std::collections::BTreeMap;

use wirespec_buffers::ChunkedBytes;

/// Byte order of a fixed-width integer field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Big,
    Little,
}

/// Width and byte order of an integer field.
///
/// Widths from 1 to 8 bytes are supported; decoded values are zero-extended
/// to 64 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntSpec {
    pub length: u8,
    pub endian: Endian,
}

impl IntSpec {
    /// A single byte. Byte order is immaterial at width 1.
    pub const BYTE: IntSpec = IntSpec::new(1, Endian::Big);

    /// Creates an integer spec, panicking on an unsupported width.
    pub const fn new(length: u8, endian: Endian) -> Self {
        assert!(
            length >= 1 && length <= 8,
            "integer width must be between 1 and 8 bytes"
        );
        Self { length, endian }
    }

    /// Emits the low `length` bytes of `value` in the declared byte order.
    ///
    /// Bits above `length * 8` are discarded.
    pub fn encode(&self, value: u64) -> ChunkedBytes {
        let len = self.length as usize;
        let mut out = Vec::with_capacity(len);
        match self.endian {
            Endian::Big => {
                for i in (0..len).rev() {
                    out.push((value >> (8 * i)) as u8);
                }
            }
            Endian::Little => {
                for i in 0..len {
                    out.push((value >> (8 * i)) as u8);
                }
            }
        }
        ChunkedBytes::from(out)
    }

    /// Reads `length` bytes back into a zero-extended 64-bit value.
    pub fn decode(&self, bytes: &ChunkedBytes) -> u64 {
        debug_assert_eq!(bytes.len(), self.length as usize);
        match self.endian {
            Endian::Big => bytes.bytes().fold(0u64, |acc, b| (acc << 8) | u64::from(b)),
            Endian::Little => bytes
                .bytes()
                .enumerate()
                .fold(0u64, |acc, (i, b)| acc | (u64::from(b) << (8 * i))),
        }
    }
}

/// The format description tree.
///
/// A spec describes one frame of a byte layout. Length-dependent nodes
/// (`Bytes`, `Until`, `Repeat`, `Switch`) reference a variable that must have
/// been bound by an earlier `Variable` node on every path reaching them;
/// referencing an unbound variable at decode or encode time is a programmer
/// error and panics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Spec {
    /// Consume the given number of bytes, yield `Empty`.
    Skip(u32),
    /// Abort decoding of the enclosing stream.
    Stop,
    /// Read a fixed-width integer.
    Integer(IntSpec),
    /// Read a fixed-width integer and bind it to a variable.
    Variable(IntSpec, String),
    /// Read as many bytes as the named variable holds.
    Bytes(String),
    /// Parse children in order.
    Seq(Vec<Spec>),
    /// Carve out a window of `variable` bytes and apply the inner spec
    /// repeatedly until the window is exhausted. A `Stop` raised inside the
    /// window is absorbed as the window's final element.
    Until(String, Box<Spec>),
    /// Apply the inner spec exactly `variable` times.
    Repeat(String, Box<Spec>),
    /// Select a branch by the value of the selector variable.
    Switch {
        selector: String,
        cases: BTreeMap<u64, Spec>,
        default: Box<Spec>,
    },
}

impl Spec {
    /// Convenience constructor for a `Switch` node.
    pub fn switch(
        selector: impl Into<String>,
        cases: impl IntoIterator<Item = (u64, Spec)>,
        default: Spec,
    ) -> Spec {
        Spec::Switch {
            selector: selector.into(),
            cases: cases.into_iter().collect(),
            default: Box::new(default),
        }
    }
}
