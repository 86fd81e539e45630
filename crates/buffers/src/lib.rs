//! Chunked byte buffer for the wirespec engine.
//!
//! This crate provides [`ChunkedBytes`], a queue of immutable byte chunks
//! with O(1) append and cheap prefix extraction, used as the input buffer of
//! the streaming decoder and as the output of the encoder.
//!
//! # Example
//!
//! ```
//! use wirespec_buffers::ChunkedBytes;
//!
//! let mut buf = ChunkedBytes::new();
//! buf.push_slice(&[1, 2, 3]);
//! buf.push_slice(&[4, 5]);
//!
//! let head = buf.split_prefix(4).unwrap();
//! assert_eq!(head.to_vec(), vec![1, 2, 3, 4]);
//! assert_eq!(buf.to_vec(), vec![5]);
//! ```

mod chunked;
mod print_octets;

pub use chunked::ChunkedBytes;
pub use print_octets::print_octets;

/// Underflow report from a read that would pass the end of the buffered data.
///
/// Carries a lower bound on the number of additional bytes required for the
/// failed read to succeed. The buffer is left unchanged, so the same read can
/// be retried after more data arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Incomplete(pub usize);

impl std::fmt::Display for Incomplete {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "incomplete input: need at least {} more bytes", self.0)
    }
}

impl std::error::Error for Incomplete {}
