//! Queue of immutable byte chunks with cheap concatenation and splitting.

use std::collections::VecDeque;
use std::fmt;

use bytes::Bytes;

use crate::print_octets;
use crate::Incomplete;

/// An ordered sequence of immutable byte chunks with a cached total length.
///
/// Appending a chunk or another `ChunkedBytes` is O(1) and never copies the
/// existing contents; [`split_prefix`](ChunkedBytes::split_prefix) hands out
/// the first `n` bytes as a new value without linearising either side. Chunks
/// are reference counted, so splitting shares the underlying allocations.
///
/// Equality is by concatenated byte content, regardless of how the content is
/// divided into chunks.
#[derive(Clone, Default)]
pub struct ChunkedBytes {
    chunks: VecDeque<Bytes>,
    len: usize,
}

impl ChunkedBytes {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a buffer of `len` zero bytes.
    pub fn zeros(len: usize) -> Self {
        Self::from(vec![0u8; len])
    }

    /// Total number of buffered bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no bytes are buffered.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends one chunk. Empty chunks are dropped.
    pub fn push(&mut self, chunk: impl Into<Bytes>) {
        let chunk = chunk.into();
        if chunk.is_empty() {
            return;
        }
        self.len += chunk.len();
        self.chunks.push_back(chunk);
    }

    /// Appends a copy of `chunk`.
    pub fn push_slice(&mut self, chunk: &[u8]) {
        self.push(Bytes::copy_from_slice(chunk));
    }

    /// Appends all chunks of `other` without copying their contents.
    pub fn append(&mut self, mut other: ChunkedBytes) {
        self.len += other.len;
        self.chunks.append(&mut other.chunks);
    }

    /// Removes the first `len` bytes and returns them as a new buffer.
    ///
    /// The suffix stays in place. When fewer than `len` bytes are buffered
    /// the call fails with the shortfall and the buffer is left untouched. A
    /// chunk straddling the cut is split in place; neither side is copied.
    pub fn split_prefix(&mut self, len: usize) -> Result<ChunkedBytes, Incomplete> {
        if len > self.len {
            return Err(Incomplete(len - self.len));
        }
        let mut prefix = ChunkedBytes::new();
        while prefix.len < len {
            let mut chunk = self
                .chunks
                .pop_front()
                .expect("cached length covers the requested prefix");
            let take = len - prefix.len;
            if chunk.len() > take {
                let head = chunk.split_to(take);
                self.chunks.push_front(chunk);
                prefix.push(head);
            } else {
                prefix.push(chunk);
            }
        }
        self.len -= len;
        Ok(prefix)
    }

    /// Pads with zeros or truncates in place to exactly `len` bytes.
    pub fn resize(&mut self, len: usize) {
        if self.len < len {
            self.append(Self::zeros(len - self.len));
        } else if self.len > len {
            let kept = self
                .split_prefix(len)
                .expect("truncation target is within the buffer");
            *self = kept;
        }
    }

    /// Iterates over the buffered bytes across chunk boundaries.
    pub fn bytes(&self) -> impl Iterator<Item = u8> + '_ {
        self.chunks.iter().flat_map(|chunk| chunk.iter().copied())
    }

    /// Copies the buffered bytes into a contiguous vector.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len);
        for chunk in &self.chunks {
            out.extend_from_slice(chunk);
        }
        out
    }
}

impl PartialEq for ChunkedBytes {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.bytes().eq(other.bytes())
    }
}

impl Eq for ChunkedBytes {}

impl fmt::Debug for ChunkedBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkedBytes[{}]", print_octets(self.bytes(), 16))
    }
}

impl From<Vec<u8>> for ChunkedBytes {
    fn from(data: Vec<u8>) -> Self {
        let mut buf = Self::new();
        buf.push(Bytes::from(data));
        buf
    }
}

impl From<&[u8]> for ChunkedBytes {
    fn from(data: &[u8]) -> Self {
        let mut buf = Self::new();
        buf.push_slice(data);
        buf
    }
}

impl From<Bytes> for ChunkedBytes {
    fn from(chunk: Bytes) -> Self {
        let mut buf = Self::new();
        buf.push(chunk);
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunked(parts: &[&[u8]]) -> ChunkedBytes {
        let mut buf = ChunkedBytes::new();
        for part in parts {
            buf.push_slice(part);
        }
        buf
    }

    #[test]
    fn test_len_and_is_empty() {
        let mut buf = ChunkedBytes::new();
        assert!(buf.is_empty());
        buf.push_slice(&[1, 2, 3]);
        assert_eq!(buf.len(), 3);
        assert!(!buf.is_empty());
    }

    #[test]
    fn test_push_drops_empty_chunks() {
        let mut buf = ChunkedBytes::new();
        buf.push_slice(&[]);
        assert!(buf.is_empty());
        assert_eq!(buf, ChunkedBytes::new());
    }

    #[test]
    fn test_append_concatenates() {
        let mut a = chunked(&[&[1, 2], &[3]]);
        let b = chunked(&[&[4, 5]]);
        a.append(b);
        assert_eq!(a.to_vec(), vec![1, 2, 3, 4, 5]);
        assert_eq!(a.len(), 5);
    }

    #[test]
    fn test_equality_ignores_chunking() {
        let a = chunked(&[&[1, 2, 3], &[4]]);
        let b = chunked(&[&[1], &[2], &[3, 4]]);
        assert_eq!(a, b);
        let c = chunked(&[&[1, 2, 3, 5]]);
        assert_ne!(a, c);
        let d = chunked(&[&[1, 2, 3]]);
        assert_ne!(a, d);
    }

    #[test]
    fn test_split_prefix_within_chunk() {
        let mut buf = chunked(&[&[1, 2, 3, 4, 5]]);
        let head = buf.split_prefix(2).unwrap();
        assert_eq!(head.to_vec(), vec![1, 2]);
        assert_eq!(buf.to_vec(), vec![3, 4, 5]);
    }

    #[test]
    fn test_split_prefix_across_chunks() {
        let mut buf = chunked(&[&[1, 2], &[3, 4], &[5]]);
        let head = buf.split_prefix(3).unwrap();
        assert_eq!(head.to_vec(), vec![1, 2, 3]);
        assert_eq!(buf.to_vec(), vec![4, 5]);
    }

    #[test]
    fn test_split_prefix_zero() {
        let mut buf = chunked(&[&[1, 2]]);
        let head = buf.split_prefix(0).unwrap();
        assert!(head.is_empty());
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn test_split_prefix_underflow_keeps_buffer() {
        let mut buf = chunked(&[&[1, 2, 3]]);
        assert_eq!(buf.split_prefix(5), Err(Incomplete(2)));
        assert_eq!(buf.to_vec(), vec![1, 2, 3]);
    }

    #[test]
    fn test_split_then_append_restores_content() {
        let original = chunked(&[&[1, 2, 3], &[4, 5, 6, 7]]);
        let mut rest = original.clone();
        let mut head = rest.split_prefix(5).unwrap();
        head.append(rest);
        assert_eq!(head, original);
    }

    #[test]
    fn test_zeros() {
        let buf = ChunkedBytes::zeros(4);
        assert_eq!(buf.to_vec(), vec![0, 0, 0, 0]);
        assert!(ChunkedBytes::zeros(0).is_empty());
    }

    #[test]
    fn test_resize_pads() {
        let mut buf = chunked(&[&[9, 9]]);
        buf.resize(5);
        assert_eq!(buf.to_vec(), vec![9, 9, 0, 0, 0]);
    }

    #[test]
    fn test_resize_truncates() {
        let mut buf = chunked(&[&[1, 2], &[3, 4]]);
        buf.resize(3);
        assert_eq!(buf.to_vec(), vec![1, 2, 3]);
    }

    #[test]
    fn test_resize_noop() {
        let mut buf = chunked(&[&[1, 2, 3]]);
        buf.resize(3);
        assert_eq!(buf.to_vec(), vec![1, 2, 3]);
    }

    #[test]
    fn test_debug_prints_octets() {
        let buf = chunked(&[&[0xde, 0xad], &[0xbe, 0xef]]);
        assert_eq!(format!("{buf:?}"), "ChunkedBytes[de ad be ef]");
    }
}
