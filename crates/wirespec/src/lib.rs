//! Declarative binary-format engine.
//!
//! A [`Spec`] describes a structured byte layout: fixed-width integers,
//! length-prefixed byte blocks, repetitions, bounded windows, and selector
//! switches. The [`StreamingDecoder`] consumes a byte stream arriving in
//! chunks of any size and yields a [`DecodedValue`] tree whenever enough
//! input is buffered, suspending with [`Incomplete`] otherwise. The
//! [`Encoder`] is the inverse traversal, composing the exact wire bytes from
//! a value tree.
//!
//! Specs are built programmatically or compiled from a compact format string
//! (see [`parse_format`]).
//!
//! # Example
//!
//! ```
//! use wirespec::{parse_format, StreamingDecoder};
//!
//! // One length byte followed by that many payload bytes.
//! let spec = parse_format("%B s", "len").unwrap();
//! let mut decoder = StreamingDecoder::new(spec);
//!
//! decoder.supply(&[3, 0xaa, 0xbb]);
//! assert!(decoder.next().is_err()); // one payload byte still missing
//!
//! decoder.supply(&[0xcc]);
//! let frame = decoder.next().unwrap();
//! assert_eq!(frame[0].as_integer(), 3);
//! assert_eq!(frame[1].as_bytes().to_vec(), vec![0xaa, 0xbb, 0xcc]);
//! ```

mod encoder;
mod error;
mod spec;
mod streaming_decoder;
mod syntax;
mod value;

pub use encoder::Encoder;
pub use error::FormatError;
pub use spec::{Endian, IntSpec, Spec};
pub use streaming_decoder::StreamingDecoder;
pub use syntax::parse_format;
pub use value::DecodedValue;
pub use wirespec_buffers::{ChunkedBytes, Incomplete};
