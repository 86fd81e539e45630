//! Incremental decoder over chunked input.

use std::collections::HashMap;

use wirespec_buffers::{ChunkedBytes, Incomplete};

use crate::spec::Spec;
use crate::value::DecodedValue;

/// One entry of the decoder's explicit frame stack.
///
/// The stack replaces language-level recursion so that an input underflow is
/// a plain early return: the frame that failed to read pushes itself back and
/// the decoder resumes from it once more bytes arrive. `Done` only ever
/// appears alone at the bottom, once a top-level value has been produced.
#[derive(Debug, Clone)]
enum Frame {
    /// A spec node not yet started.
    Prepared(Spec),
    /// Terminal sentinel holding the produced top-level value.
    Done(DecodedValue),
    /// A sequence with some children decoded and some pending.
    PartialSeq {
        done: Vec<DecodedValue>,
        remaining: Vec<Spec>,
    },
    /// A repetition with `remaining` further iterations after the current one.
    PartialRepeat {
        done: Vec<DecodedValue>,
        remaining: u64,
        inner: Spec,
    },
}

/// Outcome of a single dispatch step, before it is folded into the public
/// result surface.
enum StepError {
    /// A byte read underflowed; the stack has been restored for resumption.
    Incomplete(Incomplete),
    /// A `Stop` node (or a `Switch` whose chosen branch is `Stop`) fired.
    Stop(Spec, u64),
}

impl From<Incomplete> for StepError {
    fn from(incomplete: Incomplete) -> Self {
        StepError::Incomplete(incomplete)
    }
}

/// Incremental decoder that accepts chunked input and emits decoded values.
///
/// Bytes are fed in with [`supply`](StreamingDecoder::supply) in chunks of
/// any size; [`next`](StreamingDecoder::next) decodes one value per the spec,
/// suspending with [`Incomplete`] whenever the buffered input runs short.
/// Suspension loses no state: supplying more bytes and calling `next` again
/// resumes exactly where the failed read left off.
pub struct StreamingDecoder {
    spec: Spec,
    input: ChunkedBytes,
    stack: Vec<Frame>,
    env: HashMap<String, u64>,
}

impl StreamingDecoder {
    /// Creates a decoder for one stream of `spec`-shaped frames.
    pub fn new(spec: Spec) -> Self {
        let stack = vec![Frame::Prepared(spec.clone())];
        Self {
            spec,
            input: ChunkedBytes::new(),
            stack,
            env: HashMap::new(),
        }
    }

    /// Appends a chunk of input.
    pub fn supply(&mut self, chunk: &[u8]) {
        self.input.push_slice(chunk);
    }

    /// The unconsumed part of the input buffer.
    pub fn remaining(&self) -> &ChunkedBytes {
        &self.input
    }

    /// Rewinds the interpretive state to a fresh `Prepared` frame and clears
    /// the variable environment. The input buffer is kept: consumed bytes are
    /// gone for good, unconsumed bytes feed the next value.
    pub fn reset(&mut self) {
        self.stack.clear();
        self.stack.push(Frame::Prepared(self.spec.clone()));
        self.env.clear();
    }

    /// Decodes until one full value is produced or the input underflows.
    ///
    /// The `Incomplete` carries the least number of additional bytes that
    /// would let the suspended read proceed; calling again without new input
    /// returns the same answer. Once a value is produced, further calls
    /// return it again until [`reset`](StreamingDecoder::reset).
    pub fn next(&mut self) -> Result<DecodedValue, Incomplete> {
        loop {
            match self.step() {
                Ok(Some(value)) => return Ok(value),
                Ok(None) => {}
                Err(StepError::Incomplete(incomplete)) => return Err(incomplete),
                Err(StepError::Stop(spec, selector)) => {
                    let value = DecodedValue::Stop(spec, selector);
                    self.stack.clear();
                    self.stack.push(Frame::Done(value.clone()));
                    return Ok(value);
                }
            }
        }
    }

    /// Decodes values back to back until the input underflows or a `Stop`
    /// value is produced. The `Stop` terminates the batch and is excluded.
    pub fn parse_all(&mut self) -> Vec<DecodedValue> {
        let mut values = self.collect_values();
        if values.last().is_some_and(DecodedValue::is_stop) {
            values.pop();
        }
        values
    }

    /// next/reset loop keeping a terminating `Stop` as the last element.
    ///
    /// Stops on underflow, on an empty buffer, and on an iteration that
    /// consumed no bytes, so zero-width specs cannot spin.
    fn collect_values(&mut self) -> Vec<DecodedValue> {
        let mut values = Vec::new();
        while !self.input.is_empty() {
            let before = self.input.len();
            match self.next() {
                Err(Incomplete(_)) => break,
                Ok(value) => {
                    let stop = value.is_stop();
                    values.push(value);
                    self.reset();
                    if stop || self.input.len() == before {
                        break;
                    }
                }
            }
        }
        values
    }

    /// Pops and dispatches one frame. `Ok(Some)` reports the finished
    /// top-level value, `Ok(None)` plain progress.
    fn step(&mut self) -> Result<Option<DecodedValue>, StepError> {
        let frame = self
            .stack
            .pop()
            .expect("decoder stack holds at least one frame");
        match frame {
            Frame::Done(value) => {
                let out = value.clone();
                self.stack.push(Frame::Done(value));
                Ok(Some(out))
            }
            Frame::Prepared(spec) => self.step_prepared(spec),
            Frame::PartialSeq { done, mut remaining } => {
                if remaining.is_empty() {
                    self.fill_hole(DecodedValue::Seq(done));
                } else {
                    let child = remaining.remove(0);
                    self.stack.push(Frame::PartialSeq { done, remaining });
                    self.stack.push(Frame::Prepared(child));
                }
                Ok(None)
            }
            Frame::PartialRepeat {
                done,
                remaining,
                inner,
            } => {
                if remaining == 0 {
                    self.fill_hole(DecodedValue::Seq(done));
                } else {
                    self.stack.push(Frame::PartialRepeat {
                        done,
                        remaining: remaining - 1,
                        inner: inner.clone(),
                    });
                    self.stack.push(Frame::Prepared(inner));
                }
                Ok(None)
            }
        }
    }

    fn step_prepared(&mut self, spec: Spec) -> Result<Option<DecodedValue>, StepError> {
        match spec {
            Spec::Skip(len) => match self.input.split_prefix(len as usize) {
                Ok(_) => {
                    self.fill_hole(DecodedValue::Empty);
                    Ok(None)
                }
                Err(need) => {
                    self.stack.push(Frame::Prepared(Spec::Skip(len)));
                    Err(need.into())
                }
            },
            Spec::Stop => Err(StepError::Stop(Spec::Stop, 0)),
            Spec::Integer(int) => match self.input.split_prefix(int.length as usize) {
                Ok(bytes) => {
                    self.fill_hole(DecodedValue::Integer(int.decode(&bytes)));
                    Ok(None)
                }
                Err(need) => {
                    self.stack.push(Frame::Prepared(Spec::Integer(int)));
                    Err(need.into())
                }
            },
            Spec::Variable(int, name) => match self.input.split_prefix(int.length as usize) {
                Ok(bytes) => {
                    let value = int.decode(&bytes);
                    self.env.insert(name, value);
                    self.fill_hole(DecodedValue::Integer(value));
                    Ok(None)
                }
                Err(need) => {
                    self.stack.push(Frame::Prepared(Spec::Variable(int, name)));
                    Err(need.into())
                }
            },
            Spec::Bytes(name) => {
                let len = self.lookup(&name) as usize;
                match self.input.split_prefix(len) {
                    Ok(bytes) => {
                        self.fill_hole(DecodedValue::Bytes(bytes));
                        Ok(None)
                    }
                    Err(need) => {
                        self.stack.push(Frame::Prepared(Spec::Bytes(name)));
                        Err(need.into())
                    }
                }
            }
            Spec::Seq(mut children) => {
                if children.is_empty() {
                    self.fill_hole(DecodedValue::Seq(Vec::new()));
                } else {
                    let first = children.remove(0);
                    self.stack.push(Frame::PartialSeq {
                        done: Vec::new(),
                        remaining: children,
                    });
                    self.stack.push(Frame::Prepared(first));
                }
                Ok(None)
            }
            Spec::Repeat(name, inner) => {
                let count = self.lookup(&name);
                if count == 0 {
                    self.fill_hole(DecodedValue::Seq(Vec::new()));
                } else {
                    self.stack.push(Frame::PartialRepeat {
                        done: Vec::new(),
                        remaining: count - 1,
                        inner: (*inner).clone(),
                    });
                    self.stack.push(Frame::Prepared(*inner));
                }
                Ok(None)
            }
            Spec::Until(name, inner) => {
                let len = self.lookup(&name) as usize;
                match self.input.split_prefix(len) {
                    Ok(window) => {
                        // Fresh sub-decoder: the window bounds the parse, the
                        // environment does not leak in either direction, and a
                        // Stop raised inside surfaces as the final element
                        // instead of unwinding further.
                        let mut sub = StreamingDecoder::new((*inner).clone());
                        sub.input = window;
                        let items = sub.collect_values();
                        self.fill_hole(DecodedValue::Seq(items));
                        Ok(None)
                    }
                    Err(need) => {
                        self.stack.push(Frame::Prepared(Spec::Until(name, inner)));
                        Err(need.into())
                    }
                }
            }
            Spec::Switch {
                selector,
                cases,
                default,
            } => {
                let value = self.lookup(&selector);
                let chosen = cases.get(&value).unwrap_or(&*default).clone();
                if chosen == Spec::Stop {
                    return Err(StepError::Stop(
                        Spec::Switch {
                            selector,
                            cases,
                            default,
                        },
                        value,
                    ));
                }
                self.stack.push(Frame::Prepared(chosen));
                Ok(None)
            }
        }
    }

    /// Hands a completed value to its parent frame, or installs the terminal
    /// `Done` when the stack has drained.
    fn fill_hole(&mut self, value: DecodedValue) {
        match self.stack.last_mut() {
            None => self.stack.push(Frame::Done(value)),
            Some(Frame::PartialSeq { done, .. }) | Some(Frame::PartialRepeat { done, .. }) => {
                done.push(value)
            }
            Some(Frame::Prepared(_)) | Some(Frame::Done(_)) => {
                unreachable!("a completed value always fills a partial frame")
            }
        }
    }

    fn lookup(&self, name: &str) -> u64 {
        match self.env.get(name) {
            Some(value) => *value,
            None => panic!("unbound length variable `{name}`"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{Endian, IntSpec};

    fn u16be() -> IntSpec {
        IntSpec::new(2, Endian::Big)
    }

    #[test]
    fn test_integer_across_chunk_boundary() {
        let mut decoder = StreamingDecoder::new(Spec::Integer(u16be()));
        decoder.supply(&[0x12]);
        assert_eq!(decoder.next(), Err(Incomplete(1)));
        decoder.supply(&[0x34]);
        assert_eq!(decoder.next(), Ok(DecodedValue::Integer(0x1234)));
    }

    #[test]
    fn test_incomplete_is_idempotent() {
        let mut decoder = StreamingDecoder::new(Spec::Integer(IntSpec::new(4, Endian::Big)));
        decoder.supply(&[1]);
        assert_eq!(decoder.next(), Err(Incomplete(3)));
        assert_eq!(decoder.next(), Err(Incomplete(3)));
        assert_eq!(decoder.remaining().len(), 1);
    }

    #[test]
    fn test_done_value_repeats_until_reset() {
        let mut decoder = StreamingDecoder::new(Spec::Integer(IntSpec::BYTE));
        decoder.supply(&[7, 8]);
        assert_eq!(decoder.next(), Ok(DecodedValue::Integer(7)));
        assert_eq!(decoder.next(), Ok(DecodedValue::Integer(7)));
        decoder.reset();
        assert_eq!(decoder.next(), Ok(DecodedValue::Integer(8)));
    }

    #[test]
    fn test_skip_yields_empty() {
        let mut decoder = StreamingDecoder::new(Spec::Seq(vec![
            Spec::Skip(2),
            Spec::Integer(IntSpec::BYTE),
        ]));
        decoder.supply(&[0xff, 0xff, 5]);
        assert_eq!(
            decoder.next(),
            Ok(DecodedValue::Seq(vec![
                DecodedValue::Empty,
                DecodedValue::Integer(5),
            ]))
        );
        assert!(decoder.remaining().is_empty());
    }

    #[test]
    fn test_empty_seq_yields_empty_seq() {
        let mut decoder = StreamingDecoder::new(Spec::Seq(Vec::new()));
        assert_eq!(decoder.next(), Ok(DecodedValue::Seq(Vec::new())));
    }

    #[test]
    fn test_variable_feeds_bytes_field() {
        let spec = Spec::Seq(vec![
            Spec::Variable(IntSpec::BYTE, "n".into()),
            Spec::Bytes("n".into()),
        ]);
        let mut decoder = StreamingDecoder::new(spec);
        decoder.supply(&[2, 0xaa]);
        assert_eq!(decoder.next(), Err(Incomplete(1)));
        decoder.supply(&[0xbb]);
        let value = decoder.next().unwrap();
        assert_eq!(value[0].as_integer(), 2);
        assert_eq!(value[1].as_bytes().to_vec(), vec![0xaa, 0xbb]);
    }

    #[test]
    fn test_repeat_runs_exactly_count_times() {
        let spec = Spec::Seq(vec![
            Spec::Variable(IntSpec::BYTE, "n".into()),
            Spec::Repeat("n".into(), Box::new(Spec::Integer(IntSpec::BYTE))),
        ]);
        let mut decoder = StreamingDecoder::new(spec);
        decoder.supply(&[3, 10, 20, 30, 99]);
        let value = decoder.next().unwrap();
        assert_eq!(
            value[1],
            DecodedValue::Seq(vec![
                DecodedValue::Integer(10),
                DecodedValue::Integer(20),
                DecodedValue::Integer(30),
            ])
        );
        assert_eq!(decoder.remaining().to_vec(), vec![99]);
    }

    #[test]
    fn test_repeat_count_zero_consumes_nothing() {
        let spec = Spec::Seq(vec![
            Spec::Variable(IntSpec::BYTE, "n".into()),
            Spec::Repeat("n".into(), Box::new(Spec::Integer(IntSpec::BYTE))),
        ]);
        let mut decoder = StreamingDecoder::new(spec);
        decoder.supply(&[0, 42]);
        let value = decoder.next().unwrap();
        assert_eq!(value[1], DecodedValue::Seq(Vec::new()));
        assert_eq!(decoder.remaining().to_vec(), vec![42]);
    }

    #[test]
    fn test_until_window_of_zero_yields_empty_seq() {
        let spec = Spec::Seq(vec![
            Spec::Variable(IntSpec::BYTE, "n".into()),
            Spec::Until("n".into(), Box::new(Spec::Integer(IntSpec::BYTE))),
        ]);
        let mut decoder = StreamingDecoder::new(spec);
        decoder.supply(&[0, 42]);
        let value = decoder.next().unwrap();
        assert_eq!(value[1], DecodedValue::Seq(Vec::new()));
        assert_eq!(decoder.remaining().to_vec(), vec![42]);
    }

    #[test]
    fn test_until_repeats_inner_over_window() {
        let spec = Spec::Seq(vec![
            Spec::Variable(IntSpec::BYTE, "n".into()),
            Spec::Until("n".into(), Box::new(Spec::Integer(u16be()))),
        ]);
        let mut decoder = StreamingDecoder::new(spec);
        decoder.supply(&[4, 0x01, 0x02, 0x03, 0x04, 0xff]);
        let value = decoder.next().unwrap();
        assert_eq!(
            value[1],
            DecodedValue::Seq(vec![
                DecodedValue::Integer(0x0102),
                DecodedValue::Integer(0x0304),
            ])
        );
        assert_eq!(decoder.remaining().to_vec(), vec![0xff]);
    }

    #[test]
    fn test_until_discards_trailing_window_bytes() {
        // A 3-byte window holds one u16 and a byte of slack; the slack is
        // dropped with the window.
        let spec = Spec::Seq(vec![
            Spec::Variable(IntSpec::BYTE, "n".into()),
            Spec::Until("n".into(), Box::new(Spec::Integer(u16be()))),
        ]);
        let mut decoder = StreamingDecoder::new(spec);
        decoder.supply(&[3, 0x01, 0x02, 0x03, 0xff]);
        let value = decoder.next().unwrap();
        assert_eq!(
            value[1],
            DecodedValue::Seq(vec![DecodedValue::Integer(0x0102)])
        );
        assert_eq!(decoder.remaining().to_vec(), vec![0xff]);
    }

    #[test]
    fn test_switch_selects_case_and_default() {
        let spec = Spec::Seq(vec![
            Spec::Variable(IntSpec::BYTE, "sel".into()),
            Spec::switch(
                "sel",
                [(1, Spec::Integer(u16be()))],
                Spec::Integer(IntSpec::BYTE),
            ),
        ]);
        let mut decoder = StreamingDecoder::new(spec.clone());
        decoder.supply(&[1, 0x12, 0x34]);
        let value = decoder.next().unwrap();
        assert_eq!(value[1].as_integer(), 0x1234);

        let mut decoder = StreamingDecoder::new(spec);
        decoder.supply(&[9, 0x56]);
        let value = decoder.next().unwrap();
        assert_eq!(value[1].as_integer(), 0x56);
    }

    #[test]
    fn test_switch_stop_default_replaces_result() {
        let switch = Spec::switch("sel", [(1, Spec::Skip(1))], Spec::Stop);
        let spec = Spec::Seq(vec![
            Spec::Variable(IntSpec::BYTE, "sel".into()),
            switch.clone(),
        ]);
        let mut decoder = StreamingDecoder::new(spec);
        decoder.supply(&[3]);
        assert_eq!(decoder.next(), Ok(DecodedValue::Stop(switch, 3)));
    }

    #[test]
    fn test_parse_all_stops_on_stop_and_excludes_it() {
        let spec = Spec::Seq(vec![
            Spec::Variable(IntSpec::BYTE, "sel".into()),
            Spec::switch("sel", [(1, Spec::Integer(IntSpec::BYTE))], Spec::Stop),
        ]);
        let mut decoder = StreamingDecoder::new(spec);
        decoder.supply(&[1, 10, 1, 20, 9, 1, 30]);
        let values = decoder.parse_all();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0][1].as_integer(), 10);
        assert_eq!(values[1][1].as_integer(), 20);
    }

    #[test]
    fn test_parse_all_collects_until_underflow() {
        let mut decoder = StreamingDecoder::new(Spec::Integer(u16be()));
        decoder.supply(&[0, 1, 0, 2, 0]);
        let values = decoder.parse_all();
        assert_eq!(
            values,
            vec![DecodedValue::Integer(1), DecodedValue::Integer(2)]
        );
        assert_eq!(decoder.remaining().to_vec(), vec![0]);
    }

    #[test]
    fn test_reset_keeps_buffer_and_clears_env() {
        let spec = Spec::Seq(vec![
            Spec::Variable(IntSpec::BYTE, "n".into()),
            Spec::Bytes("n".into()),
        ]);
        let mut decoder = StreamingDecoder::new(spec);
        decoder.supply(&[1, 0xaa, 2, 0xbb, 0xcc]);
        let first = decoder.next().unwrap();
        assert_eq!(first[1].as_bytes().to_vec(), vec![0xaa]);
        decoder.reset();
        let second = decoder.next().unwrap();
        assert_eq!(second[1].as_bytes().to_vec(), vec![0xbb, 0xcc]);
        assert!(decoder.remaining().is_empty());
    }

    #[test]
    #[should_panic(expected = "unbound length variable `n`")]
    fn test_unbound_variable_panics() {
        let mut decoder = StreamingDecoder::new(Spec::Bytes("n".into()));
        decoder.supply(&[1, 2, 3]);
        let _ = decoder.next();
    }
}
