//! Format-string rejection errors.

use thiserror::Error;

/// Error produced while compiling the textual format syntax into a spec tree.
///
/// All positions are byte offsets into the format string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("unknown character `{ch}` at byte {pos}")]
    UnknownChar { ch: char, pos: usize },
    #[error("unexpected end of format at byte {pos}")]
    UnexpectedEnd { pos: usize },
    #[error("unbalanced bracket at byte {pos}")]
    UnbalancedBracket { pos: usize },
    #[error("count at byte {pos} is not followed by a repeatable token")]
    DanglingCount { pos: usize },
    #[error("no unconsumed length field in scope at byte {pos}")]
    NoLengthInScope { pos: usize },
    #[error("expected an integer width after `%` at byte {pos}")]
    ExpectedWidth { pos: usize },
    #[error("expected `=` after switch case key at byte {pos}")]
    ExpectedEquals { pos: usize },
    #[error("expected an integer literal or `*` as switch case key at byte {pos}")]
    ExpectedCaseKey { pos: usize },
    #[error("duplicate switch case {key} at byte {pos}")]
    DuplicateCase { key: u64, pos: usize },
    #[error("duplicate default switch case at byte {pos}")]
    DuplicateDefault { pos: usize },
    #[error("number at byte {pos} is out of range")]
    NumberOutOfRange { pos: usize },
}
