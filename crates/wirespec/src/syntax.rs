//! Compiler for the textual format syntax.
//!
//! The concrete syntax is a compact, case-insensitive token string:
//!
//! | Token | Meaning |
//! |---|---|
//! | `>` / `<` | switch to big / little endian for subsequent integers |
//! | `B` `H` `T` `I` `Q` | integer of width 1 / 2 / 3 / 4 / 8 |
//! | `N x` | skip N bytes |
//! | `N X` | N repetitions of the next token, as a nested sequence |
//! | `% X` | integer of width X, bound to the next auto-allocated variable |
//! | `s` | byte block sized by the oldest unconsumed variable |
//! | `( … )` | window sized by the oldest unconsumed variable, inner spec applied until exhausted |
//! | `{ k=…, *=… }` | switch on the oldest unconsumed variable; `*` is the default branch |
//!
//! Whitespace is insignificant; numbers are decimal or `0x` hex. A `{…}`
//! without a `*` case rejects unmatched selectors (its default is `Stop`).

use std::collections::BTreeMap;

use crate::error::FormatError;
use crate::spec::{Endian, IntSpec, Spec};

/// Compiles a format string into a [`Spec`] tree.
///
/// Variables introduced by `%` are auto-named `{prefix}{index}` with a
/// monotonically increasing index; each consumer token (`s`, `(…)`, `{…}`)
/// takes the oldest name not yet claimed by a consumer.
pub fn parse_format(format: &str, prefix: &str) -> Result<Spec, FormatError> {
    FormatParser::new(format, prefix).parse()
}

struct FormatParser<'a> {
    format: &'a str,
    input: &'a [u8],
    pos: usize,
    endian: Endian,
    prefix: &'a str,
    /// Variables allocated by `%` so far.
    allocated: usize,
    /// Variables claimed by a consumer token so far.
    consumed: usize,
}

enum CaseKey {
    Value(u64),
    Default,
}

impl<'a> FormatParser<'a> {
    fn new(format: &'a str, prefix: &'a str) -> Self {
        Self {
            format,
            input: format.as_bytes(),
            pos: 0,
            endian: Endian::Big,
            prefix,
            allocated: 0,
            consumed: 0,
        }
    }

    fn parse(mut self) -> Result<Spec, FormatError> {
        let items = self.parse_items(&[])?;
        Ok(Spec::Seq(items))
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_whitespace())
        {
            self.pos += 1;
        }
    }

    /// Parses elements up to one of `terminators` (left unconsumed) or, with
    /// no terminators, to the end of the input.
    fn parse_items(&mut self, terminators: &[u8]) -> Result<Vec<Spec>, FormatError> {
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                None if terminators.is_empty() => return Ok(items),
                None => return Err(FormatError::UnbalancedBracket { pos: self.pos }),
                Some(c) if terminators.contains(&c) => return Ok(items),
                Some(b'>') => {
                    self.pos += 1;
                    self.endian = Endian::Big;
                }
                Some(b'<') => {
                    self.pos += 1;
                    self.endian = Endian::Little;
                }
                Some(_) => items.push(self.parse_element()?),
            }
        }
    }

    fn parse_element(&mut self) -> Result<Spec, FormatError> {
        self.skip_ws();
        let pos = self.pos;
        let Some(c) = self.peek() else {
            return Err(FormatError::UnexpectedEnd { pos });
        };

        if c.is_ascii_digit() {
            let count = self.read_number()?;
            self.skip_ws();
            if let Some(b'x' | b'X') = self.peek() {
                self.pos += 1;
                let skip = u32::try_from(count)
                    .map_err(|_| FormatError::NumberOutOfRange { pos })?;
                return Ok(Spec::Skip(skip));
            }
            if !self.peek().is_some_and(is_element_start) {
                return Err(FormatError::DanglingCount { pos });
            }
            let count = usize::try_from(count)
                .map_err(|_| FormatError::NumberOutOfRange { pos })?;
            let element = self.parse_element()?;
            return Ok(Spec::Seq(vec![element; count]));
        }

        self.pos += 1;
        match c.to_ascii_lowercase() {
            b'b' => Ok(Spec::Integer(IntSpec::new(1, self.endian))),
            b'h' => Ok(Spec::Integer(IntSpec::new(2, self.endian))),
            b't' => Ok(Spec::Integer(IntSpec::new(3, self.endian))),
            b'i' => Ok(Spec::Integer(IntSpec::new(4, self.endian))),
            b'q' => Ok(Spec::Integer(IntSpec::new(8, self.endian))),
            b'%' => {
                self.skip_ws();
                let width_pos = self.pos;
                let width = match self.peek().map(|w| w.to_ascii_lowercase()) {
                    Some(b'b') => 1,
                    Some(b'h') => 2,
                    Some(b't') => 3,
                    Some(b'i') => 4,
                    Some(b'q') => 8,
                    _ => return Err(FormatError::ExpectedWidth { pos: width_pos }),
                };
                self.pos += 1;
                let name = self.allocate_name();
                Ok(Spec::Variable(IntSpec::new(width, self.endian), name))
            }
            b's' => Ok(Spec::Bytes(self.take_name(pos)?)),
            b'(' => {
                let name = self.take_name(pos)?;
                let items = self.parse_items(&[b')'])?;
                self.pos += 1;
                Ok(Spec::Until(name, Box::new(Spec::Seq(items))))
            }
            b'{' => self.parse_switch(pos),
            b')' | b'}' => Err(FormatError::UnbalancedBracket { pos }),
            _ => Err(FormatError::UnknownChar {
                ch: self.char_at(pos),
                pos,
            }),
        }
    }

    fn parse_switch(&mut self, open_pos: usize) -> Result<Spec, FormatError> {
        let selector = self.take_name(open_pos)?;
        let mut cases = BTreeMap::new();
        let mut default: Option<Spec> = None;
        loop {
            self.skip_ws();
            match self.peek() {
                None => return Err(FormatError::UnbalancedBracket { pos: self.pos }),
                Some(b'}') => {
                    self.pos += 1;
                    break;
                }
                Some(b',') => {
                    self.pos += 1;
                }
                Some(_) => {
                    let key_pos = self.pos;
                    let key = self.parse_case_key()?;
                    self.skip_ws();
                    if self.peek() != Some(b'=') {
                        return Err(FormatError::ExpectedEquals { pos: self.pos });
                    }
                    self.pos += 1;
                    let body = Spec::Seq(self.parse_items(&[b',', b'}'])?);
                    match key {
                        CaseKey::Value(key) => {
                            if cases.insert(key, body).is_some() {
                                return Err(FormatError::DuplicateCase { key, pos: key_pos });
                            }
                        }
                        CaseKey::Default => {
                            if default.replace(body).is_some() {
                                return Err(FormatError::DuplicateDefault { pos: key_pos });
                            }
                        }
                    }
                }
            }
        }
        Ok(Spec::Switch {
            selector,
            cases,
            default: Box::new(default.unwrap_or(Spec::Stop)),
        })
    }

    fn parse_case_key(&mut self) -> Result<CaseKey, FormatError> {
        match self.peek() {
            Some(b'*') => {
                self.pos += 1;
                Ok(CaseKey::Default)
            }
            Some(c) if c.is_ascii_digit() => Ok(CaseKey::Value(self.read_number()?)),
            _ => Err(FormatError::ExpectedCaseKey { pos: self.pos }),
        }
    }

    fn read_number(&mut self) -> Result<u64, FormatError> {
        let pos = self.pos;
        // `0x` opens a hex literal only when a hex digit follows, so `0 x`
        // and `10x` still lex as skips.
        if self.input[self.pos] == b'0'
            && matches!(self.input.get(self.pos + 1).copied(), Some(b'x' | b'X'))
            && self
                .input
                .get(self.pos + 2)
                .is_some_and(u8::is_ascii_hexdigit)
        {
            self.pos += 2;
            let mut value: u64 = 0;
            while let Some(c) = self.peek().filter(u8::is_ascii_hexdigit) {
                let digit = u64::from((c as char).to_digit(16).expect("hex digit"));
                value = value
                    .checked_mul(16)
                    .and_then(|v| v.checked_add(digit))
                    .ok_or(FormatError::NumberOutOfRange { pos })?;
                self.pos += 1;
            }
            return Ok(value);
        }
        let mut value: u64 = 0;
        while let Some(c) = self.peek().filter(u8::is_ascii_digit) {
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(u64::from(c - b'0')))
                .ok_or(FormatError::NumberOutOfRange { pos })?;
            self.pos += 1;
        }
        Ok(value)
    }

    fn allocate_name(&mut self) -> String {
        let name = format!("{}{}", self.prefix, self.allocated);
        self.allocated += 1;
        name
    }

    fn take_name(&mut self, pos: usize) -> Result<String, FormatError> {
        if self.consumed >= self.allocated {
            return Err(FormatError::NoLengthInScope { pos });
        }
        let name = format!("{}{}", self.prefix, self.consumed);
        self.consumed += 1;
        Ok(name)
    }

    fn char_at(&self, pos: usize) -> char {
        self.format[pos..].chars().next().expect("position is in bounds")
    }
}

fn is_element_start(c: u8) -> bool {
    c.is_ascii_digit()
        || matches!(
            c.to_ascii_lowercase(),
            b'b' | b'h' | b't' | b'i' | b'q' | b's' | b'%' | b'(' | b'{'
        )
}
