//! Structural scanner over the decompressed document.
//!
//! The scanner never tokenizes record contents; it only tracks string and
//! nesting state well enough to find where each top-level section value and
//! each positional record begins and ends, and reports those boundaries as
//! [`SeekPoint`]s. Records are handed out as raw bytes and parsed with
//! `serde_json` only when their coordinates or fields are needed.

use crate::storage::{BlockRead, BlockSeek};
use crate::types::{PositionRange, RecordSchema, SeekPoint};
use crate::{Error, Result};
use serde_json::{Map, Value};
use std::io::Write;

/// One positional record, exactly as stored in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub seek_point: SeekPoint,
    pub bytes: Vec<u8>,
}

impl RawRecord {
    pub fn parse(&self) -> Result<Map<String, Value>> {
        Ok(serde_json::from_slice(&self.bytes)?)
    }

    pub fn position_range(&self, schema: &RecordSchema) -> Result<PositionRange> {
        schema.position_range(&self.parse()?)
    }
}

/// Structural events in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A top-level value that is not the positions array.
    Section {
        name: String,
        start: SeekPoint,
        end: SeekPoint,
    },
    /// Start of the positions array (the `[`).
    RecordsStart { name: String, start: SeekPoint },
    Record(RawRecord),
    /// One past the closing `]` of the positions array.
    RecordsEnd { name: String, end: SeekPoint },
}

enum State {
    Start,
    Keys,
    Records(String),
    Done,
}

/// Sequential scanner producing [`Event`]s for a whole document.
pub struct Scanner<R> {
    reader: R,
    positions_key: String,
    state: State,
}

impl<R: BlockRead> Scanner<R> {
    pub fn new(reader: R, positions_key: impl Into<String>) -> Self {
        Self {
            reader,
            positions_key: positions_key.into(),
            state: State::Start,
        }
    }

    pub fn next_event(&mut self) -> Result<Option<Event>> {
        loop {
            match &self.state {
                State::Start => {
                    skip_whitespace(&mut self.reader)?;
                    match peek(&mut self.reader)? {
                        Some(b'{') => {
                            self.reader.consume(1);
                            self.state = State::Keys;
                        }
                        Some(b) => {
                            return Err(Error::malformed(format!(
                                "document must start with an object, found {:?}",
                                b as char
                            )));
                        }
                        None => return Err(Error::malformed("empty document")),
                    }
                }
                State::Keys => {
                    skip_separators(&mut self.reader)?;
                    match peek(&mut self.reader)? {
                        Some(b'}') => {
                            self.reader.consume(1);
                            self.state = State::Done;
                            return Ok(None);
                        }
                        Some(b'"') => return self.read_section().map(Some),
                        Some(b) => {
                            return Err(Error::malformed(format!(
                                "expected section name, found {:?}",
                                b as char
                            )));
                        }
                        None => {
                            return Err(Error::malformed("stream ended before document closed"));
                        }
                    }
                }
                State::Records(name) => {
                    let name = name.clone();
                    return match next_record(&mut self.reader)? {
                        Some(record) => Ok(Some(Event::Record(record))),
                        None => {
                            self.reader.consume(1);
                            let end = position(&mut self.reader)?;
                            self.state = State::Keys;
                            Ok(Some(Event::RecordsEnd { name, end }))
                        }
                    };
                }
                State::Done => return Ok(None),
            }
        }
    }

    fn read_section(&mut self) -> Result<Event> {
        let mut key = Vec::new();
        consume_value(&mut self.reader, Some(&mut key))?;
        let name: String = serde_json::from_slice(&key)?;

        skip_whitespace(&mut self.reader)?;
        match peek(&mut self.reader)? {
            Some(b':') => self.reader.consume(1),
            _ => {
                return Err(Error::malformed(format!(
                    "expected ':' after section name {:?}",
                    name
                )));
            }
        }
        skip_whitespace(&mut self.reader)?;
        let start = position(&mut self.reader)?;

        if name == self.positions_key {
            if peek(&mut self.reader)? != Some(b'[') {
                return Err(Error::malformed(format!(
                    "section {:?} must be an array of records",
                    name
                )));
            }
            self.reader.consume(1);
            self.state = State::Records(name.clone());
            return Ok(Event::RecordsStart { name, start });
        }

        consume_value(&mut self.reader, None)?;
        let end = position(&mut self.reader)?;
        Ok(Event::Section { name, start, end })
    }
}

/// Read the next record of a positions array, or `None` at its closing
/// `]`, which is left unconsumed.
pub fn next_record<R: BlockRead>(reader: &mut R) -> Result<Option<RawRecord>> {
    skip_separators(reader)?;
    match peek(reader)? {
        Some(b']') => Ok(None),
        Some(b'{') => {
            let seek_point = position(reader)?;
            let mut bytes = Vec::new();
            consume_value(reader, Some(&mut bytes))?;
            Ok(Some(RawRecord { seek_point, bytes }))
        }
        Some(b) => Err(Error::malformed(format!(
            "expected record object, found {:?}",
            b as char
        ))),
        None => Err(Error::malformed("stream ended inside positions section")),
    }
}

/// Copy the decompressed bytes in `[start, end)` to `out`.
pub fn copy_extent<R: BlockSeek, W: Write>(
    reader: &mut R,
    start: SeekPoint,
    end: SeekPoint,
    out: &mut W,
) -> Result<u64> {
    reader.seek_to(start)?;
    let mut copied = 0u64;

    loop {
        let here = position(reader)?;
        if here >= end {
            break;
        }

        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            return Err(Error::malformed("stream ended inside section"));
        }

        let n = if here.block_offset() == end.block_offset() {
            buf.len()
                .min(usize::from(end.offset_in_block() - here.offset_in_block()))
        } else {
            buf.len()
        };

        out.write_all(&buf[..n])?;
        reader.consume(n);
        copied += n as u64;
    }

    Ok(copied)
}

/// Seek point of the next unread byte, loading the next block if the
/// current one is exhausted.
fn position<R: BlockRead>(reader: &mut R) -> Result<SeekPoint> {
    reader.fill_buf()?;
    Ok(reader.seek_point())
}

fn peek<R: BlockRead>(reader: &mut R) -> Result<Option<u8>> {
    Ok(reader.fill_buf()?.first().copied())
}

fn skip_whitespace<R: BlockRead>(reader: &mut R) -> Result<()> {
    skip_while(reader, |b| b.is_ascii_whitespace())
}

fn skip_separators<R: BlockRead>(reader: &mut R) -> Result<()> {
    skip_while(reader, |b| b.is_ascii_whitespace() || b == b',')
}

fn skip_while<R: BlockRead>(reader: &mut R, pred: impl Fn(u8) -> bool) -> Result<()> {
    loop {
        let buf = reader.fill_buf()?;
        let len = buf.len();
        let n = buf.iter().take_while(|b| pred(**b)).count();
        reader.consume(n);
        if len == 0 || n < len {
            return Ok(());
        }
    }
}

/// Consume exactly one JSON value, optionally appending its bytes to `out`.
fn consume_value<R: BlockRead>(reader: &mut R, mut out: Option<&mut Vec<u8>>) -> Result<()> {
    let first = match peek(reader)? {
        Some(b) => b,
        None => return Err(Error::malformed("stream ended where a value was expected")),
    };
    if matches!(first, b',' | b':' | b'}' | b']') {
        return Err(Error::malformed(format!(
            "expected value, found {:?}",
            first as char
        )));
    }

    let scalar = !matches!(first, b'{' | b'[' | b'"');
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            if scalar {
                return Ok(());
            }
            return Err(Error::malformed("stream ended inside a value"));
        }

        let mut done = None;
        for (i, &b) in buf.iter().enumerate() {
            if scalar {
                if matches!(b, b',' | b'}' | b']') || b.is_ascii_whitespace() {
                    done = Some(i);
                    break;
                }
                continue;
            }

            if in_string {
                if escaped {
                    escaped = false;
                } else if b == b'\\' {
                    escaped = true;
                } else if b == b'"' {
                    in_string = false;
                    if depth == 0 {
                        done = Some(i + 1);
                        break;
                    }
                }
                continue;
            }

            match b {
                b'"' => in_string = true,
                b'{' | b'[' => depth += 1,
                b'}' | b']' => {
                    depth = depth
                        .checked_sub(1)
                        .ok_or_else(|| Error::malformed("unbalanced brackets"))?;
                    if depth == 0 {
                        done = Some(i + 1);
                        break;
                    }
                }
                _ => {}
            }
        }

        let n = done.unwrap_or(buf.len());
        if let Some(out) = out.as_deref_mut() {
            out.extend_from_slice(&buf[..n]);
        }
        reader.consume(n);

        if done.is_some() {
            return Ok(());
        }
    }
}
