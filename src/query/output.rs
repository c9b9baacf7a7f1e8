use crate::Result;
use serde_json::{Map, Value};
use std::io::Write;

/// Streams elements into a JSON array, placing separators between them.
pub struct JsonArrayWriter<'w, W: Write> {
    out: &'w mut W,
    empty: bool,
}

impl<'w, W: Write> JsonArrayWriter<'w, W> {
    pub fn new(out: &'w mut W) -> Result<Self> {
        out.write_all(b"[")?;
        Ok(Self { out, empty: true })
    }

    /// Writer positioned where the next element goes.
    pub fn element(&mut self) -> Result<&mut W> {
        if self.empty {
            self.out.write_all(b"\n")?;
            self.empty = false;
        } else {
            self.out.write_all(b",\n")?;
        }
        Ok(&mut *self.out)
    }

    pub fn finish(self) -> Result<()> {
        if self.empty {
            self.out.write_all(b"]\n")?;
        } else {
            self.out.write_all(b"\n]\n")?;
        }
        Ok(())
    }
}

/// Write `record` reduced to the `fields` it has, in `fields` order.
pub fn write_filtered<W: Write>(
    out: &mut W,
    record: &Map<String, Value>,
    fields: &[String],
) -> Result<()> {
    out.write_all(b"{")?;
    let mut first = true;
    for (key, value) in fields.iter().filter_map(|k| record.get(k).map(|v| (k, v))) {
        if !first {
            out.write_all(b",")?;
        }
        first = false;
        serde_json::to_writer(&mut *out, key)?;
        out.write_all(b":")?;
        serde_json::to_writer(&mut *out, value)?;
    }
    out.write_all(b"}")?;
    Ok(())
}
