//! Binary encoding of an [`Index`].
//!
//! Little-endian layout:
//!
//! ```text
//! magic "JSIX" | version u16 | has_header u8 [header u64]
//! header_key | positions_key | chromosome_key | start_key | end_key | ref_allele_key
//! n_chromosomes u32 { name | n_entries u32 { start u64 end u64 seek u64 } }
//! n_sections u32 { name | start u64 end u64 }
//! ```
//!
//! Names are a u32 byte length followed by UTF-8. Seek points are raw BGZF
//! virtual positions. The running maximum of ends used by lookup is not
//! stored; it is rebuilt while decoding.

use super::{ChromosomeIndex, Index, IndexEntry, SectionEntry};
use crate::types::{RecordSchema, SeekPoint};
use crate::{Error, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};

pub const FILE_FORMAT_VERSION: u16 = 1;

const MAGIC: &[u8; 4] = b"JSIX";
const ENTRY_SIZE: usize = 24;

impl Index {
    pub fn to_bytes(&self) -> Bytes {
        let capacity = 16 + self.record_count() * ENTRY_SIZE;
        let mut buf = BytesMut::with_capacity(capacity);

        buf.put_slice(MAGIC);
        buf.put_u16_le(FILE_FORMAT_VERSION);

        match self.header {
            Some(header) => {
                buf.put_u8(1);
                buf.put_u64_le(header.into());
            }
            None => buf.put_u8(0),
        }

        let schema = &self.schema;
        for key in [
            &schema.header_key,
            &schema.positions_key,
            &schema.chromosome_key,
            &schema.start_key,
            &schema.end_key,
            &schema.ref_allele_key,
        ] {
            put_name(&mut buf, key);
        }

        buf.put_u32_le(self.chromosomes.len() as u32);
        for chromosome in &self.chromosomes {
            put_name(&mut buf, chromosome.name());
            buf.put_u32_le(chromosome.entries.len() as u32);
            for entry in &chromosome.entries {
                buf.put_u64_le(entry.start);
                buf.put_u64_le(entry.end);
                buf.put_u64_le(entry.seek_point.into());
            }
        }

        buf.put_u32_le(self.sections.len() as u32);
        for section in &self.sections {
            put_name(&mut buf, &section.name);
            buf.put_u64_le(section.start.into());
            buf.put_u64_le(section.end.into());
        }

        buf.freeze()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut buf = bytes;

        need(&buf, MAGIC.len() + 2)?;
        if &buf[..MAGIC.len()] != MAGIC {
            return Err(Error::malformed("not an index file (bad magic)"));
        }
        buf.advance(MAGIC.len());

        let version = buf.get_u16_le();
        if version != FILE_FORMAT_VERSION {
            return Err(Error::IncompatibleIndex {
                found: version,
                expected: FILE_FORMAT_VERSION,
            });
        }

        let mut index = Index::default();

        need(&buf, 1)?;
        if buf.get_u8() != 0 {
            need(&buf, 8)?;
            index.set_header(SeekPoint::from(buf.get_u64_le()));
        }

        index.set_schema(RecordSchema {
            header_key: get_name(&mut buf)?,
            positions_key: get_name(&mut buf)?,
            chromosome_key: get_name(&mut buf)?,
            start_key: get_name(&mut buf)?,
            end_key: get_name(&mut buf)?,
            ref_allele_key: get_name(&mut buf)?,
        });

        need(&buf, 4)?;
        let n_chromosomes = buf.get_u32_le();
        for _ in 0..n_chromosomes {
            let mut chromosome = ChromosomeIndex::new(get_name(&mut buf)?);

            need(&buf, 4)?;
            let n_entries = buf.get_u32_le() as usize;
            need(&buf, n_entries * ENTRY_SIZE)?;
            chromosome.entries.reserve(n_entries);
            chromosome.max_ends.reserve(n_entries);
            for _ in 0..n_entries {
                chromosome.push(IndexEntry {
                    start: buf.get_u64_le(),
                    end: buf.get_u64_le(),
                    seek_point: SeekPoint::from(buf.get_u64_le()),
                })?;
            }

            index.push_chromosome(chromosome)?;
        }

        need(&buf, 4)?;
        let n_sections = buf.get_u32_le();
        for _ in 0..n_sections {
            let name = get_name(&mut buf)?;
            need(&buf, 16)?;
            index.push_section(SectionEntry {
                name,
                start: SeekPoint::from(buf.get_u64_le()),
                end: SeekPoint::from(buf.get_u64_le()),
            })?;
        }

        if buf.has_remaining() {
            return Err(Error::malformed(format!(
                "{} trailing bytes after index",
                buf.remaining()
            )));
        }

        tracing::info!(
            chromosomes = index.chromosomes.len(),
            records = index.record_count(),
            sections = index.sections.len(),
            "loaded index"
        );

        Ok(index)
    }
}

fn need(buf: &&[u8], n: usize) -> Result<()> {
    if buf.remaining() < n {
        return Err(Error::malformed("index file is truncated"));
    }
    Ok(())
}

fn put_name(buf: &mut BytesMut, name: &str) {
    buf.put_u32_le(name.len() as u32);
    buf.put_slice(name.as_bytes());
}

fn get_name(buf: &mut &[u8]) -> Result<String> {
    need(buf, 4)?;
    let len = buf.get_u32_le() as usize;
    need(buf, len)?;
    let name = std::str::from_utf8(&buf[..len])
        .map_err(|e| Error::malformed(format!("invalid name in index: {}", e)))?
        .to_string();
    buf.advance(len);
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PositionRange;

    fn sample() -> Index {
        let mut index = Index::default();
        index.set_schema(RecordSchema {
            chromosome_key: "chrom".into(),
            start_key: "pos".into(),
            ..Default::default()
        });
        index.set_header(SeekPoint::from(1));
        index
            .push_section(SectionEntry {
                name: "header".into(),
                start: SeekPoint::from(1),
                end: SeekPoint::from(40),
            })
            .unwrap();
        let records = [("chr2", 5, 5), ("chr2", 9, 400), ("chr1", 3, 3), ("chr10", 7, 8)];
        for (i, (chromosome, start, end)) in records.into_iter().enumerate() {
            index
                .push_record(
                    PositionRange {
                        chromosome: chromosome.into(),
                        start,
                        end,
                    },
                    SeekPoint::from(100 + i as u64 * 50),
                )
                .unwrap();
        }
        index
            .push_section(SectionEntry {
                name: "genes".into(),
                start: SeekPoint::from(900),
                end: SeekPoint::from(1000),
            })
            .unwrap();
        index
    }

    #[test]
    fn test_round_trip_is_structurally_equal() {
        let index = sample();
        let decoded = Index::from_bytes(&index.to_bytes()).unwrap();
        assert_eq!(decoded, index);
        assert_eq!(decoded.list_chromosomes(), ["chr2", "chr1", "chr10"]);
        assert_eq!(decoded.list_sections(), ["header", "genes"]);
        assert_eq!(decoded.schema().chromosome_key, "chrom");
        assert_eq!(decoded.schema().start_key, "pos");
    }

    #[test]
    fn test_version_mismatch() {
        let mut bytes = sample().to_bytes().to_vec();
        bytes[4] = 9;
        let err = Index::from_bytes(&bytes).unwrap_err();
        assert!(matches!(
            err,
            Error::IncompatibleIndex {
                found: 9,
                expected: FILE_FORMAT_VERSION
            }
        ));
    }

    #[test]
    fn test_truncated_and_garbage() {
        let bytes = sample().to_bytes();
        let err = Index::from_bytes(&bytes[..bytes.len() - 3]).unwrap_err();
        assert_eq!(err.kind(), "MalformedInputError");

        let mut extended = bytes.to_vec();
        extended.push(0);
        assert!(Index::from_bytes(&extended).is_err());

        assert!(Index::from_bytes(b"{\"not\":\"an index\"}").is_err());
    }

    #[test]
    fn test_empty_index() {
        let index = Index::default();
        let decoded = Index::from_bytes(&index.to_bytes()).unwrap();
        assert_eq!(decoded, index);
        assert_eq!(decoded.header_seek_point(), None);
    }
}
