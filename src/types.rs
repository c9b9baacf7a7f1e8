use crate::{Error, Result};
use noodles::bgzf::VirtualPosition;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Locator into the decompressed address space of a BGZF stream.
///
/// Stored as a raw BGZF virtual position: the compressed offset of the block
/// in the upper 48 bits and the offset inside the decompressed block in the
/// lower 16 bits, so the derived ordering is file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SeekPoint(u64);

impl SeekPoint {
    pub fn new(block_offset: u64, offset_in_block: u16) -> Result<Self> {
        let pos = VirtualPosition::try_from((block_offset, offset_in_block))
            .map_err(|e| Error::malformed(format!("invalid seek point: {}", e)))?;
        Ok(Self::from(pos))
    }

    pub fn block_offset(&self) -> u64 {
        self.0 >> 16
    }

    pub fn offset_in_block(&self) -> u16 {
        (self.0 & 0xffff) as u16
    }
}

impl From<VirtualPosition> for SeekPoint {
    fn from(pos: VirtualPosition) -> Self {
        Self(u64::from(pos))
    }
}

impl From<SeekPoint> for VirtualPosition {
    fn from(point: SeekPoint) -> Self {
        VirtualPosition::from(point.0)
    }
}

impl From<u64> for SeekPoint {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<SeekPoint> for u64 {
    fn from(point: SeekPoint) -> Self {
        point.0
    }
}

impl fmt::Display for SeekPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.block_offset(), self.offset_in_block())
    }
}

/// Closed genomic extent `[start, end]` of one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionRange {
    pub chromosome: String,
    pub start: u64,
    pub end: u64,
}

impl PositionRange {
    pub fn overlaps(&self, start: u64, end: u64) -> bool {
        self.start <= end && self.end >= start
    }
}

/// Names of the keys carrying coordinates and section structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecordSchema {
    pub header_key: String,
    pub positions_key: String,
    pub chromosome_key: String,
    pub start_key: String,
    pub end_key: String,
    pub ref_allele_key: String,
}

impl Default for RecordSchema {
    fn default() -> Self {
        Self {
            header_key: "header".to_string(),
            positions_key: "positions".to_string(),
            chromosome_key: "chromosome".to_string(),
            start_key: "position".to_string(),
            end_key: "svEnd".to_string(),
            ref_allele_key: "refAllele".to_string(),
        }
    }
}

impl RecordSchema {
    /// Extract the chromosome and closed coordinate range of a parsed record.
    pub fn position_range(&self, record: &Map<String, Value>) -> Result<PositionRange> {
        let chromosome = match record.get(&self.chromosome_key) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => {
                return Err(Error::malformed(format!(
                    "non-string {} value: {}",
                    self.chromosome_key, other
                )));
            }
            None => {
                return Err(Error::malformed(format!(
                    "record without {} field",
                    self.chromosome_key
                )));
            }
        };

        let start = match record.get(&self.start_key) {
            Some(v) => v.as_u64().ok_or_else(|| {
                Error::malformed(format!("non-numeric {} value: {}", self.start_key, v))
            })?,
            None => {
                return Err(Error::malformed(format!(
                    "record on {} without {} field",
                    chromosome, self.start_key
                )));
            }
        };

        let end = match record.get(&self.end_key) {
            Some(v) => v.as_u64().ok_or_else(|| {
                Error::malformed(format!("non-numeric {} value: {}", self.end_key, v))
            })?,
            None => match record.get(&self.ref_allele_key) {
                Some(Value::String(allele)) if !allele.is_empty() => start
                    .checked_add(allele.len() as u64 - 1)
                    .ok_or_else(|| {
                        Error::malformed(format!(
                            "{} {} plus {} length overflows",
                            self.start_key, start, self.ref_allele_key
                        ))
                    })?,
                _ => start,
            },
        };

        Ok(PositionRange {
            chromosome,
            start,
            end: end.max(start),
        })
    }
}

/// A parsed `chrom[:start[-end]]` query before chromosome resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub chromosome: String,
    pub start: u64,
    pub end: u64,
}

impl Region {
    pub fn whole(chromosome: impl Into<String>) -> Self {
        Self {
            chromosome: chromosome.into(),
            start: 1,
            end: u64::MAX,
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidQuery("empty query".to_string()));
        }

        let Some((name, range)) = s.rsplit_once(':') else {
            return Ok(Self::whole(s));
        };

        if name.is_empty() {
            return Err(Error::InvalidQuery(format!("missing chromosome in {:?}", s)));
        }

        let (start, end) = match range.split_once('-') {
            Some((start, end)) if end.trim().is_empty() => (parse_position(start, s)?, u64::MAX),
            Some((start, end)) => (parse_position(start, s)?, parse_position(end, s)?),
            None => {
                let pos = parse_position(range, s)?;
                (pos, pos)
            }
        };

        if start > end {
            return Err(Error::InvalidQuery(format!(
                "start {} is after end {} in {:?}",
                start, end, s
            )));
        }

        Ok(Self {
            chromosome: name.to_string(),
            start,
            end,
        })
    }
}

fn parse_position(s: &str, query: &str) -> Result<u64> {
    let digits: String = s.trim().chars().filter(|c| *c != ',').collect();
    digits
        .parse::<u64>()
        .map_err(|_| Error::InvalidQuery(format!("invalid position {:?} in {:?}", s, query)))
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.end == u64::MAX {
            write!(f, "{}:{}-", self.chromosome, self.start)
        } else {
            write!(f, "{}:{}-{}", self.chromosome, self.start, self.end)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_seek_point_parts() {
        let point = SeekPoint::new(1024, 17).unwrap();
        assert_eq!(point.block_offset(), 1024);
        assert_eq!(point.offset_in_block(), 17);

        let pos = VirtualPosition::from(point);
        assert_eq!(pos.compressed(), 1024);
        assert_eq!(pos.uncompressed(), 17);
    }

    #[test]
    fn test_seek_point_ordering_is_file_order() {
        let a = SeekPoint::new(0, 65000).unwrap();
        let b = SeekPoint::new(1, 0).unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_position_range_from_ref_allele() {
        let schema = RecordSchema::default();
        let r = record(json!({"chromosome": "chr1", "position": 100, "refAllele": "ACG"}));
        let range = schema.position_range(&r).unwrap();
        assert_eq!((range.start, range.end), (100, 102));
    }

    #[test]
    fn test_position_range_prefers_sv_end() {
        let schema = RecordSchema::default();
        let r = record(json!({
            "chromosome": "chr1", "position": 100, "refAllele": "A", "svEnd": 5000
        }));
        let range = schema.position_range(&r).unwrap();
        assert_eq!((range.start, range.end), (100, 5000));
    }

    #[test]
    fn test_position_range_rejects_non_numeric() {
        let schema = RecordSchema::default();
        let r = record(json!({"chromosome": "chr1", "position": "abc"}));
        let err = schema.position_range(&r).unwrap_err();
        assert_eq!(err.kind(), "MalformedInputError");
    }

    #[test]
    fn test_position_range_rejects_end_overflow() {
        let schema = RecordSchema::default();
        let r = record(json!({"chromosome": "chr1", "position": u64::MAX, "refAllele": "AC"}));
        let err = schema.position_range(&r).unwrap_err();
        assert_eq!(err.kind(), "MalformedInputError");

        let r = record(json!({"chromosome": "chr1", "position": u64::MAX, "refAllele": "A"}));
        let range = schema.position_range(&r).unwrap();
        assert_eq!((range.start, range.end), (u64::MAX, u64::MAX));
    }

    #[test]
    fn test_custom_schema_from_json() {
        let schema: RecordSchema =
            serde_json::from_str(r#"{"chromosomeKey": "chrom", "startKey": "pos"}"#).unwrap();
        assert_eq!(schema.positions_key, "positions");
        let r = record(json!({"chrom": "chr1", "pos": 100, "gene": "BRCA1"}));
        let range = schema.position_range(&r).unwrap();
        assert_eq!(range.chromosome, "chr1");
        assert_eq!((range.start, range.end), (100, 100));
    }

    #[test]
    fn test_region_parse_forms() {
        assert_eq!(
            Region::parse("chr1:140-160").unwrap(),
            Region {
                chromosome: "chr1".into(),
                start: 140,
                end: 160
            }
        );
        let single = Region::parse("chr1:100").unwrap();
        assert_eq!((single.start, single.end), (100, 100));
        let whole = Region::parse("chrX").unwrap();
        assert_eq!((whole.start, whole.end), (1, u64::MAX));
        let open = Region::parse("chr1:500-").unwrap();
        assert_eq!((open.start, open.end), (500, u64::MAX));
        let commas = Region::parse("chr1:1,000-2,000").unwrap();
        assert_eq!((commas.start, commas.end), (1000, 2000));
    }

    #[test]
    fn test_region_parse_errors() {
        for bad in ["", "chr1:abc", "chr1:10-x", ":5-10", "chr1:20-10"] {
            let err = Region::parse(bad).unwrap_err();
            assert_eq!(err.kind(), "InvalidQueryError", "{:?}", bad);
        }
    }
}
