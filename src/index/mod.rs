//! Positional index over a block-compressed annotation document.
//!
//! An [`Index`] maps every positional record to the [`SeekPoint`] of its
//! first byte, grouped per chromosome in first-seen order, plus the extents
//! of the document's named top-level sections. The [`RecordSchema`] the
//! index was built with travels with it, so queries read records with the
//! same key names.
//!
//! # Lookup
//!
//! Entries of a chromosome are sorted by start. Ends are not monotonic (a
//! structural variant may span many later records), so each chromosome keeps
//! the running maximum of its ends. The first entry that can overlap a query
//! is found by binary search over that running maximum, and the run
//! continues while entries start at or before the query end. The resulting
//! [`IndexRun`] is a contiguous slice of entries that contains every
//! overlapping record; entries in it that do not overlap are filtered out by
//! the caller once the records are decompressed.

mod builder;
mod codec;

pub use builder::IndexBuilder;
pub use codec::FILE_FORMAT_VERSION;

use crate::types::{PositionRange, RecordSchema, SeekPoint};
use crate::{Error, Result};
use std::collections::HashMap;
use std::ops::Range;

/// One record's closed range and the seek point of its first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub start: u64,
    pub end: u64,
    pub seek_point: SeekPoint,
}

/// Entries of one chromosome in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChromosomeIndex {
    name: String,
    entries: Vec<IndexEntry>,
    max_ends: Vec<u64>,
}

impl ChromosomeIndex {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
            max_ends: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Append an entry; starts must not decrease.
    ///
    /// Records sharing a start keep their document order whatever their ends,
    /// since runs are read back sequentially from the document.
    pub fn push(&mut self, entry: IndexEntry) -> Result<()> {
        if entry.end < entry.start {
            return Err(Error::malformed(format!(
                "{}: end {} before start {}",
                self.name, entry.end, entry.start
            )));
        }

        if let Some(last) = self.entries.last() {
            if entry.start < last.start {
                return Err(Error::malformed(format!(
                    "{}: records are not sorted by position ({} follows {})",
                    self.name, entry.start, last.start
                )));
            }
            if entry.seek_point <= last.seek_point {
                return Err(Error::malformed(format!(
                    "{}: seek points are not in file order at position {}",
                    self.name, entry.start
                )));
            }
        }

        let max_end = self.max_ends.last().map_or(entry.end, |m| (*m).max(entry.end));
        self.entries.push(entry);
        self.max_ends.push(max_end);
        Ok(())
    }

    /// Indices of the contiguous entry run that may overlap `[start, end]`.
    pub fn lookup(&self, start: u64, end: u64) -> Range<usize> {
        let first = self.max_ends.partition_point(|max_end| *max_end < start);
        let len = self.entries[first..].partition_point(|e| e.start <= end);
        first..first + len
    }
}

/// A named, non-positional region of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionEntry {
    pub name: String,
    pub start: SeekPoint,
    pub end: SeekPoint,
}

/// Contiguous run of entries returned by [`Index::lookup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRun<'a> {
    pub chromosome: &'a str,
    pub first: usize,
    pub entries: &'a [IndexEntry],
}

impl IndexRun<'_> {
    /// Where to start decompressing, if the run is not empty.
    pub fn seek_point(&self) -> Option<SeekPoint> {
        self.entries.first().map(|e| e.seek_point)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Index {
    chromosomes: Vec<ChromosomeIndex>,
    by_name: HashMap<String, usize>,
    sections: Vec<SectionEntry>,
    header: Option<SeekPoint>,
    schema: RecordSchema,
}

impl Index {
    pub fn file_format_version(&self) -> u16 {
        FILE_FORMAT_VERSION
    }

    pub fn chromosomes(&self) -> &[ChromosomeIndex] {
        &self.chromosomes
    }

    pub fn chromosome(&self, name: &str) -> Option<&ChromosomeIndex> {
        self.by_name.get(name).map(|i| &self.chromosomes[*i])
    }

    /// Indexed name for `name`, trying it as given and then with the `chr`
    /// prefix added or removed.
    pub fn resolve_chromosome(&self, name: &str) -> Option<&str> {
        if let Some(chromosome) = self.chromosome(name) {
            return Some(chromosome.name());
        }
        let alias = match name.strip_prefix("chr") {
            Some(bare) => bare.to_string(),
            None => format!("chr{}", name),
        };
        self.chromosome(&alias).map(|c| c.name())
    }

    /// Chromosome names in first-seen order.
    pub fn list_chromosomes(&self) -> Vec<&str> {
        self.chromosomes.iter().map(|c| c.name()).collect()
    }

    /// Section names in document order.
    pub fn list_sections(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn sections(&self) -> &[SectionEntry] {
        &self.sections
    }

    pub fn section(&self, name: &str) -> Result<&SectionEntry> {
        self.sections
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| Error::UnknownSection(name.to_string()))
    }

    pub fn section_seek(&self, name: &str) -> Result<(SeekPoint, SeekPoint)> {
        let section = self.section(name)?;
        Ok((section.start, section.end))
    }

    pub fn header_seek_point(&self) -> Option<SeekPoint> {
        self.header
    }

    /// Extent of the header section, found from the header seek point.
    pub fn header_seek(&self) -> Result<(SeekPoint, SeekPoint)> {
        let missing = || Error::UnknownSection(self.schema.header_key.clone());
        let start = self.header.ok_or_else(missing)?;
        let section = self
            .sections
            .iter()
            .find(|s| s.start == start)
            .ok_or_else(missing)?;
        Ok((section.start, section.end))
    }

    /// Key names used when the index was built.
    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    pub fn record_count(&self) -> usize {
        self.chromosomes.iter().map(|c| c.entries.len()).sum()
    }

    pub fn lookup(&self, chromosome: &str, start: u64, end: u64) -> Result<IndexRun<'_>> {
        let index = self.chromosome(chromosome).ok_or_else(|| {
            Error::InvalidQuery(format!("unknown chromosome: {}", chromosome))
        })?;
        let range = index.lookup(start, end);
        tracing::debug!(
            chromosome,
            start,
            end,
            entries = range.len(),
            "index lookup"
        );
        Ok(IndexRun {
            chromosome: index.name(),
            first: range.start,
            entries: &index.entries[range],
        })
    }

    /// Append a record, opening a new chromosome the first time it is seen.
    ///
    /// A chromosome's records must form a single block: returning to an
    /// earlier chromosome is rejected.
    pub(crate) fn push_record(&mut self, range: PositionRange, seek_point: SeekPoint) -> Result<()> {
        let current = self.chromosomes.last().map(|c| c.name() == range.chromosome);
        let chromosome = match (current, self.by_name.contains_key(&range.chromosome)) {
            (Some(true), _) => self.chromosomes.len() - 1,
            (_, true) => {
                return Err(Error::malformed(format!(
                    "records for {} are not contiguous",
                    range.chromosome
                )));
            }
            (_, false) => self.push_chromosome(ChromosomeIndex::new(range.chromosome.clone()))?,
        };

        self.chromosomes[chromosome].push(IndexEntry {
            start: range.start,
            end: range.end,
            seek_point,
        })
    }

    pub(crate) fn push_chromosome(&mut self, chromosome: ChromosomeIndex) -> Result<usize> {
        if self.by_name.contains_key(chromosome.name()) {
            return Err(Error::malformed(format!(
                "duplicate chromosome {}",
                chromosome.name()
            )));
        }
        let i = self.chromosomes.len();
        self.by_name.insert(chromosome.name().to_string(), i);
        self.chromosomes.push(chromosome);
        Ok(i)
    }

    pub(crate) fn push_section(&mut self, section: SectionEntry) -> Result<()> {
        if self.sections.iter().any(|s| s.name == section.name) {
            return Err(Error::malformed(format!("duplicate section {}", section.name)));
        }
        self.sections.push(section);
        Ok(())
    }

    pub(crate) fn set_header(&mut self, seek_point: SeekPoint) {
        self.header = Some(seek_point);
    }

    pub(crate) fn set_schema(&mut self, schema: RecordSchema) {
        self.schema = schema;
    }
}
