//! Read path: answers listings, section dumps and range queries from an
//! [`Index`] and a seekable document reader.

mod output;

pub use output::{JsonArrayWriter, write_filtered};

use crate::config::QueryConfig;
use crate::index::Index;
use crate::scanner::{copy_extent, next_record};
use crate::storage::BlockSeek;
use crate::types::{Region, SeekPoint};
use crate::{Error, Result};
use std::io::Write;

pub struct QueryEngine<R, W> {
    index: Index,
    reader: R,
    out: W,
    config: QueryConfig,
}

impl<R: BlockSeek, W: Write> QueryEngine<R, W> {
    pub fn new(index: Index, reader: R, out: W, config: QueryConfig) -> Self {
        Self {
            index,
            reader,
            out,
            config,
        }
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Give back the output sink so the caller can finish it.
    pub fn into_output(self) -> W {
        self.out
    }

    /// Chromosomes in first-seen order, then sections in document order,
    /// one per line.
    pub fn list_chromosomes_and_sections(&mut self) -> Result<()> {
        for name in self
            .index
            .list_chromosomes()
            .into_iter()
            .chain(self.index.list_sections())
        {
            writeln!(self.out, "{}", name)?;
        }
        Ok(())
    }

    /// Copy the header value verbatim, starting at the header seek point.
    pub fn print_header_only(&mut self) -> Result<()> {
        let (start, end) = self.index.header_seek()?;
        let copied = self.print_extent(start, end)?;
        tracing::debug!(start = %start, bytes = copied, "printed header");
        Ok(())
    }

    /// Copy a section's value verbatim.
    pub fn print_section(&mut self, name: &str) -> Result<()> {
        let (start, end) = self.index.section_seek(name)?;
        let copied = self.print_extent(start, end)?;
        tracing::debug!(section = name, bytes = copied, "printed section");
        Ok(())
    }

    fn print_extent(&mut self, start: SeekPoint, end: SeekPoint) -> Result<u64> {
        let copied = copy_extent(&mut self.reader, start, end, &mut self.out)?;
        self.out.write_all(b"\n")?;
        Ok(copied)
    }

    /// Parse every query and resolve its chromosome against the index.
    ///
    /// A string that is itself a known chromosome name selects the whole
    /// chromosome even if it contains `:`.
    pub fn resolve_queries<S: AsRef<str>>(&self, queries: &[S]) -> Result<Vec<Region>> {
        queries
            .iter()
            .map(|query| {
                let query = query.as_ref().trim();
                if let Some(name) = self.index.resolve_chromosome(query) {
                    return Ok(Region::whole(name));
                }

                let mut region = Region::parse(query)?;
                region.chromosome = self
                    .index
                    .resolve_chromosome(&region.chromosome)
                    .ok_or_else(|| {
                        Error::InvalidQuery(format!("unknown chromosome: {}", region.chromosome))
                    })?
                    .to_string();
                Ok(region)
            })
            .collect()
    }

    /// Stream every record overlapping each query, in query order, as one
    /// JSON array, optionally preceded by the header.
    ///
    /// All queries are validated before anything is written. Returns the
    /// number of records emitted.
    pub fn process_query<S: AsRef<str>>(
        &mut self,
        queries: &[S],
        include_header: bool,
    ) -> Result<usize> {
        let regions = self.resolve_queries(queries)?;
        let header = if include_header {
            Some(self.index.header_seek()?)
        } else {
            None
        };

        let Self {
            index,
            reader,
            out,
            config,
        } = self;

        let mut array = JsonArrayWriter::new(out)?;
        if let Some((start, end)) = header {
            copy_extent(reader, start, end, array.element()?)?;
        }

        let mut emitted = 0;
        for region in &regions {
            let run = index.lookup(&region.chromosome, region.start, region.end)?;
            let Some(seek_point) = run.seek_point() else {
                continue;
            };

            reader.seek_to(seek_point)?;
            let mut matched = 0;
            for entry in run.entries {
                let record = next_record(reader)?
                    .filter(|r| r.seek_point == entry.seek_point)
                    .ok_or_else(|| {
                        Error::malformed(format!(
                            "index does not match the document at {}, please re-create the index",
                            entry.seek_point
                        ))
                    })?;

                let fields = record.parse()?;
                let range = index.schema().position_range(&fields)?;
                if range.chromosome != run.chromosome {
                    tracing::warn!(
                        expected = run.chromosome,
                        found = %range.chromosome,
                        "record chromosome differs from index"
                    );
                    continue;
                }
                if !range.overlaps(region.start, region.end) {
                    continue;
                }

                let element = array.element()?;
                match &config.include_fields {
                    Some(fields_to_keep) => write_filtered(element, &fields, fields_to_keep)?,
                    None => element.write_all(&record.bytes)?,
                }
                matched += 1;
            }

            tracing::debug!(
                query = %region,
                candidates = run.len(),
                matched,
                "processed query"
            );
            emitted += matched;
        }

        array.finish()?;
        Ok(emitted)
    }
}
