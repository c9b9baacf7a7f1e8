use super::{Index, SectionEntry};
use crate::scanner::{Event, Scanner};
use crate::storage::{BlockRead, LocalStorage};
use crate::types::{RecordSchema, SeekPoint};
use crate::{Error, Result};

/// Builds an [`Index`] in one sequential pass over a document.
pub struct IndexBuilder {
    schema: RecordSchema,
}

impl IndexBuilder {
    pub fn new(schema: RecordSchema) -> Self {
        Self { schema }
    }

    /// Index the document behind `reader`.
    ///
    /// Nothing is returned unless the whole document was read: unsorted
    /// positions, split chromosomes, bad coordinates and truncation all fail
    /// the build.
    pub fn build<R: BlockRead>(&self, reader: R) -> Result<Index> {
        let mut scanner = Scanner::new(reader, self.schema.positions_key.as_str());
        let mut index = Index::default();
        index.set_schema(self.schema.clone());
        let mut records_start: Option<SeekPoint> = None;

        while let Some(event) = scanner.next_event()? {
            match event {
                Event::Section { name, start, end } => {
                    if name == self.schema.header_key {
                        index.set_header(start);
                    }
                    index.push_section(SectionEntry { name, start, end })?;
                }
                Event::RecordsStart { start, .. } => records_start = Some(start),
                Event::Record(record) => {
                    let range = record.position_range(&self.schema).map_err(|e| match e {
                        Error::Json(e) => Error::malformed(format!(
                            "record at {} is not valid JSON: {}",
                            record.seek_point, e
                        )),
                        e => e,
                    })?;
                    index.push_record(range, record.seek_point)?;
                }
                Event::RecordsEnd { name, end } => {
                    let start = records_start
                        .take()
                        .ok_or_else(|| Error::malformed("records section end without start"))?;
                    index.push_section(SectionEntry { name, start, end })?;
                }
            }
        }

        tracing::info!(
            chromosomes = index.chromosomes().len(),
            records = index.record_count(),
            sections = index.sections().len(),
            "built index"
        );

        Ok(index)
    }

    /// Build the index for `storage`'s document and replace its index file.
    pub fn create(&self, storage: &LocalStorage) -> Result<Index> {
        storage.check_input()?;
        tracing::info!(input = %storage.input_path().display(), "creating index");

        let index = self.build(storage.open_input()?)?;
        storage.write_index(&index)?;
        Ok(index)
    }
}

impl Default for IndexBuilder {
    fn default() -> Self {
        Self::new(RecordSchema::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use noodles::bgzf;
    use std::io::{Cursor, Write};

    fn build(text: &str) -> Result<Index> {
        let mut writer = bgzf::Writer::new(Vec::new());
        writer.write_all(text.as_bytes()).unwrap();
        let data = writer.finish().unwrap();
        IndexBuilder::default().build(bgzf::Reader::new(Cursor::new(data)))
    }

    #[test]
    fn test_build_collects_records_and_sections() {
        let index = build(
            r#"{"header":{"annotator":"x"},"positions":[
{"chromosome":"chr2","position":10,"refAllele":"AT"},
{"chromosome":"chr2","position":20,"refAllele":"A"},
{"chromosome":"chr1","position":5,"refAllele":"G","svEnd":50}
],"genes":[]}"#,
        )
        .unwrap();

        assert_eq!(index.list_chromosomes(), ["chr2", "chr1"]);
        assert_eq!(index.list_sections(), ["header", "positions", "genes"]);
        assert_eq!(index.record_count(), 3);
        assert_eq!(
            index.header_seek_point(),
            Some(index.section("header").unwrap().start)
        );

        let chr2 = index.chromosome("chr2").unwrap();
        assert_eq!((chr2.entries()[0].start, chr2.entries()[0].end), (10, 11));
        let chr1 = index.chromosome("chr1").unwrap();
        assert_eq!(chr1.entries()[0].end, 50);
    }

    #[test]
    fn test_unsorted_input_is_rejected() {
        let err = build(
            r#"{"positions":[
{"chromosome":"chr1","position":300},
{"chromosome":"chr1","position":100}
]}"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), "MalformedInputError");
        assert!(err.to_string().contains("not sorted"));
    }

    #[test]
    fn test_non_numeric_position_is_rejected() {
        let err = build(r#"{"positions":[{"chromosome":"chr1","position":"1e"}]}"#).unwrap_err();
        assert_eq!(err.kind(), "MalformedInputError");
    }

    #[test]
    fn test_invalid_record_json_is_malformed() {
        let err = build(r#"{"positions":[{"chromosome":"chr1" "position":1}]}"#).unwrap_err();
        assert_eq!(err.kind(), "MalformedInputError");
        assert!(err.to_string().contains("not valid JSON"));
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let text = r#"{"header":{},"positions":[{"chromosome":"chr1","position":1}]}"#;
        assert_eq!(build(text).unwrap(), build(text).unwrap());
    }

    #[test]
    fn test_document_without_header() {
        let index = build(r#"{"positions":[]}"#).unwrap();
        assert_eq!(index.header_seek_point(), None);
        assert_eq!(index.list_sections(), ["positions"]);
        assert!(index.list_chromosomes().is_empty());
    }
}
