use crate::Result;
use crate::types::RecordSchema;
use clap::{ArgGroup, Parser};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "annidx")]
#[command(about = "Indexes and queries block-compressed annotation JSON")]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args(["index", "list", "only_header", "section", "queries"])
))]
pub struct Cli {
    /// Create the index for the input file
    #[arg(short = 'c', long)]
    pub index: bool,

    /// List chromosome and section names
    #[arg(short, long)]
    pub list: bool,

    /// Print only the header
    #[arg(short = 'H', long)]
    pub only_header: bool,

    /// Print a complete section (e.g. genes)
    #[arg(short, long, value_name = "NAME")]
    pub section: Option<String>,

    /// Query region: chrom, chrom:pos or chrom:start-end (repeatable)
    #[arg(short, long = "query", value_name = "REGION")]
    pub queries: Vec<String>,

    /// Also print the header before query results
    #[arg(short = 't', long, requires = "queries")]
    pub header: bool,

    /// Annotated, BGZF-compressed JSON file
    #[arg(short, long = "in", value_name = "FILE", env = "ANNIDX_INPUT")]
    pub input: PathBuf,

    /// Index file (default: <input>.jsi)
    #[arg(short = 'd', long = "in-index", value_name = "FILE", env = "ANNIDX_INDEX")]
    pub index_path: Option<PathBuf>,

    /// Comma-separated top-level fields to keep in each output record
    #[arg(short = 'f', long, value_name = "FIELDS", value_delimiter = ',')]
    pub include_fields: Vec<String>,

    /// BGZF-compressed output file (default: console)
    #[arg(short, long, value_name = "FILE")]
    pub out: Option<PathBuf>,

    /// JSON file overriding the record key names (stored in the index)
    #[arg(long, value_name = "FILE", env = "ANNIDX_SCHEMA")]
    pub schema: Option<PathBuf>,

    /// Refuse an index older than the input file
    #[arg(long, env = "ANNIDX_CHECK_STALE", default_value = "false")]
    pub check_stale: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "warn")]
    pub log_level: String,
}

/// The single operation selected on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    CreateIndex,
    List,
    HeaderOnly,
    Section(String),
    Query {
        regions: Vec<String>,
        include_header: bool,
    },
}

/// Immutable settings handed to the query engine.
///
/// Key names are not part of it: queries read records with the
/// [`RecordSchema`] stored in the index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryConfig {
    /// Keep only these top-level fields of each record; `None` copies records
    /// verbatim.
    pub include_fields: Option<Vec<String>>,
}

impl Cli {
    pub fn mode(&self) -> Mode {
        if self.index {
            Mode::CreateIndex
        } else if self.list {
            Mode::List
        } else if self.only_header {
            Mode::HeaderOnly
        } else if let Some(section) = &self.section {
            Mode::Section(section.clone())
        } else {
            Mode::Query {
                regions: self.queries.clone(),
                include_header: self.header,
            }
        }
    }

    pub fn schema(&self) -> Result<RecordSchema> {
        match &self.schema {
            Some(path) => {
                let text = std::fs::read_to_string(path)?;
                Ok(serde_json::from_str(&text)?)
            }
            None => Ok(RecordSchema::default()),
        }
    }

    pub fn query_config(&self) -> QueryConfig {
        let mut fields: Vec<String> = Vec::new();
        for field in self.include_fields.iter().map(|f| f.trim()) {
            if !field.is_empty() && !fields.iter().any(|f| f == field) {
                fields.push(field.to_string());
            }
        }

        QueryConfig {
            include_fields: (!fields.is_empty()).then_some(fields),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_mode() {
        let cli = Cli::try_parse_from([
            "annidx", "-i", "in.json.gz", "-q", "chr1:1-10", "-q", "chr2", "-t",
        ])
        .unwrap();
        assert_eq!(
            cli.mode(),
            Mode::Query {
                regions: vec!["chr1:1-10".into(), "chr2".into()],
                include_header: true
            }
        );
    }

    #[test]
    fn test_modes_are_exclusive() {
        assert!(Cli::try_parse_from(["annidx", "-i", "x", "-c", "-l"]).is_err());
        assert!(Cli::try_parse_from(["annidx", "-i", "x"]).is_err());
        assert!(Cli::try_parse_from(["annidx", "-i", "x", "-t"]).is_err());
    }

    #[test]
    fn test_section_and_index_modes() {
        let cli = Cli::try_parse_from(["annidx", "-i", "x", "-s", "genes"]).unwrap();
        assert_eq!(cli.mode(), Mode::Section("genes".into()));
        let cli = Cli::try_parse_from(["annidx", "--in", "x", "--index"]).unwrap();
        assert_eq!(cli.mode(), Mode::CreateIndex);
        assert_eq!(cli.index_path, None);
    }

    #[test]
    fn test_include_fields_are_deduplicated() {
        let cli = Cli::try_parse_from([
            "annidx", "-i", "x", "-q", "chr1", "-f", "gene,score,gene",
        ])
        .unwrap();
        let config = cli.query_config();
        assert_eq!(
            config.include_fields,
            Some(vec!["gene".to_string(), "score".to_string()])
        );
    }

    #[test]
    fn test_no_fields_means_verbatim() {
        let cli = Cli::try_parse_from(["annidx", "-i", "x", "-l"]).unwrap();
        assert_eq!(cli.query_config().include_fields, None);
    }
}
