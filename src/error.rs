use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error(
        "incompatible index: file format version {found}, expected {expected}; please re-create the index"
    )]
    IncompatibleIndex { found: u16, expected: u16 },

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("unknown section: {0}")]
    UnknownSection(String),

    #[error("input file not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("no index file found at {}, please generate the index first", .0.display())]
    MissingIndex(PathBuf),

    #[error("index file {} is older than the input file, please re-create the index", .0.display())]
    StaleIndex(PathBuf),
}

impl Error {
    /// Short, stable name of the error category.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Io(_) => "IOError",
            Error::Json(_) | Error::MalformedInput(_) => "MalformedInputError",
            Error::IncompatibleIndex { .. } => "IncompatibleIndexError",
            Error::InvalidQuery(_) => "InvalidQueryError",
            Error::UnknownSection(_) => "UnknownSectionError",
            Error::MissingInput(_) | Error::MissingIndex(_) | Error::StaleIndex(_) => "UserError",
        }
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedInput(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(Error::malformed("x").kind(), "MalformedInputError");
        assert_eq!(
            Error::IncompatibleIndex {
                found: 7,
                expected: 1
            }
            .kind(),
            "IncompatibleIndexError"
        );
        assert_eq!(
            Error::UnknownSection("genes".into()).kind(),
            "UnknownSectionError"
        );
    }

    #[test]
    fn test_incompatible_message_mentions_rebuild() {
        let err = Error::IncompatibleIndex {
            found: 7,
            expected: 1,
        };
        assert!(err.to_string().contains("re-create"));
    }
}
