pub mod config;
pub mod error;
pub mod index;
pub mod query;
pub mod scanner;
pub mod storage;
pub mod types;

pub use config::{Cli, Mode, QueryConfig};
pub use error::{Error, Result};
pub use index::{Index, IndexBuilder};
pub use query::QueryEngine;
