//! Storage collaborators for annotated documents and their indexes.
//!
//! This module hides the BGZF transport behind two small traits so the
//! scanner, builder and query engine only see a buffered byte stream that can
//! report and restore its [`SeekPoint`].
//!
//! # Implementations
//!
//! - [`BlockRead`] / [`BlockSeek`] for [`noodles::bgzf::Reader`]
//! - [`LocalStorage`] - Local filesystem paths for a document and its index
//! - [`OutputSink`] - Console or BGZF-compressed output
//!
//! # Example
//!
//! ```no_run
//! use annidx::storage::LocalStorage;
//! use std::path::PathBuf;
//!
//! let storage = LocalStorage::new(PathBuf::from("sample.json.gz"), None);
//! let index = storage.read_index().unwrap();
//! ```

mod local;
mod sink;

pub use local::{INDEX_EXTENSION, LocalStorage};
pub use sink::OutputSink;

use crate::{Result, types::SeekPoint};
use noodles::bgzf::{self, VirtualPosition};
use std::io::{BufRead, Read, Seek};

/// Buffered decompressed stream that knows where it is.
///
/// Implementations must never return bytes from more than one compressed
/// block in a single `fill_buf`, so every byte of the buffer lies in the
/// block named by `seek_point()`.
pub trait BlockRead: BufRead {
    /// Seek point of the next byte `fill_buf` will return.
    ///
    /// Only meaningful right after `fill_buf`; at a block boundary it may
    /// still name the end of the previous block.
    fn seek_point(&self) -> SeekPoint;
}

/// A [`BlockRead`] that supports random access by seek point.
pub trait BlockSeek: BlockRead {
    fn seek_to(&mut self, point: SeekPoint) -> Result<()>;
}

impl<R: Read> BlockRead for bgzf::Reader<R> {
    fn seek_point(&self) -> SeekPoint {
        SeekPoint::from(self.virtual_position())
    }
}

impl<R: Read + Seek> BlockSeek for bgzf::Reader<R> {
    fn seek_to(&mut self, point: SeekPoint) -> Result<()> {
        self.seek(VirtualPosition::from(point))?;
        Ok(())
    }
}
