use crate::Result;
use noodles::bgzf;
use std::fs::File;
use std::io::{self, BufWriter, Stdout, Write};
use std::path::Path;

/// Append-only destination for query output.
pub enum OutputSink {
    Console(BufWriter<Stdout>),
    Bgzf(bgzf::Writer<File>),
}

impl OutputSink {
    pub fn console() -> Self {
        OutputSink::Console(BufWriter::new(io::stdout()))
    }

    /// BGZF-compressed file, truncating anything already at `path`.
    pub fn bgzf_file(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        Ok(OutputSink::Bgzf(bgzf::Writer::new(file)))
    }

    /// Flush buffered output and, for compressed files, write the EOF block.
    pub fn finish(self) -> Result<()> {
        match self {
            OutputSink::Console(mut writer) => writer.flush()?,
            OutputSink::Bgzf(writer) => {
                writer.finish()?;
            }
        }
        Ok(())
    }
}

impl Write for OutputSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            OutputSink::Console(writer) => writer.write(buf),
            OutputSink::Bgzf(writer) => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputSink::Console(writer) => writer.flush(),
            OutputSink::Bgzf(writer) => writer.flush(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_bgzf_sink_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json.gz");

        let mut sink = OutputSink::bgzf_file(&path).unwrap();
        sink.write_all(b"[\n]\n").unwrap();
        sink.finish().unwrap();

        let mut reader = bgzf::Reader::new(File::open(&path).unwrap());
        let mut text = String::new();
        reader.read_to_string(&mut text).unwrap();
        assert_eq!(text, "[\n]\n");
    }
}
