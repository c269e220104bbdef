use crate::error::SourceError;
use async_trait::async_trait;
use dump_syntax::lexer::error::LexerError;
use model::records::dump::DumpRecord;
use std::fmt;

/// Something the pipeline reads records from, one at a time, in order.
#[async_trait]
pub trait RecordSource: Send {
    fn describe(&self) -> SourceDescriptor;

    /// Next record or malformed line; `None` once the source is exhausted.
    async fn next_event(&mut self) -> Result<Option<SourceEvent>, SourceError>;
}

#[derive(Debug)]
pub enum SourceEvent {
    Record(DumpRecord),
    /// An INSERT line (or one tuple of it) that could not be read.
    Malformed {
        line: usize,
        table: Option<String>,
        error: LexerError,
        text: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    DumpFile,
    MySql,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::DumpFile => write!(f, "dump_file"),
            SourceKind::MySql => write!(f, "mysql"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceDescriptor {
    pub kind: SourceKind,
    /// File path, or the source database with credentials stripped.
    pub location: String,
    /// Encoding the dump was decoded with.
    pub encoding: Option<String>,
    /// Invalid bytes were replaced while decoding.
    pub lossy: bool,
}
