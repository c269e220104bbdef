use crate::{
    error::SourceError,
    source::{RecordSource, SourceDescriptor, SourceEvent, SourceKind},
};
use async_trait::async_trait;
use dump_syntax::{encoding::read_dump, lexer::parse_insert, normalize::normalize_tuple};
use model::records::dump::DumpRecord;
use std::{collections::VecDeque, path::Path};
use tracing::debug;

/// Reads `INSERT INTO` statements from a decoded SQL dump, one line at a time.
pub struct DumpSource {
    text: String,
    offset: usize,
    line_no: usize,
    pending: VecDeque<SourceEvent>,
    descriptor: SourceDescriptor,
}

impl DumpSource {
    /// Opens and decodes a dump file. Fails only if the file cannot be read.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let decoded = read_dump(path)?;
        Ok(DumpSource {
            text: decoded.text,
            offset: 0,
            line_no: 0,
            pending: VecDeque::new(),
            descriptor: SourceDescriptor {
                kind: SourceKind::DumpFile,
                location: path.display().to_string(),
                encoding: Some(decoded.encoding.to_string()),
                lossy: decoded.lossy,
            },
        })
    }

    /// Source over already-decoded text.
    pub fn from_text(label: &str, text: impl Into<String>) -> Self {
        DumpSource {
            text: text.into(),
            offset: 0,
            line_no: 0,
            pending: VecDeque::new(),
            descriptor: SourceDescriptor {
                kind: SourceKind::DumpFile,
                location: label.to_string(),
                encoding: None,
                lossy: false,
            },
        }
    }

    /// Byte range of the next line, without its terminator.
    fn advance(&mut self) -> Option<(usize, usize)> {
        if self.offset >= self.text.len() {
            return None;
        }
        let start = self.offset;
        let end = match self.text[start..].find('\n') {
            Some(pos) => {
                self.offset = start + pos + 1;
                start + pos
            }
            None => {
                self.offset = self.text.len();
                self.text.len()
            }
        };
        self.line_no += 1;
        let end = if self.text[start..end].ends_with('\r') {
            end - 1
        } else {
            end
        };
        Some((start, end))
    }

    fn read_line(&mut self, start: usize, end: usize) {
        let line = &self.text[start..end];
        let line_no = self.line_no;

        match parse_insert(line) {
            Ok(None) => {}
            Ok(Some(stmt)) => {
                for tuple in stmt.checked_tuples() {
                    let event = match tuple {
                        Ok(tokens) => SourceEvent::Record(
                            DumpRecord::new(&stmt.table, stmt.columns.clone(), normalize_tuple(tokens))
                                .at_line(line_no),
                        ),
                        Err(error) => SourceEvent::Malformed {
                            line: line_no,
                            table: Some(stmt.table.clone()),
                            error,
                            text: line.to_string(),
                        },
                    };
                    self.pending.push_back(event);
                }
            }
            Err(error) => {
                debug!(line = line_no, %error, "Malformed INSERT line");
                self.pending.push_back(SourceEvent::Malformed {
                    line: line_no,
                    table: None,
                    error,
                    text: line.to_string(),
                });
            }
        }
    }
}

#[async_trait]
impl RecordSource for DumpSource {
    fn describe(&self) -> SourceDescriptor {
        self.descriptor.clone()
    }

    async fn next_event(&mut self) -> Result<Option<SourceEvent>, SourceError> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }
            let Some((start, end)) = self.advance() else {
                return Ok(None);
            };
            self.read_line(start, end);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dump_syntax::lexer::error::LexerError;
    use model::core::value::Value;
    use std::io::Write;

    async fn drain(source: &mut DumpSource) -> Vec<SourceEvent> {
        let mut events = Vec::new();
        while let Some(event) = source.next_event().await.unwrap() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_skips_non_insert_lines() {
        let mut source = DumpSource::from_text(
            "inline",
            "-- MySQL dump\r\nCREATE TABLE `log` (\r\n  `id` int\r\n);\r\n\r\nINSERT INTO `log` (`id`, `message`) VALUES (1, 'boot');\r\n",
        );

        let events = drain(&mut source).await;
        assert_eq!(events.len(), 1);
        let SourceEvent::Record(record) = &events[0] else {
            panic!("expected a record");
        };
        assert_eq!(record.source_table, "log");
        assert_eq!(record.line, Some(6));
        assert_eq!(record.values[1], Value::String("boot".into()));
    }

    #[tokio::test]
    async fn test_malformed_lines_are_reported_not_fatal() {
        let mut source = DumpSource::from_text(
            "inline",
            "INSERT INTO t (a,b) VALUES (1);\nINSERT INTO t (a) VALUES ('open\nINSERT INTO t (a,b) VALUES (2,'ok');",
        );

        let events = drain(&mut source).await;
        assert_eq!(events.len(), 3);
        assert!(matches!(
            &events[0],
            SourceEvent::Malformed {
                line: 1,
                table: Some(t),
                error: LexerError::ColumnCountMismatch { .. },
                ..
            } if t == "t"
        ));
        assert!(matches!(
            &events[1],
            SourceEvent::Malformed {
                line: 2,
                table: None,
                ..
            }
        ));
        assert!(matches!(&events[2], SourceEvent::Record(r) if r.line == Some(3)));
    }

    #[tokio::test]
    async fn test_extended_insert_yields_records_in_order() {
        let mut source =
            DumpSource::from_text("inline", "INSERT INTO t (a) VALUES (1),(2),(3);");

        let ids: Vec<Value> = drain(&mut source)
            .await
            .into_iter()
            .filter_map(|e| match e {
                SourceEvent::Record(r) => r.values.into_iter().next(),
                _ => None,
            })
            .collect();
        assert_eq!(
            ids,
            vec![
                Value::Raw("1".into()),
                Value::Raw("2".into()),
                Value::Raw("3".into())
            ]
        );
    }

    #[tokio::test]
    async fn test_open_reads_latin_dump_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"INSERT INTO locataire (id, nom) VALUES (1, 'Fran\xe7ois B\xe9rang\xe8re, r\xe9sidence \xc9toile');\n")
            .unwrap();

        let mut source = DumpSource::open(file.path()).unwrap();
        assert_eq!(source.describe().kind, SourceKind::DumpFile);

        let events = drain(&mut source).await;
        let SourceEvent::Record(record) = &events[0] else {
            panic!("expected a record");
        };
        assert_eq!(
            record.values[1],
            Value::String("François Bérangère, résidence Étoile".into())
        );
    }

    #[test]
    fn test_open_missing_file_fails() {
        assert!(matches!(
            DumpSource::open(Path::new("/no/such/dump.sql")),
            Err(SourceError::Dump(_))
        ));
    }
}
