use crate::{
    error::SourceError,
    source::{RecordSource, SourceDescriptor, SourceEvent, SourceKind},
    sql::{base::error::DbError, mysql::adapter::MySqlAdapter},
};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use dump_syntax::sentinel::looks_like_zero_date;
use model::{core::value::Value, records::dump::DumpRecord};
use mysql_async::prelude::*;
use std::collections::VecDeque;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Streams rows of a live legacy MySQL database as records.
///
/// A background task reads each table with an unbuffered query and hands
/// chunks of `chunk_size` records over a bounded channel, so at most a few
/// chunks are held in memory.
pub struct MySqlSource {
    rx: mpsc::Receiver<Result<Vec<DumpRecord>, DbError>>,
    buffer: VecDeque<DumpRecord>,
    descriptor: SourceDescriptor,
}

impl MySqlSource {
    /// Starts streaming `tables`, or every table when the list is empty.
    pub async fn start(
        adapter: MySqlAdapter,
        tables: Vec<String>,
        chunk_size: usize,
    ) -> Result<Self, SourceError> {
        let tables = if tables.is_empty() {
            adapter.list_tables().await?
        } else {
            tables
        };
        info!(location = adapter.location(), tables = tables.len(), "Streaming from MySQL");

        let descriptor = SourceDescriptor {
            kind: SourceKind::MySql,
            location: adapter.location().to_string(),
            encoding: None,
            lossy: false,
        };

        let (tx, rx) = mpsc::channel(2);
        tokio::spawn(async move {
            if let Err(err) = produce(&adapter, &tables, chunk_size.max(1), &tx).await
                && tx.send(Err(err)).await.is_err()
            {
                debug!("Reader dropped before the source error could be delivered");
            }
        });

        Ok(MySqlSource {
            rx,
            buffer: VecDeque::new(),
            descriptor,
        })
    }
}

async fn produce(
    adapter: &MySqlAdapter,
    tables: &[String],
    chunk_size: usize,
    tx: &mpsc::Sender<Result<Vec<DumpRecord>, DbError>>,
) -> Result<(), DbError> {
    let mut conn = adapter.conn().await?;

    for table in tables {
        let sql = format!("SELECT * FROM `{}`", table.replace('`', "``"));
        let mut result = conn.query_iter(sql).await?;
        let mut chunk = Vec::with_capacity(chunk_size);
        let mut count = 0usize;

        while let Some(mut row) = result.next().await? {
            let columns: Vec<String> = row
                .columns_ref()
                .iter()
                .map(|c| c.name_str().into_owned())
                .collect();
            let values = (0..row.len())
                .map(|i| {
                    row.take::<mysql_async::Value, usize>(i)
                        .map(convert_value)
                        .unwrap_or(Value::Null)
                })
                .collect();
            chunk.push(DumpRecord::new(table, columns, values));
            count += 1;

            if chunk.len() >= chunk_size {
                let full = std::mem::replace(&mut chunk, Vec::with_capacity(chunk_size));
                if tx.send(Ok(full)).await.is_err() {
                    debug!(table, "Record consumer dropped, stopping MySQL stream");
                    return Ok(());
                }
            }
        }

        if !chunk.is_empty() && tx.send(Ok(chunk)).await.is_err() {
            return Ok(());
        }
        debug!(table, rows = count, "Finished streaming table");
    }

    Ok(())
}

/// Maps a driver value to a pipeline value. Zero dates become NULL.
pub(crate) fn convert_value(value: mysql_async::Value) -> Value {
    use mysql_async::Value as My;

    match value {
        My::NULL => Value::Null,
        My::Bytes(bytes) => match String::from_utf8(bytes) {
            Ok(text) if looks_like_zero_date(&text) => Value::Null,
            Ok(text) => Value::String(text),
            Err(err) => Value::Bytes(err.into_bytes()),
        },
        My::Int(i) => Value::Int(i),
        My::UInt(u) => Value::Uint(u),
        My::Float(f) => Value::Float(f as f64),
        My::Double(f) => Value::Float(f),
        My::Date(year, month, day, hour, minute, second, micros) => {
            let Some(date) = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32) else {
                return Value::Null;
            };
            if hour == 0 && minute == 0 && second == 0 && micros == 0 {
                return Value::Date(date);
            }
            match NaiveTime::from_hms_micro_opt(hour as u32, minute as u32, second as u32, micros) {
                Some(time) => Value::Timestamp(date.and_time(time)),
                None => Value::Null,
            }
        }
        My::Time(negative, days, hours, minutes, seconds, micros) => {
            let sign = if negative { "-" } else { "" };
            let hours = days * 24 + hours as u32;
            Value::String(format!(
                "{sign}{hours:02}:{minutes:02}:{seconds:02}{}",
                if micros > 0 {
                    format!(".{micros:06}")
                } else {
                    String::new()
                }
            ))
        }
    }
}

#[async_trait]
impl RecordSource for MySqlSource {
    fn describe(&self) -> SourceDescriptor {
        self.descriptor.clone()
    }

    async fn next_event(&mut self) -> Result<Option<SourceEvent>, SourceError> {
        loop {
            if let Some(record) = self.buffer.pop_front() {
                return Ok(Some(SourceEvent::Record(record)));
            }
            match self.rx.recv().await {
                Some(Ok(chunk)) => self.buffer.extend(chunk),
                Some(Err(err)) => return Err(err.into()),
                None => return Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mysql_async::Value as My;

    #[test]
    fn test_text_protocol_values() {
        assert_eq!(convert_value(My::NULL), Value::Null);
        assert_eq!(
            convert_value(My::Bytes(b"Loyer janvier".to_vec())),
            Value::String("Loyer janvier".into())
        );
        assert_eq!(convert_value(My::Bytes(b"0000-00-00 00:00:00".to_vec())), Value::Null);
        assert_eq!(
            convert_value(My::Bytes(vec![0xff, 0x00])),
            Value::Bytes(vec![0xff, 0x00])
        );
    }

    #[test]
    fn test_binary_protocol_dates() {
        assert_eq!(convert_value(My::Date(0, 0, 0, 0, 0, 0, 0)), Value::Null);
        assert_eq!(
            convert_value(My::Date(2021, 3, 15, 0, 0, 0, 0)),
            Value::Date(NaiveDate::from_ymd_opt(2021, 3, 15).unwrap())
        );
        assert!(matches!(
            convert_value(My::Date(2021, 3, 15, 10, 30, 0, 0)),
            Value::Timestamp(_)
        ));
        assert_eq!(
            convert_value(My::Time(false, 1, 2, 3, 4, 0)),
            Value::String("26:03:04".into())
        );
    }

    #[test]
    fn test_numeric_values() {
        assert_eq!(convert_value(My::Int(-4)), Value::Int(-4));
        assert_eq!(convert_value(My::UInt(7)), Value::Uint(7));
        assert_eq!(convert_value(My::Double(1.5)), Value::Float(1.5));
    }
}
