use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EncodingError {
    #[error("Cannot read dump file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
