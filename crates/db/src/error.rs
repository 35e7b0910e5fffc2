use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the storage layer.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("failed to {action} snapshot at {}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt snapshot at {}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode snapshot for table '{table}'")]
    Encode {
        table: &'static str,
        #[source]
        source: serde_json::Error,
    },
}
