/// Error taxonomy for level loading and entity construction.
///
/// Everything here is a configuration/data error: a bad level file or an
/// id that slipped past load-time validation. Nothing is retried.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GameError {
    /// Zero dimensions, ragged rows, or a byte count that disagrees with
    /// the declared width/height.
    #[error("malformed level: {reason}")]
    MalformedLevel { reason: String },

    /// A color code outside `0..range` reached color derivation.
    #[error("color code {code} outside 0..{range}")]
    InvalidColorCode { code: u32, range: u32 },

    /// A line of the hex text level format could not be parsed.
    #[error("text level line {line}: {reason}")]
    InvalidTextLevel { line: usize, reason: String },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GameError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        GameError::MalformedLevel { reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, GameError>;
