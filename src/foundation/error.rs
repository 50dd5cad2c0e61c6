use std::path::PathBuf;

/// Convenience result type used across the crate.
pub type KenBurnsResult<T> = Result<T, KenBurnsError>;

/// Top-level error taxonomy used by pipeline APIs.
#[derive(thiserror::Error, Debug)]
pub enum KenBurnsError {
    /// Invalid numeric parameters or an inconsistent zoom schedule.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The source image could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// A frame could not be encoded into the target codec.
    #[error("encode error: {0}")]
    Encode(String),

    /// Text overlay rasterization failed.
    #[error("render error: {0}")]
    Render(String),

    /// Encoding or writing one artifact of a batch failed.
    #[error("materialization error: frame {index} ('{}'): {source}", path.display())]
    Materialization {
        /// 1-based artifact index of the failing frame.
        index: u32,
        /// Artifact path that was being produced.
        path: PathBuf,
        /// Underlying encode or I/O failure.
        #[source]
        source: Box<KenBurnsError>,
    },

    /// The external video assembler failed.
    #[error("assembly error: {status}: {output}")]
    Assembly {
        /// Exit status (or spawn failure) description.
        status: String,
        /// Captured diagnostic output of the assembler.
        output: String,
    },

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl KenBurnsError {
    /// Build a [`KenBurnsError::Configuration`] value.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Build a [`KenBurnsError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`KenBurnsError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`KenBurnsError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`KenBurnsError::Materialization`] value.
    pub fn materialization(index: u32, path: impl Into<PathBuf>, source: KenBurnsError) -> Self {
        Self::Materialization {
            index,
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// Build a [`KenBurnsError::Assembly`] value.
    pub fn assembly(status: impl Into<String>, output: impl Into<String>) -> Self {
        Self::Assembly {
            status: status.into(),
            output: output.into(),
        }
    }

    /// Process exit status for this failure class.
    ///
    /// Assembly failures get their own status so callers can tell "no frames" from "no video".
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Assembly { .. } => 2,
            _ => 1,
        }
    }

    /// 1-based artifact index for materialization failures.
    pub fn frame_index(&self) -> Option<u32> {
        match self {
            Self::Materialization { index, .. } => Some(*index),
            _ => None,
        }
    }
}

impl From<std::io::Error> for KenBurnsError {
    fn from(e: std::io::Error) -> Self {
        Self::Other(anyhow::Error::new(e))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
