use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::core::FrameIndex;
use crate::foundation::error::{KenBurnsError, KenBurnsResult};

/// Minimum digits in an artifact index.
pub const MIN_INDEX_WIDTH: usize = 4;

/// File naming for a run's frame artifacts: `<prefix>-<index>.<extension>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactNaming {
    prefix: String,
    extension: String,
    index_width: usize,
}

impl ArtifactNaming {
    /// Indices are zero-padded to at least four digits, more when `frame_count` needs them.
    pub fn new(
        prefix: impl Into<String>,
        extension: impl Into<String>,
        frame_count: u32,
    ) -> KenBurnsResult<Self> {
        let prefix = prefix.into();
        let extension = extension.into();
        if prefix.is_empty() || prefix.contains(['/', '\\', '%']) {
            return Err(KenBurnsError::configuration(format!(
                "artifact prefix {prefix:?} must be non-empty without path separators or '%'"
            )));
        }
        if extension.is_empty() || extension.contains(['/', '\\', '%', '.']) {
            return Err(KenBurnsError::configuration(format!(
                "artifact extension {extension:?} is not a plain file extension"
            )));
        }
        let index_width = frame_count.to_string().len().max(MIN_INDEX_WIDTH);
        Ok(Self {
            prefix,
            extension,
            index_width,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn index_width(&self) -> usize {
        self.index_width
    }

    /// File name of the artifact for `idx` (numbered from 1).
    pub fn file_name(&self, idx: FrameIndex) -> String {
        format!(
            "{}-{:0width$}.{}",
            self.prefix,
            idx.artifact_number(),
            self.extension,
            width = self.index_width
        )
    }

    /// printf-style pattern matching [`ArtifactNaming::file_name`], as image-sequence demuxers expect.
    pub fn sequence_pattern(&self) -> String {
        format!(
            "{}-%0{}d.{}",
            self.prefix, self.index_width, self.extension
        )
    }
}

/// A uniquely named directory holding one run's artifacts.
#[derive(Debug)]
pub struct RunDirectory {
    dir: tempfile::TempDir,
}

impl RunDirectory {
    /// Create a fresh directory named `<prefix>-<random>` inside `parent`.
    pub fn create(parent: &Path, prefix: &str) -> KenBurnsResult<Self> {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create work directory '{}'", parent.display()))?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("{prefix}-"))
            .tempdir_in(parent)
            .with_context(|| format!("create run directory in '{}'", parent.display()))?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Keep the directory on disk and return its path.
    pub fn persist(self) -> PathBuf {
        self.dir.keep()
    }

    /// Delete the directory and everything in it.
    pub fn remove(self) -> KenBurnsResult<()> {
        let path = self.dir.path().to_path_buf();
        self.dir
            .close()
            .with_context(|| format!("remove run directory '{}'", path.display()))?;
        Ok(())
    }
}

/// A complete, gap-free set of frame artifacts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactSet {
    dir: PathBuf,
    naming: ArtifactNaming,
    paths: Vec<PathBuf>,
}

impl ArtifactSet {
    pub(crate) fn new(dir: PathBuf, naming: ArtifactNaming, paths: Vec<PathBuf>) -> Self {
        Self { dir, naming, paths }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn naming(&self) -> &ArtifactNaming {
        &self.naming
    }

    /// Artifact paths in frame order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Input pattern (`dir/prefix-%04d.ext`) for sequence-reading tools.
    pub fn input_pattern(&self) -> PathBuf {
        self.dir.join(self.naming.sequence_pattern())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/output/artifacts.rs"]
mod tests;
