//! Conversion between image files and the base64 text stored in the database.

use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::debug;

use crate::error::CodecError;
use crate::metrics::StorageMetrics;

/// Encodes image files to base64 text and writes decoded text back to files.
///
/// Each call stands alone: the codec only remembers which directory decoded
/// images go to.
#[derive(Debug, Clone)]
pub struct ImageCodec {
    directory: PathBuf,
}

impl ImageCodec {
    /// Codec writing decoded images into `directory`
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Directory decoded images are written to
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Read an image file and return its bytes as base64 text
    pub fn encode(&self, source: &Path) -> Result<String, CodecError> {
        let bytes = fs::read(source).map_err(|e| {
            StorageMetrics::record_codec("encode", None, false);
            CodecError::Read {
                path: source.to_path_buf(),
                source: e,
            }
        })?;

        StorageMetrics::record_codec("encode", Some(bytes.len()), true);
        debug!(path = %source.display(), bytes = bytes.len(), "Image encoded");
        Ok(STANDARD.encode(bytes))
    }

    /// Write decoded base64 text to `<directory>/<suggested_name>` and return that path.
    ///
    /// An existing file of the same name is replaced.
    pub fn decode(&self, encoded: &str, suggested_name: &str) -> Result<PathBuf, CodecError> {
        let result = self.decode_inner(encoded, suggested_name);
        if result.is_err() {
            StorageMetrics::record_codec("decode", None, false);
        }
        result
    }

    fn decode_inner(&self, encoded: &str, suggested_name: &str) -> Result<PathBuf, CodecError> {
        let encoded = encoded.trim();
        if encoded.is_empty() {
            return Err(CodecError::EmptyInput);
        }
        let file_name = bare_file_name(suggested_name)?;

        let bytes = STANDARD.decode(encoded)?;

        fs::create_dir_all(&self.directory).map_err(|source| CodecError::Write {
            path: self.directory.clone(),
            source,
        })?;
        let target = self.directory.join(file_name);
        fs::write(&target, &bytes).map_err(|source| CodecError::Write {
            path: target.clone(),
            source,
        })?;

        StorageMetrics::record_codec("decode", Some(bytes.len()), true);
        debug!(path = %target.display(), bytes = bytes.len(), "Image decoded");
        Ok(target)
    }
}

fn bare_file_name(name: &str) -> Result<&str, CodecError> {
    let is_bare = !name.trim().is_empty()
        && Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name)
        && !name.contains(['/', '\\']);

    if is_bare {
        Ok(name)
    } else {
        Err(CodecError::InvalidName(name.to_string()))
    }
}
