//! Model artifact format: a short header followed by a zstd-compressed
//! bincode payload of the [`FittedPipeline`].
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};
use crate::pipeline::FittedPipeline;

const MAGIC: &[u8; 4] = b"CDMP";
const FORMAT_VERSION: u8 = 1;
const ZSTD_LEVEL: i32 = 3;

pub fn to_bytes(model: &FittedPipeline) -> Result<Vec<u8>> {
    let payload = bincode::serialize(model)?;
    let compressed = zstd::encode_all(Cursor::new(payload), ZSTD_LEVEL)?;
    let mut bytes = Vec::with_capacity(MAGIC.len() + 1 + compressed.len());
    bytes.extend_from_slice(MAGIC);
    bytes.push(FORMAT_VERSION);
    bytes.extend_from_slice(&compressed);
    Ok(bytes)
}

pub fn from_bytes(bytes: &[u8]) -> Result<FittedPipeline> {
    let header = MAGIC.len() + 1;
    if bytes.len() < header || &bytes[..MAGIC.len()] != MAGIC {
        return Err(PipelineError::Serialization(
            "not a credit-default model artifact".to_string(),
        ));
    }
    let version = bytes[MAGIC.len()];
    if version != FORMAT_VERSION {
        return Err(PipelineError::Serialization(format!(
            "unsupported artifact version {} (expected {})",
            version, FORMAT_VERSION
        )));
    }
    let payload = zstd::decode_all(Cursor::new(&bytes[header..]))?;
    Ok(bincode::deserialize(&payload)?)
}

/// `<name>.tmp` next to `path`; complete files are renamed over `path`.
pub(crate) fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "artifact".into());
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write the artifact, creating parent directories as needed. The bytes go
/// to a temporary sibling first, so `path` never holds a partial model.
pub fn save_model<P: AsRef<Path>>(model: &FittedPipeline, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let bytes = to_bytes(model)?;
    let tmp_path = tmp_sibling(path);
    if let Err(err) = fs::write(&tmp_path, &bytes).and_then(|_| fs::rename(&tmp_path, path)) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err.into());
    }
    log::info!("Saved model to {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

pub fn load_model<P: AsRef<Path>>(path: P) -> Result<FittedPipeline> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    log::debug!("Loading model from {}", path.display());
    from_bytes(&bytes)
}
