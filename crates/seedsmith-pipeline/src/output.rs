use std::fs::{OpenOptions, create_dir_all};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::errors::PipelineError;

/// Read a required input file; a missing file is reported as such.
pub fn read_input(path: &Path) -> Result<String, PipelineError> {
    std::fs::read_to_string(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => PipelineError::MissingInput(path.to_path_buf()),
        _ => PipelineError::Io(err),
    })
}

/// Write `data` next to `path` and rename it into place.
///
/// A failed step never leaves a half-written file for the next step to read.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent)?;
        }
    }

    let tmp_path = temp_path(path)?;
    let mut file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(&tmp_path)?;
    file.write_all(data)?;
    file.sync_all()?;

    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

fn temp_path(path: &Path) -> Result<PathBuf, PipelineError> {
    let file_name = path.file_name().ok_or_else(|| {
        PipelineError::InvalidSettings(format!("invalid output path {}", path.display()))
    })?;
    let tmp_name = format!("{}.tmp", file_name.to_string_lossy());
    Ok(path.with_file_name(tmp_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_input_is_named() {
        let path = std::env::temp_dir().join(format!("seedsmith_missing_{}", uuid::Uuid::new_v4()));
        match read_input(&path) {
            Err(PipelineError::MissingInput(missing)) => assert_eq!(missing, path),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn atomic_write_creates_parents() {
        let root = std::env::temp_dir().join(format!("seedsmith_write_{}", uuid::Uuid::new_v4()));
        let path = root.join("nested").join("out.sql");
        write_atomic(&path, b"SELECT 1;").expect("write");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "SELECT 1;");
        assert!(!root.join("nested").join("out.sql.tmp").exists());
        std::fs::remove_dir_all(root).ok();
    }
}
