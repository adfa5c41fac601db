//! Knowledge-document persistence sink.
//!
//! One overwriting write per run; any prior artifact of the same name is
//! replaced, never appended to.

use std::path::Path;

use tracing::info;

use pagebrief_shared::{PagebriefError, Result};

/// Write the finalized document text to `path`, creating parent directories
/// as needed. Failures are fatal to the request (`Persistence`).
pub fn write_document(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| PagebriefError::Persistence {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
    }

    std::fs::write(path, text).map_err(|e| PagebriefError::Persistence {
        path: path.to_path_buf(),
        source: e,
    })?;

    info!(?path, bytes = text.len(), "knowledge document written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_overwrites_prior_document() {
        let dir = std::env::temp_dir().join(format!("pb-sink-test-{}", std::process::id()));
        let path = dir.join("knowledge_document.txt");

        write_document(&path, "first run").unwrap();
        write_document(&path, "second run").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "second run");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn unwritable_path_is_a_persistence_error() {
        let path = Path::new("/proc/definitely-not-writable/doc.txt");
        let err = write_document(path, "text").unwrap_err();
        assert!(matches!(err, PagebriefError::Persistence { .. }));
    }
}
