//! Filesystem repository for model artefacts: one file per model, the file
//! stem is the registry key.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::common::digest;
use crate::common::error::{NpkError, NpkResult};

use super::domain::{ModelArtifact, ModelId};

/// An artefact read from disk together with its identity.
#[derive(Clone, Debug)]
pub struct StoredArtifact {
    pub id: ModelId,
    pub artifact: ModelArtifact,
    pub sha256: String,
}

/// Reads artefacts with a given extension from a single directory.
pub struct FsModelRepo {
    root: PathBuf,
    ext: String,
}

impl FsModelRepo {
    pub fn new(root: impl Into<PathBuf>, ext: &str) -> Self {
        Self {
            root: root.into(),
            ext: ext.trim_start_matches('.').to_string(),
        }
    }

    /// Artefact files directly inside the root, sorted by path. Subdirectories
    /// and other extensions are skipped.
    pub fn discover(&self) -> NpkResult<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.root).map_err(|e| NpkError::load(&self.root, e))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| NpkError::load(&self.root, e))?.path();
            if !path.is_file() {
                continue;
            }
            let matches = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e == self.ext)
                .unwrap_or(false);
            if matches {
                paths.push(path);
            } else {
                debug!(path = %path.display(), "skipping non-artefact file");
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Read, parse and validate one artefact.
    pub fn load(&self, path: &Path) -> NpkResult<StoredArtifact> {
        let id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(ModelId::new)
            .ok_or_else(|| NpkError::load(path, "file name is not valid UTF-8"))?;
        let bytes = fs::read(path).map_err(|e| NpkError::load(path, e))?;
        let artifact = ModelArtifact::from_slice(&bytes).map_err(|e| NpkError::load(path, e))?;

        Ok(StoredArtifact {
            id,
            artifact,
            sha256: digest::sha256_hex(&bytes),
        })
    }

    /// Load every artefact in the directory. The first bad file aborts.
    pub fn load_all(&self) -> NpkResult<Vec<StoredArtifact>> {
        self.discover()?
            .iter()
            .map(|path| self.load(path))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINEAR: &str =
        r#"{"kind":"linear","features":["RH"],"coefficients":[0.1],"intercept":2.0}"#;

    #[test]
    fn discovers_only_matching_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Model P.json"), LINEAR).unwrap();
        fs::write(dir.path().join("Model K.json"), LINEAR).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();
        fs::create_dir(dir.path().join("nested.json")).unwrap();

        let repo = FsModelRepo::new(dir.path(), "json");
        let names: Vec<_> = repo
            .discover()
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["Model K.json", "Model P.json"]);
    }

    #[test]
    fn stem_becomes_model_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Model N.json");
        fs::write(&path, LINEAR).unwrap();

        let stored = FsModelRepo::new(dir.path(), ".json").load(&path).unwrap();
        assert_eq!(stored.id.as_str(), "Model N");
        assert_eq!(stored.sha256, digest::sha256_hex(LINEAR.as_bytes()));
    }

    #[test]
    fn corrupt_file_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Model N.json"), "\u{80}pickle").unwrap();

        let err = FsModelRepo::new(dir.path(), "json").load_all().unwrap_err();
        assert!(matches!(err, NpkError::Load { .. }));
        assert!(err.to_string().contains("Model N.json"));
    }

    #[test]
    fn missing_directory_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FsModelRepo::new(dir.path().join("absent"), "json");
        assert!(matches!(repo.discover(), Err(NpkError::Load { .. })));
    }
}
