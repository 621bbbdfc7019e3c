//! In-memory registry of loaded models and the per-process cache that makes
//! loading happen once per directory.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tracing::info;

use crate::common::error::{NpkError, NpkResult};
use crate::common::time;

use super::domain::{ModelId, ModelInfo, Regressor};
use super::repo_fs::FsModelRepo;

struct Entry {
    model: Arc<dyn Regressor>,
    info: ModelInfo,
}

/// Immutable lookup from artefact name to predictor.
#[derive(Default)]
pub struct ModelRegistry {
    models: BTreeMap<ModelId, Entry>,
}

impl ModelRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load every artefact with extension `ext` in `dir`.
    pub fn load_dir(dir: &Path, ext: &str) -> NpkResult<Self> {
        let start = Instant::now();
        let repo = FsModelRepo::new(dir, ext);
        let mut registry = Self::empty();
        for stored in repo.load_all()? {
            let info = ModelInfo {
                name: stored.id.clone(),
                kind: stored.artifact.kind(),
                features: stored.artifact.features().to_vec(),
                sha256: stored.sha256,
            };
            registry.models.insert(
                stored.id,
                Entry {
                    model: Arc::new(stored.artifact),
                    info,
                },
            );
        }
        info!(
            dir = %dir.display(),
            models = registry.len(),
            dur_ms = time::elapsed_ms(start),
            "model registry loaded"
        );
        Ok(registry)
    }

    /// Add an in-memory model. Used when assembling a registry by hand.
    pub fn with_model<R>(mut self, name: impl Into<ModelId>, model: R) -> Self
    where
        R: Regressor + 'static,
    {
        let name = name.into();
        let info = ModelInfo {
            name: name.clone(),
            kind: model.kind(),
            features: model.features().to_vec(),
            sha256: String::new(),
        };
        self.models.insert(
            name,
            Entry {
                model: Arc::new(model),
                info,
            },
        );
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn Regressor> {
        self.models
            .get(&ModelId::new(name))
            .map(|entry| entry.model.as_ref())
    }

    /// Like [`get`](Self::get) but absent names become `MissingModel`.
    pub fn lookup(&self, name: &str) -> NpkResult<&dyn Regressor> {
        self.get(name).ok_or_else(|| NpkError::missing_model(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(&ModelId::new(name))
    }

    /// Loaded artefacts sorted by name.
    pub fn models(&self) -> Vec<ModelInfo> {
        self.models.values().map(|e| e.info.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("models", &self.models.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Load-once cache of registries keyed by directory. Create one at startup
/// and hand it to whatever needs models.
pub struct RegistryCache {
    ext: String,
    entries: Mutex<HashMap<PathBuf, Arc<ModelRegistry>>>,
}

impl RegistryCache {
    pub fn new(ext: &str) -> Self {
        Self {
            ext: ext.to_string(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the registry for `dir`, reading disk only on the first call.
    /// A failed load is not cached.
    pub fn get_or_load(&self, dir: &Path) -> NpkResult<Arc<ModelRegistry>> {
        let key = dir.to_path_buf();
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(registry) = entries.get(&key) {
            return Ok(Arc::clone(registry));
        }
        let registry = Arc::new(ModelRegistry::load_dir(dir, &self.ext)?);
        entries.insert(key, Arc::clone(&registry));
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::regressors::LinearModel;
    use crate::models::ModelKind;
    use std::fs;

    fn linear(intercept: f64) -> LinearModel {
        LinearModel {
            features: vec!["RH".to_string()],
            coefficients: vec![1.0],
            intercept,
        }
    }

    #[test]
    fn lookup_of_absent_name_is_missing_model() {
        let registry = ModelRegistry::empty().with_model("Model N", linear(1.0));
        assert!(registry.contains("Model N"));
        assert!(registry.lookup("Model N").is_ok());
        assert!(matches!(
            registry.lookup("Model P"),
            Err(NpkError::MissingModel { .. })
        ));
    }

    #[test]
    fn listing_is_sorted_and_describes_models() {
        let registry = ModelRegistry::empty()
            .with_model("Model P", linear(1.0))
            .with_model("Model K", linear(2.0));
        let infos = registry.models();
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].name.as_str(), "Model K");
        assert_eq!(infos[0].kind, ModelKind::Linear);
        assert_eq!(infos[0].features, vec!["RH".to_string()]);
    }

    #[test]
    fn cache_reads_disk_once() {
        let dir = tempfile::tempdir().unwrap();
        let models = dir.path().join("models");
        fs::create_dir(&models).unwrap();
        fs::write(
            models.join("Model N.json"),
            serde_json::to_vec(&crate::models::ModelArtifact::Linear(linear(3.0))).unwrap(),
        )
        .unwrap();

        let cache = RegistryCache::new("json");
        let first = cache.get_or_load(&models).unwrap();
        assert_eq!(first.len(), 1);

        // Anything read again would now fail.
        fs::remove_dir_all(&models).unwrap();
        let second = cache.get_or_load(&models).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn failed_load_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Model N.json"), "{").unwrap();

        let cache = RegistryCache::new("json");
        assert!(cache.get_or_load(dir.path()).is_err());

        fs::write(
            dir.path().join("Model N.json"),
            serde_json::to_vec(&crate::models::ModelArtifact::Linear(linear(3.0))).unwrap(),
        )
        .unwrap();
        assert_eq!(cache.get_or_load(dir.path()).unwrap().len(), 1);
    }
}
