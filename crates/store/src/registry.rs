//! Model registry: versioned model artifacts with lineage metadata.

use std::collections::BTreeMap;
use std::sync::Arc;

use aqi_structs::ModelCard;
use object_store::ObjectStore;
use object_store::path::Path as ObjectStorePath;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::RegistryError;
use crate::objects::{self, LATEST_FILE, LatestPointer, MODELS_ROOT};

const ARTIFACT_FILE: &str = "artifact.json";
const CARD_FILE: &str = "card.json";
const RUNS_DIR: &str = "runs";

/// A registered model: its card and the fitted model itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact<M> {
    pub card: ModelCard,
    pub model: M,
}

/// Published versions of every model after one registration run.
///
/// Each run writes a complete manifest; `models/latest.json` names the
/// current one, so one pointer write publishes a whole batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct RunManifest {
    run: u32,
    models: BTreeMap<String, u32>,
}

fn run_pointer_path() -> ObjectStorePath {
    ObjectStorePath::from(format!("{MODELS_ROOT}/{LATEST_FILE}"))
}

fn run_manifest_path(run: u32) -> ObjectStorePath {
    ObjectStorePath::from(format!("{MODELS_ROOT}/{RUNS_DIR}/r{run}.json"))
}

/// Append-only registry of model versions.
#[derive(Clone)]
pub struct ModelRegistry {
    store: Arc<dyn ObjectStore>,
}

impl ModelRegistry {
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// The manifest of the latest published run, empty if nothing is registered.
    async fn current_run(&self) -> Result<RunManifest, RegistryError> {
        let store = self.store.as_ref();
        let Some(pointer) = objects::get_json::<LatestPointer>(store, &run_pointer_path()).await?
        else {
            return Ok(RunManifest::default());
        };

        let path = run_manifest_path(pointer.version);
        objects::get_json(store, &path)
            .await?
            .ok_or_else(|| RegistryError::Corrupt {
                path: path.to_string(),
                reason: "published run manifest is missing".to_string(),
            })
    }

    /// Registers a batch of models as new versions under their card names.
    ///
    /// Artifacts and the run manifest are written first and the run pointer
    /// last, so either the whole batch becomes visible or none of it does.
    /// The returned cards carry the assigned versions.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::EmptyRegistration`] for an empty batch, or a
    /// store error if a write fails.
    pub async fn register_all<M>(
        &self,
        entries: Vec<(ModelCard, M)>,
    ) -> Result<Vec<ModelCard>, RegistryError>
    where
        M: Serialize,
    {
        if entries.is_empty() {
            return Err(RegistryError::EmptyRegistration);
        }

        let store = self.store.as_ref();
        let mut manifest = self.current_run().await?;
        manifest.run += 1;
        let mut staged = Vec::with_capacity(entries.len());

        for (mut card, model) in entries {
            let version = manifest.models.get(&card.name).map_or(1, |v| v + 1);
            manifest.models.insert(card.name.clone(), version);
            card.version = version;

            let artifact = ModelArtifact { card, model };
            let path =
                objects::version_path(MODELS_ROOT, &artifact.card.name, version, ARTIFACT_FILE);
            objects::put_json(store, &path, &artifact).await?;

            let card_path =
                objects::version_path(MODELS_ROOT, &artifact.card.name, version, CARD_FILE);
            objects::put_json(store, &card_path, &artifact.card).await?;
            debug!(path = %path, "Staged model artifact");

            staged.push(artifact.card);
        }

        objects::put_json(store, &run_manifest_path(manifest.run), &manifest).await?;
        objects::put_json(
            store,
            &run_pointer_path(),
            &LatestPointer {
                version: manifest.run,
            },
        )
        .await?;

        for card in &staged {
            info!(
                model = %card.name,
                version = card.version,
                family = %card.family,
                mae = card.metrics.mae,
                run = manifest.run,
                "Registered model"
            );
        }

        Ok(staged)
    }

    /// Latest published version of `name`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable or the run manifest is corrupt.
    pub async fn latest_version(&self, name: &str) -> Result<Option<u32>, RegistryError> {
        Ok(self.current_run().await?.models.get(name).copied())
    }

    /// Loads a specific model version.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::VersionNotFound`] if the artifact does not exist,
    /// or [`RegistryError::Corrupt`] if it does not deserialize as `M`.
    pub async fn load<M>(&self, name: &str, version: u32) -> Result<ModelArtifact<M>, RegistryError>
    where
        M: DeserializeOwned,
    {
        let path = objects::version_path(MODELS_ROOT, name, version, ARTIFACT_FILE);
        objects::get_json(self.store.as_ref(), &path)
            .await?
            .ok_or_else(|| RegistryError::VersionNotFound {
                name: name.to_string(),
                version,
            })
    }

    /// Loads the latest published version of `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NoModel`] if nothing is registered under `name`.
    pub async fn load_latest<M>(&self, name: &str) -> Result<ModelArtifact<M>, RegistryError>
    where
        M: DeserializeOwned,
    {
        let version = self
            .latest_version(name)
            .await?
            .ok_or_else(|| RegistryError::NoModel {
                name: name.to_string(),
            })?;
        self.load(name, version).await
    }

    /// Cards of the latest version of every registered model, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable or an artifact is corrupt.
    pub async fn list_models(&self) -> Result<Vec<ModelCard>, RegistryError> {
        let manifest = self.current_run().await?;

        let mut cards = Vec::with_capacity(manifest.models.len());
        for (name, version) in manifest.models {
            let path = objects::version_path(MODELS_ROOT, &name, version, CARD_FILE);
            let card: ModelCard = objects::get_json(self.store.as_ref(), &path)
                .await?
                .ok_or(RegistryError::VersionNotFound { name, version })?;
            cards.push(card);
        }
        Ok(cards)
    }
}
