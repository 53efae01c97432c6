use std::{collections::HashMap, sync::Arc};

use ctrlprop_core::ControlModel;
use ctrlprop_models::CatalogEntry;

use crate::BatchError;

/// A model registered for a batch run.
#[derive(Clone)]
pub struct RegisteredModel {
    pub key: String,
    pub name: String,
    pub model: Arc<dyn ControlModel + Send + Sync>,
}

/// The models of a batch run, keyed by identifier.
///
/// Built once and read-only afterwards; components that need lookups borrow it.
#[derive(Clone, Default)]
pub struct ModelRegistry {
    models: Vec<RegisteredModel>,
    index: HashMap<String, usize>,
}

impl ModelRegistry {
    #[must_use]
    pub fn builder() -> ModelRegistryBuilder {
        ModelRegistryBuilder::default()
    }

    /// A registry holding every entry of a model catalog.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::DuplicateKey`] if two entries share a key.
    pub fn from_catalog(catalog: Vec<CatalogEntry>) -> Result<Self, BatchError> {
        catalog
            .into_iter()
            .try_fold(Self::builder(), |builder, entry| {
                builder.register(entry.key, entry.name, Arc::from(entry.model))
            })
            .map(ModelRegistryBuilder::build)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&RegisteredModel> {
        self.index.get(key).map(|&i| &self.models[i])
    }

    /// Registered models in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredModel> {
        self.models.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// The models named by `keys`, in that order.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::UnknownModel`] for the first key not registered.
    pub fn select(&self, keys: &[String]) -> Result<Vec<&RegisteredModel>, BatchError> {
        keys.iter()
            .map(|key| self.get(key).ok_or_else(|| BatchError::UnknownModel(key.clone())))
            .collect()
    }
}

/// Builder for [`ModelRegistry`].
#[derive(Default)]
pub struct ModelRegistryBuilder {
    registry: ModelRegistry,
}

impl ModelRegistryBuilder {
    /// Adds a model under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::DuplicateKey`] if `key` is already registered.
    pub fn register(
        mut self,
        key: impl Into<String>,
        name: impl Into<String>,
        model: Arc<dyn ControlModel + Send + Sync>,
    ) -> Result<Self, BatchError> {
        let key = key.into();
        if self.registry.index.contains_key(&key) {
            return Err(BatchError::DuplicateKey(key));
        }
        self.registry.index.insert(key.clone(), self.registry.models.len());
        self.registry.models.push(RegisteredModel {
            key,
            name: name.into(),
            model,
        });
        Ok(self)
    }

    #[must_use]
    pub fn build(self) -> ModelRegistry {
        self.registry
    }
}
