//! Session factory
//!
//! The factory resolves everything a session needs once, up front: the
//! version codec for the configured column type and the dialect capabilities
//! of the row store. Sessions opened from it share the store and the
//! detector; each session owns its own snapshots.

use crate::config::LockingConfig;
use crate::detector::StaleWriteDetector;
use crate::session::Session;
use rowguard_core::{ColumnTypeRegistry, Error, Result};
use rowguard_storage::RowStore;
use std::sync::Arc;
use tracing::info;

/// Opens sessions over one row store
///
/// # Thread Safety
///
/// The factory is `Send + Sync` whenever the store is, and can be shared
/// behind an `Arc`. Sessions are not shared; open one per thread.
pub struct SessionFactory<S: RowStore + ?Sized> {
    detector: StaleWriteDetector<S>,
    config: Arc<LockingConfig>,
}

impl<S: RowStore + ?Sized> SessionFactory<S> {
    /// Start building a factory
    pub fn builder() -> SessionFactoryBuilder<S> {
        SessionFactoryBuilder::new()
    }

    /// Open a session with no transaction started
    pub fn open_session(&self) -> Session<S> {
        Session::new(self.detector.clone(), Arc::clone(&self.config))
    }

    /// Detector shared by every session
    pub fn detector(&self) -> &StaleWriteDetector<S> {
        &self.detector
    }

    /// Underlying row store
    pub fn store(&self) -> &Arc<S> {
        self.detector.store()
    }

    /// Configuration sessions are opened with
    pub fn config(&self) -> &LockingConfig {
        &self.config
    }
}

impl<S: RowStore + ?Sized> std::fmt::Debug for SessionFactory<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionFactory")
            .field("detector", &self.detector)
            .field("config", &self.config)
            .finish()
    }
}

/// Builder for [`SessionFactory`]
pub struct SessionFactoryBuilder<S: RowStore + ?Sized> {
    store: Option<Arc<S>>,
    config: LockingConfig,
    registry: Option<ColumnTypeRegistry>,
}

impl<S: RowStore + ?Sized> SessionFactoryBuilder<S> {
    /// Builder with default configuration and the global codec registry
    pub fn new() -> Self {
        Self {
            store: None,
            config: LockingConfig::default(),
            registry: None,
        }
    }

    /// Row store sessions write through (required)
    pub fn store(mut self, store: Arc<S>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: LockingConfig) -> Self {
        self.config = config;
        self
    }

    /// Column type name to resolve the version codec from
    pub fn version_column_type(mut self, column_type: impl Into<String>) -> Self {
        self.config.version_column_type = column_type.into();
        self
    }

    /// Resolve codecs from `registry` instead of the global one
    pub fn registry(mut self, registry: ColumnTypeRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Resolve the codec and capabilities and build the factory
    ///
    /// # Errors
    /// * [`Error::Config`] if no store was given
    /// * [`Error::UnknownColumnType`] if the configured column type has no codec
    pub fn build(self) -> Result<SessionFactory<S>> {
        let store = self
            .store
            .ok_or_else(|| Error::Config("session factory needs a row store".to_string()))?;
        let registry = match &self.registry {
            Some(registry) => registry,
            None => ColumnTypeRegistry::global(),
        };
        let codec = registry.resolve(&self.config.version_column_type)?;

        let detector = StaleWriteDetector::new(store, codec);
        info!(
            dialect = %detector.capabilities().dialect,
            column_type = %self.config.version_column_type,
            unify_not_found = self.config.unify_not_found,
            "session factory built"
        );
        Ok(SessionFactory {
            detector,
            config: Arc::new(self.config),
        })
    }
}

impl<S: RowStore + ?Sized> Default for SessionFactoryBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}
