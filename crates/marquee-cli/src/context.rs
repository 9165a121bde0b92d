//! Per-invocation state: configuration, store snapshot and service.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use marquee_config::MarqueeConfig;
use marquee_delegation::{Caller, DelegationService, MemoryStore};
use marquee_types::StaffId;
use tracing::debug;

use crate::GlobalArgs;

pub struct Context {
    pub store: Arc<MemoryStore>,
    pub service: DelegationService,
    pub caller: Caller,
    state_file: PathBuf,
}

impl Context {
    /// Loads configuration and the state snapshot it points at.
    pub fn load(global: &GlobalArgs) -> Result<Self> {
        let config = match &global.config {
            Some(path) => MarqueeConfig::from_toml_file(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
            None => MarqueeConfig::load_from_dir(&global.project)
                .context("Failed to load configuration")?,
        };

        let state_file = config.store.state_file.clone();
        let store = Arc::new(
            MemoryStore::load(&state_file)
                .with_context(|| format!("Failed to load state from {}", state_file.display()))?,
        );
        debug!(path = %state_file.display(), "Loaded state snapshot");

        let service = DelegationService::from_config(Arc::clone(&store), &config);
        let caller = Caller::new(StaffId::new(global.caller), global.authority.into());

        Ok(Self {
            store,
            service,
            caller,
            state_file,
        })
    }

    /// Persists the store snapshot.
    pub fn save(&self) -> Result<()> {
        self.store
            .save(&self.state_file)
            .with_context(|| format!("Failed to save state to {}", self.state_file.display()))
    }
}
