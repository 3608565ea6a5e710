// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Composition root for the host services.
//
// Everything the session needs (store, push, account, platform bridge) is
// constructed here exactly once and passed down explicitly. There are no
// process-wide singletons; dropping `AppServices` releases all of it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use webshell_bridge::SharedBridge;
use webshell_core::AppConfig;
use webshell_core::config::CONFIG_FILE;
use webshell_core::error::Result;
use webshell_host::{
    AccountService, DeviceRegistry, HttpDeviceRegistry, OfflineRegistry, PushService,
    SharedStore, UserStore,
};

use super::data_dir;

const STORE_FILE: &str = "webshell.db";

/// Shared application services. Cheap to clone.
#[derive(Clone)]
pub struct AppServices {
    bridge: SharedBridge,
    store: SharedStore,
    push: Arc<PushService>,
    account: Arc<AccountService>,
    data_dir: PathBuf,
    config: AppConfig,
}

impl AppServices {
    /// Initialise services in the platform data directory.
    pub fn init(bridge: SharedBridge) -> Result<Self> {
        Self::init_in(&data_dir::data_dir(), bridge)
    }

    /// Initialise services rooted at `dir`: open the store, load the config.
    pub fn init_in(dir: &Path, bridge: SharedBridge) -> Result<Self> {
        info!(path = %dir.display(), "initialising app services");
        let store = UserStore::open(dir.join(STORE_FILE))?;
        if !dir.join(CONFIG_FILE).exists() {
            write_default_config(dir);
        }
        let config = AppConfig::load(dir);
        Ok(Self::assemble(dir.to_path_buf(), store, config, bridge))
    }

    /// Services backed by an in-memory store, for when the data directory is
    /// unusable. Nothing survives a restart.
    pub fn fallback(bridge: SharedBridge) -> Result<Self> {
        let store = UserStore::open_in_memory()?;
        let mut config = AppConfig::default();
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(Self::assemble(std::env::temp_dir(), store, config, bridge))
    }

    fn assemble(data_dir: PathBuf, store: UserStore, config: AppConfig, bridge: SharedBridge) -> Self {
        let store = store.into_shared();
        let registry = device_registry(&config);
        let push = Arc::new(PushService::new(
            SharedBridge::clone(&bridge),
            registry,
            store.clone(),
            config.push_enabled,
        ));
        let account = Arc::new(AccountService::new(store.clone(), Arc::clone(&push)));

        info!(
            platform = bridge.platform_name(),
            site = %config.site_url,
            "app services initialised"
        );

        Self {
            bridge,
            store,
            push,
            account,
            data_dir,
            config,
        }
    }

    pub fn bridge(&self) -> SharedBridge {
        SharedBridge::clone(&self.bridge)
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn push(&self) -> &Arc<PushService> {
        &self.push
    }

    pub fn account(&self) -> &Arc<AccountService> {
        &self.account
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

/// Seed an editable config file on first run.
fn write_default_config(dir: &Path) {
    match AppConfig::default().persist(dir) {
        Ok(()) => info!(path = %dir.join(CONFIG_FILE).display(), "wrote default config"),
        Err(e) => warn!(error = %e, "could not write default config"),
    }
}

/// The device-registry collaborator: HTTP to the configured backend, or
/// offline when no backend is set or its URL is unusable.
fn device_registry(config: &AppConfig) -> Arc<dyn DeviceRegistry> {
    let Some(url) = config.backend_url.as_deref() else {
        info!("no backend configured; push registration stays local");
        return Arc::new(OfflineRegistry);
    };
    match HttpDeviceRegistry::new(url) {
        Ok(registry) => {
            info!(endpoint = %registry.endpoint(), "device registry configured");
            Arc::new(registry)
        }
        Err(e) => {
            warn!(%url, error = %e, "unusable backend URL; push registration stays local");
            Arc::new(OfflineRegistry)
        }
    }
}
