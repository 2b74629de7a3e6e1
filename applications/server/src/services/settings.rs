/// Runtime settings service - resolution, validation and live scan interval
use crate::error::{Result, ServerError};
use serde_json::{Map, Value};
use sqlx::SqlitePool;
use std::time::Duration;
use tokio::sync::watch;
use vuvur_core::settings::{ResolvedSettings, SettingsResolver};
use vuvur_storage::settings as settings_store;

pub struct SettingsService {
    pool: SqlitePool,
    resolver: SettingsResolver,
    interval: watch::Sender<Duration>,
}

impl SettingsService {
    /// Resolve the current settings and seed the scan interval channel
    pub async fn new(pool: SqlitePool, resolver: SettingsResolver) -> Result<Self> {
        let overrides = settings_store::get_overrides(&pool).await?;
        let resolved = resolver.resolve(&overrides);
        let (interval, _) = watch::channel(resolved.scan_interval());

        Ok(Self {
            pool,
            resolver,
            interval,
        })
    }

    /// Receiver the scan scheduler follows
    pub fn subscribe_interval(&self) -> watch::Receiver<Duration> {
        self.interval.subscribe()
    }

    pub async fn current(&self) -> Result<ResolvedSettings> {
        let overrides = settings_store::get_overrides(&self.pool).await?;
        Ok(self.resolver.resolve(&overrides))
    }

    /// Persist user overrides
    ///
    /// Every key is validated before anything is written, so one bad key
    /// rejects the whole update; the writes share one transaction.
    pub async fn update(&self, changes: &Map<String, Value>) -> Result<ResolvedSettings> {
        for (key, value) in changes {
            self.resolver
                .validate_update(key, value)
                .map_err(ServerError::from)?;
        }

        settings_store::set_overrides(&self.pool, changes).await?;
        for (key, value) in changes {
            tracing::info!("Setting {} updated to {}", key, value);
        }

        let resolved = self.current().await?;
        let interval = resolved.scan_interval();
        self.interval.send_if_modified(|current| {
            if *current == interval {
                false
            } else {
                *current = interval;
                true
            }
        });

        Ok(resolved)
    }
}
