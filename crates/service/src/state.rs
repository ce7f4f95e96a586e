//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::attribution::ConversionAttributor;
use crate::config::ServiceConfig;
use crate::db::carts::PgCartSnapshotStore;
use crate::db::meta::PgDedupStore;
use crate::db::platform::{PgOrderDirectory, PgPlatformStore};
use crate::events::EventBus;
use crate::lifecycle::{Collaborators, LifecycleOrchestrator};
use crate::scheduler::EmailScheduler;

impl Collaborators {
    /// Wire every store to Postgres, with the given scheduler client.
    #[must_use]
    pub fn postgres(pool: &PgPool, scheduler: Arc<dyn EmailScheduler>) -> Self {
        Self {
            snapshots: Arc::new(PgCartSnapshotStore::new(pool.clone())),
            dedup: Arc::new(PgDedupStore::new(pool.clone())),
            scheduler,
            orders: Arc::new(PgOrderDirectory::new(pool.clone())),
            platform: Arc::new(PgPlatformStore::new(pool.clone())),
        }
    }
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; provides access to configuration, the
/// database pool, the event bus, and the collaborator set.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServiceConfig,
    pool: PgPool,
    collaborators: Collaborators,
    bus: EventBus,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: ServiceConfig, pool: PgPool, collaborators: Collaborators) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                collaborators,
                bus: EventBus::default(),
            }),
        }
    }

    /// Get a reference to the service configuration.
    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the application event bus.
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    /// Build a lifecycle orchestrator over the shared collaborators.
    #[must_use]
    pub fn orchestrator(&self) -> LifecycleOrchestrator {
        LifecycleOrchestrator::new(
            self.inner.collaborators.clone(),
            self.inner.bus.clone(),
            self.inner.config.abandonment,
        )
    }

    /// Build a conversion attributor over the shared collaborators.
    #[must_use]
    pub fn attributor(&self) -> ConversionAttributor {
        ConversionAttributor::new(
            self.inner.collaborators.orders.clone(),
            self.inner.collaborators.scheduler.clone(),
            self.inner.bus.clone(),
            self.inner.config.conversion_days,
        )
    }
}
