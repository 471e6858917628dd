// SPDX-License-Identifier: PMPL-1.0-or-later
//! Startup assembly of the four storage capabilities.

use std::sync::Arc;

use tarifa_storage::{
    Capability, CdrStorage, DataDb, LoadStorage, Storage, StorageError, StorageFactory,
};
use tracing::{error, info};

use crate::config::EngineConfig;

/// The storage capabilities injected into the services.
pub struct StorageLayer {
    pub data_db: Arc<dyn DataDb>,
    pub stor_db: Arc<dyn Storage>,
    pub load_db: Arc<dyn LoadStorage>,
    pub cdr_db: Arc<dyn CdrStorage>,
}

impl StorageLayer {
    /// Build every capability with the built-in backends.
    pub fn assemble(config: &EngineConfig) -> Result<Self, StorageError> {
        let factory = StorageFactory::with_builtin_backends()?;
        Self::assemble_with(&factory, config)
    }

    /// Build every capability with `factory`, once each. The first failure
    /// aborts the assembly.
    pub fn assemble_with(
        factory: &StorageFactory,
        config: &EngineConfig,
    ) -> Result<Self, StorageError> {
        let data_db = factory
            .data_db(config.data_db.clone())
            .map_err(|err| reject(Capability::DataDb, err))?;
        let stor_db = factory
            .stor_db(config.stor_db.clone())
            .map_err(|err| reject(Capability::StorDb, err))?;
        let load_db = factory
            .load_db(config.stor_db.clone())
            .map_err(|err| reject(Capability::LoadDb, err))?;
        let cdr_db = factory
            .cdr_db(config.stor_db.clone())
            .map_err(|err| reject(Capability::CdrDb, err))?;

        info!(
            data_db = %data_db.endpoint(),
            stor_db = %stor_db.endpoint(),
            load_db = %load_db.endpoint(),
            cdr_db = %cdr_db.endpoint(),
            "storage layer assembled"
        );
        Ok(Self {
            data_db,
            stor_db,
            load_db,
            cdr_db,
        })
    }

    /// Close every capability; the first error is returned after all were
    /// attempted.
    pub async fn close(&self) -> Result<(), StorageError> {
        let results = [
            self.data_db.close().await,
            self.stor_db.close().await,
            self.load_db.close().await,
            self.cdr_db.close().await,
        ];
        results.into_iter().collect()
    }
}

/// Fatal configuration errors were already logged by the factory.
fn reject(capability: Capability, err: StorageError) -> StorageError {
    if !err.is_fatal_config() {
        error!(capability = %capability, error = %err, "storage unavailable");
    }
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tarifa_storage::StorDbConfig;
    use tracing::field::{Field, Visit};
    use tracing::{Event, Subscriber};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    /// Counts events carrying `severity = "critical"`.
    #[derive(Clone, Default)]
    struct CriticalCounter(Arc<AtomicUsize>);

    struct SeverityVisitor(bool);

    impl Visit for SeverityVisitor {
        fn record_str(&mut self, field: &Field, value: &str) {
            if field.name() == "severity" && value == "critical" {
                self.0 = true;
            }
        }

        fn record_debug(&mut self, _field: &Field, _value: &dyn std::fmt::Debug) {}
    }

    impl<S: Subscriber> Layer<S> for CriticalCounter {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            let mut visitor = SeverityVisitor(false);
            event.record(&mut visitor);
            if visitor.0 {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn critical_events(config: &EngineConfig) -> usize {
        let counter = CriticalCounter::default();
        let subscriber = tracing_subscriber::registry().with(counter.clone());
        let result = tracing::subscriber::with_default(subscriber, || StorageLayer::assemble(config));
        assert!(result.is_err());
        counter.0.load(Ordering::SeqCst)
    }

    #[tokio::test]
    async fn test_default_layer() {
        let layer = StorageLayer::assemble(&EngineConfig::default()).unwrap();
        assert_eq!(layer.data_db.backend(), "redis");
        assert_eq!(layer.stor_db.backend(), "mysql");
        assert_eq!(layer.load_db.backend(), "mysql");
        assert_eq!(layer.cdr_db.backend(), "mysql");
        layer.close().await.unwrap();
    }

    #[test]
    fn test_unknown_stor_backend_aborts() {
        let config = EngineConfig {
            stor_db: StorDbConfig {
                db_type: "sqlite".to_string(),
                ..StorDbConfig::default()
            },
            ..EngineConfig::default()
        };
        let err = StorageLayer::assemble(&config).err().unwrap();
        assert!(err.is_fatal_config());
        assert!(err.to_string().contains("stor_db"));
    }

    #[test]
    fn test_fatal_config_logged_once() {
        let mut config = EngineConfig::default();
        config.data_db.conn.name = "abc".to_string();
        assert_eq!(critical_events(&config), 1);

        let config = EngineConfig {
            stor_db: StorDbConfig {
                db_type: "sqlite".to_string(),
                ..StorDbConfig::default()
            },
            ..EngineConfig::default()
        };
        assert_eq!(critical_events(&config), 1);
    }
}
