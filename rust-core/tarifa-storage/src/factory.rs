// SPDX-License-Identifier: PMPL-1.0-or-later
//! Backend factory: turns per-capability configuration into engines.
//!
//! Every capability owns a [`BackendRegistry`] mapping backend tags to
//! constructors. The factory looks the configured tag up, composes the
//! connection address and hands a [`BackendDescriptor`] to the constructor.
//! The descriptor is consumed; the returned engine owns everything
//! afterwards. Fatal configuration errors are logged here, once, at
//! `severity = "critical"`.
//!
//! Built-in registrations:
//!
//! | capability | tags                          |
//! |------------|-------------------------------|
//! | `data_db`  | `redis`, `mongo`              |
//! | `stor_db`  | `mysql`, `mongo`, `postgres`  |
//! | `load_db`  | `mysql`, `mongo`, `postgres`  |
//! | `cdr_db`   | `mysql`, `mongo`, `postgres`  |

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error};

use crate::config::{CacheConfig, DataDbConfig, PoolConfig, StorDbConfig};
use crate::contracts::{CdrStorage, DataDb, LoadStorage, Storage};
use crate::engines::{
    DocumentOptions, DocumentStore, KvOptions, KvStore, SqlDialect, SqlOptions, SqlStore,
    StoragePurpose, MONGO, MYSQL, POSTGRES, REDIS,
};
use crate::error::StorageError;
use crate::marshal::Marshaler;

/// The four storage capabilities the factory builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    DataDb,
    StorDb,
    LoadDb,
    CdrDb,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::DataDb => "data_db",
            Capability::StorDb => "stor_db",
            Capability::LoadDb => "load_db",
            Capability::CdrDb => "cdr_db",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a constructor needs to open one engine.
#[derive(Debug, Clone)]
pub struct BackendDescriptor<T> {
    /// `host:port`, or the bare host when no port was configured.
    pub address: String,
    pub name: String,
    pub user: String,
    pub pass: String,
    /// Value encoding tag as configured. The SQL families ignore it.
    pub marshaler_tag: String,
    /// Capability-specific settings.
    pub tuning: T,
}

impl<T> BackendDescriptor<T> {
    /// The configured encoding, for constructors that store encoded values.
    pub fn marshaler(&self) -> Result<Marshaler, StorageError> {
        self.marshaler_tag.parse()
    }
}

/// Primary-store settings carried to `data_db` constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataDbTuning {
    pub cache: CacheConfig,
    pub load_history_size: usize,
}

/// Settings carried to `stor_db`, `load_db` and `cdr_db` constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorDbTuning {
    pub pool: PoolConfig,
    pub cdrs_indexes: Vec<String>,
}

type Constructor<C, T> =
    Arc<dyn Fn(BackendDescriptor<T>) -> Result<Arc<C>, StorageError> + Send + Sync>;

/// Ordered tag-to-constructor table for one capability.
pub struct BackendRegistry<C: ?Sized, T> {
    capability: Capability,
    entries: Vec<(&'static str, Constructor<C, T>)>,
}

impl<C: ?Sized, T> BackendRegistry<C, T> {
    pub fn new(capability: Capability) -> Self {
        Self {
            capability,
            entries: Vec::new(),
        }
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    /// Add a constructor under `tag`. A tag can be registered once.
    pub fn register<F>(&mut self, tag: &'static str, constructor: F) -> Result<(), StorageError>
    where
        F: Fn(BackendDescriptor<T>) -> Result<Arc<C>, StorageError> + Send + Sync + 'static,
    {
        if self.entries.iter().any(|(known, _)| *known == tag) {
            return Err(StorageError::DuplicateBackend {
                capability: self.capability,
                tag,
            });
        }
        self.entries.push((tag, Arc::new(constructor)));
        Ok(())
    }

    /// Registered tags in registration order.
    pub fn tags(&self) -> Vec<&'static str> {
        self.entries.iter().map(|(tag, _)| *tag).collect()
    }

    fn lookup(&self, tag: &str) -> Result<&Constructor<C, T>, StorageError> {
        self.entries
            .iter()
            .find(|(known, _)| *known == tag)
            .map(|(_, constructor)| constructor)
            .ok_or_else(|| StorageError::UnsupportedBackend {
                capability: self.capability,
                given: tag.to_string(),
                valid: self.tags(),
            })
    }

    /// Run the constructor registered under `tag`.
    pub fn build(&self, tag: &str, descriptor: BackendDescriptor<T>) -> Result<Arc<C>, StorageError> {
        let constructor = self.lookup(tag)?;
        constructor(descriptor)
    }
}

impl<C: ?Sized, T> fmt::Debug for BackendRegistry<C, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("capability", &self.capability)
            .field("tags", &self.tags())
            .finish()
    }
}

/// One registry per capability.
#[derive(Debug)]
pub struct StorageFactory {
    data_db: BackendRegistry<dyn DataDb, DataDbTuning>,
    stor_db: BackendRegistry<dyn Storage, StorDbTuning>,
    load_db: BackendRegistry<dyn LoadStorage, StorDbTuning>,
    cdr_db: BackendRegistry<dyn CdrStorage, StorDbTuning>,
}

impl StorageFactory {
    /// A factory with no backend registered.
    pub fn empty() -> Self {
        Self {
            data_db: BackendRegistry::new(Capability::DataDb),
            stor_db: BackendRegistry::new(Capability::StorDb),
            load_db: BackendRegistry::new(Capability::LoadDb),
            cdr_db: BackendRegistry::new(Capability::CdrDb),
        }
    }

    /// A factory with the built-in engines registered.
    pub fn with_builtin_backends() -> Result<Self, StorageError> {
        let mut factory = Self::empty();

        factory.data_db.register(REDIS, |d| {
            let store: Arc<dyn DataDb> = Arc::new(open_kv(d)?);
            Ok(store)
        })?;
        factory.data_db.register(MONGO, |d| {
            let store: Arc<dyn DataDb> = Arc::new(open_document_data(d)?);
            Ok(store)
        })?;

        factory.stor_db.register(MYSQL, |d| {
            let store: Arc<dyn Storage> = Arc::new(open_sql(SqlDialect::MySql, d)?);
            Ok(store)
        })?;
        factory.stor_db.register(MONGO, |d| {
            let store: Arc<dyn Storage> = Arc::new(open_document_stor(d)?);
            Ok(store)
        })?;
        factory.stor_db.register(POSTGRES, |d| {
            let store: Arc<dyn Storage> = Arc::new(open_sql(SqlDialect::Postgres, d)?);
            Ok(store)
        })?;

        factory.load_db.register(MYSQL, |d| {
            let store: Arc<dyn LoadStorage> = Arc::new(open_sql(SqlDialect::MySql, d)?);
            Ok(store)
        })?;
        factory.load_db.register(MONGO, |d| {
            let store: Arc<dyn LoadStorage> = Arc::new(open_document_stor(d)?);
            Ok(store)
        })?;
        factory.load_db.register(POSTGRES, |d| {
            let store: Arc<dyn LoadStorage> = Arc::new(open_sql(SqlDialect::Postgres, d)?);
            Ok(store)
        })?;

        factory.cdr_db.register(MYSQL, |d| {
            let store: Arc<dyn CdrStorage> = Arc::new(open_sql(SqlDialect::MySql, d)?);
            Ok(store)
        })?;
        factory.cdr_db.register(MONGO, |d| {
            let store: Arc<dyn CdrStorage> = Arc::new(open_document_stor(d)?);
            Ok(store)
        })?;
        factory.cdr_db.register(POSTGRES, |d| {
            let store: Arc<dyn CdrStorage> = Arc::new(open_sql(SqlDialect::Postgres, d)?);
            Ok(store)
        })?;

        Ok(factory)
    }

    pub fn data_db_registry_mut(&mut self) -> &mut BackendRegistry<dyn DataDb, DataDbTuning> {
        &mut self.data_db
    }

    pub fn stor_db_registry_mut(&mut self) -> &mut BackendRegistry<dyn Storage, StorDbTuning> {
        &mut self.stor_db
    }

    pub fn load_db_registry_mut(
        &mut self,
    ) -> &mut BackendRegistry<dyn LoadStorage, StorDbTuning> {
        &mut self.load_db
    }

    pub fn cdr_db_registry_mut(&mut self) -> &mut BackendRegistry<dyn CdrStorage, StorDbTuning> {
        &mut self.cdr_db
    }

    /// Build the primary store.
    pub fn data_db(&self, cfg: DataDbConfig) -> Result<Arc<dyn DataDb>, StorageError> {
        let build = || {
            let constructor = self.data_db.lookup(&cfg.db_type)?;
            let descriptor = descriptor(
                &cfg.conn,
                DataDbTuning {
                    cache: cfg.cache,
                    load_history_size: cfg.load_history_size,
                },
            );
            debug!(capability = %Capability::DataDb, backend = %cfg.db_type, address = %descriptor.address, "building storage");
            constructor(descriptor)
        };
        build().map_err(|err| log_fatal(Capability::DataDb, err))
    }

    /// Build the generic stored-object store.
    pub fn stor_db(&self, cfg: StorDbConfig) -> Result<Arc<dyn Storage>, StorageError> {
        build_stor(&self.stor_db, cfg)
    }

    /// Build the bulk-load store.
    pub fn load_db(&self, cfg: StorDbConfig) -> Result<Arc<dyn LoadStorage>, StorageError> {
        build_stor(&self.load_db, cfg)
    }

    /// Build the CDR store.
    pub fn cdr_db(&self, cfg: StorDbConfig) -> Result<Arc<dyn CdrStorage>, StorageError> {
        build_stor(&self.cdr_db, cfg)
    }
}

fn build_stor<C: ?Sized>(
    registry: &BackendRegistry<C, StorDbTuning>,
    cfg: StorDbConfig,
) -> Result<Arc<C>, StorageError> {
    let build = move || {
        let constructor = registry.lookup(&cfg.db_type)?;
        let descriptor = descriptor(
            &cfg.conn,
            StorDbTuning {
                pool: cfg.pool,
                cdrs_indexes: cfg.cdrs_indexes,
            },
        );
        debug!(capability = %registry.capability(), backend = %cfg.db_type, address = %descriptor.address, "building storage");
        constructor(descriptor)
    };
    build().map_err(|err| log_fatal(registry.capability(), err))
}

/// Log `err` as critical when it means `capability` cannot be configured.
fn log_fatal(capability: Capability, err: StorageError) -> StorageError {
    if err.is_fatal_config() {
        error!(severity = "critical", capability = %capability, error = %err, "cannot configure storage");
    }
    err
}

fn descriptor<T>(conn: &crate::config::ConnectionParams, tuning: T) -> BackendDescriptor<T> {
    BackendDescriptor {
        address: conn.address(),
        name: conn.name.clone(),
        user: conn.user.clone(),
        pass: conn.pass.clone(),
        marshaler_tag: conn.marshaler.clone(),
        tuning,
    }
}

/// Database index of a key-value store. Anything but a non-negative integer
/// is fatal.
pub fn parse_db_index(name: &str) -> Result<u32, StorageError> {
    name.parse::<u32>().map_err(|_| {
        StorageError::InvalidConfig(format!("redis db name must be an integer, got '{name}'"))
    })
}

fn open_kv(d: BackendDescriptor<DataDbTuning>) -> Result<KvStore, StorageError> {
    let db_index = parse_db_index(&d.name)?;
    let marshaler = d.marshaler()?;
    KvStore::open(KvOptions {
        address: d.address,
        db_index,
        password: d.pass,
        marshaler,
        max_conns: KvStore::MAX_CONNS,
        cache: d.tuning.cache,
        load_history_size: d.tuning.load_history_size,
    })
}

fn open_document<T>(
    d: BackendDescriptor<T>,
    purpose: StoragePurpose,
) -> Result<DocumentStore, StorageError> {
    let marshaler = d.marshaler()?;
    DocumentStore::open(DocumentOptions {
        address: d.address,
        database: d.name,
        user: d.user,
        password: d.pass,
        marshaler,
        purpose,
    })
}

fn open_document_data(d: BackendDescriptor<DataDbTuning>) -> Result<DocumentStore, StorageError> {
    let purpose = StoragePurpose::DataDb {
        cache: d.tuning.cache,
        load_history_size: d.tuning.load_history_size,
    };
    open_document(d, purpose)
}

fn open_document_stor(d: BackendDescriptor<StorDbTuning>) -> Result<DocumentStore, StorageError> {
    let purpose = StoragePurpose::StorDb {
        cdrs_indexes: d.tuning.cdrs_indexes.clone(),
    };
    open_document(d, purpose)
}

fn open_sql(
    dialect: SqlDialect,
    d: BackendDescriptor<StorDbTuning>,
) -> Result<SqlStore, StorageError> {
    SqlStore::open(SqlOptions {
        dialect,
        address: d.address,
        database: d.name,
        user: d.user,
        password: d.pass,
        pool: d.tuning.pool,
    })
}

fn builtin_factory() -> Result<StorageFactory, StorageError> {
    StorageFactory::with_builtin_backends()
}

/// Build the primary store from `cfg` with the built-in backends.
pub fn configure_data_db(cfg: DataDbConfig) -> Result<Arc<dyn DataDb>, StorageError> {
    builtin_factory()?.data_db(cfg)
}

/// Build the generic store from `cfg` with the built-in backends.
pub fn configure_stor_db(cfg: StorDbConfig) -> Result<Arc<dyn Storage>, StorageError> {
    builtin_factory()?.stor_db(cfg)
}

/// Build the bulk-load store from `cfg` with the built-in backends.
pub fn configure_load_db(cfg: StorDbConfig) -> Result<Arc<dyn LoadStorage>, StorageError> {
    builtin_factory()?.load_db(cfg)
}

/// Build the CDR store from `cfg` with the built-in backends.
pub fn configure_cdr_db(cfg: StorDbConfig) -> Result<Arc<dyn CdrStorage>, StorageError> {
    builtin_factory()?.cdr_db(cfg)
}
