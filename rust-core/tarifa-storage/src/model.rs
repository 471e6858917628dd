// SPDX-License-Identifier: PMPL-1.0-or-later
//! Entities persisted through the storage capabilities.
//!
//! Every tenant-scoped entity is addressed by a [`TenantId`]; cost records
//! are addressed by `(cgrid, run_id)`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Composite key of every tenant-scoped entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId {
    pub tenant: String,
    pub id: String,
}

impl TenantId {
    pub fn new(tenant: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tenant, self.id)
    }
}

/// Anything keyed by tenant and id.
pub trait TenantScoped {
    fn tenant(&self) -> &str;
    fn id(&self) -> &str;

    /// Names of the key fields that are empty, in declaration order.
    fn missing_key_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.tenant().is_empty() {
            missing.push("Tenant");
        }
        if self.id().is_empty() {
            missing.push("ID");
        }
        missing
    }

    fn tenant_id(&self) -> TenantId {
        TenantId::new(self.tenant(), self.id())
    }
}

impl TenantScoped for TenantId {
    fn tenant(&self) -> &str {
        &self.tenant
    }

    fn id(&self) -> &str {
        &self.id
    }
}

/// Window in which a profile is active. Open ends are unbounded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationInterval {
    pub activation_time: Option<DateTime<Utc>>,
    pub expiry_time: Option<DateTime<Utc>>,
}

impl ActivationInterval {
    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        self.activation_time.map_or(true, |start| at >= start)
            && self.expiry_time.map_or(true, |end| at < end)
    }
}

/// Configuration of one statistics queue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatQueueProfile {
    pub tenant: String,
    pub id: String,
    pub filter_ids: Vec<String>,
    pub activation_interval: Option<ActivationInterval>,
    /// Maximum number of events kept in the queue.
    pub queue_length: usize,
    /// Item lifetime in seconds; `None` keeps items until pushed out.
    pub ttl_secs: Option<u64>,
    /// Metric ids computed over the queue, e.g. `*asr`, `*acd`.
    pub metrics: Vec<String>,
    pub thresholds: Vec<String>,
    pub blocker: bool,
    pub stored: bool,
    pub weight: f64,
    pub min_items: usize,
}

impl TenantScoped for StatQueueProfile {
    fn tenant(&self) -> &str {
        &self.tenant
    }

    fn id(&self) -> &str {
        &self.id
    }
}

/// A StatQueueProfile row staged under a tariff plan before loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TpStatQueueProfile {
    pub tpid: String,
    pub profile: StatQueueProfile,
}

/// One completed tariff-plan load, kept in the primary store's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadInstance {
    pub load_id: String,
    pub rating_load_id: String,
    pub accounting_load_id: String,
    pub tariff_plan_id: String,
    pub load_time: DateTime<Utc>,
}

/// Cost breakdown attached to a v1 session cost. Opaque to storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallCost(pub serde_json::Value);

/// Cost breakdown attached to a v2 session cost. Opaque to storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventCost(pub serde_json::Value);

/// Cost of one charging run reported by the session manager.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SmCost {
    pub cgrid: String,
    pub run_id: String,
    pub origin_host: String,
    pub origin_id: String,
    pub cost_source: String,
    /// Charged usage in seconds.
    pub usage: f64,
    pub cost_details: Option<CallCost>,
}

/// Schema revision of [`SmCost`] carrying an [`EventCost`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct V2SmCost {
    pub cgrid: String,
    pub run_id: String,
    pub origin_host: String,
    pub origin_id: String,
    pub cost_source: String,
    pub usage: f64,
    pub cost_details: Option<EventCost>,
}

/// Request to persist an [`SmCost`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttrCdrsStoreSmCost {
    pub cost: SmCost,
    /// Refuse to overwrite an already stored `(cgrid, run_id)`.
    pub check_duplicate: bool,
}

/// Request to persist a [`V2SmCost`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArgsV2CdrsStoreSmCost {
    pub cost: V2SmCost,
    pub check_duplicate: bool,
}

/// Filter for cost lookups. Empty fields match anything; `origin_id_prefix`
/// matches by prefix.
#[derive(Debug, Clone, Copy, Default)]
pub struct CostFilter<'a> {
    pub cgrid: &'a str,
    pub run_id: &'a str,
    pub origin_host: &'a str,
    pub origin_id_prefix: &'a str,
}

impl<'a> CostFilter<'a> {
    pub fn by_id(cgrid: &'a str, run_id: &'a str) -> Self {
        Self {
            cgrid,
            run_id,
            ..Default::default()
        }
    }

    pub fn matches(
        &self,
        cgrid: &str,
        run_id: &str,
        origin_host: &str,
        origin_id: &str,
    ) -> bool {
        (self.cgrid.is_empty() || self.cgrid == cgrid)
            && (self.run_id.is_empty() || self.run_id == run_id)
            && (self.origin_host.is_empty() || self.origin_host == origin_host)
            && origin_id.starts_with(self.origin_id_prefix)
    }
}
