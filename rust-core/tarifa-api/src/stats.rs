// SPDX-License-Identifier: PMPL-1.0-or-later
//
// StatSV1: the stats service as seen by RPC callers.
//
// The binding forwards to whatever `StatService` it was built with; how
// queues aggregate events into metrics lives behind that trait.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tarifa_dispatch::{DispatchError, Dispatcher};
use tarifa_storage::TenantId;

use crate::error::{ApiError, OK};

/// An event offered to the stat queues of a tenant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatEvent {
    pub tenant: String,
    pub id: String,
    pub time: Option<DateTime<Utc>>,
    pub event: HashMap<String, serde_json::Value>,
}

/// Runtime view of one stat queue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatQueue {
    pub tenant: String,
    pub id: String,
    /// Number of events currently held.
    pub items: usize,
    pub metric_ids: Vec<String>,
}

#[async_trait]
pub trait StatService: Send + Sync {
    /// Feed `event` to every matching queue.
    async fn process_event(&self, event: &StatEvent) -> Result<(), ApiError>;

    async fn stat_queues_for_event(&self, event: &StatEvent) -> Result<Vec<StatQueue>, ApiError>;

    /// Metric values of one queue, formatted for display.
    async fn queue_string_metrics(&self, queue: &TenantId)
        -> Result<HashMap<String, String>, ApiError>;

    async fn queue_float_metrics(&self, queue: &TenantId)
        -> Result<HashMap<String, f64>, ApiError>;
}

pub struct StatSV1 {
    stats: Arc<dyn StatService>,
}

impl StatSV1 {
    pub const SERVICE: &'static str = "StatSV1";

    pub fn new(stats: Arc<dyn StatService>) -> Self {
        Self { stats }
    }

    pub async fn process_event(&self, event: &StatEvent) -> Result<String, ApiError> {
        self.stats.process_event(event).await?;
        Ok(OK.to_string())
    }

    pub async fn get_stat_queues_for_event(
        &self,
        event: &StatEvent,
    ) -> Result<Vec<StatQueue>, ApiError> {
        self.stats.stat_queues_for_event(event).await
    }

    pub async fn get_queue_string_metrics(
        &self,
        queue: &TenantId,
    ) -> Result<HashMap<String, String>, ApiError> {
        self.stats.queue_string_metrics(queue).await
    }

    pub async fn get_queue_float_metrics(
        &self,
        queue: &TenantId,
    ) -> Result<HashMap<String, f64>, ApiError> {
        self.stats.queue_float_metrics(queue).await
    }

    /// Export the operations under [`StatSV1::SERVICE`].
    pub fn dispatcher(self: Arc<Self>) -> Result<Dispatcher<StatSV1>, DispatchError> {
        Dispatcher::builder(Self::SERVICE, self)
            .register("ProcessEvent", |svc: Arc<StatSV1>, event: StatEvent| async move {
                svc.process_event(&event).await
            })?
            .register(
                "GetStatQueuesForEvent",
                |svc: Arc<StatSV1>, event: StatEvent| async move {
                    svc.get_stat_queues_for_event(&event).await
                },
            )?
            .register(
                "GetQueueStringMetrics",
                |svc: Arc<StatSV1>, queue: TenantId| async move {
                    svc.get_queue_string_metrics(&queue).await
                },
            )?
            .register(
                "GetQueueFloatMetrics",
                |svc: Arc<StatSV1>, queue: TenantId| async move {
                    svc.get_queue_float_metrics(&queue).await
                },
            )?
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Mutex;

    /// Counts events per tenant; one queue per tenant.
    #[derive(Default)]
    struct CountingStats {
        seen: Mutex<HashMap<String, usize>>,
    }

    #[async_trait]
    impl StatService for CountingStats {
        async fn process_event(&self, event: &StatEvent) -> Result<(), ApiError> {
            *self.seen.lock().await.entry(event.tenant.clone()).or_default() += 1;
            Ok(())
        }

        async fn stat_queues_for_event(
            &self,
            event: &StatEvent,
        ) -> Result<Vec<StatQueue>, ApiError> {
            let seen = self.seen.lock().await;
            let items = seen.get(&event.tenant).copied().ok_or(ApiError::NotFound)?;
            Ok(vec![StatQueue {
                tenant: event.tenant.clone(),
                id: "SQ_COUNT".to_string(),
                items,
                metric_ids: vec!["*count".to_string()],
            }])
        }

        async fn queue_string_metrics(
            &self,
            queue: &TenantId,
        ) -> Result<HashMap<String, String>, ApiError> {
            let floats = self.queue_float_metrics(queue).await?;
            Ok(floats.into_iter().map(|(k, v)| (k, v.to_string())).collect())
        }

        async fn queue_float_metrics(
            &self,
            queue: &TenantId,
        ) -> Result<HashMap<String, f64>, ApiError> {
            let seen = self.seen.lock().await;
            let count = seen.get(&queue.tenant).copied().ok_or(ApiError::NotFound)?;
            Ok(HashMap::from([("*count".to_string(), count as f64)]))
        }
    }

    fn event(tenant: &str) -> StatEvent {
        StatEvent {
            tenant: tenant.to_string(),
            id: "ev1".to_string(),
            event: HashMap::from([("Account".to_string(), serde_json::json!("1001"))]),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_binding_forwards_through_dispatcher() {
        let dispatcher = Arc::new(StatSV1::new(Arc::new(CountingStats::default())))
            .dispatcher()
            .unwrap();

        let reply: String = dispatcher
            .call_typed("StatSV1.ProcessEvent", event("cgrates.org"))
            .await
            .unwrap();
        assert_eq!(reply, OK);
        let _: String = dispatcher
            .call_typed("StatSV1.ProcessEvent", event("cgrates.org"))
            .await
            .unwrap();

        let queues: Vec<StatQueue> = dispatcher
            .call_typed("StatSV1.GetStatQueuesForEvent", event("cgrates.org"))
            .await
            .unwrap();
        assert_eq!(queues[0].items, 2);

        let metrics: HashMap<String, String> = dispatcher
            .call_typed(
                "StatSV1.GetQueueStringMetrics",
                TenantId::new("cgrates.org", "SQ_COUNT"),
            )
            .await
            .unwrap();
        assert_eq!(metrics["*count"], "2");
    }

    #[tokio::test]
    async fn test_service_errors_pass_through() {
        let dispatcher = Arc::new(StatSV1::new(Arc::new(CountingStats::default())))
            .dispatcher()
            .unwrap();

        let err = dispatcher
            .call_typed::<TenantId, HashMap<String, f64>>(
                "StatSV1.GetQueueFloatMetrics",
                TenantId::new("other.org", "SQ_COUNT"),
            )
            .await
            .unwrap_err();
        assert_eq!(err.service_error::<ApiError>(), Some(&ApiError::NotFound));
        assert_eq!(err.to_string(), "NOT_FOUND");
    }

    #[test]
    fn test_exported_methods() {
        let dispatcher = Arc::new(StatSV1::new(Arc::new(CountingStats::default())))
            .dispatcher()
            .unwrap();
        assert_eq!(
            dispatcher.methods(),
            vec![
                "GetQueueFloatMetrics",
                "GetQueueStringMetrics",
                "GetStatQueuesForEvent",
                "ProcessEvent"
            ]
        );
    }
}
