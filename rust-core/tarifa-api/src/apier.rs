// SPDX-License-Identifier: PMPL-1.0-or-later
//! Administrative operations over StatQueueProfiles.
//!
//! Exported as `ApierV1.GetStatQueueProfile`, `ApierV1.SetStatQueueProfile`
//! and `ApierV1.RemStatQueueProfile`.

use std::sync::Arc;

use tarifa_dispatch::{DispatchError, Dispatcher};
use tarifa_storage::{DataDb, StatQueueProfile, TenantId};
use tracing::debug;

use crate::error::{require_tenant_id, ApiError, OK};

pub struct ApierV1 {
    data_db: Arc<dyn DataDb>,
}

impl ApierV1 {
    pub const SERVICE: &'static str = "ApierV1";

    pub fn new(data_db: Arc<dyn DataDb>) -> Self {
        Self { data_db }
    }

    pub async fn get_stat_queue_profile(&self, arg: &TenantId) -> Result<StatQueueProfile, ApiError> {
        require_tenant_id(arg)?;
        let profile = self
            .data_db
            .get_stat_queue_profile(&arg.tenant, &arg.id, false)
            .await?;
        Ok(profile)
    }

    /// Create or replace a profile.
    pub async fn set_stat_queue_profile(&self, profile: StatQueueProfile) -> Result<String, ApiError> {
        require_tenant_id(&profile)?;
        self.data_db.set_stat_queue_profile(&profile).await?;
        debug!(tenant = %profile.tenant, id = %profile.id, "stat queue profile stored");
        Ok(OK.to_string())
    }

    pub async fn rem_stat_queue_profile(&self, arg: &TenantId) -> Result<String, ApiError> {
        require_tenant_id(arg)?;
        self.data_db
            .rem_stat_queue_profile(&arg.tenant, &arg.id)
            .await?;
        debug!(tenant = %arg.tenant, id = %arg.id, "stat queue profile removed");
        Ok(OK.to_string())
    }

    /// Export the operations under [`ApierV1::SERVICE`].
    pub fn dispatcher(self: Arc<Self>) -> Result<Dispatcher<ApierV1>, DispatchError> {
        Dispatcher::builder(Self::SERVICE, self)
            .register("GetStatQueueProfile", |api: Arc<ApierV1>, arg: TenantId| async move {
                api.get_stat_queue_profile(&arg).await
            })?
            .register(
                "SetStatQueueProfile",
                |api: Arc<ApierV1>, profile: StatQueueProfile| async move {
                    api.set_stat_queue_profile(profile).await
                },
            )?
            .register("RemStatQueueProfile", |api: Arc<ApierV1>, arg: TenantId| async move {
                api.rem_stat_queue_profile(&arg).await
            })?
            .build()
    }
}
