// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Transport-facing entry point.
//
// Every transport binding talks to services through `RpcConnection`. A single
// `Dispatcher` is a connection for its own service; `ServiceRouter` fans one
// connection out to several services by their qualifier.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::dispatcher::{split_service_method, Dispatcher};
use crate::error::DispatchError;

/// Something that can serve `Service.Method` calls.
#[async_trait]
pub trait RpcConnection: Send + Sync {
    async fn call(
        &self,
        service_method: &str,
        args: Box<dyn Any + Send>,
        reply: &mut (dyn Any + Send),
    ) -> Result<(), DispatchError>;
}

#[async_trait]
impl<S> RpcConnection for Dispatcher<S>
where
    S: ?Sized + Send + Sync + 'static,
{
    async fn call(
        &self,
        service_method: &str,
        args: Box<dyn Any + Send>,
        reply: &mut (dyn Any + Send),
    ) -> Result<(), DispatchError> {
        self.dispatch(service_method, args, reply).await
    }
}

/// Call through any connection with a default-initialized reply slot.
pub async fn call_typed<A, R>(
    conn: &dyn RpcConnection,
    service_method: &str,
    args: A,
) -> Result<R, DispatchError>
where
    A: Send + 'static,
    R: Default + Send + 'static,
{
    let mut reply = R::default();
    conn.call(service_method, Box::new(args), &mut reply).await?;
    Ok(reply)
}

/// Routes calls to the connection registered for their service qualifier.
#[derive(Default)]
pub struct ServiceRouter {
    services: HashMap<String, Arc<dyn RpcConnection>>,
}

impl ServiceRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route `service` to `conn`. A service can be routed once.
    pub fn route(
        &mut self,
        service: impl Into<String>,
        conn: Arc<dyn RpcConnection>,
    ) -> Result<(), DispatchError> {
        let service = service.into();
        if service.is_empty() || service.contains('.') {
            return Err(DispatchError::InvalidRegistration(format!(
                "service name '{service}' cannot be routed"
            )));
        }
        if self.services.contains_key(&service) {
            return Err(DispatchError::InvalidRegistration(format!(
                "service '{service}' is already routed"
            )));
        }
        self.services.insert(service, conn);
        Ok(())
    }

    /// Route a dispatcher under its own service name.
    pub fn mount<S>(&mut self, dispatcher: Dispatcher<S>) -> Result<(), DispatchError>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        let service = dispatcher.service_name().to_string();
        self.route(service, Arc::new(dispatcher))
    }

    /// Routed service names, sorted.
    pub fn services(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.services.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[async_trait]
impl RpcConnection for ServiceRouter {
    async fn call(
        &self,
        service_method: &str,
        args: Box<dyn Any + Send>,
        reply: &mut (dyn Any + Send),
    ) -> Result<(), DispatchError> {
        let conn = split_service_method(service_method)
            .and_then(|(service, _)| self.services.get(service))
            .ok_or_else(|| {
                warn!(target_method = %service_method, "no service routed");
                DispatchError::unsupported(service_method)
            })?;
        conn.call(service_method, args, reply).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    fn echo(name: &str) -> Dispatcher<Echo> {
        let tag = name.to_string();
        Dispatcher::builder(name, Arc::new(Echo))
            .register("Ping", move |_svc: Arc<Echo>, msg: String| {
                let tag = tag.clone();
                async move { Ok::<_, std::fmt::Error>(format!("{tag}:{msg}")) }
            })
            .unwrap()
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_router_selects_by_qualifier() {
        let mut router = ServiceRouter::new();
        router.mount(echo("EchoV1")).unwrap();
        router.mount(echo("EchoV2")).unwrap();
        assert_eq!(router.services(), vec!["EchoV1", "EchoV2"]);

        let reply: String = call_typed(&router, "EchoV2.Ping", "hi".to_string())
            .await
            .unwrap();
        assert_eq!(reply, "EchoV2:hi");
    }

    #[tokio::test]
    async fn test_router_rejects_unknown_service() {
        let mut router = ServiceRouter::new();
        router.mount(echo("EchoV1")).unwrap();

        let err = call_typed::<String, String>(&router, "EchoV3.Ping", "hi".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::UnsupportedMethod { .. }));

        let err = call_typed::<String, String>(&router, "Ping", "hi".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::UnsupportedMethod { .. }));
    }

    #[test]
    fn test_service_routed_once() {
        let mut router = ServiceRouter::new();
        router.mount(echo("EchoV1")).unwrap();
        assert!(matches!(
            router.mount(echo("EchoV1")),
            Err(DispatchError::InvalidRegistration(_))
        ));
    }

    #[tokio::test]
    async fn test_dispatcher_is_a_connection() {
        let conn: Arc<dyn RpcConnection> = Arc::new(echo("EchoV1"));
        let reply: String = call_typed(conn.as_ref(), "EchoV1.Ping", "x".to_string())
            .await
            .unwrap();
        assert_eq!(reply, "EchoV1:x");
    }
}
