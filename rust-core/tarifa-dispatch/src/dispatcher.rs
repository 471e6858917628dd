// SPDX-License-Identifier: PMPL-1.0-or-later
//! `Service.Method` dispatcher over one service object.
//!
//! The method table is fixed once [`DispatcherBuilder::build`] returns; a
//! [`Dispatcher`] only holds an `Arc` to its service and that table, so it
//! can be shared across tasks freely.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tarifa_dispatch::Dispatcher;
//!
//! struct Greeter;
//!
//! # futures::executor::block_on(async {
//! let dispatcher = Dispatcher::builder("GreeterV1", Arc::new(Greeter))
//!     .register("Hello", |_svc: Arc<Greeter>, name: String| async move {
//!         Ok::<_, std::fmt::Error>(format!("hello {name}"))
//!     })
//!     .unwrap()
//!     .build()
//!     .unwrap();
//!
//! let reply: String = dispatcher
//!     .call_typed("GreeterV1.Hello", "tarifa".to_string())
//!     .await
//!     .unwrap();
//! assert_eq!(reply, "hello tarifa");
//! # });
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{BoxError, DispatchError};
use crate::method::{Method, ReturnValue, TypedMethod};

/// Split `Service.Method` into its two parts. Anything but exactly two
/// non-empty parts is `None`.
pub fn split_service_method(service_method: &str) -> Option<(&str, &str)> {
    let mut parts = service_method.split('.');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(service), Some(method), None) if !service.is_empty() && !method.is_empty() => {
            Some((service, method))
        }
        _ => None,
    }
}

/// Reduce an operation's raw return values to the call's outcome.
///
/// Exactly one value is expected: nil is success, a [`BoxError`] is the
/// operation's failure. Any other shape is [`DispatchError::ServerError`].
pub fn normalize(returned: Vec<ReturnValue>) -> Result<(), DispatchError> {
    let mut returned = returned.into_iter();
    match (returned.next(), returned.next()) {
        (Some(None), None) => Ok(()),
        (Some(Some(value)), None) => match value.downcast::<BoxError>() {
            Ok(err) => Err(DispatchError::Service(*err)),
            Err(_) => Err(DispatchError::ServerError),
        },
        _ => Err(DispatchError::ServerError),
    }
}

fn validate_name(kind: &str, name: &str) -> Result<(), DispatchError> {
    if name.is_empty() || name.contains('.') || name.chars().any(char::is_whitespace) {
        return Err(DispatchError::InvalidRegistration(format!(
            "{kind} name '{name}' must be a non-empty identifier without '.'"
        )));
    }
    Ok(())
}

/// Collects the methods of a service before the table is frozen.
pub struct DispatcherBuilder<S: ?Sized> {
    service_name: String,
    service: Arc<S>,
    methods: HashMap<String, Box<dyn Method<S>>>,
}

impl<S> DispatcherBuilder<S>
where
    S: ?Sized + Send + Sync + 'static,
{
    /// Register a typed operation under `name`.
    pub fn register<F, Fut, A, R, E>(self, name: &str, handler: F) -> Result<Self, DispatchError>
    where
        F: Fn(Arc<S>, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        A: Send + 'static,
        R: Send + 'static,
        E: Into<BoxError> + 'static,
    {
        self.register_erased(name, TypedMethod::<F, A, R>::new(name, handler))
    }

    /// Register an operation that reports raw return values. Its output is
    /// checked against the single-value contract on every call.
    pub fn register_erased<M>(mut self, name: &str, method: M) -> Result<Self, DispatchError>
    where
        M: Method<S> + 'static,
    {
        validate_name("method", name)?;
        if self.methods.contains_key(name) {
            return Err(DispatchError::DuplicateMethod(name.to_string()));
        }
        self.methods.insert(name.to_string(), Box::new(method));
        Ok(self)
    }

    pub fn build(self) -> Result<Dispatcher<S>, DispatchError> {
        validate_name("service", &self.service_name)?;
        debug!(
            service = %self.service_name,
            methods = self.methods.len(),
            "dispatcher ready"
        );
        Ok(Dispatcher {
            service_name: self.service_name,
            service: self.service,
            methods: self.methods,
        })
    }
}

/// Resolves `Service.Method` targets against one service's method table.
pub struct Dispatcher<S: ?Sized> {
    service_name: String,
    service: Arc<S>,
    methods: HashMap<String, Box<dyn Method<S>>>,
}

impl<S> Dispatcher<S>
where
    S: ?Sized + Send + Sync + 'static,
{
    pub fn builder(service_name: impl Into<String>, service: Arc<S>) -> DispatcherBuilder<S> {
        DispatcherBuilder {
            service_name: service_name.into(),
            service,
            methods: HashMap::new(),
        }
    }

    /// Name the service is exported under.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn service(&self) -> &Arc<S> {
        &self.service
    }

    /// Registered method names, sorted.
    pub fn methods(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Invoke the method named by `service_method` with `(args, reply)`.
    ///
    /// The service qualifier is only logged; routing by service happens one
    /// level up, in [`crate::ServiceRouter`].
    pub async fn dispatch(
        &self,
        service_method: &str,
        args: Box<dyn Any + Send>,
        reply: &mut (dyn Any + Send),
    ) -> Result<(), DispatchError> {
        let Some((qualifier, method_name)) = split_service_method(service_method) else {
            warn!(target_method = %service_method, "malformed service method");
            return Err(DispatchError::unsupported(service_method));
        };
        let Some(method) = self.methods.get(method_name) else {
            warn!(
                service = %self.service_name,
                qualifier = %qualifier,
                method = %method_name,
                "unknown method"
            );
            return Err(DispatchError::unsupported(service_method));
        };

        debug!(service = %qualifier, method = %method_name, "dispatching");
        let returned = method.invoke(self.service.clone(), args, reply).await?;
        normalize(returned)
    }

    /// Dispatch with a fresh `R::default()` reply slot and return it.
    pub async fn call_typed<A, R>(&self, service_method: &str, args: A) -> Result<R, DispatchError>
    where
        A: Send + 'static,
        R: Default + Send + 'static,
    {
        let mut reply = R::default();
        self.dispatch(service_method, Box::new(args), &mut reply)
            .await?;
        Ok(reply)
    }
}

impl<S: ?Sized> fmt::Debug for Dispatcher<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<&String> = self.methods.keys().collect();
        methods.sort_unstable();
        f.debug_struct("Dispatcher")
            .field("service_name", &self.service_name)
            .field("methods", &methods)
            .finish()
    }
}
