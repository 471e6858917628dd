// SPDX-License-Identifier: PMPL-1.0-or-later
//! Type-erased service operations.
//!
//! A [`Method`] takes its arguments and reply slot as `dyn Any` so handlers
//! of different shapes can live in one table. It reports its outcome as a
//! list of raw return values; the dispatcher enforces the single-value
//! contract on that list. [`TypedMethod`] wraps an
//! `async fn(Arc<S>, A) -> Result<R, E>` and always honours the contract.

use std::any::{type_name, Any};
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::{BoxError, DispatchError};

/// One raw return value: `None` is nil, anything else is boxed.
pub type ReturnValue = Option<Box<dyn Any + Send>>;

/// An operation callable on a service of type `S`.
pub trait Method<S: ?Sized>: Send + Sync {
    /// Run the operation with exactly the given `(args, reply)`.
    ///
    /// `Err` means the operation could not be invoked at all (wrong
    /// argument or reply type); `reply` is then left untouched.
    fn invoke<'a>(
        &'a self,
        service: Arc<S>,
        args: Box<dyn Any + Send>,
        reply: &'a mut (dyn Any + Send),
    ) -> BoxFuture<'a, Result<Vec<ReturnValue>, DispatchError>>;
}

/// Adapter from a typed async handler to [`Method`].
pub struct TypedMethod<F, A, R> {
    name: String,
    handler: F,
    _shape: PhantomData<fn(A) -> R>,
}

impl<F, A, R> TypedMethod<F, A, R> {
    pub fn new(name: impl Into<String>, handler: F) -> Self {
        Self {
            name: name.into(),
            handler,
            _shape: PhantomData,
        }
    }

    fn mismatch(&self, what: &str, expected: &str) -> DispatchError {
        DispatchError::Invocation {
            method: self.name.clone(),
            reason: format!("{what} must be {expected}"),
        }
    }
}

impl<S, F, Fut, A, R, E> Method<S> for TypedMethod<F, A, R>
where
    S: ?Sized + Send + Sync + 'static,
    F: Fn(Arc<S>, A) -> Fut + Send + Sync,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
    A: Send + 'static,
    R: Send + 'static,
    E: Into<BoxError> + 'static,
{
    fn invoke<'a>(
        &'a self,
        service: Arc<S>,
        args: Box<dyn Any + Send>,
        reply: &'a mut (dyn Any + Send),
    ) -> BoxFuture<'a, Result<Vec<ReturnValue>, DispatchError>> {
        Box::pin(async move {
            let args = args
                .downcast::<A>()
                .map_err(|_| self.mismatch("arguments", type_name::<A>()))?;
            let slot = reply
                .downcast_mut::<R>()
                .ok_or_else(|| self.mismatch("reply", type_name::<R>()))?;

            let ret: ReturnValue = match (self.handler)(service, *args).await {
                Ok(value) => {
                    *slot = value;
                    None
                }
                Err(err) => {
                    let err: BoxError = err.into();
                    Some(Box::new(err) as Box<dyn Any + Send>)
                }
            };
            Ok(vec![ret])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Doubler;

    fn double() -> TypedMethod<
        impl Fn(Arc<Doubler>, u32) -> futures::future::Ready<Result<u32, std::fmt::Error>>
            + Send
            + Sync,
        u32,
        u32,
    > {
        TypedMethod::new("Double", |_svc: Arc<Doubler>, n: u32| {
            futures::future::ready(Ok::<u32, std::fmt::Error>(n * 2))
        })
    }

    #[tokio::test]
    async fn test_typed_writes_reply() {
        let mut reply = 0u32;
        let ret = double()
            .invoke(Arc::new(Doubler), Box::new(21u32), &mut reply)
            .await
            .unwrap();
        assert_eq!(reply, 42);
        assert_eq!(ret.len(), 1);
        assert!(ret[0].is_none());
    }

    #[tokio::test]
    async fn test_wrong_args_leave_reply_untouched() {
        let mut reply = 7u32;
        let err = double()
            .invoke(Arc::new(Doubler), Box::new("21"), &mut reply)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Invocation { .. }));
        assert_eq!(reply, 7);
    }

    #[tokio::test]
    async fn test_wrong_reply_type() {
        let mut reply = String::from("untouched");
        let err = double()
            .invoke(Arc::new(Doubler), Box::new(21u32), &mut reply)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("reply must be u32"));
        assert_eq!(reply, "untouched");
    }

    #[tokio::test]
    async fn test_error_becomes_single_boxed_value() {
        let failing: TypedMethod<_, u32, u32> = TypedMethod::new("Fail", |_svc: Arc<Doubler>, _n: u32| {
            futures::future::ready(Err::<u32, _>(std::fmt::Error))
        });
        let mut reply = 0u32;
        let ret = failing
            .invoke(Arc::new(Doubler), Box::new(1u32), &mut reply)
            .await
            .unwrap();
        assert_eq!(ret.len(), 1);
        let value = ret.into_iter().next().flatten().unwrap();
        assert!(value.downcast::<BoxError>().is_ok());
    }
}
