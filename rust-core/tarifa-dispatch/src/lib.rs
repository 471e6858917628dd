// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Tarifa Service Dispatch
//
// Internal services are exported by name so that every transport binding can
// reach them through one entry point instead of per-transport glue. A call
// names its target as `Service.Method` and carries untyped arguments and a
// reply slot; the dispatcher resolves the method, invokes it and reduces its
// outcome to a single error value.
//
// # Modules
//
// - [`dispatcher`] -- `Dispatcher`, its builder, and target parsing.
// - [`method`] -- The type-erased `Method` trait and the typed adapter.
// - [`connection`] -- `RpcConnection` and the multi-service `ServiceRouter`.
// - [`error`] -- The `DispatchError` enum.

pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod method;

pub use connection::{call_typed, RpcConnection, ServiceRouter};
pub use dispatcher::{normalize, split_service_method, Dispatcher, DispatcherBuilder};
pub use error::{BoxError, DispatchError};
pub use method::{Method, ReturnValue, TypedMethod};
