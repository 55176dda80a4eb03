//! Worker runtime for offcache.
//!
//! This crate wires the cache store and the fetch pipeline into the
//! event-driven worker: lifecycle management (install, activate,
//! garbage collection), strategy routing and execution for intercepted
//! requests, deferred-sync dispatch, the control channel, and the
//! push/notification adapter.
//!
//! Execution is single-owner and event-driven: one event handler runs to
//! completion before the next, except for work explicitly detached onto
//! the [`tasks::TaskQueue`].

pub mod clients;
pub mod control;
pub mod lifecycle;
pub mod push;
pub mod request;
pub mod response;
pub mod router;
pub mod strategies;
pub mod sync;
pub mod tasks;
pub mod worker;

#[cfg(test)]
pub(crate) mod testutil;

pub use clients::ClientRegistry;
pub use control::{ControlMessage, ControlReply, MessageEvent};
pub use lifecycle::{LifecycleManager, WorkerState};
pub use push::{LogSink, Notification, NotificationAction, NotificationSink, PushAdapter, PushPayload};
pub use request::{RequestMode, WorkerRequest};
pub use response::{ResponseSource, WorkerResponse};
pub use router::{RequestClass, RouteDecision, Router, Strategy};
pub use strategies::StrategyExecutor;
pub use sync::SyncCoordinator;
pub use tasks::TaskQueue;
pub use worker::{FetchOutcome, Worker};
