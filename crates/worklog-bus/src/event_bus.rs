//! Publish/subscribe dispatcher.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::join_all;
use tracing::{debug, error};

use worklog_core::event::EventRecord;
use worklog_core::handler::{ProjectionHandler, WILDCARD};

/// How matching handlers are driven for one published event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DispatchPolicy {
    /// All matching handlers run concurrently.
    #[default]
    Parallel,
    /// Matching handlers run one at a time in subscription order.
    Sequential,
}

/// Outcome of publishing one event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Handlers that completed successfully.
    pub delivered: usize,
    /// Names of handlers that returned an error or panicked.
    pub failed: Vec<String>,
}

impl DispatchReport {
    /// Returns true if every matching handler succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Routes event records to subscribed projection handlers.
#[derive(Default)]
pub struct EventBus {
    policy: DispatchPolicy,
    subscriptions: HashMap<String, Vec<Arc<dyn ProjectionHandler>>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut topics: Vec<(&str, usize)> = self
            .subscriptions
            .iter()
            .map(|(k, v)| (k.as_str(), v.len()))
            .collect();
        topics.sort_unstable();
        f.debug_struct("EventBus")
            .field("policy", &self.policy)
            .field("subscriptions", &topics)
            .finish()
    }
}

impl EventBus {
    /// Creates an empty bus with the given policy.
    #[must_use]
    pub fn new(policy: DispatchPolicy) -> Self {
        Self {
            policy,
            subscriptions: HashMap::new(),
        }
    }

    /// Creates an empty bus for live command execution.
    #[must_use]
    pub fn parallel() -> Self {
        Self::new(DispatchPolicy::Parallel)
    }

    /// Creates an empty bus for rebuild replay.
    #[must_use]
    pub fn sequential() -> Self {
        Self::new(DispatchPolicy::Sequential)
    }

    /// Returns the dispatch policy.
    #[must_use]
    pub fn policy(&self) -> DispatchPolicy {
        self.policy
    }

    /// Subscribes `handler` to `event_type`, or to every event when
    /// `event_type` is [`WILDCARD`].
    pub fn subscribe(&mut self, event_type: impl Into<String>, handler: Arc<dyn ProjectionHandler>) {
        let event_type = event_type.into();
        debug!(event_type = %event_type, handler = handler.name(), "subscribed handler");
        self.subscriptions
            .entry(event_type)
            .or_default()
            .push(handler);
    }

    /// Resolves the handlers for `event_type`: type-specific subscribers
    /// first, then wildcard subscribers, each in subscription order. A
    /// handler subscribed more than once appears once.
    #[must_use]
    pub fn handlers_for(&self, event_type: &str) -> Vec<Arc<dyn ProjectionHandler>> {
        let specific = self.subscriptions.get(event_type).into_iter().flatten();
        let wildcard = if event_type == WILDCARD {
            None
        } else {
            self.subscriptions.get(WILDCARD)
        };

        let mut resolved: Vec<Arc<dyn ProjectionHandler>> = Vec::new();
        for handler in specific.chain(wildcard.into_iter().flatten()) {
            if !resolved.iter().any(|h| Arc::ptr_eq(h, handler)) {
                resolved.push(Arc::clone(handler));
            }
        }
        resolved
    }

    /// Publishes `event` to every matching handler.
    ///
    /// Handler failures, including panics, are logged and counted in the
    /// returned report. They never stop dispatch to other handlers.
    pub async fn publish(&self, event: &EventRecord) -> DispatchReport {
        let handlers = self.handlers_for(&event.event_type);
        let outcomes: Vec<Result<(), String>> = match self.policy {
            DispatchPolicy::Parallel => {
                join_all(handlers.iter().map(|h| invoke(h.as_ref(), event))).await
            }
            DispatchPolicy::Sequential => {
                let mut outcomes = Vec::with_capacity(handlers.len());
                for handler in &handlers {
                    outcomes.push(invoke(handler.as_ref(), event).await);
                }
                outcomes
            }
        };

        let mut report = DispatchReport::default();
        for (handler, outcome) in handlers.iter().zip(outcomes) {
            match outcome {
                Ok(()) => report.delivered += 1,
                Err(_) => report.failed.push(handler.name().to_owned()),
            }
        }
        debug!(
            event_type = %event.event_type,
            stream_id = %event.stream_id,
            version = event.version,
            delivered = report.delivered,
            failed = report.failed.len(),
            "published event"
        );
        report
    }
}

async fn invoke(handler: &dyn ProjectionHandler, event: &EventRecord) -> Result<(), String> {
    let message = match AssertUnwindSafe(handler.handle(event)).catch_unwind().await {
        Ok(Ok(())) => return Ok(()),
        Ok(Err(e)) => e.to_string(),
        Err(panic) => format!("handler panicked: {}", panic_message(panic.as_ref())),
    };
    error!(
        handler = handler.name(),
        event_type = %event.event_type,
        stream_id = %event.stream_id,
        version = event.version,
        error = %message,
        "projection handler failed"
    );
    Err(message)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}
