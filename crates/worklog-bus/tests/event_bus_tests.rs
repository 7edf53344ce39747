//! Integration tests for `EventBus` dispatch policies.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Barrier;
use worklog_bus::{DispatchPolicy, EventBus};
use worklog_core::event::EventRecord;
use worklog_core::handler::{HandlerError, ProjectionHandler, WILDCARD};
use worklog_test_support::{
    FailingHandler, HandlerLog, PanickingHandler, RecordingHandler, make_record,
};

/// Waits on a shared barrier, so it can only finish if another handler is
/// running at the same time.
struct RendezvousHandler {
    name: &'static str,
    barrier: Arc<Barrier>,
    log: HandlerLog,
}

#[async_trait]
impl ProjectionHandler for RendezvousHandler {
    fn name(&self) -> &str {
        self.name
    }

    async fn handle(&self, event: &EventRecord) -> Result<(), HandlerError> {
        self.barrier.wait().await;
        RecordingHandler::new(self.name, self.log.clone())
            .handle(event)
            .await
    }
}

fn rendezvous_bus(policy: DispatchPolicy, log: &HandlerLog) -> EventBus {
    let barrier = Arc::new(Barrier::new(2));
    let mut bus = EventBus::new(policy);
    for name in ["left", "right"] {
        bus.subscribe(
            "GoalAdded",
            Arc::new(RendezvousHandler {
                name,
                barrier: Arc::clone(&barrier),
                log: log.clone(),
            }),
        );
    }
    bus
}

#[tokio::test]
async fn test_parallel_policy_runs_handlers_concurrently() {
    // Arrange
    let log = HandlerLog::new();
    let bus = rendezvous_bus(DispatchPolicy::Parallel, &log);

    // Act
    let report = tokio::time::timeout(
        Duration::from_secs(5),
        bus.publish(&make_record("goal-1", 1, "GoalAdded", 0)),
    )
    .await
    .expect("parallel handlers should meet at the barrier");

    // Assert
    assert_eq!(report.delivered, 2);
    assert_eq!(log.entries().len(), 2);
}

#[tokio::test]
async fn test_sequential_policy_never_overlaps_handlers() {
    // Each handler waits for a partner that can only start after it returns.
    let log = HandlerLog::new();
    let bus = rendezvous_bus(DispatchPolicy::Sequential, &log);

    let outcome = tokio::time::timeout(
        Duration::from_millis(200),
        bus.publish(&make_record("goal-1", 1, "GoalAdded", 0)),
    )
    .await;

    assert!(outcome.is_err());
    assert!(log.entries().is_empty());
}

#[tokio::test]
async fn test_sequential_policy_preserves_subscription_order() {
    // Arrange
    let log = HandlerLog::new();
    let mut bus = EventBus::sequential();
    bus.subscribe(
        "GoalAdded",
        Arc::new(RecordingHandler::delayed("slow", log.clone(), Duration::from_millis(30))),
    );
    bus.subscribe("GoalAdded", Arc::new(RecordingHandler::new("fast", log.clone())));
    bus.subscribe(
        WILDCARD,
        Arc::new(RecordingHandler::delayed("audit", log.clone(), Duration::from_millis(10))),
    );

    // Act
    for (version, event_type) in [(1, "GoalAdded"), (2, "GoalStarted")] {
        bus.publish(&make_record("goal-1", version, event_type, version))
            .await;
    }

    // Assert
    assert_eq!(
        log.entries(),
        vec![
            "slow:GoalAdded:goal-1:1",
            "fast:GoalAdded:goal-1:1",
            "audit:GoalAdded:goal-1:1",
            "audit:GoalStarted:goal-1:2",
        ]
    );
}

#[tokio::test]
async fn test_parallel_policy_isolates_failing_and_panicking_handlers() {
    // Arrange
    let log = HandlerLog::new();
    let mut bus = EventBus::parallel();
    bus.subscribe("GoalAdded", Arc::new(FailingHandler("broken")));
    bus.subscribe("GoalAdded", Arc::new(PanickingHandler("explosive")));
    bus.subscribe("GoalAdded", Arc::new(RecordingHandler::new("goals", log.clone())));

    // Act
    let report = bus.publish(&make_record("goal-1", 1, "GoalAdded", 0)).await;

    // Assert
    assert_eq!(report.delivered, 1);
    assert_eq!(report.failed, vec!["broken", "explosive"]);
    assert_eq!(log.entries(), vec!["goals:GoalAdded:goal-1:1"]);
}

#[tokio::test]
async fn test_sequential_policy_continues_after_failures() {
    // Arrange
    let log = HandlerLog::new();
    let mut bus = EventBus::sequential();
    bus.subscribe(WILDCARD, Arc::new(PanickingHandler("explosive")));
    bus.subscribe("GoalAdded", Arc::new(FailingHandler("broken")));
    bus.subscribe(WILDCARD, Arc::new(RecordingHandler::new("audit", log.clone())));

    // Act
    let first = bus.publish(&make_record("goal-1", 1, "GoalAdded", 0)).await;
    let second = bus.publish(&make_record("goal-1", 2, "GoalStarted", 1)).await;

    // Assert
    assert_eq!(first.failed, vec!["broken", "explosive"]);
    assert_eq!(first.delivered, 1);
    assert_eq!(second.failed, vec!["explosive"]);
    assert_eq!(
        log.entries(),
        vec!["audit:GoalAdded:goal-1:1", "audit:GoalStarted:goal-1:2"]
    );
}

#[tokio::test]
async fn test_wildcard_handler_receives_every_event_type() {
    let log = HandlerLog::new();
    let mut bus = EventBus::parallel();
    bus.subscribe(WILDCARD, Arc::new(RecordingHandler::new("audit", log.clone())));

    bus.publish(&make_record("goal-1", 1, "GoalAdded", 0)).await;
    bus.publish(&make_record("task-1", 1, "TaskAdded", 1)).await;

    assert_eq!(
        log.entries(),
        vec!["audit:GoalAdded:goal-1:1", "audit:TaskAdded:task-1:1"]
    );
}
