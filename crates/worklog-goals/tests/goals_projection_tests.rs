//! End-to-end tests: goal commands through the file store into the `goals`
//! projection.

use std::path::Path;
use std::sync::Arc;

use worklog_bus::EventBus;
use worklog_core::error::DomainError;
use worklog_core::store::EventStore;
use worklog_event_store::fs_event_store::FsEventStore;
use worklog_goals::GoalsModule;
use worklog_goals::application::command_handlers::{
    handle_add_goal, handle_block_goal, handle_complete_goal, handle_start_goal,
};
use worklog_goals::application::query_handlers::{get_goal, list_goals};
use worklog_goals::domain::aggregates::GoalStatus;
use worklog_goals::domain::commands::{AddGoal, BlockGoal, CompleteGoal, StartGoal};
use worklog_projection_store::{Migrator, ProjectionDb, ProjectionModule};
use worklog_test_support::{SteppingClock, base_time};

struct Harness {
    _dir: tempfile::TempDir,
    store: FsEventStore,
    db: ProjectionDb,
    bus: EventBus,
    clock: SteppingClock,
}

impl Harness {
    async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = FsEventStore::new(dir.path().join("events"));
        let db = ProjectionDb::open(dir.path().join("projections.db"))
            .await
            .unwrap();
        let migrations = Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/../../migrations"));
        Migrator::new(migrations, Arc::new(SteppingClock::new(base_time())))
            .run(db.pool())
            .await
            .unwrap();
        let mut bus = EventBus::parallel();
        GoalsModule.register(db.pool(), &mut bus);
        Self {
            _dir: dir,
            store,
            db,
            bus,
            clock: SteppingClock::new(base_time()),
        }
    }

    async fn add(&self, goal_id: &str, title: &str, priority: &str) {
        let command = AddGoal {
            goal_id: goal_id.to_owned(),
            title: title.to_owned(),
            description: format!("{title} description"),
            priority: priority.to_owned(),
            logged_by: None,
        };
        handle_add_goal(&command, &self.clock, &self.store, &self.bus)
            .await
            .unwrap();
    }

    async fn start(&self, goal_id: &str) {
        let command = StartGoal {
            goal_id: goal_id.to_owned(),
            logged_by: None,
        };
        handle_start_goal(&command, &self.clock, &self.store, &self.bus)
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_goal_lifecycle_is_stored_in_order_and_projected() {
    // Arrange
    let h = Harness::new().await;

    // Act
    h.add("goal-1", "Ship v1", "high").await;
    h.start("goal-1").await;
    let command = CompleteGoal {
        goal_id: "goal-1".to_owned(),
        logged_by: None,
    };
    handle_complete_goal(&command, &h.clock, &h.store, &h.bus)
        .await
        .unwrap();

    // Assert
    let stream = h.store.read_stream("goal-1").await.unwrap();
    let summary: Vec<(&str, i64)> = stream
        .iter()
        .map(|e| (e.event_type.as_str(), e.version))
        .collect();
    assert_eq!(
        summary,
        vec![("GoalAdded", 1), ("GoalStarted", 2), ("GoalCompleted", 3)]
    );

    let view = get_goal(h.db.pool(), "goal-1").await.unwrap();
    assert_eq!(view.status, "completed");
    assert_eq!(view.version, 3);
    assert_eq!(view.title, "Ship v1");
    assert_eq!(view.created_at, stream[0].timestamp.to_rfc3339());
    assert_eq!(view.updated_at, stream[2].timestamp.to_rfc3339());
}

#[tokio::test]
async fn test_block_sets_reason_in_projection() {
    let h = Harness::new().await;
    h.add("goal-1", "Ship v1", "medium").await;

    let command = BlockGoal {
        goal_id: "goal-1".to_owned(),
        reason: "waiting on review".to_owned(),
        logged_by: None,
    };
    handle_block_goal(&command, &h.clock, &h.store, &h.bus)
        .await
        .unwrap();

    let view = get_goal(h.db.pool(), "goal-1").await.unwrap();
    assert_eq!(view.status, "blocked");
    assert_eq!(view.blocked_reason.as_deref(), Some("waiting on review"));
}

#[tokio::test]
async fn test_list_goals_filters_by_status_in_creation_order() {
    // Arrange
    let h = Harness::new().await;
    h.add("goal-a", "First", "low").await;
    h.add("goal-b", "Second", "high").await;
    h.add("goal-c", "Third", "medium").await;
    h.start("goal-b").await;

    // Act
    let all = list_goals(h.db.pool(), None).await.unwrap();
    let pending = list_goals(h.db.pool(), Some(GoalStatus::Pending)).await.unwrap();
    let in_progress = list_goals(h.db.pool(), Some(GoalStatus::InProgress))
        .await
        .unwrap();

    // Assert
    let ids = |views: &[worklog_goals::application::query_handlers::GoalView]| {
        views.iter().map(|v| v.id.clone()).collect::<Vec<_>>()
    };
    assert_eq!(ids(&all), vec!["goal-a", "goal-b", "goal-c"]);
    assert_eq!(ids(&pending), vec!["goal-a", "goal-c"]);
    assert_eq!(ids(&in_progress), vec!["goal-b"]);
}

#[tokio::test]
async fn test_get_goal_returns_not_found_for_unknown_id() {
    let h = Harness::new().await;

    let result = get_goal(h.db.pool(), "goal-404").await;

    assert!(matches!(result, Err(DomainError::AggregateNotFound(id)) if id == "goal-404"));
}

#[tokio::test]
async fn test_rejected_command_leaves_store_and_projection_untouched() {
    // Arrange
    let h = Harness::new().await;
    h.add("goal-1", "Ship v1", "high").await;
    let command = CompleteGoal {
        goal_id: "goal-1".to_owned(),
        logged_by: None,
    };

    // Act
    let result = handle_complete_goal(&command, &h.clock, &h.store, &h.bus).await;

    // Assert
    assert!(matches!(result, Err(DomainError::Precondition(_))));
    assert_eq!(h.store.read_stream("goal-1").await.unwrap().len(), 1);
    assert_eq!(get_goal(h.db.pool(), "goal-1").await.unwrap().version, 1);
}
