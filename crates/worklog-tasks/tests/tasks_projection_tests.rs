//! End-to-end tests: task commands into the `tasks` projection, which reads
//! the `goals` projection.

use std::path::Path;
use std::sync::Arc;

use worklog_bus::EventBus;
use worklog_event_store::fs_event_store::FsEventStore;
use worklog_goals::GoalsModule;
use worklog_goals::application::command_handlers::handle_add_goal;
use worklog_goals::domain::commands::AddGoal;
use worklog_projection_store::{Migrator, ProjectionDb, ProjectionModule};
use worklog_tasks::TasksModule;
use worklog_tasks::application::command_handlers::{handle_add_task, handle_complete_task};
use worklog_tasks::application::query_handlers::list_tasks;
use worklog_tasks::domain::commands::{AddTask, CompleteTask};
use worklog_test_support::{SteppingClock, base_time};

async fn setup(dir: &Path) -> (FsEventStore, ProjectionDb, EventBus) {
    let store = FsEventStore::new(dir.join("events"));
    let db = ProjectionDb::open(dir.join("projections.db")).await.unwrap();
    let migrations = Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/../../migrations"));
    Migrator::new(migrations, Arc::new(SteppingClock::new(base_time())))
        .run(db.pool())
        .await
        .unwrap();
    let mut bus = EventBus::parallel();
    GoalsModule.register(db.pool(), &mut bus);
    TasksModule.register(db.pool(), &mut bus);
    (store, db, bus)
}

fn add_goal(goal_id: &str, title: &str) -> AddGoal {
    AddGoal {
        goal_id: goal_id.to_owned(),
        title: title.to_owned(),
        description: String::new(),
        priority: "medium".to_owned(),
        logged_by: None,
    }
}

fn add_task(task_id: &str, goal_id: &str, title: &str) -> AddTask {
    AddTask {
        task_id: task_id.to_owned(),
        goal_id: goal_id.to_owned(),
        title: title.to_owned(),
        logged_by: None,
    }
}

#[tokio::test]
async fn test_task_row_carries_goal_title_from_goals_projection() {
    // Arrange
    let dir = tempfile::tempdir().unwrap();
    let (store, db, bus) = setup(dir.path()).await;
    let clock = SteppingClock::new(base_time());
    handle_add_goal(&add_goal("goal-1", "Ship v1"), &clock, &store, &bus)
        .await
        .unwrap();

    // Act
    handle_add_task(&add_task("task-1", "goal-1", "Write docs"), &clock, &store, &bus)
        .await
        .unwrap();

    // Assert
    let tasks = list_tasks(db.pool(), None).await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].goal_title.as_deref(), Some("Ship v1"));
    assert_eq!(tasks[0].title, "Write docs");
    assert!(!tasks[0].done);
}

#[tokio::test]
async fn test_complete_task_marks_row_done() {
    let dir = tempfile::tempdir().unwrap();
    let (store, db, bus) = setup(dir.path()).await;
    let clock = SteppingClock::new(base_time());
    handle_add_goal(&add_goal("goal-1", "Ship v1"), &clock, &store, &bus)
        .await
        .unwrap();
    handle_add_task(&add_task("task-1", "goal-1", "Write docs"), &clock, &store, &bus)
        .await
        .unwrap();

    let command = CompleteTask {
        task_id: "task-1".to_owned(),
        logged_by: None,
    };
    handle_complete_task(&command, &clock, &store, &bus)
        .await
        .unwrap();

    let tasks = list_tasks(db.pool(), Some("goal-1")).await.unwrap();
    assert!(tasks[0].done);
    assert_eq!(tasks[0].version, 2);
}

#[tokio::test]
async fn test_list_tasks_filters_by_goal() {
    // Arrange
    let dir = tempfile::tempdir().unwrap();
    let (store, db, bus) = setup(dir.path()).await;
    let clock = SteppingClock::new(base_time());
    for (goal_id, title) in [("goal-1", "Ship v1"), ("goal-2", "Hire")] {
        handle_add_goal(&add_goal(goal_id, title), &clock, &store, &bus)
            .await
            .unwrap();
    }
    for (task_id, goal_id) in [("task-1", "goal-1"), ("task-2", "goal-2"), ("task-3", "goal-1")] {
        handle_add_task(&add_task(task_id, goal_id, "Do it"), &clock, &store, &bus)
            .await
            .unwrap();
    }

    // Act
    let for_goal_one = list_tasks(db.pool(), Some("goal-1")).await.unwrap();
    let all = list_tasks(db.pool(), None).await.unwrap();

    // Assert
    let ids: Vec<&str> = for_goal_one.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["task-1", "task-3"]);
    assert_eq!(all.len(), 3);
}
