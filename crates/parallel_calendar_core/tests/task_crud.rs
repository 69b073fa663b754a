use chrono::{DateTime, Duration, TimeZone, Utc};
use parallel_calendar_core::db::open_db_in_memory;
use parallel_calendar_core::{
    Allocation, EntityKind, RepoError, SqliteTaskRepository, SqliteTimeSlotRepository,
    SqliteUserRepository, Task, TaskListQuery, TaskRepository, TimeSlot, TimeSlotRepository, User,
    UserRepository, ValidationError,
};
use rusqlite::Connection;

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap()
}

fn seed_user(conn: &Connection, name: &str) -> User {
    let repo = SqliteUserRepository::try_new(conn).unwrap();
    let user = User::new(name, format!("{}@example.com", name.to_lowercase()), None, Utc::now());
    repo.create_user(&user).unwrap()
}

#[test]
fn create_and_get_roundtrip_keeps_absent_and_empty_description_apart() {
    let conn = open_db_in_memory().unwrap();
    let owner = seed_user(&conn, "Aiko");
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();

    let without = Task::new(owner.user_id, "write report", None, base_time());
    let empty = Task::new(owner.user_id, "review", Some(String::new()), base_time());
    repo.create_task(&without).unwrap();
    repo.create_task(&empty).unwrap();

    assert_eq!(repo.get_task(without.task_id).unwrap(), without);
    let loaded = repo.get_task(empty.task_id).unwrap();
    assert_eq!(loaded.description.as_deref(), Some(""));
    assert_eq!(loaded, empty);
}

#[test]
fn empty_title_is_rejected_before_persistence() {
    let conn = open_db_in_memory().unwrap();
    let owner = seed_user(&conn, "Aiko");
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();

    let task = Task::new(owner.user_id, "", None, base_time());
    let err = repo.create_task(&task).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::TitleRequired)
    ));
    assert!(repo
        .list_tasks(&TaskListQuery::for_user(owner.user_id))
        .unwrap()
        .is_empty());

    let task = Task::new(owner.user_id, "x", None, base_time());
    assert!(repo.create_task(&task).is_ok());
}

#[test]
fn list_is_scoped_ordered_and_paginated() {
    let conn = open_db_in_memory().unwrap();
    let owner = seed_user(&conn, "Aiko");
    let stranger = seed_user(&conn, "Bo");
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();

    let mut created = Vec::new();
    for index in (0..4).rev() {
        let task = Task::new(
            owner.user_id,
            format!("task {index}"),
            None,
            base_time() + Duration::minutes(index),
        );
        repo.create_task(&task).unwrap();
        created.push(task);
    }
    repo.create_task(&Task::new(stranger.user_id, "other", None, base_time()))
        .unwrap();

    let titles = |tasks: Vec<Task>| tasks.into_iter().map(|t| t.title).collect::<Vec<_>>();

    let all = repo
        .list_tasks(&TaskListQuery::for_user(owner.user_id))
        .unwrap();
    assert_eq!(
        titles(all),
        vec!["task 0", "task 1", "task 2", "task 3"]
    );

    let page = repo
        .list_tasks(&TaskListQuery {
            user_id: owner.user_id,
            limit: Some(2),
            offset: 1,
        })
        .unwrap();
    assert_eq!(titles(page), vec!["task 1", "task 2"]);

    let tail = repo
        .list_tasks(&TaskListQuery {
            user_id: owner.user_id,
            limit: None,
            offset: 3,
        })
        .unwrap();
    assert_eq!(titles(tail), vec!["task 3"]);
}

#[test]
fn update_keeps_owner_and_creation_stamps() {
    let conn = open_db_in_memory().unwrap();
    let owner = seed_user(&conn, "Aiko");
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();

    let task = Task::new(owner.user_id, "draft", None, base_time());
    repo.create_task(&task).unwrap();

    let later = base_time() + Duration::hours(1);
    let edited = Task {
        title: "final".to_string(),
        description: Some("ship it".to_string()),
        provenance: task.provenance.touched(owner.user_id, later),
        ..task.clone()
    };
    let stored = repo.update_task(&edited).unwrap();

    assert_eq!(stored.title, "final");
    assert_eq!(stored.description.as_deref(), Some("ship it"));
    assert_eq!(stored.provenance.created_at, task.provenance.created_at);
    assert_eq!(stored.provenance.updated_at, later);
}

#[test]
fn update_of_foreign_or_missing_task_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let owner = seed_user(&conn, "Aiko");
    let stranger = seed_user(&conn, "Bo");
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();

    let task = Task::new(owner.user_id, "mine", None, base_time());
    repo.create_task(&task).unwrap();

    let hijack = Task {
        user_id: stranger.user_id,
        title: "theirs".to_string(),
        ..task.clone()
    };
    let err = repo.update_task(&hijack).unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            entity: EntityKind::Task,
            ..
        }
    ));
    assert_eq!(repo.get_task(task.task_id).unwrap().title, "mine");

    let ghost = Task::new(owner.user_id, "ghost", None, base_time());
    assert!(matches!(
        repo.update_task(&ghost).unwrap_err(),
        RepoError::NotFound { .. }
    ));
}

#[test]
fn delete_is_not_repeatable_and_leaves_slots_in_place() {
    let conn = open_db_in_memory().unwrap();
    let owner = seed_user(&conn, "Aiko");
    let tasks = SqliteTaskRepository::try_new(&conn).unwrap();
    let slots = SqliteTimeSlotRepository::try_new(&conn).unwrap();

    let task = Task::new(owner.user_id, "plan", None, base_time());
    tasks.create_task(&task).unwrap();
    let slot = TimeSlot::new(
        owner.user_id,
        task.task_id,
        Allocation::Flexible,
        base_time(),
        base_time() + Duration::hours(1),
        base_time(),
    );
    slots.create_time_slot(&slot).unwrap();

    tasks.delete_task(task.task_id).unwrap();
    let err = tasks.delete_task(task.task_id).unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            entity: EntityKind::Task,
            id,
        } if id == task.task_id
    ));
    assert!(matches!(
        tasks.get_task(task.task_id).unwrap_err(),
        RepoError::NotFound { .. }
    ));

    let dangling = slots.get_time_slot(slot.time_slot_id).unwrap();
    assert_eq!(dangling.task_id, task.task_id);
}
