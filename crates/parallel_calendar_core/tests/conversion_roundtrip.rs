use chrono::{DateTime, Duration, TimeZone, Utc};
use parallel_calendar_core::convert::{ConversionError, TaskRow, TimeSlotRow, UserRow};
use parallel_calendar_core::db::open_db_in_memory;
use parallel_calendar_core::{
    Allocation, SqliteTaskRepository, SqliteTimeSlotRepository, SqliteUserRepository, Task,
    TaskRepository, TimeSlot, TimeSlotRepository, User, UserRepository,
};
use rusqlite::Connection;
use serde_json::json;

fn at_micros(hour: u32, micros: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, hour, 0, 0).unwrap() + Duration::microseconds(micros)
}

fn seed(conn: &Connection) -> (User, Task) {
    let user = SqliteUserRepository::try_new(conn)
        .unwrap()
        .create_user(&User::new("Aiko", "aiko@example.com", None, at_micros(7, 0)))
        .unwrap();
    let task = SqliteTaskRepository::try_new(conn)
        .unwrap()
        .create_task(&Task::new(user.user_id, "plan", Some(String::new()), at_micros(7, 0)))
        .unwrap();
    (user, task)
}

#[test]
fn stored_slot_reads_back_field_for_field() {
    let conn = open_db_in_memory().unwrap();
    let (user, task) = seed(&conn);
    let repo = SqliteTimeSlotRepository::try_new(&conn).unwrap();

    let ext = json!({"color": "teal", "weight": 1.5}).as_object().unwrap().clone();
    let slot = TimeSlot::new(
        user.user_id,
        task.task_id,
        Allocation::Blocked,
        at_micros(9, 1_234),
        at_micros(10, 999),
        at_micros(8, 42),
    )
    .with_ext_data(ext);

    let stored = repo.create_time_slot(&slot).unwrap();
    assert_eq!(stored, slot);
    assert_eq!(stored.start_at, at_micros(9, 1_000));
    assert_eq!(stored.end_at, at_micros(10, 0));
}

#[test]
fn persisted_columns_use_null_empty_object_and_epoch_millis() {
    let conn = open_db_in_memory().unwrap();
    let (user, task) = seed(&conn);
    let repo = SqliteTimeSlotRepository::try_new(&conn).unwrap();

    let absent = TimeSlot::new(
        user.user_id,
        task.task_id,
        Allocation::Focused,
        at_micros(9, 0),
        at_micros(10, 0),
        at_micros(8, 0),
    );
    let empty = TimeSlot::new(
        user.user_id,
        task.task_id,
        Allocation::Flexible,
        at_micros(10, 0),
        at_micros(11, 0),
        at_micros(8, 0),
    )
    .with_ext_data(serde_json::Map::new());
    repo.create_time_slot(&absent).unwrap();
    repo.create_time_slot(&empty).unwrap();

    let raw = |id: uuid::Uuid| -> (Option<String>, i64, String) {
        conn.query_row(
            "SELECT ext_data, start_at, allocation FROM time_slots WHERE time_slot_id = ?1;",
            [id.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .unwrap()
    };

    let (ext, start, allocation) = raw(absent.time_slot_id);
    assert_eq!(ext, None);
    assert_eq!(start, at_micros(9, 0).timestamp_millis());
    assert_eq!(allocation, "focused");

    let (ext, _, allocation) = raw(empty.time_slot_id);
    assert_eq!(ext.as_deref(), Some("{}"));
    assert_eq!(allocation, "flexible");

    let description: Option<String> = conn
        .query_row(
            "SELECT task_description FROM tasks WHERE task_id = ?1;",
            [task.task_id.to_string()],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(description.as_deref(), Some(""));
}

#[test]
fn rows_convert_without_storage() {
    let user = User::new("Aiko", "aiko@example.com", None, at_micros(7, 5));
    assert_eq!(UserRow::from_domain(&user).into_domain().unwrap(), user);

    let task = Task::new(user.user_id, "plan", None, at_micros(7, 5));
    let row = TaskRow::from_domain(&task);
    assert_eq!(row.task_description, None);
    assert_eq!(row.into_domain().unwrap(), task);
}

#[test]
fn unreadable_rows_fail_closed() {
    let user = User::new("Aiko", "aiko@example.com", None, at_micros(7, 0));
    let task = Task::new(user.user_id, "plan", None, at_micros(7, 0));
    let slot = TimeSlot::new(
        user.user_id,
        task.task_id,
        Allocation::Focused,
        at_micros(9, 0),
        at_micros(10, 0),
        at_micros(8, 0),
    );

    let mut row = TimeSlotRow::from_domain(&slot).unwrap();
    row.allocation = "napping".to_string();
    assert!(matches!(
        row.into_domain().unwrap_err(),
        ConversionError::InvalidData(_)
    ));

    let mut row = TimeSlotRow::from_domain(&slot).unwrap();
    row.ext_data = Some("42".to_string());
    assert!(matches!(
        row.into_domain().unwrap_err(),
        ConversionError::MalformedMetadata { time_slot_id, .. } if time_slot_id == slot.time_slot_id
    ));

    let mut row = TaskRow::from_domain(&task);
    row.task_id = "not-a-uuid".to_string();
    assert!(matches!(
        row.into_domain().unwrap_err(),
        ConversionError::InvalidData(_)
    ));
}
