use chrono::{DateTime, Duration, TimeZone, Utc};
use parallel_calendar_core::db::CalendarStore;
use parallel_calendar_core::{
    Allocation, CancellationToken, RepoError, SqliteTaskRepository, SqliteTimeSlotRepository, SqliteUserRepository,
    Task, TaskRepository, TimeSlot, TimeSlotListQuery, TimeSlotRepository, User, UserRepository,
};
use std::sync::{Arc, Barrier};
use std::thread;

const BUSY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, hour, minute, 0).unwrap()
}

fn seed(store: &CalendarStore) -> Task {
    let conn = store.connection().unwrap();
    let users = SqliteUserRepository::try_new(&conn).unwrap();
    let tasks = SqliteTaskRepository::try_new(&conn).unwrap();
    let user = users
        .create_user(&User::new("Aiko", "aiko@example.com", None, Utc::now()))
        .unwrap();
    tasks
        .create_task(&Task::new(user.user_id, "contended", None, Utc::now()))
        .unwrap()
}

/// Races `windows.len()` creates through a barrier and returns each result.
fn race(
    store: &CalendarStore,
    task: &Task,
    windows: Vec<(DateTime<Utc>, DateTime<Utc>)>,
) -> Vec<Result<TimeSlot, RepoError>> {
    let barrier = Arc::new(Barrier::new(windows.len()));
    let handles: Vec<_> = windows
        .into_iter()
        .map(|(start, end)| {
            let store = store.clone();
            let barrier = Arc::clone(&barrier);
            let candidate = TimeSlot::new(
                task.user_id,
                task.task_id,
                Allocation::Focused,
                start,
                end,
                Utc::now(),
            );
            thread::spawn(move || {
                let conn = store.connection().unwrap();
                let repo = SqliteTimeSlotRepository::try_new(&conn).unwrap();
                barrier.wait();
                repo.create_time_slot(&candidate)
            })
        })
        .collect();
    handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect()
}

#[test]
fn two_overlapping_creates_exactly_one_wins() {
    let dir = tempfile::tempdir().unwrap();
    let store = CalendarStore::open_path(dir.path().join("race.db"), 4, BUSY_TIMEOUT).unwrap();
    let task = seed(&store);

    for round in 0..10 {
        let base = at(0, 0) + Duration::hours(round * 2);
        let results = race(
            &store,
            &task,
            vec![
                (base, base + Duration::minutes(60)),
                (base + Duration::minutes(30), base + Duration::minutes(90)),
            ],
        );

        let winners: Vec<&TimeSlot> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(winners.len(), 1, "round {round}: {results:?}");

        let loser = results
            .iter()
            .find_map(|r| r.as_ref().err())
            .unwrap();
        match loser {
            RepoError::SchedulingConflict { conflicting, .. } => {
                assert_eq!(conflicting, &vec![winners[0].time_slot_id]);
            }
            other => panic!("round {round}: unexpected error: {other}"),
        }
    }
}

#[test]
fn many_writers_on_one_window_commit_a_single_slot() {
    let dir = tempfile::tempdir().unwrap();
    let store = CalendarStore::open_path(dir.path().join("crowd.db"), 8, BUSY_TIMEOUT).unwrap();
    let task = seed(&store);

    let windows = (0..8)
        .map(|offset| {
            let start = at(9, 0) + Duration::minutes(offset);
            (start, start + Duration::minutes(30))
        })
        .collect();
    let results = race(&store, &task, windows);

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|err| matches!(err, RepoError::SchedulingConflict { .. })));

    let conn = store.connection().unwrap();
    let repo = SqliteTimeSlotRepository::try_new(&conn).unwrap();
    let stored = repo
        .list_time_slots(&TimeSlotListQuery::for_user(task.user_id))
        .unwrap();
    assert_eq!(stored.len(), 1);
}

#[test]
fn disjoint_concurrent_creates_all_commit() {
    let dir = tempfile::tempdir().unwrap();
    let store = CalendarStore::open_path(dir.path().join("calm.db"), 4, BUSY_TIMEOUT).unwrap();
    let task = seed(&store);

    let windows = (0..4)
        .map(|hour| (at(8 + hour, 0), at(9 + hour, 0)))
        .collect();
    let results = race(&store, &task, windows);

    assert!(results.iter().all(|r| r.is_ok()), "{results:?}");
}

#[test]
fn cancellation_stops_a_write_waiting_for_the_lock() {
    let dir = tempfile::tempdir().unwrap();
    let store = CalendarStore::open_path(dir.path().join("locked.db"), 2, BUSY_TIMEOUT).unwrap();
    let task = seed(&store);

    let holder = store.connection().unwrap();
    holder.execute_batch("BEGIN IMMEDIATE;").unwrap();

    let token = CancellationToken::new();
    let canceller = {
        let token = token.clone();
        thread::spawn(move || {
            thread::sleep(std::time::Duration::from_millis(50));
            token.cancel();
        })
    };

    let conn = store.connection().unwrap();
    let repo = SqliteTimeSlotRepository::try_new(&conn)
        .unwrap()
        .with_cancellation(token);
    let candidate = TimeSlot::new(
        task.user_id,
        task.task_id,
        Allocation::Focused,
        at(9, 0),
        at(10, 0),
        Utc::now(),
    );
    let started_at = std::time::Instant::now();
    let err = repo.create_time_slot(&candidate).unwrap_err();
    canceller.join().unwrap();

    assert!(matches!(err, RepoError::Cancelled), "{err}");
    assert!(started_at.elapsed() < BUSY_TIMEOUT / 2);

    holder.execute_batch("ROLLBACK;").unwrap();
    let restored_ms: i64 = conn
        .query_row("PRAGMA busy_timeout;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(restored_ms, 10_000);
    assert!(repo
        .list_time_slots(&TimeSlotListQuery::for_user(task.user_id))
        .unwrap()
        .is_empty());
}
