//! Cooperative cancellation for in-flight repository writes.
//!
//! Callers hand a `CancellationToken` to the time slot repository. The
//! repository polls it at transaction checkpoints, while waiting for the
//! write lock, and through `InterruptOnCancel` while statements run.

use rusqlite::{Connection, InterruptHandle};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub use tokio_util::sync::CancellationToken;

const WATCH_INTERVAL: Duration = Duration::from_millis(5);

/// Interrupts statements running on a connection once the token fires.
///
/// The watcher thread stops when the guard drops; no interrupt is issued
/// after that point.
pub(crate) struct InterruptOnCancel {
    stop: Option<Sender<()>>,
    watcher: Option<JoinHandle<()>>,
}

impl InterruptOnCancel {
    pub(crate) fn watch(conn: &Connection, token: &CancellationToken) -> Self {
        let handle = conn.get_interrupt_handle();
        let token = token.clone();
        let (stop, stopped) = mpsc::channel::<()>();
        let watcher = thread::Builder::new()
            .name("slot-write-cancel".to_string())
            .spawn(move || watch_loop(&handle, &token, &stopped))
            .ok();
        Self {
            stop: Some(stop),
            watcher,
        }
    }
}

impl Drop for InterruptOnCancel {
    fn drop(&mut self) {
        drop(self.stop.take());
        if let Some(watcher) = self.watcher.take() {
            let _ = watcher.join();
        }
    }
}

// Keeps interrupting while cancelled: an interrupt issued between two
// statements is a no-op in SQLite.
fn watch_loop(handle: &InterruptHandle, token: &CancellationToken, stopped: &mpsc::Receiver<()>) {
    loop {
        match stopped.recv_timeout(WATCH_INTERVAL) {
            Err(RecvTimeoutError::Timeout) => {
                if token.is_cancelled() {
                    handle.interrupt();
                }
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CancellationToken, InterruptOnCancel};
    use crate::db::DbError;
    use crate::repo::RepoError;
    use rusqlite::Connection;

    const ENDLESS_COUNT_SQL: &str = "WITH RECURSIVE counter(n) AS (
            SELECT 1
            UNION ALL
            SELECT n + 1 FROM counter
        )
        SELECT count(*) FROM counter;";

    #[test]
    fn cancelled_token_interrupts_running_statement() {
        let conn = Connection::open_in_memory().unwrap();
        let token = CancellationToken::new();
        let guard = InterruptOnCancel::watch(&conn, &token);
        token.cancel();

        let err = conn
            .query_row(ENDLESS_COUNT_SQL, [], |row| row.get::<_, i64>(0))
            .unwrap_err();
        drop(guard);

        let err = DbError::from(err);
        assert!(err.is_interrupted());
        assert!(matches!(RepoError::from(err), RepoError::Cancelled));
    }

    #[test]
    fn live_token_leaves_statements_alone() {
        let conn = Connection::open_in_memory().unwrap();
        let token = CancellationToken::new();
        let _guard = InterruptOnCancel::watch(&conn, &token);

        let value: i64 = conn.query_row("SELECT 41 + 1;", [], |row| row.get(0)).unwrap();
        assert_eq!(value, 42);
        assert!(!token.is_cancelled());
    }
}
