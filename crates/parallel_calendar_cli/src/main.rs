//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `parallel_calendar_core` linkage and storage bootstrap from a
//!   plain executable.
//! - Keep output deterministic for quick local sanity checks.

use parallel_calendar_core::db::migrations::{current_user_version, latest_version};
use parallel_calendar_core::{core_version, init_from_config, ping, CalendarStore, CoreConfig};
use std::process::ExitCode;

fn main() -> ExitCode {
    // A missing .env is normal; variables may come from the shell.
    let dotenv = dotenvy::dotenv();

    let config = match CoreConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("config error: {err}");
            return ExitCode::FAILURE;
        }
    };

    match init_from_config(&config) {
        Ok(true) => {
            let dotenv_source = dotenv
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|_| "none".to_string());
            log::info!(
                "event=cli_start module=cli status=ok dotenv={}",
                dotenv_source
            );
        }
        Ok(false) => {}
        Err(err) => {
            eprintln!("logging error: {err}");
            return ExitCode::FAILURE;
        }
    }

    println!("parallel_calendar_core ping={}", ping());
    println!("parallel_calendar_core version={}", core_version());

    let store = match CalendarStore::open(&config) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("store error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let schema_version = store
        .connection()
        .and_then(|conn| current_user_version(&conn));
    match schema_version {
        Ok(version) => {
            println!(
                "parallel_calendar_core db={} schema_version={}/{}",
                store.path().display(),
                version,
                latest_version()
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("store error: {err}");
            ExitCode::FAILURE
        }
    }
}
