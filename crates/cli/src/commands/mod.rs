pub mod chains;
pub mod config;
pub mod doctor;
pub mod migrate;
pub mod request;
pub mod seed;

use std::future::Future;
use std::sync::Arc;

use campusdesk_core::config::{AppConfig, LoadOptions};
use campusdesk_core::errors::LifecycleError;
use campusdesk_core::lifecycle::LifecycleEngine;
use campusdesk_db::{connect, migrations, SqlStore};
use serde::Serialize;
use serde_json::Value;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_RUNTIME: u8 = 3;
pub const EXIT_DB_CONNECTIVITY: u8 = 4;
pub const EXIT_MIGRATION: u8 = 5;
pub const EXIT_LIFECYCLE: u8 = 6;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with_data(command, message, None)
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn lifecycle_failure(command: &str, error: &LifecycleError) -> Self {
        Self::failure(command, error.error_class(), error.to_string(), EXIT_LIFECYCLE)
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub(crate) fn load_config(command: &str) -> Result<AppConfig, CommandResult> {
    AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            EXIT_CONFIG,
        )
    })
}

pub(crate) fn runtime(command: &str) -> Result<tokio::runtime::Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            EXIT_RUNTIME,
        )
    })
}

/// Connects to the configured database, applies pending migrations and hands
/// a SQLite-backed engine to `operation`.
pub(crate) fn with_engine<F, Fut>(command: &'static str, operation: F) -> CommandResult
where
    F: FnOnce(LifecycleEngine<SqlStore>) -> Fut,
    Fut: Future<Output = Result<CommandResult, LifecycleError>>,
{
    let config = match load_config(command) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let chains = match config.chain_registry() {
        Ok(chains) => chains,
        Err(error) => {
            return CommandResult::failure(
                command,
                "config_validation",
                error.to_string(),
                EXIT_CONFIG,
            )
        }
    };
    let runtime = match runtime(command) {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    runtime.block_on(async {
        let pool = match connect(&config.database).await {
            Ok(pool) => pool,
            Err(error) => {
                return CommandResult::failure(
                    command,
                    "db_connectivity",
                    error.to_string(),
                    EXIT_DB_CONNECTIVITY,
                )
            }
        };
        if let Err(error) = migrations::run_pending(&pool).await {
            pool.close().await;
            return CommandResult::failure(command, "migration", error.to_string(), EXIT_MIGRATION);
        }

        let engine = LifecycleEngine::new(Arc::new(chains), Arc::new(SqlStore::new(pool.clone())));
        let result = match operation(engine).await {
            Ok(result) => result,
            Err(error) => CommandResult::lifecycle_failure(command, &error),
        };

        pool.close().await;
        result
    })
}
