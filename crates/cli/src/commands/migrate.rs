use crate::commands::{
    load_config, runtime, CommandResult, EXIT_DB_CONNECTIVITY, EXIT_MIGRATION,
};
use campusdesk_db::{connect, migrations};

pub fn run() -> CommandResult {
    let config = match load_config("migrate") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match runtime("migrate") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), EXIT_DB_CONNECTIVITY))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), EXIT_MIGRATION))?;
        let applied = migrations::applied_versions(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), EXIT_MIGRATION))?;
        pool.close().await;
        Ok::<Vec<i64>, (&'static str, String, u8)>(applied)
    });

    match result {
        Ok(applied) => CommandResult::success_with_data(
            "migrate",
            "applied pending migrations",
            Some(serde_json::json!({ "applied_versions": applied })),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("migrate", error_class, message, exit_code)
        }
    }
}
