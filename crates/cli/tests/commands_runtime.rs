use std::env;
use std::sync::{Mutex, OnceLock};

use campusdesk_cli::commands::request::{self, ActorArgs};
use campusdesk_cli::commands::{chains, doctor, migrate, seed};
use campusdesk_core::lifecycle::TransitionKind;
use serde_json::Value;

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("CAMPUSDESK_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["data"]["applied_versions"], serde_json::json!([1]));
    });
}

#[test]
fn migrate_returns_config_failure_for_non_sqlite_url() {
    with_env(&[("CAMPUSDESK_DATABASE_URL", "postgres://localhost/campus")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn chains_lists_the_built_in_table() {
    with_env(&[], || {
        let result = chains::run();
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "chains");
        let definitions = payload["data"].as_array().expect("chain array");
        assert_eq!(definitions.len(), 7);

        let message = payload["message"].as_str().unwrap_or_default();
        assert!(message.contains("built-in defaults"));
        assert!(message.contains("library_purchase: asst_librarian -> registrar -> principal => ordered"));
    });
}

#[test]
fn seed_returns_every_demo_request() {
    with_env(&[("CAMPUSDESK_DATABASE_URL", "sqlite::memory:")], || {
        let result = seed::run();
        assert_eq!(result.exit_code, 0, "expected seed success: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "seed");
        assert_eq!(payload["status"], "ok");

        let requests = payload["data"]["requests"].as_array().expect("seeded requests");
        assert_eq!(requests.len(), 7);
        assert_eq!(requests[0]["request_id"], "REQ-000001");

        let message = payload["message"].as_str().unwrap_or_default();
        assert!(message.contains("  - timing_request: REQ-000003 (Extended hours turned down by the registrar)"));
    });
}

#[test]
fn seed_is_deterministic_on_a_fresh_database() {
    with_env(&[("CAMPUSDESK_DATABASE_URL", "sqlite::memory:")], || {
        let first = parse_payload(&seed::run().output);
        let second = parse_payload(&seed::run().output);

        assert_eq!(first["status"], "ok");
        assert_eq!(first["message"], second["message"]);
    });
}

#[test]
fn request_commands_walk_a_book_order_through_its_chain() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}", dir.path().join("campus.db").display());

    with_env(&[("CAMPUSDESK_DATABASE_URL", url.as_str())], || {
        let submitted = request::submit(
            "book_order",
            r#"{"title":"Modern Compiler Implementation","quantity":3}"#,
            "u-lib-7",
            Some("Meera Iyer"),
        );
        assert_eq!(submitted.exit_code, 0, "submit failed: {}", submitted.output);
        let payload = parse_payload(&submitted.output);
        let id = payload["data"]["id"].as_str().expect("request id").to_string();
        assert_eq!(payload["data"]["current_approver_role"], "asst_store");

        let wrong_role = request::transition(TransitionKind::Approve, &actor(&id, "registrar"));
        assert_eq!(wrong_role.exit_code, 6);
        assert_eq!(parse_payload(&wrong_role.output)["error_class"], "unauthorized");

        let first = request::transition(TransitionKind::Approve, &actor(&id, "asst_store"));
        assert_eq!(first.exit_code, 0, "first approval failed: {}", first.output);

        let queue = parse_payload(&request::pending("registrar").output);
        assert_eq!(queue["data"].as_array().map(Vec::len), Some(1));

        let last = request::transition(TransitionKind::Approve, &actor(&id, "registrar"));
        let last = parse_payload(&last.output);
        assert_eq!(last["data"]["status"], "approved");
        assert_eq!(last["data"]["current_approver_role"], Value::Null);

        let shown = parse_payload(&request::show(&id).output);
        assert_eq!(shown["data"]["history"].as_array().map(Vec::len), Some(3));
    });
}

#[test]
fn request_commands_report_lifecycle_errors() {
    with_env(&[("CAMPUSDESK_DATABASE_URL", "sqlite::memory:")], || {
        let missing = request::show("REQ-999999");
        assert_eq!(missing.exit_code, 6);
        assert_eq!(parse_payload(&missing.output)["error_class"], "not_found");

        let unknown = request::submit("parking_permit", "{}", "u-lib-7", None);
        assert_eq!(unknown.exit_code, 6);
        assert_eq!(parse_payload(&unknown.output)["error_class"], "unknown_request_type");

        let invalid = request::submit("book_order", r#"{"quantity":"many"}"#, "u-lib-7", None);
        assert_eq!(invalid.exit_code, 6);
        let invalid = parse_payload(&invalid.output);
        assert_eq!(invalid["error_class"], "invalid_payload");
        assert!(invalid["message"].as_str().unwrap_or_default().contains("title"));
    });
}

#[test]
fn doctor_reports_config_failure_as_json() {
    with_env(&[("CAMPUSDESK_LOG_LEVEL", "loud")], || {
        let report = parse_payload(&doctor::run(true));
        assert_eq!(report["overall_status"], "fail");
        assert_eq!(report["checks"][0]["name"], "config_validation");
        assert_eq!(report["checks"][0]["status"], "fail");
        assert_eq!(report["checks"][1]["status"], "skipped");
    });
}

fn actor(id: &str, role: &str) -> ActorArgs {
    ActorArgs {
        id: id.to_string(),
        user_id: format!("u-{role}"),
        name: None,
        role: role.to_string(),
        comment: None,
    }
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "CAMPUSDESK_DATABASE_URL",
        "CAMPUSDESK_DATABASE_MAX_CONNECTIONS",
        "CAMPUSDESK_DATABASE_TIMEOUT_SECS",
        "CAMPUSDESK_SERVER_BIND_ADDRESS",
        "CAMPUSDESK_SERVER_PORT",
        "CAMPUSDESK_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "CAMPUSDESK_LOGGING_LEVEL",
        "CAMPUSDESK_LOGGING_FORMAT",
        "CAMPUSDESK_LOG_LEVEL",
        "CAMPUSDESK_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
