use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use campusdesk_core::config::{AppConfig, LoadOptions};
use toml::Value;

struct FieldLine<'a> {
    key: &'static str,
    value: String,
    env_keys: &'a [&'static str],
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let fields = [
        FieldLine {
            key: "database.url",
            value: config.database.url.clone(),
            env_keys: &["CAMPUSDESK_DATABASE_URL"],
        },
        FieldLine {
            key: "database.max_connections",
            value: config.database.max_connections.to_string(),
            env_keys: &["CAMPUSDESK_DATABASE_MAX_CONNECTIONS"],
        },
        FieldLine {
            key: "database.timeout_secs",
            value: config.database.timeout_secs.to_string(),
            env_keys: &["CAMPUSDESK_DATABASE_TIMEOUT_SECS"],
        },
        FieldLine {
            key: "server.bind_address",
            value: config.server.bind_address.clone(),
            env_keys: &["CAMPUSDESK_SERVER_BIND_ADDRESS"],
        },
        FieldLine {
            key: "server.port",
            value: config.server.port.to_string(),
            env_keys: &["CAMPUSDESK_SERVER_PORT"],
        },
        FieldLine {
            key: "server.graceful_shutdown_secs",
            value: config.server.graceful_shutdown_secs.to_string(),
            env_keys: &["CAMPUSDESK_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        },
        FieldLine {
            key: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["CAMPUSDESK_LOGGING_LEVEL", "CAMPUSDESK_LOG_LEVEL"],
        },
        FieldLine {
            key: "logging.format",
            value: format!("{:?}", config.logging.format),
            env_keys: &["CAMPUSDESK_LOGGING_FORMAT", "CAMPUSDESK_LOG_FORMAT"],
        },
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in &fields {
        lines.push(render_line(
            field.key,
            &field.value,
            field_source(
                field.key,
                field.env_keys,
                config_file_doc.as_ref(),
                config_file_path.as_deref(),
            ),
        ));
    }

    let chain_summary = if config.chains.is_empty() {
        "built-in defaults".to_string()
    } else {
        format!("{} configured", config.chains.len())
    };
    lines.push(render_line(
        "chains",
        &chain_summary,
        field_source("chains", &[], config_file_doc.as_ref(), config_file_path.as_deref()),
    ));

    let roles: Vec<&str> = config.directory.keys().map(String::as_str).collect();
    let directory_summary = if roles.is_empty() { "<empty>".to_string() } else { roles.join(", ") };
    lines.push(render_line(
        "directory",
        &directory_summary,
        field_source("directory", &[], config_file_doc.as_ref(), config_file_path.as_deref()),
    ));

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("campusdesk.toml"), PathBuf::from("config/campusdesk.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
