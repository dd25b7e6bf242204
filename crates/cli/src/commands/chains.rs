use serde_json::Value;

use crate::commands::{load_config, CommandResult, EXIT_CONFIG};

pub fn run() -> CommandResult {
    let config = match load_config("chains") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let registry = match config.chain_registry() {
        Ok(registry) => registry,
        Err(error) => {
            return CommandResult::failure("chains", "config_validation", error.to_string(), EXIT_CONFIG)
        }
    };

    let source = if config.chains.is_empty() { "built-in defaults" } else { "configuration" };
    let lines: Vec<String> = registry
        .definitions()
        .map(|chain| {
            let forward = if chain.allows_forward { ", forward allowed" } else { "" };
            format!(
                "  - {}: {} => {}{forward}",
                chain.request_type,
                chain.roles.join(" -> "),
                chain.final_status
            )
        })
        .collect();
    let definitions: Vec<_> = registry.definitions().cloned().collect();

    CommandResult::success_with_data(
        "chains",
        format!("{} approval chains from {source}:\n{}", registry.len(), lines.join("\n")),
        Some(serde_json::to_value(definitions).unwrap_or(Value::Null)),
    )
}
