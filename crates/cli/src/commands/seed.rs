use campusdesk_core::errors::LifecycleError;
use campusdesk_core::lifecycle::LifecycleEngine;
use campusdesk_db::{DemoSeedDataset, RequestSeedInfo, SqlStore};

use crate::commands::{with_engine, CommandResult, EXIT_LIFECYCLE};

pub fn run() -> CommandResult {
    with_engine("seed", load_demo_dataset)
}

async fn load_demo_dataset(
    engine: LifecycleEngine<SqlStore>,
) -> Result<CommandResult, LifecycleError> {
    let seeded = DemoSeedDataset::load(&engine).await?;
    let verification = DemoSeedDataset::verify(&engine, &seeded).await?;

    if !verification.all_present {
        let failed = failed_checks(&verification.checks);
        return Ok(CommandResult::failure(
            "seed",
            "seed_verification",
            verification_message(&failed),
            EXIT_LIFECYCLE,
        ));
    }

    let data = serde_json::json!({
        "requests": seeded
            .requests_seeded
            .iter()
            .map(|info| serde_json::json!({
                "label": info.label,
                "request_id": info.request_id,
                "request_type": info.request_type,
            }))
            .collect::<Vec<_>>()
    });
    Ok(CommandResult::success_with_data("seed", summary(&seeded.requests_seeded), Some(data)))
}

fn summary(seeded: &[RequestSeedInfo]) -> String {
    let lines: Vec<String> = seeded
        .iter()
        .map(|info| format!("  - {}: {} ({})", info.request_type, info.request_id, info.description))
        .collect();
    format!("demo dataset loaded with {} requests:\n{}", seeded.len(), lines.join("\n"))
}

fn failed_checks(checks: &[(&'static str, bool)]) -> Vec<&'static str> {
    checks.iter().filter_map(|(check, passed)| (!passed).then_some(*check)).collect()
}

fn verification_message(failed: &[&str]) -> String {
    if failed.is_empty() {
        "some seed requests failed to load".to_string()
    } else {
        format!("seed verification failed for: {}", failed.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::{failed_checks, verification_message};

    #[test]
    fn verification_message_names_failed_checks() {
        let checks = [
            ("book-order-pending", true),
            ("timing-request-rejected", false),
            ("stock-request-received", false),
        ];

        assert_eq!(
            verification_message(&failed_checks(&checks)),
            "seed verification failed for: timing-request-rejected, stock-request-received"
        );
    }

    #[test]
    fn verification_message_falls_back_when_nothing_is_named() {
        let checks = [("book-order-pending", true)];
        assert_eq!(
            verification_message(&failed_checks(&checks)),
            "some seed requests failed to load"
        );
    }
}
