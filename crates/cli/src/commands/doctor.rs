use std::collections::BTreeSet;

use campusdesk_core::config::{AppConfig, LoadOptions};
use campusdesk_db::{connect, migrations, ping};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_chain_table(&config));
            checks.extend(check_database(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["chain_table", "database_connectivity", "migration_state"] {
                checks.push(skipped(name));
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn skipped(name: &'static str) -> DoctorCheck {
    DoctorCheck {
        name,
        status: CheckStatus::Skipped,
        details: "skipped because configuration did not load".to_string(),
    }
}

fn check_chain_table(config: &AppConfig) -> DoctorCheck {
    match config.chain_registry() {
        Ok(registry) => {
            let unstaffed: Vec<String> = if config.directory.is_empty() {
                Vec::new()
            } else {
                registry
                    .definitions()
                    .flat_map(|chain| chain.roles.iter())
                    .filter(|role| !config.directory.contains_key(role.as_str()))
                    .cloned()
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect()
            };
            let details = if unstaffed.is_empty() {
                format!("{} request types registered", registry.len())
            } else {
                format!(
                    "{} request types registered; no directory holders for: {}",
                    registry.len(),
                    unstaffed.join(", ")
                )
            };
            DoctorCheck { name: "chain_table", status: CheckStatus::Pass, details }
        }
        Err(error) => {
            DoctorCheck { name: "chain_table", status: CheckStatus::Fail, details: error.to_string() }
        }
    }
}

fn check_database(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return vec![
                DoctorCheck {
                    name: "database_connectivity",
                    status: CheckStatus::Fail,
                    details: format!("failed to initialize async runtime: {error}"),
                },
                skipped_after_connectivity(),
            ];
        }
    };

    runtime.block_on(async {
        let pool = match connect(&config.database).await {
            Ok(pool) => pool,
            Err(error) => {
                return vec![
                    DoctorCheck {
                        name: "database_connectivity",
                        status: CheckStatus::Fail,
                        details: format!("failed to connect to database: {error}"),
                    },
                    skipped_after_connectivity(),
                ];
            }
        };

        let connectivity = match ping(&pool).await {
            Ok(()) => DoctorCheck {
                name: "database_connectivity",
                status: CheckStatus::Pass,
                details: format!("connected using `{}`", config.database.url),
            },
            Err(error) => DoctorCheck {
                name: "database_connectivity",
                status: CheckStatus::Fail,
                details: format!("liveness query failed: {error}"),
            },
        };

        let migration_state = match migrations::applied_versions(&pool).await {
            Ok(applied) => {
                let known = migrations::MIGRATOR
                    .iter()
                    .map(|migration| migration.version)
                    .collect::<BTreeSet<_>>()
                    .len();
                let status =
                    if applied.len() >= known { CheckStatus::Pass } else { CheckStatus::Fail };
                DoctorCheck {
                    name: "migration_state",
                    status,
                    details: if status == CheckStatus::Pass {
                        format!("{} of {known} migrations applied", applied.len())
                    } else {
                        format!(
                            "{} of {known} migrations applied; run `campusdesk migrate`",
                            applied.len()
                        )
                    },
                }
            }
            Err(error) => DoctorCheck {
                name: "migration_state",
                status: CheckStatus::Fail,
                details: format!("could not read migration history: {error}"),
            },
        };

        pool.close().await;
        vec![connectivity, migration_state]
    })
}

fn skipped_after_connectivity() -> DoctorCheck {
    DoctorCheck {
        name: "migration_state",
        status: CheckStatus::Skipped,
        details: "skipped because the database is unreachable".to_string(),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
