pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use campusdesk_core::lifecycle::TransitionKind;
use commands::request::ActorArgs;

#[derive(Debug, Parser)]
#[command(
    name = "campusdesk",
    about = "Campusdesk operator CLI",
    long_about = "Operate the campus request lifecycle: migrations, config inspection, readiness checks, demo data and request actions.",
    after_help = "Examples:\n  campusdesk doctor --json\n  campusdesk submit book_order --payload '{\"title\":\"Compilers\",\"quantity\":2}' --user u-lib-7\n  campusdesk approve REQ-000001 --user u-store-1 --role asst_store\n  campusdesk pending registrar"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, the chain table, DB connectivity and migration state")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "List the approval chain registered for every request type")]
    Chains,
    #[command(about = "Load the demo request dataset through the lifecycle engine")]
    Seed,
    #[command(about = "Submit a new request")]
    Submit {
        #[arg(help = "Registered request type, e.g. book_order")]
        request_type: String,
        #[arg(long, help = "Request fields as a JSON object")]
        payload: String,
        #[arg(long = "user", help = "Submitting user id")]
        user_id: String,
        #[arg(long, help = "Submitting user display name (defaults to the user id)")]
        name: Option<String>,
    },
    #[command(about = "Approve the current step of a request")]
    Approve(ActorArgs),
    #[command(about = "Reject a request at its current step")]
    Reject(ActorArgs),
    #[command(about = "Forward a request to the next role in its chain")]
    Forward(ActorArgs),
    #[command(about = "Show a single request with its approval flow and history")]
    Show {
        #[arg(help = "Request identifier")]
        id: String,
    },
    #[command(about = "List open requests waiting on a role")]
    Pending {
        #[arg(help = "Approver role, e.g. registrar")]
        role: String,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Chains => commands::chains::run(),
        Command::Seed => commands::seed::run(),
        Command::Submit { request_type, payload, user_id, name } => {
            commands::request::submit(&request_type, &payload, &user_id, name.as_deref())
        }
        Command::Approve(args) => commands::request::transition(TransitionKind::Approve, &args),
        Command::Reject(args) => commands::request::transition(TransitionKind::Reject, &args),
        Command::Forward(args) => commands::request::transition(TransitionKind::Forward, &args),
        Command::Show { id } => commands::request::show(&id),
        Command::Pending { role } => commands::request::pending(&role),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};

    #[test]
    fn parses_transition_arguments() {
        let cli = Cli::try_parse_from([
            "campusdesk",
            "forward",
            "REQ-000004",
            "--user",
            "u-hod-cs",
            "--role",
            "hod",
            "--comment",
            "strong candidate",
        ])
        .expect("parse forward");

        let Command::Forward(args) = cli.command else {
            panic!("expected forward command");
        };
        assert_eq!(args.id, "REQ-000004");
        assert_eq!(args.role, "hod");
        assert_eq!(args.comment.as_deref(), Some("strong candidate"));
        assert_eq!(args.name, None);
    }

    #[test]
    fn submit_requires_payload_and_user() {
        assert!(Cli::try_parse_from(["campusdesk", "submit", "book_order"]).is_err());
        assert!(Cli::try_parse_from([
            "campusdesk",
            "submit",
            "book_order",
            "--payload",
            "{}",
            "--user",
            "u-lib-7"
        ])
        .is_ok());
    }
}
