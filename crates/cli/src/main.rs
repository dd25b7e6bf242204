use std::process::ExitCode;

fn main() -> ExitCode {
    campusdesk_cli::run()
}
