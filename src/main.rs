use std::path::Path;
use std::process::ExitCode;

use blockwork::kernel::services::adapters::load_settings;
use blockwork::session;

mod logging;

fn main() -> ExitCode {
    let _logging = logging::init();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: blockwork <session.json>");
        return ExitCode::from(2);
    };

    let session = match session::load_session(Path::new(&path)) {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(error = %e, "failed to load session");
            eprintln!("blockwork: {e}");
            return ExitCode::FAILURE;
        }
    };

    let settings = load_settings();
    let report = session::replay(&session, &settings);
    tracing::info!(
        steps = session.steps.len(),
        errors = report.errors.len(),
        "session replayed"
    );

    match serde_json::to_string_pretty(&report) {
        Ok(json) => {
            println!("{json}");
            if report.errors.is_empty() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("blockwork: failed to encode report: {e}");
            ExitCode::FAILURE
        }
    }
}
