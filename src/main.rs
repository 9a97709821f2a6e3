use std::process::ExitCode;

use xdg_relocate::output as out;
use xdg_relocate::{cli, RelocateError};

mod app;
mod logging;

/// EX_TEMPFAIL: the caller should restart the application and run us again.
const EXIT_RESTART: u8 = 75;

fn main() -> ExitCode {
    let args = cli::parse();
    match app::run(args) {
        Ok(app::Outcome::Ready) => ExitCode::SUCCESS,
        Ok(app::Outcome::RestartRequired) => ExitCode::from(EXIT_RESTART),
        Err(e) => {
            out::print_error(&format!("{e:#}"));
            match e.downcast_ref::<RelocateError>() {
                Some(RelocateError::Interrupted) => ExitCode::from(130),
                _ => ExitCode::FAILURE,
            }
        }
    }
}
