use std::process::ExitCode;

fn main() -> ExitCode {
    match gitscope::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            gitscope::ui::output::error(format!("{:#}", err));
            ExitCode::FAILURE
        }
    }
}
