use std::io::Write;
use std::process::ExitCode;

fn main() -> ExitCode {
    match filterd::run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let _ = writeln!(std::io::stderr().lock(), "filterd: {error}");
            ExitCode::FAILURE
        }
    }
}
