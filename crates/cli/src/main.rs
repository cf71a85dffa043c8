use std::process::ExitCode;

fn main() -> ExitCode {
    sparky_cli::run()
}
