use std::process::ExitCode;

fn main() -> ExitCode {
    tablechat_cli::run()
}
