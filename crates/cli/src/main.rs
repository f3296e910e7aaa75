use std::process::ExitCode;

fn main() -> ExitCode {
    bloom_cli::run()
}
