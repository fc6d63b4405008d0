use std::process::ExitCode;

fn main() -> ExitCode {
    packsync_lib::run()
}
