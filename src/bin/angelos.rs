use std::process::ExitCode;

fn main() -> ExitCode {
    angelos_launcher::run(&angelos_launcher::ANGELOS)
}
