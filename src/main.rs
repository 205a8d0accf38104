#![forbid(unsafe_code)]

//! rcv: repository cache verifier CLI entry point.

mod cli_app;

fn main() {
    let code = cli_app::main_with_args(std::env::args_os().collect());
    std::process::exit(code);
}
