//! Binary entrypoint for the handoff CLI.

#[tokio::main]
async fn main() {
    let exit_code = handoff_cli::run().await;
    std::process::exit(exit_code);
}
