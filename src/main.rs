use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    faceit_presence::run().await
}
