use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    smpmgr::cli::run(std::env::args().collect()).await
}
