//! bvisor - thin smoke-test harness around the `Supervisor` embedding API.
//!
//! This binary isn't the product; it's the minimal proof that the library
//! actually runs a guest under supervision end to end. Real embedders call
//! `bvisor::Supervisor::launch` directly from their own process.
//!
//! # Usage
//!
//! ```bash
//! sudo ./target/debug/bvisor -- /bin/sh -c 'echo hi > /tmp/probe'
//! ```

use std::process::ExitCode;

use bvisor::{SandboxConfig, Supervisor};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let Some(program) = args.next() else {
        eprintln!("usage: bvisor <program> [args...]");
        return ExitCode::from(2);
    };
    let config = args.fold(SandboxConfig::new(program), SandboxConfig::arg);

    let mut supervisor = match Supervisor::launch(config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("[bvisor] failed to launch sandbox: {e}");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(sandbox_id = %supervisor.id(), pid = supervisor.guest_pid().as_raw(), "sandbox running");

    if let Err(e) = supervisor.run() {
        eprintln!("[bvisor] dispatcher error: {e}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
