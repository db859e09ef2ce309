use std::path::PathBuf;
use std::process::{Command, Output};

use anyhow::{Context, Result};

/// Runs the compiled operator CLI with a scrubbed database environment.
/// The temp working directory keeps a developer's `.env` out of reach.
pub fn fastener(args: &[&str]) -> Result<Output> {
    Command::new(env!("CARGO_BIN_EXE_fastener"))
        .args(args)
        .current_dir(std::env::temp_dir())
        .env_remove("DATABASE_URL")
        .env("RUST_LOG", "off")
        .output()
        .context("failed to run fastener binary")
}

pub fn fixture(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
        .display()
        .to_string()
}

pub fn stdout_json(output: &Output) -> Result<serde_json::Value> {
    serde_json::from_slice(&output.stdout).context("stdout is not JSON")
}
