use serde_json::json;
use std::io::{self, BufRead, Write};

use crate::auth::hash_password;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::database::AccountRepository;
use crate::services::account_service::validate_password;
use crate::types::AccountId;

/// Recovery path for accounts the HTTP API refuses to touch (account 1)
pub async fn reset_password(
    id: i32,
    password: Option<String>,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let id = AccountId(id);
    let password = match password {
        Some(p) => p,
        None => prompt_password(id)?,
    };

    validate_password(&password)?;
    let hash = hash_password(&password)?;

    let (database, store) = super::connect_store().await?;
    let updated = store.set_password_hash(id, &hash).await;
    database.close().await;

    if !updated? {
        return Err(anyhow::anyhow!("Account {} not found", id));
    }

    tracing::info!("Password reset for account {} via CLI", id);
    output_success(
        &output_format,
        &format!("Password updated for account {}", id),
        Some(json!({ "id": id })),
    )
}

fn prompt_password(id: AccountId) -> anyhow::Result<String> {
    eprint!("New password for account {}: ", id);
    io::stderr().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        return Err(anyhow::anyhow!("No password given"));
    }
    Ok(password)
}
