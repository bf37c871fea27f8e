//! `bunq status`: what is stored, without printing any of it.

use anyhow::Result;
use bunq_client::{CredentialField, Credentials};

use super::Client;
use crate::exit_codes::SUCCESS;

pub async fn run(client: &Client) -> Result<i32> {
    let creds = client.credentials().await?;
    println!("credential file: {}", client.store().path().display());
    print!("{}", render(&creds));
    Ok(SUCCESS)
}

fn render(creds: &Credentials) -> String {
    let mut out = format!(
        "environment: {}\nstate: {}\n",
        creds.environment,
        creds.handshake_state()
    );
    if let Some(user_id) = &creds.user_id {
        out.push_str(&format!("user id: {user_id}\n"));
    }
    for field in CredentialField::ALL {
        if matches!(field, CredentialField::Environment | CredentialField::UserId) {
            continue;
        }
        let mark = if creds.get(field).is_some() { "set" } else { "-" };
        out.push_str(&format!("  {field}: {mark}\n"));
    }
    out
}
