//! `bunq setup` and `bunq refresh`.

use anyhow::Result;
use bunq_client::Environment;

use super::Client;
use crate::cli::args::SetupArgs;
use crate::exit_codes::SUCCESS;

pub async fn run(client: &Client, args: SetupArgs) -> Result<i32> {
    if let Some(environment) = args.environment {
        let environment: Environment = environment.parse()?;
        client.set_environment(environment).await?;
    }
    if let Some(api_key) = args.api_key {
        if client.rotate_secret(&api_key).await? {
            tracing::info!("stored new API key");
        }
    }

    let creds = client.setup().await?;
    println!(
        "{} ready ({}), user {}",
        creds.environment,
        creds.handshake_state(),
        creds.user_id.as_deref().unwrap_or("unknown")
    );
    Ok(SUCCESS)
}

pub async fn refresh(client: &Client) -> Result<i32> {
    let creds = client.refresh_session().await?;
    println!("session refreshed ({})", creds.environment);
    Ok(SUCCESS)
}
