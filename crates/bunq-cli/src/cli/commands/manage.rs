//! `bunq rotate-secret` and `bunq environment`.

use anyhow::Result;
use bunq_client::Environment;

use super::Client;
use crate::cli::args::{EnvironmentArgs, RotateSecretArgs};
use crate::exit_codes::SUCCESS;

pub async fn rotate_secret(client: &Client, args: RotateSecretArgs) -> Result<i32> {
    if client.rotate_secret(&args.api_key).await? {
        println!("API key replaced; run `bunq setup` to register it");
    } else {
        println!("API key unchanged");
    }
    Ok(SUCCESS)
}

pub async fn environment(client: &Client, args: EnvironmentArgs) -> Result<i32> {
    let environment: Environment = args.environment.parse()?;
    if client.set_environment(environment).await? {
        println!("switched to {environment}; run `bunq setup` before sending requests");
    } else {
        println!("already using {environment}");
    }
    Ok(SUCCESS)
}
