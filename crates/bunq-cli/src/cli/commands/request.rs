//! `bunq request`: one signed call, envelope printed as JSON.

use anyhow::{Context, Result};
use bunq_client::{Method, ResponseEnvelope};
use serde_json::Value;

use super::Client;
use crate::cli::args::RequestArgs;
use crate::exit_codes::SUCCESS;

pub async fn run(client: &Client, args: RequestArgs) -> Result<i32> {
    let method = parse_method(&args.method)?;
    let body = args
        .data
        .as_deref()
        .map(serde_json::from_str::<Value>)
        .transpose()
        .context("--data is not valid JSON")?;

    let envelope = send(client, method, &args.path, body.as_ref(), args.refresh_on_auth_failure)
        .await?;
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(SUCCESS)
}

async fn send(
    client: &Client,
    method: Method,
    path: &str,
    body: Option<&Value>,
    refresh_on_auth_failure: bool,
) -> Result<ResponseEnvelope> {
    match client.request(method.clone(), path, body).await {
        Err(e) if refresh_on_auth_failure && e.is_auth_failure() => {
            tracing::warn!(error = %e, "session rejected, refreshing once");
            client.refresh_session().await?;
            Ok(client.request(method, path, body).await?)
        }
        other => Ok(other?),
    }
}

fn parse_method(raw: &str) -> Result<Method> {
    Method::from_bytes(raw.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("invalid HTTP method: {raw}"))
}
