use super::super::args::*;
use super::open_client;
use crate::exit_codes::SUCCESS;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    let client = open_client(cli.credentials)?;

    match cli.cmd {
        Command::Setup(args) => super::setup::run(&client, args).await,
        Command::Refresh => super::setup::refresh(&client).await,
        Command::Status => super::status::run(&client).await,
        Command::RotateSecret(args) => super::manage::rotate_secret(&client, args).await,
        Command::Environment(args) => super::manage::environment(&client, args).await,
        Command::Clear => {
            client.clear().await?;
            println!("credentials cleared");
            Ok(SUCCESS)
        }
        Command::Request(args) => super::request::run(&client, args).await,
    }
}
