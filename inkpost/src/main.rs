use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use inkpost::cli::{Cli, Commands};
use inkpost::{AppContext, commands};
use inkpost_core::BlogClient;
use inkpost_core::auth::{CredentialsCell, IdentityBroker, StaticBroker, WebIdentityToken};
use inkpost_core::store::{ArticleStore, AssetStore, MemoryArticleStore, MemoryAssetStore};
use inkpost_remote::{BucketClient, IdentityClient, TableClient};
use inkpost_remote::assets::BucketConfig;
use inkpost_remote::identity::IdentityConfig;
use inkpost_remote::table::TableConfig;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let mut cx = AppContext {
        client: build_client(&cli)?,
    };

    // Writes need credentials; exchange the login token up front.
    if requires_admin(&cli.command) || matches!(&cli.command, Commands::Login) {
        let token = login_token(&cli)?;
        cx.client.login(&token).await?;
    }

    match cli.command {
        Commands::List => commands::handle_list(&mut cx).await?,
        Commands::Render => commands::handle_render(&mut cx).await?,
        Commands::Publish(args) => commands::handle_publish(args, &mut cx).await?,
        Commands::Delete(args) => commands::handle_delete(args, &mut cx).await?,
        Commands::Upload(args) => commands::handle_upload(args, &mut cx).await?,
        Commands::Login => commands::handle_login(&mut cx).await?,
    }

    Ok(())
}

fn init_tracing(verbose: u8, quiet: bool) {
    let default_level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn requires_admin(command: &Commands) -> bool {
    matches!(
        command,
        Commands::Publish(_) | Commands::Delete(_) | Commands::Upload(_)
    )
}

fn login_token(cli: &Cli) -> Result<WebIdentityToken> {
    match &cli.identity_token {
        Some(token) => Ok(WebIdentityToken::new(token.clone())),
        // The in-process broker accepts anything.
        None if cli.memory => Ok(WebIdentityToken::new("local")),
        None => bail!(
            "This command needs write credentials. Pass --identity-token or set INKPOST_IDENTITY_TOKEN."
        ),
    }
}

fn build_client(cli: &Cli) -> Result<BlogClient> {
    if cli.memory {
        let articles = Arc::new(MemoryArticleStore::new());
        return Ok(BlogClient::new(
            articles.clone(),
            articles,
            Arc::new(MemoryAssetStore::new("https://assets.invalid")),
            Arc::new(StaticBroker::default()),
            CredentialsCell::new(),
            cli.asset_prefix.clone(),
        ));
    }

    let table_url = cli
        .table_url
        .as_deref()
        .context("Missing --table-url (or INKPOST_TABLE_URL)")?;
    let bucket_url = cli
        .bucket_url
        .as_deref()
        .context("Missing --bucket-url (or INKPOST_BUCKET_URL)")?;
    let bucket_public_url = cli
        .bucket_public_url
        .as_deref()
        .unwrap_or(bucket_url);
    let identity_url = cli
        .identity_url
        .as_deref()
        .context("Missing --identity-url (or INKPOST_IDENTITY_URL)")?;
    let role_arn = cli
        .role_arn
        .as_deref()
        .context("Missing --role-arn (or INKPOST_ROLE_ARN)")?;

    // One credentials cell is shared by the login flow and every signed
    // client, so a successful exchange takes effect everywhere at once.
    let credentials = CredentialsCell::new();

    let table_config = TableConfig::new(table_url, &cli.table_name)?;
    let reader: Arc<dyn ArticleStore> = Arc::new(TableClient::anonymous(table_config.clone())?);
    let writer: Arc<dyn ArticleStore> =
        Arc::new(TableClient::new(table_config, credentials.clone())?);

    let bucket_config = BucketConfig::new(bucket_url, bucket_public_url)?;
    let assets: Arc<dyn AssetStore> =
        Arc::new(BucketClient::new(bucket_config, credentials.clone())?);

    let identity_config = IdentityConfig::new(identity_url, role_arn, &cli.provider_id)?;
    let broker: Arc<dyn IdentityBroker> = Arc::new(IdentityClient::new(identity_config)?);

    Ok(BlogClient::new(
        reader,
        writer,
        assets,
        broker,
        credentials,
        cli.asset_prefix.clone(),
    ))
}
