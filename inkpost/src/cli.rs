use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Inkpost: publish and manage a markdown blog stored directly in cloud storage.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Endpoint of the article table service.
    #[arg(long, global = true, env = "INKPOST_TABLE_URL")]
    pub table_url: Option<String>,

    /// Name of the article table.
    #[arg(long, global = true, env = "INKPOST_TABLE_NAME", default_value = "blog")]
    pub table_name: String,

    /// Upload endpoint of the asset bucket.
    #[arg(long, global = true, env = "INKPOST_BUCKET_URL")]
    pub bucket_url: Option<String>,

    /// Public base URL under which uploaded assets are served.
    #[arg(long, global = true, env = "INKPOST_BUCKET_PUBLIC_URL")]
    pub bucket_public_url: Option<String>,

    /// Key prefix for uploaded assets.
    #[arg(long, global = true, env = "INKPOST_ASSET_PREFIX", default_value = "assets/")]
    pub asset_prefix: String,

    /// Endpoint of the token-exchange identity service.
    #[arg(long, global = true, env = "INKPOST_IDENTITY_URL")]
    pub identity_url: Option<String>,

    /// Role the exchanged credentials assume.
    #[arg(long, global = true, env = "INKPOST_ROLE_ARN")]
    pub role_arn: Option<String>,

    /// Identity provider the login tokens come from.
    #[arg(
        long,
        global = true,
        env = "INKPOST_PROVIDER_ID",
        default_value = "graph.facebook.com"
    )]
    pub provider_id: String,

    /// Login token obtained from the identity provider.
    #[arg(long, global = true, env = "INKPOST_IDENTITY_TOKEN", hide_env_values = true)]
    pub identity_token: Option<String>,

    /// Run against in-process stores instead of the remote services.
    #[arg(long, global = true)]
    pub memory: bool,

    /// Increase verbosity (use multiple times for more).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List published articles, newest first.
    List,
    /// Render the article list as an HTML fragment.
    Render,
    /// Publish a new article or republish an existing one.
    Publish(PublishArgs),
    /// Delete the article published at the given date.
    Delete(DeleteArgs),
    /// Upload an image and print the markdown reference for it.
    Upload(UploadArgs),
    /// Verify that the login token exchanges for write credentials.
    Login,
}

#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Article title. The slug is derived from it.
    #[arg(required = true)]
    pub title: String,

    /// Path to the markdown body. Reads stdin when omitted.
    #[arg(long, short)]
    pub body: Option<PathBuf>,

    /// Publish date in epoch milliseconds. Defaults to now; pass an
    /// existing article's date to republish it in place.
    #[arg(long, short)]
    pub date: Option<i64>,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Publish date of the article to delete, in epoch milliseconds.
    #[arg(required = true)]
    pub date: i64,
}

#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Path to the file to upload.
    #[arg(required = true)]
    pub file: PathBuf,

    /// Content type of the file. Guessed from the extension when omitted.
    #[arg(long, short)]
    pub content_type: Option<String>,
}
