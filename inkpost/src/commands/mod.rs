use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use mime::Mime;
use tracing::info;

use inkpost_core::article::Timestamp;
use inkpost_core::session::Draft;
use inkpost_core::store::AssetUpload;
use inkpost_core::markdown::image_reference;

use crate::AppContext;
use crate::cli::{DeleteArgs, PublishArgs, UploadArgs};

// --- Handler Functions ---

pub async fn handle_list(cx: &mut AppContext) -> Result<()> {
    cx.client.load_articles().await?;

    let articles = &cx.client.state().articles;
    if articles.is_empty() {
        println!("No articles published yet.");
        return Ok(());
    }
    for article in articles.iter() {
        println!(
            "{:>15}  {:<30}  {}",
            article.publish_date.as_millis(),
            article.slug,
            article.title
        );
    }
    Ok(())
}

pub async fn handle_render(cx: &mut AppContext) -> Result<()> {
    cx.client.load_articles().await?;
    println!("{}", cx.client.render_html());
    Ok(())
}

pub async fn handle_publish(args: PublishArgs, cx: &mut AppContext) -> Result<()> {
    let body = read_body(args.body.as_deref())?;

    // Load first so a republish of an existing slug patches in place.
    cx.client.load_articles().await?;
    cx.client.open_editor(Draft {
        title: args.title,
        publish_date: args.date.map(Timestamp::from_millis),
        body,
    })?;

    match cx.client.publish().await? {
        Some(pending) => {
            info!(slug = %pending.slug(), "Republishing existing article");
            pending.acknowledged().await?;
            println!("Republished.");
        }
        None => println!("Published."),
    }
    Ok(())
}

pub async fn handle_delete(args: DeleteArgs, cx: &mut AppContext) -> Result<()> {
    cx.client.load_articles().await?;
    cx.client.delete(Timestamp::from_millis(args.date)).await?;
    println!("Deleted article published at {}.", args.date);
    Ok(())
}

pub async fn handle_upload(args: UploadArgs, cx: &mut AppContext) -> Result<()> {
    let file_name = args
        .file
        .file_name()
        .and_then(|name| name.to_str())
        .context("File path has no usable file name")?
        .to_string();
    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let content_type = match args.content_type.as_deref() {
        Some(raw) => raw
            .parse::<Mime>()
            .with_context(|| format!("Invalid content type '{}'", raw))?,
        None => guess_content_type(&args.file),
    };

    // Uploads require an open editor; a scratch draft stands in for one.
    cx.client.new_post()?;
    let url = cx
        .client
        .upload_asset(AssetUpload {
            file_name,
            content_type,
            bytes,
        })
        .await?;
    cx.client.cancel_edit()?;

    println!("{}", url);
    println!();
    println!("Markdown reference:{}", image_reference(&url));
    Ok(())
}

pub async fn handle_login(cx: &mut AppContext) -> Result<()> {
    // The token was already exchanged while building the context; this
    // command just reports the outcome.
    if cx.client.is_admin() {
        println!("Login succeeded; write credentials are in place.");
        Ok(())
    } else {
        anyhow::bail!("Not logged in. Pass --identity-token or set INKPOST_IDENTITY_TOKEN.");
    }
}

fn read_body(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut body = String::new();
            std::io::stdin()
                .read_to_string(&mut body)
                .context("Failed to read article body from stdin")?;
            Ok(body)
        }
    }
}

fn guess_content_type(path: &Path) -> Mime {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("png") => mime::IMAGE_PNG,
        Some("jpg") | Some("jpeg") => mime::IMAGE_JPEG,
        Some("gif") => mime::IMAGE_GIF,
        Some("svg") => mime::IMAGE_SVG,
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn content_type_guesses_are_case_insensitive() {
        assert_eq!(guess_content_type(&PathBuf::from("a/photo.PNG")), mime::IMAGE_PNG);
        assert_eq!(guess_content_type(&PathBuf::from("pic.jpeg")), mime::IMAGE_JPEG);
        assert_eq!(
            guess_content_type(&PathBuf::from("data.bin")),
            mime::APPLICATION_OCTET_STREAM
        );
    }
}
