use anyhow::Context;
use clap::Parser;
use storyloom_pdf::cli::{Engine, StorybookArgs};
use storyloom_pdf::document::StoryDocument;
use storyloom_pdf::{draw, fetch, html};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storyloom_pdf=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = StorybookArgs::parse();

    let text = std::fs::read_to_string(&args.data_file)
        .with_context(|| format!("Failed to read {}", args.data_file.display()))?;
    let document = StoryDocument::from_json(&text)
        .with_context(|| format!("Failed to parse {}", args.data_file.display()))?;

    if document.pages.is_empty() {
        tracing::warn!("Story data contains no pages; nothing to do");
        return Ok(());
    }

    tracing::info!(
        pages = document.pages.len(),
        engine = ?args.engine,
        "Assembling storybook",
    );

    let client = fetch::build_client();
    let images = fetch::fetch_page_images(&client, &document.pages).await;
    let fetched = images.iter().filter(|i| i.is_some()).count();
    tracing::info!(fetched, total = images.len(), "Downloaded illustrations");

    match args.engine {
        Engine::Draw => draw::render_draw(&args, &document, &images, &args.output_file)?,
        Engine::Html => html::render_html(&args, &document, &images, &args.output_file).await?,
    }

    tracing::info!(output = %args.output_file.display(), "PDF created");
    Ok(())
}
