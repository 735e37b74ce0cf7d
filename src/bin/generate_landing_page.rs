use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use mangalp::cli::GeneratorOptions;
use mangalp::config::{GeneratorConfig, setup_logging};
use mangalp::export::LandingPage;
use mangalp::model::MangaInput;
use tracing::{info, warn};

/// Generate a manga landing page without the web UI.
///
///   generate_landing_page brief.json --out-dir ./pages
#[derive(Parser, Debug)]
#[command(name = "generate_landing_page")]
struct Args {
    /// JSON file with the product brief (productName, productDescription, ...)
    input: PathBuf,

    /// Directory the landing page is written to, as `<product name>.html`
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Also write the generated script (panels included) to this JSON file
    #[arg(long)]
    script_out: Option<PathBuf>,

    /// Only write the script, don't draw any panels
    #[arg(long)]
    skip_images: bool,

    /// Enable debug logging
    #[arg(long, env = "MANGALP_DEBUG")]
    debug: bool,

    #[command(flatten)]
    generator: GeneratorOptions,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.debug).map_err(|err| anyhow!("Failed to set up logging: {err}"))?;

    let raw = fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let input: MangaInput = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse brief in {}", args.input.display()))?;
    input.validate()?;

    let config = GeneratorConfig::from_options(&args.generator)?;
    let (scripts, orchestrator) = config.build()?;

    let mut comic = scripts.generate(&input).await?;
    info!("Script ready: {}", comic.title);

    if args.skip_images {
        info!("Skipping panel images");
    } else if orchestrator.renderer().is_configured() {
        let panels = std::mem::take(&mut comic.panels);
        comic = comic.with_panels(orchestrator.render_all(panels).await);
        let drawn = comic
            .panels
            .iter()
            .filter(|panel| panel.image_url.is_some())
            .count();
        info!("Drew {drawn} of {} panels", comic.panels.len());
    } else {
        warn!("No image API key set, the page will show panel descriptions instead");
    }

    if let Some(script_out) = &args.script_out {
        let json = serde_json::to_string_pretty(&comic)?;
        fs::write(script_out, json)
            .with_context(|| format!("Failed to write {}", script_out.display()))?;
        info!("Wrote script to {}", script_out.display());
    }

    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("Failed to create {}", args.out_dir.display()))?;
    let page = LandingPage::new(&comic, &input.product_name, &input.product_description);
    let output = args.out_dir.join(page.file_name());
    page.write_to(&output)?;
    println!("{}", output.display());
    Ok(())
}
