use clap::{Parser, Subcommand};
use image_template::{ImageRequest, Loading, config};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// A `key=value` pair from the command line.
fn parse_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got {raw:?}")),
    }
}

#[derive(Parser)]
#[command(name = "image-template")]
#[command(about = "Responsive <img> markup for asset-server and image-fetch URLs")]
#[command(long_about = "\
Responsive <img> markup for asset-server and image-fetch URLs

URLs on a configured asset server are resized with ?w=<width>&h=<height>
and embedded, percent-encoded, into the image-fetch URL. Any other URL is
resized with w_<width>,h_<height> fetch tokens.

Run 'image-template gen-config' to generate a documented template.toml.")]
#[command(version)]
struct Cli {
    /// Config file (merged over the stock defaults; missing file = defaults)
    #[arg(long, default_value = "template.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct RenderArgs {
    /// Image URL or absolute path
    #[arg(long)]
    url: String,

    /// Alt text
    #[arg(long, default_value = "")]
    alt: String,

    /// Width in pixels
    #[arg(long)]
    width: String,

    /// Height in pixels
    #[arg(long)]
    height: String,

    /// Also reference a 2x variant via srcset/data-srcset
    #[arg(long)]
    hi_def: bool,

    #[arg(long)]
    id: Option<String>,

    #[arg(long)]
    title: Option<String>,

    /// Classes appended after the lazy-load class
    #[arg(long = "class")]
    extra_classes: Option<String>,

    /// Value of the sizes attribute
    #[arg(long)]
    sizes: Option<String>,

    /// Loading strategy: lazy, eager or auto
    #[arg(long, default_value = "lazy")]
    loading: Loading,

    /// Passthrough attribute, repeatable (--attr data-foo=bar)
    #[arg(long = "attr", value_parser = parse_pair)]
    attributes: Vec<(String, String)>,

    /// Extra fetch-service token, repeatable (--filter c=fill)
    #[arg(long = "filter", value_parser = parse_pair)]
    filters: Vec<(String, String)>,

    /// Print the attributes as a JSON object instead of markup
    #[arg(long)]
    json: bool,
}

impl RenderArgs {
    fn into_request(self) -> ImageRequest {
        ImageRequest {
            url: self.url,
            alt: self.alt,
            width: self.width,
            height: self.height,
            hi_def: self.hi_def,
            id: self.id,
            title: self.title,
            extra_classes: self.extra_classes,
            sizes: self.sizes,
            loading: self.loading,
            filters: self.filters,
            attributes: self.attributes,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Render an <img> tag
    Render(RenderArgs),
    /// Print a stock template.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Render(args) => {
            let template_config = config::load_config(&cli.config)?;
            tracing::debug!(config = %cli.config.display(), "loaded template config");
            let json = args.json;
            let request = args.into_request();
            if json {
                let attrs = image_template::attributes(&request, &template_config)?;
                println!("{}", serde_json::to_string_pretty(&attrs)?);
            } else {
                let markup = image_template::build(&request, &template_config)?;
                println!("{}", markup.into_string());
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
