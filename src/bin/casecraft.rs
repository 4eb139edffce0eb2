use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "casecraft", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Composite a foreground image onto the template surface and write a PNG.
    Composite(CompositeArgs),
    /// Generate an image from a text prompt via the configured inference API.
    Generate(GenerateArgs),
}

#[derive(Parser, Debug)]
struct CompositeArgs {
    /// Foreground image file (PNG or JPEG).
    #[arg(long)]
    image: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Template bounding box as "left,top,width,height" in viewport pixels.
    /// Defaults to a 240px-wide template centered in the container.
    #[arg(long, value_parser = parse_box)]
    template_box: Option<casecraft::BoundingBox>,

    /// Container bounding box as "left,top,width,height" in viewport pixels.
    #[arg(long, value_parser = parse_box)]
    container_box: casecraft::BoundingBox,

    /// Overlay position in container space.
    #[arg(long)]
    x: f64,

    #[arg(long)]
    y: f64,

    /// Overlay rendered width; defaults to a quarter of the image width.
    #[arg(long)]
    width: Option<f64>,

    /// Overlay rendered height; defaults to a quarter of the image height.
    #[arg(long)]
    height: Option<f64>,
}

#[derive(Parser, Debug)]
struct GenerateArgs {
    /// Text prompt for the inference API.
    #[arg(long)]
    prompt: String,

    /// Remote config JSON (endpoints; CASECRAFT_API_KEY overrides the key).
    #[arg(long)]
    config: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Composite(args) => cmd_composite(args).await,
        Command::Generate(args) => cmd_generate(args).await,
    }
}

fn parse_box(s: &str) -> Result<casecraft::BoundingBox, String> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>().map_err(|e| e.to_string()))
        .collect::<Result<_, _>>()?;
    let &[left, top, width, height] = parts.as_slice() else {
        return Err("expected left,top,width,height".to_string());
    };
    Ok(casecraft::BoundingBox::new(left, top, width, height))
}

fn write_png(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("write png '{}'", path.display()))?;
    Ok(())
}

async fn cmd_composite(args: CompositeArgs) -> anyhow::Result<()> {
    let bytes =
        std::fs::read(&args.image).with_context(|| format!("read '{}'", args.image.display()))?;
    let decoded = image::load_from_memory(&bytes).context("decode foreground image")?;
    let (pixel_width, pixel_height) = image::GenericImageView::dimensions(&decoded);

    let resource = casecraft::ImageResource {
        source_kind: casecraft::ImageSourceKind::Uploaded,
        pixel_width,
        pixel_height,
        bytes: bytes.into(),
        url: args.image.display().to_string(),
    };
    let placement = casecraft::OverlayPlacement {
        position: casecraft::Point::new(args.x, args.y),
        size: casecraft::Size::new(
            args.width.unwrap_or(f64::from(pixel_width) / 4.0),
            args.height.unwrap_or(f64::from(pixel_height) / 4.0),
        ),
    };

    let template_box = args
        .template_box
        .unwrap_or_else(|| casecraft::centered_template_box(args.container_box, 240.0));

    let artifact = casecraft::composite(
        &casecraft::FixedGeometry(template_box),
        &casecraft::FixedGeometry(args.container_box),
        &placement,
        &resource,
    )
    .await?;

    write_png(&args.out, &artifact.png)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

async fn cmd_generate(args: GenerateArgs) -> anyhow::Result<()> {
    use casecraft::GenerationClient as _;

    let config = casecraft::RemoteConfig::from_json_file(&args.config)?;
    let client = casecraft::HttpGenerationClient::new(&config)?;
    let response = client.generate(&args.prompt).await?;

    let payload = response
        .image_url
        .split_once(',')
        .map(|(_, data)| data.to_string())
        .context("generation response is not a data URI")?;
    let bytes = {
        use base64::Engine as _;
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .context("decode generated image payload")?
    };

    write_png(&args.out, &bytes)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}
