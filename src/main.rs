use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use rtsp_preview::api::simple::init_tracing;
use rtsp_preview::bridge::client::HttpBridgeClient;
use rtsp_preview::config::AppConfig;
use rtsp_preview::engine::blobs::BlobStore;
use rtsp_preview::engine::controller::{Backends, PreviewSessionController};
use rtsp_preview::engine::playback::ManifestProbePlayback;
use rtsp_preview::engine::surface::MemorySurface;
use rtsp_preview::server::handler::BridgeServer;
use rtsp_preview::server::worker::FfmpegLauncher;
use rtsp_preview::source::direct::SniffingLoader;
use rtsp_preview::source::http_source::HttpSource;
use rtsp_preview::source::local_file::LocalFile;

#[derive(Debug, Parser)]
#[command(
    name = "rtsp-preview",
    version,
    about = "Media preview controller and RTSP-to-HLS bridge"
)]
struct Cli {
    /// TOML file with [preview] and [bridge] tables.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the bridge service.
    Serve(ServeArgs),
    /// Resolve a remote URL the way the preview widget would and print the result.
    Probe(ProbeArgs),
    /// Preview a local file and print the result.
    File(FileArgs),
    /// Start a bridge session for an RTSP URL, play it until ctrl-c, then stop it.
    Rtsp(RtspArgs),
}

#[derive(Debug, Args)]
struct ServeArgs {
    /// Address to bind, overrides the config file.
    #[arg(long)]
    bind: Option<String>,

    /// Directory for per-session HLS output.
    #[arg(long)]
    output_dir: Option<String>,

    /// ffmpeg executable.
    #[arg(long)]
    ffmpeg: Option<String>,
}

#[derive(Debug, Args)]
struct ProbeArgs {
    url: String,
}

#[derive(Debug, Args)]
struct FileArgs {
    path: PathBuf,
}

#[derive(Debug, Args)]
struct RtspArgs {
    url: String,
}

fn build_controller(cfg: &AppConfig) -> Result<(PreviewSessionController, Arc<MemorySurface>)> {
    let surface = Arc::new(MemorySurface::new());
    let backends = Backends {
        surface: surface.clone(),
        fetcher: Arc::new(HttpSource::new(&cfg.preview)?),
        loader: Arc::new(SniffingLoader::new(&cfg.preview)?),
        bridge: Arc::new(HttpBridgeClient::new(&cfg.preview)?),
        playback: Arc::new(ManifestProbePlayback::new(&cfg.preview)?),
        blobs: Arc::new(BlobStore::new()),
    };
    let controller = PreviewSessionController::new(&cfg.preview, backends)?;
    Ok((controller, surface))
}

fn print_outcome(controller: &PreviewSessionController, surface: &MemorySurface) -> Result<()> {
    println!("status: {}", surface.status());
    match surface.mounted() {
        Some(element) => println!("mounted: {:?}", element),
        None => println!("mounted: (no preview)"),
    }
    println!("{}", serde_json::to_string_pretty(&controller.state())?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut cfg = match &cli.config {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::default(),
    };

    match cli.command {
        Command::Serve(args) => {
            if let Some(bind) = args.bind {
                cfg.bridge.bind_addr = bind;
            }
            if let Some(dir) = args.output_dir {
                cfg.bridge.output_dir = dir;
            }
            if let Some(ffmpeg) = args.ffmpeg {
                cfg.bridge.ffmpeg_path = ffmpeg;
            }
            let launcher = Arc::new(FfmpegLauncher::new(cfg.bridge.clone()));
            let server = BridgeServer::start(&cfg.bridge, launcher).await?;
            println!("bridge serving on {}", server.origin());
            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for ctrl-c")?;
            server.shutdown();
        }
        Command::Probe(args) => {
            let (controller, surface) = build_controller(&cfg)?;
            controller.load_url(&args.url).await?;
            print_outcome(&controller, &surface)?;
        }
        Command::File(args) => {
            let (controller, surface) = build_controller(&cfg)?;
            let file = LocalFile::open(&args.path).await?;
            controller.select_file(file).await;
            print_outcome(&controller, &surface)?;
        }
        Command::Rtsp(args) => {
            let (controller, surface) = build_controller(&cfg)?;
            controller.connect_rtsp(&args.url).await?;
            print_outcome(&controller, &surface)?;
            if controller.state().session.active().is_some() {
                tokio::signal::ctrl_c()
                    .await
                    .context("failed to listen for ctrl-c")?;
                controller.stop().await;
                print_outcome(&controller, &surface)?;
            }
        }
    }

    Ok(())
}
