use ai_movie_maker::config::Config;
use ai_movie_maker::init;
use ai_movie_maker::pipeline::run_pipeline;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Generates a short movie from a text prompt.
#[derive(Parser, Debug)]
#[command(name = "ai-movie-maker")]
struct Args {
    /// The movie idea to generate from.
    #[arg(long, short = 'p')]
    prompt: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Missing --prompt is a usage error; clap exits nonzero on its own.
    let args = Args::parse();

    let cfg = match Config::load("config.json").await {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("{}", err.diagnostic());
            std::process::exit(err.exit_code());
        }
    };

    if let Err(err) = init::ensure_directories().await {
        error!("{}", err.diagnostic());
        std::process::exit(err.exit_code());
    }
    if !init::check_ffmpeg().await {
        warn!("ffmpeg not found in PATH; concatenation and mixing will fail");
    }

    let client = match reqwest::Client::builder().build() {
        Ok(client) => client,
        Err(err) => {
            error!("failed to build HTTP client: {}", err);
            std::process::exit(1);
        }
    };

    match run_pipeline(&client, &cfg, &args.prompt).await {
        Ok(final_video) => {
            info!("movie complete: {}", final_video.display());
        }
        Err(err) => {
            error!("error creating movie: {}", err.diagnostic());
            std::process::exit(err.exit_code());
        }
    }
}
