use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use keyword_clipper::api::ApiServer;
use keyword_clipper::{ClipJob, ClipPipeline, Config, RunTracker};

fn config_arg() -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .value_name("FILE")
        .help("Path to a TOML configuration file")
}

fn cli() -> Command {
    Command::new("keyword-clipper")
        .version(env!("CARGO_PKG_VERSION"))
        .author("TigreRoll")
        .about("Cut video clips around every mention of a keyword")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("serve")
                .about("Run the web front end and JSON API")
                .arg(
                    Arg::new("host")
                        .long("host")
                        .value_name("HOST")
                        .help("Address to listen on")
                )
                .arg(
                    Arg::new("port")
                        .short('p')
                        .long("port")
                        .value_name("PORT")
                        .help("Port to listen on")
                        .value_parser(clap::value_parser!(u16))
                )
                .arg(config_arg())
        )
        .subcommand(
            Command::new("run")
                .about("Process one video and exit")
                .arg(
                    Arg::new("source")
                        .short('s')
                        .long("source")
                        .value_name("URL")
                        .help("Video URL or locator understood by the fetcher")
                        .required(true)
                )
                .arg(
                    Arg::new("keyword")
                        .short('k')
                        .long("keyword")
                        .value_name("KEYWORD")
                        .help("Word or phrase to clip around")
                        .required(true)
                )
                .arg(
                    Arg::new("subtitles")
                        .long("subtitles")
                        .help("Burn subtitles into the clips")
                        .action(ArgAction::SetTrue)
                )
                .arg(
                    Arg::new("duration")
                        .short('d')
                        .long("duration")
                        .value_name("SECONDS")
                        .help("Clip length in seconds")
                        .value_parser(clap::value_parser!(u32))
                )
                .arg(config_arg())
        )
}

fn load_config(matches: &ArgMatches) -> Result<Config> {
    let path = matches.get_one::<String>("config").map(PathBuf::from);
    let config = Config::load(path.as_deref())?;
    config.validate()?;
    Ok(config)
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("keyword_clipper={},tower_http=info,warn", config.output.log_level))
    });

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("serve", sub)) => serve(sub).await,
        Some(("run", sub)) => run_once(sub).await,
        _ => unreachable!("clap requires a subcommand"),
    }
}

async fn serve(matches: &ArgMatches) -> Result<()> {
    let mut config = load_config(matches)?;
    if let Some(host) = matches.get_one::<String>("host") {
        config.server.host = host.clone();
    }
    if let Some(port) = matches.get_one::<u16>("port") {
        config.server.port = *port;
    }

    init_logging(&config);
    info!("🚀 Keyword Clipper starting...");
    info!("{}", config.summary());

    let host = config.server.host.clone();
    let port = config.server.port;
    let pipeline = Arc::new(ClipPipeline::from_config(config));

    ApiServer::new(pipeline, RunTracker::new(), host, port).start().await
}

async fn run_once(matches: &ArgMatches) -> Result<()> {
    let config = load_config(matches)?;
    init_logging(&config);

    let source = matches
        .get_one::<String>("source")
        .context("--source is required")?;
    let keyword = matches
        .get_one::<String>("keyword")
        .context("--keyword is required")?;
    let duration = matches
        .get_one::<u32>("duration")
        .copied()
        .unwrap_or(config.clips.default_duration_seconds);

    let job = ClipJob::new(source, keyword, matches.get_flag("subtitles"), duration)?;
    let pipeline = ClipPipeline::from_config(config);
    let tracker = RunTracker::new();

    match pipeline.submit(&tracker, &job).await {
        Ok(report) => {
            info!("✅ {} clips written to {}", report.clips.len(), report.output_dir.display());
            for clip in &report.clips {
                println!("{}", report.output_dir.join(clip).display());
            }
            Ok(())
        }
        Err(e) => {
            error!("❌ Run failed: {}", e);
            Err(e.into())
        }
    }
}
