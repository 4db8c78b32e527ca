use anyhow::Context;
use city_scrapers::app::ports::HttpClientPort;
use city_scrapers::common::constants::CHI_BUILDINGS_SPIDER;
use city_scrapers::config::Config;
use city_scrapers::infra::http_client::ReqwestHttp;
use city_scrapers::logging;
use city_scrapers::pipeline::Pipeline;
use city_scrapers::spiders::supported_spiders;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{error, info, warn, Instrument};

#[derive(Parser)]
#[command(name = "city_scrapers")]
#[command(about = "Municipal meeting record scrapers")]
#[command(version)]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true, default_value = city_scrapers::config::DEFAULT_CONFIG_PATH)]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available spiders
    List,
    /// Run one or more spiders and write their JSON feeds
    Crawl {
        /// Spiders to run. Defaults to chi_buildings
        spiders: Vec<String>,
        /// Directory for feed files, overrides config
        #[arg(long)]
        output_dir: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let _guard = logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load_from(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config))?;

    match cli.command {
        Commands::List => {
            for name in supported_spiders() {
                println!("{name}");
            }
        }
        Commands::Crawl { spiders, output_dir } => {
            let spiders = if spiders.is_empty() {
                vec![CHI_BUILDINGS_SPIDER.to_string()]
            } else {
                spiders
            };
            let output_dir = output_dir.unwrap_or_else(|| config.crawl.output_dir.clone());
            let http: Arc<dyn HttpClientPort> = Arc::new(ReqwestHttp::new(&config.http)?);

            let mut failed = 0;
            for name in &spiders {
                let span = tracing::info_span!("Running spider", spider = %name);
                if let Err(e) = run_spider(name, &config, http.clone(), &output_dir)
                    .instrument(span)
                    .await
                {
                    error!("Crawl of {} failed: {:#}", name, e);
                    failed += 1;
                }
            }

            if failed > 0 {
                anyhow::bail!("{failed} of {} spiders failed", spiders.len());
            }
        }
    }
    Ok(())
}

async fn run_spider(
    name: &str,
    config: &Config,
    http: Arc<dyn HttpClientPort>,
    output_dir: &str,
) -> anyhow::Result<()> {
    let result = Pipeline::run_named(name, config, http, output_dir).await?;
    info!(
        "Crawl finished: {} events from {} requests, {} errors, feed {}",
        result.total_events,
        result.total_requests,
        result.errors.len(),
        result.output_file
    );
    for e in &result.errors {
        warn!("   - {}", e);
    }
    Ok(())
}
