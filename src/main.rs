use clap::Parser;
use shelf_crawl::{export, Crawl, CrawlerConfig};

mod args;
use args::Args;

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    // Parse command-line arguments
    let args = Args::parse();

    // Load configuration, then fold the command line over it
    let mut config = match &args.config {
        Some(path) => match CrawlerConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                ::log::error!("Failed to load configuration: {}", e);
                std::process::exit(1);
            }
        },
        None => CrawlerConfig::default(),
    };
    args.apply(&mut config);

    ::log::info!("Starting catalog crawl of {}", config.catalog_url);
    println!("Note: crawling requires a WebDriver server (e.g., ChromeDriver).");
    println!(
        "Set WEBDRIVER_URL environment variable if not using the default {}",
        config.webdriver_url
    );

    let links_path = config.links_path.clone();
    let records_path = config.records_path.clone();
    let links_only = config.links_only;

    let crawl = Crawl::new(config);

    // A first Ctrl-C stops the crawl at the next safe point
    let cancel = crawl.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ::log::info!("Interrupt received, finishing up");
            cancel.cancel();
        }
    });

    let start_time = std::time::Instant::now();
    let outcome = match crawl.run().await {
        Ok(outcome) => outcome,
        Err(e) => {
            ::log::error!("Failed to run the crawl: {}", e);
            std::process::exit(1);
        }
    };

    if let Some(reason) = &outcome.aborted {
        ::log::warn!("Crawl ended early: {}", reason);
    }

    if let Err(e) = export::write_references(&links_path, &outcome.references) {
        ::log::error!("{}", e);
        std::process::exit(1);
    }
    if !links_only {
        if let Err(e) = export::write_records(&records_path, &outcome.records) {
            ::log::error!("{}", e);
            std::process::exit(1);
        }
    }

    let duration = start_time.elapsed();
    ::log::info!(
        "Crawling complete - {} references and {} records in {:.2} seconds",
        outcome.references.len(),
        outcome.records.len(),
        duration.as_secs_f64()
    );
}
