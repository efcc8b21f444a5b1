use clap::Parser;
use shelf_crawl::CrawlerConfig;

#[derive(Parser, Debug)]
#[command(name = "shelf-crawl")]
#[command(about = "Catalog crawler that collects product links and details")]
#[command(version)]
pub struct Args {
    /// Path to a JSON configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// ZIP code used to bind the session to a store
    #[arg(short, long)]
    pub zip: Option<String>,

    /// Categories to crawl instead of the configured list
    #[arg(long, value_delimiter = ',')]
    pub categories: Option<Vec<String>>,

    /// Collect product links only and skip detail extraction
    #[arg(long)]
    pub links_only: bool,

    /// Run the browser headless
    #[arg(long)]
    pub headless: bool,

    /// WebDriver server URL
    #[arg(long)]
    pub webdriver_url: Option<String>,

    /// Output file for the collected product links
    #[arg(long)]
    pub links_out: Option<String>,

    /// Output file for the extracted product details
    #[arg(long)]
    pub records_out: Option<String>,
}

impl Args {
    /// Folds the command line over the loaded configuration
    pub fn apply(&self, config: &mut CrawlerConfig) {
        if let Some(zip) = &self.zip {
            config.store_zip = Some(zip.clone());
        }
        if let Some(categories) = &self.categories {
            config.categories = categories.clone();
        }
        if self.links_only {
            config.links_only = true;
        }
        if self.headless {
            config.headless = true;
        }
        if let Some(url) = &self.webdriver_url {
            config.webdriver_url = url.clone();
        }
        if let Some(path) = &self.links_out {
            config.links_path = path.clone();
        }
        if let Some(path) = &self.records_out {
            config.records_path = path.clone();
        }
    }
}
