use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;
use clap::Parser;
use owo_colors::OwoColorize;
use stash_core::{ExtractorConfig, IngestConfig, Ingestor, fetch_file, fetch_stdin, validate_url};
use tracing_subscriber::EnvFilter;

mod echo;

use echo::{
    format_size, print_banner, print_detail, print_info, print_record_summary, print_step, print_success,
    print_warning,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Output format for the article record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Json,
    Text,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" | "txt" => Ok(Self::Text),
            _ => Err(format!("Invalid format: {}. Valid options: json, text", s)),
        }
    }
}

/// Save a web page as a read-it-later article record
#[derive(Parser, Debug)]
#[command(name = "stash")]
#[command(author = "Stash Contributors")]
#[command(version)]
#[command(about = "Fetch a web page and print its article record", long_about = None)]
struct Args {
    /// URL of the page to save
    #[arg(value_name = "URL")]
    url: String,

    /// Read HTML from a local file, or "-" for stdin, instead of fetching
    #[arg(long, value_name = "FILE")]
    html: Option<String>,

    /// Output format (json, text)
    #[arg(short, long, default_value = "json", value_name = "FORMAT")]
    format: OutputFormat,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// HTTP timeout in seconds
    #[arg(long, default_value = "30", value_name = "SECS")]
    timeout: u64,

    /// Custom User-Agent for HTTP requests
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,

    /// Reading speed used for the reading time estimate
    #[arg(long, default_value = "200", value_name = "NUM")]
    words_per_minute: u32,

    /// Maximum excerpt length in characters
    #[arg(long, default_value = "300", value_name = "NUM")]
    excerpt_length: usize,

    /// Leave tables out of the article text
    #[arg(long)]
    no_tables: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn ingest_config(&self) -> IngestConfig {
        let mut builder = IngestConfig::builder()
            .timeout(self.timeout)
            .words_per_minute(self.words_per_minute)
            .excerpt_length(self.excerpt_length)
            .extractor_config(ExtractorConfig::builder().include_tables(!self.no_tables).build());

        if let Some(user_agent) = &self.user_agent {
            builder = builder.user_agent(user_agent.as_str());
        }

        builder.build()
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    if args.verbose {
        print_banner();
        print_info("Debug logging enabled");
        eprintln!();
    }

    if let Err(err) = validate_url(&args.url) {
        print_warning(&format!("{err}; the record will have no content"));
    }

    let ingestor = Ingestor::new(args.ingest_config()).context("Failed to build HTTP client")?;

    let record = match args.html.as_deref() {
        Some(source) => {
            let html = if source == "-" {
                print_step(1, 2, "Reading HTML from stdin");
                fetch_stdin().context("Failed to read from stdin")?
            } else {
                print_step(1, 2, &format!("Reading HTML from {}", source.bright_white()));
                fetch_file(source).with_context(|| format!("Failed to read file: {}", source))?
            };

            if args.verbose {
                print_detail("Size", &format_size(html.len()));
            }

            ingestor.ingest_html(&args.url, &html)
        }
        None => {
            print_step(1, 2, &format!("Fetching {}", args.url.bright_white().underline()));
            ingestor.ingest(&args.url).await
        }
    };

    print_step(2, 2, "Extracting article");
    if record.content.is_none() {
        print_warning("No readable content found, saving as a bookmark");
    }
    if args.verbose {
        print_record_summary(&record);
    }

    let output = match args.format {
        OutputFormat::Json => {
            let json = record.to_json().context("Failed to serialize record")?;
            serde_json::to_string_pretty(&json).context("Failed to serialize record")? + "\n"
        }
        OutputFormat::Text => record.to_text(),
    };

    match args.output {
        Some(path) => {
            fs::write(&path, output).with_context(|| format!("Failed to write to file: {}", path.display()))?;
            print_success(&format!("Output written to {}", path.display().bright_white()));
        }
        None => {
            print!("{}", output);
        }
    }

    Ok(())
}
