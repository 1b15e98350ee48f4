use anyhow::{Context, Result};
use clap::Parser;
use hacg_reader::config::Config;
use hacg_reader::content::PageAnalyzer;
use hacg_reader::feed::{DomainResolver, FeedFetcher};
use hacg_reader::pipeline::{FetchController, PassOutcome, Pipeline, PipelineEvent};
use hacg_reader::util::{is_valid_domain, sanitize, truncate_to_width};
use hacg_reader::{http, Article};
use std::path::PathBuf;
use tokio::sync::mpsc;

const TITLE_WIDTH: usize = 72;

#[derive(Parser, Debug)]
#[command(
    name = "hacg-reader",
    about = "Follows a rotating-domain feed and lists the magnet links in each article"
)]
struct Args {
    /// Feed site host, e.g. example.com (skips the publisher lookup)
    #[arg(long)]
    domain: Option<String>,

    /// Config file (default ~/.config/hacg-reader/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of feed pages to fetch and analyze
    #[arg(long, default_value_t = 1)]
    pages: u32,

    /// Ignore system proxy settings
    #[arg(long)]
    no_proxy: bool,

    /// Print the article list as JSON
    #[arg(long)]
    json: bool,

    /// Print one article in full after fetching
    #[arg(long, value_name = "INDEX")]
    show: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = args.config.clone().or_else(Config::default_path);
    let mut config = match &config_path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    if args.no_proxy {
        config.use_proxy = false;
    }

    let client = http::build_client(&config.client_settings())
        .context("Failed to build HTTP client")?;

    let domain = match args.domain.as_deref().or(config.domain.as_deref()) {
        Some(domain) => {
            let domain = domain.trim().to_lowercase();
            if !is_valid_domain(&domain) {
                anyhow::bail!("'{domain}' is not a valid domain (expected something like example.com)");
            }
            domain
        }
        None => {
            eprintln!("Looking up current domain at {}", config.publisher_url);
            DomainResolver::with_publisher_url(client.clone(), config.publisher_url.clone())
                .resolve()
                .await
        }
    };

    if domain.is_empty() {
        eprintln!("Error: could not find the current domain on {}", config.publisher_url);
        eprintln!();
        eprintln!("Pass it by hand:");
        eprintln!("  hacg-reader --domain example.com");
        std::process::exit(1);
    }

    let fetcher = FeedFetcher::new(client.clone(), &domain).context("Failed to set up feed fetcher")?;
    let analyzer = PageAnalyzer::new(client);
    let (event_tx, event_rx) = mpsc::channel::<PipelineEvent>(64);
    let mut controller = FetchController::new(Pipeline::new(fetcher, analyzer, event_tx));

    let printer = tokio::spawn(report_progress(event_rx, args.json));

    for page in 1..=args.pages.max(1) {
        let before = controller.article_count();
        controller.start()?;

        let outcome = tokio::select! {
            outcome = controller.wait() => outcome?,
            _ = tokio::signal::ctrl_c() => {
                eprintln!("Cancelling...");
                controller.cancel().await?
            }
        };

        match outcome {
            Some(PassOutcome::Completed) if controller.article_count() == before => {
                tracing::info!(page, "Feed has no further articles");
                break;
            }
            Some(PassOutcome::Completed) => {}
            Some(PassOutcome::Cancelled) | Some(PassOutcome::Failed) | None => break,
        }
    }

    let articles = controller.articles();
    let selected = args.show.map(|index| controller.select(index));
    drop(controller);
    let _ = printer.await;

    if args.json {
        let json = match &selected {
            Some(article) => serde_json::to_string_pretty(article),
            None => serde_json::to_string_pretty(&articles),
        }
        .context("Failed to serialize articles")?;
        println!("{json}");
        return Ok(());
    }

    match selected {
        Some(article) => print_article(&article),
        None => print_list(&articles),
    }

    Ok(())
}

async fn report_progress(mut events: mpsc::Receiver<PipelineEvent>, quiet: bool) {
    while let Some(event) = events.recv().await {
        match event {
            PipelineEvent::FetchFailed { error } => eprintln!("Fetch failed: {error}"),
            _ if quiet => {}
            PipelineEvent::FeedFetched { total } => eprintln!("Analyzing {total} articles"),
            PipelineEvent::ArticleAnalyzed { progress, total } => {
                eprint!("\r{progress}/{total}");
                if progress == total {
                    eprintln!();
                }
            }
            PipelineEvent::FetchCancelled => eprintln!("\nFetch cancelled"),
            _ => {}
        }
    }
}

fn print_list(articles: &[Article]) {
    if articles.is_empty() {
        println!("No articles found.");
        return;
    }

    for (index, article) in articles.iter().enumerate() {
        let date = article
            .pub_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "----------".to_string());
        println!(
            "{index:>4}  {date}  {}  ({})",
            truncate_to_width(&sanitize(&article.title), TITLE_WIDTH),
            article.magnet_summary()
        );
    }
}

fn print_article(article: &Article) {
    if article.link.is_empty() {
        println!("No article at that index.");
        return;
    }

    println!("{}", sanitize(&article.title));
    println!("{}", article.link);
    if !article.creator.is_empty() {
        println!("by {}", sanitize(&article.creator));
    }
    if let Some(date) = article.pub_date {
        println!("{}", date.to_rfc2822());
    }
    if !article.categories.is_empty() {
        println!("[{}]", sanitize(&article.categories.join(", ")));
    }
    println!("{} comments", article.comment_count);
    println!();
    println!("{}", sanitize(article.preview.trim()));
    println!();
    println!("{}:", article.magnet_summary());
    for link in &article.magnet_links {
        println!("  {link}");
    }
}
