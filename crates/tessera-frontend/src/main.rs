use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use tracing::info;

use tessera_frontend::telemetry::init_tracing;
use tessera_frontend::{FrontendConfig, FrontendSession};

struct Args {
    fixture: PathBuf,
    slug: String,
    query: String,
    mount: bool,
}

fn print_usage() {
    eprintln!("Usage: tessera-render <FIXTURE.json> <SLUG> [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --query, -q QS     URL query string for tables (e.g. 'orders.page=2')");
    eprintln!("  --mount            Render through a live mount and wait for it to settle");
    eprintln!("  --help, -h         Show this help message");
    eprintln!();
    eprintln!("Environment: TESSERA_ENDPOINT_BASE_URL, TESSERA_PAGES_COLLECTION,");
    eprintln!("  TESSERA_MAX_REFERENCE_DEPTH, TESSERA_DEFAULT_TABLE_LIMIT, TESSERA_LOG");
}

fn parse_args() -> Result<Args> {
    let mut args = std::env::args().skip(1);
    let mut positional = Vec::new();
    let mut query = String::new();
    let mut mount = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--query" | "-q" => {
                query = args
                    .next()
                    .ok_or_else(|| anyhow!("--query requires a query string"))?;
            }
            "--mount" => mount = true,
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other if other.starts_with("--") => return Err(anyhow!("Unknown option '{other}'")),
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    let (Some(fixture), Some(slug)) = (positional.next(), positional.next()) else {
        print_usage();
        return Err(anyhow!("expected a fixture path and a page slug"));
    };
    Ok(Args {
        fixture: PathBuf::from(fixture),
        slug,
        query: query.trim_start_matches('?').to_string(),
        mount,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args()?;
    let config = FrontendConfig::from_env()?.with_fixture(args.fixture);
    init_tracing(config.log_filter.as_deref())?;

    let session = FrontendSession::new(config).await?;
    let nodes = if args.mount {
        let page = session.mount_page(&args.slug, &args.query).await?;
        let nodes = page.render_settled().await;
        info!(url = %page.url_query(), tables = ?page.table_paths(), "Mounted page settled");
        nodes
    } else {
        session.render_page(&args.slug, &args.query).await?
    };

    let json = serde_json::to_string_pretty(&nodes).context("Failed to serialize render tree")?;
    println!("{json}");
    Ok(())
}
