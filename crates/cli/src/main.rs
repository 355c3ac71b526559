//! # ipscope
//!
//! Resolves IPv4 addresses, subnets, domains and e-mail addresses and prints
//! one JSON report per query.

mod bootstrap;
mod di;

use anyhow::Context;
use clap::Parser;
use ipscope_domain::{CliOverrides, MxOptions, ResolutionOptions};
use std::io::{BufRead, BufReader};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "ipscope")]
#[command(version)]
#[command(about = "Concurrent resolution of IPs, subnets, domains and e-mail addresses")]
struct Cli {
    /// Queries to resolve (IPv4, CIDR subnet, domain or e-mail address)
    queries: Vec<String>,

    /// Read more queries from a file, one per line ("-" for stdin)
    #[arg(short = 'i', long)]
    input: Option<String>,

    /// Path to the TOML configuration file
    #[arg(short = 'c', long)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Resolve and verify MX records
    #[arg(long)]
    mx: bool,

    /// MX options, comma separated (e.g. SKIP_PITFALLS,VERIFY_DOMAIN); implies --mx
    #[arg(long)]
    mx_options: Option<String>,

    /// Reverse lookups for every usable address
    #[arg(long)]
    rdns: bool,

    /// TXT records
    #[arg(long)]
    txt: bool,

    /// Every stage with the default MX options
    #[arg(short = 'a', long)]
    all: bool,

    /// Upstream DNS server, repeatable ("ip" or "ip:port")
    #[arg(short = 'u', long = "upstream")]
    upstream: Vec<String>,

    /// Rotate the first upstream server per query
    #[arg(long)]
    round_robin: bool,

    /// Per-attempt timeout of the primary resolver profile in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Upper bound for concurrently running stage tasks
    #[arg(long)]
    max_pool_size: Option<usize>,

    /// File with more pitfall domains
    #[arg(long)]
    pitfall_file: Option<String>,

    /// Keep the pool size fixed
    #[arg(long)]
    no_auto_adjust: bool,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            log_level: self.log_level.clone(),
            max_pool_size: self.max_pool_size,
            resolver_timeout_ms: self.timeout_ms,
            round_robin: self.round_robin.then_some(true),
            upstream_servers: self.upstream.clone(),
            pitfall_file: self.pitfall_file.clone(),
        }
    }

    /// Stages asked for on the command line, on top of the configured defaults.
    fn options(&self, defaults: ResolutionOptions) -> anyhow::Result<ResolutionOptions> {
        let mut options = if self.all {
            ResolutionOptions::all()
        } else {
            defaults
        };

        if let Some(raw) = &self.mx_options {
            let mx_options: MxOptions = raw.parse().context("invalid --mx-options")?;
            options = options.with_mx(mx_options);
        } else if self.mx && !options.resolve_mx {
            options = options.with_mx(MxOptions::defaults());
        }
        if self.rdns {
            options = options.with_rdns();
        }
        if self.txt {
            options = options.with_txt();
        }
        Ok(options)
    }

    fn collect_queries(&self) -> anyhow::Result<Vec<String>> {
        let mut queries = self.queries.clone();
        if let Some(input) = &self.input {
            let reader: Box<dyn BufRead> = if input == "-" {
                Box::new(BufReader::new(std::io::stdin()))
            } else {
                let file = std::fs::File::open(input)
                    .with_context(|| format!("cannot open input file {input}"))?;
                Box::new(BufReader::new(file))
            };
            for line in reader.lines() {
                let line = line?;
                let line = line.trim();
                if !line.is_empty() && !line.starts_with('#') {
                    queries.push(line.to_string());
                }
            }
        }
        Ok(queries)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = bootstrap::load_config(cli.config.as_deref(), cli.overrides())?;
    bootstrap::init_logging(&config);
    bootstrap::log_config_summary(cli.config.as_deref(), &config);

    let queries = cli.collect_queries()?;
    if queries.is_empty() {
        warn!("No queries given");
        return Ok(());
    }

    let engine = di::build_engine(&config)?;
    di::start_jobs(&engine, &config).await;

    if cli.no_auto_adjust {
        engine.set_auto_adjust(false);
    }

    let options = cli.options(config.defaults.clone())?;
    engine.configure(options)?;
    let accepted = engine.submit(&queries)?;
    info!(queries = queries.len(), accepted, "Queries submitted");

    let reports = engine.get_many(&queries).await;

    let output = if cli.pretty {
        serde_json::to_string_pretty(&reports)?
    } else {
        serde_json::to_string(&reports)?
    };
    println!("{output}");

    if !engine.shutdown(config.pool.shutdown_timeout()).await {
        warn!("Shutdown timed out, pending work was cancelled");
    }

    Ok(())
}
