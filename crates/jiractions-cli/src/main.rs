#![forbid(unsafe_code)]

mod config;
mod resolver;
mod source;
mod tsv;

use anyhow::{bail, Context, Result};
use clap::Parser;
use jiractions_core::pipeline;
use jiractions_core::{ActionFactory, UserLookupService};
use resolver::DirectoryResolver;
use source::FileSource;
use std::env;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use tsv::TsvSink;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "jact: rebuild windowed action streams from issue changelogs",
    long_about = None
)]
struct Cli {
    /// Run configuration (window, custom fields, user directory).
    #[arg(short, long, default_value = "jiractions.toml")]
    config: PathBuf,

    /// Issue export to read; overrides the configured input.
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// TSV file to write; overrides the configured output. Defaults to
    /// stdout when neither is set.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("JIRACTIONS_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "jiractions=debug,jact=debug,info"
        } else {
            "jiractions=info,jact=info,warn"
        })
    });

    let format = env::var("JIRACTIONS_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(io::stderr))
                .init();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = config::load(&cli.config)?;
    let window = cfg.window()?;

    let Some(input) = cli.input.or_else(|| cfg.input.clone()) else {
        bail!("no input: pass --input or set `input` in the config");
    };

    let users = Arc::new(UserLookupService::new(DirectoryResolver::new(
        cfg.users.clone(),
    )));
    let factory = ActionFactory::new(Arc::clone(&users), cfg.custom_fields.clone());

    let mut source = FileSource::open(&input)?;

    let out: Box<dyn Write> = match cli.output.or_else(|| cfg.output.clone()) {
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(io::stdout().lock()),
    };
    let mut sink = TsvSink::new(out, factory.field_names())?;

    info!(input = %input.display(), start = %window.start(), end = %window.end(), "starting run");
    let stats = pipeline::run(&mut source, &mut sink, &factory, window)?;

    let lookups = users.stats();
    info!(
        lookups = lookups.lookups,
        misses = lookups.misses,
        resolver_time = ?lookups.resolver_time,
        "user lookups"
    );

    if stats.issues_seen == 0 {
        bail!("input contained no issues");
    }

    Ok(())
}
