use std::path::PathBuf;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::cli::{Cli, OutputFormat};
use crate::config::{Config, parse_since};
use crate::error::{ConfigError, LeadsError};
use crate::graph;
use crate::lead::{NormalizedLead, RawLead};
use crate::output;
use crate::processing;
use crate::retrieval::{self, FetchOptions, RetryPolicy};
use crate::seen::SeenStore;

/// Everything one run needs, resolved from the CLI and the environment
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub format: OutputFormat,
    pub output_path: PathBuf,
    pub db_path: PathBuf,
    pub since: Option<i64>,
    pub timeout: Duration,
    pub fetch: FetchOptions,
    pub sample: Option<PathBuf>,
    pub dry_run: bool,
    pub require_contact: bool,
}

impl RunOptions {
    pub fn from_cli(args: &Cli, config: &Config) -> Result<Self, ConfigError> {
        let since = args.since.as_deref().map(parse_since).transpose()?;
        if args.max_pages == 0 {
            return Err(ConfigError::Invalid {
                name: "--max-pages",
                reason: "must be at least 1".to_string(),
            });
        }
        if args.timeout == 0 {
            return Err(ConfigError::Invalid {
                name: "--timeout",
                reason: "must be at least 1 second".to_string(),
            });
        }

        Ok(RunOptions {
            format: args.output,
            output_path: args
                .out
                .clone()
                .unwrap_or_else(|| args.output.default_path()),
            db_path: args.db.clone().unwrap_or_else(|| config.db_path.clone()),
            since,
            timeout: Duration::from_secs(args.timeout),
            fetch: FetchOptions {
                max_pages: args.max_pages,
                retry: RetryPolicy {
                    max_retries: args.retries,
                    ..Default::default()
                },
                quiet: args.quiet,
            },
            sample: args.sample.clone(),
            dry_run: args.dry_run,
            require_contact: args.require_contact,
        })
    }
}

/// Counts reported at the end of a run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub fetched: usize,
    pub already_seen: usize,
    pub new: usize,
    pub dropped_no_contact: usize,
    pub written: usize,
    pub committed: usize,
}

/// Fetch, filter, export, then record the exported ids as seen.
///
/// The seen-set is only updated after the output file is in place, so a
/// failure at any step leaves the next run free to export the same leads.
pub async fn run_pipeline(config: &Config, options: &RunOptions) -> Result<RunSummary, LeadsError> {
    let start_time = Instant::now();

    // Resolve the lead source before touching any local state
    let source = match &options.sample {
        Some(path) => Source::Sample(path.clone()),
        None => {
            let credentials = config.credentials()?;
            let url = graph::leads_url(config, &credentials, options.since)?;
            info!("Fetching leads for form {}", credentials.form_id);
            Source::Api {
                client: graph::create_client(options.timeout)?,
                url,
            }
        }
    };

    let mut store = SeenStore::open(&options.db_path)?;
    let result = run_with_store(&mut store, source, options).await;
    let closed = store.close();

    let summary = result?;
    closed?;

    info!(
        "Fetched {} raw leads, {} new leads, {} written in {:.2?}",
        summary.fetched,
        summary.new,
        summary.written,
        start_time.elapsed()
    );
    Ok(summary)
}

enum Source {
    Api { client: reqwest::Client, url: url::Url },
    Sample(PathBuf),
}

async fn run_with_store(
    store: &mut SeenStore,
    source: Source,
    options: &RunOptions,
) -> Result<RunSummary, LeadsError> {
    let raw_leads: Vec<RawLead> = match source {
        Source::Api { client, url } => retrieval::fetch_leads(&client, url, options.fetch).await?,
        Source::Sample(path) => retrieval::load_sample(&path).await?,
    };
    let fetched = raw_leads.len();

    let partition = store.partition(raw_leads)?;
    debug!(
        "{} already seen, {} repeated in this fetch, {} without id",
        partition.already_seen, partition.repeated, partition.missing_id
    );

    let mut dropped_no_contact = 0;
    let leads: Vec<NormalizedLead> = partition
        .new
        .iter()
        .map(processing::normalize_lead)
        .filter(|lead| {
            if options.require_contact && !lead.has_contact() {
                warn!("Skipping lead {} missing contact info", lead.id);
                dropped_no_contact += 1;
                return false;
            }
            true
        })
        .collect();
    info!("{} new leads out of {} fetched", leads.len(), fetched);

    let mut summary = RunSummary {
        fetched,
        already_seen: partition.already_seen,
        new: leads.len(),
        dropped_no_contact,
        ..Default::default()
    };

    if options.dry_run {
        for lead in &leads {
            info!("[dry-run] would export {} ({})", lead.id, lead.created_time);
        }
        info!("Dry run: output file and seen-set left untouched");
        return Ok(summary);
    }

    let rendered = processing::render(&leads, options.format)?;
    output::write_atomic(&options.output_path, &rendered.buffer).await?;
    info!(
        "Wrote {} leads to {}",
        rendered.lead_count,
        options.output_path.display()
    );
    summary.written = rendered.lead_count;

    summary.committed = store.commit(leads.iter().map(|lead| lead.id.as_str()))?;
    Ok(summary)
}
