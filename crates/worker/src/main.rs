use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stocksource_core::domain::prediction::PerformanceSeries;
use stocksource_core::report::{self, ReportFormat, DEFAULT_RECORD_LIMIT, MAX_RECORD_LIMIT};
use stocksource_core::source::{DataSource, StaticDataSource};
use stocksource_core::storage::PgStore;

mod import;

#[derive(Debug, Parser)]
#[command(name = "stocksource_worker")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load model output into the database, replacing what is stored.
    Import {
        /// JSON array of {Ticker, PricePredicted, ExpectedGrowth}.
        #[arg(long)]
        predictions: Option<PathBuf>,

        /// Number of predictions to publish, highest expected growth first.
        #[arg(long, default_value_t = DEFAULT_RECORD_LIMIT as usize)]
        top: usize,

        /// JSON array of {date, percentReturn} for the published picks.
        #[arg(long)]
        history: Option<PathBuf>,

        /// JSON array of {date, percentReturn} for the benchmark.
        #[arg(long)]
        market: Option<PathBuf>,

        /// Validate the files without writing to the database.
        #[arg(long)]
        dry_run: bool,
    },

    /// Render a report to a file.
    Render {
        /// pdf or xlsx.
        #[arg(long)]
        format: ReportFormat,

        #[arg(long)]
        out: PathBuf,

        #[arg(long, default_value_t = DEFAULT_RECORD_LIMIT)]
        limit: u32,

        /// Read predictions from a JSON file instead of the database.
        #[arg(long)]
        from_file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = stocksource_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let result = match args.command {
        Command::Import {
            predictions,
            top,
            history,
            market,
            dry_run,
        } => run_import(&settings, predictions, top, history, market, dry_run).await,
        Command::Render {
            format,
            out,
            limit,
            from_file,
        } => run_render(&settings, format, out, limit, from_file).await,
    };

    if let Err(err) = &result {
        sentry_anyhow::capture_anyhow(err);
        tracing::error!(error = %err, "worker run failed");
    }
    result
}

async fn connect(settings: &stocksource_core::config::Settings) -> anyhow::Result<sqlx::PgPool> {
    let db_url = settings.require_database_url()?;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
        .context("connect DATABASE_URL failed")?;

    stocksource_core::storage::migrate(&pool).await?;
    Ok(pool)
}

async fn run_import(
    settings: &stocksource_core::config::Settings,
    predictions: Option<PathBuf>,
    top: usize,
    history: Option<PathBuf>,
    market: Option<PathBuf>,
    dry_run: bool,
) -> anyhow::Result<()> {
    anyhow::ensure!(
        predictions.is_some() || history.is_some() || market.is_some(),
        "nothing to import; pass --predictions, --history or --market"
    );

    let predictions = predictions
        .map(|p| import::load_predictions(&p, top))
        .transpose()?;

    let mut series = Vec::new();
    for (kind, path) in [
        (PerformanceSeries::History, history),
        (PerformanceSeries::Market, market),
    ] {
        if let Some(path) = path {
            series.push((kind, import::load_performance(&path)?));
        }
    }

    if dry_run {
        tracing::info!(
            dry_run = true,
            predictions = predictions.as_ref().map(Vec::len),
            series = series.len(),
            "import validated"
        );
        return Ok(());
    }

    let pool = connect(settings).await?;

    if let Some(records) = &predictions {
        let inserted = stocksource_core::storage::predictions::replace_predictions(&pool, records).await?;
        tracing::info!(inserted, "predictions imported");
    }

    for (kind, points) in &series {
        let inserted =
            stocksource_core::storage::performance::replace_performance(&pool, *kind, points).await?;
        tracing::info!(series = ?kind, inserted, "performance series imported");
    }

    Ok(())
}

async fn run_render(
    settings: &stocksource_core::config::Settings,
    format: ReportFormat,
    out: PathBuf,
    limit: u32,
    from_file: Option<PathBuf>,
) -> anyhow::Result<()> {
    anyhow::ensure!(
        (1..=MAX_RECORD_LIMIT).contains(&limit),
        "limit must be 1..={MAX_RECORD_LIMIT} (got {limit})"
    );

    let source: Box<dyn DataSource> = match from_file {
        Some(path) => {
            let records = import::load_predictions(&path, limit as usize)?;
            Box::new(StaticDataSource::new(records))
        }
        None => Box::new(PgStore::new(connect(settings).await?)),
    };

    let options = settings.report_options(chrono::Utc::now());
    let options = report::ReportOptions { limit, ..options };

    let bytes = report::generate(source.as_ref(), format, &options).await?;
    std::fs::write(&out, &bytes).with_context(|| format!("failed to write {}", out.display()))?;

    tracing::info!(format = format.as_str(), out = %out.display(), bytes = bytes.len(), "report written");
    Ok(())
}

fn init_sentry(settings: &stocksource_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
