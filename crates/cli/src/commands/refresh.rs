use bloom_core::recommend::{RecommendationEngine, SimilarityRun, TrendRefresh};
use bloom_db::sql_stores;
use chrono::{Duration, Utc};
use clap::{Args, ValueEnum};
use serde::Serialize;

use crate::commands::{
    application_failure, build_runtime, load_config, open_database, CommandResult, Failure,
};

const COMMAND: &str = "refresh";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RefreshJob {
    All,
    Similarities,
    Trending,
    Preferences,
}

impl RefreshJob {
    fn includes(self, job: RefreshJob) -> bool {
        self == RefreshJob::All || self == job
    }
}

#[derive(Debug, Clone, Args)]
pub struct RefreshArgs {
    #[arg(value_enum, default_value_t = RefreshJob::All)]
    pub job: RefreshJob,
    /// Users active within this many days get their preferences rebuilt
    #[arg(long, default_value_t = 30)]
    pub active_days: i64,
}

#[derive(Debug, Default, Serialize)]
pub struct RefreshReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarities: Option<SimilarityRun>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub trending: Vec<TrendRefresh>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences_updated: Option<usize>,
}

pub fn run(args: RefreshArgs) -> CommandResult {
    if args.active_days <= 0 {
        return CommandResult::failure(
            COMMAND,
            "invalid_argument",
            "--active-days must be positive",
            2,
        );
    }
    let config = match load_config(COMMAND) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime(COMMAND) {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let engine =
            RecommendationEngine::new(sql_stores(pool.clone()), config.recommendation.settings());

        let outcome = run_jobs(&engine, &args).await;
        pool.close().await;
        outcome
    });

    match result {
        Ok(report) => CommandResult::success_with_data(COMMAND, summary(&report), &report),
        Err(failure) => CommandResult::from_failure(COMMAND, failure),
    }
}

async fn run_jobs(
    engine: &RecommendationEngine,
    args: &RefreshArgs,
) -> Result<RefreshReport, Failure> {
    let mut report = RefreshReport::default();

    if args.job.includes(RefreshJob::Similarities) {
        report.similarities =
            Some(engine.calculate_all_similarities().await.map_err(application_failure)?);
    }
    if args.job.includes(RefreshJob::Trending) {
        report.trending = engine.update_trending_products().await.map_err(application_failure)?;
    }
    if args.job.includes(RefreshJob::Preferences) {
        let since = Utc::now() - Duration::days(args.active_days);
        report.preferences_updated = Some(
            engine.refresh_active_user_preferences(since).await.map_err(application_failure)?,
        );
    }

    Ok(report)
}

fn summary(report: &RefreshReport) -> String {
    let mut parts = Vec::new();
    if let Some(run) = &report.similarities {
        parts.push(format!("{} similarity pairs", run.pairs_stored));
    }
    if !report.trending.is_empty() {
        let rows: usize = report.trending.iter().map(|refresh| refresh.rows).sum();
        parts.push(format!("{rows} trending rows"));
    }
    if let Some(updated) = report.preferences_updated {
        parts.push(format!("{updated} preference profiles"));
    }
    format!("refreshed {}", parts.join(", "))
}
