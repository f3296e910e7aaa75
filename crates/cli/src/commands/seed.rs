use bloom_db::{DemoCatalogDataset, SeedResult};

use crate::commands::{build_runtime, load_config, open_database, CommandResult, Failure};

const COMMAND: &str = "seed";

pub fn run() -> CommandResult {
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

        let seeded = DemoCatalogDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;
        let verification = DemoCatalogDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        let outcome: Result<SeedResult, Failure> = if verification.all_present {
            Ok(seeded)
        } else {
            Err(("seed_verification", verification_failure_message(&verification.checks), 6u8))
        };

        pool.close().await;
        outcome
    });

    match result {
        Ok(seeded) => CommandResult::success_with_data(COMMAND, summary(&seeded), &seeded),
        Err(failure) => CommandResult::from_failure(COMMAND, failure),
    }
}

fn summary(seeded: &SeedResult) -> String {
    let rows: i64 = seeded.tables.iter().map(|table| table.expected_rows).sum();
    format!(
        "demo catalog loaded: {rows} rows across {} tables for shoppers {}",
        seeded.tables.len(),
        seeded.users.join(", ")
    )
}

fn verification_failure_message(checks: &[(&str, bool)]) -> String {
    let failed_checks =
        checks.iter().filter_map(|(check, passed)| (!passed).then_some(*check)).collect::<Vec<_>>();

    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}
