pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use commands::price::PriceArgs;
use commands::recommend::RecommendArgs;
use commands::refresh::RefreshArgs;

#[derive(Debug, Parser)]
#[command(
    name = "bloom",
    about = "Bloom operator CLI",
    long_about = "Operate the Bloom recommendation and pricing engine: migrations, demo data, \
                  config inspection, recommendations, maintenance jobs and price checks.",
    after_help = "Examples:\n  bloom seed\n  bloom recommend --type personalized --user alice\n  \
                  bloom refresh all\n  bloom price --product 8 --at 2026-02-14T19:00:00Z"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo flower catalog and verify it")]
    Seed,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Request recommendations and print the ranked candidates as JSON")]
    Recommend(RecommendArgs),
    #[command(about = "Run similarity, trending and preference maintenance jobs")]
    Refresh(RefreshArgs),
    #[command(about = "Resolve effective prices for one product or the whole catalog")]
    Price(PriceArgs),
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Recommend(args) => commands::recommend::run(args),
        Command::Refresh(args) => commands::refresh::run(args),
        Command::Price(args) => commands::price::run(args),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::{Cli, Command};
    use crate::commands::refresh::RefreshJob;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn recommend_flags_parse_into_args() {
        let cli = Cli::try_parse_from([
            "bloom",
            "recommend",
            "--type",
            "price_based",
            "--min-price",
            "20",
            "--max-price",
            "35.50",
            "--limit",
            "5",
        ])
        .expect("recommend arguments should parse");

        match cli.command {
            Command::Recommend(args) => {
                assert_eq!(args.recommendation_type, "price_based");
                assert_eq!(args.max_price.map(|price| price.to_string()), Some("35.50".into()));
                assert_eq!(args.limit, Some(5));
            }
            other => panic!("expected recommend, got {other:?}"),
        }
    }

    #[test]
    fn refresh_defaults_to_every_job() {
        let cli = Cli::try_parse_from(["bloom", "refresh"]).expect("refresh should parse");
        match cli.command {
            Command::Refresh(args) => {
                assert_eq!(args.job, RefreshJob::All);
                assert_eq!(args.active_days, 30);
            }
            other => panic!("expected refresh, got {other:?}"),
        }
    }
}
