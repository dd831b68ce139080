// FILE: crates/cli/src/main.rs

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;
use sublink_config::{Config, ConfigLoader, LogLevel};
use sublink_network::ConnectionCategory;

mod commands;

fn build_cli() -> Command {
    Command::new("sublink")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Sublink Contributors")
        .about("Resilient command-line client for Subsonic-compatible media servers")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("PATH")
                .help("Path to the config file (defaults to the platform config directory)")
                .global(true),
        )
        .arg(
            Arg::new("network")
                .short('n')
                .long("network")
                .value_name("TYPE")
                .help("Current connection type, used for route selection")
                .value_parser(["wifi", "cellular", "ethernet", "unknown", "none"])
                .default_value("unknown")
                .global(true),
        )
        .subcommand(Command::new("route").about("Pick the server address to use and show it"))
        .subcommand(Command::new("ping").about("Check that the server accepts the configured credentials"))
        .subcommand(
            Command::new("call")
                .about("Call a REST method and print the XML response")
                .arg(Arg::new("method").required(true).value_name("METHOD").help("Method name, e.g. getIndexes"))
                .arg(
                    Arg::new("params")
                        .value_name("KEY=VALUE")
                        .help("Method parameters")
                        .num_args(0..)
                        .action(ArgAction::Append),
                ),
        )
        .subcommand(
            Command::new("artwork")
                .about("Fetch cover art through the local cache")
                .arg(Arg::new("cover-id").required(true).value_name("COVER_ID").help("Cover art id"))
                .arg(
                    Arg::new("size")
                        .short('s')
                        .long("size")
                        .value_name("SIZE")
                        .value_parser(["thumbnail", "original"])
                        .default_value("original")
                        .help("Image size variant"),
                )
                .arg(Arg::new("output").short('o').long("output").value_name("FILE").help("Write the image bytes to FILE")),
        )
        .subcommand(
            Command::new("cache")
                .about("Inspect and maintain the artwork cache")
                .subcommand_required(true)
                .subcommand(Command::new("size").about("Show the number of entries and their total size"))
                .subcommand(Command::new("clear").about("Delete every cached image"))
                .subcommand(
                    Command::new("clean").about("Delete cached images older than N days").arg(
                        Arg::new("days")
                            .short('d')
                            .long("days")
                            .value_name("N")
                            .value_parser(clap::value_parser!(u32).range(1..))
                            .help("Maximum age in days (defaults to the configured expiration)"),
                    ),
                ),
        )
}

fn load_config(path: Option<&String>) -> Result<Config> {
    let path = match path {
        Some(path) => PathBuf::from(path),
        None => ConfigLoader::default_path().context("Failed to locate config file")?,
    };

    let mut config = ConfigLoader::load(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    config.apply_env_overrides();
    config.ensure_valid().context("Invalid configuration after environment overrides")?;
    Ok(config)
}

/// Logger at the configured level, with `env` (usually `RUST_LOG`) taking
/// precedence when set
fn logger_builder(level: LogLevel, env: env_logger::Env) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level.to_level_filter()).parse_env(env);
    builder
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = build_cli().get_matches();
    let config = load_config(matches.get_one::<String>("config"))?;

    logger_builder(config.log_level, env_logger::Env::default()).init();

    let network = matches
        .get_one::<String>("network")
        .map(|s| s.as_str())
        .unwrap_or("unknown")
        .parse::<ConnectionCategory>()
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    let services = commands::Services::from_config(&config, network)?;

    match matches.subcommand() {
        Some(("route", _)) => commands::show_route(&services).await,
        Some(("ping", _)) => commands::ping(&services).await,
        Some(("call", sub_matches)) => commands::call(&services, sub_matches).await,
        Some(("artwork", sub_matches)) => commands::artwork(&services, sub_matches).await,
        Some(("cache", sub_matches)) => commands::cache(&services, sub_matches).await,
        _ => {
            build_cli().print_help()?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        build_cli().debug_assert();
    }

    #[test]
    fn test_parses_call_with_params() {
        let matches = build_cli()
            .try_get_matches_from(["sublink", "--network", "cellular", "call", "search3", "query=miles", "songCount=5"])
            .expect("valid arguments");

        assert_eq!(matches.get_one::<String>("network").map(String::as_str), Some("cellular"));
        let (name, call) = matches.subcommand().expect("subcommand");
        assert_eq!(name, "call");
        let params: Vec<&String> = call.get_many::<String>("params").expect("params").collect();
        assert_eq!(params, ["query=miles", "songCount=5"]);
    }

    #[test]
    fn test_logger_uses_configured_level() {
        let unset = || env_logger::Env::new().filter("SUBLINK_TEST_UNSET_LOG_FILTER");

        assert_eq!(logger_builder(LogLevel::Debug, unset()).build().filter(), log::LevelFilter::Debug);
        assert_eq!(logger_builder(LogLevel::default(), unset()).build().filter(), log::LevelFilter::Warn);
    }

    #[test]
    fn test_rejects_unknown_network_type() {
        assert!(build_cli()
            .try_get_matches_from(["sublink", "--network", "satellite", "route"])
            .is_err());
    }

    #[test]
    fn test_cache_clean_days() {
        let matches = build_cli()
            .try_get_matches_from(["sublink", "cache", "clean", "--days", "30"])
            .expect("valid arguments");
        let (_, cache) = matches.subcommand().expect("cache");
        let (_, clean) = cache.subcommand().expect("clean");
        assert_eq!(clean.get_one::<u32>("days"), Some(&30));

        assert!(build_cli()
            .try_get_matches_from(["sublink", "cache", "clean", "--days", "0"])
            .is_err());
    }
}
