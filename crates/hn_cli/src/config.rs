use clap::{Parser, Subcommand};
use hn_scrapers::{FetchConfig, ScraperArgs};
use hn_storage::StorageKind;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

const DEV_SECRET: &str = "dev-secret-change-me";

/// A duration written like `30s`, `5m`, `1h15m30s` or a bare number of seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HumanDuration(pub Duration);

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut total_seconds = 0u64;
        let mut current_number = String::new();
        let mut has_value = false;

        for c in s.trim().chars() {
            if c.is_ascii_digit() {
                current_number.push(c);
                continue;
            }
            if c.is_whitespace() {
                continue;
            }
            let num = current_number
                .parse::<u64>()
                .map_err(|_| format!("Expected a number before '{}'", c))?;
            let unit = match c {
                's' => 1,
                'm' => 60,
                'h' => 3600,
                'd' => 86400,
                _ => return Err(format!("Invalid duration unit: {}", c)),
            };
            total_seconds = num
                .checked_mul(unit)
                .and_then(|seconds| total_seconds.checked_add(seconds))
                .ok_or_else(|| format!("Duration is too long: {}", s))?;
            current_number.clear();
            has_value = true;
        }

        // Trailing number without a unit counts as seconds
        if !current_number.is_empty() {
            let seconds = current_number
                .parse::<u64>()
                .map_err(|_| "Invalid number in duration".to_string())?;
            total_seconds = total_seconds
                .checked_add(seconds)
                .ok_or_else(|| format!("Duration is too long: {}", s))?;
            has_value = true;
        }

        if !has_value {
            return Err("Duration must include a number".to_string());
        }
        Ok(HumanDuration(Duration::from_secs(total_seconds)))
    }
}

#[derive(Parser, Debug)]
#[command(name = "hn", author, version, about = "Scrape, analyze and serve The Hacker News articles", long_about = None)]
pub struct Cli {
    /// Storage backend
    #[arg(long, env = "HN_STORAGE", value_enum, default_value_t = StorageKind::Sqlite, global = true)]
    pub storage: StorageKind,

    /// Database connection string for the sqlite backend
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://hn_digest.db", global = true)]
    pub database_url: String,

    /// Secret used to sign and verify API tokens
    #[arg(long, env = "SECRET_KEY", default_value = DEV_SECRET, hide_env_values = true, global = true)]
    pub jwt_secret: String,

    /// Lifetime of issued API tokens, in days
    #[arg(long, env = "ACCESS_TOKEN_EXPIRE_DAYS", default_value_t = 7, global = true)]
    pub token_expire_days: i64,

    /// First listing page to scrape
    #[arg(long, env = "HN_START_URL", default_value = "https://thehackernews.com/", global = true)]
    pub start_url: String,

    /// Timeout for a single page fetch (e.g. 30s, 1m)
    #[arg(long, env = "HN_FETCH_TIMEOUT", default_value = "30s", global = true)]
    pub fetch_timeout: HumanDuration,

    /// Extra attempts after a failed page fetch
    #[arg(long, env = "HN_FETCH_RETRIES", default_value_t = 2, global = true)]
    pub fetch_retries: u32,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API
    Serve {
        #[arg(long, env = "HN_BIND", default_value = "0.0.0.0:8000")]
        bind: SocketAddr,
    },
    /// Scrape and query articles from the command line
    Scrape(ScraperArgs),
    /// Print an API token for a user id
    Token {
        user_id: i64,
    },
}

impl Cli {
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            timeout: self.fetch_timeout.0,
            retries: self.fetch_retries,
            ..FetchConfig::default()
        }
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_SECRET
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hn_scrapers::ScraperCommands;

    #[test]
    fn test_human_duration() {
        let parse = |s: &str| s.parse::<HumanDuration>().map(|d| d.0.as_secs());
        assert_eq!(parse("30s"), Ok(30));
        assert_eq!(parse("45"), Ok(45));
        assert_eq!(parse("1h15m30s"), Ok(4530));
        assert_eq!(parse("2d"), Ok(172800));
        assert_eq!(parse("1m 5"), Ok(65));
        assert!(parse("").is_err());
        assert!(parse("s").is_err());
        assert!(parse("10x").is_err());
    }

    #[test]
    fn test_human_duration_overflow() {
        assert!("999999999999999d".parse::<HumanDuration>().is_err());
        assert!("18446744073709551615s 1s".parse::<HumanDuration>().is_err());
        assert!("99999999999999999999".parse::<HumanDuration>().is_err());
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["hn", "token", "3"]).unwrap();
        assert_eq!(cli.fetch_timeout, HumanDuration(Duration::from_secs(30)));
        assert_eq!(cli.token_expire_days, 7);
        assert!(matches!(cli.command, Commands::Token { user_id: 3 }));
        assert_eq!(cli.fetch_config().retries, cli.fetch_retries);
    }

    #[test]
    fn test_scrape_with_global_flags() {
        let cli = Cli::try_parse_from([
            "hn",
            "scrape",
            "--storage",
            "memory",
            "--fetch-timeout",
            "5s",
            "ingest",
            "-n",
            "3",
        ])
        .unwrap();
        assert_eq!(cli.storage, StorageKind::Memory);
        assert_eq!(cli.fetch_config().timeout, Duration::from_secs(5));
        match cli.command {
            Commands::Scrape(args) => {
                assert!(matches!(args.command, ScraperCommands::Ingest { pages: 3, from: None }))
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_serve_bind() {
        let cli = Cli::try_parse_from(["hn", "serve", "--bind", "127.0.0.1:9000"]).unwrap();
        match cli.command {
            Commands::Serve { bind } => assert_eq!(bind.port(), 9000),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
