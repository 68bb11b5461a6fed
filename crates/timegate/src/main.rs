//! timegate - time-window access control for API tokens
//!
//! This is the admin entry point. It wires together:
//! - Configuration loading
//! - Store initialization
//! - The access guard
//!
//! and exposes token management and access checks as subcommands.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use timegate_api::{AccessDecision, DenialReason, TimeLimitConfig, TokenRecord};
use timegate_config::{Settings, load_config};
use timegate_core::{AccessGuard, TimeLimitEvaluator, TimeLimited};
use timegate_store::{SqliteStore, Store};
use timegate_util::{
    Clock, DATABASE_FILENAME, RuleDay, SystemClock, TIMEGATE_CONFIG_ENV, TIMEGATE_DATA_DIR_ENV,
    TimeZoneSetting, TokenId, default_config_path, format_datetime_full, format_duration,
    is_mock_time_active,
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Exit code of `check` when the token is outside its permitted window
const EXIT_DENIED: u8 = 3;

/// timegate - Time-window access control for API tokens
#[derive(Parser, Debug)]
#[command(name = "timegate")]
#[command(about = "Manage and check time-window limits on API tokens", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/timegate/config.toml)
    #[arg(short, long, global = true, env = TIMEGATE_CONFIG_ENV, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Data directory override (or set TIMEGATE_DATA_DIR env var)
    #[arg(short, long, global = true, env = TIMEGATE_DATA_DIR_ENV)]
    data_dir: Option<PathBuf>,

    /// Time zone override: "local", "UTC" or "+HH:MM"
    #[arg(short, long, global = true)]
    time_zone: Option<TimeZoneSetting>,

    /// Log level
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a token with time limits disabled
    Create {
        /// Display name
        name: String,
    },

    /// List all tokens
    List,

    /// Show a token and its rules
    Show { id: String },

    /// Delete a token and its rules
    Delete { id: String },

    /// Turn on time-limit enforcement
    Enable { id: String },

    /// Turn off time-limit enforcement (rules are kept)
    Disable { id: String },

    /// Replace a token's rules from a JSON file ("-" reads stdin)
    SetRules { id: String, file: PathBuf },

    /// Remove every rule from a token
    ClearRules { id: String },

    /// Check whether a token may be used right now
    Check {
        id: String,

        /// Print the decision as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show recent audit events
    Audit {
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },
}

fn load_settings(args: &Args) -> Result<Settings> {
    let mut settings = if args.config.exists() {
        let settings = load_config(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;
        info!(config_path = %args.config.display(), "Configuration loaded");
        settings
    } else {
        debug!(config_path = %args.config.display(), "No config file, using defaults");
        Settings::default()
    };

    if let Some(zone) = args.time_zone {
        settings.time_zone = zone;
    }
    if let Some(ref dir) = args.data_dir {
        settings.data_dir = dir.clone();
    }

    Ok(settings)
}

fn open_guard(settings: &Settings) -> Result<AccessGuard> {
    std::fs::create_dir_all(&settings.data_dir).with_context(|| {
        format!("Failed to create data directory {:?}", settings.data_dir)
    })?;

    let db_path = settings.data_dir.join(DATABASE_FILENAME);
    let store: Arc<dyn Store> = Arc::new(
        SqliteStore::open(&db_path)
            .with_context(|| format!("Failed to open store at {:?}", db_path))?,
    );

    info!(db_path = %db_path.display(), time_zone = %settings.time_zone, "Store opened");
    if is_mock_time_active() {
        warn!("Mock time is active; access checks do not use the real clock");
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new(settings.time_zone));
    Ok(AccessGuard::new(store, clock).with_audit_denials(settings.audit_denials))
}

fn read_rules(file: &Path) -> Result<TimeLimitConfig> {
    let content = if file == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read rules from stdin")?;
        buf
    } else {
        std::fs::read_to_string(file).with_context(|| format!("Failed to read {:?}", file))?
    };

    serde_json::from_str(&content).context("Rule set is not valid JSON")
}

fn describe_day(code: i32) -> String {
    match RuleDay::from_code(code) {
        Some(RuleDay::Every) => "every day".into(),
        Some(RuleDay::On(weekday)) => weekday.to_string(),
        None => format!("invalid day {}", code),
    }
}

fn print_token(token: &TokenRecord) {
    println!("{}  {}", token.id, token.name);
    println!(
        "  time limits: {}",
        if token.time_limit_enabled { "enabled" } else { "disabled" }
    );
    println!("  created:     {}", format_datetime_full(&token.created_at));
}

fn print_denial(reason: &DenialReason) {
    match reason {
        DenialReason::OutsideTimeWindow {
            weekday,
            time,
            next_window_start,
        } => {
            println!("✗ Denied: {}", reason.message());
            println!("  at {} {}", describe_day(*weekday), time);
            match next_window_start {
                Some(next) => println!("  next window opens {}", format_datetime_full(next)),
                None => println!("  no upcoming window"),
            }
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let settings = load_settings(&args)?;
    let guard = open_guard(&settings)?;

    match args.command {
        Command::Create { name } => {
            let token = guard.create_token(name)?;
            println!("{}", token.id);
        }

        Command::List => {
            let tokens = guard.store().list_tokens()?;
            if tokens.is_empty() {
                println!("No tokens.");
            }
            for token in &tokens {
                print_token(token);
            }
        }

        Command::Show { id } => {
            let token = guard.token(&TokenId::new(id))?;
            print_token(&token);

            let config = token.get_time_limit_config()?;
            if config.is_empty() {
                println!("  rules:       none (always allowed)");
            } else {
                println!("  rules ({}):", config.len());
                for rule in &config.rules {
                    println!(
                        "    - {}: {}-{}",
                        describe_day(rule.day_of_week),
                        rule.start_time,
                        rule.end_time
                    );
                }
            }
        }

        Command::Delete { id } => {
            guard.delete_token(&TokenId::new(id))?;
            println!("Deleted.");
        }

        Command::Enable { id } => {
            guard.set_time_limit_enabled(&TokenId::new(id), true)?;
            println!("Time limits enabled.");
        }

        Command::Disable { id } => {
            guard.set_time_limit_enabled(&TokenId::new(id), false)?;
            println!("Time limits disabled.");
        }

        Command::SetRules { id, file } => {
            let config = read_rules(&file)?;
            guard.update_time_limit(&TokenId::new(id), &config)?;
            println!("Stored {} rule(s).", config.len());
        }

        Command::ClearRules { id } => {
            guard.update_time_limit(&TokenId::new(id), &TimeLimitConfig::default())?;
            println!("Rules cleared.");
        }

        Command::Check { id, json } => {
            let token = guard.token(&TokenId::new(id))?;
            let decision = guard.authorize_token(&token)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&decision)?);
            } else {
                match &decision {
                    AccessDecision::Allowed => {
                        println!("✓ Allowed");
                        let config = token.get_time_limit_config()?;
                        if token.time_limit_enabled && !config.is_empty() {
                            let now = guard.clock().now();
                            if let Some(left) =
                                TimeLimitEvaluator::new(&config).remaining_in_window(&now)
                            {
                                println!("  {} left in current window", format_duration(left));
                            }
                        }
                    }
                    AccessDecision::Denied { reason } => print_denial(reason),
                }
            }

            if !decision.is_allowed() {
                return Ok(ExitCode::from(EXIT_DENIED));
            }
        }

        Command::Audit { limit } => {
            let events = guard.store().get_recent_audits(limit)?;
            if events.is_empty() {
                println!("No audit events.");
            }
            for event in &events {
                println!(
                    "{}  {}",
                    format_datetime_full(&event.timestamp),
                    serde_json::to_string(&event.event)?
                );
            }
        }
    }

    if !guard.store().is_healthy() {
        bail!("Store reported unhealthy after command");
    }

    Ok(ExitCode::SUCCESS)
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    debug!(version = env!("CARGO_PKG_VERSION"), "timegate starting");

    run(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_check_with_overrides() {
        let args = Args::try_parse_from([
            "timegate",
            "--time-zone",
            "+08:00",
            "--data-dir",
            "/tmp/tg",
            "check",
            "abc",
            "--json",
        ])
        .unwrap();

        assert_eq!(args.time_zone, Some("+08:00".parse().unwrap()));
        assert_eq!(args.data_dir, Some(PathBuf::from("/tmp/tg")));
        assert!(matches!(args.command, Command::Check { ref id, json: true } if id == "abc"));
    }

    #[test]
    fn test_env_fallbacks_use_shared_names() {
        use clap::CommandFactory;

        let cmd = Args::command();
        let env_of = |id: &str| {
            cmd.get_arguments()
                .find(|arg| arg.get_id() == id)
                .and_then(|arg| arg.get_env())
                .map(|env| env.to_os_string())
        };

        assert_eq!(env_of("config"), Some(TIMEGATE_CONFIG_ENV.into()));
        assert_eq!(env_of("data_dir"), Some(TIMEGATE_DATA_DIR_ENV.into()));
    }

    #[test]
    fn test_bad_time_zone_rejected() {
        let result = Args::try_parse_from(["timegate", "--time-zone", "Mars/Olympus", "list"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_describe_day() {
        assert_eq!(describe_day(-1), "every day");
        assert_eq!(describe_day(0), "Sun");
        assert_eq!(describe_day(6), "Sat");
        assert_eq!(describe_day(9), "invalid day 9");
    }

    #[test]
    fn test_read_rules_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(
            &path,
            r#"{"rules":[{"dayOfWeek":1,"startTime":"09:00","endTime":"17:00"}]}"#,
        )
        .unwrap();

        let config = read_rules(&path).unwrap();
        assert_eq!(config.len(), 1);
        assert_eq!(config.rules[0].day_of_week, 1);
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let args = Args::try_parse_from([
            "timegate",
            "--config",
            dir.path().join("absent.toml").to_str().unwrap(),
            "--data-dir",
            dir.path().to_str().unwrap(),
            "list",
        ])
        .unwrap();

        let settings = load_settings(&args).unwrap();
        assert_eq!(settings.time_zone, TimeZoneSetting::Local);
        assert_eq!(settings.data_dir, dir.path());
        assert!(settings.audit_denials);
    }
}
