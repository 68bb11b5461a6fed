//! Rule set validation CLI tool
//!
//! Validates a JSON time-limit rule set and reports every malformed rule.

use std::path::PathBuf;
use std::process::ExitCode;
use timegate_api::TimeLimitConfig;
use timegate_config::validate_time_limit_rule;

const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

fn describe_day(code: i32) -> &'static str {
    if code == -1 {
        return "every day";
    }
    usize::try_from(code)
        .ok()
        .and_then(|i| DAY_NAMES.get(i).copied())
        .unwrap_or("?")
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let rules_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            eprintln!("Usage: validate-rules <rules.json>");
            eprintln!();
            eprintln!("Validates a time-limit rule set of the form:");
            eprintln!(r#"  {{ "rules": [ {{ "dayOfWeek": 1, "startTime": "09:00", "endTime": "17:00" }} ] }}"#);
            eprintln!();
            eprintln!("dayOfWeek is -1 for every day, or 0 (Sunday) through 6 (Saturday).");
            return ExitCode::from(2);
        }
    };

    let content = match std::fs::read_to_string(&rules_path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error: Failed to read {}: {}", rules_path.display(), e);
            return ExitCode::from(1);
        }
    };

    let config: TimeLimitConfig = match serde_json::from_str(&content) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ Rule set is not valid JSON");
            eprintln!("  {}", e);
            return ExitCode::from(1);
        }
    };

    // Unlike the set operation, report every bad rule rather than the first
    let errors: Vec<_> = config
        .rules
        .iter()
        .enumerate()
        .filter_map(|(i, rule)| validate_time_limit_rule(rule).err().map(|e| (i, e)))
        .collect();

    if !errors.is_empty() {
        eprintln!("✗ Rule set validation failed");
        eprintln!();
        eprintln!("Validation errors ({}):", errors.len());
        for (index, err) in &errors {
            eprintln!("  - rule #{}: {}", index, err);
        }
        return ExitCode::from(1);
    }

    println!("✓ Rule set is valid");
    println!();
    if config.rules.is_empty() {
        println!("No rules: tokens with time limits enabled are always allowed.");
    } else {
        println!("Rules ({}):", config.rules.len());
        for rule in &config.rules {
            println!(
                "  - {}: {}-{}",
                describe_day(rule.day_of_week),
                rule.start_time,
                rule.end_time
            );
        }
    }

    ExitCode::SUCCESS
}
