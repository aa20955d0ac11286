//! Config validation CLI tool
//!
//! Validates a playmeterd configuration file and reports any errors.

use playmeter_api::PriceKind;
use playmeter_util::default_config_path;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a playmeterd configuration file.");
            eprintln!();
            eprintln!("Example:");
            eprintln!("  validate-config {}", default_path.display());
            eprintln!("  validate-config config.example.toml");
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match playmeter_config::load_config(&config_path) {
        Ok(settings) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", playmeter_config::CURRENT_CONFIG_VERSION);
            println!("  Units: {}", settings.units.count);
            println!("  Prices: {}", settings.prices.len());
            println!("  Menu items: {}", settings.menu.len());
            println!(
                "  Tick interval: {} ms",
                settings.service.tick_interval.as_millis()
            );

            if !settings.prices.is_empty() {
                println!();
                println!("Prices:");
                for price in &settings.prices {
                    let kind_str = match price.kind {
                        PriceKind::Hourly { .. } => "hourly",
                        PriceKind::Package { .. } => "package",
                    };
                    println!("  - {} [{}]: {}", price.id, kind_str, price.label());
                }
            }

            if !settings.menu.is_empty() {
                println!();
                println!("Menu:");
                for item in &settings.menu {
                    println!(
                        "  - {}: {} (Rp {}, initial stock {})",
                        item.id, item.name, item.price, item.initial_stock
                    );
                }
            }

            if settings.prices.is_empty() {
                println!();
                println!("Warning: no prices defined, sessions cannot be started");
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                playmeter_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                playmeter_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                playmeter_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                playmeter_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        playmeter_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
