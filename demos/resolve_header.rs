use nila_idp::prelude::*;
use std::error::Error;
use std::fs;
use tracing_subscriber::EnvFilter;

/// Resolves an `Authorization` header against the issuer described in a YAML file.
///
/// ```text
/// cargo run --example resolve_header -- demos/resolver.yaml "Bearer eyJ..." [access-token]
/// ```
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nila_idp=debug")))
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(config_path), Some(authorization_header)) = (args.next(), args.next()) else {
        eprintln!("usage: resolve_header <config.yaml> <authorization-header> [access-token]");
        std::process::exit(2);
    };
    let access_token = args.next();

    // --- Load Configuration from YAML ---
    let config_str = fs::read_to_string(&config_path)
        .map_err(|e| format!("Failed to read config file {config_path}: {e}"))?;
    let settings: Settings = serde_yaml::from_str(&config_str)
        .map_err(|e| format!("Failed to parse YAML config from {config_path}: {e}"))?;
    let config = Config::try_from(settings)?;

    println!("Resolving tokens for issuer {} (audience {})", config.issuer, config.expected_audience());
    let resolver = TokenResolver::new(config)?;

    match resolver.resolve(&authorization_header, access_token.as_deref()).await {
        Ok(identity) => {
            println!("{identity}");
            Ok(())
        }
        Err(e) if e.is_access_token_error() => {
            eprintln!("Token rejected: {e}");
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}
