//! CLI smoke entry point.
//!
//! # Responsibility
//! - Load config (first argument, or the embedded default), start logging,
//!   open and migrate the registration database, build the verification
//!   client.
//! - Print deterministic status lines for quick local sanity checks.

use registrar_core::db::migrations::current_version;
use registrar_core::{
    core_version, init_logging_from_config, load_config, open_db, ping, ConfigError,
    HttpVerificationGateway,
};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("registrar error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = load_config(config_path.as_deref()).map_err(|err| err.to_string())?;

    let logging_active = init_logging_from_config(&config.logging).map_err(|err| err.to_string())?;
    let conn = open_db(&config.database.path).map_err(|err| err.to_string())?;
    let schema_version = current_version(&conn).map_err(|err| err.to_string())?;
    log::info!(
        "event=cli_start module=cli status=ok schema_version={schema_version}"
    );

    println!("registrar_core ping={}", ping());
    println!("registrar_core version={}", core_version());
    println!("registrar_core schema_version={schema_version}");
    println!("registrar_core database={}", config.database.path.display());
    println!("registrar_core logging={}", if logging_active { "file" } else { "off" });

    // Builds the client only; no token is sent.
    let verification = match HttpVerificationGateway::from_config(&config.verification) {
        Ok(_) => "ready".to_string(),
        Err(ConfigError::MissingSecret(var)) => format!("off (set {var})"),
        Err(err) => return Err(err.to_string()),
    };
    println!("registrar_core verification={verification}");
    Ok(())
}
