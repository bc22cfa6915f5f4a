//! Configuration loading from disk.
//!
//! File format: one `key value` pair per line, split at the first space.
//! Lines starting with `#` are comments. Keys are case-insensitive and
//! unknown keys are ignored.

use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::fs::File;

use thiserror::Error;

use crate::config::schema::ServerProperties;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

type Setter = fn(&mut ServerProperties, &str);

/// Recognised keys and how each one is applied.
const SETTERS: &[(&str, Setter)] = &[
    ("bind", |p, v| p.bind = v.to_string()),
    ("port", |p, v| set_number(&mut p.port, "port", v)),
    ("appendonly", |p, v| p.append_only = v == "yes"),
    ("appendfilename", |p, v| p.append_filename = v.to_string()),
    ("maxclients", |p, v| set_number(&mut p.max_clients, "maxclients", v)),
    ("requirepass", |p, v| p.require_pass = v.to_string()),
    ("databases", |p, v| set_number(&mut p.databases, "databases", v)),
    ("peers", |p, v| p.peers = v.split(',').map(str::to_string).collect()),
    ("self", |p, v| p.self_addr = v.to_string()),
];

fn set_number<T: std::str::FromStr>(field: &mut T, key: &str, value: &str) {
    match value.parse() {
        Ok(parsed) => *field = parsed,
        Err(_) => tracing::warn!(key, value, "Ignoring non-numeric config value"),
    }
}

/// Split one line into `(key, value)`, or `None` for comments and malformed lines.
fn split_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim_end_matches('\r');
    if line.starts_with('#') {
        return None;
    }

    let pivot = line.find(' ')?;
    if pivot == 0 || pivot == line.len() - 1 {
        return None;
    }

    Some((&line[..pivot], line[pivot + 1..].trim_matches(' ')))
}

/// Parse configuration text on top of the defaults.
pub fn parse(src: impl Read) -> Result<ServerProperties, ConfigError> {
    let mut props = ServerProperties::default();

    for line in BufReader::new(src).lines() {
        let line = line?;
        let Some((key, value)) = split_line(&line) else {
            continue;
        };

        let key = key.to_lowercase();
        match SETTERS.iter().find(|(name, _)| *name == key) {
            Some((_, set)) => set(&mut props, value),
            None => tracing::debug!(key = %key, "Ignoring unknown config key"),
        }
    }

    Ok(props)
}

/// Load and validate configuration from a file.
pub fn load_config(path: &Path) -> Result<ServerProperties, ConfigError> {
    let file = File::open(path)?;
    let config = parse(file)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load `path` if it exists, otherwise use `fallback`.
pub fn load_or_default(path: &Path, fallback: ServerProperties) -> Result<ServerProperties, ConfigError> {
    if !path.is_file() {
        tracing::info!(path = %path.display(), "Config file not found, using defaults");
        return Ok(fallback);
    }

    let config = load_config(path)?;
    tracing::info!(path = %path.display(), "Config file loaded");
    Ok(config)
}
