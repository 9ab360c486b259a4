//
// Copyright (c) The SLP Directory Agent Contributors
//
// SPDX-License-Identifier: MIT
//

#![allow(clippy::derivable_impls)]

use serde::Deserialize;

/// On-disk configuration (§6 "Configuration (enumerated)"). Every field
/// has a default so a missing file or a partial file both produce a
/// usable daemon.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Bind IP literals. `"*"` expands to every local non-loopback
    /// address at start (§9 "Wildcard bind addresses").
    pub addresses: Vec<String>,
    pub port: u16,
    pub scopes: Vec<String>,
    pub attributes: Vec<AttributeEntry>,
    pub language: String,
    pub advertisement_period_secs: u64,
    pub expired_services_purge_period_secs: u64,
    pub logging: Logging,
}

/// One configured DA attribute, either a bare flag or a typed value
/// list (§3 "Attributes").
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttributeEntry {
    pub tag: String,
    #[serde(default)]
    pub values: Vec<AttributeValue>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    String(String),
    Integer(i64),
    Bool(bool),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Logging {
    pub stdout: LoggingStdout,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingStdout {
    pub enabled: bool,
    pub style: LoggingFmtStyle,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggingFmtStyle {
    Compact,
    Full,
    Json,
    Pretty,
}

impl Config {
    const DFLT_FILEPATH: &'static str = "/etc/slpd.toml";

    pub(crate) fn load(config_file: Option<&str>) -> Config {
        let config_file = config_file.unwrap_or(Config::DFLT_FILEPATH);

        match std::fs::read_to_string(config_file) {
            Ok(config_str) => {
                toml::from_str(&config_str).expect("failed to parse configuration file")
            }
            Err(err) => {
                eprintln!("failed to load configuration file: {err}");
                eprintln!("falling back to default configuration...");
                Config::default()
            }
        }
    }
}

impl Default for Config {
    fn default() -> Config {
        Config {
            addresses: vec!["*".to_owned()],
            port: 427,
            scopes: vec!["DEFAULT".to_owned()],
            attributes: Vec::new(),
            language: "en".to_owned(),
            advertisement_period_secs: 10800,
            expired_services_purge_period_secs: 0,
            logging: Default::default(),
        }
    }
}

impl Default for LoggingStdout {
    fn default() -> LoggingStdout {
        LoggingStdout {
            enabled: true,
            style: LoggingFmtStyle::Full,
        }
    }
}
