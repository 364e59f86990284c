//! # Logging & Tracing Infrastructure
//!
//! Structured logging on top of `tracing`, supporting:
//! - JSON, pretty and compact output formats
//! - Module-level filtering with an `EnvFilter`
//! - Redaction helpers for tokens, credentials headers, emails and paths
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_traits::time::LogLevel;
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = LoggingConfig::default()
//!         .with_format(LogFormat::Pretty)
//!         .with_level(LogLevel::Debug);
//!
//!     init_logging(config).expect("Failed to initialize logging");
//!
//!     tracing::info!("Application started");
//! }
//! ```
//!
//! Tokens are never logged. Where a header map or a field value might carry
//! one, pass it through [`redact_headers`] or [`redact_if_sensitive`] first.
//! Components that log request details hold a [`Redactor`] built from
//! [`LoggingConfig::redactor`]; turning `redact_pii` off keeps full paths and
//! email addresses in the output, credentials stay masked either way.

use crate::error::{Error, Result};

use bridge_traits::time::LogLevel;
use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::Path;
use tracing_subscriber::{
    filter::EnvFilter, fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Placeholder written in place of redacted values.
pub const REDACTED: &str = "[REDACTED]";

const WORKSPACE_CRATES: &[&str] = &[
    "pass_core_workspace",
    "bridge_traits",
    "bridge_desktop",
    "core_runtime",
    "core_auth",
    "core_network",
    "core_service",
];

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable pretty format with colors
    Pretty,
    /// Structured JSON format for machine parsing
    Json,
    /// Compact format for production
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        #[cfg(debug_assertions)]
        return Self::Pretty;

        #[cfg(not(debug_assertions))]
        return Self::Json;
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Output format
    pub format: LogFormat,
    /// Minimum log level for workspace crates
    pub level: LogLevel,
    /// Redact PII in request/response logging; see [`Redactor`]
    pub redact_pii: bool,
    /// Custom filter string (e.g., "core_network=debug,core_auth=trace")
    pub filter: Option<String>,
    /// Emit span open/close events
    pub enable_spans: bool,
    /// Display target module in logs
    pub display_target: bool,
    /// Display thread info
    pub display_thread_info: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            redact_pii: true,
            filter: None,
            enable_spans: true,
            display_target: true,
            display_thread_info: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_pii_redaction(mut self, redact: bool) -> Self {
        self.redact_pii = redact;
        self
    }

    /// Redactor matching [`redact_pii`](Self::redact_pii), for components
    /// that log request details.
    pub fn redactor(&self) -> Redactor {
        Redactor::new(self.redact_pii)
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_spans(mut self, enable: bool) -> Self {
        self.enable_spans = enable;
        self
    }

    pub fn with_target(mut self, display: bool) -> Self {
        self.display_target = display;
        self
    }

    pub fn with_thread_info(mut self, display: bool) -> Self {
        self.display_thread_info = display;
        self
    }
}

/// Initialize the global `tracing` subscriber
///
/// Call once during application startup.
///
/// # Errors
///
/// Returns [`Error::Config`] if:
/// - A global subscriber is already installed
/// - The filter string does not parse
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = build_filter(&config)?;

    match config.format {
        LogFormat::Pretty => init_pretty_logging(&config, filter),
        LogFormat::Json => init_json_logging(&config, filter),
        LogFormat::Compact => init_compact_logging(&config, filter),
    }
}

fn level_name(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Trace => "trace",
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    }
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let filter_string = match &config.filter {
        Some(custom_filter) => custom_filter.clone(),
        None => {
            // Our crates at the configured level, noisy dependencies at warn
            let base_level = level_name(config.level);
            let mut directives: Vec<String> = WORKSPACE_CRATES
                .iter()
                .map(|krate| format!("{}={}", krate, base_level))
                .collect();
            directives.extend(
                ["h2=warn", "hyper=warn", "reqwest=warn", "sqlx=warn"]
                    .iter()
                    .map(|d| d.to_string()),
            );
            directives.join(",")
        }
    };

    EnvFilter::try_new(filter_string)
        .map_err(|e| Error::Config(format!("Invalid log filter: {}", e)))
}

fn init_error(e: impl std::fmt::Display) -> Error {
    Error::Config(format!("Failed to initialize logging: {}", e))
}

fn init_pretty_logging(config: &LoggingConfig, filter: EnvFilter) -> Result<()> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .pretty()
        .with_target(config.display_target)
        .with_thread_ids(config.display_thread_info)
        .with_thread_names(config.display_thread_info)
        .with_span_events(if config.enable_spans {
            FmtSpan::ACTIVE
        } else {
            FmtSpan::NONE
        })
        .with_writer(io::stdout);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(init_error)
}

fn init_json_logging(config: &LoggingConfig, filter: EnvFilter) -> Result<()> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .json()
        .flatten_event(true)
        .with_current_span(config.enable_spans)
        .with_span_list(config.enable_spans)
        .with_target(config.display_target)
        .with_thread_ids(config.display_thread_info)
        .with_thread_names(config.display_thread_info)
        .with_writer(io::stdout);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(init_error)
}

fn init_compact_logging(config: &LoggingConfig, filter: EnvFilter) -> Result<()> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(config.display_target)
        .with_thread_ids(config.display_thread_info)
        .with_thread_names(config.display_thread_info)
        .with_writer(io::stdout);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(init_error)
}

const SENSITIVE_FIELDS: &[&str] = &[
    "token",
    "password",
    "secret",
    "api_key",
    "authorization",
    "bearer",
    "cookie",
    "otp",
];

fn is_sensitive(field_name: &str) -> bool {
    let field_lower = field_name.to_lowercase();
    SENSITIVE_FIELDS.iter().any(|&f| field_lower.contains(f))
}

/// Redact a field value when its name marks it as sensitive
///
/// ```ignore
/// use core_runtime::logging::redact_if_sensitive;
///
/// info!(token = %redact_if_sensitive("token", token), "Retrieved token");
/// ```
pub fn redact_if_sensitive(field_name: &str, value: &str) -> String {
    if is_sensitive(field_name) {
        REDACTED.to_string()
    } else if let Some(at_pos) = value.find('@').filter(|_| value.contains('.')) {
        // Likely an email: keep the first character only
        format!("{}***@{}", &value[..1.min(at_pos)], REDACTED)
    } else {
        value.to_string()
    }
}

/// Copy of a header map with credential-bearing values masked.
///
/// Sorted so debug output is stable.
pub fn redact_headers(headers: &HashMap<String, String>) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            let shown = if is_sensitive(name) {
                REDACTED.to_string()
            } else {
                value.clone()
            };
            (name.clone(), shown)
        })
        .collect()
}

/// Strip full file paths to basename only for privacy
///
/// ```ignore
/// info!(file = %strip_path("/Users/jo/Documents/id.pdf"), "Uploading");
/// // Logs: file="id.pdf"
/// ```
pub fn strip_path(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Redaction applied to request details before they reach the log.
///
/// Credential-bearing headers and fields are masked whether or not PII
/// redaction is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Redactor {
    redact_pii: bool,
}

impl Default for Redactor {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Redactor {
    pub fn new(redact_pii: bool) -> Self {
        Self { redact_pii }
    }

    pub fn redacts_pii(&self) -> bool {
        self.redact_pii
    }

    /// Header map ready for a `?headers` log field.
    pub fn headers(&self, headers: &HashMap<String, String>) -> BTreeMap<String, String> {
        if !self.redact_pii {
            return redact_headers(headers);
        }
        headers
            .iter()
            .map(|(name, value)| (name.clone(), redact_if_sensitive(name, value)))
            .collect()
    }

    /// A named field value, such as a phone number or email.
    pub fn value(&self, field_name: &str, value: &str) -> String {
        if self.redact_pii {
            redact_if_sensitive(field_name, value)
        } else if is_sensitive(field_name) {
            REDACTED.to_string()
        } else {
            value.to_string()
        }
    }

    /// A request URL; the query string is masked under PII redaction.
    pub fn url(&self, url: &str) -> String {
        match url.split_once('?') {
            Some((base, _)) if self.redact_pii => format!("{}?{}", base, REDACTED),
            _ => url.to_string(),
        }
    }

    /// A local file path; only the file name survives PII redaction.
    pub fn path(&self, path: &Path) -> String {
        let full = path.to_string_lossy();
        if self.redact_pii {
            strip_path(&full).to_string()
        } else {
            full.into_owned()
        }
    }
}
