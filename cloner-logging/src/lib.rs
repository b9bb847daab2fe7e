//! Tracing subscriber setup shared by the cloner binaries.
//!
//! Behaviour is driven by environment variables:
//!
//! - `RUST_LOG` / `CLONER_LOG_LEVEL`: filter directives (default `info`)
//! - `CLONER_LOG_OUTPUT`: `console`, `file` or `both` (default `console`)
//! - `CLONER_LOG_FORMAT`: `human` or `json` (default `human`)
//! - `CLONER_LOG_FILE`: log file path, rolled daily (default `/tmp/cloner.log`)

use std::{env, path::Path};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, registry, util::SubscriberInitExt, EnvFilter, Layer, Registry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Console,
    File,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Human,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: String,
    pub output: LogOutput,
    pub format: LogFormat,
    pub file_path: String,
}

impl LogSettings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup. Unknown values fall
    /// back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let output = match lookup("CLONER_LOG_OUTPUT").as_deref() {
            Some("file") => LogOutput::File,
            Some("both") => LogOutput::Both,
            _ => LogOutput::Console,
        };
        let format = match lookup("CLONER_LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Human,
        };

        Self {
            level: lookup("CLONER_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            output,
            format,
            file_path: lookup("CLONER_LOG_FILE").unwrap_or_else(|| "/tmp/cloner.log".to_string()),
        }
    }

    fn wants_console(&self) -> bool {
        matches!(self.output, LogOutput::Console | LogOutput::Both)
    }

    fn wants_file(&self) -> bool {
        matches!(self.output, LogOutput::File | LogOutput::Both)
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

fn fmt_layer<W>(writer: W, format: LogFormat) -> BoxedLayer
where
    W: for<'w> tracing_subscriber::fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = tracing_subscriber::fmt::layer().with_writer(writer);
    match format {
        LogFormat::Json => layer.json().boxed(),
        LogFormat::Human => layer.boxed(),
    }
}

fn build_filter(level: &str) -> EnvFilter {
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    for directive in ["hyper=warn", "tokio=warn"] {
        if let Ok(d) = directive.parse() {
            filter = filter.add_directive(d);
        }
    }
    filter
}

/// Initializes the global tracing subscriber from the environment.
///
/// The returned guard must be held for the lifetime of the process when file
/// output is enabled; dropping it flushes and stops the background writer.
pub fn init_subscriber() -> Option<WorkerGuard> {
    init_with(&LogSettings::from_env())
}

/// Initializes the global tracing subscriber with explicit settings.
///
/// Calling this more than once is harmless; later calls leave the first
/// subscriber in place.
pub fn init_with(settings: &LogSettings) -> Option<WorkerGuard> {
    let mut layers: Vec<BoxedLayer> = Vec::new();
    let mut guard = None;

    if settings.wants_console() {
        layers.push(fmt_layer(std::io::stdout, settings.format));
    }

    if settings.wants_file() {
        let path = Path::new(&settings.file_path);
        let dir = path.parent().unwrap_or_else(|| Path::new("/tmp"));
        let file_name = path.file_name().unwrap_or("cloner.log".as_ref());

        let appender = tracing_appender::rolling::daily(dir, file_name);
        let (writer, file_guard) = tracing_appender::non_blocking(appender);
        guard = Some(file_guard);
        layers.push(fmt_layer(writer, settings.format));
    }

    let _ = registry()
        .with(layers)
        .with(build_filter(&settings.level))
        .try_init();

    guard
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let settings = LogSettings::from_lookup(|_| None);

        assert_eq!(settings.level, "info");
        assert_eq!(settings.output, LogOutput::Console);
        assert_eq!(settings.format, LogFormat::Human);
        assert_eq!(settings.file_path, "/tmp/cloner.log");
    }

    #[test]
    fn test_explicit_settings_are_honoured() {
        let settings = LogSettings::from_lookup(lookup_from(&[
            ("CLONER_LOG_LEVEL", "debug"),
            ("CLONER_LOG_OUTPUT", "both"),
            ("CLONER_LOG_FORMAT", "json"),
            ("CLONER_LOG_FILE", "/var/log/cloner/api.log"),
        ]));

        assert_eq!(settings.level, "debug");
        assert_eq!(settings.output, LogOutput::Both);
        assert_eq!(settings.format, LogFormat::Json);
        assert!(settings.wants_console());
        assert!(settings.wants_file());
    }

    #[test]
    fn test_unknown_values_fall_back() {
        let settings = LogSettings::from_lookup(lookup_from(&[
            ("CLONER_LOG_OUTPUT", "syslog"),
            ("CLONER_LOG_FORMAT", "xml"),
        ]));

        assert_eq!(settings.output, LogOutput::Console);
        assert_eq!(settings.format, LogFormat::Human);
        assert!(!settings.wants_file());
    }

    #[test]
    fn test_file_output_returns_guard() {
        let dir = std::env::temp_dir().join(format!("cloner-logging-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("create log dir");
        let settings = LogSettings {
            level: "info".to_string(),
            output: LogOutput::File,
            format: LogFormat::Json,
            file_path: dir.join("test.log").to_string_lossy().to_string(),
        };

        let guard = init_with(&settings);
        assert!(guard.is_some());
        tracing::info!("logging initialised for test");
    }
}
