use std::io::{stderr, Write};

use anyhow::{anyhow, Result};
use humantime::format_rfc3339;
use log::{LevelFilter, Log, Metadata, Record};
use serde_json::{json, Map, Value};

fn current_timestamp() -> String {
    format_rfc3339(std::time::SystemTime::now()).to_string()
}

/// Writes one JSON object per record to stderr. Stdout carries protocol
/// traffic and is never touched.
struct JsonLogger {
    component: String,
}

impl JsonLogger {
    fn entry(&self, record: &Record) -> Map<String, Value> {
        let mut entry = Map::new();
        entry.insert(
            "level".to_string(),
            Value::String(record.level().as_str().to_ascii_lowercase()),
        );
        entry.insert("message".to_string(), Value::String(record.args().to_string()));
        entry.insert("timestamp".to_string(), Value::String(current_timestamp()));
        entry.insert(
            "tags".to_string(),
            json!({ "component": self.component, "target": record.target() }),
        );
        entry
    }
}

impl Log for JsonLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Ok(serialized) = serde_json::to_string(&self.entry(record)) {
            let _ = writeln!(stderr(), "{serialized}");
        }
    }

    fn flush(&self) {
        let _ = stderr().flush();
    }
}

/// Installs the JSON stderr logger. Only warnings and errors are emitted
/// unless `debug` is set.
pub fn init(component: &str, debug: bool) -> Result<()> {
    log::set_boxed_logger(Box::new(JsonLogger {
        component: component.to_string(),
    }))
    .map_err(|err| anyhow!("logger already installed: {err}"))?;
    set_debug_logging(debug);
    Ok(())
}

/// Runtime toggle used by the bootstrap helper.
pub fn set_debug_logging(enabled: bool) {
    log::set_max_level(if enabled {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    });
    if enabled {
        log::debug!("debug logging enabled");
    }
}
