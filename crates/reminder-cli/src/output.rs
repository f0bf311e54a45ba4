//! Table and JSON output formatting for CLI commands.

use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
}

/// Print a list of items in the selected format
pub fn print_list<T: Serialize + Tabled>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("No results found.");
            } else {
                println!("{}", Table::new(items));
            }
        }
        OutputFormat::Json => print_json(&items),
    }
}

/// Print a single record as key/value pairs or JSON
pub fn print_record<T: Serialize>(item: &T, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(item),
        OutputFormat::Table => match serde_json::to_value(item) {
            Ok(serde_json::Value::Object(fields)) => {
                for (key, value) in fields {
                    let value = match value {
                        serde_json::Value::String(s) => s,
                        serde_json::Value::Null => "-".to_string(),
                        other => other.to_string(),
                    };
                    print_kv(&key, &value);
                }
            }
            _ => print_json(item),
        },
    }
}

fn print_json<T: Serialize + ?Sized>(item: &T) {
    match serde_json::to_string_pretty(item) {
        Ok(json) => println!("{json}"),
        Err(e) => print_error(&format!("Failed to serialize output: {e}")),
    }
}

/// Print a success message
pub fn print_success(msg: &str) {
    println!("✓ {msg}");
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    println!("⚠ {msg}");
}

/// Print an error message
pub fn print_error(msg: &str) {
    eprintln!("✗ {msg}");
}

/// Print a key-value pair
pub fn print_kv(key: &str, value: &str) {
    println!("  {:<16} {}", format!("{key}:"), value);
}
