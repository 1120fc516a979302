//! Output formatting for CLI

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
    /// Plain text format
    Plain,
}

/// Trait for items that can be displayed in a table
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

fn table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn serialized<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> Option<String> {
    match format {
        OutputFormat::Json => Some(serde_json::to_string_pretty(value).unwrap_or_default()),
        OutputFormat::Yaml => Some(serde_yaml::to_string(value).unwrap_or_default()),
        _ => None,
    }
}

fn plain<T: TableDisplay>(item: &T) -> String {
    T::headers()
        .iter()
        .zip(item.row())
        .map(|(header, value)| format!("{}: {}", header, value))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Print a single item
pub fn print_item<T: Serialize + TableDisplay>(item: &T, format: OutputFormat) {
    if let Some(text) = serialized(item, format) {
        println!("{}", text);
        return;
    }
    match format {
        OutputFormat::Table => {
            let mut table = table();
            table.set_header(T::headers());
            table.add_row(item.row());
            println!("{table}");
        }
        _ => println!("{}", plain(item)),
    }
}

/// Render a list of items as a table or plain text
pub fn render_list<T: TableDisplay>(items: &[T], format: OutputFormat) -> String {
    match format {
        OutputFormat::Plain => items.iter().map(plain).collect::<Vec<_>>().join("\n---\n"),
        _ => {
            let mut table = table();
            table.set_header(T::headers());
            for item in items {
                table.add_row(item.row());
            }
            table.to_string()
        }
    }
}

/// Print a list of items
pub fn print_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) {
    if let Some(text) = serialized(items, format) {
        println!("{}", text);
        return;
    }
    if items.is_empty() {
        println!("No items found.");
        return;
    }
    println!("{}", render_list(items, format));
}

/// Print any serializable value; tables fall back to pretty JSON
pub fn print_value<T: Serialize + ?Sized>(value: &T, format: OutputFormat) {
    let text = serialized(value, format)
        .unwrap_or_else(|| serde_json::to_string_pretty(value).unwrap_or_default());
    println!("{}", text);
}

/// Print a simple message
pub fn print_message(message: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", serde_json::json!({ "message": message })),
        _ => println!("{}", message),
    }
}

/// Print success message
pub fn print_success(message: &str) {
    println!("✅ {}", message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("❌ {}", message);
}

/// Print warning message
pub fn print_warning(message: &str) {
    println!("⚠️  {}", message);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Row(&'static str, u32);

    impl TableDisplay for Row {
        fn headers() -> Vec<&'static str> {
            vec!["Name", "Count"]
        }

        fn row(&self) -> Vec<String> {
            vec![self.0.to_string(), self.1.to_string()]
        }
    }

    #[test]
    fn test_plain_list() {
        let rendered = render_list(&[Row("smoke", 1), Row("perf", 2)], OutputFormat::Plain);
        assert_eq!(rendered, "Name: smoke\nCount: 1\n---\nName: perf\nCount: 2");
    }

    #[test]
    fn test_table_list_has_headers() {
        let rendered = render_list(&[Row("smoke", 1)], OutputFormat::Table);
        assert!(rendered.contains("Name"));
        assert!(rendered.contains("smoke"));
    }

    #[test]
    fn test_yaml_is_real_yaml() {
        let text = serialized(&serde_json::json!({ "a": 1 }), OutputFormat::Yaml).unwrap();
        assert_eq!(text.trim(), "a: 1");
    }
}
