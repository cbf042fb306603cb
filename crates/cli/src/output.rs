//! Structured output handling for CLI commands.

use owo_colors::OwoColorize;
use redash_core::{ResultMaterializer, Value};
use serde::Serialize;

#[derive(clap::ValueEnum, Clone, Debug, Default, PartialEq, Eq, Copy)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
    Yaml,
}

impl OutputFormat {
    /// Returns true if the output format is intended for machine consumption
    pub fn is_machine_readable(&self) -> bool {
        match self {
            OutputFormat::Human => false,
            OutputFormat::Json | OutputFormat::Yaml => true,
        }
    }
}

/// Envelope for machine-readable responses
#[derive(Serialize)]
pub struct CommandResponse<T> {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(flatten)]
    pub data: T,
}

impl<T> CommandResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: None,
            exit_code: Some(0),
            data,
        }
    }

    pub fn error(message: String, exit_code: i32, data: T) -> Self {
        Self {
            status: "error".to_string(),
            message: Some(message),
            exit_code: Some(exit_code),
            data,
        }
    }
}

/// Column names plus coerced rows, as printed by `query` and `paginate`.
#[derive(Serialize, Debug, Default, PartialEq)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub row_count: usize,
}

impl RowSet {
    pub fn for_page(page: &ResultMaterializer) -> Self {
        Self {
            columns: page.columns().iter().map(|c| c.name.clone()).collect(),
            ..Default::default()
        }
    }

    pub fn push(&mut self, row: Vec<Value>) {
        self.rows.push(row);
        self.row_count += 1;
    }
}

/// Print the output to stdout in the requested format
pub fn print_output<T: Serialize>(format: OutputFormat, data: T) -> anyhow::Result<()> {
    match format {
        OutputFormat::Human => {}
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&data)?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(&data)?;
            println!("{}", yaml);
        }
    }
    Ok(())
}

/// Print a structured success response for machine outputs
pub fn print_success<T: Serialize>(format: OutputFormat, data: T) -> anyhow::Result<()> {
    if format == OutputFormat::Human {
        return Ok(());
    }

    print_output(format, CommandResponse::success(data))
}

/// Print a structured error response for machine outputs.
/// Human-mode errors are printed by main.
pub fn print_error(format: OutputFormat, message: &str, exit_code: i32) -> anyhow::Result<()> {
    if format == OutputFormat::Human {
        return Ok(());
    }

    let response = CommandResponse::error(
        message.to_string(),
        exit_code,
        serde_json::Map::<String, serde_json::Value>::new(),
    );
    print_output(format, response)
}

pub fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => "NULL".dimmed().to_string(),
        other => other.to_string(),
    }
}

pub fn print_header(columns: &[String]) {
    let header: Vec<String> = columns.iter().map(|c| c.bold().to_string()).collect();
    println!("{}", header.join("\t"));
}

pub fn print_row(values: &[Value]) {
    let cells: Vec<String> = values.iter().map(render_cell).collect();
    println!("{}", cells.join("\t"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_machine_readable() {
        assert!(!OutputFormat::Human.is_machine_readable());
        assert!(OutputFormat::Json.is_machine_readable());
        assert!(OutputFormat::Yaml.is_machine_readable());
    }

    #[test]
    fn test_row_set_serialization() {
        let mut set = RowSet {
            columns: vec!["id".into(), "name".into()],
            ..Default::default()
        };
        set.push(vec![Value::Integer(1), Value::Null]);
        let json = serde_json::to_value(CommandResponse::success(&set)).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["row_count"], 1);
        assert_eq!(json["rows"][0][0], 1);
        assert!(json["rows"][0][1].is_null());
    }

    #[test]
    fn test_render_cell() {
        assert_eq!(render_cell(&Value::String("abc".into())), "abc");
        assert!(render_cell(&Value::Null).contains("NULL"));
    }
}
