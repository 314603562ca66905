//! Data source loading
//!
//! The pipeline consumes data through the [`DataProvider`] trait so tests
//! can substitute doubles; [`FsDataProvider`] is the shipped implementation,
//! reading `<data_dir>/<name>.json` or `<data_dir>/<name>.csv`.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::errors::DataSourceError;
use crate::models::DataRow;

/// Source of rows for report generation
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Load `<name>.json`, expected to hold a JSON array of objects
    async fn load_from_json(&self, name: &str) -> Result<Vec<DataRow>, DataSourceError>;

    /// Load `<name>.csv`, expected to hold a header row plus data rows
    async fn load_from_csv(&self, name: &str) -> Result<Vec<DataRow>, DataSourceError>;
}

/// Filesystem-backed data provider
#[derive(Debug, Clone)]
pub struct FsDataProvider {
    data_dir: PathBuf,
}

impl FsDataProvider {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    async fn read_source(&self, name: &str, extension: &str) -> Result<String, DataSourceError> {
        let path = self.data_dir.join(format!("{name}.{extension}"));
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(DataSourceError::NotFound {
                name: name.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl DataProvider for FsDataProvider {
    async fn load_from_json(&self, name: &str) -> Result<Vec<DataRow>, DataSourceError> {
        let contents = self.read_source(name, "json").await?;
        let rows: Vec<DataRow> =
            serde_json::from_str(&contents).map_err(|e| DataSourceError::Parse {
                name: name.to_string(),
                message: e.to_string(),
            })?;
        debug!(source = name, rows = rows.len(), "Loaded JSON data source");
        Ok(rows)
    }

    async fn load_from_csv(&self, name: &str) -> Result<Vec<DataRow>, DataSourceError> {
        let contents = self.read_source(name, "csv").await?;
        let rows = parse_csv(name, &contents)?;
        debug!(source = name, rows = rows.len(), "Loaded CSV data source");
        Ok(rows)
    }
}

fn parse_csv(name: &str, contents: &str) -> Result<Vec<DataRow>, DataSourceError> {
    let mut lines = contents.lines().filter(|line| !line.trim().is_empty());
    let header_line = lines.next().ok_or_else(|| DataSourceError::Parse {
        name: name.to_string(),
        message: "missing header row".to_string(),
    })?;
    let headers = split_csv_line(header_line);

    let mut rows = Vec::new();
    for (line_no, line) in lines.enumerate() {
        let fields = split_csv_line(line);
        if fields.len() != headers.len() {
            return Err(DataSourceError::Parse {
                name: name.to_string(),
                message: format!(
                    "row {} has {} fields, header has {}",
                    line_no + 2,
                    fields.len(),
                    headers.len()
                ),
            });
        }
        let mut row = DataRow::new();
        for (header, field) in headers.iter().zip(fields) {
            row.insert(header.clone(), csv_value(field));
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Split one CSV line, honoring double quotes and `""` escapes
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields.iter().map(|field| field.trim().to_string()).collect()
}

/// Bare numbers become JSON numbers so chart aggregation can sum them;
/// everything else stays a string
fn csv_value(field: String) -> Value {
    if let Ok(number) = field.parse::<f64>() {
        if let Some(number) = serde_json::Number::from_f64(number) {
            return Value::Number(number);
        }
    }
    Value::String(field)
}
