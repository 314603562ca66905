//! Shaping loaded rows into renderable chart definitions

use serde_json::Value;
use tracing::warn;

use crate::models::{ChartSpec, ChartType, DataRow};

/// A chart ready for the renderer
#[derive(Debug, Clone, PartialEq)]
pub enum ChartDefinition {
    /// Label/value series (bar, line, pie)
    Series {
        title: String,
        kind: ChartType,
        labels: Vec<String>,
        values: Vec<f64>,
    },
    /// Column projection of the raw rows
    Table {
        title: String,
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
    },
}

/// Shape every chart spec against the loaded rows
///
/// An unrecognized chart type, or a series chart missing its label/value
/// fields, is skipped with a warning; shape failures are never fatal to the
/// run.
pub fn shape_charts(specs: &[ChartSpec], rows: &[DataRow]) -> Vec<ChartDefinition> {
    let mut charts = Vec::new();
    for spec in specs {
        let kind = match spec.chart_type.parse::<ChartType>() {
            Ok(kind) => kind,
            Err(_) => {
                warn!(
                    chart = %spec.title,
                    chart_type = %spec.chart_type,
                    "Skipping chart with unrecognized type"
                );
                continue;
            }
        };

        let chart = match kind {
            ChartType::Table => Some(shape_table(spec, rows)),
            _ => shape_series(spec, kind, rows),
        };
        if let Some(chart) = chart {
            charts.push(chart);
        }
    }
    charts
}

/// Group rows by the label field and sum the value field per label,
/// preserving first-seen label order
fn shape_series(spec: &ChartSpec, kind: ChartType, rows: &[DataRow]) -> Option<ChartDefinition> {
    let (Some(label_field), Some(value_field)) = (&spec.label_field, &spec.value_field) else {
        warn!(
            chart = %spec.title,
            "Skipping series chart without label_field/value_field"
        );
        return None;
    };

    let mut labels: Vec<String> = Vec::new();
    let mut values: Vec<f64> = Vec::new();
    for row in rows {
        let Some(label) = row.get(label_field).map(value_to_string) else {
            continue;
        };
        let value = row.get(value_field).and_then(value_to_f64).unwrap_or(0.0);
        match labels.iter().position(|existing| *existing == label) {
            Some(position) => values[position] += value,
            None => {
                labels.push(label);
                values.push(value);
            }
        }
    }

    Some(ChartDefinition::Series {
        title: spec.title.clone(),
        kind,
        labels,
        values,
    })
}

fn shape_table(spec: &ChartSpec, rows: &[DataRow]) -> ChartDefinition {
    let columns: Vec<String> = if spec.columns.is_empty() {
        rows.first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default()
    } else {
        spec.columns.clone()
    };

    let rows = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|column| row.get(column).map(value_to_string).unwrap_or_default())
                .collect()
        })
        .collect();

    ChartDefinition::Table {
        title: spec.title.clone(),
        columns,
        rows,
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
