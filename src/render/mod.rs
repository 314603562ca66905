//! Report rendering
//!
//! The pipeline talks to the renderer through the [`ReportRenderer`] trait;
//! [`HtmlReportRenderer`] is the shipped implementation, writing one
//! self-contained HTML artifact per run under the reports root. The two
//! `test_report_*` methods are diagnostic only, never required for a run to
//! succeed.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use crate::errors::{RenderError, StorageResult};
use crate::models::ChartType;
use crate::pipeline::charts::ChartDefinition;

/// Renderer collaborator contract
///
/// `generate_report` returns the artifact path relative to the reports
/// root; the diagnostics take that same relative path.
#[async_trait]
pub trait ReportRenderer: Send + Sync {
    async fn generate_report(
        &self,
        charts: &[ChartDefinition],
        report_name: &str,
    ) -> Result<PathBuf, RenderError>;

    /// Diagnostic accessibility check against a generated artifact
    async fn test_report_accessibility(&self, artifact: &Path) -> Result<(), RenderError>;

    /// Diagnostic responsiveness check against a generated artifact
    async fn test_report_responsiveness(&self, artifact: &Path) -> Result<(), RenderError>;
}

/// HTML file renderer
#[derive(Debug, Clone)]
pub struct HtmlReportRenderer {
    reports_root: PathBuf,
}

impl HtmlReportRenderer {
    pub async fn new(reports_root: PathBuf) -> StorageResult<Self> {
        tokio::fs::create_dir_all(&reports_root).await?;
        Ok(Self { reports_root })
    }

    async fn read_artifact(&self, artifact: &Path) -> Result<String, RenderError> {
        Ok(tokio::fs::read_to_string(self.reports_root.join(artifact)).await?)
    }
}

#[async_trait]
impl ReportRenderer for HtmlReportRenderer {
    async fn generate_report(
        &self,
        charts: &[ChartDefinition],
        report_name: &str,
    ) -> Result<PathBuf, RenderError> {
        let file_name = format!(
            "{}-{}.html",
            slugify(report_name),
            Utc::now().timestamp_millis()
        );
        let html = render_html(report_name, charts);
        tokio::fs::write(self.reports_root.join(&file_name), html).await?;
        debug!(artifact = %file_name, charts = charts.len(), "Rendered report");
        Ok(PathBuf::from(file_name))
    }

    async fn test_report_accessibility(&self, artifact: &Path) -> Result<(), RenderError> {
        let html = self.read_artifact(artifact).await?;
        if !html.contains("<html lang=") {
            return Err(RenderError::failed("document declares no language"));
        }
        if !html.contains("<title>") {
            return Err(RenderError::failed("document has no title"));
        }
        Ok(())
    }

    async fn test_report_responsiveness(&self, artifact: &Path) -> Result<(), RenderError> {
        let html = self.read_artifact(artifact).await?;
        if !html.contains(r#"name="viewport""#) {
            return Err(RenderError::failed("document has no viewport meta tag"));
        }
        Ok(())
    }
}

fn render_html(title: &str, charts: &[ChartDefinition]) -> String {
    let mut body = String::new();
    for chart in charts {
        match chart {
            ChartDefinition::Series {
                title,
                kind,
                labels,
                values,
            } => {
                body.push_str(&format!(
                    "<section class=\"chart chart-{kind}\">\n<h2>{}</h2>\n<table>\n<tr><th>Label</th><th>Value</th></tr>\n",
                    escape_html(title)
                ));
                for (label, value) in labels.iter().zip(values) {
                    body.push_str(&format!(
                        "<tr><td>{}</td><td>{value}</td></tr>\n",
                        escape_html(label)
                    ));
                }
                body.push_str("</table>\n</section>\n");
            }
            ChartDefinition::Table {
                title,
                columns,
                rows,
            } => {
                body.push_str(&format!(
                    "<section class=\"chart chart-{}\">\n<h2>{}</h2>\n<table>\n<tr>",
                    ChartType::Table,
                    escape_html(title)
                ));
                for column in columns {
                    body.push_str(&format!("<th>{}</th>", escape_html(column)));
                }
                body.push_str("</tr>\n");
                for row in rows {
                    body.push_str("<tr>");
                    for cell in row {
                        body.push_str(&format!("<td>{}</td>", escape_html(cell)));
                    }
                    body.push_str("</tr>\n");
                }
                body.push_str("</table>\n</section>\n");
            }
        }
    }

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title}</title>\n</head>\n<body>\n<h1>{title}</h1>\n\
         <p>Generated {generated}</p>\n{body}</body>\n</html>\n",
        title = escape_html(title),
        generated = Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
        body = body
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn slugify(name: &str) -> String {
    let mut slug = String::new();
    for c in name.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let trimmed = slug.trim_matches('-');
    if trimmed.is_empty() {
        "report".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_renderer() -> (tempfile::TempDir, HtmlReportRenderer) {
        let dir = tempfile::TempDir::new().unwrap();
        let renderer = HtmlReportRenderer::new(dir.path().join("reports"))
            .await
            .unwrap();
        (dir, renderer)
    }

    fn sample_charts() -> Vec<ChartDefinition> {
        vec![
            ChartDefinition::Series {
                title: "Sales by region".to_string(),
                kind: ChartType::Bar,
                labels: vec!["north".to_string(), "south".to_string()],
                values: vec![10.0, 5.0],
            },
            ChartDefinition::Table {
                title: "Raw rows".to_string(),
                columns: vec!["region".to_string(), "amount".to_string()],
                rows: vec![vec!["north".to_string(), "10".to_string()]],
            },
        ]
    }

    #[tokio::test]
    async fn test_generate_writes_artifact_under_root() {
        let (dir, renderer) = temp_renderer().await;
        let artifact = renderer
            .generate_report(&sample_charts(), "Daily Sales")
            .await
            .unwrap();

        assert!(artifact.is_relative());
        assert!(artifact.to_string_lossy().starts_with("daily-sales-"));
        let html = tokio::fs::read_to_string(dir.path().join("reports").join(&artifact))
            .await
            .unwrap();
        assert!(html.contains("<h1>Daily Sales</h1>"));
        assert!(html.contains("Sales by region"));
        assert!(html.contains("<td>north</td><td>10</td>"));
    }

    #[tokio::test]
    async fn test_diagnostics_pass_on_generated_artifact() {
        let (_dir, renderer) = temp_renderer().await;
        let artifact = renderer
            .generate_report(&sample_charts(), "Daily")
            .await
            .unwrap();

        renderer.test_report_accessibility(&artifact).await.unwrap();
        renderer.test_report_responsiveness(&artifact).await.unwrap();
    }

    #[tokio::test]
    async fn test_diagnostics_fail_on_foreign_artifact() {
        let (dir, renderer) = temp_renderer().await;
        tokio::fs::write(dir.path().join("reports/bare.html"), "<p>bare</p>")
            .await
            .unwrap();

        assert!(renderer
            .test_report_accessibility(Path::new("bare.html"))
            .await
            .is_err());
        assert!(renderer
            .test_report_responsiveness(Path::new("bare.html"))
            .await
            .is_err());
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Daily Sales!"), "daily-sales");
        assert_eq!(slugify("  "), "report");
    }

    #[test]
    fn test_html_is_escaped() {
        let html = render_html("<Daily> & more", &[]);
        assert!(html.contains("&lt;Daily&gt; &amp; more"));
    }
}
