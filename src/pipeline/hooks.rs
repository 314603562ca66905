//! Best-effort post-render hooks
//!
//! Diagnostics that run against a freshly rendered artifact. Hooks form an
//! ordered list of optional, independently-caught steps: adding or removing
//! one never changes the pipeline's success/failure contract.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::RenderError;
use crate::render::ReportRenderer;

/// One optional check against a rendered artifact
///
/// A hook error is logged as a warning by the pipeline and never aborts the
/// run.
#[async_trait]
pub trait PostRenderHook: Send + Sync {
    fn name(&self) -> &'static str;

    /// `artifact` is the path relative to the reports root
    async fn run(&self, artifact: &Path) -> Result<(), RenderError>;
}

/// Accessibility diagnostic backed by the renderer
pub struct AccessibilityHook {
    renderer: Arc<dyn ReportRenderer>,
}

impl AccessibilityHook {
    pub fn new(renderer: Arc<dyn ReportRenderer>) -> Self {
        Self { renderer }
    }
}

#[async_trait]
impl PostRenderHook for AccessibilityHook {
    fn name(&self) -> &'static str {
        "accessibility"
    }

    async fn run(&self, artifact: &Path) -> Result<(), RenderError> {
        self.renderer.test_report_accessibility(artifact).await
    }
}

/// Responsiveness diagnostic backed by the renderer
pub struct ResponsivenessHook {
    renderer: Arc<dyn ReportRenderer>,
}

impl ResponsivenessHook {
    pub fn new(renderer: Arc<dyn ReportRenderer>) -> Self {
        Self { renderer }
    }
}

#[async_trait]
impl PostRenderHook for ResponsivenessHook {
    fn name(&self) -> &'static str {
        "responsiveness"
    }

    async fn run(&self, artifact: &Path) -> Result<(), RenderError> {
        self.renderer.test_report_responsiveness(artifact).await
    }
}
