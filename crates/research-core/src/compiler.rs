//! Report compilation
//!
//! Consumes a confirmed task and produces the single research report.
//! Findings are the backend's text verbatim; only emptiness is rejected.

use std::sync::Arc;

use crate::cancel::Interrupt;
use crate::config::ReportSettings;
use crate::error::ResearchError;
use crate::generation::{GenerationOptions, TextGenerator};
use crate::prompts::PromptTemplates;
use crate::types::{ResearchReport, ResearchTask};

/// Compiles confirmed tasks into reports
pub struct ReportCompiler {
    generator: Arc<dyn TextGenerator>,
    templates: Arc<PromptTemplates>,
    settings: ReportSettings,
    interrupt: Interrupt,
}

impl ReportCompiler {
    /// Create compiler with default report settings
    #[must_use]
    pub fn new(generator: Arc<dyn TextGenerator>, templates: Arc<PromptTemplates>) -> Self {
        Self {
            generator,
            templates,
            settings: ReportSettings::default(),
            interrupt: Interrupt::new(),
        }
    }

    /// With model/temperature settings
    #[inline]
    #[must_use]
    pub fn with_settings(mut self, settings: ReportSettings) -> Self {
        self.settings = settings;
        self
    }

    /// With interrupt shared by the workflow instance
    #[inline]
    #[must_use]
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Options sent with the synthesis call
    #[must_use]
    pub fn generation_options(&self) -> GenerationOptions {
        let mut options = GenerationOptions::web_research(self.templates.persona.clone());
        if let Some(model) = &self.settings.model {
            options = options.with_model(model.clone());
        }
        if let Some(temperature) = self.settings.temperature {
            options = options.with_temperature(temperature);
        }
        options
    }

    /// Compile the report for a confirmed task
    ///
    /// The task is consumed; nothing of it is retained.
    ///
    /// # Errors
    /// - `PreconditionViolation` if the task is unconfirmed (backend not called)
    /// - `GenerationEmptyResult` if the backend returns blank text
    /// - `Generation` / `Cancelled` from the backend call
    pub async fn compile(&self, task: ResearchTask) -> Result<ResearchReport, ResearchError> {
        if !task.is_confirmed() {
            return Err(ResearchError::PreconditionViolation(format!(
                "report compilation requires a confirmed task (topic: {})",
                task.topic()
            )));
        }

        let prompt = self.templates.render_report(&task);
        let options = self.generation_options();
        tracing::info!(
            topic = %task.topic(),
            queries = task.queries().len(),
            model = options.model.as_deref().unwrap_or("default"),
            "Compiling research report"
        );

        let findings = self
            .interrupt
            .guard(self.generator.generate_text(&prompt, &options))
            .await?;

        if findings.trim().is_empty() {
            tracing::error!(topic = %task.topic(), "Backend returned empty findings");
            return Err(ResearchError::GenerationEmptyResult);
        }

        Ok(ResearchReport::new(task.topic(), findings))
    }
}

impl std::fmt::Debug for ReportCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportCompiler")
            .field("settings", &self.settings)
            .field("interrupt", &self.interrupt)
            .finish_non_exhaustive()
    }
}
