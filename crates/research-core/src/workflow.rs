//! Research workflow
//!
//! Sequences the three components for one workflow instance:
//! - Draft a candidate task from user input
//! - Loop on human confirmation until approved
//! - Compile the confirmed task into a report
//!
//! Each instance owns its task lineage; nothing is shared between instances
//! except the (stateless) backends and channel handles.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::cancel::Interrupt;
use crate::channel::HumanChannel;
use crate::compiler::ReportCompiler;
use crate::config::ResearchConfig;
use crate::drafter::TaskDrafter;
use crate::error::ResearchError;
use crate::gate::ConfirmationGate;
use crate::generation::{StructuredGenerator, TextGenerator};
use crate::types::{ResearchReport, WorkflowId};

/// One human-in-the-loop research workflow instance
pub struct ResearchWorkflow {
    id: WorkflowId,
    drafter: TaskDrafter,
    gate: ConfirmationGate,
    compiler: ReportCompiler,
    channel: Arc<dyn HumanChannel>,
    interrupt: Interrupt,
}

impl ResearchWorkflow {
    /// Build a workflow instance from configuration and collaborators
    #[must_use]
    pub fn new(
        config: &ResearchConfig,
        structured: Arc<dyn StructuredGenerator>,
        text: Arc<dyn TextGenerator>,
        channel: Arc<dyn HumanChannel>,
    ) -> Self {
        Self::with_token(config, structured, text, channel, CancellationToken::new())
    }

    /// Build a workflow instance observing a caller-owned cancellation token
    #[must_use]
    pub fn with_token(
        config: &ResearchConfig,
        structured: Arc<dyn StructuredGenerator>,
        text: Arc<dyn TextGenerator>,
        channel: Arc<dyn HumanChannel>,
        token: CancellationToken,
    ) -> Self {
        let templates = Arc::new(config.templates.clone());
        let interrupt = Interrupt::new()
            .with_token(token)
            .with_timeout(config.suspension_timeout());

        Self {
            id: WorkflowId::new(),
            drafter: TaskDrafter::new(Arc::clone(&structured), Arc::clone(&templates))
                .with_interrupt(interrupt.clone()),
            gate: ConfirmationGate::new(structured, Arc::clone(&channel), Arc::clone(&templates))
                .with_max_revisions(config.max_revisions)
                .with_interrupt(interrupt.clone()),
            compiler: ReportCompiler::new(text, templates)
                .with_settings(config.report.clone())
                .with_interrupt(interrupt.clone()),
            channel,
            interrupt,
        }
    }

    /// Instance identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> WorkflowId {
        self.id
    }

    /// Handle for cancelling this instance from another task
    #[inline]
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.interrupt.token().clone()
    }

    /// Run the workflow to a report
    ///
    /// On failure a terse abort message goes to the human and no report is
    /// produced.
    ///
    /// # Errors
    /// Any unrecovered [`ResearchError`] from the three steps
    pub async fn run(&self, user_input: &str) -> Result<ResearchReport, ResearchError> {
        let span = tracing::info_span!("research_workflow", id = %self.id);
        let result = self.run_steps(user_input).instrument(span.clone()).await;

        if let Err(e) = &result {
            span.in_scope(|| tracing::error!(error = %e, "Research workflow aborted"));
            // Best effort: the channel may be the thing that failed.
            if let Err(channel_err) = self.channel.present_message(&e.abort_message()).await {
                tracing::debug!(error = %channel_err, "Could not deliver abort message");
            }
        }
        result
    }

    async fn run_steps(&self, user_input: &str) -> Result<ResearchReport, ResearchError> {
        tracing::info!("Starting research workflow");

        let candidate = self.drafter.draft(user_input).await?;
        let confirmed = self.gate.confirm(candidate).await?;
        let report = self.compiler.compile(confirmed).await?;

        tracing::info!(topic = %report.topic, "Research report compiled");
        Ok(report)
    }
}

impl std::fmt::Debug for ResearchWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResearchWorkflow")
            .field("id", &self.id)
            .field("drafter", &self.drafter)
            .field("gate", &self.gate)
            .field("compiler", &self.compiler)
            .finish_non_exhaustive()
    }
}

/// Run one workflow instance with default cancellation
///
/// # Errors
/// Any unrecovered [`ResearchError`]
pub async fn run_research_workflow(
    user_input: &str,
    config: &ResearchConfig,
    structured: Arc<dyn StructuredGenerator>,
    text: Arc<dyn TextGenerator>,
    channel: Arc<dyn HumanChannel>,
) -> Result<ResearchReport, ResearchError> {
    ResearchWorkflow::new(config, structured, text, channel)
        .run(user_input)
        .await
}
