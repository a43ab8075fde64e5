//! Confirmation gate
//!
//! Owns the confirmation loop:
//!
//! ```text
//! Proposed ──► AwaitingDecision ──"yes"──► Confirmed
//!    ▲                │
//!    │              other
//!    │                ▼
//!    └──revise── AwaitingRevision
//! ```
//!
//! Only a case-insensitive "yes" confirms. Everything else, including empty
//! input, "y" and typos, leads to a revision round. Rounds are bounded by
//! `max_revisions`.

use std::sync::Arc;

use crate::cancel::Interrupt;
use crate::channel::HumanChannel;
use crate::drafter::request_task;
use crate::error::ResearchError;
use crate::generation::{GenerationOptions, StructuredGenerator};
use crate::prompts::PromptTemplates;
use crate::types::ResearchTask;

/// Question asked after a task is presented
pub const CONFIRM_PROMPT: &str = "Do you confirm this research task? (yes/no)";

/// Question asked after a rejection
pub const CHANGES_PROMPT: &str = "What would you like to change?";

/// Default bound on revision rounds
pub const DEFAULT_MAX_REVISIONS: usize = 5;

/// The only accepted affirmative token
const AFFIRMATIVE: &str = "yes";

/// Phase of the confirmation loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatePhase {
    /// New candidate, not yet shown
    Proposed,
    /// Candidate shown, waiting for yes/no
    AwaitingDecision,
    /// Candidate rejected, waiting for change request
    AwaitingRevision,
    /// Candidate accepted (terminal)
    Confirmed,
}

/// Phases reachable from `from` in one step
#[must_use]
pub fn allowed_transitions(from: GatePhase) -> &'static [GatePhase] {
    use GatePhase::{AwaitingDecision, AwaitingRevision, Confirmed, Proposed};
    match from {
        Proposed => &[AwaitingDecision],
        AwaitingDecision => &[Confirmed, AwaitingRevision],
        AwaitingRevision => &[Proposed],
        Confirmed => &[],
    }
}

/// Validates a phase transition
///
/// # Errors
/// `PreconditionViolation` for any edge not in [`allowed_transitions`]
pub fn validate_transition(from: GatePhase, to: GatePhase) -> Result<(), ResearchError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(ResearchError::PreconditionViolation(format!(
            "illegal confirmation transition {from:?} -> {to:?}"
        )))
    }
}

/// Normalized answer to the confirmation question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Exactly "yes", any case
    Approve,
    /// Anything else
    Reject,
}

impl Decision {
    /// Normalize a raw answer with the strict allowlist
    #[must_use]
    pub fn parse(answer: &str) -> Self {
        if answer.eq_ignore_ascii_case(AFFIRMATIVE) {
            Self::Approve
        } else {
            Self::Reject
        }
    }
}

/// Loop state carrying the current candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    /// Candidate to present
    Proposed(ResearchTask),
    /// Candidate presented
    AwaitingDecision(ResearchTask),
    /// Candidate rejected
    AwaitingRevision(ResearchTask),
    /// Accepted task
    Confirmed(ResearchTask),
}

impl GateState {
    /// Phase of this state
    #[must_use]
    pub fn phase(&self) -> GatePhase {
        match self {
            Self::Proposed(_) => GatePhase::Proposed,
            Self::AwaitingDecision(_) => GatePhase::AwaitingDecision,
            Self::AwaitingRevision(_) => GatePhase::AwaitingRevision,
            Self::Confirmed(_) => GatePhase::Confirmed,
        }
    }

    /// Current candidate
    #[must_use]
    pub fn task(&self) -> &ResearchTask {
        match self {
            Self::Proposed(t)
            | Self::AwaitingDecision(t)
            | Self::AwaitingRevision(t)
            | Self::Confirmed(t) => t,
        }
    }
}

/// Gates execution on explicit human approval
pub struct ConfirmationGate {
    generator: Arc<dyn StructuredGenerator>,
    channel: Arc<dyn HumanChannel>,
    templates: Arc<PromptTemplates>,
    max_revisions: usize,
    interrupt: Interrupt,
}

impl ConfirmationGate {
    /// Create gate with the default revision bound
    #[must_use]
    pub fn new(
        generator: Arc<dyn StructuredGenerator>,
        channel: Arc<dyn HumanChannel>,
        templates: Arc<PromptTemplates>,
    ) -> Self {
        Self {
            generator,
            channel,
            templates,
            max_revisions: DEFAULT_MAX_REVISIONS,
            interrupt: Interrupt::new(),
        }
    }

    /// With maximum number of revision rounds
    #[inline]
    #[must_use]
    pub fn with_max_revisions(mut self, max: usize) -> Self {
        self.max_revisions = max;
        self
    }

    /// With interrupt shared by the workflow instance
    #[inline]
    #[must_use]
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Configured revision bound
    #[inline]
    #[must_use]
    pub fn max_revisions(&self) -> usize {
        self.max_revisions
    }

    /// Run the loop until the human confirms a candidate
    ///
    /// # Errors
    /// - `RevisionLimitExceeded` when rejected past the bound
    /// - `GenerationSchema` if a revision cannot be generated (not retried)
    /// - `Cancelled` if interrupted while waiting on the human or backend
    /// - `Channel` if the human channel fails
    pub async fn confirm(&self, task: ResearchTask) -> Result<ResearchTask, ResearchError> {
        let mut state = GateState::Proposed(task);
        let mut revisions = 0usize;

        loop {
            state = match state {
                GateState::Confirmed(task) => {
                    tracing::info!(topic = %task.topic(), revisions, "Research task confirmed");
                    return Ok(task);
                }
                pending => pending,
            };

            let from = state.phase();
            let next = self.step(state, &mut revisions).await?;
            validate_transition(from, next.phase())?;
            tracing::debug!(?from, to = ?next.phase(), "Confirmation transition");
            state = next;
        }
    }

    /// Perform the effects of leaving `state`
    async fn step(
        &self,
        state: GateState,
        revisions: &mut usize,
    ) -> Result<GateState, ResearchError> {
        match state {
            GateState::Proposed(task) => {
                self.interrupt
                    .guard(self.channel.present_task(task.topic(), task.queries()))
                    .await?;
                Ok(GateState::AwaitingDecision(task))
            }
            GateState::AwaitingDecision(task) => {
                let answer = self
                    .interrupt
                    .guard(self.channel.ask_yes_no(CONFIRM_PROMPT))
                    .await?;
                match Decision::parse(&answer) {
                    Decision::Approve => Ok(GateState::Confirmed(task.into_confirmed())),
                    Decision::Reject => Ok(GateState::AwaitingRevision(task)),
                }
            }
            GateState::AwaitingRevision(rejected) => {
                if *revisions >= self.max_revisions {
                    tracing::warn!(limit = self.max_revisions, "Revision limit reached");
                    return Err(ResearchError::RevisionLimitExceeded {
                        limit: self.max_revisions,
                    });
                }
                let changes = self
                    .interrupt
                    .guard(self.channel.ask_free_text(CHANGES_PROMPT))
                    .await?;
                let revised = self.revise(&rejected, &changes).await?;
                *revisions += 1;
                Ok(GateState::Proposed(revised))
            }
            GateState::Confirmed(_) => Err(ResearchError::PreconditionViolation(
                "confirmed state has no successor".to_string(),
            )),
        }
    }

    /// Generate a fresh unconfirmed candidate from a rejected one
    async fn revise(
        &self,
        rejected: &ResearchTask,
        changes: &str,
    ) -> Result<ResearchTask, ResearchError> {
        let prompt = self.templates.render_revision(rejected, changes);
        let revised = request_task(
            self.generator.as_ref(),
            &prompt,
            &GenerationOptions::web_research(self.templates.persona.clone()),
            &self.interrupt,
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Revision generation failed");
            e
        })?;

        tracing::info!(
            topic = %revised.topic(),
            queries = revised.queries().len(),
            "Revised research task"
        );
        Ok(revised)
    }
}

impl std::fmt::Debug for ConfirmationGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfirmationGate")
            .field("max_revisions", &self.max_revisions)
            .field("interrupt", &self.interrupt)
            .finish_non_exhaustive()
    }
}
