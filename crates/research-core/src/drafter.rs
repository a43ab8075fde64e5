//! Task drafting
//!
//! Turns raw user input into an unconfirmed [`ResearchTask`]. The backend is
//! asked for a `TaskDraft`; whatever it claims about confirmation, the result
//! leaves here unconfirmed.

use std::sync::Arc;

use crate::cancel::Interrupt;
use crate::error::ResearchError;
use crate::generation::{generate_object, GenerationOptions, StructuredGenerator};
use crate::prompts::PromptTemplates;
use crate::types::{ResearchTask, TaskDraft};

/// Drafts candidate tasks from user input
pub struct TaskDrafter {
    generator: Arc<dyn StructuredGenerator>,
    templates: Arc<PromptTemplates>,
    interrupt: Interrupt,
}

impl TaskDrafter {
    /// Create drafter
    #[must_use]
    pub fn new(generator: Arc<dyn StructuredGenerator>, templates: Arc<PromptTemplates>) -> Self {
        Self {
            generator,
            templates,
            interrupt: Interrupt::new(),
        }
    }

    /// With interrupt shared by the workflow instance
    #[inline]
    #[must_use]
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Draft a candidate task
    ///
    /// # Errors
    /// - `InvalidInput` if the input is empty or whitespace
    /// - `GenerationSchema` if the backend output is not a valid task
    /// - `Cancelled` if interrupted while waiting on the backend
    pub async fn draft(&self, user_input: &str) -> Result<ResearchTask, ResearchError> {
        if user_input.trim().is_empty() {
            return Err(ResearchError::InvalidInput(
                "research request must not be empty".to_string(),
            ));
        }

        let prompt = self.templates.render_draft(user_input);
        let task = request_task(
            self.generator.as_ref(),
            &prompt,
            &GenerationOptions::web_research(self.templates.persona.clone()),
            &self.interrupt,
        )
        .await?;

        tracing::info!(
            topic = %task.topic(),
            queries = task.queries().len(),
            "Drafted research task"
        );
        Ok(task)
    }
}

impl std::fmt::Debug for TaskDrafter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskDrafter")
            .field("interrupt", &self.interrupt)
            .finish_non_exhaustive()
    }
}

/// Ask the backend for a task and force it unconfirmed
pub(crate) async fn request_task(
    generator: &dyn StructuredGenerator,
    prompt: &str,
    options: &GenerationOptions,
    interrupt: &Interrupt,
) -> Result<ResearchTask, ResearchError> {
    let draft: TaskDraft = interrupt
        .guard(generate_object(generator, prompt, options))
        .await?;
    Ok(draft.into_task()?)
}
