//! Research Core - plan confirmation workflow
//!
//! Turns free-form input into a research plan, gates execution on explicit
//! human approval, and compiles the approved plan into a report:
//! - [`TaskDrafter`] drafts an unconfirmed [`ResearchTask`]
//! - [`ConfirmationGate`] loops propose → decide → (confirm | revise)
//! - [`ReportCompiler`] turns the confirmed task into a [`ResearchReport`]
//!
//! # Example
//!
//! ```rust,ignore
//! use research_core::{ResearchConfig, ResearchWorkflow};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let workflow = ResearchWorkflow::new(&ResearchConfig::new(), backend.clone(), backend, channel);
//! let report = workflow.run("I want to learn about the Eiffel Tower").await?;
//!
//! println!("{report}");
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

// Core modules
pub mod cancel;
pub mod channel;
pub mod compiler;
pub mod config;
pub mod drafter;
pub mod error;
pub mod gate;
pub mod generation;
pub mod prompts;
pub mod types;
pub mod workflow;

// Re-exports for convenience
pub use cancel::Interrupt;
pub use channel::HumanChannel;
pub use compiler::ReportCompiler;
pub use config::{BackendSettings, ReportSettings, ResearchConfig};
pub use drafter::TaskDrafter;
pub use error::{CancelReason, ChannelError, GenerationError, ResearchError};
pub use gate::{ConfirmationGate, Decision, GatePhase, GateState};
pub use generation::{
    generate_object, GenerationOptions, StructuredGenerator, TargetSchema, TextGenerator,
    ToolGroup,
};
pub use prompts::{Persona, PromptTemplates};
pub use types::{ResearchReport, ResearchTask, TaskDraft, WorkflowId};
pub use workflow::{run_research_workflow, ResearchWorkflow};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Research Core
    pub use crate::{
        ConfirmationGate, HumanChannel, ReportCompiler, ResearchConfig, ResearchError,
        ResearchReport, ResearchTask, ResearchWorkflow, StructuredGenerator, TaskDrafter,
        TextGenerator,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
