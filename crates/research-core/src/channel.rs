//! Human interaction channel
//!
//! Line-oriented, one exchange at a time. The confirmation gate is the only
//! component that talks to the human; the workflow uses the channel once more
//! to report an abort.

use async_trait::async_trait;

use crate::error::ChannelError;

/// Synchronous prompt/response channel to a human
#[async_trait]
pub trait HumanChannel: Send + Sync {
    /// Show a candidate task verbatim: topic then every query in order
    async fn present_task(&self, topic: &str, queries: &[String]) -> Result<(), ChannelError>;

    /// Ask a yes/no question; the raw answer is returned unnormalized
    async fn ask_yes_no(&self, prompt: &str) -> Result<String, ChannelError>;

    /// Ask for free text; any answer, including empty, is valid
    async fn ask_free_text(&self, prompt: &str) -> Result<String, ChannelError>;

    /// Show an informational line
    async fn present_message(&self, message: &str) -> Result<(), ChannelError>;
}
