//! Testing utilities for the research workspace
//!
//! Scripted stand-ins for the human and the generation backend.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use research_core::{
    ChannelError, GenerationError, GenerationOptions, HumanChannel, ResearchConfig,
    StructuredGenerator, TargetSchema, TextGenerator,
};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// Something the channel was asked to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Presented { topic: String, queries: Vec<String> },
    AskedYesNo(String),
    AskedFreeText(String),
    Message(String),
}

/// Human channel answering from a queue
///
/// Once the queue is empty it either reports `InputClosed` or, with
/// [`ScriptedChannel::hang_when_exhausted`], never answers.
#[derive(Debug, Default)]
pub struct ScriptedChannel {
    answers: Mutex<VecDeque<String>>,
    events: Mutex<Vec<ChannelEvent>>,
    hang: bool,
}

impl ScriptedChannel {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn hang_when_exhausted(mut self) -> Self {
        self.hang = true;
        self
    }

    pub fn events(&self) -> Vec<ChannelEvent> {
        self.events.lock().clone()
    }

    /// Every task shown, in order
    pub fn presented(&self) -> Vec<(String, Vec<String>)> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                ChannelEvent::Presented { topic, queries } => Some((topic.clone(), queries.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn messages(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                ChannelEvent::Message(m) => Some(m.clone()),
                _ => None,
            })
            .collect()
    }

    async fn next_answer(&self) -> Result<String, ChannelError> {
        let next = self.answers.lock().pop_front();
        match next {
            Some(answer) => Ok(answer),
            None if self.hang => std::future::pending().await,
            None => Err(ChannelError::InputClosed),
        }
    }
}

#[async_trait]
impl HumanChannel for ScriptedChannel {
    async fn present_task(&self, topic: &str, queries: &[String]) -> Result<(), ChannelError> {
        self.events.lock().push(ChannelEvent::Presented {
            topic: topic.to_string(),
            queries: queries.to_vec(),
        });
        Ok(())
    }

    async fn ask_yes_no(&self, prompt: &str) -> Result<String, ChannelError> {
        self.events.lock().push(ChannelEvent::AskedYesNo(prompt.to_string()));
        self.next_answer().await
    }

    async fn ask_free_text(&self, prompt: &str) -> Result<String, ChannelError> {
        self.events
            .lock()
            .push(ChannelEvent::AskedFreeText(prompt.to_string()));
        self.next_answer().await
    }

    async fn present_message(&self, message: &str) -> Result<(), ChannelError> {
        self.events.lock().push(ChannelEvent::Message(message.to_string()));
        Ok(())
    }
}

/// A generation call observed by [`ScriptedBackend`]
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub prompt: String,
    pub schema: Option<String>,
    pub options: GenerationOptions,
}

/// Generation backend replaying queued responses
///
/// Exhausted queues answer with `GenerationError::Backend`.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    structured: Mutex<VecDeque<Result<Value, GenerationError>>>,
    text: Mutex<VecDeque<Result<String, GenerationError>>>,
    structured_calls: Mutex<Vec<RecordedCall>>,
    text_calls: Mutex<Vec<RecordedCall>>,
    latency: Option<Duration>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_task(self, topic: &str, queries: &[&str]) -> Self {
        self.structured.lock().push_back(Ok(task_json(topic, queries)));
        self
    }

    #[must_use]
    pub fn with_structured(self, response: Result<Value, GenerationError>) -> Self {
        self.structured.lock().push_back(response);
        self
    }

    #[must_use]
    pub fn with_text(self, response: Result<String, GenerationError>) -> Self {
        self.text.lock().push_back(response);
        self
    }

    #[must_use]
    pub fn with_findings(self, findings: &str) -> Self {
        self.with_text(Ok(findings.to_string()))
    }

    /// Sleep this long before answering any call
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    async fn respond_delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    pub fn structured_calls(&self) -> Vec<RecordedCall> {
        self.structured_calls.lock().clone()
    }

    pub fn text_calls(&self) -> Vec<RecordedCall> {
        self.text_calls.lock().clone()
    }
}

#[async_trait]
impl StructuredGenerator for ScriptedBackend {
    async fn generate_structured(
        &self,
        prompt: &str,
        schema: &TargetSchema,
        options: &GenerationOptions,
    ) -> Result<Value, GenerationError> {
        self.structured_calls.lock().push(RecordedCall {
            prompt: prompt.to_string(),
            schema: Some(schema.name.clone()),
            options: options.clone(),
        });
        self.respond_delay().await;
        self.structured
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::Backend("structured script exhausted".into())))
    }
}

#[async_trait]
impl TextGenerator for ScriptedBackend {
    async fn generate_text(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, GenerationError> {
        self.text_calls.lock().push(RecordedCall {
            prompt: prompt.to_string(),
            schema: None,
            options: options.clone(),
        });
        self.respond_delay().await;
        self.text
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::Backend("text script exhausted".into())))
    }
}

/// Task-shaped JSON as a backend would return it
pub fn task_json(topic: &str, queries: &[&str]) -> Value {
    json!({
        "topic": topic,
        "queries": queries,
        "confirmed_by_user": false,
    })
}

/// The worked example used across tests
pub fn eiffel_task_json() -> Value {
    task_json(
        "Eiffel Tower's History and Evolution",
        &[
            "Investigate the foundational purpose of the tower's construction.",
            "Research the design process and the engineers involved.",
            "Explore the immediate public and artistic reception of the tower.",
        ],
    )
}

/// Config with a small revision bound for tests
pub fn test_config() -> ResearchConfig {
    ResearchConfig::new().with_max_revisions(5)
}

/// Shared handles for a scripted backend and channel
pub fn scripted(
    backend: ScriptedBackend,
    channel: ScriptedChannel,
) -> (Arc<ScriptedBackend>, Arc<ScriptedChannel>) {
    (Arc::new(backend), Arc::new(channel))
}
