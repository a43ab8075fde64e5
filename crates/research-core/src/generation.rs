//! Generation capability seams
//!
//! The core never talks to a model directly. It goes through two traits:
//! - [`StructuredGenerator`]: prompt + schema -> JSON value
//! - [`TextGenerator`]: prompt -> free text
//!
//! Backends are untrusted for structured fields. [`generate_object`] checks
//! every structured response against the schema before deserializing it.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;
use crate::prompts::Persona;

/// Tool groups a backend may use while generating
///
/// The core never invokes tools itself; these are hints for the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolGroup {
    /// Web search and fetch
    Web,
    /// Scripted browser sessions
    BrowserAutomation,
}

/// Per-call generation settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model override; backend default when absent
    pub model: Option<String>,
    /// Sampling temperature; lower leans deterministic
    pub temperature: Option<f32>,
    /// Tool groups made available to the backend
    pub tool_groups: Vec<ToolGroup>,
    /// Persona contributed to the prompt
    pub persona: Option<Persona>,
}

impl GenerationOptions {
    /// Create empty options
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With model
    #[inline]
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// With temperature
    #[inline]
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// With tool group
    #[inline]
    #[must_use]
    pub fn with_tool_group(mut self, group: ToolGroup) -> Self {
        if !self.tool_groups.contains(&group) {
            self.tool_groups.push(group);
        }
        self
    }

    /// With persona
    #[inline]
    #[must_use]
    pub fn with_persona(mut self, persona: Persona) -> Self {
        self.persona = Some(persona);
        self
    }

    /// Web research options shared by drafting and revision
    #[must_use]
    pub fn web_research(persona: Persona) -> Self {
        Self::new()
            .with_tool_group(ToolGroup::Web)
            .with_tool_group(ToolGroup::BrowserAutomation)
            .with_persona(persona)
    }
}

/// Named JSON schema a structured response must satisfy
#[derive(Debug, Clone, PartialEq)]
pub struct TargetSchema {
    /// Schema title, used by backends that need a name
    pub name: String,
    /// JSON schema document
    pub schema: serde_json::Value,
}

impl TargetSchema {
    /// Derive the schema for `T`
    #[must_use]
    pub fn of<T: JsonSchema>() -> Self {
        let root = schemars::schema_for!(T);
        Self {
            name: T::schema_name(),
            // RootSchema always serializes
            schema: serde_json::to_value(root).unwrap_or_default(),
        }
    }

    /// Validate a value against this schema
    ///
    /// # Errors
    /// `GenerationError::Schema` listing every violation
    pub fn validate(&self, value: &serde_json::Value) -> Result<(), GenerationError> {
        let compiled = jsonschema::JSONSchema::compile(&self.schema)
            .map_err(|e| GenerationError::Schema(format!("invalid schema {}: {e}", self.name)))?;

        if let Err(errors) = compiled.validate(value) {
            let messages: Vec<String> = errors.map(|e| e.to_string()).collect();
            return Err(GenerationError::Schema(messages.join("; ")));
        }
        Ok(())
    }
}

/// Structured generation capability
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StructuredGenerator: Send + Sync {
    /// Produce a JSON value intended to match `schema`
    async fn generate_structured(
        &self,
        prompt: &str,
        schema: &TargetSchema,
        options: &GenerationOptions,
    ) -> Result<serde_json::Value, GenerationError>;
}

/// Free-text generation capability
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Produce free text from a prompt
    async fn generate_text(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, GenerationError>;
}

/// Generate and decode a value of type `T`
///
/// # Errors
/// - `GenerationError::Schema` if the value violates the schema or fails to decode
/// - Any backend error unchanged
pub async fn generate_object<T>(
    generator: &dyn StructuredGenerator,
    prompt: &str,
    options: &GenerationOptions,
) -> Result<T, GenerationError>
where
    T: DeserializeOwned + JsonSchema,
{
    let schema = TargetSchema::of::<T>();
    let value = generator.generate_structured(prompt, &schema, options).await?;
    schema.validate(&value)?;
    serde_json::from_value(value).map_err(|e| GenerationError::Schema(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaskDraft;
    use serde_json::json;

    #[test]
    fn tool_groups_are_deduplicated() {
        let options = GenerationOptions::new()
            .with_tool_group(ToolGroup::Web)
            .with_tool_group(ToolGroup::Web);
        assert_eq!(options.tool_groups, vec![ToolGroup::Web]);
    }

    #[test]
    fn task_schema_requires_topic_and_queries() {
        let schema = TargetSchema::of::<TaskDraft>();
        assert_eq!(schema.name, "TaskDraft");

        assert!(schema.validate(&json!({"topic": "x", "queries": ["a"]})).is_ok());
        assert!(schema.validate(&json!({"queries": ["a"]})).is_err());
        assert!(schema.validate(&json!({"topic": "x"})).is_err());
        assert!(schema.validate(&json!({"topic": "x", "queries": "a"})).is_err());
    }

    #[tokio::test]
    async fn generate_object_rejects_malformed_value() {
        let mut mock = MockStructuredGenerator::new();
        mock.expect_generate_structured()
            .times(1)
            .returning(|_, _, _| Ok(json!({"topic": 7})));

        let result: Result<TaskDraft, _> =
            generate_object(&mock, "prompt", &GenerationOptions::new()).await;
        assert!(matches!(result, Err(GenerationError::Schema(_))));
    }

    #[tokio::test]
    async fn generate_object_passes_schema_to_backend() {
        let mut mock = MockStructuredGenerator::new();
        mock.expect_generate_structured()
            .withf(|prompt, schema, _| prompt == "p" && schema.name == "TaskDraft")
            .times(1)
            .returning(|_, _, _| Ok(json!({"topic": "t", "queries": ["q1", "q2"]})));

        let draft: TaskDraft = generate_object(&mock, "p", &GenerationOptions::new())
            .await
            .unwrap();
        assert_eq!(draft.queries, vec!["q1", "q2"]);
    }
}
