//! Persona and prompt templates
//!
//! Templates are plain values handed to each component at construction.
//! Placeholders: `{user_input}`, `{topic}`, `{queries}`, `{changes}`.

use serde::{Deserialize, Serialize};

use crate::types::ResearchTask;

const DRAFT_TEMPLATE: &str = r#"
Create detailed research tasks based on the user input. Come up with a clear research topic and a list of specific queries to be answered.

Example:
Userinput: "I want to learn about the history of the Eiffel Tower."

Research Topic: "Eiffel Tower's History and Evolution"
Research Queries:
(1) Investigate the foundational purpose and date of the Eiffel Tower's construction, focusing on its role as the entrance arch for the 1889 Exposition Universelle in Paris.
(2) Research the design process, the primary architects and engineers involved (notably Gustave Eiffel), and the technological challenges faced during the construction phase.
(3) Explore the immediate public and artistic reception of the tower, including the initial controversies, petitions, and the contractual understanding that it was meant to be temporary.
(4) Analyze the tower's earliest functions in the late 19th and early 20th centuries, specifically its scientific uses for meteorology, aerodynamics, and early experiments in telegraphy and radio broadcasting.
(5) Document the critical decisions and events that ultimately prevented the tower's planned demolition, focusing on its strategic value for military communications.
(6) Track the evolution of the tower's role throughout the 20th century, detailing major renovations, technological upgrades, and the installation of subsequent television and radio antennae.
(7) Identify and summarize notable historical events, celebrations, and periods of international conflict (such as WWI and WWII) directly connected to the history and operation of the Eiffel Tower.

Now, create a research task for the following user input:
{user_input}


-----

Set confirmed_by_user to `false`.
DO NOT REPLY WITH ANYTHING OTHER THAN THE RESEARCH TASK OBJECT.
"#;

const REVISION_TEMPLATE: &str = r"
The user has requested changes to the following research task.

Original Task:
Topic: {topic}
Queries:
{queries}

User's requested changes:
{changes}

Please generate a new research task that incorporates these changes.
Set confirmed_by_user to `false`.
DO NOT REPLY WITH ANYTHING OTHER THAN THE RESEARCH TASK OBJECT.
";

const REPORT_TEMPLATE: &str = r"
Using the following research queries, gather information from reliable web sources and compile a comprehensive research report on the topic: {topic}.

Research Queries:
{queries}

Provide detailed findings for each query and synthesize them into a coherent report.
Add the sources as links at the end of the report.
";

/// Role/goal/backstory persona contributed to every prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    /// Role the model plays
    pub role: String,
    /// What it is trying to achieve
    pub goal: String,
    /// Experience that shapes its answers
    pub backstory: String,
}

impl Persona {
    /// Create persona
    #[must_use]
    pub fn new(
        role: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
    ) -> Self {
        Self {
            role: role.into(),
            goal: goal.into(),
            backstory: backstory.into(),
        }
    }

    /// Prompt contribution for this persona
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "You are {role}.\nYour goal is to {goal}.\nYour background: {backstory}",
            role = self.role,
            goal = lowercase_first(&self.goal),
            backstory = self.backstory,
        )
    }
}

impl Default for Persona {
    fn default() -> Self {
        Self::new(
            "Deep Web Researcher",
            "Perform thorough research on any topic",
            "Experienced in using advanced web tools and techniques to gather information \
             from the web; has researched thousands of topics, published numerous reports.",
        )
    }
}

fn lowercase_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Prompt templates for every generation step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptTemplates {
    /// Persona shared by all steps
    pub persona: Persona,
    /// Initial task drafting
    pub draft: String,
    /// Task revision after rejection
    pub revision: String,
    /// Report synthesis
    pub report: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            persona: Persona::default(),
            draft: DRAFT_TEMPLATE.to_string(),
            revision: REVISION_TEMPLATE.to_string(),
            report: REPORT_TEMPLATE.to_string(),
        }
    }
}

impl PromptTemplates {
    /// With persona
    #[inline]
    #[must_use]
    pub fn with_persona(mut self, persona: Persona) -> Self {
        self.persona = persona;
        self
    }

    /// Drafting prompt for raw user input
    #[must_use]
    pub fn render_draft(&self, user_input: &str) -> String {
        self.draft.replace("{user_input}", user_input).trim().to_string()
    }

    /// Revision prompt for a rejected task and the user's change request
    #[must_use]
    pub fn render_revision(&self, rejected: &ResearchTask, changes: &str) -> String {
        fill_task(&self.revision, rejected)
            .replace("{changes}", changes)
            .trim()
            .to_string()
    }

    /// Synthesis prompt for a confirmed task
    #[must_use]
    pub fn render_report(&self, task: &ResearchTask) -> String {
        fill_task(&self.report, task).trim().to_string()
    }
}

// {queries} is substituted last so query text containing "{topic}" stays verbatim.
fn fill_task(template: &str, task: &ResearchTask) -> String {
    template
        .replace("{topic}", task.topic())
        .replace("{queries}", &task.queries_joined())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task() -> ResearchTask {
        ResearchTask::draft("Eiffel Tower", vec!["Who built it?".into(), "When?".into()])
    }

    #[test]
    fn draft_prompt_embeds_input() {
        let prompt = PromptTemplates::default().render_draft("I want to learn about bridges");
        assert!(prompt.contains("I want to learn about bridges"));
        assert!(prompt.contains("confirmed_by_user"));
        assert_eq!(prompt, prompt.trim());
    }

    #[test]
    fn revision_prompt_embeds_task_and_changes() {
        let prompt =
            PromptTemplates::default().render_revision(&task(), "focus only on military history");
        assert!(prompt.contains("Topic: Eiffel Tower"));
        assert!(prompt.contains("Who built it?\nWhen?"));
        assert!(prompt.contains("focus only on military history"));
    }

    #[test]
    fn revision_prompt_accepts_empty_changes() {
        let prompt = PromptTemplates::default().render_revision(&task(), "");
        assert!(prompt.contains("User's requested changes:"));
    }

    #[test]
    fn report_prompt_embeds_every_query() {
        let prompt = PromptTemplates::default().render_report(&task());
        assert!(prompt.contains("on the topic: Eiffel Tower."));
        for q in task().queries() {
            assert!(prompt.contains(q.as_str()));
        }
    }

    #[test]
    fn persona_render() {
        let rendered = Persona::default().render();
        assert!(rendered.starts_with("You are Deep Web Researcher."));
        assert!(rendered.contains("perform thorough research on any topic"));
    }

    #[test]
    fn custom_templates_substitute() {
        let templates = PromptTemplates {
            report: "R[{topic}]{queries}".into(),
            ..PromptTemplates::default()
        };
        assert_eq!(templates.render_report(&task()), "R[Eiffel Tower]Who built it?\nWhen?");
    }
}
