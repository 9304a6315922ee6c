//! Researcher: gathers findings on a topic.

use async_trait::async_trait;

use super::{numbered_list, require_non_blank, Agent, AgentBackend, AgentError, AgentResult};
use crate::core::limits::Deadline;
use crate::domain::{AgentRole, StepResult};

pub const RESEARCHER_SYSTEM_PROMPT: &str = "\
You are an expert researcher with broad knowledge across many domains.
Your task is to produce thorough, well-organised research on the topic you are given.

When researching:
1. Split the topic into its key subtopics
2. Present factual information from several perspectives
3. Include relevant statistics, examples and case studies
4. Name plausible sources for the claims you make
5. Point out claims that should be fact-checked

Structure the result as a report with clear sections.";

/// Used when no research context is supplied
pub const DEFAULT_RESEARCH_CONTEXT: &str = "General overview needed";

/// Researcher agent
pub struct Researcher {
    backend: AgentBackend,
}

impl Researcher {
    pub fn new(backend: AgentBackend) -> Self {
        Self { backend }
    }

    /// Research a topic, optionally steered by extra context
    pub async fn research(
        &self,
        topic: &str,
        context: Option<&str>,
        deadline: &Deadline,
    ) -> AgentResult<StepResult> {
        require_non_blank(topic, "topic")?;

        let context = context
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(DEFAULT_RESEARCH_CONTEXT);

        let prompt = format!(
            "Research the following topic: {}\n\nAdditional context: {}\n\nProvide a comprehensive research report.",
            topic, context
        );

        let findings = self.generate(prompt, deadline).await?;
        Ok(StepResult::findings(topic, findings, Vec::new()))
    }

    /// Research a topic by answering specific questions
    pub async fn focused_research(
        &self,
        topic: &str,
        questions: &[String],
        deadline: &Deadline,
    ) -> AgentResult<StepResult> {
        require_non_blank(topic, "topic")?;
        if questions.is_empty() {
            return Err(AgentError::InvalidInput(
                "focused research needs at least one question".to_string(),
            ));
        }
        for question in questions {
            require_non_blank(question, "question")?;
        }

        let prompt = format!(
            "Research the topic: {}\n\nAnswer these specific questions:\n{}\n\nGive a detailed, evidence-based answer to each question.",
            topic,
            numbered_list(questions)
        );

        let findings = self.generate(prompt, deadline).await?;
        Ok(StepResult::findings(topic, findings, questions.to_vec()))
    }
}

#[async_trait]
impl Agent for Researcher {
    fn role(&self) -> AgentRole {
        AgentRole::Researcher
    }

    fn system_prompt(&self) -> &str {
        RESEARCHER_SYSTEM_PROMPT
    }

    fn backend(&self) -> &AgentBackend {
        &self.backend
    }
}
