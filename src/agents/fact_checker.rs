//! FactChecker: reviews research, verifies claims, cross-checks sources.

use async_trait::async_trait;

use super::{numbered_list, require_non_blank, Agent, AgentBackend, AgentError, AgentResult};
use crate::core::limits::Deadline;
use crate::domain::{AgentRole, StepResult};

pub const FACT_CHECKER_SYSTEM_PROMPT: &str = "\
You are a meticulous fact-checker and critical thinker.
Review the research you are given and identify:
1. Claims that need verification
2. Possible inaccuracies or misleading statements
3. Missing citations or sources
4. Logical inconsistencies
5. Bias or one-sided framing

Be thorough but fair. Rate the overall accuracy and give specific feedback.

Rating scale:
- HIGH: well-researched, accurate, balanced
- MEDIUM: generally accurate with some gaps or minor issues
- LOW: contains significant inaccuracies or misleading information
- UNVERIFIABLE: claims cannot be verified or lack sufficient evidence";

/// Used when claims are verified without extra context
pub const DEFAULT_VERIFICATION_CONTEXT: &str = "General verification";

/// FactChecker agent
pub struct FactChecker {
    backend: AgentBackend,
}

impl FactChecker {
    pub fn new(backend: AgentBackend) -> Self {
        Self { backend }
    }

    /// Review a body of research and rate its accuracy
    pub async fn fact_check(
        &self,
        content: &str,
        topic: &str,
        deadline: &Deadline,
    ) -> AgentResult<StepResult> {
        require_non_blank(topic, "topic")?;
        require_non_blank(content, "content to fact-check")?;

        let prompt = format!(
            "Topic: {}\n\n\
             Research content to fact-check:\n{}\n\n\
             Write a detailed fact-check report including:\n\
             1. Overall accuracy rating\n\
             2. Specific claims that need verification\n\
             3. Identified issues or concerns\n\
             4. Recommendations for improvement\n\
             5. Claims that are accurate and well-supported",
            topic, content
        );

        let report = self.generate(prompt, deadline).await?;
        Ok(StepResult::fact_check(topic, report))
    }

    /// Give a verification status for each claim
    pub async fn verify_specific_claims(
        &self,
        claims: &[String],
        context: Option<&str>,
        deadline: &Deadline,
    ) -> AgentResult<StepResult> {
        if claims.is_empty() {
            return Err(AgentError::InvalidInput(
                "claim verification needs at least one claim".to_string(),
            ));
        }
        for claim in claims {
            require_non_blank(claim, "claim")?;
        }

        let context = context
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(DEFAULT_VERIFICATION_CONTEXT);

        let prompt = format!(
            "Verify the following claims:\n\n{}\n\n\
             Context: {}\n\n\
             For each claim, provide:\n\
             - Verification status (VERIFIED/PARTIALLY_VERIFIED/UNVERIFIED/FALSE)\n\
             - Reasoning\n\
             - Sources that would support or refute the claim\n\
             - Caveats or nuances",
            numbered_list(claims),
            context
        );

        let report = self.generate(prompt, deadline).await?;
        Ok(StepResult::claim_verification(claims.to_vec(), report))
    }

    /// Compare two independent research payloads
    pub async fn cross_check(
        &self,
        content_a: &str,
        content_b: &str,
        topic: &str,
        deadline: &Deadline,
    ) -> AgentResult<StepResult> {
        require_non_blank(topic, "topic")?;

        let prompt = format!(
            "Topic: {}\n\n\
             Research source A:\n{}\n\n\
             Research source B:\n{}\n\n\
             Cross-check these two sources and identify:\n\
             1. Points of agreement\n\
             2. Contradictions or inconsistencies\n\
             3. Complementary information\n\
             4. Which source appears more reliable, and why\n\
             5. How to reconcile the differences",
            topic, content_a, content_b
        );

        let report = self.generate(prompt, deadline).await?;
        Ok(StepResult::cross_check(topic, report))
    }
}

#[async_trait]
impl Agent for FactChecker {
    fn role(&self) -> AgentRole {
        AgentRole::FactChecker
    }

    fn system_prompt(&self) -> &str {
        FACT_CHECKER_SYSTEM_PROMPT
    }

    fn backend(&self) -> &AgentBackend {
        &self.backend
    }
}
