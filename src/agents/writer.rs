//! Writer: turns checked research into finished content.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{require_non_blank, Agent, AgentBackend, AgentError, AgentResult};
use crate::core::limits::Deadline;
use crate::domain::{AgentRole, ContentType, PerspectiveFindings, StepResult};

pub const WRITER_SYSTEM_PROMPT: &str = "\
You are an expert content writer who turns research into clear, engaging and accurate content.

Your writing should be:
1. Clear and accessible to the target audience
2. Well structured with a logical flow
3. Engaging and interesting
4. Factually accurate with respect to the research provided
5. Free of jargon unless necessary, and explained when used

You can write articles, blog posts, reports, summaries and similar formats.
Never trade accuracy for style.";

pub const DEFAULT_STYLE: &str = "informative";

/// Target length bucket for articles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ContentLength {
    Short,
    #[default]
    Medium,
    Long,
}

impl ContentLength {
    /// Parse a label. Anything unrecognized is medium.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "short" => Self::Short,
            "long" => Self::Long,
            _ => Self::Medium,
        }
    }

    pub fn guidance(&self) -> &'static str {
        match self {
            Self::Short => "500-800 words, focus on key points",
            Self::Medium => "1000-1500 words, comprehensive coverage",
            Self::Long => "2000+ words, in-depth analysis",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
        }
    }
}

impl From<String> for ContentLength {
    fn from(label: String) -> Self {
        Self::from_label(&label)
    }
}

impl From<ContentLength> for String {
    fn from(length: ContentLength) -> Self {
        length.as_str().to_string()
    }
}

/// Writer agent
pub struct Writer {
    backend: AgentBackend,
}

impl Writer {
    pub fn new(backend: AgentBackend) -> Self {
        Self { backend }
    }

    /// Write an article from research and its fact-check report
    pub async fn write_article(
        &self,
        topic: &str,
        research: &str,
        fact_check_report: &str,
        style: &str,
        length: ContentLength,
        deadline: &Deadline,
    ) -> AgentResult<StepResult> {
        require_non_blank(topic, "topic")?;

        let style = if style.trim().is_empty() {
            DEFAULT_STYLE
        } else {
            style.trim()
        };

        let prompt = format!(
            "Write a {style} article on the topic: {topic}\n\n\
             Research content:\n{research}\n\n\
             Fact-check report:\n{fact_check_report}\n\n\
             Target length: {length}\n\n\
             Instructions:\n\
             - Use the research as your source material\n\
             - Address every concern raised in the fact-check report\n\
             - Write in a {style} style\n\
             - Open with a compelling introduction and close with a conclusion\n\
             - Organise the piece with headings and subheadings\n\
             - Only include verified information",
            length = length.guidance(),
        );

        let content = self.generate(prompt, deadline).await?;
        Ok(StepResult::content(
            Some(topic),
            ContentType::Article,
            Some(style.to_string()),
            content,
        ))
    }

    /// Summarize research in at most `max_paragraphs` paragraphs.
    ///
    /// The bound is advisory; it is passed to the model, not enforced.
    pub async fn write_summary(
        &self,
        topic: &str,
        research: &str,
        max_paragraphs: u32,
        deadline: &Deadline,
    ) -> AgentResult<StepResult> {
        require_non_blank(topic, "topic")?;
        if max_paragraphs == 0 {
            return Err(AgentError::InvalidInput(
                "summary needs at least one paragraph".to_string(),
            ));
        }

        let prompt = format!(
            "Write a concise summary of the following research on: {}\n\n\
             Research content:\n{}\n\n\
             Keep it clear and accurate, in {} paragraphs or fewer.\n\
             Capture the most important points and key takeaways.",
            topic, research, max_paragraphs
        );

        let content = self.generate(prompt, deadline).await?;
        Ok(StepResult::content(
            Some(topic),
            ContentType::Summary,
            None,
            content,
        ))
    }

    /// Write a balanced comparison of several perspectives
    pub async fn write_comparison(
        &self,
        topic: &str,
        perspectives: &PerspectiveFindings,
        cross_check_report: Option<&str>,
        deadline: &Deadline,
    ) -> AgentResult<StepResult> {
        require_non_blank(topic, "topic")?;
        if perspectives.is_empty() {
            return Err(AgentError::InvalidInput(
                "comparison needs at least one perspective".to_string(),
            ));
        }

        let perspectives_text = perspectives
            .iter()
            .enumerate()
            .map(|(i, (label, findings))| format!("Perspective {} ({}):\n{}", i + 1, label, findings))
            .collect::<Vec<_>>()
            .join("\n\n");

        let cross_check = cross_check_report
            .map(|report| format!("\nCross-Check Analysis:\n{}", report))
            .unwrap_or_default();

        let prompt = format!(
            "Write a comparison analysis on: {}\n\n\
             Different perspectives:\n{}\n\n\
             {}\n\n\
             Create a balanced comparison that:\n\
             1. Presents each perspective fairly\n\
             2. Identifies key differences and similarities\n\
             3. Weighs the strengths and weaknesses of each view\n\
             4. Ends with an objective synthesis",
            topic, perspectives_text, cross_check
        );

        let content = self.generate(prompt, deadline).await?;
        Ok(StepResult::content(
            Some(topic),
            ContentType::Comparison,
            None,
            content,
        ))
    }

    /// Produce a revised version of existing content
    pub async fn refine_content(
        &self,
        original: &str,
        feedback: &str,
        focus_areas: Option<&[String]>,
        deadline: &Deadline,
    ) -> AgentResult<StepResult> {
        require_non_blank(original, "original content")?;
        require_non_blank(feedback, "feedback")?;

        let focus = match focus_areas {
            Some(areas) if !areas.is_empty() => format!(
                "Focus particularly on:\n{}",
                areas
                    .iter()
                    .map(|area| format!("- {}", area))
                    .collect::<Vec<_>>()
                    .join("\n")
            ),
            _ => String::new(),
        };

        let prompt = format!(
            "Refine the following content based on the feedback provided.\n\n\
             Original content:\n{}\n\n\
             Feedback:\n{}\n\n\
             {}\n\n\
             Provide an improved version that addresses all feedback while keeping the core message and accuracy.",
            original, feedback, focus
        );

        let content = self.generate(prompt, deadline).await?;
        Ok(StepResult::content(
            None,
            ContentType::RefinedContent,
            None,
            content,
        ))
    }
}

#[async_trait]
impl Agent for Writer {
    fn role(&self) -> AgentRole {
        AgentRole::Writer
    }

    fn system_prompt(&self) -> &str {
        WRITER_SYSTEM_PROMPT
    }

    fn backend(&self) -> &AgentBackend {
        &self.backend
    }
}
