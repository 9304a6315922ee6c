//! Step results produced by agent operations.
//!
//! A [`StepResult`] is created once per agent call and never mutated
//! afterwards. The payload is role-specific; the producing agent is derived
//! from the payload kind so the two can never disagree.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The three agent roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentRole {
    Researcher,
    FactChecker,
    Writer,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Researcher => "Researcher",
            Self::FactChecker => "FactChecker",
            Self::Writer => "Writer",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of a single agent operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    /// Agent that produced this result
    pub agent: AgentRole,

    /// Topic the step worked on (absent for refinement and claim checks)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,

    /// Role-specific payload
    #[serde(flatten)]
    pub output: StepOutput,
}

/// Role-specific payloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepOutput {
    /// Researcher output. Always unverified when produced.
    Findings {
        findings: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        questions: Vec<String>,
        needs_fact_checking: bool,
    },

    /// Fact-check of a body of research
    FactCheck {
        fact_check_report: String,
        status: ReviewStatus,
        /// Rating parsed out of the report text, if one was found
        rating: Option<AccuracyRating>,
    },

    /// Per-claim verification
    ClaimVerification {
        claims_analyzed: Vec<String>,
        verification_report: String,
        /// Statuses in order of appearance in the report
        statuses: Vec<ClaimStatus>,
    },

    /// Comparison of two research payloads
    CrossCheck { cross_check_report: String },

    /// Writer output
    Content {
        content_type: ContentType,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        style: Option<String>,
        content: String,
    },
}

impl StepResult {
    pub fn findings(topic: &str, findings: String, questions: Vec<String>) -> Self {
        Self {
            agent: AgentRole::Researcher,
            topic: Some(topic.to_string()),
            output: StepOutput::Findings {
                findings,
                questions,
                needs_fact_checking: true,
            },
        }
    }

    pub fn fact_check(topic: &str, report: String) -> Self {
        let rating = AccuracyRating::detect(&report);
        Self {
            agent: AgentRole::FactChecker,
            topic: Some(topic.to_string()),
            output: StepOutput::FactCheck {
                fact_check_report: report,
                status: ReviewStatus::Reviewed,
                rating,
            },
        }
    }

    pub fn claim_verification(claims: Vec<String>, report: String) -> Self {
        let statuses = ClaimStatus::scan(&report);
        Self {
            agent: AgentRole::FactChecker,
            topic: None,
            output: StepOutput::ClaimVerification {
                claims_analyzed: claims,
                verification_report: report,
                statuses,
            },
        }
    }

    pub fn cross_check(topic: &str, report: String) -> Self {
        Self {
            agent: AgentRole::FactChecker,
            topic: Some(topic.to_string()),
            output: StepOutput::CrossCheck {
                cross_check_report: report,
            },
        }
    }

    pub fn content(
        topic: Option<&str>,
        content_type: ContentType,
        style: Option<String>,
        content: String,
    ) -> Self {
        Self {
            agent: AgentRole::Writer,
            topic: topic.map(str::to_string),
            output: StepOutput::Content {
                content_type,
                style,
                content,
            },
        }
    }

    /// The primary text payload, whatever the kind
    pub fn text(&self) -> &str {
        match &self.output {
            StepOutput::Findings { findings, .. } => findings,
            StepOutput::FactCheck {
                fact_check_report, ..
            } => fact_check_report,
            StepOutput::ClaimVerification {
                verification_report,
                ..
            } => verification_report,
            StepOutput::CrossCheck { cross_check_report } => cross_check_report,
            StepOutput::Content { content, .. } => content,
        }
    }

    /// Whether the payload still needs fact-checking
    pub fn needs_fact_checking(&self) -> bool {
        matches!(
            self.output,
            StepOutput::Findings {
                needs_fact_checking: true,
                ..
            }
        )
    }

    /// Parsed accuracy rating of a fact-check
    pub fn rating(&self) -> Option<AccuracyRating> {
        match self.output {
            StepOutput::FactCheck { rating, .. } => rating,
            _ => None,
        }
    }

    pub fn content_type(&self) -> Option<ContentType> {
        match self.output {
            StepOutput::Content { content_type, .. } => Some(content_type),
            _ => None,
        }
    }

    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }
}

/// Review state of a fact-check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Reviewed,
}

/// Kinds of writer output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Article,
    Summary,
    Comparison,
    RefinedContent,
}

/// Words after "rating" searched for a value
const RATING_WINDOW: usize = 3;

/// Overall accuracy rating of a fact-check report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccuracyRating {
    High,
    Medium,
    Low,
    Unverifiable,
}

impl AccuracyRating {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "HIGH" => Some(Self::High),
            "MEDIUM" => Some(Self::Medium),
            "LOW" => Some(Self::Low),
            "UNVERIFIABLE" => Some(Self::Unverifiable),
            _ => None,
        }
    }

    /// Find the rating in free text.
    ///
    /// A rating word of any case counts only when it follows "rating" on the
    /// same line within a few words. Otherwise the first upper-case rating
    /// word anywhere wins.
    pub fn detect(text: &str) -> Option<Self> {
        text.lines()
            .find_map(Self::after_keyword)
            .or_else(|| tokens(text).find_map(Self::from_token))
    }

    fn after_keyword(line: &str) -> Option<Self> {
        let tokens: Vec<&str> = tokens(line).collect();
        tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| t.eq_ignore_ascii_case("rating"))
            .find_map(|(pos, _)| {
                tokens[pos + 1..]
                    .iter()
                    .take(RATING_WINDOW)
                    .find_map(|t| Self::from_token(&t.to_ascii_uppercase()))
            })
    }
}

/// Verification status of a single claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimStatus {
    Verified,
    PartiallyVerified,
    Unverified,
    False,
}

impl ClaimStatus {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "VERIFIED" => Some(Self::Verified),
            "PARTIALLY_VERIFIED" => Some(Self::PartiallyVerified),
            "UNVERIFIED" => Some(Self::Unverified),
            "FALSE" => Some(Self::False),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verified => "VERIFIED",
            Self::PartiallyVerified => "PARTIALLY_VERIFIED",
            Self::Unverified => "UNVERIFIED",
            Self::False => "FALSE",
        }
    }

    /// All upper-case status words in order of appearance
    pub fn scan(text: &str) -> Vec<Self> {
        tokens(text).filter_map(Self::from_token).collect()
    }
}

/// Word tokens. `/` stays inside a token so legends like
/// "HIGH/MEDIUM/LOW" never match a single value.
fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '/'))
        .filter(|t| !t.is_empty())
}
