//! Stage and outcome enumerations for the application pipeline.
//!
//! Both enums are part of the wire contract with callers: values travel
//! as snake_case strings and are validated before any write.

use serde::{Deserialize, Serialize};

/// A named step in an application's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Applied,
    RecruiterScreen,
    Assessment,
    HiringManagerScreen,
    TechnicalInterview,
    Onsite,
    Offer,
    Closed,
}

impl Stage {
    /// All stages in pipeline order.
    pub const ALL: [Stage; 8] = [
        Stage::Applied,
        Stage::RecruiterScreen,
        Stage::Assessment,
        Stage::HiringManagerScreen,
        Stage::TechnicalInterview,
        Stage::Onsite,
        Stage::Offer,
        Stage::Closed,
    ];

    /// The stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Applied => "applied",
            Stage::RecruiterScreen => "recruiter_screen",
            Stage::Assessment => "assessment",
            Stage::HiringManagerScreen => "hiring_manager_screen",
            Stage::TechnicalInterview => "technical_interview",
            Stage::Onsite => "onsite",
            Stage::Offer => "offer",
            Stage::Closed => "closed",
        }
    }

    /// Human-readable label used as the default event title.
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Applied => "Applied",
            Stage::RecruiterScreen => "Recruiter Screen",
            Stage::Assessment => "Assessment",
            Stage::HiringManagerScreen => "Hiring Manager Screen",
            Stage::TechnicalInterview => "Technical Interview",
            Stage::Onsite => "Onsite",
            Stage::Offer => "Offer",
            Stage::Closed => "Closed",
        }
    }

    pub fn parse(s: &str) -> Option<Stage> {
        Stage::ALL.iter().copied().find(|stage| stage.as_str() == s)
    }
}

/// A stage argument as accepted by `transition_stage`.
///
/// `no_change` is a sentinel valid only on input. It resolves to the
/// job's current latest stage and is never stored verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageInput {
    Stage(Stage),
    NoChange,
}

impl StageInput {
    pub fn parse(s: &str) -> Option<StageInput> {
        if s == "no_change" {
            return Some(StageInput::NoChange);
        }
        Stage::parse(s).map(StageInput::Stage)
    }
}

/// Terminal disposition of a closed application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    OfferAccepted,
    Rejected,
    Withdrawn,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [Outcome::OfferAccepted, Outcome::Rejected, Outcome::Withdrawn];

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::OfferAccepted => "offer_accepted",
            Outcome::Rejected => "rejected",
            Outcome::Withdrawn => "withdrawn",
        }
    }

    pub fn parse(s: &str) -> Option<Outcome> {
        Outcome::ALL.iter().copied().find(|o| o.as_str() == s)
    }
}
