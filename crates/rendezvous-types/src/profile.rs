//! Agent profile documents.
//!
//! A profile is the long-lived record behind an agent: who they are and,
//! for recruiters, which criteria they screen for. Profiles are created
//! through the API (or the seed file) before an agent can be spawned into
//! the world.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::AgentType;
use crate::ids::AgentId;
use crate::structs::Participant;

/// A stored agent profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AgentProfile {
    /// Profile id, also used as the agent id in the world.
    pub id: AgentId,
    /// Unique login-style handle.
    pub username: String,
    /// Display name.
    pub name: String,
    /// Recruiter or candidate. Must agree with `details`.
    pub agent_type: AgentType,
    /// Role-specific profile body.
    pub details: ProfileDetails,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl AgentProfile {
    /// The `{agent_id, name}` pair recorded on conversations.
    pub fn participant(&self) -> Participant {
        Participant {
            agent_id: self.id,
            name: self.name.clone(),
        }
    }

    /// The recruiter body, if this is a recruiter.
    pub const fn as_recruiter(&self) -> Option<&RecruiterProfile> {
        match &self.details {
            ProfileDetails::Recruiter(profile) => Some(profile),
            ProfileDetails::Candidate(_) => None,
        }
    }

    /// The candidate body, if this is a candidate.
    pub const fn as_candidate(&self) -> Option<&CandidateProfile> {
        match &self.details {
            ProfileDetails::Candidate(profile) => Some(profile),
            ProfileDetails::Recruiter(_) => None,
        }
    }

    /// Check the profile for internal consistency.
    ///
    /// Returns a human-readable reason on the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.username.trim().is_empty() {
            return Err("username must not be empty".to_owned());
        }
        if self.name.trim().is_empty() {
            return Err("name must not be empty".to_owned());
        }
        if self.details.agent_type() != self.agent_type {
            return Err(format!(
                "agent_type is {} but profile details describe a {}",
                self.agent_type,
                self.details.agent_type()
            ));
        }
        match &self.details {
            ProfileDetails::Recruiter(profile) => profile.validate(),
            ProfileDetails::Candidate(profile) => profile.validate(),
        }
    }
}

/// Role-specific profile body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ProfileDetails {
    /// Recruiter profile.
    Recruiter(RecruiterProfile),
    /// Candidate profile.
    Candidate(CandidateProfile),
}

impl ProfileDetails {
    /// The agent type this body belongs to.
    pub const fn agent_type(&self) -> AgentType {
        match self {
            Self::Recruiter(_) => AgentType::Recruiter,
            Self::Candidate(_) => AgentType::Candidate,
        }
    }
}

/// What a recruiter is hiring for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RecruiterProfile {
    /// Short self-description.
    #[serde(default)]
    pub bio: String,
    /// The role being filled.
    pub role_description: String,
    /// Criteria verified during a conversation. At least one.
    pub candidate_selection_criteria: Vec<String>,
    /// Conditions that immediately rule a candidate out.
    #[serde(default)]
    pub deal_breakers: Vec<String>,
    /// Signals that count in a candidate's favour.
    #[serde(default)]
    pub positive_signals: Vec<String>,
    /// About the company.
    #[serde(default)]
    pub company_context: String,
    /// About the team.
    #[serde(default)]
    pub team_context: String,
}

impl RecruiterProfile {
    fn validate(&self) -> Result<(), String> {
        if self.role_description.trim().is_empty() {
            return Err("role_description must not be empty".to_owned());
        }
        if self.candidate_selection_criteria.is_empty() {
            return Err("at least one candidate_selection_criteria entry is required".to_owned());
        }
        if self.candidate_selection_criteria.iter().any(|c| c.trim().is_empty()) {
            return Err("candidate_selection_criteria entries must not be blank".to_owned());
        }
        Ok(())
    }
}

/// One previous job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct WorkExperience {
    /// Employer.
    pub company: String,
    /// Job title.
    pub title: String,
    /// Free-form duration, e.g. `2021 - present`.
    #[serde(default)]
    pub duration: String,
    /// Notable achievements.
    #[serde(default)]
    pub highlights: Vec<String>,
}

/// A candidate's background.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CandidateProfile {
    /// Contact email.
    #[serde(default)]
    pub email: String,
    /// Elevator pitch.
    pub professional_summary: String,
    /// Previous jobs, most recent first. At least one.
    pub work_experience: Vec<WorkExperience>,
    /// Languages, frameworks, tools. At least one.
    pub technical_skills: Vec<String>,
    /// Degrees and certifications.
    #[serde(default)]
    pub education: Vec<String>,
    /// Side projects or notable open-source work.
    #[serde(default)]
    pub projects: Vec<String>,
    /// What the candidate wants next.
    #[serde(default)]
    pub career_goals: String,
    /// Personal interests.
    #[serde(default)]
    pub interests: Vec<String>,
    /// Where the candidate is based.
    #[serde(default)]
    pub location: String,
    /// Notice period or start date.
    #[serde(default)]
    pub availability: String,
}

impl CandidateProfile {
    fn validate(&self) -> Result<(), String> {
        if self.professional_summary.trim().is_empty() {
            return Err("professional_summary must not be empty".to_owned());
        }
        if self.work_experience.is_empty() {
            return Err("at least one work_experience entry is required".to_owned());
        }
        if self.technical_skills.is_empty() {
            return Err("at least one technical_skills entry is required".to_owned());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recruiter() -> AgentProfile {
        AgentProfile {
            id: AgentId::new(),
            username: "sarah".to_owned(),
            name: "Sarah Chen".to_owned(),
            agent_type: AgentType::Recruiter,
            details: ProfileDetails::Recruiter(RecruiterProfile {
                role_description: "Senior backend engineer".to_owned(),
                candidate_selection_criteria: vec!["5+ years Rust".to_owned()],
                ..RecruiterProfile::default()
            }),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn valid_recruiter_passes() {
        assert!(recruiter().validate().is_ok());
    }

    #[test]
    fn type_mismatch_is_rejected() {
        let mut profile = recruiter();
        profile.agent_type = AgentType::Candidate;
        let err = profile.validate().err().unwrap_or_default();
        assert!(err.contains("agent_type"));
    }

    #[test]
    fn recruiter_needs_criteria() {
        let mut profile = recruiter();
        profile.details = ProfileDetails::Recruiter(RecruiterProfile {
            role_description: "x".to_owned(),
            ..RecruiterProfile::default()
        });
        assert!(profile.validate().is_err());
    }

    #[test]
    fn candidate_needs_experience_and_skills() {
        let profile = AgentProfile {
            id: AgentId::new(),
            username: "alex".to_owned(),
            name: "Alex Johnson".to_owned(),
            agent_type: AgentType::Candidate,
            details: ProfileDetails::Candidate(CandidateProfile {
                professional_summary: "Engineer".to_owned(),
                technical_skills: vec!["Rust".to_owned()],
                ..CandidateProfile::default()
            }),
            created_at: Utc::now(),
        };
        assert!(profile.validate().is_err());
    }

    #[test]
    fn details_serialize_externally_tagged() {
        let json = serde_json::to_value(recruiter()).unwrap_or_default();
        assert!(json.pointer("/details/recruiter/role_description").is_some());
        assert_eq!(json.get("agent_type").and_then(|v| v.as_str()), Some("recruiter"));
    }
}
