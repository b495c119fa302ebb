//! Catalog of the agents exposed through the proxy.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Path prefix under which the proxy forwards requests to the backend.
pub const PROXY_PREFIX: &str = "/api/aurora";

/// The chat agents served by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    /// Onboarding FAQ answers from policy documents.
    Welcome,
    /// 30-60 day learning plans.
    #[serde(rename = "skillnav")]
    SkillNav,
    /// Learning progress summaries and nudges.
    Progress,
}

impl AgentKind {
    pub const ALL: [AgentKind; 3] = [Self::Welcome, Self::SkillNav, Self::Progress];

    pub fn slug(self) -> &'static str {
        match self {
            Self::Welcome => "welcome",
            Self::SkillNav => "skillnav",
            Self::Progress => "progress",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Welcome => "Welcome Agent",
            Self::SkillNav => "Skill Navigator",
            Self::Progress => "Progress Companion",
        }
    }

    pub fn placeholder(self) -> &'static str {
        match self {
            Self::Welcome => "Ask an onboarding question…",
            Self::SkillNav => "Describe your role, goals, or the skills you want to build…",
            Self::Progress => "Ask about your learning progress, goals, or need motivation...",
        }
    }

    /// Same-origin path of the agent's streaming endpoint.
    pub fn stream_path(self) -> String {
        format!("{}/agents/{}/stream", PROXY_PREFIX, self.slug())
    }

    /// Absolute streaming URL for a server reachable at `base_url`.
    pub fn stream_url(self, base_url: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), self.stream_path())
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for AgentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "welcome" | "onboarding" => Ok(Self::Welcome),
            "skillnav" | "skill-navigator" | "skills" => Ok(Self::SkillNav),
            "progress" => Ok(Self::Progress),
            other => Err(format!(
                "unknown agent '{other}' (expected one of: welcome, skillnav, progress)"
            )),
        }
    }
}
