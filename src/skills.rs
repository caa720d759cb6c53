//! Skill entries shown as tags, and where the list comes from.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::config::SkillTagsConfig;
use crate::error::SkillTagsError;

/// One skill entry. Identity is its index in the list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl Skill {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subtitle: None,
            icon: None,
        }
    }
}

/// Portfolio document shape; everything but `skills` is ignored.
#[derive(Debug, Deserialize)]
struct PortfolioDocument {
    #[serde(default)]
    skills: Vec<Skill>,
}

const DEFAULT_SKILLS: &[&str] = &[
    "Python",
    "Java",
    "C++",
    "JavaScript",
    "TypeScript",
    "Go",
    "Rust",
    "C#",
    "Next.js",
    "React",
    "TailwindCSS",
    "Express.js",
    "FastAPI",
    "Google Cloud",
    "AWS",
    "Docker",
    "CI/CD/GitHub Actions",
    "MongoDB",
    "PostgreSQL",
    "Redis",
];

pub fn default_skills() -> Vec<Skill> {
    DEFAULT_SKILLS.iter().map(|name| Skill::new(*name)).collect()
}

/// Read the `skills` array out of a portfolio JSON file.
pub fn load_skills_file(path: &Path) -> Result<Vec<Skill>, SkillTagsError> {
    let content = fs::read_to_string(path)?;
    let doc: PortfolioDocument = serde_json::from_str(&content)?;
    Ok(doc.skills)
}

/// Resolve the skill list.
/// Search order: inline config list > skills file > built-in portfolio list.
pub fn resolve(config: &SkillTagsConfig) -> Vec<Skill> {
    if !config.skills.is_empty() {
        return config.skills.clone();
    }
    if let Some(ref path) = config.skills_file {
        match load_skills_file(path) {
            Ok(skills) if !skills.is_empty() => {
                info!(path = %path.display(), count = skills.len(), "loaded skills file");
                return skills;
            }
            Ok(_) => {
                warn!(path = %path.display(), "skills file has no entries");
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load skills file");
            }
        }
    }
    default_skills()
}
