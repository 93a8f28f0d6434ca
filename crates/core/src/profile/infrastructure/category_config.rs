use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::profile::domain::profile_classifier::{validate_categories, Category};
use crate::shared::config::ConfigError;

const BUSINESS_LEADER: &[&str] = &[
    "senior", "business", "leader", "director", "associate", "collaboration", "consultant",
    "administrator", "planner", "business", "manager", "management", "project", "projects",
    "service",
];
const TECHNICAL_LEADER: &[&str] = &[
    "senior", "scientist", "director", "associate", "policy", "project", "projects",
    "buildings", "engineer", "technical", "leader", "transport", "structure", "infrastructure",
];
const DIGITAL_LEADER: &[&str] = &[
    "senior", "scientist", "digital", "leader", "director", "associate", "value", "account",
    "enterprise", "architecture", "smart", "cities", "machine", "learning",
];
const DIGITAL_DESIGNER: &[&str] = &[
    "com", "digital", "designer", "interaction", "service", "design", "visualisation",
    "modelling", "rhinocerous", "blender", "archicad", "autocad", "adt", "revit", "virtual",
    "augmented", "reality", "programming", "c", "c++", "python", "gui", "linux", "open",
    "source", "radiance", "bimodelling", "complex", "geometry", "facades", "3d", "printing",
];
const DIGITAL_ANALYST: &[&str] = &[
    "digital", "analyst", "advanced", "analysis", "optimisation", "software", "development",
    "design", "automation", "vb.net", "vba", "scripting", "bim", "software", "service",
    "saas", "cloud",
];

/// Profile categories for the classifier, loadable from JSON:
///
/// ```json
/// { "categories": [ { "profile": "Engineer", "keywords": ["bridges"] } ] }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub categories: Vec<Category>,
}

impl CategoryConfig {
    /// The five built-in staff categories.
    pub fn builtin() -> Self {
        let category = |profile: &str, keywords: &[&str]| Category {
            profile: profile.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        };
        Self {
            categories: vec![
                category("Business leader", BUSINESS_LEADER),
                category("Technical leader", TECHNICAL_LEADER),
                category("Digital leader", DIGITAL_LEADER),
                category("Digital designer", DIGITAL_DESIGNER),
                category("Digital analyst", DIGITAL_ANALYST),
            ],
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&json).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        validate_categories(&config.categories)?;
        Ok(config)
    }
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self::builtin()
    }
}
