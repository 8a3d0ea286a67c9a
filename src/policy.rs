use std::fs;
use std::path::Path;

use log::info;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const EXCLUDE_TERMS: &[&str] = &[
    "php", "laravel", "wordpress", "drupal", ".net", "c#", "java", "spring", "hibernate",
    "senior", "lead", "manager", "architect", "director", "principal", "vp", "head",
    "3 year", "3 years", "4 year", "4 years", "5 year", "5 years", "5+", "6 year", "6 years",
];

const PREFER_TERMS: &[&str] = &[
    "fresher", "freshers", "intern", "internship", "trainee", "entry level",
    "0-1", "0 - 1", "0-2", "0 - 2", "0 to 2", "1 year", "below 2", "junior",
];

const INCLUDE_TERMS: &[&str] = &[
    // web & backend
    "python", "django", "flask", "fastapi", "react", "angular", "vue", "javascript", "typescript",
    "full stack", "backend", "frontend", "web developer", "backend developer", "rest api", "graphql",
    // data & ml
    "machine learning", "ml", "ai", "artificial intelligence", "deep learning",
    "data science", "data scientist", "data analyst", "analytics", "business intelligence",
    "power bi", "tableau", "excel", "sql", "dashboard", "bi developer", "data engineer",
    "nlp", "llm", "pandas", "numpy", "scikit-learn", "tensorflow", "pytorch",
    "junior data analyst", "business data analyst", "business analyst", "reporting analyst",
    "data reporting analyst", "operations analyst", "product analyst", "marketing analyst",
    "financial analyst", "bi analyst", "business intelligence analyst", "data quality analyst",
    "data visualization analyst", "quantitative analyst", "quant analyst", "statistical analyst",
    "data science analyst", "insights analyst", "data operations analyst", "risk analyst",
    "fraud analyst", "workforce analyst", "revenue analyst", "research analyst",
    "analytics specialist", "decision support analyst",
    // mobile
    "flutter", "dart", "flutter developer", "mobile developer", "android developer", "ios developer",
    "cross platform developer", "mobile app developer", "flutter bloc", "bloc pattern", "provider",
    "riverpod", "getx", "flutter mobx", "flutter cubit", "flutter hooks", "clean architecture flutter",
    "react native", "kotlin", "swift", "java android", "objective c",
    // backend services & storage
    "firebase", "supabase", "appwrite", "backend integration",
    "sqlite", "hive", "moor", "isar", "shared preferences",
    // ui
    "ui design", "ux", "material design", "responsive ui", "widget development", "state management",
    // tooling & cloud
    "git", "github", "devops", "ci cd", "play store", "app store", "deployment", "version control",
    "aws", "gcp", "google cloud", "azure", "cloud functions",
    // testing
    "unit testing", "integration testing", "flutter test", "widget testing",
];

const HIGH_EXPERIENCE_PATTERN: &str = r"\b([3-9]|[1-9]\d)\+?\s*(year|years|yrs|yr)\b";
const SENIORITY_PATTERN: &str = r"\b(senior|lead|manager|director|principal|head|vp|architect)\b";
const LOW_EXPERIENCE_PATTERN: &str =
    r"\b[0-2]\s*(-|to)\s*[0-2]\s*(year|years|yrs|yr)\b|\b[0-2]\+?\s*(year|years|yrs|yr)\b";

/// How prefer terms affect acceptance once every reject rule has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferenceMode {
    /// Prefer terms are informational; everything that survives the reject rules is accepted.
    #[default]
    Advisory,
    /// A prefer term or an explicit low experience range is required.
    Required,
}

/// Policy as stored on disk. Missing fields fall back to the built-in lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub exclude_terms: Vec<String>,
    pub prefer_terms: Vec<String>,
    pub include_terms: Vec<String>,
    pub high_experience_pattern: String,
    pub seniority_pattern: String,
    pub low_experience_pattern: String,
    pub preference_mode: PreferenceMode,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        let owned = |terms: &[&str]| terms.iter().map(|t| t.to_string()).collect();
        PolicyConfig {
            exclude_terms: owned(EXCLUDE_TERMS),
            prefer_terms: owned(PREFER_TERMS),
            include_terms: owned(INCLUDE_TERMS),
            high_experience_pattern: HIGH_EXPERIENCE_PATTERN.to_string(),
            seniority_pattern: SENIORITY_PATTERN.to_string(),
            low_experience_pattern: LOW_EXPERIENCE_PATTERN.to_string(),
            preference_mode: PreferenceMode::Advisory,
        }
    }
}

/// Compiled relevance policy. Built once per run and shared by reference.
#[derive(Debug, Clone)]
pub struct Policy {
    pub(crate) exclude: Vec<String>,
    pub(crate) prefer: Vec<String>,
    pub(crate) include: Vec<String>,
    pub(crate) high_experience: Regex,
    pub(crate) seniority: Regex,
    pub(crate) low_experience: Regex,
    pub(crate) mode: PreferenceMode,
}

impl Policy {
    pub fn from_config(config: &PolicyConfig) -> Result<Self, ConfigError> {
        let include = lowered(&config.include_terms);
        if include.is_empty() {
            return Err(ConfigError::EmptyIncludeTerms);
        }

        Ok(Policy {
            exclude: lowered(&config.exclude_terms),
            prefer: lowered(&config.prefer_terms),
            include,
            high_experience: compile("high_experience_pattern", &config.high_experience_pattern)?,
            seniority: compile("seniority_pattern", &config.seniority_pattern)?,
            low_experience: compile("low_experience_pattern", &config.low_experience_pattern)?,
            mode: config.preference_mode,
        })
    }

    /// Loads a JSON policy. A missing file means the built-in policy.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        if !path_ref.exists() {
            info!("No policy file at {:?}. Using built-in policy.", path_ref);
            return Policy::from_config(&PolicyConfig::default());
        }

        let display = path_ref.display().to_string();
        let content = fs::read_to_string(path_ref).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;
        let config: PolicyConfig = serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: display.clone(),
            source,
        })?;

        let policy = Policy::from_config(&config)?;
        info!(
            "Loaded policy from {}: {} include, {} exclude, {} prefer terms ({:?} mode).",
            display,
            policy.include.len(),
            policy.exclude.len(),
            policy.prefer.len(),
            policy.mode
        );
        Ok(policy)
    }

    pub fn mode(&self) -> PreferenceMode {
        self.mode
    }
}

impl Default for Policy {
    fn default() -> Self {
        Policy::from_config(&PolicyConfig::default()).expect("built-in policy compiles")
    }
}

fn lowered(terms: &[String]) -> Vec<String> {
    terms
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

fn compile(name: &'static str, pattern: &str) -> Result<Regex, ConfigError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| ConfigError::Pattern { name, source })
}
