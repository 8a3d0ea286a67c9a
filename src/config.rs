use std::env;
use std::path::PathBuf;

use log::warn;

const POLICY_FILE: &str = "policy.json";
const OUTPUT_CSV: &str = "jobs.csv";
const OUTBOX_DIR: &str = "outbox";

/// Paths for one run, overridable through the environment.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub policy_file: PathBuf,
    pub output_csv: PathBuf,
    pub outbox_dir: PathBuf,
}

impl RunConfig {
    pub fn from_env() -> Self {
        RunConfig {
            policy_file: env_path("JOB_POLICY_FILE", POLICY_FILE),
            output_csv: env_path("JOBS_CSV", OUTPUT_CSV),
            outbox_dir: env_path("JOBS_OUTBOX", OUTBOX_DIR),
        }
    }
}

fn env_path(key: &str, default: &str) -> PathBuf {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub name: String,
    pub email: String,
}

/// Values consumed by the digest writer.
#[derive(Debug, Clone, Default)]
pub struct DeliveryConfig {
    pub sender: Option<String>,
    pub recipients: Vec<Recipient>,
    pub tracker_url: Option<String>,
}

impl DeliveryConfig {
    pub fn from_env() -> Self {
        let lookup = |key: &str| env::var(key).ok().filter(|v| !v.trim().is_empty());
        DeliveryConfig::from_values(
            lookup("EMAIL_USER"),
            lookup("EMAIL_TO").as_deref().unwrap_or(""),
            lookup("STUDENT_NAMES").as_deref().unwrap_or(""),
            lookup("TRACKER_URL"),
        )
    }

    /// Pairs recipients with display names by position. Missing names become "Student".
    pub fn from_values(sender: Option<String>, emails: &str, names: &str, tracker_url: Option<String>) -> Self {
        let emails = split_list(emails);
        let names = split_list(&names.replace(['\r', '\n'], ""));

        if !emails.is_empty() && names.len() != emails.len() {
            warn!(
                "STUDENT_NAMES count ({}) != EMAIL_TO count ({}). Pairing by index.",
                names.len(),
                emails.len()
            );
        }

        let recipients = emails
            .into_iter()
            .enumerate()
            .map(|(i, email)| Recipient {
                name: names.get(i).cloned().unwrap_or_else(|| "Student".to_string()),
                email,
            })
            .collect();

        DeliveryConfig {
            sender,
            recipients,
            tracker_url: tracker_url.map(|u| u.trim().to_string()),
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipients_pair_with_names_by_index() {
        let config = DeliveryConfig::from_values(
            None,
            " a@x.org, b@x.org ,c@x.org,",
            "Asha ,\r\nBinu",
            Some(" https://t.example/track ".to_string()),
        );
        let names: Vec<&str> = config.recipients.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Asha", "Binu", "Student"]);
        assert_eq!(config.recipients[1].email, "b@x.org");
        assert_eq!(config.tracker_url.as_deref(), Some("https://t.example/track"));
    }

    #[test]
    fn no_recipients_when_list_is_empty() {
        let config = DeliveryConfig::from_values(None, "  ", "Asha", None);
        assert!(config.recipients.is_empty());
    }
}
