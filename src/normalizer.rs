use std::collections::HashSet;

use log::debug;
use url::Url;

use crate::job::{JobCandidate, JobRecord};

/// Trims every field. Returns `None` when nothing is left of the title.
/// An empty company becomes the source's display name; a link that is not an
/// absolute http(s) URL is dropped.
pub fn normalize(candidate: &JobCandidate) -> Option<JobRecord> {
    let title = candidate.title.trim();
    if title.is_empty() {
        return None;
    }

    let company = match candidate.company.trim() {
        "" => candidate.source.display_name(),
        c => c,
    };

    let link = candidate.link.trim();
    let link = if link.is_empty() || is_web_link(link) {
        link.to_string()
    } else {
        debug!("Dropping non-web link '{}' for '{}'", link, title);
        String::new()
    };

    Some(JobRecord {
        title: title.to_string(),
        company: company.to_string(),
        link,
    })
}

fn is_web_link(link: &str) -> bool {
    Url::parse(link)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Keeps the first record for every case-insensitive `(title, company)` key, in input order.
pub fn dedupe(records: Vec<JobRecord>) -> Vec<JobRecord> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(records.len());
    for record in records {
        if seen.insert(record.identity_key()) {
            unique.push(record);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::SourceId;
    use proptest::prelude::*;

    fn candidate(title: &str, company: &str, link: &str) -> JobCandidate {
        JobCandidate {
            title: title.to_string(),
            company: company.to_string(),
            link: link.to_string(),
            source: SourceId::Technopark,
        }
    }

    fn record(title: &str, company: &str) -> JobRecord {
        JobRecord {
            title: title.to_string(),
            company: company.to_string(),
            link: String::new(),
        }
    }

    #[test]
    fn normalize_trims_and_defaults_company() {
        let job = normalize(&candidate("  Python Intern \n", "  ", " https://t.example/j/1 ")).unwrap();
        assert_eq!(job.title, "Python Intern");
        assert_eq!(job.company, "Technopark");
        assert_eq!(job.link, "https://t.example/j/1");
    }

    #[test]
    fn normalize_drops_blank_titles_and_relative_links() {
        assert!(normalize(&candidate("   ", "Acme", "")).is_none());
        let job = normalize(&candidate("ML Engineer", "Acme", "/relative")).unwrap();
        assert_eq!(job.link, "");
    }

    #[test]
    fn normalize_drops_script_and_contact_links() {
        for link in ["javascript:void(0)", "mailto:hr@x.in", "tel:123"] {
            let job = normalize(&candidate("Python Intern", "Acme", link)).unwrap();
            assert_eq!(job.link, "", "{} should not survive", link);
        }
        let job = normalize(&candidate("Python Intern", "Acme", "http://x.in/j/2")).unwrap();
        assert_eq!(job.link, "http://x.in/j/2");
    }

    #[test]
    fn dedupe_is_case_insensitive_and_keeps_first() {
        let mut first = record("Python Intern", "Acme");
        first.link = "https://a.example/1".to_string();
        let out = dedupe(vec![
            first.clone(),
            record("React Developer", "Beta"),
            record("python intern", "ACME"),
        ]);
        assert_eq!(out, vec![first, record("React Developer", "Beta")]);
    }

    #[test]
    fn same_title_at_different_companies_is_kept() {
        let out = dedupe(vec![record("Data Analyst", "Acme"), record("Data Analyst", "Beta")]);
        assert_eq!(out.len(), 2);
    }

    fn records() -> impl Strategy<Value = Vec<JobRecord>> {
        prop::collection::vec(
            (prop::sample::select(vec!["Dev", "dev", "Analyst", "ANALYST"]), prop::sample::select(vec!["Acme", "acme", "Beta"])),
            0..20,
        )
        .prop_map(|pairs| pairs.into_iter().map(|(t, c)| record(t, c)).collect())
    }

    proptest! {
        #[test]
        fn dedupe_is_idempotent(input in records()) {
            let once = dedupe(input);
            prop_assert_eq!(dedupe(once.clone()), once);
        }

        #[test]
        fn dedupe_preserves_first_occurrence_order(input in records()) {
            let out = dedupe(input.clone());
            let mut expected: Vec<(String, String)> = Vec::new();
            for r in &input {
                if !expected.contains(&r.identity_key()) {
                    expected.push(r.identity_key());
                }
            }
            let keys: Vec<(String, String)> = out.iter().map(JobRecord::identity_key).collect();
            prop_assert_eq!(keys, expected);
        }
    }
}
