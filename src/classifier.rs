use crate::policy::{Policy, PreferenceMode};

/// Outcome of running the relevance rules, naming the rule that decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    EmptyTitle,
    Excluded(String),
    NoIncludeTerm,
    HighExperience(String),
    Seniority(String),
    NoPreferredTerm,
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }
}

/// Runs the layered reject rules over `title` and `snippet`.
///
/// Rules short-circuit in this order: empty title, exclude substrings, missing include
/// substring, high experience pattern, whole-word seniority. In
/// [`PreferenceMode::Required`] a survivor must also carry a prefer term or a low
/// experience range.
pub fn classify(policy: &Policy, title: &str, snippet: &str) -> Verdict {
    if title.trim().is_empty() {
        return Verdict::EmptyTitle;
    }

    let text = format!("{} {}", title, snippet).to_lowercase();

    if let Some(term) = policy.exclude.iter().find(|t| text.contains(t.as_str())) {
        return Verdict::Excluded(term.clone());
    }

    if !policy.include.iter().any(|t| text.contains(t.as_str())) {
        return Verdict::NoIncludeTerm;
    }

    if let Some(m) = policy.high_experience.find(&text) {
        return Verdict::HighExperience(m.as_str().to_string());
    }

    if let Some(m) = policy.seniority.find(&text) {
        return Verdict::Seniority(m.as_str().to_string());
    }

    match policy.mode {
        PreferenceMode::Advisory => Verdict::Accepted,
        PreferenceMode::Required => {
            let preferred = policy.prefer.iter().any(|t| text.contains(t.as_str()));
            if preferred || policy.low_experience.is_match(&text) {
                Verdict::Accepted
            } else {
                Verdict::NoPreferredTerm
            }
        }
    }
}

pub fn is_relevant(policy: &Policy, title: &str, snippet: &str) -> bool {
    classify(policy, title, snippet).is_accepted()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::PolicyConfig;
    use proptest::prelude::*;

    fn policy_with(edit: impl FnOnce(&mut PolicyConfig)) -> Policy {
        let mut config = PolicyConfig::default();
        edit(&mut config);
        Policy::from_config(&config).unwrap()
    }

    #[test]
    fn senior_java_is_rejected() {
        let policy = Policy::default();
        assert!(!is_relevant(&policy, "Senior Java Developer", ""));
        assert!(matches!(classify(&policy, "Senior Java Developer", ""), Verdict::Excluded(_)));
    }

    #[test]
    fn python_fresher_is_accepted() {
        assert!(is_relevant(&Policy::default(), "Python Developer Fresher", ""));
    }

    #[test]
    fn five_plus_years_is_rejected() {
        assert!(!is_relevant(&Policy::default(), "Data Analyst with 5+ years experience", ""));
    }

    #[test]
    fn experience_pattern_catches_what_phrases_miss() {
        // Without the literal tenure phrases only the regex stands between us and "5+ years".
        let policy = policy_with(|c| c.exclude_terms = vec!["php".to_string()]);
        assert_eq!(
            classify(&policy, "Data Analyst with 5+ years experience", ""),
            Verdict::HighExperience("5+ years".to_string())
        );
        assert!(matches!(classify(&policy, "Python dev, 7 yrs", ""), Verdict::HighExperience(_)));
        assert!(matches!(classify(&policy, "SQL analyst 12 years", ""), Verdict::HighExperience(_)));
        assert!(is_relevant(&policy, "Python dev 2 years", ""));
    }

    #[test]
    fn react_with_empty_snippet_is_accepted() {
        assert!(is_relevant(&Policy::default(), "React Developer", ""));
    }

    #[test]
    fn empty_title_is_rejected_even_with_matching_snippet() {
        let policy = Policy::default();
        assert_eq!(classify(&policy, "", "python"), Verdict::EmptyTitle);
        assert_eq!(classify(&policy, "   ", ""), Verdict::EmptyTitle);
    }

    #[test]
    fn missing_include_term_is_rejected() {
        assert_eq!(classify(&Policy::default(), "Office Receptionist", ""), Verdict::NoIncludeTerm);
    }

    #[test]
    fn seniority_word_is_a_second_net() {
        let policy = policy_with(|c| c.exclude_terms.clear());
        assert_eq!(
            classify(&policy, "Python Team Lead", ""),
            Verdict::Seniority("lead".to_string())
        );
        // whole words only
        assert!(is_relevant(&policy, "Python Leadership Program", ""));
    }

    #[test]
    fn snippet_participates_in_matching() {
        let policy = Policy::default();
        assert!(is_relevant(&policy, "Graduate Engineer", "python, sql"));
        assert!(!is_relevant(&policy, "Python Engineer", "Laravel shop"));
    }

    #[test]
    fn required_mode_needs_a_preference_signal() {
        let policy = policy_with(|c| c.preference_mode = PreferenceMode::Required);
        assert_eq!(classify(&policy, "Python Developer", ""), Verdict::NoPreferredTerm);
        assert!(is_relevant(&policy, "Python Developer Intern", ""));
        assert!(is_relevant(&policy, "Python Developer (0-2 years)", ""));
        assert!(is_relevant(&policy, "Python Developer 1 yr", ""));
        assert!(is_relevant(&policy, "Python Developer 1-2 years", ""));
        assert!(is_relevant(&policy, "Python Developer 2 years", ""));
        assert!(is_relevant(&policy, "Python Developer (2 yrs)", ""));
        assert!(is_relevant(&policy, "Python Developer 1 to 2 years", ""));
        assert_eq!(classify(&policy, "Python Developer 12 years", ""), Verdict::HighExperience("12 years".to_string()));
    }

    #[test]
    fn advisory_mode_ignores_preferences() {
        let policy = Policy::default();
        assert!(is_relevant(&policy, "Python Developer", ""));
        assert!(is_relevant(&policy, "Python Developer Trainee", ""));
    }

    proptest! {
        #[test]
        fn classification_is_deterministic(title in ".{0,40}", snippet in ".{0,40}") {
            let policy = Policy::default();
            prop_assert_eq!(classify(&policy, &title, &snippet), classify(&policy, &title, &snippet));
        }
    }
}
