use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

/// What happened to one entry during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "outcome", content = "detail")]
pub enum Outcome {
    /// Local path now links into the store
    Linked,
    /// Already in the desired state
    Unchanged,
    /// Symlink replaced by a real copy of its target
    Restored,
    /// Copied in from an archive
    Imported,
    /// Nothing on either side
    Absent,
    /// Left alone on purpose, with the reason
    Skipped(String),
    /// Failed; other entries were still processed
    Failed(String),
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryReport {
    pub section: String,
    pub entry: String,
    pub path: PathBuf,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Per-entry outcomes of a reconcile, unsync or import run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub entries: Vec<EntryReport>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, section: &str, entry: &str, path: PathBuf, outcome: Outcome) {
        self.entries.push(EntryReport {
            section: section.to_string(),
            entry: entry.to_string(),
            path,
            outcome,
        });
    }

    /// Whether any entry failed
    pub fn errored(&self) -> bool {
        self.entries.iter().any(|e| e.outcome.is_failure())
    }

    pub fn failures(&self) -> impl Iterator<Item = &EntryReport> {
        self.entries.iter().filter(|e| e.outcome.is_failure())
    }

    pub fn count(&self, predicate: impl Fn(&Outcome) -> bool) -> usize {
        self.entries.iter().filter(|e| predicate(&e.outcome)).count()
    }

    pub fn outcome_of(&self, section: &str, entry: &str) -> Option<&Outcome> {
        self.entries
            .iter()
            .find(|e| e.section == section && e.entry == entry)
            .map(|e| &e.outcome)
    }

    /// One-line colored tally for the terminal
    pub fn summary_line(&self) -> String {
        let done = self.count(|o| {
            matches!(o, Outcome::Linked | Outcome::Restored | Outcome::Imported)
        });
        let unchanged = self.count(|o| matches!(o, Outcome::Unchanged | Outcome::Absent));
        let skipped = self.count(|o| matches!(o, Outcome::Skipped(_)));
        let failed = self.count(Outcome::is_failure);

        format!(
            "  {} Done    {} Unchanged    {} Skipped    {} Failed",
            format!("{done}").green(),
            format!("{unchanged}").dimmed(),
            format!("{skipped}").yellow(),
            format!("{failed}").red(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errored_and_counts() {
        let mut report = Report::new();
        report.record("s", "a", PathBuf::from("/a"), Outcome::Linked);
        report.record("s", "b", PathBuf::from("/b"), Outcome::Skipped("conflict".into()));
        assert!(!report.errored());

        report.record("s", "c", PathBuf::from("/c"), Outcome::Failed("boom".into()));
        assert!(report.errored());
        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.count(|o| matches!(o, Outcome::Linked)), 1);
        assert_eq!(report.outcome_of("s", "b"), Some(&Outcome::Skipped("conflict".into())));
        assert_eq!(report.outcome_of("s", "z"), None);
    }

    #[test]
    fn test_serializes_flat_entries() {
        let mut report = Report::new();
        report.record("s", "c", PathBuf::from("/c"), Outcome::Failed("boom".into()));
        report.record("s", "d", PathBuf::from("/d"), Outcome::Linked);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["entries"][0]["outcome"], "failed");
        assert_eq!(json["entries"][0]["detail"], "boom");
        assert_eq!(json["entries"][1]["outcome"], "linked");
        assert_eq!(json["entries"][1]["section"], "s");
    }
}
