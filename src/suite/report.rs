use super::scenarios::Marker;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Failed(String),
    Skipped,
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Passed => "passed",
            Outcome::Failed(_) => "failed",
            Outcome::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScenarioResult {
    pub name: String,
    pub marker: Option<Marker>,
    pub outcome: Outcome,
    pub duration: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct SuiteReport {
    pub results: Vec<ScenarioResult>,
    pub elapsed: Duration,
}

impl SuiteReport {
    pub fn push(&mut self, result: ScenarioResult) {
        self.results.push(result);
    }

    fn count(&self, label: &str) -> usize {
        self.results
            .iter()
            .filter(|r| r.outcome.label() == label)
            .count()
    }

    pub fn passed(&self) -> usize {
        self.count("passed")
    }

    pub fn failed(&self) -> usize {
        self.count("failed")
    }

    pub fn skipped(&self) -> usize {
        self.count("skipped")
    }

    /// A run with nothing executed is not a success.
    pub fn is_success(&self) -> bool {
        self.failed() == 0 && self.passed() > 0
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.results.iter().filter_map(|r| match &r.outcome {
            Outcome::Failed(reason) => Some((r.name.as_str(), reason.as_str())),
            _ => None,
        })
    }

    pub fn summary(&self) -> String {
        format!(
            "{} passed, {} failed, {} skipped in {:.2}s",
            self.passed(),
            self.failed(),
            self.skipped(),
            self.elapsed.as_secs_f64()
        )
    }
}

impl fmt::Display for SuiteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for result in &self.results {
            let marker = result
                .marker
                .map(|m| format!(" [{m}]"))
                .unwrap_or_default();
            writeln!(
                f,
                "{:<8} {}{} ({} ms)",
                result.outcome.label().to_uppercase(),
                result.name,
                marker,
                result.duration.as_millis()
            )?;
        }
        for (name, reason) in self.failures() {
            writeln!(f, "FAILED {name} - {reason}")?;
        }
        write!(f, "{}", self.summary())
    }
}
