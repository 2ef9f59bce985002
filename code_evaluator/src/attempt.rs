use crate::model::Problem;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One learner working one problem. Lives as long as the problem view is open.
#[derive(Debug, Clone)]
pub struct Attempt {
    problem: Arc<Problem>,
    code: String,
    language: String,
    session_id: Option<String>,
    keystroke_count: u64,
    hints_revealed: usize,
    started_at: Instant,
}

impl Attempt {
    pub fn new(problem: Arc<Problem>, language: &str, session_id: Option<String>) -> Self {
        Attempt {
            code: problem.starter_template(language).to_string(),
            language: language.to_string(),
            problem,
            session_id,
            keystroke_count: 0,
            hints_revealed: 0,
            started_at: Instant::now(),
        }
    }

    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn keystroke_count(&self) -> u64 {
        self.keystroke_count
    }

    pub fn hints_revealed(&self) -> usize {
        self.hints_revealed
    }

    pub fn lines_of_code(&self) -> usize {
        self.code.lines().count()
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Replaces the buffer; every edit counts as one keystroke.
    pub fn edit(&mut self, code: String) -> u64 {
        self.code = code;
        self.keystroke_count += 1;
        self.keystroke_count
    }

    /// Switches language and loads that language's starter template.
    pub fn set_language(&mut self, language: &str) {
        self.language = language.to_string();
        self.code = self.problem.starter_template(language).to_string();
    }

    pub fn reveal_hint(&mut self) -> Option<&str> {
        let hint = self.problem.hints.get(self.hints_revealed)?;
        self.hints_revealed += 1;
        Some(hint)
    }

    pub fn code_fingerprint(&self) -> String {
        fingerprint(&self.code)
    }
}

pub fn fingerprint(code: &str) -> String {
    blake3::hash(code.as_bytes()).to_hex().to_string()
}
