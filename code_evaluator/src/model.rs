pub use common::models::{ExecutionResult, StructuredValue, SubmissionStatus, TestCase, TestOutcome};
use crate::normalizer::{parse_input, parse_output};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Example {
    #[schema(value_type = Object)]
    pub input: Value,
    #[schema(value_type = Object)]
    pub output: Value,
    #[serde(default)]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct ProblemTestCase {
    #[schema(value_type = Object)]
    pub input: Value,
    #[serde(alias = "output", alias = "expectedOutput")]
    #[schema(value_type = Object)]
    pub expected_output: Value,
    #[serde(default)]
    pub hidden: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Problem {
    pub id: String,
    #[serde(default)]
    pub statement: String,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default)]
    pub examples: Vec<Example>,
    #[serde(default)]
    pub test_cases: Vec<ProblemTestCase>,
    #[serde(default)]
    pub hints: Vec<String>,
    /// Starter template per language.
    #[serde(default)]
    pub starter_code: HashMap<String, String>,
    #[serde(default)]
    pub time_limit_ms: Option<u64>,
    #[serde(default)]
    pub memory_limit_kb: Option<u64>,
}

impl Problem {
    pub fn starter_template(&self, language: &str) -> &str {
        self.starter_code
            .get(language)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// The normalized visible suite. When no visible test cases are declared
    /// the worked examples stand in for them.
    pub fn visible_test_cases(&self) -> Vec<TestCase> {
        let visible = self
            .test_cases
            .iter()
            .filter(|tc| !tc.hidden)
            .map(|tc| TestCase {
                input: parse_input(&tc.input),
                expected_output: parse_output(&tc.expected_output),
                hidden: false,
            })
            .collect::<Vec<_>>();
        if !visible.is_empty() {
            return visible;
        }
        self.examples
            .iter()
            .map(|ex| TestCase {
                input: parse_input(&ex.input),
                expected_output: parse_output(&ex.output),
                hidden: false,
            })
            .collect()
    }
}
