use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use std::fmt;
use utoipa::ToSchema;

/// Normalized representation of a test case input or output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum StructuredValue {
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
    List(Vec<StructuredValue>),
    Record(BTreeMap<String, StructuredValue>),
}

impl StructuredValue {
    pub fn text(s: impl Into<String>) -> Self {
        StructuredValue::Text(s.into())
    }

    pub fn to_json(&self) -> Value {
        match self {
            StructuredValue::Null => Value::Null,
            StructuredValue::Bool(b) => Value::Bool(*b),
            StructuredValue::Number(n) => Value::Number(n.clone()),
            StructuredValue::Text(s) => Value::String(s.clone()),
            StructuredValue::List(items) => {
                Value::Array(items.iter().map(StructuredValue::to_json).collect())
            }
            StructuredValue::Record(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for StructuredValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => StructuredValue::Null,
            Value::Bool(b) => StructuredValue::Bool(b),
            Value::Number(n) => StructuredValue::Number(n),
            Value::String(s) => StructuredValue::Text(s),
            Value::Array(items) => {
                StructuredValue::List(items.into_iter().map(StructuredValue::from).collect())
            }
            Value::Object(fields) => StructuredValue::Record(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, StructuredValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<i64> for StructuredValue {
    fn from(value: i64) -> Self {
        StructuredValue::Number(value.into())
    }
}

impl From<&str> for StructuredValue {
    fn from(value: &str) -> Self {
        StructuredValue::Text(value.to_string())
    }
}

impl fmt::Display for StructuredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct TestCase {
    #[schema(value_type = Object)]
    pub input: StructuredValue,
    #[schema(value_type = Object)]
    pub expected_output: StructuredValue,
    pub hidden: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct TestOutcome {
    pub passed: bool,
    #[schema(value_type = Object)]
    pub input: StructuredValue,
    #[schema(value_type = Object)]
    pub actual_output: StructuredValue,
    #[schema(value_type = Object)]
    pub expected_output: StructuredValue,
    pub error: Option<String>,
    pub execution_time_ms: f64,
    pub memory_kb: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct ExecutionResult {
    pub outcomes: Vec<TestOutcome>,
    pub execution_time_ms: f64,
    pub memory_kb: f64,
}

/// Grading verdict assigned by the submission endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum SubmissionStatus {
    Accepted,
    WrongAnswer,
    TimeLimitExceeded,
    RuntimeError,
    CompilationError,
    MemoryLimitExceeded,
    PresentationError,
    Other(String),
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Accepted => "accepted",
            Self::WrongAnswer => "wrong_answer",
            Self::TimeLimitExceeded => "time_limit_exceeded",
            Self::RuntimeError => "runtime_error",
            Self::CompilationError => "compilation_error",
            Self::MemoryLimitExceeded => "memory_limit_exceeded",
            Self::PresentationError => "presentation_error",
            Self::Other(s) => s,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// User-facing explanation of the verdict.
    pub fn explanation(&self) -> String {
        match self {
            Self::Accepted => "Accepted! Your solution passed all test cases.".to_string(),
            Self::WrongAnswer => concat!(
                "Wrong Answer: your output does not match the expected output ",
                "on a hidden test case."
            )
            .to_string(),
            Self::TimeLimitExceeded => {
                "Time Limit Exceeded: your solution took too long on at least one test case."
                    .to_string()
            }
            Self::RuntimeError => {
                "Runtime Error: your program crashed while running a test case.".to_string()
            }
            Self::CompilationError => {
                "Compilation Error: your code could not be compiled.".to_string()
            }
            Self::MemoryLimitExceeded => {
                "Memory Limit Exceeded: your solution used more memory than allowed.".to_string()
            }
            Self::PresentationError => {
                "Presentation Error: your output is correct but incorrectly formatted.".to_string()
            }
            Self::Other(s) => format!("Submission finished with status `{s}`."),
        }
    }
}

impl From<String> for SubmissionStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "accepted" => Self::Accepted,
            "wrong_answer" => Self::WrongAnswer,
            "time_limit_exceeded" => Self::TimeLimitExceeded,
            "runtime_error" => Self::RuntimeError,
            "compilation_error" => Self::CompilationError,
            "memory_limit_exceeded" => Self::MemoryLimitExceeded,
            "presentation_error" => Self::PresentationError,
            _ => Self::Other(s),
        }
    }
}

impl From<SubmissionStatus> for String {
    fn from(status: SubmissionStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
