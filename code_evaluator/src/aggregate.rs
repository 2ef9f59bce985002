use crate::model::TestOutcome;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct Summary {
    pub passed: usize,
    pub total: usize,
    pub message: String,
    /// Sum of per-test execution times, not the wall-clock duration of the call.
    pub execution_time_ms: f64,
    pub peak_memory_kb: f64,
    pub errored: usize,
}

impl Summary {
    pub fn all_passed(&self) -> bool {
        self.total > 0 && self.passed == self.total
    }
}

pub fn aggregate(results: &[TestOutcome]) -> Summary {
    let total = results.len();
    let passed = results.iter().filter(|r| r.passed).count();
    let errored = results.iter().filter(|r| r.error.is_some()).count();
    let execution_time_ms = results.iter().map(|r| r.execution_time_ms).sum::<f64>();
    let peak_memory_kb = results
        .iter()
        .map(|r| r.memory_kb)
        .fold(0.0, f64::max);

    let message = if total == 0 {
        "Code executed successfully".to_string()
    } else if passed == total {
        format!("All {total} test cases passed!")
    } else {
        format!("{passed}/{total} test cases passed. Check the failing cases below for details.")
    };

    Summary {
        passed,
        total,
        message,
        execution_time_ms,
        peak_memory_kb,
        errored,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StructuredValue;

    fn outcome(passed: bool, time: f64, memory: f64) -> TestOutcome {
        TestOutcome {
            passed,
            input: StructuredValue::from(1i64),
            actual_output: StructuredValue::from(2i64),
            expected_output: StructuredValue::from(2i64),
            error: None,
            execution_time_ms: time,
            memory_kb: memory,
        }
    }

    #[test]
    fn no_results_executed_successfully() {
        let summary = aggregate(&[]);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.message, "Code executed successfully");
        assert!(!summary.all_passed());
    }

    #[test]
    fn all_passing_names_the_count() {
        let summary = aggregate(&[
            outcome(true, 1.0, 100.0),
            outcome(true, 2.0, 300.0),
            outcome(true, 3.5, 200.0),
        ]);
        assert_eq!(summary.passed, 3);
        assert_eq!(summary.message, "All 3 test cases passed!");
        assert!(summary.all_passed());
        assert_eq!(summary.peak_memory_kb, 300.0);
    }

    #[test]
    fn partial_pass_reports_ratio() {
        let mut failing = outcome(false, 4.0, 10.0);
        failing.error = Some("IndexError: list index out of range".to_string());
        let summary = aggregate(&[outcome(true, 1.0, 10.0), failing]);
        assert_eq!(
            summary.message,
            "1/2 test cases passed. Check the failing cases below for details."
        );
        assert_eq!(summary.errored, 1);
        assert!(!summary.all_passed());
    }

    #[test]
    fn execution_time_is_sum_of_tests() {
        let summary = aggregate(&[
            outcome(true, 12.5, 0.0),
            outcome(false, 7.5, 0.0),
            outcome(true, 30.0, 0.0),
        ]);
        assert_eq!(summary.execution_time_ms, 50.0);
    }
}
