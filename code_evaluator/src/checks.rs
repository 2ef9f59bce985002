//! Cheap advisory checks run before a submission. Findings are reported to
//! the learner but never block the submission on their own.

const BRACE_LANGUAGES: [&str; 9] = [
    "c",
    "cpp",
    "java",
    "javascript",
    "typescript",
    "csharp",
    "go",
    "rust",
    "kotlin",
];

pub fn is_blank(code: &str) -> bool {
    code.trim().is_empty()
}

pub fn advisory_findings(code: &str, language: &str, template: &str) -> Vec<String> {
    let mut findings = Vec::new();
    if !template.trim().is_empty() && code.trim() == template.trim() {
        findings.push("Your code is unchanged from the starter template.".to_string());
    }
    let language = language.to_ascii_lowercase();
    if language.starts_with("python") {
        findings.extend(python_indentation(code));
    } else if BRACE_LANGUAGES.contains(&language.as_str()) {
        findings.extend(brace_balance(code));
    }
    findings
}

fn python_indentation(code: &str) -> Vec<String> {
    let mut findings = Vec::new();
    let lines = code
        .lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty() && !l.trim_start().starts_with('#'))
        .collect::<Vec<_>>();

    let indent = |l: &str| l.len() - l.trim_start().len();
    let tabs = lines.iter().any(|(_, l)| l.starts_with('\t'));
    let spaces = lines.iter().any(|(_, l)| l.starts_with(' '));
    if tabs && spaces {
        findings.push("Indentation mixes tabs and spaces.".to_string());
    }

    for pair in lines.windows(2) {
        let (n, line) = pair[0];
        let (_, next) = pair[1];
        if line.trim_end().ends_with(':') && indent(next) <= indent(line) {
            findings.push(format!(
                "Line {}: expected an indented block after ':'.",
                n + 1
            ));
        }
    }
    if let Some((n, last)) = lines.last() {
        if last.trim_end().ends_with(':') {
            findings.push(format!(
                "Line {}: expected an indented block after ':'.",
                n + 1
            ));
        }
    }
    findings
}

fn brace_balance(code: &str) -> Option<String> {
    let mut depth: i64 = 0;
    for c in code.chars() {
        match c {
            '{' => depth += 1,
            '}' => depth -= 1,
            _ => {}
        }
        if depth < 0 {
            return Some("Found a '}' without a matching '{'.".to_string());
        }
    }
    (depth > 0).then(|| format!("{depth} '{{' left unclosed."))
}
