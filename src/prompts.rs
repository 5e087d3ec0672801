//! The catalog of system instructions users pick from.
//!
//! The built-in catalog can be replaced by a YAML file holding a list of
//! `{name, prompt}` entries.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A named system instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedPrompt {
    /// Short label shown in menus.
    pub name: String,
    /// The instruction text.
    pub prompt: String,
}

impl NamedPrompt {
    pub fn new(name: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prompt: prompt.into(),
        }
    }
}

const GIT_REVIEW: &str = r#"You are an expert developer and a git power user. You review code from the git diff output between two commits.

* The diff contains some unchanged context lines. Focus on the changed lines: added lines start with "+" and removed lines start with "-".

Be critical and precise and complete these tasks:

* [Description] Describe the change.
* [Obvious errors] Point out obvious errors and how to fix them.
* [Improvements] Suggest improvements where relevant, written as code rather than as a diff.
* [Friendly advice] Add a friendly heads up where relevant.
* [Stop when done] Stop when the review is complete.
"#;

const TOP_TWO: &str = r#"Review the following git diff for correctness and error handling, code quality and readability, design principles, clean code, performance and security, and testability.

Reference specific lines and explain the reasoning behind each issue.

Respond with only the two most important suggestions.
"#;

const OPTIMIZATION: &str = r#"Review the following git diff with a focus on optimization: performance, duplication and maintainability.

For every suggestion show a "before" snippet taken from the diff and an "after" snippet with the improvement. Mention when a change makes the code easier or harder to test.
"#;

const REFACTORING: &str = r#"Review the following git diff with a focus on refactoring: smaller single-responsibility functions, DRY, the SOLID principles and clear naming.

Stay within the scope of the diff. "Before" code comes from the removed lines and "after" code from the added lines with your refactoring applied. Show suggested code as code, not as a diff.
"#;

const ARCHITECT: &str = r#"You are a senior software architect. Answer questions about system design, trade-offs and code structure concisely, and ask for missing context before making assumptions.
"#;

const JULIAN: &str = "You are King Julian from Penguins of Madagascar. Your name is Julian.";

/// The built-in catalog.
pub fn builtin() -> Vec<NamedPrompt> {
    vec![
        NamedPrompt::new("git review", GIT_REVIEW),
        NamedPrompt::new("git review - top 2 suggestions", TOP_TWO),
        NamedPrompt::new("git review - optimization, before and after", OPTIMIZATION),
        NamedPrompt::new("git review - refactoring, DRY and SOLID", REFACTORING),
        NamedPrompt::new("architecture assistant", ARCHITECT),
        NamedPrompt::new("King Julian", JULIAN),
    ]
}

/// Load a catalog from a YAML file.
pub fn load(path: &Path) -> Result<Vec<NamedPrompt>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::io(format!("cannot read {}: {e}", path.display()), e))?;
    parse(&content)
}

/// Parse a YAML catalog.  An empty catalog is an error.
pub fn parse(yaml: &str) -> Result<Vec<NamedPrompt>> {
    let prompts: Vec<NamedPrompt> = serde_yaml::from_str(yaml)?;
    if prompts.is_empty() {
        return Err(Error::validation(
            "prompt catalog is empty",
            Some("prompts-file".to_string()),
        ));
    }
    Ok(prompts)
}

/// The catalog from `path` if given, the built-in one otherwise.
pub fn catalog(path: Option<&Path>) -> Result<Vec<NamedPrompt>> {
    match path {
        Some(path) => load(path),
        None => Ok(builtin()),
    }
}

/// Select the entry with 1-based number `n`.
pub fn select(prompts: &[NamedPrompt], n: usize) -> Result<&NamedPrompt> {
    n.checked_sub(1)
        .and_then(|i| prompts.get(i))
        .ok_or_else(|| {
            Error::validation(
                format!("choose a prompt between 1 and {}", prompts.len()),
                Some("prompt".to_string()),
            )
        })
}

/// The numbered menu shown to users.
pub fn menu(prompts: &[NamedPrompt]) -> String {
    prompts
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{}. {}\n", i + 1, p.name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog() {
        let prompts = builtin();
        assert_eq!(prompts.len(), 6);
        assert!(prompts.iter().all(|p| !p.prompt.is_empty()));
        assert_eq!(prompts[0].name, "git review");
    }

    #[test]
    fn parse_yaml_catalog() {
        let yaml = "- name: terse\n  prompt: Answer in one line.\n- name: pirate\n  prompt: |\n    Talk like a pirate.\n";
        let prompts = parse(yaml).unwrap();
        assert_eq!(prompts.len(), 2);
        assert_eq!(prompts[1].prompt, "Talk like a pirate.\n");
    }

    #[test]
    fn empty_catalog_is_rejected() {
        assert!(parse("[]").is_err());
        assert!(parse("not: a list").is_err());
    }

    #[test]
    fn select_is_one_based() {
        let prompts = builtin();
        assert_eq!(select(&prompts, 1).unwrap().name, "git review");
        assert!(select(&prompts, 0).is_err());
        assert!(select(&prompts, 7).is_err());
    }

    #[test]
    fn menu_numbers_entries() {
        let prompts = vec![NamedPrompt::new("a", "x"), NamedPrompt::new("b", "y")];
        assert_eq!(menu(&prompts), "1. a\n2. b\n");
    }

    #[test]
    fn missing_file() {
        let err = catalog(Some(Path::new("/nonexistent/prompts.yaml"))).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
