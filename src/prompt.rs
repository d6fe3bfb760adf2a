//! Prompt composition for the generation backend
//!
//! Pure functions: the effective prompt is built from the instance's base
//! template, optional free-text instructions and, in edit mode, an existing
//! artifact to be revised in place.

use crate::error::{Error, Result};
use std::path::Path;

/// Closing directive appended to every fresh-generation prompt
const HTML_ONLY_DIRECTIVE: &str =
    "Respond with a single complete HTML document and nothing else. \
     Do not include commentary before or after the HTML.";

/// Directive used when revising an existing artifact
const REVISE_DIRECTIVE: &str =
    "Revise the HTML document below in place according to the instructions. \
     Return the complete revised HTML document and nothing else.";

/// Build the effective generation prompt
///
/// With no instructions the template is used as-is. Instructions are split on
/// `;` and rendered as a bulleted key-instructions section. When an existing
/// artifact is supplied the prompt switches to revision mode.
pub fn compose(template: &str, instructions: Option<&str>, existing_html: Option<&str>) -> String {
    match existing_html {
        Some(html) => {
            let mut prompt = String::new();
            prompt.push_str(REVISE_DIRECTIVE);
            if let Some(text) = instructions.filter(|t| !t.trim().is_empty()) {
                prompt.push_str("\n\nKey instructions:\n");
                prompt.push_str(&bullet_list(text));
            }
            prompt.push_str("\n\n```html\n");
            prompt.push_str(html);
            prompt.push_str("\n```\n");
            prompt
        }
        None => {
            let mut prompt = template.trim_end().to_string();
            if let Some(text) = instructions.filter(|t| !t.trim().is_empty()) {
                prompt.push_str("\n\nKey instructions:\n");
                prompt.push_str(&bullet_list(text));
            }
            prompt.push_str("\n\n");
            prompt.push_str(HTML_ONLY_DIRECTIVE);
            prompt
        }
    }
}

/// Render `;`-delimited free text as bullet items
fn bullet_list(text: &str) -> String {
    text.split(';')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| format!("- {}\n", item))
        .collect()
}

/// Resolve the base artifact for an edit-mode composition
///
/// An explicitly requested path that does not exist is a hard error; the
/// composer never silently falls back to fresh generation when a specific
/// source was demanded. A missing default artifact simply means fresh
/// generation.
pub async fn resolve_base_artifact(
    explicit: Option<&Path>,
    default_path: &Path,
) -> Result<Option<String>> {
    match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(Error::BaseArtifactNotFound(path.to_path_buf()));
            }
            Ok(Some(tokio::fs::read_to_string(path).await?))
        }
        None => {
            if !default_path.exists() {
                return Ok(None);
            }
            Ok(Some(tokio::fs::read_to_string(default_path).await?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_compose_plain() {
        let prompt = compose("Write the weekly digest.", None, None);
        assert!(prompt.starts_with("Write the weekly digest."));
        assert!(prompt.ends_with(HTML_ONLY_DIRECTIVE));
        assert!(!prompt.contains("Key instructions"));
    }

    #[test]
    fn test_compose_with_instructions() {
        let prompt = compose(
            "Write the weekly digest.",
            Some("shorter intro; add a CTA button ; "),
            None,
        );
        assert!(prompt.contains("Key instructions:\n- shorter intro\n- add a CTA button\n"));
        assert!(prompt.ends_with(HTML_ONLY_DIRECTIVE));
    }

    #[test]
    fn test_compose_edit_mode() {
        let prompt = compose(
            "Write the weekly digest.",
            Some("make the header blue"),
            Some("<html><body>v1</body></html>"),
        );
        assert!(prompt.starts_with(REVISE_DIRECTIVE));
        assert!(prompt.contains("- make the header blue"));
        assert!(prompt.contains("<html><body>v1</body></html>"));
        // Edit mode replaces the template, it does not append to it
        assert!(!prompt.contains("Write the weekly digest."));
    }

    #[test]
    fn test_blank_instructions_are_ignored() {
        let prompt = compose("T", Some("   "), None);
        assert!(!prompt.contains("Key instructions"));
    }

    #[tokio::test]
    async fn test_resolve_explicit_missing_is_hard_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("base.html");
        let err = resolve_base_artifact(Some(&missing), &dir.path().join("output.html"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BaseArtifactNotFound(_)));
    }

    #[tokio::test]
    async fn test_resolve_default_missing_falls_back_to_fresh() {
        let dir = TempDir::new().unwrap();
        let resolved = resolve_base_artifact(None, &dir.path().join("output.html"))
            .await
            .unwrap();
        assert!(resolved.is_none());
    }

    #[tokio::test]
    async fn test_resolve_default_present() {
        let dir = TempDir::new().unwrap();
        let default = dir.path().join("output.html");
        tokio::fs::write(&default, "<html>v1</html>").await.unwrap();

        let resolved = resolve_base_artifact(None, &default).await.unwrap();
        assert_eq!(resolved.as_deref(), Some("<html>v1</html>"));
    }
}
