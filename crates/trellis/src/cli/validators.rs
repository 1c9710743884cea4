//! CLI input validation functions.
//!
//! Used through clap's `value_parser` attribute so bad input is rejected at
//! parse time. The record-level rules themselves live in
//! [`crate::validation`]; these wrappers only turn them into clap errors.

use crate::validation::{self, MAX_ID_LENGTH, MAX_TITLE_LENGTH};

/// Validate a record id prefix.
pub fn validate_prefix(s: &str) -> Result<String, String> {
    use crate::commands::init;

    let trimmed = s.trim();
    init::validate_prefix(trimmed).map_err(|e| e.to_string())?;
    Ok(trimmed.to_string())
}

/// Validate a record id.
///
/// Ids are not tied to the project prefix, since records written by other
/// tools may use any scheme.
pub fn validate_record_id(s: &str) -> Result<String, String> {
    let s = s.trim();
    if validation::is_valid_id(s) {
        Ok(s.to_string())
    } else {
        Err(format!(
            "Invalid record id '{s}': must be 1-{MAX_ID_LENGTH} characters without whitespace"
        ))
    }
}

/// Validate a title: non-blank, single-line, within the length limit.
pub fn validate_title(s: &str) -> Result<String, String> {
    let s = s.trim();

    if s.is_empty() {
        return Err("Title cannot be empty".to_string());
    }
    let length = s.chars().count();
    if length > MAX_TITLE_LENGTH {
        return Err(format!(
            "Title cannot exceed {MAX_TITLE_LENGTH} characters, got {length} characters"
        ));
    }
    if s.contains(['\n', '\r']) {
        return Err("Title cannot contain newline characters".to_string());
    }
    if let Some(pos) = s.chars().position(|c| c.is_control() && c != '\t') {
        return Err(format!(
            "Title contains invalid control character at position {pos}"
        ));
    }

    Ok(s.to_string())
}

/// Validate multi-line text such as a description, notes or a comment.
///
/// Newlines and tabs are fine; other control characters are not.
pub fn validate_text(s: &str) -> Result<String, String> {
    if let Some(pos) = s
        .chars()
        .position(|c| c.is_control() && !matches!(c, '\t' | '\n' | '\r'))
    {
        return Err(format!(
            "Text contains invalid control character at position {pos}"
        ));
    }
    Ok(s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn prefix_is_trimmed() {
        assert_eq!(validate_prefix("  proj ").unwrap(), "proj");
        assert!(validate_prefix("x").is_err());
    }

    #[rstest]
    #[case::generated("proj-a1b2")]
    #[case::foreign("T-42")]
    #[case::no_hyphen("abc")]
    fn accepted_ids(#[case] id: &str) {
        assert_eq!(validate_record_id(id).unwrap(), id);
    }

    #[rstest]
    #[case::empty("")]
    #[case::inner_space("proj a1b2")]
    fn rejected_ids(#[case] id: &str) {
        assert!(validate_record_id(id).unwrap_err().contains("Invalid record id"));
    }

    #[test]
    fn id_too_long() {
        assert!(validate_record_id(&"a".repeat(MAX_ID_LENGTH + 1)).is_err());
    }

    #[rstest]
    #[case::empty("   ", "cannot be empty")]
    #[case::newline("Title with\nnewline", "newline")]
    #[case::carriage_return("Title with\rreturn", "newline")]
    #[case::null("Title with\x00control", "control character")]
    #[case::delete("Title with\x7Fdelete", "control character")]
    fn rejected_titles(#[case] title: &str, #[case] expected: &str) {
        let err = validate_title(title).unwrap_err();
        assert!(err.contains(expected), "unexpected error: {err}");
    }

    #[test]
    fn title_length_counts_characters() {
        let wide = "é".repeat(MAX_TITLE_LENGTH);
        assert!(validate_title(&wide).is_ok());
        assert!(validate_title(&format!("{wide}é")).is_err());
    }

    #[test]
    fn title_allows_tab_and_is_trimmed() {
        assert_eq!(validate_title("  Fix\tbug ").unwrap(), "Fix\tbug");
    }

    #[test]
    fn text_allows_newlines_but_not_other_controls() {
        assert_eq!(validate_text("Line1\n\tIndented").unwrap(), "Line1\n\tIndented");
        assert_eq!(validate_text("").unwrap(), "");
        assert!(validate_text("bad\x00byte").is_err());
    }
}
