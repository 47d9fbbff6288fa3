//! Identifier and literal quoting for DDL statements.
//!
//! `CREATE DATABASE`, `CREATE USER` and `GRANT` cannot take bind parameters,
//! so names are interpolated as quoted identifiers. Names are always quoted:
//! role names like `app@db-host` are not valid bare identifiers, and an
//! unquoted name would be case-folded by the server while the catalog
//! existence checks compare exact names.

use std::fmt;

use crate::error::IdentifierError;

/// Longest identifier PostgreSQL stores without truncation (`NAMEDATALEN - 1`).
pub const MAX_IDENTIFIER_BYTES: usize = 63;

/// A validated identifier, safe to interpolate into a statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SafeIdentifier {
    raw: String,
}

impl SafeIdentifier {
    /// The logical name, as stored in the server catalog.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The double-quoted form used inside statements.
    #[must_use]
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.raw)
    }
}

impl fmt::Display for SafeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.raw)
    }
}

/// Validates `raw` for use as a quoted identifier.
///
/// Never truncates or rewrites the name: anything that cannot be represented
/// exactly is rejected.
///
/// # Errors
///
/// Returns [`IdentifierError`] if the name is empty, longer than
/// [`MAX_IDENTIFIER_BYTES`], or contains a double quote or control character.
pub fn sanitize(raw: &str) -> Result<SafeIdentifier, IdentifierError> {
    if raw.is_empty() {
        return Err(IdentifierError::new(raw, "name is empty"));
    }
    if raw.len() > MAX_IDENTIFIER_BYTES {
        return Err(IdentifierError::new(
            raw,
            "name exceeds 63 bytes and would be truncated by the server",
        ));
    }
    if raw.contains('"') {
        return Err(IdentifierError::new(raw, "name contains a double quote"));
    }
    if raw.chars().any(char::is_control) {
        return Err(IdentifierError::new(raw, "name contains a control character"));
    }

    Ok(SafeIdentifier {
        raw: raw.to_string(),
    })
}

/// Quotes `value` as a string literal, following the server's `quote_literal`.
///
/// Single quotes are doubled. A value containing a backslash is emitted in
/// escape-string form (`E'...'`) with backslashes doubled, so the result does
/// not depend on `standard_conforming_strings`.
///
/// # Errors
///
/// Returns [`IdentifierError`] if the value contains a NUL character, which a
/// literal cannot carry.
pub fn quote_literal(value: &str) -> Result<String, IdentifierError> {
    if value.contains('\0') {
        return Err(IdentifierError::new("<literal>", "literal contains a NUL character"));
    }

    let has_backslash = value.contains('\\');
    let mut out = String::with_capacity(value.len() + 3);
    if has_backslash {
        out.push('E');
    }
    out.push('\'');
    for ch in value.chars() {
        match ch {
            '\'' => out.push_str("''"),
            '\\' => out.push_str("\\\\"),
            c => out.push(c),
        }
    }
    out.push('\'');
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_name_is_quoted() {
        let ident = sanitize("db_test").unwrap();
        assert_eq!(ident.as_str(), "db_test");
        assert_eq!(ident.quoted(), "\"db_test\"");
        assert_eq!(ident.to_string(), "\"db_test\"");
    }

    #[test]
    fn test_role_name_with_host_postfix() {
        let ident = sanitize("db_test@host1").unwrap();
        assert_eq!(ident.quoted(), "\"db_test@host1\"");
    }

    #[test]
    fn test_case_is_preserved() {
        assert_eq!(sanitize("MixedCase").unwrap().quoted(), "\"MixedCase\"");
    }

    #[test]
    fn test_semicolons_and_whitespace_stay_inside_quotes() {
        let ident = sanitize("x; DROP DATABASE postgres; --").unwrap();
        let quoted = ident.quoted();
        assert!(quoted.starts_with('"') && quoted.ends_with('"'));
        // The only double quotes are the delimiters, so the statement cannot
        // be terminated from inside the identifier.
        assert_eq!(quoted.matches('"').count(), 2);
        assert_eq!(ident.as_str(), "x; DROP DATABASE postgres; --");
    }

    #[test]
    fn test_stray_quote_is_rejected() {
        let err = sanitize("db\"; DROP TABLE x; --").unwrap_err();
        assert_eq!(err.reason, "name contains a double quote");
        assert!(sanitize("\"").is_err());
    }

    #[test]
    fn test_single_quote_is_allowed_in_identifier() {
        let ident = sanitize("o'brien").unwrap();
        assert_eq!(ident.quoted(), "\"o'brien\"");
    }

    #[test]
    fn test_empty_and_control_characters_are_rejected() {
        assert!(sanitize("").is_err());
        assert!(sanitize("db\0name").is_err());
        assert!(sanitize("db\nname").is_err());
        assert!(sanitize("db\tname").is_err());
    }

    #[test]
    fn test_length_limit_is_not_truncated() {
        let at_limit = "a".repeat(MAX_IDENTIFIER_BYTES);
        assert_eq!(sanitize(&at_limit).unwrap().as_str(), at_limit);

        let over = "a".repeat(MAX_IDENTIFIER_BYTES + 1);
        assert!(sanitize(&over).is_err());

        // Multi-byte characters count by bytes
        let wide = "é".repeat(32);
        assert!(sanitize(&wide).is_err());
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(quote_literal("secret").unwrap(), "'secret'");
        assert_eq!(quote_literal("it's").unwrap(), "'it''s'");
        assert_eq!(quote_literal("a\\b").unwrap(), "E'a\\\\b'");
        assert_eq!(quote_literal("'; DROP ROLE x; --").unwrap(), "'''; DROP ROLE x; --'");
        assert_eq!(quote_literal("").unwrap(), "''");
        assert!(quote_literal("nul\0").is_err());
    }
}
