//! SQL identifier quoting.
//!
//! Identifiers are always double-quote delimited and never case-folded: the
//! caller's spelling is preserved verbatim inside the quotes.

use std::fmt;

/// Quote one identifier part, doubling embedded quote characters.
///
/// ```
/// use sqlbridge_core::quote_ident;
///
/// assert_eq!(quote_ident("Name"), "\"Name\"");
/// assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
/// ```
pub fn quote_ident(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push('"');
    for c in name.chars() {
        if c == '"' {
            out.push('"');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// A possibly schema-qualified table or column identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    parts: Vec<String>,
}

impl Identifier {
    /// An unqualified identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            parts: vec![name.into()],
        }
    }

    /// A `schema.name` identifier.
    pub fn qualified(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            parts: vec![schema.into(), name.into()],
        }
    }

    /// Build from explicit parts, outermost first. Empty parts are dropped.
    pub fn from_parts<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            parts: parts
                .into_iter()
                .map(Into::into)
                .filter(|p: &String| !p.is_empty())
                .collect(),
        }
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// The last (unqualified) part.
    pub fn name(&self) -> &str {
        self.parts.last().map_or("", String::as_str)
    }

    pub fn is_qualified(&self) -> bool {
        self.parts.len() > 1
    }

    /// Render as `"a"."b"`.
    pub fn quoted(&self) -> String {
        self.parts
            .iter()
            .map(|p| quote_ident(p))
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.quoted())
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Identifier::new(name)
    }
}

impl From<String> for Identifier {
    fn from(name: String) -> Self {
        Identifier::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoting_preserves_case() {
        assert_eq!(Identifier::new("MixedCase").quoted(), "\"MixedCase\"");
    }

    #[test]
    fn test_qualified_identifier() {
        let id = Identifier::qualified("app", "Users");
        assert!(id.is_qualified());
        assert_eq!(id.name(), "Users");
        assert_eq!(id.to_string(), "\"app\".\"Users\"");
    }

    #[test]
    fn test_dots_inside_a_part_are_not_split() {
        assert_eq!(Identifier::new("a.b").quoted(), "\"a.b\"");
        assert_eq!(
            Identifier::from_parts(["", "s", "t"]).quoted(),
            "\"s\".\"t\""
        );
    }
}
