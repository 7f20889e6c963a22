use std::fmt;

/// Table reference in a statement, optionally schema-qualified.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableName {
    /// Schema qualifier, if the statement spelled one.
    pub qualifier: Option<String>,
    /// Table name as written, quoting stripped by the parser.
    pub name: String,
}

impl TableName {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            qualifier: None,
            name: name.into(),
        }
    }

    pub fn qualified(qualifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            qualifier: Some(qualifier.into()),
            name: name.into(),
        }
    }

    /// Canonical lookup form of the table name.
    pub fn key(&self) -> String {
        normalize(&self.name)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(qualifier) = &self.qualifier {
            write!(f, "{}.{}", qualifier, self.name)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

/// Fold an identifier to its canonical form: quoting stripped, lowercase.
/// Registration and lookup both go through here so spellings like
/// `` `Orders` `` and `orders` resolve to the same rule.
pub fn normalize(ident: &str) -> String {
    ident.trim_matches(|c| c == '`' || c == '"').to_lowercase()
}
