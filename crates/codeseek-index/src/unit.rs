use serde::{Deserialize, Serialize};

/// Category of an extracted definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnitKind {
    Function,
    AsyncFunction,
    Class,
}

impl UnitKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::AsyncFunction => "async-function",
            Self::Class => "class",
        }
    }
}

impl std::fmt::Display for UnitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One extracted function, async function, or class.
///
/// Units are independent: a nested definition is its own unit and its text
/// also appears inside the enclosing unit's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeUnit {
    /// Standalone, re-parseable rendering of the definition.
    pub text: String,
    pub name: String,
    /// Path of the originating file as walked.
    pub filepath: String,
    pub kind: UnitKind,
    /// 1-based inclusive line span in the source file.
    pub line_range: (usize, usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_strings() {
        assert_eq!(UnitKind::Function.to_string(), "function");
        assert_eq!(UnitKind::AsyncFunction.to_string(), "async-function");
        assert_eq!(UnitKind::Class.to_string(), "class");
    }

    #[test]
    fn kind_serde_matches_display() {
        for kind in [UnitKind::Function, UnitKind::AsyncFunction, UnitKind::Class] {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, serde_json::json!(kind.as_str()));
        }
    }
}
