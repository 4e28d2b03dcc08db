//! Subject labels and the closed catalog of recognizable subjects.
//!
//! The set of subjects is fixed at deployment time by configuration; there
//! is no dynamic registration. One reserved sentinel label means "no
//! subject present" and is never eligible for a feeding action.

use serde::{Deserialize, Serialize};

/// A recognized-entity label from the fixed classification set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Subject(pub String);

impl Subject {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Subject {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Subject {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The closed set of subjects known at deployment time, plus the sentinel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectCatalog {
    /// Labels eligible for feeding decisions.
    #[serde(default = "default_subjects")]
    pub subjects: Vec<Subject>,

    /// Reserved label meaning "no subject present".
    #[serde(default = "default_sentinel")]
    pub sentinel: Subject,
}

fn default_subjects() -> Vec<Subject> {
    vec![Subject::new("Pet1"), Subject::new("Pet2")]
}

fn default_sentinel() -> Subject {
    Subject::new("NoPet")
}

impl Default for SubjectCatalog {
    fn default() -> Self {
        Self {
            subjects: default_subjects(),
            sentinel: default_sentinel(),
        }
    }
}

impl SubjectCatalog {
    pub fn new(subjects: Vec<Subject>, sentinel: Subject) -> Self {
        Self { subjects, sentinel }
    }

    /// Whether the label is the reserved "no subject present" value.
    pub fn is_sentinel(&self, label: &Subject) -> bool {
        *label == self.sentinel
    }

    /// Whether the label belongs to the feedable subject set.
    pub fn is_known(&self, label: &Subject) -> bool {
        self.subjects.contains(label)
    }

    /// Iterate over the feedable subjects (sentinel excluded).
    pub fn iter(&self) -> impl Iterator<Item = &Subject> {
        self.subjects.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog() {
        let catalog = SubjectCatalog::default();
        assert_eq!(catalog.subjects.len(), 2);
        assert!(catalog.is_sentinel(&Subject::new("NoPet")));
        assert!(!catalog.is_known(&Subject::new("NoPet")));
        assert!(catalog.is_known(&Subject::new("Pet1")));
    }

    #[test]
    fn test_subject_serializes_transparent() {
        let json = serde_json::to_string(&Subject::new("Pet1")).unwrap();
        assert_eq!(json, "\"Pet1\"");
    }

    #[test]
    fn test_unknown_label() {
        let catalog = SubjectCatalog::default();
        let stray = Subject::new("Raccoon");
        assert!(!catalog.is_known(&stray));
        assert!(!catalog.is_sentinel(&stray));
    }
}
