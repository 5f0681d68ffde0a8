//! Question generation rules
//!
//! A rule is an ordered list of match fragments plus ordered question and
//! answer templates. Edits replace whole lists rather than patching them.

use crate::error::{FormatError, StructureError};
use crate::fragment::{FragmentKind, MatchFragment};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// Name given to rules created without one
pub const DEFAULT_RULE_NAME: &str = "New Rule";

/// Prefix put in front of a cloned rule's name
pub const CLONE_PREFIX: &str = "Copy of ";

/// A question or answer template: free text with `{Q1}` style capture references
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub kind: String,
    pub pattern: String,
}

impl Template {
    pub fn new(pattern: &str) -> Self {
        Self::with_kind(FragmentKind::DEFAULT, pattern)
    }

    pub fn with_kind(kind: FragmentKind, pattern: &str) -> Self {
        Self {
            kind: kind.name().to_string(),
            pattern: pattern.to_string(),
        }
    }

    /// Displayable fields in table order: kind, pattern
    pub fn to_row(&self) -> [String; 2] {
        [self.kind.clone(), self.pattern.clone()]
    }

    pub fn from_row(kind: &str, pattern: &str) -> Self {
        Self::with_kind(FragmentKind::lenient(kind), pattern)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub match_fragments: Vec<MatchFragment>,
    #[serde(default)]
    pub question_templates: Vec<Template>,
    #[serde(default)]
    pub answer_templates: Vec<Template>,
}

impl Rule {
    /// An empty, unlocked rule
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            locked: false,
            match_fragments: Vec::new(),
            question_templates: Vec::new(),
            answer_templates: Vec::new(),
        }
    }

    /// Deep copy under the name `"Copy of <name>"`, always unlocked
    pub fn duplicate(&self) -> Self {
        Self {
            name: format!("{}{}", CLONE_PREFIX, self.name),
            locked: false,
            ..self.clone()
        }
    }

    pub fn fragment(&self, id: u32) -> Option<&MatchFragment> {
        self.match_fragments.iter().find(|f| f.id == id)
    }

    /// Smallest id greater than every id in use
    pub fn next_fragment_id(&self) -> u32 {
        self.match_fragments
            .iter()
            .map(|f| f.id)
            .max()
            .map_or(1, |max| max + 1)
    }

    /// Append a blank level-1 fragment with a fresh id
    pub fn add_blank_fragment(&mut self) -> &MatchFragment {
        let id = self.next_fragment_id();
        self.match_fragments.push(MatchFragment::blank(id));
        &self.match_fragments[self.match_fragments.len() - 1]
    }

    /// Replace the fragment list from table rows. On error the rule is untouched.
    pub fn set_fragment_rows<S: AsRef<str>>(&mut self, rows: &[[S; 4]]) -> Result<(), FormatError> {
        let fragments = rows
            .iter()
            .map(|[level, id, kind, pattern]| {
                MatchFragment::from_row(level.as_ref(), id.as_ref(), kind.as_ref(), pattern.as_ref())
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.match_fragments = fragments;
        Ok(())
    }

    pub fn fragment_rows(&self) -> Vec<[String; 4]> {
        self.match_fragments.iter().map(MatchFragment::to_row).collect()
    }

    /// Check that fragment ids are unique
    pub fn validate(&self) -> Result<(), StructureError> {
        let mut seen = FxHashSet::default();
        for fragment in &self.match_fragments {
            if !seen.insert(fragment.id) {
                return Err(StructureError::DuplicateId { id: fragment.id });
            }
        }
        Ok(())
    }
}

impl Default for Rule {
    fn default() -> Self {
        Self::new(DEFAULT_RULE_NAME)
    }
}
