//! Match fragments: the structural constraints that make up a rule's pattern
//!
//! A fragment at level N is a structural child of the nearest preceding
//! fragment at level N-1. Its `kind` names the relation from that parent to
//! this fragment's node and is kept as text; it is only interpreted when
//! the rule is compiled into a query.

use crate::error::FormatError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Structural relation between a fragment and its parent fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentKind {
    Dominates,
    ImmediatelyDominates,
    DominatedBy,
    ImmediatelyDominatedBy,
    Precedes,
    ImmediatelyPrecedes,
    Follows,
    ImmediatelyFollows,
    SisterOf,
}

impl FragmentKind {
    /// Kind used when table text does not name a known relation
    pub const DEFAULT: FragmentKind = FragmentKind::Dominates;

    pub const ALL: [FragmentKind; 9] = [
        FragmentKind::Dominates,
        FragmentKind::ImmediatelyDominates,
        FragmentKind::DominatedBy,
        FragmentKind::ImmediatelyDominatedBy,
        FragmentKind::Precedes,
        FragmentKind::ImmediatelyPrecedes,
        FragmentKind::Follows,
        FragmentKind::ImmediatelyFollows,
        FragmentKind::SisterOf,
    ];

    /// Name shown in the editor and written into flat expressions
    pub fn name(self) -> &'static str {
        match self {
            FragmentKind::Dominates => "dominates",
            FragmentKind::ImmediatelyDominates => "immediately dominates",
            FragmentKind::DominatedBy => "dominated by",
            FragmentKind::ImmediatelyDominatedBy => "immediately dominated by",
            FragmentKind::Precedes => "precedes",
            FragmentKind::ImmediatelyPrecedes => "immediately precedes",
            FragmentKind::Follows => "follows",
            FragmentKind::ImmediatelyFollows => "immediately follows",
            FragmentKind::SisterOf => "sister of",
        }
    }

    /// Relation operator in the query language
    pub fn operator(self) -> &'static str {
        match self {
            FragmentKind::Dominates => "<<",
            FragmentKind::ImmediatelyDominates => "<",
            FragmentKind::DominatedBy => ">>",
            FragmentKind::ImmediatelyDominatedBy => ">",
            FragmentKind::Precedes => "..",
            FragmentKind::ImmediatelyPrecedes => ".",
            FragmentKind::Follows => ",,",
            FragmentKind::ImmediatelyFollows => ",",
            FragmentKind::SisterOf => "$",
        }
    }

    /// Case-insensitive lookup by name, unspaced name or operator
    fn lookup(text: &str) -> Option<FragmentKind> {
        let text = text.trim();
        let squashed: String = text
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect();
        FragmentKind::ALL.into_iter().find(|kind| {
            kind.operator() == text
                || kind.name().eq_ignore_ascii_case(text)
                || kind.name().replace(' ', "").eq_ignore_ascii_case(&squashed)
        })
    }

    /// Lenient lookup for the table-row path: unknown text maps to
    /// [`FragmentKind::DEFAULT`].
    pub fn lenient(text: &str) -> FragmentKind {
        Self::lookup(text).unwrap_or(Self::DEFAULT)
    }
}

/// Strict lookup for the compile path
impl FromStr for FragmentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::lookup(s).ok_or_else(|| s.to_string())
    }
}

impl fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One structural constraint node within a rule's pattern hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchFragment {
    pub level: u32,
    pub id: u32,
    pub kind: String,
    pub pattern: String,
}

impl MatchFragment {
    pub fn new(level: u32, id: u32, kind: FragmentKind, pattern: &str) -> Self {
        Self {
            level,
            id,
            kind: kind.name().to_string(),
            pattern: pattern.to_string(),
        }
    }

    /// A blank fragment as added from the editor toolbar
    pub fn blank(id: u32) -> Self {
        Self::new(1, id, FragmentKind::DEFAULT, "")
    }

    /// Displayable fields in table order: level, id, kind, pattern
    pub fn to_row(&self) -> [String; 4] {
        [
            self.level.to_string(),
            self.id.to_string(),
            self.kind.clone(),
            self.pattern.clone(),
        ]
    }

    /// Build a fragment from table fields. Numeric fields must parse;
    /// the kind is looked up leniently.
    pub fn from_row(level: &str, id: &str, kind: &str, pattern: &str) -> Result<Self, FormatError> {
        Ok(Self {
            level: parse_number("level", level)?,
            id: parse_number("id", id)?,
            kind: FragmentKind::lenient(kind).name().to_string(),
            pattern: pattern.to_string(),
        })
    }
}

pub(crate) fn parse_number(field: &'static str, value: &str) -> Result<u32, FormatError> {
    value.trim().parse().map_err(|_| FormatError {
        field,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_lookup_is_case_insensitive() {
        assert_eq!(
            "Immediately Dominates".parse::<FragmentKind>(),
            Ok(FragmentKind::ImmediatelyDominates)
        );
        assert_eq!(
            "immediatelydominates".parse::<FragmentKind>(),
            Ok(FragmentKind::ImmediatelyDominates)
        );
        assert_eq!("SISTER OF".parse::<FragmentKind>(), Ok(FragmentKind::SisterOf));
        assert_eq!("..".parse::<FragmentKind>(), Ok(FragmentKind::Precedes));
    }

    #[test]
    fn test_strict_and_lenient_lookup_differ() {
        assert_eq!("hovers".parse::<FragmentKind>(), Err("hovers".to_string()));
        assert_eq!(FragmentKind::lenient("hovers"), FragmentKind::DEFAULT);
        assert_eq!(FragmentKind::lenient(" precedes "), FragmentKind::Precedes);
    }

    #[test]
    fn test_every_kind_round_trips_by_name_and_operator() {
        for kind in FragmentKind::ALL {
            assert_eq!(kind.name().parse::<FragmentKind>(), Ok(kind));
            assert_eq!(kind.operator().parse::<FragmentKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_row_conversion() {
        let fragment = MatchFragment::new(2, 7, FragmentKind::Precedes, "VP");
        let row = fragment.to_row();
        assert_eq!(row, ["2", "7", "precedes", "VP"].map(String::from));

        let parsed = MatchFragment::from_row(&row[0], &row[1], &row[2], &row[3]).unwrap();
        assert_eq!(parsed, fragment);
    }

    #[test]
    fn test_from_row_rejects_non_numeric() {
        let err = MatchFragment::from_row("one", "1", "dominates", "NP").unwrap_err();
        assert_eq!(err.field, "level");

        let err = MatchFragment::from_row("1", "x2", "dominates", "NP").unwrap_err();
        assert_eq!(err.field, "id");
        assert_eq!(err.value, "x2");
    }

    #[test]
    fn test_from_row_defaults_unknown_kind() {
        let fragment = MatchFragment::from_row("1", "1", "wobbles", "NP").unwrap();
        assert_eq!(fragment.kind, FragmentKind::DEFAULT.name());
    }
}
