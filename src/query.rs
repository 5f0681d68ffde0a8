//! Query language parser
//!
//! Parses query strings into the Pattern AST using a pest grammar.

use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;
use regex::Regex;
use rustc_hash::FxHashSet;

use crate::error::PatternError;
use crate::pattern::{LabelTest, NodeTest, Pattern, PatternNodeId, RelationType, WILDCARD};

#[derive(Parser)]
#[grammar = "query_grammar.pest"]
struct QueryParser;

/// Parse a query string into a Pattern
pub fn parse_query(input: &str) -> Result<Pattern, PatternError> {
    if input.trim().is_empty() {
        return Err(PatternError::Empty);
    }

    let pairs = QueryParser::parse(Rule::query, input).map_err(Box::new)?;
    let mut pattern = Pattern::new();

    for query_pair in pairs {
        for inner in query_pair.into_inner() {
            if inner.as_rule() == Rule::node {
                parse_node(inner, &mut pattern)?;
            }
        }
    }

    let mut seen = FxHashSet::default();
    for label in pattern.labels() {
        if !seen.insert(label) {
            return Err(PatternError::DuplicateLabel(label.to_string()));
        }
    }

    Ok(pattern)
}

/// Parse a node and everything related to it, returning the node's id
fn parse_node(pair: Pair<Rule>, pattern: &mut Pattern) -> Result<PatternNodeId, PatternError> {
    let mut test = NodeTest::any();
    let mut label = "";
    let mut relations = Vec::new();

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::node_test => test = parse_node_test(inner)?,
            Rule::label => label = inner.as_str(),
            Rule::relation => relations.push(inner),
            _ => {}
        }
    }

    // Parent first so the anchor is node 0
    let id = pattern.add_node(label, test);
    for relation in relations {
        if let Some((relation_type, target)) = parse_relation(relation, pattern)? {
            pattern.add_relation(id, relation_type, target);
        }
    }

    Ok(id)
}

/// Parse `op (node ...)`
fn parse_relation(
    pair: Pair<Rule>,
    pattern: &mut Pattern,
) -> Result<Option<(RelationType, PatternNodeId)>, PatternError> {
    let mut relation_type = None;
    let mut target = None;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::operator => relation_type = RelationType::from_operator(inner.as_str()),
            Rule::node => target = Some(parse_node(inner, pattern)?),
            _ => {}
        }
    }

    Ok(relation_type.zip(target))
}

/// Parse `!A|B|/re/`
fn parse_node_test(pair: Pair<Rule>) -> Result<NodeTest, PatternError> {
    let mut test = NodeTest {
        negated: false,
        alternatives: Vec::new(),
    };

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::negation => test.negated = true,
            Rule::tag => {
                let tag = inner.as_str();
                test.alternatives.push(if tag == WILDCARD {
                    LabelTest::Any
                } else {
                    LabelTest::Exact(tag.to_string())
                });
            }
            Rule::regex => {
                let body = inner.into_inner().as_str().replace("\\/", "/");
                let regex = Regex::new(&body).map_err(|source| PatternError::Regex {
                    pattern: body.clone(),
                    source,
                })?;
                test.alternatives.push(LabelTest::Regex(body, regex));
            }
            _ => {}
        }
    }

    if test.alternatives.is_empty() {
        test.alternatives.push(LabelTest::Any);
    }
    Ok(test)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_node() {
        let pattern = parse_query("(NP=1)").unwrap();

        assert_eq!(pattern.nodes.len(), 1);
        assert_eq!(pattern.nodes[0].label, "1");
        assert_eq!(pattern.nodes[0].test.exact_label(), Some("NP"));
        assert!(pattern.nodes[0].relations.is_empty());
    }

    #[test]
    fn test_parse_nested_relations() {
        let pattern = parse_query("(S=1 < (NP=2 < (NN=3)) < (VP=4) .. (.=5))").unwrap();

        assert_eq!(pattern.nodes.len(), 5);
        let labels: Vec<_> = pattern.labels().collect();
        assert_eq!(labels, vec!["1", "2", "3", "4", "5"]);

        assert_eq!(
            pattern.nodes[0].relations,
            vec![
                (RelationType::ImmediatelyDominates, 1),
                (RelationType::ImmediatelyDominates, 3),
                (RelationType::Precedes, 4),
            ]
        );
        assert_eq!(pattern.nodes[1].relations, vec![(RelationType::ImmediatelyDominates, 2)]);
        assert_eq!(pattern.nodes[4].test.exact_label(), Some("."));
    }

    #[test]
    fn test_parse_all_operators() {
        let query = "(A=1 << (B=2) < (C=3) >> (D=4) > (E=5) .. (F=6) . (G=7) ,, (H=8) , (I=9) $ (J=10))";
        let pattern = parse_query(query).unwrap();

        let relations: Vec<_> = pattern.nodes[0].relations.iter().map(|(r, _)| *r).collect();
        assert_eq!(
            relations,
            vec![
                RelationType::Dominates,
                RelationType::ImmediatelyDominates,
                RelationType::DominatedBy,
                RelationType::ImmediatelyDominatedBy,
                RelationType::Precedes,
                RelationType::ImmediatelyPrecedes,
                RelationType::Follows,
                RelationType::ImmediatelyFollows,
                RelationType::SisterOf,
            ]
        );
    }

    #[test]
    fn test_parse_alternation_regex_and_negation() {
        let pattern = parse_query("(!NN|/^VB/=1 << (__=2) << (PRP$=3))").unwrap();

        let test = &pattern.nodes[0].test;
        assert!(test.negated);
        assert_eq!(test.alternatives.len(), 2);
        assert_eq!(test.alternatives[0], LabelTest::Exact("NN".to_string()));
        assert!(matches!(&test.alternatives[1], LabelTest::Regex(body, _) if body == "^VB"));

        assert_eq!(pattern.nodes[1].test.alternatives, vec![LabelTest::Any]);
        assert_eq!(pattern.nodes[2].test.exact_label(), Some("PRP$"));
    }

    #[test]
    fn test_regex_with_escaped_slash() {
        let pattern = parse_query(r"(/a\/b/=1)").unwrap();
        assert!(pattern.nodes[0].test.matches("a/b"));
    }

    #[test]
    fn test_empty_query() {
        assert!(matches!(parse_query(""), Err(PatternError::Empty)));
        assert!(matches!(parse_query("  \n"), Err(PatternError::Empty)));
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(parse_query("(NP=1"), Err(PatternError::Syntax(_))));
        assert!(matches!(parse_query("NP=1"), Err(PatternError::Syntax(_))));
        assert!(matches!(parse_query("(NP=1 ~ (NN=2))"), Err(PatternError::Syntax(_))));
        assert!(matches!(parse_query("(NP)"), Err(PatternError::Syntax(_))));
    }

    #[test]
    fn test_invalid_regex() {
        assert!(matches!(
            parse_query("(/[unclosed/=1)"),
            Err(PatternError::Regex { .. })
        ));
    }

    #[test]
    fn test_duplicate_label() {
        assert!(matches!(
            parse_query("(NP=1 << (NN=1))"),
            Err(PatternError::DuplicateLabel(label)) if label == "1"
        ));
    }
}
