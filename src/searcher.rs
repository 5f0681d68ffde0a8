//! Corpus search for one rule
//!
//! The pipeline:
//! 1. Compile the rule's fragments into a query string
//! 2. Hand the query to the match engine
//! 3. Walk the corpus in order, keeping only the first match in each tree
//! 4. Render question, answer and annotated sentence for that match
//!
//! Results are produced lazily, one row per matching tree. Each call starts
//! an independent scan over a snapshot of the corpus.

use crate::compiler::compile_to_query;
use crate::corpus::Corpus;
use crate::error::SearchError;
use crate::matcher::{CompiledQuery, MatchEngine};
use crate::rule::{Rule, Template};
use crate::scratchpad::Scratchpad;
use crate::template::{AnnotatedToken, CaptureRoles, annotate, render_all, to_html};
use crate::tree::Tree;
use std::sync::Arc;

/// Output for one matching tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    /// Position of the tree in the corpus
    pub tree_index: usize,
    pub question: String,
    pub answer: String,
    pub sentence: Vec<AnnotatedToken>,
}

impl ResultRow {
    /// Annotated sentence as HTML
    pub fn sentence_html(&self) -> String {
        to_html(&self.sentence)
    }
}

/// Lazy iterator over the rows of one search
pub struct SearchResults<Q> {
    query: Q,
    trees: Vec<Arc<Tree>>,
    next: usize,
    question_templates: Vec<Template>,
    answer_templates: Vec<Template>,
    roles: CaptureRoles,
    tagged: bool,
}

impl<Q> SearchResults<Q> {
    /// Number of trees in the scanned snapshot
    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// Trees examined so far
    pub fn position(&self) -> usize {
        self.next
    }
}

impl<Q: CompiledQuery> Iterator for SearchResults<Q> {
    type Item = ResultRow;

    fn next(&mut self) -> Option<ResultRow> {
        while self.next < self.trees.len() {
            let tree_index = self.next;
            self.next += 1;

            let tree = &self.trees[tree_index];
            let Some(binding) = self.query.find(tree) else {
                continue;
            };
            return Some(ResultRow {
                tree_index,
                question: render_all(&self.question_templates, &binding),
                answer: render_all(&self.answer_templates, &binding),
                sentence: annotate(tree, &binding, &self.roles, self.tagged),
            });
        }
        None
    }
}

/// Search `corpus` with `rule`.
///
/// A rule without fragments fails with [`SearchError::NoPattern`] before
/// the engine is asked to compile anything.
pub fn search<C, E>(rule: &Rule, corpus: &C, engine: &E, tagged: bool) -> Result<SearchResults<E::Query>, SearchError>
where
    C: Corpus + ?Sized,
    E: MatchEngine,
{
    if rule.match_fragments.is_empty() {
        return Err(SearchError::NoPattern);
    }
    let query_string = compile_to_query(&rule.match_fragments)?;
    if query_string.is_empty() {
        return Err(SearchError::NoPattern);
    }
    let query = engine.compile(&query_string)?;

    let trees = corpus.trees();
    tracing::debug!(rule = %rule.name, query = %query_string, trees = trees.len(), "starting search");

    Ok(SearchResults {
        query,
        trees,
        next: 0,
        question_templates: rule.question_templates.clone(),
        answer_templates: rule.answer_templates.clone(),
        roles: CaptureRoles::from_rule(rule),
        tagged,
    })
}

/// Search with the scratchpad's expressions without storing a rule
pub fn search_scratchpad<C, E>(
    scratchpad: &Scratchpad,
    corpus: &C,
    engine: &E,
    tagged: bool,
) -> Result<SearchResults<E::Query>, SearchError>
where
    C: Corpus + ?Sized,
    E: MatchEngine,
{
    let rule = scratchpad.to_rule()?;
    search(&rule, corpus, engine, tagged)
}
