//! qgrules: question generation rules over constituency parse trees
//!
//! A rule is a hierarchy of structural match fragments plus question and
//! answer templates. Rules translate to and from a flat text expression,
//! compile into a structural query with one capture per fragment, and turn
//! each tree match into a question, an answer and an annotated sentence.

// Rule model
pub mod fragment; // Match fragments and relation kinds
pub mod rule; // Rules and templates
pub mod scratchpad; // Free-text rule editing

// Compilation
pub mod compiler; // Fragments -> structural query
pub mod expression; // Fragments/templates <-> flat expressions

// Trees and matching
pub mod index; // Per-tree label index and leaf spans
pub mod matcher; // Match engine seam and the built-in matcher
pub mod pattern; // Structural pattern AST
pub mod ptb; // Bracketed tree reader
pub mod query; // Query language parser
pub mod tree; // Constituency tree arena

// Generation
pub mod corpus; // Treebanks and data sets
pub mod searcher; // Corpus search (compile + match + render)
pub mod template; // Template rendering and sentence annotation

// Persistence and setup
pub mod config;
pub mod error;
pub mod repository;

// Re-exports for convenience
pub use compiler::compile_to_query;
pub use config::EngineConfig;
pub use corpus::{Corpus, DataSet, LoadReport, Treebank};
pub use error::{
    CompileError, ConfigError, CorpusError, FormatError, PatternError, RepositoryError, ScratchpadError,
    SearchError, StructureError, SyntaxError, TreeParseError,
};
pub use expression::{compile_to_expression, expression_to_templates, parse_from_expression, templates_to_expression};
pub use fragment::{FragmentKind, MatchFragment};
pub use matcher::{Binding, CompiledQuery, MatchEngine, StructuralMatcher};
pub use ptb::{TreeReader, parse_tree};
pub use repository::{CommitOutcome, RuleRepository};
pub use rule::{Rule, Template};
pub use scratchpad::Scratchpad;
pub use searcher::{ResultRow, SearchResults, search, search_scratchpad};
pub use template::{AnnotatedToken, CaptureRoles, Mark, Role, annotate, render, render_all, to_html};
pub use tree::{Node, NodeId, Tree};
