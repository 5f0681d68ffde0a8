//! The three free-text expressions edited outside the rule tables
//!
//! A scratchpad becomes a [`Rule`] only if all three expressions parse, so a
//! failed commit never reaches the repository.

use crate::error::{ScratchpadError, StructureError};
use crate::expression::{
    compile_to_expression, expression_to_templates, parse_from_expression, templates_to_expression,
};
use crate::rule::{DEFAULT_RULE_NAME, Rule};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scratchpad {
    pub name: String,
    /// Fragment expression, e.g. `[1:dominates]NP ([2:dominates]NN)`
    pub pattern: String,
    /// Question template expression, e.g. `[dominates]What is {Q2}?`
    pub questions: String,
    pub answers: String,
}

impl Scratchpad {
    pub fn new(name: &str, pattern: &str, questions: &str, answers: &str) -> Self {
        Self {
            name: name.to_string(),
            pattern: pattern.to_string(),
            questions: questions.to_string(),
            answers: answers.to_string(),
        }
    }

    /// Fill the expressions from a stored rule
    pub fn from_rule(rule: &Rule) -> Result<Self, StructureError> {
        Ok(Self {
            name: rule.name.clone(),
            pattern: compile_to_expression(&rule.match_fragments)?,
            questions: templates_to_expression(&rule.question_templates),
            answers: templates_to_expression(&rule.answer_templates),
        })
    }

    /// Compile all three expressions into an unlocked rule.
    ///
    /// A blank name becomes [`DEFAULT_RULE_NAME`].
    pub fn to_rule(&self) -> Result<Rule, ScratchpadError> {
        let name = if self.name.trim().is_empty() {
            DEFAULT_RULE_NAME
        } else {
            self.name.as_str()
        };

        let mut rule = Rule::new(name);
        rule.match_fragments = parse_from_expression(&self.pattern).map_err(ScratchpadError::Pattern)?;
        rule.question_templates = expression_to_templates(&self.questions).map_err(ScratchpadError::Question)?;
        rule.answer_templates = expression_to_templates(&self.answers).map_err(ScratchpadError::Answer)?;
        rule.validate()?;
        Ok(rule)
    }
}
