//! Template rendering and sentence annotation
//!
//! Templates are free text with capture references such as `{Q2}` or `{A3}`:
//! a brace, optional ASCII letters, a decimal fragment id, a closing brace.
//! Anything else between braces is left as literal text.
//!
//! Rendering never fails. A reference to an id the binding does not contain
//! becomes the empty string, so incomplete rules still preview.

use crate::matcher::Binding;
use crate::rule::{Rule, Template};
use crate::tree::{NodeId, Tree};
use memchr::memchr;
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt::Write;

/// A capture reference found in template text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRef<'a> {
    /// Byte range of the whole reference, braces included
    pub start: usize,
    pub end: usize,
    /// Letters before the id (`Q`, `A`, or empty)
    pub prefix: &'a str,
    pub id: u32,
}

/// Iterator over the capture references in a template, left to right
pub struct CaptureRefs<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Iterator for CaptureRefs<'a> {
    type Item = CaptureRef<'a>;

    fn next(&mut self) -> Option<CaptureRef<'a>> {
        while self.pos < self.text.len() {
            let open = self.pos + memchr(b'{', &self.text.as_bytes()[self.pos..])?;
            self.pos = open + 1;
            if let Some(reference) = parse_reference(self.text, open) {
                self.pos = reference.end;
                return Some(reference);
            }
        }
        None
    }
}

/// `{` at `open`, then letters, digits and `}`
fn parse_reference(text: &str, open: usize) -> Option<CaptureRef<'_>> {
    let bytes = text.as_bytes();
    let prefix_start = open + 1;
    let mut i = prefix_start;
    while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
        i += 1;
    }
    let digits_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == digits_start || bytes.get(i) != Some(&b'}') {
        return None;
    }
    let id = text[digits_start..i].parse().ok()?;
    Some(CaptureRef {
        start: open,
        end: i + 1,
        prefix: &text[prefix_start..digits_start],
        id,
    })
}

/// Capture references in `template`, in order of appearance
pub fn capture_refs(template: &str) -> CaptureRefs<'_> {
    CaptureRefs {
        text: template,
        pos: 0,
    }
}

/// Substitute every capture reference with the surface text of its bound node
pub fn render(template: &str, binding: &Binding<'_>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for reference in capture_refs(template) {
        out.push_str(&template[last..reference.start]);
        if let Some(text) = binding.text(reference.id) {
            out.push_str(&text);
        }
        last = reference.end;
    }
    out.push_str(&template[last..]);
    out
}

/// Render each template and join the non-empty results with a space.
///
/// Only a template's pattern is rendered. Its kind is kept for storage and
/// does not change how references are substituted; captured text is inserted
/// as is, without escaping.
pub fn render_all(templates: &[Template], binding: &Binding<'_>) -> String {
    templates
        .iter()
        .map(|template| render(&template.pattern, binding))
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Question,
    Answer,
}

/// Which capture ids feed the question and which feed the answer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureRoles {
    question: FxHashSet<u32>,
    answer: FxHashSet<u32>,
}

impl CaptureRoles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Roles from the ids a rule's templates reference
    pub fn from_rule(rule: &Rule) -> Self {
        let mut roles = Self::new();
        for template in &rule.question_templates {
            for reference in capture_refs(&template.pattern) {
                roles.insert(Role::Question, reference.id);
            }
        }
        for template in &rule.answer_templates {
            for reference in capture_refs(&template.pattern) {
                roles.insert(Role::Answer, reference.id);
            }
        }
        roles
    }

    pub fn insert(&mut self, role: Role, id: u32) {
        match role {
            Role::Question => self.question.insert(id),
            Role::Answer => self.answer.insert(id),
        };
    }

    /// Question takes precedence when an id has both roles
    pub fn role(&self, id: u32) -> Option<Role> {
        if self.question.contains(&id) {
            Some(Role::Question)
        } else if self.answer.contains(&id) {
            Some(Role::Answer)
        } else {
            None
        }
    }

    pub fn is_empty(&self) -> bool {
        self.question.is_empty() && self.answer.is_empty()
    }
}

/// Highlight attached to a leaf covered by a capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mark {
    pub role: Role,
    pub id: u32,
    /// Visible reference number; empty when it repeats the previous mark
    pub reference: String,
}

/// One leaf of an annotated sentence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedToken {
    pub text: String,
    /// Part-of-speech tag, only in tagged mode
    pub tag: Option<String>,
    pub mark: Option<Mark>,
}

/// Walk the leaves of `tree` and mark the ones covered by a role-bearing capture.
///
/// A leaf belongs to the innermost such capture (lowest id when several ids
/// bind the same node). The reference number appears on the first leaf of a
/// run of the same id and is left empty on the following ones; unmarked
/// leaves in between do not end the run.
pub fn annotate(tree: &Tree, binding: &Binding<'_>, roles: &CaptureRoles, tagged: bool) -> Vec<AnnotatedToken> {
    // Binding iterates in id order, so the first id seen for a node wins
    let mut owner: FxHashMap<NodeId, u32> = FxHashMap::default();
    for (id, node) in binding.iter() {
        if roles.role(id).is_some() {
            owner.entry(node).or_insert(id);
        }
    }

    let mut last_ref: Option<u32> = None;
    tree.leaves()
        .into_iter()
        .map(|leaf| {
            let mark = innermost_owner(tree, &owner, leaf).and_then(|id| {
                let role = roles.role(id)?;
                let reference = if last_ref == Some(id) {
                    String::new()
                } else {
                    last_ref = Some(id);
                    id.to_string()
                };
                Some(Mark { role, id, reference })
            });
            let tag = if tagged {
                tree.nodes[leaf]
                    .parent
                    .map(|parent| tree.nodes[parent].label.clone())
            } else {
                None
            };
            AnnotatedToken {
                text: tree.nodes[leaf].label.clone(),
                tag,
                mark,
            }
        })
        .collect()
}

fn innermost_owner(tree: &Tree, owner: &FxHashMap<NodeId, u32>, leaf: NodeId) -> Option<u32> {
    let mut current = Some(leaf);
    while let Some(node) = current {
        if let Some(&id) = owner.get(&node) {
            return Some(id);
        }
        current = tree.nodes[node].parent;
    }
    None
}

/// HTML rendering of an annotated sentence for table cells
pub fn to_html(tokens: &[AnnotatedToken]) -> String {
    let mut html = String::from("<html>");
    for token in tokens {
        let tag = token
            .tag
            .as_deref()
            .map(|tag| format!("<font color=gray>/{tag}</font>"))
            .unwrap_or_default();
        // Writing to a String cannot fail
        let _ = match &token.mark {
            Some(Mark {
                role: Role::Question,
                reference,
                ..
            }) => write!(
                html,
                "<sup>{reference}</sup><b><font color=green>{}</font>{tag}</b> ",
                token.text
            ),
            Some(Mark {
                role: Role::Answer,
                reference,
                ..
            }) => write!(html, "<sup>{reference}</sup><b>{}{tag}</b> ", token.text),
            None => write!(html, "{}{tag} ", token.text),
        };
    }
    html.push_str("</html>");
    html
}
