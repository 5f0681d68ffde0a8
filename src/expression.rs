//! Flat expression form of a rule
//!
//! Converts between a rule's structured fragment/template lists and the
//! single-line strings edited in the scratchpad.
//!
//! Fragment expression grammar:
//!
//! ```text
//! expression := [ item ( "," item )* ]
//! item       := [ header ] pattern [ "(" expression ")" ]
//! header     := "[" [ id ":" ] kind "]"
//! ```
//!
//! A parenthesised group holds the children of the item before it, so an
//! item's level is its group depth plus one. Pattern text runs up to the next
//! delimiter and is trimmed; the characters `(`, `)`, `,`, `[` and `]` must be
//! escaped by the caller before they are stored in a pattern.
//!
//! Template expressions are a flat list: `[kind]pattern | [kind]pattern`.

use crate::error::{StructureError, SyntaxError};
use crate::fragment::{FragmentKind, MatchFragment};
use crate::rule::Template;
use rustc_hash::FxHashSet;
use std::fmt::Write as _;

/// Separator between sibling fragments
pub const FRAGMENT_SEPARATOR: &str = ", ";

/// Separator between templates
pub const TEMPLATE_SEPARATOR: char = '|';

/// Walk fragments in order and produce the flat expression.
///
/// The level before the first fragment is 0. A fragment may go at most one
/// level deeper than the fragment before it; anything else is a
/// [`StructureError`].
pub fn compile_to_expression(fragments: &[MatchFragment]) -> Result<String, StructureError> {
    let mut out = String::new();
    let mut previous = 0u32;

    for (idx, fragment) in fragments.iter().enumerate() {
        let level = fragment.level;
        if level == 0 {
            return Err(StructureError::ZeroLevel { id: fragment.id });
        }
        if level > previous + 1 {
            return Err(StructureError::LevelJump {
                id: fragment.id,
                previous,
                level,
            });
        }

        if idx > 0 {
            if level == previous + 1 {
                out.push_str(" (");
            } else {
                for _ in level..previous {
                    out.push(')');
                }
                out.push_str(FRAGMENT_SEPARATOR);
            }
        }

        let _ = write!(out, "[{}:{}]{}", fragment.id, fragment.kind, fragment.pattern);
        previous = level;
    }

    for _ in 1..previous {
        out.push(')');
    }

    Ok(out)
}

/// A fragment as read from the expression, before ids are assigned
struct ParsedItem {
    level: u32,
    id: Option<u32>,
    kind: String,
    pattern: String,
}

struct ExpressionParser<'a> {
    text: &'a str,
    pos: usize,
    items: Vec<ParsedItem>,
}

impl<'a> ExpressionParser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            items: Vec::new(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            if !b.is_ascii_whitespace() {
                break;
            }
            self.pos += 1;
        }
    }

    fn unexpected(&self) -> SyntaxError {
        let ch = self.text[self.pos..].chars().next().unwrap_or(' ');
        SyntaxError::UnexpectedChar {
            ch,
            offset: self.pos,
        }
    }

    /// Parse a comma-separated list of items at `depth`, inside the group
    /// opened at `open`. Stops before a `)` or at end of input.
    fn parse_list(&mut self, depth: u32, open: Option<usize>) -> Result<(), SyntaxError> {
        loop {
            self.skip_whitespace();
            if let (None, Some(offset)) = (self.peek(), open) {
                return Err(SyntaxError::UnclosedGroup { offset });
            }
            self.parse_item(depth)?;
            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b')') if depth == 0 => {
                    return Err(SyntaxError::UnmatchedClose { offset: self.pos });
                }
                Some(b')') | None => return Ok(()),
                Some(b']') => return Err(SyntaxError::StrayHeaderClose { offset: self.pos }),
                Some(_) => return Err(self.unexpected()),
            }
        }
    }

    fn parse_item(&mut self, depth: u32) -> Result<(), SyntaxError> {
        self.skip_whitespace();
        let start = self.pos;

        let header = if self.peek() == Some(b'[') {
            Some(self.parse_header()?)
        } else {
            None
        };

        let pattern_start = self.pos;
        while let Some(b) = self.peek() {
            if matches!(b, b'(' | b')' | b',' | b'[' | b']') {
                break;
            }
            self.pos += 1;
        }
        let pattern = self.text[pattern_start..self.pos].trim().to_string();

        if header.is_none() && pattern.is_empty() {
            return Err(match self.peek() {
                Some(b'(') => SyntaxError::OrphanGroup { offset: self.pos },
                Some(b')') if depth == 0 => SyntaxError::UnmatchedClose { offset: self.pos },
                Some(b']') => SyntaxError::StrayHeaderClose { offset: self.pos },
                _ => SyntaxError::EmptyItem { offset: start },
            });
        }

        let (id, kind) =
            header.unwrap_or_else(|| (None, FragmentKind::DEFAULT.name().to_string()));
        self.items.push(ParsedItem {
            level: depth + 1,
            id,
            kind,
            pattern,
        });

        if self.peek() == Some(b'(') {
            let open = self.pos;
            self.pos += 1;
            self.parse_list(depth + 1, Some(open))?;
            if self.peek() != Some(b')') {
                return Err(SyntaxError::UnclosedGroup { offset: open });
            }
            self.pos += 1;
        }

        Ok(())
    }

    /// Parse `[id:kind]` or `[kind]`, leaving `pos` after the closing bracket
    fn parse_header(&mut self) -> Result<(Option<u32>, String), SyntaxError> {
        let open = self.pos;
        let body_start = open + 1;
        let Some(len) = self.text[body_start..].find(']') else {
            return Err(SyntaxError::UnclosedHeader { offset: open });
        };
        let body = &self.text[body_start..body_start + len];
        if let Some(nested) = body.find('[') {
            return Err(SyntaxError::UnclosedHeader {
                offset: body_start + nested,
            });
        }
        self.pos = body_start + len + 1;

        let (id, kind, kind_offset) = match body.find(':') {
            Some(colon) => {
                let id_text = body[..colon].trim();
                let id = id_text.parse::<u32>().map_err(|_| SyntaxError::InvalidId {
                    text: id_text.to_string(),
                    offset: body_start,
                })?;
                (Some(id), body[colon + 1..].trim(), body_start + colon + 1)
            }
            None => (None, body.trim(), body_start),
        };

        if kind.is_empty() {
            return Err(SyntaxError::EmptyKind {
                offset: kind_offset,
            });
        }
        Ok((id, kind.to_string()))
    }
}

/// Parse a flat expression back into an ordered fragment list.
///
/// Items without an explicit id are numbered in occurrence order starting at
/// 1, skipping ids the expression uses explicitly.
pub fn parse_from_expression(text: &str) -> Result<Vec<MatchFragment>, SyntaxError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut parser = ExpressionParser::new(text);
    parser.parse_list(0, None)?;
    if parser.pos < text.len() {
        return Err(SyntaxError::UnmatchedClose { offset: parser.pos });
    }

    let used: FxHashSet<u32> = parser.items.iter().filter_map(|item| item.id).collect();
    let mut next_id = 1u32;
    let fragments = parser
        .items
        .into_iter()
        .map(|item| {
            let id = item.id.unwrap_or_else(|| {
                while used.contains(&next_id) {
                    next_id += 1;
                }
                next_id += 1;
                next_id - 1
            });
            MatchFragment {
                level: item.level,
                id,
                kind: item.kind,
                pattern: item.pattern,
            }
        })
        .collect();

    Ok(fragments)
}

/// Join templates into one flat string
pub fn templates_to_expression(templates: &[Template]) -> String {
    templates
        .iter()
        .map(|t| format!("[{}]{}", t.kind, t.pattern))
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Split a flat template string back into templates
pub fn expression_to_templates(text: &str) -> Result<Vec<Template>, SyntaxError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut templates = Vec::new();
    let mut offset = 0;
    for item in text.split(TEMPLATE_SEPARATOR) {
        let item_offset = offset + (item.len() - item.trim_start().len());
        offset += item.len() + TEMPLATE_SEPARATOR.len_utf8();
        let item = item.trim();

        let template = if let Some(body) = item.strip_prefix('[') {
            let Some(close) = body.find(']') else {
                return Err(SyntaxError::UnclosedHeader {
                    offset: item_offset,
                });
            };
            let kind = body[..close].trim();
            if kind.is_empty() {
                return Err(SyntaxError::EmptyKind {
                    offset: item_offset + 1,
                });
            }
            Template {
                kind: kind.to_string(),
                pattern: body[close + 1..].trim().to_string(),
            }
        } else {
            Template::new(item)
        };
        templates.push(template);
    }

    Ok(templates)
}
