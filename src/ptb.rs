//! Bracketed tree file parsing
//!
//! Reads Penn Treebank style trees such as
//! `(ROOT (S (NP (DT This)) (VP (VBZ is) (NP (DT a) (NN test))) (. .)))`.
//! A tree may span several lines and several trees may share a line.
//! Files ending in `.gz` are decompressed transparently.

use crate::error::TreeParseError;
use crate::tree::{NodeId, Tree};
use flate2::read::MultiGzDecoder;
use memchr::memchr2;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Lines};
use std::path::Path;
use std::str::FromStr;

/// Label given to bracket groups with no label, e.g. the outer `( (S ...) )`
pub const ANONYMOUS_ROOT: &str = "ROOT";

/// Reader that iterates over the trees in a bracketed text stream
pub struct TreeReader<R: BufRead> {
    lines: Lines<R>,
    finished: bool,
    line_num: usize,
    line: String,
    pos: usize,
}

impl TreeReader<Box<dyn BufRead>> {
    /// Open a file, decompressing it if the name ends in `.gz`
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = File::open(path)?;
        let is_gzip = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"));
        let reader: Box<dyn BufRead> = if is_gzip {
            Box::new(BufReader::new(MultiGzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };
        Ok(Self::new(reader))
    }
}

impl TreeReader<Cursor<Vec<u8>>> {
    pub fn from_string(text: &str) -> Self {
        Self::new(Cursor::new(text.as_bytes().to_vec()))
    }
}

impl<R: BufRead> TreeReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            finished: false,
            line_num: 0,
            line: String::new(),
            pos: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> TreeParseError {
        TreeParseError {
            line_num: self.line_num,
            message: message.into(),
        }
    }
}

impl<R: BufRead> Iterator for TreeReader<R> {
    type Item = Result<Tree, TreeParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let mut text = String::new();
        let mut depth = 0usize;
        let mut start_line = self.line_num;

        loop {
            if self.pos >= self.line.len() {
                match self.lines.next() {
                    None => {
                        self.finished = true;
                        if depth > 0 {
                            return Some(Err(TreeParseError {
                                line_num: start_line,
                                message: "unexpected end of input: unclosed '('".to_string(),
                            }));
                        }
                        return None;
                    }
                    Some(Err(e)) => {
                        // A broken stream keeps failing, so stop after the first error
                        self.finished = true;
                        self.line_num += 1;
                        return Some(Err(self.error(format!("IO error: {}", e))));
                    }
                    Some(Ok(line)) => {
                        self.line_num += 1;
                        self.line = line;
                        self.pos = 0;
                        if depth > 0 {
                            text.push(' ');
                        }
                        continue;
                    }
                }
            }

            let rest = &self.line[self.pos..];
            let Some(i) = memchr2(b'(', b')', rest.as_bytes()) else {
                if depth > 0 {
                    text.push_str(rest);
                } else if !rest.trim().is_empty() {
                    let stray = rest.trim().to_string();
                    self.pos = self.line.len();
                    return Some(Err(
                        self.error(format!("unexpected text outside brackets: '{}'", stray))
                    ));
                }
                self.pos = self.line.len();
                continue;
            };

            let byte = rest.as_bytes()[i];
            if depth == 0 {
                let before = rest[..i].trim();
                if !before.is_empty() {
                    let stray = before.to_string();
                    self.pos += i;
                    return Some(Err(
                        self.error(format!("unexpected text outside brackets: '{}'", stray))
                    ));
                }
                if byte == b')' {
                    self.pos += i + 1;
                    return Some(Err(self.error("unmatched ')'")));
                }
                start_line = self.line_num;
            }

            text.push_str(&rest[..=i]);
            self.pos += i + 1;

            if byte == b'(' {
                depth += 1;
            } else {
                depth -= 1;
                if depth == 0 {
                    return Some(parse_bracketed(&text, start_line));
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Open,
    Close,
    Atom(&'a str),
}

fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    for chunk in text.split_whitespace() {
        let mut rest = chunk;
        while !rest.is_empty() {
            match memchr2(b'(', b')', rest.as_bytes()) {
                Some(0) => {
                    tokens.push(if rest.as_bytes()[0] == b'(' {
                        Token::Open
                    } else {
                        Token::Close
                    });
                    rest = &rest[1..];
                }
                Some(i) => {
                    tokens.push(Token::Atom(&rest[..i]));
                    rest = &rest[i..];
                }
                None => {
                    tokens.push(Token::Atom(rest));
                    rest = "";
                }
            }
        }
    }
    tokens
}

/// Parse exactly one bracketed tree
fn parse_bracketed(text: &str, line_num: usize) -> Result<Tree, TreeParseError> {
    let error = |message: &str| TreeParseError {
        line_num,
        message: message.to_string(),
    };

    let mut tree = Tree::new();
    let mut stack: Vec<NodeId> = Vec::new();
    let mut tokens = tokenize(text).into_iter().peekable();

    while let Some(token) = tokens.next() {
        match token {
            Token::Open => {
                let label = match tokens.peek() {
                    Some(Token::Atom(label)) => {
                        let label = *label;
                        tokens.next();
                        label
                    }
                    _ => ANONYMOUS_ROOT,
                };
                let id = match stack.last() {
                    Some(&parent) => tree.add_child(parent, label),
                    None if tree.nodes.is_empty() => tree.add_node(label),
                    None => return Err(error("more than one root in a single tree")),
                };
                stack.push(id);
            }
            Token::Close => {
                let Some(id) = stack.pop() else {
                    return Err(error("unmatched ')'"));
                };
                // Empty constituents like `(NP)` carry no words
                if tree.nodes[id].is_leaf() {
                    tree.pop_node();
                }
            }
            Token::Atom(word) => match stack.last() {
                Some(&parent) => {
                    tree.add_child(parent, word);
                }
                None => return Err(error("word outside brackets")),
            },
        }
    }

    if !stack.is_empty() {
        return Err(error("unclosed '('"));
    }
    if tree.nodes.is_empty() {
        return Err(error("empty tree"));
    }
    Ok(tree)
}

/// Parse a single bracketed tree from a string
pub fn parse_tree(text: &str) -> Result<Tree, TreeParseError> {
    let mut reader = TreeReader::from_string(text);
    let tree = reader.next().ok_or_else(|| TreeParseError {
        line_num: 1,
        message: "no tree found".to_string(),
    })??;
    if reader.next().is_some() {
        return Err(TreeParseError {
            line_num: reader.line_num,
            message: "trailing input after tree".to_string(),
        });
    }
    Ok(tree)
}

impl FromStr for Tree {
    type Err = TreeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_tree(s)
    }
}
