//! Reader for the ExaBGP configuration syntax
//!
//! The file is a tree of sections (`neighbor 192.168.0.1 { ... }`) holding
//! `;`-terminated statements. Nothing here knows what a neighbor or a process
//! is, it only turns text into [`Section`]s.

use std::fs;
use std::mem;
use std::path::Path;

use crate::error::{Error, Result};

/// A `;`-terminated statement, never empty
#[derive(Clone, Debug, PartialEq)]
pub struct Statement {
    pub line: usize,
    pub words: Vec<String>,
}

impl Statement {
    pub fn keyword(&self) -> &str {
        &self.words[0]
    }

    pub fn args(&self) -> &[String] {
        &self.words[1..]
    }

    /// Arguments joined back with single spaces
    pub fn value(&self) -> String {
        self.args().join(" ")
    }
}

/// A `{ }` block with its header words (E.g. ["neighbor", "192.168.0.1"])
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Section {
    pub line: usize,
    pub words: Vec<String>,
    pub statements: Vec<Statement>,
    pub sections: Vec<Section>,
}

impl Section {
    /// Read and parse a configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|err| Error::io(format!("Reading {}", path.display()), err))?;
        parse(&contents)
    }

    /// First header word, empty for the root section
    pub fn kind(&self) -> &str {
        self.words.first().map(String::as_str).unwrap_or("")
    }

    pub fn name(&self) -> Option<&str> {
        self.words.get(1).map(String::as_str)
    }

    /// Last statement using `keyword` (later statements override earlier ones)
    pub fn statement(&self, keyword: &str) -> Option<&Statement> {
        self.statements
            .iter()
            .rev()
            .find(|stmt| stmt.keyword() == keyword)
    }

    pub fn sections_of<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Section> + 'a {
        self.sections.iter().filter(move |s| s.kind() == kind)
    }

    pub fn section(&self, kind: &str) -> Option<&Section> {
        self.sections.iter().rev().find(|s| s.kind() == kind)
    }
}

#[derive(Debug, PartialEq)]
enum Token {
    Word(String),
    End,
    Open,
    Close,
}

fn syntax(line: usize, reason: impl Into<String>) -> Error {
    Error::Syntax {
        line,
        reason: reason.into(),
    }
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, ';' | '{' | '}' | '[' | ']')
}

fn tokenize(input: &str) -> Result<Vec<(usize, Token)>> {
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\n' => line += 1,
            c if c.is_whitespace() => (),
            '#' => {
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            ';' => tokens.push((line, Token::End)),
            '{' => tokens.push((line, Token::Open)),
            '}' => tokens.push((line, Token::Close)),
            // Lists are only a visual grouping, their items join the statement
            '[' | ']' => (),
            '"' | '\'' => {
                let start = line;
                let mut word = String::new();
                let mut closed = false;
                for next in chars.by_ref() {
                    if next == c {
                        closed = true;
                        break;
                    }
                    if next == '\n' {
                        line += 1;
                    }
                    word.push(next);
                }
                if !closed {
                    return Err(syntax(start, format!("unterminated string {}{}", c, word)));
                }
                tokens.push((start, Token::Word(word)));
            }
            c => {
                let mut word = c.to_string();
                while let Some(&next) = chars.peek() {
                    if is_delimiter(next) {
                        break;
                    }
                    word.push(next);
                    chars.next();
                }
                tokens.push((line, Token::Word(word)));
            }
        }
    }
    Ok(tokens)
}

/// Parse configuration text into its root section
pub fn parse(input: &str) -> Result<Section> {
    let mut current = Section::default();
    let mut parents: Vec<Section> = Vec::new();
    let mut words: Vec<String> = Vec::new();
    let mut start = 0;

    for (line, token) in tokenize(input)? {
        match token {
            Token::Word(word) => {
                if words.is_empty() {
                    start = line;
                }
                words.push(word);
            }
            Token::End => {
                if !words.is_empty() {
                    current.statements.push(Statement {
                        line: start,
                        words: mem::take(&mut words),
                    });
                }
            }
            Token::Open => {
                if words.is_empty() {
                    return Err(syntax(line, "section without a name"));
                }
                let child = Section {
                    line: start,
                    words: mem::take(&mut words),
                    ..Default::default()
                };
                parents.push(mem::replace(&mut current, child));
            }
            Token::Close => {
                // ExaBGP tolerates a missing ';' before a closing brace
                if !words.is_empty() {
                    current.statements.push(Statement {
                        line: start,
                        words: mem::take(&mut words),
                    });
                }
                let parent = parents
                    .pop()
                    .ok_or_else(|| syntax(line, "unexpected '}'"))?;
                let finished = mem::replace(&mut current, parent);
                current.sections.push(finished);
            }
        }
    }

    if !parents.is_empty() {
        return Err(syntax(
            current.line,
            format!("missing '}}' for section '{}'", current.words.join(" ")),
        ));
    }
    if !words.is_empty() {
        return Err(syntax(start, format!("missing ';' after '{}'", words.join(" "))));
    }
    Ok(current)
}
