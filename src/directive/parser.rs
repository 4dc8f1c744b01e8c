//! Tokenizer and recursive-descent parser for the directive grammar.

use std::iter::Peekable;
use std::str::CharIndices;

use thiserror::Error;

use super::Directive;

/// Syntax error with the 1-based line it was detected on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    Semicolon,
    Open,
    Close,
}

struct Lexer<'a> {
    chars: Peekable<CharIndices<'a>>,
    line: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.char_indices().peekable(),
            line: 1,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let (_, c) = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            line: self.line,
            message: message.into(),
        }
    }

    /// Next token and the line it started on.
    fn next_token(&mut self) -> Result<Option<(Token, usize)>, ParseError> {
        loop {
            let Some(&(_, c)) = self.chars.peek() else {
                return Ok(None);
            };
            if c.is_whitespace() {
                self.bump();
            } else if c == '#' {
                while let Some(&(_, c)) = self.chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.bump();
                }
            } else {
                break;
            }
        }

        let line = self.line;
        let token = match self.bump() {
            Some(';') => Token::Semicolon,
            Some('{') => Token::Open,
            Some('}') => Token::Close,
            Some(quote @ ('"' | '\'')) => Token::Word(self.quoted(quote)?),
            Some(first) => {
                let mut word = String::from(first);
                while let Some(&(_, c)) = self.chars.peek() {
                    if c.is_whitespace() || matches!(c, ';' | '{' | '}') {
                        break;
                    }
                    if c == '\\' {
                        self.bump();
                        word.push('\\');
                        if let Some(escaped) = self.bump() {
                            word.push(escaped);
                        }
                        continue;
                    }
                    word.push(c);
                    self.bump();
                }
                Token::Word(word)
            }
            None => return Ok(None),
        };
        Ok(Some((token, line)))
    }

    fn quoted(&mut self, quote: char) -> Result<String, ParseError> {
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('\\') => match self.bump() {
                    Some(c) if c == quote || c == '\\' => value.push(c),
                    Some(c) => {
                        value.push('\\');
                        value.push(c);
                    }
                    None => return Err(self.error("unterminated quoted string")),
                },
                Some(c) if c == quote => return Ok(value),
                Some(c) => value.push(c),
                None => return Err(self.error("unterminated quoted string")),
            }
        }
    }
}

/// Parse config text into a directive tree.
pub fn parse(input: &str) -> Result<Vec<Directive>, ParseError> {
    let mut lexer = Lexer::new(input);
    let directives = parse_block(&mut lexer, None)?;
    Ok(directives)
}

/// Parse directives until `}` (when `opened_at` is set) or end of input.
fn parse_block(lexer: &mut Lexer<'_>, opened_at: Option<usize>) -> Result<Vec<Directive>, ParseError> {
    let mut directives = Vec::new();
    let mut words: Vec<String> = Vec::new();

    loop {
        let Some((token, line)) = lexer.next_token()? else {
            if !words.is_empty() {
                return Err(lexer.error(format!("directive \"{}\" is not terminated by \";\"", words[0])));
            }
            if let Some(open_line) = opened_at {
                return Err(lexer.error(format!(
                    "unexpected end of file, block opened on line {} is not closed",
                    open_line
                )));
            }
            return Ok(directives);
        };

        match token {
            Token::Word(w) => words.push(w),
            Token::Semicolon => {
                let mut parts = std::mem::take(&mut words).into_iter();
                let name = parts
                    .next()
                    .ok_or_else(|| ParseError { line, message: "unexpected \";\"".into() })?;
                directives.push(Directive {
                    name,
                    params: parts.collect(),
                    block: None,
                });
            }
            Token::Open => {
                let mut parts = std::mem::take(&mut words).into_iter();
                let name = parts
                    .next()
                    .ok_or_else(|| ParseError { line, message: "unexpected \"{\"".into() })?;
                let children = parse_block(lexer, Some(line))?;
                directives.push(Directive {
                    name,
                    params: parts.collect(),
                    block: Some(children),
                });
            }
            Token::Close => {
                if opened_at.is_none() {
                    return Err(ParseError { line, message: "unexpected \"}\"".into() });
                }
                if !words.is_empty() {
                    return Err(ParseError {
                        line,
                        message: format!("directive \"{}\" is not terminated by \";\"", words[0]),
                    });
                }
                return Ok(directives);
            }
        }
    }
}
