//! The reader turns source text into a sequence of [Term]s. The main function is [parse].

use std::{iter::Peekable, str::Chars};

use crate::{error::ReadError, Term};

pub fn is_identifier_char(c: char) -> bool {
    !c.is_whitespace() && c != '(' && c != ')' && c != ';'
}

pub struct Parser<'a> {
    pub peekable: Peekable<Chars<'a>>,
    pub index: usize,
}

impl<'a> Parser<'a> {
    pub fn new(string: &'a str) -> Self {
        Self {
            peekable: string.chars().peekable(),
            index: 0,
        }
    }

    pub fn bump(&mut self) -> Option<char> {
        let c = self.peekable.next()?;
        self.index += c.len_utf8();
        Some(c)
    }

    pub fn peek(&mut self) -> Option<char> {
        self.peekable.peek().copied()
    }

    pub fn accumulate(&mut self, mut f: impl FnMut(char) -> bool) -> String {
        let mut string = String::new();

        while let Some(c) = self.peek() {
            if !f(c) {
                break;
            }
            string.push(c);
            self.bump();
        }

        string
    }

    /// Skips whitespace and comments.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.accumulate(|c| c.is_whitespace());
                }
                Some(';') => {
                    self.accumulate(|c| c != '\n');
                }
                _ => break,
            }
        }
    }

    /// Parses the next term, returns [None] at the end of the input.
    pub fn parse(&mut self) -> Result<Option<Term>, ReadError> {
        self.skip_trivia();

        let start = self.index;

        match self.peek() {
            None => Ok(None),
            Some('(') => {
                self.bump();
                let mut terms = Vec::new();

                loop {
                    self.skip_trivia();

                    match self.peek() {
                        Some(')') => {
                            self.bump();
                            break;
                        }
                        Some(_) => terms.extend(self.parse()?),
                        None => {
                            return Err(ReadError::UnexpectedEof {
                                span: (start, 1).into(),
                            })
                        }
                    }
                }

                Ok(Some(Term::List(terms)))
            }
            Some(')') => Err(ReadError::UnmatchedParen {
                span: (start, 1).into(),
            }),
            Some(_) => {
                let string = self.accumulate(is_identifier_char);
                self.atom(string, start).map(Some)
            }
        }
    }

    fn atom(&self, string: String, start: usize) -> Result<Term, ReadError> {
        let digits = string.strip_prefix(['-', '+']).unwrap_or(&string);

        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Ok(Term::Identifier(string));
        }

        match string.parse() {
            Ok(int) => Ok(Term::Int(int)),
            Err(_) => Err(ReadError::IntegerOverflow {
                span: (start, string.len()).into(),
                literal: string,
            }),
        }
    }
}

/// Reads every top-level term of the input.
pub fn parse(string: &str) -> Result<Vec<Term>, ReadError> {
    let mut parser = Parser::new(string);
    let mut terms = Vec::new();

    while let Some(term) = parser.parse()? {
        terms.push(term);
    }

    Ok(terms)
}
