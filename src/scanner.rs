use crate::error::{InterpreterError, Result};
use crate::token::{Token, TokenType};
use std::iter::Peekable;
use std::str::CharIndices;

// Note: current becomes self.iter.peek()?.0
struct Scanner<'a> {
    source: &'a str,
    iter: Peekable<CharIndices<'a>>,
    start: usize,
    line: usize,
}

pub fn scan_tokens(source: &str) -> Result<Vec<Token>> {
    let mut scanner = Scanner {
        source,
        iter: source.char_indices().peekable(),
        start: 0,
        line: 1,
    };
    let mut tokens: Vec<Token> = Vec::new();
    while let Some((idx, _)) = scanner.iter.peek() {
        scanner.start = *idx;
        if let Some(token) = scanner.scan_token()? {
            tokens.push(token);
        }
    }
    Ok(tokens)
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || c == '(' || c == ')' || c == '"' || c == '#'
}

impl<'a> Scanner<'a> {
    fn scan_token(&mut self) -> Result<Option<Token>> {
        match self.advance()?.1 {
            '(' => Ok(Some(self.token(TokenType::LeftParen))),
            ')' => Ok(Some(self.token(TokenType::RightParen))),
            '#' => {
                while let Some((_, c)) = self.iter.peek() {
                    if *c == '\n' {
                        break;
                    }
                    self.iter.next();
                }
                Ok(None)
            }
            '\n' => {
                self.line += 1;
                Ok(None)
            }
            '"' => Ok(Some(self.string()?)),
            c if c.is_whitespace() => Ok(None),
            _ => Ok(Some(self.atom())),
        }
    }
    fn current(&mut self) -> usize {
        match self.iter.peek() {
            None => self.source.len(),
            Some((idx, _)) => *idx,
        }
    }
    fn token(&mut self, token_type: TokenType) -> Token {
        let current = self.current();
        Token {
            tokentype: token_type,
            lexeme: self.source[self.start..current].to_string(),
            line: self.line,
        }
    }
    fn advance(&mut self) -> Result<(usize, char)> {
        let line = self.line;
        self.iter
            .next()
            .ok_or_else(|| InterpreterError::syntax("unexpected end of input", line))
    }
    fn string(&mut self) -> Result<Token> {
        let first_line = self.line;
        loop {
            match self.iter.next() {
                None => {
                    return Err(InterpreterError::syntax(
                        "unterminated string literal",
                        first_line,
                    ))
                }
                Some((_, '"')) => break,
                Some((_, '\n')) => self.line += 1,
                Some(_) => {}
            }
        }
        if let Some((_, c)) = self.iter.peek() {
            if !is_delimiter(*c) || *c == '"' {
                return Err(InterpreterError::syntax(
                    format!("unexpected '{}' after string literal", c),
                    self.line,
                ));
            }
        }
        let current = self.current();
        let text = self.source[self.start + 1..current - 1].to_string();
        let mut token = self.token(TokenType::String(text));
        token.line = first_line;
        Ok(token)
    }
    fn atom(&mut self) -> Token {
        while let Some((_, c)) = self.iter.peek() {
            if is_delimiter(*c) {
                break;
            }
            self.iter.next();
        }
        self.token(TokenType::Atom)
    }
}
