#[derive(Debug, Clone, PartialEq)]
pub enum TokenType {
    LeftParen,
    RightParen,
    // A double-quoted literal, quotes stripped.
    String(String),
    // Any other run of non-delimiter characters: keywords, names, numbers.
    Atom,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub tokentype: TokenType,
    pub lexeme: String,
    pub line: usize,
}

impl Token {
    pub fn is_atom(&self, text: &str) -> bool {
        self.tokentype == TokenType::Atom && self.lexeme == text
    }
}
