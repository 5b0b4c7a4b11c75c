use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    Identifier,
    Keyword,
    Separator,
    String,
    Eof,
}

impl TokenType {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "Identifier" => Some(TokenType::Identifier),
            "Keyword" => Some(TokenType::Keyword),
            "Separator" => Some(TokenType::Separator),
            "String" => Some(TokenType::String),
            "Eof" => Some(TokenType::Eof),
            _ => None,
        }
    }
}

impl Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenType::Identifier => write!(f, "Identifier"),
            TokenType::Keyword => write!(f, "Keyword"),
            TokenType::Separator => write!(f, "Separator"),
            TokenType::String => write!(f, "String"),
            TokenType::Eof => write!(f, "Eof"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub token_type: TokenType,
    pub lexeme: String,
}

impl Token {
    pub fn new(token_type: TokenType, lexeme: impl Into<String>) -> Self {
        Self {
            token_type,
            lexeme: lexeme.into(),
        }
    }

    pub fn identifier(name: &str) -> Self {
        Self::new(TokenType::Identifier, name)
    }

    pub fn keyword(word: &str) -> Self {
        Self::new(TokenType::Keyword, word)
    }

    pub fn separator(separator: &str) -> Self {
        Self::new(TokenType::Separator, separator)
    }

    pub fn string(value: &str) -> Self {
        Self::new(TokenType::String, value)
    }

    pub fn eof() -> Self {
        Self::new(TokenType::Eof, "")
    }

    pub fn token_type(&self) -> &TokenType {
        &self.token_type
    }

    pub fn is(&self, token_type: TokenType, lexeme: &str) -> bool {
        self.token_type == token_type && self.lexeme == lexeme
    }
}

/// Writes the token in listing form, one token per line: `<Kind> <lexeme>`.
impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.lexeme.is_empty() {
            write!(f, "{}", self.token_type)
        } else {
            write!(f, "{} {}", self.token_type, self.lexeme)
        }
    }
}

/// Cursor over a finished token sequence.
///
/// The sequence always ends with an [`TokenType::Eof`] token. Reading past it
/// keeps returning that token, so callers that loop must compare positions or
/// check for `Eof` themselves.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    tokens: Vec<Token>,
    position: usize,
}

impl Tokenizer {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(Token::token_type) != Some(&TokenType::Eof) {
            tokens.push(Token::eof());
        }
        Self {
            tokens,
            position: 0,
        }
    }

    /// Tokens of the reference program:
    ///
    /// ```text
    /// fun foo(){}
    /// fun sayHello(){
    ///     foo()
    ///     println("hello, world!")
    /// }
    /// sayHello()
    /// println("first","second","three")
    /// ```
    pub fn reference() -> Self {
        Self::new(reference_tokens())
    }

    pub fn next(&mut self) -> &Token {
        let index = self.position.min(self.last_index());
        if self.position <= self.last_index() {
            self.position += 1;
        }
        &self.tokens[index]
    }

    pub fn peek(&self) -> &Token {
        &self.tokens[self.position.min(self.last_index())]
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn rewind(&mut self, position: usize) {
        self.position = position;
    }

    pub fn remaining(&self) -> &[Token] {
        &self.tokens[self.position.min(self.last_index())..]
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    fn last_index(&self) -> usize {
        self.tokens.len() - 1
    }
}

pub fn reference_tokens() -> Vec<Token> {
    vec![
        Token::keyword("fun"),
        Token::identifier("foo"),
        Token::separator("("),
        Token::separator(")"),
        Token::separator("{"),
        Token::separator("}"),
        Token::keyword("fun"),
        Token::identifier("sayHello"),
        Token::separator("("),
        Token::separator(")"),
        Token::separator("{"),
        Token::identifier("foo"),
        Token::separator("("),
        Token::separator(")"),
        Token::identifier("println"),
        Token::separator("("),
        Token::string("hello, world!"),
        Token::separator(")"),
        Token::separator("}"),
        Token::identifier("sayHello"),
        Token::separator("("),
        Token::separator(")"),
        Token::identifier("println"),
        Token::separator("("),
        Token::string("first"),
        Token::separator(","),
        Token::string("second"),
        Token::separator(","),
        Token::string("three"),
        Token::separator(")"),
        Token::eof(),
    ]
}

#[derive(Debug, thiserror::Error)]
pub enum TokenizeError {
    #[error("Unknown token type \"{kind}\" on line {line}")]
    UnknownTokenType { line: usize, kind: String },
    #[error("Unexpected token after Eof on line {line}")]
    TokensAfterEof { line: usize },
    #[error("Token {index} has a line break in its lexeme {lexeme:?}")]
    LineBreakInLexeme { index: usize, lexeme: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reads a token listing: one `<Kind> <lexeme>` per line.
///
/// The lexeme is everything after the first space, verbatim. Blank lines and
/// lines starting with `#` are skipped. A lexeme cannot contain `\n` or `\r`;
/// [`listing`] refuses to write such tokens.
pub fn tokens(listing: &str) -> Result<Vec<Token>, TokenizeError> {
    let mut tokens = Vec::new();
    let mut eof_line = None;

    for (index, raw) in listing.lines().enumerate() {
        let line = index + 1;
        let raw = raw.trim_end_matches('\r');
        if raw.trim().is_empty() || raw.trim_start().starts_with('#') {
            continue;
        }

        if eof_line.is_some() {
            return Err(TokenizeError::TokensAfterEof { line });
        }

        let raw = raw.trim_start();
        let (kind, lexeme) = raw.split_once(' ').unwrap_or((raw, ""));
        let Some(token_type) = TokenType::from_name(kind) else {
            return Err(TokenizeError::UnknownTokenType {
                line,
                kind: kind.to_string(),
            });
        };

        if token_type == TokenType::Eof {
            eof_line = Some(line);
        }
        tokens.push(Token::new(token_type, lexeme));
    }

    if eof_line.is_none() {
        tokens.push(Token::eof());
    }

    Ok(tokens)
}

/// Writes tokens in the form [`tokens`] reads back.
pub fn listing(tokens: &[Token]) -> Result<String, TokenizeError> {
    let mut listing = String::new();
    for (index, token) in tokens.iter().enumerate() {
        if token.lexeme.contains(['\n', '\r']) {
            return Err(TokenizeError::LineBreakInLexeme {
                index,
                lexeme: token.lexeme.clone(),
            });
        }
        listing.push_str(&token.to_string());
        listing.push('\n');
    }
    Ok(listing)
}

pub fn read_tokens(path: impl AsRef<std::path::Path>) -> Result<Vec<Token>, TokenizeError> {
    let listing = std::fs::read_to_string(path)?;
    tokens(&listing)
}
