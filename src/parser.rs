use std::cell::RefCell;

use crate::{
    ast::{FunctionBody, FunctionCall, FunctionDeclare, Program, Statement},
    tokenizer::{Token, TokenType, Tokenizer},
};

#[derive(Debug)]
pub struct ParseErrorWithContext {
    pub error: ParseError,
    mismatch: Mismatch,
}

impl ParseErrorWithContext {
    /// Rule chain active at the furthest token any rule failed on.
    pub fn rules(&self) -> String {
        self.mismatch.rules.join(" > ")
    }

    pub fn expected(&self) -> &str {
        &self.mismatch.expected
    }

    pub fn token(&self) -> &Token {
        &self.mismatch.token
    }
}

impl std::error::Error for ParseErrorWithContext {}

impl std::fmt::Display for ParseErrorWithContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "While parsing {}", self.rules())?;
        write!(
            f,
            "{}: expected {} but found \"{}\"",
            self.error, self.mismatch.expected, self.mismatch.token
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("No function declaration or function call found")]
    EmptyProgram,
}

#[derive(Debug, Clone)]
struct Mismatch {
    position: usize,
    rules: Vec<&'static str>,
    expected: String,
    token: Token,
}

#[derive(Debug)]
struct ParseContext {
    stack: RefCell<Vec<&'static str>>,
    furthest: RefCell<Option<Mismatch>>,
}

impl ParseContext {
    fn new() -> Self {
        Self {
            stack: RefCell::new(Vec::new()),
            furthest: RefCell::new(None),
        }
    }

    fn push(&self, name: &'static str) -> ParseContextGuard<'_> {
        self.stack.borrow_mut().push(name);
        tracing::trace!(rules = %self.rules(), "start {name}");
        ParseContextGuard::new(self)
    }

    fn pop(&self) {
        self.stack.borrow_mut().pop();
    }

    fn rules(&self) -> String {
        self.stack.borrow().join(" > ")
    }

    /// Records a failed match. A later failure at the same or a further
    /// position replaces the earlier one.
    fn mismatch(&self, position: usize, expected: &str, token: &Token) {
        let mut furthest = self.furthest.borrow_mut();
        if furthest.as_ref().map_or(true, |m| position >= m.position) {
            *furthest = Some(Mismatch {
                position,
                rules: self.stack.borrow().clone(),
                expected: expected.to_string(),
                token: token.clone(),
            });
        }
    }

    fn furthest(&self) -> Option<Mismatch> {
        self.furthest.borrow().clone()
    }
}

struct ParseContextGuard<'a> {
    context: &'a ParseContext,
}

impl<'a> ParseContextGuard<'a> {
    fn new(context: &'a ParseContext) -> Self {
        Self { context }
    }
}

impl<'a> Drop for ParseContextGuard<'a> {
    fn drop(&mut self) {
        self.context.pop();
    }
}

/// Parses `(FunctionDeclare | FunctionCall)+`.
///
/// Stops at the first position where neither rule matches. Tokens left after
/// that point are ignored; only an empty statement list is an error.
pub fn program(tokenizer: &mut Tokenizer) -> Result<Program, ParseErrorWithContext> {
    let context = ParseContext::new();
    let _guard = context.push("program");
    let mut statements = Vec::new();

    loop {
        if let Some(declare) = function_declare(&context, tokenizer) {
            statements.push(Statement::FunctionDeclare(declare));
            continue;
        }
        if let Some(call) = function_call(&context, tokenizer) {
            statements.push(Statement::FunctionCall(call));
            continue;
        }
        break;
    }

    if statements.is_empty() {
        let mismatch = context.furthest().unwrap_or_else(|| Mismatch {
            position: tokenizer.position(),
            rules: vec!["program"],
            expected: "function declaration or call".to_string(),
            token: tokenizer.peek().clone(),
        });
        return Err(ParseErrorWithContext {
            error: ParseError::EmptyProgram,
            mismatch,
        });
    }

    let unparsed = tokenizer
        .remaining()
        .iter()
        .filter(|token| token.token_type != TokenType::Eof)
        .count();
    if unparsed > 0 {
        tracing::debug!(
            unparsed,
            next = %tokenizer.peek(),
            "stopped before end of input"
        );
    }

    Ok(Program { statements })
}

pub fn parse(tokens: Vec<Token>) -> Result<Program, ParseErrorWithContext> {
    program(&mut Tokenizer::new(tokens))
}

/// Runs `rule`, restoring the cursor to its entry position when it does not match.
fn backtrack<T>(
    tokenizer: &mut Tokenizer,
    rule: impl FnOnce(&mut Tokenizer) -> Option<T>,
) -> Option<T> {
    let position = tokenizer.position();
    let result = rule(tokenizer);
    if result.is_none() {
        tokenizer.rewind(position);
    }
    result
}

fn function_declare(context: &ParseContext, tokenizer: &mut Tokenizer) -> Option<FunctionDeclare> {
    let _guard = context.push("function_declare");
    backtrack(tokenizer, |tokenizer| {
        consume(context, tokenizer, TokenType::Keyword, "fun")?;
        let name = match_identifier(context, tokenizer)?;
        consume(context, tokenizer, TokenType::Separator, "(")?;
        consume(context, tokenizer, TokenType::Separator, ")")?;
        let body = function_body(context, tokenizer)?;
        Some(FunctionDeclare { name, body })
    })
}

fn function_body(context: &ParseContext, tokenizer: &mut Tokenizer) -> Option<FunctionBody> {
    let _guard = context.push("function_body");
    backtrack(tokenizer, |tokenizer| {
        consume(context, tokenizer, TokenType::Separator, "{")?;
        let mut calls = Vec::new();
        while let Some(call) = function_call(context, tokenizer) {
            calls.push(call);
        }
        consume(context, tokenizer, TokenType::Separator, "}")?;
        Some(FunctionBody { calls })
    })
}

/// Parses a call. Inside the parentheses only string literals are kept; any
/// other token, commas included, is skipped.
fn function_call(context: &ParseContext, tokenizer: &mut Tokenizer) -> Option<FunctionCall> {
    let _guard = context.push("function_call");
    backtrack(tokenizer, |tokenizer| {
        let name = match_identifier(context, tokenizer)?;
        consume(context, tokenizer, TokenType::Separator, "(")?;
        let mut arguments = Vec::new();
        loop {
            let position = tokenizer.position();
            let token = tokenizer.next();
            match token.token_type {
                TokenType::Eof => {
                    context.mismatch(position, "\")\"", token);
                    return None;
                }
                TokenType::Separator if token.lexeme == ")" => break,
                TokenType::String => arguments.push(token.lexeme.clone()),
                _ => {}
            }
        }
        Some(FunctionCall::new(name, arguments))
    })
}

fn consume(
    context: &ParseContext,
    tokenizer: &mut Tokenizer,
    token_type: TokenType,
    lexeme: &str,
) -> Option<()> {
    let position = tokenizer.position();
    let token = tokenizer.next();
    if token.is(token_type, lexeme) {
        Some(())
    } else {
        context.mismatch(position, &format!("\"{lexeme}\""), token);
        None
    }
}

fn match_identifier(context: &ParseContext, tokenizer: &mut Tokenizer) -> Option<String> {
    let position = tokenizer.position();
    let token = tokenizer.next();
    match token.token_type {
        TokenType::Identifier => Some(token.lexeme.clone()),
        _ => {
            context.mismatch(position, "identifier", token);
            None
        }
    }
}
