//! Parser core: token cursor, statements, blocks and method definitions.

use std::rc::Rc;

use koan_ir::{BlockNode, Expr, MethodSrc, Program, ReturnNode, Selector, Stmt};
use koan_lexer::Lexer;
use koan_syntax::{Diagnostic, DiagnosticKind, Span, Token, TokenKind};

/// Parse result.
pub struct ParseResult {
    pub program: Program,
    pub diagnostics: Vec<Diagnostic>,
}

/// Lex and parse a source string in one step.
pub fn parse_source(input: &str) -> ParseResult {
    let lexed = Lexer::new(input).lex();
    let mut result = Parser::new(input, &lexed.tokens).parse();
    let mut diagnostics = lexed.diagnostics;
    diagnostics.append(&mut result.diagnostics);
    ParseResult {
        program: result.program,
        diagnostics,
    }
}

/// Identifiers that never act as unary selectors.
pub(crate) const RESERVED: &[&str] = &["nil", "true", "false", "self", "super"];

/// Koan parser.
pub struct Parser<'a> {
    input: &'a str,
    tokens: &'a [Token],
    pub(crate) i: usize,
    pub(crate) diagnostics: Vec<Diagnostic>,
    /// Nonzero while parsing a method body; gates `super`.
    pub(crate) method_depth: u32,
}

impl<'a> Parser<'a> {
    /// Create a new parser over a pre-lexed token stream.
    pub fn new(input: &'a str, tokens: &'a [Token]) -> Self {
        Self {
            input,
            tokens,
            i: 0,
            diagnostics: Vec::new(),
            method_depth: 0,
        }
    }

    /// Parse the full input and return a program plus diagnostics.
    pub fn parse(mut self) -> ParseResult {
        let mut stmts: Vec<Stmt> = Vec::with_capacity(8);
        loop {
            self.skip_separators();
            if self.at(TokenKind::Eof) {
                break;
            }
            match self.parse_stmt() {
                Some(stmt) => {
                    stmts.push(stmt);
                    if !self.at_stmt_end() {
                        self.error_here(DiagnosticKind::ExpectedToken(
                            "'.' or end of line".into(),
                        ));
                        self.recover_stmt();
                    }
                }
                None => self.recover_stmt(),
            }
        }
        ParseResult {
            program: Program {
                stmts: stmts.into(),
            },
            diagnostics: self.diagnostics,
        }
    }

    /// Parse a single statement (`^ expr` or an expression).
    pub(crate) fn parse_stmt(&mut self) -> Option<Stmt> {
        let start = self.cur_span();
        if self.at(TokenKind::Caret) {
            self.bump();
            let value = if self.at_stmt_end() || self.at(TokenKind::RBracket) {
                None
            } else {
                Some(self.parse_expr()?)
            };
            let span = start.merge(self.prev_span());
            return Some(Stmt {
                expr: Expr::Return(Rc::new(ReturnNode { value, span })),
                span,
            });
        }
        let expr = self.parse_expr()?;
        let span = start.merge(self.prev_span());
        Some(Stmt { expr, span })
    }

    /// Parse a bracketed statement sequence used by blocks, method bodies
    /// and table literals: `stmt (. stmt)* ]`. Newlines never reach here
    /// (the lexer drops them inside delimiters), so `.` is the only
    /// separator.
    pub(crate) fn parse_stmt_list(&mut self, closer: TokenKind) -> Rc<[Stmt]> {
        let mut stmts: Vec<Stmt> = Vec::new();
        loop {
            while self.at(TokenKind::Period) {
                self.bump();
            }
            if self.at(closer) || self.at(TokenKind::Eof) {
                break;
            }
            match self.parse_stmt() {
                Some(stmt) => {
                    stmts.push(stmt);
                    if !self.at(TokenKind::Period) && !self.at(closer) {
                        self.error_here(DiagnosticKind::ExpectedToken("'.'".into()));
                        self.recover_in_brackets(closer);
                    }
                }
                None => self.recover_in_brackets(closer),
            }
        }
        stmts.into()
    }

    /// `[` has been consumed; parse `:params | temps stmts ]`.
    pub(crate) fn parse_block(&mut self, start: Span) -> Option<Expr> {
        let mut params: Vec<Rc<str>> = Vec::new();
        while self.at(TokenKind::Colon) {
            self.bump();
            params.push(self.expect_ident()?);
        }
        if !params.is_empty() {
            if !self.at(TokenKind::Pipe) {
                self.error_here(DiagnosticKind::ExpectedToken("'|'".into()));
                return None;
            }
            self.bump();
        }
        let temps = self.parse_temps()?;
        let body = self.parse_stmt_list(TokenKind::RBracket);
        self.expect(TokenKind::RBracket)?;
        let span = start.merge(self.prev_span());
        Some(Expr::Block(Rc::new(BlockNode {
            params: params.into(),
            temps: temps.into(),
            body,
            span,
        })))
    }

    /// Optional `| a b c |` temporary declarations at the head of a body.
    pub(crate) fn parse_temps(&mut self) -> Option<Vec<Rc<str>>> {
        let mut temps: Vec<Rc<str>> = Vec::new();
        if self.at(TokenKind::Pipe) {
            self.bump();
            while self.at(TokenKind::Ident) {
                temps.push(self.ident_text());
                self.bump();
            }
            self.expect(TokenKind::Pipe)?;
        }
        Some(temps)
    }

    /// `>>` has been consumed; parse a method signature and bracketed body.
    pub(crate) fn parse_method_src(&mut self) -> Option<Rc<MethodSrc>> {
        let start = self.prev_span();
        let mut params: Vec<Rc<str>> = Vec::new();
        let selector = match self.peek_kind() {
            TokenKind::Ident => {
                let text = self.ident_text();
                self.bump();
                Selector::unary(text)
            }
            TokenKind::BinOp | TokenKind::Pipe => {
                let text: Rc<str> = self.cur_text().into();
                self.bump();
                params.push(self.expect_ident()?);
                Selector::binary(text)
            }
            TokenKind::Keyword => {
                let mut text = String::new();
                let mut arity = 0u8;
                while self.at(TokenKind::Keyword) {
                    text.push_str(self.cur_text());
                    self.bump();
                    params.push(self.expect_ident()?);
                    arity += 1;
                }
                Selector::new(text, arity)
            }
            _ => {
                self.error_here(DiagnosticKind::ExpectedSelector);
                return None;
            }
        };
        if !self.at(TokenKind::LBracket) {
            self.error_here(DiagnosticKind::ExpectedBlockBody);
            return None;
        }
        self.bump();
        self.method_depth += 1;
        let temps = self.parse_temps();
        let body = self.parse_stmt_list(TokenKind::RBracket);
        self.method_depth -= 1;
        let temps = temps?;
        self.expect(TokenKind::RBracket)?;
        let span = start.merge(self.prev_span());
        Some(Rc::new(MethodSrc {
            selector,
            params: params.into(),
            temps: temps.into(),
            body,
            span,
        }))
    }

    // --- cursor helpers -------------------------------------------------

    pub(crate) fn peek_kind(&self) -> TokenKind {
        self.tokens
            .get(self.i)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    pub(crate) fn peek_kind_n(&self, n: usize) -> TokenKind {
        self.tokens
            .get(self.i + n)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    pub(crate) fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    pub(crate) fn bump(&mut self) {
        if self.i < self.tokens.len() {
            self.i += 1;
        }
    }

    pub(crate) fn cur_span(&self) -> Span {
        self.tokens
            .get(self.i)
            .map(|t| t.span)
            .unwrap_or_default()
    }

    pub(crate) fn prev_span(&self) -> Span {
        if self.i == 0 {
            return Span::default();
        }
        self.tokens
            .get(self.i - 1)
            .map(|t| t.span)
            .unwrap_or_default()
    }

    pub(crate) fn cur_text(&self) -> &'a str {
        let span = self.cur_span();
        &self.input[span.start.0 as usize..span.end.0 as usize]
    }

    pub(crate) fn ident_text(&self) -> Rc<str> {
        self.cur_text().into()
    }

    /// Two tokens are adjacent when no whitespace separates them
    /// (`super<Parent>` vs `super < parent`).
    pub(crate) fn adjacent_to_prev(&self) -> bool {
        self.cur_span().start == self.prev_span().end
    }

    pub(crate) fn expect(&mut self, kind: TokenKind) -> Option<()> {
        if self.at(kind) {
            self.bump();
            Some(())
        } else {
            self.error_here(DiagnosticKind::ExpectedToken(format!("{:?}", kind)));
            None
        }
    }

    pub(crate) fn expect_ident(&mut self) -> Option<Rc<str>> {
        if self.at(TokenKind::Ident) {
            let text = self.ident_text();
            self.bump();
            Some(text)
        } else {
            self.error_here(DiagnosticKind::ExpectedToken("identifier".into()));
            None
        }
    }

    pub(crate) fn error_here(&mut self, kind: DiagnosticKind) {
        let span = self.cur_span();
        self.diagnostics
            .push(Diagnostic::error_kind(kind, Some(span)));
    }

    fn at_stmt_end(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Period | TokenKind::Newline | TokenKind::Eof
        )
    }

    fn skip_separators(&mut self) {
        while matches!(self.peek_kind(), TokenKind::Period | TokenKind::Newline) {
            self.bump();
        }
    }

    /// After an error: skip to the next statement boundary.
    fn recover_stmt(&mut self) {
        while !matches!(
            self.peek_kind(),
            TokenKind::Period | TokenKind::Newline | TokenKind::Eof
        ) {
            self.bump();
        }
    }

    /// After an error inside a bracketed body: skip to `.`, the closer, or Eof.
    fn recover_in_brackets(&mut self, closer: TokenKind) {
        while !matches!(self.peek_kind(), TokenKind::Period | TokenKind::Eof)
            && !self.at(closer)
        {
            self.bump();
        }
    }
}
