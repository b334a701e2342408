//! Expression parsing: the unary > binary > keyword precedence ladder,
//! cascades, assignment, literals and the method-definition sugar.

use std::rc::Rc;

use koan_ir::{
    ArrayNode, AssignNode, CascadeMsg, CascadeNode, Expr, MethodDefNode, Name, SendNode, Selector,
    SuperMode,
};
use koan_syntax::{DiagnosticKind, Span, TokenKind};

use crate::parser::{Parser, RESERVED};

/// A parsed primary plus an unconsumed `super` marker. The first message
/// sent to the primary picks the marker up; every later message in the
/// chain dispatches normally.
struct Primary {
    expr: Expr,
    super_mode: SuperMode,
}

impl Primary {
    fn plain(expr: Expr) -> Self {
        Self {
            expr,
            super_mode: SuperMode::None,
        }
    }

    fn take_super(&mut self) -> SuperMode {
        std::mem::replace(&mut self.super_mode, SuperMode::None)
    }
}

fn global_name(text: &str) -> bool {
    text.chars().next().map_or(false, |c| c.is_ascii_uppercase())
}

impl<'a> Parser<'a> {
    /// Parse one full expression: assignment, cascade, or message chain.
    pub(crate) fn parse_expr(&mut self) -> Option<Expr> {
        if self.at(TokenKind::Ident) && self.peek_kind_n(1) == TokenKind::Assign {
            let start = self.cur_span();
            let text = self.ident_text();
            let name_span = self.cur_span();
            self.bump();
            self.bump();
            let value = self.parse_expr()?;
            let span = start.merge(self.prev_span());
            return Some(Expr::Assign(Rc::new(AssignNode {
                target: Name {
                    global: global_name(&text),
                    text,
                    span: name_span,
                },
                value,
                span,
            })));
        }
        self.parse_cascade_expr()
    }

    fn parse_cascade_expr(&mut self) -> Option<Expr> {
        let start = self.cur_span();
        let expr = self.parse_keyword_expr()?;
        if !self.at(TokenKind::Semicolon) {
            return Some(expr);
        }
        // The cascade re-sends to the receiver of the preceding message.
        let send = match &expr {
            Expr::Send(send) if send.super_mode == SuperMode::None => send.clone(),
            _ => {
                self.error_here(DiagnosticKind::CascadeWithoutMessage);
                return Some(expr);
            }
        };
        let mut messages: Vec<CascadeMsg> = vec![CascadeMsg {
            selector: send.selector.clone(),
            args: send.args.clone(),
            span: send.span,
        }];
        while self.at(TokenKind::Semicolon) {
            self.bump();
            match self.parse_cascade_message() {
                Some(msg) => messages.push(msg),
                None => break,
            }
        }
        let span = start.merge(self.prev_span());
        Some(Expr::Cascade(Rc::new(CascadeNode {
            recv: send.recv.clone(),
            messages: messages.into(),
            span,
        })))
    }

    /// One message after `;`: unary, binary, or keyword.
    fn parse_cascade_message(&mut self) -> Option<CascadeMsg> {
        let start = self.cur_span();
        match self.peek_kind() {
            TokenKind::Keyword => {
                let (selector, args) = self.parse_keyword_parts()?;
                let span = start.merge(self.prev_span());
                Some(CascadeMsg {
                    selector,
                    args: args.into(),
                    span,
                })
            }
            TokenKind::BinOp | TokenKind::Pipe => {
                let text: Rc<str> = self.cur_text().into();
                self.bump();
                let arg = self.parse_unary_p()?;
                if arg.super_mode != SuperMode::None {
                    self.error_here(DiagnosticKind::ExpectedSelector);
                }
                let span = start.merge(self.prev_span());
                Some(CascadeMsg {
                    selector: Selector::binary(text),
                    args: Box::new([arg.expr]),
                    span,
                })
            }
            TokenKind::Ident if !RESERVED.contains(&self.cur_text()) => {
                let text = self.ident_text();
                self.bump();
                let span = start.merge(self.prev_span());
                Some(CascadeMsg {
                    selector: Selector::unary(text),
                    args: Box::new([]),
                    span,
                })
            }
            _ => {
                self.error_here(DiagnosticKind::ExpectedSelector);
                None
            }
        }
    }

    fn parse_keyword_expr(&mut self) -> Option<Expr> {
        let start = self.cur_span();
        let mut p = self.parse_binary_p()?;
        if !self.at(TokenKind::Keyword) {
            return Some(self.finish_primary(p));
        }
        let super_mode = p.take_super();
        let (selector, args) = self.parse_keyword_parts()?;
        let span = start.merge(self.prev_span());
        Some(Expr::Send(Rc::new(SendNode {
            recv: p.expr,
            super_mode,
            selector,
            args: args.into(),
            span,
        })))
    }

    /// `kw1: arg1 kw2: arg2 ...` — a newline inside the chain is absorbed
    /// when the next significant token is another keyword, so chains may
    /// span lines.
    fn parse_keyword_parts(&mut self) -> Option<(Selector, Vec<Expr>)> {
        let mut text = String::new();
        let mut args: Vec<Expr> = Vec::with_capacity(2);
        let mut arity = 0u8;
        loop {
            text.push_str(self.cur_text());
            self.bump();
            let arg = self.parse_binary_p()?;
            if arg.super_mode != SuperMode::None {
                self.error_here(DiagnosticKind::ExpectedSelector);
            }
            args.push(arg.expr);
            arity = arity.saturating_add(1);
            if !self.at_keyword_continuation() {
                break;
            }
        }
        Some((Selector::new(text, arity), args))
    }

    /// True at the next keyword part of a chain, absorbing a newline that
    /// separates two keyword parts.
    fn at_keyword_continuation(&mut self) -> bool {
        if self.at(TokenKind::Keyword) {
            return true;
        }
        if self.at(TokenKind::Newline) {
            let mut n = self.i;
            while self
                .peek_at(n)
                .map_or(false, |k| k == TokenKind::Newline)
            {
                n += 1;
            }
            if self.peek_at(n) == Some(TokenKind::Keyword) {
                self.i = n;
                return true;
            }
        }
        false
    }

    fn peek_at(&self, n: usize) -> Option<TokenKind> {
        if n >= self.i {
            Some(self.peek_kind_n(n - self.i))
        } else {
            None
        }
    }

    fn parse_binary_p(&mut self) -> Option<Primary> {
        let start = self.cur_span();
        let mut p = self.parse_unary_p()?;
        while matches!(self.peek_kind(), TokenKind::BinOp | TokenKind::Pipe) {
            let text: Rc<str> = self.cur_text().into();
            self.bump();
            let arg = self.parse_unary_p()?;
            if arg.super_mode != SuperMode::None {
                self.error_here(DiagnosticKind::ExpectedSelector);
            }
            let arg_expr = arg.expr;
            let super_mode = p.take_super();
            let span = start.merge(self.prev_span());
            p = Primary::plain(Expr::Send(Rc::new(SendNode {
                recv: p.expr,
                super_mode,
                selector: Selector::binary(text),
                args: Box::new([arg_expr]),
                span,
            })));
        }
        Some(p)
    }

    fn parse_unary_p(&mut self) -> Option<Primary> {
        let start = self.cur_span();
        let mut p = self.parse_primary()?;
        loop {
            match self.peek_kind() {
                TokenKind::Ident if !RESERVED.contains(&self.cur_text()) => {
                    let text = self.ident_text();
                    self.bump();
                    let super_mode = p.take_super();
                    let span = start.merge(self.prev_span());
                    p = Primary::plain(Expr::Send(Rc::new(SendNode {
                        recv: p.expr,
                        super_mode,
                        selector: Selector::unary(text),
                        args: Box::new([]),
                        span,
                    })));
                }
                TokenKind::MethodDefine => {
                    self.bump();
                    let (target, class_side) = split_class_side(p.expr);
                    let method = self.parse_method_src()?;
                    let span = start.merge(self.prev_span());
                    return Some(Primary::plain(Expr::MethodDef(Rc::new(MethodDefNode {
                        target,
                        class_side,
                        method,
                        span,
                    }))));
                }
                _ => break,
            }
        }
        Some(p)
    }

    fn finish_primary(&mut self, p: Primary) -> Expr {
        if p.super_mode != SuperMode::None {
            // `super` with no message following it
            self.error_here(DiagnosticKind::ExpectedSelector);
        }
        p.expr
    }

    fn parse_primary(&mut self) -> Option<Primary> {
        let start = self.cur_span();
        match self.peek_kind() {
            TokenKind::Int => {
                let text = self.cur_text();
                let value = match text.parse::<i64>() {
                    Ok(v) => v,
                    Err(_) => {
                        self.error_here(DiagnosticKind::MalformedNumber);
                        0
                    }
                };
                self.bump();
                Some(Primary::plain(Expr::Int(value)))
            }
            TokenKind::Float => {
                let text = self.cur_text();
                let value = match text.parse::<f64>() {
                    Ok(v) => v,
                    Err(_) => {
                        self.error_here(DiagnosticKind::MalformedNumber);
                        0.0
                    }
                };
                self.bump();
                Some(Primary::plain(Expr::Float(value)))
            }
            TokenKind::Str => {
                let text = unquote(self.cur_text());
                self.bump();
                Some(Primary::plain(Expr::Str(text.into())))
            }
            TokenKind::Symbol => {
                let text: Rc<str> = self.cur_text().trim_start_matches('#').into();
                self.bump();
                Some(Primary::plain(Expr::Symbol(text)))
            }
            TokenKind::Ident => self.parse_ident_primary(),
            TokenKind::LParen => {
                self.bump();
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Some(Primary::plain(expr))
            }
            TokenKind::LBracket => {
                self.bump();
                let block = self.parse_block(start)?;
                Some(Primary::plain(block))
            }
            TokenKind::HashParen => {
                self.bump();
                let node = self.parse_array_literal(start)?;
                Some(Primary::plain(Expr::ArrayLit(Rc::new(node))))
            }
            TokenKind::HashBracket => {
                self.bump();
                let stmts = self.parse_stmt_list(TokenKind::RBracket);
                self.expect(TokenKind::RBracket)?;
                let span = start.merge(self.prev_span());
                let items: Vec<Expr> = stmts.iter().map(|s| s.expr.clone()).collect();
                Some(Primary::plain(Expr::TableLit(Rc::new(ArrayNode {
                    items: items.into(),
                    span,
                }))))
            }
            _ => {
                self.error_here(DiagnosticKind::ExpectedExpression);
                None
            }
        }
    }

    fn parse_ident_primary(&mut self) -> Option<Primary> {
        let span = self.cur_span();
        let text = self.cur_text();
        match text {
            "nil" => {
                self.bump();
                Some(Primary::plain(Expr::Nil))
            }
            "true" => {
                self.bump();
                Some(Primary::plain(Expr::True))
            }
            "false" => {
                self.bump();
                Some(Primary::plain(Expr::False))
            }
            "self" => {
                self.bump();
                Some(Primary::plain(Expr::SelfRef))
            }
            "super" => {
                if self.method_depth == 0 {
                    self.error_here(DiagnosticKind::SuperOutsideMethod);
                }
                self.bump();
                let mode = self.parse_super_scope();
                Some(Primary {
                    expr: Expr::SelfRef,
                    super_mode: mode,
                })
            }
            _ => {
                let name = Name {
                    text: text.into(),
                    global: global_name(text),
                    span,
                };
                self.bump();
                Some(Primary::plain(Expr::Ident(Rc::new(name))))
            }
        }
    }

    /// `super<Parent>` — the `<` must touch `super`, otherwise it is an
    /// ordinary binary send to super.
    fn parse_super_scope(&mut self) -> SuperMode {
        if self.at(TokenKind::BinOp) && self.cur_text() == "<" && self.adjacent_to_prev() {
            self.bump();
            let name = match self.expect_ident() {
                Some(n) => n,
                None => return SuperMode::Super,
            };
            if self.at(TokenKind::BinOp) && self.cur_text() == ">" {
                self.bump();
            } else {
                self.error_here(DiagnosticKind::ExpectedToken("'>'".into()));
            }
            SuperMode::Scoped(name)
        } else {
            SuperMode::Super
        }
    }

    /// `#( ... )` — elements are literals; bare identifiers read as symbols.
    fn parse_array_literal(&mut self, start: Span) -> Option<ArrayNode> {
        let mut items: Vec<Expr> = Vec::new();
        loop {
            match self.peek_kind() {
                TokenKind::RParen => {
                    self.bump();
                    break;
                }
                TokenKind::Eof => {
                    self.error_here(DiagnosticKind::ExpectedToken("')'".into()));
                    break;
                }
                TokenKind::Int => {
                    let v = self.cur_text().parse::<i64>().unwrap_or(0);
                    self.bump();
                    items.push(Expr::Int(v));
                }
                TokenKind::Float => {
                    let v = self.cur_text().parse::<f64>().unwrap_or(0.0);
                    self.bump();
                    items.push(Expr::Float(v));
                }
                TokenKind::BinOp if self.cur_text() == "-" => {
                    // a sign that the lexer attributed to the previous element
                    self.bump();
                    match self.peek_kind() {
                        TokenKind::Int => {
                            let v = self.cur_text().parse::<i64>().unwrap_or(0);
                            self.bump();
                            items.push(Expr::Int(v.wrapping_neg()));
                        }
                        TokenKind::Float => {
                            let v = self.cur_text().parse::<f64>().unwrap_or(0.0);
                            self.bump();
                            items.push(Expr::Float(-v));
                        }
                        _ => {
                            self.error_here(DiagnosticKind::ExpectedExpression);
                            self.bump();
                        }
                    }
                }
                TokenKind::Str => {
                    let text = unquote(self.cur_text());
                    self.bump();
                    items.push(Expr::Str(text.into()));
                }
                TokenKind::Symbol => {
                    let text: Rc<str> = self.cur_text().trim_start_matches('#').into();
                    self.bump();
                    items.push(Expr::Symbol(text));
                }
                TokenKind::Ident => {
                    let text = self.cur_text();
                    match text {
                        "nil" => items.push(Expr::Nil),
                        "true" => items.push(Expr::True),
                        "false" => items.push(Expr::False),
                        _ => items.push(Expr::Symbol(text.into())),
                    }
                    self.bump();
                }
                TokenKind::Keyword => {
                    // #(at:put:) spells a keyword selector symbol
                    let mut text = String::new();
                    while self.at(TokenKind::Keyword) {
                        text.push_str(self.cur_text());
                        self.bump();
                    }
                    items.push(Expr::Symbol(text.into()));
                }
                TokenKind::HashParen => {
                    let inner_start = self.cur_span();
                    self.bump();
                    let node = self.parse_array_literal(inner_start)?;
                    items.push(Expr::ArrayLit(Rc::new(node)));
                }
                _ => {
                    self.error_here(DiagnosticKind::ExpectedExpression);
                    self.bump();
                }
            }
        }
        let span = start.merge(self.prev_span());
        Some(ArrayNode {
            items: items.into(),
            span,
        })
    }
}

/// A method-definition target written `X class` installs class-side.
fn split_class_side(target: Expr) -> (Expr, bool) {
    if let Expr::Send(send) = &target {
        if send.super_mode == SuperMode::None
            && send.args.is_empty()
            && &*send.selector.text == "class"
        {
            return (send.recv.clone(), true);
        }
    }
    (target, false)
}

fn unquote(text: &str) -> String {
    let inner = text
        .strip_prefix('"')
        .unwrap_or(text)
        .strip_suffix('"')
        .unwrap_or_else(|| text.strip_prefix('"').unwrap_or(text));
    inner.replace("\"\"", "\"")
}
