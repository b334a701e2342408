//! Lexer implementation.
//!
//! Scans source text into tokens in a single linear pass. Newline tokens are
//! emitted only outside open delimiters (the parser uses them for statement
//! termination); comments are skipped entirely.
//!
//! Related: `LexResult`, `koan_syntax` (tokens/diagnostics).
use koan_syntax::{
    is_ident_continue, is_ident_start, Diagnostic, DiagnosticKind, Span, Token, TokenKind,
};

/// Characters a binary selector may be built from (runs of at most two).
const OPERATOR_CHARS: &[char] = &[
    '+', '-', '*', '/', '%', '<', '>', '=', '~', ',', '|', '&', '@',
];

/// Characters that turn a leading `#` into a line comment.
const COMMENT_TRIGGERS: &[char] = &['=', '-', '*', '/', '.', '|', '&', '@', '!'];

fn is_operator_char(c: char) -> bool {
    OPERATOR_CHARS.contains(&c)
}

/// Lexing result.
pub struct LexResult {
    pub tokens: Vec<Token>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Koan lexer.
pub struct Lexer<'a> {
    input: &'a str,
    bytes: &'a [u8],
    i: usize,
    diagnostics: Vec<Diagnostic>,
    tokens: Vec<Token>,
    delim_stack: Vec<char>,
    last_sig_kind: Option<TokenKind>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer.
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            i: 0,
            diagnostics: Vec::new(),
            tokens: Vec::new(),
            delim_stack: Vec::new(),
            last_sig_kind: None,
        }
    }

    /// Run the lexer and return tokens + diagnostics.
    pub fn lex(mut self) -> LexResult {
        let approx = self.bytes.len().saturating_div(4).max(16);
        self.tokens.reserve(approx);
        while self.i < self.bytes.len() {
            let start = self.i;
            let Some(c) = self.peek_char() else { break };

            match c {
                ' ' | '\t' => {
                    self.i += 1;
                }
                '\r' => {
                    self.i += 1;
                    if self.peek_char() == Some('\n') {
                        self.i += 1;
                    }
                    self.newline(start);
                }
                '\n' => {
                    self.i += 1;
                    self.newline(start);
                }
                '#' => self.lex_hash(start),
                '"' => self.lex_string(start),
                '(' => {
                    self.i += 1;
                    self.delim_stack.push('(');
                    self.push(TokenKind::LParen, start, self.i);
                }
                ')' => {
                    self.i += 1;
                    self.close_delim('(', ')', start);
                    self.push(TokenKind::RParen, start, self.i);
                }
                '[' => {
                    self.i += 1;
                    self.delim_stack.push('[');
                    self.push(TokenKind::LBracket, start, self.i);
                }
                ']' => {
                    self.i += 1;
                    self.close_delim('[', ']', start);
                    self.push(TokenKind::RBracket, start, self.i);
                }
                '.' => {
                    self.i += 1;
                    self.push(TokenKind::Period, start, self.i);
                }
                ';' => {
                    self.i += 1;
                    self.push(TokenKind::Semicolon, start, self.i);
                }
                '^' => {
                    self.i += 1;
                    self.push(TokenKind::Caret, start, self.i);
                }
                ':' => {
                    self.i += 1;
                    if self.peek_char() == Some('=') {
                        self.i += 1;
                        self.push(TokenKind::Assign, start, self.i);
                    } else {
                        self.push(TokenKind::Colon, start, self.i);
                    }
                }
                '-' if self.sign_allowed() && self.peek_digit_at(1) => {
                    self.lex_number(start)
                }
                c if c.is_ascii_digit() => self.lex_number(start),
                c if is_ident_start(c) => self.lex_ident(start),
                c if is_operator_char(c) => self.lex_operator(start),
                other => {
                    self.i += other.len_utf8();
                    self.diagnostics.push(Diagnostic::error_kind(
                        DiagnosticKind::UnexpectedChar(other),
                        Some(Span::new(start as u32, self.i as u32)),
                    ));
                }
            }
        }
        for open in self.delim_stack.clone() {
            self.diagnostics.push(Diagnostic::error_kind(
                DiagnosticKind::UnclosedDelimiter(open),
                Some(Span::new(self.i as u32, self.i as u32)),
            ));
        }
        let end = self.i;
        self.push(TokenKind::Eof, end, end);
        LexResult {
            tokens: self.tokens,
            diagnostics: self.diagnostics,
        }
    }

    fn newline(&mut self, start: usize) {
        // Newlines only matter as statement terminators at the top nesting
        // level, and consecutive ones collapse.
        if self.delim_stack.is_empty() && !matches!(self.last_sig_kind, None | Some(TokenKind::Newline)) {
            self.push(TokenKind::Newline, start, self.i);
        }
    }

    fn close_delim(&mut self, open: char, close: char, start: usize) {
        match self.delim_stack.last() {
            Some(&top) if top == open => {
                self.delim_stack.pop();
            }
            _ => {
                self.diagnostics.push(Diagnostic::error_kind(
                    DiagnosticKind::UnmatchedDelimiter(close),
                    Some(Span::new(start as u32, self.i as u32)),
                ));
            }
        }
    }

    /// `#` starts a comment, a symbol, or a collection literal opener.
    fn lex_hash(&mut self, start: usize) {
        self.i += 1;
        match self.peek_char() {
            Some('(') => {
                self.i += 1;
                self.delim_stack.push('(');
                self.push(TokenKind::HashParen, start, self.i);
            }
            Some('[') => {
                self.i += 1;
                self.delim_stack.push('[');
                self.push(TokenKind::HashBracket, start, self.i);
            }
            Some(c) if is_ident_start(c) => {
                // #name or #at:put:
                loop {
                    while let Some(c) = self.peek_char() {
                        if is_ident_continue(c) {
                            self.i += 1;
                        } else {
                            break;
                        }
                    }
                    if self.peek_char() == Some(':') && self.peek_char_at(1) != Some('=') {
                        self.i += 1;
                        match self.peek_char() {
                            Some(c) if is_ident_start(c) => continue,
                            _ => break,
                        }
                    }
                    break;
                }
                self.push(TokenKind::Symbol, start, self.i);
            }
            Some(c) if is_operator_char(c) => {
                // Symbols naming binary selectors: #+ #<= and so on.
                self.i += c.len_utf8();
                if let Some(c2) = self.peek_char() {
                    if is_operator_char(c2) {
                        self.i += c2.len_utf8();
                    }
                }
                self.push(TokenKind::Symbol, start, self.i);
            }
            Some(c) if c == ' ' || c == '\t' || c == '\n' || c == '\r' => {
                self.skip_comment();
            }
            Some(c) if COMMENT_TRIGGERS.contains(&c) => {
                self.skip_comment();
            }
            None => {
                // Trailing # at end of input reads as an empty comment.
            }
            Some(other) => {
                self.i += other.len_utf8();
                self.diagnostics.push(Diagnostic::error_kind(
                    DiagnosticKind::UnexpectedChar(other),
                    Some(Span::new(start as u32, self.i as u32)),
                ));
            }
        }
    }

    fn skip_comment(&mut self) {
        while let Some(c) = self.peek_char() {
            if c == '\n' {
                break;
            }
            self.i += c.len_utf8();
        }
    }

    fn lex_string(&mut self, start: usize) {
        self.i += 1;
        let mut terminated = false;
        while let Some(c) = self.peek_char() {
            if c == '"' {
                self.i += 1;
                if self.peek_char() == Some('"') {
                    // "" inside a string is a literal quote
                    self.i += 1;
                    continue;
                }
                terminated = true;
                break;
            }
            self.i += c.len_utf8();
        }
        if !terminated {
            self.diagnostics.push(Diagnostic::error_kind(
                DiagnosticKind::UnterminatedString,
                Some(Span::new(start as u32, self.i as u32)),
            ));
        }
        self.push(TokenKind::Str, start, self.i);
    }

    fn lex_number(&mut self, start: usize) {
        if self.peek_char() == Some('-') {
            self.i += 1;
        }
        while self.peek_digit_at(0) {
            self.i += 1;
        }
        // A '.' is a decimal point only when a digit follows; otherwise it
        // terminates the statement.
        let mut float = false;
        if self.peek_char() == Some('.') && self.peek_digit_at(1) {
            float = true;
            self.i += 1;
            while self.peek_digit_at(0) {
                self.i += 1;
            }
        }
        let kind = if float { TokenKind::Float } else { TokenKind::Int };
        self.push(kind, start, self.i);
    }

    fn lex_ident(&mut self, start: usize) {
        while let Some(c) = self.peek_char() {
            if is_ident_continue(c) {
                self.i += 1;
            } else {
                break;
            }
        }
        // A trailing ':' (not part of ':=') makes this a keyword part.
        if self.peek_char() == Some(':') && self.peek_char_at(1) != Some('=') {
            self.i += 1;
            self.push(TokenKind::Keyword, start, self.i);
        } else {
            self.push(TokenKind::Ident, start, self.i);
        }
    }

    fn lex_operator(&mut self, start: usize) {
        let first = self.peek_char().unwrap();
        self.i += first.len_utf8();
        if let Some(second) = self.peek_char() {
            if is_operator_char(second) {
                self.i += second.len_utf8();
            }
        }
        let text = &self.input[start..self.i];
        let kind = match text {
            ">>" => TokenKind::MethodDefine,
            "|" => TokenKind::Pipe,
            _ => TokenKind::BinOp,
        };
        self.push(kind, start, self.i);
    }

    /// Whether a `-` here would be a numeric sign rather than a binary
    /// selector: true unless the previous token can end an operand.
    fn sign_allowed(&self) -> bool {
        !matches!(
            self.last_sig_kind,
            Some(
                TokenKind::Ident
                    | TokenKind::Int
                    | TokenKind::Float
                    | TokenKind::Str
                    | TokenKind::Symbol
                    | TokenKind::RParen
                    | TokenKind::RBracket
            )
        )
    }

    fn push(&mut self, kind: TokenKind, start: usize, end: usize) {
        self.last_sig_kind = Some(kind);
        self.tokens
            .push(Token::new(kind, Span::new(start as u32, end as u32)));
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.i..].chars().next()
    }

    fn peek_char_at(&self, byte_offset: usize) -> Option<char> {
        let idx = self.i + byte_offset;
        if idx >= self.input.len() {
            return None;
        }
        self.input[idx..].chars().next()
    }

    fn peek_digit_at(&self, byte_offset: usize) -> bool {
        self.bytes
            .get(self.i + byte_offset)
            .map_or(false, |b| b.is_ascii_digit())
    }
}
