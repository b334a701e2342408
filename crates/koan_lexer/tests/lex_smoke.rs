use koan_lexer::Lexer;
use koan_syntax::TokenKind;

fn kinds(src: &str) -> Vec<TokenKind> {
    Lexer::new(src)
        .lex()
        .tokens
        .iter()
        .map(|t| t.kind)
        .collect()
}

#[test]
fn lex_arithmetic() {
    assert_eq!(
        kinds("3 + 4"),
        vec![TokenKind::Int, TokenKind::BinOp, TokenKind::Int, TokenKind::Eof]
    );
}

#[test]
fn lex_keyword_message() {
    assert_eq!(
        kinds("a at: 1 put: 2"),
        vec![
            TokenKind::Ident,
            TokenKind::Keyword,
            TokenKind::Int,
            TokenKind::Keyword,
            TokenKind::Int,
            TokenKind::Eof
        ]
    );
}

#[test]
fn lex_assign_vs_keyword() {
    assert_eq!(
        kinds("x := 5"),
        vec![TokenKind::Ident, TokenKind::Assign, TokenKind::Int, TokenKind::Eof]
    );
    // the colon belongs to the keyword token, not to an assignment
    assert_eq!(
        kinds("at:"),
        vec![TokenKind::Keyword, TokenKind::Eof]
    );
}

#[test]
fn lex_method_define() {
    assert_eq!(
        kinds("Point>>sum"),
        vec![TokenKind::Ident, TokenKind::MethodDefine, TokenKind::Ident, TokenKind::Eof]
    );
}

#[test]
fn lex_block_header() {
    assert_eq!(
        kinds("[:x | x + 1]"),
        vec![
            TokenKind::LBracket,
            TokenKind::Colon,
            TokenKind::Ident,
            TokenKind::Pipe,
            TokenKind::Ident,
            TokenKind::BinOp,
            TokenKind::Int,
            TokenKind::RBracket,
            TokenKind::Eof
        ]
    );
}

#[test]
fn lex_symbols() {
    assert_eq!(kinds("#foo"), vec![TokenKind::Symbol, TokenKind::Eof]);
    assert_eq!(kinds("#at:put:"), vec![TokenKind::Symbol, TokenKind::Eof]);
    assert_eq!(kinds("#+"), vec![TokenKind::Symbol, TokenKind::Eof]);
    let result = Lexer::new("#at:put:").lex();
    assert!(result.diagnostics.is_empty());
}

#[test]
fn lex_array_literal_opener() {
    assert_eq!(
        kinds("#(1 2)"),
        vec![
            TokenKind::HashParen,
            TokenKind::Int,
            TokenKind::Int,
            TokenKind::RParen,
            TokenKind::Eof
        ]
    );
}

#[test]
fn lex_string_with_doubled_quote() {
    let result = Lexer::new("\"he said \"\"hi\"\"\"").lex();
    assert!(result.diagnostics.is_empty());
    assert_eq!(result.tokens[0].kind, TokenKind::Str);
    assert_eq!(result.tokens[1].kind, TokenKind::Eof);
}

#[test]
fn lex_unterminated_string() {
    let result = Lexer::new("\"oops").lex();
    assert!(
        result
            .diagnostics
            .iter()
            .any(|d| d.message.contains("Unterminated string"))
    );
}

#[test]
fn lex_comment_skipped() {
    assert_eq!(kinds("# - just a note\n42"), vec![TokenKind::Int, TokenKind::Eof]);
    assert_eq!(kinds("1 #= trailing\n"), vec![TokenKind::Int, TokenKind::Eof]);
}

#[test]
fn lex_newline_suppressed_inside_delimiters() {
    assert_eq!(
        kinds("(1\n+ 2)"),
        vec![
            TokenKind::LParen,
            TokenKind::Int,
            TokenKind::BinOp,
            TokenKind::Int,
            TokenKind::RParen,
            TokenKind::Eof
        ]
    );
}

#[test]
fn lex_newline_separates_statements() {
    assert_eq!(
        kinds("a\nb"),
        vec![TokenKind::Ident, TokenKind::Newline, TokenKind::Ident, TokenKind::Eof]
    );
    // consecutive blank lines collapse to one newline token
    assert_eq!(
        kinds("a\n\n\nb"),
        vec![TokenKind::Ident, TokenKind::Newline, TokenKind::Ident, TokenKind::Eof]
    );
}

#[test]
fn lex_negative_number_positions() {
    // after a keyword, '-' signs the number
    assert_eq!(
        kinds("at: -4"),
        vec![TokenKind::Keyword, TokenKind::Int, TokenKind::Eof]
    );
    // after an operand, '-' is a binary selector
    assert_eq!(
        kinds("3 -4"),
        vec![TokenKind::Int, TokenKind::BinOp, TokenKind::Int, TokenKind::Eof]
    );
}

#[test]
fn lex_two_char_operators() {
    assert_eq!(kinds("a <= b"), vec![TokenKind::Ident, TokenKind::BinOp, TokenKind::Ident, TokenKind::Eof]);
    assert_eq!(kinds("7 // 2"), vec![TokenKind::Int, TokenKind::BinOp, TokenKind::Int, TokenKind::Eof]);
    assert_eq!(kinds("a ~~ b"), vec![TokenKind::Ident, TokenKind::BinOp, TokenKind::Ident, TokenKind::Eof]);
}

#[test]
fn lex_float_vs_statement_period() {
    assert_eq!(kinds("1.5"), vec![TokenKind::Float, TokenKind::Eof]);
    // a period not followed by a digit terminates the statement
    assert_eq!(
        kinds("1. 5"),
        vec![TokenKind::Int, TokenKind::Period, TokenKind::Int, TokenKind::Eof]
    );
}

#[test]
fn lex_cascade_and_return() {
    assert_eq!(
        kinds("^ x; y"),
        vec![
            TokenKind::Caret,
            TokenKind::Ident,
            TokenKind::Semicolon,
            TokenKind::Ident,
            TokenKind::Eof
        ]
    );
}

/// Reassembling token texts with single spaces must re-tokenise to the
/// same significant sequence.
#[test]
fn lex_print_round_trip() {
    let sources = [
        "3 + 4",
        "Point := Object derive: #(x y)",
        "p at: #x put: 3; sum",
        "[:e | (e > 10) ifTrue: [^ e]]",
        "x := -4. y := 1.5",
        "\"he said \"\"hi\"\"\" println",
    ];
    for src in sources {
        let first = Lexer::new(src).lex();
        assert!(first.diagnostics.is_empty());
        let mut rebuilt = String::new();
        for t in &first.tokens {
            if matches!(t.kind, TokenKind::Newline | TokenKind::Eof) {
                continue;
            }
            rebuilt.push_str(&src[t.span.start.0 as usize..t.span.end.0 as usize]);
            rebuilt.push(' ');
        }
        let second = Lexer::new(&rebuilt).lex();
        let sig = |toks: &[koan_syntax::Token]| -> Vec<TokenKind> {
            toks.iter()
                .map(|t| t.kind)
                .filter(|k| !matches!(k, TokenKind::Newline | TokenKind::Eof))
                .collect()
        };
        assert_eq!(sig(&first.tokens), sig(&second.tokens), "source: {}", src);
    }
}
