use koan_lexer::Lexer;
use koan_syntax::TokenKind;
use proptest::prelude::*;

proptest! {
    /// Lexing never panics, whatever the input.
    #[test]
    fn lex_never_panics(src in ".{0,256}") {
        let _ = Lexer::new(&src).lex();
    }

    /// Every token span stays inside the input and the stream ends with Eof.
    #[test]
    fn spans_in_bounds(src in "[a-zA-Z0-9:=#\\[\\]()^.;|+\\-*/<>~,&@\"' \n]{0,200}") {
        let result = Lexer::new(&src).lex();
        let last = result.tokens.last().expect("token stream is never empty");
        prop_assert_eq!(last.kind, TokenKind::Eof);
        for t in &result.tokens {
            prop_assert!(t.span.start.0 <= t.span.end.0);
            prop_assert!((t.span.end.0 as usize) <= src.len());
        }
    }

    /// Lexing the same input twice yields identical streams.
    #[test]
    fn lex_deterministic(src in ".{0,200}") {
        let a = Lexer::new(&src).lex();
        let b = Lexer::new(&src).lex();
        prop_assert_eq!(a.tokens, b.tokens);
    }
}
