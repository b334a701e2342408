use koan_parser::parse_source;
use proptest::prelude::*;

proptest! {
    /// Parsing never panics, whatever the input.
    #[test]
    fn parse_never_panics(src in ".{0,256}") {
        let _ = parse_source(&src);
    }

    /// Parsing the same source twice yields structurally identical trees.
    #[test]
    fn parse_deterministic(src in "[a-zA-Z0-9:=#\\[\\]()^.;|+\\-*/<> \n]{0,200}") {
        let a = parse_source(&src);
        let b = parse_source(&src);
        prop_assert_eq!(a.program, b.program);
    }
}
