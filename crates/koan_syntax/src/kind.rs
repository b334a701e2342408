//! Structured diagnostic kinds and their message formatting.

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiagnosticKind {
    // Lexer
    UnterminatedString,
    UnexpectedChar(char),
    UnmatchedDelimiter(char),
    UnclosedDelimiter(char),
    MalformedNumber,

    // Parser
    ExpectedToken(String),
    ExpectedExpression,
    ExpectedSelector,
    ExpectedBlockBody,
    InvalidAssignmentTarget,
    SuperOutsideMethod,
    TempsAfterStatement,
    CascadeWithoutMessage,

    // Custom
    Raw(String),
}

pub struct DiagnosticsFormatter;

impl DiagnosticsFormatter {
    pub fn format(kind: &DiagnosticKind) -> String {
        match kind {
            DiagnosticKind::UnterminatedString => "Unterminated string literal".into(),
            DiagnosticKind::UnexpectedChar(c) => format!("Unexpected character: {}", c),
            DiagnosticKind::UnmatchedDelimiter(c) => format!("Unmatched '{}'", c),
            DiagnosticKind::UnclosedDelimiter(c) => format!("Unclosed '{}'", c),
            DiagnosticKind::MalformedNumber => "Malformed numeric literal".into(),

            DiagnosticKind::ExpectedToken(s) => format!("Expected {}", s),
            DiagnosticKind::ExpectedExpression => "Expected expression".into(),
            DiagnosticKind::ExpectedSelector => "Expected a message selector".into(),
            DiagnosticKind::ExpectedBlockBody => "Expected '[' to open a method body".into(),
            DiagnosticKind::InvalidAssignmentTarget => "Invalid assignment target".into(),
            DiagnosticKind::SuperOutsideMethod => {
                "'super' is only valid inside a method body".into()
            }
            DiagnosticKind::TempsAfterStatement => {
                "Temporary declarations must precede the first statement".into()
            }
            DiagnosticKind::CascadeWithoutMessage => {
                "';' must follow a message send".into()
            }

            DiagnosticKind::Raw(s) => s.clone(),
        }
    }
}
