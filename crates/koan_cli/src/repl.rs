//! The read-eval-print loop.
//!
//! Input is accumulated until it forms one logical statement: all
//! delimiters closed and the token stream not ending in a position that
//! continues a statement (a trailing keyword, binary selector, `:=` and
//! so on). A blank line forces evaluation, matching the parser's
//! newline rules.

use std::io::{BufRead, Write};
use std::process::ExitCode;

use koan_lexer::Lexer;
use koan_syntax::TokenKind;

use koan_runtime::Runtime;

const BANNER: &str = "koan interactive — :help for help, :quit to leave";

const HELP: &str = "\
:help            show this banner
:quit            leave the interpreter
Statements end with '.' or a newline; keyword chains may span lines.";

pub(crate) fn run(rt: &mut Runtime, dump_ast: bool) -> ExitCode {
    println!("{}", BANNER);
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    let mut buf = String::new();
    let mut counter = 0usize;

    loop {
        let prompt = if buf.is_empty() { "koan> " } else { "....> " };
        print!("{}", prompt);
        let _ = std::io::stdout().flush();

        let line = match lines.next() {
            Some(Ok(line)) => line,
            _ => break,
        };

        if buf.is_empty() {
            match line.trim() {
                ":quit" => break,
                ":help" => {
                    println!("{}", HELP);
                    continue;
                }
                _ => {}
            }
        }

        buf.push_str(&line);
        buf.push('\n');
        if !statement_complete(&buf) {
            continue;
        }

        let text = std::mem::take(&mut buf);
        counter += 1;
        let name = format!("<repl-{}>", counter);
        match rt.parse_program(&name, &text) {
            Ok((program, source)) => {
                if dump_ast {
                    println!("{:#?}", program);
                }
                match rt.run_program(&program, source) {
                    Ok(value) => println!("{}", rt.display(value)),
                    Err(e) => eprintln!("{}", e),
                }
            }
            Err(e) => eprintln!("{}", e),
        }
    }
    ExitCode::SUCCESS
}

/// One logical statement: balanced delimiters, and the last significant
/// token cannot continue a statement. A blank line always completes.
fn statement_complete(src: &str) -> bool {
    if src.trim().is_empty() {
        return false;
    }
    // a blank line always submits, even half-finished input: the parse
    // error is more useful than a prompt that never comes back
    if src.ends_with("\n\n") {
        return true;
    }
    let lexed = Lexer::new(src).lex();
    if lexed
        .diagnostics
        .iter()
        .any(|d| d.message.starts_with("Unclosed"))
    {
        return false;
    }
    let last_sig = lexed
        .tokens
        .iter()
        .rev()
        .map(|t| t.kind)
        .find(|k| !matches!(k, TokenKind::Eof | TokenKind::Newline));
    !matches!(
        last_sig,
        Some(
            TokenKind::Keyword
                | TokenKind::BinOp
                | TokenKind::Assign
                | TokenKind::Caret
                | TokenKind::Pipe
                | TokenKind::Semicolon
                | TokenKind::Colon
                | TokenKind::MethodDefine
        ) | None
    )
}
