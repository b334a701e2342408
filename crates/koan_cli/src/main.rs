//! The `koan` front end: REPL, script runner, one-shot evaluation.

mod args;
mod repl;

use std::path::PathBuf;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use koan_runtime::{RunConfig, Runtime};

fn main() -> ExitCode {
    let cli = match args::parse_args() {
        Ok(a) => a,
        Err(msg) => {
            eprintln!("{}", msg);
            eprintln!("{}", args::usage());
            return ExitCode::from(2);
        }
    };

    let filter = match cli.loglevel.as_str() {
        "DEBUG" => "debug",
        "INFO" => "info",
        "WARN" => "warn",
        _ => "error",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    let mut config = RunConfig::default();
    config.home = cli
        .home
        .clone()
        .or_else(|| std::env::var_os("KOAN_HOME").map(PathBuf::from));
    config.bootstrap = cli.bootstrap.clone();
    if let Some(n) = cli.stack_depth {
        config.max_stack = n;
    }

    let mut rt = match Runtime::with_config(config) {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("bootstrap failed: {}", e);
            return ExitCode::from(1);
        }
    };
    rt.set_echo(true);

    if let Some(expr) = &cli.eval {
        return eval_and_print(&mut rt, "<eval>", expr, cli.ast, true);
    }

    if let Some(script) = &cli.script {
        let text = match std::fs::read_to_string(script) {
            Ok(t) => t,
            Err(e) => {
                eprintln!("{}: {}", script.display(), e);
                return ExitCode::from(1);
            }
        };
        let name = script.display().to_string();
        return eval_and_print(&mut rt, &name, &text, cli.ast, false);
    }

    repl::run(&mut rt, cli.ast)
}

fn eval_and_print(
    rt: &mut Runtime,
    name: &str,
    text: &str,
    dump_ast: bool,
    print_result: bool,
) -> ExitCode {
    let (program, source) = match rt.parse_program(name, text) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(1);
        }
    };
    if dump_ast {
        println!("{:#?}", program);
    }
    match rt.run_program(&program, source) {
        Ok(value) => {
            if print_result {
                println!("{}", rt.display(value));
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::from(1)
        }
    }
}
