//! Command-line argument parsing.

use std::path::PathBuf;

pub(crate) struct CliArgs {
    /// Expression given with `-e`.
    pub eval: Option<String>,
    /// Script path (first positional argument).
    pub script: Option<PathBuf>,
    pub ast: bool,
    pub loglevel: String,
    pub home: Option<PathBuf>,
    pub bootstrap: Option<PathBuf>,
    pub stack_depth: Option<usize>,
}

pub(crate) fn usage() -> &'static str {
    "Usage: koan [script] [-e EXPR] [--ast] [--loglevel DEBUG|INFO|WARN|ERROR] [--home PATH] [--bootstrap FILE] [--stack-depth N]"
}

pub(crate) fn parse_args() -> Result<CliArgs, String> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();
    let mut eval = None;
    let mut script = None;
    let mut ast = false;
    let mut loglevel = "ERROR".to_string();
    let mut home = None;
    let mut bootstrap = None;
    let mut stack_depth = None;

    let mut i = 0;
    while i < argv.len() {
        let a = std::mem::take(&mut argv[i]);
        match a.as_str() {
            "-e" => {
                i += 1;
                let expr = argv
                    .get_mut(i)
                    .map(std::mem::take)
                    .ok_or("-e needs an expression")?;
                eval = Some(expr);
            }
            "--ast" => ast = true,
            "--loglevel" => {
                i += 1;
                let level = argv
                    .get_mut(i)
                    .map(std::mem::take)
                    .ok_or("--loglevel needs a level")?;
                match level.as_str() {
                    "DEBUG" | "INFO" | "WARN" | "ERROR" => loglevel = level,
                    other => return Err(format!("unknown log level: {}", other)),
                }
            }
            "--home" => {
                i += 1;
                let path = argv
                    .get_mut(i)
                    .map(std::mem::take)
                    .ok_or("--home needs a path")?;
                home = Some(PathBuf::from(path));
            }
            "--bootstrap" => {
                i += 1;
                let path = argv
                    .get_mut(i)
                    .map(std::mem::take)
                    .ok_or("--bootstrap needs a file")?;
                bootstrap = Some(PathBuf::from(path));
            }
            "--stack-depth" => {
                i += 1;
                let n = argv
                    .get_mut(i)
                    .map(std::mem::take)
                    .ok_or("--stack-depth needs a number")?;
                stack_depth = Some(
                    n.parse::<usize>()
                        .map_err(|_| format!("invalid stack depth: {}", n))?,
                );
            }
            _ if a.starts_with('-') => return Err(format!("unknown option: {}", a)),
            _ => {
                if script.is_some() {
                    return Err(format!("unexpected argument: {}", a));
                }
                script = Some(PathBuf::from(a));
            }
        }
        i += 1;
    }

    Ok(CliArgs {
        eval,
        script,
        ast,
        loglevel,
        home,
        bootstrap,
        stack_depth,
    })
}
