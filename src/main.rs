use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::io::{self, Read};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use cannonbol::{MatchResult, Pattern, ScanOptions, parse, parse_grammar};

/// Scan each line of the input for a SNOBOL4-style pattern.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Pattern source, e.g. "SPAN('0123456789') . n"
    #[arg(value_name = "PATTERN")]
    pattern: String,

    /// File to scan; standard input when absent
    #[arg(value_name = "FILE")]
    file: Option<String>,

    /// Only match at the start of each line
    #[arg(short, long)]
    anchor: bool,

    /// Ignore ASCII case
    #[arg(short, long)]
    ignore_case: bool,

    /// Print each line with its match replaced by TEXT
    #[arg(short, long, value_name = "TEXT")]
    replace: Option<String>,

    /// Treat PATTERN as a grammar of `name = expr ;` rules; the first rule is matched
    #[arg(short, long)]
    grammar: bool,

    /// Print the captures of each match
    #[arg(short, long)]
    captures: bool,

    /// More logging (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_logging(args.verbose);

    let pattern = compile(&args)?;
    let input = read_input(args.file.as_deref())?;

    let mut options = ScanOptions::new();
    options.anchor = args.anchor;
    options.ignore_case = args.ignore_case;

    let mut any_matched = false;
    for (number, line) in input.lines().enumerate() {
        let Some(m) = pattern
            .scan_with(line, &options)
            .with_context(|| format!("line {}", number + 1))?
        else {
            continue;
        };
        any_matched = true;
        match &args.replace {
            Some(replacement) => println!("{}", m.replace_match_with(replacement)),
            None => println!("{}: {}", number + 1, m),
        }
        if args.captures {
            print_captures(&m);
        }
    }

    Ok(if any_matched {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// `RUST_LOG` wins; otherwise `-v` raises the level from `warn`.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn compile(args: &Args) -> Result<Pattern> {
    if args.grammar {
        let grammar = parse_grammar(&args.pattern).context("invalid grammar")?;
        tracing::debug!(start = grammar.start_name(), "compiled grammar");
        Ok(grammar.start())
    } else {
        let pattern = parse(&args.pattern).context("invalid pattern")?;
        tracing::debug!(%pattern, "compiled pattern");
        Ok(pattern)
    }
}

fn read_input(file: Option<&str>) -> Result<String> {
    match file {
        Some(path) => fs::read_to_string(path).with_context(|| format!("failed to read {path}")),
        None => {
            let mut input = String::new();
            io::stdin()
                .read_to_string(&mut input)
                .context("failed to read stdin")?;
            Ok(input)
        }
    }
}

fn print_captures(m: &MatchResult) {
    for (name, value) in m.captures() {
        println!("    {name} = {value}");
    }
}
