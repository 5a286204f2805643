use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use ferromath_semantics::{SemanticError, analyze};
use ferromath_syntax::{Parser as MathParser, ParserConfig, Token, TokenKind, tokenize};
use log::{LevelFilter, debug};
use serde_json::{Value, json};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "ferromath")]
#[command(about = "Tokenize, parse and check LaTeX math", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Emit JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Maximum nesting depth before the parser gives up
    #[arg(long, global = true, value_name = "N", default_value_t = ParserConfig::default().max_depth)]
    max_depth: usize,

    /// Log pipeline stages to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the token stream
    Tokens(Input),
    /// Print the syntax tree
    Parse(Input),
    /// Report semantic diagnostics
    Check(Input),
}

/// Where the math comes from. Reads stdin when neither is given.
#[derive(Args)]
struct Input {
    /// The expression to process
    expression: Option<String>,

    /// Read the expression from a file
    #[arg(long, value_name = "FILE", conflicts_with = "expression")]
    file: Option<PathBuf>,
}

impl Input {
    fn read(&self) -> anyhow::Result<String> {
        if let Some(expression) = &self.expression {
            return Ok(expression.clone());
        }
        if let Some(path) = &self.file {
            return fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()));
        }
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read stdin")?;
        Ok(buffer)
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if cli.verbose {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();

    let config = ParserConfig {
        max_depth: cli.max_depth,
    };

    let input = match &cli.command {
        Commands::Tokens(input) | Commands::Parse(input) | Commands::Check(input) => input.read()?,
    };
    debug!("read {} bytes of input", input.len());

    let tokens = tokenize(&input);
    if let Commands::Tokens(_) = cli.command {
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&tokens)?);
        } else {
            print!("{}", render_tokens(&tokens)?);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let parsed = match MathParser::with_config(&tokens, config).parse() {
        Ok(parsed) => parsed,
        Err(err) => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&json!({ "error": err }))?);
            } else {
                eprintln!("error: {err}");
            }
            return Ok(ExitCode::FAILURE);
        }
    };

    if let Commands::Parse(_) = cli.command {
        let tree = parsed.debug_tree();
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&json!({ "tree": tree }))?);
        } else {
            print!("{tree}");
        }
        return Ok(ExitCode::SUCCESS);
    }

    let errors = analyze(&parsed);
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "diagnostics": errors }))?
        );
    } else {
        print!("{}", render_diagnostics(&errors));
    }
    Ok(if errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn kind_name(kind: TokenKind) -> anyhow::Result<String> {
    Ok(match serde_json::to_value(kind)? {
        Value::String(name) => name,
        other => other.to_string(),
    })
}

fn render_tokens(tokens: &[Token<'_>]) -> anyhow::Result<String> {
    let mut out = String::new();
    for token in tokens {
        let position = format!("{}:{}", token.line, token.column);
        out.push_str(&format!(
            "{:<8} {:<20} {:?}\n",
            position,
            kind_name(token.kind)?,
            token.text
        ));
    }
    Ok(out)
}

fn render_diagnostics(errors: &[SemanticError]) -> String {
    errors.iter().map(|e| format!("{e}\n")).collect()
}
