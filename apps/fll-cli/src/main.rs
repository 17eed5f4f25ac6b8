use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use command_parser as cp;
use command_parser::{
    CommandEntry, CommandState, FallbackContext, FallbackParser, FallbackPolicy, MockFallback,
    ParseOutcome, ParseResult, ParserMetrics,
};

#[derive(Parser, Debug)]
#[command(
    name = "fll",
    version,
    about = "Plain-English robot scripts to Pybricks code",
    disable_help_subcommand = true
)]
struct Cli {
    /// Robot defaults YAML file
    #[arg(long, global = true)]
    defaults: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    json: bool,

    /// Print Prometheus counters after the command
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show how a command is tokenized
    Tokenize {
        /// Command text
        text: String,
    },
    /// Parse a single command
    Parse {
        /// Command text
        text: String,
        /// Canned fallback answers (YAML: text -> { code, confidence })
        #[arg(long)]
        fallback: Option<PathBuf>,
        /// Rule-based confidence below which the fallback is asked
        #[arg(long, default_value_t = 0.8)]
        threshold: f32,
    },
    /// Parse a command and supply the value it is missing
    Clarify {
        /// Command text, e.g. "move forward"
        text: String,
        /// Missing value; the unit follows from what is asked for
        #[arg(long)]
        value: String,
    },
    /// Parse a whole script and print the generated program
    Script {
        /// Script file
        file: PathBuf,
    },
    /// List routines defined in a script
    Routines {
        /// Script file
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();

    cp::init().map_err(|e| anyhow::anyhow!("Failed to initialize parser: {}", e))?;
    let defaults = match &cli.defaults {
        Some(path) => cp::load_defaults_file(path)?,
        None => cp::RobotDefaults::default(),
    };
    let metrics = ParserMetrics::new().map_err(|e| anyhow::anyhow!(e))?;

    match &cli.command {
        Commands::Tokenize { text } => tokenize(text, cli.json)?,
        Commands::Parse {
            text,
            fallback,
            threshold,
        } => {
            let fallback = fallback.as_deref().map(cp::load_fallback_responses).transpose()?;
            let policy = FallbackPolicy {
                threshold: *threshold,
                ..FallbackPolicy::default()
            };
            parse(text, &defaults, fallback.as_ref(), policy, &metrics, cli.json).await?
        }
        Commands::Clarify { text, value } => clarify(text, value, &defaults, &metrics, cli.json)?,
        Commands::Script { file } => script(file, &defaults, &metrics, cli.json)?,
        Commands::Routines { file } => routines(file, &defaults, cli.json)?,
    }

    if cli.metrics {
        print!("{}", metrics.encode_text());
    }
    Ok(())
}

fn setup_tracing() {
    // Best-effort; avoid panics if already set
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_script(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading script: {}", path.display()))
}

fn print_result(result: &ParseResult) {
    match &result.outcome {
        ParseOutcome::Code(code) => {
            println!("{code}");
            if cp::is_fallback_result(result) {
                println!("# confidence={:.2} source=fallback", result.confidence);
            } else {
                println!("# confidence={:.2}", result.confidence);
            }
        }
        ParseOutcome::Clarification(request) => {
            println!("? {} ({})", request.message, request.field);
        }
        ParseOutcome::Failed(error) => println!("! {error}"),
    }
}

fn tokenize(text: &str, json: bool) -> Result<()> {
    let tokens = cp::tokenize(text);
    if json {
        return print_json(&tokens);
    }
    for token in &tokens {
        match token.normalized() {
            Some(normalized) if normalized != token.raw() => {
                println!("{}\t{}\t-> {}", token.kind(), token.raw(), normalized)
            }
            _ => println!("{}\t{}", token.kind(), token.raw()),
        }
    }
    Ok(())
}

async fn parse(
    text: &str,
    defaults: &cp::RobotDefaults,
    fallback: Option<&MockFallback>,
    policy: FallbackPolicy,
    metrics: &ParserMetrics,
    json: bool,
) -> Result<()> {
    let fallback = fallback.map(|mock| mock as &dyn FallbackParser);
    let result =
        cp::parse_with_fallback(text, defaults, fallback, &FallbackContext::default(), policy).await;
    metrics.record(&result);
    if json {
        return print_json(&result);
    }
    print_result(&result);
    Ok(())
}

fn clarify(
    text: &str,
    value: &str,
    defaults: &cp::RobotDefaults,
    metrics: &ParserMetrics,
    json: bool,
) -> Result<()> {
    let mut entry = CommandEntry::parse(text, defaults);
    if entry.state != CommandState::NeedsClarification {
        bail!("'{text}' does not need a value (state: {:?})", entry.state);
    }
    let state = entry.supply(value, defaults)?;
    info!(text, value, ?state, "clarified");
    metrics.record(&entry.result);

    if json {
        return print_json(&entry);
    }
    println!("# {}", entry.text);
    print_result(&entry.result);
    Ok(())
}

fn script(path: &Path, defaults: &cp::RobotDefaults, metrics: &ParserMetrics, json: bool) -> Result<()> {
    let text = read_script(path)?;
    let mut library = cp::RoutineLibrary::new();
    let output = cp::parse_script(&text, defaults, &mut library);

    for line in &output.results {
        metrics.record(&line.result);
    }
    metrics.routines_defined.set(library.len() as i64);

    if json {
        return print_json(&output);
    }

    for routine in &output.routines {
        for error in &routine.errors {
            eprintln!("warning: {error}");
        }
    }
    for line in output.unresolved() {
        match &line.result.outcome {
            ParseOutcome::Clarification(request) => {
                eprintln!("needs {}: '{}': {}", request.field, line.line, request.message)
            }
            ParseOutcome::Failed(error) => eprintln!("skipped: '{}': {error}", line.line),
            ParseOutcome::Code(_) => {}
        }
    }
    println!("{}", output.program.full);
    Ok(())
}

fn routines(path: &Path, defaults: &cp::RobotDefaults, json: bool) -> Result<()> {
    let text = read_script(path)?;
    let extracted = cp::extract_routines(&text, defaults);

    if json {
        return print_json(&extracted);
    }
    if extracted.routines.is_empty() {
        println!("no routines defined in {}", path.display());
    }
    for routine in &extracted.routines {
        println!(
            "{}({})\t{} line(s)\t{} error(s)",
            routine.routine.name,
            routine.routine.parameters.join(", "),
            routine.routine.body.lines().count(),
            routine.errors.len()
        );
        println!("{}", routine.code);
        for error in &routine.errors {
            println!("  ! {error}");
        }
    }
    println!("main code: {} line(s)", extracted.main_code.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_cli_parses_global_flags() {
        let cli = Cli::try_parse_from(["fll", "--json", "parse", "turn left 45"]).unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Parse { ref text, .. } if text == "turn left 45"));

        let cli = Cli::try_parse_from(["fll", "clarify", "move forward", "--value", "150", "--metrics"])
            .unwrap();
        assert!(cli.metrics);
        assert!(matches!(cli.command, Commands::Clarify { ref value, .. } if value == "150"));
    }

    #[test]
    fn test_cli_parses_fallback_options() {
        let cli = Cli::try_parse_from([
            "fll", "parse", "stop", "--fallback", "answers.yaml", "--threshold", "0.9",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Parse { ref fallback, threshold, .. }
                if fallback.as_deref() == Some(Path::new("answers.yaml")) && threshold == 0.9
        ));
    }

    #[tokio::test]
    async fn test_parse_counts_fallback_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "stop:\n  code: \"robot.brake()\"\n  confidence: 0.97").unwrap();
        let mock = cp::load_fallback_responses(file.path()).unwrap();
        let metrics = ParserMetrics::new().unwrap();
        let policy = FallbackPolicy {
            threshold: 0.9,
            ..FallbackPolicy::default()
        };

        parse("stop", &cp::RobotDefaults::default(), Some(&mock), policy, &metrics, true)
            .await
            .unwrap();
        assert_eq!(metrics.fallback_overrides.get(), 1);

        // confident enough at the default threshold, so no override
        parse("stop", &cp::RobotDefaults::default(), Some(&mock), FallbackPolicy::default(), &metrics, true)
            .await
            .unwrap();
        assert_eq!(metrics.fallback_overrides.get(), 1);
        assert_eq!(metrics.parsed.get(), 2);
    }

    #[test]
    fn test_clarify_rejects_complete_command() {
        let metrics = ParserMetrics::new().unwrap();
        let err = clarify("stop", "10", &cp::RobotDefaults::default(), &metrics, false).unwrap_err();
        assert!(err.to_string().contains("does not need a value"));
    }

    #[test]
    fn test_script_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "define hop:\n  move forward 50\nhop\nwait 1").unwrap();
        let metrics = ParserMetrics::new().unwrap();
        script(file.path(), &cp::RobotDefaults::default(), &metrics, true).unwrap();
        assert_eq!(metrics.parsed.get(), 2);
        assert_eq!(metrics.routines_defined.get(), 1);
    }

    #[test]
    fn test_missing_script_reports_path() {
        let err = read_script(Path::new("/nonexistent/mission.txt")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/mission.txt"));
    }
}
