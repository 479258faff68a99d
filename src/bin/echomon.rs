use std::{fs, path::PathBuf};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use echo::{
    demo::{Demo, Outcome},
    session::request_interrupt,
    Diagnostic, EditorConsole, Monitor, MonitorConfig, MonitorError, ScriptConsole,
};

#[derive(Parser)]
#[command(author, version, about = "Run a demonstration program under the Echo monitor")]
struct Args {
    /// Monitor prompt (defaults to the executable name)
    #[arg(long)]
    prompt: Option<String>,
    /// Breakpoint to install before the run: `LINE` or `LINE if GUARD`
    #[arg(long = "break", value_name = "LINE")]
    breakpoints: Vec<String>,
    /// Monitor command to run instead of reading the terminal (repeatable)
    #[arg(short, long = "command", value_name = "CMD")]
    commands: Vec<String>,
    /// File of monitor commands, one per line, run before any --command
    #[arg(long)]
    script: Option<PathBuf>,
    /// Number of loop iterations in the demonstration program
    #[arg(long, default_value_t = 4)]
    iterations: i64,
    /// Stop at the first unit as if interrupted
    #[arg(long)]
    interrupt: bool,
}

fn main() -> Result<(), MonitorError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = MonitorConfig::default();
    if let Some(prompt) = args.prompt {
        config = config.with_prompt(prompt);
    }

    let mut demo = Demo::new(args.iterations);
    let mut monitor = Monitor::new(config);
    for entry in &args.breakpoints {
        let (line, guard) = parse_breakpoint(entry)?;
        monitor.install_breakpoint(&mut demo.rt, line, guard)?;
    }
    if args.interrupt {
        request_interrupt(&demo.rt.tree);
    }

    let mut lines = Vec::new();
    if let Some(script) = &args.script {
        lines.extend(fs::read_to_string(script)?.lines().map(str::to_string));
    }
    lines.extend(args.commands);

    let outcome = if lines.is_empty() {
        let mut console = EditorConsole::new()?;
        demo.run(&mut monitor, &mut console)?
    } else {
        let mut console = ScriptConsole::new(lines).echoing();
        demo.run(&mut monitor, &mut console)?
    };

    if let Outcome::Aborted(status) = outcome {
        std::process::exit(status);
    }
    Ok(())
}

fn parse_breakpoint(entry: &str) -> Result<(usize, Option<String>), Diagnostic> {
    let entry = entry.trim();
    let (line, rest) = entry.split_once(char::is_whitespace).unwrap_or((entry, ""));
    let line = line
        .parse()
        .map_err(|_| Diagnostic::syntax(format!("expected a line number, found `{line}`")))?;
    let rest = rest.trim();
    if rest.is_empty() {
        return Ok((line, None));
    }
    match rest.strip_prefix("if") {
        Some(guard) if !guard.trim().is_empty() => Ok((line, Some(guard.trim().to_string()))),
        _ => Err(Diagnostic::syntax(format!(
            "expected `if GUARD` after the line number, found `{rest}`"
        ))),
    }
}
