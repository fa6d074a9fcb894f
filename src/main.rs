use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser as ClapParser;
use tapstream::{Event, Options, Parser};
use tracing_subscriber::EnvFilter;

/// Streams a TAP document and prints its event sequence as line-delimited JSON.
#[derive(Debug, ClapParser)]
#[command(name = "tap", version, about)]
struct Cli {
    /// Path to a TAP file; reads stdin when omitted.
    input: Option<PathBuf>,

    /// Treat non-TAP input as a reported failure, as if `pragma +strict` led the stream.
    #[arg(long)]
    strict: bool,

    /// Pretty-print each JSON event instead of emitting it compactly.
    #[arg(long)]
    pretty: bool,

    /// Increase log verbosity; repeat for more (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(ok) => {
            if ok {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(err) => {
            tracing::error!(error = %err, "failed to parse TAP input");
            eprintln!("tap: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<bool> {
    let input = read_input(cli.input.as_deref())?;

    let mut parser = Parser::new(Options {
        strict: cli.strict,
        ..Options::default()
    });

    let mut ok = true;
    for event in parser.write(input.as_bytes())? {
        ok &= print_event(&event, cli.pretty)?;
    }
    for event in parser.end(None)? {
        ok &= print_event(&event, cli.pretty)?;
    }

    Ok(ok)
}

fn read_input(path: Option<&std::path::Path>) -> io::Result<String> {
    match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "reading TAP input from file");
            fs::read_to_string(path)
        }
        None => {
            tracing::debug!("reading TAP input from stdin");
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

/// Prints one event as JSON, returning the run's overall pass/fail so far
/// (only the terminal `complete` event changes this from `true`).
fn print_event(event: &Event, pretty: bool) -> anyhow::Result<bool> {
    let json = if pretty {
        serde_json::to_string_pretty(event)?
    } else {
        serde_json::to_string(event)?
    };
    println!("{json}");

    Ok(match event {
        Event::Complete(summary) => summary.ok,
        _ => true,
    })
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "tap=info",
        1 => "tap=debug,tapstream=debug",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}
