//! Command-line front end for the firmbench harness.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use assess::{
    brief_description, build_font, description, load, save, FrameTemplate, RequestLog, Scaffold,
    TestCase,
};
use script::{Condition, RequestHandler};
use session::{run_session, SerialLink, SessionEnd};
use signal::EventKind;
use wire::RequestMatcher;

/// Drive and grade firmware over its serial link.
#[derive(Parser, Debug)]
#[command(author, version, about = "Record-and-replay firmware test harness", long_about = None)]
struct Cli {
    /// Trace every request and response.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct PortArgs {
    /// Serial device of the firmware under test.
    #[arg(long, default_value = "/dev/ttyACM0")]
    port: String,

    /// Baud rate (8-N-1).
    #[arg(long, default_value_t = 115_200)]
    baud: u32,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a test case against the device, then evaluate the session.
    Assess {
        /// Path to the test case blob.
        #[arg(long)]
        testcase: Option<PathBuf>,

        /// Save the session log here.
        #[arg(long)]
        log: Option<PathBuf>,

        /// Directory for description files.
        #[arg(long, default_value = "results")]
        results: PathBuf,

        /// Read timeout in seconds (fractions allowed).
        #[arg(long)]
        timeout: Option<f64>,

        #[command(flatten)]
        port: PortArgs,
    },

    /// Evaluate an existing log against a test case.
    AssessLog {
        #[arg(long)]
        testcase: Option<PathBuf>,

        #[arg(long)]
        log: Option<PathBuf>,

        #[arg(long, default_value = "results")]
        results: PathBuf,
    },

    /// Run a blank, endless session and save the recording.
    Record {
        /// Where to save the log (default ./temp.log).
        #[arg(long)]
        log: Option<PathBuf>,

        #[command(flatten)]
        port: PortArgs,
    },

    /// Build a test case (or a font) from a recorded log.
    Construct {
        #[arg(long)]
        log: Option<PathBuf>,

        /// Where to save the synthesized test case.
        #[arg(long)]
        testcase: Option<PathBuf>,

        /// Scan the log for font markers and save the font here instead.
        #[arg(long)]
        font: Option<PathBuf>,

        /// Number of frame templates in the default scaffold.
        #[arg(short = 'n', long, default_value_t = 1)]
        frames: usize,
    },
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // Help and version are not user errors.
            if err.use_stderr() {
                eprintln!("{err}");
                return ExitCode::from(1);
            }
            let _ = err.print();
            return ExitCode::SUCCESS;
        }
    };

    init_logging(cli.verbose);
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(1)
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Assess {
            testcase,
            log,
            results,
            timeout,
            port,
        } => {
            let testcase = required(testcase, "--testcase")?;
            assess(&testcase, log.as_deref(), &results, timeout, &port)
        }
        Command::AssessLog {
            testcase,
            log,
            results,
        } => {
            let testcase = required(testcase, "--testcase")?;
            let log = required(log, "--log")?;
            assess_log(&testcase, &log, &results)
        }
        Command::Record { log, port } => record(log, &port),
        Command::Construct {
            log,
            testcase,
            font,
            frames,
        } => {
            let log = required(log, "--log")?;
            construct(&log, testcase.as_deref(), font.as_deref(), frames)
        }
    }
}

fn required(path: Option<PathBuf>, flag: &str) -> Result<PathBuf> {
    match path {
        Some(path) => Ok(path),
        None => bail!("please provide a path with the {flag} option"),
    }
}

fn open_port(port: &PortArgs) -> Result<SerialLink> {
    SerialLink::open(&port.port, port.baud)
        .with_context(|| format!("cannot open serial port {}", port.port))
}

fn assess(
    testcase_path: &Path,
    log_path: Option<&Path>,
    results: &Path,
    timeout: Option<f64>,
    port: &PortArgs,
) -> Result<()> {
    let mut case: TestCase = load(testcase_path)
        .with_context(|| format!("cannot load test case {}", testcase_path.display()))?;

    let mut link = open_port(port)?;
    let timeout = timeout.map(Duration::from_secs_f64);
    let outcome = run_session(&mut link, &mut case.handler, timeout);
    describe_end(&outcome.end);

    if let Some(path) = log_path {
        save(&outcome.log, path)
            .with_context(|| format!("cannot save log {}", path.display()))?;
        log::info!("log saved to {}", path.display());
    }

    evaluate_and_report(&case, &outcome.log, results)
}

fn assess_log(testcase_path: &Path, log_path: &Path, results: &Path) -> Result<()> {
    let case: TestCase = load(testcase_path)
        .with_context(|| format!("cannot load test case {}", testcase_path.display()))?;
    let log: RequestLog =
        load(log_path).with_context(|| format!("cannot load log {}", log_path.display()))?;
    evaluate_and_report(&case, &log, results)
}

fn evaluate_and_report(case: &TestCase, log: &RequestLog, results: &Path) -> Result<()> {
    let report = case.evaluator.evaluate(log).context("evaluation failed")?;

    fs::create_dir_all(results)
        .with_context(|| format!("cannot create results directory {}", results.display()))?;
    fs::write(results.join("description.txt"), description(&report))?;
    fs::write(results.join("brief_description.txt"), brief_description(&report))?;

    print!("{}", brief_description(&report));
    Ok(())
}

fn record(log_path: Option<PathBuf>, port: &PortArgs) -> Result<()> {
    let mut link = open_port(port)?;
    let mut handler = RequestHandler::endless();
    let outcome = run_session(&mut link, &mut handler, None);
    describe_end(&outcome.end);

    let path = log_path.unwrap_or_else(|| PathBuf::from("./temp.log"));
    save(&outcome.log, &path).with_context(|| format!("cannot save log {}", path.display()))?;
    println!("Saved {} requests to {}", outcome.log.len(), path.display());
    Ok(())
}

fn construct(
    log_path: &Path,
    testcase_path: Option<&Path>,
    font_path: Option<&Path>,
    frames: usize,
) -> Result<()> {
    let log: RequestLog =
        load(log_path).with_context(|| format!("cannot load log {}", log_path.display()))?;

    if let Some(font_path) = font_path {
        let font = build_font(&log)
            .context("font scan failed")?
            .context("the log contains no font markers")?;
        save(&font, font_path)
            .with_context(|| format!("cannot save font {}", font_path.display()))?;
        println!(
            "Saved a {}x{} font with {} glyphs to {}",
            font.width,
            font.height,
            font.glyphs.len(),
            font_path.display()
        );
        return Ok(());
    }

    let testcase_path = required(testcase_path.map(Path::to_path_buf), "--testcase")?;
    if frames == 0 {
        bail!("the frame count must be positive");
    }
    let case = default_scaffold(frames)
        .build(&log)
        .context("scaffold construction failed")?;
    if case.handler.frames.is_empty() {
        bail!("no frame template window was found in the log");
    }
    save(&case, &testcase_path)
        .with_context(|| format!("cannot save test case {}", testcase_path.display()))?;
    println!(
        "Saved a {}-frame test case to {}",
        case.handler.frames.len(),
        testcase_path.display()
    );
    Ok(())
}

/// Default scaffold: frame 0 opens on the firmware's init event, each later
/// frame `i` opens on a `Frame <i>` print marker; every window runs to the
/// end of the log.
fn default_scaffold(frames: usize) -> Scaffold {
    let templates = (0..frames)
        .map(|i| {
            let start = if i == 0 {
                Condition::when(RequestMatcher::Event(EventKind::Init))
            } else {
                Condition::when(RequestMatcher::PrintEquals(format!("Frame {i}")))
            };
            FrameTemplate::new(start, None)
        })
        .collect();
    Scaffold::new(templates)
}

fn describe_end(end: &SessionEnd) {
    match end {
        SessionEnd::Complete => log::info!("session completed"),
        SessionEnd::HandlerError => log::warn!("session ended on a protocol error"),
        SessionEnd::Timeout => log::info!("session ended on read timeout"),
        SessionEnd::Transport(err) => log::warn!("transport failed: {err}"),
    }
}
