#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use linesh::config::EngineConfig;
use linesh::error::{should_output_json_errors, EngineError};
use linesh::script::Script;
use std::env;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
Usage: linesh [OPTIONS] <input-file>

Run each line of <input-file> as a command.

Options:
  -x, --xtrace       Print each statement to stderr before running it
  -v, --verbose      Log engine activity to stderr (overridden by LINESH_LOG)
      --json-errors  Report a fatal error as a JSON object
  -h, --help         Show this help";

struct Options {
    input: PathBuf,
    xtrace: bool,
    verbose: bool,
    json_errors: bool,
}

enum Invocation {
    Run(Options),
    Help,
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();

    let options = match parse_args(&args) {
        Ok(Invocation::Run(options)) => options,
        Ok(Invocation::Help) => {
            println!("{}", USAGE);
            std::process::exit(0);
        }
        Err(e) => {
            let json = args.iter().any(|a| a == "--json-errors") || should_output_json_errors();
            eprintln!("{}", e.report().render(json));
            if !json {
                eprintln!("{}", USAGE);
            }
            std::process::exit(e.exit_code());
        }
    };

    init_logging(options.verbose);

    let config = match EngineConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            let err = EngineError::Usage(format!("{:#}", e));
            let json = options.json_errors || should_output_json_errors();
            eprintln!("{}", err.report().render(json));
            std::process::exit(err.exit_code());
        }
    };
    let config = EngineConfig {
        xtrace: config.xtrace || options.xtrace,
        json_errors: config.json_errors || options.json_errors,
        ..config
    };
    tracing::debug!(?config, "loaded configuration");

    let mut script = Script::new(&config);
    match script.run_file(&options.input) {
        Ok(()) => {
            tracing::debug!(
                lines = script.line_number(),
                last_status = script.last_status(),
                "run finished"
            );
            std::process::exit(0);
        }
        Err(e) => {
            tracing::debug!(error = ?e, "run aborted");
            eprintln!("{}", e.report().render(config.json_errors));
            std::process::exit(e.exit_code());
        }
    }
}

fn parse_args(args: &[String]) -> Result<Invocation, EngineError> {
    let mut input = None;
    let mut xtrace = false;
    let mut verbose = false;
    let mut json_errors = false;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => return Ok(Invocation::Help),
            "-x" | "--xtrace" => xtrace = true,
            "-v" | "--verbose" => verbose = true,
            "--json-errors" => json_errors = true,
            "--" => {
                if let Some(rest) = args.get(i + 1..) {
                    for arg in rest {
                        set_input(&mut input, arg)?;
                    }
                }
                break;
            }
            flag if flag.starts_with('-') && flag.len() > 1 => {
                return Err(EngineError::Usage(format!("unknown option '{}'", flag)));
            }
            arg => set_input(&mut input, arg)?,
        }
        i += 1;
    }

    let input = input.ok_or_else(|| EngineError::Usage("missing input file".to_string()))?;
    Ok(Invocation::Run(Options {
        input,
        xtrace,
        verbose,
        json_errors,
    }))
}

fn set_input(input: &mut Option<PathBuf>, arg: &str) -> Result<(), EngineError> {
    if input.is_some() {
        return Err(EngineError::Usage(format!("unexpected argument '{}'", arg)));
    }
    *input = Some(PathBuf::from(arg));
    Ok(())
}

/// Diagnostics go to stderr only; stdout belongs to the commands being run.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("LINESH_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
