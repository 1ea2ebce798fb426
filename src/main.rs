use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use patch_grin::{
    parser, shell, Environment, Executor, GrinDiagnostic, GrinError, GrinResult, Value,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "grin")]
#[command(about = "An interpreter for the Grin scripting language")]
#[command(version)]
struct Cli {
    /// Grin source file to execute (read from stdin up to a "." line if omitted)
    source: Option<PathBuf>,

    /// Execute a Grin program given on the command line
    #[arg(short = 'e', long)]
    eval: Option<String>,

    /// Print the final variables to stderr after a successful run
    #[arg(long)]
    dump_vars: bool,

    /// Log each executed statement (same as GRIN_LOG=debug)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(env) => {
            if cli.dump_vars {
                dump_vars(&env);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_env("GRIN_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> GrinResult<Environment> {
    let mut stdin = io::stdin().lock();

    if let Some(text) = &cli.eval {
        return shell::run_source(text, stdin, io::stdout());
    }
    if let Some(path) = &cli.source {
        let text = std::fs::read_to_string(path).map_err(|e| {
            GrinDiagnostic::new(GrinError::Io)
                .with_detail(format!("cannot read {}: {e}", path.display()))
        })?;
        return shell::run_source(&text, stdin, io::stdout());
    }

    // The program and its INNUM/INSTR input share stdin.
    let lines = shell::read_program(&mut stdin)?;
    let program = parser::parse_lines(&lines)?;
    Executor::new(&program, stdin, io::stdout()).run()
}

fn dump_vars(env: &Environment) {
    for (name, value) in env.sorted() {
        match value {
            Value::Text(s) => eprintln!("{name} = \"{s}\""),
            other => eprintln!("{name} = {other}"),
        }
    }
}
