use clap::{Arg, ArgAction, Command};
use crust::{repl, runner, InterpreterConfig};
use std::fs;
use std::path::Path;
use std::process;

fn main() {
    let matches = Command::new("crust")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Interpreter for the Crust scripting language")
        .arg(
            Arg::new("file")
                .help("The script file to execute")
                .value_name("FILE")
                .index(1),
        )
        .arg(
            Arg::new("interactive")
                .short('i')
                .long("interactive")
                .help("Start in interactive REPL mode")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("print-ast")
                .long("print-ast")
                .help("Print the parsed program in canonical form instead of running it")
                .requires("file")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log interpreter activity to stderr (overridden by RUST_LOG)")
                .action(ArgAction::Count),
        )
        .arg(
            Arg::new("max-depth")
                .long("max-depth")
                .value_name("N")
                .help("Maximum nesting of function calls")
                .value_parser(clap::value_parser!(usize)),
        )
        .get_matches();

    init_tracing(matches.get_count("verbose"));

    let mut config = InterpreterConfig::default();
    if let Some(depth) = matches.get_one::<usize>("max-depth") {
        config.max_call_depth = *depth;
    }

    match matches.get_one::<String>("file") {
        Some(file) if !matches.get_flag("interactive") => {
            run_file(file, matches.get_flag("print-ast"), config)
        }
        _ => repl::start(config),
    }
}

/// `RUST_LOG` wins when set; otherwise each `-v` raises the level by one step.
fn init_tracing(verbosity: u8) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match verbosity {
            0 => return,
            1 => "crust=info",
            2 => "crust=debug",
            _ => "crust=trace",
        };
        EnvFilter::new(level)
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_level(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn run_file(path: &str, print_ast: bool, config: InterpreterConfig) {
    let path = Path::new(path);

    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", path.display(), e);
            process::exit(1);
        }
    };

    let filename = path.display().to_string();
    tracing::info!(file = %filename, bytes = source.len(), "loaded script");

    let outcome = if print_ast {
        runner::print_ast(&source, Some(&filename)).map(|printed| print!("{}", printed))
    } else {
        runner::run(&source, Some(&filename), config).map(|_| ())
    };

    if outcome.is_err() {
        process::exit(1);
    }
}
