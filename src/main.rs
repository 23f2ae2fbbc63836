use brewin::config::{Config, DEFAULT_MAX_CALL_DEPTH};
use brewin::console::StdConsole;
use brewin::error::InterpreterError;
use brewin::interpreter::Interpreter;
use clap::{crate_version, App, Arg};
use std::fs;
use std::process;

fn main() {
    let default_depth = DEFAULT_MAX_CALL_DEPTH.to_string();
    let matches = App::new("brewin")
        .version(crate_version!())
        .about("Runs a Brewin program")
        .arg(
            Arg::with_name("script")
                .help("Program to run")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("trace")
                .long("trace")
                .help("Log every executed statement"),
        )
        .arg(
            Arg::with_name("max-depth")
                .long("max-depth")
                .value_name("N")
                .default_value(&default_depth)
                .help("Maximum number of nested method calls"),
        )
        .get_matches();

    let trace = matches.is_present("trace");
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if trace { "trace" } else { "warn" }),
    )
    .init();

    let max_call_depth = match matches.value_of("max-depth").map(str::parse::<usize>) {
        Some(Ok(depth)) => depth,
        Some(Err(_)) | None => {
            eprintln!("--max-depth expects a non-negative integer");
            process::exit(64);
        }
    };
    let config = Config {
        trace,
        max_call_depth,
    };

    let script = matches.value_of("script").unwrap_or_default().to_string();
    let source = match fs::read_to_string(&script) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("could not read {}: {}", script, err);
            process::exit(74);
        }
    };

    let result = run(&source, config);
    if let Err(err) = result {
        eprintln!("{}", err);
        process::exit(err.exit_code());
    }
}

fn run(source: &str, config: Config) -> Result<(), InterpreterError> {
    log::debug!("running with {:?}", config);
    let mut interpreter = Interpreter::new(config, Box::new(StdConsole::default()));
    interpreter.run_source(source)
}
