//! Demo: one signal, several clients waiting for green.
//!
//! # Usage
//!
//! ```sh
//! wigwag --min-ms 4000 --max-ms 6000 --clients 3 --cycles 2
//! ```
//!
//! Each client waits for green `--cycles` times and reports what it saw;
//! the process shuts the signal down and exits once every client is done.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use wigwag::signal::{ConfigError, CyclerConfig, PhaseController, SignalError};

const DEFAULT_MIN_MS: u64 = 4000;
const DEFAULT_MAX_MS: u64 = 6000;
const DEFAULT_CLIENTS: usize = 3;
const DEFAULT_CYCLES: usize = 2;

#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error("missing value for {0}")]
    MissingValue(&'static str),
    #[error("invalid value for {flag}: {value}")]
    InvalidValue { flag: &'static str, value: String },
    #[error("unknown argument: {0}")]
    UnknownArgument(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Signal(#[from] SignalError),
    #[error("client thread panicked")]
    ClientPanicked,
}

struct DemoArgs {
    config: CyclerConfig,
    clients: usize,
    cycles: usize,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("wigwag: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), DemoError> {
    wigwag::init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let DemoArgs {
        config,
        clients,
        cycles,
    } = parse_args(&args)?;

    eprintln!(
        "wigwag: cycling every {:?}..={:?} with {clients} client(s)",
        config.min_interval(),
        config.max_interval()
    );

    let controller = Arc::new(PhaseController::new(config));
    controller.start()?;

    let handles: Vec<_> = (0..clients)
        .map(|id| {
            let controller = Arc::clone(&controller);
            thread::Builder::new()
                .name(format!("wigwag-client-{id}"))
                .spawn(move || -> Result<(), SignalError> {
                    for cycle in 1..=cycles {
                        controller.wait_for_green()?;
                        println!(
                            "client {id}: green #{cycle} (phase now {})",
                            controller.current_phase()
                        );
                    }
                    Ok(())
                })
        })
        .collect::<Result<_, _>>()
        .map_err(SignalError::Spawn)?;

    for handle in handles {
        handle.join().map_err(|_| DemoError::ClientPanicked)??;
    }

    controller.shutdown();
    eprintln!("wigwag: stopped");
    Ok(())
}

fn parse_args(args: &[String]) -> Result<DemoArgs, DemoError> {
    let mut min_ms = DEFAULT_MIN_MS;
    let mut max_ms = DEFAULT_MAX_MS;
    let mut clients = DEFAULT_CLIENTS;
    let mut cycles = DEFAULT_CYCLES;
    let mut seed: Option<u64> = None;

    let mut i = 1;
    while i < args.len() {
        let flag = match args[i].as_str() {
            "--min-ms" => "--min-ms",
            "--max-ms" => "--max-ms",
            "--clients" | "-c" => "--clients",
            "--cycles" | "-n" => "--cycles",
            "--seed" | "-s" => "--seed",
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            arg => return Err(DemoError::UnknownArgument(arg.to_string())),
        };

        i += 1;
        let value = args.get(i).ok_or(DemoError::MissingValue(flag))?;
        let invalid = || DemoError::InvalidValue {
            flag,
            value: value.clone(),
        };
        match flag {
            "--min-ms" => min_ms = value.parse().map_err(|_| invalid())?,
            "--max-ms" => max_ms = value.parse().map_err(|_| invalid())?,
            "--clients" => clients = value.parse().map_err(|_| invalid())?,
            "--cycles" => cycles = value.parse().map_err(|_| invalid())?,
            _ => seed = Some(value.parse().map_err(|_| invalid())?),
        }
        i += 1;
    }

    let mut config = CyclerConfig::new(
        Duration::from_millis(min_ms),
        Duration::from_millis(max_ms),
    )?;
    if let Some(seed) = seed {
        config = config.with_seed(seed);
    }

    Ok(DemoArgs {
        config,
        clients,
        cycles,
    })
}

fn print_usage() {
    eprintln!(
        "Usage: wigwag [OPTIONS]

Options:
  --min-ms <MS>       Shortest interval between transitions [default: {DEFAULT_MIN_MS}]
  --max-ms <MS>       Longest interval between transitions [default: {DEFAULT_MAX_MS}]
  -c, --clients <N>   Number of client threads [default: {DEFAULT_CLIENTS}]
  -n, --cycles <N>    Greens each client waits for [default: {DEFAULT_CYCLES}]
  -s, --seed <SEED>   Seed the interval RNG for a reproducible run
  -h, --help          Print this help"
    );
}
