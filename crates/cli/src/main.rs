//! Command-line front end for the RISC-V RV64 instruction set simulator.
//!
//! Loads a flat binary image into DRAM and runs it to completion or to the
//! first fatal trap, dumping register state on failure.

use std::path::PathBuf;
use std::process;

use clap::Parser;

use rvsim_core::common::HostError;
use rvsim_core::config::Config;
use rvsim_core::core::Cpu;
use rvsim_core::soc::Bus;

#[derive(Parser, Debug)]
#[command(
    name = "sim",
    author,
    version,
    about = "RISC-V RV64 instruction set simulator"
)]
struct Cli {
    /// Flat bare-metal binary to load at the start of DRAM and execute.
    binary: PathBuf,

    /// Raise logging to `trace` level (per-instruction fetch/execute events).
    #[arg(long)]
    trace: bool,

    /// JSON file overriding default configuration fields.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.trace);

    let config = load_config(cli.config.as_deref()).unwrap_or_else(|err| {
        eprintln!("error: {err}");
        process::exit(1);
    });
    let image = std::fs::read(&cli.binary).unwrap_or_else(|source| {
        eprintln!(
            "error: {}",
            HostError::ReadBinary {
                path: cli.binary.display().to_string(),
                source,
            }
        );
        process::exit(1);
    });

    if image.len() as u64 > config.dram_size {
        eprintln!(
            "error: {}",
            HostError::ImageTooLarge {
                size: image.len(),
                dram_size: config.dram_size as usize,
            }
        );
        process::exit(1);
    }

    let mut cpu = Cpu::new(Bus::new(config.dram_size, config.uart_to_stderr), config.initial_pc);
    if let Err(trap) = cpu.load_image(&image) {
        eprintln!("error: {trap}");
        process::exit(1);
    }

    loop {
        if let Some(trap) = cpu.run_instruction() {
            eprintln!("fatal trap: {trap}");
            cpu.dump_state();
            process::exit(1);
        }
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config, HostError> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let text = std::fs::read_to_string(path).map_err(|source| HostError::ReadBinary {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| HostError::ParseConfig {
        path: path.display().to_string(),
        source,
    })
}

fn init_tracing(trace: bool) {
    use tracing_subscriber::EnvFilter;

    let default_level = if trace { "trace" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
