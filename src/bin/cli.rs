//! FileCabinet CLI
//!
//! Interactive shell over a record cabinet. Reads one command per line from
//! stdin until `exit` or end of input.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use filecabinet::validation::ValidationPreset;
use filecabinet::{Cabinet, Config, StorageKind};
use tracing_subscriber::{fmt, EnvFilter};

/// FileCabinet CLI
#[derive(Parser, Debug)]
#[command(name = "filecabinet-cli")]
#[command(about = "Employee record manager")]
#[command(version)]
struct Args {
    /// Storage backend
    #[arg(short, long, value_enum, default_value = "memory")]
    storage: StorageArg,

    /// Validation rule set
    #[arg(short = 'v', long, value_enum, default_value = "default")]
    validation_rules: RulesArg,

    /// Data file for the file backend
    #[arg(short, long, default_value = "cabinet.db")]
    data_file: PathBuf,

    /// JSON file with validation rule sets
    #[arg(short, long)]
    rules_file: Option<PathBuf>,

    /// Log every store call
    #[arg(long)]
    use_logger: bool,

    /// Log how long every store call takes
    #[arg(long)]
    use_stopwatch: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StorageArg {
    Memory,
    File,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum RulesArg {
    Default,
    Custom,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,filecabinet=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let mut builder = Config::builder()
        .storage(match args.storage {
            StorageArg::Memory => StorageKind::Memory,
            StorageArg::File => StorageKind::File,
        })
        .validation(match args.validation_rules {
            RulesArg::Default => ValidationPreset::Default,
            RulesArg::Custom => ValidationPreset::Custom,
        })
        .data_file(&args.data_file)
        .log_calls(args.use_logger)
        .measure_time(args.use_stopwatch);
    if let Some(path) = &args.rules_file {
        builder = builder.rules_file(path);
    }
    let config = builder.build();

    tracing::info!("FileCabinet v{}", filecabinet::VERSION);

    let mut cabinet = match Cabinet::open(config) {
        Ok(cabinet) => cabinet,
        Err(e) => {
            tracing::error!("Failed to open cabinet: {}", e);
            std::process::exit(1);
        }
    };

    println!("Using {} validation rules.", args.validation_rules.name());
    println!("Enter your command, or enter 'help' to get help.");

    if let Err(e) = run(&mut cabinet) {
        tracing::error!("{}", e);
        let _ = cabinet.close();
        std::process::exit(1);
    }

    if let Err(e) = cabinet.close() {
        tracing::error!("Failed to close cabinet: {}", e);
        std::process::exit(1);
    }
}

fn run(cabinet: &mut Cabinet) -> filecabinet::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(());
        }
        if line.trim().is_empty() {
            continue;
        }

        let reply = cabinet.run_line(&line)?;
        for text in &reply.lines {
            writeln!(stdout, "{}", text)?;
        }
        if reply.exit {
            return Ok(());
        }
    }
}

impl RulesArg {
    fn name(&self) -> &'static str {
        match self {
            RulesArg::Default => "default",
            RulesArg::Custom => "custom",
        }
    }
}
