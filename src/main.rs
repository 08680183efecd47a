use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use zipshell::{Config, Shell, VirtualFilesystem};

/// Shell over a sandboxed filesystem expanded from a ZIP archive
#[derive(Parser, Debug)]
#[command(name = "zipshell", version, about)]
struct Cli {
    /// JSON config with `hostname` and `filesystem` (archive path)
    config: PathBuf,

    /// Override the staging directory from the config
    #[arg(long)]
    staging_dir: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "zipshell=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load(&cli.config)
        .with_context(|| format!("Failed to load config {}", cli.config.display()))?;
    let staging_dir = cli.staging_dir.unwrap_or(config.staging_dir);

    let mut fs = VirtualFilesystem::new(staging_dir);
    fs.materialize(&config.filesystem).with_context(|| {
        format!("Failed to materialize {}", config.filesystem.display())
    })?;

    let mut shell = Shell::new(config.hostname, fs);
    let session = run(&mut shell);

    // Always remove the sandbox, even if the terminal went away mid-session
    shell.shutdown().context("Failed to remove sandbox")?;
    session
}

fn run(shell: &mut Shell) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut line = String::new();

    loop {
        write!(stdout, "{}", shell.prompt())?;
        stdout.flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            writeln!(stdout)?;
            info!("end of input");
            return Ok(());
        }

        let outcome = shell.execute_line(&line);
        for text in &outcome.output {
            writeln!(stdout, "{}", text)?;
        }
        if outcome.exit {
            return Ok(());
        }
    }
}
