use anyhow::{Context, Result};
use binclock::prelude::*;
use binclock::{CLOCK_NAME, VERSION};
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

/// Prints the time as a binary clock.
#[derive(Parser, Debug)]
#[command(name = "binclock")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Display mode
    #[arg(long, value_enum)]
    display: Option<DisplayMode>,

    /// Run continuously (default: single output)
    #[arg(long = "loop")]
    run_loop: bool,

    /// Milliseconds between redraws in loop mode
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Path to a configuration file (default: ./binclock.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    /// Applies command-line overrides on top of the loaded configuration.
    fn apply(&self, config: &mut BinclockConfig) {
        if let Some(display) = self.display {
            config.display = display;
        }
        if self.run_loop {
            config.run_loop = true;
        }
        if let Some(interval_ms) = self.interval_ms {
            config.interval_ms = interval_ms;
        }
        if let Some(log_level) = &self.log_level {
            config.log_level = log_level.clone();
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version are reported as "errors" that go to stdout.
            let code = if e.use_stderr() { 1 } else { 0 };
            e.print().ok();
            return ExitCode::from(code);
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = BinclockConfig::load(cli.config.as_deref())
        .context("Failed to load configuration")?;
    cli.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    // Logs go to stderr so that stdout stays clean for JSON consumers.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    if config.run_loop {
        run_loop(&config)
    } else {
        run_once(&config, &BinaryClock::system(), io::stdout())
    }
}

fn run_once<C: ClockSource, W: Write + Send + 'static>(
    config: &BinclockConfig,
    clock: &BinaryClock<C>,
    out: W,
) -> Result<()> {
    let state = clock.current_state().map_err(|e| {
        debug!("Clock read failed: {}", e);
        anyhow::anyhow!("Failed to get current time")
    })?;
    config.display.renderer(out).render(&state);
    Ok(())
}

fn run_loop(config: &BinclockConfig) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    runtime.block_on(async {
        let mut stdout = io::stdout();
        writeln!(stdout, "🌚🌝 {} v{} 🌝🌚", CLOCK_NAME, VERSION)
            .and_then(|_| writeln!(stdout, "Press Ctrl+C to exit\n"))
            .context("Failed to write to stdout")?;

        // Closing the reading end of a pipe stops the loop.
        let closed = Arc::new(Notify::new());
        let watched = || PipeWatch::new(io::stdout(), closed.clone());

        let engine = ClockEngine::new(config);
        if config.clears_screen() {
            engine
                .add_display(ClearScreen::new(watched()))
                .await
                .context("Failed to register display function")?;
        }
        let id = engine
            .add_boxed_display(config.display.renderer(watched()))
            .await
            .context("Failed to register display function")?;
        info!("Registered {} display {}", config.display, id);

        let result = engine.run_with(closed.notified()).await;
        if let Err(e) = writeln!(stdout, "\n\nBinary clock stopped.") {
            debug!("Could not print the stop message: {}", e);
        }
        if let Err(e) = &result {
            error!("Engine stopped with an error: {}", e);
        }
        result
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use binclock::error::ClockError;
    use binclock::time::TimeReading;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("binclock").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_flags_override_config() {
        let mut config = BinclockConfig {
            display: DisplayMode::Json,
            interval_ms: 250,
            log_level: "info".to_string(),
            ..Default::default()
        };
        parse(&[
            "--display",
            "compact",
            "--loop",
            "--interval-ms",
            "40",
            "--log-level",
            "debug",
        ])
        .apply(&mut config);

        assert_eq!(config.display, DisplayMode::Compact);
        assert!(config.run_loop);
        assert_eq!(config.interval_ms, 40);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_unset_flags_keep_config() {
        let mut config = BinclockConfig {
            display: DisplayMode::Raw,
            run_loop: true,
            interval_ms: 250,
            log_level: "info".to_string(),
            ..Default::default()
        };
        let expected = config.clone();
        parse(&[]).apply(&mut config);
        assert_eq!(config, expected);
    }

    #[test]
    fn test_bad_arguments_are_rejected() {
        let cli = |args: &[&str]| {
            Cli::try_parse_from(std::iter::once("binclock").chain(args.iter().copied()))
        };
        assert!(cli(&["--display", "sundial"]).is_err());
        assert!(cli(&["--interval-ms", "soon"]).is_err());
        assert!(cli(&["--frobnicate"]).is_err());
    }

    #[test]
    fn test_clock_failure_message() {
        struct BrokenClock;
        impl ClockSource for BrokenClock {
            fn now(&self) -> Result<TimeReading, ClockError> {
                Err(ClockError::SystemTime("unplugged".to_string()))
            }
        }

        let err = run_once(
            &BinclockConfig::default(),
            &BinaryClock::new(BrokenClock),
            Vec::new(),
        )
        .unwrap_err();
        assert_eq!(format!("Error: {err:#}"), "Error: Failed to get current time");
    }

    #[test]
    fn test_run_once_renders_selected_display() {
        let clock = BinaryClock::new(FixedClock::new(TimeComponents::new(14, 30, 45), 1));
        let config = BinclockConfig {
            display: DisplayMode::Compact,
            ..Default::default()
        };
        assert!(run_once(&config, &clock, Vec::new()).is_ok());
    }
}
