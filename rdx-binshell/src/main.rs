use anyhow::Result;
use binclock::binary::convert_to_binary;
use binclock::prelude::*;
use binclock::render::{format_digit, BitStyle};
use binclock::{CLOCK_NAME, VERSION as LIB_VERSION};
use colored::Colorize;
use rustyline::highlight::Highlighter;
use rustyline::Editor;
use rustyline_derive::{Completer, Helper, Hinter, Validator};
use std::borrow::Cow;
use std::env;
use std::io;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::info;
use tracing_subscriber::EnvFilter;

const SHELL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A custom helper struct for rustyline that enables syntax highlighting.
#[derive(Completer, Helper, Hinter, Validator)]
struct MyHighlighter;

impl Highlighter for MyHighlighter {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if let Some((command, rest)) = line.split_once(' ') {
            let colored_command = command.yellow().bold();
            let colored_rest = rest.yellow();
            Cow::Owned(format!("{} {}", colored_command, colored_rest))
        } else {
            Cow::Owned(line.yellow().bold().to_string())
        }
    }
    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

/// One parsed shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Add(DisplayMode),
    Remove(DisplayId),
    List,
    Show,
    Convert(TimeComponents),
    Bits { value: u8, width: u8 },
    Start,
    Stop,
    Help,
    Exit,
    Empty,
}

impl Command {
    fn parse(line: &str) -> Result<Self, String> {
        let args = line.split_whitespace().collect::<Vec<_>>();
        let Some(command) = args.first() else {
            return Ok(Command::Empty);
        };

        match *command {
            "add" => match args.get(1) {
                Some(mode) => mode
                    .parse::<DisplayMode>()
                    .map(Command::Add)
                    .map_err(|e| e.to_string()),
                None => Err("Usage: add <emoji|binary|json|raw|compact>".to_string()),
            },
            "remove" => match args.get(1) {
                Some(id) => id
                    .trim_start_matches('#')
                    .parse::<u64>()
                    .map(|id| Command::Remove(DisplayId(id)))
                    .map_err(|_| format!("Error: '{}' is not a display id.", id)),
                None => Err("Usage: remove <ID>".to_string()),
            },
            "convert" => match args.get(1) {
                Some(time) => time
                    .parse::<TimeComponents>()
                    .map(Command::Convert)
                    .map_err(|e| e.to_string()),
                None => Err("Usage: convert <HH:MM[:SS]>".to_string()),
            },
            "bits" => match (args.get(1), args.get(2)) {
                (Some(value), Some(width)) => match (value.parse::<u8>(), width.parse::<u8>()) {
                    (Ok(value), Ok(width)) => Ok(Command::Bits { value, width }),
                    _ => Err("Error: value and width must be numbers (0-255).".to_string()),
                },
                _ => Err("Usage: bits <VALUE> <WIDTH>".to_string()),
            },
            "list" => Ok(Command::List),
            "show" => Ok(Command::Show),
            "start" => Ok(Command::Start),
            "stop" => Ok(Command::Stop),
            "help" => Ok(Command::Help),
            "exit" => Ok(Command::Exit),
            _ => Err(format!("Unknown command: '{}'. Type 'help'.", line.trim())),
        }
    }
}

/// A background engine loop and the switch that ends it.
struct RunningLoop {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

fn print_banner() {
    if env::var("QUIET_MODE").is_ok() {
        return;
    }
    println!("{}", format!("🌚🌝 {} Shell 🌝🌚", CLOCK_NAME).cyan());

    let version_string = format!(
        "          Shell   v{:<8} Library   v{:<8}",
        SHELL_VERSION, LIB_VERSION
    );

    println!("{}", "-----------------------------------------------------------------".dimmed());

    let license_blurb = "
    This software is provided 'as is', without warranty of any kind.
    Distributed under the MIT OR Apache-2.0 license. Use at your own risk.
    ";

    println!("{}", version_string);
    println!("{}", license_blurb.dimmed());

    println!("{}", "-----------------------------------------------------------------".dimmed());
}

fn print_help() {
    println!("Available commands:");
    println!("  add <MODE>            - Adds a display (emoji, binary, json, raw, compact).");
    println!("  remove <ID>           - Removes a display by its id.");
    println!("  list                  - Shows active display ids.");
    println!("  show                  - Draws the current time on every display.");
    println!("  convert <HH:MM:SS>    - Draws an arbitrary time on every display.");
    println!("  bits <VALUE> <WIDTH>  - Shows VALUE encoded in WIDTH bits (1-6).");
    println!("  start                 - Redraws every display on the configured interval.");
    println!("  stop                  - Stops the redraw loop.");
    println!("  exit                  - Quits the shell.");
}

/// Spawns a task that reports engine events.
fn spawn_event_listener(engine: &ClockEngine) {
    let mut event_rx = engine.subscribe_events();
    tokio::spawn(async move {
        while let Ok(event) = event_rx.recv().await {
            match event {
                ClockEvent::Tick { .. } => {}
                ClockEvent::TickFailed { reason } => {
                    println!("\n<-- [CLOCK ERROR] {}\n>> ", reason)
                }
                other => println!("\n<-- [ENGINE EVENT] {:?}\n>> ", other),
            }
        }
    });
}

/// Runs one command against the engine. Returns `false` when the shell
/// should exit.
async fn execute(
    command: Command,
    engine: &ClockEngine,
    running: &mut Option<RunningLoop>,
) -> bool {
    match command {
        Command::Add(mode) => match engine.add_boxed_display(mode.renderer(io::stdout())).await {
            Ok(id) => println!("--> Added {} display with id {}", mode, id),
            Err(e) => println!("--> Error: {}", e),
        },
        Command::Remove(id) => match engine.remove_display(id).await {
            Ok(()) => println!("--> Display {} successfully removed.", id),
            Err(e) => println!("--> Error: {}", e),
        },
        Command::List => {
            println!("Active Displays:");
            for id in engine.display_ids().await {
                println!("  {}", id);
            }
        }
        Command::Show => match engine.tick().await {
            Ok(drawn) => println!("--> Drew {} display(s).", drawn),
            Err(e) => println!("--> Error: {}", e),
        },
        Command::Convert(time) => match engine.clock().decompose_time(&time) {
            Ok(state) => {
                let drawn = engine.dispatch_state(&state).await;
                println!("--> Drew {} on {} display(s).", state, drawn);
            }
            Err(e) => println!("--> Error: {}", e),
        },
        Command::Bits { value, width } => match convert_to_binary(value, width) {
            Ok(digit) => {
                println!(
                    "--> {} in {} bits: {} {} (decimal {})",
                    value,
                    width,
                    format_digit(&digit, BitStyle::Binary),
                    format_digit(&digit, BitStyle::Emoji),
                    format_digit(&digit, BitStyle::Decimal)
                );
                if digit.decimal_value() != value {
                    println!("    (truncated to the low {} bits)", width);
                }
            }
            Err(e) => println!("--> Error: {}", e),
        },
        Command::Start => {
            if running.is_some() {
                println!("--> The redraw loop is already running.");
            } else {
                let (stop, stop_rx) = oneshot::channel::<()>();
                let loop_engine = engine.clone();
                let handle = tokio::spawn(async move {
                    loop_engine
                        .run_until(async {
                            stop_rx.await.ok();
                        })
                        .await;
                });
                *running = Some(RunningLoop { stop, handle });
                println!("--> Started the redraw loop.");
            }
        }
        Command::Stop => match running.take() {
            Some(RunningLoop { stop, handle }) => {
                stop.send(()).ok();
                handle.await.ok();
                println!("--> Stopped the redraw loop.");
            }
            None => println!("--> The redraw loop is not running."),
        },
        Command::Help => print_help(),
        Command::Exit => return false,
        Command::Empty => {}
    }
    true
}

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();

    let config = BinclockConfig::load(None)?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let engine = ClockEngine::new(&config);
    spawn_event_listener(&engine);
    info!(
        "{} ready with room for {} displays.",
        CLOCK_NAME.cyan(),
        config.capacity
    );

    let mut running: Option<RunningLoop> = None;

    let mut rl = Editor::new()?;
    let helper = MyHighlighter {};
    rl.set_helper(Some(helper));

    println!("{} shell is running. Type 'help' for commands or 'exit' to quit.", CLOCK_NAME.cyan());

    loop {
        let prompt = format!("{}", ">> ".cyan().bold());
        let readline = rl.readline(&prompt);
        match readline {
            Ok(line) => {
                rl.add_history_entry(line.as_str())?;
                match Command::parse(&line) {
                    Ok(command) => {
                        if !execute(command, &engine, &mut running).await {
                            break;
                        }
                    }
                    Err(message) => println!("{}", message),
                }
            }
            Err(_) => {
                println!("Exiting binshell...");
                break;
            }
        }
    }

    if let Some(RunningLoop { stop, handle }) = running.take() {
        stop.send(()).ok();
        handle.await.ok();
    }

    Ok(())
}
