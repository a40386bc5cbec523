//! Suggest - terminal driver for the suggestion widget.
//!
//! Loads the widget configuration, creates an HTTP-backed widget for the
//! requested kind and feeds it line commands from stdin.

mod command;

use std::path::PathBuf;
use std::sync::Arc;

use command::{Command, HELP};
use suggest_core::WidgetConfig;
use suggest_dadata::{AddressKind, BankKind, FioKind, HttpTransport};
use suggest_engine::{Commit, RenderSnapshot, SuggestionKind, Widget};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Environment variable consulted when the config has no token.
const TOKEN_ENV: &str = "DADATA_TOKEN";

// =============================================================================
// Configuration
// =============================================================================

/// Load the widget configuration.
///
/// An explicit path must exist. Otherwise `~/.config/suggest/config.toml` is
/// used when present, falling back to defaults.
fn load_config(path: Option<PathBuf>) -> Result<WidgetConfig, String> {
    let mut config = match path {
        Some(path) => {
            tracing::info!("Loading config from: {}", path.display());
            WidgetConfig::load(&path)
        }
        None => WidgetConfig::load_default(),
    }
    .map_err(|e| format!("Failed to load config: {}", e))?;

    if config.token.is_none() {
        config.token = std::env::var(TOKEN_ENV).ok().filter(|t| !t.is_empty());
    }
    if config.token.is_none() {
        tracing::warn!("No API token configured - set `token` or {}", TOKEN_ENV);
    }

    Ok(config)
}

// =============================================================================
// Rendering
// =============================================================================

fn print_snapshot<T>(snapshot: &RenderSnapshot<T>) {
    println!("> {}", snapshot.display_text);
    if !snapshot.is_open {
        return;
    }
    for (i, item) in snapshot.items.iter().enumerate() {
        let marker = if snapshot.highlighted == Some(i) { '*' } else { ' ' };
        println!("{} {:>2}. {}", marker, i, item.value);
    }
}

fn apply<K: SuggestionKind>(widget: &Widget<K>, command: Command) {
    match command {
        Command::Input(text) => widget.input_changed(text),
        Command::Key(key) => {
            if !widget.key(key) {
                tracing::debug!("{:?} ignored", key);
            }
        }
        Command::Focus => widget.focus(),
        Command::Blur => widget.blur(),
        Command::Pick(index) => {
            if !widget.pointer_down(index) {
                eprintln!("No item at {}", index);
            }
        }
        Command::Set(text) => widget.set_input_value(text),
        Command::Clear => widget.clear(),
        Command::Help => println!("{}", HELP),
        Command::Quit => {}
    }
}

// =============================================================================
// Session
// =============================================================================

async fn run<K: SuggestionKind>(kind: K, config: WidgetConfig) -> Result<(), String> {
    let widget = Widget::builder(kind, Arc::new(HttpTransport::new()))
        .config(config)
        .on_commit(|commit| match commit {
            Commit::Selected(s) => println!("= {}", s.value),
            Commit::Cleared => println!("= (cleared)"),
        })
        .build();
    tracing::info!("Widget {} ready", widget.id());

    let mut rx = widget.subscribe();
    let printer = tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let snapshot = rx.borrow_and_update().clone();
            print_snapshot(&snapshot);
        }
    });

    widget.mount();
    widget.focus();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| format!("Failed to read stdin: {}", e))?
    {
        match line.parse::<Command>() {
            Ok(Command::Quit) => break,
            Ok(command) => apply(&widget, command),
            Err(e) => eprintln!("{} (:help for commands)", e),
        }
    }

    drop(widget);
    printer.abort();
    Ok(())
}

// =============================================================================
// Entry Point
// =============================================================================

fn main() {
    // Logs go to stderr so they don't interleave with the rendered list
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let kind = args.next().unwrap_or_else(|| "address".to_string());
    let config_path = args.next().map(PathBuf::from);

    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create tokio runtime: {}", e);
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Suggest starting ({} suggestions)...", kind);
    let result = match kind.as_str() {
        "address" => rt.block_on(run(AddressKind::new(), config)),
        "bank" => rt.block_on(run(BankKind::new(), config)),
        "fio" => rt.block_on(run(FioKind::new(), config)),
        other => Err(format!(
            "Unknown kind '{}' - expected address, bank or fio",
            other
        )),
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
