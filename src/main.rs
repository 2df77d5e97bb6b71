use anyhow::Result;
use std::env;

use reelrank::paths::database_file_path;
use reelrank::share::{share_text, CommandSender, MessageSender};
use reelrank::{MissingRankPolicy, Store};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> Result<()> {
    init_logging();

    let args: Vec<String> = env::args().collect();

    if args.len() > 1 && args[1] == "share" {
        // Print/share the current ranking without opening the UI
        run_share()?;
    } else {
        // UI mode (default)
        run_ui_mode()?;
    }

    Ok(())
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("reelrank=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

fn run_share() -> Result<()> {
    let db_path = database_file_path()?;
    let store = Store::open(&db_path)?;
    let (_, ranked) = store.load(MissingRankPolicy::Ignore)?;

    let body = share_text(&ranked);
    println!("{body}");

    match CommandSender::from_env() {
        Some(sender) if sender.can_send() => {
            sender.send(&body)?;
            eprintln!("Sent via configured share command.");
        }
        _ => {
            eprintln!(
                "(No share command configured; set {} to send this somewhere.)",
                reelrank::share::SHARE_CMD_ENV
            );
        }
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode() -> Result<()> {
    use reelrank::ui;

    let db_path = database_file_path()?;
    let mut store = Store::open(&db_path)?;
    let (watch_list, ranked) = store.load(MissingRankPolicy::Ignore)?;

    // Write-through once so a fresh database gets its mirror keys
    store.save(&watch_list, &ranked)?;

    let sender = CommandSender::from_env()
        .map(|s| Box::new(s) as Box<dyn MessageSender>);

    let mut app = ui::App::new(store, watch_list, ranked, sender);
    ui::run_ui(&mut app)?;

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode() -> Result<()> {
    eprintln!("TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or print the ranking with: reelrank share");
    std::process::exit(1);
}
