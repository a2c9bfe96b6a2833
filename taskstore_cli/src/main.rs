mod command;

use std::io::{self, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use taskstore_core::flush::DEFAULT_FLUSH_INTERVAL;
use taskstore_core::{FlushClock, StoreConfig, TaskStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let config = load_config(std::env::args().nth(1).as_deref())?;
    let mut store = TaskStore::open(&config).context("Failed to open task store")?;
    let mut clock = FlushClock::new(flush_interval()?);

    println!(
        "taskstore_cli on {} (table '{}'; type 'help' or 'exit')",
        config.path().display(),
        store.table()
    );

    let outcome = repl(&mut store, &mut clock);
    let closed = store.close().context("Failed to close task store");
    outcome.and(closed)
}

fn repl(store: &mut TaskStore, clock: &mut FlushClock) -> Result<()> {
    let stdin = io::stdin();
    loop {
        print!("ts> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            return Ok(());
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            return Ok(());
        }
        if input.eq_ignore_ascii_case("help") {
            println!("{}", command::HELP);
            continue;
        }

        match command::parse(input).and_then(|cmd| command::execute(cmd, store)) {
            Ok(out) => println!("{out}"),
            Err(err) => println!("error: {err:#}"),
        }

        let now = Instant::now();
        if clock.is_due(now) {
            if let Err(err) = store.flush() {
                warn!(error = %err, "periodic flush failed");
            }
            clock.mark_flushed(now);
        }
    }
}

fn load_config(path: Option<&str>) -> Result<StoreConfig> {
    let base = match path {
        Some(p) => StoreConfig::load(Path::new(p))?,
        None => StoreConfig::default(),
    };
    let mut config = base.apply_env()?;
    if config.table.is_none() && config.session.is_none() {
        let session = uuid::Uuid::new_v4().to_string();
        info!(%session, "no table or session configured; minted a session");
        config.session = Some(session);
    }
    Ok(config)
}

fn flush_interval() -> Result<Duration> {
    match std::env::var("TASKSTORE_FLUSH_INTERVAL_MS") {
        Ok(raw) => {
            let ms: u64 = raw.parse().with_context(|| {
                format!("TASKSTORE_FLUSH_INTERVAL_MS must be milliseconds, got '{raw}'")
            })?;
            Ok(Duration::from_millis(ms))
        }
        Err(_) => Ok(DEFAULT_FLUSH_INTERVAL),
    }
}
