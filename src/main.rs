use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use droidscope_adb::SdkFinder;
use droidscope_logs::{Limits, LogSession, SessionEvent};
use droidscope_types::Level;

mod config;

use config::Settings;

/// Droidscope - tail `adb logcat` with a bounded buffer
#[derive(Parser, Debug)]
#[command(name = "droidscope")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Minimum severity to print (silent hides everything)
    #[arg(long, default_value = "verbose")]
    level: Level,

    /// Case-insensitive substring filter on the raw text
    #[arg(long, default_value = "")]
    filter: String,

    /// Override the live buffer ceiling from the config file
    #[arg(long)]
    buffer_size: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::load();
    let normal_max = args.buffer_size.unwrap_or(settings.normal_max);

    let (session, mut events) = LogSession::new(Arc::new(SdkFinder::new()), Limits::new(normal_max));
    session.set_level_floor(args.level);
    session.set_text_filter(args.filter);

    session
        .start()
        .context("failed to start the logcat stream")?;
    eprintln!("droidscope: tailing adb logcat (floor {})", args.level);

    // Entries already printed, by buffer id
    let mut last_printed: Option<u64> = None;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,

            event = events.recv() => {
                match event {
                    Some(SessionEvent::Appended) => {
                        let snapshot = session.snapshot();
                        for entry in &snapshot.entries {
                            if last_printed.is_none_or(|last| entry.id > last) {
                                println!("{}", entry.raw);
                                last_printed = Some(entry.id);
                            }
                        }
                    }
                    Some(SessionEvent::ModeChanged(mode)) => {
                        tracing::debug!(mode = mode.label(), "mode changed");
                    }
                    Some(SessionEvent::Cleared) => {
                        last_printed = None;
                    }
                    Some(SessionEvent::Ended) => {
                        eprintln!("droidscope: stream ended");
                        break;
                    }
                    Some(SessionEvent::Failed(msg)) => {
                        eprintln!("droidscope: {msg}");
                        break;
                    }
                    Some(SessionEvent::Started) => {}
                    None => break,
                }
            }
        }
    }

    session.stop();
    Ok(())
}
