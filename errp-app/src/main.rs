mod render;
mod surface;

use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::debug;

use errp_experiment::config::{self, list_presets, preset_names};
use errp_experiment::{CsvSink, Session, SessionError, SessionInfo};
use errp_timing::SessionClock;

use crate::surface::WinitSurface;

const OUTPUT_DIR: &str = "data";

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let preset_key = match args.first().map(String::as_str) {
        Some("help" | "--help" | "-h") => {
            println!("{}", list_presets());
            return Ok(());
        }
        Some(name) => name.to_string(),
        None => prompt_preset()?,
    };

    let config = config::resolve(&preset_key)?;
    println!("{}", config.describe());
    debug!(
        config = %serde_json::to_string(&config).context("serializing configuration")?,
        "resolved configuration"
    );

    let info = collect_session_info(&preset_key)?;

    let mut surface = WinitSurface::new(&config)?;
    let mut sink = CsvSink::new(OUTPUT_DIR, &info);
    let mut session = Session::new(config, info, SessionClock::new(), rand::rng());

    match session.run(&mut surface, &mut sink) {
        Ok(()) => {
            println!("\nExperiment complete.");
            println!("Data saved to: {}", sink.path().display());
            Ok(())
        }
        Err(SessionError::Aborted) => {
            println!("\nSession aborted by operator.");
            println!("Partial data saved to: {}", sink.path().display());
            Ok(())
        }
        Err(err) => Err(err).context("session failed"),
    }
}

fn prompt_preset() -> Result<String> {
    println!("{}", list_presets());
    let names = preset_names();
    let choice = prompt(&format!("Preset ({})", names.join("/")), "quick")?;
    Ok(choice)
}

fn collect_session_info(preset_key: &str) -> Result<SessionInfo> {
    let subject_id = prompt("Subject ID", "test")?;
    let session_num = prompt("Session Number", "1")?
        .parse::<u32>()
        .context("session number must be a positive integer")?;
    let experimenter = prompt("Experimenter Name", "")?;

    let now = chrono::Local::now();
    Ok(SessionInfo {
        subject_id,
        session_num,
        experimenter,
        session_date: now.format("%Y-%m-%d").to_string(),
        session_time: now.format("%H:%M:%S").to_string(),
        preset_key: preset_key.to_string(),
    })
}

fn prompt(label: &str, default: &str) -> Result<String> {
    if default.is_empty() {
        print!("{label}: ");
    } else {
        print!("{label} [{default}]: ");
    }
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    let trimmed = line.trim();
    Ok(if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    })
}
