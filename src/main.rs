mod actuator;
mod cli;
mod config;
mod events;
mod keymap;
mod player;
mod report;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Command, PlayArgs};
use config::Config;
use events::{CsvFile, EventSource};
use keymap::{KeyMap, Layout};
use player::{Outcome, PlaybackOptions, Player, StopClock};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = config::load_or_default(cli.config.as_deref())?;
    let layout = cli.layout.unwrap_or(config.layout);
    let keymap = KeyMap::for_layout(layout, &config.compression)?;
    log::debug!("{layout:?} layout: {} mapped pitches", keymap.len());

    match cli.command {
        Command::Mapping => {
            print!(
                "{}",
                report::render_mapping(layout, &keymap, &config.compression)
            );
            Ok(())
        }
        Command::Analyze { csv } => {
            let events = CsvFile::new(csv).load()?;
            println!("{}", report::Coverage::analyze(&keymap, &events));
            Ok(())
        }
        Command::Keys { csv } => {
            let events = CsvFile::new(csv).load()?;
            for (key, pitch) in report::key_sequence(&keymap, &events) {
                println!("Press: {key} (Note: {})", report::note_name(pitch));
            }
            Ok(())
        }
        Command::Play(args) => play(args, layout, &keymap, &config),
    }
}

fn play(args: PlayArgs, layout: Layout, keymap: &KeyMap, config: &Config) -> anyhow::Result<()> {
    let options = PlaybackOptions {
        tempo_scale: args.tempo.unwrap_or(config.playback.tempo_scale),
        // The instrument keyboard only reacts to taps
        tap: args
            .tap_override()
            .or(config.playback.tap)
            .unwrap_or(layout == Layout::Instrument),
    };
    options.validate()?;

    let source = CsvFile::new(&args.csv);
    let events = source.load()?;

    if !args.quiet {
        println!(
            "{}",
            report::render_mapping(layout, keymap, &config.compression)
        );
        println!("{}\n", report::Coverage::analyze(keymap, &events));
    }

    let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = stop_tx.try_send(());
    })
    .context("Could not install Ctrl+C handler")?;

    log::info!("Playing {}. Press Ctrl+C to stop.", source.path().display());

    let mut player = Player::new(
        keymap,
        actuator::ConsoleActuator::stdout(),
        StopClock::new(stop_rx),
    );
    let summary = player.run(&events, &options)?;
    debug_assert!(player.held_keys().is_empty());

    match summary.outcome {
        Outcome::Completed => log::info!("Playback finished"),
        Outcome::Cancelled => log::info!("Playback cancelled, all keys released"),
        Outcome::Failed => log::error!("Playback aborted, all keys released"),
    }
    if summary.failures > 0 {
        log::warn!("{} key action(s) failed", summary.failures);
    }
    Ok(())
}
