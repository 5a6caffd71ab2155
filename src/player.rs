use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::actuator::Actuator;
use crate::events::NoteEvent;
use crate::keymap::{Key, KeyMap};

/// Ticks per quarter note assumed for every source file.
pub const TICKS_PER_BEAT: f64 = 480.0;
/// Microseconds per quarter note (120 BPM).
pub const MICROS_PER_BEAT: f64 = 500_000.0;

/// Wall-clock delay for `delta_ticks` at the given tempo scale.
/// Negative deltas yield no delay; delays too long for a `Duration`
/// saturate at `Duration::MAX`.
pub fn tick_delay(delta_ticks: i64, tempo_scale: f64) -> Duration {
    if delta_ticks <= 0 {
        return Duration::ZERO;
    }
    let seconds =
        (delta_ticks as f64 / TICKS_PER_BEAT) * (MICROS_PER_BEAT / 1_000_000.0) / tempo_scale;
    Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    Elapsed,
    Interrupted,
}

/// Blocking wait between events. Reports whether the wait was cut short.
pub trait Clock {
    fn wait(&mut self, duration: Duration) -> anyhow::Result<Wait>;
}

impl<C: Clock + ?Sized> Clock for &mut C {
    fn wait(&mut self, duration: Duration) -> anyhow::Result<Wait> {
        (**self).wait(duration)
    }
}

/// Real-time clock that can be interrupted through a stop channel.
pub struct StopClock {
    stop: Receiver<()>,
}

impl StopClock {
    pub fn new(stop: Receiver<()>) -> Self {
        StopClock { stop }
    }
}

impl Clock for StopClock {
    fn wait(&mut self, duration: Duration) -> anyhow::Result<Wait> {
        let start = Instant::now();
        match self.stop.recv_timeout(duration) {
            Ok(()) => Ok(Wait::Interrupted),
            Err(RecvTimeoutError::Timeout) => Ok(Wait::Elapsed),
            // Nobody can stop us any more; sit out the rest of the delay
            Err(RecvTimeoutError::Disconnected) => {
                std::thread::sleep(duration.saturating_sub(start.elapsed()));
                Ok(Wait::Elapsed)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackOptions {
    pub tempo_scale: f64,
    pub tap: bool,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        PlaybackOptions {
            tempo_scale: 1.0,
            tap: false,
        }
    }
}

impl PlaybackOptions {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.tempo_scale.is_finite() && self.tempo_scale > 0.0,
            "tempo scale must be a positive number, got {}",
            self.tempo_scale
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Outcome {
    #[default]
    Completed,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Press,
    Release,
    Tap,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Press => "press",
            Action::Release => "release",
            Action::Tap => "tap",
        })
    }
}

/// What happened during one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackSummary {
    pub outcome: Outcome,
    pub events: usize,
    pub presses: usize,
    pub releases: usize,
    pub taps: usize,
    /// Events whose pitch has no key.
    pub skipped: usize,
    /// Actions the actuator rejected.
    pub failures: usize,
}

/// Replays note events as key actions in real time.
pub struct Player<'a, A, C> {
    keymap: &'a KeyMap,
    actuator: A,
    clock: C,
    held: BTreeSet<Key>,
}

impl<'a, A: Actuator, C: Clock> Player<'a, A, C> {
    pub fn new(keymap: &'a KeyMap, actuator: A, clock: C) -> Self {
        Player {
            keymap,
            actuator,
            clock,
            held: BTreeSet::new(),
        }
    }

    /// Keys currently held down. Always empty outside of [`Player::run`].
    pub fn held_keys(&self) -> &BTreeSet<Key> {
        &self.held
    }

    /// Play `events` in tick order.
    ///
    /// Only invalid options are reported as errors. Everything that goes
    /// wrong once playback has started ends up in the summary, and every
    /// key still held at the end is released.
    pub fn run(
        &mut self,
        events: &[NoteEvent],
        options: &PlaybackOptions,
    ) -> anyhow::Result<PlaybackSummary> {
        options.validate()?;

        let events: Cow<'_, [NoteEvent]> = if events.is_sorted_by_key(|e| e.tick) {
            Cow::Borrowed(events)
        } else {
            log::warn!("Events are not in tick order, sorting");
            let mut sorted = events.to_vec();
            sorted.sort_by_key(|e| e.tick);
            Cow::Owned(sorted)
        };

        log::info!(
            "Starting playback (tempo scale: {}, tap mode: {})",
            options.tempo_scale,
            options.tap
        );

        let mut summary = PlaybackSummary::default();
        let outcome = self.play_events(&events, options, &mut summary);
        summary.outcome = outcome;
        self.all_keys_up(&mut summary);

        log::info!(
            "Playback {:?}: {} events, {} presses, {} releases, {} taps, {} skipped, {} failed",
            summary.outcome,
            summary.events,
            summary.presses,
            summary.releases,
            summary.taps,
            summary.skipped,
            summary.failures
        );
        Ok(summary)
    }

    fn play_events(
        &mut self,
        events: &[NoteEvent],
        options: &PlaybackOptions,
        summary: &mut PlaybackSummary,
    ) -> Outcome {
        let mut last_tick = events.first().map_or(0, |e| e.tick);

        for event in events {
            let delay = tick_delay(event.tick.saturating_sub(last_tick), options.tempo_scale);
            last_tick = event.tick;

            match self.clock.wait(delay) {
                Ok(Wait::Elapsed) => {}
                Ok(Wait::Interrupted) => {
                    log::info!("Playback stopped by user");
                    return Outcome::Cancelled;
                }
                Err(e) => {
                    log::error!("Error during playback: {e:#}");
                    return Outcome::Failed;
                }
            }
            summary.events += 1;

            let Some(key) = self.keymap.resolve(event.pitch) else {
                log::debug!(
                    "No key for pitch {} (track {}, channel {}), skipping",
                    event.pitch,
                    event.track,
                    event.channel
                );
                summary.skipped += 1;
                continue;
            };

            if event.is_note_on() {
                if options.tap {
                    self.emit(Action::Tap, key, summary);
                } else if self.held.insert(key) {
                    self.emit(Action::Press, key, summary);
                }
            } else if !options.tap && self.held.remove(&key) {
                self.emit(Action::Release, key, summary);
            }
        }

        Outcome::Completed
    }

    /// Release every held key.
    fn all_keys_up(&mut self, summary: &mut PlaybackSummary) {
        let keys = std::mem::take(&mut self.held);
        if !keys.is_empty() {
            log::debug!("Releasing {} held key(s)", keys.len());
        }
        for key in keys {
            self.emit(Action::Release, key, summary);
        }
    }

    fn emit(&mut self, action: Action, key: Key, summary: &mut PlaybackSummary) {
        let result = match action {
            Action::Press => self.actuator.press(key),
            Action::Release => self.actuator.release(key),
            Action::Tap => self.actuator.tap(key),
        };
        match result {
            Ok(()) => match action {
                Action::Press => summary.presses += 1,
                Action::Release => summary.releases += 1,
                Action::Tap => summary.taps += 1,
            },
            Err(e) => {
                log::warn!("Key {action} error for {key}: {e:#}");
                summary.failures += 1;
            }
        }
    }
}
