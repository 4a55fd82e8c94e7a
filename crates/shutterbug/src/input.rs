//! Input debouncer
//!
//! Turns per-tick raw line levels into booth events. The shutdown button is
//! the only debounced channel: it counts consecutive held ticks and decides
//! on *release* whether the press was a tap, a quit, or a power-off. Its
//! first rising edge is reported on its own so the quota warning can be
//! silenced by a tap regardless of how the press ends.
//!
//! The start buttons are plain levels. Session start is gated on the
//! controller being idle, so an extra tick of "pressed" is harmless.

use tracing::{debug, info, warn};

use boothconf::InputConfig;

use crate::hardware::InputLine;
use crate::primitives::{ButtonId, ColorMode, TerminationKind};

/// Action derived from a channel during one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    /// Rising edge of the shutdown button.
    ShutdownPressed,
    QuitRequested,
    ShutdownRequested,
    /// A start button is asserted this tick.
    StartRequested(ColorMode),
}

/// One physical button and its hold state.
pub struct ButtonChannel {
    id: ButtonId,
    line: Box<dyn InputLine>,
    level: bool,
    held_ticks: u32,
    pending: Option<ButtonAction>,
}

impl ButtonChannel {
    pub fn new(id: ButtonId, line: Box<dyn InputLine>) -> Self {
        Self {
            id,
            line,
            level: false,
            held_ticks: 0,
            pending: None,
        }
    }

    pub fn id(&self) -> ButtonId {
        self.id
    }

    /// Level seen on the last sample.
    pub fn level(&self) -> bool {
        self.level
    }

    /// Consecutive ticks the button has been held, including this one.
    pub fn held_ticks(&self) -> u32 {
        self.held_ticks
    }

    pub fn pending(&self) -> Option<ButtonAction> {
        self.pending
    }

    /// Read the line, update the hold counter, and return the previous level.
    fn read_level(&mut self) -> bool {
        let previous = self.level;
        self.level = match self.line.read() {
            Ok(level) => level,
            Err(e) => {
                warn!("{} line read failed, treating as released: {}", self.id, e);
                false
            }
        };

        if self.level {
            self.held_ticks = self.held_ticks.saturating_add(1);
        }
        previous
    }
}

impl std::fmt::Debug for ButtonChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ButtonChannel")
            .field("id", &self.id)
            .field("line", &self.line.name())
            .field("level", &self.level)
            .field("held_ticks", &self.held_ticks)
            .field("pending", &self.pending)
            .finish()
    }
}

/// Everything the controller needs from one input sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickInput {
    /// The shutdown button went down this tick.
    pub shutdown_pressed: bool,

    /// The shutdown button was released after a long enough hold.
    pub termination: Option<TerminationKind>,

    /// A start button is asserted; color wins if both are.
    pub start: Option<ColorMode>,
}

/// Samples the three booth buttons once per tick.
#[derive(Debug)]
pub struct Debouncer {
    quit_ticks: u32,
    shutdown_ticks: u32,
    shutdown: ButtonChannel,
    start_color: ButtonChannel,
    start_mono: ButtonChannel,
}

impl Debouncer {
    pub fn new(
        config: &InputConfig,
        shutdown: Box<dyn InputLine>,
        start_color: Box<dyn InputLine>,
        start_mono: Box<dyn InputLine>,
    ) -> Self {
        Self {
            quit_ticks: config.quit_ticks,
            shutdown_ticks: config.shutdown_ticks,
            shutdown: ButtonChannel::new(ButtonId::Shutdown, shutdown),
            start_color: ButtonChannel::new(ButtonId::StartColor, start_color),
            start_mono: ButtonChannel::new(ButtonId::StartMono, start_mono),
        }
    }

    pub fn channel(&self, id: ButtonId) -> &ButtonChannel {
        match id {
            ButtonId::Shutdown => &self.shutdown,
            ButtonId::StartColor => &self.start_color,
            ButtonId::StartMono => &self.start_mono,
        }
    }

    /// Sample every line once and derive this tick's input.
    pub fn sample(&mut self, tick: u64) -> TickInput {
        let mut input = TickInput::default();

        self.sample_shutdown(tick);
        match self.shutdown.pending {
            Some(ButtonAction::ShutdownPressed) => input.shutdown_pressed = true,
            Some(ButtonAction::QuitRequested) => input.termination = Some(TerminationKind::Quit),
            Some(ButtonAction::ShutdownRequested) => {
                input.termination = Some(TerminationKind::PowerOff)
            }
            _ => {}
        }

        for channel in [&mut self.start_color, &mut self.start_mono] {
            channel.read_level();
            if !channel.level {
                channel.held_ticks = 0;
            }
            let mode = match channel.id() {
                ButtonId::StartMono => ColorMode::Monochrome,
                _ => ColorMode::Color,
            };
            channel.pending = channel.level.then_some(ButtonAction::StartRequested(mode));
        }

        input.start = if self.start_color.level {
            Some(ColorMode::Color)
        } else if self.start_mono.level {
            Some(ColorMode::Monochrome)
        } else {
            None
        };

        input
    }

    fn sample_shutdown(&mut self, tick: u64) {
        let channel = &mut self.shutdown;
        let was_down = channel.level;
        let held_before = channel.held_ticks;
        channel.read_level();
        channel.pending = None;

        match (was_down, channel.level) {
            (false, true) => {
                debug!("tick {}: shutdown button down", tick);
                channel.pending = Some(ButtonAction::ShutdownPressed);
            }
            (true, false) => {
                channel.held_ticks = 0;
                channel.pending = if held_before >= self.shutdown_ticks {
                    Some(ButtonAction::ShutdownRequested)
                } else if held_before >= self.quit_ticks {
                    Some(ButtonAction::QuitRequested)
                } else {
                    None
                };
                match channel.pending {
                    Some(action) => info!(
                        "tick {}: shutdown button released after {} ticks: {:?}",
                        tick, held_before, action
                    ),
                    None => debug!(
                        "tick {}: shutdown button tapped ({} ticks)",
                        tick, held_before
                    ),
                }
            }
            _ => {}
        }
    }
}
