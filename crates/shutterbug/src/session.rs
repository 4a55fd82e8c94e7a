//! Session controller
//!
//! The booth's top-level state machine. Each tick it takes one input
//! sample and, in order:
//!
//! 1. a shutdown-button press edge clears the quota warning
//! 2. a quit or power-off request terminates the booth
//! 3. a start button, while idle, runs one whole capture, compose and
//!    print cycle before returning
//!
//! ```text
//!            start (no warning)
//!   Idle ───────────────────────▶ Running(mode)
//!    ▲  ▲                           │
//!    │  └──────── cycle done ───────┤
//!    │                              │ quota reached
//!    │  shutdown press              ▼
//!    └─────────────────────────── Warning
//!
//!   Idle | Warning ── quit / power-off ──▶ Terminating(kind)
//! ```
//!
//! The controller owns every hardware resource for the life of the process.

use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use tracing::{error, info, warn};

use boothconf::BoothConfig;

use crate::capture::{CaptureRig, CaptureSequencer};
use crate::error::SessionError;
use crate::hardware::{BoothRig, Camera, CountdownDisplay, OutputLine, PowerControl};
use crate::input::Debouncer;
use crate::layout::{load_background, LayoutEngine};
use crate::primitives::{ColorMode, TerminationKind};
use crate::quota::{PrintOutcome, QuotaTracker};
use crate::scheduler::Clock;
use crate::storage::{write_atomic, SessionStamp, SessionStorage};

/// Controller state. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running(ColorMode),
    Warning,
    Terminating(TerminationKind),
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Running(mode) => write!(f, "running ({})", mode),
            SessionState::Warning => write!(f, "warning"),
            SessionState::Terminating(kind) => write!(f, "terminating ({})", kind),
        }
    }
}

/// What the scheduler should do after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Terminated(TerminationKind),
}

pub struct SessionController {
    config: BoothConfig,
    clock: Rc<dyn Clock>,
    state: SessionState,
    ticks: u64,

    debouncer: Debouncer,
    quota: QuotaTracker,
    sequencer: CaptureSequencer,
    engine: LayoutEngine,
    storage: SessionStorage,

    light: Box<dyn OutputLine>,
    warning_light: Option<Box<dyn OutputLine>>,
    warning_lit: bool,
    camera: Box<dyn Camera>,
    countdown: Box<dyn CountdownDisplay>,
    power: Box<dyn PowerControl>,
}

impl SessionController {
    pub fn new(config: BoothConfig, rig: BoothRig, clock: Rc<dyn Clock>) -> Self {
        let BoothRig {
            shutdown,
            start_color,
            start_mono,
            light,
            warning_light,
            camera,
            countdown,
            printer,
            power,
        } = rig;

        let booth = &config.booth;
        let storage = SessionStorage::new(&config.infra.paths, booth.session.image_extension.as_str());
        let debouncer = Debouncer::new(&booth.input, shutdown, start_color, start_mono);
        let quota = QuotaTracker::new(
            booth.quota.print_quota,
            booth.session.printing_enabled(),
            printer,
        );
        let sequencer =
            CaptureSequencer::new(booth.session.clone(), booth.layout.clone(), storage.clone());
        let engine = LayoutEngine::new(booth.layout.clone(), booth.session.shot_count);

        info!(
            "booth ready: {} shots per session, quota {}, printing {}",
            booth.session.shot_count,
            booth.quota.print_quota,
            if quota.printing_enabled() { "on" } else { "off" }
        );

        Self {
            config,
            clock,
            state: SessionState::Idle,
            ticks: 0,
            debouncer,
            quota,
            sequencer,
            engine,
            storage,
            light,
            warning_light,
            warning_lit: false,
            camera,
            countdown,
            power,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn quota(&self) -> &QuotaTracker {
        &self.quota
    }

    pub fn config(&self) -> &BoothConfig {
        &self.config
    }

    /// Ticks taken so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Sample inputs once and act on them.
    pub fn tick(&mut self) -> TickOutcome {
        if let SessionState::Terminating(kind) = self.state {
            return TickOutcome::Terminated(kind);
        }

        let input = self.debouncer.sample(self.ticks);
        self.ticks += 1;

        if input.shutdown_pressed && self.quota.clear_warning() {
            self.transition(SessionState::Idle);
            self.sync_warning_light();
        }

        if let Some(kind) = input.termination {
            self.terminate(kind);
            return TickOutcome::Terminated(kind);
        }

        if let (SessionState::Idle, Some(mode)) = (self.state, input.start) {
            self.transition(SessionState::Running(mode));
            match self.run_cycle(mode) {
                Ok(path) => info!("session complete: {}", path.display()),
                Err(e) => error!("session aborted: {}", e),
            }
            let next = if self.quota.warning() {
                SessionState::Warning
            } else {
                SessionState::Idle
            };
            self.transition(next);
            self.sync_warning_light();
        }

        TickOutcome::Continue
    }

    /// Capture, compose, write and print one session.
    ///
    /// Returns the composite path. Nothing is printed or counted on error.
    pub fn run_cycle(&mut self, mode: ColorMode) -> Result<PathBuf, SessionError> {
        let stamp = SessionStamp::from_datetime(&self.clock.now());
        let background = load_background(
            &self.config.infra.paths.background,
            &self.config.booth.layout,
        )?;

        let mut rig = CaptureRig {
            camera: self.camera.as_mut(),
            light: self.light.as_mut(),
            countdown: self.countdown.as_mut(),
        };
        let shots = self.sequencer.capture_session(
            self.engine.shot_count(),
            mode,
            &mut rig,
            self.clock.as_ref(),
            &stamp,
        )?;

        let composite =
            self.engine
                .compose(&shots, &background, self.storage.composite_path(&stamp))?;
        drop(shots);

        let path = composite.output_path.clone();
        self.storage.ensure_parent(&path)?;
        let write_error = |source| SessionError::CompositeWrite {
            path: path.clone(),
            source,
        };
        let bytes = composite.encode_png().map_err(write_error)?;
        write_atomic(&path, &bytes).map_err(|e| write_error(image::ImageError::IoError(e)))?;
        drop(composite);

        if let PrintOutcome::Recorded {
            count,
            warning_raised,
        } = self.quota.record_print(&path)
        {
            info!("print {} dispatched (warning raised: {})", count, warning_raised);
        }

        Ok(path)
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            info!("state {} -> {}", self.state, next);
            self.state = next;
        }
    }

    fn sync_warning_light(&mut self) {
        let wanted = self.quota.warning();
        if wanted == self.warning_lit {
            return;
        }
        if let Some(line) = self.warning_light.as_mut() {
            if let Err(e) = line.set(wanted) {
                warn!("failed to set warning light: {}", e);
                return;
            }
        }
        self.warning_lit = wanted;
    }

    /// Release hardware, then close or power off.
    fn terminate(&mut self, kind: TerminationKind) {
        self.transition(SessionState::Terminating(kind));

        if let Err(e) = self.light.set(false) {
            warn!("failed to switch light off: {}", e);
        }
        if let Some(line) = self.warning_light.as_mut() {
            if let Err(e) = line.set(false) {
                warn!("failed to switch warning light off: {}", e);
            }
        }
        self.camera.close();

        match kind {
            TerminationKind::Quit => info!("booth closed"),
            TerminationKind::PowerOff => {
                info!("powering off");
                if let Err(e) = self.power.power_off() {
                    error!("power-off failed: {}", e);
                }
            }
        }
    }
}

impl fmt::Debug for SessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionController")
            .field("state", &self.state)
            .field("ticks", &self.ticks)
            .field("quota", &self.quota)
            .field("debouncer", &self.debouncer)
            .finish_non_exhaustive()
    }
}
