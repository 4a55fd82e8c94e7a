//! Shutterbug: Photo Booth Control Core
//!
//! Turns three momentary buttons into timed camera sessions, lays the shots
//! out on a print, and keeps count of prints against the paper and ink
//! quota. Everything runs on one control thread driven by a fixed-period
//! tick:
//!
//! - **Input** ([`input`]): debounced shutdown button with quit and
//!   power-off hold thresholds, plain start buttons
//! - **Session** ([`session`]): the idle/running/warning/terminating state
//!   machine that owns all hardware
//! - **Capture** ([`capture`]): countdown, illumination and exposures
//! - **Layout** ([`layout`]): two-column thumbnail composite on a fixed
//!   background
//! - **Quota** ([`quota`]): print counter with a recurring operator warning
//!
//! Hardware is reached only through the traits in [`hardware`], which ships
//! sysfs GPIO, external-command and simulated implementations.

pub mod capture;
pub mod error;
pub mod hardware;
pub mod input;
pub mod layout;
pub mod primitives;
pub mod quota;
pub mod scheduler;
pub mod session;
pub mod storage;

pub use capture::{make_thumbnail, CaptureRig, CaptureSequencer, CaptureShot};
pub use error::{
    CaptureError, FilesystemError, HardwareError, LayoutError, ResourceLoadError, SessionError,
};
pub use hardware::{
    BoothRig, Camera, CountdownDisplay, GracefulClose, InputLine, LoggingCountdown, NoPrinter,
    OutputLine, PowerControl, Printer,
};
pub use input::{ButtonAction, ButtonChannel, Debouncer, TickInput};
pub use layout::{
    load_background, write_template, Background, Column, CompositeImage, LayoutEngine, Placement,
};
pub use primitives::*;
pub use quota::{PrintOutcome, QuotaTracker};
pub use scheduler::{Clock, RunSummary, SystemClock, TickScheduler};
pub use session::{SessionController, SessionState, TickOutcome};
pub use storage::{SessionStamp, SessionStorage};
