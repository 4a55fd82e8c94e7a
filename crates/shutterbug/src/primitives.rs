//! Small value types shared across the control core.

use std::fmt;

/// Color-effects mode for a session. Geometry is identical in both modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorMode {
    Color,
    Monochrome,
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorMode::Color => write!(f, "color"),
            ColorMode::Monochrome => write!(f, "monochrome"),
        }
    }
}

/// The three momentary inputs on the booth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonId {
    Shutdown,
    StartColor,
    StartMono,
}

impl fmt::Display for ButtonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ButtonId::Shutdown => write!(f, "shutdown"),
            ButtonId::StartColor => write!(f, "start-color"),
            ButtonId::StartMono => write!(f, "start-bw"),
        }
    }
}

/// How the booth leaves service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminationKind {
    /// Close the booth process; the host stays up.
    Quit,
    /// Close the booth and power the host off.
    PowerOff,
}

impl fmt::Display for TerminationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationKind::Quit => write!(f, "quit"),
            TerminationKind::PowerOff => write!(f, "power-off"),
        }
    }
}
