//! Simulated hardware
//!
//! In-memory stand-ins for every collaborator, used by the test suite and by
//! `shutterbug run --simulate`. All of them append to a shared [`SimLog`] so
//! the order of hardware actions can be inspected afterwards.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};
use image::{DynamicImage, Rgb, RgbImage};

use boothconf::BoothConfig;

use crate::error::HardwareError;
use crate::hardware::{
    BoothRig, Camera, CountdownDisplay, InputLine, OutputLine, PowerControl, Printer,
};
use crate::primitives::ColorMode;
use crate::scheduler::Clock;

/// One observable hardware action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimEvent {
    LineSet { name: String, on: bool },
    ColorMode(ColorMode),
    PreviewStarted,
    PreviewStopped,
    Exposure { index: u32 },
    Countdown { shot: u32, remaining: u32 },
    CountdownCleared,
    Printed(PathBuf),
    PowerOff,
    CameraClosed,
}

/// Shared, append-only record of simulated hardware actions.
#[derive(Debug, Clone, Default)]
pub struct SimLog(Rc<RefCell<Vec<SimEvent>>>);

impl SimLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: SimEvent) {
        self.0.borrow_mut().push(event);
    }

    pub fn events(&self) -> Vec<SimEvent> {
        self.0.borrow().clone()
    }

    pub fn count(&self, pred: impl Fn(&SimEvent) -> bool) -> usize {
        self.0.borrow().iter().filter(|e| pred(e)).count()
    }

    pub fn printed(&self) -> Vec<PathBuf> {
        self.0
            .borrow()
            .iter()
            .filter_map(|e| match e {
                SimEvent::Printed(path) => Some(path.clone()),
                _ => None,
            })
            .collect()
    }
}

/// A line whose level lives in a shared cell.
///
/// As an input, tests flip the level through a cloned handle. As an output,
/// every `set` is logged and the level can be read back.
#[derive(Debug, Clone)]
pub struct SimLine {
    name: String,
    level: Rc<Cell<bool>>,
    log: Option<SimLog>,
}

impl SimLine {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: Rc::new(Cell::new(false)),
            log: None,
        }
    }

    pub fn logged(name: impl Into<String>, log: &SimLog) -> Self {
        Self {
            log: Some(log.clone()),
            ..Self::new(name)
        }
    }

    pub fn level(&self) -> bool {
        self.level.get()
    }

    pub fn press(&self) {
        self.level.set(true);
    }

    pub fn release(&self) {
        self.level.set(false);
    }
}

impl InputLine for SimLine {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self) -> Result<bool, HardwareError> {
        Ok(self.level.get())
    }
}

impl OutputLine for SimLine {
    fn name(&self) -> &str {
        &self.name
    }

    fn set(&mut self, on: bool) -> Result<(), HardwareError> {
        self.level.set(on);
        if let Some(log) = &self.log {
            log.push(SimEvent::LineSet {
                name: self.name.clone(),
                on,
            });
        }
        Ok(())
    }
}

/// An input that replays one level per read, then stays low.
#[derive(Debug, Clone)]
pub struct ScriptedLine {
    name: String,
    script: VecDeque<bool>,
}

impl ScriptedLine {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: VecDeque::new(),
        }
    }

    /// Released for `ticks` reads.
    pub fn idle(mut self, ticks: u32) -> Self {
        self.script.extend(std::iter::repeat(false).take(ticks as usize));
        self
    }

    /// Held for `ticks` reads.
    pub fn hold(mut self, ticks: u32) -> Self {
        self.script.extend(std::iter::repeat(true).take(ticks as usize));
        self
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl InputLine for ScriptedLine {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self) -> Result<bool, HardwareError> {
        Ok(self.script.pop_front().unwrap_or(false))
    }
}

/// Camera that renders a deterministic gradient per exposure.
#[derive(Debug, Clone)]
pub struct SyntheticCamera {
    log: SimLog,
    mode: ColorMode,
    exposures: u32,
    fail_on: Option<u32>,
}

impl SyntheticCamera {
    pub fn new(log: &SimLog) -> Self {
        Self {
            log: log.clone(),
            mode: ColorMode::Color,
            exposures: 0,
            fail_on: None,
        }
    }

    /// Fail the `n`th exposure (1-based, counted across sessions).
    pub fn failing_on(mut self, n: u32) -> Self {
        self.fail_on = Some(n);
        self
    }

    /// The frame the `n`th exposure produces.
    pub fn frame(n: u32, width: u32, height: u32, mode: ColorMode) -> DynamicImage {
        let tint = (n.wrapping_mul(61) % 256) as u8;
        let frame = RgbImage::from_fn(width, height, |x, y| {
            Rgb([
                (x * 255 / width.max(1)) as u8,
                (y * 255 / height.max(1)) as u8,
                tint,
            ])
        });
        let frame = DynamicImage::ImageRgb8(frame);
        match mode {
            ColorMode::Color => frame,
            ColorMode::Monochrome => DynamicImage::ImageRgb8(frame.grayscale().to_rgb8()),
        }
    }
}

impl Camera for SyntheticCamera {
    fn set_color_mode(&mut self, mode: ColorMode) -> Result<(), HardwareError> {
        self.mode = mode;
        self.log.push(SimEvent::ColorMode(mode));
        Ok(())
    }

    fn start_preview(&mut self) -> Result<(), HardwareError> {
        self.log.push(SimEvent::PreviewStarted);
        Ok(())
    }

    fn stop_preview(&mut self) -> Result<(), HardwareError> {
        self.log.push(SimEvent::PreviewStopped);
        Ok(())
    }

    fn capture(&mut self, width: u32, height: u32) -> Result<DynamicImage, HardwareError> {
        self.exposures += 1;
        if self.fail_on == Some(self.exposures) {
            return Err(HardwareError::Simulated(format!(
                "exposure {} failed",
                self.exposures
            )));
        }
        self.log.push(SimEvent::Exposure {
            index: self.exposures,
        });
        Ok(Self::frame(self.exposures, width, height, self.mode))
    }

    fn close(&mut self) {
        self.log.push(SimEvent::CameraClosed);
    }
}

/// Countdown readout that records every update.
#[derive(Debug, Clone)]
pub struct RecordingCountdown {
    log: SimLog,
}

impl RecordingCountdown {
    pub fn new(log: &SimLog) -> Self {
        Self { log: log.clone() }
    }
}

impl CountdownDisplay for RecordingCountdown {
    fn show(&mut self, shot: u32, remaining_secs: u32) {
        self.log.push(SimEvent::Countdown {
            shot,
            remaining: remaining_secs,
        });
    }

    fn clear(&mut self) {
        self.log.push(SimEvent::CountdownCleared);
    }
}

/// Printer that records dispatched paths, optionally failing every call.
#[derive(Debug, Clone)]
pub struct RecordingPrinter {
    log: SimLog,
    fail: bool,
}

impl RecordingPrinter {
    pub fn new(log: &SimLog) -> Self {
        Self {
            log: log.clone(),
            fail: false,
        }
    }

    pub fn failing(log: &SimLog) -> Self {
        Self {
            log: log.clone(),
            fail: true,
        }
    }
}

impl Printer for RecordingPrinter {
    fn dispatch(&mut self, path: &Path) -> Result<(), HardwareError> {
        self.log.push(SimEvent::Printed(path.to_path_buf()));
        if self.fail {
            return Err(HardwareError::Simulated("printer offline".to_string()));
        }
        Ok(())
    }
}

/// Power control that only records the request.
#[derive(Debug, Clone)]
pub struct RecordingPower {
    log: SimLog,
}

impl RecordingPower {
    pub fn new(log: &SimLog) -> Self {
        Self { log: log.clone() }
    }
}

impl PowerControl for RecordingPower {
    fn power_off(&mut self) -> Result<(), HardwareError> {
        self.log.push(SimEvent::PowerOff);
        Ok(())
    }
}

/// Clock that never blocks: `sleep` advances simulated time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<DateTime<Local>>>,
    slept: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn at(now: DateTime<Local>) -> Self {
        Self {
            now: Rc::new(Cell::new(now)),
            slept: Rc::new(Cell::new(Duration::ZERO)),
        }
    }

    /// A fixed, unambiguous local timestamp: 2024-06-01 14:30:15.
    pub fn fixed() -> Self {
        let now = Local
            .with_ymd_and_hms(2024, 6, 1, 14, 30, 15)
            .earliest()
            .unwrap_or_else(Local::now);
        Self::at(now)
    }

    /// Total simulated time spent sleeping.
    pub fn slept(&self) -> Duration {
        self.slept.get()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.slept.set(self.slept.get() + duration);
        if let Ok(step) = chrono::Duration::from_std(duration) {
            self.now.set(self.now.get() + step);
        }
    }
}

/// Lines the caller can drive directly.
#[derive(Debug, Clone)]
pub struct SimButtons {
    pub shutdown: SimLine,
    pub start_color: SimLine,
    pub start_mono: SimLine,
}

/// A complete simulated rig with directly driven buttons.
///
/// Returns the rig, the button handles, and the illumination line handle.
pub fn interactive_rig(log: &SimLog, camera: SyntheticCamera) -> (BoothRig, SimButtons, SimLine) {
    let buttons = SimButtons {
        shutdown: SimLine::new("shutdown"),
        start_color: SimLine::new("start-color"),
        start_mono: SimLine::new("start-bw"),
    };
    let light = SimLine::logged("light", log);

    let rig = BoothRig {
        shutdown: Box::new(buttons.shutdown.clone()),
        start_color: Box::new(buttons.start_color.clone()),
        start_mono: Box::new(buttons.start_mono.clone()),
        light: Box::new(light.clone()),
        warning_light: Some(Box::new(SimLine::logged("warning", log))),
        camera: Box::new(camera),
        countdown: Box::new(RecordingCountdown::new(log)),
        printer: Box::new(RecordingPrinter::new(log)),
        power: Box::new(RecordingPower::new(log)),
    };

    (rig, buttons, light)
}

/// A rig that plays a short demo: one color session, one monochrome
/// session, then a long enough shutdown hold to quit.
pub fn demo_rig(config: &BoothConfig, log: &SimLog) -> BoothRig {
    let quit_hold = config.booth.input.quit_ticks;

    BoothRig {
        shutdown: Box::new(ScriptedLine::new("shutdown").idle(30).hold(quit_hold)),
        start_color: Box::new(ScriptedLine::new("start-color").idle(5).hold(1)),
        start_mono: Box::new(ScriptedLine::new("start-bw").idle(15).hold(1)),
        light: Box::new(SimLine::logged("light", log)),
        warning_light: None,
        camera: Box::new(SyntheticCamera::new(log)),
        countdown: Box::new(crate::hardware::LoggingCountdown),
        printer: Box::new(RecordingPrinter::new(log)),
        power: Box::new(RecordingPower::new(log)),
    }
}
