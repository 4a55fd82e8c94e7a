//! Integration tests for whole booth sessions
//!
//! Runs the controller against simulated hardware, a manual clock and a temp
//! directory, then checks what landed on disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use boothconf::BoothConfig;
use shutterbug::hardware::sim::{
    demo_rig, interactive_rig, ManualClock, SimEvent, SimLog, SyntheticCamera,
};
use shutterbug::{
    make_thumbnail, write_template, ColorMode, SessionController, SessionState, TerminationKind,
    TickOutcome, TickScheduler,
};
use tempfile::TempDir;

fn config(root: &Path) -> BoothConfig {
    let mut config = BoothConfig::default();
    config.infra.paths.captured_dir = root.join("captured");
    config.infra.paths.final_dir = root.join("final");
    config.infra.paths.background = root.join("background.png");
    config.booth.session.test_mode = false;
    config.booth.session.capture_width = 320;
    config.booth.session.capture_height = 240;
    config
}

fn with_background(config: &BoothConfig) {
    write_template(&config.booth.layout, &config.infra.paths.background).unwrap();
}

fn files_under(dir: PathBuf) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(&dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries.map(|e| e.unwrap().path()).collect();
    files.sort();
    files
}

#[test]
fn test_session_writes_shots_and_one_composite() {
    let root = TempDir::new().unwrap();
    let config = config(root.path());
    with_background(&config);

    let log = SimLog::new();
    let (rig, buttons, light) = interactive_rig(&log, SyntheticCamera::new(&log));
    let clock = Rc::new(ManualClock::fixed());
    let mut controller = SessionController::new(config.clone(), rig, clock.clone());

    buttons.start_color.press();
    assert_eq!(controller.tick(), TickOutcome::Continue);
    buttons.start_color.release();

    let shots = files_under(root.path().join("captured/2024-06-01"));
    let names: Vec<_> = shots
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec!["143015_1.jpg", "143015_2.jpg", "143015_3.jpg", "143015_4.jpg"]
    );

    let composites = files_under(root.path().join("final/2024-06-01"));
    assert_eq!(composites, vec![root.path().join("final/2024-06-01/143015.png")]);
    assert_eq!(log.printed(), composites);

    let print = image::open(&composites[0]).unwrap().to_rgba8();
    assert_eq!(print.dimensions(), (960, 1520));

    // Shot 1 sits top left and top right; shot 4 in the last row.
    let first = make_thumbnail(
        &SyntheticCamera::frame(1, 320, 240, ColorMode::Color),
        &config.booth.layout,
    );
    let last = make_thumbnail(
        &SyntheticCamera::frame(4, 320, 240, ColorMode::Color),
        &config.booth.layout,
    );
    assert_eq!(print.get_pixel(10, 35), first.get_pixel(0, 0));
    assert_eq!(print.get_pixel(490 + 469, 35 + 321), first.get_pixel(469, 321));
    assert_eq!(print.get_pixel(10, 1031), last.get_pixel(0, 0));

    assert_eq!(controller.state(), SessionState::Idle);
    assert_eq!(controller.quota().count(), 1);
    assert!(!light.level());
    // 4 x (5 x 1s countdown + 500ms pause)
    assert_eq!(clock.slept(), Duration::from_secs(22));
}

#[test]
fn test_capture_failure_leaves_no_composite_and_no_print() {
    let root = TempDir::new().unwrap();
    let config = config(root.path());
    with_background(&config);

    let log = SimLog::new();
    let (rig, buttons, light) = interactive_rig(&log, SyntheticCamera::new(&log).failing_on(3));
    let mut controller = SessionController::new(config, rig, Rc::new(ManualClock::fixed()));

    buttons.start_mono.press();
    assert_eq!(controller.tick(), TickOutcome::Continue);
    buttons.start_mono.release();

    assert_eq!(files_under(root.path().join("captured/2024-06-01")).len(), 2);
    assert!(files_under(root.path().join("final/2024-06-01")).is_empty());
    assert!(log.printed().is_empty());
    assert_eq!(controller.quota().count(), 0);
    assert_eq!(controller.state(), SessionState::Idle);
    assert!(!light.level());
    assert_eq!(log.events().last(), Some(&SimEvent::LineSet {
        name: "light".to_string(),
        on: false
    }));
}

#[test]
fn test_composite_write_failure_prints_nothing() {
    let root = TempDir::new().unwrap();
    let config = config(root.path());
    with_background(&config);
    // A file where the final directory should go.
    fs::write(root.path().join("final"), b"not a dir").unwrap();

    let log = SimLog::new();
    let (rig, buttons, light) = interactive_rig(&log, SyntheticCamera::new(&log));
    let mut controller = SessionController::new(config, rig, Rc::new(ManualClock::fixed()));

    buttons.start_color.press();
    assert_eq!(controller.tick(), TickOutcome::Continue);
    buttons.start_color.release();

    assert_eq!(files_under(root.path().join("captured/2024-06-01")).len(), 4);
    assert!(log.printed().is_empty());
    assert_eq!(controller.quota().count(), 0);
    assert_eq!(controller.state(), SessionState::Idle);
    assert!(!light.level());
}

#[test]
fn test_failed_composite_rename_leaves_no_partial_file() {
    let root = TempDir::new().unwrap();
    let config = config(root.path());
    with_background(&config);
    // The composite path is taken by a directory, so only the rename fails.
    let taken = root.path().join("final/2024-06-01/143015.png");
    fs::create_dir_all(&taken).unwrap();

    let log = SimLog::new();
    let (rig, buttons, _light) = interactive_rig(&log, SyntheticCamera::new(&log));
    let mut controller = SessionController::new(config, rig, Rc::new(ManualClock::fixed()));

    buttons.start_color.press();
    controller.tick();
    buttons.start_color.release();

    assert_eq!(files_under(root.path().join("final/2024-06-01")), vec![taken]);
    assert!(log.printed().is_empty());
    assert_eq!(controller.quota().count(), 0);
    assert_eq!(controller.state(), SessionState::Idle);
}

#[test]
fn test_missing_background_returns_to_idle_without_capturing() {
    let root = TempDir::new().unwrap();
    let config = config(root.path());

    let log = SimLog::new();
    let (rig, buttons, _light) = interactive_rig(&log, SyntheticCamera::new(&log));
    let mut controller = SessionController::new(config.clone(), rig, Rc::new(ManualClock::fixed()));

    buttons.start_color.press();
    assert_eq!(controller.tick(), TickOutcome::Continue);
    buttons.start_color.release();

    assert_eq!(controller.state(), SessionState::Idle);
    assert_eq!(log.count(|e| matches!(e, SimEvent::Exposure { .. })), 0);
    assert!(!root.path().join("captured").exists());

    // The booth stays serviceable once the asset is back.
    with_background(&config);
    buttons.start_color.press();
    controller.tick();
    assert_eq!(controller.quota().count(), 1);
}

#[test]
fn test_second_session_after_failure_succeeds() {
    let root = TempDir::new().unwrap();
    let config = config(root.path());
    with_background(&config);

    let log = SimLog::new();
    let (rig, buttons, _light) = interactive_rig(&log, SyntheticCamera::new(&log).failing_on(1));
    let clock = Rc::new(ManualClock::fixed());
    let mut controller = SessionController::new(config, rig, clock);

    buttons.start_color.press();
    controller.tick();
    controller.tick();
    buttons.start_color.release();

    assert_eq!(controller.quota().count(), 1);
    assert_eq!(files_under(root.path().join("final/2024-06-01")).len(), 1);
}

#[test]
fn test_scheduled_demo_runs_two_sessions_then_quits() {
    let root = TempDir::new().unwrap();
    let config = config(root.path());
    with_background(&config);

    let log = SimLog::new();
    let rig = demo_rig(&config, &log);
    let clock = Rc::new(ManualClock::fixed());
    let scheduler = TickScheduler::new(config.booth.input.tick_period(), clock.clone())
        .with_max_ticks(500);
    let mut controller = SessionController::new(config.clone(), rig, clock);

    let summary = scheduler.run(&mut controller);

    let quit_ticks = u64::from(config.booth.input.quit_ticks);
    assert_eq!(summary.termination, Some(TerminationKind::Quit));
    assert_eq!(summary.ticks, 30 + quit_ticks + 1);
    assert_eq!(log.printed().len(), 2);
    assert_eq!(files_under(root.path().join("captured/2024-06-01")).len(), 8);
    assert_eq!(log.count(|e| *e == SimEvent::PowerOff), 0);
    assert_eq!(log.count(|e| *e == SimEvent::CameraClosed), 1);
    assert_eq!(
        controller.state(),
        SessionState::Terminating(TerminationKind::Quit)
    );
}

#[test]
fn test_quota_warning_recurs_across_sessions() {
    let root = TempDir::new().unwrap();
    let mut config = config(root.path());
    config.booth.session.shot_count = 1;
    config.booth.quota.print_quota = 2;
    with_background(&config);

    let log = SimLog::new();
    let (rig, buttons, _light) = interactive_rig(&log, SyntheticCamera::new(&log));
    let mut controller = SessionController::new(config, rig, Rc::new(ManualClock::fixed()));

    let session = |controller: &mut SessionController| {
        buttons.start_color.press();
        controller.tick();
        buttons.start_color.release();
        controller.tick();
    };
    let tap = |controller: &mut SessionController| {
        buttons.shutdown.press();
        controller.tick();
        buttons.shutdown.release();
        controller.tick();
    };

    session(&mut controller);
    assert_eq!(controller.state(), SessionState::Idle);
    session(&mut controller);
    assert_eq!(controller.state(), SessionState::Warning);

    session(&mut controller);
    assert_eq!(controller.quota().count(), 2, "blocked while warning");

    tap(&mut controller);
    assert_eq!(controller.state(), SessionState::Idle);
    session(&mut controller);
    session(&mut controller);
    assert_eq!(controller.quota().count(), 4);
    assert_eq!(controller.state(), SessionState::Warning);
}
