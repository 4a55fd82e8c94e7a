//! shutterbug - photo booth control daemon
//!
//! Subcommands:
//! - `shutterbug run` - Run the booth until a quit or power-off hold
//! - `shutterbug config` - Print the effective configuration and its sources
//! - `shutterbug layout` - Print thumbnail placements, optionally write a
//!   blank background template

use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use boothconf::{BoothConfig, ConfigSources};
use shutterbug::hardware::command::{CommandCamera, CommandPower, CommandPrinter};
use shutterbug::hardware::sim::{demo_rig, SimLog};
use shutterbug::hardware::sysfs::{SysfsInputLine, SysfsOutputLine};
use shutterbug::{
    write_template, BoothRig, Clock, GracefulClose, LayoutEngine, LoggingCountdown, NoPrinter,
    OutputLine, SessionController, SystemClock, TickScheduler,
};

#[derive(Parser)]
#[command(name = "shutterbug")]
#[command(about = "Photo booth control daemon")]
#[command(version)]
struct Cli {
    /// Config file to use instead of ./shutterbug.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the booth
    Run {
        /// Use simulated buttons and camera (plays a short scripted demo)
        #[arg(long)]
        simulate: bool,

        /// Force test mode: no printing, power-off only closes the booth
        #[arg(long)]
        test_mode: bool,

        /// Stop after this many ticks
        #[arg(long)]
        max_ticks: Option<u64>,
    },

    /// Print the effective configuration and where it came from
    Config,

    /// Print thumbnail placements for the configured print
    Layout {
        /// Write a blank canvas of the print size to this path
        #[arg(long)]
        write_template: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, sources) = BoothConfig::load_with_sources_from(cli.config.as_deref())
        .context("Failed to load configuration")?;

    init_tracing(&config.infra.telemetry.log_level);
    for file in &sources.files {
        info!("config loaded from {}", file.display());
    }

    match cli.command {
        Commands::Run {
            simulate,
            test_mode,
            max_ticks,
        } => run(config, simulate, test_mode, max_ticks),
        Commands::Config => print_config(&config, &sources),
        Commands::Layout { write_template } => print_layout(&config, write_template.as_deref()),
    }
}

/// `RUST_LOG` wins over the configured level.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run(
    mut config: BoothConfig,
    simulate: bool,
    test_mode: bool,
    max_ticks: Option<u64>,
) -> Result<()> {
    if test_mode {
        config.booth.session.test_mode = true;
    }

    info!(
        "shutterbug {} starting ({}{})",
        env!("CARGO_PKG_VERSION"),
        if simulate { "simulated" } else { "hardware" },
        if config.booth.session.test_mode {
            ", test mode"
        } else {
            ""
        }
    );

    let sim_log = SimLog::new();
    let mut rig = if simulate {
        demo_rig(&config, &sim_log)
    } else {
        hardware_rig(&config).context("Failed to set up booth hardware")?
    };
    if config.booth.session.test_mode {
        rig.printer = Box::new(NoPrinter);
        rig.power = Box::new(GracefulClose);
    }

    let clock: Rc<dyn Clock> = Rc::new(SystemClock);
    let mut scheduler = TickScheduler::new(config.booth.input.tick_period(), Rc::clone(&clock));
    if let Some(ticks) = max_ticks {
        scheduler = scheduler.with_max_ticks(ticks);
    }

    let mut controller = SessionController::new(config, rig, clock);
    let summary = scheduler.run(&mut controller);

    match summary.termination {
        Some(kind) => info!("stopped after {} ticks: {}", summary.ticks, kind),
        None => info!("stopped after {} ticks without a termination request", summary.ticks),
    }
    info!("{} prints this run", controller.quota().count());
    if simulate {
        for path in sim_log.printed() {
            info!("simulated print: {}", path.display());
        }
    }
    Ok(())
}

fn hardware_rig(config: &BoothConfig) -> Result<BoothRig> {
    let hw = &config.infra.hardware;
    let input = |name: &str, line: u32| SysfsInputLine::from_config(name, hw, line);

    let light = SysfsOutputLine::from_config("light", hw, hw.light_line);
    let warning_light = hw.warning_line.map(|line| {
        Box::new(SysfsOutputLine::from_config("warning", hw, line)) as Box<dyn OutputLine>
    });

    let scratch = std::env::temp_dir().join(format!(
        "shutterbug-frame.{}",
        config.booth.session.image_extension
    ));
    if hw.capture_command.is_empty() {
        anyhow::bail!("hardware.capture_command is empty");
    }

    Ok(BoothRig {
        shutdown: Box::new(input("shutdown", hw.shutdown_line)),
        start_color: Box::new(input("start-color", hw.start_color_line)),
        start_mono: Box::new(input("start-bw", hw.start_mono_line)),
        light: Box::new(light),
        warning_light,
        camera: Box::new(
            CommandCamera::new(hw.capture_command.clone(), hw.preview_command.clone(), scratch)
                .with_preview_hflip(hw.preview_hflip),
        ),
        countdown: Box::new(LoggingCountdown),
        printer: Box::new(CommandPrinter::new(hw.print_command.clone())),
        power: Box::new(CommandPower::new(hw.poweroff_command.clone())),
    })
}

fn print_config(config: &BoothConfig, sources: &ConfigSources) -> Result<()> {
    if sources.files.is_empty() {
        println!("# no config files found, using defaults");
    }
    for file in &sources.files {
        println!("# file: {}", file.display());
    }
    for var in &sources.env_overrides {
        println!("# env:  {}", var);
    }
    println!();
    print!("{}", config.to_toml().context("Failed to render configuration")?);
    Ok(())
}

fn print_layout(config: &BoothConfig, template: Option<&Path>) -> Result<()> {
    let engine = LayoutEngine::new(config.booth.layout.clone(), config.booth.session.shot_count);
    let layout = engine.layout();

    println!(
        "canvas {}x{}, thumbnails {}x{}",
        layout.print_width,
        layout.print_height,
        layout.thumbnail_width,
        layout.thumbnail_height_cropped
    );
    for placement in engine.placements() {
        println!(
            "shot {} {:?}: x={} y={}",
            placement.shot, placement.column, placement.x, placement.y
        );
    }

    if let Some(path) = template {
        write_template(layout, path)
            .with_context(|| format!("Failed to write template {}", path.display()))?;
        println!("template written to {}", path.display());
    }
    Ok(())
}
