// Poll loop on a blocking task, Ctrl-C on the async side
//
// The controller loop is synchronous (motor moves block), so it runs under
// spawn_blocking and checks a shared flag between polls.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::sleep;

use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::config::{
    ControllerConfig, HomingPolicy, Profile, DEFAULT_BAUDRATE, DEFAULT_PORT, IDLE_POLL_INTERVAL,
};
use crate::controller::{Controller, PollOutcome};
use crate::journal::Journal;
use crate::link::{PortLink, SerialLink, StdioLink};
use crate::motor::{SimulatedStepper, StepperDriver};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Serial command interpreter for a pan stepper
#[derive(Debug, Clone, Parser)]
#[command(version, about)]
pub struct Args {
    /// Serial port the tracking host is connected to
    #[arg(short, long, default_value = DEFAULT_PORT)]
    pub port: String,

    #[arg(short, long, default_value_t = DEFAULT_BAUDRATE)]
    pub baud: u32,

    #[arg(long, value_enum, default_value_t = Profile::Full)]
    pub profile: Profile,

    /// Keep the real position when a home is interrupted instead of forcing 0
    #[arg(long)]
    pub track_interrupted_home: bool,

    /// Read commands from stdin and write status lines to stdout
    #[arg(long)]
    pub simulate_link: bool,

    /// Append a JSON line per handled command to this file
    #[arg(long)]
    pub journal: Option<PathBuf>,
}

impl Args {
    pub fn controller_config(&self) -> ControllerConfig {
        let homing = if self.track_interrupted_home {
            HomingPolicy::TrackInterrupted
        } else {
            HomingPolicy::ForceZero
        };
        ControllerConfig::default()
            .with_profile(self.profile)
            .with_homing(homing)
    }
}

/// Log filter from `RUST_LOG`, falling back to `info` when unset
pub fn log_filter() -> EnvFilter {
    filter_from(std::env::var("RUST_LOG").ok().as_deref())
}

fn filter_from(directives: Option<&str>) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .parse_lossy(directives.unwrap_or_default())
}

pub async fn run(args: Args) -> Result<(), BoxError> {
    let config = args.controller_config();
    let journal = args.journal.as_deref().map(Journal::create).transpose()?;
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();

    let mut worker = if args.simulate_link {
        info!("Using stdin/stdout as the command link");
        let link = StdioLink::spawn();
        tokio::task::spawn_blocking(move || {
            serve(config, SimulatedStepper::new(), link, journal, &flag)
        })
    } else {
        let link = PortLink::open_with_baudrate(&args.port, args.baud)?;
        tokio::task::spawn_blocking(move || {
            serve(config, SimulatedStepper::new(), link, journal, &flag)
        })
    };

    tokio::select! {
        joined = &mut worker => return joined?,
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, stopping after the current command");
            shutdown.store(true, Ordering::Relaxed);
        }
    }

    worker.await?
}

/// Start the controller and poll until shutdown or the link closes
pub fn serve<D: StepperDriver, L: SerialLink>(
    config: ControllerConfig,
    driver: D,
    link: L,
    mut journal: Option<Journal>,
    shutdown: &AtomicBool,
) -> Result<(), BoxError> {
    let mut controller = Controller::new(config, driver, link);
    controller.startup()?;

    while !shutdown.load(Ordering::Relaxed) {
        if !controller.link().is_open() {
            info!("Command link closed");
            break;
        }

        match controller.poll()? {
            PollOutcome::Idle => sleep(IDLE_POLL_INTERVAL),
            PollOutcome::Rejected { dropped } => {
                debug!("Rejected {} byte(s) inside cooldown", dropped)
            }
            PollOutcome::Handled { command, .. } => {
                if let Some(journal) = journal.as_mut() {
                    journal.record(command.byte(), &controller.snapshot())?;
                }
            }
        }
    }

    info!("Stopped at position {}", controller.position());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::JournalEntry;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_args_to_config() {
        let args = Args::parse_from(["pan-stepper", "--profile", "minimal", "--track-interrupted-home"]);
        let config = args.controller_config();
        assert_eq!(config.profile, Profile::Minimal);
        assert_eq!(config.homing, HomingPolicy::TrackInterrupted);
        assert_eq!(args.baud, 9600);
        assert!(!args.simulate_link);
    }

    #[test]
    fn test_default_args() {
        let args = Args::parse_from(["pan-stepper"]);
        assert_eq!(args.port, DEFAULT_PORT);
        assert_eq!(args.controller_config(), ControllerConfig::default());
    }

    #[test]
    fn test_log_filter_levels() {
        assert_eq!(filter_from(None).max_level_hint(), Some(LevelFilter::INFO));
        assert_eq!(
            filter_from(Some("debug")).max_level_hint(),
            Some(LevelFilter::DEBUG)
        );
        assert_eq!(
            filter_from(Some("pan_stepper=trace")).max_level_hint(),
            Some(LevelFilter::TRACE)
        );
    }

    #[test]
    fn test_serve_until_link_closes() {
        let path = std::env::temp_dir().join(format!("pan-stepper-{}.jsonl", std::process::id()));
        let _ = std::fs::remove_file(&path);

        // Pause long enough that the first command clears the cooldown
        let mut config = ControllerConfig::default();
        config.self_test_pause = Duration::from_millis(40);

        let (tx, rx) = mpsc::channel();
        tx.send(b'R').unwrap();
        drop(tx);

        let journal = Journal::create(&path).unwrap();
        let shutdown = AtomicBool::new(false);
        serve(
            config,
            SimulatedStepper::instant(),
            StdioLink::from_receiver(rx),
            Some(journal),
            &shutdown,
        )
        .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let entries: Vec<JournalEntry> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].command, 'R');
        assert_eq!(entries[0].state.position, 20);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_serve_stops_on_shutdown_flag() {
        let (_tx, rx) = mpsc::channel::<u8>();
        let mut config = ControllerConfig::default();
        config.self_test_pause = Duration::ZERO;

        let shutdown = AtomicBool::new(true);
        serve(
            config,
            SimulatedStepper::instant(),
            StdioLink::from_receiver(rx),
            None,
            &shutdown,
        )
        .unwrap();
    }
}
