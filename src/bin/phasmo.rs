// Phasmo Companion CLI - evidence filter, timers and keybinds from the terminal

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info, warn};
use phasmo_companion::config_file::AppConfig;
use phasmo_companion::ghost::filter::{evidence_combinations, is_guaranteed_evidence};
use phasmo_companion::ghost::{DifficultyMode, Evidence, Ghost, InclusionState};
use phasmo_companion::keybinds::{default_keybinds, Action};
use phasmo_companion::session::RECENT_HISTORY_DAYS;
use phasmo_companion::timers::{format_remaining, TimerEngine, TimerKind, TimerSnapshot, TimerStatus};
use phasmo_companion::ui::{CompletionNotifier, DesktopNotifier};
use phasmo_companion::CompanionCore;
use std::io::{self, Write};
use std::thread;
use std::time::Duration;

/// Phasmophobia companion: narrow down the ghost, time hunts and smudges
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Phasmophobia companion: evidence filter, hunt/smudge/cooldown timers and global keybinds",
    long_about = "Phasmophobia companion: evidence filter, hunt/smudge/cooldown timers and global keybinds.

Configuration is stored at:
  <config dir>/phasmo-companion/config.toml

Environment overrides:
  PHASMO_CATALOG_URL     Ghost catalog endpoint
  PHASMO_TIMER_POLL_MS   Timer poll interval (50-1000 ms)
  RUST_LOG               Log level (default: info)"
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the ghosts that match the given evidence and filters
    Ghosts {
        /// Difficulty (amateur, intermediate, professional, nightmare, insanity)
        #[arg(long, default_value = "professional")]
        mode: DifficultyMode,

        /// Evidence found (repeatable or comma-separated, e.g. emf,orbs)
        #[arg(long, value_delimiter = ',')]
        include: Vec<Evidence>,

        /// Evidence ruled out
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<Evidence>,

        /// Only ghosts that speed up with line of sight
        #[arg(long, conflicts_with = "no_los")]
        los: bool,

        /// Only ghosts without line-of-sight acceleration
        #[arg(long)]
        no_los: bool,

        /// Minimum hunt sanity threshold (%)
        #[arg(long)]
        sanity_min: Option<f64>,

        /// Maximum hunt sanity threshold (%)
        #[arg(long)]
        sanity_max: Option<f64>,

        /// Minimum ghost speed (m/s)
        #[arg(long)]
        speed_min: Option<f64>,

        /// Maximum ghost speed (m/s)
        #[arg(long)]
        speed_max: Option<f64>,
    },

    /// Show which evidence a ghost can present in a difficulty
    Combos {
        /// Ghost id
        id: String,

        #[arg(long, default_value = "nightmare")]
        mode: DifficultyMode,
    },

    /// Download the ghost catalog and update the local cache
    Refresh,

    /// Show game statistics
    Stats,

    /// List past games, most recent first
    History {
        /// Only games started within this many days
        #[arg(long)]
        days: Option<i64>,
    },

    /// Show or change keybinds
    Keybinds {
        #[command(subcommand)]
        action: Option<KeybindCommand>,
    },

    /// Run a single timer in the terminal
    Timer {
        /// hunt, smudge or cooldown
        kind: TimerKind,

        /// Duration in seconds (defaults to the configured duration)
        #[arg(long)]
        duration: Option<u64>,

        /// Difficulty used for the default hunt duration
        #[arg(long, default_value = "professional")]
        mode: DifficultyMode,
    },

    /// Listen for global keybinds and run timers until Ctrl+C
    Run,
}

#[derive(Subcommand, Debug)]
enum KeybindCommand {
    /// Bind an action to a key combination, e.g. `set huntTrack Shift+H`
    Set { id: String, combo: String },
    Enable { id: String },
    Disable { id: String },
    /// Restore every default keybind
    Reset,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logger
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            error!("Fix or delete the config file to continue.");
            std::process::exit(1);
        }
    };

    match args.command {
        Command::Ghosts {
            mode,
            include,
            exclude,
            los,
            no_los,
            sanity_min,
            sanity_max,
            speed_min,
            speed_max,
        } => {
            let core = open_with_catalog(config)?;
            {
                let mut state = core.state.lock();
                let filters = &mut state.filters;
                filters.set_mode(mode);
                for evidence in include {
                    filters.selection.set_evidence_state(evidence, InclusionState::Include);
                }
                for evidence in exclude {
                    filters.selection.set_evidence_state(evidence, InclusionState::Exclude);
                }
                if los {
                    filters.selection.line_of_sight = InclusionState::Include;
                } else if no_los {
                    filters.selection.line_of_sight = InclusionState::Exclude;
                }
                filters.set_hunt_threshold(sanity_min, sanity_max);
                if speed_min.is_some() || speed_max.is_some() {
                    filters.set_speed_range(speed_min, speed_max);
                }
            }
            print_ghosts(&core.possible_ghosts(), mode);
        }
        Command::Combos { id, mode } => {
            let core = open_with_catalog(config)?;
            let ghost = core
                .catalog
                .get(&id)
                .with_context(|| format!("Unknown ghost id '{}'", id))?;
            println!("{} in {}:", ghost.name, mode);
            for combo in evidence_combinations(ghost, mode) {
                let names: Vec<&str> = combo.iter().map(|e| e.display_name()).collect();
                println!("  {}", names.join(" + "));
            }
        }
        Command::Refresh => {
            let mut core = CompanionCore::open(config)?;
            let count = core.refresh_catalog().context("Catalog refresh failed")?;
            println!("Catalog updated: {} ghosts", count);
        }
        Command::Stats => {
            let mut core = CompanionCore::open(config)?;
            let stats = core.sessions.refresh_stats()?;
            println!("Games played:      {}", stats.total_games);
            println!("Correct guesses:   {}", stats.correct_guesses);
            println!("Incorrect guesses: {}", stats.incorrect_guesses);
            println!("Deaths:            {}", stats.deaths);
            println!("Win rate:          {:.1}%", stats.win_rate);
        }
        Command::History { days } => {
            let mut core = CompanionCore::open(config)?;
            let games = match days {
                Some(days) => core.sessions.load_recent_history(days)?,
                None => core.sessions.load_history()?.to_vec(),
            };
            if games.is_empty() {
                println!(
                    "No games recorded{}",
                    days.map(|d| format!(" in the last {} days", d)).unwrap_or_default()
                );
            }
            for game in games {
                let outcome = match game.was_correct {
                    Some(true) => "correct",
                    Some(false) => "wrong",
                    None => "-",
                };
                println!(
                    "{}  {:<14} guessed {:<12} actual {:<12} {:<7}{}",
                    game.start_time.format("%Y-%m-%d %H:%M"),
                    game.map_name.as_deref().unwrap_or("-"),
                    game.guessed_ghost_id.as_deref().unwrap_or("-"),
                    game.actual_ghost_id.as_deref().unwrap_or("-"),
                    outcome,
                    match (game.is_active(), game.died) {
                        (true, _) => "  in progress",
                        (false, true) => "  died",
                        (false, false) => "",
                    }
                );
            }
            if days.is_none() {
                info!("Use --days {} for recent games only", RECENT_HISTORY_DAYS);
            }
        }
        Command::Keybinds { action } => run_keybinds(config, action)?,
        Command::Timer {
            kind,
            duration,
            mode,
        } => {
            let duration = duration.unwrap_or_else(|| config.timers.duration_secs(kind, mode));
            run_timer(kind, duration, &DesktopNotifier::from_config(&config.timers))?;
        }
        Command::Run => run_companion(config)?,
    }

    Ok(())
}

/// Open the core and make sure a catalog is available
fn open_with_catalog(config: AppConfig) -> Result<CompanionCore> {
    let mut core = CompanionCore::open(config)?;
    if core.catalog.is_empty() {
        info!("No cached catalog, downloading");
        core.refresh_catalog().context("No ghost catalog available")?;
    }
    Ok(core)
}

fn print_ghosts(ghosts: &[&Ghost], mode: DifficultyMode) {
    if ghosts.is_empty() {
        println!("No ghost matches the current selection");
        return;
    }
    println!("{} possible ghosts ({}):", ghosts.len(), mode);
    for ghost in ghosts {
        // Guaranteed evidence is starred
        let evidences: Vec<String> = ghost
            .evidences
            .iter()
            .map(|&e| {
                if is_guaranteed_evidence(ghost, e) {
                    format!("{}*", e.token())
                } else {
                    e.token().to_string()
                }
            })
            .collect();
        println!(
            "  {:<14} {:<40} hunts <= {:>3.0}%  {:.2}-{:.2} m/s{}",
            ghost.name,
            evidences.join(", "),
            ghost.hunt_threshold,
            ghost.speed_range.min,
            ghost.speed_range.max,
            if ghost.has_los { "  LoS" } else { "" }
        );
    }
}

fn run_keybinds(mut config: AppConfig, action: Option<KeybindCommand>) -> Result<()> {
    let changed = match action {
        None => false,
        Some(KeybindCommand::Set { id, combo }) => {
            config.update_keybind(&id, Some(&combo), None)?;
            true
        }
        Some(KeybindCommand::Enable { id }) => {
            config.update_keybind(&id, None, Some(true))?;
            true
        }
        Some(KeybindCommand::Disable { id }) => {
            config.update_keybind(&id, None, Some(false))?;
            true
        }
        Some(KeybindCommand::Reset) => {
            config.keybinds = default_keybinds();
            true
        }
    };

    if changed {
        config.save().context("Failed to save configuration")?;
        println!("Configuration saved to: {}", AppConfig::config_path()?.display());
    }

    for action in Action::ALL {
        let Some(keybind) = config.keybinds.get(action.id()) else {
            continue;
        };
        println!(
            "  {:<14} {:<12} {}{}",
            action.id(),
            keybind.key,
            keybind.description,
            if keybind.enabled { "" } else { " (disabled)" }
        );
    }
    Ok(())
}

/// Count a single timer down in the terminal
fn run_timer(kind: TimerKind, duration: u64, notifier: &dyn CompletionNotifier) -> Result<()> {
    let mut engine = TimerEngine::with_system_clock();
    engine.start(kind, duration)?;
    info!("{} timer started: {}", kind.display_name(), format_remaining(duration));

    let interval = Duration::from_millis(phasmo_companion::config::timer_poll_interval_ms());
    let mut last_shown = None;
    loop {
        let completions = engine.poll();
        let remaining = engine.remaining_seconds(kind);
        if last_shown != Some(remaining) {
            print!("\r{} {}  ", kind.display_name(), format_remaining(remaining));
            io::stdout().flush()?;
            last_shown = Some(remaining);
        }
        if let Some(completion) = completions.first() {
            println!();
            notifier.notify(completion);
            return Ok(());
        }
        thread::sleep(interval);
    }
}

/// Register keybinds and keep timers running until the process is killed
fn run_companion(config: AppConfig) -> Result<()> {
    let notifier = DesktopNotifier::from_config(&config.timers);
    let mut core = open_with_catalog(config)?;

    match core.start_hotkeys() {
        Ok(count) => info!("{} keybinds active", count),
        Err(e) => warn!("Some keybinds are unavailable: {:#}", e),
    }
    core.start_background_threads(Box::new(notifier))
        .context("Failed to start background threads")?;

    info!("Phasmo Companion is running - press Ctrl+C to quit");
    info!("{} ghosts possible", core.possible_ghosts().len());

    let status = StatusLog::new(&core);
    run_event_loop(core, status)
}

/// Hotkey events are only delivered while the main thread pumps the
/// platform event loop
#[cfg(any(target_os = "macos", target_os = "windows"))]
fn run_event_loop(core: CompanionCore, mut status: StatusLog) -> Result<()> {
    use std::time::Instant;
    use tao::event_loop::{ControlFlow, EventLoopBuilder};

    let event_loop = EventLoopBuilder::new().build();
    let interval = Duration::from_millis(STATUS_INTERVAL_MS);

    event_loop.run(move |_event, _, control_flow| {
        *control_flow = ControlFlow::WaitUntil(Instant::now() + interval);
        status.log_changes(&core);
    })
}

/// The Linux hotkey backend runs its own event thread
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn run_event_loop(core: CompanionCore, mut status: StatusLog) -> Result<()> {
    loop {
        thread::sleep(Duration::from_millis(STATUS_INTERVAL_MS));
        status.log_changes(&core);
    }
}

const STATUS_INTERVAL_MS: u64 = 500;

/// Logs filter and timer changes made through keybinds
struct StatusLog {
    possible: usize,
    timers: Vec<TimerSnapshot>,
}

impl StatusLog {
    fn new(core: &CompanionCore) -> Self {
        Self {
            possible: core.possible_ghosts().len(),
            timers: core.timer_snapshot(),
        }
    }

    fn log_changes(&mut self, core: &CompanionCore) {
        let possible = core.possible_ghosts();
        if possible.len() != self.possible {
            let names: Vec<&str> = possible.iter().map(|g| g.name.as_str()).collect();
            info!("{} ghosts possible: {}", possible.len(), names.join(", "));
            self.possible = possible.len();
        }

        let timers = core.timer_snapshot();
        if timers != self.timers {
            for timer in timers.iter().filter(|t| t.status != TimerStatus::Idle) {
                info!(
                    "{} {:?} {}",
                    timer.kind.display_name(),
                    timer.status,
                    format_remaining(timer.remaining_secs)
                );
            }
            self.timers = timers;
        }
    }
}
