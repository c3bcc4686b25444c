// Phasmo Companion Tray App - menu bar / system tray front end
// Timers and keybinds run while the tray icon is up

#[cfg(any(target_os = "macos", target_os = "windows"))]
fn main() -> anyhow::Result<()> {
    tray::run()
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn main() {
    eprintln!("phasmo-tray is only available on macOS and Windows. Use `phasmo run` instead.");
    std::process::exit(1);
}

#[cfg(any(target_os = "macos", target_os = "windows"))]
mod tray {
    use anyhow::{Context, Result};
    use log::{error, info, warn};
    use phasmo_companion::config_file::AppConfig;
    use phasmo_companion::keybinds::Action;
    use phasmo_companion::timers::{format_remaining, TimerKind, TimerSnapshot, TimerStatus};
    use phasmo_companion::ui::DesktopNotifier;
    use phasmo_companion::CompanionCore;
    use std::time::{Duration, Instant};
    use tao::event_loop::{ControlFlow, EventLoopBuilder};
    use tray_icon::menu::{Menu, MenuEvent, MenuItem, PredefinedMenuItem};
    use tray_icon::TrayIconBuilder;

    const VERSION: &str = env!("CARGO_PKG_VERSION");

    pub fn run() -> Result<()> {
        // Initialize logger
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();

        info!("Starting Phasmo Companion Tray App v{}", VERSION);

        let config = AppConfig::load().context("Failed to load configuration")?;
        let notifier = DesktopNotifier::from_config(&config.timers);
        let mut core = CompanionCore::open(config).context("Failed to initialize Phasmo Companion")?;

        if core.catalog.is_empty() {
            if let Err(e) = core.refresh_catalog() {
                warn!("Ghost catalog unavailable: {:#}", e);
            }
        }

        // Hotkeys must be registered on the event loop thread
        if let Err(e) = core.start_hotkeys() {
            warn!("Some keybinds are unavailable: {:#}", e);
        }
        core.start_background_threads(Box::new(notifier))
            .context("Failed to start background threads")?;

        let event_loop = EventLoopBuilder::new().build();

        // Build tray menu
        let hunt_item = MenuItem::new(timer_label(TimerKind::Hunt, None), true, None);
        let smudge_item = MenuItem::new(timer_label(TimerKind::Smudge, None), true, None);
        let cooldown_item = MenuItem::new(timer_label(TimerKind::Cooldown, None), true, None);
        let reset_timers_item = MenuItem::new("Reset Timers", true, None);
        let reset_filters_item = MenuItem::new("Reset Evidence", true, None);
        let new_game_item = MenuItem::new("New Game", true, None);
        let end_game_item = MenuItem::new("End Game", true, None);
        let version_item = MenuItem::new(format!("Version {}", VERSION), false, None);
        let quit_item = MenuItem::new("Quit", true, None);

        let menu = Menu::new();
        menu.append(&hunt_item).context("Failed to add hunt menu item")?;
        menu.append(&smudge_item).context("Failed to add smudge menu item")?;
        menu.append(&cooldown_item).context("Failed to add cooldown menu item")?;
        menu.append(&reset_timers_item).context("Failed to add reset timers menu item")?;
        menu.append(&PredefinedMenuItem::separator()).context("Failed to add separator")?;
        menu.append(&reset_filters_item).context("Failed to add reset evidence menu item")?;
        menu.append(&new_game_item).context("Failed to add new game menu item")?;
        menu.append(&end_game_item).context("Failed to add end game menu item")?;
        menu.append(&PredefinedMenuItem::separator()).context("Failed to add separator")?;
        menu.append(&version_item).context("Failed to add version menu item")?;
        menu.append(&quit_item).context("Failed to add quit menu item")?;

        let _tray = TrayIconBuilder::new()
            .with_menu(Box::new(menu))
            .with_tooltip("Phasmo Companion")
            .with_icon(create_icon()?)
            .build()
            .context("Failed to create tray icon")?;

        info!("Tray icon created, running event loop");

        let hunt_id = hunt_item.id().clone();
        let smudge_id = smudge_item.id().clone();
        let cooldown_id = cooldown_item.id().clone();
        let reset_timers_id = reset_timers_item.id().clone();
        let reset_filters_id = reset_filters_item.id().clone();
        let new_game_id = new_game_item.id().clone();
        let end_game_id = end_game_item.id().clone();
        let quit_id = quit_item.id().clone();

        let interval = Duration::from_millis(phasmo_companion::config::timer_poll_interval_ms());
        let mut last_snapshot: Vec<TimerSnapshot> = Vec::new();

        event_loop.run(move |_event, _, control_flow| {
            *control_flow = ControlFlow::WaitUntil(Instant::now() + interval);

            if let Ok(event) = MenuEvent::receiver().try_recv() {
                let event_id = event.id;

                let action = if event_id == hunt_id {
                    Some(Action::HuntTrack)
                } else if event_id == smudge_id {
                    Some(Action::ToggleTimer(TimerKind::Smudge))
                } else if event_id == cooldown_id {
                    Some(Action::ToggleTimer(TimerKind::Cooldown))
                } else if event_id == reset_filters_id {
                    Some(Action::ResetEvidence)
                } else {
                    None
                };

                if let Some(action) = action {
                    if let Err(e) = core.dispatch(action) {
                        error!("{} failed: {}", action.description(), e);
                    }
                } else if event_id == reset_timers_id {
                    let timers = core.timers();
                    let mut timers = timers.lock();
                    for kind in TimerKind::ALL {
                        timers.reset(kind);
                    }
                    info!("Timers reset");
                } else if event_id == new_game_id {
                    match core.sessions.start_new_game() {
                        Ok(game) => info!("Started {}", game.id),
                        Err(e) => error!("Failed to start game: {:#}", e),
                    }
                } else if event_id == end_game_id {
                    if let Err(e) = core.sessions.end_current_game() {
                        error!("Failed to end game: {:#}", e);
                    }
                } else if event_id == quit_id {
                    info!("Quit menu item clicked, exiting");
                    *control_flow = ControlFlow::Exit;
                    return;
                }
            }

            // Keep menu labels in step with the countdowns
            let snapshot = core.timer_snapshot();
            if snapshot != last_snapshot {
                for timer in &snapshot {
                    let item = match timer.kind {
                        TimerKind::Hunt => &hunt_item,
                        TimerKind::Smudge => &smudge_item,
                        TimerKind::Cooldown => &cooldown_item,
                    };
                    item.set_text(timer_label(timer.kind, Some(timer)));
                }
                last_snapshot = snapshot;
            }
        });
    }

    fn timer_label(kind: TimerKind, timer: Option<&TimerSnapshot>) -> String {
        let name = kind.display_name();
        match timer {
            Some(t) if t.status == TimerStatus::Running => {
                format!("Pause {} ({})", name, format_remaining(t.remaining_secs))
            }
            Some(t) if t.status == TimerStatus::Paused => {
                format!("Resume {} ({})", name, format_remaining(t.remaining_secs))
            }
            Some(t) if t.duration_secs.is_some() => {
                format!("Start {} ({})", name, format_remaining(t.remaining_secs))
            }
            _ => format!("Start {}", name),
        }
    }

    /// Solid square icon until proper artwork is bundled
    fn create_icon() -> Result<tray_icon::Icon> {
        let size = 32;
        let color = [120u8, 60, 200, 255];
        let rgba: Vec<u8> = (0..size * size).flat_map(|_| color).collect();
        tray_icon::Icon::from_rgba(rgba, size, size).context("Failed to create icon")
    }
}
