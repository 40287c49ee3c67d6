mod commands;
mod config;
mod detect;
mod executor;
mod matcher;
mod menu;
mod model;
mod notify;
mod plugin;
mod remove;
mod sources;
mod state;
mod ui;
mod workflow;

use std::path::PathBuf;
use std::rc::Rc;
use std::thread;
use anyhow::{Context, Result};
use calloop::EventLoop;
use calloop_wayland_source::WaylandSource;
use clap::{Parser, Subcommand};
use smithay_client_toolkit::{
    shell::wlr_layer::{Layer, KeyboardInteractivity, Anchor},
    shell::WaylandSurface,
};
use wayland_client::{Connection, globals::registry_queue_init};
use crate::config::{load_config, Config};
use crate::executor::{CommandSpawner, DetachedSpawner};
use crate::notify::{DesktopNotifier, LoopScheduler, Notifier};
use crate::plugin::UninstallPlugin;
use crate::remove::BackgroundFileRemover;
use crate::sources::{Source, desktop::DesktopSource};
use crate::state::AppState;
use crate::ui::render::Renderer;
use crate::ui::wayland::WaylandApp;
use crate::workflow::UninstallWorkflow;

#[derive(Parser, Debug)]
#[command(author, version, about = "Uninstall Flatpaks and AppImages from the launcher", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Open the launcher (default)
    Menu,
    /// List applications and their detected package type
    List {
        /// Fuzzy filter on the application name
        query: Option<String>,
        /// Include applications that cannot be uninstalled
        #[arg(short, long)]
        all: bool,
        #[arg(long)]
        json: bool,
    },
    /// Uninstall one application by desktop id or descriptor path
    Uninstall {
        app: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Show or change preferences
    Config {
        #[command(subcommand)]
        action: Option<ConfigCmd>,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCmd {
    Show,
    /// Directory AppImages are kept in
    SetAppimageRoot { dir: PathBuf },
    ClearAppimageRoot,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = load_config()?;

    match args.command.unwrap_or(Cmd::Menu) {
        Cmd::Menu => run_launcher(config),
        Cmd::List { query, all, json } => commands::list(&config, query.as_deref(), all, json),
        Cmd::Uninstall { app, yes } => commands::uninstall(&config, &app, yes),
        Cmd::Config { action } => match action.unwrap_or(ConfigCmd::Show) {
            ConfigCmd::Show => commands::show_config(&config),
            ConfigCmd::SetAppimageRoot { dir } => commands::set_appimage_root(&dir),
            ConfigCmd::ClearAppimageRoot => commands::clear_appimage_root(),
        },
    }
}

fn run_launcher(config: Config) -> Result<()> {
    // 1. Event loop & Wayland connection
    let mut event_loop: EventLoop<'static, WaylandApp> = EventLoop::try_new()?;
    let conn = Connection::connect_to_env().context("no Wayland compositor")?;
    let (globals, event_queue) = registry_queue_init::<WaylandApp>(&conn)?;
    let qh = event_queue.handle();

    // 2. Uninstall plugin, with completion notices on this loop
    let spawner: Rc<dyn CommandSpawner> = Rc::new(DetachedSpawner);
    let notifier: Rc<dyn Notifier> = Rc::new(DesktopNotifier::new(config.notify.command.clone(), spawner.clone()));
    let scheduler = LoopScheduler::new(event_loop.handle(), notifier.clone());
    let workflow = UninstallWorkflow::new(
        &config,
        spawner,
        Rc::new(BackgroundFileRemover),
        notifier,
        Box::new(scheduler),
    );

    let app_state = AppState::new(config.clone(), UninstallPlugin::new(workflow));
    let mut app = WaylandApp::new(&globals, &qh, app_state, Renderer::new())?;

    // 3. Layer surface
    let surface = app.compositor_state.create_surface(&qh);
    let layer_surface = app.layer_shell_state.create_layer_surface(
        &qh,
        surface,
        Layer::Overlay,
        Some("flatnuke"),
        None,
    );
    layer_surface.set_anchor(Anchor::empty());
    layer_surface.set_size(config.theme.width, config.theme.height);
    layer_surface.set_keyboard_interactivity(KeyboardInteractivity::Exclusive);
    layer_surface.commit();
    app.layer_surface = Some(layer_surface);

    // 4. Scan launchers off the loop thread
    let (tx_entries, rx_entries) = calloop::channel::channel();
    thread::spawn(move || {
        let entries = DesktopSource::default().scan().unwrap_or_else(|e| {
            log::warn!("Desktop scan failed: {}", e);
            Vec::new()
        });
        let _ = tx_entries.send(entries);
    });

    event_loop.handle().insert_source(rx_entries, |event, _, app: &mut WaylandApp| {
        if let calloop::channel::Event::Msg(entries) = event {
            app.state.set_entries(entries);
            app.draw();
        }
    }).map_err(|e| anyhow::anyhow!("failed to watch desktop scan: {}", e))?;

    event_loop.handle().insert_source(
        WaylandSource::new(conn.clone(), event_queue),
        |_, queue, app| queue.dispatch_pending(app),
    ).map_err(|e| anyhow::anyhow!("failed to watch Wayland socket: {}", e))?;

    // 5. Run
    while !app.should_exit {
        event_loop.dispatch(None, &mut app)?;
    }
    app.teardown();

    Ok(())
}
