use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::path::{Path, PathBuf};

use eqconsole::audio::manager::Manager;
use eqconsole::console::{Console, ControlEvent};
use eqconsole::settings::Settings;
use eqconsole::source::SourceKind;
use eqconsole::source::mic::{CaptureDevice, NoCapture};
use eqconsole::tui::{self, LOG_FILE, app::App};

#[derive(Parser, Debug)]
#[command(name = "eqconsole")]
#[command(version)]
#[command(about = "Ten-band equalizer console with noise generators and a live spectrum.")]
struct Args {
    #[arg(long, value_enum, default_value_t = SourceKind::File, help = "Initial source")]
    source: SourceKind,
    #[arg(long, env = "EQCONSOLE_FILE", help = "WAV file to open at startup")]
    file: Option<PathBuf>,
    #[arg(long, default_value = "flat", help = "Preset applied at startup")]
    preset: String,
    #[arg(long, help = "Start with the equalizer bypassed")]
    bypass: bool,
    #[arg(long, env = "EQCONSOLE_CONFIG", help = "Settings file to read")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tui::init_file_logging(Path::new(LOG_FILE))?;

    let args = Args::parse();
    info!("eqconsole v{}", env!("CARGO_PKG_VERSION"));
    info!("Args: {:?}", args);

    let settings = Settings::load(args.config.as_deref()).context("failed to load settings")?;
    info!("{settings}");
    settings.apply_to_environment();

    let manager = Manager::new(&settings).context("failed to start audio")?;
    let capture: Box<dyn CaptureDevice> = match manager.capture_device(&settings.audio) {
        Ok(device) => Box::new(device),
        Err(e) => {
            warn!("Microphone disabled: {e:#}");
            Box::new(NoCapture::new(format!("{e:#}")))
        }
    };

    let mut console = Console::new(manager.engine().clone(), capture, &settings.engine_params());
    for event in startup_events(&args) {
        if let Err(e) = console.handle(event) {
            warn!("{e:#}");
        }
    }

    let mut app = App::new(console, manager.analyzer().clone());
    let result = tui::run(&mut app);

    app.console_mut().shutdown();
    manager.close()?;

    result
}

fn startup_events(args: &Args) -> Vec<ControlEvent> {
    let mut events = vec![ControlEvent::PresetSelected(args.preset.clone())];
    if args.bypass {
        events.push(ControlEvent::BypassToggled(true));
    }
    if let Some(path) = &args.file {
        events.push(ControlEvent::FileSelected(path.clone()));
    }
    if args.source != SourceKind::File {
        events.push(ControlEvent::SourceChanged(args.source));
    }
    events
}
