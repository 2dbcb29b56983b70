use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use eqconsole::audio::manager::Manager;
use eqconsole::console::{Console, ControlEvent};
use eqconsole::settings::Settings;
use eqconsole::source::SourceKind;
use eqconsole::source::mic::{CaptureDevice, NoCapture};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Parser, Debug)]
#[command(name = "eqconsole-cli")]
#[command(version)]
#[command(about = "Headless equalizer console. Runs until Ctrl+C.")]
struct Args {
    #[arg(long, value_enum, default_value_t = SourceKind::File, help = "Source to play")]
    source: SourceKind,
    #[arg(long, env = "EQCONSOLE_FILE", help = "WAV file to play in file mode")]
    file: Option<PathBuf>,
    #[arg(long, default_value = "flat", help = "Preset to apply")]
    preset: String,
    #[arg(long, help = "Bypass the equalizer")]
    bypass: bool,
    #[arg(long, env = "EQCONSOLE_CONFIG", help = "Settings file to read")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    info!("eqconsole-cli v{}", env!("CARGO_PKG_VERSION"));
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

    console.handle(ControlEvent::PresetSelected(args.preset.clone()))?;
    if args.bypass {
        console.handle(ControlEvent::BypassToggled(true))?;
    }
    if let Some(path) = &args.file {
        console
            .handle(ControlEvent::FileSelected(path.clone()))
            .with_context(|| format!("failed to play '{}'", path.display()))?;
    }
    if args.source != SourceKind::File {
        console.handle(ControlEvent::SourceChanged(args.source))?;
    }

    let running = Arc::new(AtomicBool::new(true));
    let shutdown_flag = Arc::clone(&running);

    ctrlc::set_handler(move || {
        info!("Ctrl+C received, shutting down...");
        shutdown_flag.store(false, Ordering::SeqCst);
    })
    .context("error setting Ctrl+C handler")?;

    let mut last_status = None;
    while running.load(Ordering::SeqCst) {
        console.poll();

        let status = console.status().map(str::to_string);
        if status != last_status {
            if let Some(message) = &status {
                warn!("{message}");
            }
            last_status = status;
        }

        thread::sleep(POLL_INTERVAL);
    }

    console.shutdown();
    manager.close()
}
