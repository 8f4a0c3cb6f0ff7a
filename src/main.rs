mod audio;
mod audio_api;
mod config;
mod devices;
mod error;
mod hw;
mod loader;
mod middle;
mod pipeline;
mod pitch;
mod shared;
mod transport;
mod tui;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::Context;
use crossterm::terminal;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing::{info, trace, warn, Level};
use tracing_subscriber::util::SubscriberInitExt;

use config::{megaseq_dir, Config};
use devices::psg::Psg;
use devices::Devices;
use hw::controller::scan;
use hw::sim::{FileSram, PsgTap, SimZ80};
use hw::Bus;
use middle::{Middle, Setup};
use pipeline::kit::KIT_BANK;
use tui::input::KeyboardPad;
use tui::vdp::TextVdp;

// one NTSC field
const FRAME_TIME: Duration = Duration::from_micros(16_683);

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

// The terminal belongs to the UI, so logs go to .megaseq/megaseq.log.
fn init_logging(project_dir: &Path, config: &Config) -> anyhow::Result<()> {
    let path = megaseq_dir(project_dir).join("megaseq.log");
    let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    let level = config.log_level.parse::<Level>().unwrap_or(Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .compact()
        .finish()
        .init();
    Ok(())
}

fn run() -> anyhow::Result<()> {
    let project_dir: PathBuf = match std::env::args().nth(1) {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir().context("no working directory")?,
    };
    let config = Config::load_or_init(&project_dir)?;
    init_logging(&project_dir, &config)?;
    info!(dir = %project_dir.display(), "megaseq starting");

    let kit = loader::sample_loader::load_kit(config.kit_path(&project_dir).as_deref(), config.kit_layout)?;
    let kit_len = kit.len();
    let audio = if config.audio {
        match audio::start_audio(kit, KIT_BANK) {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("running without sound: {e:#}");
                None
            }
        }
    } else {
        None
    };

    // the chips forward what they are told to the audio thread, when there is one
    let (z80, psg_port) = match &audio {
        Some(handle) => (
            SimZ80::new().with_tap(handle.sender(), handle.level()),
            PsgTap::with_tap(handle.sender()),
        ),
        None => (SimZ80::new(), PsgTap::new()),
    };
    let devices = Devices::new(
        Bus::new(z80, config.bus_grant_polls, config.fm_busy_polls),
        Psg::new(psg_port),
    );
    let sram_path = config.sram_path(&project_dir);
    let sram = FileSram::open(&sram_path).with_context(|| format!("opening {}", sram_path.display()))?;
    let mut middle = Middle::boot(devices, sram, Setup::from_config(&config, kit_len))?;

    let mut vdp = TextVdp::new();
    tui::screen::load_assets(&mut vdp);

    terminal::enable_raw_mode()?;
    // Release events make held buttons work properly. Terminals that can't report them
    // fall back to timed holds.
    let _ = crossterm::execute!(
        std::io::stdout(),
        crossterm::event::PushKeyboardEnhancementFlags(
            crossterm::event::KeyboardEnhancementFlags::REPORT_EVENT_TYPES
        )
    );
    let _guard = RawModeGuard;
    let mut term = Terminal::new(CrosstermBackend::new(std::io::stdout()))?;
    term.clear()?;

    let mut pad = KeyboardPad::new();
    let mut deadline = Instant::now();
    loop {
        deadline += FRAME_TIME;
        pad.pump(deadline)?;
        if pad.quit_requested() {
            break;
        }

        let buttons = scan(&mut pad);
        let report = middle.frame(buttons, &mut vdp);
        if let Some(step) = report.dispatched {
            trace!(step, "step sent");
        }
        let playing = middle.state().playing;
        term.draw(|frame| tui::view::render(frame, frame.area(), &vdp, playing))?;
        pad.end_frame();

        // a slow frame is dropped, not caught up on
        let now = Instant::now();
        if deadline < now {
            deadline = now;
        }
    }

    info!("quit");
    Ok(())
}

struct RawModeGuard;
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = crossterm::execute!(
            std::io::stdout(),
            crossterm::event::PopKeyboardEnhancementFlags
        );
        let _ = terminal::disable_raw_mode();
    }
}
