//! Application entry point for Voice Coach.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Open the JSON key-value store beside the settings file.
//! 4. Pick the interface language ([`Translator`]).
//! 5. Build the loudness meter around the default microphone.
//! 6. Build the breathing timer around the rodio cue player, falling back to
//!    silence when no output thread can be started.
//! 7. Run [`eframe::run_native`]; blocks the main thread until the window
//!    is closed.

use std::sync::Arc;

use voice_coach::{
    app::{Meter, Timer, VoiceCoachApp},
    audio::{CpalMicrophone, CuePlayer, MicrophoneInput, RodioCuePlayer, SilentCuePlayer},
    config::{AppConfig, AppPaths},
    i18n::Translator,
    store::{JsonFileStore, SharedStore},
    timing::{FrameQueue, MonotonicClock},
};

use eframe::egui;

// ---------------------------------------------------------------------------
// Native options builder
// ---------------------------------------------------------------------------

fn native_options(config: &AppConfig) -> eframe::NativeOptions {
    let (w, h) = config.ui.window_size;
    let vp = egui::ViewportBuilder::default()
        .with_title("Voice Coach")
        .with_inner_size([w, h])
        .with_min_inner_size([380.0, 480.0]);

    eframe::NativeOptions {
        viewport: vp,
        ..Default::default()
    }
}

/// The rodio player, or silence when the output thread cannot start.
fn cue_player() -> Box<dyn CuePlayer> {
    match RodioCuePlayer::new() {
        Ok(player) => Box::new(player),
        Err(e) => {
            log::warn!("Audio cues unavailable ({e}); continuing without sound");
            Box::new(SilentCuePlayer)
        }
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> eframe::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Voice Coach starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 3. Persistent store
    let paths = AppPaths::new();
    let store: SharedStore = Arc::new(JsonFileStore::open(&paths.store_file));
    log::info!("Store file: {}", paths.store_file.display());

    // 4. Language
    let translator = Translator::new(store.clone(), config.ui.language.as_deref());

    // 5. Meter
    let mic: Box<dyn MicrophoneInput> = Box::new(CpalMicrophone::new());
    let meter: Meter = Meter::new(
        mic,
        MonotonicClock::new(),
        FrameQueue::new(),
        store.clone(),
        &config.meter,
    );

    // 6. Breathing timer
    let mut timer: Timer = Timer::new(
        MonotonicClock::new(),
        FrameQueue::new(),
        cue_player(),
        config.breathing.pattern,
    );
    timer.set_session_duration(config.breathing.session_secs);
    timer.set_cue_voice(config.breathing.cue_voice);
    timer.set_cues_enabled(config.breathing.cues_enabled);
    timer.on_complete(|| log::info!("Breathing session complete"));

    // 7. Window (blocks until closed)
    let options = native_options(&config);
    let app = VoiceCoachApp::new(meter, timer, store, translator, config);

    let result = eframe::run_native(
        "Voice Coach",
        options,
        Box::new(move |_cc| Ok(Box::new(app))),
    );
    log::info!("Voice Coach closing");
    result
}
