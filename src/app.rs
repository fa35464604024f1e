//! Voice Coach window: egui/eframe application.
//!
//! # Architecture
//!
//! [`VoiceCoachApp`] is the top-level [`eframe::App`].  It owns one
//! [`LoudnessMeter`], one [`PhaseTimer`] and the current
//! [`RoutineSession`], and drives all three from the UI thread:
//!
//! ```text
//! update() ─┬─ meter.pump()     (one level sample per due frame)
//!           ├─ timer.pump()     (phase transitions, cues)
//!           ├─ routine.tick()   (step countdown)
//!           └─ request_repaint while any of them is running
//! ```
//!
//! # Views
//!
//! | View | Shows |
//! |------|-------|
//! | `Meter` | reading, peak / average / min, calibration, saved log |
//! | `Breathing` | phase, circle, ring, cycles, presets, cue voice |
//! | `Routine` | exercise text, step countdown, navigation |

use chrono::{Datelike, Local};
use eframe::egui;

use crate::audio::{CuePlayer, CueVoice, MicrophoneInput};
use crate::breathing::{BreathingPattern, Phase, PhaseTimer};
use crate::config::AppConfig;
use crate::i18n::{Language, Translator};
use crate::meter::{DeviceClass, LoudnessMeter, USER_OFFSET_RANGE};
use crate::routine::{format_clock, RoutineSession, RoutineState, ROUTINES};
use crate::store::{self, SharedStore};
use crate::timing::{FrameQueue, MonotonicClock};

/// The meter as the window runs it.
pub type Meter = LoudnessMeter<Box<dyn MicrophoneInput>, MonotonicClock, FrameQueue>;

/// The breathing timer as the window runs it.
pub type Timer = PhaseTimer<MonotonicClock, FrameQueue, Box<dyn CuePlayer>>;

/// Session lengths offered in the breathing view; `None` is unlimited.
const SESSION_CHOICES: [Option<u32>; 4] = [Some(180), Some(300), Some(600), None];

const ACCENT: egui::Color32 = egui::Color32::from_rgb(102, 126, 234);
const DIM: egui::Color32 = egui::Color32::from_rgb(140, 140, 140);
const GOOD: egui::Color32 = egui::Color32::from_rgb(76, 175, 80);
const BAD: egui::Color32 = egui::Color32::from_rgb(244, 67, 54);

/// Which page is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Meter,
    Breathing,
    Routine,
}

impl View {
    pub const ALL: [View; 3] = [View::Meter, View::Breathing, View::Routine];

    fn label_key(self) -> &'static str {
        match self {
            View::Meter => "navigation.meter",
            View::Breathing => "navigation.breathing",
            View::Routine => "navigation.routines",
        }
    }
}

/// Colour of a phase in the ring and circle.
fn phase_color(phase: Phase) -> egui::Color32 {
    match phase {
        Phase::Inhale => egui::Color32::from_rgb(76, 175, 80),
        Phase::Hold => egui::Color32::from_rgb(255, 193, 7),
        Phase::Exhale => egui::Color32::from_rgb(33, 150, 243),
    }
}

// ---------------------------------------------------------------------------
// VoiceCoachApp
// ---------------------------------------------------------------------------

pub struct VoiceCoachApp {
    meter: Meter,
    timer: Timer,
    routine: RoutineSession<MonotonicClock>,
    store: SharedStore,
    tr: Translator,
    config: AppConfig,
    view: View,
    /// Last save / store failure, shown under the meter controls.
    notice: Option<String>,
}

impl VoiceCoachApp {
    pub fn new(
        meter: Meter,
        timer: Timer,
        store: SharedStore,
        tr: Translator,
        config: AppConfig,
    ) -> Self {
        let routine = RoutineSession::new(MonotonicClock::new(), store.clone(), ROUTINES[0].id);
        Self {
            meter,
            timer,
            routine,
            store,
            tr,
            config,
            view: View::Meter,
            notice: None,
        }
    }

    /// Persist breathing preferences; failures are only logged.
    fn save_config(&self) {
        if let Err(e) = self.config.save() {
            log::warn!("Failed to save settings: {e}");
        }
    }

    fn advance_engines(&mut self) {
        self.meter.pump();
        self.timer.pump();
        match self.routine.tick() {
            Ok(Some(done)) => log::info!("Routine {} completed in {} s", done.routine_id, done.duration),
            Ok(None) => {}
            Err(e) => log::warn!("Could not record routine completion: {e}"),
        }
    }

    fn any_running(&self) -> bool {
        self.meter.is_recording() || self.timer.is_active() || self.routine.state() == RoutineState::Running
    }

    // ── Header ───────────────────────────────────────────────────────────

    fn draw_header(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new(self.tr.t("app.title")).size(18.0).strong());
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let mut language = self.tr.language();
                egui::ComboBox::from_id_salt("language")
                    .selected_text(language.native_name())
                    .show_ui(ui, |ui| {
                        for l in Language::ALL {
                            ui.selectable_value(&mut language, l, l.native_name());
                        }
                    });
                if language != self.tr.language() {
                    if let Err(e) = self.tr.set_language(language) {
                        log::warn!("Could not remember language: {e}");
                    }
                }
                ui.label(egui::RichText::new(self.tr.t("app.language")).color(DIM));
            });
        });
        ui.horizontal(|ui| {
            for view in View::ALL {
                if ui
                    .selectable_label(self.view == view, self.tr.t(view.label_key()))
                    .clicked()
                {
                    self.view = view;
                }
            }
        });
    }

    // ── Meter view ───────────────────────────────────────────────────────

    fn draw_meter(&mut self, ui: &mut egui::Ui) {
        ui.label(egui::RichText::new(self.tr.t("dbmeter.title")).size(16.0).strong());
        ui.label(egui::RichText::new(self.tr.t("dbmeter.subtitle")).color(DIM));
        ui.add_space(8.0);

        let reading = self
            .meter
            .current_reading()
            .map_or_else(|| self.tr.t("dbmeter.no_signal"), |db| db.to_string());
        ui.vertical_centered(|ui| {
            ui.label(egui::RichText::new(self.tr.t("dbmeter.current_reading")).color(DIM));
            ui.label(
                egui::RichText::new(format!("{reading} {}", self.tr.t("dbmeter.unit")))
                    .size(48.0)
                    .color(ACCENT),
            );
        });

        if let Some(err) = self.meter.last_error() {
            ui.label(egui::RichText::new(self.tr.t("dbmeter.microphone_permission_required")).color(BAD));
            ui.label(egui::RichText::new(err).color(DIM).size(11.0));
        }

        ui.add_space(6.0);
        ui.horizontal(|ui| {
            if self.meter.is_recording() {
                if ui.button(self.tr.t("dbmeter.stop_measuring")).clicked() {
                    self.meter.stop();
                }
            } else if ui.button(self.tr.t("dbmeter.start_measuring")).clicked() {
                // The error is kept on the meter and shown above.
                let _ = self.meter.start();
            }
            if ui.button(self.tr.t("dbmeter.reset")).clicked() {
                self.meter.reset();
            }
            let can_save = self.meter.session().has_data();
            if ui
                .add_enabled(can_save, egui::Button::new(self.tr.t("dbmeter.save_current_reading")))
                .clicked()
            {
                self.notice = match self.meter.save_snapshot() {
                    Ok(_) => None,
                    Err(e) => Some(self.tr.t_with("dbmeter.save_failed", &[("error", e.to_string().as_str())])),
                };
            }
        });
        if let Some(notice) = &self.notice {
            ui.label(egui::RichText::new(notice).color(BAD));
        }

        ui.add_space(8.0);
        let session = self.meter.session();
        ui.columns(3, |cols| {
            let stats = [
                ("dbmeter.peak", session.peak_db()),
                ("dbmeter.average", session.avg_db()),
                ("dbmeter.min", session.min_db_or_zero()),
            ];
            for (col, (key, value)) in cols.iter_mut().zip(stats) {
                col.vertical_centered(|ui| {
                    ui.label(egui::RichText::new(self.tr.t(key)).color(DIM));
                    ui.label(egui::RichText::new(value.to_string()).size(22.0));
                });
            }
        });

        ui.separator();
        self.draw_calibration(ui);
        ui.separator();
        self.draw_saved_log(ui);
        ui.add_space(6.0);
        ui.label(egui::RichText::new(self.tr.t("dbmeter.disclaimer")).color(DIM).size(10.0));
    }

    fn draw_calibration(&mut self, ui: &mut egui::Ui) {
        ui.label(egui::RichText::new(self.tr.t("dbmeter.calibration_title")).strong());
        let current = self.meter.calibration().user_offset_db() as i32;
        let mut offset = current;
        ui.horizontal(|ui| {
            ui.add(egui::Slider::new(&mut offset, USER_OFFSET_RANGE).show_value(false));
            let shown = format!("{offset:+}");
            ui.label(self.tr.t_with("dbmeter.calibration_label", &[("offset", shown.as_str())]));
        });
        if offset != current {
            if let Err(e) = self.meter.calibration().set_user_offset_db(offset) {
                log::warn!("Could not save calibration: {e}");
            }
        }
        ui.horizontal(|ui| {
            if ui.button(self.tr.t("dbmeter.calibration_reset")).clicked() {
                if let Err(e) = self.meter.calibration().reset() {
                    log::warn!("Could not reset calibration: {e}");
                }
            }
            let device = match self.meter.device_class() {
                DeviceClass::Desktop => self.tr.t("dbmeter.device_desktop"),
                DeviceClass::Mobile => self.tr.t("dbmeter.device_mobile"),
            };
            ui.label(egui::RichText::new(self.tr.t_with("dbmeter.device", &[("device", device.as_str())])).color(DIM));
        });
        ui.label(egui::RichText::new(self.tr.t("dbmeter.calibration_note")).color(DIM).size(11.0));
    }

    fn draw_saved_log(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new(self.tr.t("dbmeter.session_log")).strong());
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.small_button(self.tr.t("dbmeter.clear_log")).clicked() {
                    if let Err(e) = store::clear_measurements(self.store.as_ref()) {
                        log::warn!("Could not clear measurements: {e}");
                    }
                }
            });
        });
        let rows = store::recent_measurements(self.store.as_ref(), self.config.meter.history_rows);
        if rows.is_empty() {
            ui.label(egui::RichText::new(self.tr.t("dbmeter.no_readings_saved")).color(DIM));
            return;
        }
        egui::Grid::new("saved_log").striped(true).show(ui, |ui| {
            for row in rows.iter().rev() {
                ui.label(&row.date);
                ui.label(format!("{} {}", self.tr.t("dbmeter.peak"), row.peak));
                ui.label(format!("{} {}", self.tr.t("dbmeter.average"), row.average));
                ui.label(format!("{} {}", self.tr.t("dbmeter.min"), row.minimum));
                ui.end_row();
            }
        });
    }

    // ── Breathing view ───────────────────────────────────────────────────

    fn draw_breathing(&mut self, ui: &mut egui::Ui) {
        let pattern = self.timer.pattern();
        ui.label(egui::RichText::new(self.tr.t("breathing.title")).size(16.0).strong());
        ui.label(
            egui::RichText::new(format!("{pattern} {}", self.tr.t("breathing.breathing"))).color(DIM),
        );
        ui.add_space(6.0);

        self.draw_breath_circle(ui);

        let phase = self.timer.phase();
        ui.vertical_centered(|ui| {
            ui.label(
                egui::RichText::new(self.tr.t(phase.label_key()))
                    .size(24.0)
                    .color(phase_color(phase)),
            );
            ui.label(format!("{}s", self.timer.time_left_sec()));
            ui.label(egui::RichText::new(self.tr.t(phase.instruction_key())).color(DIM));
        });

        ui.add(egui::ProgressBar::new(self.timer.progress() as f32));
        ui.horizontal(|ui| {
            let cycles = self.timer.cycle_count().to_string();
            ui.label(self.tr.t_with("breathing.cycles", &[("count", cycles.as_str())]));
            let elapsed = self.timer.elapsed_sec();
            ui.label(format!("{}: {}", self.tr.t("breathing.session"), format_clock(elapsed)));
            if let Some(total) = self.timer.session_secs() {
                let left = u64::from(total).saturating_sub(elapsed);
                ui.label(format!("{} {}", format_clock(left), self.tr.t("breathing.left")));
            }
        });

        if self.timer.is_complete() {
            ui.label(egui::RichText::new(self.tr.t("breathing.complete")).color(GOOD).strong());
        }

        ui.horizontal(|ui| {
            let toggle = if self.timer.is_active() {
                "breathing.pause"
            } else if self.timer.is_paused() {
                "breathing.resume"
            } else {
                "breathing.start"
            };
            if ui
                .add_enabled(!self.timer.is_complete(), egui::Button::new(self.tr.t(toggle)))
                .clicked()
            {
                self.timer.start_or_toggle();
            }
            if ui.button(self.tr.t("breathing.reset")).clicked() {
                self.timer.reset();
            }
        });

        ui.separator();
        self.draw_breathing_settings(ui);
    }

    /// Circle scaled by the breath, inside a ring split by phase.
    fn draw_breath_circle(&self, ui: &mut egui::Ui) {
        let size = 180.0;
        let (rect, _) = ui.allocate_exact_size(egui::vec2(ui.available_width(), size), egui::Sense::hover());
        let painter = ui.painter();
        let center = rect.center();
        let ring_radius = size * 0.45;

        for segment in self.timer.ring_segments() {
            let steps = 32;
            let points: Vec<egui::Pos2> = (0..=steps)
                .map(|i| {
                    let frac = segment.start + segment.length * f64::from(i) / f64::from(steps);
                    let angle = (frac * std::f64::consts::TAU - std::f64::consts::FRAC_PI_2) as f32;
                    center + ring_radius * egui::vec2(angle.cos(), angle.sin())
                })
                .collect();
            painter.add(egui::Shape::line(points, egui::Stroke::new(6.0, phase_color(segment.phase))));
        }

        let marker_angle = (self.timer.progress() * std::f64::consts::TAU - std::f64::consts::FRAC_PI_2) as f32;
        painter.circle_filled(
            center + ring_radius * egui::vec2(marker_angle.cos(), marker_angle.sin()),
            6.0,
            egui::Color32::WHITE,
        );

        let radius = size * 0.2 * self.timer.breath_scale() as f32;
        painter.circle_filled(center, radius, phase_color(self.timer.phase()).gamma_multiply(0.6));
    }

    fn draw_breathing_settings(&mut self, ui: &mut egui::Ui) {
        let mut changed = false;

        ui.horizontal(|ui| {
            ui.label(self.tr.t("breathing.pattern"));
            let current = self.timer.pattern();
            for (name, preset) in BreathingPattern::PRESETS {
                if ui.selectable_label(current == preset, name).clicked() && current != preset {
                    self.timer.apply_pattern(preset);
                    self.config.breathing.pattern = preset;
                    changed = true;
                }
            }
        });

        ui.horizontal(|ui| {
            ui.label(self.tr.t("breathing.session_length"));
            let mut secs = self.timer.session_secs();
            let label = |s: Option<u32>| match s {
                Some(s) => self.tr.t_with("breathing.minutes", &[("count", (s / 60).to_string().as_str())]),
                None => self.tr.t("breathing.unlimited"),
            };
            egui::ComboBox::from_id_salt("session_length")
                .selected_text(label(secs))
                .show_ui(ui, |ui| {
                    for choice in SESSION_CHOICES {
                        ui.selectable_value(&mut secs, choice, label(choice));
                    }
                });
            if secs != self.timer.session_secs() {
                self.timer.set_session_duration(secs);
                self.config.breathing.session_secs = secs;
                changed = true;
            }
        });

        ui.horizontal(|ui| {
            let mut enabled = self.timer.cues_enabled();
            if ui.checkbox(&mut enabled, self.tr.t("breathing.sound_enabled")).changed() {
                self.timer.set_cues_enabled(enabled);
                self.config.breathing.cues_enabled = enabled;
                changed = true;
            }
            let mut voice = self.timer.cue_voice();
            egui::ComboBox::from_id_salt("cue_voice")
                .selected_text(self.tr.t(voice.label_key()))
                .show_ui(ui, |ui| {
                    for v in CueVoice::ALL {
                        ui.selectable_value(&mut voice, v, self.tr.t(v.label_key()));
                    }
                });
            if voice != self.timer.cue_voice() {
                self.timer.set_cue_voice(voice);
                self.config.breathing.cue_voice = voice;
                changed = true;
            }
        });

        if changed {
            self.save_config();
        }
    }

    // ── Routine view ─────────────────────────────────────────────────────

    fn draw_routine(&mut self, ui: &mut egui::Ui) {
        let current_id = self.routine.routine().id;
        let mut selected = current_id;
        egui::ComboBox::from_id_salt("routine")
            .selected_text(self.tr.t(&format!("routines.{current_id}")))
            .show_ui(ui, |ui| {
                for r in ROUTINES {
                    let text = format!(
                        "{} ({})",
                        self.tr.t(&format!("routines.{}", r.id)),
                        self.tr.t_with("routines.minutes", &[("count", r.nominal_minutes.to_string().as_str())])
                    );
                    ui.selectable_value(&mut selected, r.id, text);
                }
            });
        if selected != current_id {
            self.routine = RoutineSession::new(MonotonicClock::new(), self.store.clone(), selected);
        }

        let progress = self.routine.progress();
        ui.horizontal(|ui| {
            let (current, total) = (progress.current.to_string(), progress.total.to_string());
            ui.label(self.tr.t_with("timer.step_of", &[("current", current.as_str()), ("total", total.as_str())]));
            let percent = (progress.percentage.round() as u32).to_string();
            ui.label(
                egui::RichText::new(self.tr.t_with("timer.percent_complete", &[("percent", percent.as_str())])).color(DIM),
            );
        });
        ui.add(egui::ProgressBar::new((progress.percentage / 100.0) as f32));

        if self.routine.state() == RoutineState::Complete {
            self.draw_routine_complete(ui);
            return;
        }

        let exercise = self.routine.current_exercise();
        let content = self.tr.exercise_content(exercise.id);
        ui.add_space(6.0);
        ui.label(egui::RichText::new(&content.name).size(18.0).strong());
        ui.horizontal(|ui| {
            ui.label(
                egui::RichText::new(format!(
                    "{}: {}",
                    self.tr.t("timer.duration"),
                    format_clock(u64::from(exercise.duration_secs))
                ))
                .color(DIM),
            );
            if exercise.optional {
                ui.label(egui::RichText::new(self.tr.t("routines.optional_exercise")).color(DIM).italics());
            }
            if !exercise.is_scheduled_on(Local::now().weekday()) {
                ui.label(egui::RichText::new(self.tr.t("routines.not_today")).color(DIM).italics());
            }
        });
        if exercise.warning {
            ui.label(egui::RichText::new(self.tr.t("routines.warning")).color(BAD));
        }
        ui.label(&content.instructions);

        ui.columns(2, |cols| {
            let lists = [
                ("exercise.do", &content.dos, GOOD),
                ("exercise.dont", &content.donts, BAD),
            ];
            for (col, (key, items, color)) in cols.iter_mut().zip(lists) {
                col.label(egui::RichText::new(self.tr.t(key)).color(color).strong());
                for item in items {
                    col.label(format!("• {item}"));
                }
            }
        });

        if let Some(pattern) = exercise.breathing_pattern {
            if ui.button(self.tr.t("routines.use_pattern")).clicked() {
                self.timer.apply_pattern(pattern);
                self.view = View::Breathing;
            }
        }

        ui.add_space(6.0);
        ui.vertical_centered(|ui| {
            ui.label(egui::RichText::new(self.tr.t("timer.time_left")).color(DIM));
            ui.label(
                egui::RichText::new(format_clock(self.routine.step_time_left_secs()))
                    .size(36.0)
                    .color(ACCENT),
            );
            if self.routine.step_time_left_secs() == 0 && self.routine.elapsed_secs() > 0 {
                ui.label(egui::RichText::new(self.tr.t("timer.exercise_complete")).color(GOOD));
            }
        });

        ui.horizontal(|ui| {
            let toggle = match self.routine.state() {
                RoutineState::Running => "timer.pause",
                RoutineState::Paused => "timer.resume",
                _ => "timer.start",
            };
            if ui.button(self.tr.t(toggle)).clicked() {
                if self.routine.state() == RoutineState::Running {
                    self.routine.pause();
                } else {
                    self.routine.start();
                }
            }
            if ui.button(self.tr.t("timer.reset")).clicked() {
                self.routine.reset();
            }
        });

        ui.horizontal(|ui| {
            let first = self.routine.current_step() == 0;
            if ui
                .add_enabled(!first, egui::Button::new(self.tr.t("navigation.previous")))
                .clicked()
            {
                self.routine.previous_step();
            }
            let last = self.routine.current_step() + 1 == self.routine.routine().len();
            let next_key = if last { "navigation.complete_session" } else { "navigation.next" };
            if ui.button(self.tr.t(next_key)).clicked() {
                if let Err(e) = self.routine.next_step() {
                    log::warn!("Could not record routine completion: {e}");
                }
            }
        });

        ui.label(
            egui::RichText::new(format!(
                "{}: {}",
                self.tr.t("timer.total_time"),
                format_clock(self.routine.elapsed_secs())
            ))
            .color(DIM),
        );
    }

    fn draw_routine_complete(&mut self, ui: &mut egui::Ui) {
        ui.add_space(12.0);
        ui.vertical_centered(|ui| {
            ui.label(egui::RichText::new(self.tr.t("routines.completed")).size(22.0).color(GOOD));
            if let Some(done) = self.routine.completion() {
                ui.label(format!("{}: {}", self.tr.t("timer.total_time"), format_clock(done.duration)));
            }
            let count = store::load_completions(self.store.as_ref()).len().to_string();
            ui.label(egui::RichText::new(self.tr.t_with("routines.history", &[("count", count.as_str())])).color(DIM));
            if ui.button(self.tr.t("timer.reset")).clicked() {
                self.routine.reset();
            }
        });
    }
}

// ---------------------------------------------------------------------------
// eframe::App impl
// ---------------------------------------------------------------------------

impl eframe::App for VoiceCoachApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.advance_engines();

        // Frames are only requested while something is moving.
        if self.any_running() {
            ctx.request_repaint();
        }

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.add_space(4.0);
            self.draw_header(ui);
            ui.add_space(4.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| match self.view {
                View::Meter => self.draw_meter(ui),
                View::Breathing => self.draw_breathing(ui),
                View::Routine => self.draw_routine(ui),
            });
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
