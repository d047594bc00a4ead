mod config;

use std::time::Duration;

use eframe::emath::Align2;
use eframe::{egui, Frame};
use egui::epaint::TextShape;
use egui::{Align, Context, FontId, Rounding, Sense, WidgetText};
use egui_toast::{Toast, ToastKind, ToastOptions, Toasts};
use reqwest::Client;
use tokio::runtime::Runtime;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{error, warn};

use evermore_client::client::{fetch_rsvps, submit_rsvp};
use evermore_client::wall::{build_wall, Bubble};
use evermore_client::ClientError;
use evermore_common::{escape_markup, RsvpForm};

use crate::config::Config;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let config = Config::load();
    let options = eframe::NativeOptions {
        initial_window_size: Some(egui::vec2(480.0, 720.0)),
        ..Default::default()
    };
    let rt = Runtime::new()?;
    eframe::run_native(
        "Evermore",
        options,
        Box::new(|_cc| Box::new(InviteApp::new(rt, config))),
    )
    .unwrap();
    Ok(())
}

enum AppEvent {
    SubmitFinished {
        guest: String,
        result: Result<(), ClientError>,
    },
    WallFetched(Result<Vec<Bubble>, ClientError>),
}

enum Screen {
    Welcome,
    Main,
}

struct InviteApp {
    config: Config,
    runtime: Runtime,
    client: Client,
    toasts: Toasts,
    events_tx: UnboundedSender<AppEvent>,
    events_rx: UnboundedReceiver<AppEvent>,

    screen: Screen,
    music_playing: bool,
    opened_at: Option<f64>,
    scroll_hint_dismissed: bool,

    name: String,
    attendance: String,
    message: String,
    submit_in_flight: bool,

    wall: Vec<Bubble>,
    wall_refresh_pending: bool,
    scroll_on_next_wall: bool,
    scroll_to_wall: bool,
}

impl InviteApp {
    fn new(runtime: Runtime, config: Config) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let mut app = Self {
            config,
            runtime,
            client: Client::new(),
            toasts: Toasts::new()
                .anchor(Align2::LEFT_TOP, (10.0, 10.0))
                .direction(egui::Direction::TopDown),
            events_tx,
            events_rx,
            screen: Screen::Welcome,
            music_playing: false,
            opened_at: None,
            scroll_hint_dismissed: false,
            name: String::new(),
            attendance: String::from("yes"),
            message: String::new(),
            submit_in_flight: false,
            wall: Vec::new(),
            wall_refresh_pending: false,
            scroll_on_next_wall: false,
            scroll_to_wall: false,
        };
        // the original page paints the wall once on load
        app.refresh_wall(Duration::ZERO);
        app
    }

    fn toast(&mut self, kind: ToastKind, text: String) {
        self.toasts.add(Toast {
            kind,
            text: WidgetText::from(text),
            options: ToastOptions::default()
                .duration_in_seconds(4.0)
                .show_progress(true)
                .show_icon(true),
        });
    }

    fn refresh_wall(&mut self, delay: Duration) {
        self.wall_refresh_pending = true;
        let client = self.client.clone();
        let sheet = self.config.sheet_url.clone();
        let tx = self.events_tx.clone();
        self.runtime.spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let wall = fetch_rsvps(&client, &sheet).await.map(build_wall);
            let _ = tx.send(AppEvent::WallFetched(wall));
        });
    }

    fn submit(&mut self) {
        self.submit_in_flight = true;
        let client = self.client.clone();
        let sheet = self.config.sheet_url.clone();
        let tx = self.events_tx.clone();
        let form = RsvpForm {
            name: self.name.trim().to_string(),
            attendance: self.attendance.clone(),
            message: self.message.clone(),
        };
        self.runtime.spawn(async move {
            let guest = form.name.clone();
            let result = submit_rsvp(&client, &sheet, &form).await;
            let _ = tx.send(AppEvent::SubmitFinished { guest, result });
        });
    }

    fn apply_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::SubmitFinished { guest, result } => {
                // the submit control comes back on every completion path
                self.submit_in_flight = false;
                match result {
                    Ok(()) => {
                        self.toast(
                            ToastKind::Success,
                            format!("Thank you, {guest}! Your RSVP has been sent."),
                        );
                        self.name.clear();
                        self.message.clear();
                        self.attendance = String::from("yes");
                        // give the sheet a moment to settle before repainting
                        self.scroll_on_next_wall = true;
                        self.refresh_wall(Duration::from_secs(1));
                    }
                    Err(err) => {
                        error!("rsvp submission failed: {err}");
                        self.toast(
                            ToastKind::Error,
                            String::from("Something went wrong. Please check your connection."),
                        );
                    }
                }
            }
            AppEvent::WallFetched(result) => {
                self.wall_refresh_pending = false;
                match result {
                    Ok(bubbles) => {
                        if self.scroll_on_next_wall && !bubbles.is_empty() {
                            self.scroll_to_wall = true;
                        }
                        self.scroll_on_next_wall = false;
                        self.wall = bubbles;
                    }
                    // a failed fetch keeps whatever the wall showed before
                    Err(err) => warn!("fetching messages failed: {err}"),
                }
            }
        }
    }

    fn welcome_screen(&mut self, ctx: &Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(120.0);
                ui.heading("Mara & Jonas");
                ui.label("are getting married");
                ui.add_space(8.0);
                ui.label(format!("Dear {},", escape_markup(&self.config.guest_name)));
                ui.label("we would be honored to have you with us.");
                ui.add_space(24.0);
                if ui.button("Open invitation").clicked() {
                    self.screen = Screen::Main;
                    // the background track starts with the reveal
                    self.music_playing = true;
                    self.opened_at = Some(ui.input(|i| i.time));
                }
            });
        });
    }

    fn main_screen(&mut self, ctx: &Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let output = egui::ScrollArea::vertical().show(ui, |ui| {
                ui.vertical_centered(|ui| {
                    ui.add_space(16.0);
                    ui.heading("Mara & Jonas");
                    ui.label("Saturday, June 20th 2026 · Lakeside Pavilion");
                    ui.label(format!(
                        "Dear {}, join us for the celebration.",
                        escape_markup(&self.config.guest_name)
                    ));
                });
                ui.add_space(24.0);
                self.rsvp_form(ui);
                ui.add_space(24.0);
                self.message_wall(ui);
                ui.add_space(32.0);
            });
            if output.state.offset.y > 50.0 {
                self.scroll_hint_dismissed = true;
            }
        });

        self.music_button(ctx);
        self.scroll_hint(ctx);
    }

    fn rsvp_form(&mut self, ui: &mut egui::Ui) {
        ui.group(|ui| {
            ui.heading("RSVP");
            ui.horizontal(|ui| {
                ui.label("Name");
                ui.text_edit_singleline(&mut self.name);
            });
            egui::ComboBox::from_label("Will you attend?")
                .selected_text(if self.attendance == "yes" {
                    "Joyfully accepts"
                } else {
                    "Regretfully declines"
                })
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut self.attendance, String::from("yes"), "Joyfully accepts");
                    ui.selectable_value(&mut self.attendance, String::from("no"), "Regretfully declines");
                });
            ui.label("A few words for the couple (optional)");
            ui.text_edit_multiline(&mut self.message);
            let label = if self.submit_in_flight { "Sending…" } else { "Send RSVP" };
            if ui
                .add_enabled(!self.submit_in_flight, egui::Button::new(label))
                .clicked()
            {
                self.submit();
            }
        });
    }

    fn message_wall(&mut self, ui: &mut egui::Ui) {
        // the section disappears outright when nothing passes the filter
        if self.wall.is_empty() {
            return;
        }
        let heading = ui.heading("Well wishes");
        if std::mem::take(&mut self.scroll_to_wall) {
            heading.scroll_to_me(Some(Align::TOP));
        }
        ui.add_space(8.0);
        for bubble in &self.wall {
            bubble_ui(ui, bubble);
            ui.add_space(10.0);
        }
    }

    fn music_button(&mut self, ctx: &Context) {
        egui::Area::new("music-toggle")
            .anchor(Align2::RIGHT_TOP, egui::vec2(-12.0, 12.0))
            .show(ctx, |ui| {
                let label = if self.music_playing { "♪ on" } else { "♪ off" };
                if ui.button(label).clicked() {
                    self.music_playing = !self.music_playing;
                }
            });
    }

    fn scroll_hint_active(&self, ctx: &Context) -> bool {
        if self.scroll_hint_dismissed {
            return false;
        }
        match self.opened_at {
            // auto-hide five seconds after the invitation opens
            Some(opened_at) => ctx.input(|i| i.time) - opened_at < 5.0,
            None => false,
        }
    }

    fn scroll_hint(&mut self, ctx: &Context) {
        if !self.scroll_hint_active(ctx) {
            return;
        }
        egui::Area::new("scroll-hint")
            .anchor(Align2::CENTER_BOTTOM, egui::vec2(0.0, -16.0))
            .show(ctx, |ui| {
                ui.label("scroll for more ↓");
            });
    }
}

impl eframe::App for InviteApp {
    fn update(&mut self, ctx: &Context, _frame: &mut Frame) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply_event(event);
        }

        match self.screen {
            Screen::Welcome => self.welcome_screen(ctx),
            Screen::Main => self.main_screen(ctx),
        }

        self.toasts.show(ctx);

        // keep polling while anything is in flight or the hint is timing out
        if self.submit_in_flight || self.wall_refresh_pending || self.scroll_hint_active(ctx) {
            ctx.request_repaint_after(Duration::from_millis(200));
        }
    }
}

/// Paints one note: a rounded card with the guest's name over the quoted
/// message, the text tilted by the bubble's rotation.
fn bubble_ui(ui: &mut egui::Ui, bubble: &Bubble) {
    let wrap_width = (ui.available_width() - 48.0).min(320.0);
    let name_galley = ui.painter().layout(
        bubble.name.clone(),
        FontId::proportional(15.0),
        ui.visuals().strong_text_color(),
        wrap_width,
    );
    let message_galley = ui.painter().layout(
        format!("\u{201c}{}\u{201d}", bubble.message),
        FontId::proportional(13.0),
        ui.visuals().text_color(),
        wrap_width,
    );
    let name_height = name_galley.size().y;
    let size = egui::vec2(
        name_galley.size().x.max(message_galley.size().x) + 24.0,
        name_height + message_galley.size().y + 22.0,
    );
    let (rect, _response) = ui.allocate_exact_size(size, Sense::hover());
    if !ui.is_rect_visible(rect) {
        return;
    }
    ui.painter()
        .rect_filled(rect, Rounding::same(6.0), ui.visuals().extreme_bg_color);
    let angle = bubble.rotation_deg.to_radians();
    let mut name_shape = TextShape::new(rect.min + egui::vec2(12.0, 8.0), name_galley);
    name_shape.angle = angle;
    ui.painter().add(name_shape);
    let mut message_shape = TextShape::new(
        rect.min + egui::vec2(12.0, 12.0 + name_height),
        message_galley,
    );
    message_shape.angle = angle;
    ui.painter().add(message_shape);
}
