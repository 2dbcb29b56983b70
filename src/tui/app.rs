use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use log::warn;
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crate::audio::analyzer::AnalyzerHandle;
use crate::console::{Console, ConsoleView, ControlEvent};
use crate::eq::presets::PRESETS;
use crate::eq::{BAND_CENTERS_HZ, BAND_COUNT, MAX_GAIN_DB, MIN_GAIN_DB, slider_label};
use crate::source::SourceKind;
use crate::spectrum::FrameLoop;
use crate::spectrum::renderer::SpectrumRenderer;
use crate::tui::canvas::CellCanvas;

const FRAME_INTERVAL: Duration = Duration::from_millis(16);
const Q_STEP: f32 = 0.1;
const LEVEL_STEP: f32 = 0.05;
const SLIDER_ROWS: i32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Mode {
    Normal,
    PresetSelect,
    FileInput,
}

pub struct App {
    console: Console,
    frames: FrameLoop,
    renderer: SpectrumRenderer,
    cursor: usize,
    mode: Mode,
    preset_list_state: ListState,
    path_input: String,
    active_preset: Option<&'static str>,
}

impl App {
    pub fn new(console: Console, analyzer: AnalyzerHandle) -> Self {
        Self {
            console,
            frames: FrameLoop::new(analyzer),
            renderer: SpectrumRenderer::new(0.0, 0.0),
            cursor: 0,
            mode: Mode::Normal,
            preset_list_state: ListState::default(),
            path_input: String::new(),
            active_preset: None,
        }
    }

    pub fn console_mut(&mut self) -> &mut Console {
        &mut self.console
    }

    /// Draw and handle keys until the user quits.
    pub fn run(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> io::Result<()> {
        loop {
            self.console.poll();
            terminal.draw(|frame| self.draw(frame))?;

            if event::poll(FRAME_INTERVAL)?
                && let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press
            {
                if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
                    return Ok(());
                }

                let quit = match self.mode {
                    Mode::Normal => self.handle_normal_key(key),
                    Mode::PresetSelect => {
                        self.handle_preset_select_key(key);
                        false
                    }
                    Mode::FileInput => {
                        self.handle_file_input_key(key);
                        false
                    }
                };
                if quit {
                    return Ok(());
                }
            }
        }
    }

    fn send(&mut self, event: ControlEvent) {
        if let Err(e) = self.console.handle(event) {
            warn!("{e:#}");
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let view = self.console.view();

        let block = Block::default()
            .title(" Equalizer Console ")
            .borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Min(6),
                Constraint::Length(SLIDER_ROWS as u16 * 2 + 5),
                Constraint::Length(1),
                Constraint::Length(2),
            ])
            .split(inner);

        frame.render_widget(Paragraph::new(self.build_status_lines(&view)), chunks[0]);
        self.draw_spectrum(frame, chunks[1]);
        frame.render_widget(Paragraph::new(self.build_slider_lines(&view)), chunks[2]);

        let status = view.status.as_deref().unwrap_or_default();
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(
                status.to_string(),
                Style::default().fg(Color::Yellow),
            ))),
            chunks[3],
        );
        frame.render_widget(self.build_footer(), chunks[4]);

        match self.mode {
            Mode::PresetSelect => self.draw_preset_select(frame, area),
            Mode::FileInput => self.draw_file_input(frame, area),
            Mode::Normal => {}
        }
    }

    fn draw_spectrum(&mut self, frame: &mut Frame, area: Rect) {
        let mut canvas = CellCanvas::new(area.width, area.height);
        let (width, height) = canvas.pixel_size();
        self.renderer.resize(width, height);

        let snapshot = self.frames.tick();
        self.renderer.render(&snapshot, &mut canvas);
        frame.render_widget(Paragraph::new(canvas.lines()), area);
    }

    fn build_status_lines(&self, view: &ConsoleView) -> Vec<Line<'static>> {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let dim = Style::default().fg(Color::DarkGray);

        let source = match (view.selected, view.routing.active, view.mic_pending) {
            (SourceKind::Mic, _, true) => format!("{} (requesting)", view.selected),
            (kind, Some(active), _) if kind == active => format!("{kind} (live)"),
            (kind, _, _) => format!("{kind} (idle)"),
        };
        let noise = if view.noise_level_enabled {
            Span::raw(format!("{:.2}", view.noise_level))
        } else {
            Span::styled(format!("{:.2}", view.noise_level), dim)
        };
        let file = view.loaded_file.as_ref().map_or_else(
            || "none".to_string(),
            |path| path.display().to_string(),
        );

        vec![
            Line::from(vec![
                Span::styled("Source: ", bold),
                Span::raw(format!("{source}  ")),
                Span::styled("Bypass: ", bold),
                Span::raw(if view.routing.bypass { "on  " } else { "off  " }),
                Span::styled("Q: ", bold),
                Span::raw(format!("{:.1}  ", view.q)),
                Span::styled("Master: ", bold),
                Span::raw(format!("{:.2}  ", view.master_volume)),
                Span::styled("Noise: ", bold),
                noise,
            ]),
            Line::from(vec![
                Span::styled("Preset: ", bold),
                Span::raw(format!("{}  ", self.active_preset.unwrap_or("custom"))),
                Span::styled("File: ", bold),
                Span::styled(
                    file,
                    if view.file_picker_visible {
                        Style::default()
                    } else {
                        dim
                    },
                ),
                Span::styled(
                    if self.frames.is_paused() {
                        "  [spectrum paused]"
                    } else {
                        ""
                    },
                    dim,
                ),
            ]),
        ]
    }

    fn build_slider_lines(&self, view: &ConsoleView) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        let step = MAX_GAIN_DB / SLIDER_ROWS as f32;

        let mut label_spans = vec![Span::raw("     ")];
        for (i, &center) in BAND_CENTERS_HZ.iter().enumerate() {
            let label = slider_label(center);
            let style = if i == self.cursor {
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            label_spans.push(Span::styled(format!("{label:^9}"), style));
        }
        lines.push(Line::from(label_spans));

        for row in (-SLIDER_ROWS..=SLIDER_ROWS).rev() {
            let level = row as f32 * step;
            let mut spans = vec![Span::raw(format!("{level:+4.0} "))];

            for (i, &gain) in view.gains.iter().enumerate() {
                let selected = i == self.cursor;
                let (text, color) = if row == 0 {
                    let rule = if selected {
                        "\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}"
                    } else {
                        "\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}"
                    };
                    (rule, Color::Yellow)
                } else if row > 0 && gain >= level - step / 2.0 {
                    ("  \u{2588}  ", Color::Green)
                } else if row < 0 && gain <= level + step / 2.0 {
                    ("  \u{2588}  ", Color::Red)
                } else {
                    ("  \u{00b7}  ", Color::DarkGray)
                };

                let mut style = Style::default().fg(color);
                if selected {
                    style = style.add_modifier(Modifier::BOLD);
                }
                spans.push(Span::styled(format!("  {text}  "), style));
            }
            lines.push(Line::from(spans));
        }

        let mut readout_spans = vec![Span::raw("     ")];
        for (i, readout) in view.readouts.iter().enumerate() {
            let gain = view.gains[i];
            let style = if i == self.cursor {
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else if gain > 0.0 {
                Style::default().fg(Color::Green)
            } else if gain < 0.0 {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };
            readout_spans.push(Span::styled(format!("{readout:^9}"), style));
        }
        lines.push(Line::from(readout_spans));

        lines
    }

    fn build_footer(&self) -> Paragraph<'static> {
        let key = |text: &'static str| {
            Span::styled(text, Style::default().add_modifier(Modifier::BOLD))
        };
        let lines = vec![
            Line::from(vec![
                key("\u{2190}\u{2192}"),
                Span::raw(": Band  "),
                key("\u{2191}\u{2193}"),
                Span::raw(": \u{00b1}1dB  "),
                key("PgUp/Dn"),
                Span::raw(": \u{00b1}3dB  "),
                key("0"),
                Span::raw(": Reset band  "),
                key("r"),
                Span::raw(": Reset all  "),
                key("[ ]"),
                Span::raw(": Q  "),
                key("p"),
                Span::raw(": Presets"),
            ]),
            Line::from(vec![
                key("s"),
                Span::raw(": Source  "),
                key("o"),
                Span::raw(": Open file  "),
                key("Space"),
                Span::raw(": Play  "),
                key("x"),
                Span::raw(": Pause  "),
                key("b"),
                Span::raw(": Bypass  "),
                key("m/M"),
                Span::raw(": Master  "),
                key("n/N"),
                Span::raw(": Noise  "),
                key("v"),
                Span::raw(": Freeze  "),
                key("Esc"),
                Span::raw("/"),
                key("q"),
                Span::raw(": Quit"),
            ]),
        ];
        Paragraph::new(lines)
    }

    /// Returns true to quit.
    fn handle_normal_key(&mut self, key: KeyEvent) -> bool {
        let view = self.console.view();
        let gain = view.gains[self.cursor];

        match key.code {
            KeyCode::Left => {
                self.cursor = (self.cursor + BAND_COUNT - 1) % BAND_COUNT;
            }
            KeyCode::Right => {
                self.cursor = (self.cursor + 1) % BAND_COUNT;
            }
            KeyCode::Up => self.set_gain((gain + 1.0).min(MAX_GAIN_DB)),
            KeyCode::Down => self.set_gain((gain - 1.0).max(MIN_GAIN_DB)),
            KeyCode::PageUp => self.set_gain((gain + 3.0).min(MAX_GAIN_DB)),
            KeyCode::PageDown => self.set_gain((gain - 3.0).max(MIN_GAIN_DB)),
            KeyCode::Char('0') => {
                self.active_preset = None;
                self.send(ControlEvent::BandReset(self.cursor));
            }
            KeyCode::Char('r') => {
                self.active_preset = Some(PRESETS[0].name);
                self.send(ControlEvent::ResetRequested);
            }
            KeyCode::Char('[') => self.send(ControlEvent::GlobalQChanged(view.q - Q_STEP)),
            KeyCode::Char(']') => self.send(ControlEvent::GlobalQChanged(view.q + Q_STEP)),
            KeyCode::Char('m') => {
                self.send(ControlEvent::MasterVolumeChanged(view.master_volume - LEVEL_STEP));
            }
            KeyCode::Char('M') => {
                self.send(ControlEvent::MasterVolumeChanged(view.master_volume + LEVEL_STEP));
            }
            KeyCode::Char('n') => {
                self.send(ControlEvent::NoiseLevelChanged(view.noise_level - LEVEL_STEP));
            }
            KeyCode::Char('N') => {
                self.send(ControlEvent::NoiseLevelChanged(view.noise_level + LEVEL_STEP));
            }
            KeyCode::Char('s') => self.send(ControlEvent::SourceChanged(view.selected.next())),
            KeyCode::Char('b') => self.send(ControlEvent::BypassToggled(!view.routing.bypass)),
            KeyCode::Char(' ') => self.send(ControlEvent::PlayRequested),
            KeyCode::Char('x') => self.send(ControlEvent::PauseRequested),
            KeyCode::Char('v') => self.frames.toggle(),
            KeyCode::Char('o') => {
                self.path_input = view
                    .loaded_file
                    .map(|path| path.display().to_string())
                    .unwrap_or_default();
                self.mode = Mode::FileInput;
            }
            KeyCode::Char('p') => {
                let current = self
                    .active_preset
                    .and_then(|name| PRESETS.iter().position(|p| p.name == name))
                    .unwrap_or(0);
                self.preset_list_state.select(Some(current));
                self.mode = Mode::PresetSelect;
            }
            KeyCode::Esc | KeyCode::Char('q') => return true,
            _ => {}
        }
        false
    }

    fn set_gain(&mut self, db: f32) {
        self.active_preset = None;
        self.send(ControlEvent::BandGainChanged {
            band: self.cursor,
            db,
        });
    }

    fn handle_preset_select_key(&mut self, key: KeyEvent) {
        let len = PRESETS.len();
        match key.code {
            KeyCode::Up => {
                let i = self.preset_list_state.selected().unwrap_or(0);
                self.preset_list_state
                    .select(Some(if i == 0 { len - 1 } else { i - 1 }));
            }
            KeyCode::Down => {
                let i = self.preset_list_state.selected().unwrap_or(0);
                self.preset_list_state.select(Some((i + 1) % len));
            }
            KeyCode::Enter => {
                if let Some(preset) = self
                    .preset_list_state
                    .selected()
                    .and_then(|i| PRESETS.get(i))
                {
                    self.active_preset = Some(preset.name);
                    self.send(ControlEvent::PresetSelected(preset.name.to_string()));
                }
                self.mode = Mode::Normal;
            }
            KeyCode::Esc => {
                self.mode = Mode::Normal;
            }
            _ => {}
        }
    }

    fn handle_file_input_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char(c) => self.path_input.push(c),
            KeyCode::Backspace => {
                self.path_input.pop();
            }
            KeyCode::Enter => {
                let path = self.path_input.trim();
                if !path.is_empty() {
                    let path = PathBuf::from(path);
                    self.send(ControlEvent::FileSelected(path));
                }
                self.path_input.clear();
                self.mode = Mode::Normal;
            }
            KeyCode::Esc => {
                self.path_input.clear();
                self.mode = Mode::Normal;
            }
            _ => {}
        }
    }

    fn draw_preset_select(&mut self, frame: &mut Frame, area: Rect) {
        let popup = centered_rect(40, 50, area);
        frame.render_widget(Clear, popup);

        let block = Block::default()
            .title(" Select Preset ")
            .borders(Borders::ALL);

        let items: Vec<ListItem> = PRESETS
            .iter()
            .map(|p| {
                let style = if Some(p.name) == self.active_preset {
                    Style::default()
                        .fg(Color::Green)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                ListItem::new(p.name).style(style)
            })
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(
                Style::default()
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("\u{25b6} ");

        frame.render_stateful_widget(list, popup, &mut self.preset_list_state);
    }

    fn draw_file_input(&self, frame: &mut Frame, area: Rect) {
        let popup = centered_rect(60, 25, area);
        frame.render_widget(Clear, popup);

        let block = Block::default()
            .title(" Open WAV File ")
            .borders(Borders::ALL);
        let inner = block.inner(popup);
        frame.render_widget(block, popup);

        let lines = vec![
            Line::default(),
            Line::from(vec![
                Span::raw("  Path: "),
                Span::styled(
                    format!("{}_", self.path_input),
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ),
            ]),
            Line::default(),
            Line::from(Span::styled(
                "  Enter: Open  Esc: Cancel",
                Style::default().fg(Color::DarkGray),
            )),
        ];
        frame.render_widget(Paragraph::new(lines), inner);
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
