//! App: terminal init, main loop, cascade pacing and key handling.

use crate::Args;
use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use anyhow::Result;
use cogtui::{Axis, EngineConfig, GameEvent, Move, Phase, Session};
use crossterm::event::{self, Event, KeyEventKind};
use log::{debug, info};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};
use tachyonfx::Effect;

/// Gear percentage step for `+` / `-`.
const GEAR_STEP: u8 = 5;
/// How long a round's score line stays in the sidebar.
const FEEDBACK_LIFETIME_MS: u32 = 2500;
const MAX_FEEDBACK: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Menu,
    Playing,
    QuitMenu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitOption {
    Resume,
    MainMenu,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuTab {
    GridSize,
    Gears,
    Start,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuState {
    pub current_tab: MenuTab,
    pub grid_size: usize,
    pub gear_percentage: u8,
}

impl MenuState {
    fn from_config(config: &EngineConfig) -> Self {
        Self {
            current_tab: MenuTab::GridSize,
            grid_size: config.grid_size,
            gear_percentage: config.gear_percentage,
        }
    }
}

/// Score line for one resolved round; ages out of the sidebar.
#[derive(Debug, Clone, PartialEq)]
pub struct Feedback {
    pub round_score: u64,
    pub multiplier: f64,
    pub gear_count: usize,
    pub age_ms: u32,
}

pub struct App {
    theme: Theme,
    session: Session,
    screen: Screen,
    paused: bool,
    no_animation: bool,
    cursor: (usize, usize),
    /// When the next cascade phase may run; `None` while idle.
    next_phase_at: Option<Instant>,
    /// TachyonFX fade for the cells cleared by the last round.
    clear_effect: Option<Effect>,
    clear_effect_process_time: Option<Instant>,
    menu_state: MenuState,
    /// Largest board that fits the terminal, refreshed while on the menu.
    menu_max_grid: usize,
    quit_selected: QuitOption,
    feedback: Vec<Feedback>,
    /// Why the last key did nothing (rejected move, bad settings).
    status: Option<String>,
    last_frame: Instant,
}

impl App {
    pub fn new(args: &Args, config: EngineConfig, theme: Theme, seed: u64) -> Result<Self> {
        let menu_state = MenuState::from_config(&config);
        let session = Session::new(config, seed)?;
        let screen = if args.no_menu {
            Screen::Playing
        } else {
            Screen::Menu
        };
        Ok(Self {
            theme,
            session,
            screen,
            paused: false,
            no_animation: args.no_animation,
            cursor: (0, 0),
            next_phase_at: None,
            clear_effect: None,
            clear_effect_process_time: None,
            menu_max_grid: menu_state.grid_size,
            menu_state,
            quit_selected: QuitOption::Resume,
            feedback: Vec::new(),
            status: None,
            last_frame: Instant::now(),
        })
    }

    fn reset_game(&mut self) {
        self.session.reset();
        self.enter_new_game();
    }

    /// Front end state for a freshly dealt session.
    fn enter_new_game(&mut self) {
        self.screen = Screen::Playing;
        self.paused = false;
        self.cursor = (0, 0);
        self.next_phase_at = None;
        self.clear_effect = None;
        self.clear_effect_process_time = None;
        self.feedback.clear();
        self.status = None;
    }

    /// Starts a game with the menu's settings.
    fn start_from_menu(&mut self) {
        let mut config = self.session.config().clone();
        config.grid_size = self.menu_state.grid_size;
        config.gear_percentage = self.menu_state.gear_percentage;
        if let Err(e) = self.session.apply_config(config) {
            self.status = Some(e.to_string());
            return;
        }
        self.enter_new_game();
    }

    fn apply_action(&mut self, action: Action, now: Instant) {
        let size = self.session.grid().size();
        let (x, y) = self.cursor;
        match action {
            Action::CursorLeft => self.cursor.0 = (x + size - 1) % size,
            Action::CursorRight => self.cursor.0 = (x + 1) % size,
            Action::CursorUp => self.cursor.1 = (y + size - 1) % size,
            Action::CursorDown => self.cursor.1 = (y + 1) % size,
            Action::SlideLeft => self.submit(Move::row(y, -1), now),
            Action::SlideRight => self.submit(Move::row(y, 1), now),
            Action::SlideUp => self.submit(Move::column(x, -1), now),
            Action::SlideDown => self.submit(Move::column(x, 1), now),
            Action::MoreGears | Action::FewerGears => {
                let pct = self.session.config().gear_percentage;
                let pct = if action == Action::MoreGears {
                    pct.saturating_add(GEAR_STEP).min(100)
                } else {
                    pct.saturating_sub(GEAR_STEP)
                };
                match self.session.set_gear_percentage(pct, now) {
                    Ok(()) => {
                        self.menu_state.gear_percentage = pct;
                        self.status = None;
                    }
                    Err(e) => self.status = Some(e.to_string()),
                }
            }
            Action::Reset => self.reset_game(),
            Action::Confirm | Action::Pause | Action::Quit | Action::None => {}
        }
    }

    /// Commits a shift; the cursor follows the piece it was on.
    fn submit(&mut self, mv: Move, now: Instant) {
        match self.session.submit_move(mv, now) {
            Ok(()) => {
                let size = self.session.grid().size() as i32;
                let (x, y) = self.cursor;
                self.cursor = match mv.axis {
                    Axis::Row => ((x as i32 + mv.delta).rem_euclid(size) as usize, y),
                    Axis::Column => (x, (y as i32 + mv.delta).rem_euclid(size) as usize),
                };
                self.status = None;
                let snap = Duration::from_millis(self.session.config().snap_ms);
                self.next_phase_at = Some(now + snap);
            }
            Err(e) => {
                debug!("move rejected: {e}");
                self.status = Some(e.to_string());
            }
        }
    }

    /// Runs the next cascade phase once its delay has passed.
    fn step_cascade(&mut self, now: Instant) {
        if self.session.phase() == Phase::Idle {
            self.next_phase_at = None;
            return;
        }
        if self.no_animation {
            self.session.resolve(now);
            self.next_phase_at = None;
            return;
        }
        if self.next_phase_at.is_some_and(|t| now < t) {
            return;
        }
        let phase = self.session.advance(now);
        if phase != Phase::Refill {
            self.clear_effect = None;
            self.clear_effect_process_time = None;
        }
        let delay = Duration::from_millis(self.session.config().phase_delay_ms);
        self.next_phase_at = (phase != Phase::Idle).then(|| now + delay);
    }

    fn collect_events(&mut self) {
        for event in self.session.drain_events() {
            match event {
                GameEvent::MatchResolved {
                    matched_cells,
                    gear_count,
                    round_score,
                    multiplier,
                } => {
                    debug!("round: {matched_cells} cells, {gear_count} gears, +{round_score} at x{multiplier:.1}");
                    self.feedback.insert(
                        0,
                        Feedback {
                            round_score,
                            multiplier,
                            gear_count,
                            age_ms: 0,
                        },
                    );
                    self.feedback.truncate(MAX_FEEDBACK);
                }
                GameEvent::GearSpinStarted {
                    cells,
                    direction,
                    duration_ms,
                } => debug!("{} gears spinning {direction:?} for {duration_ms}ms", cells.len()),
                GameEvent::MoveSettled { score, move_count } => {
                    info!("settled after move {move_count}: score {score}")
                }
                GameEvent::GridChanged(_) => {}
            }
        }
    }

    fn tick_feedback(&mut self, delta_ms: u32) {
        self.feedback.retain_mut(|f| {
            f.age_ms = f.age_ms.saturating_add(delta_ms);
            f.age_ms < FEEDBACK_LIFETIME_MS
        });
    }

    fn handle_menu(&mut self, action: Action) -> bool {
        let min_grid = self.session.config().match_length + 1;
        let max_grid = self.menu_max_grid.max(min_grid);
        let m = &mut self.menu_state;
        match action {
            Action::Quit => return false,
            Action::CursorUp => {
                m.current_tab = match m.current_tab {
                    MenuTab::GridSize => MenuTab::Start,
                    MenuTab::Gears => MenuTab::GridSize,
                    MenuTab::Start => MenuTab::Gears,
                };
            }
            Action::CursorDown => {
                m.current_tab = match m.current_tab {
                    MenuTab::GridSize => MenuTab::Gears,
                    MenuTab::Gears => MenuTab::Start,
                    MenuTab::Start => MenuTab::GridSize,
                };
            }
            Action::CursorLeft | Action::CursorRight => {
                let up = action == Action::CursorRight;
                match m.current_tab {
                    MenuTab::GridSize => {
                        let size = if up { m.grid_size + 1 } else { m.grid_size.saturating_sub(1) };
                        m.grid_size = size.clamp(min_grid, max_grid);
                    }
                    MenuTab::Gears => {
                        m.gear_percentage = if up {
                            m.gear_percentage.saturating_add(GEAR_STEP).min(100)
                        } else {
                            m.gear_percentage.saturating_sub(GEAR_STEP)
                        };
                    }
                    MenuTab::Start => {}
                }
            }
            Action::Confirm => {
                if m.current_tab == MenuTab::Start {
                    self.start_from_menu();
                } else {
                    m.current_tab = MenuTab::Start;
                }
            }
            _ => {}
        }
        true
    }

    fn handle_playing(&mut self, action: Action, now: Instant) {
        if action == Action::Quit {
            self.screen = Screen::QuitMenu;
            self.quit_selected = QuitOption::Resume;
        } else if action == Action::Pause {
            self.paused = !self.paused;
        } else if !self.paused {
            self.apply_action(action, now);
        }
    }

    fn handle_quit_menu(&mut self, action: Action) -> bool {
        match action {
            Action::CursorDown | Action::CursorRight => {
                self.quit_selected = match self.quit_selected {
                    QuitOption::Resume => QuitOption::MainMenu,
                    QuitOption::MainMenu => QuitOption::Exit,
                    QuitOption::Exit => QuitOption::Resume,
                };
            }
            Action::CursorUp | Action::CursorLeft => {
                self.quit_selected = match self.quit_selected {
                    QuitOption::Resume => QuitOption::Exit,
                    QuitOption::MainMenu => QuitOption::Resume,
                    QuitOption::Exit => QuitOption::MainMenu,
                };
            }
            Action::Confirm => match self.quit_selected {
                QuitOption::Resume => self.screen = Screen::Playing,
                QuitOption::MainMenu => {
                    self.menu_state = MenuState::from_config(self.session.config());
                    self.screen = Screen::Menu;
                }
                QuitOption::Exit => return false,
            },
            Action::Pause | Action::Quit => self.screen = Screen::Playing,
            _ => {}
        }
        true
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal = ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            let now = Instant::now();
            let delta_ms = now.saturating_duration_since(self.last_frame).as_millis().min(u32::MAX as u128) as u32;
            self.last_frame = now;

            if self.screen == Screen::Menu {
                let (c, r) = crossterm::terminal::size().unwrap_or((80, 24));
                self.menu_max_grid = crate::ui::max_grid_for_terminal(c, r);
            }
            if self.screen == Screen::Playing && !self.paused {
                self.session.tick(now);
                self.step_cascade(now);
                self.tick_feedback(delta_ms);
            }
            self.collect_events();

            terminal.draw(|f| {
                crate::ui::draw(
                    f,
                    crate::ui::View {
                        screen: self.screen,
                        session: &self.session,
                        theme: &self.theme,
                        paused: self.paused,
                        cursor: self.cursor,
                        feedback: &self.feedback,
                        status: self.status.as_deref(),
                        menu_state: &self.menu_state,
                        menu_max_grid: self.menu_max_grid,
                        quit_selected: (self.screen == Screen::QuitMenu).then_some(self.quit_selected),
                        no_animation: self.no_animation,
                    },
                    &mut self.clear_effect,
                    &mut self.clear_effect_process_time,
                    now,
                )
            })?;

            // Limit event polling to hit ~60 FPS rendering (16ms)
            let frame_duration = Duration::from_millis(16);
            let timeout = frame_duration.saturating_sub(now.elapsed());
            if !event::poll(timeout)? {
                continue;
            }
            while event::poll(Duration::ZERO)? {
                let Event::Key(key) = event::read()? else {
                    continue;
                };
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                let action = key_to_action(key);
                let keep_running = match self.screen {
                    Screen::Menu => self.handle_menu(action),
                    Screen::Playing => {
                        self.handle_playing(action, Instant::now());
                        true
                    }
                    Screen::QuitMenu => self.handle_quit_menu(action),
                };
                if !keep_running {
                    return Ok(());
                }
            }
        }
    }
}
