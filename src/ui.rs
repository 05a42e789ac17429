//! UI: board, gear links, sidebar, menu and overlays; TachyonFX fade for cleared cells.

use crate::app::{Feedback, MenuState, MenuTab, QuitOption, Screen};
use crate::theme::Theme;
use cogtui::gears::LinkDirection;
use cogtui::{Phase, Piece, Session, SpinDirection};
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Paragraph, Widget, Wrap};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Each board cell is 4x2 terminal cells: a 3-wide piece, then the link gaps right and below.
const CELL_WIDTH: u16 = 4;
const CELL_HEIGHT: u16 = 2;
const PIECE_WIDTH: u16 = 3;
const SIDEBAR_WIDTH: u16 = 28;
const SIDEBAR_HEIGHT: u16 = 28;
/// Largest board offered on the menu, however big the terminal.
pub const MAX_GRID: usize = 16;

/// Duration of the fade on cleared cells (TachyonFX).
const CLEAR_FADE_MS: u32 = 400;

/// Spinner frames in clockwise order; one frame per `SPIN_FRAME_MS`.
const SPINNER: [char; 4] = ['|', '/', '─', '\\'];
const SPIN_FRAME_MS: f64 = 120.0;

/// Everything the draw pass reads from the app.
pub struct View<'a> {
    pub screen: Screen,
    pub session: &'a Session,
    pub theme: &'a Theme,
    pub paused: bool,
    pub cursor: (usize, usize),
    pub feedback: &'a [Feedback],
    pub status: Option<&'a str>,
    pub menu_state: &'a MenuState,
    pub menu_max_grid: usize,
    pub quit_selected: Option<QuitOption>,
    pub no_animation: bool,
}

/// Board size in terminal cells, border included.
fn board_pixel_size(size: usize) -> (u16, u16) {
    let n = size as u16;
    (n * CELL_WIDTH + 1 + 2, n * CELL_HEIGHT + 1 + 2)
}

/// Largest board side that fits next to the sidebar in the given terminal.
pub fn max_grid_for_terminal(term_cols: u16, term_rows: u16) -> usize {
    let max_w = term_cols.saturating_sub(SIDEBAR_WIDTH + 3) / CELL_WIDTH;
    let max_h = term_rows.saturating_sub(3) / CELL_HEIGHT;
    (max_w.min(max_h) as usize).min(MAX_GRID)
}

/// Top-left terminal cell of the piece at (x, y) inside the board's inner rect.
fn cell_origin(inner: Rect, x: usize, y: usize) -> (u16, u16) {
    (
        inner.x + 1 + x as u16 * CELL_WIDTH,
        inner.y + 1 + y as u16 * CELL_HEIGHT,
    )
}

/// Board and sidebar rects, centered; matches what `draw_game` renders.
fn game_layout(area: Rect, size: usize) -> (Rect, Rect) {
    let (pw, ph) = board_pixel_size(size);
    let total_w = pw + SIDEBAR_WIDTH;
    let total_h = ph.max(SIDEBAR_HEIGHT);

    let horiz_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_h),
            Constraint::Fill(1),
        ])
        .split(horiz_chunks[1]);
    let active = vert_chunks[1];

    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(pw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(active);
    let board = Rect {
        height: ph.min(inner[0].height),
        ..inner[0]
    };
    (board, inner[1])
}

/// Glyph inside a gear: spinner while spinning, a star when linked, a dot when alone.
pub fn gear_glyph(piece: &Piece, now: Instant) -> char {
    if piece.spin_active(now) {
        let elapsed_ms = piece.spin_progress(now) * piece.spin_duration_ms as f64;
        let frame = (elapsed_ms / SPIN_FRAME_MS) as usize % SPINNER.len();
        return match piece.direction {
            Some(SpinDirection::CounterClockwise) => SPINNER[(SPINNER.len() - frame) % SPINNER.len()],
            _ => SPINNER[frame],
        };
    }
    if piece.rotating { '✻' } else { '•' }
}

/// Bounds-checked write of one symbol.
fn put(buf: &mut Buffer, x: u16, y: u16, symbol: &str, style: Style) {
    if buf.area.contains(Position { x, y }) {
        buf[(x, y)].set_symbol(symbol).set_style(style);
    }
}

fn draw_piece(buf: &mut Buffer, theme: &Theme, piece: &Piece, origin: (u16, u16), now: Instant) {
    let (ox, oy) = origin;
    let color = theme.piece_color(piece.color);
    if piece.is_gear {
        let mut style = Style::default().fg(theme.bg).bg(color);
        if piece.rotating {
            style = style.add_modifier(Modifier::BOLD);
        }
        let glyph = gear_glyph(piece, now).to_string();
        put(buf, ox, oy, "(", style);
        put(buf, ox + 1, oy, &glyph, style);
        put(buf, ox + 2, oy, ")", style);
    } else {
        let style = Style::default().fg(color).bg(theme.bg);
        for dx in 0..PIECE_WIDTH {
            put(buf, ox + dx, oy, "█", style);
        }
    }
}

/// Create or update the fade on cells cleared by the last round and process it.
fn apply_clear_effect(
    frame: &mut Frame,
    view: &View,
    board_rect: Rect,
    clear_effect: &mut Option<Effect>,
    clear_process_time: &mut Option<Instant>,
    now: Instant,
) {
    let delta = clear_process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    let tfx_delta = TfxDuration::from_millis(delta_ms);
    *clear_process_time = Some(now);

    if clear_effect.is_none() {
        let inner = board_block(view.theme, view.session).inner(board_rect);
        let clearing_set: HashSet<(u16, u16)> = view
            .session
            .last_cleared()
            .iter()
            .flat_map(|c| {
                let (ox, oy) = cell_origin(inner, c.x, c.y);
                (0..PIECE_WIDTH).map(move |dx| (ox + dx, oy))
            })
            .collect();
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            clearing_set.contains(&(pos.x, pos.y))
        }));
        let bg = view.theme.bg;
        let effect = fx::fade_to(bg, bg, (CLEAR_FADE_MS, Interpolation::Linear))
            .with_filter(filter)
            .with_area(board_rect);
        *clear_effect = Some(effect);
    }

    if let Some(effect) = clear_effect {
        frame.render_effect(effect, board_rect, tfx_delta);
    }
}

/// Draw current screen (menu, game, quit menu), with optional pause overlay.
/// While the session waits in `Refill` and animation is on, the cleared pieces are
/// drawn where they were and faded out by `clear_effect`.
pub fn draw(
    frame: &mut Frame,
    view: View,
    clear_effect: &mut Option<Effect>,
    clear_process_time: &mut Option<Instant>,
    now: Instant,
) {
    let area = frame.area();
    match view.screen {
        Screen::Menu => draw_menu(frame, &view, area),
        Screen::Playing => {
            let (board_rect, _) = draw_game(frame, &view, area, now);
            if view.paused {
                draw_pause_overlay(frame, view.theme, area);
            } else if view.session.phase() == Phase::Refill
                && !view.session.last_cleared().is_empty()
                && !view.no_animation
            {
                apply_clear_effect(frame, &view, board_rect, clear_effect, clear_process_time, now);
            }
        }
        Screen::QuitMenu => {
            draw_game(frame, &view, area, now);
            if let Some(opt) = view.quit_selected {
                draw_quit_menu(frame, view.theme, opt);
            }
        }
    }
}

fn board_block(theme: &Theme, session: &Session) -> Block<'static> {
    let n = session.grid().size();
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Line::from(Span::styled(
            format!(" Cogtui {n}x{n} "),
            Style::default().fg(theme.title).add_modifier(Modifier::BOLD),
        )))
}

/// Draw game: board + sidebar, centered. Returns both rects.
fn draw_game(frame: &mut Frame, view: &View, area: Rect, now: Instant) -> (Rect, Rect) {
    let (board_rect, sidebar_rect) = game_layout(area, view.session.grid().size());
    draw_board(frame, view, board_rect, now);
    draw_sidebar(frame, view, sidebar_rect);
    (board_rect, sidebar_rect)
}

fn draw_board(frame: &mut Frame, view: &View, rect: Rect, now: Instant) {
    let theme = view.theme;
    let session = view.session;
    let grid = session.grid();
    let block = board_block(theme, session);
    let inner = block.inner(rect);
    block.render(rect, frame.buffer_mut());

    let buf = frame.buffer_mut();
    let bg_style = Style::default().bg(theme.bg);
    for y in inner.y..inner.y + inner.height {
        for x in inner.x..inner.x + inner.width {
            put(buf, x, y, " ", bg_style);
        }
    }

    let empty_style = Style::default().fg(theme.inactive_fg).bg(theme.bg);
    for (x, y) in grid.coords() {
        let origin = cell_origin(inner, x, y);
        match grid.get(x, y) {
            Some(piece) => draw_piece(buf, theme, piece, origin, now),
            None => put(buf, origin.0 + 1, origin.1, "·", empty_style),
        }
    }

    // Pieces just cleared stay visible while the fade runs over them.
    if session.phase() == Phase::Refill && !view.no_animation {
        for cell in session.last_cleared() {
            let origin = cell_origin(inner, cell.x, cell.y);
            draw_piece(buf, theme, &cell.piece, origin, now);
        }
    }

    for edge in &session.gears().edges {
        let (ox, oy) = cell_origin(inner, edge.from.0, edge.from.1);
        let spinning = [edge.from, edge.to]
            .iter()
            .any(|&(x, y)| grid.get(x, y).is_some_and(|p| p.spin_active(now)));
        let color = if spinning { theme.title } else { theme.gear_link };
        let style = Style::default().fg(color).bg(theme.bg);
        match edge.direction {
            LinkDirection::Horizontal => put(buf, ox + PIECE_WIDTH, oy, "═", style),
            LinkDirection::Vertical => put(buf, ox + 1, oy + 1, "║", style),
        }
    }

    // Cursor: row/column markers on the border, underline below the cell.
    let (cx, cy) = view.cursor;
    if cx < grid.size() && cy < grid.size() {
        let marker = Style::default().fg(theme.title).bg(theme.bg);
        let (ox, oy) = cell_origin(inner, cx, cy);
        put(buf, rect.x, oy, "▶", marker);
        put(buf, rect.x + rect.width.saturating_sub(1), oy, "◀", marker);
        put(buf, ox + 1, rect.y + rect.height.saturating_sub(1), "▲", marker);
        put(buf, ox + 1, rect.y, "▼", marker);
        put(buf, ox, oy + 1, "▔", marker);
        put(buf, ox + 2, oy + 1, "▔", marker);
    }
}

fn phase_label(view: &View) -> (&'static str, Color) {
    let theme = view.theme;
    if view.paused {
        return ("Paused", theme.title);
    }
    match view.session.phase() {
        Phase::Idle if view.session.is_idle(Instant::now()) => ("Your move", theme.main_fg),
        Phase::Idle => ("Gears spinning", theme.gear_link),
        Phase::Detect => ("Matching", theme.title),
        Phase::ClearAndScore => ("Clearing", theme.title),
        Phase::Refill => ("Dropping", theme.title),
    }
}

fn sidebar_block(theme: &Theme) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
}

fn draw_sidebar(frame: &mut Frame, view: &View, area: Rect) {
    let theme = view.theme;
    let session = view.session;
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let dim_style = Style::default().fg(theme.inactive_fg);

    // Free-floating sections with their own borders; vertical layout with small gaps
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6), // Stats
            Constraint::Length(1),
            Constraint::Length(5), // Status
            Constraint::Length(1),
            Constraint::Length(7), // Rounds
            Constraint::Length(1),
            Constraint::Length(7), // Keys
        ])
        .split(area);

    let stat = |label: &'static str, value: String| {
        Line::from(vec![Span::styled(label, title_style), Span::styled(value, fg_style)])
    };
    let stats_lines = vec![
        stat("Score: ", session.score().to_string()),
        stat("Moves: ", session.move_count().to_string()),
        stat("Multiplier: ", format!("x{:.1}", session.multiplier())),
        stat("Gears: ", format!("{}%", session.config().gear_percentage)),
    ];
    let stats_block = sidebar_block(theme);
    let stats_inner = stats_block.inner(chunks[0]);
    stats_block.render(chunks[0], frame.buffer_mut());
    Paragraph::new(Text::from(stats_lines)).render(stats_inner, frame.buffer_mut());

    let (label, label_color) = phase_label(view);
    let mut status_lines = vec![Line::from(Span::styled(
        label,
        Style::default().fg(label_color).add_modifier(Modifier::BOLD),
    ))];
    if let Some(msg) = view.status {
        status_lines.push(Line::from(Span::styled(
            msg.to_string(),
            Style::default().fg(theme.piece_color(cogtui::PieceColor::Red)),
        )));
    }
    let status_block = sidebar_block(theme);
    let status_inner = status_block.inner(chunks[2]);
    status_block.render(chunks[2], frame.buffer_mut());
    Paragraph::new(Text::from(status_lines))
        .wrap(Wrap { trim: true })
        .render(status_inner, frame.buffer_mut());

    let mut round_lines = vec![Line::from(Span::styled("Rounds", title_style))];
    if view.feedback.is_empty() {
        if let Some(round) = session.last_round() {
            round_lines.push(Line::from(Span::styled(
                format!("last +{} at x{:.1}", round.round_score, round.multiplier),
                dim_style,
            )));
        }
    }
    for f in view.feedback {
        let style = if f.age_ms < 1000 { fg_style } else { dim_style };
        let gears = match f.gear_count {
            0 => String::new(),
            1 => "  1 gear".to_string(),
            n => format!("  {n} gears"),
        };
        round_lines.push(Line::from(Span::styled(
            format!("+{} x{:.1}{gears}", f.round_score, f.multiplier),
            style,
        )));
    }
    let rounds_block = sidebar_block(theme);
    let rounds_inner = rounds_block.inner(chunks[4]);
    rounds_block.render(chunks[4], frame.buffer_mut());
    Paragraph::new(Text::from(round_lines)).render(rounds_inner, frame.buffer_mut());

    let key_lines = vec![
        Line::from(Span::styled("←↑↓→ hjkl  cursor", dim_style)),
        Line::from(Span::styled("⇧+arrows HJKL  shift", dim_style)),
        Line::from(Span::styled("+ / -  gears   r  new", dim_style)),
        Line::from(Span::styled("p  pause   q  quit", dim_style)),
    ];
    let keys_block = sidebar_block(theme);
    let keys_inner = keys_block.inner(chunks[6]);
    keys_block.render(chunks[6], frame.buffer_mut());
    Paragraph::new(Text::from(key_lines)).render(keys_inner, frame.buffer_mut());
}

fn centered(area: Rect, w: u16, h: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(w) / 2,
        y: area.y + area.height.saturating_sub(h) / 2,
        width: w.min(area.width),
        height: h.min(area.height),
    }
}

fn draw_menu(frame: &mut Frame, view: &View, area: Rect) {
    let theme = view.theme;
    let menu = view.menu_state;
    let popup = centered(area, 44, 15);

    let highlight_style = Style::default()
        .fg(theme.bg)
        .bg(theme.title)
        .add_modifier(Modifier::BOLD);
    let normal_style = Style::default().fg(theme.main_fg);
    let label_style = Style::default().fg(theme.inactive_fg);
    let tab_style = |tab: MenuTab| {
        if menu.current_tab == tab {
            highlight_style
        } else {
            normal_style
        }
    };

    let title = Line::from(vec![
        Span::styled(
            " Cog",
            Style::default()
                .fg(theme.piece_color(cogtui::PieceColor::Orange))
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled("tui ", Style::default().fg(theme.main_fg).add_modifier(Modifier::BOLD)),
    ]);

    let mut lines = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("Board size  ", label_style),
            Span::styled(
                format!(" ◀ {0}x{0} ▶ ", menu.grid_size),
                tab_style(MenuTab::GridSize),
            ),
        ]),
        Line::from(Span::styled(
            format!("up to {0}x{0} fits this terminal", view.menu_max_grid),
            label_style,
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Gears       ", label_style),
            Span::styled(
                format!(" ◀ {}% ▶ ", menu.gear_percentage),
                tab_style(MenuTab::Gears),
            ),
        ]),
        Line::from(""),
        Line::from(Span::styled(" START ", tab_style(MenuTab::Start))),
        Line::from(""),
        Line::from(Span::styled("↑↓ select  ←→ change  Enter start", label_style)),
        Line::from(Span::styled("Q quit", label_style)),
    ];
    if let Some(msg) = view.status {
        lines.push(Line::from(Span::styled(
            msg.to_string(),
            Style::default().fg(theme.piece_color(cogtui::PieceColor::Red)),
        )));
    }

    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
            .title(title)
            .title_alignment(Alignment::Center),
    );
    p.render(popup, frame.buffer_mut());
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup = centered(area, 28, 5);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(theme.bg).bg(theme.title),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " P: Resume    Q: Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
    );
    p.render(popup, frame.buffer_mut());
}

pub fn draw_quit_menu(frame: &mut Frame, theme: &Theme, selected: QuitOption) {
    let quit_rect = centered(frame.area(), 24, 8);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.title))
        .title(" Quit? ");

    // Clear background
    let buf = frame.buffer_mut();
    for y in quit_rect.y..quit_rect.y + quit_rect.height {
        for x in quit_rect.x..quit_rect.x + quit_rect.width {
            put(buf, x, y, " ", Style::default().bg(theme.bg));
        }
    }

    let inner = block.inner(quit_rect);
    block.render(quit_rect, frame.buffer_mut());

    let options = [
        (QuitOption::Resume, " Resume "),
        (QuitOption::MainMenu, " Main Menu "),
        (QuitOption::Exit, " Exit "),
    ];

    for (i, (opt, label)) in options.iter().enumerate() {
        let style = if *opt == selected {
            Style::default()
                .fg(theme.bg)
                .bg(theme.title)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.title)
        };
        let rx = inner.x + (inner.width.saturating_sub(label.len() as u16)) / 2;
        let ry = inner.y + 1 + i as u16 * 2;
        if ry < inner.y + inner.height {
            frame.buffer_mut().set_string(rx, ry, label, style);
        }
    }
}
