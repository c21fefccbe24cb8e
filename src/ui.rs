//! Layout and drawing: board, deck preview, goals, stats, pause and game over.

use crate::app::{Hud, Screen};
use crate::theme::Theme;
use nodeblast::goals::GoalTarget;
use nodeblast::node::Node;
use nodeblast::{Coord, Game, GameStatus, SubCoord};
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// A sub-tile is two columns by one row, so a node cell is 4x2 terminal cells.
const SUB_WIDTH: u16 = 2;
const SUB_HEIGHT: u16 = 1;
const CELL_WIDTH: u16 = SUB_WIDTH * 2;
const CELL_HEIGHT: u16 = SUB_HEIGHT * 2;

const SIDEBAR_WIDTH: u16 = 26;

/// Duration of the blast fade (TachyonFX) in ms.
const BLAST_FADE_MS: u32 = 350;

/// Board size in terminal cells including the border.
fn board_outer_size(game: &Game) -> (u16, u16) {
    let grid = game.board().grid();
    (
        grid.width as u16 * CELL_WIDTH + 2,
        grid.height as u16 * CELL_HEIGHT + 2,
    )
}

/// Board outer rect and sidebar rect, centred together in `area`.
fn game_layout(area: Rect, game: &Game) -> (Rect, Rect) {
    let (bw, bh) = board_outer_size(game);
    let total_w = bw + SIDEBAR_WIDTH;
    let x = area.x + area.width.saturating_sub(total_w) / 2;
    let y = area.y + area.height.saturating_sub(bh) / 2;
    let board = Rect {
        x,
        y,
        width: bw.min(area.width),
        height: bh.min(area.height),
    };
    let sidebar = Rect {
        x: board.right(),
        y: area.y,
        width: SIDEBAR_WIDTH.min(area.right().saturating_sub(board.right())),
        height: area.height,
    };
    (board, sidebar)
}

/// Inner board rect (no border); matches `draw_game` layout.
fn board_inner_rect(area: Rect, game: &Game) -> Rect {
    let (outer, _) = game_layout(area, game);
    Block::default().borders(Borders::ALL).inner(outer)
}

/// Top-left terminal position of a sub-tile, before any fall offset.
fn sub_origin(inner: Rect, cell: Coord, sub: SubCoord) -> (i32, i32) {
    (
        i32::from(inner.x) + cell.x * i32::from(CELL_WIDTH) + sub.x as i32 * i32::from(SUB_WIDTH),
        i32::from(inner.y) + cell.y * i32::from(CELL_HEIGHT) + sub.y as i32 * i32::from(SUB_HEIGHT),
    )
}

/// Paint one sub-tile at terminal position (x, y), skipping whatever falls outside `clip`.
fn put_sub(buf: &mut Buffer, clip: Rect, x: i32, y: i32, symbol: &str, style: Style) {
    for dx in 0..i32::from(SUB_WIDTH) {
        let (px, py) = (x + dx, y);
        if px < i32::from(clip.x)
            || py < i32::from(clip.y)
            || px >= i32::from(clip.right())
            || py >= i32::from(clip.bottom())
        {
            continue;
        }
        buf[(px as u16, py as u16)].set_symbol(symbol).set_style(style);
    }
}

/// Rows a falling occupant is drawn above its target cell.
fn fall_offset(remaining: Option<f32>) -> i32 {
    remaining.map_or(0, |r| (r * f32::from(CELL_HEIGHT)).round() as i32)
}

/// Build set of buffer (x, y) positions that belong to blasted sub-tiles.
fn blast_buffer_positions(inner: Rect, blast_cells: &HashSet<(Coord, SubCoord)>) -> HashSet<(u16, u16)> {
    let mut set = HashSet::new();
    for &(cell, sub) in blast_cells {
        let (x, y) = sub_origin(inner, cell, sub);
        for dx in 0..i32::from(SUB_WIDTH) {
            let (px, py) = (x + dx, y);
            if px >= i32::from(inner.x)
                && py >= i32::from(inner.y)
                && px < i32::from(inner.right())
                && py < i32::from(inner.bottom())
            {
                set.insert((px as u16, py as u16));
            }
        }
    }
    set
}

/// Create or update the blast fade effect and process it (fade blasted sub-tiles to bg).
fn apply_blast_effect(
    frame: &mut Frame,
    game: &Game,
    theme: &Theme,
    area: Rect,
    blast_cells: &HashSet<(Coord, SubCoord)>,
    blast_effect: &mut Option<Effect>,
    blast_process_time: &mut Option<Instant>,
    now: Instant,
) {
    let inner = board_inner_rect(area, game);
    let delta = blast_process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u128::from(u32::MAX)) as u32;
    *blast_process_time = Some(now);

    if blast_effect.is_none() {
        let blast_set = blast_buffer_positions(inner, blast_cells);
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            blast_set.contains(&(pos.x, pos.y))
        }));
        let bg = theme.bg;
        let effect = fx::fade_to(bg, bg, (BLAST_FADE_MS, Interpolation::Linear))
            .with_filter(filter)
            .with_area(inner);
        *blast_effect = Some(effect);
    }

    if let Some(effect) = blast_effect {
        frame.render_effect(effect, inner, TfxDuration::from_millis(delta_ms));
    }
}

/// Draw the current screen. While blasted sub-tiles are pending and animations are on, applies
/// the TachyonFX fade under any overlay and updates `blast_effect`.
pub fn draw(
    frame: &mut Frame,
    screen: Screen,
    game: &Game,
    theme: &Theme,
    hud: &Hud,
    area: Rect,
    blast_cells: &HashSet<(Coord, SubCoord)>,
    blast_effect: &mut Option<Effect>,
    blast_process_time: &mut Option<Instant>,
    now: Instant,
    no_animation: bool,
) {
    Block::default()
        .style(Style::default().bg(theme.void))
        .render(area, frame.buffer_mut());
    draw_game(frame, game, theme, hud, area, blast_cells, no_animation);
    if !blast_cells.is_empty() && !no_animation {
        apply_blast_effect(
            frame,
            game,
            theme,
            area,
            blast_cells,
            blast_effect,
            blast_process_time,
            now,
        );
    }
    match screen {
        Screen::Playing => {
            if hud.paused {
                draw_pause_overlay(frame, theme, area);
            }
        }
        Screen::GameOver => draw_game_over(frame, game, theme, area),
    }
}

fn draw_game(
    frame: &mut Frame,
    game: &Game,
    theme: &Theme,
    hud: &Hud,
    area: Rect,
    blast_cells: &HashSet<(Coord, SubCoord)>,
    no_animation: bool,
) {
    let (board_outer, sidebar) = game_layout(area, game);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.void))
        .title(Span::styled(" Nodeblast ", Style::default().fg(theme.title)));
    let inner = block.inner(board_outer);
    block.render(board_outer, frame.buffer_mut());
    draw_board(frame.buffer_mut(), game, theme, hud, inner);
    if !no_animation {
        draw_blast_flash(frame.buffer_mut(), game, inner, blast_cells);
    }
    draw_sidebar(frame, game, theme, hud, sidebar);
}

fn draw_board(buf: &mut Buffer, game: &Game, theme: &Theme, hud: &Hud, inner: Rect) {
    let board = game.board();
    let grid = board.grid();

    for cell in grid.cells() {
        let bg = if cell.is_normal() { theme.bg } else { theme.void };
        let bg = match (hud.cursor == cell.coord, hud.marked == Some(cell.coord)) {
            (true, _) if cell.is_normal() => theme.cursor,
            (_, true) => theme.marked,
            _ => bg,
        };
        for sub in SubCoord::all() {
            let (x, y) = sub_origin(inner, cell.coord, sub);
            put_sub(buf, inner, x, y, " ", Style::default().bg(bg));
        }
    }

    // Wood, drawn where it is in its fall.
    for cell in grid.cells() {
        let Some(obstacle) = &cell.obstacle else {
            continue;
        };
        let dy = fall_offset(obstacle.fall.as_ref().map(|f| f.remaining));
        for sub in SubCoord::all() {
            let (x, y) = sub_origin(inner, cell.coord, sub);
            put_sub(buf, inner, x, y - dy, "▒", Style::default().fg(theme.wood).bg(theme.bg));
        }
    }

    for node in board.nodes() {
        let Some(coord) = node.cell else {
            continue;
        };
        let dy = fall_offset(node.fall.as_ref().map(|f| f.remaining));
        let highlight = if hud.cursor == coord {
            Some(theme.cursor)
        } else if hud.marked == Some(coord) {
            Some(theme.marked)
        } else {
            None
        };
        for sub in SubCoord::all() {
            let (x, y) = sub_origin(inner, coord, sub);
            let (symbol, style) = sub_look(node, sub, theme, highlight);
            put_sub(buf, inner, x, y - dy, symbol, style);
        }
    }
}

/// Symbol and style for one sub-tile of a node on the board.
fn sub_look(node: &Node, sub: SubCoord, theme: &Theme, highlight: Option<Color>) -> (&'static str, Style) {
    let Some(tile_type) = node.tile_type_at(sub) else {
        let bg = highlight.unwrap_or(theme.bg);
        return ("·", Style::default().fg(theme.inactive_fg).bg(bg));
    };
    let fg = theme.tile_color(tile_type);
    match (highlight, node.obstacle.is_some()) {
        (Some(bg), _) => ("▓", Style::default().fg(fg).bg(bg)),
        (None, true) => ("▒", Style::default().fg(fg).bg(theme.ice)),
        (None, false) => ("█", Style::default().fg(fg).bg(theme.bg)),
    }
}

/// Paint blasted sub-tiles white where nothing has moved in yet; the fade takes them to bg.
fn draw_blast_flash(
    buf: &mut Buffer,
    game: &Game,
    inner: Rect,
    blast_cells: &HashSet<(Coord, SubCoord)>,
) {
    for &(cell, sub) in blast_cells {
        let refilled = game
            .board()
            .node_at(cell)
            .is_some_and(|n| !n.is_falling() && n.tile_type_at(sub).is_some());
        if refilled {
            continue;
        }
        let (x, y) = sub_origin(inner, cell, sub);
        put_sub(buf, inner, x, y, "█", Style::default().fg(Color::White));
    }
}

/// Draw a detached node as a small block preview at (x, y).
fn draw_node_preview(buf: &mut Buffer, clip: Rect, x: u16, y: u16, node: &Node, theme: &Theme) {
    let origin = Rect {
        x,
        y,
        width: CELL_WIDTH,
        height: CELL_HEIGHT,
    };
    for sub in SubCoord::all() {
        let (sx, sy) = sub_origin(origin, Coord::new(0, 0), sub);
        let (symbol, style) = sub_look(node, sub, theme, None);
        put_sub(buf, clip, sx, sy, symbol, style);
    }
}

fn sidebar_block(theme: &Theme) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.void))
}

fn draw_sidebar(frame: &mut Frame, game: &Game, theme: &Theme, hud: &Hud, area: Rect) {
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let dim_style = Style::default().fg(theme.inactive_fg);

    let goal_rows = game.goals().goals().len().max(1) as u16;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6),             // Deck (border + title + previews)
            Constraint::Length(goal_rows + 3), // Goals
            Constraint::Length(6),             // Stats
            Constraint::Length(7),             // Keys
            Constraint::Fill(1),               // message
        ])
        .split(area);

    // --- Deck: current node, then the visible upcoming ones ---
    let deck_block = sidebar_block(theme);
    let deck_inner = deck_block.inner(chunks[0]);
    deck_block.render(chunks[0], frame.buffer_mut());
    let deck_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1), Constraint::Length(CELL_HEIGHT)])
        .split(deck_inner);
    Paragraph::new(Line::from(vec![
        Span::styled("Deck", title_style),
        Span::styled(format!("  {} left", game.deck().node_count()), dim_style),
    ]))
    .render(deck_layout[0], frame.buffer_mut());
    let deck = game.deck();
    let row = deck_layout[2];
    let buf = frame.buffer_mut();
    match deck.current() {
        Some(current) => draw_node_preview(buf, row, row.x, row.y, current, theme),
        None => Paragraph::new(Span::styled("empty", dim_style)).render(row, buf),
    }
    for (i, node) in deck.upcoming().enumerate() {
        let x = row.x + (CELL_WIDTH + 1) * (i as u16 + 1) + 1;
        draw_node_preview(buf, row, x, row.y, node, theme);
    }

    // --- Goals ---
    let goals_block = sidebar_block(theme);
    let goals_inner = goals_block.inner(chunks[1]);
    goals_block.render(chunks[1], frame.buffer_mut());
    let mut goal_lines = vec![Line::from(Span::styled("Goals", title_style))];
    if game.goals().goals().is_empty() {
        goal_lines.push(Line::from(Span::styled("all done", dim_style)));
    }
    for goal in game.goals().goals() {
        let colour = match goal.target {
            GoalTarget::Tile(t) => theme.tile_color(t),
            GoalTarget::Any => theme.main_fg,
        };
        goal_lines.push(Line::from(vec![
            Span::styled(format!("{:<8}", goal.target.to_string()), Style::default().fg(colour)),
            Span::styled(format!("{}/{}", goal.current, goal.count), fg_style),
        ]));
    }
    Paragraph::new(Text::from(goal_lines)).render(goals_inner, frame.buffer_mut());

    // --- Stats ---
    let stats_block = sidebar_block(theme);
    let stats_inner = stats_block.inner(chunks[2]);
    stats_block.render(chunks[2], frame.buffer_mut());
    let board = game.board();
    let stats_lines = vec![
        Line::from(vec![
            Span::styled("Moves: ", title_style),
            Span::styled(game.moves().to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Cascade: ", title_style),
            Span::styled(board.cascade().to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Board: ", title_style),
            Span::styled(format!("{:?}", board.phase()), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Cursor: ", title_style),
            Span::styled(hud.cursor.to_string(), fg_style),
        ]),
    ];
    Paragraph::new(Text::from(stats_lines)).render(stats_inner, frame.buffer_mut());

    // --- Keys ---
    let keys_block = sidebar_block(theme);
    let keys_inner = keys_block.inner(chunks[3]);
    keys_block.render(chunks[3], frame.buffer_mut());
    let keys = [
        ("Enter", "swap deck node in"),
        ("X", "mark / board swap"),
        ("Tab", "next node"),
        ("P", "pause"),
        ("Q", "quit"),
    ];
    let key_lines: Vec<Line> = keys
        .iter()
        .map(|(k, what)| {
            Line::from(vec![
                Span::styled(format!("{k:<6}"), title_style),
                Span::styled(*what, dim_style),
            ])
        })
        .collect();
    Paragraph::new(Text::from(key_lines)).render(keys_inner, frame.buffer_mut());

    if let Some(message) = &hud.message {
        Paragraph::new(Line::from(Span::styled(
            format!(" {message}"),
            Style::default().fg(Color::Red),
        )))
        .render(chunks[4], frame.buffer_mut());
    }
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup_w = 28u16;
    let popup_h = 5u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
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

fn draw_game_over(frame: &mut Frame, game: &Game, theme: &Theme, area: Rect) {
    let popup_w = 30u16;
    let popup_h = 9u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };
    let (title, title_style) = match game.status() {
        GameStatus::Won => (" Level complete! ", Style::default().fg(Color::Black).bg(Color::Green)),
        _ => (" Out of nodes ", Style::default().fg(Color::White).bg(Color::Red)),
    };
    let open_goals: u32 = game
        .goals()
        .goals()
        .iter()
        .map(|g| g.count.saturating_sub(g.current))
        .sum();
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(title, title_style)),
        Line::from(""),
        Line::from(Span::styled(
            format!(" Moves: {} ", game.moves()),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(Span::styled(
            format!(" Tiles still needed: {open_goals} "),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " R: Restart    Q: Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
            .title(Span::styled(" Nodeblast ", Style::default().fg(theme.title))),
    );
    p.render(popup, frame.buffer_mut());
}
