//! App: terminal init, main loop, tick and key handling.

use crate::GameConfig;
use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use nodeblast::{BoardEvent, Coord, Game, GameStatus, Level, SubCoord};
use ratatui::DefaultTerminal;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tachyonfx::Effect;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Playing,
    GameOver,
}

/// Player-side state drawn over the board.
#[derive(Debug, Clone, Default)]
pub struct Hud {
    pub cursor: Coord,
    /// First cell of a pending board swap.
    pub marked: Option<Coord>,
    pub paused: bool,
    /// Last rejected input, shown until the next key.
    pub message: Option<String>,
}

pub struct App {
    level: Level,
    config: GameConfig,
    theme: Theme,
    game: Game,
    screen: Screen,
    hud: Hud,
    last_tick: Instant,
    /// Sub-tiles blasted since the current fade started, as (cell, sub).
    blast_cells: HashSet<(Coord, SubCoord)>,
    /// TachyonFX fade effect over blasted sub-tiles.
    blast_effect: Option<Effect>,
    /// Last time we processed the blast effect (for delta).
    blast_effect_process_time: Option<Instant>,
}

impl App {
    pub fn new(level: Level, config: GameConfig, theme: Theme) -> Result<Self> {
        let game = Game::new(&level, config.seed, config.timings)?;
        Ok(Self {
            level,
            config,
            theme,
            game,
            screen: Screen::Playing,
            hud: Hud::default(),
            last_tick: Instant::now(),
            blast_cells: HashSet::new(),
            blast_effect: None,
            blast_effect_process_time: None,
        })
    }

    fn reset_game(&mut self) -> Result<()> {
        self.game.teardown();
        self.config.seed = self.config.seed.wrapping_add(1);
        debug!(seed = self.config.seed, "restart");
        self.game = Game::new(&self.level, self.config.seed, self.config.timings)?;
        self.screen = Screen::Playing;
        self.hud = Hud::default();
        self.last_tick = Instant::now();
        self.blast_cells.clear();
        self.blast_effect = None;
        self.blast_effect_process_time = None;
        Ok(())
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;
        self.game.teardown();
        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let tick_interval = Duration::from_secs_f64(1.0 / self.config.tick_rate);
        loop {
            let now = Instant::now();
            terminal.draw(|f| {
                crate::ui::draw(
                    f,
                    self.screen,
                    &self.game,
                    &self.theme,
                    &self.hud,
                    f.area(),
                    &self.blast_cells,
                    &mut self.blast_effect,
                    &mut self.blast_effect_process_time,
                    now,
                    self.config.no_animation,
                );
            })?;

            if self.blast_effect.as_ref().is_some_and(|e| e.done()) {
                self.blast_cells.clear();
                self.blast_effect = None;
                self.blast_effect_process_time = None;
            }

            let timeout = tick_interval.saturating_sub(self.last_tick.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    let Event::Key(key) = event::read()? else {
                        continue;
                    };
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if !self.handle_action(key_to_action(key))? {
                        return Ok(());
                    }
                }
            }

            if self.screen == Screen::Playing
                && !self.hud.paused
                && self.last_tick.elapsed() >= tick_interval
            {
                self.last_tick = Instant::now();
                self.game.tick();
                self.collect_events();
            }
        }
    }

    /// Returns false when the app should exit.
    fn handle_action(&mut self, action: Action) -> Result<bool> {
        match action {
            Action::Quit => return Ok(false),
            Action::Restart => {
                self.reset_game()?;
                return Ok(true);
            }
            _ => {}
        }
        if self.screen == Screen::GameOver {
            return Ok(true);
        }
        if action == Action::Pause {
            self.hud.paused = !self.hud.paused;
            return Ok(true);
        }
        if self.hud.paused {
            return Ok(true);
        }

        self.hud.message = None;
        let grid = self.game.board().grid();
        let (w, h) = (grid.width as i32, grid.height as i32);
        let cursor = self.hud.cursor;
        let result = match action {
            Action::CursorLeft => {
                self.hud.cursor.x = (cursor.x - 1).max(0);
                Ok(())
            }
            Action::CursorRight => {
                self.hud.cursor.x = (cursor.x + 1).min(w - 1);
                Ok(())
            }
            Action::CursorUp => {
                self.hud.cursor.y = (cursor.y - 1).max(0);
                Ok(())
            }
            Action::CursorDown => {
                self.hud.cursor.y = (cursor.y + 1).min(h - 1);
                Ok(())
            }
            Action::DeckSwap => self.game.deck_swap(cursor),
            Action::Mark => match self.hud.marked.take() {
                None => {
                    self.hud.marked = Some(cursor);
                    Ok(())
                }
                Some(m) if m == cursor => Ok(()),
                Some(m) => self.game.swap(m, cursor),
            },
            Action::NextNode => self.game.next_node(),
            Action::Pause | Action::Restart | Action::Quit | Action::None => Ok(()),
        };
        if let Err(err) = result {
            debug!(%err, "input rejected");
            self.hud.message = Some(err.to_string());
        }
        self.collect_events();
        Ok(true)
    }

    fn collect_events(&mut self) {
        let mut new_blasts = false;
        for event in self.game.drain_events() {
            match event {
                BoardEvent::TileBlast { cell, subs, .. } if !self.config.no_animation => {
                    self.blast_cells.extend(subs.into_iter().map(|s| (cell, s)));
                    new_blasts = true;
                }
                BoardEvent::LevelWon | BoardEvent::LevelLost => self.screen = Screen::GameOver,
                _ => {}
            }
        }
        if new_blasts {
            // Restart the fade so late blasts get the full animation.
            self.blast_effect = None;
            self.blast_effect_process_time = None;
        }
        if self.game.status() != GameStatus::Playing {
            self.screen = Screen::GameOver;
        }
    }
}
