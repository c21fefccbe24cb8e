//! Level files: line-oriented text describing the board, goals, deck and spawn pool.
//!
//! ```text
//! # comment
//! size 3 2
//! row RRGG wood  .
//! row BBYY GGRR+ice #
//! goal red 10
//! goal any 30
//! deck RRRR GGBB
//! visible 2
//! spawn 3 RRGG
//! ```
//!
//! Row tokens: four tile letters for a node (sub order top-left, top-right, bottom-left,
//! bottom-right) with an optional `+ice`, `wood` for a crate, `.` for a cell filled at start,
//! `#` for a hole.

use crate::goals::{Goal, GoalTarget};
use crate::grid::{CellType, Coord, Grid};
use crate::node::NodeTemplate;
use crate::spawner::SpawnEntry;
use std::path::Path;
use thiserror::Error;

/// Built-in level used when no file is given.
pub const DEFAULT_LEVEL: &str = "\
# Default level
size 6 7
row .    .    .       .    .    .
row RRGG BBYY GGRR    YYBB RRGG BBYY
row GGBB wood RRYY    BBGG wood YYRR
row YYRR GGBB BBGG+ice RRYY GGBB RRGG
row BBYY RRGG YYBB    GGRR BBYY GGBB
row #    RRBB GGYY    YYGG BBRR #
row #    #    RRGG    BBYY #    #
goal red 24
goal blue 24
goal any 80
deck RRRR GGGG BBBB YYYY RRGG BBYY GGRR YYBB RGBY RRBB GGYY BBRR YYGG RRRR BBBB
visible 3
spawn 4 RRGG
spawn 4 BBYY
spawn 3 GGRR
spawn 3 YYBB
spawn 2 RGRG
spawn 2 BYBY
spawn 1 RRRR
spawn 1 BBBB
spawn 1 OOGG
";

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("missing `size` line")]
    MissingSize,
    #[error("expected {expected} rows, found {found}")]
    RowCount { expected: usize, found: usize },
    #[error("level has no spawn templates")]
    NoSpawn,
}

fn syntax(line: usize, message: impl Into<String>) -> LevelError {
    LevelError::Syntax {
        line,
        message: message.into(),
    }
}

/// Initial content of one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelCell {
    /// Hole.
    Empty,
    /// Normal cell filled by the spawner at start.
    Vacant,
    Node { template: NodeTemplate, ice: bool },
    Wood,
}

impl LevelCell {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "." => Some(Self::Vacant),
            "#" => Some(Self::Empty),
            t if t.eq_ignore_ascii_case("wood") => Some(Self::Wood),
            t => {
                let (letters, ice) = match t.strip_suffix("+ice") {
                    Some(rest) => (rest, true),
                    None => (t, false),
                };
                NodeTemplate::parse(letters).map(|template| Self::Node { template, ice })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Level {
    pub width: usize,
    pub height: usize,
    /// Row-major.
    pub cells: Vec<LevelCell>,
    pub goals: Vec<Goal>,
    pub deck: Vec<NodeTemplate>,
    pub visible: usize,
    pub spawn: Vec<SpawnEntry>,
}

impl Level {
    pub fn builtin() -> Result<Self, LevelError> {
        Self::parse(DEFAULT_LEVEL)
    }

    pub fn load(path: &Path) -> Result<Self, LevelError> {
        let s = std::fs::read_to_string(path)?;
        Self::parse(&s)
    }

    pub fn parse(s: &str) -> Result<Self, LevelError> {
        let mut size: Option<(usize, usize)> = None;
        let mut cells = Vec::new();
        let mut rows = 0;
        let mut goals = Vec::new();
        let mut deck = Vec::new();
        let mut visible = 1;
        let mut spawn = Vec::new();

        for (i, raw) in s.lines().enumerate() {
            let line_no = i + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut words = line.split_whitespace();
            let Some(key) = words.next() else {
                continue;
            };
            let args: Vec<&str> = words.collect();
            match key {
                "size" => {
                    if size.is_some() {
                        return Err(syntax(line_no, "`size` given twice"));
                    }
                    let &[w, h] = args.as_slice() else {
                        return Err(syntax(line_no, "usage: size WIDTH HEIGHT"));
                    };
                    let w = parse_positive(w, line_no)?;
                    let h = parse_positive(h, line_no)?;
                    size = Some((w as usize, h as usize));
                }
                "row" => {
                    let (width, height) = size.ok_or(LevelError::MissingSize)?;
                    if rows == height {
                        return Err(syntax(line_no, format!("more than {height} rows")));
                    }
                    if args.len() != width {
                        return Err(syntax(
                            line_no,
                            format!("expected {width} cells, found {}", args.len()),
                        ));
                    }
                    for token in args {
                        let cell = LevelCell::parse(token)
                            .ok_or_else(|| syntax(line_no, format!("bad cell `{token}`")))?;
                        cells.push(cell);
                    }
                    rows += 1;
                }
                "goal" => {
                    let &[target, count] = args.as_slice() else {
                        return Err(syntax(line_no, "usage: goal COLOUR|any COUNT"));
                    };
                    let target = GoalTarget::from_name(target)
                        .ok_or_else(|| syntax(line_no, format!("unknown colour `{target}`")))?;
                    goals.push(Goal::new(target, parse_positive(count, line_no)?));
                }
                "deck" => {
                    for token in args {
                        deck.push(parse_template(token, line_no)?);
                    }
                }
                "visible" => {
                    let &[n] = args.as_slice() else {
                        return Err(syntax(line_no, "usage: visible COUNT"));
                    };
                    visible = parse_positive(n, line_no)? as usize;
                }
                "spawn" => {
                    let &[weight, template] = args.as_slice() else {
                        return Err(syntax(line_no, "usage: spawn WEIGHT TEMPLATE"));
                    };
                    let weight = weight
                        .parse()
                        .map_err(|_| syntax(line_no, format!("bad weight `{weight}`")))?;
                    spawn.push(SpawnEntry {
                        template: parse_template(template, line_no)?,
                        weight,
                    });
                }
                other => return Err(syntax(line_no, format!("unknown directive `{other}`"))),
            }
        }

        let (width, height) = size.ok_or(LevelError::MissingSize)?;
        if rows != height {
            return Err(LevelError::RowCount {
                expected: height,
                found: rows,
            });
        }
        if spawn.is_empty() {
            return Err(LevelError::NoSpawn);
        }
        Ok(Self {
            width,
            height,
            cells,
            goals,
            deck,
            visible,
            spawn,
        })
    }

    pub fn cell(&self, coord: Coord) -> LevelCell {
        self.cells[coord.y as usize * self.width + coord.x as usize]
    }

    /// Grid with this level's cell types and nothing placed.
    pub fn grid(&self) -> Grid {
        Grid::from_types(self.width, self.height, |c| match self.cell(c) {
            LevelCell::Empty => CellType::Empty,
            _ => CellType::Normal,
        })
    }
}

fn parse_positive(s: &str, line: usize) -> Result<u32, LevelError> {
    match s.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(syntax(line, format!("expected a positive number, found `{s}`"))),
    }
}

fn parse_template(s: &str, line: usize) -> Result<NodeTemplate, LevelError> {
    NodeTemplate::parse(s).ok_or_else(|| syntax(line, format!("bad template `{s}`")))
}
