//! Display and output formatting utilities

use crate::analysis::BoardAnalysis;
use crate::board::{BoardModel, Cell};
use crate::search::{Frame, Plan, SearchOutcome};
use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Format boards and plans for the console
pub struct PlanFormatter;

impl PlanFormatter {
    /// One frame drawn with the map symbols
    pub fn format_frame(board: &BoardModel, frame: &Frame) -> String {
        Self::draw(board, |cell| {
            let target = board.is_target(cell);
            if frame.has_player(cell) {
                Some(if target { '+' } else { '@' })
            } else if frame.has_box(cell) {
                Some(if target { '*' } else { '$' })
            } else {
                None
            }
        })
    }

    /// Every frame of a plan, one block per time step
    pub fn format_plan(board: &BoardModel, plan: &Plan) -> String {
        let mut output = String::new();

        for frame in &plan.frames {
            output.push_str(&format!("t = {}\n", frame.t));
            output.push_str(&Self::format_frame(board, frame));
            output.push('\n');
        }

        output
    }

    /// Short per-player summary of a plan
    pub fn format_summary(plan: &Plan) -> String {
        let mut output = String::new();

        output.push_str(&format!("Mode: {}\n", plan.mode));
        output.push_str(&format!("Horizon: {}\n", plan.horizon));
        output.push_str(&format!("Active steps: {}\n", plan.active_steps()));
        output.push_str(&format!("Solve Time: {:.3}s\n", plan.solve_time.as_secs_f64()));

        let players = plan.initial().map_or(0, |frame| frame.players.len());
        for player in 0..players {
            output.push_str(&format!("Player {}: {}\n", player, plan.moves(player)));
        }

        output
    }

    /// The board with analysis overlays: `x` dead cells, `=` tunnel cells,
    /// `~` pullable cells
    pub fn format_analysis(board: &BoardModel, analysis: &BoardAnalysis) -> String {
        let frame = Frame::initial(board);
        let plain = Self::format_frame(board, &frame);
        let overlay = Self::draw(board, |cell| {
            if frame.has_player(cell) || frame.has_box(cell) || board.is_target(cell) {
                return None;
            }
            if analysis.deadlocks.contains(cell) {
                Some('x')
            } else if analysis.tunnels.covers(cell) {
                Some('=')
            } else if analysis.pullable.as_ref().is_some_and(|pullable| pullable.contains(cell)) {
                Some('~')
            } else {
                None
            }
        });

        overlay
            .lines()
            .zip(plain.lines())
            .map(|(overlay, plain)| Self::merge(overlay, plain))
            .collect()
    }

    fn merge(overlay: &str, plain: &str) -> String {
        let mut line: String = overlay
            .chars()
            .zip(plain.chars())
            .map(|(o, p)| if o == ' ' { p } else { o })
            .collect();
        line.push('\n');
        line
    }

    /// Draw walls, targets and floor, letting `entity` decide a cell's symbol first
    fn draw(board: &BoardModel, entity: impl Fn(Cell) -> Option<char>) -> String {
        let mut output = String::new();
        for row in 0..board.rows {
            for col in 0..board.cols {
                let cell = Cell::new(row, col);
                let symbol = if board.is_wall(cell) {
                    '#'
                } else if let Some(symbol) = entity(cell) {
                    symbol
                } else if board.is_target(cell) {
                    '.'
                } else {
                    ' '
                };
                output.push(symbol);
            }
            output.push('\n');
        }
        output
    }
}

/// Appends one result row per searched map
pub struct ResultsTable;

impl ResultsTable {
    pub const HEADER: &'static str = "map | duration (s) | steps";

    /// Row for one search outcome: steps on success, `N/A` otherwise
    pub fn row(map_name: &str, outcome: &SearchOutcome) -> String {
        let steps = match outcome.plan() {
            Some(plan) => plan.horizon.to_string(),
            None => "N/A".to_string(),
        };
        format!("{} | {:.3} | {}", map_name, outcome.elapsed().as_secs_f64(), steps)
    }

    /// Append a row, writing the header first if the file is new or empty
    pub fn append<P: AsRef<Path>>(path: P, row: &str) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let fresh = std::fs::metadata(path).map_or(true, |meta| meta.len() == 0);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open results file: {}", path.display()))?;

        if fresh {
            writeln!(file, "{}", Self::HEADER)?;
        }
        writeln!(file, "{}", row)?;
        Ok(())
    }
}

/// Color output utilities
pub struct ColorOutput;

impl ColorOutput {
    /// Format text with color (if terminal supports it)
    pub fn colored(text: &str, color: Color) -> String {
        if Self::supports_color() {
            format!("\x1b[{}m{}\x1b[0m", color.code(), text)
        } else {
            text.to_string()
        }
    }

    fn supports_color() -> bool {
        std::env::var("NO_COLOR").is_err() && (std::env::var("TERM").unwrap_or_default() != "dumb")
    }

    pub fn success(text: &str) -> String {
        Self::colored(text, Color::Green)
    }

    pub fn error(text: &str) -> String {
        Self::colored(text, Color::Red)
    }

    pub fn warning(text: &str) -> String {
        Self::colored(text, Color::Yellow)
    }

    pub fn info(text: &str) -> String {
        Self::colored(text, Color::Blue)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Color {
    Red,
    Green,
    Yellow,
    Blue,
}

impl Color {
    fn code(self) -> u8 {
        match self {
            Color::Red => 31,
            Color::Green => 32,
            Color::Yellow => 33,
            Color::Blue => 34,
        }
    }
}
