//! Loading Sokoban maps from the classic text format

use super::{BoardModel, Cell};
use crate::error::MapLoadError;
use anyhow::{Context, Result};
use std::path::Path;

const PLAYER: char = '@';
const WALL: char = '#';
const BOX: char = '$';
const TARGET: char = '.';
const BOX_ON_TARGET: char = '*';
const PLAYER_ON_TARGET: char = '+';

/// Load a board from a map file.
///
/// Only a missing or unreadable file is an error; the text itself always
/// parses (see [`parse_board`]).
pub fn load_board<P: AsRef<Path>>(path: P) -> Result<BoardModel, MapLoadError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| MapLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_board(&content)
}

/// Parse a board from its text representation.
///
/// Each line is a row and each character a column. Unrecognised symbols are
/// plain floor. Box-on-target and player-on-target cells are recorded in both
/// sets. The board width is the longest line; cells past the end of a
/// shorter line are void.
pub fn parse_board(content: &str) -> Result<BoardModel, MapLoadError> {
    let mut walls = Vec::new();
    let mut floor = Vec::new();
    let mut targets = Vec::new();
    let mut players = Vec::new();
    let mut boxes = Vec::new();
    let mut rows = 0;
    let mut cols = 0;

    for (row, line) in content.lines().enumerate() {
        rows = row + 1;
        let mut width = 0;
        for (col, ch) in line.chars().enumerate() {
            width = col + 1;
            let cell = Cell::new(row, col);
            match ch {
                WALL => {
                    walls.push(cell);
                    continue;
                }
                PLAYER => players.push(cell),
                BOX => boxes.push(cell),
                TARGET => targets.push(cell),
                BOX_ON_TARGET => {
                    boxes.push(cell);
                    targets.push(cell);
                }
                PLAYER_ON_TARGET => {
                    players.push(cell);
                    targets.push(cell);
                }
                _ => {}
            }
            floor.push(cell);
        }
        cols = cols.max(width);
    }

    BoardModel::from_parts(rows, cols, &walls, &floor, &targets, &players, &boxes)
}

/// Write a handful of small puzzles used by `setup`
pub fn create_example_maps<P: AsRef<Path>>(output_dir: P) -> Result<()> {
    let dir = output_dir.as_ref();
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    let straight = "#######\n#     #\n#@$ . #\n#     #\n#######\n";
    std::fs::write(dir.join("straight.txt"), straight)
        .context("Failed to write straight.txt")?;

    let corridor = "##########\n#   ##   #\n#@$    . #\n#   ##   #\n##########\n";
    std::fs::write(dir.join("corridor.txt"), corridor)
        .context("Failed to write corridor.txt")?;

    let two_boxes = "########\n#      #\n# $ .  #\n#@$ .  #\n#      #\n########\n";
    std::fs::write(dir.join("two_boxes.txt"), two_boxes)
        .context("Failed to write two_boxes.txt")?;

    let pull = "#######\n#     #\n# @*  #\n#     #\n#######\n";
    std::fs::write(dir.join("pull.txt"), pull)
        .context("Failed to write pull.txt")?;

    Ok(())
}
