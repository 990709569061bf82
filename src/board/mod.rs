//! Sokoban board representation and map loading

pub mod cell;
pub mod io;
pub mod model;

pub use cell::{Cell, Direction};
pub use io::{create_example_maps, load_board, parse_board};
pub use model::{BoardModel, Tile};
