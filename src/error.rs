//! Error types shared by the board loader and the SAT encoding pipeline

use crate::board::Cell;
use crate::sat::constraints::ConstraintFamily;
use crate::sat::variables::{EntityKind, LiteralKey};
use std::path::PathBuf;
use thiserror::Error;

/// Failure to produce a [`BoardModel`](crate::board::BoardModel)
#[derive(Debug, Error)]
pub enum MapLoadError {
    #[error("unable to open map file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cell {cell} lies outside the {rows}x{cols} board")]
    OutOfBounds { cell: Cell, rows: usize, cols: usize },

    #[error("cell {cell} cannot be both a wall and walkable")]
    WallOverlap { cell: Cell },
}

/// Failure while building a formula, handing it to the oracle, or decoding a model
#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("{family} produced an empty clause")]
    EmptyClause { family: ConstraintFamily },

    #[error("literal {key:?} is outside the encoding bounds")]
    LiteralOutOfBounds { key: LiteralKey },

    #[error("variable index overflow after {allocated} variables")]
    VariableOverflow { allocated: usize },

    #[error("SAT oracle rejected clause #{index}")]
    ClauseRejected { index: usize },

    #[error("model places no {kind} #{entity} at t={t}")]
    IncompleteModel { kind: EntityKind, entity: usize, t: usize },

    #[error("model places {kind} #{entity} on both {first} and {second} at t={t}")]
    AmbiguousModel {
        kind: EntityKind,
        entity: usize,
        t: usize,
        first: Cell,
        second: Cell,
    },

    #[error("failed to write formula")]
    Write(#[from] std::io::Error),
}
