use std::error;
use std::fmt;
use crate::grid::GridId;
use crate::index_space::IndexSpace;




#[derive(Debug)]

/**
 * Error to represent a failed structural operation on the grid hierarchy:
 * an exhausted arena, a stale handle, or a violated layout invariant.
 */
pub enum Error {
    OutOfSpace { requested: usize, largest_free: usize, free: usize },
    InvalidHandle { offset: usize, len: usize },
    NotFound(GridId),
    TableFull { capacity: usize },
    InvalidLevel { level: usize, max_levels: usize },
    OutsideDomain { level: usize, bbox: IndexSpace },
    Overlap { level: usize, existing: GridId },
    InvalidConfig(String),
    Checkpoint(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Error::*;

        match self {
            OutOfSpace { requested, largest_free, free } => write!(fmt,
                "arena out of space: requested {} cells, largest free block {}, total free {}",
                requested, largest_free, free),
            InvalidHandle { offset, len } => write!(fmt,
                "invalid arena handle: offset {} length {}", offset, len),
            NotFound(id) => write!(fmt, "grid {} not found", id),
            TableFull { capacity } => write!(fmt, "grid table is full ({} records)", capacity),
            InvalidLevel { level, max_levels } => write!(fmt,
                "level {} is outside 1..={}", level, max_levels),
            OutsideDomain { level, bbox } => write!(fmt,
                "box {} lies outside the level {} domain", bbox, level),
            Overlap { level, existing } => write!(fmt,
                "new grid overlaps grid {} at level {}", existing, level),
            InvalidConfig(msg) => write!(fmt, "invalid configuration: {}", msg),
            Checkpoint(msg) => write!(fmt, "checkpoint: {}", msg),
        }
    }
}

impl error::Error for Error {}
