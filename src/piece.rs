//! Piece geometry: shape matrices, colours, clockwise rotation.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Colour tag carried by a piece and by every cell it locks into the board.
/// Usually a `#RRGGBB` string straight from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorId(pub String);

impl ColorId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ColorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShapeError {
    #[error("shape has no rows or no columns")]
    Empty,
    #[error("shape row {row} has {got} columns, expected {expected}")]
    Ragged {
        row: usize,
        got: usize,
        expected: usize,
    },
    #[error("shape has no occupied cells")]
    NoCells,
}

/// Rectangular occupancy matrix. Row-major, `cells.len() == width * height`.
///
/// On the wire a shape is a 2D array of 0/1 integers, e.g. `[[0,1,0],[1,1,1]]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<u8>>", into = "Vec<Vec<u8>>")]
pub struct Shape {
    width: usize,
    height: usize,
    cells: Vec<bool>,
}

impl Shape {
    pub fn from_rows<R: AsRef<[bool]>>(rows: &[R]) -> Result<Self, ShapeError> {
        let height = rows.len();
        let width = rows.first().map_or(0, |r| r.as_ref().len());
        if height == 0 || width == 0 {
            return Err(ShapeError::Empty);
        }
        let mut cells = Vec::with_capacity(width * height);
        for (row, r) in rows.iter().enumerate() {
            let r = r.as_ref();
            if r.len() != width {
                return Err(ShapeError::Ragged {
                    row,
                    got: r.len(),
                    expected: width,
                });
            }
            cells.extend_from_slice(r);
        }
        // a piece without cells never collides and would fall forever
        if !cells.contains(&true) {
            return Err(ShapeError::NoCells);
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Offsets `(col, row)` of every occupied cell, relative to the top-left anchor.
    pub fn filled_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, filled)| **filled)
            .map(|(i, _)| (i % self.width, i / self.width))
    }

    /// 90° clockwise: an R×C source becomes C×R with `out[x][R-1-y] = src[y][x]`.
    pub fn rotated_cw(&self) -> Self {
        let (r, c) = (self.height, self.width);
        let mut cells = vec![false; r * c];
        for y in 0..r {
            for x in 0..c {
                // out has width r, height c
                cells[x * r + (r - 1 - y)] = self.cells[y * c + x];
            }
        }
        Self {
            width: r,
            height: c,
            cells,
        }
    }
}

impl TryFrom<Vec<Vec<u8>>> for Shape {
    type Error = ShapeError;

    fn try_from(rows: Vec<Vec<u8>>) -> Result<Self, Self::Error> {
        let rows: Vec<Vec<bool>> = rows
            .into_iter()
            .map(|r| r.into_iter().map(|v| v != 0).collect())
            .collect();
        Self::from_rows(&rows)
    }
}

impl From<Shape> for Vec<Vec<u8>> {
    fn from(shape: Shape) -> Self {
        shape
            .cells
            .chunks(shape.width)
            .map(|row| row.iter().map(|&f| u8::from(f)).collect())
            .collect()
    }
}

/// A catalog entry instantiated for play. Rotation replaces the shape wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Piece {
    pub shape: Shape,
    pub color: ColorId,
}

impl Piece {
    pub fn rotated_cw(&self) -> Self {
        Self {
            shape: self.shape.rotated_cw(),
            color: self.color.clone(),
        }
    }
}

/// Falling piece placed on the board. `(x, y)` is where the shape's top-left
/// corner sits; `y` may be negative while the piece is still entering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivePiece {
    pub piece: Piece,
    pub x: i32,
    pub y: i32,
}

impl ActivePiece {
    /// Absolute board coordinates of every occupied cell.
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.piece
            .shape
            .filled_cells()
            .map(|(dx, dy)| (self.x + dx as i32, self.y + dy as i32))
    }

    pub fn shifted(&self, dx: i32, dy: i32) -> Self {
        Self {
            piece: self.piece.clone(),
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    pub fn rotated_cw(&self) -> Self {
        Self {
            piece: self.piece.rotated_cw(),
            x: self.x,
            y: self.y,
        }
    }
}

#[cfg(test)]
pub(crate) fn shape(rows: &[&[u8]]) -> Shape {
    let rows: Vec<Vec<u8>> = rows.iter().map(|r| r.to_vec()).collect();
    Shape::try_from(rows).unwrap()
}
