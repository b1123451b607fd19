//! Board: fixed grid of locked cells, placement checks, locking and row clears.

use crate::piece::{ActivePiece, ColorId};
use std::collections::VecDeque;

/// Single cell: either empty or locked with the colour of the piece that filled it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Filled(ColorId),
}

impl Cell {
    #[inline]
    pub fn is_filled(&self) -> bool {
        matches!(self, Self::Filled(_))
    }
}

/// Playfield grid. y=0 is top; rows are stored [0..height].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    width: usize,
    height: usize,
    /// rows[y][x] = cell. rows[0] is top.
    rows: VecDeque<Vec<Cell>>,
}

impl Board {
    pub fn new(width: usize, height: usize) -> Self {
        let rows = (0..height).map(|_| vec![Cell::Empty; width]).collect();
        Self {
            width,
            height,
            rows,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<&Cell> {
        self.rows.get(y).and_then(|row| row.get(x))
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if let Some(slot) = self.rows.get_mut(y).and_then(|row| row.get_mut(x)) {
            *slot = cell;
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.rows.iter().map(Vec::as_slice)
    }

    pub fn filled_count(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|row| row.iter())
            .filter(|c| c.is_filled())
            .count()
    }

    /// True if (x, y) is within the side walls, above the floor, and not locked.
    /// Anything above row 0 counts as free.
    pub fn is_inside_and_free(&self, x: i32, y: i32) -> bool {
        if x < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return false;
        }
        if y < 0 {
            return true;
        }
        matches!(self.get(x as usize, y as usize), Some(Cell::Empty))
    }

    /// Write the piece's colour into every cell it covers. Cells above the
    /// visible field are dropped.
    pub fn lock(&mut self, active: &ActivePiece) {
        let color = &active.piece.color;
        for (x, y) in active.cells() {
            if y >= 0 && x >= 0 {
                self.set(x as usize, y as usize, Cell::Filled(color.clone()));
            }
        }
    }

    /// Remove every full row, shifting the rows above down and inserting empty
    /// rows at the top. Returns the number of rows removed.
    pub fn clear_full_rows(&mut self) -> u32 {
        let mut cleared = 0;
        let mut y = self.height;
        while y > 0 {
            let row = y - 1;
            if self.rows[row].iter().all(Cell::is_filled) {
                self.rows.remove(row);
                self.rows.push_front(vec![Cell::Empty; self.width]);
                cleared += 1;
                // the row above now sits at `row`; look at it again
                continue;
            }
            y -= 1;
        }
        cleared
    }
}

/// True if the candidate placement leaves the walls or floor, or overlaps a
/// locked cell. Backs moves, rotation and spawn checks alike.
pub fn collides(board: &Board, candidate: &ActivePiece) -> bool {
    candidate
        .cells()
        .any(|(x, y)| !board.is_inside_and_free(x, y))
}

#[cfg(test)]
pub(crate) fn board_from_rows(rows: &[&str]) -> Board {
    let height = rows.len();
    let width = rows.first().map_or(0, |r| r.len());
    let mut board = Board::new(width, height);
    for (y, row) in rows.iter().enumerate() {
        for (x, ch) in row.chars().enumerate() {
            if ch != '.' {
                board.set(x, y, Cell::Filled(ColorId::new(ch.to_string())));
            }
        }
    }
    board
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::{Piece, shape};

    fn active(rows: &[&[u8]], x: i32, y: i32) -> ActivePiece {
        ActivePiece {
            piece: Piece {
                shape: shape(rows),
                color: ColorId::new("#f0a000"),
            },
            x,
            y,
        }
    }

    fn row_string(board: &Board, y: usize) -> String {
        board
            .rows()
            .nth(y)
            .unwrap()
            .iter()
            .map(|c| match c {
                Cell::Empty => '.'.to_string(),
                Cell::Filled(c) => c.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_is_inside_and_free() {
        let board = board_from_rows(&["....", "..a.", "...."]);
        assert!(board.is_inside_and_free(0, 0));
        assert!(board.is_inside_and_free(3, -5));
        assert!(!board.is_inside_and_free(-1, 0));
        assert!(!board.is_inside_and_free(4, 0));
        assert!(!board.is_inside_and_free(0, 3));
        assert!(!board.is_inside_and_free(2, 1));
        // side walls still apply above the field
        assert!(!board.is_inside_and_free(-1, -1));
    }

    #[test]
    fn test_lock_drops_cells_above_field() {
        let mut board = Board::new(4, 3);
        board.lock(&active(&[&[1, 1], &[1, 1]], 1, -1));
        assert_eq!(board.filled_count(), 2);
        assert_eq!(
            board.get(1, 0),
            Some(&Cell::Filled(ColorId::new("#f0a000")))
        );
        assert_eq!(board.get(1, 1), Some(&Cell::Empty));
    }

    #[test]
    fn test_clear_single_row() {
        let mut board = board_from_rows(&["....", "a...", "bbbb"]);
        assert_eq!(board.clear_full_rows(), 1);
        assert_eq!(row_string(&board, 0), "....");
        assert_eq!(row_string(&board, 1), "....");
        assert_eq!(row_string(&board, 2), "a...");
    }

    #[test]
    fn test_clear_adjacent_rows_rechecks_same_index() {
        let mut board = board_from_rows(&["c...", "aaaa", "bbbb", "d.d."]);
        assert_eq!(board.clear_full_rows(), 2);
        assert_eq!(row_string(&board, 0), "....");
        assert_eq!(row_string(&board, 1), "....");
        assert_eq!(row_string(&board, 2), "c...");
        assert_eq!(row_string(&board, 3), "d.d.");
    }

    #[test]
    fn test_clear_preserves_order_of_remaining_rows() {
        let mut board =
            board_from_rows(&["1...", "xxxx", "2.2.", "yyyy", ".3..", "zzzz", "44.4"]);
        assert_eq!(board.clear_full_rows(), 3);
        let kept: Vec<String> = (0..7).map(|y| row_string(&board, y)).collect();
        assert_eq!(
            kept,
            ["....", "....", "....", "1...", "2.2.", ".3..", "44.4"]
        );
        assert_eq!(board.height(), 7);
        assert!(board.rows().all(|r| r.len() == 4));
    }

    #[test]
    fn test_clear_nothing() {
        let mut board = board_from_rows(&["a...", "bb.b"]);
        let before = board.clone();
        assert_eq!(board.clear_full_rows(), 0);
        assert_eq!(board, before);
    }

    #[test]
    fn test_collides_walls_floor_and_stack() {
        let board = board_from_rows(&["....", "....", "..a."]);
        let o = [&[1u8, 1][..], &[1, 1][..]];
        assert!(!collides(&board, &active(&o, 0, 0)));
        assert!(collides(&board, &active(&o, -1, 0)));
        assert!(collides(&board, &active(&o, 3, 0)));
        assert!(collides(&board, &active(&o, 0, 2)));
        assert!(collides(&board, &active(&o, 1, 1)));
        // partially above the field is fine
        assert!(!collides(&board, &active(&o, 0, -1)));
    }

    #[test]
    fn test_collision_past_the_floor_stays_blocked() {
        let board = board_from_rows(&["......", "......", "...a..", "......", "aaaaa."]);
        let t = [&[0u8, 1, 0][..], &[1, 1, 1][..]];
        for x in 0..4 {
            // first offset where the shape's bottom row leaves the field
            let floor_hit = board.height() as i32 - 1;
            for y in floor_hit..floor_hit + 10 {
                assert!(collides(&board, &active(&t, x, y)), "x={x} y={y}");
            }
        }
    }

    #[test]
    fn test_first_blocked_offset_is_where_descent_stops() {
        let board = board_from_rows(&["......", "......", "......", "......", "aa.aaa"]);
        let i = [&[1u8][..], &[1][..], &[1][..]];
        // column 2 is open to the floor, column 0 is capped at row 4
        let stop = |x: i32| (0..).find(|&y| collides(&board, &active(&i, x, y + 1))).unwrap();
        assert_eq!(stop(0), 1);
        assert_eq!(stop(2), 2);
    }
}
