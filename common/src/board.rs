//! Grid geometry, the ground-truth [`Board`] and the partially revealed
//! [`GameBoard`].
//!
//! Both boards are stored as one row-major `Vec`. The boundary shapes (a flat
//! row-major array of cell codes, or one array per row) are import/export
//! adapters only; every algorithm in the crate works on the canonical form.

use crate::error::{Error, Result};
use std::cmp::Ordering;

/// Boundary code for a mine on a [`Board`].
pub const MINE_CODE: i32 = -1;
/// Boundary code for an unrevealed cell on a [`GameBoard`].
pub const UNKNOWN_CODE: i32 = 10;
/// Boundary code for a flagged, unrevealed cell on a [`GameBoard`].
pub const FLAGGED_CODE: i32 = 11;

/// Represents a 2D coordinate on the minesweeper board.
/// `x` is the column and `y` is the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Point {
    pub x: usize,
    pub y: usize,
}

impl Point {
    pub const fn new(x: usize, y: usize) -> Self {
        Point { x, y }
    }
}

// Row-major, so sorted points read like the board.
impl Ord for Point {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.y, self.x).cmp(&(other.y, other.x))
    }
}

impl PartialOrd for Point {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct RawDimensions {
    rows: usize,
    cols: usize,
}

/// Board size and the 8-connected neighbour geometry shared by every grid.
/// Both sides are always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "RawDimensions", into = "RawDimensions")]
pub struct Dimensions {
    rows: usize,
    cols: usize,
}

impl Dimensions {
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(Error::InvalidDimensions { rows, cols });
        }
        Ok(Dimensions { rows, cols })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn area(&self) -> usize {
        self.rows * self.cols
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x < self.cols && point.y < self.rows
    }

    pub fn check(&self, point: Point) -> Result<()> {
        if self.contains(point) {
            Ok(())
        } else {
            Err(Error::OutOfBounds {
                x: point.x,
                y: point.y,
                rows: self.rows,
                cols: self.cols,
            })
        }
    }

    pub fn index(&self, point: Point) -> usize {
        point.y * self.cols + point.x
    }

    pub fn point(&self, index: usize) -> Point {
        Point {
            x: index % self.cols,
            y: index / self.cols,
        }
    }

    /// All points in row-major order.
    pub fn points(&self) -> impl Iterator<Item = Point> + use<> {
        let cols = self.cols;
        (0..self.area()).map(move |i| Point {
            x: i % cols,
            y: i / cols,
        })
    }

    /// All valid neighbour coordinates of `point`, clipped at edges and corners.
    pub fn neighbors(&self, point: Point) -> impl Iterator<Item = Point> + use<> {
        let width = self.cols;
        let height = self.rows;

        (-1..=1).flat_map(move |dy| {
            (-1..=1).filter_map(move |dx| {
                if dx == 0 && dy == 0 {
                    return None;
                }

                let nx = point.x as isize + dx;
                let ny = point.y as isize + dy;

                if nx >= 0 && nx < width as isize && ny >= 0 && ny < height as isize {
                    Some(Point {
                        x: nx as usize,
                        y: ny as usize,
                    })
                } else {
                    None
                }
            })
        })
    }
}

impl TryFrom<RawDimensions> for Dimensions {
    type Error = Error;

    fn try_from(raw: RawDimensions) -> Result<Self> {
        Dimensions::new(raw.rows, raw.cols)
    }
}

impl From<Dimensions> for RawDimensions {
    fn from(dims: Dimensions) -> Self {
        RawDimensions {
            rows: dims.rows,
            cols: dims.cols,
        }
    }
}

/// Flattens the row-structured boundary shape into `(dimensions, row-major cells)`.
/// Ragged input is rejected.
pub fn flatten_rows<T: Copy, R: AsRef<[T]>>(rows: &[R]) -> Result<(Dimensions, Vec<T>)> {
    let cols = rows.first().map_or(0, |row| row.as_ref().len());
    let dims = Dimensions::new(rows.len(), cols)?;
    if rows.iter().any(|row| row.as_ref().len() != cols) {
        return Err(Error::ShapeMismatch {
            expected: dims.area(),
            actual: rows.iter().map(|row| row.as_ref().len()).sum(),
        });
    }
    let flat = rows
        .iter()
        .flat_map(|row| row.as_ref().iter().copied())
        .collect();
    Ok((dims, flat))
}

/// Splits row-major cells back into one `Vec` per row.
pub fn split_rows<T: Clone>(dims: Dimensions, flat: &[T]) -> Vec<Vec<T>> {
    flat.chunks(dims.cols).map(<[T]>::to_vec).collect()
}

fn check_len(dims: Dimensions, len: usize) -> Result<()> {
    if len != dims.area() {
        return Err(Error::ShapeMismatch {
            expected: dims.area(),
            actual: len,
        });
    }
    Ok(())
}

// --- Ground truth ---

/// A fully known cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Cell {
    Mine,
    Count(u8), // Number of adjacent mines, 0..=8.
}

impl Cell {
    pub fn code(self) -> i32 {
        match self {
            Cell::Mine => MINE_CODE,
            Cell::Count(n) => n as i32,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            MINE_CODE => Some(Cell::Mine),
            0..=8 => Some(Cell::Count(code as u8)),
            _ => None,
        }
    }

    pub fn is_mine(self) -> bool {
        matches!(self, Cell::Mine)
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct RawBoard {
    rows: usize,
    cols: usize,
    cells: Vec<i32>,
}

/// An immutable mine layout with its numbers.
///
/// Numbers are always derived from the mine positions, so a `Board` can never
/// disagree with itself no matter what numbering the caller supplied.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "RawBoard", into = "RawBoard")]
pub struct Board {
    dims: Dimensions,
    cells: Vec<Cell>,
    mines: usize,
}

impl Board {
    /// Builds a board from mine positions, computing every number.
    /// Duplicate positions are counted once.
    pub fn from_mines(dims: Dimensions, mines: impl IntoIterator<Item = Point>) -> Result<Self> {
        let mut is_mine = vec![false; dims.area()];
        for point in mines {
            dims.check(point)?;
            is_mine[dims.index(point)] = true;
        }

        let cells = dims
            .points()
            .map(|point| {
                if is_mine[dims.index(point)] {
                    Cell::Mine
                } else {
                    let count = dims
                        .neighbors(point)
                        .filter(|&n| is_mine[dims.index(n)])
                        .count();
                    Cell::Count(count as u8)
                }
            })
            .collect::<Vec<_>>();
        let mines = is_mine.iter().filter(|&&m| m).count();

        Ok(Board { dims, cells, mines })
    }

    /// Imports the flat boundary shape: `-1` for a mine, `0..=8` otherwise.
    /// Supplied numbers are range-checked and then recomputed from the mines.
    pub fn from_flat(rows: usize, cols: usize, codes: &[i32]) -> Result<Self> {
        let dims = Dimensions::new(rows, cols)?;
        check_len(dims, codes.len())?;
        let mut mines = Vec::new();
        for (index, &code) in codes.iter().enumerate() {
            match Cell::from_code(code) {
                Some(Cell::Mine) => mines.push(dims.point(index)),
                Some(Cell::Count(_)) => {}
                None => return Err(Error::InvalidCellCode { code, index }),
            }
        }
        Board::from_mines(dims, mines)
    }

    /// Imports the row-structured boundary shape.
    pub fn from_rows<R: AsRef<[i32]>>(rows: &[R]) -> Result<Self> {
        let (dims, flat) = flatten_rows(rows)?;
        Board::from_flat(dims.rows, dims.cols, &flat)
    }

    pub fn to_flat(&self) -> Vec<i32> {
        self.cells.iter().map(|cell| cell.code()).collect()
    }

    pub fn to_rows(&self) -> Vec<Vec<i32>> {
        split_rows(self.dims, &self.to_flat())
    }

    pub fn dims(&self) -> Dimensions {
        self.dims
    }

    pub fn rows(&self) -> usize {
        self.dims.rows
    }

    pub fn cols(&self) -> usize {
        self.dims.cols
    }

    pub fn get(&self, point: Point) -> Cell {
        self.cells[self.dims.index(point)]
    }

    pub fn is_mine(&self, point: Point) -> bool {
        self.get(point).is_mine()
    }

    pub fn mine_count(&self) -> usize {
        self.mines
    }

    /// Row-major cells.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn mines(&self) -> impl Iterator<Item = Point> + '_ {
        self.dims.points().filter(|&p| self.is_mine(p))
    }

    pub fn neighbors(&self, point: Point) -> impl Iterator<Item = Point> + use<> {
        self.dims.neighbors(point)
    }

    /// Serializes the board into a compact binary snapshot.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bcs::to_bytes(self)?)
    }

    /// Restores a board from [`Board::to_bytes`] output, re-validating it.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bcs::from_bytes(bytes)?)
    }
}

impl TryFrom<RawBoard> for Board {
    type Error = Error;

    fn try_from(raw: RawBoard) -> Result<Self> {
        Board::from_flat(raw.rows, raw.cols, &raw.cells)
    }
}

impl From<Board> for RawBoard {
    fn from(board: Board) -> Self {
        RawBoard {
            rows: board.rows(),
            cols: board.cols(),
            cells: board.to_flat(),
        }
    }
}

// --- Partial knowledge ---

/// The visible state of a single cell, as reported by whoever is playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum GameCell {
    Revealed(u8), // The u8 is the number of adjacent mines.
    Unknown,
    /// Unrevealed and flagged. Flags are trusted to be mines.
    Flagged,
}

impl GameCell {
    pub fn code(self) -> i32 {
        match self {
            GameCell::Revealed(n) => n as i32,
            GameCell::Unknown => UNKNOWN_CODE,
            GameCell::Flagged => FLAGGED_CODE,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0..=8 => Some(GameCell::Revealed(code as u8)),
            UNKNOWN_CODE => Some(GameCell::Unknown),
            FLAGGED_CODE => Some(GameCell::Flagged),
            _ => None,
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct RawGameBoard {
    rows: usize,
    cols: usize,
    cells: Vec<i32>,
}

/// A snapshot of partial knowledge layered over some unseen [`Board`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "RawGameBoard", into = "RawGameBoard")]
pub struct GameBoard {
    dims: Dimensions,
    cells: Vec<GameCell>,
}

impl GameBoard {
    /// A board with nothing revealed yet.
    pub fn unrevealed(dims: Dimensions) -> Self {
        GameBoard {
            dims,
            cells: vec![GameCell::Unknown; dims.area()],
        }
    }

    pub fn from_cells(dims: Dimensions, cells: Vec<GameCell>) -> Result<Self> {
        check_len(dims, cells.len())?;
        if let Some((index, cell)) = cells
            .iter()
            .enumerate()
            .find(|(_, cell)| matches!(cell, GameCell::Revealed(n) if *n > 8))
        {
            return Err(Error::InvalidCellCode {
                code: cell.code(),
                index,
            });
        }
        Ok(GameBoard { dims, cells })
    }

    /// Imports the flat boundary shape: `0..=8` revealed, `10` unknown, `11` flagged.
    pub fn from_flat(rows: usize, cols: usize, codes: &[i32]) -> Result<Self> {
        let dims = Dimensions::new(rows, cols)?;
        check_len(dims, codes.len())?;
        let cells = codes
            .iter()
            .enumerate()
            .map(|(index, &code)| {
                GameCell::from_code(code).ok_or(Error::InvalidCellCode { code, index })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(GameBoard { dims, cells })
    }

    pub fn from_rows<R: AsRef<[i32]>>(rows: &[R]) -> Result<Self> {
        let (dims, flat) = flatten_rows(rows)?;
        GameBoard::from_flat(dims.rows, dims.cols, &flat)
    }

    pub fn to_flat(&self) -> Vec<i32> {
        self.cells.iter().map(|cell| cell.code()).collect()
    }

    pub fn to_rows(&self) -> Vec<Vec<i32>> {
        split_rows(self.dims, &self.to_flat())
    }

    pub fn dims(&self) -> Dimensions {
        self.dims
    }

    pub fn get(&self, point: Point) -> GameCell {
        self.cells[self.dims.index(point)]
    }

    pub(crate) fn set(&mut self, point: Point, cell: GameCell) {
        let index = self.dims.index(point);
        self.cells[index] = cell;
    }

    pub fn cells(&self) -> &[GameCell] {
        &self.cells
    }

    pub fn unknown_count(&self) -> usize {
        self.count(|cell| matches!(cell, GameCell::Unknown))
    }

    pub fn flagged_count(&self) -> usize {
        self.count(|cell| matches!(cell, GameCell::Flagged))
    }

    pub fn revealed_count(&self) -> usize {
        self.count(|cell| matches!(cell, GameCell::Revealed(_)))
    }

    fn count(&self, pred: impl Fn(&GameCell) -> bool) -> usize {
        self.cells.iter().filter(|cell| pred(cell)).count()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bcs::to_bytes(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bcs::from_bytes(bytes)?)
    }
}

impl TryFrom<RawGameBoard> for GameBoard {
    type Error = Error;

    fn try_from(raw: RawGameBoard) -> Result<Self> {
        GameBoard::from_flat(raw.rows, raw.cols, &raw.cells)
    }
}

impl From<GameBoard> for RawGameBoard {
    fn from(game: GameBoard) -> Self {
        RawGameBoard {
            rows: game.dims.rows,
            cols: game.dims.cols,
            cells: game.to_flat(),
        }
    }
}
