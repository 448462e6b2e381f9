//! Board representation: a fixed grid of cells, each holding at most one item.
//!
//! This module contains:
//! - `CellCoord` and `Cell`
//! - The `Board` grid with fill, query and removal
//! - `FillPolicy` and the stock fill policies

use crate::item::{Item, ItemIdAllocator, ItemType, ItemTypeRegistry};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Grid coordinate. `x` is the column, `y` the row, both zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct CellCoord {
    pub x: usize,
    pub y: usize,
}

impl CellCoord {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A single grid slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub coord: CellCoord,
    item: Option<Item>,
}

impl Cell {
    fn new(coord: CellCoord) -> Self {
        Self { coord, item: None }
    }

    pub fn item(&self) -> Option<&Item> {
        self.item.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.item.is_none()
    }

    /// Take the item out, leaving the cell empty
    fn free(&mut self) -> Option<Item> {
        self.item.take()
    }

    /// Put an item in. Hands it back if the cell is occupied.
    fn assign(&mut self, item: Item) -> Result<(), Item> {
        if self.item.is_some() {
            return Err(item);
        }
        self.item = Some(item);
        Ok(())
    }
}

/// Errors raised while filling a board
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum BoardError {
    #[error("Item type pool is empty")]
    EmptyPool,

    #[error("Fill policy produced {got} item types for {expected} cells")]
    FillMismatch { expected: usize, got: usize },
}

/// Decides which item type goes in every cell of a freshly created board.
///
/// Implementations return exactly one type per cell in row-major order.
pub trait FillPolicy {
    fn assign(&mut self, width: usize, height: usize, pool: &ItemTypeRegistry) -> Vec<ItemType>;
}

/// Random fill where every type appears a multiple of `group_size` times,
/// as far as the cell count allows. Leftover cells get independent picks.
#[derive(Debug, Clone)]
pub struct TripletFill {
    group_size: usize,
    rng: StdRng,
}

impl TripletFill {
    pub fn new(group_size: usize) -> Self {
        Self {
            group_size: group_size.max(1),
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(group_size: usize, seed: u64) -> Self {
        Self {
            group_size: group_size.max(1),
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl FillPolicy for TripletFill {
    fn assign(&mut self, width: usize, height: usize, pool: &ItemTypeRegistry) -> Vec<ItemType> {
        let Some(cell_count) = width.checked_mul(height) else {
            return Vec::new();
        };
        if pool.is_empty() {
            return Vec::new();
        }

        let mut types = Vec::with_capacity(cell_count);
        for _ in 0..cell_count / self.group_size {
            let index = self.rng.gen_range(0..pool.len());
            if let Some(item_type) = pool.get(index) {
                types.extend(std::iter::repeat(item_type.clone()).take(self.group_size));
            }
        }
        while types.len() < cell_count {
            let index = self.rng.gen_range(0..pool.len());
            if let Some(item_type) = pool.get(index) {
                types.push(item_type.clone());
            }
        }

        types.shuffle(&mut self.rng);
        types
    }
}

/// Independent uniform pick per cell. No solvability guarantee.
#[derive(Debug, Clone)]
pub struct RandomFill {
    rng: StdRng,
}

impl RandomFill {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomFill {
    fn default() -> Self {
        Self::new()
    }
}

impl FillPolicy for RandomFill {
    fn assign(&mut self, width: usize, height: usize, pool: &ItemTypeRegistry) -> Vec<ItemType> {
        let types: Vec<&ItemType> = pool.iter().collect();
        (0..width.checked_mul(height).unwrap_or(0))
            .filter_map(|_| types.choose(&mut self.rng).map(|t| (*t).clone()))
            .collect()
    }
}

/// Fixed row-major assignment, for scripted levels and tests
#[derive(Debug, Clone)]
pub struct SequenceFill {
    types: Vec<ItemType>,
}

impl SequenceFill {
    pub fn new(types: Vec<ItemType>) -> Self {
        Self { types }
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names.into_iter().map(ItemType::new).collect())
    }
}

impl FillPolicy for SequenceFill {
    fn assign(&mut self, _width: usize, _height: usize, _pool: &ItemTypeRegistry) -> Vec<ItemType> {
        self.types.clone()
    }
}

/// The puzzle grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    width: usize,
    height: usize,
    /// Row-major, `y * width + x`
    cells: Vec<Cell>,
}

impl Board {
    /// Create an empty board
    pub fn new(width: usize, height: usize) -> Self {
        let cells = (0..height)
            .flat_map(|y| (0..width).map(move |x| Cell::new(CellCoord::new(x, y))))
            .collect();
        Self {
            width,
            height,
            cells,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn contains(&self, coord: CellCoord) -> bool {
        coord.x < self.width && coord.y < self.height
    }

    fn index(&self, coord: CellCoord) -> Option<usize> {
        self.contains(coord).then(|| coord.y * self.width + coord.x)
    }

    /// Populate every cell. Any previous contents are discarded.
    pub fn fill(
        &mut self,
        pool: &ItemTypeRegistry,
        policy: &mut dyn FillPolicy,
        ids: &mut ItemIdAllocator,
    ) -> Result<(), BoardError> {
        if pool.is_empty() {
            return Err(BoardError::EmptyPool);
        }

        let types = policy.assign(self.width, self.height, pool);
        if types.len() != self.cells.len() {
            return Err(BoardError::FillMismatch {
                expected: self.cells.len(),
                got: types.len(),
            });
        }

        for (cell, item_type) in self.cells.iter_mut().zip(types) {
            cell.item = Some(ids.make(item_type));
        }
        Ok(())
    }

    pub fn cell(&self, coord: CellCoord) -> Option<&Cell> {
        self.index(coord).map(|i| &self.cells[i])
    }

    pub fn get_item_at(&self, coord: CellCoord) -> Option<&Item> {
        self.cell(coord).and_then(Cell::item)
    }

    /// Remove and return the item at `coord`. `None` if empty or out of range.
    pub fn free(&mut self, coord: CellCoord) -> Option<Item> {
        let index = self.index(coord)?;
        self.cells[index].free()
    }

    /// Put an item back on the board. Fails, returning the item, when the
    /// cell is out of range or occupied.
    pub fn place(&mut self, coord: CellCoord, item: Item) -> Result<(), Item> {
        match self.index(coord) {
            Some(index) => self.cells[index].assign(item),
            None => Err(item),
        }
    }

    /// Board-win condition
    pub fn is_all_empty(&self) -> bool {
        self.cells.iter().all(Cell::is_empty)
    }

    /// Empty every cell
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.item = None;
        }
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_empty()).count()
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    pub fn occupied_cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter().filter(|c| !c.is_empty())
    }

    /// Rows of optional items, for renderers
    pub fn to_rows(&self) -> Vec<Vec<Option<Item>>> {
        self.cells
            .chunks(self.width.max(1))
            .map(|row| row.iter().map(|c| c.item.clone()).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn pool() -> ItemTypeRegistry {
        ItemTypeRegistry::from_names(["apple", "pear", "plum", "kiwi"])
    }

    fn filled(width: usize, height: usize) -> Board {
        let mut board = Board::new(width, height);
        let mut ids = ItemIdAllocator::new();
        board
            .fill(&pool(), &mut TripletFill::with_seed(3, 7), &mut ids)
            .unwrap();
        board
    }

    #[test]
    fn test_new_board_is_empty() {
        let board = Board::new(4, 3);
        assert_eq!(board.cells().count(), 12);
        assert!(board.is_all_empty());
        assert_eq!(board.cell(CellCoord::new(3, 2)).unwrap().coord, CellCoord::new(3, 2));
    }

    #[test]
    fn test_fill_populates_every_cell() {
        let board = filled(6, 6);
        assert_eq!(board.occupied_count(), 36);
        assert!(!board.is_all_empty());
    }

    #[test]
    fn test_triplet_fill_counts_are_multiples_of_three() {
        let board = filled(6, 6);
        let mut counts: HashMap<ItemType, usize> = HashMap::new();
        for cell in board.occupied_cells() {
            *counts.entry(cell.item().unwrap().item_type.clone()).or_default() += 1;
        }
        assert!(counts.values().all(|n| n % 3 == 0));
    }

    #[test]
    fn test_free_returns_item_once() {
        let mut board = filled(3, 3);
        let coord = CellCoord::new(1, 2);
        let expected = board.get_item_at(coord).cloned();

        let freed = board.free(coord);
        assert_eq!(freed, expected);
        assert!(board.get_item_at(coord).is_none());

        // Second free is a no-op
        assert!(board.free(coord).is_none());
    }

    #[test]
    fn test_out_of_range_is_none() {
        let mut board = filled(3, 3);
        assert!(board.get_item_at(CellCoord::new(3, 0)).is_none());
        assert!(board.free(CellCoord::new(0, 9)).is_none());
        assert_eq!(board.occupied_count(), 9);
    }

    #[test]
    fn test_place_rejects_occupied_cell() {
        let mut board = filled(3, 3);
        let item = board.free(CellCoord::new(0, 0)).unwrap();
        let item = board.place(CellCoord::new(1, 0), item).unwrap_err();
        board.place(CellCoord::new(0, 0), item).unwrap();
        assert_eq!(board.occupied_count(), 9);
    }

    #[test]
    fn test_clear_empties_board() {
        let mut board = filled(3, 3);
        board.clear();
        assert!(board.is_all_empty());
    }

    #[test]
    fn test_sequence_fill_is_row_major() {
        let mut board = Board::new(2, 2);
        let mut ids = ItemIdAllocator::new();
        let mut policy = SequenceFill::from_names(["a", "b", "c", "d"]);
        board.fill(&pool(), &mut policy, &mut ids).unwrap();

        assert_eq!(board.get_item_at(CellCoord::new(1, 0)).unwrap().item_type.as_str(), "b");
        assert_eq!(board.get_item_at(CellCoord::new(0, 1)).unwrap().item_type.as_str(), "c");
    }

    #[test]
    fn test_fill_rejects_wrong_length() {
        let mut board = Board::new(2, 2);
        let mut ids = ItemIdAllocator::new();
        let mut policy = SequenceFill::from_names(["a", "b"]);
        assert_eq!(
            board.fill(&pool(), &mut policy, &mut ids),
            Err(BoardError::FillMismatch {
                expected: 4,
                got: 2
            })
        );
        assert!(board.is_all_empty());
    }

    #[test]
    fn test_fill_rejects_empty_pool() {
        let mut board = Board::new(2, 2);
        let mut ids = ItemIdAllocator::new();
        assert_eq!(
            board.fill(&ItemTypeRegistry::new(), &mut RandomFill::with_seed(1), &mut ids),
            Err(BoardError::EmptyPool)
        );
    }

    #[test]
    fn test_fill_policies_survive_overflowing_sizes() {
        assert!(TripletFill::with_seed(3, 1)
            .assign(usize::MAX, 2, &pool())
            .is_empty());
        assert!(RandomFill::with_seed(1)
            .assign(usize::MAX, 2, &pool())
            .is_empty());
    }
}
