//! Prototype Grid
//!
//! `map_size x map_size` prototype vectors stored as one `Array3<f64>`
//! (row, col, dimension). The map size is fixed at construction; resizing
//! means building a new grid.

use ndarray::{Array3, ArrayView1, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// One log record encoded as a fixed-length vector
pub type Embedding = Vec<f64>;

/// Grid cell coordinate (row, col)
pub type Cell = (usize, usize);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    prototypes: Array3<f64>,
}

impl Grid {
    /// Fresh grid with prototypes drawn uniformly from `[0, 1)^dim`
    pub fn random<R: Rng + ?Sized>(map_size: usize, dim: usize, rng: &mut R) -> Self {
        let prototypes = Array3::from_shape_simple_fn((map_size, map_size, dim), || rng.gen::<f64>());
        Self { prototypes }
    }

    /// Wrap an existing array (row, col, dim). The first two axes must match.
    pub fn from_array(prototypes: Array3<f64>) -> Option<Self> {
        let (rows, cols, _) = prototypes.dim();
        if rows != cols {
            return None;
        }
        Some(Self { prototypes })
    }

    pub fn map_size(&self) -> usize {
        self.prototypes.dim().0
    }

    /// Embedding dimensionality
    pub fn dim(&self) -> usize {
        self.prototypes.dim().2
    }

    pub fn cells(&self) -> usize {
        let size = self.map_size();
        size * size
    }

    pub fn prototype(&self, cell: Cell) -> ArrayView1<'_, f64> {
        self.prototypes.index_axis(Axis(0), cell.0).index_axis_move(Axis(0), cell.1)
    }

    pub fn as_array(&self) -> &Array3<f64> {
        &self.prototypes
    }

    /// Best matching unit: closest cell by Euclidean distance.
    /// Row-major scan, ties keep the first cell found.
    pub fn best_matching_unit(&self, embedding: &[f64]) -> (Cell, f64) {
        let size = self.map_size();
        let mut best = (0, 0);
        let mut best_dist = f64::INFINITY;

        for row in 0..size {
            for col in 0..size {
                let dist = euclidean(self.prototype((row, col)), embedding);
                if dist < best_dist {
                    best_dist = dist;
                    best = (row, col);
                }
            }
        }

        (best, best_dist)
    }

    /// Distance to the nearest prototype
    pub fn min_distance(&self, embedding: &[f64]) -> f64 {
        self.best_matching_unit(embedding).1
    }

    /// `prototype += rate * (embedding - prototype)` for one cell
    pub(crate) fn pull_toward(&mut self, cell: Cell, embedding: &[f64], rate: f64) {
        let mut proto = self.prototypes
            .index_axis_mut(Axis(0), cell.0)
            .index_axis_move(Axis(0), cell.1);

        for (p, &e) in proto.iter_mut().zip(embedding) {
            *p += rate * (e - *p);
        }
    }

    /// CRC32 over the little-endian prototype values
    pub fn checksum(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        let (rows, cols, dim) = self.prototypes.dim();
        for v in [rows, cols, dim] {
            hasher.update(&(v as u64).to_le_bytes());
        }
        for v in self.prototypes.iter() {
            hasher.update(&v.to_le_bytes());
        }
        hasher.finalize()
    }
}

/// Euclidean distance between a prototype and an embedding
pub fn euclidean(proto: ArrayView1<'_, f64>, embedding: &[f64]) -> f64 {
    proto
        .iter()
        .zip(embedding)
        .map(|(p, e)| (p - e) * (p - e))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_random_grid_shape_and_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let grid = Grid::random(4, 3, &mut rng);

        assert_eq!(grid.map_size(), 4);
        assert_eq!(grid.dim(), 3);
        assert_eq!(grid.cells(), 16);
        assert!(grid.as_array().iter().all(|v| (0.0..1.0).contains(v)));
    }

    #[test]
    fn test_bmu_tie_keeps_first_cell() {
        let grid = Grid::from_array(Array3::zeros((3, 3, 2))).unwrap();
        let (cell, dist) = grid.best_matching_unit(&[1.0, 0.0]);
        assert_eq!(cell, (0, 0));
        assert!((dist - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_bmu_finds_exact_prototype() {
        let mut arr = Array3::zeros((2, 2, 2));
        arr[[1, 0, 0]] = 5.0;
        arr[[1, 0, 1]] = 5.0;
        let grid = Grid::from_array(arr).unwrap();

        let (cell, dist) = grid.best_matching_unit(&[5.0, 5.0]);
        assert_eq!(cell, (1, 0));
        assert_eq!(dist, 0.0);
    }

    #[test]
    fn test_from_array_rejects_non_square() {
        assert!(Grid::from_array(Array3::zeros((2, 3, 4))).is_none());
    }

    #[test]
    fn test_pull_toward_moves_single_cell() {
        let mut grid = Grid::from_array(Array3::zeros((2, 2, 2))).unwrap();
        grid.pull_toward((0, 1), &[2.0, 4.0], 0.5);

        assert_eq!(grid.prototype((0, 1)).to_vec(), vec![1.0, 2.0]);
        assert_eq!(grid.prototype((0, 0)).to_vec(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_checksum_changes_with_values() {
        let mut grid = Grid::from_array(Array3::zeros((2, 2, 2))).unwrap();
        let before = grid.checksum();
        grid.pull_toward((1, 1), &[1.0, 1.0], 0.1);
        assert_ne!(before, grid.checksum());
    }
}
