//! Self-Organizing Map Engine
//!
//! Competitive learning over a [`Grid`]:
//! - `train` pulls the best matching unit and its neighbourhood toward
//!   randomly drawn embeddings (uniform, with replacement, from a seeded RNG)
//! - `score` returns the distance of each embedding to its nearest prototype
//!
//! `train` is strictly sequential. `score` only reads the grid and fans out
//! over a fixed-size rayon pool ([`ScoringPool`]).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use super::grid::{Cell, Embedding, Grid};
use crate::constants::DEFAULT_NEIGHBORHOOD_RADIUS;
use crate::logic::error::{DetectorError, DetectorResult};

// ============================================================================
// UPDATE RULE
// ============================================================================

/// Learning rate at step `t` of `total`: linear decay to 0.
/// Defined as 0 when `total == 0`.
pub fn learning_rate(total: usize, t: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (total as f64 - t as f64) / total as f64
}

/// Neighbourhood weight `exp(-d / 2)` where `d` is the grid distance
/// between the BMU and the cell.
pub fn neighborhood(bmu: Cell, cell: Cell) -> f64 {
    let dr = bmu.0 as f64 - cell.0 as f64;
    let dc = bmu.1 as f64 - cell.1 as f64;
    let dist = (dr * dr + dc * dc).sqrt();
    (-dist / 2.0).exp()
}

// ============================================================================
// ENGINE
// ============================================================================

/// Training options for one pass
#[derive(Debug, Clone, Copy)]
pub struct TrainOptions {
    pub map_size: usize,
    pub iterations: usize,
    pub parallelism: usize,
    /// Discard any existing grid and start from random prototypes
    pub recreate: bool,
}

pub struct SomEngine {
    grid: Option<Grid>,
    rng: StdRng,
    radius: usize,
}

impl SomEngine {
    /// Engine seeded from OS entropy
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Engine with a fixed seed (initialisation and sample order)
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            grid: None,
            rng,
            radius: DEFAULT_NEIGHBORHOOD_RADIUS,
        }
    }

    /// Start from an already trained grid (warm start)
    pub fn with_grid(mut self, grid: Grid) -> Self {
        self.grid = Some(grid);
        self
    }

    pub fn with_radius(mut self, radius: usize) -> Self {
        self.radius = radius;
        self
    }

    pub fn grid(&self) -> Option<&Grid> {
        self.grid.as_ref()
    }

    pub fn take_grid(&mut self) -> Option<Grid> {
        self.grid.take()
    }

    pub fn set_grid(&mut self, grid: Grid) {
        self.grid = Some(grid);
    }

    /// Train the map in place.
    ///
    /// A fresh random grid is allocated when none exists, `recreate` is set,
    /// or the existing grid has a different `map_size` (logged as a warning).
    /// An existing grid with a different dimensionality is an
    /// `IncompatibleEmbeddingShape` error.
    pub fn train(&mut self, embeddings: &[Embedding], opts: TrainOptions) -> DetectorResult<()> {
        let dim = validate_batch(embeddings)?;
        if embeddings.is_empty() {
            return Err(DetectorError::EmptyDataSet("no embeddings to train on".into()));
        }
        if dim == 0 {
            return Err(DetectorError::InvalidInput("embeddings have zero length".into()));
        }
        if opts.map_size == 0 {
            return Err(DetectorError::InvalidInput("map_size must be at least 1".into()));
        }

        let resized = match self.grid.as_ref() {
            Some(g) if !opts.recreate && g.map_size() != opts.map_size => {
                log::warn!(
                    "Configured map size {} differs from the existing {}x{} grid, recreating",
                    opts.map_size,
                    g.map_size(),
                    g.map_size()
                );
                true
            }
            _ => false,
        };

        let needs_alloc = opts.recreate || resized || self.grid.is_none();
        if needs_alloc {
            log::info!("Allocating new {}x{} SOM grid (dim {})", opts.map_size, opts.map_size, dim);
            self.grid = Some(Grid::random(opts.map_size, dim, &mut self.rng));
        }

        let grid = match self.grid.as_mut() {
            Some(g) => g,
            None => return Err(DetectorError::InvalidInput("grid missing after allocation".into())),
        };
        if grid.dim() != dim {
            return Err(DetectorError::IncompatibleEmbeddingShape {
                expected: grid.dim(),
                actual: dim,
            });
        }

        let size = grid.map_size();
        let radius = self.radius as isize;
        let progress_step = (opts.iterations / 10).max(1);

        for t in 0..opts.iterations {
            if t % progress_step == 0 {
                log::info!("SOM training iteration {}/{}", t, opts.iterations);
            }

            let sample = &embeddings[self.rng.gen_range(0..embeddings.len())];
            let (bmu, _) = grid.best_matching_unit(sample);
            let alpha = learning_rate(opts.iterations, t);

            for dr in -radius..=radius {
                for dc in -radius..=radius {
                    let row = bmu.0 as isize + dr;
                    let col = bmu.1 as isize + dc;
                    if row < 0 || col < 0 || row >= size as isize || col >= size as isize {
                        continue;
                    }
                    let cell = (row as usize, col as usize);
                    grid.pull_toward(cell, sample, alpha * neighborhood(bmu, cell));
                }
            }
        }

        Ok(())
    }

    /// Distance of every embedding to its nearest prototype, in input order
    pub fn score(&self, embeddings: &[Embedding], parallelism: usize) -> DetectorResult<Vec<f64>> {
        self.score_with(&ScoringPool::new(parallelism), embeddings)
    }

    /// Same as `score`, on an existing pool
    pub fn score_with(&self, pool: &ScoringPool, embeddings: &[Embedding]) -> DetectorResult<Vec<f64>> {
        let grid = self.grid.as_ref()
            .ok_or_else(|| DetectorError::ModelLoad("no trained grid available for scoring".into()))?;
        pool.score(grid, embeddings)
    }
}

impl Default for SomEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// SCORING POOL
// ============================================================================

/// Fixed-size worker pool for scoring, built once and reused across batches.
/// `parallelism < 1` is treated as 1 and scores on the calling thread.
pub struct ScoringPool {
    workers: usize,
    pool: Option<rayon::ThreadPool>,
}

impl ScoringPool {
    pub fn new(parallelism: usize) -> Self {
        let workers = parallelism.max(1);
        let pool = if workers > 1 {
            match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
                Ok(pool) => Some(pool),
                Err(e) => {
                    log::warn!("Scoring pool unavailable ({}), scoring sequentially", e);
                    None
                }
            }
        } else {
            None
        };
        Self { workers, pool }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn is_parallel(&self) -> bool {
        self.pool.is_some()
    }

    /// Distance of every embedding to its nearest prototype, in input order
    pub fn score(&self, grid: &Grid, embeddings: &[Embedding]) -> DetectorResult<Vec<f64>> {
        let dim = validate_batch(embeddings)?;
        if !embeddings.is_empty() && dim != grid.dim() {
            return Err(DetectorError::IncompatibleEmbeddingShape {
                expected: grid.dim(),
                actual: dim,
            });
        }

        match &self.pool {
            Some(pool) if embeddings.len() > 1 => Ok(pool.install(|| {
                embeddings.par_iter().map(|e| grid.min_distance(e)).collect()
            })),
            _ => Ok(embeddings.iter().map(|e| grid.min_distance(e)).collect()),
        }
    }
}

/// One-off scoring against a borrowed grid
pub fn score_grid(grid: &Grid, embeddings: &[Embedding], parallelism: usize) -> DetectorResult<Vec<f64>> {
    ScoringPool::new(parallelism).score(grid, embeddings)
}

/// Common dimensionality of a batch; rejects ragged or non-finite input
fn validate_batch(embeddings: &[Embedding]) -> DetectorResult<usize> {
    let dim = match embeddings.first() {
        Some(first) => first.len(),
        None => return Ok(0),
    };

    for e in embeddings {
        if e.len() != dim {
            return Err(DetectorError::IncompatibleEmbeddingShape {
                expected: dim,
                actual: e.len(),
            });
        }
        if e.iter().any(|v| !v.is_finite()) {
            return Err(DetectorError::InvalidInput("embedding contains non-finite values".into()));
        }
    }

    Ok(dim)
}
