//! Patch positions of a tiled array and their re-indexing under rotation.
//!
//! Grids are stored row-major: index `i` sits at column `i % nx`, row `i / nx`.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unsupported rotation of {0} degrees")]
pub struct UnsupportedRotation(pub u16);

impl TryFrom<u16> for Rotation {
    type Error = UnsupportedRotation;

    fn try_from(degrees: u16) -> Result<Self, Self::Error> {
        match degrees {
            0 => Ok(Rotation::Deg0),
            90 => Ok(Rotation::Deg90),
            180 => Ok(Rotation::Deg180),
            270 => Ok(Rotation::Deg270),
            other => Err(UnsupportedRotation(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("grid of {len} cells is not {nx}x{ny}")]
pub struct GridMismatch {
    pub len: usize,
    pub nx: usize,
    pub ny: usize,
}

impl Rotation {
    /// Grid dimensions after rotating an `nx` x `ny` grid.
    pub fn dimensions(&self, nx: usize, ny: usize) -> (usize, usize) {
        match self {
            Rotation::Deg0 | Rotation::Deg180 => (nx, ny),
            Rotation::Deg90 | Rotation::Deg270 => (ny, nx),
        }
    }
}

/// Index that cell `i` of an `nx` x `ny` grid moves to.
pub fn rotated_index(i: usize, nx: usize, ny: usize, rotation: Rotation) -> usize {
    let (x, y) = (i % nx, i / nx);
    match rotation {
        Rotation::Deg0 => i,
        Rotation::Deg90 => x * ny + (ny - 1 - y),
        Rotation::Deg180 => (nx - 1 - x) + (ny - 1 - y) * nx,
        Rotation::Deg270 => y + (nx - 1 - x) * ny,
    }
}

/// Rotates a row-major grid, returning the cells and the new `(nx, ny)`.
pub fn rotate<T: Clone>(
    cells: &[T],
    nx: usize,
    ny: usize,
    rotation: Rotation,
) -> Result<(Vec<T>, usize, usize), GridMismatch> {
    if nx.checked_mul(ny) != Some(cells.len()) {
        return Err(GridMismatch {
            len: cells.len(),
            nx,
            ny,
        });
    }
    let mut rotated: Vec<Option<T>> = vec![None; cells.len()];
    for (i, cell) in cells.iter().enumerate() {
        rotated[rotated_index(i, nx, ny, rotation)] = Some(cell.clone());
    }
    let (rx, ry) = rotation.dimensions(nx, ny);
    Ok((rotated.into_iter().flatten().collect(), rx, ry))
}

/// Spreadsheet-style label of cell `i`: A..Z, AA..ZZ, AAA, ...
pub fn patch_label(i: usize) -> String {
    let mut letters = Vec::new();
    let mut n = i;
    loop {
        letters.push(char::from(b'A' + (n % 26) as u8));
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    letters.iter().rev().collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatchPose {
    pub t_x: f64,
    pub t_y: f64,
}

/// Positions of every patch of the array tile at (`col`, `row`).
pub fn patch_positions(col: u16, row: u16, nx: usize, ny: usize, spacing: f64) -> Vec<PatchPose> {
    let x_offset = f64::from(col) * spacing * nx as f64;
    let y_offset = f64::from(row) * spacing * ny as f64;
    (0..nx * ny)
        .map(|i| PatchPose {
            t_x: x_offset + (i % nx) as f64 * spacing,
            t_y: y_offset + (i / nx) as f64 * spacing,
        })
        .collect()
}
