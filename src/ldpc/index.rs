//! Check node adjacency
//!
//! Expands the block model matrix into the list of variable nodes attached to
//! every check node, without ever materializing the binary parity check
//! matrix. The table is built once, then shared read-only by every decoder
//! and worker using the code.

use snafu::ensure;

use super::error::*;
use super::geometry::{CodeGeometry, QcCode};

/// Per-check variable node index lists
///
/// Stored flat with a stride of `g_max` so two tables for the same code
/// compare equal element by element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CheckAdjacency {
    geometry: CodeGeometry,
    degrees: Vec<u8>,
    indices: Vec<u32>,
}

impl CheckAdjacency {
    /// Expand a code's block model matrix into check adjacency lists
    ///
    /// The circulant at block (r, c) with shift s places, for every offset
    /// k in [0, Z), an edge between column `c*Z + k` and row
    /// `((k + Z - s) mod Z) + r*Z`. Block columns are visited in order, so
    /// each list is sorted by variable index.
    ///
    /// # Errors
    /// * `CodeError::DegreeOverflow` - a check would exceed `g_max` edges
    pub fn build(code: &QcCode) -> Result<Self, CodeError> {
        let geometry = *code.geometry();
        let base = code.base();
        let z = geometry.z();
        let g_max = geometry.g_max();

        let mut degrees = vec![0u8; geometry.m()];
        let mut indices = vec![0u32; geometry.m() * g_max];

        for r in 0..geometry.mb() {
            let row_offset = r * z;
            for c in 0..geometry.nb() {
                let Some(shift) = base.shift(r, c) else {
                    continue;
                };
                let col_offset = c * z;

                for k in 0..z {
                    let col = col_offset + k;
                    let row = ((k + z - shift) % z) + row_offset;

                    let degree = degrees[row] as usize;
                    ensure!(degree < g_max, DegreeOverflowSnafu { check: row, g_max });

                    indices[row * g_max + degree] = col as u32;
                    degrees[row] += 1;
                }
            }
        }

        tracing::debug!(
            n = geometry.n(),
            m = geometry.m(),
            z,
            g_max,
            "built check adjacency"
        );

        Ok(Self { geometry, degrees, indices })
    }

    /// Wrap precomputed adjacency lists instead of expanding the base matrix
    ///
    /// Used for codes whose index tables are distributed directly. The lists
    /// are validated against the geometry before being accepted.
    pub fn from_lists<L: AsRef<[u32]>>(geometry: CodeGeometry, lists: &[L]) -> Result<Self, CodeError> {
        let g_max = geometry.g_max();
        let n = geometry.n();
        ensure!(
            lists.len() == geometry.m(),
            AdjacencyMismatchSnafu { expected: geometry.m(), found: lists.len() }
        );

        let mut degrees = vec![0u8; geometry.m()];
        let mut indices = vec![0u32; geometry.m() * g_max];

        for (check, list) in lists.iter().enumerate() {
            let list = list.as_ref();
            ensure!(list.len() <= g_max, DegreeOverflowSnafu { check, g_max });
            for (i, &variable) in list.iter().enumerate() {
                ensure!(
                    (variable as usize) < n,
                    VariableOutOfRangeSnafu { check, variable: variable as usize, n }
                );
                indices[check * g_max + i] = variable;
            }
            degrees[check] = list.len() as u8;
        }

        Ok(Self { geometry, degrees, indices })
    }

    pub fn geometry(&self) -> &CodeGeometry {
        &self.geometry
    }

    /// Variable nodes attached to check `m`
    #[inline]
    pub fn neighbors(&self, m: usize) -> &[u32] {
        let start = m * self.geometry.g_max();
        &self.indices[start..start + self.degrees[m] as usize]
    }

    /// Degree of check `m`
    #[inline]
    pub fn degree(&self, m: usize) -> usize {
        self.degrees[m] as usize
    }

    pub fn num_checks(&self) -> usize {
        self.degrees.len()
    }

    pub fn num_variables(&self) -> usize {
        self.geometry.n()
    }

    /// Largest degree actually present
    pub fn max_degree(&self) -> usize {
        self.degrees.iter().copied().max().unwrap_or(0) as usize
    }

    /// Raw degree array
    pub fn degrees(&self) -> &[u8] {
        &self.degrees
    }

    /// Raw index array, `g_max` entries per check
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }
}
