//! Quasi-cyclic code description
//!
//! A QC-LDPC code is fully described by its lifting size Z and a block model
//! matrix of circulant shifts. Every encoder and decoder sharing a code must
//! be built from the same [`QcCode`]; it is immutable once constructed and
//! is passed around by reference.
//!
//! The text form understood by [`QcCode::from_str`] is:
//!
//! ```text
//! # comment
//! z 8
//! g_max 5          (optional, defaults to the largest row weight)
//! 1  5 -1  2  0 -1
//! 3 -1  7  6  0  0
//! -1 4  0  2 -1  0
//! ```

use std::fmt;
use std::str::FromStr;

use snafu::ensure;

use super::error::*;
use super::sign_map::SignMap;

/// Geometry constants of a QC-LDPC code
///
/// `n = nb * z`, `m = mb * z` and `k = n - m` are derived, so the constants
/// cannot disagree with each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CodeGeometry {
    z: usize,
    mb: usize,
    nb: usize,
    g_max: usize,
}

impl CodeGeometry {
    /// Validate and build a geometry
    ///
    /// # Arguments
    /// * `z` - Lifting size (circulant block size)
    /// * `mb` - Number of block rows
    /// * `nb` - Number of block columns
    /// * `g_max` - Maximum check node degree
    pub fn new(z: usize, mb: usize, nb: usize, g_max: usize) -> Result<Self, CodeError> {
        ensure!(z > 0, InvalidGeometrySnafu { reason: "lifting size Z must be positive" });
        ensure!(mb > 0, InvalidGeometrySnafu { reason: "at least one block row is required" });
        ensure!(nb > mb, InvalidGeometrySnafu { reason: "block columns must outnumber block rows" });
        ensure!(g_max > 0, InvalidGeometrySnafu { reason: "maximum check degree must be positive" });
        ensure!(
            nb.checked_mul(z).map_or(false, |n| n <= u32::MAX as usize),
            InvalidGeometrySnafu { reason: "codeword length does not fit 32-bit indices" }
        );
        ensure!(
            g_max <= SignMap::WIDTH,
            DegreeLimitSnafu { g_max, limit: SignMap::WIDTH }
        );

        Ok(Self { z, mb, nb, g_max })
    }

    /// Lifting size Z
    pub fn z(&self) -> usize {
        self.z
    }

    /// Number of block rows (tiers of the layered schedule)
    pub fn mb(&self) -> usize {
        self.mb
    }

    /// Number of block columns
    pub fn nb(&self) -> usize {
        self.nb
    }

    /// Number of information block columns
    pub fn kb(&self) -> usize {
        self.nb - self.mb
    }

    /// Maximum check node degree
    pub fn g_max(&self) -> usize {
        self.g_max
    }

    /// Codeword length N
    pub fn n(&self) -> usize {
        self.nb * self.z
    }

    /// Number of parity checks M
    pub fn m(&self) -> usize {
        self.mb * self.z
    }

    /// Information length K
    pub fn k(&self) -> usize {
        self.n() - self.m()
    }
}

/// Block model matrix
///
/// Entries are `None` for a zero block and `Some(s)` for the identity matrix
/// cyclically shifted by `s`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BaseMatrix {
    rows: usize,
    cols: usize,
    entries: Vec<Option<u16>>,
}

impl BaseMatrix {
    /// Build from rows of raw shifts where `-1` marks a zero block
    pub fn from_shifts<R: AsRef<[i32]>>(z: usize, rows: &[R]) -> Result<Self, CodeError> {
        ensure!(!rows.is_empty(), InvalidGeometrySnafu { reason: "base matrix has no rows" });
        let cols = rows[0].as_ref().len();
        ensure!(cols > 0, InvalidGeometrySnafu { reason: "base matrix has no columns" });

        let mut entries = Vec::with_capacity(rows.len() * cols);
        for (r, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            ensure!(
                row.len() == cols,
                RaggedBaseMatrixSnafu { row: r, expected: cols, found: row.len() }
            );
            for (c, &shift) in row.iter().enumerate() {
                let entry = match shift {
                    -1 => None,
                    s if s >= 0 && (s as usize) < z && s <= u16::MAX as i32 => Some(s as u16),
                    s => {
                        return ShiftOutOfRangeSnafu { row: r, col: c, shift: s, z }.fail();
                    }
                };
                entries.push(entry);
            }
        }

        Ok(Self { rows: rows.len(), cols, entries })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Shift of block (row, col), `None` for a zero block
    pub fn shift(&self, row: usize, col: usize) -> Option<usize> {
        self.entries[row * self.cols + col].map(usize::from)
    }

    /// Number of non-zero blocks in a block row
    pub fn row_weight(&self, row: usize) -> usize {
        self.entries[row * self.cols..(row + 1) * self.cols]
            .iter()
            .filter(|e| e.is_some())
            .count()
    }

    /// Raw `-1`-sentinel form of a block row
    pub fn raw_row(&self, row: usize) -> Vec<i32> {
        self.entries[row * self.cols..(row + 1) * self.cols]
            .iter()
            .map(|e| e.map_or(-1, i32::from))
            .collect()
    }
}

/// Complete description of a QC-LDPC code: geometry plus block model matrix
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QcCode {
    geometry: CodeGeometry,
    base: BaseMatrix,
}

impl QcCode {
    /// Build a code whose maximum check degree is the largest block row weight
    pub fn new<R: AsRef<[i32]>>(z: usize, rows: &[R]) -> Result<Self, CodeError> {
        let base = BaseMatrix::from_shifts(z, rows)?;
        let g_max = (0..base.rows()).map(|r| base.row_weight(r)).max().unwrap_or(0).max(1);
        let geometry = CodeGeometry::new(z, base.rows(), base.cols(), g_max)?;
        Ok(Self { geometry, base })
    }

    /// Build a code with an explicit maximum check degree
    ///
    /// The index builder rejects the code if any check ends up with more
    /// than `g_max` edges.
    pub fn with_max_degree<R: AsRef<[i32]>>(
        z: usize,
        rows: &[R],
        g_max: usize,
    ) -> Result<Self, CodeError> {
        let base = BaseMatrix::from_shifts(z, rows)?;
        let geometry = CodeGeometry::new(z, base.rows(), base.cols(), g_max)?;
        Ok(Self { geometry, base })
    }

    pub fn geometry(&self) -> &CodeGeometry {
        &self.geometry
    }

    pub fn base(&self) -> &BaseMatrix {
        &self.base
    }

    /// Code rate K/N
    pub fn rate(&self) -> f64 {
        self.geometry.k() as f64 / self.geometry.n() as f64
    }
}

impl FromStr for QcCode {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut z = None;
        let mut g_max = None;
        let mut rows: Vec<Vec<i32>> = Vec::new();

        for (idx, raw) in s.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }

            let mut fields = line.split_whitespace();
            let head = fields.next().unwrap_or("");
            match head {
                "z" | "g_max" => {
                    let value = fields
                        .next()
                        .and_then(|v| v.parse::<usize>().ok())
                        .ok_or_else(|| CodeError::ParseCode {
                            line: line_no,
                            reason: format!("`{}` needs a non-negative integer", head),
                        })?;
                    if head == "z" {
                        z = Some(value);
                    } else {
                        g_max = Some(value);
                    }
                }
                _ => {
                    let row = line
                        .split_whitespace()
                        .map(|tok| tok.parse::<i32>())
                        .collect::<Result<Vec<_>, _>>()
                        .map_err(|e| CodeError::ParseCode {
                            line: line_no,
                            reason: format!("invalid shift value: {}", e),
                        })?;
                    rows.push(row);
                }
            }
        }

        let z = z.ok_or_else(|| CodeError::ParseCode {
            line: 0,
            reason: "missing `z` line".to_string(),
        })?;

        match g_max {
            Some(g) => QcCode::with_max_degree(z, &rows, g),
            None => QcCode::new(z, &rows),
        }
    }
}

impl fmt::Display for QcCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "z {}", self.geometry.z())?;
        writeln!(f, "g_max {}", self.geometry.g_max())?;
        for r in 0..self.base.rows() {
            let row: Vec<String> = self.base.raw_row(r).iter().map(|s| s.to_string()).collect();
            writeln!(f, "{}", row.join(" "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_derived_sizes() {
        let g = CodeGeometry::new(27, 12, 24, 8).unwrap();
        assert_eq!(g.n(), 648);
        assert_eq!(g.m(), 324);
        assert_eq!(g.k(), 324);
        assert_eq!(g.kb(), 12);
    }

    #[test]
    fn test_geometry_rejects_inconsistent_constants() {
        assert!(CodeGeometry::new(0, 2, 4, 4).is_err());
        assert!(CodeGeometry::new(2, 0, 4, 4).is_err());
        assert!(CodeGeometry::new(2, 4, 4, 4).is_err());
        assert!(matches!(
            CodeGeometry::new(2, 2, 4, 65),
            Err(CodeError::DegreeLimit { g_max: 65, limit: 64 })
        ));
    }

    #[test]
    fn test_base_matrix_sentinels() {
        let base = BaseMatrix::from_shifts(2, &[[0, -1, 1, 0], [1, 0, -1, 0]]).unwrap();
        assert_eq!(base.shift(0, 0), Some(0));
        assert_eq!(base.shift(0, 1), None);
        assert_eq!(base.shift(1, 0), Some(1));
        assert_eq!(base.row_weight(0), 3);
        assert_eq!(base.raw_row(1), vec![1, 0, -1, 0]);
    }

    #[test]
    fn test_shift_out_of_range() {
        let err = BaseMatrix::from_shifts(2, &[[0, 2]]).unwrap_err();
        assert_eq!(err, CodeError::ShiftOutOfRange { row: 0, col: 1, shift: 2, z: 2 });

        let err = BaseMatrix::from_shifts(4, &[[-2, 0]]).unwrap_err();
        assert!(matches!(err, CodeError::ShiftOutOfRange { shift: -2, .. }));
    }

    #[test]
    fn test_ragged_rows() {
        let rows: Vec<Vec<i32>> = vec![vec![0, 1, -1], vec![0, 1]];
        let err = BaseMatrix::from_shifts(2, &rows).unwrap_err();
        assert_eq!(err, CodeError::RaggedBaseMatrix { row: 1, expected: 3, found: 2 });
    }

    #[test]
    fn test_text_round_trip() {
        let text = "# small code\nz 2\n0 -1 1 0\n1 0 -1 0\n";
        let code: QcCode = text.parse().unwrap();
        assert_eq!(code.geometry().n(), 8);
        assert_eq!(code.geometry().g_max(), 3);

        let reparsed: QcCode = code.to_string().parse().unwrap();
        assert_eq!(reparsed, code);
    }

    #[test]
    fn test_text_explicit_g_max() {
        let code: QcCode = "z 2\ng_max 4\n0 -1 1 0\n1 0 -1 0".parse().unwrap();
        assert_eq!(code.geometry().g_max(), 4);
    }

    #[test]
    fn test_text_errors() {
        assert!(matches!(
            "0 1\n1 0".parse::<QcCode>(),
            Err(CodeError::ParseCode { line: 0, .. })
        ));
        assert!(matches!(
            "z 2\n0 x".parse::<QcCode>(),
            Err(CodeError::ParseCode { line: 2, .. })
        ));
        assert!(matches!(
            "z two".parse::<QcCode>(),
            Err(CodeError::ParseCode { line: 1, .. })
        ));
    }
}
