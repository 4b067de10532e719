use snafu::Snafu;

/// Errors raised while building a code description, an index structure or an
/// encoder. These are configuration problems and are fatal for the object
/// being built: no partially initialised value is ever returned.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CodeError {
    /// Geometry constants contradict each other
    #[snafu(display("inconsistent code geometry: {reason}"))]
    InvalidGeometry { reason: &'static str },

    /// A block row of the base matrix has the wrong number of columns
    #[snafu(display("block row {row} has {found} columns, expected {expected}"))]
    RaggedBaseMatrix {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// A circulant shift outside [-1, Z)
    #[snafu(display("shift {shift} at block ({row}, {col}) is outside [-1, {z})"))]
    ShiftOutOfRange {
        row: usize,
        col: usize,
        shift: i64,
        z: usize,
    },

    /// The requested maximum check degree does not fit the sign bitmap
    #[snafu(display("maximum check degree {g_max} exceeds the supported limit of {limit}"))]
    DegreeLimit { g_max: usize, limit: usize },

    /// A check node collected more edges than the configured maximum degree
    #[snafu(display("check {check} exceeds the maximum degree {g_max}"))]
    DegreeOverflow { check: usize, g_max: usize },

    /// A supplied adjacency table does not have one entry per check
    #[snafu(display("adjacency table has {found} checks, expected {expected}"))]
    AdjacencyMismatch { expected: usize, found: usize },

    /// A supplied adjacency table references a variable outside the codeword
    #[snafu(display("check {check} references variable {variable}, codeword length is {n}"))]
    VariableOutOfRange {
        check: usize,
        variable: usize,
        n: usize,
    },

    /// The parity part of the base matrix cannot be encoded by the
    /// quasi-cyclic back-substitution encoder
    #[snafu(display("unsupported encoder structure: {reason}"))]
    EncoderStructure { reason: &'static str },

    /// Text code description could not be parsed
    #[snafu(display("line {line}: {reason}"))]
    ParseCode { line: usize, reason: String },
}

/// Precondition violations reported by the encoder.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum EncodeError {
    /// Array-form input must hold only 0 and 1
    #[snafu(display("input is not binary: value {value} at position {index}"))]
    NonBinaryInput { index: usize, value: u8 },

    /// Input or output buffer has the wrong size
    #[snafu(display("buffer holds {found} elements, expected {expected}"))]
    BufferLength { expected: usize, found: usize },

    /// Packed encoding requires byte aligned circulant blocks
    #[snafu(display("packed encoding requires Z divisible by 8, Z is {z}"))]
    PackedUnaligned { z: usize },
}

/// Failures of a single decode call.
///
/// These indicate a mismatch between the buffers handed to the decoder and the
/// geometry it was built for, never a decoding failure: non-convergence is a
/// regular outcome reported through the iteration count.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DecodeError {
    /// Channel LLR vector is not N long
    #[snafu(display("channel LLR vector holds {found} values, expected {expected}"))]
    LlrLength { expected: usize, found: usize },

    /// Posterior output buffer is not N long
    #[snafu(display("posterior buffer holds {found} values, expected {expected}"))]
    OutputLength { expected: usize, found: usize },

    /// Workspace was allocated for a different code geometry
    #[snafu(display("workspace sized for N={found_n}, M={found_m}; decoder expects N={n}, M={m}"))]
    WorkspaceMismatch {
        n: usize,
        m: usize,
        found_n: usize,
        found_m: usize,
    },

    /// Worker index outside the configured worker count
    #[snafu(display("worker {worker} requested, only {workers} workers configured"))]
    UnknownWorker { worker: usize, workers: usize },

    /// The worker processing this channel panicked
    #[snafu(display("decoder worker {worker} panicked"))]
    WorkerPanicked { worker: usize },
}
