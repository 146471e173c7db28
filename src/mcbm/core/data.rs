//! Validated training data for the conditional mixture model.
//!
//! [`MCBMData`] pairs an input batch (`D × N`, one sample per column) with a
//! single row of binary outputs (`1 × N`). Construction checks everything
//! the gradient engine relies on, so training code can index without
//! re-validating.
use crate::mcbm::errors::{MCBMError, MCBMResult};
use ndarray::{Array2, ArrayView2};

/// Owned `(input, output)` pair.
///
/// Invariants
/// ----------
/// - `N = input.ncols() = output.ncols() > 0`.
/// - `output.nrows() == 1` and every output is exactly `0.0` or `1.0`.
/// - Every input entry is finite.
#[derive(Debug, Clone, PartialEq)]
pub struct MCBMData {
    input: Array2<f64>,
    output: Array2<f64>,
}

impl MCBMData {
    /// # Errors
    /// - `EmptyData` for zero columns.
    /// - `OutputDimMismatch`, `SampleCountMismatch`, `InvalidInput` or
    ///   `InvalidOutput` as described by [`validate_pair`].
    pub fn new(input: Array2<f64>, output: Array2<f64>) -> MCBMResult<Self> {
        validate_pair(input.view(), output.view())?;
        if input.ncols() == 0 {
            return Err(MCBMError::EmptyData);
        }
        if let Some(((row, col), &value)) = input.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(MCBMError::InvalidInput { row, col, value });
        }
        Ok(Self { input, output })
    }

    pub fn input(&self) -> ArrayView2<'_, f64> {
        self.input.view()
    }

    pub fn output(&self) -> ArrayView2<'_, f64> {
        self.output.view()
    }

    pub fn dim_in(&self) -> usize {
        self.input.nrows()
    }

    pub fn num_data(&self) -> usize {
        self.input.ncols()
    }
}

/// Structural checks shared by every entry point that takes an
/// `(input, output)` pair.
///
/// # Errors
/// - `OutputDimMismatch` unless `output` has exactly one row.
/// - `SampleCountMismatch` if the column counts differ.
/// - `InvalidOutput` for an output that is not exactly `0.0` or `1.0`.
pub fn validate_pair(input: ArrayView2<f64>, output: ArrayView2<f64>) -> MCBMResult<()> {
    if output.nrows() != 1 {
        return Err(MCBMError::OutputDimMismatch { expected: 1, found: output.nrows() });
    }
    if input.ncols() != output.ncols() {
        return Err(MCBMError::SampleCountMismatch {
            inputs: input.ncols(),
            outputs: output.ncols(),
        });
    }
    if let Some((index, &value)) =
        output.row(0).indexed_iter().find(|(_, y)| **y != 0.0 && **y != 1.0)
    {
        return Err(MCBMError::InvalidOutput { index, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn new_accepts_binary_outputs() {
        let data = MCBMData::new(array![[1.0, -1.0], [0.5, 0.0]], array![[0.0, 1.0]]).unwrap();
        assert_eq!(data.dim_in(), 2);
        assert_eq!(data.num_data(), 2);
    }

    #[test]
    // Purpose
    // -------
    // Every malformed pair is rejected before training sees it.
    //
    // Given
    // -----
    // - Non-binary output, mismatched column counts, two output rows,
    //   an empty batch and a NaN input.
    //
    // Expect
    // ------
    // - The matching error variant for each case.
    fn new_rejects_malformed_pairs() {
        assert_eq!(
            MCBMData::new(array![[1.0, 2.0]], array![[0.0, 0.5]]),
            Err(MCBMError::InvalidOutput { index: 1, value: 0.5 })
        );
        assert_eq!(
            MCBMData::new(array![[1.0, 2.0]], array![[0.0]]),
            Err(MCBMError::SampleCountMismatch { inputs: 2, outputs: 1 })
        );
        assert_eq!(
            MCBMData::new(array![[1.0]], array![[0.0], [1.0]]),
            Err(MCBMError::OutputDimMismatch { expected: 1, found: 2 })
        );
        assert_eq!(
            MCBMData::new(Array2::zeros((2, 0)), Array2::zeros((1, 0))),
            Err(MCBMError::EmptyData)
        );
        assert!(matches!(
            MCBMData::new(array![[f64::NAN]], array![[1.0]]),
            Err(MCBMError::InvalidInput { row: 0, col: 0, .. })
        ));
    }
}
