//! Flattened-parameter layout of the conditional mixture model.
//!
//! The optimizer sees a single contiguous vector holding exactly the
//! trainable parameter groups, concatenated in the fixed order of
//! [`ParamGroup::ALL`]. Each group is stored in the logical row-major order
//! of its array. Frozen groups are not part of the vector; the forward pass
//! reads them from the model instead.
//!
//! [`ParamLayout`] is the one description of that contract. It records a
//! [`GroupSource`] per group and is consumed by packing
//! ([`ParamLayout::pack`]), unpacking (`MCBM::set_parameters`), binding the
//! forward-pass parameters ([`ParamLayout::bind`]) and scattering gradients
//! ([`ParamLayout::buffer_slice_mut`]).
use crate::mcbm::{
    core::options::MCBMParams,
    errors::{MCBMError, MCBMResult},
    models::mcbm::MCBM,
};
use ndarray::{ArrayView1, ArrayView2, ArrayViewMut2, Axis};
use std::ops::Range;

/// The six named parameter arrays, in layout order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamGroup {
    /// `K`
    Priors,
    /// `K × F`
    Weights,
    /// `D × F`
    Features,
    /// `K × D`
    Predictors,
    /// `D × K`
    InputBias,
    /// `K`
    OutputBias,
}

impl ParamGroup {
    pub const ALL: [ParamGroup; 6] = [
        ParamGroup::Priors,
        ParamGroup::Weights,
        ParamGroup::Features,
        ParamGroup::Predictors,
        ParamGroup::InputBias,
        ParamGroup::OutputBias,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ParamGroup::Priors => "priors",
            ParamGroup::Weights => "weights",
            ParamGroup::Features => "features",
            ParamGroup::Predictors => "predictors",
            ParamGroup::InputBias => "input_bias",
            ParamGroup::OutputBias => "output_bias",
        }
    }
}

/// Model dimensions: inputs `D`, experts `K`, features `F`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MCBMDims {
    pub dim_in: usize,
    pub num_components: usize,
    pub num_features: usize,
}

impl MCBMDims {
    /// `(rows, cols)` of `group`; vectors are reported as `(len, 1)`.
    pub fn shape(&self, group: ParamGroup) -> (usize, usize) {
        let (d, k, f) = (self.dim_in, self.num_components, self.num_features);
        match group {
            ParamGroup::Priors | ParamGroup::OutputBias => (k, 1),
            ParamGroup::Weights => (k, f),
            ParamGroup::Features => (d, f),
            ParamGroup::Predictors => (k, d),
            ParamGroup::InputBias => (d, k),
        }
    }

    pub fn size(&self, group: ParamGroup) -> usize {
        let (rows, cols) = self.shape(group);
        rows * cols
    }
}

/// Where the forward pass reads a group from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupSource {
    /// Frozen: use the array stored in the model.
    Live,
    /// Trainable: `size` values starting at `offset` in the flat vector.
    Buffer { offset: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamLayout {
    dims: MCBMDims,
    sources: [GroupSource; 6],
    len: usize,
}

/// Forward-pass parameters, each borrowed from either the model or the
/// flat vector.
#[derive(Debug, Clone)]
pub struct ParamViews<'a> {
    pub priors: ArrayView1<'a, f64>,
    pub weights: ArrayView2<'a, f64>,
    pub features: ArrayView2<'a, f64>,
    pub predictors: ArrayView2<'a, f64>,
    pub input_bias: ArrayView2<'a, f64>,
    pub output_bias: ArrayView1<'a, f64>,
}

impl ParamLayout {
    pub fn new(dims: MCBMDims, params: &MCBMParams) -> Self {
        let mut sources = [GroupSource::Live; 6];
        let mut offset = 0;
        for (slot, group) in sources.iter_mut().zip(ParamGroup::ALL) {
            if params.is_trainable(group) {
                *slot = GroupSource::Buffer { offset };
                offset += dims.size(group);
            }
        }
        Self { dims, sources, len: offset }
    }

    /// Layout with every group read from the model.
    pub fn frozen(dims: MCBMDims) -> Self {
        Self { dims, sources: [GroupSource::Live; 6], len: 0 }
    }

    /// Length of the flat parameter vector.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn dims(&self) -> MCBMDims {
        self.dims
    }

    pub fn source(&self, group: ParamGroup) -> GroupSource {
        self.sources[group as usize]
    }

    /// Range of `group` inside the flat vector, `None` when frozen.
    pub fn buffer_range(&self, group: ParamGroup) -> Option<Range<usize>> {
        match self.source(group) {
            GroupSource::Live => None,
            GroupSource::Buffer { offset } => Some(offset..offset + self.dims.size(group)),
        }
    }

    /// Check that a flat parameter vector matches this layout.
    pub fn check_params(&self, x: &[f64]) -> MCBMResult<()> {
        if x.len() != self.len {
            return Err(MCBMError::ParameterLengthMismatch { expected: self.len, found: x.len() });
        }
        Ok(())
    }

    /// Check that a gradient buffer matches this layout.
    pub fn check_grad(&self, g: &[f64]) -> MCBMResult<()> {
        if g.len() != self.len {
            return Err(MCBMError::GradientLengthMismatch { expected: self.len, found: g.len() });
        }
        Ok(())
    }

    /// Trainable groups are viewed from `x`, frozen ones from `model`.
    ///
    /// # Errors
    /// - `ParameterLengthMismatch` if `x.len() != self.len()`.
    pub fn bind<'a>(&self, model: &'a MCBM, x: &'a [f64]) -> MCBMResult<ParamViews<'a>> {
        self.check_params(x)?;
        Ok(ParamViews {
            priors: self.bind_vector(ParamGroup::Priors, model, x)?,
            weights: self.bind_matrix(ParamGroup::Weights, model, x)?,
            features: self.bind_matrix(ParamGroup::Features, model, x)?,
            predictors: self.bind_matrix(ParamGroup::Predictors, model, x)?,
            input_bias: self.bind_matrix(ParamGroup::InputBias, model, x)?,
            output_bias: self.bind_vector(ParamGroup::OutputBias, model, x)?,
        })
    }

    /// Copy the model's trainable groups into a fresh flat vector.
    pub fn pack(&self, model: &MCBM) -> Vec<f64> {
        let mut x = vec![0.0; self.len];
        for group in ParamGroup::ALL {
            if let Some(range) = self.buffer_range(group) {
                let live = live_view(model, group);
                x[range].iter_mut().zip(live.iter()).for_each(|(dst, &src)| *dst = src);
            }
        }
        x
    }

    /// Mutable `(rows, cols)` view of `group` inside a gradient buffer,
    /// `None` when the group is frozen.
    pub fn buffer_slice_mut<'g>(
        &self, g: &'g mut [f64], group: ParamGroup,
    ) -> MCBMResult<Option<ArrayViewMut2<'g, f64>>> {
        self.check_grad(g)?;
        match self.buffer_range(group) {
            None => Ok(None),
            Some(range) => Ok(Some(ArrayViewMut2::from_shape(self.dims.shape(group), &mut g[range])?)),
        }
    }

    /// `(rows, cols)` view of `group` inside a parameter vector, `None` when
    /// the group is frozen.
    pub fn buffer_view<'x>(
        &self, x: &'x [f64], group: ParamGroup,
    ) -> MCBMResult<Option<ArrayView2<'x, f64>>> {
        self.check_params(x)?;
        match self.buffer_range(group) {
            None => Ok(None),
            Some(range) => Ok(Some(ArrayView2::from_shape(self.dims.shape(group), &x[range])?)),
        }
    }

    fn bind_vector<'a>(
        &self, group: ParamGroup, model: &'a MCBM, x: &'a [f64],
    ) -> MCBMResult<ArrayView1<'a, f64>> {
        Ok(match self.buffer_range(group) {
            Some(range) => ArrayView1::from(&x[range]),
            None => live_view(model, group).index_axis_move(Axis(1), 0),
        })
    }

    fn bind_matrix<'a>(
        &self, group: ParamGroup, model: &'a MCBM, x: &'a [f64],
    ) -> MCBMResult<ArrayView2<'a, f64>> {
        Ok(match self.buffer_range(group) {
            Some(range) => ArrayView2::from_shape(self.dims.shape(group), &x[range])?,
            None => live_view(model, group),
        })
    }
}

/// `group` as stored in the model, vectors as `(len, 1)` columns.
fn live_view(model: &MCBM, group: ParamGroup) -> ArrayView2<'_, f64> {
    match group {
        ParamGroup::Priors => model.priors().view().insert_axis(Axis(1)),
        ParamGroup::Weights => model.weights().view(),
        ParamGroup::Features => model.features().view(),
        ParamGroup::Predictors => model.predictors().view(),
        ParamGroup::InputBias => model.input_bias().view(),
        ParamGroup::OutputBias => model.output_bias().view().insert_axis(Axis(1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    fn dims() -> MCBMDims {
        MCBMDims { dim_in: 3, num_components: 2, num_features: 4 }
    }

    #[test]
    // Purpose
    // -------
    // Offsets follow the fixed group order and skip frozen groups.
    //
    // Given
    // -----
    // - D=3, K=2, F=4 with priors, features and output biases trainable.
    //
    // Expect
    // ------
    // - priors at 0..2, features at 2..14, output biases at 14..16; the rest
    //   live; total length 16.
    fn offsets_skip_frozen_groups() {
        // Arrange
        let params = MCBMParams {
            train_priors: true,
            train_features: true,
            train_output_bias: true,
            ..MCBMParams::frozen()
        };

        // Act
        let layout = ParamLayout::new(dims(), &params);

        // Assert
        assert_eq!(layout.len(), 16);
        assert_eq!(layout.buffer_range(ParamGroup::Priors), Some(0..2));
        assert_eq!(layout.buffer_range(ParamGroup::Features), Some(2..14));
        assert_eq!(layout.buffer_range(ParamGroup::OutputBias), Some(14..16));
        assert_eq!(layout.source(ParamGroup::Weights), GroupSource::Live);
        assert_eq!(layout.source(ParamGroup::InputBias), GroupSource::Live);
    }

    #[test]
    fn full_layout_counts_every_parameter() {
        let layout = ParamLayout::new(dims(), &MCBMParams::default());
        // K + K·F + D·F + K·D + D·K + K
        assert_eq!(layout.len(), 2 + 8 + 12 + 6 + 6 + 2);
        assert!(ParamLayout::frozen(dims()).is_empty());
    }

    #[test]
    // Purpose
    // -------
    // Binding reads trainable groups from the buffer and frozen groups from
    // the model.
    //
    // Given
    // -----
    // - Only weights trainable, and a buffer counting 0..K·F.
    //
    // Expect
    // ------
    // - The bound weights are the buffer in row-major order; the bound
    //   features are the model's.
    fn bind_mixes_buffer_and_live_views() {
        // Arrange
        let mut rng = StdRng::seed_from_u64(0);
        let model = MCBM::new(3, 2, Some(4), &mut rng).unwrap();
        let params = MCBMParams { train_weights: true, ..MCBMParams::frozen() };
        let layout = ParamLayout::new(model.dims(), &params);
        let x: Vec<f64> = (0..8).map(f64::from).collect();

        // Act
        let views = layout.bind(&model, &x).unwrap();

        // Assert
        assert_eq!(views.weights[[0, 0]], 0.0);
        assert_eq!(views.weights[[0, 3]], 3.0);
        assert_eq!(views.weights[[1, 0]], 4.0);
        assert_eq!(views.features, model.features().view());
        assert_eq!(views.priors, model.priors().view());
    }

    #[test]
    fn bind_and_buffers_reject_wrong_lengths() {
        let mut rng = StdRng::seed_from_u64(0);
        let model = MCBM::new(3, 2, Some(4), &mut rng).unwrap();
        let layout = ParamLayout::new(model.dims(), &MCBMParams::default());
        assert!(matches!(
            layout.bind(&model, &[0.0; 3]),
            Err(MCBMError::ParameterLengthMismatch { expected: 36, found: 3 })
        ));
        let mut g = vec![0.0; 5];
        assert!(matches!(
            layout.buffer_slice_mut(&mut g, ParamGroup::Priors),
            Err(MCBMError::GradientLengthMismatch { expected: 36, found: 5 })
        ));
    }

    #[test]
    fn pack_follows_row_major_order() {
        let mut rng = StdRng::seed_from_u64(4);
        let model = MCBM::new(3, 2, Some(4), &mut rng).unwrap();
        let params = MCBMParams { train_predictors: true, ..MCBMParams::frozen() };
        let layout = ParamLayout::new(model.dims(), &params);
        let x = layout.pack(&model);
        assert_eq!(x.len(), 6);
        assert_eq!(x[1], model.predictors()[[0, 1]]);
        assert_eq!(x[3], model.predictors()[[1, 0]]);
    }
}
