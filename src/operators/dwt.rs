//! Multi-level periodic discrete wavelet transform
//!
//! Square (2-D) or cubic (3-D) inputs with side `2^J`. Level `j` runs from
//! `J-1` down to the coarsest level `L` and transforms the leading
//! `2^(j+1)` block along every axis; the inverse runs the levels in the
//! opposite order. Lines of one axis pass are processed in parallel.

use super::filters::LineFilter;
use super::LinearOperator;
use crate::array::{MultiAxisArray, Scalar};
use crate::config::WaveletConfig;
use crate::error::Result;
use rayon::prelude::*;
use tracing::{info, warn};

/// Wavelet operator; `adjoint` is the inverse transform
#[derive(Debug, Clone)]
pub struct Wavelet {
    filter: LineFilter,
    min_level: usize,
}

#[derive(Clone, Copy)]
enum Direction {
    Analysis,
    Synthesis,
}

impl Wavelet {
    pub fn new(config: &WaveletConfig) -> Result<Self> {
        let filter = LineFilter::from_config(config)?;
        info!("Wavelet operator: {:?} member {}, coarsest level {}", config.family, config.member, config.min_level);
        Ok(Self { filter, min_level: config.min_level })
    }

    /// Decomposition levels applied to an input of side `2^j`
    pub fn levels(&self, side: usize) -> usize {
        (side.trailing_zeros() as usize).saturating_sub(self.min_level)
    }

    /// Side length, dimensionality and number of dyadic levels of `x`
    fn geometry<T: Copy + Default>(x: &MultiAxisArray<T>) -> (usize, usize, usize) {
        let dim = x.ndims();
        assert!(dim <= 3, "wavelet transform supports up to three axes, got {}", dim);
        let side = x.dim(0);
        for axis in 1..dim {
            assert_eq!(x.dim(axis), side, "wavelet transform needs square or cubic input");
        }
        assert!(side.is_power_of_two(), "wavelet transform requires dyadic side length, got {}", side);
        (side, dim, side.trailing_zeros() as usize)
    }

    fn transform<T: Scalar>(&self, x: &MultiAxisArray<T>, direction: Direction) -> MultiAxisArray<T> {
        let mut out = x.clone();
        if self.filter.is_identity() {
            return out;
        }
        let (side, dim, levels) = Self::geometry(x);
        if self.levels(side) == 0 {
            warn!(
                "Wavelet transform of side {} has {} levels, coarsest level is {}; passing input through",
                side, levels, self.min_level
            );
            return out;
        }

        match direction {
            Direction::Analysis => {
                for j in (self.min_level..levels).rev() {
                    let block = 1 << (j + 1);
                    for axis in 0..dim {
                        self.axis_pass(&mut out, side, dim, block, axis, direction);
                    }
                }
            }
            Direction::Synthesis => {
                for j in self.min_level..levels {
                    let block = 1 << (j + 1);
                    for axis in (0..dim).rev() {
                        self.axis_pass(&mut out, side, dim, block, axis, direction);
                    }
                }
            }
        }
        out
    }

    /// One filter step along `axis` on every line of the leading `block^dim` cube
    fn axis_pass<T: Scalar>(
        &self,
        data: &mut MultiAxisArray<T>,
        side: usize,
        dim: usize,
        block: usize,
        axis: usize,
        direction: Direction,
    ) {
        let stride = side.pow(axis as u32);
        let num_lines = block.pow(dim as u32 - 1);
        let src = data.as_slice();

        // start offset of each line: the other coordinates enumerate the block
        let start_of = |line: usize| -> usize {
            let mut rem = line;
            let mut offset = 0;
            for a in 0..dim {
                if a == axis {
                    continue;
                }
                offset += (rem % block) * side.pow(a as u32);
                rem /= block;
            }
            offset
        };

        let lines: Vec<(usize, Vec<T>)> = (0..num_lines)
            .into_par_iter()
            .map(|l| {
                let start = start_of(l);
                let mut line: Vec<T> = (0..block).map(|q| src[start + q * stride]).collect();
                let mut tmp = vec![T::zero(); block];
                match direction {
                    Direction::Analysis => self.filter.analyse(&mut line, &mut tmp),
                    Direction::Synthesis => self.filter.synthesise(&mut line, &mut tmp),
                }
                (start, line)
            })
            .collect();

        let dst = data.as_mut_slice();
        for (start, line) in lines {
            for (q, v) in line.into_iter().enumerate() {
                dst[start + q * stride] = v;
            }
        }
    }
}

impl<T: Scalar> LinearOperator<T> for Wavelet {
    fn trafo(&self, x: &MultiAxisArray<T>) -> MultiAxisArray<T> {
        self.transform(x, Direction::Analysis)
    }

    fn adjoint(&self, y: &MultiAxisArray<T>) -> MultiAxisArray<T> {
        self.transform(y, Direction::Synthesis)
    }
}
