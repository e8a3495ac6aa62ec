//! Numeric config parameters resolved per instance.

use std::ops::{Add, Mul};

use rand::distributions::uniform::SampleUniform;
use serde::{Deserialize, Serialize};

use csim_core::SimulationContext;

/// Parameter of a host or VM group.
///
/// A fixed value is shared by all instances, a range is sampled once per instance from the simulation random
/// generator, and a linear progression gives instance `i` the value `start + i * step`.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(untagged)]
pub enum NumericParam<T> {
    Value(T),
    Uniform { min: T, max: T },
    Linear { start: T, step: T },
}

impl<T> NumericParam<T>
where
    T: Copy + PartialOrd + SampleUniform + From<u32> + Add<Output = T> + Mul<Output = T>,
{
    /// Returns the value for the instance with the given index within its group.
    pub fn resolve(&self, index: u32, ctx: &SimulationContext) -> T {
        match *self {
            NumericParam::Value(value) => value,
            NumericParam::Uniform { min, max } => {
                if min < max {
                    ctx.gen_range(min..=max)
                } else {
                    min
                }
            }
            NumericParam::Linear { start, step } => start + T::from(index) * step,
        }
    }

    /// Returns the smallest value that any of `count` instances can get.
    pub fn min_value(&self, count: u32) -> T {
        match *self {
            NumericParam::Value(value) => value,
            NumericParam::Uniform { min, .. } => min,
            NumericParam::Linear { start, step } => {
                let last = start + T::from(count.saturating_sub(1)) * step;
                if last < start {
                    last
                } else {
                    start
                }
            }
        }
    }
}

impl<T> From<T> for NumericParam<T> {
    fn from(value: T) -> Self {
        NumericParam::Value(value)
    }
}
