use std::ops::{Add, Mul};

use super::FloatType;

/// Position inside a triangle `(a, b, c)`, expressed as weights of `b` (`u`) and `c` (`v`).
/// The weight of `a` is implied as `1 - u - v`.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct BarycentricCoordinates {
    pub u: FloatType,
    pub v: FloatType,
}

impl BarycentricCoordinates {
    pub fn new(u: FloatType, v: FloatType) -> Self {
        BarycentricCoordinates { u, v }
    }

    /// Weight of the first vertex
    pub fn w(&self) -> FloatType {
        1.0 - self.u - self.v
    }

    /// All three weights, in vertex order.
    pub fn weights(&self) -> [FloatType; 3] {
        [self.w(), self.u, self.v]
    }

    pub fn interpolate<T>(&self, a: T, b: T, c: T) -> T
    where
        T: Mul<FloatType, Output = T> + Add<Output = T>,
    {
        a * self.w() + b * self.u + c * self.v
    }
}
