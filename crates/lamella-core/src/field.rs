//! Electromagnetic field values at a point.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// The six field components at a single point.
///
/// Component 1 is transverse (along the layer normal, the x axis),
/// component 2 is the in-plane transverse direction, and z is the
/// propagation axis. For TE modes only E2, H1 and Hz are non-zero;
/// for TM modes only H2, E1 and Ez.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Field {
    pub e1: Complex64,
    pub e2: Complex64,
    pub ez: Complex64,
    pub h1: Complex64,
    pub h2: Complex64,
    pub hz: Complex64,
}

impl Field {
    /// Magnitude of the electric field vector.
    pub fn abs_e(&self) -> f64 {
        (self.e1.norm_sqr() + self.e2.norm_sqr() + self.ez.norm_sqr()).sqrt()
    }

    /// Magnitude of the magnetic field vector.
    pub fn abs_h(&self) -> f64 {
        (self.h1.norm_sqr() + self.h2.norm_sqr() + self.hz.norm_sqr()).sqrt()
    }

    /// Time-averaged Poynting vector, transverse component 1.
    pub fn s1(&self) -> f64 {
        0.5 * (self.e2 * self.hz.conj() - self.ez * self.h2.conj()).re
    }

    /// Time-averaged Poynting vector, transverse component 2.
    pub fn s2(&self) -> f64 {
        0.5 * (self.ez * self.h1.conj() - self.e1 * self.hz.conj()).re
    }

    /// Time-averaged Poynting vector along the propagation axis.
    pub fn sz(&self) -> f64 {
        0.5 * (self.e1 * self.h2.conj() - self.e2 * self.h1.conj()).re
    }
}

impl std::ops::Add for Field {
    type Output = Field;

    fn add(self, rhs: Field) -> Field {
        Field {
            e1: self.e1 + rhs.e1,
            e2: self.e2 + rhs.e2,
            ez: self.ez + rhs.ez,
            h1: self.h1 + rhs.h1,
            h2: self.h2 + rhs.h2,
            hz: self.hz + rhs.hz,
        }
    }
}

impl std::ops::Mul<Field> for Complex64 {
    type Output = Field;

    fn mul(self, rhs: Field) -> Field {
        Field {
            e1: self * rhs.e1,
            e2: self * rhs.e2,
            ez: self * rhs.ez,
            h1: self * rhs.h1,
            h2: self * rhs.h2,
            hz: self * rhs.hz,
        }
    }
}
