// Colour stores and manipulates a 3-channel RGB flux/radiance value.
//
// No alpha channel: this crate never writes an image (film/tonemapping is
// out of scope), so flux and radiance are plain RGB triplets throughout,
// with no per-wavelength spectral representation.

use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Sub};

#[derive(Clone, Copy, Debug)]
pub struct Colour {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Colour {
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn splat(v: f32) -> Self {
        Self::new(v, v, v)
    }

    pub fn scale(&mut self, scaling: &Self) {
        self.r *= scaling.r;
        self.g *= scaling.g;
        self.b *= scaling.b;
    }

    pub fn add(&mut self, adjust: &Self) {
        self.r += adjust.r;
        self.g += adjust.g;
        self.b += adjust.b;
    }

    /// The L-infinity (max channel) norm, used by the tracer's
    /// Russian-roulette survival ratio.
    pub fn max_channel(&self) -> f32 {
        self.r.max(self.g).max(self.b)
    }

    /// The L1 norm (`|Φ|₁`), used for the emission-budgeting share per
    /// emitter.
    pub fn l1_norm(&self) -> f32 {
        self.r.abs() + self.g.abs() + self.b.abs()
    }

    pub fn is_finite(&self) -> bool {
        self.r.is_finite() && self.g.is_finite() && self.b.is_finite()
    }

    pub fn is_non_negative(&self) -> bool {
        self.r >= 0.0 && self.g >= 0.0 && self.b >= 0.0
    }
}

impl Default for Colour {
    fn default() -> Self {
        Self::BLACK
    }
}

impl Mul<Self> for Colour {
    type Output = Self;

    fn mul(self, other: Self) -> Self::Output {
        Self::new(self.r * other.r, self.g * other.g, self.b * other.b)
    }
}

impl Add<Self> for Colour {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self::new(self.r + other.r, self.g + other.g, self.b + other.b)
    }
}

impl Sub<Self> for Colour {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        Self::new(self.r - other.r, self.g - other.g, self.b - other.b)
    }
}

impl Mul<Colour> for f32 {
    type Output = Colour;

    fn mul(self, colour: Colour) -> Self::Output {
        Colour::new(self * colour.r, self * colour.g, self * colour.b)
    }
}

impl Mul<f32> for Colour {
    type Output = Self;

    fn mul(self, scalar: f32) -> Self::Output {
        Self::new(self.r * scalar, self.g * scalar, self.b * scalar)
    }
}

impl Div<f32> for Colour {
    type Output = Self;

    fn div(self, scalar: f32) -> Self::Output {
        Self::new(self.r / scalar, self.g / scalar, self.b / scalar)
    }
}

impl AddAssign<Self> for Colour {
    fn add_assign(&mut self, other: Self) {
        self.add(&other);
    }
}

impl MulAssign<Self> for Colour {
    fn mul_assign(&mut self, other: Self) {
        self.scale(&other);
    }
}
