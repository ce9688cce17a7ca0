//! Synthetic sample generation: jitter plus a small in-plane rotation.

use gestura_core::{Error, NormalizedSample, Result, NUM_LANDMARKS};
use rand::Rng;
use rand_distr::StandardNormal;

/// Standard deviation of the per-coordinate Gaussian jitter.
pub const DEFAULT_NOISE_STD: f32 = 0.003;

/// Maximum rotation about the wrist, in degrees, in either direction.
pub const DEFAULT_MAX_ROTATION_DEG: f32 = 5.0;

/// Number of augmented copies generated per captured sample.
pub const DEFAULT_VARIANTS: usize = 5;

#[derive(Debug, Clone)]
pub struct Augmenter {
    noise_std: f32,
    max_rotation_deg: f32,
    variants: usize,
}

impl Augmenter {
    pub fn new(noise_std: f32, max_rotation_deg: f32, variants: usize) -> Result<Self> {
        // Zero noise would let a copy equal its source.
        if !noise_std.is_finite() || noise_std <= 0.0 {
            return Err(Error::Config(format!(
                "invalid augmentation noise: {}",
                noise_std
            )));
        }
        if !max_rotation_deg.is_finite() || max_rotation_deg < 0.0 {
            return Err(Error::Config(format!(
                "invalid augmentation rotation: {}",
                max_rotation_deg
            )));
        }
        Ok(Self {
            noise_std,
            max_rotation_deg,
            variants,
        })
    }

    /// Same jitter and rotation as the default, with a custom copy count.
    pub fn with_variants(variants: usize) -> Self {
        Self {
            variants,
            ..Self::default()
        }
    }

    pub fn variants(&self) -> usize {
        self.variants
    }

    /// Produce `variants` perturbed copies of `sample`.
    ///
    /// Each copy is jittered, rotated about the wrist in the x/y plane, and
    /// re-anchored, so it keeps the source's mode and a zero wrist.
    pub fn augment<R: Rng + ?Sized>(&self, sample: &NormalizedSample, rng: &mut R) -> Vec<NormalizedSample> {
        (0..self.variants)
            .map(|_| self.perturb(sample, rng))
            .collect()
    }

    fn perturb<R: Rng + ?Sized>(&self, sample: &NormalizedSample, rng: &mut R) -> NormalizedSample {
        // z is jittered but never rotated.
        let angle = if self.max_rotation_deg > 0.0 {
            rng.gen_range(-self.max_rotation_deg..=self.max_rotation_deg).to_radians()
        } else {
            0.0
        };
        let (sin, cos) = angle.sin_cos();

        let mut points = [[0.0f32; 3]; NUM_LANDMARKS];
        for (out, p) in points.iter_mut().zip(sample.points().iter()) {
            let x = p[0] + self.jitter(rng);
            let y = p[1] + self.jitter(rng);
            let z = p[2] + self.jitter(rng);
            *out = [x * cos - y * sin, x * sin + y * cos, z];
        }

        NormalizedSample::from_points(points, sample.mode())
    }

    fn jitter<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        let z: f32 = rng.sample(StandardNormal);
        z * self.noise_std
    }
}

impl Default for Augmenter {
    fn default() -> Self {
        Self {
            noise_std: DEFAULT_NOISE_STD,
            max_rotation_deg: DEFAULT_MAX_ROTATION_DEG,
            variants: DEFAULT_VARIANTS,
        }
    }
}
