//! Gradient noise used to lay out the city preset.

use glam::Vec2;

const GRADIENT_SCALE: f32 = 123.45;
const OCTAVES: usize = 5;
/// Raw positions are divided by this before sampling.
const POSITION_SCALE: f32 = 100.0;
#[allow(clippy::approx_constant)]
const POSITION_OFFSET: Vec2 = Vec2::new(3.14, 5.01);

fn fract(x: f32) -> f32 {
    x - x.floor()
}

/// Pseudo-random unit gradient for a lattice point.
fn gradient(p: Vec2) -> Vec2 {
    let hashed = Vec2::new(
        fract(p.dot(Vec2::new(127.1, 311.7)).sin() * GRADIENT_SCALE),
        fract(p.dot(Vec2::new(269.5, 183.3)).sin() * GRADIENT_SCALE),
    );
    (hashed * 2.0 - Vec2::ONE).normalize_or_zero()
}

/// Quintic falloff `1 - 6d^5 + 15d^4 - 10d^3`.
fn falloff(d: f32) -> f32 {
    let d = d.abs();
    1.0 - d * d * d * (d * (d * 6.0 - 15.0) + 10.0)
}

fn surflet(p: Vec2, lattice: Vec2) -> f32 {
    let diff = p - lattice;
    diff.dot(gradient(lattice)) * falloff(diff.x) * falloff(diff.y)
}

/// Perlin noise roughly in `[-0.5, 0.5]`.
pub fn perlin(uv: Vec2) -> f32 {
    let cell = uv.floor();
    surflet(uv, cell)
        + surflet(uv, cell + Vec2::X)
        + surflet(uv, cell + Vec2::ONE)
        + surflet(uv, cell + Vec2::Y)
}

/// Perlin noise shifted and clamped into `[0, 1]`.
pub fn normalized_perlin(uv: Vec2) -> f32 {
    (perlin(uv) + 0.5).clamp(0.0, 1.0)
}

/// Five octaves of [`normalized_perlin`] starting at `start_frequency`,
/// halving amplitude and doubling frequency each octave. Result is in `[0, 1]`.
pub fn fbm(point: Vec2, start_frequency: f32) -> f32 {
    let mut sum = 0.0;
    let mut amplitude_sum = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = start_frequency;
    for _ in 0..OCTAVES {
        sum += normalized_perlin(point * frequency) * amplitude;
        amplitude_sum += amplitude;
        amplitude *= 0.5;
        frequency *= 2.0;
    }
    sum / amplitude_sum
}

/// [`fbm`] of a world-space ground position.
pub fn fbm_at(position: Vec2, start_frequency: f32) -> f32 {
    fbm(position / POSITION_SCALE + POSITION_OFFSET, start_frequency)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falloff_matches_polynomial() {
        assert_eq!(falloff(0.0), 1.0);
        assert!(falloff(1.0).abs() < 1e-6);
        let d: f32 = 0.3;
        let expected = 1.0 - 6.0 * d.powi(5) + 15.0 * d.powi(4) - 10.0 * d.powi(3);
        assert!((falloff(d) - expected).abs() < 1e-6);
    }

    #[test]
    fn noise_vanishes_on_lattice_points() {
        assert!(perlin(Vec2::new(3.0, -2.0)).abs() < 1e-6);
    }

    #[test]
    fn fbm_is_bounded_and_repeatable() {
        for i in 0..64 {
            let p = Vec2::new(i as f32 * 7.3 - 200.0, i as f32 * -3.1 + 50.0);
            let v = fbm_at(p, 1.0);
            assert!((0.0..=1.0).contains(&v));
            assert_eq!(v, fbm_at(p, 1.0));
        }
    }
}
