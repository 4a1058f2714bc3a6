//! Immutable shaping tables: duty-cycle transfer curves and the noise loop.
//!
//! Tables are built on first use and shared for the life of the process.

use std::sync::OnceLock;

use pg_ir::DutyCycle;

/// Resolution of a duty-cycle transfer curve.
pub const CURVE_LEN: usize = 2048;

/// A waveshaping transfer curve over the input range `[-1, 1]`.
pub type Curve = [f32; CURVE_LEN];

/// Length of the 15-bit LFSR noise loop.
pub const NOISE_LEN: usize = (1 << 15) - 1;

static DUTY_CURVES: OnceLock<[Curve; 4]> = OnceLock::new();
static NOISE: OnceLock<Box<[f32]>> = OnceLock::new();

/// Build a curve that turns a sawtooth into a pulse with `duty` high time.
pub fn build_duty_curve(duty: f32) -> Curve {
    let mut curve = [0.0; CURVE_LEN];
    let last = (CURVE_LEN - 1) as f32;
    for (i, v) in curve.iter_mut().enumerate() {
        *v = if (i as f32) / last < duty { 1.0 } else { -1.0 };
    }
    curve
}

/// Cached transfer curve for a duty cycle.
pub fn duty_curve(duty: DutyCycle) -> &'static Curve {
    let curves = DUTY_CURVES.get_or_init(|| DutyCycle::ALL.map(|d| build_duty_curve(d.ratio())));
    &curves[duty.index()]
}

/// Map `input` in `[-1, 1]` through `curve`, interpolating between points.
pub fn shape(curve: &Curve, input: f32) -> f32 {
    let pos = (input.clamp(-1.0, 1.0) + 1.0) * 0.5 * (CURVE_LEN - 1) as f32;
    let index = pos as usize;
    if index >= CURVE_LEN - 1 {
        return curve[CURVE_LEN - 1];
    }
    let frac = pos - index as f32;
    curve[index] + (curve[index + 1] - curve[index]) * frac
}

/// Shared noise loop: one period of a 15-bit LFSR, as ±1 samples.
pub fn noise_table() -> &'static [f32] {
    NOISE.get_or_init(|| {
        let mut lfsr: u16 = 0x7fff;
        (0..NOISE_LEN)
            .map(|_| {
                let bit = (lfsr ^ (lfsr >> 1)) & 1;
                lfsr = (lfsr >> 1) | (bit << 14);
                if lfsr & 1 == 0 { 1.0 } else { -1.0 }
            })
            .collect()
    })
}
