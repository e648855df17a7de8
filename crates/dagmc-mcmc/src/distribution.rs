use std::f64::consts::{PI, SQRT_2};

use dagmc_core::{ErrorInfo, McmcError, RngHandle};
use rand::Rng;
use rand_distr::StandardNormal;

/// Univariate distribution used as a proposal kernel or prior.
pub trait Distribution {
    /// Draws one value.
    fn sample_value(&self, rng: &mut RngHandle) -> f64;

    /// Probability density at `x`.
    fn pdf(&self, x: f64) -> f64;

    /// Cumulative probability at `x`.
    fn cdf(&self, x: f64) -> f64;
}

/// Normal distribution `N(mean, stdev^2)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalDistribution {
    mean: f64,
    stdev: f64,
}

impl NormalDistribution {
    /// Creates a normal distribution; `stdev` must be positive and finite.
    pub fn new(mean: f64, stdev: f64) -> Result<Self, McmcError> {
        if !mean.is_finite() || !(stdev > 0.0 && stdev.is_finite()) {
            return Err(McmcError::Evaluation(
                ErrorInfo::new("normal-parameters", "normal distribution needs finite mean and positive stdev")
                    .with_context("mean", mean.to_string())
                    .with_context("stdev", stdev.to_string()),
            ));
        }
        Ok(Self { mean, stdev })
    }

    /// The standard normal `N(0, 1)`.
    pub fn standard() -> Self {
        Self {
            mean: 0.0,
            stdev: 1.0,
        }
    }

    /// Mean.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Standard deviation.
    pub fn stdev(&self) -> f64 {
        self.stdev
    }

    /// Quantile function.
    pub fn quantile(&self, p: f64) -> f64 {
        self.mean + self.stdev * standard_normal_quantile(p)
    }
}

impl Distribution for NormalDistribution {
    fn sample_value(&self, rng: &mut RngHandle) -> f64 {
        let z: f64 = rng.sample(StandardNormal);
        self.mean + self.stdev * z
    }

    fn pdf(&self, x: f64) -> f64 {
        let z = (x - self.mean) / self.stdev;
        (-0.5 * z * z).exp() / (self.stdev * (2.0 * PI).sqrt())
    }

    fn cdf(&self, x: f64) -> f64 {
        if x == f64::INFINITY {
            return 1.0;
        }
        if x == f64::NEG_INFINITY {
            return 0.0;
        }
        0.5 * erfc(-(x - self.mean) / (self.stdev * SQRT_2))
    }
}

/// Complementary error function, fractional error below 1.2e-7.
fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = -z * z - 1.265_512_23
        + t * (1.000_023_68
            + t * (0.374_091_96
                + t * (0.096_784_18
                    + t * (-0.186_288_06
                        + t * (0.278_868_07
                            + t * (-1.135_203_98
                                + t * (1.488_515_87 + t * (-0.822_152_23 + t * 0.170_872_77))))))));
    let ans = t * poly.exp();
    if x >= 0.0 {
        ans
    } else {
        2.0 - ans
    }
}

/// Inverse of the standard normal CDF, relative error below 1.2e-9.
///
/// Returns `-inf` for `p <= 0`, `+inf` for `p >= 1` and NaN for NaN.
pub fn standard_normal_quantile(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969_683_028_665_376e1,
        2.209_460_984_245_205e2,
        -2.759_285_104_469_687e2,
        1.383_577_518_672_69e2,
        -3.066_479_806_614_716e1,
        2.506_628_277_459_239,
    ];
    const B: [f64; 5] = [
        -5.447_609_879_822_406e1,
        1.615_858_368_580_409e2,
        -1.556_989_798_598_866e2,
        6.680_131_188_771_972e1,
        -1.328_068_155_288_572e1,
    ];
    const C: [f64; 6] = [
        -7.784_894_002_430_293e-3,
        -3.223_964_580_411_365e-1,
        -2.400_758_277_161_838,
        -2.549_732_539_343_734,
        4.374_664_141_464_968,
        2.938_163_982_698_783,
    ];
    const D: [f64; 4] = [
        7.784_695_709_041_462e-3,
        3.224_671_290_700_398e-1,
        2.445_134_137_142_996,
        3.754_408_661_907_416,
    ];
    const P_LOW: f64 = 0.02425;

    if p.is_nan() {
        return f64::NAN;
    }
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }
    let tail = |q: f64| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };
    if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p > 1.0 - P_LOW {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    } else {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    }
}
