//! Piecewise-constant control schedules and their initial shapes.

use std::fmt::Write as _;
use std::path::Path;

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{GrapeError, GrapeResult};

/// Amplitudes over a `(timeslots × controls)` grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PulseSchedule {
    amps: Array2<f64>,
}

impl PulseSchedule {
    /// All-zero schedule.
    pub fn zeros(num_slots: usize, num_controls: usize) -> Self {
        Self {
            amps: Array2::zeros((num_slots, num_controls)),
        }
    }

    /// Wrap an amplitude table (rows are slots).
    pub fn from_array(amps: Array2<f64>) -> Self {
        Self { amps }
    }

    /// Rebuild from a row-major flat vector.
    pub fn from_flat(num_slots: usize, num_controls: usize, flat: Vec<f64>) -> GrapeResult<Self> {
        let got = flat.len();
        let amps = Array2::from_shape_vec((num_slots, num_controls), flat).map_err(|_| {
            GrapeError::ScheduleMismatch {
                slots: num_slots,
                controls: num_controls,
                got_slots: got,
                got_controls: 1,
            }
        })?;
        Ok(Self { amps })
    }

    /// The amplitude table.
    pub fn amps(&self) -> &Array2<f64> {
        &self.amps
    }

    /// Amplitude of `control` during `slot`.
    pub fn get(&self, slot: usize, control: usize) -> f64 {
        self.amps[[slot, control]]
    }

    /// Number of time slots.
    pub fn num_slots(&self) -> usize {
        self.amps.nrows()
    }

    /// Number of controls.
    pub fn num_controls(&self) -> usize {
        self.amps.ncols()
    }

    /// Row-major copy, slot by slot.
    pub fn to_flat(&self) -> Vec<f64> {
        self.amps.iter().copied().collect()
    }

    /// Whether every amplitude is finite.
    pub fn is_finite(&self) -> bool {
        self.amps.iter().all(|a| a.is_finite())
    }

    /// Tab-separated text, one line per slot.
    pub fn to_tsv(&self) -> String {
        let mut out = String::new();
        for row in self.amps.rows() {
            let line = row
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\t");
            let _ = writeln!(out, "{line}");
        }
        out
    }

    /// Write [`to_tsv`](Self::to_tsv) to `path`.
    pub fn write_tsv(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        std::fs::write(path, self.to_tsv())
    }
}

/// Optional box constraints shared by every amplitude.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Lower bound, if any.
    #[serde(default)]
    pub lower: Option<f64>,
    /// Upper bound, if any.
    #[serde(default)]
    pub upper: Option<f64>,
}

impl Bounds {
    /// No constraints.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Both bounds set.
    pub fn new(lower: f64, upper: f64) -> Self {
        Self {
            lower: Some(lower),
            upper: Some(upper),
        }
    }

    /// Lower bound or −∞.
    pub fn lower_or_inf(&self) -> f64 {
        self.lower.unwrap_or(f64::NEG_INFINITY)
    }

    /// Upper bound or +∞.
    pub fn upper_or_inf(&self) -> f64 {
        self.upper.unwrap_or(f64::INFINITY)
    }

    /// Clamp one amplitude into the box.
    pub fn project(&self, value: f64) -> f64 {
        value.max(self.lower_or_inf()).min(self.upper_or_inf())
    }

    /// Reject empty or non-finite boxes.
    pub fn validate(&self) -> GrapeResult<()> {
        if self.lower.is_some_and(f64::is_nan) || self.upper.is_some_and(f64::is_nan) {
            return Err(GrapeError::InvalidProblem("amplitude bound is NaN".into()));
        }
        if self.lower_or_inf() >= self.upper_or_inf() {
            return Err(GrapeError::InvalidProblem(format!(
                "lower bound {} is not below upper bound {}",
                self.lower_or_inf(),
                self.upper_or_inf()
            )));
        }
        Ok(())
    }
}

/// Shape of the first iterate.
///
/// Every policy produces a waveform in `[-1, 1]`. When both bounds are set
/// the waveform is mapped affinely onto `[lower, upper]`; otherwise it is
/// multiplied by the scaling factor and clamped to whichever bound exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InitialPulse {
    /// Independent uniform draws from a seeded generator.
    Random {
        /// Generator seed.
        #[serde(default)]
        seed: u64,
    },
    /// All zero.
    Zero,
    /// Ramp from −1 to 1 across the pulse.
    Linear,
    /// One sine period across the pulse.
    Sine,
    /// One square period: +1 then −1.
    Square,
    /// One sawtooth period rising from −1.
    Saw,
    /// One triangle period: −1 up to 1 and back.
    Triangle,
}

impl Default for InitialPulse {
    fn default() -> Self {
        InitialPulse::Random { seed: 0 }
    }
}

impl InitialPulse {
    /// Policy name as used in configuration files.
    pub fn name(&self) -> &'static str {
        match self {
            InitialPulse::Random { .. } => "random",
            InitialPulse::Zero => "zero",
            InitialPulse::Linear => "linear",
            InitialPulse::Sine => "sine",
            InitialPulse::Square => "square",
            InitialPulse::Saw => "saw",
            InitialPulse::Triangle => "triangle",
        }
    }

    /// Every policy, with `seed` for the random one.
    pub fn all(seed: u64) -> [InitialPulse; 7] {
        [
            InitialPulse::Random { seed },
            InitialPulse::Zero,
            InitialPulse::Linear,
            InitialPulse::Sine,
            InitialPulse::Square,
            InitialPulse::Saw,
            InitialPulse::Triangle,
        ]
    }

    /// Build the schedule. A pure function of its arguments.
    pub fn generate(
        &self,
        num_slots: usize,
        num_controls: usize,
        bounds: &Bounds,
        scaling: f64,
    ) -> PulseSchedule {
        let mut amps = Array2::zeros((num_slots, num_controls));
        let map = |w: f64| match (bounds.lower, bounds.upper) {
            (Some(lo), Some(hi)) => 0.5 * (lo + hi) + 0.5 * (hi - lo) * w,
            _ => bounds.project(scaling * w),
        };

        if let InitialPulse::Random { seed } = *self {
            let mut rng = StdRng::seed_from_u64(seed);
            for v in amps.iter_mut() {
                *v = map(rng.gen_range(-1.0..=1.0));
            }
            return PulseSchedule { amps };
        }

        let n = num_slots as f64;
        for k in 0..num_slots {
            // Slot midpoint as a fraction of the whole pulse.
            let frac = (k as f64 + 0.5) / n;
            let w = match self {
                InitialPulse::Zero | InitialPulse::Random { .. } => 0.0,
                InitialPulse::Linear => {
                    if num_slots > 1 {
                        -1.0 + 2.0 * k as f64 / (n - 1.0)
                    } else {
                        0.0
                    }
                }
                InitialPulse::Sine => (2.0 * std::f64::consts::PI * frac).sin(),
                InitialPulse::Square => {
                    if frac < 0.5 {
                        1.0
                    } else {
                        -1.0
                    }
                }
                InitialPulse::Saw => 2.0 * frac - 1.0,
                InitialPulse::Triangle => 1.0 - 4.0 * (frac - 0.5).abs(),
            };
            amps.row_mut(k).fill(map(w));
        }
        PulseSchedule { amps }
    }
}

impl std::str::FromStr for InitialPulse {
    type Err = GrapeError;

    /// Parses a policy name; `random` and `random:<seed>` select the random policy.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        if let Some(seed) = lower.strip_prefix("random:") {
            let seed = seed
                .parse()
                .map_err(|_| GrapeError::InvalidProblem(format!("bad random seed '{seed}'")))?;
            return Ok(InitialPulse::Random { seed });
        }
        Ok(match lower.as_str() {
            "random" => InitialPulse::Random { seed: 0 },
            "zero" => InitialPulse::Zero,
            "linear" | "lin" => InitialPulse::Linear,
            "sine" | "sin" => InitialPulse::Sine,
            "square" | "sqr" => InitialPulse::Square,
            "saw" => InitialPulse::Saw,
            "triangle" | "tri" => InitialPulse::Triangle,
            other => {
                return Err(GrapeError::InvalidProblem(format!(
                    "unknown initial pulse '{other}'"
                )));
            }
        })
    }
}
