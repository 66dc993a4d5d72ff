//! Heading arithmetic
//!
//! Pure functions for integrating true angular travel from discrete heading
//! samples. Headings are in degrees; no particular zero reference is assumed.

/// Shortest signed rotation from `prev_deg` to `curr_deg`.
///
/// The result lies in (-180, 180], so a sample sequence crossing the
/// 359 → 0 seam yields a small positive step instead of a -359 jump.
pub fn shortest_delta(prev_deg: f64, curr_deg: f64) -> f64 {
    // Remainder keeps the sign of the dividend: d is in (-360, 360)
    let mut d = (curr_deg - prev_deg) % 360.0;
    if d > 180.0 {
        d -= 360.0;
    } else if d <= -180.0 {
        d += 360.0;
    }
    d
}

/// Normalize angle to the [0, 360) range
pub fn wrap_360(angle_deg: f64) -> f64 {
    let a = angle_deg % 360.0;
    if a < 0.0 {
        // -1e-18 % 360 + 360 rounds to 360.0
        let wrapped = a + 360.0;
        if wrapped >= 360.0 {
            0.0
        } else {
            wrapped
        }
    } else {
        a
    }
}

/// Integrates absolute heading change toward a target sweep.
///
/// Each sample contributes `|shortest_delta(previous, sample)|`, so the
/// total grows with real rotation regardless of direction or wraparound.
/// Progress is reported in quarter steps of the target, each at most once.
#[derive(Clone, Copy, Debug)]
pub struct HeadingAccumulator {
    target_deg: f64,
    last_deg: Option<f64>,
    total_deg: f64,
    next_quarter: u8,
}

impl HeadingAccumulator {
    /// Create an accumulator that completes after `target_deg` of travel.
    pub fn new(target_deg: f64) -> Self {
        Self {
            target_deg,
            last_deg: None,
            total_deg: 0.0,
            next_quarter: 1,
        }
    }

    /// Create an accumulator whose first reference heading is already known.
    pub fn seeded(target_deg: f64, initial_heading_deg: f64) -> Self {
        Self {
            last_deg: Some(initial_heading_deg),
            ..Self::new(target_deg)
        }
    }

    /// Feed one heading sample.
    ///
    /// Returns the progress percentage (25, 50, 75 or 100) when this sample
    /// crosses the next quarter of the target, otherwise `None`.
    pub fn update(&mut self, heading_deg: f64) -> Option<u8> {
        if let Some(last) = self.last_deg {
            self.total_deg += libm::fabs(shortest_delta(last, heading_deg));
        }
        self.last_deg = Some(heading_deg);

        if self.next_quarter > 4 || self.target_deg <= 0.0 {
            return None;
        }
        let fraction = self.total_deg / self.target_deg;
        if fraction >= f64::from(self.next_quarter) * 0.25 {
            let percent = self.next_quarter * 25;
            self.next_quarter += 1;
            Some(percent)
        } else {
            None
        }
    }

    /// Total absolute rotation integrated so far, in degrees.
    pub fn total_deg(&self) -> f64 {
        self.total_deg
    }

    /// Target sweep in degrees.
    pub fn target_deg(&self) -> f64 {
        self.target_deg
    }

    /// True once the integrated rotation has reached the target.
    pub fn is_complete(&self) -> bool {
        self.total_deg >= self.target_deg
    }
}
