use crate::error::ConfigurationError;

/// An implementation of a decaying value
pub trait Decay {
    /// Calculate value at time `t`
    ///
    /// For visit-driven schedules `t` is the number of updates seen so far
    fn evaluate(&self, t: f32) -> f32;
}

/// A constant value
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Constant {
    value: f32,
}

impl Constant {
    pub fn new(value: f32) -> Self {
        Self { value }
    }
}

impl Decay for Constant {
    fn evaluate(&self, _t: f32) -> f32 {
        self.value
    }
}

/// v(t) = v<sub>i</sub> / max(t, 1)<sup>exp</sup>
///
/// With `exp = 1` this is the sample-average step size, with `exp = 0.5` the
/// usual `1/sqrt(n)` exploration schedule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Polynomial {
    vi: f32,
    exp: f32,
}

impl Polynomial {
    pub fn new(vi: f32, exp: f32) -> Result<Self, ConfigurationError> {
        if !vi.is_finite() || !exp.is_finite() || exp < 0.0 {
            return Err(ConfigurationError::InvalidValue {
                field: "polynomial decay",
                reason: format!("need finite `vi` and non-negative `exp`, got vi={vi}, exp={exp}"),
            });
        }
        Ok(Self { vi, exp })
    }

    pub fn initial(&self) -> f32 {
        self.vi
    }

    pub fn exponent(&self) -> f32 {
        self.exp
    }
}

impl Decay for Polynomial {
    fn evaluate(&self, t: f32) -> f32 {
        let &Self { vi, exp } = self;
        vi / t.max(1.0).powf(exp)
    }
}

/// A decaying value with one visit counter per index, e.g. per state or per state-action pair
///
/// [`next`](Visits::next) records a visit before evaluating, so the first call
/// for an index evaluates the schedule at `t = 1`.
#[derive(Debug, Clone)]
pub struct Visits<D: Decay> {
    decay: D,
    counts: Vec<u32>,
}

impl<D: Decay> Visits<D> {
    pub fn new(decay: D, size: usize) -> Self {
        Self {
            decay,
            counts: vec![0; size],
        }
    }

    /// Record a visit to `index` and return the decayed value
    pub fn next(&mut self, index: usize) -> f32 {
        self.counts[index] += 1;
        self.decay.evaluate(self.counts[index] as f32)
    }

    /// Current value at `index` without recording a visit
    pub fn peek(&self, index: usize) -> f32 {
        self.decay.evaluate(self.counts[index] as f32)
    }

    pub fn count(&self, index: usize) -> u32 {
        self.counts[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_decay() {
        let x = Constant::new(1.0);
        assert_eq!(x.evaluate(0.0), 1.0);
        assert_eq!(x.evaluate(1.0), 1.0);
    }

    #[test]
    fn polynomial_decay() {
        let x = Polynomial::new(1.0, 1.0).unwrap();
        assert_eq!(x.evaluate(0.0), 1.0, "clamped below one visit");
        assert_eq!(x.evaluate(1.0), 1.0);
        assert_eq!(x.evaluate(4.0), 0.25);

        let x = Polynomial::new(1.0, 0.5).unwrap();
        assert_eq!(x.evaluate(4.0), 0.5);
    }

    #[test]
    fn polynomial_rejects_bad_parameters() {
        assert!(Polynomial::new(1.0, -0.5).is_err());
        assert!(Polynomial::new(f32::NAN, 1.0).is_err());
    }

    #[test]
    fn visits_count_per_index() {
        let mut v = Visits::new(Polynomial::new(1.0, 1.0).unwrap(), 3);
        assert_eq!(v.next(0), 1.0);
        assert_eq!(v.next(0), 0.5);
        assert_eq!(v.peek(0), 0.5, "peek does not count");
        assert_eq!(v.next(2), 1.0, "indices are independent");
        assert_eq!(v.count(0), 2);
        assert_eq!(v.count(1), 0);
    }
}
