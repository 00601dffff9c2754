use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

pub const SECONDS_PER_MINUTE: f64 = 60.0;
pub const SECONDS_PER_HOUR: f64 = 3_600.0;
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// A duration using f64 precision.
///
/// The base unit is the SI second. Durations may be negative; the ordering
/// of instants is carried by [`Instant`], not by `Time`.
///
/// # Examples
///
/// ```rust
/// use units::Time;
///
/// let step = Time::from_minutes(45.0);
/// assert_eq!(step.to_seconds(), 2_700.0);
///
/// let half = step / 2.0;
/// assert_eq!(half.to_minutes(), 22.5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Time(f64); // Base unit: seconds

impl Time {
    /// Creates a zero duration
    pub fn zero() -> Self {
        Self(0.0)
    }

    /// Creates a new `Time` from a value in seconds.
    pub fn from_seconds(value: f64) -> Self {
        Self(value)
    }

    /// Creates a new `Time` from a value in minutes.
    pub fn from_minutes(value: f64) -> Self {
        Self(value * SECONDS_PER_MINUTE)
    }

    /// Creates a new `Time` from a value in hours.
    pub fn from_hours(value: f64) -> Self {
        Self(value * SECONDS_PER_HOUR)
    }

    /// Creates a new `Time` from a value in days.
    pub fn from_days(value: f64) -> Self {
        Self(value * SECONDS_PER_DAY)
    }

    pub fn to_seconds(&self) -> f64 {
        self.0
    }

    pub fn to_minutes(&self) -> f64 {
        self.0 / SECONDS_PER_MINUTE
    }

    pub fn to_hours(&self) -> f64 {
        self.0 / SECONDS_PER_HOUR
    }

    pub fn to_days(&self) -> f64 {
        self.0 / SECONDS_PER_DAY
    }

    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    pub fn is_finite(&self) -> bool {
        self.0.is_finite()
    }
}

impl Add for Time {
    type Output = Time;

    fn add(self, rhs: Time) -> Time {
        Time(self.0 + rhs.0)
    }
}

impl Sub for Time {
    type Output = Time;

    fn sub(self, rhs: Time) -> Time {
        Time(self.0 - rhs.0)
    }
}

impl Neg for Time {
    type Output = Time;

    fn neg(self) -> Time {
        Time(-self.0)
    }
}

impl Mul<f64> for Time {
    type Output = Time;

    fn mul(self, rhs: f64) -> Time {
        Time(self.0 * rhs)
    }
}

impl Mul<Time> for f64 {
    type Output = Time;

    fn mul(self, rhs: Time) -> Time {
        Time(self * rhs.0)
    }
}

impl Div<f64> for Time {
    type Output = Time;

    fn div(self, rhs: f64) -> Time {
        Time(self.0 / rhs)
    }
}

impl Div for Time {
    type Output = f64;

    fn div(self, rhs: Time) -> f64 {
        self.0 / rhs.0
    }
}

impl AddAssign for Time {
    fn add_assign(&mut self, rhs: Time) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Time {
    fn sub_assign(&mut self, rhs: Time) {
        self.0 -= rhs.0;
    }
}

/// A point on the simulation time scale, in seconds since J2000.
///
/// Instants are totally ordered so that they can key sorted containers and
/// be binary-searched in trajectories. The difference of two instants is a
/// [`Time`].
///
/// # Examples
///
/// ```rust
/// use units::{Instant, Time};
///
/// let start = Instant::J2000;
/// let later = start + Time::from_hours(1.0);
/// assert!(later > start);
/// assert_eq!((later - start).to_seconds(), 3_600.0);
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Instant(f64);

impl Instant {
    /// The epoch of the time scale.
    pub const J2000: Instant = Instant(0.0);

    /// The latest representable instant, used as an unbounded upper limit.
    pub const INFINITE_FUTURE: Instant = Instant(f64::INFINITY);

    /// The earliest representable instant, used as an unbounded lower limit.
    pub const INFINITE_PAST: Instant = Instant(f64::NEG_INFINITY);

    pub fn from_seconds_since_j2000(value: f64) -> Self {
        Self(value)
    }

    pub fn seconds_since_j2000(&self) -> f64 {
        self.0
    }

    pub fn is_finite(&self) -> bool {
        self.0.is_finite()
    }
}

impl Default for Instant {
    fn default() -> Self {
        Instant::J2000
    }
}

impl PartialEq for Instant {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Instant {}

impl PartialOrd for Instant {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Instant {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "J2000{:+} s", self.0)
    }
}

impl Add<Time> for Instant {
    type Output = Instant;

    fn add(self, rhs: Time) -> Instant {
        Instant(self.0 + rhs.to_seconds())
    }
}

impl Sub<Time> for Instant {
    type Output = Instant;

    fn sub(self, rhs: Time) -> Instant {
        Instant(self.0 - rhs.to_seconds())
    }
}

impl Sub for Instant {
    type Output = Time;

    fn sub(self, rhs: Instant) -> Time {
        Time::from_seconds(self.0 - rhs.0)
    }
}

impl AddAssign<Time> for Instant {
    fn add_assign(&mut self, rhs: Time) {
        self.0 += rhs.to_seconds();
    }
}
