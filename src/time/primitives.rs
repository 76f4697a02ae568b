use std::fmt;
use std::ops::{Add, AddAssign, Sub};

/// The time at which the runtime started
pub const START_TIME: Time = Time(0);

/// A point in simulated time, in microseconds since [`START_TIME`]
#[derive(Debug, Default, Clone, Copy, PartialEq, PartialOrd, Ord, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Time(u64);

/// A span of simulated time, in microseconds
#[derive(Debug, Default, Clone, Copy, PartialEq, PartialOrd, Ord, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Duration(u64);

impl Time {
    pub const fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    pub const fn from_millis(millis: u64) -> Self {
        Self::from_micros(millis * 1000)
    }

    pub const fn from_seconds(seconds: u64) -> Self {
        Self::from_millis(seconds * 1000)
    }

    pub fn as_micros(&self) -> u64 {
        self.0
    }

    /// Elapsed milliseconds (rounded down)
    pub fn to_millis(&self) -> u64 {
        self.0 / 1_000
    }

    /// Elapsed seconds (rounded down)
    pub fn to_seconds(&self) -> u64 {
        self.0 / 1_000_000
    }
}

impl Duration {
    pub const ZERO: Self = Self(0);

    pub const fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    pub const fn from_millis(millis: u64) -> Self {
        Self::from_micros(millis * 1000)
    }

    pub const fn from_seconds(seconds: u64) -> Self {
        Self::from_millis(seconds * 1000)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn as_micros(&self) -> u64 {
        self.0
    }

    pub fn to_millis(&self) -> u64 {
        self.0 / 1_000
    }

    pub fn to_seconds(&self) -> u64 {
        self.0 / 1_000_000
    }
}

impl Add<Duration> for Time {
    type Output = Self;

    fn add(self, other: Duration) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

/// Saturates to zero if `other` is later than `self`
impl Sub for Time {
    type Output = Duration;

    fn sub(self, other: Self) -> Duration {
        Duration(self.0.saturating_sub(other.0))
    }
}

impl Add for Duration {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Duration {
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0)
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}μs", self.0)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let minutes = self.to_seconds() / 60;
        let secs = self.to_seconds() % 60;
        let millis = self.to_millis() % 1000;

        if minutes > 0 {
            write!(f, "{minutes:02}min ")?;
        }

        write!(f, "{secs:02}s {millis:03}ms")
    }
}

#[cfg(test)]
mod tests {
    use super::{Duration, Time, START_TIME};

    #[test]
    fn duration_from_seconds() {
        let duration = Duration::from_seconds(2);

        assert_eq!(2, duration.to_seconds());
        assert_eq!(2_000, duration.to_millis());
        assert_eq!(2_000_000, duration.as_micros());
    }

    #[test]
    fn time_arithmetic() {
        let later = START_TIME + Duration::from_millis(1_500);

        assert_eq!(later, Time::from_millis(1_500));
        assert_eq!(later - START_TIME, Duration::from_micros(1_500_000));
    }

    #[test]
    fn time_arithmetic_saturates() {
        let earlier = Time::from_seconds(1);
        let later = Time::from_seconds(3);

        assert_eq!(earlier - later, Duration::ZERO);
        assert_eq!(
            later + Duration::from_micros(u64::MAX),
            Time::from_micros(u64::MAX)
        );

        let mut total = Duration::from_micros(u64::MAX - 1);
        total += Duration::from_seconds(1);
        assert_eq!(total, Duration::from_micros(u64::MAX));
    }

    #[test]
    fn time_display() {
        assert_eq!(Time::from_millis(2_050).to_string(), "02s 050ms");
        assert_eq!(Time::from_seconds(125).to_string(), "02min 05s 000ms");
    }
}
