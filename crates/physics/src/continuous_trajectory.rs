//! Piecewise Chebyshev trajectories of massive bodies
//!
//! The ephemeris appends one sample per integration step. Every
//! [`DIVISIONS`] steps the buffered samples are fitted by a
//! [`ChebyshevSeries`] whose degree is raised until the position error at
//! every sample is below the fitting tolerance. The last sample of a
//! segment is the first of the next, so the segments tile time without
//! gaps.

use std::marker::PhantomData;

use geometry::{DegreesOfFreedom, Frame, Position, Velocity};
use serde::{Deserialize, Serialize};
use tracing::warn;
use units::{Instant, Length, Time};

use crate::chebyshev::{ChebyshevSeries, ChebyshevSeriesMessage, FittingSample};
use crate::discrete_trajectory::Sample;
use crate::error::TrajectoryError;

/// Number of steps covered by a segment.
pub const DIVISIONS: usize = 8;

pub const MIN_DEGREE: usize = 3;
pub const MAX_DEGREE: usize = 17;

#[derive(Debug, Clone)]
pub struct ContinuousTrajectory<F: Frame> {
    step: Time,
    fitting_tolerance: Length,
    series: Vec<ChebyshevSeries>,
    // Samples not yet covered by a series, starting with the end of the last
    // series.
    last_points: Vec<Sample<F>>,
    degree: usize,
    frame: PhantomData<F>,
}

impl<F: Frame> ContinuousTrajectory<F> {
    pub fn new(step: Time, fitting_tolerance: Length) -> Self {
        Self {
            step,
            fitting_tolerance,
            series: Vec::new(),
            last_points: Vec::new(),
            degree: MIN_DEGREE,
            frame: PhantomData,
        }
    }

    pub fn step(&self) -> Time {
        self.step
    }

    pub fn fitting_tolerance(&self) -> Length {
        self.fitting_tolerance
    }

    /// Degree of the most recently fitted series.
    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    /// Start of the covered interval; the first sample if nothing has been
    /// fitted yet.
    pub fn t_min(&self) -> Option<Instant> {
        self.series
            .first()
            .map(ChebyshevSeries::t_min)
            .or_else(|| self.last_points.first().map(|p| p.time))
    }

    /// End of the covered interval. Samples that are not fitted yet do not
    /// count, except for the very first one.
    pub fn t_max(&self) -> Option<Instant> {
        self.series
            .last()
            .map(ChebyshevSeries::t_max)
            .or_else(|| self.last_points.first().map(|p| p.time))
    }

    /// Time of the last appended sample, fitted or not.
    pub fn last_sample_time(&self) -> Option<Instant> {
        self.last_points.last().map(|p| p.time)
    }

    /// Appends the degrees of freedom at `time`, which must follow the last
    /// appended time. Completes a segment every [`DIVISIONS`] appends.
    pub fn append(
        &mut self,
        time: Instant,
        degrees_of_freedom: DegreesOfFreedom<F>,
    ) -> Result<(), TrajectoryError> {
        if let Some(last) = self.last_points.last() {
            if time <= last.time {
                return Err(TrajectoryError::NonMonotonicAppend {
                    time,
                    last: last.time,
                });
            }
        }
        self.last_points.push(Sample::new(time, degrees_of_freedom));

        if self.last_points.len() == DIVISIONS + 1 {
            let series = self.fit_last_points()?;
            self.series.push(series);
            let last = self.last_points[DIVISIONS];
            self.last_points.clear();
            self.last_points.push(last);
        }
        Ok(())
    }

    fn fit_last_points(&mut self) -> Result<ChebyshevSeries, TrajectoryError> {
        let samples: Vec<FittingSample> = self
            .last_points
            .iter()
            .map(|p| FittingSample {
                time: p.time,
                position: p.degrees_of_freedom.position.coordinates(),
                velocity: p.degrees_of_freedom.velocity.coordinates(),
            })
            .collect();

        let tolerance = self.fitting_tolerance.to_meters();
        let start = self.degree.saturating_sub(1).max(MIN_DEGREE);
        for degree in start..=MAX_DEGREE {
            let series = ChebyshevSeries::fit(&samples, degree)?;
            let error = series.max_position_error(&samples);
            if error <= tolerance || degree == MAX_DEGREE {
                if error > tolerance {
                    warn!(
                        degree,
                        error_m = error,
                        tolerance_m = tolerance,
                        t_min = %series.t_min(),
                        "fitting tolerance not met at maximum degree"
                    );
                }
                self.degree = degree;
                return Ok(series);
            }
        }
        Err(TrajectoryError::FittingFailed("no admissible degree"))
    }

    /// Removes the series that end before `time`.
    pub fn forget_before(&mut self, time: Instant) {
        let end = self.series.partition_point(|s| s.t_max() < time);
        self.series.drain(..end);
    }

    pub fn evaluate_position(&self, time: Instant) -> Result<Position<F>, TrajectoryError> {
        self.check_range(time)?;
        Ok(self.position_unchecked(time))
    }

    pub fn evaluate_velocity(&self, time: Instant) -> Result<Velocity<F>, TrajectoryError> {
        self.check_range(time)?;
        Ok(self.velocity_unchecked(time))
    }

    pub fn evaluate_degrees_of_freedom(
        &self,
        time: Instant,
    ) -> Result<DegreesOfFreedom<F>, TrajectoryError> {
        self.check_range(time)?;
        Ok(DegreesOfFreedom::new(
            self.position_unchecked(time),
            self.velocity_unchecked(time),
        ))
    }

    /// Position at `time` from the nearest series, extrapolating outside of
    /// the covered interval.
    pub(crate) fn position_unchecked(&self, time: Instant) -> Position<F> {
        match self.series_for(time) {
            Some(series) => Position::from_coordinates(series.evaluate(time)),
            None => self
                .last_points
                .first()
                .map(|p| p.degrees_of_freedom.position)
                .unwrap_or_else(Position::origin),
        }
    }

    pub(crate) fn velocity_unchecked(&self, time: Instant) -> Velocity<F> {
        match self.series_for(time) {
            Some(series) => Velocity::from_coordinates(series.evaluate_derivative(time)),
            None => self
                .last_points
                .first()
                .map(|p| p.degrees_of_freedom.velocity)
                .unwrap_or_else(Velocity::zero),
        }
    }

    fn series_for(&self, time: Instant) -> Option<&ChebyshevSeries> {
        let index = self.series.partition_point(|s| s.t_max() < time);
        self.series.get(index.min(self.series.len().checked_sub(1)?))
    }

    fn check_range(&self, time: Instant) -> Result<(), TrajectoryError> {
        let (Some(t_min), Some(t_max)) = (self.t_min(), self.t_max()) else {
            return Err(TrajectoryError::Empty);
        };
        if time < t_min || time > t_max {
            return Err(TrajectoryError::OutOfRange {
                time,
                t_min,
                t_max,
            });
        }
        Ok(())
    }

    pub fn to_message(&self) -> ContinuousTrajectoryMessage<F> {
        ContinuousTrajectoryMessage {
            step: self.step,
            fitting_tolerance: self.fitting_tolerance,
            series: self.series.iter().map(ChebyshevSeries::to_message).collect(),
            last_points: self.last_points.clone(),
            degree: self.degree,
        }
    }

    pub fn from_message(message: &ContinuousTrajectoryMessage<F>) -> Result<Self, TrajectoryError> {
        let series = message
            .series
            .iter()
            .map(ChebyshevSeries::from_message)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            step: message.step,
            fitting_tolerance: message.fitting_tolerance,
            series,
            last_points: message.last_points.clone(),
            degree: message.degree.clamp(MIN_DEGREE, MAX_DEGREE),
            frame: PhantomData,
        })
    }
}

/// Persisted form of a [`ContinuousTrajectory`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct ContinuousTrajectoryMessage<F: Frame> {
    pub step: Time,
    pub fitting_tolerance: Length,
    pub series: Vec<ChebyshevSeriesMessage>,
    pub last_points: Vec<Sample<F>>,
    #[serde(default = "default_degree")]
    pub degree: usize,
}

fn default_degree() -> usize {
    MIN_DEGREE
}
