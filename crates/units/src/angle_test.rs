use approx::assert_relative_eq;
use std::f64::consts::{PI, TAU};

use crate::{Angle, AngularFrequency, Time};

#[test]
fn test_angle_conversions() {
    assert_relative_eq!(Angle::from_degrees(180.0).to_radians(), PI);
    assert_relative_eq!(Angle::from_radians(PI / 2.0).to_degrees(), 90.0);
    assert_relative_eq!(Angle::from_radians(-PI / 2.0).normalized().to_radians(), 1.5 * PI);
}

#[test]
fn test_angular_frequency_period() {
    let omega = AngularFrequency::from_period(Time::from_hours(6.0));
    assert_relative_eq!(omega.period().to_hours(), 6.0);
    let angle = omega * Time::from_hours(3.0);
    assert_relative_eq!(angle.to_radians(), TAU / 2.0);
}
