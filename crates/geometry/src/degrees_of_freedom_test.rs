use crate::{
    Barycentric, DegreesOfFreedom, Displacement, Position, RelativeDegreesOfFreedom, Velocity,
};

fn make_dof(x: f64, vy: f64) -> DegreesOfFreedom<Barycentric> {
    DegreesOfFreedom::new(Position::new(x, 0.0, 0.0), Velocity::new(0.0, vy, 0.0))
}

#[test]
fn test_relative_degrees_of_freedom() {
    let parent = make_dof(10.0, 1.0);
    let child = make_dof(12.0, 3.0);
    let relative = child - parent;
    assert_eq!(relative.displacement, Displacement::new(2.0, 0.0, 0.0));
    assert_eq!(relative.velocity, Velocity::new(0.0, 2.0, 0.0));
    assert_eq!(parent + relative, child);
    assert_eq!(child - relative, parent);
    assert_eq!(relative + (-relative), RelativeDegreesOfFreedom::zero());
}
