use std::fmt::Debug;

/// A reference frame, used as a zero-sized type tag.
pub trait Frame: Copy + Clone + Debug + Default + PartialEq + Send + Sync + 'static {
    /// Human-readable name, used in logs.
    const NAME: &'static str;

    /// Whether the frame is inertial. Only inertial frames may be integrated in.
    const IS_INERTIAL: bool;
}

/// The inertial frame centred on the barycentre of the massive bodies, in
/// which the ephemeris and all vessel trajectories are integrated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Barycentric;

impl Frame for Barycentric {
    const NAME: &'static str = "Barycentric";
    const IS_INERTIAL: bool = true;
}

/// The host's rendering frame.
///
/// It is rotated with respect to [`Barycentric`] by the planetarium rotation
/// about the z axis and its origin floats with the active vessel, so it is
/// not inertial.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct World;

impl Frame for World {
    const NAME: &'static str = "World";
    const IS_INERTIAL: bool = false;
}

/// The frame rotating with a celestial: z along its pole and x towards its
/// prime meridian.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BodySurface;

impl Frame for BodySurface {
    const NAME: &'static str = "BodySurface";
    const IS_INERTIAL: bool = false;
}

/// The Frenet trihedron of a trajectory: x along the tangent, y along the
/// normal and z along the binormal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Frenet;

impl Frame for Frenet {
    const NAME: &'static str = "Frenet";
    const IS_INERTIAL: bool = false;
}
