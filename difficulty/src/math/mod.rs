mod line;
mod linspace;

pub(crate) use {
    line::{closest_point, interpolate, project},
    linspace::linspace,
};
