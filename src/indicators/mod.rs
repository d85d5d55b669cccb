pub mod bspline;
pub mod gam;
mod linalg;

pub use gam::{calculate_gam, SmoothError};
