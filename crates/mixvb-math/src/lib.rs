//! Numerical collaborators for the Normal-Wishart mixture engine.

pub mod math;

pub use math::linalg::{
    bounding_box, invert, is_symmetric_positive_definite, ln_det_spd, outer, LinalgError,
    SYMMETRY_TOL,
};
pub use math::stable::*;
pub use math::step::{step, Step};
pub use math::student_t::{MultivariateStudentT, StudentTError};
pub use math::wishart::{Wishart, WishartError};
