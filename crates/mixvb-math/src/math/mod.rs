//! Core math modules.

pub mod linalg;
pub mod stable;
pub mod step;
pub mod student_t;
pub mod wishart;
