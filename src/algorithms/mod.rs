//! Position solving from ranged anchor sites

pub mod solver;

pub use solver::{solve, two_anchor, SolveError};
