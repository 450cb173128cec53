//! Real-time 2D smoke simulation on a fixed Eulerian grid.
//!
//! The [`sim`] module holds the per-frame solver; [`observers`] holds the
//! input and render collaborators that feed it and consume it, and
//! [`preprocessing`] turns CLI flags / JSON files into a validated run.

extern crate nalgebra as na;

use na::DMatrix;

pub mod observers;
pub mod preprocessing;
pub mod sim;

pub type ScalarField = DMatrix<f32>;
pub type VectorField = [ScalarField; 2];
pub type ObstacleMask = DMatrix<bool>;
