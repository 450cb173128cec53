// The per-frame smoke solver and the loops that drive it

pub mod advection;
pub mod diffusion;
pub mod error;
pub mod grid;
pub mod numeric;
pub mod obstacles;
pub mod poisson;
pub mod smoke;
pub mod task;
pub mod tracer;
