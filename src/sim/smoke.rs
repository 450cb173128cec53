// Per-frame smoke timestepping

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    ScalarField, VectorField,
    observers::Frame,
    sim::{
        advection::advect,
        diffusion::diffuse,
        error::SimError,
        grid::{Edit, FluidGrid},
        numeric,
        obstacles::{apply_obstacles, zero_where_mask},
        poisson::{self, PRESSURE_ITERATIONS},
        tracer::Tracer,
    },
};

/// Constant solver parameters for a run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmokeParams {
    /// The timestep per frame
    pub dt: f32,

    /// Diffusion coefficient applied to both velocity components
    pub viscosity: f32,

    /// Horizontal speed forced in the inflow band
    pub inflow_speed: f32,

    /// Half-open column range `[start, end)` of the inflow band
    pub inflow_columns: (usize, usize),

    /// Jacobi sweeps per pressure projection
    pub pressure_iterations: usize,
}

impl Default for SmokeParams {
    fn default() -> Self {
        SmokeParams {
            dt: 0.1,
            viscosity: 0.001,
            inflow_speed: 2.0,
            inflow_columns: (1, 4),
            pressure_iterations: PRESSURE_ITERATIONS,
        }
    }
}

impl SmokeParams {
    /// Check the parameters against a grid with `cols` columns
    pub fn validate(&self, cols: usize) -> Result<(), SimError> {
        if !(self.dt.is_finite() && self.dt > 0.) {
            return Err(SimError::InvalidParameter {
                name: "dt",
                value: self.dt,
            });
        }
        if !(self.viscosity.is_finite() && self.viscosity >= 0.) {
            return Err(SimError::InvalidParameter {
                name: "viscosity",
                value: self.viscosity,
            });
        }
        if !self.inflow_speed.is_finite() {
            return Err(SimError::InvalidParameter {
                name: "inflow_speed",
                value: self.inflow_speed,
            });
        }

        let (start, end) = self.inflow_columns;
        if start >= end || end > cols {
            return Err(SimError::InvalidParameter {
                name: "inflow_columns",
                value: end as f32,
            });
        }
        if self.pressure_iterations == 0 {
            return Err(SimError::InvalidParameter {
                name: "pressure_iterations",
                value: 0.,
            });
        }

        Ok(())
    }
}

/// High-level smoke timestepping object. Owns every field of the
/// simulation and advances them one frame at a time.
pub struct Smoke {
    /// The solver parameters
    params: SmokeParams,

    /// The simulation fields
    grid: FluidGrid,

    /// The visualization tracer
    tracer: Tracer,

    /// Display scale handed to the renderer
    scale: usize,

    /// Number of completed steps
    i: usize,

    /// Simulated time
    t: f32,
}

impl Smoke {
    /// Create a new smoke simulation over an existing grid
    ///
    /// Parameters
    /// - `grid` - The initial fields and obstacles
    /// - `params` - Constant solver parameters
    /// - `tracer` - Where the tracer starts
    /// - `scale` - Pixels per cell for the renderer
    pub fn new(
        grid: FluidGrid,
        params: SmokeParams,
        tracer: Tracer,
        scale: usize,
    ) -> Result<Self, SimError> {
        params.validate(grid.cols())?;
        grid.validate()?;

        Ok(Smoke {
            params,
            grid,
            tracer,
            scale,
            i: 0,
            t: 0.,
        })
    }

    pub fn params(&self) -> &SmokeParams {
        &self.params
    }

    pub fn grid(&self) -> &FluidGrid {
        &self.grid
    }

    /// Mutable access for seeding fields before a run
    pub fn grid_mut(&mut self) -> &mut FluidGrid {
        &mut self.grid
    }

    pub fn tracer(&self) -> Tracer {
        self.tracer
    }

    pub fn iteration(&self) -> usize {
        self.i
    }

    pub fn time(&self) -> f32 {
        self.t
    }

    /// Force density and `u` in the inflow band
    fn apply_inflow(&self, grid: &mut FluidGrid) {
        let (start, end) = self.params.inflow_columns;

        grid.density.columns_mut(start, end - start).fill(1.0);
        grid.velocity[0]
            .columns_mut(start, end - start)
            .fill(self.params.inflow_speed);
    }

    /// Advance the simulation by one frame.
    ///
    /// The order is fixed: edits, inflow, advection (density, then `u`, then
    /// `v` using the freshly advected `u`), tracer, density clamp, diffusion,
    /// projection and finally the obstacle constraint. The frame is computed
    /// on a copy of the grid; if any result is non-finite an error is returned
    /// and the simulation is left exactly as it was, edits included.
    ///
    /// Parameters
    /// - `edits` - User edits to apply before stepping
    pub fn step(&mut self, edits: &[Edit]) -> Result<(), SimError> {
        self.grid.validate()?;

        let mut grid = self.grid.clone();
        for edit in edits {
            grid.apply_edit(edit);
        }

        self.apply_inflow(&mut grid);

        let dt = self.params.dt;
        let obstacles = &grid.obstacles;
        let [u0, v0] = &grid.velocity;

        let mut density: ScalarField = advect(&grid.density, u0, v0, obstacles, dt);
        let u: ScalarField = advect(u0, u0, v0, obstacles, dt);
        let v: ScalarField = advect(v0, &u, v0, obstacles, dt);
        let mut velocity: VectorField = [u, v];

        let mut tracer = self.tracer;
        tracer.advance(&velocity, dt);

        density.apply(|d| *d = d.clamp(0., 1.));

        velocity = [
            diffuse(&velocity[0], self.params.viscosity, dt),
            diffuse(&velocity[1], self.params.viscosity, dt),
        ];

        poisson::project(&mut velocity, self.params.pressure_iterations);
        apply_obstacles(&mut velocity, obstacles);
        zero_where_mask(&mut density, obstacles);

        if !numeric::all_finite(&density) {
            return Err(SimError::NonFinite { field: "density" });
        }
        if !numeric::all_finite(&velocity[0]) || !numeric::all_finite(&velocity[1]) {
            return Err(SimError::NonFinite { field: "velocity" });
        }
        if !(tracer.y.is_finite() && tracer.x.is_finite()) {
            return Err(SimError::NonFinite { field: "tracer" });
        }

        grid.density = density;
        grid.velocity = velocity;

        self.grid = grid;
        self.tracer = tracer;
        self.i += 1;
        self.t += dt;

        debug!(
            "frame {}: max speed {:.4}, mean density {:.4}, tracer ({:.2}, {:.2})",
            self.i,
            numeric::max_speed(&self.grid.velocity),
            self.grid.density.mean(),
            self.tracer.y,
            self.tracer.x,
        );

        Ok(())
    }

    /// The post-step snapshot handed to the renderer
    pub fn frame(&self) -> Frame<'_> {
        Frame {
            density: &self.grid.density,
            obstacles: &self.grid.obstacles,
            scale: self.scale,
            tracer: self.tracer,
            index: self.i,
        }
    }
}

#[cfg(test)]
mod tests {
    use na::DMatrix;
    use rand::Rng;

    use super::*;
    use crate::sim::grid::CellRegion;

    fn params() -> SmokeParams {
        SmokeParams {
            dt: 0.1,
            viscosity: 0.001,
            inflow_speed: 2.0,
            inflow_columns: (1, 4),
            pressure_iterations: PRESSURE_ITERATIONS,
        }
    }

    fn smoke(n: usize) -> Smoke {
        let grid = FluidGrid::new(n, n).unwrap();
        Smoke::new(grid, params(), Tracer::new(n as f32 / 2., 5.), 4).unwrap()
    }

    #[test]
    fn test_rejects_bad_params() {
        let grid = FluidGrid::new(10, 10).unwrap();

        let zero_dt = SmokeParams { dt: 0., ..params() };
        assert!(matches!(
            Smoke::new(grid.clone(), zero_dt, Tracer::new(5., 5.), 1),
            Err(SimError::InvalidParameter { name: "dt", .. })
        ));

        let wide_inflow = SmokeParams {
            inflow_columns: (8, 12),
            ..params()
        };
        assert!(matches!(
            Smoke::new(grid.clone(), wide_inflow, Tracer::new(5., 5.), 1),
            Err(SimError::InvalidParameter {
                name: "inflow_columns",
                ..
            })
        ));

        let nan_visc = SmokeParams {
            viscosity: f32::NAN,
            ..params()
        };
        assert!(Smoke::new(grid, nan_visc, Tracer::new(5., 5.), 1).is_err());
    }

    #[test]
    fn test_inflow_single_step() {
        let mut sim = smoke(10);

        sim.step(&[]).unwrap();

        let density = &sim.grid().density;
        for i in 0..10 {
            for j in 0..10 {
                let d = density[(i, j)];
                assert!(d.is_finite() && (0. ..=1.).contains(&d));

                match j {
                    // traces 0.2 cells back toward the empty column 0
                    1 => assert!((d - 0.8).abs() < 1e-5),
                    2 | 3 => assert!((d - 1.).abs() < 1e-5),
                    _ => assert_eq!(d, 0.),
                }
            }
        }

        assert!(sim.grid().velocity[0].iter().all(|x| x.is_finite()));
        assert!(sim.grid().velocity[1].iter().all(|x| x.is_finite()));
        assert_eq!(sim.iteration(), 1);
    }

    #[test]
    fn test_obstacle_block_stops_flow() {
        let mut rng = rand::rng();
        let mut sim = smoke(20);

        for field in sim.grid_mut().velocity.iter_mut() {
            *field = DMatrix::from_fn(20, 20, |_, _| rng.random_range(-5.0..5.0));
        }

        sim.step(&[Edit::Obstacle(CellRegion::square(10, 10, 5))])
            .unwrap();

        let grid = sim.grid();
        for i in 8..13 {
            for j in 8..13 {
                assert!(grid.obstacles[(i, j)]);
                assert_eq!(grid.velocity[0][(i, j)], 0.);
                assert_eq!(grid.velocity[1][(i, j)], 0.);
                assert_eq!(grid.density[(i, j)], 0.);
            }
        }
        assert_eq!(grid.obstacle_count(), 25);
    }

    #[test]
    fn test_tracer_follows_constant_flow() {
        let (u, v) = (2.0, -0.5);
        let grid = FluidGrid::new(10, 10).unwrap();
        let mut sim = Smoke::new(
            grid,
            SmokeParams {
                inflow_speed: u,
                ..params()
            },
            Tracer::new(4.3, 4.6),
            1,
        )
        .unwrap();

        sim.grid_mut().velocity = [
            DMatrix::from_element(10, 10, u),
            DMatrix::from_element(10, 10, v),
        ];

        sim.step(&[]).unwrap();

        let tracer = sim.tracer();
        assert!((tracer.y - (4.3 + v * 0.1)).abs() < 1e-4);
        assert!((tracer.x - (4.6 + u * 0.1)).abs() < 1e-4);
    }

    #[test]
    fn test_tracer_frozen_at_edge() {
        let grid = FluidGrid::new(10, 10).unwrap();
        let mut sim = Smoke::new(grid, params(), Tracer::new(5., 0.5), 1).unwrap();

        for _ in 0..5 {
            sim.step(&[]).unwrap();
        }

        assert_eq!(sim.tracer(), Tracer::new(5., 0.5));
    }

    #[test]
    fn test_invariants_hold_under_random_edits() {
        let mut rng = rand::rng();
        let n = 24;
        let mut sim = smoke(n);

        for _ in 0..40 {
            let mut edits = Vec::new();
            if rng.random_bool(0.3) {
                let (r, c) = (rng.random_range(2..n - 2), rng.random_range(2..n - 2));
                edits.push(Edit::Obstacle(CellRegion::square(r as isize, c as isize, 5)));
            }
            if rng.random_bool(0.5) {
                let (r, c) = (rng.random_range(0..n), rng.random_range(0..n));
                edits.push(Edit::Impulse {
                    region: CellRegion::square(r as isize, c as isize, 3),
                    u: rng.random_range(-4.0..4.0),
                    v: rng.random_range(-4.0..4.0),
                });
            }

            sim.step(&edits).unwrap();

            let grid = sim.grid();
            assert!(grid.density.iter().all(|d| (0. ..=1.).contains(d)));
            for (k, blocked) in grid.obstacles.iter().enumerate() {
                if *blocked {
                    assert_eq!(grid.velocity[0].as_slice()[k], 0.);
                    assert_eq!(grid.velocity[1].as_slice()[k], 0.);
                    assert_eq!(grid.density.as_slice()[k], 0.);
                }
            }
        }
    }

    #[test]
    fn test_non_finite_state_aborts_step() {
        let mut sim = smoke(10);
        sim.grid_mut().velocity[0][(3, 3)] = f32::INFINITY;

        assert_eq!(
            sim.step(&[]),
            Err(SimError::NonFinite { field: "u" })
        );
        assert_eq!(sim.iteration(), 0);
    }

    #[test]
    fn test_faulted_step_leaves_state_untouched() {
        let mut sim = smoke(12);

        // finite, but the pressure gradient across the sign flip overflows
        sim.grid_mut().velocity[1] =
            DMatrix::from_fn(12, 12, |i, _| if i < 6 { f32::MAX } else { -f32::MAX });
        let before = sim.grid().clone();

        let result = sim.step(&[
            Edit::Obstacle(CellRegion::square(6, 8, 3)),
            Edit::Impulse {
                region: CellRegion::square(3, 3, 3),
                u: 1.,
                v: 0.,
            },
        ]);

        assert_eq!(result, Err(SimError::NonFinite { field: "velocity" }));
        assert_eq!(sim.grid().obstacle_count(), 0);
        assert_eq!(sim.grid().density, before.density);
        assert_eq!(sim.grid().velocity, before.velocity);
        assert_eq!(sim.tracer(), Tracer::new(6., 5.));
        assert_eq!(sim.iteration(), 0);
        assert_eq!(sim.time(), 0.);
    }

    /// Smooth, non-uniform starting velocity. The inflow band already holds
    /// the inflow speed so the step's inflow stage leaves it unchanged.
    fn swirl(n: usize) -> VectorField {
        let (start, end) = params().inflow_columns;
        [
            DMatrix::from_fn(n, n, |i, j| {
                if (start..end).contains(&j) {
                    params().inflow_speed
                } else {
                    0.8 + 0.6 * (i as f32 * 0.7).sin()
                }
            }),
            DMatrix::from_fn(n, n, |i, j| 0.5 * (j as f32 * 0.9).cos() - 0.1 * i as f32),
        ]
    }

    #[test]
    fn test_v_is_advected_by_the_new_u() {
        let n = 14;
        let step_params = SmokeParams {
            viscosity: 0.05,
            ..params()
        };
        let mut sim = Smoke::new(
            FluidGrid::new(n, n).unwrap(),
            step_params,
            Tracer::new(7., 5.),
            1,
        )
        .unwrap();
        sim.grid_mut().velocity = swirl(n);

        let [u0, v0] = swirl(n);
        let open = DMatrix::from_element(n, n, false);
        let dt = step_params.dt;

        let finish = |u: ScalarField, v: ScalarField| {
            let mut velocity = [
                diffuse(&u, step_params.viscosity, dt),
                diffuse(&v, step_params.viscosity, dt),
            ];
            poisson::project(&mut velocity, step_params.pressure_iterations);
            apply_obstacles(&mut velocity, &open);
            velocity
        };

        let u_new = advect(&u0, &u0, &v0, &open, dt);
        let expected = finish(u_new.clone(), advect(&v0, &u_new, &v0, &open, dt));
        let stale = finish(u_new, advect(&v0, &u0, &v0, &open, dt));
        assert_ne!(expected[1], stale[1]);

        sim.step(&[]).unwrap();

        assert_eq!(sim.grid().velocity[0], expected[0]);
        assert_eq!(sim.grid().velocity[1], expected[1]);
    }

    #[test]
    fn test_tracer_samples_the_advected_velocity() {
        let n = 14;
        let start = Tracer::new(6.3, 7.4);
        let step_params = SmokeParams {
            viscosity: 0.05,
            ..params()
        };
        let mut sim = Smoke::new(FluidGrid::new(n, n).unwrap(), step_params, start, 1).unwrap();
        sim.grid_mut().velocity = swirl(n);

        let [u0, v0] = swirl(n);
        let open = DMatrix::from_element(n, n, false);
        let dt = step_params.dt;

        let u_new = advect(&u0, &u0, &v0, &open, dt);
        let v_new = advect(&v0, &u_new, &v0, &open, dt);

        let mut expected = start;
        assert!(expected.advance(&[u_new, v_new], dt));

        sim.step(&[]).unwrap();
        assert_eq!(sim.tracer(), expected);

        // the committed (diffused and projected) field moves it elsewhere
        let mut late = start;
        late.advance(&sim.grid().velocity, dt);
        assert_ne!(late, expected);
    }

    #[test]
    fn test_frame_reflects_state() {
        let mut sim = smoke(12);
        sim.step(&[Edit::Obstacle(CellRegion::square(6, 6, 1))])
            .unwrap();

        let frame = sim.frame();
        assert_eq!(frame.index, 1);
        assert_eq!(frame.scale, 4);
        assert!(frame.obstacles[(6, 6)]);
        assert_eq!(frame.tracer, sim.tracer());
    }
}
