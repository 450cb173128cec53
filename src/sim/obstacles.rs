// Obstacle constraint enforcement

use crate::{ObstacleMask, ScalarField, VectorField};

/// Zero a field wherever the mask is set
pub fn zero_where_mask(field: &mut ScalarField, mask: &ObstacleMask) {
    for (value, blocked) in field.iter_mut().zip(mask.iter()) {
        if *blocked {
            *value = 0.;
        }
    }
}

/// Stop all flow inside obstacle cells. Runs after projection, so obstacles
/// act as no-slip, no-flow cells that the pressure solve never sees.
pub fn apply_obstacles(velocity: &mut VectorField, mask: &ObstacleMask) {
    zero_where_mask(&mut velocity[0], mask);
    zero_where_mask(&mut velocity[1], mask);
}
