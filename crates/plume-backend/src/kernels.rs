//! Reference kernel math on host slices.
//!
//! Every function here is one full pass over `out`, computing each output
//! cell independently from the read-only inputs. Passes run with rayon.
//!
//! Neighbour lookups clamp to the grid edge unless stated otherwise.

use glam::{IVec3, UVec3, Vec3};
use rayon::prelude::*;
use std::ops::{Add, Mul, Sub};

/// Epsilon added to the vorticity gradient length before normalising.
pub const CONFINEMENT_EPSILON: f32 = 1e-5;

/// A per-cell value a quantity kernel can operate on.
pub trait Cell:
    Copy + Send + Sync + Add<Output = Self> + Sub<Output = Self> + Mul<f32, Output = Self>
{
    /// Builds a value from a per-component target (scalars take `x`).
    fn from_components(v: Vec3) -> Self;
    /// Component-wise minimum.
    fn component_min(self, other: Self) -> Self;
    /// Component-wise maximum.
    fn component_max(self, other: Self) -> Self;
}

impl Cell for f32 {
    fn from_components(v: Vec3) -> Self {
        v.x
    }

    fn component_min(self, other: Self) -> Self {
        self.min(other)
    }

    fn component_max(self, other: Self) -> Self {
        self.max(other)
    }
}

impl Cell for Vec3 {
    fn from_components(v: Vec3) -> Self {
        v
    }

    fn component_min(self, other: Self) -> Self {
        self.min(other)
    }

    fn component_max(self, other: Self) -> Self {
        self.max(other)
    }
}

/// Shape of a cell grid with `z`-major, `x`-minor storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Grid {
    dims: UVec3,
}

impl Grid {
    /// Creates a grid of the given extent.
    pub fn new(dims: UVec3) -> Self {
        Self { dims }
    }

    /// Grid extent.
    pub fn dims(&self) -> UVec3 {
        self.dims
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.dims.x as usize * self.dims.y as usize * self.dims.z as usize
    }

    /// True if any axis has zero extent.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Linear index of a cell.
    pub fn index(&self, cell: UVec3) -> usize {
        let w = self.dims.x as usize;
        let h = self.dims.y as usize;
        cell.z as usize * w * h + cell.y as usize * w + cell.x as usize
    }

    /// Cell coordinates of a linear index.
    pub fn coords(&self, index: usize) -> UVec3 {
        let w = self.dims.x as usize;
        let h = self.dims.y as usize;
        UVec3::new(
            (index % w) as u32,
            ((index / w) % h) as u32,
            (index / (w * h)) as u32,
        )
    }

    /// Whether a signed coordinate lies inside the grid.
    pub fn contains(&self, cell: IVec3) -> bool {
        cell.cmpge(IVec3::ZERO).all() && cell.cmplt(self.dims.as_ivec3()).all()
    }

    /// Linear index of a signed coordinate clamped onto the grid.
    pub fn clamped_index(&self, cell: IVec3) -> usize {
        let max = self.dims.as_ivec3() - IVec3::ONE;
        self.index(cell.clamp(IVec3::ZERO, max).as_uvec3())
    }

    fn max_position(&self) -> Vec3 {
        (self.dims.as_vec3() - Vec3::ONE).max(Vec3::ZERO)
    }

    /// The 8 cells surrounding `pos` (clamped) and the interpolation weights.
    fn corners(&self, pos: Vec3) -> ([usize; 8], Vec3) {
        let pos = pos.clamp(Vec3::ZERO, self.max_position());
        let max = self.dims.as_ivec3() - IVec3::ONE;
        let lo = pos.floor().as_ivec3().min(max);
        let hi = (lo + IVec3::ONE).min(max);
        let t = pos - lo.as_vec3();
        let at = |x: i32, y: i32, z: i32| self.index(UVec3::new(x as u32, y as u32, z as u32));
        (
            [
                at(lo.x, lo.y, lo.z),
                at(hi.x, lo.y, lo.z),
                at(lo.x, hi.y, lo.z),
                at(hi.x, hi.y, lo.z),
                at(lo.x, lo.y, hi.z),
                at(hi.x, lo.y, hi.z),
                at(lo.x, hi.y, hi.z),
                at(hi.x, hi.y, hi.z),
            ],
            t,
        )
    }
}

fn lerp<T: Cell>(a: T, b: T, t: f32) -> T {
    a + (b - a) * t
}

/// Trilinearly samples `field` at `pos`, clamped to the grid.
pub fn trilinear<T: Cell>(grid: Grid, field: &[T], pos: Vec3) -> T {
    let (c, t) = grid.corners(pos);
    let c00 = lerp(field[c[0]], field[c[1]], t.x);
    let c10 = lerp(field[c[2]], field[c[3]], t.x);
    let c01 = lerp(field[c[4]], field[c[5]], t.x);
    let c11 = lerp(field[c[6]], field[c[7]], t.x);
    lerp(lerp(c00, c10, t.y), lerp(c01, c11, t.y), t.z)
}

/// Component-wise `(min, max)` of the 8 cells `trilinear` would blend at `pos`.
pub fn neighborhood_bounds<T: Cell>(grid: Grid, field: &[T], pos: Vec3) -> (T, T) {
    let (c, _) = grid.corners(pos);
    let first = field[c[0]];
    c[1..].iter().fold((first, first), |(lo, hi), &i| {
        (lo.component_min(field[i]), hi.component_max(field[i]))
    })
}

fn for_each_cell<T: Send>(grid: Grid, out: &mut [T], f: impl Fn(UVec3, usize) -> T + Sync) {
    out.par_iter_mut()
        .enumerate()
        .for_each(|(i, o)| *o = f(grid.coords(i), i));
}

/// `out = dissipation * source(cell - dt * v(cell))`.
pub fn advect_forward<T: Cell>(
    grid: Grid,
    time_step: f32,
    dissipation: f32,
    velocity: &[Vec3],
    source: &[T],
    out: &mut [T],
) {
    for_each_cell(grid, out, |cell, i| {
        let pos = cell.as_vec3() - time_step * velocity[i];
        trilinear(grid, source, pos) * dissipation
    });
}

/// `out = source(cell + dt * v(cell))`.
pub fn advect_backward<T: Cell>(
    grid: Grid,
    time_step: f32,
    velocity: &[Vec3],
    source: &[T],
    out: &mut [T],
) {
    for_each_cell(grid, out, |cell, i| {
        let pos = cell.as_vec3() + time_step * velocity[i];
        trilinear(grid, source, pos)
    });
}

/// MacCormack correction of a forward advection.
///
/// `forward` is the forward-advected field, `backward` is `forward` traced
/// back again and `original` is the field before advection. The corrected
/// value is clamped to what the forward pass could have produced at this
/// cell, so the scheme never creates new extrema.
#[allow(clippy::too_many_arguments)]
pub fn maccormack<T: Cell>(
    grid: Grid,
    time_step: f32,
    dissipation: f32,
    velocity: &[Vec3],
    original: &[T],
    forward: &[T],
    backward: &[T],
    out: &mut [T],
) {
    for_each_cell(grid, out, |cell, i| {
        let pos = cell.as_vec3() - time_step * velocity[i];
        let (lo, hi) = neighborhood_bounds(grid, original, pos);
        let corrected = forward[i] + (original[i] - backward[i]) * 0.5;
        corrected
            .component_max(lo * dissipation)
            .component_min(hi * dissipation)
    });
}

/// Blends cells within `radius` of `point` towards `amount` with `exp(-d²)` falloff.
pub fn impulse<T: Cell>(
    grid: Grid,
    point: Vec3,
    amount: Vec3,
    radius: f32,
    source: &[T],
    out: &mut [T],
) {
    let target = T::from_components(amount);
    for_each_cell(grid, out, |cell, i| {
        let d = cell.as_vec3().distance(point);
        let v = source[i];
        if d < radius {
            v + (target - v) * (-d * d).exp()
        } else {
            v
        }
    });
}

/// Adds `dt * ((T - ambient) * buoyancy - density * weight)` to `v.y`.
#[allow(clippy::too_many_arguments)]
pub fn buoyancy(
    grid: Grid,
    time_step: f32,
    buoyancy: f32,
    smoke_weight: f32,
    ambient_temperature: f32,
    velocity: &[Vec3],
    temperature: &[f32],
    density: &[f32],
    out: &mut [Vec3],
) {
    for_each_cell(grid, out, |_, i| {
        let lift = (temperature[i] - ambient_temperature) * buoyancy - density[i] * smoke_weight;
        velocity[i] + Vec3::Y * (time_step * lift)
    });
}

fn central<T: Cell>(grid: Grid, field: &[T], cell: IVec3, axis: IVec3) -> T {
    (field[grid.clamped_index(cell + axis)] - field[grid.clamped_index(cell - axis)]) * 0.5
}

/// Curl of `velocity` by central differences.
pub fn vorticity(grid: Grid, velocity: &[Vec3], out: &mut [Vec3]) {
    for_each_cell(grid, out, |cell, _| {
        let c = cell.as_ivec3();
        let dx = central(grid, velocity, c, IVec3::X);
        let dy = central(grid, velocity, c, IVec3::Y);
        let dz = central(grid, velocity, c, IVec3::Z);
        Vec3::new(dy.z - dz.y, dz.x - dx.z, dx.y - dy.x)
    });
}

/// Adds `dt * strength * (N × ω)` where `N` points up the `|ω|` gradient.
pub fn confinement(
    grid: Grid,
    time_step: f32,
    strength: f32,
    velocity: &[Vec3],
    vorticity: &[Vec3],
    out: &mut [Vec3],
) {
    let magnitude = |c: IVec3| vorticity[grid.clamped_index(c)].length();
    for_each_cell(grid, out, |cell, i| {
        let c = cell.as_ivec3();
        let eta = Vec3::new(
            magnitude(c + IVec3::X) - magnitude(c - IVec3::X),
            magnitude(c + IVec3::Y) - magnitude(c - IVec3::Y),
            magnitude(c + IVec3::Z) - magnitude(c - IVec3::Z),
        ) * 0.5;
        let n = eta / (eta.length() + CONFINEMENT_EPSILON);
        velocity[i] + n.cross(vorticity[i]) * (time_step * strength)
    });
}

/// Normal velocity component across a closed wall: mirrored outside the grid.
fn wall_component(grid: Grid, velocity: &[Vec3], cell: IVec3, neighbor: IVec3, axis: usize) -> f32 {
    if grid.contains(neighbor) {
        velocity[grid.clamped_index(neighbor)][axis]
    } else {
        -velocity[grid.clamped_index(cell)][axis]
    }
}

/// Central-difference divergence with closed domain walls.
pub fn divergence(grid: Grid, velocity: &[Vec3], out: &mut [f32]) {
    for_each_cell(grid, out, |cell, _| {
        let c = cell.as_ivec3();
        let axes = [IVec3::X, IVec3::Y, IVec3::Z];
        let sum: f32 = axes
            .iter()
            .enumerate()
            .map(|(axis, &step)| {
                wall_component(grid, velocity, c, c + step, axis)
                    - wall_component(grid, velocity, c, c - step, axis)
            })
            .sum();
        0.5 * sum
    });
}

/// One Jacobi relaxation: `(Σ neighbours - div) / 6`.
pub fn jacobi(grid: Grid, pressure: &[f32], divergence: &[f32], out: &mut [f32]) {
    for_each_cell(grid, out, |cell, i| {
        let c = cell.as_ivec3();
        let p = |n: IVec3| pressure[grid.clamped_index(n)];
        let sum = p(c + IVec3::X)
            + p(c - IVec3::X)
            + p(c + IVec3::Y)
            + p(c - IVec3::Y)
            + p(c + IVec3::Z)
            + p(c - IVec3::Z);
        (sum - divergence[i]) / 6.0
    });
}

/// `v -= ∇p` by central differences.
pub fn subtract_gradient(grid: Grid, velocity: &[Vec3], pressure: &[f32], out: &mut [Vec3]) {
    for_each_cell(grid, out, |cell, i| {
        let c = cell.as_ivec3();
        let gradient = Vec3::new(
            central(grid, pressure, c, IVec3::X),
            central(grid, pressure, c, IVec3::Y),
            central(grid, pressure, c, IVec3::Z),
        );
        velocity[i] - gradient
    });
}
