//! WGSL source for every kernel.
//!
//! All kernels share one bind group layout:
//!
//! | binding | resource |
//! |---|---|
//! | 0 | general parameters (uniform) |
//! | 1 | advection parameters (uniform) |
//! | 2 | impulse parameters (uniform) |
//! | 3..=6 | inputs, in dispatch order (read-only storage) |
//! | 7 | output (read-write storage) |
//!
//! Every cell is a `vec4<f32>`. Scalar fields live in `.x` and the other
//! lanes are ignored.

/// Threads per workgroup along each axis.
pub const WORKGROUP_SIZE: u32 = 4;

/// Number of input storage bindings.
pub const INPUT_BINDINGS: u32 = 4;

pub(crate) const KERNELS: &str = r#"
struct General {
    dimensions: vec4<u32>,
    time_step: f32,
    buoyancy: f32,
    smoke_weight: f32,
    ambient_temperature: f32,
    vorticity_strength: f32,
    _pad0: f32,
    _pad1: f32,
    _pad2: f32,
}

struct Advection {
    dissipation: f32,
    _pad0: f32,
    _pad1: f32,
    _pad2: f32,
}

struct Impulse {
    point: vec4<f32>,
    amount: vec4<f32>,
    radius: f32,
    _pad0: f32,
    _pad1: f32,
    _pad2: f32,
}

@group(0) @binding(0) var<uniform> general: General;
@group(0) @binding(1) var<uniform> advection: Advection;
@group(0) @binding(2) var<uniform> impulse_params: Impulse;
@group(0) @binding(3) var<storage, read> in0: array<vec4<f32>>;
@group(0) @binding(4) var<storage, read> in1: array<vec4<f32>>;
@group(0) @binding(5) var<storage, read> in2: array<vec4<f32>>;
@group(0) @binding(6) var<storage, read> in3: array<vec4<f32>>;
@group(0) @binding(7) var<storage, read_write> dst: array<vec4<f32>>;

const CONFINEMENT_EPSILON: f32 = 1e-5;

fn dims() -> vec3<i32> {
    return vec3<i32>(general.dimensions.xyz);
}

fn outside(id: vec3<u32>) -> bool {
    return any(id >= general.dimensions.xyz);
}

fn index(c: vec3<i32>) -> u32 {
    let d = dims();
    return u32(c.z * d.x * d.y + c.y * d.x + c.x);
}

fn clamped(c: vec3<i32>) -> u32 {
    return index(clamp(c, vec3<i32>(0), dims() - vec3<i32>(1)));
}

fn inside(c: vec3<i32>) -> bool {
    return all(c >= vec3<i32>(0)) && all(c < dims());
}

struct Corners {
    i: array<u32, 8>,
    t: vec3<f32>,
}

fn corners(p: vec3<f32>) -> Corners {
    let top = dims() - vec3<i32>(1);
    let pos = clamp(p, vec3<f32>(0.0), vec3<f32>(max(top, vec3<i32>(0))));
    let lo = min(vec3<i32>(floor(pos)), top);
    let hi = min(lo + vec3<i32>(1), top);
    var c: Corners;
    c.i[0] = index(vec3<i32>(lo.x, lo.y, lo.z));
    c.i[1] = index(vec3<i32>(hi.x, lo.y, lo.z));
    c.i[2] = index(vec3<i32>(lo.x, hi.y, lo.z));
    c.i[3] = index(vec3<i32>(hi.x, hi.y, lo.z));
    c.i[4] = index(vec3<i32>(lo.x, lo.y, hi.z));
    c.i[5] = index(vec3<i32>(hi.x, lo.y, hi.z));
    c.i[6] = index(vec3<i32>(lo.x, hi.y, hi.z));
    c.i[7] = index(vec3<i32>(hi.x, hi.y, hi.z));
    c.t = pos - vec3<f32>(lo);
    return c;
}

fn gather_in1(c: Corners) -> array<vec4<f32>, 8> {
    return array<vec4<f32>, 8>(
        in1[c.i[0]], in1[c.i[1]], in1[c.i[2]], in1[c.i[3]],
        in1[c.i[4]], in1[c.i[5]], in1[c.i[6]], in1[c.i[7]],
    );
}

fn gather_in3(c: Corners) -> array<vec4<f32>, 8> {
    return array<vec4<f32>, 8>(
        in3[c.i[0]], in3[c.i[1]], in3[c.i[2]], in3[c.i[3]],
        in3[c.i[4]], in3[c.i[5]], in3[c.i[6]], in3[c.i[7]],
    );
}

fn trilinear(v: array<vec4<f32>, 8>, t: vec3<f32>) -> vec4<f32> {
    let c00 = mix(v[0], v[1], t.x);
    let c10 = mix(v[2], v[3], t.x);
    let c01 = mix(v[4], v[5], t.x);
    let c11 = mix(v[6], v[7], t.x);
    return mix(mix(c00, c10, t.y), mix(c01, c11, t.y), t.z);
}

fn lower(v: array<vec4<f32>, 8>) -> vec4<f32> {
    return min(min(min(v[0], v[1]), min(v[2], v[3])), min(min(v[4], v[5]), min(v[6], v[7])));
}

fn upper(v: array<vec4<f32>, 8>) -> vec4<f32> {
    return max(max(max(v[0], v[1]), max(v[2], v[3])), max(max(v[4], v[5]), max(v[6], v[7])));
}

@compute @workgroup_size(4, 4, 4)
fn advect_forward(@builtin(global_invocation_id) id: vec3<u32>) {
    if (outside(id)) { return; }
    let c = vec3<i32>(id);
    let i = index(c);
    let pos = vec3<f32>(c) - general.time_step * in0[i].xyz;
    let c8 = corners(pos);
    dst[i] = trilinear(gather_in1(c8), c8.t) * advection.dissipation;
}

@compute @workgroup_size(4, 4, 4)
fn advect_backward(@builtin(global_invocation_id) id: vec3<u32>) {
    if (outside(id)) { return; }
    let c = vec3<i32>(id);
    let i = index(c);
    let pos = vec3<f32>(c) + general.time_step * in0[i].xyz;
    let c8 = corners(pos);
    dst[i] = trilinear(gather_in1(c8), c8.t);
}

// in0 velocity, in1 forward, in2 backward, in3 original
@compute @workgroup_size(4, 4, 4)
fn maccormack(@builtin(global_invocation_id) id: vec3<u32>) {
    if (outside(id)) { return; }
    let c = vec3<i32>(id);
    let i = index(c);
    let pos = vec3<f32>(c) - general.time_step * in0[i].xyz;
    let source = gather_in3(corners(pos));
    let lo = lower(source) * advection.dissipation;
    let hi = upper(source) * advection.dissipation;
    let r = in1[i] + (in3[i] - in2[i]) * 0.5;
    dst[i] = min(max(r, lo), hi);
}

@compute @workgroup_size(4, 4, 4)
fn impulse(@builtin(global_invocation_id) id: vec3<u32>) {
    if (outside(id)) { return; }
    let c = vec3<i32>(id);
    let i = index(c);
    let d = distance(vec3<f32>(c), impulse_params.point.xyz);
    let v = in0[i];
    if (d < impulse_params.radius) {
        dst[i] = v + (impulse_params.amount - v) * exp(-d * d);
    } else {
        dst[i] = v;
    }
}

// in0 velocity, in1 temperature, in2 density
@compute @workgroup_size(4, 4, 4)
fn buoyancy(@builtin(global_invocation_id) id: vec3<u32>) {
    if (outside(id)) { return; }
    let i = index(vec3<i32>(id));
    let lift = (in1[i].x - general.ambient_temperature) * general.buoyancy
        - in2[i].x * general.smoke_weight;
    var v = in0[i];
    v.y = v.y + general.time_step * lift;
    dst[i] = v;
}

fn central_in0(c: vec3<i32>, axis: vec3<i32>) -> vec4<f32> {
    return (in0[clamped(c + axis)] - in0[clamped(c - axis)]) * 0.5;
}

@compute @workgroup_size(4, 4, 4)
fn vorticity(@builtin(global_invocation_id) id: vec3<u32>) {
    if (outside(id)) { return; }
    let c = vec3<i32>(id);
    let dx = central_in0(c, vec3<i32>(1, 0, 0));
    let dy = central_in0(c, vec3<i32>(0, 1, 0));
    let dz = central_in0(c, vec3<i32>(0, 0, 1));
    dst[index(c)] = vec4<f32>(dy.z - dz.y, dz.x - dx.z, dx.y - dy.x, 0.0);
}

fn curl_length(c: vec3<i32>) -> f32 {
    return length(in1[clamped(c)].xyz);
}

// in0 velocity, in1 vorticity
@compute @workgroup_size(4, 4, 4)
fn confinement(@builtin(global_invocation_id) id: vec3<u32>) {
    if (outside(id)) { return; }
    let c = vec3<i32>(id);
    let i = index(c);
    let eta = vec3<f32>(
        curl_length(c + vec3<i32>(1, 0, 0)) - curl_length(c - vec3<i32>(1, 0, 0)),
        curl_length(c + vec3<i32>(0, 1, 0)) - curl_length(c - vec3<i32>(0, 1, 0)),
        curl_length(c + vec3<i32>(0, 0, 1)) - curl_length(c - vec3<i32>(0, 0, 1)),
    ) * 0.5;
    let n = eta / (length(eta) + CONFINEMENT_EPSILON);
    let force = cross(n, in1[i].xyz) * (general.time_step * general.vorticity_strength);
    dst[i] = in0[i] + vec4<f32>(force, 0.0);
}

// Closed walls: the normal component is mirrored outside the grid.
fn wall(c: vec3<i32>, n: vec3<i32>, axis: u32) -> f32 {
    if (inside(n)) {
        return in0[index(n)][axis];
    }
    return -in0[index(c)][axis];
}

@compute @workgroup_size(4, 4, 4)
fn divergence(@builtin(global_invocation_id) id: vec3<u32>) {
    if (outside(id)) { return; }
    let c = vec3<i32>(id);
    let x = vec3<i32>(1, 0, 0);
    let y = vec3<i32>(0, 1, 0);
    let z = vec3<i32>(0, 0, 1);
    let sum = (wall(c, c + x, 0u) - wall(c, c - x, 0u))
        + (wall(c, c + y, 1u) - wall(c, c - y, 1u))
        + (wall(c, c + z, 2u) - wall(c, c - z, 2u));
    dst[index(c)] = vec4<f32>(0.5 * sum, 0.0, 0.0, 0.0);
}

// in0 pressure, in1 divergence
@compute @workgroup_size(4, 4, 4)
fn jacobi(@builtin(global_invocation_id) id: vec3<u32>) {
    if (outside(id)) { return; }
    let c = vec3<i32>(id);
    let sum = in0[clamped(c + vec3<i32>(1, 0, 0))].x
        + in0[clamped(c - vec3<i32>(1, 0, 0))].x
        + in0[clamped(c + vec3<i32>(0, 1, 0))].x
        + in0[clamped(c - vec3<i32>(0, 1, 0))].x
        + in0[clamped(c + vec3<i32>(0, 0, 1))].x
        + in0[clamped(c - vec3<i32>(0, 0, 1))].x;
    let i = index(c);
    dst[i] = vec4<f32>((sum - in1[i].x) / 6.0, 0.0, 0.0, 0.0);
}

fn pressure(c: vec3<i32>) -> f32 {
    return in1[clamped(c)].x;
}

// in0 velocity, in1 pressure
@compute @workgroup_size(4, 4, 4)
fn subtract_gradient(@builtin(global_invocation_id) id: vec3<u32>) {
    if (outside(id)) { return; }
    let c = vec3<i32>(id);
    let i = index(c);
    let gradient = vec3<f32>(
        pressure(c + vec3<i32>(1, 0, 0)) - pressure(c - vec3<i32>(1, 0, 0)),
        pressure(c + vec3<i32>(0, 1, 0)) - pressure(c - vec3<i32>(0, 1, 0)),
        pressure(c + vec3<i32>(0, 0, 1)) - pressure(c - vec3<i32>(0, 0, 1)),
    ) * 0.5;
    dst[i] = in0[i] - vec4<f32>(gradient, 0.0);
}
"#;
