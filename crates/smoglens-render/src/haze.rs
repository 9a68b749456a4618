//! Procedural haze math
//!
//! CPU twin of `shaders/haze.wgsl`. The software compositor shades with
//! these functions directly; keep both in step when either changes.
//!
//! Coordinates are normalized with `uv.y = 0` at the bottom of the frame.

use glam::{Mat2, Vec2, Vec3};

/// Upper bound on per-pixel haze density
pub const MAX_DENSITY: f32 = 0.85;

const FBM_OCTAVES: usize = 4;
const FBM_SHIFT: Vec2 = Vec2::splat(100.0);
const LUMA: Vec3 = Vec3::new(0.299, 0.587, 0.114);

fn fract(v: f32) -> f32 {
    v - v.floor()
}

fn fract2(v: Vec2) -> Vec2 {
    v - v.floor()
}

fn mix(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

fn mix3(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    a * (1.0 - t) + b * t
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn hash(p: Vec2) -> f32 {
    let mut p = fract2(p * Vec2::new(123.34, 456.21));
    p += Vec2::splat(p.dot(p + Vec2::splat(45.32)));
    fract(p.x * p.y)
}

/// Value noise with cubic-smoothed lattice interpolation, in `[0, 1]`
pub fn value_noise(p: Vec2) -> f32 {
    let i = p.floor();
    let f = fract2(p);

    let a = hash(i);
    let b = hash(i + Vec2::new(1.0, 0.0));
    let c = hash(i + Vec2::new(0.0, 1.0));
    let d = hash(i + Vec2::new(1.0, 1.0));

    let u = f * f * (Vec2::splat(3.0) - 2.0 * f);
    mix(a, b, u.x) + (c - a) * u.y * (1.0 - u.x) + (d - b) * u.x * u.y
}

/// Four octaves of rotated value noise
pub fn fbm(mut p: Vec2) -> f32 {
    let rot = Mat2::from_cols(
        Vec2::new(0.5f32.cos(), 0.5f32.sin()),
        Vec2::new(-(0.5f32.sin()), 0.5f32.cos()),
    );

    let mut v = 0.0;
    let mut a = 0.5;
    for _ in 0..FBM_OCTAVES {
        v += a * value_noise(p);
        p = rot * p * 2.0 + FBM_SHIFT;
        a *= 0.5;
    }
    v
}

/// Three domain-warped fbm layers drifting at different speeds
pub fn layered_noise(uv: Vec2, time: f32) -> f32 {
    let p1 = uv * 3.0 + Vec2::new(time * 0.02, time * 0.01);
    let p2 = uv * 5.0 - Vec2::new(time * 0.015, time * 0.025);
    let p3 = uv * 8.0 + Vec2::new(time * 0.008, -time * 0.012);

    let n1 = fbm(p1);
    let n2 = fbm(p2 + Vec2::splat(n1 * 0.5));
    let n3 = fbm(p3 + Vec2::splat(n2 * 0.3));

    n1 * 0.5 + n2 * 0.35 + n3 * 0.15
}

/// 0.4 at the bottom edge, ramping to 1.0 at 70% height
pub fn height_gradient(y: f32) -> f32 {
    0.4 + 0.6 * smoothstep(0.0, 0.7, y)
}

/// Haze density at `uv`, clamped to [`MAX_DENSITY`]
pub fn haze_density(uv: Vec2, time: f32, intensity: f32) -> f32 {
    let base = intensity * height_gradient(uv.y);
    let noisy = base * (0.6 + layered_noise(uv, time) * 0.4);
    noisy.clamp(0.0, MAX_DENSITY)
}

/// Tint, then desaturate, then flatten contrast
pub fn shade(src: Vec3, tint: Vec3, density: f32) -> Vec3 {
    let mut color = mix3(src, tint, density);

    let luminance = color.dot(LUMA);
    color = mix3(color, Vec3::splat(luminance), density * 0.5);

    mix3(color, Vec3::splat(0.5), density * 0.15)
}
