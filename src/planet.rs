//! Procedural planet portraits painted into the braille sub-pixel canvas.
//!
//! Sub-pixels are close to square on a typical terminal font, so the disc
//! needs no aspect correction here.

use crate::catalog::PlanetImage;
use crate::render::{Pixel, PixelCanvas};

type Rgb = [u8; 3];

const CRACK_WHITE: Rgb = [235, 250, 255];
const NIGHT: Rgb = [8, 10, 14];

fn clamp01(x: f32) -> f32 {
    x.clamp(0.0, 1.0)
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn mix(a: Rgb, b: Rgb, t: f32) -> Rgb {
    let t = clamp01(t);
    let ch = |x: u8, y: u8| lerp(x as f32, y as f32, t).round().clamp(0.0, 255.0) as u8;
    [ch(a[0], b[0]), ch(a[1], b[1]), ch(a[2], b[2])]
}

fn hash_u32(mut x: u32) -> u32 {
    x ^= x >> 16;
    x = x.wrapping_mul(0x7feb_352d);
    x ^= x >> 15;
    x = x.wrapping_mul(0x846c_a68b);
    x ^= x >> 16;
    x
}

fn hash3(ix: i32, iy: i32, iz: i32, seed: u32) -> u32 {
    let mut h = seed ^ 0x9e37_79b9;
    h ^= (ix as u32).wrapping_mul(0x85eb_ca6b);
    h = hash_u32(h);
    h ^= (iy as u32).wrapping_mul(0xc2b2_ae35);
    h = hash_u32(h);
    h ^= (iz as u32).wrapping_mul(0x27d4_eb2f);
    hash_u32(h)
}

fn smoothstep(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

fn value_noise(x: f32, y: f32, z: f32, seed: u32) -> f32 {
    let (ix, iy, iz) = (x.floor() as i32, y.floor() as i32, z.floor() as i32);
    let sx = smoothstep(x - ix as f32);
    let sy = smoothstep(y - iy as f32);
    let sz = smoothstep(z - iz as f32);
    let v = |dx, dy, dz| hash3(ix + dx, iy + dy, iz + dz, seed) as f32 / u32::MAX as f32;

    let y0 = lerp(lerp(v(0, 0, 0), v(1, 0, 0), sx), lerp(v(0, 1, 0), v(1, 1, 0), sx), sy);
    let y1 = lerp(lerp(v(0, 0, 1), v(1, 0, 1), sx), lerp(v(0, 1, 1), v(1, 1, 1), sx), sy);
    lerp(y0, y1, sz)
}

/// Fractal value noise in 0..1.
pub(crate) fn fbm(x: f32, y: f32, z: f32, seed: u32, octaves: usize) -> f32 {
    let (mut amp, mut freq, mut sum, mut norm) = (0.55, 1.0, 0.0, 0.0);
    for o in 0..octaves {
        let s = seed.wrapping_add((o as u32).wrapping_mul(0x9e37_79b9));
        sum += (value_noise(x * freq, y * freq, z * freq, s) * 2.0 - 1.0) * amp;
        norm += amp;
        amp *= 0.52;
        freq *= 2.03;
    }
    clamp01(0.5 + 0.5 * (sum / f32::max(norm, 1e-6)))
}

/// 2x4 ordered dither matched to the braille cell.
fn bayer(ix: i32, iy: i32) -> f32 {
    const M: [[u8; 2]; 4] = [[0, 4], [6, 2], [1, 5], [7, 3]];
    (M[(iy & 3) as usize][(ix & 1) as usize] as f32 + 0.5) / 8.0
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Placement {
    pub(crate) cx: f32,
    pub(crate) cy: f32,
    pub(crate) radius: f32,
    pub(crate) rotation: f32,
    pub(crate) tilt: f32,
    /// 0..1, multiplies every painted pixel.
    pub(crate) opacity: f32,
}

pub(crate) fn draw_planet(canvas: &mut PixelCanvas, image: &PlanetImage, at: Placement) {
    if at.radius < 1.0 || at.opacity <= 0.0 {
        return;
    }
    if image.rings {
        draw_rings(canvas, image, at);
    }

    let norm = (0.34f32 * 0.34 + 0.38 * 0.38 + 0.86 * 0.86).sqrt();
    let light = (-0.34 / norm, 0.38 / norm, 0.86 / norm);
    let (ts, tc) = at.tilt.sin_cos();
    let (rs, rc) = at.rotation.sin_cos();
    let reach = at.radius * 1.16;
    let alpha = (255.0 * clamp01(at.opacity)) as u8;

    let x0 = (at.cx - reach).floor() as i32;
    let x1 = (at.cx + reach).ceil() as i32;
    let y0 = (at.cy - reach).floor() as i32;
    let y1 = (at.cy + reach).ceil() as i32;

    for py in y0..=y1 {
        for px in x0..=x1 {
            let nx = (px as f32 + 0.5 - at.cx) / at.radius;
            let ny = (py as f32 + 0.5 - at.cy) / at.radius;
            let d2 = nx * nx + ny * ny;
            let th = bayer(px, py);

            if d2 > 1.0 {
                let glow = clamp01(1.0 - (d2.sqrt() - 1.0) / 0.14);
                if glow > 0.03 && glow * 0.65 > th {
                    let [r, g, b] = image.atmosphere;
                    canvas.blend_over(px, py, Pixel { r, g, b, a: alpha });
                }
                continue;
            }

            let nz = (1.0 - d2).sqrt();
            // tilt around x, then spin around y
            let (y1, z1) = (tc * ny - ts * nz, ts * ny + tc * nz);
            let (x2, y2, z2) = (rc * nx + rs * z1, y1, -rs * nx + rc * z1);

            let ndotl = (x2 * light.0 + y2 * light.1 + z2 * light.2).max(0.0);
            let rim = clamp01((1.0 - ndotl).powf(2.2)) * 0.20;
            let lat = y2.clamp(-1.0, 1.0).asin();
            let lon = x2.atan2(z2);

            let banding = 0.5 + 0.5 * (lat * (3.0 + image.bands * 9.0) + at.rotation * 0.35).sin();
            let n0 = fbm(
                (lon.cos() * 2.0 + 0.7) * 1.3,
                (lat.sin() * 2.0 + 0.2) * 1.3,
                (lon.sin() * 2.0 - 0.4) * 1.3,
                image.seed,
                5,
            );
            let n1 = fbm(
                lon * 0.55 + 7.1,
                lat * 0.85 - 3.4,
                at.rotation * 0.25 + 1.7,
                image.seed.wrapping_add(0xBADC_0FFE),
                4,
            );
            let rough = lerp(n0, n1, image.roughness);
            let land = clamp01((rough - 0.48) * 2.2);

            let cloud_noise = fbm(
                lon * 1.10 + at.rotation * 0.25,
                lat * 1.55 - at.rotation * 0.10,
                at.rotation * 0.35 + 2.0,
                image.seed.wrapping_add(0x1357_9BDF),
                4,
            );
            let clouds = clamp01((cloud_noise - 0.56) * 2.7) * image.clouds;
            let cap = clamp01((lat.abs() - (0.86 - image.ice * 0.22)) * 9.0) * image.ice;

            let mut col = if land > 0.45 {
                let t = clamp01(0.25 + 0.75 * land) * (0.65 + 0.35 * banding);
                mix(image.base, image.accent, t)
            } else {
                let t = clamp01(0.35 + 0.65 * (0.60 * banding + 0.40 * (1.0 - rough)));
                mix(image.ocean, image.base, t * 0.25)
            };
            if cap > 0.01 {
                col = mix(col, CRACK_WHITE, cap * 0.85);
            }

            let terminator = clamp01((ndotl - 0.02) * 5.0);
            let intensity =
                clamp01(clamp01(ndotl.powf(1.25) + rim) + clouds * 0.35) * (0.45 + 0.95 * terminator);
            if intensity <= th {
                continue;
            }

            let lit = mix(col, image.accent, (intensity - 0.45) * 0.9);
            let tinted = mix(lit, image.atmosphere, clamp01((d2.sqrt() - 0.86) / 0.18) * 0.55);
            let [r, g, b] = mix(tinted, NIGHT, clamp01(1.0 - intensity * 1.35) * 0.55);
            canvas.blend_over(px, py, Pixel { r, g, b, a: alpha });
        }
    }
}

fn draw_rings(canvas: &mut PixelCanvas, image: &PlanetImage, at: Placement) {
    let inner = at.radius * 1.15;
    let outer = at.radius * 1.62;
    let squash = (0.35 + 0.30 * at.tilt.abs()).clamp(0.12, 0.70);
    let (rs, rc) = (at.rotation * 0.55).sin_cos();
    let alpha = (200.0 * clamp01(at.opacity)) as u8;

    let x0 = (at.cx - outer).floor() as i32;
    let x1 = (at.cx + outer).ceil() as i32;
    let y0 = (at.cy - outer).floor() as i32;
    let y1 = (at.cy + outer).ceil() as i32;

    for py in y0..=y1 {
        for px in x0..=x1 {
            let dx = px as f32 + 0.5 - at.cx;
            let dy = py as f32 + 0.5 - at.cy;
            let (rx, ry) = (rc * dx - rs * dy, rs * dx + rc * dy);
            let d = (rx * rx + (ry / squash).powi(2)).sqrt();
            if d < inner || d > outer {
                continue;
            }
            // the disc occludes the ring
            if dx * dx + dy * dy <= at.radius * at.radius {
                continue;
            }
            let band = 0.5 + 0.5 * ((d / at.radius) * 10.0 + at.rotation * 0.8).sin();
            if clamp01(0.30 + 0.45 * band) < bayer(px, py) {
                continue;
            }
            let [r, g, b] = mix(image.base, image.accent, 0.35 + 0.45 * band);
            canvas.blend_over(px, py, Pixel { r, g, b, a: alpha });
        }
    }
}
