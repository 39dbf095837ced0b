#![allow(dead_code)]

use scan_preprocessing::{Point, PointSet};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// `n` points with x spread uniformly over `[0, span)`.
pub fn x_ramp(n: usize, span: f64) -> PointSet {
    let points = (0..n)
        .map(|i| Point::new(span * (i as f64 / n as f64), 0.25, -0.5))
        .collect();
    PointSet::new(points, false).unwrap()
}

/// Dense 3D lattice with unit spacing plus a few distant strays.
pub fn noisy_lattice(side: usize, strays: &[[f64; 3]]) -> PointSet {
    let mut points = Vec::new();
    for x in 0..side {
        for y in 0..side {
            for z in 0..side {
                points.push(
                    Point::new(x as f64, y as f64, z as f64).with_attribute((x + y + z) as f64),
                );
            }
        }
    }
    for s in strays {
        points.push(Point::new(s[0], s[1], s[2]).with_attribute(99.0));
    }
    PointSet::new(points, true).unwrap()
}
