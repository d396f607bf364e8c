//! Polyline paths with arclength parameterization

use kinema_core::{KinemaError, Result, Vec3};

/// Substitute 1 for a divisor that is zero or not finite.
#[inline]
pub(crate) fn safe_divisor(value: f64) -> f64 {
    if value == 0.0 || !value.is_finite() {
        1.0
    } else {
        value
    }
}

/// An ordered sequence of points, each tagged with its cumulative normalized
/// distance from the start (`0.0` at the first vertex, `1.0` at the last).
#[derive(Clone, Debug, PartialEq)]
pub struct Polyline {
    vertices: Vec<Vec3>,
    ratios: Vec<f64>,
    length: f64,
}

impl Polyline {
    /// Build a polyline parameterized by arclength.
    ///
    /// A path of zero total length collapses to its first vertex at ratio 0.
    pub fn new(vertices: Vec<Vec3>) -> Result<Self> {
        validate_vertices(&vertices)?;

        let mut cumulative = Vec::with_capacity(vertices.len());
        let mut total = 0.0;
        cumulative.push(0.0);
        for pair in vertices.windows(2) {
            total += pair[0].distance(pair[1]);
            cumulative.push(total);
        }

        if total == 0.0 {
            return Ok(Self {
                vertices: vec![vertices[0]],
                ratios: vec![0.0],
                length: 0.0,
            });
        }

        let ratios = cumulative.iter().map(|d| d / total).collect();
        Ok(Self {
            vertices,
            ratios,
            length: total,
        })
    }

    /// Build a polyline with an explicit parameterization.
    ///
    /// `ratios` must match `vertices` in length, be non-decreasing and lie in `[0, 1]`.
    pub fn with_ratios(vertices: Vec<Vec3>, ratios: Vec<f64>) -> Result<Self> {
        validate_vertices(&vertices)?;
        if ratios.len() != vertices.len() {
            return Err(KinemaError::MalformedPath(format!(
                "{} ratios for {} vertices",
                ratios.len(),
                vertices.len()
            )));
        }
        if ratios.iter().any(|r| !(0.0..=1.0).contains(r))
            || ratios.windows(2).any(|w| w[1] < w[0])
        {
            return Err(KinemaError::MalformedPath(
                "ratios must be non-decreasing within [0, 1]".to_string(),
            ));
        }

        let length = vertices.windows(2).map(|w| w[0].distance(w[1])).sum();
        Ok(Self {
            vertices,
            ratios,
            length,
        })
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn ratios(&self) -> &[f64] {
        &self.ratios
    }

    /// Total arclength
    pub fn length(&self) -> f64 {
        self.length
    }

    /// True when the path has zero length and cannot be traversed
    pub fn is_degenerate(&self) -> bool {
        self.vertices.len() < 2 || self.length == 0.0
    }

    pub fn start(&self) -> Vec3 {
        self.vertices[0]
    }

    pub fn end(&self) -> Vec3 {
        self.vertices[self.vertices.len() - 1]
    }

    /// Point at `ratio` of the way along the path, clamped to `[0, 1]`.
    ///
    /// Interpolates linearly between the two vertices bracketing `ratio`.
    pub fn sample(&self, ratio: f64) -> Vec3 {
        let ratio = if ratio.is_nan() {
            0.0
        } else {
            ratio.clamp(0.0, 1.0)
        };

        // First vertex whose ratio is past the requested one
        let upper = self.ratios.partition_point(|r| *r <= ratio);
        if upper == 0 {
            return self.start();
        }
        if upper >= self.vertices.len() {
            return self.end();
        }

        let lower = upper - 1;
        let span = safe_divisor(self.ratios[upper] - self.ratios[lower]);
        let local = (ratio - self.ratios[lower]) / span;
        self.vertices[lower].lerp(self.vertices[upper], local)
    }
}

fn validate_vertices(vertices: &[Vec3]) -> Result<()> {
    if vertices.is_empty() {
        return Err(KinemaError::MalformedPath("path has no vertices".to_string()));
    }
    if vertices
        .iter()
        .any(|v| !(v.x.is_finite() && v.y.is_finite() && v.z.is_finite()))
    {
        return Err(KinemaError::MalformedPath(
            "path contains non-finite coordinates".to_string(),
        ));
    }
    Ok(())
}
