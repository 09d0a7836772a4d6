use arcade_common::math::{TAU, wrap01};
use glam::Vec2;

/// Errors from building track geometry.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TrackError {
    #[error("a closed spline needs at least 4 control points, got {0}")]
    TooFewPoints(usize),
    #[error("track width must be > 0, got {0}")]
    InvalidWidth(f32),
    #[error("track needs at least one sample point")]
    NoSamples,
    #[error("ellipse radii must be > 0, got a={a} b={b}")]
    InvalidRadii { a: f32, b: f32 },
    #[error("spline tension must be finite, got {0}")]
    InvalidTension(f32),
    #[error("track curve has zero length")]
    Degenerate,
    #[error("unknown track profile {0:?}")]
    UnknownProfile(String),
}

/// Where a world position sits relative to the track centre line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackProjection {
    /// Lap parameter of the nearest sample.
    pub t: f32,
    pub center: Vec2,
    pub tangent: Vec2,
    pub right: Vec2,
    /// Signed offset along `right`.
    pub lateral: f32,
    /// Distance from the nearest sample.
    pub distance: f32,
}

/// A closed course parameterized by lap progress `t` in `[0, 1)`.
///
/// Positions are 2D on the ground plane (`x`, `z`). `t = 0` is the start
/// line; `t` grows in the driving direction.
pub trait Track {
    /// Centre-line length of one lap in world units.
    fn length(&self) -> f32;

    fn half_width(&self) -> f32;

    fn point(&self, t: f32) -> Vec2;

    /// Unit tangent in the driving direction.
    fn tangent(&self, t: f32) -> Vec2;

    /// Nearest centre-line sample to `pos`.
    fn project(&self, pos: Vec2) -> TrackProjection;

    /// Move `t` forward by `distance` world units along the centre line.
    fn advance(&self, t: f32, distance: f32) -> f32 {
        wrap01(t + distance / self.length())
    }

    /// Unit vector pointing to the driver's right.
    fn right(&self, t: f32) -> Vec2 {
        right_of(self.tangent(t))
    }

    /// World position of a racer at `t` with a lateral offset.
    fn world_position(&self, t: f32, lateral: f32) -> Vec2 {
        self.point(t) + self.right(t) * lateral
    }
}

fn positive(v: f32) -> bool {
    v.is_finite() && v > 0.0
}

fn right_of(tangent: Vec2) -> Vec2 {
    Vec2::new(tangent.y, -tangent.x)
}

/// Linear scan over evenly spaced samples.
fn project_samples(samples: &[Vec2], tangents: &[Vec2], pos: Vec2) -> TrackProjection {
    let mut nearest = 0;
    let mut nearest_d2 = f32::INFINITY;
    for (i, p) in samples.iter().enumerate() {
        let d2 = pos.distance_squared(*p);
        if d2 < nearest_d2 {
            nearest_d2 = d2;
            nearest = i;
        }
    }
    let center = samples[nearest];
    let tangent = tangents[nearest];
    let right = right_of(tangent);
    TrackProjection {
        t: nearest as f32 / samples.len() as f32,
        center,
        tangent,
        right,
        lateral: (pos - center).dot(right),
        distance: nearest_d2.sqrt(),
    }
}

/// Minimum tangent length used when advancing around an ellipse, so the
/// tight ends of a flat ellipse do not spin the parameter.
const MIN_TURN_RADIUS: f32 = 70.0;
const ELLIPSE_SAMPLES: usize = 720;

/// Elliptical oval used by the 2D pseudo-perspective kart.
#[derive(Debug, Clone)]
pub struct EllipseTrack {
    a: f32,
    b: f32,
    width: f32,
    start_angle: f32,
    length: f32,
    samples: Vec<Vec2>,
    tangents: Vec<Vec2>,
}

impl EllipseTrack {
    pub fn new(a: f32, b: f32, width: f32, start_angle: f32) -> Result<Self, TrackError> {
        if !(positive(a) && positive(b)) {
            return Err(TrackError::InvalidRadii { a, b });
        }
        if !positive(width) {
            return Err(TrackError::InvalidWidth(width));
        }
        Ok(Self::build(a, b, width, start_angle))
    }

    fn build(a: f32, b: f32, width: f32, start_angle: f32) -> Self {
        // Ramanujan's second approximation.
        let h = ((a - b) / (a + b)).powi(2);
        let length = std::f32::consts::PI * (a + b) * (1.0 + 3.0 * h / (10.0 + (4.0 - 3.0 * h).sqrt()));

        let mut track = Self {
            a,
            b,
            width,
            start_angle,
            length,
            samples: Vec::with_capacity(ELLIPSE_SAMPLES),
            tangents: Vec::with_capacity(ELLIPSE_SAMPLES),
        };
        for i in 0..ELLIPSE_SAMPLES {
            let t = i as f32 / ELLIPSE_SAMPLES as f32;
            track.samples.push(track.point(t));
            track.tangents.push(track.tangent(t));
        }
        track
    }

    /// The oval from the 2D kart game: 270 × 170, 96 wide, starting at the
    /// bottom of the screen.
    pub fn oval() -> Self {
        Self::build(270.0, 170.0, 96.0, -std::f32::consts::FRAC_PI_2)
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn start_angle(&self) -> f32 {
        self.start_angle
    }

    fn angle(&self, t: f32) -> f32 {
        self.start_angle + t * TAU
    }

    /// `|dP/dθ|` at parameter `t`.
    fn speed_at(&self, t: f32) -> f32 {
        let theta = self.angle(t);
        (self.a * theta.sin()).hypot(self.b * theta.cos())
    }
}

impl Track for EllipseTrack {
    fn length(&self) -> f32 {
        self.length
    }

    fn half_width(&self) -> f32 {
        self.width * 0.5
    }

    fn point(&self, t: f32) -> Vec2 {
        let theta = self.angle(t);
        Vec2::new(self.a * theta.cos(), self.b * theta.sin())
    }

    fn tangent(&self, t: f32) -> Vec2 {
        let theta = self.angle(t);
        Vec2::new(-self.a * theta.sin(), self.b * theta.cos()).normalize_or_zero()
    }

    fn project(&self, pos: Vec2) -> TrackProjection {
        project_samples(&self.samples, &self.tangents, pos)
    }

    fn advance(&self, t: f32, distance: f32) -> f32 {
        let turn_scale = 1.0 / self.speed_at(t).max(MIN_TURN_RADIUS);
        wrap01(t + distance * turn_scale / TAU)
    }
}

/// Closed Catmull-Rom centre line resampled at even arc-length spacing.
#[derive(Debug, Clone)]
pub struct SplineTrack {
    width: f32,
    length: f32,
    samples: Vec<Vec2>,
    tangents: Vec<Vec2>,
}

/// Dense evaluations per output sample when measuring arc length.
const ARC_OVERSAMPLE: usize = 8;

impl SplineTrack {
    pub fn new(
        points: &[Vec2],
        tension: f32,
        width: f32,
        sample_count: usize,
    ) -> Result<Self, TrackError> {
        if points.len() < 4 {
            return Err(TrackError::TooFewPoints(points.len()));
        }
        if !positive(width) {
            return Err(TrackError::InvalidWidth(width));
        }
        if sample_count == 0 {
            return Err(TrackError::NoSamples);
        }
        if !tension.is_finite() {
            return Err(TrackError::InvalidTension(tension));
        }

        let divisions = sample_count * ARC_OVERSAMPLE;
        let dense: Vec<Vec2> = (0..=divisions)
            .map(|k| catmull_rom_closed(points, tension, k as f32 / divisions as f32))
            .collect();
        let mut cumulative = Vec::with_capacity(dense.len());
        let mut total = 0.0;
        cumulative.push(0.0);
        for pair in dense.windows(2) {
            total += pair[0].distance(pair[1]);
            cumulative.push(total);
        }
        if !positive(total) {
            return Err(TrackError::Degenerate);
        }

        let mut samples = Vec::with_capacity(sample_count);
        let mut seg = 0;
        for i in 0..sample_count {
            let target = total * i as f32 / sample_count as f32;
            while seg + 1 < divisions && cumulative[seg + 1] < target {
                seg += 1;
            }
            let span = cumulative[seg + 1] - cumulative[seg];
            let w = if span > 0.0 {
                (target - cumulative[seg]) / span
            } else {
                0.0
            };
            samples.push(dense[seg].lerp(dense[seg + 1], w));
        }

        let n = samples.len();
        let tangents = (0..n)
            .map(|i| {
                let next = samples[(i + 1) % n];
                let prev = samples[(i + n - 1) % n];
                (next - prev).normalize_or_zero()
            })
            .collect();

        tracing::debug!(points = points.len(), samples = n, length = total, "built spline track");
        Ok(Self {
            width,
            length: total,
            samples,
            tangents,
        })
    }

    /// Ten-waypoint circuit from the 3D ribbon kart.
    pub fn grand_loop() -> Result<Self, TrackError> {
        let points = [
            Vec2::new(0.0, -66.0),
            Vec2::new(58.0, -56.0),
            Vec2::new(76.0, -18.0),
            Vec2::new(72.0, 22.0),
            Vec2::new(34.0, 56.0),
            Vec2::new(-10.0, 66.0),
            Vec2::new(-58.0, 58.0),
            Vec2::new(-82.0, 20.0),
            Vec2::new(-74.0, -26.0),
            Vec2::new(-34.0, -56.0),
        ];
        Self::new(&points, 0.16, 12.5, 520)
    }

    /// Eight-waypoint loop from the free-roam kart battle.
    pub fn battle_loop() -> Result<Self, TrackError> {
        let points = [
            Vec2::new(0.0, -60.0),
            Vec2::new(45.0, -50.0),
            Vec2::new(70.0, -5.0),
            Vec2::new(50.0, 45.0),
            Vec2::new(5.0, 62.0),
            Vec2::new(-52.0, 48.0),
            Vec2::new(-70.0, 0.0),
            Vec2::new(-42.0, -50.0),
        ];
        Self::new(&points, 0.1, 14.0, 800)
    }

    pub fn samples(&self) -> &[Vec2] {
        &self.samples
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    /// Point at arc-length fraction `u`.
    pub fn point_at(&self, u: f32) -> Vec2 {
        let (i, j, w) = self.bracket(u);
        self.samples[i].lerp(self.samples[j], w)
    }

    /// Unit tangent at arc-length fraction `u`.
    pub fn tangent_at(&self, u: f32) -> Vec2 {
        let (i, j, w) = self.bracket(u);
        self.tangents[i]
            .lerp(self.tangents[j], w)
            .try_normalize()
            .unwrap_or(self.tangents[i])
    }

    fn bracket(&self, u: f32) -> (usize, usize, f32) {
        let n = self.samples.len();
        let f = wrap01(u) * n as f32;
        let i = (f.floor() as usize).min(n - 1);
        (i, (i + 1) % n, f - i as f32)
    }
}

impl Track for SplineTrack {
    fn length(&self) -> f32 {
        self.length
    }

    fn half_width(&self) -> f32 {
        self.width * 0.5
    }

    fn point(&self, t: f32) -> Vec2 {
        self.point_at(t)
    }

    fn tangent(&self, t: f32) -> Vec2 {
        self.tangent_at(t)
    }

    fn project(&self, pos: Vec2) -> TrackProjection {
        project_samples(&self.samples, &self.tangents, pos)
    }
}

/// Uniform-parameter point on a closed Catmull-Rom curve. Tangents at each
/// control point are `tension * (next - prev)`.
fn catmull_rom_closed(points: &[Vec2], tension: f32, t: f32) -> Vec2 {
    let n = points.len();
    let p = n as f32 * wrap01(t);
    let i = (p.floor() as usize).min(n - 1);
    let w = p - i as f32;

    let p0 = points[(i + n - 1) % n];
    let p1 = points[i];
    let p2 = points[(i + 1) % n];
    let p3 = points[(i + 2) % n];

    let t0 = (p2 - p0) * tension;
    let t1 = (p3 - p1) * tension;
    let c2 = -3.0 * p1 + 3.0 * p2 - 2.0 * t0 - t1;
    let c3 = 2.0 * p1 - 2.0 * p2 + t0 + t1;
    p1 + t0 * w + c2 * (w * w) + c3 * (w * w * w)
}
