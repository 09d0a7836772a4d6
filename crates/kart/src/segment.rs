//! Pseudo-3D segment tracks for the sprint racer.
//!
//! A track is a flat list of fixed-length segments, each carrying a curve
//! amount and a start/end height. Distance `z` along the track selects a
//! segment; lateral position is a normalized `x` where `±1` is the road edge.

use std::f32::consts::PI;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::track::TrackError;

/// World length of one segment.
pub const SEGMENT_LENGTH: f32 = 180.0;
/// First segment carrying a pickup.
pub const PICKUP_FIRST: usize = 20;
/// Segments between pickups.
pub const PICKUP_SPACING: usize = 26;

/// A run of `count` segments that climbs `hill` in total and eases into
/// `curve`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub count: u32,
    pub hill: f32,
    pub curve: f32,
}

const fn section(count: u32, hill: f32, curve: f32) -> Section {
    Section { count, hill, curve }
}

const NEON: &[Section] = &[
    section(70, 0.0, 0.0),
    section(60, 0.0, 0.6),
    section(80, 0.0, -0.45),
    section(65, 0.0, 0.0),
    section(55, 40.0, 0.25),
    section(45, -34.0, -0.85),
    section(70, 10.0, 0.4),
    section(40, 0.0, 0.0),
    section(50, 15.0, -0.8),
    section(60, -15.0, 0.5),
    section(80, 0.0, 0.15),
];

const SUNSET: &[Section] = &[
    section(110, 0.0, 0.0),
    section(45, 12.0, 0.7),
    section(65, 30.0, -0.4),
    section(60, -38.0, -0.68),
    section(95, 0.0, 0.0),
    section(52, 20.0, 0.25),
    section(50, -24.0, -0.95),
    section(80, 0.0, 0.35),
    section(70, 0.0, -0.55),
    section(85, 0.0, 0.0),
];

const ALPINE: &[Section] = &[
    section(60, 25.0, 0.0),
    section(52, 35.0, -0.95),
    section(68, -15.0, 0.74),
    section(85, -28.0, 0.0),
    section(58, 20.0, 0.6),
    section(60, 0.0, -0.85),
    section(60, 30.0, 0.5),
    section(54, -40.0, -0.35),
    section(84, 0.0, 0.12),
    section(96, 0.0, 0.0),
];

/// Built-in sprint maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackProfile {
    Neon,
    Sunset,
    Alpine,
}

impl TrackProfile {
    pub const ALL: [Self; 3] = [Self::Neon, Self::Sunset, Self::Alpine];

    pub fn name(self) -> &'static str {
        match self {
            Self::Neon => "NEON CITY",
            Self::Sunset => "SUNSET LOOP",
            Self::Alpine => "ALPINE TWIST",
        }
    }

    pub fn sections(self) -> &'static [Section] {
        match self {
            Self::Neon => NEON,
            Self::Sunset => SUNSET,
            Self::Alpine => ALPINE,
        }
    }
}

impl FromStr for TrackProfile {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "neon" => Ok(Self::Neon),
            "sunset" => Ok(Self::Sunset),
            "alpine" => Ok(Self::Alpine),
            _ => Err(TrackError::UnknownProfile(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub index: usize,
    pub curve: f32,
    pub y1: f32,
    pub y2: f32,
    /// Indices into [`SegmentTrack::pickups`].
    pub pickups: Vec<usize>,
}

/// A burst pickup sitting in one lane of a segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pickup {
    pub segment: usize,
    pub lane: f32,
    pub z: f32,
}

fn ease_in_out(a: f32, b: f32, p: f32) -> f32 {
    a + (b - a) * (-(PI * p).cos() / 2.0 + 0.5)
}

/// Segment geometry, built once and never mutated.
#[derive(Debug, Clone)]
pub struct SegmentTrack {
    segments: Vec<Segment>,
    pickups: Vec<Pickup>,
}

impl SegmentTrack {
    pub fn new(sections: &[Section]) -> Result<Self, TrackError> {
        let mut segments = Vec::new();
        let mut y = 0.0;
        for s in sections {
            for i in 0..s.count {
                let p = i as f32 / (s.count.max(2) - 1) as f32;
                let next_y = y + s.hill / s.count as f32;
                segments.push(Segment {
                    index: segments.len(),
                    curve: ease_in_out(0.0, s.curve, p),
                    y1: y,
                    y2: next_y,
                    pickups: Vec::new(),
                });
                y = next_y;
            }
        }
        if segments.is_empty() {
            return Err(TrackError::NoSamples);
        }

        let mut pickups = Vec::new();
        for i in (PICKUP_FIRST..segments.len()).step_by(PICKUP_SPACING) {
            segments[i].pickups.push(pickups.len());
            pickups.push(Pickup {
                segment: i,
                lane: (i as f32 * 0.47).sin() * 0.65,
                z: i as f32 * SEGMENT_LENGTH,
            });
        }
        tracing::debug!(
            segments = segments.len(),
            pickups = pickups.len(),
            "segment track built"
        );
        Ok(Self { segments, pickups })
    }

    pub fn from_profile(profile: TrackProfile) -> Result<Self, TrackError> {
        Self::new(profile.sections())
    }

    pub fn length(&self) -> f32 {
        self.segments.len() as f32 * SEGMENT_LENGTH
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn pickups(&self) -> &[Pickup] {
        &self.pickups
    }

    /// Segment under distance `z`, wrapping around the lap.
    pub fn segment_at(&self, z: f32) -> &Segment {
        let n = self.segments.len();
        let i = (z / SEGMENT_LENGTH).floor() as i64;
        &self.segments[i.rem_euclid(n as i64) as usize]
    }

    pub fn curve_at(&self, z: f32) -> f32 {
        self.segment_at(z).curve
    }

    /// Road height at `z`, interpolated across the segment.
    pub fn height_at(&self, z: f32) -> f32 {
        let seg = self.segment_at(z);
        let p = (z / SEGMENT_LENGTH).rem_euclid(1.0);
        seg.y1 + (seg.y2 - seg.y1) * p
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neon_layout() {
        let track = SegmentTrack::from_profile(TrackProfile::Neon).unwrap();
        assert_eq!(track.segments().len(), 675);
        assert_eq!(track.length(), 675.0 * SEGMENT_LENGTH);
        assert_eq!(track.pickups().len(), 26);
        assert_eq!(track.pickups()[0].segment, 20);
        assert_eq!(track.pickups()[1].segment, 46);
        let last = track.segments().last().unwrap();
        assert!((last.y2 - 16.0).abs() < 1e-3);
    }

    #[test]
    fn curves_ease_from_zero_to_full() {
        let track = SegmentTrack::from_profile(TrackProfile::Neon).unwrap();
        // Second section: segments 70..130 ease into 0.6.
        assert!(track.segments()[70].curve.abs() < 1e-6);
        assert!((track.segments()[129].curve - 0.6).abs() < 1e-5);
        let mid = track.segments()[100].curve;
        assert!(mid > 0.0 && mid < 0.6);
    }

    #[test]
    fn segment_lookup_wraps() {
        let track = SegmentTrack::new(&[section(10, 0.0, 0.0)]).unwrap();
        assert_eq!(track.segment_at(0.0).index, 0);
        assert_eq!(track.segment_at(179.9).index, 0);
        assert_eq!(track.segment_at(180.0).index, 1);
        assert_eq!(track.segment_at(track.length() + 200.0).index, 1);
        assert_eq!(track.segment_at(-1.0).index, 9);
    }

    #[test]
    fn single_segment_sections_are_allowed() {
        let track = SegmentTrack::new(&[section(1, 4.0, 0.5), section(3, 0.0, 0.0)]).unwrap();
        assert_eq!(track.segments().len(), 4);
        assert_eq!(track.segments()[0].curve, 0.0);
        assert_eq!(track.segments()[0].y2, 4.0);
        assert!((track.height_at(90.0) - 2.0).abs() < 1e-5);
    }

    #[test]
    fn empty_track_rejected() {
        assert_eq!(SegmentTrack::new(&[]).unwrap_err(), TrackError::NoSamples);
        assert_eq!(
            SegmentTrack::new(&[section(0, 1.0, 1.0)]).unwrap_err(),
            TrackError::NoSamples
        );
    }

    #[test]
    fn profile_names_parse() {
        for profile in TrackProfile::ALL {
            let key = format!("{profile:?}");
            assert_eq!(key.parse::<TrackProfile>().unwrap(), profile);
        }
        assert!(matches!(
            "moon".parse::<TrackProfile>(),
            Err(TrackError::UnknownProfile(_))
        ));
    }
}
