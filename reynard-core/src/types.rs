//! Core type definitions shared by every component and system.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for an agent in the world.
    AgentId
);
uuid_id!(
    /// Unique identifier for a single memory.
    MemoryId
);
uuid_id!(
    /// Unique identifier for a recorded interaction.
    InteractionId
);
uuid_id!(
    /// Unique identifier for a social group.
    GroupId
);
uuid_id!(
    /// Unique identifier for a knowledge item.
    KnowledgeId
);
uuid_id!(
    /// Unique identifier for a queued learning opportunity.
    OpportunityId
);

// ---------------------------------------------------------------------------
// Spatial
// ---------------------------------------------------------------------------

/// A position in world space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// X coordinate.
    pub x: f32,
    /// Y coordinate.
    pub y: f32,
    /// Z coordinate.
    #[serde(default)]
    pub z: f32,
}

impl Position {
    /// Create a position on the ground plane.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }

    /// Euclidean distance to another position.
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Whether `other` lies within `range` of this position (inclusive).
    #[must_use]
    pub fn is_within(&self, other: &Self, range: f32) -> bool {
        self.distance_to(other) <= range
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// Simulation timestamp: elapsed simulated seconds plus the wall-clock moment
/// the tick happened.
///
/// Ordering and ages use `seconds` only; `real_time` is informational.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimTime {
    /// Simulated seconds since the world started.
    pub seconds: f64,
    /// Wall-clock time when this timestamp was taken.
    pub real_time: DateTime<Utc>,
}

impl SimTime {
    /// Timestamp at the given simulated second, stamped with the current wall clock.
    #[must_use]
    pub fn at(seconds: f64) -> Self {
        Self {
            seconds,
            real_time: Utc::now(),
        }
    }

    /// The world's starting instant.
    #[must_use]
    pub fn zero() -> Self {
        Self::at(0.0)
    }

    /// A new timestamp `delta` simulated seconds later.
    #[must_use]
    pub fn advanced(&self, delta: f64) -> Self {
        Self::at(self.seconds + delta)
    }

    /// Simulated seconds elapsed since `earlier` (zero if `earlier` is in the future).
    #[must_use]
    pub fn seconds_since(&self, earlier: &Self) -> f64 {
        (self.seconds - earlier.seconds).max(0.0)
    }

    /// Whether this timestamp is strictly before `other`.
    #[must_use]
    pub fn is_before(&self, other: &Self) -> bool {
        self.seconds < other.seconds
    }
}

impl Default for SimTime {
    fn default() -> Self {
        Self::zero()
    }
}

// ---------------------------------------------------------------------------
// Personality
// ---------------------------------------------------------------------------

/// Personality traits consulted by interaction and teaching math.
///
/// All traits are in `[0.0, 1.0]`. Any trait not present in a serialized
/// profile falls back to the neutral `0.5`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PersonalityTraits {
    /// Social magnetism; drives interaction acceptance and teaching.
    #[serde(default = "neutral")]
    pub charisma: f32,
    /// Willingness to engage casually.
    #[serde(default = "neutral")]
    pub playfulness: f32,
    /// Capacity to absorb and explain knowledge.
    #[serde(default = "neutral")]
    pub intelligence: f32,
    /// Drive to seek out new knowledge.
    #[serde(default = "neutral")]
    pub curiosity: f32,
    /// Tolerance for slow or failed interactions.
    #[serde(default = "neutral")]
    pub patience: f32,
    /// Sensitivity to others' wellbeing.
    #[serde(default = "neutral")]
    pub empathy: f32,
}

impl Default for PersonalityTraits {
    fn default() -> Self {
        Self {
            charisma: 0.5,
            playfulness: 0.5,
            intelligence: 0.5,
            curiosity: 0.5,
            patience: 0.5,
            empathy: 0.5,
        }
    }
}

impl PersonalityTraits {
    /// Return a copy with every trait clamped to `[0.0, 1.0]`.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            charisma: self.charisma.clamp(0.0, 1.0),
            playfulness: self.playfulness.clamp(0.0, 1.0),
            intelligence: self.intelligence.clamp(0.0, 1.0),
            curiosity: self.curiosity.clamp(0.0, 1.0),
            patience: self.patience.clamp(0.0, 1.0),
            empathy: self.empathy.clamp(0.0, 1.0),
        }
    }

    fn as_array(&self) -> [f32; 6] {
        [
            self.charisma,
            self.playfulness,
            self.intelligence,
            self.curiosity,
            self.patience,
            self.empathy,
        ]
    }

    /// Trait similarity in `[0.0, 1.0]`: the mean of `1 - |a - b|` across traits.
    #[must_use]
    pub fn compatibility(&self, other: &Self) -> f32 {
        let mine = self.as_array();
        let theirs = other.as_array();
        let total: f32 = mine
            .iter()
            .zip(theirs.iter())
            .map(|(a, b)| 1.0 - (a - b).abs())
            .sum();
        (total / mine.len() as f32).clamp(0.0, 1.0)
    }
}

fn neutral() -> f32 {
    0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_euclidean_and_inclusive() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(3.0, 4.0);
        assert!((a.distance_to(&b) - 5.0).abs() < f32::EPSILON);
        assert!(a.is_within(&b, 5.0));
        assert!(!a.is_within(&b, 4.99));
    }

    #[test]
    fn seconds_since_never_negative() {
        let early = SimTime::at(10.0);
        let late = SimTime::at(25.0);
        assert!((late.seconds_since(&early) - 15.0).abs() < f64::EPSILON);
        assert!(early.seconds_since(&late).abs() < f64::EPSILON);
    }

    #[test]
    fn identical_traits_are_fully_compatible() {
        let t = PersonalityTraits::default();
        assert!((t.compatibility(&t) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn missing_traits_default_to_neutral() {
        let t: PersonalityTraits =
            serde_json::from_str(r#"{"charisma": 0.9}"#).expect("partial traits");
        assert!((t.charisma - 0.9).abs() < f32::EPSILON);
        assert!((t.curiosity - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn clamped_bounds_traits() {
        let t = PersonalityTraits {
            charisma: 1.7,
            empathy: -0.3,
            ..PersonalityTraits::default()
        }
        .clamped();
        assert!((t.charisma - 1.0).abs() < f32::EPSILON);
        assert!(t.empathy.abs() < f32::EPSILON);
    }
}
