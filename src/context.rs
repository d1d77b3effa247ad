use chrono::{
    DateTime,
    Datelike,
    FixedOffset,
    Local,
    Offset,
    Timelike,
    Utc,
    Weekday,
};
use serde::{Deserialize, Serialize};

/// Coarse part of the day the scorer reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
}

impl TimeOfDay {
    /// Before noon is morning, before 18:00 afternoon, the rest evening.
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            0..12 => TimeOfDay::Morning,
            12..18 => TimeOfDay::Afternoon,
            _ => TimeOfDay::Evening,
        }
    }

    /// Category keywords that suit this part of the day.
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            TimeOfDay::Morning => &["math", "problem", "focus"],
            TimeOfDay::Afternoon => &["science", "world", "learning"],
            TimeOfDay::Evening => &["art", "creative", "calm", "reading"],
        }
    }
}

impl std::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            TimeOfDay::Morning => "morning",
            TimeOfDay::Afternoon => "afternoon",
            TimeOfDay::Evening => "evening",
        })
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Calm,
    Curious,
    Tired,
    Energetic,
}

/// Situational inputs for one round of recommendations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalizationContext {
    pub current_time: DateTime<Utc>,
    pub day_of_week: Weekday,
    pub time_of_day: TimeOfDay,
    pub session_length_minutes: f64,
    pub mood: Option<Mood>,
}

/// Derives a [`PersonalizationContext`] from the clock.
///
/// Hour and weekday are read in the builder's UTC offset, so a learner in
/// UTC+9 at 08:00 local gets morning activities even though it is 23:00 UTC.
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use discovery::context::{ContextBuilder, TimeOfDay};
///
/// let start = Utc.with_ymd_and_hms(2024, 3, 4, 14, 0, 0).unwrap();
/// let now = Utc.with_ymd_and_hms(2024, 3, 4, 14, 25, 0).unwrap();
/// let ctx = ContextBuilder::new(start).build_at(now);
///
/// assert_eq!(ctx.time_of_day, TimeOfDay::Afternoon);
/// assert_eq!(ctx.session_length_minutes, 25.0);
/// ```
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    session_started_at: DateTime<Utc>,
    offset: FixedOffset,
    mood: Option<Mood>,
}

impl ContextBuilder {
    /// Builder for a session that started at `session_started_at`,
    /// reading wall-clock fields in UTC.
    pub fn new(session_started_at: DateTime<Utc>) -> Self {
        Self {
            session_started_at,
            offset: Utc.fix(),
            mood: None,
        }
    }

    /// Builder using the host's current local UTC offset.
    pub fn local(session_started_at: DateTime<Utc>) -> Self {
        Self::new(session_started_at).with_offset(*Local::now().offset())
    }

    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_mood(mut self, mood: Option<Mood>) -> Self {
        self.mood = mood;
        self
    }

    pub fn build(&self) -> PersonalizationContext {
        self.build_at(Utc::now())
    }

    pub fn build_at(&self, now: DateTime<Utc>) -> PersonalizationContext {
        let local = now.with_timezone(&self.offset);
        let elapsed = now.signed_duration_since(self.session_started_at);

        PersonalizationContext {
            current_time: now,
            day_of_week: local.weekday(),
            time_of_day: TimeOfDay::from_hour(local.hour()),
            session_length_minutes: elapsed.num_minutes().max(0) as f64,
            mood: self.mood,
        }
    }
}
