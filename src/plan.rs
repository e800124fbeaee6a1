//! Weekly plans: display sections of the prose plan and structured daily
//! workouts turned into timer segments.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::timer::Segment;

/// Section headings recognised in a prose plan, in display order.
pub const SECTION_ORDER: [&str; 9] = [
    "Justification",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
    "Dietary Guidelines",
];

pub const INTRODUCTION: &str = "Introduction";

/// Timer length for an exercise given in reps rather than seconds.
pub const DEFAULT_EXERCISE_SECS: u32 = 45;

/// Rough kcal per second of exercise.
const KCAL_PER_SEC: f64 = 0.7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanSection {
    pub title: String,
    pub body: String,
}

/// Split a prose plan on `Heading:` markers.
///
/// Sections come back in [`SECTION_ORDER`]; a repeated heading keeps its
/// last body. Text with no recognised heading is returned whole as an
/// introduction. Only meant for display.
pub fn split_sections(plan: &str) -> Vec<PlanSection> {
    let mut marks: Vec<(usize, usize, &str)> = Vec::new();
    let mut pos = 0;
    while pos < plan.len() {
        let rest = &plan[pos..];
        let hit = SECTION_ORDER.iter().find(|h| {
            rest.starts_with(*h) && rest[h.len()..].starts_with(':')
        });
        match hit {
            Some(heading) => {
                let end = pos + heading.len() + 1;
                marks.push((pos, end, *heading));
                pos = end;
            }
            None => {
                pos += rest.chars().next().map_or(1, char::len_utf8);
            }
        }
    }

    if marks.is_empty() {
        if plan.trim().is_empty() {
            return Vec::new();
        }
        return vec![PlanSection {
            title: INTRODUCTION.to_string(),
            body: plan.to_string(),
        }];
    }

    let mut bodies: Vec<Option<String>> = vec![None; SECTION_ORDER.len()];
    for (i, (_, body_start, heading)) in marks.iter().enumerate() {
        let body_end = marks.get(i + 1).map_or(plan.len(), |next| next.0);
        if let Some(slot) = SECTION_ORDER.iter().position(|h| h == heading) {
            bodies[slot] = Some(plan[*body_start..body_end].trim().to_string());
        }
    }

    SECTION_ORDER
        .iter()
        .zip(bodies)
        .filter_map(|(title, body)| {
            body.map(|body| PlanSection {
                title: title.to_string(),
                body,
            })
        })
        .collect()
}

/// English weekday name, as used by plan headings.
pub fn weekday_name(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Warmup,
    ExerciseSet,
    Rest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutStep {
    #[serde(rename = "type")]
    pub kind: StepKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set: Option<u32>,
    /// Rep count or range, e.g. "6-8"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reps: Option<String>,
    /// Seconds
    pub duration: u32,
    pub is_rest: bool,
}

impl WorkoutStep {
    fn label(&self) -> String {
        match (self.set, self.reps.as_deref()) {
            (Some(set), Some(reps)) => format!("{} (set {set}, {reps} reps)", self.name),
            (Some(set), None) => format!("{} (set {set})", self.name),
            (None, Some(reps)) => format!("{} ({reps} reps)", self.name),
            (None, None) => self.name.clone(),
        }
    }
}

/// One day's workout broken down step by step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyWorkout {
    pub day: String,
    pub workout_exists: bool,
    #[serde(default)]
    pub steps: Vec<WorkoutStep>,
}

impl DailyWorkout {
    /// Timer segments for the day; empty on a rest day.
    ///
    /// Rep-based steps without a duration get [`DEFAULT_EXERCISE_SECS`];
    /// a trailing rest is dropped.
    pub fn to_segments(&self) -> Vec<Segment> {
        if !self.workout_exists {
            return Vec::new();
        }
        let mut segments: Vec<Segment> = self
            .steps
            .iter()
            .map(|step| {
                if step.is_rest || step.kind == StepKind::Rest {
                    Segment::rest(step.duration)
                } else {
                    let secs = if step.duration == 0 {
                        DEFAULT_EXERCISE_SECS
                    } else {
                        step.duration
                    };
                    Segment::exercise(&step.label(), secs, estimate_calories(secs))
                }
            })
            .collect();

        while segments.last().is_some_and(|s| s.is_rest) {
            segments.pop();
        }
        segments
    }
}

fn estimate_calories(secs: u32) -> f64 {
    (f64::from(secs) * KCAL_PER_SEC).floor()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sections_follow_display_order() {
        let plan = "Monday: Squats 3x10\nTuesday: Rest\nJustification: Builds strength.\n\
                    Dietary Guidelines: Eat protein.";
        let sections = split_sections(plan);
        let titles: Vec<_> = sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, ["Justification", "Monday", "Tuesday", "Dietary Guidelines"]);
        assert_eq!(sections[1].body, "Squats 3x10");
        assert_eq!(sections[3].body, "Eat protein.");
    }

    #[test]
    fn headings_need_a_colon() {
        let plan = "Every Monday you rest. Friday: Run 5k";
        let sections = split_sections(plan);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].title, "Friday");
        assert_eq!(sections[0].body, "Run 5k");
    }

    #[test]
    fn unstructured_text_becomes_an_introduction() {
        let sections = split_sections("Walk daily and sleep well.");
        assert_eq!(
            sections,
            vec![PlanSection {
                title: INTRODUCTION.into(),
                body: "Walk daily and sleep well.".into()
            }]
        );
        assert!(split_sections("  ").is_empty());
    }

    #[test]
    fn daily_workout_becomes_segments() {
        let workout: DailyWorkout = serde_json::from_value(json!({
            "day": "Monday",
            "workoutExists": true,
            "steps": [
                {"type": "warmup", "name": "Jog", "duration": 300, "isRest": false},
                {"type": "exercise_set", "name": "Bench Press", "set": 1, "reps": "6-8", "duration": 0, "isRest": false},
                {"type": "rest", "name": "Rest", "duration": 90, "isRest": true},
                {"type": "exercise_set", "name": "Bench Press", "set": 2, "reps": "6-8", "duration": 40, "isRest": false},
                {"type": "rest", "name": "Rest", "duration": 90, "isRest": true}
            ]
        }))
        .unwrap();

        let segments = workout.to_segments();
        assert_eq!(segments.len(), 4);
        assert_eq!(segments[0].name, "Jog");
        assert_eq!(segments[0].calories, 210.0);
        assert_eq!(segments[1].name, "Bench Press (set 1, 6-8 reps)");
        assert_eq!(segments[1].duration_secs, DEFAULT_EXERCISE_SECS);
        assert!(segments[2].is_rest);
        assert_eq!(segments[3].calories, 28.0);
    }

    #[test]
    fn rest_day_has_no_segments() {
        let workout = DailyWorkout {
            day: "Sunday".into(),
            workout_exists: false,
            steps: vec![],
        };
        assert!(workout.to_segments().is_empty());
        assert_eq!(weekday_name(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()), "Sunday");
    }
}
