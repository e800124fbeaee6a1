use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Sleep goal used until the user sets one.
pub const DEFAULT_IDEAL_SLEEP_HOURS: f64 = 8.0;

/// Root account document written at sign-up (`users/{uid}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Per-user profile document (`users/{uid}/userProfile/{uid}`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub id: String,
    /// AI-generated weekly plan, as prose
    #[serde(default)]
    pub weekly_workout_plan: Option<String>,
    #[serde(default)]
    pub body_measurements: Vec<BodyMeasurement>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub ideal_sleep_hours: Option<f64>,
    /// Logged period start days, ascending
    #[serde(default, deserialize_with = "lenient_dates")]
    pub logged_period_days: Vec<NaiveDate>,
}

impl UserProfile {
    pub fn ideal_sleep_hours(&self) -> f64 {
        self.ideal_sleep_hours
            .filter(|h| *h > 0.0)
            .unwrap_or(DEFAULT_IDEAL_SLEEP_HOURS)
    }

    /// Stored measurements, or the blank default set when none were saved.
    pub fn body_measurements(&self) -> Vec<BodyMeasurement> {
        if self.body_measurements.is_empty() {
            BodyMeasurement::defaults()
        } else {
            self.body_measurements.clone()
        }
    }
}

/// A named body measurement, e.g. waist in inches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyMeasurement {
    pub name: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub value: f64,
    pub unit: String,
}

impl BodyMeasurement {
    pub fn new(name: &str, value: f64, unit: &str) -> Self {
        Self {
            name: name.to_string(),
            value,
            unit: unit.to_string(),
        }
    }

    pub fn defaults() -> Vec<Self> {
        ["Waist", "Hips", "Thigh", "Arm", "Chest"]
            .into_iter()
            .map(|name| Self::new(name, 0.0, "in"))
            .collect()
    }
}

/// A unit a food can be measured in, relative to its base unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Unit label, e.g. "g", "slice", "medium"
    pub unit: String,
    /// Size of one `unit` in base units (the base unit itself is 1)
    pub quantity: f64,
}

impl Measurement {
    pub fn new(unit: &str, quantity: f64) -> Self {
        Self {
            unit: unit.to_string(),
            quantity,
        }
    }

    pub fn is_base(&self) -> bool {
        self.quantity == 1.0
    }
}

/// Per-day aggregate (`users/{uid}/dailyStats/{YYYY-MM-DD}`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DailyStats {
    /// Date key of the document, filled in on read
    #[serde(skip_serializing)]
    pub id: String,
    /// Calories eaten (kcal)
    #[serde(deserialize_with = "lenient_f64")]
    pub calories_consumed: f64,
    /// Calories burned through workouts (kcal)
    #[serde(deserialize_with = "lenient_f64")]
    pub calories_burned: f64,
    /// Glasses of water
    pub water_intake: u32,
    pub workouts_done: u32,
}

/// Item of the `users/{uid}/todos` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    #[serde(default)]
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

fn number_from(v: &Value) -> Option<f64> {
    v.as_f64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
}

/// Accept numbers stored either as JSON numbers or numeric strings.
fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    let v = Value::deserialize(d)?;
    Ok(number_from(&v).unwrap_or(0.0))
}

fn lenient_opt_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(v.as_ref().and_then(number_from))
}

/// Dates stored as `YYYY-MM-DD` or as RFC 3339 timestamps.
fn lenient_dates<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<NaiveDate>, D::Error> {
    let raw = Option::<Vec<Value>>::deserialize(d)?.unwrap_or_default();
    let mut days: Vec<NaiveDate> = raw
        .iter()
        .filter_map(|v| v.as_str())
        .filter_map(|s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
        })
        .collect();
    days.sort();
    days.dedup();
    Ok(days)
}
