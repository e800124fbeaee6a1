//! Menstrual cycle estimation from logged period days.

use std::fmt;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::config::CycleSettings;
use crate::models::UserProfile;

/// Cycle length used when none is configured.
pub const DEFAULT_CYCLE_LENGTH: u32 = 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CyclePhase {
    Menstrual,
    Follicular,
    Ovulation,
    Luteal,
    Unknown,
}

impl CyclePhase {
    /// Phase for a day of a default-length cycle.
    pub fn for_day(day: u32) -> Self {
        Self::for_day_in_cycle(day, DEFAULT_CYCLE_LENGTH)
    }

    /// Phase for a day of a cycle of `length` days; the luteal band runs to
    /// the end of the cycle.
    pub fn for_day_in_cycle(day: u32, length: u32) -> Self {
        match day {
            1..=5 => CyclePhase::Menstrual,
            6..=13 => CyclePhase::Follicular,
            14..=15 => CyclePhase::Ovulation,
            d if d >= 16 && d <= length => CyclePhase::Luteal,
            _ => CyclePhase::Unknown,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            CyclePhase::Menstrual => "Menstrual",
            CyclePhase::Follicular => "Follicular",
            CyclePhase::Ovulation => "Ovulation",
            CyclePhase::Luteal => "Luteal",
            CyclePhase::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 1-indexed day within the cycle that started on `cycle_start`.
///
/// Always in `1..=length`, also for dates before the start.
pub fn cycle_day(today: NaiveDate, cycle_start: NaiveDate, length: u32) -> u32 {
    let length = i64::from(length.max(1));
    let days = (today - cycle_start).num_days();
    (((days % length) + length) % length + 1) as u32
}

/// Logged period days plus the derived cycle reference.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleState {
    logged_days: Vec<NaiveDate>,
    settings: CycleSettings,
}

impl CycleState {
    pub fn new(settings: CycleSettings) -> Self {
        Self::with_days(settings, Vec::new())
    }

    pub fn with_days(settings: CycleSettings, mut days: Vec<NaiveDate>) -> Self {
        days.sort();
        days.dedup();
        Self {
            logged_days: days,
            settings,
        }
    }

    pub fn from_profile(settings: CycleSettings, profile: &UserProfile) -> Self {
        Self::with_days(settings, profile.logged_period_days.clone())
    }

    pub fn length(&self) -> u32 {
        self.settings.length_days.max(1)
    }

    /// Logged days, ascending.
    pub fn logged_days(&self) -> &[NaiveDate] {
        &self.logged_days
    }

    pub fn is_period_day(&self, date: NaiveDate) -> bool {
        self.logged_days.binary_search(&date).is_ok()
    }

    /// Add `date` if absent, remove it if present. Returns whether it is now
    /// logged.
    pub fn toggle_period_day(&mut self, date: NaiveDate) -> bool {
        match self.logged_days.binary_search(&date) {
            Ok(pos) => {
                self.logged_days.remove(pos);
                false
            }
            Err(pos) => {
                self.logged_days.insert(pos, date);
                true
            }
        }
    }

    /// Earliest logged day, or the assumed default relative to `today`.
    pub fn cycle_start(&self, today: NaiveDate) -> NaiveDate {
        match self.logged_days.first() {
            Some(first) => *first,
            None => today
                .checked_sub_days(Days::new(u64::from(self.settings.default_start_offset_days)))
                .unwrap_or(today),
        }
    }

    pub fn day_of_cycle(&self, date: NaiveDate, today: NaiveDate) -> u32 {
        cycle_day(date, self.cycle_start(today), self.length())
    }

    pub fn phase_on(&self, date: NaiveDate, today: NaiveDate) -> CyclePhase {
        CyclePhase::for_day_in_cycle(self.day_of_cycle(date, today), self.length())
    }

    pub fn current_day(&self, today: NaiveDate) -> u32 {
        self.day_of_cycle(today, today)
    }

    pub fn current_phase(&self, today: NaiveDate) -> CyclePhase {
        self.phase_on(today, today)
    }

    pub fn next_predicted_period(&self, today: NaiveDate) -> NaiveDate {
        let start = self.cycle_start(today);
        start
            .checked_add_days(Days::new(u64::from(self.length())))
            .unwrap_or(start)
    }

    /// Logged days as ISO strings, the shape stored on the profile.
    pub fn to_iso_strings(&self) -> Vec<String> {
        self.logged_days
            .iter()
            .map(|d| crate::paths::date_key(*d))
            .collect()
    }
}
