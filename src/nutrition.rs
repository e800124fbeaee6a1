//! Meal log and the calorie/macro figures derived from it.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, AddAssign, Mul};

use serde::{Deserialize, Serialize};

use crate::ai::FoodAnalysis;
use crate::error::NutritionError;
use crate::models::Measurement;

/// Unit name the AI uses for the label serving its numbers refer to.
pub const SERVING_UNIT: &str = "serving";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MealCategory {
    Breakfast,
    Lunch,
    Dinner,
    Snacks,
}

impl MealCategory {
    pub const ALL: [MealCategory; 4] = [
        MealCategory::Breakfast,
        MealCategory::Lunch,
        MealCategory::Dinner,
        MealCategory::Snacks,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            MealCategory::Breakfast => "Breakfast",
            MealCategory::Lunch => "Lunch",
            MealCategory::Dinner => "Dinner",
            MealCategory::Snacks => "Snacks",
        }
    }
}

impl fmt::Display for MealCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Calories (kcal) and macros (g).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Macros {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl Add for Macros {
    type Output = Macros;

    fn add(self, rhs: Macros) -> Macros {
        Macros {
            calories: self.calories + rhs.calories,
            protein: self.protein + rhs.protein,
            carbs: self.carbs + rhs.carbs,
            fat: self.fat + rhs.fat,
        }
    }
}

impl AddAssign for Macros {
    fn add_assign(&mut self, rhs: Macros) {
        *self = *self + rhs;
    }
}

impl Mul<f64> for Macros {
    type Output = Macros;

    fn mul(self, k: f64) -> Macros {
        Macros {
            calories: self.calories * k,
            protein: self.protein * k,
            carbs: self.carbs * k,
            fat: self.fat * k,
        }
    }
}

/// Check that a measurement list has exactly one base unit (quantity 1).
pub fn validate_measurements(measurements: &[Measurement]) -> Result<(), NutritionError> {
    if measurements.is_empty() {
        return Err(NutritionError::NoMeasurements);
    }
    let base_count = measurements.iter().filter(|m| m.is_base()).count();
    if base_count != 1 {
        return Err(NutritionError::BaseUnitCount(base_count));
    }
    Ok(())
}

/// The measurement an AI nutrition estimate refers to: a literal "serving",
/// else the first non-base unit, else the first entry.
pub fn reference_measurement(measurements: &[Measurement]) -> Option<&Measurement> {
    measurements
        .iter()
        .find(|m| m.unit == SERVING_UNIT)
        .or_else(|| measurements.iter().find(|m| !m.is_base()))
        .or_else(|| measurements.first())
}

/// A food committed to the meal log.
///
/// Macros are stored per one base unit; the selected unit is always one of
/// the item's own measurements.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedFoodItem {
    id: String,
    name: String,
    per_base_unit: Macros,
    measurements: Vec<Measurement>,
    selected_unit: String,
    quantity: f64,
}

impl LoggedFoodItem {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        per_base_unit: Macros,
        measurements: Vec<Measurement>,
        selected_unit: &str,
        quantity: f64,
    ) -> Result<Self, NutritionError> {
        validate_measurements(&measurements)?;
        if !measurements.iter().any(|m| m.unit == selected_unit) {
            return Err(NutritionError::UnknownUnit(selected_unit.to_string()));
        }
        check_quantity(quantity)?;

        Ok(Self {
            id: id.into(),
            name: name.into(),
            per_base_unit,
            measurements,
            selected_unit: selected_unit.to_string(),
            quantity,
        })
    }

    /// Convert an AI estimate (absolute numbers for its reference
    /// measurement) into per-base-unit values. The reference measurement
    /// becomes the selected unit with a multiplier of 1.
    pub fn from_analysis(
        id: impl Into<String>,
        analysis: &FoodAnalysis,
    ) -> Result<Self, NutritionError> {
        validate_measurements(&analysis.measurements)?;
        let reference = reference_measurement(&analysis.measurements)
            .ok_or(NutritionError::NoMeasurements)?;
        let base_total = reference.quantity;
        if base_total == 0.0 || !base_total.is_finite() {
            return Err(NutritionError::ZeroReferenceQuantity {
                unit: reference.unit.clone(),
            });
        }

        let per_base_unit = Macros {
            calories: analysis.calories / base_total,
            protein: analysis.protein / base_total,
            carbs: analysis.carbohydrates / base_total,
            fat: analysis.fat / base_total,
        };
        let unit = reference.unit.clone();

        Self::new(
            id,
            analysis.food_name.clone(),
            per_base_unit,
            analysis.measurements.clone(),
            &unit,
            1.0,
        )
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn per_base_unit(&self) -> Macros {
        self.per_base_unit
    }

    pub fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }

    pub fn selected_unit(&self) -> &str {
        &self.selected_unit
    }

    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    pub fn selected_measurement(&self) -> Option<&Measurement> {
        self.measurements
            .iter()
            .find(|m| m.unit == self.selected_unit)
    }

    pub fn set_unit(&mut self, unit: &str) -> Result<(), NutritionError> {
        if !self.measurements.iter().any(|m| m.unit == unit) {
            return Err(NutritionError::UnknownUnit(unit.to_string()));
        }
        self.selected_unit = unit.to_string();
        Ok(())
    }

    pub fn set_quantity(&mut self, quantity: f64) -> Result<(), NutritionError> {
        check_quantity(quantity)?;
        self.quantity = quantity;
        Ok(())
    }

    /// Contribution to the day's totals: per-base value × selected
    /// measurement size × multiplier. Zero if the selected unit is missing.
    pub fn totals(&self) -> Macros {
        match self.selected_measurement() {
            Some(m) => self.per_base_unit * (m.quantity * self.quantity),
            None => Macros::default(),
        }
    }
}

fn check_quantity(quantity: f64) -> Result<(), NutritionError> {
    if !quantity.is_finite() || quantity < 0.0 {
        return Err(NutritionError::InvalidQuantity);
    }
    Ok(())
}

/// Foods logged this session, grouped by meal.
#[derive(Debug, Clone, Default)]
pub struct MealLog {
    meals: BTreeMap<MealCategory, Vec<LoggedFoodItem>>,
    next_seq: u64,
}

impl MealLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, category: MealCategory, item: LoggedFoodItem) {
        self.meals.entry(category).or_default().push(item);
    }

    /// Convert an AI result and append it. Returns the new item's id.
    pub fn add_analysis(
        &mut self,
        category: MealCategory,
        analysis: &FoodAnalysis,
    ) -> Result<String, NutritionError> {
        self.next_seq += 1;
        let id = format!(
            "{}-{}",
            chrono::Utc::now().timestamp_millis(),
            self.next_seq
        );
        let item = LoggedFoodItem::from_analysis(id.clone(), analysis)?;
        self.add(category, item);
        Ok(id)
    }

    pub fn remove(&mut self, category: MealCategory, id: &str) -> Option<LoggedFoodItem> {
        let items = self.meals.get_mut(&category)?;
        let pos = items.iter().position(|i| i.id == id)?;
        Some(items.remove(pos))
    }

    pub fn items(&self, category: MealCategory) -> &[LoggedFoodItem] {
        self.meals.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn item_mut(&mut self, category: MealCategory, id: &str) -> Option<&mut LoggedFoodItem> {
        self.meals
            .get_mut(&category)?
            .iter_mut()
            .find(|i| i.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (MealCategory, &LoggedFoodItem)> {
        self.meals
            .iter()
            .flat_map(|(cat, items)| items.iter().map(move |i| (*cat, i)))
    }

    pub fn is_empty(&self) -> bool {
        self.meals.values().all(Vec::is_empty)
    }

    pub fn category_totals(&self, category: MealCategory) -> Macros {
        self.items(category)
            .iter()
            .fold(Macros::default(), |acc, i| acc + i.totals())
    }

    pub fn totals(&self) -> Macros {
        self.iter()
            .fold(Macros::default(), |acc, (_, i)| acc + i.totals())
    }

    /// Derived state for the nutrition view.
    pub fn summary(&self, budget: f64, burned: f64) -> NutritionSummary {
        let totals = self.totals();
        NutritionSummary {
            totals,
            balance: CalorieBalance {
                consumed: totals.calories,
                budget,
                burned,
            },
        }
    }
}

/// Consumed vs. budget, with exercise calories credited back.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalorieBalance {
    pub consumed: f64,
    pub budget: f64,
    pub burned: f64,
}

impl CalorieBalance {
    pub fn remaining(&self) -> f64 {
        self.budget - self.consumed + self.burned
    }

    pub fn remaining_for_display(&self) -> f64 {
        self.remaining().max(0.0)
    }

    /// Unclamped share of the budget eaten, in percent.
    pub fn consumed_percentage(&self) -> f64 {
        if self.budget <= 0.0 {
            return 0.0;
        }
        self.consumed / self.budget * 100.0
    }

    /// Consumed percentage clamped to 0..=100 for a progress bar.
    pub fn progress_percentage(&self) -> f64 {
        self.consumed_percentage().clamp(0.0, 100.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NutritionSummary {
    pub totals: Macros,
    pub balance: CalorieBalance,
}

/// Glasses of water drunk today against the goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaterIntake {
    pub consumed: u32,
    pub goal: u32,
}

impl WaterIntake {
    pub fn new(goal: u32) -> Self {
        Self { consumed: 0, goal }
    }

    /// Add (or with a negative delta, remove) glasses; never below zero.
    pub fn change(&mut self, delta: i32) -> u32 {
        self.consumed = (i64::from(self.consumed) + i64::from(delta)).max(0) as u32;
        self.consumed
    }

    pub fn percentage(&self) -> f64 {
        if self.goal == 0 {
            return 0.0;
        }
        (f64::from(self.consumed) / f64::from(self.goal) * 100.0).min(100.0)
    }
}
