//! Deterministic calorie arithmetic. No completion call involved.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Calories shifted per day for a loss or gain goal.
pub const GOAL_ADJUSTMENT_KCAL: f64 = 500.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalorieGoal {
    #[serde(rename = "weight loss")]
    WeightLoss,
    #[serde(rename = "maintain")]
    Maintain,
    #[serde(rename = "gain")]
    Gain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityLevel {
    #[serde(rename = "sedentary")]
    Sedentary,
    #[serde(rename = "lightly active")]
    LightlyActive,
    #[serde(rename = "moderately active")]
    ModeratelyActive,
    #[serde(rename = "very active")]
    VeryActive,
    #[serde(rename = "extra active")]
    ExtraActive,
}

impl ActivityLevel {
    pub const fn factor(&self) -> f64 {
        match self {
            ActivityLevel::Sedentary => 1.2,
            ActivityLevel::LightlyActive => 1.375,
            ActivityLevel::ModeratelyActive => 1.55,
            ActivityLevel::VeryActive => 1.725,
            ActivityLevel::ExtraActive => 1.9,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalorieBudgetInput {
    pub goal: CalorieGoal,
    pub daily_calories_burned: f64,
    pub daily_calories_intake: f64,
    #[serde(rename = "weightInKilograms")]
    pub weight_kg: f64,
    #[serde(rename = "heightInCentimeters")]
    pub height_cm: f64,
    #[serde(rename = "ageInYears")]
    pub age_years: f64,
    pub gender: Gender,
    pub activity_level: ActivityLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalorieBudget {
    pub recommended_daily_calorie_intake: f64,
    pub remaining_calories: f64,
    /// Intake beyond the recommendation, net of exercise. Only set for
    /// loss and gain goals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_deficit: Option<f64>,
}

/// Mifflin-St Jeor basal metabolic rate.
pub fn basal_metabolic_rate(weight_kg: f64, height_cm: f64, age_years: f64, gender: Gender) -> f64 {
    let base = 10.0 * weight_kg + 6.25 * height_cm - 5.0 * age_years;
    match gender {
        Gender::Male => base + 5.0,
        Gender::Female => base - 161.0,
    }
}

pub fn recommend_calories(input: &CalorieBudgetInput) -> Result<CalorieBudget, ValidationError> {
    positive("weightInKilograms", input.weight_kg)?;
    positive("heightInCentimeters", input.height_cm)?;
    positive("ageInYears", input.age_years)?;
    non_negative("dailyCaloriesBurned", input.daily_calories_burned)?;
    non_negative("dailyCaloriesIntake", input.daily_calories_intake)?;

    let bmr = basal_metabolic_rate(input.weight_kg, input.height_cm, input.age_years, input.gender);
    let mut intake = bmr * input.activity_level.factor();
    match input.goal {
        CalorieGoal::WeightLoss => intake -= GOAL_ADJUSTMENT_KCAL,
        CalorieGoal::Gain => intake += GOAL_ADJUSTMENT_KCAL,
        CalorieGoal::Maintain => {}
    }
    let recommended = intake.round();

    let goal_deficit = match input.goal {
        CalorieGoal::Maintain => None,
        _ => Some(input.daily_calories_intake - input.daily_calories_burned - recommended),
    };

    Ok(CalorieBudget {
        recommended_daily_calorie_intake: recommended,
        remaining_calories: recommended - input.daily_calories_intake
            + input.daily_calories_burned,
        goal_deficit,
    })
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalorieBurnInput {
    pub met: f64,
    pub weight_kg: f64,
    pub duration_minutes: f64,
}

/// kcal = MET × 3.5 × kg / 200 × minutes
pub fn calorie_burn(input: &CalorieBurnInput) -> Result<f64, ValidationError> {
    positive("met", input.met)?;
    positive("weightKg", input.weight_kg)?;
    non_negative("durationMinutes", input.duration_minutes)?;
    Ok(input.met * 3.5 * input.weight_kg / 200.0 * input.duration_minutes)
}

fn positive(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ValidationError::invalid(field, "must be a positive number"));
    }
    Ok(())
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::invalid(field, "must not be negative"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(goal: CalorieGoal) -> CalorieBudgetInput {
        CalorieBudgetInput {
            goal,
            daily_calories_burned: 300.0,
            daily_calories_intake: 1200.0,
            weight_kg: 60.0,
            height_cm: 165.0,
            age_years: 30.0,
            gender: Gender::Female,
            activity_level: ActivityLevel::ModeratelyActive,
        }
    }

    #[test]
    fn mifflin_st_jeor() {
        assert_eq!(basal_metabolic_rate(60.0, 165.0, 30.0, Gender::Female), 1320.25);
        assert_eq!(basal_metabolic_rate(80.0, 180.0, 40.0, Gender::Male), 1730.0);
    }

    #[test]
    fn weight_loss_budget() {
        // 1320.25 * 1.55 = 2046.3875, minus 500
        let budget = recommend_calories(&input(CalorieGoal::WeightLoss)).unwrap();
        assert_eq!(budget.recommended_daily_calorie_intake, 1546.0);
        assert_eq!(budget.remaining_calories, 1546.0 - 1200.0 + 300.0);
        assert_eq!(budget.goal_deficit, Some(1200.0 - 300.0 - 1546.0));
    }

    #[test]
    fn maintain_has_no_deficit() {
        let budget = recommend_calories(&input(CalorieGoal::Maintain)).unwrap();
        assert_eq!(budget.recommended_daily_calorie_intake, 2046.0);
        assert_eq!(budget.goal_deficit, None);
        let gain = recommend_calories(&input(CalorieGoal::Gain)).unwrap();
        assert_eq!(gain.recommended_daily_calorie_intake, 2546.0);
    }

    #[test]
    fn rejects_nonsense_body_metrics() {
        let mut bad = input(CalorieGoal::Maintain);
        bad.weight_kg = 0.0;
        assert!(recommend_calories(&bad).is_err());
    }

    #[test]
    fn met_burn() {
        let kcal = calorie_burn(&CalorieBurnInput {
            met: 8.0,
            weight_kg: 60.0,
            duration_minutes: 30.0,
        })
        .unwrap();
        assert!((kcal - 252.0).abs() < 1e-9);
    }

    #[test]
    fn input_uses_wire_names() {
        let parsed: CalorieBudgetInput = serde_json::from_value(serde_json::json!({
            "goal": "weight loss",
            "dailyCaloriesBurned": 0,
            "dailyCaloriesIntake": 0,
            "weightInKilograms": 70,
            "heightInCentimeters": 170,
            "ageInYears": 25,
            "gender": "male",
            "activityLevel": "lightly active"
        }))
        .unwrap();
        assert_eq!(parsed.activity_level, ActivityLevel::LightlyActive);
        assert_eq!(parsed.goal, CalorieGoal::WeightLoss);
    }
}
