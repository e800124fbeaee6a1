use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use super::completion::{CompletionRequest, CompletionService, GeminiCompletion, InlineImage};
use super::prompts;
use super::ActionResponse;
use crate::config::GeminiSettings;
use crate::error::{GatewayError, ValidationError};
use crate::models::Measurement;
use crate::plan::{self, DailyWorkout, PlanSection};

pub const PLAN_EMPTY_MESSAGE: &str =
    "The AI could not generate a plan with the given inputs. Please try adjusting them.";
pub const PLAN_FAILED_MESSAGE: &str =
    "An unexpected error occurred while generating your workout plan. Please try again later.";
pub const DAILY_WORKOUT_FAILED_MESSAGE: &str =
    "Could not prepare today's workout. Please try again later.";
pub const FOOD_FAILED_MESSAGE: &str = "Could not analyze this food. Please try again.";
pub const BARCODE_FAILED_MESSAGE: &str =
    "Could not find nutrition information for this barcode. Please try again.";
pub const IMAGE_FAILED_MESSAGE: &str =
    "Could not analyze the photo. Please try again with a clearer picture.";

const BARCODE_LENGTHS: [usize; 4] = [8, 12, 13, 14];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitnessLevel {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitnessGoal {
    #[serde(rename = "weight loss")]
    WeightLoss,
    #[serde(rename = "tone")]
    Tone,
    #[serde(rename = "maintain")]
    Maintain,
    #[serde(rename = "muscle gain")]
    MuscleGain,
}

impl FitnessLevel {
    pub const fn as_str(&self) -> &'static str {
        match self {
            FitnessLevel::Beginner => "beginner",
            FitnessLevel::Intermediate => "intermediate",
            FitnessLevel::Advanced => "advanced",
        }
    }
}

impl FitnessGoal {
    pub const fn as_str(&self) -> &'static str {
        match self {
            FitnessGoal::WeightLoss => "weight loss",
            FitnessGoal::Tone => "tone",
            FitnessGoal::Maintain => "maintain",
            FitnessGoal::MuscleGain => "muscle gain",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutPlanInput {
    pub fitness_level: FitnessLevel,
    pub goals: FitnessGoal,
    /// Comma-separated, or "none"
    pub available_equipment: String,
    /// e.g. "vegetarian", or "none"
    pub dietary_preferences: String,
}

impl WorkoutPlanInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.available_equipment.trim().is_empty() {
            return Err(ValidationError::invalid(
                "availableEquipment",
                "Please specify your available equipment, e.g., \"dumbbells, resistance bands\" or \"none\".",
            ));
        }
        if self.dietary_preferences.trim().is_empty() {
            return Err(ValidationError::invalid(
                "dietaryPreferences",
                "Please specify your dietary preferences, e.g., \"vegetarian\" or \"none\".",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyWorkoutPlan {
    pub weekly_workout_plan: String,
}

impl WeeklyWorkoutPlan {
    /// Display sections of the prose plan.
    pub fn sections(&self) -> Vec<PlanSection> {
        plan::split_sections(&self.weekly_workout_plan)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyWorkoutInput {
    pub weekly_workout_plan: String,
    /// Weekday name, e.g. "Monday"
    pub today: String,
}

impl DailyWorkoutInput {
    /// Trimmed, canonically capitalised weekday.
    fn weekday(&self) -> Result<&'static str, ValidationError> {
        let today = self.today.trim();
        plan::SECTION_ORDER[1..8]
            .iter()
            .find(|d| d.eq_ignore_ascii_case(today))
            .copied()
            .ok_or_else(|| ValidationError::invalid("today", format!("{today:?} is not a weekday")))
    }
}

/// Nutrition estimate for the reference amount of a food.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodAnalysis {
    pub food_name: String,
    pub calories: f64,
    pub protein: f64,
    pub carbohydrates: f64,
    pub fat: f64,
    #[serde(default)]
    pub measurements: Vec<Measurement>,
}

/// Digits only, EAN-8, UPC-A, EAN-13 or GTIN-14 length.
pub fn validate_barcode(barcode: &str) -> Result<&str, ValidationError> {
    let code = barcode.trim();
    if code.is_empty() {
        return Err(ValidationError::Empty { field: "barcode" });
    }
    if !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::invalid("barcode", "must contain digits only"));
    }
    if !BARCODE_LENGTHS.contains(&code.len()) {
        return Err(ValidationError::invalid(
            "barcode",
            format!("unexpected length {}", code.len()),
        ));
    }
    Ok(code)
}

/// Split `data:<mime>;base64,<data>` into an inline image.
pub fn parse_data_uri(uri: &str) -> Result<InlineImage, ValidationError> {
    let rest = uri
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| ValidationError::invalid("photoDataUri", "expected a data: URI"))?;
    let (header, data) = rest
        .split_once(',')
        .ok_or_else(|| ValidationError::invalid("photoDataUri", "missing data section"))?;
    let mime_type = header
        .strip_suffix(";base64")
        .ok_or_else(|| ValidationError::invalid("photoDataUri", "data must be base64 encoded"))?;
    if !mime_type.starts_with("image/") {
        return Err(ValidationError::invalid(
            "photoDataUri",
            format!("{mime_type:?} is not an image type"),
        ));
    }
    if data.is_empty() {
        return Err(ValidationError::Empty {
            field: "photoDataUri",
        });
    }
    STANDARD
        .decode(data)
        .map_err(|e| ValidationError::invalid("photoDataUri", e.to_string()))?;

    Ok(InlineImage {
        mime_type: mime_type.to_string(),
        data: data.to_string(),
    })
}

/// Typed entry points to the completion service.
///
/// The plain methods return errors to the caller; the `*_action` variants
/// catch everything and answer with an [`ActionResponse`].
#[derive(Clone)]
pub struct AiGateway {
    service: Arc<dyn CompletionService>,
}

impl AiGateway {
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        Self { service }
    }

    pub fn gemini(settings: &GeminiSettings) -> Self {
        Self::new(Arc::new(GeminiCompletion::new(settings)))
    }

    async fn ask<T: DeserializeOwned>(
        &self,
        flow: &'static str,
        prompt: String,
        images: Vec<InlineImage>,
        response_schema: Value,
    ) -> Result<T, GatewayError> {
        let request = CompletionRequest {
            flow,
            prompt,
            images,
            response_schema,
        };
        let value = self.service.complete_json(&request).await?;
        if value.is_null() {
            return Err(GatewayError::EmptyOutput);
        }
        debug!(flow, "completion received");
        serde_json::from_value(value).map_err(|e| GatewayError::MalformedOutput(e.to_string()))
    }

    #[instrument(skip(self, input), fields(level = input.fitness_level.as_str(), goal = input.goals.as_str()))]
    pub async fn generate_workout_plan(
        &self,
        input: &WorkoutPlanInput,
    ) -> Result<WeeklyWorkoutPlan, GatewayError> {
        input.validate()?;
        let prompt = prompts::render(
            prompts::WORKOUT_PLAN,
            &[
                ("fitnessLevel", input.fitness_level.as_str()),
                ("goals", input.goals.as_str()),
                ("availableEquipment", input.available_equipment.trim()),
                ("dietaryPreferences", input.dietary_preferences.trim()),
            ],
        );
        let plan: WeeklyWorkoutPlan = self
            .ask("workout_plan", prompt, Vec::new(), prompts::workout_plan_schema())
            .await?;
        if plan.weekly_workout_plan.trim().is_empty() {
            return Err(GatewayError::EmptyOutput);
        }
        Ok(plan)
    }

    #[instrument(skip(self, input), fields(today = %input.today))]
    pub async fn structure_daily_workout(
        &self,
        input: &DailyWorkoutInput,
    ) -> Result<DailyWorkout, GatewayError> {
        if input.weekly_workout_plan.trim().is_empty() {
            return Err(ValidationError::Empty {
                field: "weeklyWorkoutPlan",
            }
            .into());
        }
        let today = input.weekday()?;
        let prompt = prompts::render(
            prompts::DAILY_WORKOUT,
            &[
                ("weeklyWorkoutPlan", input.weekly_workout_plan.as_str()),
                ("today", today),
            ],
        );
        self.ask("daily_workout", prompt, Vec::new(), prompts::daily_workout_schema())
            .await
    }

    #[instrument(skip(self))]
    pub async fn analyze_food(&self, query: &str) -> Result<FoodAnalysis, GatewayError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ValidationError::Empty { field: "query" }.into());
        }
        let prompt = prompts::render(prompts::FOOD_TEXT, &[("query", query)]);
        self.ask("food_text", prompt, Vec::new(), prompts::food_analysis_schema())
            .await
    }

    #[instrument(skip(self))]
    pub async fn lookup_barcode(&self, barcode: &str) -> Result<FoodAnalysis, GatewayError> {
        let barcode = validate_barcode(barcode)?;
        let prompt = prompts::render(prompts::BARCODE, &[("barcode", barcode)]);
        self.ask("barcode", prompt, Vec::new(), prompts::food_analysis_schema())
            .await
    }

    #[instrument(skip(self, photo_data_uri), fields(len = photo_data_uri.len()))]
    pub async fn analyze_food_image(
        &self,
        photo_data_uri: &str,
    ) -> Result<FoodAnalysis, GatewayError> {
        let image = parse_data_uri(photo_data_uri)?;
        self.ask(
            "food_image",
            prompts::FOOD_IMAGE.to_string(),
            vec![image],
            prompts::food_analysis_schema(),
        )
        .await
    }

    pub async fn workout_plan_action(
        &self,
        input: &WorkoutPlanInput,
    ) -> ActionResponse<WeeklyWorkoutPlan> {
        match self.generate_workout_plan(input).await {
            Ok(plan) => ActionResponse::ok(plan),
            Err(GatewayError::Validation(e)) => ActionResponse::fail(validation_message(&e)),
            Err(e @ GatewayError::EmptyOutput) => {
                ActionResponse::from_error("workout_plan", &e, PLAN_EMPTY_MESSAGE)
            }
            Err(e) => ActionResponse::from_error("workout_plan", &e, PLAN_FAILED_MESSAGE),
        }
    }

    pub async fn daily_workout_action(
        &self,
        input: &DailyWorkoutInput,
    ) -> ActionResponse<DailyWorkout> {
        respond(
            "daily_workout",
            self.structure_daily_workout(input).await,
            DAILY_WORKOUT_FAILED_MESSAGE,
        )
    }

    pub async fn analyze_food_action(&self, query: &str) -> ActionResponse<FoodAnalysis> {
        respond("food_text", self.analyze_food(query).await, FOOD_FAILED_MESSAGE)
    }

    pub async fn lookup_barcode_action(&self, barcode: &str) -> ActionResponse<FoodAnalysis> {
        respond(
            "barcode",
            self.lookup_barcode(barcode).await,
            BARCODE_FAILED_MESSAGE,
        )
    }

    pub async fn analyze_food_image_action(
        &self,
        photo_data_uri: &str,
    ) -> ActionResponse<FoodAnalysis> {
        respond(
            "food_image",
            self.analyze_food_image(photo_data_uri).await,
            IMAGE_FAILED_MESSAGE,
        )
    }
}

fn respond<T>(
    action: &'static str,
    result: Result<T, GatewayError>,
    message: &str,
) -> ActionResponse<T> {
    match result {
        Ok(data) => ActionResponse::ok(data),
        Err(GatewayError::Validation(e)) => ActionResponse::fail(validation_message(&e)),
        Err(e) => ActionResponse::from_error(action, &e, message),
    }
}

/// User-facing text for a validation failure.
fn validation_message(err: &ValidationError) -> String {
    match err {
        ValidationError::Invalid { reason, .. } if reason.starts_with("Please") => reason.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn barcodes_are_checked_before_any_call() {
        assert_eq!(validate_barcode(" 016000275287 "), Ok("016000275287"));
        assert!(validate_barcode("96385074").is_ok());
        assert!(validate_barcode("01600027528X").is_err());
        assert!(validate_barcode("12345").is_err());
        assert_eq!(
            validate_barcode(""),
            Err(ValidationError::Empty { field: "barcode" })
        );
    }

    #[test]
    fn data_uri_is_split_and_checked() {
        let image = parse_data_uri("data:image/jpeg;base64,aGVsbG8=").unwrap();
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.data, "aGVsbG8=");

        assert!(parse_data_uri("image/jpeg;base64,aGVsbG8=").is_err());
        assert!(parse_data_uri("data:text/plain;base64,aGVsbG8=").is_err());
        assert!(parse_data_uri("data:image/png,raw").is_err());
        assert!(parse_data_uri("data:image/png;base64,@@@").is_err());
    }

    #[test]
    fn plan_input_requires_equipment_and_diet() {
        let mut input = WorkoutPlanInput {
            fitness_level: FitnessLevel::Beginner,
            goals: FitnessGoal::Tone,
            available_equipment: "none".into(),
            dietary_preferences: " ".into(),
        };
        let err = input.validate().unwrap_err();
        assert!(validation_message(&err).starts_with("Please specify your dietary preferences"));
        input.dietary_preferences = "vegan".into();
        assert!(input.validate().is_ok());
    }

    #[test]
    fn weekday_is_normalised() {
        let input = DailyWorkoutInput {
            weekly_workout_plan: "Monday: squats".into(),
            today: " monday".into(),
        };
        assert_eq!(input.weekday(), Ok("Monday"));
        let bad = DailyWorkoutInput {
            today: "Funday".into(),
            ..input
        };
        assert!(bad.weekday().is_err());
    }

    #[test]
    fn plan_input_wire_names() {
        let input: WorkoutPlanInput = serde_json::from_value(serde_json::json!({
            "fitnessLevel": "advanced",
            "goals": "muscle gain",
            "availableEquipment": "dumbbells",
            "dietaryPreferences": "none"
        }))
        .unwrap();
        assert_eq!(input.goals, FitnessGoal::MuscleGain);
    }
}
