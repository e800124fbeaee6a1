//! AI gateway: typed flows over a structured-output completion service,
//! plus the calorie formulas that need no model at all.

pub mod calories;
mod completion;
mod flows;
pub mod prompts;

use serde::Serialize;
use tracing::error;

pub use completion::{
    CompletionRequest, CompletionService, GeminiCompletion, InlineImage, MockCompletion,
};
pub use flows::{
    parse_data_uri, validate_barcode, AiGateway, DailyWorkoutInput, FitnessGoal, FitnessLevel,
    FoodAnalysis, WeeklyWorkoutPlan, WorkoutPlanInput, BARCODE_FAILED_MESSAGE,
    DAILY_WORKOUT_FAILED_MESSAGE, FOOD_FAILED_MESSAGE, IMAGE_FAILED_MESSAGE,
    PLAN_EMPTY_MESSAGE, PLAN_FAILED_MESSAGE,
};

/// Outcome handed to the UI: never an error value, always this shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ActionResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }

    /// Log `err` and turn it into a failure carrying `message`.
    pub(crate) fn from_error(action: &'static str, err: &crate::error::GatewayError, message: &str) -> Self {
        error!(action, error = %err, "ai action failed");
        Self::fail(message)
    }

    pub fn into_result(self) -> Result<T, String> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(self.error.unwrap_or_default()),
        }
    }
}
