//! Prompt templates and response schemas for each gateway flow.
//!
//! Templates use `{{{name}}}` placeholders.

use serde_json::{json, Value};

pub const WORKOUT_PLAN: &str = r#"You are an expert fitness coach. Generate a personalized weekly workout plan for the user, considering the following information:

Fitness Level: {{{fitnessLevel}}}
Goals: {{{goals}}}
Available Equipment: {{{availableEquipment}}}
Dietary Preferences: {{{dietaryPreferences}}}

Structure your response with the following sections EXACTLY as written below, with content under each:
1. Justification: Start with this exact keyword. Briefly explain why this plan suits the user's goals.
2. Monday: Start with this exact keyword. List the exercises, sets, reps, and rest times.
3. Tuesday: Start with this exact keyword. List the exercises, sets, reps, and rest times.
4. Wednesday: Start with this exact keyword. List the exercises, sets, reps, and rest times.
5. Thursday: Start with this exact keyword. List the exercises, sets, reps, and rest times.
6. Friday: Start with this exact keyword. List the exercises, sets, reps, and rest times.
7. Saturday: Start with this exact keyword. List the exercises, sets, reps, and rest times.
8. Sunday: Start with this exact keyword. List the exercises, sets, reps, and rest times (often a rest day).
9. Dietary Guidelines: Start with this exact keyword. Give basic dietary guidelines matching the user's goals and preferences.
"#;

pub const DAILY_WORKOUT: &str = r#"You are an expert fitness trainer AI that runs workouts step by step.

Weekly workout plan:
{{{weeklyWorkoutPlan}}}

Today is {{{today}}}.

Find the workout for today and break it into steps:
- A single warm-up step first, if the plan has one.
- Then every exercise set by set, with the exact rest time after each set.

Rules:
- If there is no workout for today, set workoutExists to false and return no steps.
- Keep the sets, reps, and rest times from the plan. Do not invent exercises.
- Rest steps have type "rest", name "Rest", isRest true and duration equal to the rest time in seconds.
- Exercise and warm-up steps have isRest false.
- reps is a string, since it may be a range like "6-8".
- duration is the number of seconds for the step.
"#;

pub const FOOD_TEXT: &str = r#"You are a nutrition expert. Analyze the user's food query and give the nutritional information for the specified amount.

Query: {{{query}}}

1. Clean up the food name into a simple, display-friendly string (e.g. "Boiled Egg").
2. Estimate calories, protein, carbohydrates and fat for the exact query.
3. Return a list of common measurements for this food. It MUST include a base unit "g" or "ml" with quantity 1.
   Every other measurement gives its unit name (e.g. "slice", "cup", "medium") and its size in base units
   (if a medium apple is 182 g, the "medium" quantity is 182).

Example for "1 medium apple": foodName "Apple", calories 95 for one medium apple,
measurements [{unit "g", quantity 1}, {unit "medium", quantity 182}, {unit "slice", quantity 15}].
"#;

pub const BARCODE: &str = r#"You are an expert nutrition database API. Use a global UPC/EAN barcode database (such as Open Food Facts) to find the exact product and its nutritional information.

Barcode: {{{barcode}}}

1. Look up the product with this barcode and return its precise product name.
2. Give calories, protein, carbohydrates and fat for one standard serving as printed on the label, or 100 g if there is none.
3. Return a list of common measurements. It MUST include a base unit "g" or "ml" with quantity 1, and a "serving" unit matching the nutrition above.

Example for barcode 016000275287: foodName "Cheerios Cereal", calories 140, protein 5, carbohydrates 29, fat 2.5,
measurements [{unit "g", quantity 1}, {unit "serving", quantity 39}, {unit "cup", quantity 39}].
"#;

pub const FOOD_IMAGE: &str = r#"You are a nutrition expert. Analyze the food in the attached image and give its nutritional information.

1. Identify the main food item as specifically as possible (e.g. "Fried Egg" rather than "Egg").
2. Estimate a reasonable portion size from the image. Your nutrition numbers refer to this portion.
3. Estimate calories, protein, carbohydrates and fat for that portion.
4. Return a list of common measurements. It MUST include a base unit "g" or "ml" with quantity 1,
   and the portion you estimated, named "serving", with its size in base units.
"#;

/// Substitute `{{{key}}}` placeholders. Unknown placeholders are left as is.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{{{{{key}}}}}}}"), value)
    })
}

pub fn workout_plan_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "weeklyWorkoutPlan": {
                "type": "STRING",
                "description": "Weekly workout plan tailored to the user's level, goals, equipment and diet."
            }
        },
        "required": ["weeklyWorkoutPlan"]
    })
}

pub fn daily_workout_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "day": {"type": "STRING"},
            "workoutExists": {"type": "BOOLEAN"},
            "steps": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "type": {"type": "STRING", "enum": ["warmup", "exercise_set", "rest"]},
                        "name": {"type": "STRING"},
                        "set": {"type": "INTEGER"},
                        "reps": {"type": "STRING"},
                        "duration": {"type": "INTEGER", "description": "Seconds"},
                        "isRest": {"type": "BOOLEAN"}
                    },
                    "required": ["type", "name", "duration", "isRest"]
                }
            }
        },
        "required": ["day", "workoutExists", "steps"]
    })
}

pub fn food_analysis_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "foodName": {"type": "STRING"},
            "calories": {"type": "NUMBER"},
            "protein": {"type": "NUMBER"},
            "carbohydrates": {"type": "NUMBER"},
            "fat": {"type": "NUMBER"},
            "measurements": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "unit": {"type": "STRING"},
                        "quantity": {"type": "NUMBER"}
                    },
                    "required": ["unit", "quantity"]
                }
            }
        },
        "required": ["foodName", "calories", "protein", "carbohydrates", "fat", "measurements"]
    })
}
