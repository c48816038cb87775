use serde::{Deserialize, Serialize};

use crate::days::model::{DailyRecord, NutritionEstimate};

/// Body of `POST /days/:date/meals`. The nutrition part is the analyzer's
/// reply shape, flattened: `{ "food": "...", "calories": n, "macros": {...} }`.
#[derive(Debug, Deserialize)]
pub struct AppendMealRequest {
    pub food: String,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(flatten)]
    pub estimate: NutritionEstimate,
}

#[derive(Debug, Deserialize)]
pub struct WeekQuery {
    pub today: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeekTotals {
    pub calories: f64,
    pub carbs: f64,
    pub protein: f64,
    pub fats: f64,
    pub average_calories: f64,
}

impl WeekTotals {
    pub fn from_days(days: &[DailyRecord]) -> Self {
        let mut totals = Self {
            calories: 0.0,
            carbs: 0.0,
            protein: 0.0,
            fats: 0.0,
            average_calories: 0.0,
        };
        for d in days {
            totals.calories += d.total_calories;
            totals.carbs += d.total_carbs;
            totals.protein += d.total_protein;
            totals.fats += d.total_fats;
        }
        if !days.is_empty() {
            totals.average_calories = totals.calories / days.len() as f64;
        }
        totals
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyResponse {
    pub week_start: String,
    pub week_end: String,
    pub days: Vec<DailyRecord>,
    pub totals: WeekTotals,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub removed: u64,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub imported: usize,
}
