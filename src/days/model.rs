use serde::{Deserialize, Serialize};
use time::Date;

time::serde::format_description!(iso_day, Date, "[year]-[month]-[day]");

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Macros {
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub fats: f64,
}

/// Nutrition estimate as returned by the food analyzer:
/// `{ "calories": n, "macros": { "carbs": n, "protein": n, "fats": n } }`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionEstimate {
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub macros: Macros,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MealEntry {
    /// Display string only, e.g. "12:30".
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub food: String,
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub macros: Macros,
}

impl MealEntry {
    pub fn from_estimate(
        time: impl Into<String>,
        food: impl Into<String>,
        estimate: NutritionEstimate,
    ) -> Self {
        Self {
            time: time.into(),
            food: food.into(),
            calories: estimate.calories,
            macros: estimate.macros,
        }
    }
}

/// Aggregated nutrition and meal log for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRecord {
    #[serde(with = "iso_day")]
    pub date: Date,
    #[serde(default)]
    pub total_calories: f64,
    #[serde(default)]
    pub total_carbs: f64,
    #[serde(default)]
    pub total_protein: f64,
    #[serde(default)]
    pub total_fats: f64,
    #[serde(default)]
    pub meals: Vec<MealEntry>,
}

impl DailyRecord {
    /// Zero totals, no meals.
    pub fn empty(date: Date) -> Self {
        Self {
            date,
            total_calories: 0.0,
            total_carbs: 0.0,
            total_protein: 0.0,
            total_fats: 0.0,
            meals: Vec::new(),
        }
    }

    /// Re-derives the four totals from the meal list.
    pub fn recompute_totals(&mut self) {
        let (mut calories, mut carbs, mut protein, mut fats) = (0.0, 0.0, 0.0, 0.0);
        for meal in &self.meals {
            calories += meal.calories;
            carbs += meal.macros.carbs;
            protein += meal.macros.protein;
            fats += meal.macros.fats;
        }
        self.total_calories = calories;
        self.total_carbs = carbs;
        self.total_protein = protein;
        self.total_fats = fats;
    }

    /// Name of the first offending field, if any number is negative or not finite.
    pub fn invalid_field(&self) -> Option<&'static str> {
        let totals = [
            ("totalCalories", self.total_calories),
            ("totalCarbs", self.total_carbs),
            ("totalProtein", self.total_protein),
            ("totalFats", self.total_fats),
        ];
        totals
            .into_iter()
            .find(|(_, v)| !is_valid_amount(*v))
            .map(|(name, _)| name)
            .or_else(|| self.meals.iter().find_map(MealEntry::invalid_field))
    }
}

impl MealEntry {
    pub fn invalid_field(&self) -> Option<&'static str> {
        [
            ("calories", self.calories),
            ("macros.carbs", self.macros.carbs),
            ("macros.protein", self.macros.protein),
            ("macros.fats", self.macros.fats),
        ]
        .into_iter()
        .find(|(_, v)| !is_valid_amount(*v))
        .map(|(name, _)| name)
    }
}

fn is_valid_amount(v: f64) -> bool {
    v.is_finite() && v >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn meal(food: &str, calories: f64, carbs: f64, protein: f64, fats: f64) -> MealEntry {
        MealEntry {
            time: "08:00".into(),
            food: food.into(),
            calories,
            macros: Macros {
                carbs,
                protein,
                fats,
            },
        }
    }

    #[test]
    fn serializes_with_camel_case_and_iso_date() {
        let mut rec = DailyRecord::empty(date!(2024 - 01 - 01));
        rec.meals.push(meal("apple", 95.0, 25.0, 0.0, 0.0));
        rec.recompute_totals();

        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["date"], "2024-01-01");
        assert_eq!(json["totalCalories"], 95.0);
        assert_eq!(json["totalCarbs"], 25.0);
        assert_eq!(json["meals"][0]["food"], "apple");
        assert_eq!(json["meals"][0]["macros"]["carbs"], 25.0);
    }

    #[test]
    fn missing_numbers_default_to_zero() {
        let raw = r#"{
            "date": "2023-12-31",
            "totalCalories": 300,
            "meals": [{ "time": "9:15 AM", "food": "toast", "calories": 300 }]
        }"#;
        let rec: DailyRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(rec.date, date!(2023 - 12 - 31));
        assert_eq!(rec.total_calories, 300.0);
        assert_eq!(rec.total_carbs, 0.0);
        assert_eq!(rec.total_fats, 0.0);
        assert_eq!(rec.meals[0].macros, Macros::default());
    }

    #[test]
    fn rejects_non_iso_date() {
        let raw = r#"{ "date": "01/02/2024" }"#;
        assert!(serde_json::from_str::<DailyRecord>(raw).is_err());
    }

    #[test]
    fn recompute_totals_sums_meals() {
        let mut rec = DailyRecord::empty(date!(2024 - 05 - 05));
        rec.total_calories = 9999.0;
        rec.meals.push(meal("oats", 150.0, 27.0, 5.0, 3.0));
        rec.meals.push(meal("eggs", 140.0, 1.0, 12.0, 10.0));
        rec.recompute_totals();

        assert_eq!(rec.total_calories, 290.0);
        assert_eq!(rec.total_carbs, 28.0);
        assert_eq!(rec.total_protein, 17.0);
        assert_eq!(rec.total_fats, 13.0);

        rec.meals.clear();
        rec.recompute_totals();
        assert_eq!(rec.total_calories, 0.0);
    }

    #[test]
    fn invalid_field_flags_negative_and_nan() {
        let mut rec = DailyRecord::empty(date!(2024 - 05 - 05));
        assert_eq!(rec.invalid_field(), None);

        rec.total_fats = -1.0;
        assert_eq!(rec.invalid_field(), Some("totalFats"));

        rec.total_fats = 0.0;
        rec.meals.push(meal("mystery", f64::NAN, 0.0, 0.0, 0.0));
        assert_eq!(rec.invalid_field(), Some("calories"));
    }

    #[test]
    fn meal_from_analyzer_reply() {
        let reply = r#"{"calories": 250, "macros": {"carbs": 30, "protein": 15, "fats": 8}}"#;
        let estimate: NutritionEstimate = serde_json::from_str(reply).unwrap();
        let m = MealEntry::from_estimate("12:00", "burrito bowl", estimate);
        assert_eq!(m.calories, 250.0);
        assert_eq!(m.macros.protein, 15.0);
        assert_eq!(m.food, "burrito bowl");
    }
}
