use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull, DisplayFromStr, PickFirst};

use super::{cmp_name, impl_entity, ExtraFields};

#[serde_as]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Meal {
    #[serde_as(as = "DefaultOnNull")]
    pub id: String,
    #[serde_as(as = "DefaultOnNull")]
    pub name: String,
    #[serde_as(as = "DefaultOnNull")]
    pub date: String,
    /// `breakfast`, `lunch`, `dinner` or `snack`
    #[serde_as(as = "DefaultOnNull")]
    pub meal_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe_id: Option<String>,
    #[serde_as(as = "DefaultOnNull")]
    pub notes: String,
    #[serde_as(as = "DefaultOnNull<PickFirst<(_, DisplayFromStr)>>")]
    pub created_at: i64,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Recipe {
    #[serde_as(as = "DefaultOnNull")]
    pub id: String,
    #[serde_as(as = "DefaultOnNull")]
    pub name: String,
    #[serde_as(as = "DefaultOnNull")]
    pub ingredients: Vec<String>,
    #[serde_as(as = "DefaultOnNull")]
    pub instructions: String,
    #[serde_as(as = "DefaultOnNull<PickFirst<(_, DisplayFromStr)>>")]
    pub servings: u32,
    #[serde_as(as = "DefaultOnNull<PickFirst<(_, DisplayFromStr)>>")]
    pub created_at: i64,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FoodLog {
    #[serde_as(as = "DefaultOnNull")]
    pub id: String,
    #[serde_as(as = "DefaultOnNull")]
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub food_item_id: Option<String>,
    #[serde_as(as = "DefaultOnNull")]
    pub name: String,
    #[serde_as(as = "DefaultOnNull<PickFirst<(_, DisplayFromStr)>>")]
    pub calories: f64,
    #[serde_as(as = "DefaultOnNull<PickFirst<(_, DisplayFromStr)>>")]
    pub servings: f64,
    #[serde_as(as = "DefaultOnNull")]
    pub meal_type: String,
    #[serde_as(as = "DefaultOnNull<PickFirst<(_, DisplayFromStr)>>")]
    pub created_at: i64,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FoodItem {
    #[serde_as(as = "DefaultOnNull")]
    pub id: String,
    #[serde_as(as = "DefaultOnNull")]
    pub name: String,
    #[serde_as(as = "DefaultOnNull<PickFirst<(_, DisplayFromStr)>>")]
    pub calories: f64,
    #[serde_as(as = "DefaultOnNull<PickFirst<(_, DisplayFromStr)>>")]
    pub protein: f64,
    #[serde_as(as = "DefaultOnNull<PickFirst<(_, DisplayFromStr)>>")]
    pub carbs: f64,
    #[serde_as(as = "DefaultOnNull<PickFirst<(_, DisplayFromStr)>>")]
    pub fat: f64,
    #[serde_as(as = "DefaultOnNull")]
    pub serving_size: String,
    #[serde_as(as = "DefaultOnNull<PickFirst<(_, DisplayFromStr)>>")]
    pub created_at: i64,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Workout {
    #[serde_as(as = "DefaultOnNull")]
    pub id: String,
    #[serde_as(as = "DefaultOnNull")]
    pub name: String,
    #[serde_as(as = "DefaultOnNull")]
    pub date: String,
    #[serde_as(as = "DefaultOnNull<PickFirst<(_, DisplayFromStr)>>")]
    pub duration_minutes: u32,
    #[serde_as(as = "DefaultOnNull")]
    pub exercises: Vec<serde_json::Value>,
    #[serde_as(as = "DefaultOnNull")]
    pub notes: String,
    #[serde_as(as = "DefaultOnNull<PickFirst<(_, DisplayFromStr)>>")]
    pub created_at: i64,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Exercise {
    #[serde_as(as = "DefaultOnNull")]
    pub id: String,
    #[serde_as(as = "DefaultOnNull")]
    pub name: String,
    #[serde_as(as = "DefaultOnNull")]
    pub category: String,
    #[serde_as(as = "DefaultOnNull")]
    pub muscle_group: String,
    #[serde_as(as = "DefaultOnNull<PickFirst<(_, DisplayFromStr)>>")]
    pub created_at: i64,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Measurement {
    #[serde_as(as = "DefaultOnNull")]
    pub id: String,
    #[serde_as(as = "DefaultOnNull")]
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub body_fat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub waist: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub chest: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub hips: Option<f64>,
    #[serde_as(as = "DefaultOnNull")]
    pub notes: String,
    #[serde_as(as = "DefaultOnNull<PickFirst<(_, DisplayFromStr)>>")]
    pub created_at: i64,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

fn newest_meals_first(items: &mut [Meal]) {
    items.sort_by(|a, b| b.date.cmp(&a.date));
}

fn recipes_by_name(items: &mut [Recipe]) {
    items.sort_by(|a, b| cmp_name(&a.name, &b.name));
}

fn newest_logs_first(items: &mut [FoodLog]) {
    items.sort_by(|a, b| b.date.cmp(&a.date));
}

fn food_items_by_name(items: &mut [FoodItem]) {
    items.sort_by(|a, b| cmp_name(&a.name, &b.name));
}

fn newest_workouts_first(items: &mut [Workout]) {
    items.sort_by(|a, b| b.date.cmp(&a.date));
}

fn exercises_by_name(items: &mut [Exercise]) {
    items.sort_by(|a, b| cmp_name(&a.name, &b.name));
}

fn newest_measurements_first(items: &mut [Measurement]) {
    items.sort_by(|a, b| b.date.cmp(&a.date));
}

impl_entity!(Meal, MealPlanner, meals, sort = newest_meals_first);
impl_entity!(Recipe, Recipes, recipes, sort = recipes_by_name);
impl_entity!(FoodLog, FoodLog, food_logs, sort = newest_logs_first);
impl_entity!(FoodItem, FoodItems, food_items, sort = food_items_by_name);
impl_entity!(Workout, Workouts, workouts, sort = newest_workouts_first);
impl_entity!(Exercise, Exercises, exercises, sort = exercises_by_name);
impl_entity!(Measurement, Measurements, measurements, sort = newest_measurements_first);
