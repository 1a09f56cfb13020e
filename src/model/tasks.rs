use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull, DisplayFromStr, PickFirst};

use super::{impl_entity, ExtraFields};

#[serde_as]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TodoTask {
    #[serde_as(as = "DefaultOnNull")]
    pub id: String,
    #[serde_as(as = "DefaultOnNull")]
    pub text: String,
    #[serde_as(as = "DefaultOnNull")]
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde_as(as = "DefaultOnNull<PickFirst<(_, DisplayFromStr)>>")]
    pub created_at: i64,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroceryItem {
    #[serde_as(as = "DefaultOnNull")]
    pub id: String,
    #[serde_as(as = "DefaultOnNull")]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
    #[serde_as(as = "DefaultOnNull")]
    pub category: String,
    #[serde_as(as = "DefaultOnNull")]
    pub purchased: bool,
    #[serde_as(as = "DefaultOnNull<PickFirst<(_, DisplayFromStr)>>")]
    pub created_at: i64,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Habit {
    #[serde_as(as = "DefaultOnNull")]
    pub id: String,
    #[serde_as(as = "DefaultOnNull")]
    pub name: String,
    #[serde_as(as = "DefaultOnNull")]
    pub frequency: String,
    /// `YYYY-MM-DD` days on which the habit was done
    #[serde_as(as = "DefaultOnNull")]
    pub completed_dates: Vec<String>,
    #[serde_as(as = "DefaultOnNull<PickFirst<(_, DisplayFromStr)>>")]
    pub created_at: i64,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Homework {
    #[serde_as(as = "DefaultOnNull")]
    pub id: String,
    #[serde_as(as = "DefaultOnNull")]
    pub title: String,
    #[serde_as(as = "DefaultOnNull")]
    pub subject: String,
    #[serde_as(as = "DefaultOnNull")]
    pub due_date: String,
    #[serde_as(as = "DefaultOnNull")]
    pub completed: bool,
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
pub struct Project {
    #[serde_as(as = "DefaultOnNull")]
    pub id: String,
    #[serde_as(as = "DefaultOnNull")]
    pub name: String,
    #[serde_as(as = "DefaultOnNull")]
    pub description: String,
    #[serde_as(as = "DefaultOnNull")]
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    #[serde_as(as = "DefaultOnNull")]
    pub tasks: Vec<serde_json::Value>,
    #[serde_as(as = "DefaultOnNull<PickFirst<(_, DisplayFromStr)>>")]
    pub created_at: i64,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

fn newest_tasks_first(items: &mut [TodoTask]) {
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

fn newest_groceries_first(items: &mut [GroceryItem]) {
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

fn newest_habits_first(items: &mut [Habit]) {
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

fn soonest_due_first(items: &mut [Homework]) {
    items.sort_by(|a, b| a.due_date.cmp(&b.due_date));
}

fn newest_projects_first(items: &mut [Project]) {
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

impl_entity!(TodoTask, Todo, tasks, sort = newest_tasks_first);
impl_entity!(GroceryItem, Groceries, groceries, sort = newest_groceries_first);
impl_entity!(Habit, Habits, habits, sort = newest_habits_first);
impl_entity!(Homework, Homework, homework, sort = soonest_due_first);
impl_entity!(Project, Projects, projects, sort = newest_projects_first);
