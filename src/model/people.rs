use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull, DisplayFromStr, PickFirst};

use super::{cmp_name, impl_entity, ExtraFields};

#[serde_as]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Birthday {
    #[serde_as(as = "DefaultOnNull")]
    pub id: String,
    #[serde_as(as = "DefaultOnNull")]
    pub name: String,
    #[serde_as(as = "DefaultOnNull")]
    pub date: String,
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
pub struct Event {
    #[serde_as(as = "DefaultOnNull")]
    pub id: String,
    #[serde_as(as = "DefaultOnNull")]
    pub title: String,
    #[serde_as(as = "DefaultOnNull")]
    pub date: String,
    /// `HH:MM`
    #[serde_as(as = "DefaultOnNull")]
    pub time: String,
    #[serde_as(as = "DefaultOnNull")]
    pub location: String,
    #[serde_as(as = "DefaultOnNull")]
    pub description: String,
    #[serde_as(as = "DefaultOnNull<PickFirst<(_, DisplayFromStr)>>")]
    pub created_at: i64,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Client {
    #[serde_as(as = "DefaultOnNull")]
    pub id: String,
    #[serde_as(as = "DefaultOnNull")]
    pub name: String,
    #[serde_as(as = "DefaultOnNull")]
    pub email: String,
    #[serde_as(as = "DefaultOnNull")]
    pub phone: String,
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
pub struct Appointment {
    #[serde_as(as = "DefaultOnNull")]
    pub id: String,
    #[serde_as(as = "DefaultOnNull")]
    pub client_id: String,
    #[serde_as(as = "DefaultOnNull")]
    pub title: String,
    #[serde_as(as = "DefaultOnNull")]
    pub date: String,
    #[serde_as(as = "DefaultOnNull")]
    pub time: String,
    /// Minutes
    #[serde_as(as = "DefaultOnNull<PickFirst<(_, DisplayFromStr)>>")]
    pub duration: u32,
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
pub struct SocialMediaPost {
    #[serde_as(as = "DefaultOnNull")]
    pub id: String,
    #[serde_as(as = "DefaultOnNull")]
    pub platform: String,
    #[serde_as(as = "DefaultOnNull")]
    pub content: String,
    #[serde_as(as = "DefaultOnNull")]
    pub scheduled_date: String,
    /// `draft`, `scheduled` or `published`
    #[serde_as(as = "DefaultOnNull")]
    pub status: String,
    #[serde_as(as = "DefaultOnNull<PickFirst<(_, DisplayFromStr)>>")]
    pub created_at: i64,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

fn birthdays_by_name(items: &mut [Birthday]) {
    items.sort_by(|a, b| cmp_name(&a.name, &b.name));
}

fn events_in_calendar_order(items: &mut [Event]) {
    items.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.time.cmp(&b.time)));
}

fn clients_by_name(items: &mut [Client]) {
    items.sort_by(|a, b| cmp_name(&a.name, &b.name));
}

fn appointments_in_calendar_order(items: &mut [Appointment]) {
    items.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.time.cmp(&b.time)));
}

fn posts_by_schedule(items: &mut [SocialMediaPost]) {
    items.sort_by(|a, b| a.scheduled_date.cmp(&b.scheduled_date));
}

impl_entity!(Birthday, Birthdays, birthdays, sort = birthdays_by_name);
impl_entity!(Event, Events, events, sort = events_in_calendar_order);
impl_entity!(Client, Clients, clients, sort = clients_by_name);
impl_entity!(Appointment, Appointments, appointments, sort = appointments_in_calendar_order);
impl_entity!(SocialMediaPost, SocialMedia, social_posts, sort = posts_by_schedule);
