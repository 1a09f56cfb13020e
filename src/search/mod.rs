//! Universal search across the tracker collections.
//!
//! A query is a plain case-insensitive substring. Collections are scanned in
//! a fixed order and all matches are concatenated before the result cap is
//! applied, so a broad query can be filled entirely by the collections that
//! come first.

use std::borrow::Cow;

use serde::Serialize;

use crate::collections::Collections;
use crate::config::SearchOptions;
use crate::model::{
    Appointment, Birthday, Book, Client, Entity, Event, GroceryItem, Habit, Homework, Movie, Note,
    Project, Recipe, Section, SocialMediaPost, TodoTask, Transaction, TvShow,
};

mod text;

pub use text::{highlight_regex, strip_html, truncate_graphemes};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub id: String,
    pub title: String,
    pub context: String,
    /// Where to navigate to see the entity.
    pub section: Section,
    pub original_id: String,
}

/// Searches with an explicit result cap and the default context length.
pub fn search(collections: &Collections, query: &str, limit: usize) -> Vec<SearchResult> {
    let options = SearchOptions {
        max_results: limit,
        ..SearchOptions::default()
    };
    search_with(collections, query, &options)
}

pub fn search_with(
    collections: &Collections,
    query: &str,
    options: &SearchOptions,
) -> Vec<SearchResult> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    let mut scan = Scan {
        needle,
        context_graphemes: options.context_graphemes,
        results: Vec::new(),
    };

    scan.collection::<Transaction>(collections);
    scan.collection::<TodoTask>(collections);
    scan.collection::<Note>(collections);
    scan.collection::<GroceryItem>(collections);
    scan.collection::<Movie>(collections);
    scan.collection::<TvShow>(collections);
    scan.collection::<Book>(collections);
    scan.collection::<Homework>(collections);
    scan.collection::<Project>(collections);
    scan.collection::<Habit>(collections);
    scan.collection::<Recipe>(collections);
    scan.collection::<Event>(collections);
    scan.collection::<Birthday>(collections);
    scan.collection::<Client>(collections);
    scan.collection::<Appointment>(collections);
    scan.collection::<SocialMediaPost>(collections);

    let mut results = scan.results;
    results.truncate(options.max_results);
    tracing::debug!(query, hits = results.len(), "search finished");
    results
}

struct Scan {
    needle: String,
    context_graphemes: usize,
    results: Vec<SearchResult>,
}

impl Scan {
    fn collection<T: Searchable>(&mut self, collections: &Collections) {
        for entity in collections.get::<T>() {
            let hit = entity
                .fields()
                .iter()
                .any(|field| text::contains_folded(field, &self.needle));
            if !hit {
                continue;
            }
            self.results.push(SearchResult {
                id: format!("{}-{}", T::SECTION.tag(), entity.id()),
                title: entity.title().to_string(),
                context: truncate_graphemes(&entity.context(), self.context_graphemes),
                section: T::SECTION.nav_section(),
                original_id: entity.id().to_string(),
            });
        }
    }
}

/// The fields a query is matched against and how a hit is shown.
trait Searchable: Entity {
    fn fields(&self) -> Vec<Cow<'_, str>>;
    fn title(&self) -> &str;
    fn context(&self) -> String;
}

fn joined(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" · ")
}

impl Searchable for Transaction {
    fn fields(&self) -> Vec<Cow<'_, str>> {
        vec![Cow::Borrowed(self.description.as_str())]
    }

    fn title(&self) -> &str {
        &self.description
    }

    fn context(&self) -> String {
        let amount = format!("{:.2}", self.signed_amount());
        joined(&[&self.category, &amount, &self.date])
    }
}

impl Searchable for TodoTask {
    fn fields(&self) -> Vec<Cow<'_, str>> {
        vec![Cow::Borrowed(self.text.as_str())]
    }

    fn title(&self) -> &str {
        &self.text
    }

    fn context(&self) -> String {
        let state = if self.completed { "Completed" } else { "Pending" };
        joined(&[state, self.due_date.as_deref().unwrap_or_default()])
    }
}

impl Searchable for Note {
    fn fields(&self) -> Vec<Cow<'_, str>> {
        vec![Cow::Borrowed(self.title.as_str()), Cow::Owned(strip_html(&self.content))]
    }

    fn title(&self) -> &str {
        if self.title.trim().is_empty() {
            "Untitled note"
        } else {
            &self.title
        }
    }

    fn context(&self) -> String {
        strip_html(&self.content)
    }
}

impl Searchable for GroceryItem {
    fn fields(&self) -> Vec<Cow<'_, str>> {
        vec![Cow::Borrowed(self.name.as_str())]
    }

    fn title(&self) -> &str {
        &self.name
    }

    fn context(&self) -> String {
        joined(&[self.quantity.as_deref().unwrap_or_default(), &self.category])
    }
}

impl Searchable for Movie {
    fn fields(&self) -> Vec<Cow<'_, str>> {
        vec![Cow::Borrowed(self.title.as_str())]
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn context(&self) -> String {
        joined(&[&self.genre, &self.status])
    }
}

impl Searchable for TvShow {
    fn fields(&self) -> Vec<Cow<'_, str>> {
        vec![Cow::Borrowed(self.title.as_str())]
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn context(&self) -> String {
        let progress = format!("S{}E{}", self.season, self.episode);
        joined(&[&self.status, &progress])
    }
}

impl Searchable for Book {
    fn fields(&self) -> Vec<Cow<'_, str>> {
        vec![Cow::Borrowed(self.title.as_str()), Cow::Borrowed(self.author.as_str())]
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn context(&self) -> String {
        joined(&[&self.author, &self.status])
    }
}

impl Searchable for Homework {
    fn fields(&self) -> Vec<Cow<'_, str>> {
        vec![Cow::Borrowed(self.title.as_str()), Cow::Borrowed(self.subject.as_str())]
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn context(&self) -> String {
        joined(&[&self.subject, &self.due_date])
    }
}

impl Searchable for Project {
    fn fields(&self) -> Vec<Cow<'_, str>> {
        vec![Cow::Borrowed(self.name.as_str()), Cow::Borrowed(self.description.as_str())]
    }

    fn title(&self) -> &str {
        &self.name
    }

    fn context(&self) -> String {
        joined(&[&self.status, &self.description])
    }
}

impl Searchable for Habit {
    fn fields(&self) -> Vec<Cow<'_, str>> {
        vec![Cow::Borrowed(self.name.as_str())]
    }

    fn title(&self) -> &str {
        &self.name
    }

    fn context(&self) -> String {
        self.frequency.clone()
    }
}

impl Searchable for Recipe {
    fn fields(&self) -> Vec<Cow<'_, str>> {
        vec![Cow::Borrowed(self.name.as_str())]
    }

    fn title(&self) -> &str {
        &self.name
    }

    fn context(&self) -> String {
        self.ingredients.join(", ")
    }
}

impl Searchable for Event {
    fn fields(&self) -> Vec<Cow<'_, str>> {
        vec![Cow::Borrowed(self.title.as_str()), Cow::Borrowed(self.location.as_str())]
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn context(&self) -> String {
        joined(&[&self.date, &self.time, &self.location])
    }
}

impl Searchable for Birthday {
    fn fields(&self) -> Vec<Cow<'_, str>> {
        vec![Cow::Borrowed(self.name.as_str())]
    }

    fn title(&self) -> &str {
        &self.name
    }

    fn context(&self) -> String {
        self.date.clone()
    }
}

impl Searchable for Client {
    fn fields(&self) -> Vec<Cow<'_, str>> {
        vec![Cow::Borrowed(self.name.as_str())]
    }

    fn title(&self) -> &str {
        &self.name
    }

    fn context(&self) -> String {
        joined(&[&self.email, &self.phone])
    }
}

impl Searchable for Appointment {
    fn fields(&self) -> Vec<Cow<'_, str>> {
        vec![Cow::Borrowed(self.title.as_str())]
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn context(&self) -> String {
        joined(&[&self.date, &self.time])
    }
}

impl Searchable for SocialMediaPost {
    fn fields(&self) -> Vec<Cow<'_, str>> {
        vec![Cow::Borrowed(self.content.as_str())]
    }

    fn title(&self) -> &str {
        &self.platform
    }

    fn context(&self) -> String {
        joined(&[&self.content, &self.scheduled_date])
    }
}
