use serde::{Serialize, Serializer};
use serde_json::Value;

use super::{
    dispatch_section, with_record, Appointment, Birthday, Book, Client, Entity, Event, Exercise,
    FoodItem, FoodLog, GroceryItem, Habit, Homework, Meal, Measurement, Movie, Note, NoteFolder,
    Project, Recipe, Section, SocialMediaPost, TodoTask, Transaction, TvShow, Workout,
};

/// One entity together with the section that owns it.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityRecord {
    Budget(Transaction),
    Todo(TodoTask),
    Groceries(GroceryItem),
    Notes(Note),
    NoteFolders(NoteFolder),
    Movies(Movie),
    TvShows(TvShow),
    Habits(Habit),
    Books(Book),
    Homework(Homework),
    Projects(Project),
    MealPlanner(Meal),
    Recipes(Recipe),
    FoodLog(FoodLog),
    FoodItems(FoodItem),
    Workouts(Workout),
    Exercises(Exercise),
    Measurements(Measurement),
    Birthdays(Birthday),
    Events(Event),
    Clients(Client),
    Appointments(Appointment),
    SocialMedia(SocialMediaPost),
}

impl EntityRecord {
    pub fn section(&self) -> Section {
        fn section_of<T: Entity>(_entity: &T) -> Section {
            T::SECTION
        }
        with_record!(self, entity => section_of(entity))
    }

    pub fn id(&self) -> &str {
        with_record!(self, entity => entity.id())
    }

    /// Parses `data` as the entity type stored under `section`.
    pub fn from_value(section: Section, data: Value) -> Result<Self, serde_json::Error> {
        dispatch_section!(section, T => serde_json::from_value::<T>(data).map(T::into_record))
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        with_record!(self, entity => serde_json::to_value(entity))
    }

    /// Fills in a missing id and timestamps for a record about to be inserted.
    pub fn stamp_new(&mut self, now_millis: i64) {
        if let EntityRecord::Notes(note) = &mut *self {
            if note.updated_at == 0 {
                note.updated_at = now_millis;
            }
        }
        with_record!(self, entity => entity.stamp_new(now_millis))
    }

    /// Best human-readable name for listings.
    pub fn display_name(&self) -> &str {
        let name = match self {
            EntityRecord::Budget(tx) => tx.description.as_str(),
            EntityRecord::Todo(task) => task.text.as_str(),
            EntityRecord::Groceries(item) => item.name.as_str(),
            EntityRecord::Notes(note) => note.title.as_str(),
            EntityRecord::NoteFolders(folder) => folder.name.as_str(),
            EntityRecord::Movies(movie) => movie.title.as_str(),
            EntityRecord::TvShows(show) => show.title.as_str(),
            EntityRecord::Habits(habit) => habit.name.as_str(),
            EntityRecord::Books(book) => book.title.as_str(),
            EntityRecord::Homework(hw) => hw.title.as_str(),
            EntityRecord::Projects(project) => project.name.as_str(),
            EntityRecord::MealPlanner(meal) => meal.name.as_str(),
            EntityRecord::Recipes(recipe) => recipe.name.as_str(),
            EntityRecord::FoodLog(log) => log.name.as_str(),
            EntityRecord::FoodItems(item) => item.name.as_str(),
            EntityRecord::Workouts(workout) => workout.name.as_str(),
            EntityRecord::Exercises(exercise) => exercise.name.as_str(),
            EntityRecord::Measurements(m) => m.date.as_str(),
            EntityRecord::Birthdays(b) => b.name.as_str(),
            EntityRecord::Events(event) => event.title.as_str(),
            EntityRecord::Clients(client) => client.name.as_str(),
            EntityRecord::Appointments(appt) => appt.title.as_str(),
            EntityRecord::SocialMedia(post) => post.content.as_str(),
        };
        if name.trim().is_empty() {
            self.id()
        } else {
            name
        }
    }
}

/// Serializes as the bare entity; the section travels separately.
impl Serialize for EntityRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        with_record!(self, entity => entity.serialize(serializer))
    }
}
