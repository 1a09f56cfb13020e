//! Stable storage keys, one per durable record.

pub const TRANSACTIONS: &str = "organizer.transactions";
pub const TASKS: &str = "organizer.tasks";
pub const GROCERIES: &str = "organizer.groceries";
pub const NOTES: &str = "organizer.notes";
pub const NOTE_FOLDERS: &str = "organizer.note-folders";
pub const MOVIES: &str = "organizer.movies";
pub const TV_SHOWS: &str = "organizer.tv-shows";
pub const HABITS: &str = "organizer.habits";
pub const BOOKS: &str = "organizer.books";
pub const HOMEWORK: &str = "organizer.homework";
pub const PROJECTS: &str = "organizer.projects";
pub const MEALS: &str = "organizer.meals";
pub const RECIPES: &str = "organizer.recipes";
pub const FOOD_LOGS: &str = "organizer.food-logs";
pub const FOOD_ITEMS: &str = "organizer.food-items";
pub const WORKOUTS: &str = "organizer.workouts";
pub const EXERCISES: &str = "organizer.exercises";
pub const MEASUREMENTS: &str = "organizer.measurements";
pub const BIRTHDAYS: &str = "organizer.birthdays";
pub const EVENTS: &str = "organizer.events";
pub const CLIENTS: &str = "organizer.clients";
pub const APPOINTMENTS: &str = "organizer.appointments";
pub const SOCIAL_POSTS: &str = "organizer.social-posts";

pub const TRASH: &str = "organizer.trash";
pub const ACTIVE_SECTION: &str = "organizer.active-section";
pub const PIN: &str = "organizer.pin";
pub const THEME: &str = "organizer.theme";
