/// Implements [`Entity`](crate::model::Entity) for a record stored in the
/// `Collections` field `$field` under `Section::$section`.
macro_rules! impl_entity {
    ($ty:ident, $section:ident, $field:ident) => {
        impl $crate::model::Entity for $ty {
            const SECTION: $crate::model::Section = $crate::model::Section::$section;

            impl_entity!(@common $section, $field);
        }
    };
    ($ty:ident, $section:ident, $field:ident, sort = $sort:path) => {
        impl $crate::model::Entity for $ty {
            const SECTION: $crate::model::Section = $crate::model::Section::$section;

            fn sort_canonical(items: &mut [Self]) {
                $sort(items)
            }

            impl_entity!(@common $section, $field);
        }
    };
    (@common $section:ident, $field:ident) => {
        fn id(&self) -> &str {
            &self.id
        }

        fn stamp_new(&mut self, now_millis: i64) {
            if self.id.trim().is_empty() {
                self.id = $crate::model::new_entity_id(now_millis);
            }
            if self.created_at == 0 {
                self.created_at = now_millis;
            }
        }

        fn into_record(self) -> $crate::model::EntityRecord {
            $crate::model::EntityRecord::$section(self)
        }

        fn cell(
            collections: &$crate::collections::Collections,
        ) -> &$crate::storage::PersistedCell<$crate::model::EntityList<Self>> {
            &collections.$field
        }

        fn cell_mut(
            collections: &mut $crate::collections::Collections,
        ) -> &mut $crate::storage::PersistedCell<$crate::model::EntityList<Self>> {
            &mut collections.$field
        }
    };
}

/// Runs `$body` with `$t` aliased to the entity type stored under `$section`.
macro_rules! dispatch_section {
    ($section:expr, $t:ident => $body:expr) => {{
        use $crate::model::Section;
        match $section {
            Section::Budget => {
                type $t = $crate::model::Transaction;
                $body
            }
            Section::Todo => {
                type $t = $crate::model::TodoTask;
                $body
            }
            Section::Groceries => {
                type $t = $crate::model::GroceryItem;
                $body
            }
            Section::Notes => {
                type $t = $crate::model::Note;
                $body
            }
            Section::NoteFolders => {
                type $t = $crate::model::NoteFolder;
                $body
            }
            Section::Movies => {
                type $t = $crate::model::Movie;
                $body
            }
            Section::TvShows => {
                type $t = $crate::model::TvShow;
                $body
            }
            Section::Habits => {
                type $t = $crate::model::Habit;
                $body
            }
            Section::Books => {
                type $t = $crate::model::Book;
                $body
            }
            Section::Homework => {
                type $t = $crate::model::Homework;
                $body
            }
            Section::Projects => {
                type $t = $crate::model::Project;
                $body
            }
            Section::MealPlanner => {
                type $t = $crate::model::Meal;
                $body
            }
            Section::Recipes => {
                type $t = $crate::model::Recipe;
                $body
            }
            Section::FoodLog => {
                type $t = $crate::model::FoodLog;
                $body
            }
            Section::FoodItems => {
                type $t = $crate::model::FoodItem;
                $body
            }
            Section::Workouts => {
                type $t = $crate::model::Workout;
                $body
            }
            Section::Exercises => {
                type $t = $crate::model::Exercise;
                $body
            }
            Section::Measurements => {
                type $t = $crate::model::Measurement;
                $body
            }
            Section::Birthdays => {
                type $t = $crate::model::Birthday;
                $body
            }
            Section::Events => {
                type $t = $crate::model::Event;
                $body
            }
            Section::Clients => {
                type $t = $crate::model::Client;
                $body
            }
            Section::Appointments => {
                type $t = $crate::model::Appointment;
                $body
            }
            Section::SocialMedia => {
                type $t = $crate::model::SocialMediaPost;
                $body
            }
        }
    }};
}

/// Runs `$body` with `$entity` bound to the payload of an `EntityRecord`.
macro_rules! with_record {
    ($record:expr, $entity:ident => $body:expr) => {{
        use $crate::model::EntityRecord;
        match $record {
            EntityRecord::Budget($entity) => $body,
            EntityRecord::Todo($entity) => $body,
            EntityRecord::Groceries($entity) => $body,
            EntityRecord::Notes($entity) => $body,
            EntityRecord::NoteFolders($entity) => $body,
            EntityRecord::Movies($entity) => $body,
            EntityRecord::TvShows($entity) => $body,
            EntityRecord::Habits($entity) => $body,
            EntityRecord::Books($entity) => $body,
            EntityRecord::Homework($entity) => $body,
            EntityRecord::Projects($entity) => $body,
            EntityRecord::MealPlanner($entity) => $body,
            EntityRecord::Recipes($entity) => $body,
            EntityRecord::FoodLog($entity) => $body,
            EntityRecord::FoodItems($entity) => $body,
            EntityRecord::Workouts($entity) => $body,
            EntityRecord::Exercises($entity) => $body,
            EntityRecord::Measurements($entity) => $body,
            EntityRecord::Birthdays($entity) => $body,
            EntityRecord::Events($entity) => $body,
            EntityRecord::Clients($entity) => $body,
            EntityRecord::Appointments($entity) => $body,
            EntityRecord::SocialMedia($entity) => $body,
        }
    }};
}

pub(crate) use dispatch_section;
pub(crate) use impl_entity;
pub(crate) use with_record;
