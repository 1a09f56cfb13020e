use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull, DisplayFromStr, PickFirst};

use super::{impl_entity, ExtraFields};

#[serde_as]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Movie {
    #[serde_as(as = "DefaultOnNull")]
    pub id: String,
    #[serde_as(as = "DefaultOnNull")]
    pub title: String,
    #[serde_as(as = "DefaultOnNull")]
    pub genre: String,
    /// `watchlist`, `watched`, ...
    #[serde_as(as = "DefaultOnNull")]
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub rating: Option<f64>,
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
pub struct TvShow {
    #[serde_as(as = "DefaultOnNull")]
    pub id: String,
    #[serde_as(as = "DefaultOnNull")]
    pub title: String,
    #[serde_as(as = "DefaultOnNull")]
    pub status: String,
    #[serde_as(as = "DefaultOnNull<PickFirst<(_, DisplayFromStr)>>")]
    pub season: u32,
    #[serde_as(as = "DefaultOnNull<PickFirst<(_, DisplayFromStr)>>")]
    pub episode: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub rating: Option<f64>,
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
pub struct Book {
    #[serde_as(as = "DefaultOnNull")]
    pub id: String,
    #[serde_as(as = "DefaultOnNull")]
    pub title: String,
    #[serde_as(as = "DefaultOnNull")]
    pub author: String,
    #[serde_as(as = "DefaultOnNull")]
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub rating: Option<f64>,
    #[serde_as(as = "DefaultOnNull")]
    pub notes: String,
    #[serde_as(as = "DefaultOnNull<PickFirst<(_, DisplayFromStr)>>")]
    pub created_at: i64,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

fn newest_movies_first(items: &mut [Movie]) {
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

fn newest_shows_first(items: &mut [TvShow]) {
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

fn newest_books_first(items: &mut [Book]) {
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

impl_entity!(Movie, Movies, movies, sort = newest_movies_first);
impl_entity!(TvShow, TvShows, tv_shows, sort = newest_shows_first);
impl_entity!(Book, Books, books, sort = newest_books_first);
