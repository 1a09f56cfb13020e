use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull, DisplayFromStr, PickFirst};

use super::{impl_entity, ExtraFields};

#[serde_as]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Note {
    #[serde_as(as = "DefaultOnNull")]
    pub id: String,
    #[serde_as(as = "DefaultOnNull")]
    pub title: String,
    /// Rich-text body as HTML.
    #[serde_as(as = "DefaultOnNull")]
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    #[serde_as(as = "DefaultOnNull")]
    pub pinned: bool,
    #[serde_as(as = "DefaultOnNull<PickFirst<(_, DisplayFromStr)>>")]
    pub created_at: i64,
    #[serde_as(as = "DefaultOnNull<PickFirst<(_, DisplayFromStr)>>")]
    pub updated_at: i64,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NoteFolder {
    #[serde_as(as = "DefaultOnNull")]
    pub id: String,
    #[serde_as(as = "DefaultOnNull")]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde_as(as = "DefaultOnNull<PickFirst<(_, DisplayFromStr)>>")]
    pub created_at: i64,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl Note {
    pub fn in_folder(&self, folder_id: &str) -> bool {
        self.folder_id.as_deref() == Some(folder_id)
    }
}

fn recently_updated_first(items: &mut [Note]) {
    items.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
}

impl_entity!(Note, Notes, notes, sort = recently_updated_first);
impl_entity!(NoteFolder, NoteFolders, note_folders);
