use serde::{Deserialize, Serialize};
use serde_aux::field_attributes::deserialize_string_from_number;

/// Points granted to an account the backend reports without a balance.
pub const DEFAULT_POINTS: i64 = 100;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    #[serde(default, deserialize_with = "deserialize_string_from_number")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default = "default_points")]
    pub points: i64,
    #[serde(default)]
    pub equipped_title: Option<String>,
}

fn default_points() -> i64 {
    DEFAULT_POINTS
}

/// Bookmark entry. Field names match what the web client has always written
/// to `manga_bookmarks`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MangaSummary {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub chapter_count: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub manga_id: String,
    pub manga_title: String,
    pub chapter_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter_number: Option<f64>,
    #[serde(default)]
    pub image_url: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Manga {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub chapter_count: u32,
    pub avg_rating: f64,
    pub genres: Vec<String>,
    pub status: Option<String>,
    pub last_updated: Option<String>,
    pub author: String,
    pub views: u64,
    pub category: Option<String>,
}

impl From<&Manga> for MangaSummary {
    fn from(manga: &Manga) -> Self {
        MangaSummary {
            id: manga.id.clone(),
            title: manga.title.clone(),
            image_url: manga.image_url.clone(),
            author: manga.author.clone(),
            chapter_count: manga.chapter_count,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChapterSummary {
    pub id: String,
    pub manga_id: String,
    pub title: String,
    pub number: f64,
    pub release_date: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MangaDetail {
    pub manga: Manga,
    pub chapters: Vec<ChapterSummary>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChapterImage {
    pub id: String,
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChapterDetail {
    pub id: String,
    pub manga_id: String,
    pub manga_title: Option<String>,
    pub title: String,
    pub number: f64,
    pub images: Vec<ChapterImage>,
    pub prev_chapter_id: Option<String>,
    pub next_chapter_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    #[serde(deserialize_with = "deserialize_string_from_number")]
    pub id: String,
    pub user_name: String,
    #[serde(default)]
    pub user_avatar: Option<String>,
    pub content: String,
    #[serde(default)]
    pub likes_count: u64,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub is_edited: bool,
    #[serde(default)]
    pub user_has_liked: Option<bool>,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub replies: Vec<Comment>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Category {
    #[serde(default, deserialize_with = "deserialize_string_from_number")]
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub title_ar: Option<String>,
    #[serde(default)]
    pub description_ar: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Genre {
    #[serde(default, deserialize_with = "deserialize_string_from_number")]
    pub id: String,
    pub name: String,
    pub slug: String,
}
