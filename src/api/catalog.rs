//! Catalog reads and the admin content-management calls.

use reqwest::{
    Method,
    header::HeaderMap,
    multipart::{Form, Part},
};
use serde::{Deserialize, Serialize};
use serde_aux::field_attributes::{
    deserialize_number_from_string, deserialize_option_number_from_string,
    deserialize_string_from_number,
};

use crate::{
    error::Error,
    model::{Category, ChapterDetail, ChapterImage, ChapterSummary, Genre, Manga, MangaDetail},
};

use super::{ListBody, RemoteClient, send_empty, send_json};

const PLACEHOLDER_COVER: &str = "/images/placeholder.jpg";
const UNKNOWN_AUTHOR: &str = "Unknown";
const DEFAULT_ORDERING: &str = "-last_updated";

#[derive(Debug, Clone, Default)]
pub struct MangaFilter {
    pub query: Option<String>,
    pub status: Option<String>,
    pub genres: Vec<String>,
    pub sort_by: Option<String>,
}

impl MangaFilter {
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();

        if let Some(query) = self.query.as_deref().filter(|q| !q.is_empty()) {
            params.push(("search", query.to_string()));
        }

        if let Some(status) = self.status.as_deref().filter(|s| *s != "All") {
            params.push(("status", status.to_lowercase()));
        }

        for genre in &self.genres {
            params.push(("genre", genre.clone()));
        }

        if let Some(sort_by) = self.sort_by.as_deref() {
            params.push(("ordering", ordering_for(sort_by).to_string()));
        }

        params
    }
}

fn ordering_for(sort_by: &str) -> &'static str {
    match sort_by {
        "Name" => "title",
        "Latest Chapter" => "-last_updated",
        "Most Popular" => "-views",
        "Rating" => "-avg_rating",
        _ => DEFAULT_ORDERING,
    }
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum NamedOrPlain {
    Object {
        name: Option<String>,
        slug: Option<String>,
    },
    Plain(String),
}

impl NamedOrPlain {
    fn into_name(self) -> String {
        match self {
            NamedOrPlain::Object { name, slug } => name.or(slug).unwrap_or_default(),
            NamedOrPlain::Plain(value) => value,
        }
    }

    fn into_slug(self) -> String {
        match self {
            NamedOrPlain::Object { name, slug } => slug.or(name).unwrap_or_default(),
            NamedOrPlain::Plain(value) => value,
        }
    }
}

#[derive(Deserialize, Debug)]
struct RemoteManga {
    #[serde(deserialize_with = "deserialize_string_from_number")]
    id: String,
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    cover_image_url: Option<String>,
    #[serde(default)]
    chapter_count: Option<u32>,
    #[serde(default, deserialize_with = "deserialize_option_number_from_string")]
    avg_rating: Option<f64>,
    #[serde(default)]
    genres: Vec<NamedOrPlain>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    last_updated: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    views: Option<u64>,
    #[serde(default)]
    category: Option<NamedOrPlain>,
    #[serde(default)]
    chapters: Vec<RemoteChapter>,
}

#[derive(Deserialize, Debug)]
struct RemoteChapter {
    #[serde(deserialize_with = "deserialize_string_from_number")]
    id: String,
    #[serde(default)]
    title: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    number: f64,
    #[serde(default)]
    release_date: Option<String>,
}

impl From<RemoteManga> for Manga {
    fn from(remote: RemoteManga) -> Self {
        Manga {
            id: remote.id,
            title: remote.title,
            description: remote.description.unwrap_or_default(),
            image_url: remote
                .cover_image_url
                .filter(|url| !url.is_empty())
                .unwrap_or_else(|| PLACEHOLDER_COVER.to_string()),
            chapter_count: remote.chapter_count.unwrap_or(0),
            avg_rating: remote.avg_rating.unwrap_or(0.0),
            genres: remote.genres.into_iter().map(NamedOrPlain::into_name).collect(),
            status: remote.status,
            last_updated: remote.last_updated,
            author: remote
                .author
                .filter(|author| !author.is_empty())
                .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
            views: remote.views.unwrap_or(0),
            category: remote.category.map(NamedOrPlain::into_slug),
        }
    }
}

#[derive(Deserialize, Debug)]
struct RemoteChapterDetail {
    #[serde(deserialize_with = "deserialize_string_from_number")]
    id: String,
    #[serde(deserialize_with = "deserialize_string_from_number")]
    manga_id: String,
    #[serde(default)]
    manga_title: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    number: f64,
    #[serde(default)]
    images: Vec<RemoteImage>,
    #[serde(default)]
    prev_chapter_id: Option<String>,
    #[serde(default)]
    next_chapter_id: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RemoteImage {
    #[serde(deserialize_with = "deserialize_string_from_number")]
    id: String,
    image_url: String,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
}

#[derive(Serialize, Debug, Clone, Default)]
pub struct CategoryForm {
    pub name: String,
    pub title_ar: String,
    pub description_ar: String,
}

#[derive(Serialize, Debug, Clone, Default)]
pub struct GenreForm {
    pub name: String,
}

#[derive(Deserialize, Debug)]
struct ZipAnalysis {
    #[serde(default)]
    image_count: u64,
}

#[tracing::instrument(name = "[GET] manga list", skip(client))]
pub async fn manga_list(client: &RemoteClient, filter: &MangaFilter) -> Result<Vec<Manga>, Error> {
    let body: ListBody<RemoteManga> = send_json(
        client
            .request(Method::GET, "/manga/", &HeaderMap::new())
            .query(&filter.to_query()),
    )
    .await?;

    Ok(body.into_results().into_iter().map(Manga::from).collect())
}

#[tracing::instrument(name = "[GET] manga by category", skip(client))]
pub async fn manga_by_category(client: &RemoteClient, slug: &str) -> Result<Vec<Manga>, Error> {
    let body: ListBody<RemoteManga> = send_json(
        client
            .request(Method::GET, "/manga/", &HeaderMap::new())
            .query(&[("category", slug)]),
    )
    .await?;

    Ok(body.into_results().into_iter().map(Manga::from).collect())
}

#[tracing::instrument(name = "[GET] manga", skip(client))]
pub async fn manga(client: &RemoteClient, id: &str) -> Result<MangaDetail, Error> {
    let mut remote: RemoteManga =
        send_json(client.request(Method::GET, &format!("/manga/{id}/"), &HeaderMap::new())).await?;

    let chapters = std::mem::take(&mut remote.chapters)
        .into_iter()
        .map(|chapter| ChapterSummary {
            id: chapter.id,
            manga_id: id.to_string(),
            title: chapter.title,
            number: chapter.number,
            release_date: chapter.release_date,
        })
        .collect();

    Ok(MangaDetail {
        manga: Manga::from(remote),
        chapters,
    })
}

#[tracing::instrument(name = "[GET] chapter", skip(client))]
pub async fn chapter(client: &RemoteClient, id: &str) -> Result<ChapterDetail, Error> {
    let remote: RemoteChapterDetail =
        send_json(client.request(Method::GET, &format!("/chapters/{id}/"), &HeaderMap::new()))
            .await?;

    Ok(ChapterDetail {
        id: remote.id,
        manga_id: remote.manga_id,
        manga_title: remote.manga_title,
        title: remote.title,
        number: remote.number,
        images: remote
            .images
            .into_iter()
            .map(|image| ChapterImage {
                id: image.id,
                url: image.image_url,
                width: image.width,
                height: image.height,
            })
            .collect(),
        prev_chapter_id: remote.prev_chapter_id,
        next_chapter_id: remote.next_chapter_id,
    })
}

#[tracing::instrument(name = "[GET] categories", skip_all)]
pub async fn categories(client: &RemoteClient) -> Result<Vec<Category>, Error> {
    let body: ListBody<Category> =
        send_json(client.request(Method::GET, "/categories/", &HeaderMap::new())).await?;
    Ok(body.into_results())
}

pub async fn category_slugs(client: &RemoteClient) -> Result<Vec<String>, Error> {
    Ok(categories(client).await?.into_iter().map(|c| c.slug).collect())
}

/// Creates a category, or replaces the one at `slug`.
#[tracing::instrument(name = "[POST|PUT] categories", skip(client, auth))]
pub async fn save_category(
    client: &RemoteClient,
    auth: &HeaderMap,
    slug: Option<&str>,
    form: &CategoryForm,
) -> Result<Category, Error> {
    let builder = match slug {
        Some(slug) => client.request(Method::PUT, &format!("/categories/{slug}/"), auth),
        None => client.request(Method::POST, "/categories/", auth),
    };

    send_json(builder.json(form)).await
}

#[tracing::instrument(name = "[DELETE] categories", skip(client, auth))]
pub async fn delete_category(
    client: &RemoteClient,
    auth: &HeaderMap,
    slug: &str,
) -> Result<(), Error> {
    send_empty(client.request(Method::DELETE, &format!("/categories/{slug}/"), auth)).await
}

#[tracing::instrument(name = "[GET] genres", skip_all)]
pub async fn genres(client: &RemoteClient) -> Result<Vec<Genre>, Error> {
    let body: ListBody<Genre> =
        send_json(client.request(Method::GET, "/genres/", &HeaderMap::new())).await?;
    Ok(body.into_results())
}

pub async fn genre_names(client: &RemoteClient) -> Result<Vec<String>, Error> {
    Ok(genres(client).await?.into_iter().map(|g| g.name).collect())
}

#[tracing::instrument(name = "[POST|PUT] genres", skip(client, auth))]
pub async fn save_genre(
    client: &RemoteClient,
    auth: &HeaderMap,
    slug: Option<&str>,
    form: &GenreForm,
) -> Result<Genre, Error> {
    let builder = match slug {
        Some(slug) => client.request(Method::PUT, &format!("/genres/{slug}/"), auth),
        None => client.request(Method::POST, "/genres/", auth),
    };

    send_json(builder.json(form)).await
}

#[tracing::instrument(name = "[DELETE] genres", skip(client, auth))]
pub async fn delete_genre(
    client: &RemoteClient,
    auth: &HeaderMap,
    slug: &str,
) -> Result<(), Error> {
    send_empty(client.request(Method::DELETE, &format!("/genres/{slug}/"), auth)).await
}

/// Counts the images inside a chapter archive. Failures count as zero so an
/// upload form can carry on without the figure.
#[tracing::instrument(name = "[POST] chapters analyze-zip", skip(client, auth, bytes), fields(size = bytes.len()))]
pub async fn analyze_zip(
    client: &RemoteClient,
    auth: &HeaderMap,
    file_name: &str,
    bytes: Vec<u8>,
) -> u64 {
    let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name.to_string()));

    let result: Result<ZipAnalysis, Error> = send_json(
        client
            .request(Method::POST, "/chapters/analyze-zip/", auth)
            .multipart(form),
    )
    .await;

    match result {
        Ok(analysis) => analysis.image_count,
        Err(error) => {
            tracing::error!(err.msg = %error, err.details = ?error, "ZIP analysis failed");
            0
        }
    }
}
