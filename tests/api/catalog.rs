use mangashelf::api::catalog::{self, CategoryForm, GenreForm, MangaFilter};

use crate::helpers::spawn_app;

#[tokio::test]
async fn manga_list_sends_filters_and_normalizes_rows() {
    let app = spawn_app().await;
    let filter = MangaFilter {
        query: Some("solo".into()),
        status: Some("Completed".into()),
        genres: vec!["action".into(), "fantasy".into()],
        sort_by: Some("Rating".into()),
    };

    let mangas = catalog::manga_list(&app.ctx.remote, &filter).await.unwrap();

    assert_eq!(mangas.len(), 2);
    assert_eq!(mangas[0].image_url, "/images/placeholder.jpg");
    assert_eq!(mangas[0].author, "Unknown");
    assert_eq!(mangas[0].avg_rating, 4.2);
    assert_eq!(mangas[0].genres, vec!["Action".to_string()]);
    assert_eq!(mangas[0].category.as_deref(), Some("manhwa"));

    let call = &app.backend.calls_to("GET", "/api/manga/")[0];
    assert_eq!(
        call.query.as_deref(),
        Some("search=solo&status=completed&genre=action&genre=fantasy&ordering=-avg_rating")
    );
}

#[tokio::test]
async fn manga_detail_carries_its_chapters() {
    let app = spawn_app().await;

    let detail = catalog::manga(&app.ctx.remote, "abc-123").await.unwrap();

    assert_eq!(detail.manga.id, "abc-123");
    let numbers: Vec<f64> = detail.chapters.iter().map(|c| c.number).collect();
    assert_eq!(numbers, vec![1.0, 2.5]);
    assert!(detail.chapters.iter().all(|c| c.manga_id == "abc-123"));
    assert_eq!(detail.chapters[0].id, "501");
}

#[tokio::test]
async fn chapter_detail_maps_images() {
    let app = spawn_app().await;

    let chapter = catalog::chapter(&app.ctx.remote, "501").await.unwrap();

    assert_eq!(chapter.manga_id, "42");
    assert_eq!(chapter.number, 1.0);
    assert_eq!(chapter.images.len(), 2);
    assert_eq!(chapter.images[0].url, "https://img.example/1.jpg");
    assert_eq!(chapter.images[1].width, None);
    assert_eq!(chapter.prev_chapter_id, None);
    assert_eq!(chapter.next_chapter_id.as_deref(), Some("502"));
}

#[tokio::test]
async fn categories_can_be_managed() {
    let app = spawn_app().await;
    app.sign_in_as_new_user().await;
    let auth = app.ctx.session.auth_headers();
    let form = CategoryForm {
        name: "Light Novel".into(),
        title_ar: "روايات".into(),
        description_ar: "روايات خفيفة".into(),
    };

    let created = catalog::save_category(&app.ctx.remote, &auth, None, &form)
        .await
        .unwrap();
    assert_eq!(created.slug, "light-novel");
    assert_eq!(
        catalog::category_slugs(&app.ctx.remote).await.unwrap(),
        vec!["light-novel".to_string()]
    );

    let renamed = CategoryForm {
        title_ar: "روايات مصورة".into(),
        ..form
    };
    let updated = catalog::save_category(&app.ctx.remote, &auth, Some("light-novel"), &renamed)
        .await
        .unwrap();
    assert_eq!(updated.title_ar.as_deref(), Some("روايات مصورة"));
    assert_eq!(app.backend.calls_to("PUT", "/api/categories/light-novel/").len(), 1);

    catalog::delete_category(&app.ctx.remote, &auth, "light-novel")
        .await
        .unwrap();
    assert!(catalog::categories(&app.ctx.remote).await.unwrap().is_empty());
}

#[tokio::test]
async fn genres_can_be_managed() {
    let app = spawn_app().await;
    app.sign_in_as_new_user().await;
    let auth = app.ctx.session.auth_headers();

    catalog::save_genre(&app.ctx.remote, &auth, None, &GenreForm { name: "Isekai".into() })
        .await
        .unwrap();
    catalog::save_genre(
        &app.ctx.remote,
        &auth,
        Some("isekai"),
        &GenreForm {
            name: "Isekai Fantasy".into(),
        },
    )
    .await
    .unwrap();
    assert_eq!(
        catalog::genre_names(&app.ctx.remote).await.unwrap(),
        vec!["Isekai Fantasy".to_string()]
    );

    catalog::delete_genre(&app.ctx.remote, &auth, "isekai").await.unwrap();
    assert!(catalog::genres(&app.ctx.remote).await.unwrap().is_empty());
}

#[tokio::test]
async fn admin_calls_without_session_are_rejected() {
    let app = spawn_app().await;
    let auth = app.ctx.session.auth_headers();

    let error = catalog::delete_genre(&app.ctx.remote, &auth, "isekai")
        .await
        .unwrap_err();

    assert!(error.is_unauthorized());
}

#[tokio::test]
async fn zip_analysis_counts_or_falls_back_to_zero() {
    let app = spawn_app().await;
    app.sign_in_as_new_user().await;
    let auth = app.ctx.session.auth_headers();

    let count = catalog::analyze_zip(&app.ctx.remote, &auth, "Chapter 1.zip", vec![0u8; 7]).await;
    assert_eq!(count, 7);

    app.backend.set_failing(true);
    let count = catalog::analyze_zip(&app.ctx.remote, &auth, "Chapter 1.zip", vec![0u8; 7]).await;
    assert_eq!(count, 0);
}
