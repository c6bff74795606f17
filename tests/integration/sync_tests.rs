//! Integration tests for the content repository
//!
//! These tests use wiremock to stand in for the wiki and exercise the full
//! fetch, parse and persist cycle against a SQLite database on disk.

use chrono::{Duration, Utc};
use lnsync::config::{CacheConfig, Config, SourceConfig, UserAgentConfig};
use lnsync::model::{ImageModel, PageModel, PageType};
use lnsync::storage::{SqliteStorage, Storage};
use lnsync::{ContentRepository, NetworkError, SyncError};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use wiremock::matchers::{any, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock wiki
fn create_test_config(base_url: &str, dir: &TempDir) -> Config {
    Config {
        source: SourceConfig {
            base_url: base_url.to_string(),
            api_path: "/project/api.php".to_string(),
            index_path: "/project/index.php".to_string(),
            listing_path: "/project".to_string(),
            index_page: "Main_Page".to_string(),
            timeout_secs: 5,
        },
        user_agent: UserAgentConfig {
            client_name: "TestClient".to_string(),
            client_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
        },
        cache: CacheConfig {
            database_path: dir.path().join("cache.db").display().to_string(),
            asset_dir: dir.path().join("assets").display().to_string(),
            ttl_secs: 7 * 24 * 3600,
        },
    }
}

struct Harness {
    server: MockServer,
    store: Arc<Mutex<SqliteStorage>>,
    repository: Arc<ContentRepository>,
    _dir: TempDir,
}

async fn setup() -> Harness {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(&server.uri(), &dir);

    let storage = SqliteStorage::new(&PathBuf::from(&config.cache.database_path))
        .expect("Failed to open storage");
    let store = Arc::new(Mutex::new(storage));
    let repository = ContentRepository::from_config(&config, store.clone())
        .expect("Failed to create repository");

    Harness {
        server,
        store,
        repository: Arc::new(repository),
        _dir: dir,
    }
}

fn page_info(title: &str) -> String {
    format!(
        r#"<?xml version="1.0"?><api><query><pages><page pageid="1" ns="0" title="{}" touched="2024-05-01T08:00:00Z"></page></pages></query></api>"#,
        title
    )
}

fn listing(keys: &[&str]) -> String {
    let items: String = keys
        .iter()
        .map(|key| {
            format!(
                r#"<li><a href="/project/index.php?title={}">{}</a></li>"#,
                key,
                key.replace('_', " ")
            )
        })
        .collect();
    format!(
        r#"<html><body><div id="p-Light_Novels"><ul>{}</ul></div></body></html>"#,
        items
    )
}

const DETAILS: &str = r#"<html><body><div id="mw-content-text">
    <a class="image" href="/project/index.php?title=File:Cover.jpg"><img src="/project/images/cover.jpg"></a>
    <p>A boy, a girl and a palmtop tiger.</p>
    <h3><span class="mw-headline">Volume 1</span></h3>
    <ul>
        <li><a href="/project/index.php?title=Toradora!:Volume1_Chapter1">Chapter 1</a></li>
        <li><a href="/project/index.php?title=Toradora!:Volume1_Chapter2">Chapter 2</a></li>
    </ul>
</div></body></html>"#;

const CONTENT: &str = r#"<?xml version="1.0"?><api><parse title="Toradora!:Volume1 Chapter1" pageid="9"><text xml:space="preserve">&lt;p&gt;Ryuuji looked in the mirror.&lt;/p&gt;&lt;a href="/project/index.php?title=File:Good.jpg" class="image"&gt;&lt;img src="/project/images/good.jpg" /&gt;&lt;/a&gt;&lt;a href="/project/index.php?title=File:Broken.jpg" class="image"&gt;&lt;img src="/project/images/broken.jpg" /&gt;&lt;/a&gt;</text></parse></api>"#;

async fn mount_page_info(server: &MockServer, key: &str, title: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path("/project/api.php"))
        .and(query_param("action", "query"))
        .and(query_param("titles", key))
        .respond_with(ResponseTemplate::new(200).set_body_string(page_info(title)))
        .expect(times)
        .mount(server)
        .await;
}

async fn mount_listing(server: &MockServer, keys: &[&str], times: u64) {
    Mock::given(method("GET"))
        .and(path("/project"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing(keys)))
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_cold_then_warm_listing() {
    let h = setup().await;
    mount_page_info(&h.server, "Main_Page", "Main Page", 1).await;
    mount_listing(&h.server, &["Toradora!", "Sword_Art_Online"], 1).await;

    let novels = h.repository.get_novels(false).await.unwrap();
    let keys: Vec<_> = novels.iter().map(|n| n.page.as_str()).collect();
    assert_eq!(keys, vec!["Toradora!", "Sword_Art_Online"]);
    assert!(novels.iter().all(|n| n.is_persisted()));
    assert!(novels.iter().all(|n| n.parent == "Main_Page"));

    {
        let store = h.store.lock().unwrap();
        let index = store.get_page("Main_Page").unwrap().unwrap();
        assert_eq!(index.page_type, PageType::Main);
        assert!(index.parent.is_empty());
        assert!(index.last_check.is_some());
        assert!(index.last_update.is_some());
    }

    // Fresh index: served from the cache without touching the network
    let cached = h.repository.get_novels(false).await.unwrap();
    assert_eq!(cached, novels);
}

#[tokio::test]
async fn test_stale_index_refreshes_listing() {
    let h = setup().await;
    mount_page_info(&h.server, "Main_Page", "Main Page", 1).await;
    mount_listing(&h.server, &["Clannad"], 1).await;

    {
        let mut store = h.store.lock().unwrap();
        let mut index = PageModel::new("Main_Page", PageType::Main);
        index.last_check = Some(Utc::now() - Duration::days(8));
        store.upsert_page(&index).unwrap();
    }

    let novels = h.repository.get_novels(false).await.unwrap();
    assert_eq!(novels.len(), 1);
    assert_eq!(novels[0].page, "Clannad");

    let index = h.repository.get_page_model("Main_Page").unwrap().unwrap();
    assert!(index.last_check.unwrap() > Utc::now() - Duration::minutes(1));
}

#[tokio::test]
async fn test_recently_checked_index_is_fresh() {
    let h = setup().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&h.server)
        .await;

    {
        let mut store = h.store.lock().unwrap();
        let mut index = PageModel::new("Main_Page", PageType::Main);
        index.last_check = Some(Utc::now() - Duration::hours(8));
        store
            .upsert_synced_pages(&[
                index,
                PageModel::new("Kanon", PageType::Novel).with_parent("Main_Page"),
            ])
            .unwrap();
    }

    let novels = h.repository.get_novels(false).await.unwrap();
    assert_eq!(novels.len(), 1);
    assert_eq!(novels[0].page, "Kanon");
}

#[tokio::test]
async fn test_forced_refresh_bypasses_fresh_cache() {
    let h = setup().await;
    mount_page_info(&h.server, "Main_Page", "Main Page", 2).await;
    mount_listing(&h.server, &["Toradora!"], 2).await;

    h.repository.get_novels(false).await.unwrap();
    let novels = h.repository.get_novels(true).await.unwrap();
    assert_eq!(novels.len(), 1);
}

#[tokio::test]
async fn test_listing_failure_leaves_store_unchanged() {
    let h = setup().await;
    mount_page_info(&h.server, "Main_Page", "Main Page", 1).await;
    Mock::given(method("GET"))
        .and(path("/project"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&h.server)
        .await;

    let result = h.repository.get_novels(false).await;
    assert!(matches!(
        result,
        Err(SyncError::Network(NetworkError::Status { status: 503, .. }))
    ));

    let store = h.store.lock().unwrap();
    assert!(store.get_page("Main_Page").unwrap().is_none());
    assert!(store.get_pages_by_type(PageType::Novel).unwrap().is_empty());
}

#[tokio::test]
async fn test_resync_keeps_watch_flag() {
    let h = setup().await;
    mount_page_info(&h.server, "Main_Page", "Main Page", 2).await;
    mount_listing(&h.server, &["Toradora!", "Clannad"], 2).await;

    let novels = h.repository.get_novels(false).await.unwrap();
    let mut toradora = novels[0].clone();
    toradora.is_watched = true;
    h.repository.update_page_model(&toradora).unwrap();

    let novels = h.repository.get_novels(true).await.unwrap();
    assert!(novels[0].is_watched);
    assert_eq!(novels[0].id, toradora.id);
    assert!(!novels[1].is_watched);

    let watched = h.repository.get_watched_novels().unwrap();
    assert_eq!(watched.len(), 1);
    assert_eq!(watched[0].page, "Toradora!");
}

#[tokio::test]
async fn test_details_linking_listed_novel_keeps_listing() {
    let h = setup().await;
    mount_page_info(&h.server, "Main_Page", "Main Page", 1).await;
    mount_listing(&h.server, &["Toradora!", "Toradora!_Spin-off"], 1).await;
    mount_page_info(&h.server, "Toradora!", "Toradora!", 1).await;
    Mock::given(method("GET"))
        .and(path("/project/index.php"))
        .and(query_param("title", "Toradora!"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><div id="mw-content-text">
                <h3><span class="mw-headline">Side stories</span></h3>
                <ul><li><a href="/project/index.php?title=Toradora!_Spin-off">Spin-off</a></li></ul>
            </div></body></html>"#,
        ))
        .expect(1)
        .mount(&h.server)
        .await;

    let before = h.repository.get_novels(false).await.unwrap();
    let novel = h.repository.get_novel_details("Toradora!").await.unwrap();
    assert_eq!(novel.books[0].chapters[0].page, "Toradora!_Spin-off");

    let after = h.repository.get_novels(false).await.unwrap();
    let keys: Vec<_> = after.iter().map(|n| n.page.as_str()).collect();
    assert_eq!(keys, vec!["Toradora!", "Toradora!_Spin-off"]);
    assert_eq!(after, before);
}

#[tokio::test]
async fn test_details_miss_fetches_and_tolerates_cover_failure() {
    let h = setup().await;
    Mock::given(method("GET"))
        .and(path("/project/index.php"))
        .and(query_param("title", "Toradora!"))
        .respond_with(ResponseTemplate::new(200).set_body_string(DETAILS))
        .expect(1)
        .mount(&h.server)
        .await;
    mount_page_info(&h.server, "Toradora!", "Toradora!", 1).await;
    Mock::given(method("GET"))
        .and(path("/project/images/cover.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&h.server)
        .await;

    let novel = h.repository.get_novel_details("Toradora!").await.unwrap();
    assert!(novel.id > 0);
    assert_eq!(novel.synopsis, "A boy, a girl and a palmtop tiger.");
    assert_eq!(
        novel.cover_url,
        Some(format!("{}/project/images/cover.jpg", h.server.uri()))
    );
    assert_eq!(novel.books.len(), 1);
    assert_eq!(novel.chapter_count(), 2);
    assert!(novel.last_update.is_some());
    assert!(novel.last_check.is_some());

    let chapter = h
        .repository
        .get_page_model("Toradora!:Volume1_Chapter2")
        .unwrap()
        .unwrap();
    assert_eq!(chapter.page_type, PageType::Content);
    assert_eq!(chapter.parent, "Toradora!");

    // Second lookup is a cache hit
    let cached = h.repository.get_novel_details("Toradora!").await.unwrap();
    assert_eq!(cached, novel);
}

#[tokio::test]
async fn test_details_prefetches_cover() {
    let h = setup().await;
    Mock::given(method("GET"))
        .and(path("/project/index.php"))
        .and(query_param("title", "Toradora!"))
        .respond_with(ResponseTemplate::new(200).set_body_string(DETAILS))
        .expect(1)
        .mount(&h.server)
        .await;
    mount_page_info(&h.server, "Toradora!", "Toradora!", 1).await;
    Mock::given(method("GET"))
        .and(path("/project/images/cover.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF, 0xE0]))
        .expect(1)
        .mount(&h.server)
        .await;

    Mock::given(method("GET"))
        .and(path("/project/index.php"))
        .and(query_param("title", "File:Cover.jpg"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&h.server)
        .await;

    let novel = h.repository.get_novel_details("Toradora!").await.unwrap();
    let cover_url = novel.cover_url.unwrap();
    assert_eq!(
        novel.cover_referer.as_deref(),
        Some("/project/index.php?title=File:Cover.jpg")
    );

    let cover = h.store.lock().unwrap().get_image(&cover_url).unwrap().unwrap();
    let local_path = cover.local_path.clone().expect("cover should be downloaded");
    assert_eq!(std::fs::read(local_path).unwrap(), vec![0xFF, 0xD8, 0xFF, 0xE0]);

    // the cover's file page resolves from the cache
    let by_file_page = h
        .repository
        .get_image("/project/index.php?title=File:Cover.jpg")
        .await
        .unwrap();
    assert_eq!(by_file_page, cover);
}

#[tokio::test]
async fn test_details_links_cover_downloaded_earlier() {
    let h = setup().await;
    Mock::given(method("GET"))
        .and(path("/project/index.php"))
        .and(query_param("title", "Toradora!"))
        .respond_with(ResponseTemplate::new(200).set_body_string(DETAILS))
        .expect(1)
        .mount(&h.server)
        .await;
    mount_page_info(&h.server, "Toradora!", "Toradora!", 1).await;
    Mock::given(method("GET"))
        .and(path("/project/images/cover.jpg"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&h.server)
        .await;

    let mut known = ImageModel::new(format!("{}/project/images/cover.jpg", h.server.uri()));
    known.local_path = Some(PathBuf::from("/tmp/cover.jpg"));
    let known = h.store.lock().unwrap().upsert_image(&known).unwrap();
    assert!(known.referer.is_none());

    h.repository.get_novel_details("Toradora!").await.unwrap();

    let cover = h
        .repository
        .get_image("/project/index.php?title=File:Cover.jpg")
        .await
        .unwrap();
    assert_eq!(cover.id, known.id);
    assert_eq!(cover.local_path, known.local_path);
}

#[tokio::test]
async fn test_details_failure_is_not_cached() {
    let h = setup().await;
    Mock::given(method("GET"))
        .and(path("/project/index.php"))
        .and(query_param("title", "Nope"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body></body></html>"))
        .expect(1)
        .mount(&h.server)
        .await;

    let result = h.repository.get_novel_details("Nope").await;
    assert!(matches!(result, Err(SyncError::Parse(_))));
    assert!(h.store.lock().unwrap().get_novel_details("Nope").unwrap().is_none());
}

#[tokio::test]
async fn test_content_with_failing_image_is_still_stored() {
    let h = setup().await;
    Mock::given(method("GET"))
        .and(path("/project/api.php"))
        .and(query_param("action", "parse"))
        .and(query_param("page", "Toradora!:Volume1_Chapter1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(CONTENT))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/project/images/good.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg".to_vec()))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/project/images/broken.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&h.server)
        .await;

    let content = h
        .repository
        .get_novel_content("Toradora!:Volume1_Chapter1")
        .await
        .unwrap();
    assert!(content.id > 0);
    assert!(content.content.starts_with("<p>Ryuuji looked in the mirror.</p>"));
    assert_eq!(content.images.len(), 2);
    assert!(content.images[0].is_downloaded());
    assert!(!content.images[1].is_downloaded());
    assert_eq!(content.missing_images().count(), 1);

    // Cached afterwards, and the downloaded image is reachable by its file page
    let cached = h
        .repository
        .get_novel_content("Toradora!:Volume1_Chapter1")
        .await
        .unwrap();
    assert_eq!(cached, content);

    let image = h
        .repository
        .get_image("/project/index.php?title=File:Good.jpg")
        .await
        .unwrap();
    assert_eq!(image, content.images[0]);
}

#[tokio::test]
async fn test_content_keeps_known_page_parent() {
    let h = setup().await;
    Mock::given(method("GET"))
        .and(path("/project/api.php"))
        .and(query_param("action", "parse"))
        .respond_with(ResponseTemplate::new(200).set_body_string(CONTENT))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/project/images/good.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg".to_vec()))
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/project/images/broken.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg".to_vec()))
        .mount(&h.server)
        .await;

    let mut chapter = PageModel::new("Toradora!:Volume1_Chapter1", PageType::Content)
        .with_parent("Toradora!");
    chapter.is_finished_read = true;
    h.repository.update_page_model(&chapter).unwrap();

    let content = h
        .repository
        .get_novel_content("Toradora!:Volume1_Chapter1")
        .await
        .unwrap();
    assert_eq!(content.page.parent, "Toradora!");
    assert!(content.page.is_finished_read);
    assert_eq!(content.missing_images().count(), 0);
}

#[tokio::test]
async fn test_get_image_cache_hits_skip_network() {
    let h = setup().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&h.server)
        .await;

    let mut image = ImageModel::new("https://cdn.example.org/kirito.jpg")
        .with_referer("/project/index.php?title=File:Kirito.jpg");
    image.local_path = Some(PathBuf::from("/tmp/kirito.jpg"));
    let stored = h.store.lock().unwrap().upsert_image(&image).unwrap();

    let by_name = h
        .repository
        .get_image("https://cdn.example.org/kirito.jpg")
        .await
        .unwrap();
    let by_referer = h
        .repository
        .get_image("/project/index.php?title=File:Kirito.jpg")
        .await
        .unwrap();

    assert_eq!(by_name, stored);
    assert_eq!(by_referer, stored);
}

#[tokio::test]
async fn test_get_image_prefers_name_over_referer() {
    let h = setup().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&h.server)
        .await;

    let key = "https://cdn.example.org/kirito.jpg";

    // matches the key by referer only
    let mut linked = ImageModel::new("https://cdn.example.org/kirito_large.jpg").with_referer(key);
    linked.local_path = Some(PathBuf::from("/tmp/kirito_large.jpg"));
    let linked = h.store.lock().unwrap().upsert_image(&linked).unwrap();

    let mut named = ImageModel::new(key);
    named.local_path = Some(PathBuf::from("/tmp/kirito.jpg"));
    let named = h.store.lock().unwrap().upsert_image(&named).unwrap();
    assert_ne!(named.id, linked.id);

    let image = h.repository.get_image(key).await.unwrap();
    assert_eq!(image, named);
}

#[tokio::test]
async fn test_get_image_resolves_file_page_once() {
    let h = setup().await;
    Mock::given(method("GET"))
        .and(path("/project/index.php"))
        .and(query_param("title", "File:Kirito.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><div class="fullImageLink"><a href="/project/images/a/ab/Kirito.jpg">Kirito.jpg</a></div></body></html>"#,
        ))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/project/images/a/ab/Kirito.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"kirito".to_vec()))
        .expect(1)
        .mount(&h.server)
        .await;

    let key = "/project/index.php?title=File:Kirito.jpg";
    let image = h.repository.get_image(key).await.unwrap();
    assert_eq!(
        image.name,
        format!("{}/project/images/a/ab/Kirito.jpg", h.server.uri())
    );
    assert_eq!(image.referer.as_deref(), Some(key));
    assert!(image.is_downloaded());

    let again = h.repository.get_image(key).await.unwrap();
    assert_eq!(again, image);
}

#[tokio::test]
async fn test_get_image_links_existing_download() {
    let h = setup().await;
    let direct = format!("{}/project/images/a/ab/Kirito.jpg", h.server.uri());
    Mock::given(method("GET"))
        .and(path("/project/index.php"))
        .and(query_param("title", "File:Kirito.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<html><body><div class="fullImageLink"><a href="{}">Kirito.jpg</a></div></body></html>"#,
            direct
        )))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/project/images/a/ab/Kirito.jpg"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&h.server)
        .await;

    let mut known = ImageModel::new(direct.as_str());
    known.local_path = Some(PathBuf::from("/tmp/kirito.jpg"));
    let known = h.store.lock().unwrap().upsert_image(&known).unwrap();

    let key = "/project/index.php?title=File:Kirito.jpg";
    let image = h.repository.get_image(key).await.unwrap();
    assert_eq!(image.id, known.id);
    assert_eq!(image.referer.as_deref(), Some(key));
    assert_eq!(image.local_path, known.local_path);
}

#[tokio::test]
async fn test_concurrent_details_fetch_once() {
    let h = setup().await;
    Mock::given(method("GET"))
        .and(path("/project/index.php"))
        .and(query_param("title", "Toradora!"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(DETAILS)
                .set_delay(std::time::Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&h.server)
        .await;
    mount_page_info(&h.server, "Toradora!", "Toradora!", 1).await;
    Mock::given(method("GET"))
        .and(path("/project/images/cover.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&h.server)
        .await;

    let mut handles = Vec::new();
    for _ in 0..5 {
        let repository = h.repository.clone();
        handles.push(tokio::spawn(async move {
            repository.get_novel_details("Toradora!").await
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap().id);
    }
    assert!(ids.iter().all(|id| *id == ids[0]));
}

#[tokio::test]
async fn test_watch_unknown_page_fetches_metadata() {
    let h = setup().await;
    mount_page_info(&h.server, "Clannad", "Clannad", 1).await;

    let page = h.repository.set_watched("Clannad", true).await.unwrap();
    assert!(page.is_watched);
    assert_eq!(page.page_type, PageType::Novel);

    let page = h.repository.set_watched("Clannad", false).await.unwrap();
    assert!(!page.is_watched);
    assert!(h.repository.get_watched_novels().unwrap().is_empty());
}
