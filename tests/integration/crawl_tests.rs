//! Integration tests for the crawler
//!
//! These tests serve a small actor/movie site from a wiremock server and run
//! full crawls against it, checking the stored graph afterwards.

use castnet::config::load_config_with_hash;
use castnet::crawler::Coordinator;
use castnet::output::{export_graph, load_statistics};
use castnet::storage::{ActorFilter, RunStatus, SqliteStorage, Storage};
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn actor_page(name: &str, age: u32, films: &[&str]) -> String {
    let items: String = films
        .iter()
        .map(|film| format!(r#"<li><a href="/wiki/{film}">{film}</a></li>"#))
        .collect();
    format!(
        r#"<html><body>
        <h1 id="firstHeading">{name}</h1>
        <table class="infobox"><tr><th>Born</th><td>
            <span class="bday">1937-06-01</span><span class="ForceAgeToShow"> (age {age})</span>
        </td></tr></table>
        <h2><span class="mw-headline" id="Filmography">Filmography</span></h2>
        <ul>{items}</ul>
        <h2><span class="mw-headline" id="Awards">Awards</span></h2>
        <p><a href="/wiki/Academy_Award">Oscar</a></p>
    </body></html>"#
    )
}

fn movie_page(name: &str, gross: &str, cast: &[&str]) -> String {
    let items: String = cast
        .iter()
        .map(|actor| format!(r#"<li><a href="/wiki/{actor}">{actor}</a></li>"#))
        .collect();
    format!(
        r#"<html><body>
        <h1 id="firstHeading"><i>{name}</i></h1>
        <table class="infobox vevent">
            <tr><th class="infobox-label">Starring</th><td><ul>{items}</ul></td></tr>
            <tr><th class="infobox-label">Box office</th><td>{gross}</td></tr>
        </table>
    </body></html>"#
    )
}

async fn serve(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Mounts the test site:
///
/// Morgan_Freeman -> Se7en, Invictus, Secret_Film (disallowed)
/// Se7en -> Brad_Pitt, Morgan_Freeman
/// Invictus -> Morgan_Freeman, Matt_Damon (missing page)
/// Brad_Pitt -> no films listed
async fn mount_site(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /wiki/Secret_Film\n"),
        )
        .mount(server)
        .await;

    serve(
        server,
        "/wiki/Morgan_Freeman",
        actor_page("Morgan Freeman", 87, &["Se7en", "Invictus", "Secret_Film"]),
    )
    .await;
    serve(server, "/wiki/Brad_Pitt", actor_page("Brad Pitt", 60, &[])).await;
    serve(
        server,
        "/wiki/Se7en",
        movie_page("Se7en", "$327311859", &["Brad_Pitt", "Morgan_Freeman"]),
    )
    .await;
    serve(
        server,
        "/wiki/Invictus",
        movie_page("Invictus", "$122233971", &["Morgan_Freeman", "Matt_Damon"]),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/wiki/Matt_Damon"))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/wiki/Secret_Film"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(server)
        .await;
}

/// Writes a config file for the mock site and returns its path
fn write_config(dir: &Path, root: &str, max_pages: u64, workers: u32) -> std::path::PathBuf {
    let db = dir.join("castnet.db");
    let content = format!(
        r#"
[crawler]
download-delay-ms = 0
max-concurrent-fetches = {workers}
request-timeout-secs = 5
max-retries = 0
max-pages = {max_pages}

[site]
root = "{root}"

[user-agent]
crawler-name = "castnet"
rotation = "fixed"
identities = ["castnet-test/1.0"]

[output]
database-path = "{db}"

[[seed]]
url = "{root}/wiki/Morgan_Freeman"
page-type = "actor"
"#,
        db = db.display()
    );
    let config_path = dir.join("castnet.toml");
    std::fs::write(&config_path, content).unwrap();
    config_path
}

fn url(server: &MockServer, page: &str) -> String {
    format!("{}/wiki/{}", server.uri(), page)
}

#[tokio::test]
async fn test_full_crawl_builds_symmetric_graph() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let dir = TempDir::new().unwrap();
    let config_path = write_config(dir.path(), &server.uri(), 0, 3);
    let (config, hash) = load_config_with_hash(&config_path).unwrap();
    let database_path = config.output.database_path.clone();

    let coordinator = Coordinator::new(config, &hash).unwrap();
    let run_id = coordinator.run_id();
    let report = coordinator.run().await.unwrap();

    assert_eq!(report.pages_fetched, 4);
    assert_eq!(report.pages_failed, 1);
    assert_eq!(report.robots_denied, 1);
    assert_eq!(report.actors, 2);
    assert_eq!(report.movies, 2);
    assert_eq!(report.empty_records, 0);
    // Morgan, Se7en, Invictus, Secret_Film, Brad, Matt
    assert_eq!(report.tasks_admitted, 6);

    let storage = SqliteStorage::new(Path::new(&database_path)).unwrap();

    let run = storage.get_run(run_id).unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, hash);
    assert_eq!(run.pages_fetched, 4);

    let morgan = storage.get_actor(&url(&server, "Morgan_Freeman")).unwrap().unwrap();
    assert_eq!(morgan.name, "Morgan Freeman");
    assert_eq!(morgan.age, Some(87));
    assert_eq!(
        morgan.movies,
        vec![
            url(&server, "Se7en"),
            url(&server, "Invictus"),
            url(&server, "Secret_Film"),
        ]
    );

    // Brad's page lists nothing, Se7en's cast supplies the edge
    let brad = storage.get_actor(&url(&server, "Brad_Pitt")).unwrap().unwrap();
    assert_eq!(brad.age, Some(60));
    assert_eq!(brad.movies, vec![url(&server, "Se7en")]);

    let se7en = storage.get_movie(&url(&server, "Se7en")).unwrap().unwrap();
    assert_eq!(se7en.income, Some(327311859));
    assert_eq!(
        se7en.actors,
        vec![url(&server, "Brad_Pitt"), url(&server, "Morgan_Freeman")]
    );

    assert!(storage.get_actor(&url(&server, "Matt_Damon")).unwrap().is_none());
    assert!(storage.get_movie(&url(&server, "Secret_Film")).unwrap().is_none());
}

#[tokio::test]
async fn test_queries_over_crawled_graph() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let dir = TempDir::new().unwrap();
    let config_path = write_config(dir.path(), &server.uri(), 0, 2);
    let (config, hash) = load_config_with_hash(&config_path).unwrap();
    let database_path = config.output.database_path.clone();

    Coordinator::new(config, &hash).unwrap().run().await.unwrap();

    let storage = SqliteStorage::new(Path::new(&database_path)).unwrap();

    let by_name = storage.find_actor_by_name("morgan_freeman").unwrap().unwrap();
    assert_eq!(by_name.url, url(&server, "Morgan_Freeman"));

    let names = |filters: &[ActorFilter]| -> Vec<String> {
        storage
            .find_actors(filters)
            .unwrap()
            .into_iter()
            .map(|actor| actor.name)
            .collect()
    };

    assert_eq!(names(&[ActorFilter::parse("name=pitt")]), vec!["Brad Pitt"]);
    assert_eq!(names(&[ActorFilter::parse("age=87")]), vec!["Morgan Freeman"]);
    assert_eq!(
        names(&[ActorFilter::parse("total_gross=449545830")]),
        vec!["Morgan Freeman"]
    );
    assert_eq!(
        names(&[ActorFilter::parse("movies=Se7en,Invictus")]),
        vec!["Morgan Freeman"]
    );
    assert_eq!(
        names(&[ActorFilter::parse("age=60"), ActorFilter::parse("movie=Invictus")]).len(),
        2
    );

    let stats = load_statistics(&storage).unwrap();
    assert_eq!(stats.counts.actors, 2);
    assert_eq!(stats.counts.movies, 2);

    let export_path = dir.path().join("graph.json");
    let graph = export_graph(&storage, &export_path).unwrap();
    assert_eq!(graph.actors.len(), 2);

    let exported: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&export_path).unwrap()).unwrap();
    assert_eq!(exported["movies"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_page_limit_stops_crawl() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let dir = TempDir::new().unwrap();
    let config_path = write_config(dir.path(), &server.uri(), 2, 1);
    let (config, hash) = load_config_with_hash(&config_path).unwrap();
    let database_path = config.output.database_path.clone();

    let report = Coordinator::new(config, &hash).unwrap().run().await.unwrap();

    // Morgan, then the first film in the queue
    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.actors, 1);
    assert_eq!(report.movies, 1);

    let storage = SqliteStorage::new(Path::new(&database_path)).unwrap();
    assert!(storage.get_movie(&url(&server, "Se7en")).unwrap().is_some());
    assert!(storage.get_movie(&url(&server, "Invictus")).unwrap().is_none());
}

#[tokio::test]
async fn test_unreachable_robots_allows_everything() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    serve(
        &server,
        "/wiki/Morgan_Freeman",
        actor_page("Morgan Freeman", 87, &["Secret_Film"]),
    )
    .await;
    serve(
        &server,
        "/wiki/Secret_Film",
        movie_page("Secret Film", "unknown", &[]),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let config_path = write_config(dir.path(), &server.uri(), 0, 2);
    let (config, hash) = load_config_with_hash(&config_path).unwrap();

    let report = Coordinator::new(config, &hash).unwrap().run().await.unwrap();

    assert_eq!(report.robots_denied, 0);
    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.movies, 1);
}
