//! Integration tests for the PackTrack backend.

use std::sync::Arc;

use chrono::{Duration, Utc};
use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::config::Config;
use crate::db::{init_database, Repository};
use crate::{create_router, AppState};

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_psk(Some("test-api-key".to_string())).await
    }

    async fn with_psk(psk: Option<String>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");

        // Initialize database
        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));

        // Create config
        let config = Config {
            api_psk: psk.clone(),
            db_path,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
        };

        let state = AppState {
            repo,
            config: Arc::new(config),
        };

        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let mut client_builder = Client::builder();
        if let Some(key) = psk {
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert("x-api-key", key.parse().unwrap());
            client_builder = client_builder.default_headers(headers);
        }

        TestFixture {
            client: client_builder.build().unwrap(),
            base_url,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    async fn post(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .unwrap()
    }

    async fn put(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .put(self.url(path))
            .json(body)
            .send()
            .await
            .unwrap()
    }

    async fn delete(&self, path: &str) -> reqwest::Response {
        self.client.delete(self.url(path)).send().await.unwrap()
    }

    async fn delete_json(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .delete(self.url(path))
            .json(body)
            .send()
            .await
            .unwrap()
    }
}

/// ISO date `days` from today (negative for the past).
fn date_in(days: i64) -> String {
    (Utc::now().date_naive() + Duration::days(days))
        .format("%Y-%m-%d")
        .to_string()
}

async fn create_family(fixture: &TestFixture, name: &str) -> Value {
    let resp = fixture
        .post("/api/families", &json!({ "name": name }))
        .await;
    assert_eq!(resp.status(), 201);
    resp.json().await.unwrap()
}

async fn create_person(
    fixture: &TestFixture,
    family_id: Option<i64>,
    person_type: &str,
    first_name: &str,
    last_name: &str,
) -> Value {
    let mut body = json!({
        "person_type": person_type,
        "first_name": first_name,
        "last_name": last_name,
    });
    if let Some(fid) = family_id {
        body["family_id"] = json!(fid);
    }
    let resp = fixture.post("/api/persons", &body).await;
    assert_eq!(resp.status(), 201);
    resp.json().await.unwrap()
}

async fn create_scout(fixture: &TestFixture, person_id: i64, expiration: Option<&str>) -> Value {
    let mut body = json!({
        "person_id": person_id,
        "registration_status": "active",
        "den": "Wolf",
        "rank": "Wolf",
    });
    if let Some(date) = expiration {
        body["registration_expiration_date"] = json!(date);
    }
    let resp = fixture.post("/api/scouts", &body).await;
    assert_eq!(resp.status(), 201);
    resp.json().await.unwrap()
}

async fn create_leader(
    fixture: &TestFixture,
    person_id: i64,
    ypt_expiration: Option<&str>,
) -> Value {
    let mut body = json!({ "person_id": person_id });
    if let Some(date) = ypt_expiration {
        body["ypt_expiration_date"] = json!(date);
    }
    let resp = fixture.post("/api/leaders", &body).await;
    assert_eq!(resp.status(), 201);
    resp.json().await.unwrap()
}

// ==================== HEALTH AND AUTH ====================

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture.get("/health").await;
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_auth_missing_key_rejected() {
    let fixture = TestFixture::new().await;

    // A plain client without the default x-api-key header
    let client = Client::new();
    let resp = client
        .get(fixture.url("/api/families"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_auth_wrong_key_rejected() {
    let fixture = TestFixture::new().await;

    let client = Client::new();
    let resp = client
        .get(fixture.url("/api/families"))
        .header("x-api-key", "wrong-key")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_auth_bearer_token_accepted() {
    let fixture = TestFixture::new().await;

    let client = Client::new();
    let resp = client
        .get(fixture.url("/api/families"))
        .header("Authorization", "Bearer test-api-key")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_auth_disabled_without_psk() {
    let fixture = TestFixture::with_psk(None).await;

    let client = Client::new();
    let resp = client
        .get(fixture.url("/api/families"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

// ==================== FAMILIES ====================

#[tokio::test]
async fn test_family_crud() {
    let fixture = TestFixture::new().await;

    let family = create_family(&fixture, "Johnson Family").await;
    let id = family["id"].as_i64().unwrap();
    assert_eq!(family["name"], "Johnson Family");
    assert_eq!(family["persons"].as_array().unwrap().len(), 0);

    let resp = fixture.get(&format!("/api/families/{}", id)).await;
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .put(
            &format!("/api/families/{}", id),
            &json!({ "city": "Springfield", "state": "IL" }),
        )
        .await;
    assert_eq!(resp.status(), 200);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["city"], "Springfield");
    assert_eq!(updated["name"], "Johnson Family");

    let resp = fixture.get("/api/families").await;
    let list: Value = resp.json().await.unwrap();
    assert_eq!(list["total"], 1);
    assert_eq!(list["data"].as_array().unwrap().len(), 1);

    let resp = fixture.delete(&format!("/api/families/{}", id)).await;
    assert_eq!(resp.status(), 204);

    let resp = fixture.get(&format!("/api/families/{}", id)).await;
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_family_create_empty_name_rejected() {
    let fixture = TestFixture::new().await;

    let resp = fixture.post("/api/families", &json!({ "name": "  " })).await;
    assert_eq!(resp.status(), 422);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_family_merge_reassigns_members() {
    let fixture = TestFixture::new().await;

    let primary = create_family(&fixture, "Smith Family").await;
    let duplicate = create_family(&fixture, "Smith Family (dup)").await;
    let primary_id = primary["id"].as_i64().unwrap();
    let duplicate_id = duplicate["id"].as_i64().unwrap();

    create_person(&fixture, Some(primary_id), "parent", "Alice", "Smith").await;
    create_person(&fixture, Some(primary_id), "scout", "Ben", "Smith").await;
    let moved = create_person(&fixture, Some(duplicate_id), "scout", "Cara", "Smith").await;

    let resp = fixture
        .post(
            "/api/families/merge",
            &json!({ "primary_id": primary_id, "merge_id": duplicate_id }),
        )
        .await;
    assert_eq!(resp.status(), 200);
    let merged: Value = resp.json().await.unwrap();
    assert_eq!(merged["persons"].as_array().unwrap().len(), 3);

    // Merged family is gone
    let resp = fixture.get(&format!("/api/families/{}", duplicate_id)).await;
    assert_eq!(resp.status(), 404);

    // The moved person now points at the surviving family
    let resp = fixture
        .get(&format!("/api/persons/{}", moved["id"].as_i64().unwrap()))
        .await;
    let person: Value = resp.json().await.unwrap();
    assert_eq!(person["family_id"].as_i64().unwrap(), primary_id);
}

#[tokio::test]
async fn test_family_merge_self_rejected() {
    let fixture = TestFixture::new().await;

    let family = create_family(&fixture, "Solo Family").await;
    let id = family["id"].as_i64().unwrap();

    let resp = fixture
        .post(
            "/api/families/merge",
            &json!({ "primary_id": id, "merge_id": id }),
        )
        .await;
    assert_eq!(resp.status(), 422);
}

#[tokio::test]
async fn test_family_merge_missing_family_404() {
    let fixture = TestFixture::new().await;

    let family = create_family(&fixture, "Only Family").await;
    let id = family["id"].as_i64().unwrap();

    let resp = fixture
        .post(
            "/api/families/merge",
            &json!({ "primary_id": id, "merge_id": 9999 }),
        )
        .await;
    assert_eq!(resp.status(), 404);
}

// ==================== PERSONS ====================

#[tokio::test]
async fn test_person_crud_with_family() {
    let fixture = TestFixture::new().await;

    let family = create_family(&fixture, "Lee Family").await;
    let family_id = family["id"].as_i64().unwrap();

    let person = create_person(&fixture, Some(family_id), "scout", "Min", "Lee").await;
    let id = person["id"].as_i64().unwrap();
    assert_eq!(person["family"]["name"], "Lee Family");

    let resp = fixture
        .put(
            &format!("/api/persons/{}", id),
            &json!({ "nickname": "Minnie", "email": "min@example.com" }),
        )
        .await;
    assert_eq!(resp.status(), 200);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["nickname"], "Minnie");
    assert_eq!(updated["first_name"], "Min");

    // Family detail groups the member under scouts
    let resp = fixture.get(&format!("/api/families/{}", family_id)).await;
    let detail: Value = resp.json().await.unwrap();
    assert_eq!(detail["scouts"].as_array().unwrap().len(), 1);
    assert_eq!(detail["parents"].as_array().unwrap().len(), 0);

    let resp = fixture.delete(&format!("/api/persons/{}", id)).await;
    assert_eq!(resp.status(), 204);
    let resp = fixture.get(&format!("/api/persons/{}", id)).await;
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_person_email_uniqueness() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .post(
            "/api/persons",
            &json!({
                "person_type": "parent",
                "first_name": "Ann",
                "last_name": "Ng",
                "email": "ann@example.com",
            }),
        )
        .await;
    assert_eq!(resp.status(), 201);

    let resp = fixture
        .post(
            "/api/persons",
            &json!({
                "person_type": "parent",
                "first_name": "Anna",
                "last_name": "Ngo",
                "email": "ann@example.com",
            }),
        )
        .await;
    assert_eq!(resp.status(), 422);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"]["fields"]["email"].is_string());
}

#[tokio::test]
async fn test_person_bsa_member_id_uniqueness() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .post(
            "/api/persons",
            &json!({
                "person_type": "scout",
                "first_name": "One",
                "last_name": "Scout",
                "bsa_member_id": "12345",
            }),
        )
        .await;
    assert_eq!(resp.status(), 201);

    let resp = fixture
        .post(
            "/api/persons",
            &json!({
                "person_type": "scout",
                "first_name": "Two",
                "last_name": "Scout",
                "bsa_member_id": "12345",
            }),
        )
        .await;
    assert_eq!(resp.status(), 422);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"]["fields"]["bsa_member_id"].is_string());
}

#[tokio::test]
async fn test_person_detach_from_family() {
    let fixture = TestFixture::new().await;

    let family = create_family(&fixture, "Cho Family").await;
    let family_id = family["id"].as_i64().unwrap();
    let person = create_person(&fixture, Some(family_id), "sibling", "Jun", "Cho").await;
    let id = person["id"].as_i64().unwrap();

    // Explicit null detaches; the person becomes orphaned
    let resp = fixture
        .put(&format!("/api/persons/{}", id), &json!({ "family_id": null }))
        .await;
    assert_eq!(resp.status(), 200);
    let detached: Value = resp.json().await.unwrap();
    assert!(detached.get("family_id").is_none() || detached["family_id"].is_null());

    let resp = fixture.get("/api/persons/orphaned/search").await;
    let orphans: Value = resp.json().await.unwrap();
    assert_eq!(orphans["total"], 1);
}

#[tokio::test]
async fn test_person_nullable_fields_cleared() {
    let fixture = TestFixture::new().await;

    let person = create_person(&fixture, None, "parent", "Lena", "Okafor").await;
    let id = person["id"].as_i64().unwrap();
    let resp = fixture
        .put(
            &format!("/api/persons/{}", id),
            &json!({ "email": "lena@example.com", "nickname": "Len" }),
        )
        .await;
    assert_eq!(resp.status(), 200);

    // Explicit null clears the value
    let resp = fixture
        .put(
            &format!("/api/persons/{}", id),
            &json!({ "email": null, "nickname": null }),
        )
        .await;
    assert_eq!(resp.status(), 200);
    let cleared: Value = resp.json().await.unwrap();
    assert!(cleared.get("email").is_none() || cleared["email"].is_null());
    assert!(cleared.get("nickname").is_none() || cleared["nickname"].is_null());

    // Absent fields stay untouched
    let resp = fixture
        .put(&format!("/api/persons/{}", id), &json!({ "phone": "555-0101" }))
        .await;
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["phone"], "555-0101");
    assert!(updated.get("email").is_none() || updated["email"].is_null());

    // A cleared email frees it up for someone else
    let other = create_person(&fixture, None, "parent", "Remi", "Okafor").await;
    let resp = fixture
        .put(
            &format!("/api/persons/{}", other["id"].as_i64().unwrap()),
            &json!({ "email": "lena@example.com" }),
        )
        .await;
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_person_list_filters() {
    let fixture = TestFixture::new().await;

    let family = create_family(&fixture, "Diaz Family").await;
    let family_id = family["id"].as_i64().unwrap();
    create_person(&fixture, Some(family_id), "scout", "Rio", "Diaz").await;
    create_person(&fixture, Some(family_id), "parent", "Mar", "Diaz").await;
    create_person(&fixture, None, "parent", "Sol", "Vega").await;

    let resp = fixture.get("/api/persons?person_type=parent").await;
    let list: Value = resp.json().await.unwrap();
    assert_eq!(list["total"], 2);

    let resp = fixture
        .get(&format!("/api/persons?family_id={}", family_id))
        .await;
    let list: Value = resp.json().await.unwrap();
    assert_eq!(list["total"], 2);

    let resp = fixture.get("/api/persons?search=Vega").await;
    let list: Value = resp.json().await.unwrap();
    assert_eq!(list["total"], 1);

    let resp = fixture.get("/api/persons?person_type=alien").await;
    assert_eq!(resp.status(), 422);
}

#[tokio::test]
async fn test_person_merge_moves_scout_record() {
    let fixture = TestFixture::new().await;

    let primary = create_person(&fixture, None, "scout", "Real", "Kid").await;
    let duplicate = create_person(&fixture, None, "scout", "Dup", "Kid").await;
    let primary_id = primary["id"].as_i64().unwrap();
    let duplicate_id = duplicate["id"].as_i64().unwrap();

    let scout = create_scout(&fixture, duplicate_id, Some(&date_in(200))).await;
    let scout_id = scout["id"].as_i64().unwrap();

    let resp = fixture
        .post(
            "/api/persons/merge",
            &json!({ "primary_id": primary_id, "merge_id": duplicate_id }),
        )
        .await;
    assert_eq!(resp.status(), 200);
    let merged: Value = resp.json().await.unwrap();
    assert_eq!(merged["scout"]["id"].as_i64().unwrap(), scout_id);

    // Duplicate person is gone; the scout row survived under the primary
    let resp = fixture.get(&format!("/api/persons/{}", duplicate_id)).await;
    assert_eq!(resp.status(), 404);
    let resp = fixture.get(&format!("/api/scouts/{}", scout_id)).await;
    let scout: Value = resp.json().await.unwrap();
    assert_eq!(scout["person_id"].as_i64().unwrap(), primary_id);
}

#[tokio::test]
async fn test_person_merge_both_scouts_conflict() {
    let fixture = TestFixture::new().await;

    let first = create_person(&fixture, None, "scout", "Kay", "One").await;
    let second = create_person(&fixture, None, "scout", "Jay", "Two").await;
    let first_id = first["id"].as_i64().unwrap();
    let second_id = second["id"].as_i64().unwrap();
    create_scout(&fixture, first_id, None).await;
    create_scout(&fixture, second_id, None).await;

    let resp = fixture
        .post(
            "/api/persons/merge",
            &json!({ "primary_id": first_id, "merge_id": second_id }),
        )
        .await;
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "CONFLICT");

    // Nothing changed: both persons still resolve
    let resp = fixture.get(&format!("/api/persons/{}", second_id)).await;
    assert_eq!(resp.status(), 200);
}

// ==================== SCOUTS ====================

#[tokio::test]
async fn test_scout_expiration_buckets() {
    let fixture = TestFixture::new().await;

    let cases: [(Option<i64>, &str); 5] = [
        (Some(-1), "expired"),
        (Some(15), "expiring_soon"),
        (Some(45), "expiring_in_60"),
        (Some(200), "active"),
        (None, "unknown"),
    ];

    for (days, expected) in cases {
        let person = create_person(
            &fixture,
            None,
            "scout",
            "Scout",
            &format!("Case{}", days.unwrap_or(0).abs() + expected.len() as i64),
        )
        .await;
        let date = days.map(date_in);
        let scout = create_scout(
            &fixture,
            person["id"].as_i64().unwrap(),
            date.as_deref(),
        )
        .await;
        assert_eq!(scout["expiration_status"], expected, "days={:?}", days);
        if let Some(days) = days {
            assert_eq!(scout["days_until_expiration"].as_i64().unwrap(), days);
        }
    }
}

#[tokio::test]
async fn test_scout_detail_embeds_person() {
    let fixture = TestFixture::new().await;

    let family = create_family(&fixture, "Park Family").await;
    let person = create_person(
        &fixture,
        Some(family["id"].as_i64().unwrap()),
        "scout",
        "Ha",
        "Park",
    )
    .await;
    let scout = create_scout(&fixture, person["id"].as_i64().unwrap(), None).await;

    let resp = fixture
        .get(&format!("/api/scouts/{}", scout["id"].as_i64().unwrap()))
        .await;
    let detail: Value = resp.json().await.unwrap();
    assert_eq!(detail["person"]["first_name"], "Ha");
    assert_eq!(detail["person"]["family"]["name"], "Park Family");
}

#[tokio::test]
async fn test_scouts_expiring_window() {
    let fixture = TestFixture::new().await;

    let soon = create_person(&fixture, None, "scout", "Soon", "Lapses").await;
    let later = create_person(&fixture, None, "scout", "Later", "Lapses").await;
    create_scout(&fixture, soon["id"].as_i64().unwrap(), Some(&date_in(10))).await;
    create_scout(&fixture, later["id"].as_i64().unwrap(), Some(&date_in(100))).await;

    let resp = fixture.get("/api/scouts/expiring/list?days=60").await;
    let list: Value = resp.json().await.unwrap();
    assert_eq!(list["total"], 1);
    assert_eq!(list["data"][0]["person"]["first_name"], "Soon");
}

#[tokio::test]
async fn test_scouts_by_den() {
    let fixture = TestFixture::new().await;

    let person = create_person(&fixture, None, "scout", "Denny", "Wolf").await;
    create_scout(&fixture, person["id"].as_i64().unwrap(), Some(&date_in(90))).await;

    let resp = fixture.get("/api/scouts/den/Wolf").await;
    let scouts: Value = resp.json().await.unwrap();
    assert_eq!(scouts.as_array().unwrap().len(), 1);

    let resp = fixture.get("/api/scouts/den/Bear").await;
    let scouts: Value = resp.json().await.unwrap();
    assert_eq!(scouts.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_scout_status_filter_validated() {
    let fixture = TestFixture::new().await;

    let resp = fixture.get("/api/scouts?status=vaporized").await;
    assert_eq!(resp.status(), 422);

    let resp = fixture.get("/api/scouts?status=expiring_soon").await;
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_scout_requires_existing_person() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .post("/api/scouts", &json!({ "person_id": 4242 }))
        .await;
    assert_eq!(resp.status(), 422);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"]["fields"]["person_id"].is_string());
}

// ==================== ADULT LEADERS ====================

#[tokio::test]
async fn test_leader_ypt_buckets() {
    let fixture = TestFixture::new().await;

    let cases: [(Option<i64>, &str); 5] = [
        (Some(-1), "expired"),
        (Some(15), "expiring_soon"),
        (Some(45), "expiring_in_90"),
        (Some(200), "current"),
        (None, "unknown"),
    ];

    for (days, expected) in cases {
        let person = create_person(
            &fixture,
            None,
            "adult_leader",
            "Leader",
            &format!("Ypt{}{}", days.unwrap_or(0).abs(), expected.len()),
        )
        .await;
        let date = days.map(date_in);
        let leader = create_leader(
            &fixture,
            person["id"].as_i64().unwrap(),
            date.as_deref(),
        )
        .await;
        assert_eq!(leader["ypt_status_formatted"], expected, "days={:?}", days);
        if let Some(days) = days {
            assert_eq!(leader["days_until_ypt_expiration"].as_i64().unwrap(), days);
        }
    }
}

#[tokio::test]
async fn test_leader_positions_add_remove() {
    let fixture = TestFixture::new().await;

    let person = create_person(&fixture, None, "adult_leader", "Den", "Chief").await;
    let leader = create_leader(&fixture, person["id"].as_i64().unwrap(), None).await;
    let id = leader["id"].as_i64().unwrap();

    let resp = fixture
        .post(
            &format!("/api/leaders/{}/positions", id),
            &json!({ "position": "Den Leader" }),
        )
        .await;
    assert_eq!(resp.status(), 200);

    // Adding the same position again is a no-op
    let resp = fixture
        .post(
            &format!("/api/leaders/{}/positions", id),
            &json!({ "position": "Den Leader" }),
        )
        .await;
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["positions"], json!(["Den Leader"]));

    let resp = fixture
        .delete_json(
            &format!("/api/leaders/{}/positions", id),
            &json!({ "position": "Den Leader" }),
        )
        .await;
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["positions"], json!([]));
}

#[tokio::test]
async fn test_leaders_expiring_soon() {
    let fixture = TestFixture::new().await;

    let lapsing = create_person(&fixture, None, "adult_leader", "Al", "Lapsing").await;
    let current = create_person(&fixture, None, "adult_leader", "Cy", "Current").await;
    create_leader(&fixture, lapsing["id"].as_i64().unwrap(), Some(&date_in(10))).await;
    create_leader(&fixture, current["id"].as_i64().unwrap(), Some(&date_in(300))).await;

    let resp = fixture.get("/api/leaders/expiring/soon?days=30").await;
    let list: Value = resp.json().await.unwrap();
    assert_eq!(list["total"], 1);
    assert_eq!(list["data"][0]["person"]["first_name"], "Al");
}

#[tokio::test]
async fn test_expiring_days_clamped() {
    let fixture = TestFixture::new().await;

    let scout = create_person(&fixture, None, "scout", "Far", "Out").await;
    create_scout(&fixture, scout["id"].as_i64().unwrap(), Some(&date_in(45))).await;
    let leader = create_person(&fixture, None, "adult_leader", "Way", "Out").await;
    create_leader(&fixture, leader["id"].as_i64().unwrap(), Some(&date_in(45))).await;

    // An absurd window is capped rather than overflowing date math
    let resp = fixture
        .get("/api/scouts/expiring/list?days=4294967295")
        .await;
    assert_eq!(resp.status(), 200);
    let list: Value = resp.json().await.unwrap();
    assert_eq!(list["total"], 1);

    let resp = fixture
        .get("/api/leaders/expiring/soon?days=4294967295")
        .await;
    assert_eq!(resp.status(), 200);
    let list: Value = resp.json().await.unwrap();
    assert_eq!(list["total"], 1);

    let resp = fixture
        .get("/api/dashboard/expiring?days=4294967295")
        .await;
    assert_eq!(resp.status(), 200);
}

// ==================== PERMISSIONS ====================

#[tokio::test]
async fn test_permission_crud_and_uniqueness() {
    let fixture = TestFixture::new().await;

    let person = create_person(&fixture, None, "adult_leader", "Web", "Master").await;
    let person_id = person["id"].as_i64().unwrap();

    let resp = fixture
        .post(
            "/api/permissions",
            &json!({
                "wordpress_user_id": 77,
                "person_id": person_id,
                "role": "admin",
            }),
        )
        .await;
    assert_eq!(resp.status(), 201);
    let permission: Value = resp.json().await.unwrap();
    let id = permission["id"].as_i64().unwrap();
    assert_eq!(permission["person"]["first_name"], "Web");

    // Duplicate WordPress mapping is rejected
    let resp = fixture
        .post(
            "/api/permissions",
            &json!({
                "wordpress_user_id": 77,
                "person_id": person_id,
                "role": "viewer",
            }),
        )
        .await;
    assert_eq!(resp.status(), 422);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"]["fields"]["wordpress_user_id"].is_string());

    let resp = fixture
        .put(&format!("/api/permissions/{}", id), &json!({ "role": "editor" }))
        .await;
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["role"], "editor");

    let resp = fixture.delete(&format!("/api/permissions/{}", id)).await;
    assert_eq!(resp.status(), 204);
}

#[tokio::test]
async fn test_permission_lookups() {
    let fixture = TestFixture::new().await;

    let person = create_person(&fixture, None, "adult_leader", "Role", "Holder").await;
    let person_id = person["id"].as_i64().unwrap();

    fixture
        .post(
            "/api/permissions",
            &json!({ "wordpress_user_id": 1, "person_id": person_id, "role": "admin" }),
        )
        .await;

    let resp = fixture.get("/api/permissions/wordpress/1").await;
    assert_eq!(resp.status(), 200);
    let resp = fixture.get("/api/permissions/wordpress/2").await;
    assert_eq!(resp.status(), 404);

    let resp = fixture.get("/api/permissions/role/admin").await;
    let list: Value = resp.json().await.unwrap();
    assert_eq!(list["total"], 1);

    let resp = fixture.get("/api/permissions/role/overlord").await;
    assert_eq!(resp.status(), 422);

    let resp = fixture.get("/api/permissions/admins/list").await;
    let admins: Value = resp.json().await.unwrap();
    assert_eq!(admins.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_permission_grant_cycle_rejected() {
    let fixture = TestFixture::new().await;

    let person = create_person(&fixture, None, "adult_leader", "Grant", "Chain").await;
    let person_id = person["id"].as_i64().unwrap();

    let first: Value = fixture
        .post(
            "/api/permissions",
            &json!({ "wordpress_user_id": 10, "person_id": person_id, "role": "admin" }),
        )
        .await
        .json()
        .await
        .unwrap();
    let first_id = first["id"].as_i64().unwrap();

    let second: Value = fixture
        .post(
            "/api/permissions",
            &json!({
                "wordpress_user_id": 11,
                "person_id": person_id,
                "role": "editor",
                "granted_by": first_id,
            }),
        )
        .await
        .json()
        .await
        .unwrap();
    let second_id = second["id"].as_i64().unwrap();

    // Closing the loop is rejected
    let resp = fixture
        .put(
            &format!("/api/permissions/{}", first_id),
            &json!({ "granted_by": second_id }),
        )
        .await;
    assert_eq!(resp.status(), 422);

    // Self-grant is the one-hop cycle
    let resp = fixture
        .put(
            &format!("/api/permissions/{}", first_id),
            &json!({ "granted_by": first_id }),
        )
        .await;
    assert_eq!(resp.status(), 422);
}

#[tokio::test]
async fn test_permission_grantor_cleared() {
    let fixture = TestFixture::new().await;

    let person = create_person(&fixture, None, "adult_leader", "Root", "Grantor").await;
    let person_id = person["id"].as_i64().unwrap();

    let root: Value = fixture
        .post(
            "/api/permissions",
            &json!({ "wordpress_user_id": 20, "person_id": person_id, "role": "admin" }),
        )
        .await
        .json()
        .await
        .unwrap();
    let granted: Value = fixture
        .post(
            "/api/permissions",
            &json!({
                "wordpress_user_id": 21,
                "person_id": person_id,
                "role": "viewer",
                "granted_by": root["id"],
            }),
        )
        .await
        .json()
        .await
        .unwrap();
    let granted_id = granted["id"].as_i64().unwrap();
    assert_eq!(granted["granted_by"], root["id"]);

    // Explicit null clears the grantor
    let resp = fixture
        .put(
            &format!("/api/permissions/{}", granted_id),
            &json!({ "granted_by": null }),
        )
        .await;
    assert_eq!(resp.status(), 200);
    let cleared: Value = resp.json().await.unwrap();
    assert!(cleared.get("granted_by").is_none() || cleared["granted_by"].is_null());

    // Absent leaves an existing grantor in place
    let resp = fixture
        .put(
            &format!("/api/permissions/{}", granted_id),
            &json!({ "granted_by": root["id"] }),
        )
        .await;
    assert_eq!(resp.status(), 200);
    let resp = fixture
        .put(
            &format!("/api/permissions/{}", granted_id),
            &json!({ "role": "editor" }),
        )
        .await;
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["role"], "editor");
    assert_eq!(updated["granted_by"], root["id"]);
}

// ==================== QUERY HARDENING ====================

#[tokio::test]
async fn test_sort_allowlist_enforced() {
    let fixture = TestFixture::new().await;

    let resp = fixture.get("/api/families?sort=deleted_at").await;
    assert_eq!(resp.status(), 422);

    let resp = fixture.get("/api/families?sort=name&direction=sideways").await;
    assert_eq!(resp.status(), 422);

    let resp = fixture.get("/api/families?sort=name&direction=desc").await;
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_pagination_clamped() {
    let fixture = TestFixture::new().await;

    create_family(&fixture, "Paged Family").await;

    let resp = fixture.get("/api/families?per_page=5000&page=0").await;
    assert_eq!(resp.status(), 200);
    let list: Value = resp.json().await.unwrap();
    assert_eq!(list["per_page"], 100);
    assert_eq!(list["page"], 1);
}

#[tokio::test]
async fn test_pagination_pages() {
    let fixture = TestFixture::new().await;

    for i in 0..5 {
        create_family(&fixture, &format!("Family {:02}", i)).await;
    }

    let resp = fixture.get("/api/families?per_page=2&page=2&sort=name").await;
    let list: Value = resp.json().await.unwrap();
    assert_eq!(list["total"], 5);
    assert_eq!(list["data"].as_array().unwrap().len(), 2);
    assert_eq!(list["data"][0]["name"], "Family 02");
}

// ==================== SOFT DELETE ====================

#[tokio::test]
async fn test_soft_deleted_person_excluded_everywhere() {
    let fixture = TestFixture::new().await;

    let family = create_family(&fixture, "Gone Family").await;
    let family_id = family["id"].as_i64().unwrap();
    let member = create_person(&fixture, Some(family_id), "scout", "Ghost", "Gone").await;
    let orphan = create_person(&fixture, None, "parent", "Lost", "Gone").await;

    fixture
        .delete(&format!("/api/persons/{}", member["id"].as_i64().unwrap()))
        .await;
    fixture
        .delete(&format!("/api/persons/{}", orphan["id"].as_i64().unwrap()))
        .await;

    let resp = fixture.get(&format!("/api/families/{}", family_id)).await;
    let detail: Value = resp.json().await.unwrap();
    assert_eq!(detail["persons"].as_array().unwrap().len(), 0);

    let resp = fixture.get("/api/persons/orphaned/search").await;
    let orphans: Value = resp.json().await.unwrap();
    assert_eq!(orphans["total"], 0);

    let resp = fixture.get("/api/persons").await;
    let list: Value = resp.json().await.unwrap();
    assert_eq!(list["total"], 0);
}

#[tokio::test]
async fn test_deleted_email_can_be_reused() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .post(
            "/api/persons",
            &json!({
                "person_type": "parent",
                "first_name": "Old",
                "last_name": "Account",
                "email": "shared@example.com",
            }),
        )
        .await;
    let person: Value = resp.json().await.unwrap();
    fixture
        .delete(&format!("/api/persons/{}", person["id"].as_i64().unwrap()))
        .await;

    // Uniqueness only spans non-deleted persons
    let resp = fixture
        .post(
            "/api/persons",
            &json!({
                "person_type": "parent",
                "first_name": "New",
                "last_name": "Account",
                "email": "shared@example.com",
            }),
        )
        .await;
    assert_eq!(resp.status(), 201);
}

// ==================== DASHBOARD ====================

#[tokio::test]
async fn test_dashboard_statistics() {
    let fixture = TestFixture::new().await;

    let family = create_family(&fixture, "Stat Family").await;
    let family_id = family["id"].as_i64().unwrap();
    let scout_person = create_person(&fixture, Some(family_id), "scout", "Sam", "Stat").await;
    let leader_person = create_person(&fixture, Some(family_id), "adult_leader", "Lea", "Stat").await;
    create_person(&fixture, None, "parent", "Orph", "Stat").await;
    create_scout(
        &fixture,
        scout_person["id"].as_i64().unwrap(),
        Some(&date_in(200)),
    )
    .await;
    create_leader(
        &fixture,
        leader_person["id"].as_i64().unwrap(),
        Some(&date_in(15)),
    )
    .await;

    let resp = fixture.get("/api/dashboard/statistics").await;
    let stats: Value = resp.json().await.unwrap();

    assert_eq!(stats["families"]["active"], 1);
    assert_eq!(stats["persons"]["total"], 3);
    assert_eq!(stats["persons"]["scouts"], 1);
    assert_eq!(stats["persons"]["orphaned"], 1);
    assert_eq!(stats["scouts"]["active"], 1);
    assert_eq!(stats["scouts"]["expired"], 0);
    assert_eq!(stats["leaders"]["ypt_expiring_soon"], 1);
    assert_eq!(stats["leaders"]["ypt_unknown"], 0);
}

#[tokio::test]
async fn test_dashboard_expiring_and_activity() {
    let fixture = TestFixture::new().await;

    let person = create_person(&fixture, None, "scout", "Win", "Dow").await;
    create_scout(&fixture, person["id"].as_i64().unwrap(), Some(&date_in(20))).await;

    let resp = fixture.get("/api/dashboard/expiring?days=60").await;
    let expiring: Value = resp.json().await.unwrap();
    assert_eq!(expiring["scouts"].as_array().unwrap().len(), 1);
    assert_eq!(expiring["leaders"].as_array().unwrap().len(), 0);

    // Mutations above left an audit trail
    let resp = fixture.get("/api/dashboard/activity?limit=10").await;
    let activity: Value = resp.json().await.unwrap();
    let entries = activity.as_array().unwrap();
    assert!(!entries.is_empty());
    assert!(entries.iter().any(|e| e["action"] == "created"));
}

#[tokio::test]
async fn test_dashboard_sync_logs() {
    let fixture = TestFixture::new().await;

    let resp = fixture.get("/api/dashboard/sync-status").await;
    let status: Value = resp.json().await.unwrap();
    assert!(status["scoutbook"].is_null());

    let resp = fixture
        .post(
            "/api/dashboard/sync-history",
            &json!({
                "sync_type": "scoutbook",
                "status": "completed",
                "started_at": "2026-08-01T06:00:00Z",
                "completed_at": "2026-08-01T06:02:00Z",
                "records_processed": 42,
                "records_created": 5,
            }),
        )
        .await;
    assert_eq!(resp.status(), 201);

    let resp = fixture.get("/api/dashboard/sync-status").await;
    let status: Value = resp.json().await.unwrap();
    assert_eq!(status["scoutbook"]["status"], "completed");
    assert_eq!(status["scoutbook"]["records_processed"], 42);
    assert!(status["mailchimp"].is_null());

    let resp = fixture.get("/api/dashboard/sync-history?type=scoutbook").await;
    let history: Value = resp.json().await.unwrap();
    assert_eq!(history.as_array().unwrap().len(), 1);

    let resp = fixture
        .get("/api/dashboard/sync-history?type=mailchimp_import")
        .await;
    let history: Value = resp.json().await.unwrap();
    assert_eq!(history.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_dashboard_family_report_and_distributions() {
    let fixture = TestFixture::new().await;

    let family = create_family(&fixture, "Report Family").await;
    let family_id = family["id"].as_i64().unwrap();
    let scout_person = create_person(&fixture, Some(family_id), "scout", "Rep", "Ort").await;
    create_person(&fixture, Some(family_id), "parent", "Par", "Ort").await;
    create_scout(
        &fixture,
        scout_person["id"].as_i64().unwrap(),
        Some(&date_in(100)),
    )
    .await;

    let resp = fixture
        .get(&format!("/api/dashboard/family/{}", family_id))
        .await;
    let report: Value = resp.json().await.unwrap();
    assert_eq!(report["summary"]["total_members"], 2);
    assert_eq!(report["summary"]["scouts"], 1);
    assert_eq!(report["summary"]["parents"], 1);

    let resp = fixture.get("/api/dashboard/dens").await;
    let dens: Value = resp.json().await.unwrap();
    assert_eq!(dens[0]["den"], "Wolf");
    assert_eq!(dens[0]["count"], 1);

    let resp = fixture.get("/api/dashboard/ranks").await;
    let ranks: Value = resp.json().await.unwrap();
    assert_eq!(ranks[0]["count"], 1);
}

// ==================== SETTINGS ====================

#[tokio::test]
async fn test_settings_upsert() {
    let fixture = TestFixture::new().await;

    let resp = fixture.get("/api/settings/pack_name").await;
    assert_eq!(resp.status(), 404);

    let resp = fixture
        .put("/api/settings/pack_name", &json!({ "value": "Pack 123" }))
        .await;
    assert_eq!(resp.status(), 200);
    let setting: Value = resp.json().await.unwrap();
    assert_eq!(setting["setting_value"], "Pack 123");

    let resp = fixture
        .put("/api/settings/pack_name", &json!({ "value": "Pack 456" }))
        .await;
    let setting: Value = resp.json().await.unwrap();
    assert_eq!(setting["setting_value"], "Pack 456");

    let resp = fixture.get("/api/settings/pack_name").await;
    assert_eq!(resp.status(), 200);
    let setting: Value = resp.json().await.unwrap();
    assert_eq!(setting["setting_value"], "Pack 456");
}
