mod support;

use preptrack::domain::{
    CreateEntryBody, Difficulty, EntriesFilter, EntryStatus, PrepCategory, UpdateEntryBody,
    UpdateTaskStatusBody,
};
use preptrack::{EntryOp, EntryService};
use support::{day_json, entry_json, Harness};
use time::macros::date;

fn page_json(entries: Vec<serde_json::Value>, page: u32) -> String {
    let total = entries.len();
    serde_json::json!({
        "entries": entries,
        "pagination": { "page": page, "limit": 20, "total": total, "totalPages": 1 }
    })
    .to_string()
}

#[tokio::test]
async fn list_sends_only_set_filters() {
    let h = Harness::start().await;
    h.server.respond(
        "GET",
        "/api/entries",
        200,
        &page_json(vec![entry_json("e1", "Two Sum")], 2),
    );

    let filter = EntriesFilter {
        category: Some(PrepCategory::SystemDesign),
        difficulty: Some(Difficulty::Hard),
        tag: Some(String::new()),
        from: Some(date!(2024 - 01 - 01)),
        page: Some(2),
        limit: Some(0),
        ..Default::default()
    };
    h.client.entries().fetch_entries(&filter).await.unwrap();

    let request = h.server.last_request("GET", "/api/entries");
    assert_eq!(
        request.query(),
        "category=system_design&difficulty=hard&from=2024-01-01&page=2"
    );
    let state = h.client.entries().state();
    assert_eq!(state.entries.len(), 1);
    assert_eq!(state.pagination.unwrap().page, 2);
}

#[tokio::test]
async fn create_update_delete_keep_cache_in_sync() {
    let h = Harness::start().await;
    h.server.respond("GET", "/api/entries", 200, &page_json(vec![entry_json("e1", "Two Sum")], 1));
    h.server.respond("POST", "/api/entries", 201, &entry_json("e2", "LRU cache").to_string());
    let mut renamed = entry_json("e1", "Two Sum II");
    renamed["status"] = "completed".into();
    h.server.respond("PUT", "/api/entries/e1", 200, &renamed.to_string());
    h.server.respond("DELETE", "/api/entries/e2", 204, "");

    let store = h.client.entries();
    store.fetch_entries(&EntriesFilter::default()).await.unwrap();

    let body = CreateEntryBody::new("LRU cache", PrepCategory::Dsa, date!(2024 - 01 - 01))
        .with_tags(["design", "design", "cache"]);
    store.create_entry(&body).await.unwrap();
    let sent = h.server.last_request("POST", "/api/entries").json();
    assert_eq!(sent["title"], "LRU cache");
    assert_eq!(sent["tags"], serde_json::json!(["design", "cache"]));
    assert!(sent.get("notes").is_none());

    let ids: Vec<String> = store.entries().into_iter().map(|e| e.id).collect();
    assert_eq!(ids, vec!["e2", "e1"]);

    let patch = UpdateEntryBody {
        title: Some("Two Sum II".to_string()),
        status: Some(EntryStatus::Completed),
        ..Default::default()
    };
    store.update_entry("e1", &patch).await.unwrap();
    let sent = h.server.last_request("PUT", "/api/entries/e1").json();
    assert_eq!(sent, serde_json::json!({ "title": "Two Sum II", "status": "completed" }));
    assert_eq!(store.entries()[1].title, "Two Sum II");

    store.delete_entry("e2").await.unwrap();
    let ids: Vec<String> = store.entries().into_iter().map(|e| e.id).collect();
    assert_eq!(ids, vec!["e1"]);
}

#[tokio::test]
async fn failed_delete_keeps_entry_and_records_error() {
    let h = Harness::start().await;
    h.server.respond("GET", "/api/entries", 200, &page_json(vec![entry_json("e1", "Two Sum")], 1));
    h.server.respond("DELETE", "/api/entries/e1", 404, r#"{"message":"Entry not found"}"#);

    let store = h.client.entries();
    store.fetch_entries(&EntriesFilter::default()).await.unwrap();
    assert!(store.delete_entry("e1").await.is_err());

    assert_eq!(store.entries().len(), 1);
    assert_eq!(store.state().error(EntryOp::Delete), Some("Entry not found"));
}

#[tokio::test]
async fn today_history_and_status_endpoints() {
    let h = Harness::start().await;
    let mut task = entry_json("e1", "Two Sum");
    task["completionId"] = "c1".into();
    task["completionNotes"] = serde_json::Value::Null;
    h.server.respond("GET", "/api/entries/today", 200, &day_json("2024-01-01", vec![task]));
    h.server.respond("GET", "/api/entries/history", 200, &day_json("2023-12-31", vec![]));
    h.server.respond(
        "POST",
        "/api/entries/status",
        200,
        r#"{"_id":"c1","entry":"e1","userId":"user-1","date":"2024-01-01","status":"completed","createdAt":"2024-01-01T00:00:00.000Z","updatedAt":"2024-01-01T00:00:00.000Z"}"#,
    );

    let store = h.client.entries();
    let completion = store
        .update_task_status(&UpdateTaskStatusBody {
            entry: "e1".to_string(),
            date: date!(2024 - 01 - 01),
            status: EntryStatus::Completed,
            notes: None,
        })
        .await
        .unwrap();
    assert_eq!(completion.id, "c1");
    let sent = h.server.last_request("POST", "/api/entries/status").json();
    assert_eq!(
        sent,
        serde_json::json!({ "entry": "e1", "date": "2024-01-01", "status": "completed" })
    );

    let today = store.fetch_today().await.unwrap();
    let task = today.find_task("e1").unwrap();
    assert!(task.is_acted_upon());
    assert_eq!(task.completion_notes, None);

    let day = store
        .service()
        .history_day(date!(2023 - 12 - 31))
        .await
        .unwrap();
    assert_eq!(day.date, "2023-12-31");
    assert_eq!(h.server.last_request("GET", "/api/entries/history").query(), "date=2023-12-31");
}

#[tokio::test]
async fn aggregate_and_search_queries() {
    let h = Harness::start().await;
    h.server.respond("GET", "/api/entries/search", 200, "[]");
    h.server.respond("GET", "/api/entries/topics", 200, r#"[{"topic":"graphs","count":3}]"#);
    h.server.respond("GET", "/api/entries/sources", 200, r#"[{"source":"leetcode","count":2}]"#);
    h.server.respond(
        "POST",
        "/api/entries/bulk-delete",
        200,
        r#"{"message":"Deleted","deletedCount":2}"#,
    );

    let api = h.client.entries().service();
    api.search("two sum").await.unwrap();
    assert_eq!(h.server.last_request("GET", "/api/entries/search").query(), "q=two+sum");

    let topics = api.topics(Some(PrepCategory::Dsa)).await.unwrap();
    assert_eq!(topics[0].count, 3);
    assert_eq!(h.server.last_request("GET", "/api/entries/topics").query(), "category=dsa");
    api.topics(None).await.unwrap();
    assert_eq!(h.server.last_request("GET", "/api/entries/topics").query(), "");

    assert_eq!(api.sources().await.unwrap()[0].source, "leetcode");

    let ids = vec!["e1".to_string(), "e2".to_string()];
    let result = api.bulk_delete(&ids).await.unwrap();
    assert_eq!(result.deleted_count, 2);
    assert_eq!(
        h.server.last_request("POST", "/api/entries/bulk-delete").json(),
        serde_json::json!({ "ids": ["e1", "e2"] })
    );
}

#[tokio::test]
async fn stats_and_passkey_management() {
    let h = Harness::start().await;
    h.server.respond(
        "GET",
        "/api/stats/streaks",
        200,
        r#"{"currentStreak":3,"longestStreak":9,"totalActiveDays":20}"#,
    );
    h.server.respond("GET", "/api/stats/progress", 200, r#"[{"date":"2024-01-01","completed":4}]"#);
    h.server.respond(
        "GET",
        "/auth/passkey/credentials",
        200,
        r#"{"credentials":[{"_id":"k1","name":"","deviceType":"singleDevice","backedUp":false,"createdAt":"2024-01-01T00:00:00.000Z"}]}"#,
    );
    h.server.respond("DELETE", "/auth/passkey/credentials/k1", 204, "");

    let streaks = h.client.stats().streaks().await.unwrap();
    assert_eq!(streaks.longest_streak, 9);
    let progress = h.client.stats().progress(7).await.unwrap();
    assert_eq!(progress[0].completed, 4);
    assert_eq!(h.server.last_request("GET", "/api/stats/progress").query(), "days=7");

    let credentials = h.client.account().list_credentials().await.unwrap();
    assert_eq!(credentials[0].display_name(), "Unnamed passkey");
    h.client.account().delete_credential("k1").await.unwrap();
}

#[tokio::test]
async fn ids_are_escaped_into_a_single_path_segment() {
    let h = Harness::start().await;
    h.server.respond("DELETE", "/api/entries/a%2Fb%3Fx", 204, "");
    h.server.respond("DELETE", "/auth/passkey/credentials/k%231", 204, "");

    h.client.entries().service().delete("a/b?x").await.unwrap();
    h.client.account().delete_credential("k#1").await.unwrap();

    let request = h.server.last_request("DELETE", "/api/entries/a%2Fb%3Fx");
    assert_eq!(request.query(), "");
}
