use std::collections::BTreeMap;

use docstore::error::invalid_argument;
use docstore::{
    Cursor, DataConverter, DatabaseId, Docstore, FieldFilter, FieldValue, MapValue, OrderBy,
    StoreClient, StoreResult, Timestamp, TypedCollection, ValueKind,
};

#[derive(Clone, Debug, PartialEq)]
struct Task {
    id: String,
    title: String,
    status: String,
    priority: i64,
    created_at: Timestamp,
}

#[derive(Clone)]
struct TaskConverter;

impl DataConverter for TaskConverter {
    type Model = Task;

    fn encode(&self, value: &Task) -> StoreResult<BTreeMap<String, FieldValue>> {
        let mut map = BTreeMap::new();
        map.insert("title".to_string(), FieldValue::from_string(&value.title));
        map.insert("status".to_string(), FieldValue::from_string(&value.status));
        map.insert(
            "priority".to_string(),
            FieldValue::from_integer(value.priority),
        );
        map.insert(
            "created_at".to_string(),
            FieldValue::from_timestamp(value.created_at),
        );
        Ok(map)
    }

    fn decode(&self, id: &str, fields: &MapValue) -> StoreResult<Task> {
        let created_at = match fields.fields().get("created_at").map(FieldValue::kind) {
            Some(ValueKind::Timestamp(timestamp)) => *timestamp,
            _ => return Err(invalid_argument("missing created_at field")),
        };
        Ok(Task {
            id: id.to_string(),
            title: string_field(fields, "title")?,
            status: string_field(fields, "status")?,
            priority: fields
                .fields()
                .get("priority")
                .and_then(FieldValue::as_integer)
                .ok_or_else(|| invalid_argument("missing priority field"))?,
            created_at,
        })
    }
}

fn string_field(fields: &MapValue, name: &str) -> StoreResult<String> {
    fields
        .fields()
        .get(name)
        .and_then(|value| value.as_str())
        .map(str::to_string)
        .ok_or_else(|| invalid_argument(format!("missing {name} field")))
}

fn task_collection() -> TypedCollection<TaskConverter> {
    let store = Docstore::new(DatabaseId::default("collection-ops"));
    let client = StoreClient::with_in_memory(store);
    client.typed_collection("tasks", TaskConverter).unwrap()
}

fn task(title: &str, status: &str, priority: i64, created_secs: i64) -> Task {
    Task {
        id: String::new(),
        title: title.to_string(),
        status: status.to_string(),
        priority,
        created_at: Timestamp::new(created_secs, 0),
    }
}

#[tokio::test]
async fn missing_record_reads_as_none() {
    let tasks = task_collection();
    let fetched = tasks.get_single("nope").await.expect("get single");
    assert!(fetched.is_none());
}

#[tokio::test]
async fn create_then_get_roundtrip() {
    let tasks = task_collection();
    let original = task("write report", "active", 2, 100);

    let id = tasks.create(&original, None).await.expect("create");
    assert_eq!(id.len(), 20);

    let fetched = tasks.get_single(&id).await.expect("get single");
    let expected = Task {
        id: id.clone(),
        ..original
    };
    assert_eq!(fetched, Some(expected));
}

#[tokio::test]
async fn create_with_explicit_id_overwrites() {
    let tasks = task_collection();
    tasks
        .create(&task("first", "active", 1, 100), Some("t1"))
        .await
        .expect("first create");
    let id = tasks
        .create(&task("second", "active", 1, 100), Some("t1"))
        .await
        .expect("second create");
    assert_eq!(id, "t1");

    let fetched = tasks.get_single("t1").await.expect("get single").unwrap();
    assert_eq!(fetched.title, "second");
}

#[tokio::test]
async fn update_merges_without_clobbering() {
    let tasks = task_collection();
    tasks
        .create(&task("write report", "active", 2, 100), Some("t1"))
        .await
        .expect("create");

    let mut patch = BTreeMap::new();
    patch.insert("status".to_string(), FieldValue::from_string("done"));
    tasks.update("t1", patch).await.expect("update");

    let fetched = tasks.get_single("t1").await.expect("get single").unwrap();
    assert_eq!(fetched.status, "done");
    assert_eq!(fetched.title, "write report");
    assert_eq!(fetched.priority, 2);
}

#[tokio::test]
async fn update_of_missing_record_fails() {
    let tasks = task_collection();
    let mut patch = BTreeMap::new();
    patch.insert("status".to_string(), FieldValue::from_string("done"));
    let err = tasks.update("nope", patch).await.expect_err("missing doc");
    assert_eq!(err.code_str(), "docstore/not-found");
}

#[tokio::test]
async fn delete_twice_does_not_fault() {
    let tasks = task_collection();
    tasks
        .create(&task("ephemeral", "active", 1, 100), Some("t1"))
        .await
        .expect("create");

    tasks.delete("t1").await.expect("first delete");
    assert!(tasks.get_single("t1").await.expect("get single").is_none());
    tasks.delete("t1").await.expect("second delete");
}

#[tokio::test]
async fn filtered_query_orders_by_creation() {
    let tasks = task_collection();
    tasks
        .create(&task("c", "active", 1, 300), Some("c"))
        .await
        .unwrap();
    tasks
        .create(&task("a", "active", 1, 100), Some("a"))
        .await
        .unwrap();
    tasks
        .create(&task("b", "done", 1, 200), Some("b"))
        .await
        .unwrap();

    let results = tasks
        .query(
            vec![FieldFilter::equal("status", FieldValue::from_string("active")).unwrap()],
            vec![OrderBy::ascending("created_at").unwrap()],
            None,
            None,
        )
        .await
        .expect("query");

    let ids: Vec<_> = results.iter().map(|task| task.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "c"]);
}

#[tokio::test]
async fn unordered_cursor_is_a_no_op() {
    let tasks = task_collection();
    for (id, secs) in [("a", 100), ("b", 200), ("c", 300)] {
        tasks
            .create(&task(id, "active", 1, secs), Some(id))
            .await
            .unwrap();
    }

    let without_cursor = tasks
        .query(Vec::new(), Vec::new(), None, None)
        .await
        .expect("plain query");
    let with_cursor = tasks
        .query(
            Vec::new(),
            Vec::new(),
            None,
            Some(Cursor::StartAfter(vec![FieldValue::from_timestamp(
                Timestamp::new(100, 0),
            )])),
        )
        .await
        .expect("cursor query");

    assert_eq!(without_cursor, with_cursor);
    assert_eq!(with_cursor.len(), 3);
}

#[tokio::test]
async fn ordered_cursor_pages_past_boundary() {
    let tasks = task_collection();
    for (id, priority) in [("a", 1), ("b", 2), ("c", 3)] {
        tasks
            .create(&task(id, "active", priority, 100), Some(id))
            .await
            .unwrap();
    }

    let results = tasks
        .query(
            Vec::new(),
            vec![OrderBy::ascending("priority").unwrap()],
            Some(1),
            Some(Cursor::StartAfter(vec![FieldValue::from_integer(1)])),
        )
        .await
        .expect("query");

    let ids: Vec<_> = results.iter().map(|task| task.id.as_str()).collect();
    assert_eq!(ids, vec!["b"]);
}

#[tokio::test]
async fn list_all_returns_identifier_order() {
    let tasks = task_collection();
    for id in ["beta", "alpha", "gamma"] {
        tasks
            .create(&task(id, "active", 1, 100), Some(id))
            .await
            .unwrap();
    }

    let results = tasks.list_all().await.expect("list all");
    let ids: Vec<_> = results.iter().map(|task| task.id.as_str()).collect();
    assert_eq!(ids, vec!["alpha", "beta", "gamma"]);
}

#[tokio::test]
async fn date_range_is_inclusive_and_ascending() {
    let tasks = task_collection();
    for (id, secs) in [("a", 100), ("b", 200), ("c", 300), ("d", 400)] {
        tasks
            .create(&task(id, "active", 1, secs), Some(id))
            .await
            .unwrap();
    }

    let results = tasks
        .list_by_date_range(
            "created_at",
            Timestamp::new(200, 0),
            Timestamp::new(300, 0),
            Vec::new(),
        )
        .await
        .expect("date range");

    let ids: Vec<_> = results.iter().map(|task| task.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "c"]);
}

#[tokio::test]
async fn date_range_applies_extra_filters() {
    let tasks = task_collection();
    tasks
        .create(&task("a", "active", 1, 100), Some("a"))
        .await
        .unwrap();
    tasks
        .create(&task("b", "done", 1, 200), Some("b"))
        .await
        .unwrap();
    tasks
        .create(&task("c", "active", 1, 300), Some("c"))
        .await
        .unwrap();

    let results = tasks
        .list_by_date_range(
            "created_at",
            Timestamp::new(0, 0),
            Timestamp::new(400, 0),
            vec![FieldFilter::equal("status", FieldValue::from_string("active")).unwrap()],
        )
        .await
        .expect("date range");

    let ids: Vec<_> = results.iter().map(|task| task.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "c"]);
}
