use super::*;

fn todo_json(mentions: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "_id": "t1",
        "title": "Ship release",
        "description": "cut the tag",
        "priority": "high",
        "tags": ["release"],
        "mentions": mentions,
        "completed": false,
        "createdAt": "2024-03-01T10:00:00Z",
        "updatedAt": "2024-03-02T10:00:00Z",
        "notes": [{
            "content": "waiting on CI",
            "createdBy": { "_id": "u1", "username": "alice", "name": "Alice" },
            "createdAt": "2024-03-01T11:00:00Z"
        }]
    })
}

#[test]
fn populated_mentions_keep_display_fields() {
    let todo: Todo = serde_json::from_value(todo_json(serde_json::json!([
        { "_id": "u2", "username": "bob", "name": "Bob Builder" }
    ])))
    .expect("todo");

    assert_eq!(todo.id, TodoId::from("t1"));
    assert_eq!(todo.priority, Priority::High);
    assert_eq!(
        todo.mentions,
        vec![UserRef {
            id: UserId::from("u2"),
            username: "bob".into(),
            name: "Bob Builder".into(),
        }]
    );
    assert!(!todo.mentions[0].is_bare());
    assert_eq!(
        todo.notes[0].created_by.as_ref().map(|u| u.name.as_str()),
        Some("Alice")
    );
}

#[test]
fn bare_mention_ids_normalize_to_records() {
    let todo: Todo =
        serde_json::from_value(todo_json(serde_json::json!(["u3"]))).expect("todo");

    let mention = &todo.mentions[0];
    assert_eq!(mention.id, UserId::from("u3"));
    assert_eq!(mention.username, "u3");
    assert!(mention.is_bare());
}

#[test]
fn record_without_name_falls_back_to_username() {
    let mention: UserRef =
        serde_json::from_value(serde_json::json!({ "id": "u4", "username": "dana" }))
            .expect("mention");
    assert_eq!(mention.name, "dana");
}

#[test]
fn user_matches_by_id_or_username() {
    let user = User {
        id: UserId::from("u4"),
        username: "dana".into(),
        name: "Dana".into(),
    };
    assert!(user.matches("dana"));
    assert!(user.matches("u4"));
    assert!(!user.matches("Dana"));
}

#[test]
fn mentions_serialize_in_the_single_record_shape() {
    let value = serde_json::to_value(UserRef::bare("u5")).expect("serialize");
    assert_eq!(
        value,
        serde_json::json!({ "id": "u5", "username": "u5", "name": "u5" })
    );
}

#[test]
fn priority_parses_case_insensitively() {
    assert_eq!("HIGH".parse::<Priority>(), Ok(Priority::High));
    assert_eq!(" medium ".parse::<Priority>(), Ok(Priority::Medium));
    let err = "urgent".parse::<Priority>().expect_err("unknown");
    assert_eq!(err, UnknownPriority("urgent".into()));
    assert_eq!(
        err.to_string(),
        "unknown priority 'urgent' (expected low, medium or high)"
    );
    assert_eq!(Priority::default(), Priority::Low);
}

#[test]
fn completion_rate_rounds_and_handles_empty_sets() {
    let empty = StatsSnapshot::default();
    assert_eq!(empty.completion_rate(), 0);

    let stats = StatsSnapshot {
        total_todos: 9,
        completed_todos: 3,
        pending_todos: 6,
        high_priority: 5,
        medium_priority: 4,
        low_priority: 0,
    };
    assert_eq!(stats.completion_rate(), 33);

    let stats = StatsSnapshot {
        total_todos: 3,
        completed_todos: 2,
        ..StatsSnapshot::default()
    };
    assert_eq!(stats.completion_rate(), 67);
}

#[test]
fn stats_read_camel_case_fields() {
    let stats: StatsSnapshot = serde_json::from_value(serde_json::json!({
        "totalTodos": 4,
        "completedTodos": 1,
        "pendingTodos": 3,
        "highPriority": 2,
        "mediumPriority": 1,
        "lowPriority": 1
    }))
    .expect("stats");
    assert_eq!(stats.pending_todos, 3);
    assert_eq!(stats.low_priority, 1);
}
