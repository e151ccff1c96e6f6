use memory_store::host::{FileHost, SimpleRuntime};
use memory_store::{forget, recall, remember, ForgetArgs, RecallArgs, RememberArgs};

fn runtime(user_name: &str) -> SimpleRuntime {
    SimpleRuntime { user_name: user_name.to_string(), chat_id: "chat-1".to_string() }
}

#[test]
fn phone_slot_is_inferred_and_recalled_by_tag() {
    let dir = tempfile::tempdir().unwrap();
    let host = FileHost::open(dir.path()).unwrap();
    let rt = runtime("andrey");

    let remembered = remember(
        RememberArgs { fact: Some("мой новый iPhone 15 Pro".into()), ..Default::default() },
        &rt,
        &host,
    )
    .unwrap();
    assert_eq!(remembered.memory.key, "phone");

    let recalled = recall(
        RecallArgs { tags: Some(vec!["device".into()]), ..Default::default() },
        &rt,
        &host,
    );
    assert_eq!(recalled.count, 1);
    assert_eq!(recalled.memories[0].fact, "мой новый iPhone 15 Pro");
}

#[test]
fn email_slot_is_inferred_and_recalled_by_key() {
    let dir = tempfile::tempdir().unwrap();
    let host = FileHost::open(dir.path()).unwrap();
    let rt = runtime("andrey");

    remember(
        RememberArgs { fact: Some("you can reach me at andrey@example.com".into()), ..Default::default() },
        &rt,
        &host,
    )
    .unwrap();

    let recalled = recall(
        RecallArgs { key: Some("email".into()), ..Default::default() },
        &rt,
        &host,
    );
    assert_eq!(recalled.count, 1);
    assert!(recalled.memories[0].fact.contains("andrey@example.com"));
}

#[test]
fn recall_matches_across_transliteration_and_user_identity() {
    let dir = tempfile::tempdir().unwrap();
    let host = FileHost::open(dir.path()).unwrap();

    remember(
        RememberArgs {
            fact: Some("мой номер +7 900 123 45 67".into()),
            key: Some("phone".into()),
            ..Default::default()
        },
        &runtime("Андрей"),
        &host,
    )
    .unwrap();

    let recalled = recall(
        RecallArgs { query: Some("phone".into()), ..Default::default() },
        &runtime("Andrei"),
        &host,
    );
    assert_eq!(recalled.count, 1, "transliterated identity should still match scope=current_user");
}

#[test]
fn scope_all_crosses_unrelated_identities() {
    let dir = tempfile::tempdir().unwrap();
    let host = FileHost::open(dir.path()).unwrap();

    remember(
        RememberArgs { fact: Some("likes green tea".into()), ..Default::default() },
        &runtime("svetlana"),
        &host,
    )
    .unwrap();

    let scoped = recall(RecallArgs::default(), &runtime("andrey"), &host);
    assert_eq!(scoped.count, 0, "different, unrelated identity should not match scope=current_user");

    let all = recall(
        RecallArgs { scope: Some("all".into()), ..Default::default() },
        &runtime("andrey"),
        &host,
    );
    assert_eq!(all.count, 1);
    assert_eq!(all.memories[0].user_name.as_deref(), Some("svetlana"));
}

#[test]
fn generic_recall_query_returns_most_recently_updated() {
    let dir = tempfile::tempdir().unwrap();
    let host = FileHost::open(dir.path()).unwrap();
    let rt = runtime("andrey");

    remember(RememberArgs { fact: Some("lives in Berlin".into()), ..Default::default() }, &rt, &host).unwrap();
    remember(RememberArgs { fact: Some("works as a chef".into()), ..Default::default() }, &rt, &host).unwrap();

    let result = recall(
        RecallArgs { query: Some("what do you remember about me".into()), ..Default::default() },
        &rt,
        &host,
    );
    assert_eq!(result.memories[0].fact, "works as a chef");
}

#[test]
fn forget_one_of_two_leaves_the_other() {
    let dir = tempfile::tempdir().unwrap();
    let host = FileHost::open(dir.path()).unwrap();
    let rt = runtime("andrey");

    remember(
        RememberArgs {
            fact: Some("first phone number".into()),
            key: Some("phone".into()),
            overwrite_key: Some(false),
            ..Default::default()
        },
        &rt,
        &host,
    )
    .unwrap();
    remember(
        RememberArgs {
            fact: Some("second phone number".into()),
            key: Some("phone".into()),
            overwrite_key: Some(false),
            ..Default::default()
        },
        &rt,
        &host,
    )
    .unwrap();

    let result = forget(ForgetArgs { key: Some("phone".into()), ..Default::default() }, &rt, &host).unwrap();
    assert_eq!(result.removed_count, 1);
    assert_eq!(result.remaining_count, 1);

    let remaining = recall(RecallArgs { key: Some("phone".into()), ..Default::default() }, &rt, &host);
    assert_eq!(remaining.count, 1);
}

#[test]
fn sqlite_unavailable_still_round_trips_through_json_mirror() {
    use memory_store::host::{Host, StorageHost};
    use std::sync::Mutex;

    struct JsonOnlyHost {
        settings: Mutex<serde_json::Value>,
    }
    impl StorageHost for JsonOnlyHost {
        fn get_setting_json(&self, key: &str, default: serde_json::Value) -> serde_json::Value {
            self.settings.lock().unwrap().get(key).cloned().unwrap_or(default)
        }
        fn set_setting_json(&self, key: &str, value: serde_json::Value) {
            let mut settings = self.settings.lock().unwrap();
            if let serde_json::Value::Object(map) = &mut *settings {
                map.insert(key.to_string(), value);
            }
        }
        fn get_setting_flag(&self, key: &str, default: bool) -> bool {
            self.get_setting_json(key, serde_json::Value::Bool(default)).as_bool().unwrap_or(default)
        }
        fn set_setting_flag(&self, key: &str, value: bool) {
            self.set_setting_json(key, serde_json::Value::Bool(value));
        }
        fn sqlite(&self) -> Option<&Mutex<rusqlite::Connection>> {
            None
        }
    }
    impl Host for JsonOnlyHost {
        fn storage(&self) -> &dyn StorageHost {
            self
        }
        fn create_request_id(&self) -> String {
            "req-json-only".to_string()
        }
    }

    let host = JsonOnlyHost { settings: Mutex::new(serde_json::json!({})) };
    let rt = runtime("andrey");

    remember(RememberArgs { fact: Some("json mirror only fact".into()), ..Default::default() }, &rt, &host).unwrap();
    let recalled = recall(RecallArgs::default(), &rt, &host);
    assert_eq!(recalled.count, 1);
    assert_eq!(recalled.memories[0].fact, "json mirror only fact");
}
