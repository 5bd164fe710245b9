use super::*;

fn temp_path() -> PathBuf {
    std::env::temp_dir()
        .join(format!("vaidya-cli-{}", uuid::Uuid::new_v4()))
        .join("tokens.json")
}

#[test]
fn memory_store_round_trip() {
    let store = MemoryTokenStore::new();
    assert_eq!(store.get(ACCESS_TOKEN_KEY), None);
    store.set(ACCESS_TOKEN_KEY, "a").unwrap();
    store.set(ACCESS_TOKEN_KEY, "b").unwrap();
    assert_eq!(store.get(ACCESS_TOKEN_KEY).as_deref(), Some("b"));
    store.remove(ACCESS_TOKEN_KEY).unwrap();
    assert_eq!(store.get(ACCESS_TOKEN_KEY), None);
}

#[test]
fn clear_auth_keeps_chat_history() {
    let store = MemoryTokenStore::new();
    for key in AUTH_KEYS {
        store.set(key, "x").unwrap();
    }
    store.set(CHAT_HISTORY_KEY, "[]").unwrap();

    store.clear_auth().unwrap();

    for key in AUTH_KEYS {
        assert_eq!(store.get(key), None, "{key}");
    }
    assert_eq!(store.get(CHAT_HISTORY_KEY).as_deref(), Some("[]"));
}

#[test]
fn file_store_persists_across_instances() {
    let path = temp_path();
    let first = FileTokenStore::new(&path);
    assert_eq!(first.get(REFRESH_TOKEN_KEY), None);
    first.set(REFRESH_TOKEN_KEY, "r1").unwrap();

    let second = FileTokenStore::new(&path);
    assert_eq!(second.get(REFRESH_TOKEN_KEY).as_deref(), Some("r1"));
    second.set(ACCESS_TOKEN_KEY, "a1").unwrap();
    assert_eq!(first.get(ACCESS_TOKEN_KEY).as_deref(), Some("a1"));

    second.clear_auth().unwrap();
    assert_eq!(first.get(REFRESH_TOKEN_KEY), None);
    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn corrupt_file_reads_as_empty_and_is_overwritten() {
    let path = temp_path();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, b"{not json").unwrap();

    let store = FileTokenStore::new(&path);
    assert_eq!(store.get(ACCESS_TOKEN_KEY), None);
    store.set(ACCESS_TOKEN_KEY, "fresh").unwrap();
    assert_eq!(store.get(ACCESS_TOKEN_KEY).as_deref(), Some("fresh"));
    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn default_path_lives_under_dot_vaidya() {
    let path = FileTokenStore::default_path();
    assert!(path.ends_with(".vaidya/tokens.json"));
}
