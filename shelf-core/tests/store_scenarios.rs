/*!
End-to-end tests of the record store on the local filesystem.
*/

use serde::{Deserialize, Serialize};
use shelf_core::{
    create_store_from_config, ensure_epoch, FileVersionSlot, LocalFileStorage, Record,
    RecordStore, StoreConfig, StoreError,
};
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    id: String,
    first_name: String,
    last_name: String,
}

impl Record for User {
    fn identifier(&self) -> String {
        self.id.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct News {
    id: String,
    title: String,
    content: String,
    is_read: bool,
}

impl Record for News {
    fn identifier(&self) -> String {
        self.id.clone()
    }
}

fn user(id: &str, first_name: &str, last_name: &str) -> User {
    User {
        id: id.to_string(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
    }
}

fn news(id: &str, is_read: bool) -> News {
    News {
        id: id.to_string(),
        title: format!("Headline {id}"),
        content: "...".to_string(),
        is_read,
    }
}

fn local_store(temp_dir: &TempDir) -> RecordStore<LocalFileStorage> {
    RecordStore::new(LocalFileStorage::with_base_dir(temp_dir.path()), "example-app").unwrap()
}

#[test]
fn test_user_lifecycle() {
    let temp_dir = TempDir::new().unwrap();
    let store = local_store(&temp_dir);

    let mario = user("1", "Mario", "Zimmermann");
    let jan = user("2", "Jan", "Jansen");
    store.persist(&mario).unwrap();
    store.persist(&jan).unwrap();

    assert!(temp_dir.path().join("example-app/user/1.json").is_file());
    assert_eq!(store.get_all::<User>().unwrap(), vec![mario.clone(), jan.clone()]);
    assert!(store.exists_id::<User>("1"));

    store.delete_id::<User>("1").unwrap();

    let err = store.get::<User>("1").unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
    assert_eq!(store.get_all::<User>().unwrap(), vec![jan]);
}

#[test]
fn test_insertion_order_survives_overwrites() {
    let temp_dir = TempDir::new().unwrap();
    let store = local_store(&temp_dir);

    for id in ["c", "a", "b"] {
        store.persist(&news(id, false)).unwrap();
    }
    store.update(&news("c", true)).unwrap();

    let all = store.get_all::<News>().unwrap();
    let ids: Vec<_> = all.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, ["c", "a", "b"]);
    assert!(all[0].is_read);
}

#[test]
fn test_store_reopened_on_same_directory() {
    let temp_dir = TempDir::new().unwrap();
    local_store(&temp_dir).persist(&news("1", false)).unwrap();

    let reopened = local_store(&temp_dir);
    assert_eq!(reopened.get::<News>("1").unwrap(), news("1", false));
}

#[test]
fn test_filter_unread_news() {
    let temp_dir = TempDir::new().unwrap();
    let store = local_store(&temp_dir);

    store.persist(&news("1", false)).unwrap();
    store.persist(&news("2", true)).unwrap();
    store.persist(&news("3", false)).unwrap();

    let unread = store.filter::<News, _>(|n| !n.is_read).unwrap();
    assert_eq!(unread, vec![news("1", false), news("3", false)]);

    let none = store.filter::<News, _>(|n| n.title.is_empty()).unwrap();
    assert!(none.is_empty());
}

#[test]
fn test_empty_type_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let store = local_store(&temp_dir);

    assert!(store.get::<User>("1").unwrap_err().is_not_found());
    assert!(store.get_all::<User>().unwrap_err().is_not_found());
    assert!(!store.exists_collection::<User>());
}

#[test]
fn test_deleting_every_record_empties_collection() {
    let temp_dir = TempDir::new().unwrap();
    let store = local_store(&temp_dir);

    store.persist(&news("1", false)).unwrap();
    store.delete(&news("1", false)).unwrap();

    assert!(!store.exists_collection::<News>());
    assert!(store.get_all::<News>().unwrap_err().is_not_found());
}

#[test]
fn test_same_identifier_in_two_collections() {
    let temp_dir = TempDir::new().unwrap();
    let store = local_store(&temp_dir);

    store.persist(&user("7", "Mario", "Zimmermann")).unwrap();
    store.persist(&news("7", false)).unwrap();

    store.delete_id::<News>("7").unwrap();

    assert!(store.exists_id::<User>("7"));
    assert!(!store.exists_id::<News>("7"));
}

#[test]
fn test_clear_then_nothing_exists() {
    let temp_dir = TempDir::new().unwrap();
    let store = local_store(&temp_dir);
    let neighbour =
        RecordStore::new(LocalFileStorage::with_base_dir(temp_dir.path()), "other-app").unwrap();

    store.persist(&user("1", "Mario", "Zimmermann")).unwrap();
    store.persist(&news("1", false)).unwrap();
    neighbour.persist(&news("1", false)).unwrap();

    store.clear().unwrap();

    assert!(!store.exists_collection::<User>());
    assert!(!store.exists_collection::<News>());
    assert!(neighbour.exists_collection::<News>());
}

#[test]
fn test_bad_root_never_clears_the_base_directory() {
    let temp_dir = TempDir::new().unwrap();
    let neighbour =
        RecordStore::new(LocalFileStorage::with_base_dir(temp_dir.path()), "other-app").unwrap();
    neighbour.persist(&news("1", false)).unwrap();

    for root in ["", ".", "..", "/tmp", "other-app/.."] {
        let result = RecordStore::new(LocalFileStorage::with_base_dir(temp_dir.path()), root);
        assert!(matches!(result, Err(StoreError::Validation(_))), "{root:?} accepted");

        let config = StoreConfig::local_with_base(temp_dir.path()).with_root(root);
        assert!(create_store_from_config(config).is_err(), "{root:?} accepted by config");
    }

    assert!(temp_dir.path().is_dir());
    assert!(neighbour.exists_id::<News>("1"));
}

#[test]
fn test_failed_first_persist_leaves_type_empty() {
    let temp_dir = TempDir::new().unwrap();
    let store = local_store(&temp_dir);

    let err = store.persist(&user(&"x".repeat(300), "Long", "Name")).unwrap_err();
    assert!(matches!(err, StoreError::CannotPersist { .. }));

    assert!(!store.exists_collection::<User>());
    assert!(store.get_all::<User>().unwrap_err().is_not_found());
}

#[test]
fn test_collection_of_foreign_files_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let store = local_store(&temp_dir);
    let collection = temp_dir.path().join("example-app/user");
    std::fs::create_dir_all(&collection).unwrap();
    std::fs::write(collection.join("notes.txt"), "scratch").unwrap();

    assert!(store.get_all::<User>().unwrap_err().is_not_found());
}

#[test]
fn test_traversal_identifier_never_leaves_root() {
    let temp_dir = TempDir::new().unwrap();
    let store = local_store(&temp_dir);

    let err = store.persist(&user("../../escaped", "Eve", "X")).unwrap_err();
    assert!(matches!(err, StoreError::InvalidIdentifier(_)));
    assert!(!temp_dir.path().join("escaped.json").exists());
    assert!(!temp_dir.path().join("example-app").exists());
}

#[test]
fn test_epoch_flush_across_restarts() {
    let temp_dir = TempDir::new().unwrap();
    let slot = FileVersionSlot::new(temp_dir.path().join("example-app.version"));

    // first start on version 1
    let store = local_store(&temp_dir);
    assert!(ensure_epoch(&store, &slot, 1).unwrap());
    store.persist(&news("1", false)).unwrap();

    // restart, same version
    let store = local_store(&temp_dir);
    assert!(!ensure_epoch(&store, &slot, 1).unwrap());
    assert!(store.exists_id::<News>("1"));

    // restart after a version bump
    let store = local_store(&temp_dir);
    assert!(ensure_epoch(&store, &slot, 2).unwrap());
    assert!(!store.exists_collection::<News>());
    assert!(slot.path().is_file());
}

#[test]
fn test_store_from_uri() {
    let temp_dir = TempDir::new().unwrap();
    let uri = format!("file://{}", temp_dir.path().display());
    let config = StoreConfig::from_uri(&uri).unwrap().with_root("configured");

    let store = create_store_from_config(config).unwrap();
    store.persist(&news("1", false)).unwrap();

    assert!(temp_dir.path().join("configured/news/1.json").is_file());
    assert_eq!(store.collections().unwrap(), ["news"]);
}
