/*!
Tests for error handling and error types.
*/

#[cfg(test)]
mod tests {
    use crate::error::{StorageError, StoreError};
    use std::error::Error;
    use std::io;

    #[test]
    fn test_store_error_display() {
        let error = StoreError::validation("test validation error");
        assert_eq!(error.to_string(), "Validation error: test validation error");

        let error = StoreError::InvalidIdentifier("../x".to_string());
        assert_eq!(error.to_string(), "invalid record identifier \"../x\"");

        let error = StoreError::NotFound {
            path: "app/user/1.json".to_string(),
            source: StorageError::Missing("app/user/1.json".to_string()),
        };
        assert_eq!(
            error.to_string(),
            "no record found at app/user/1.json: nothing stored at app/user/1.json"
        );
    }

    #[test]
    fn test_storage_error_from_json_error() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let storage_error = StorageError::from(json_error);

        match storage_error {
            StorageError::Json(_) => {} // Expected
            _ => panic!("Expected Json error variant"),
        }
    }

    #[test]
    fn test_storage_error_is_missing() {
        assert!(StorageError::Missing("p".into()).is_missing());
        assert!(StorageError::io("p", io::Error::new(io::ErrorKind::NotFound, "gone")).is_missing());
        assert!(!StorageError::io("p", io::Error::new(io::ErrorKind::PermissionDenied, "no")).is_missing());
        assert!(!StorageError::backend("boom").is_missing());
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<StoreError>();
        assert_sync::<StoreError>();
        assert_send::<StorageError>();
        assert_sync::<StorageError>();
    }

    #[test]
    fn test_error_chain() {
        let root_cause = io::Error::new(io::ErrorKind::PermissionDenied, "Access denied");
        let error = StoreError::CannotPersist {
            path: "app/user/1.json".to_string(),
            source: StorageError::io("/data/app/user/1.json", root_cause),
        };

        let storage = error.source().expect("store error wraps a storage error");
        assert!(storage.to_string().contains("/data/app/user/1.json"));

        let io = storage.source().expect("storage error wraps the io error");
        assert_eq!(io.to_string(), "Access denied");
    }

    #[test]
    fn test_filter_error_keeps_original_cause() {
        let cause = StoreError::NotFound {
            path: "app/user".to_string(),
            source: StorageError::Missing("app/user".to_string()),
        };
        let error = StoreError::CannotFilter {
            type_tag: "user".to_string(),
            source: Box::new(cause),
        };

        assert!(error.to_string().starts_with("cannot filter collection 'user'"));
        let inner = error.source().unwrap();
        assert!(inner.to_string().starts_with("no record found at app/user"));
    }

    #[test]
    fn test_clear_error_display() {
        let error = StoreError::CannotClear {
            root: "app".to_string(),
            source: StorageError::backend("device busy"),
        };
        assert_eq!(
            error.to_string(),
            "cannot clear store root 'app': Storage error: device busy"
        );
    }
}
