/*!
The contract every storable value satisfies.
*/

use serde::{de::DeserializeOwned, Serialize};

/// A value that can be stored in a [`RecordStore`](crate::RecordStore).
///
/// Records are encoded with serde_json and grouped into collections by
/// [`collection_name`](Record::collection_name). Two records are the same
/// stored entity iff their collection and [`identifier`](Record::identifier)
/// match; persisting a second record with the same identifier replaces the
/// first.
///
/// # Example
/// ```rust
/// use serde::{Deserialize, Serialize};
/// use shelf_core::Record;
///
/// #[derive(Serialize, Deserialize)]
/// struct User {
///     id: String,
///     first_name: String,
/// }
///
/// impl Record for User {
///     fn identifier(&self) -> String {
///         self.id.clone()
///     }
/// }
///
/// assert_eq!(User::collection_name(), "User");
/// ```
pub trait Record: Serialize + DeserializeOwned {
    /// Stable identifier of this record within its collection.
    ///
    /// Must not be empty or start with `.`, and must not contain `/`, `\` or control characters.
    fn identifier(&self) -> String;

    /// Name of the collection this type is stored under.
    ///
    /// Defaults to the bare type name (module path and generic arguments
    /// stripped). Paths lower-case it, so `User` and `user` share a collection.
    /// Overrides must obey the identifier rules; the store rejects any other
    /// name with `StoreError::InvalidIdentifier`.
    fn collection_name() -> String
    where
        Self: Sized,
    {
        bare_type_name(std::any::type_name::<Self>()).to_string()
    }
}

/// Strip the module path and generic arguments from a `type_name` string.
pub(crate) fn bare_type_name(full: &str) -> &str {
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
}
