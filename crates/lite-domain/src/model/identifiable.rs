//! Identifiable - The capability every storable entity must have
//!
//! Identity is assigned by the caller before the entity reaches a
//! repository. Repositories never generate ids.

use core::fmt::Display;

/// An entity with a stable, caller-assigned identifier.
///
/// The id's `Display` rendering is its *textual projection*: the JSON file
/// backend uses it as the file stem, the document backend stores and matches
/// it in the configured id field. Two ids that render the same are the same
/// storage key, so the rendering must be deterministic.
///
/// ```
/// use lite_domain::Identifiable;
///
/// struct User {
///     id: u64,
///     name: String,
/// }
///
/// impl Identifiable for User {
///     type Id = u64;
///
///     fn id(&self) -> &u64 {
///         &self.id
///     }
///
///     fn set_id(&mut self, id: u64) {
///         self.id = id;
///     }
/// }
///
/// let user = User { id: 42, name: "Ada".into() };
/// assert_eq!(user.id_text(), "42");
/// ```
pub trait Identifiable {
    /// The identifier type
    type Id: Clone + Display + Send + Sync + 'static;

    /// Get the entity's id
    fn id(&self) -> &Self::Id;

    /// Replace the entity's id
    fn set_id(&mut self, id: Self::Id);

    /// Canonical text form of the id, used as the storage key
    fn id_text(&self) -> String {
        self.id().to_string()
    }
}
