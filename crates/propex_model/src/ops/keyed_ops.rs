//! Operations over keyed containers with textual keys.

use crate::spec::{TypeIdent, TypeSpec};
use crate::value::Accessible;

// -----------------------------------------------------------------------------
// Keyed trait

/// A trait for type-erased operations on keyed containers.
///
/// Implemented for `HashMap<String, V>` and `BTreeMap<String, V>`.
/// Keys are textual at this boundary because the path grammar is
/// textual; numeric-looking bracket keys reach a keyed container as
/// their digit text.
///
/// Absent keys are tolerated by design: a read of a missing key is
/// "null", never an error, and a write of a missing key creates the
/// entry.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use propex_model::ops::Keyed;
///
/// let mut map = HashMap::new();
/// map.insert("one".to_string(), 1_i32);
///
/// let keyed: &dyn Keyed = &map;
/// assert_eq!(keyed.get("one").unwrap().downcast_ref::<i32>(), Some(&1));
/// assert!(keyed.get("two").is_none());
/// ```
pub trait Keyed: Accessible {
    /// Returns the number of entries.
    fn len(&self) -> usize;

    /// Returns `true` if the container holds no entries.
    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a reference to the value under `key`.
    fn get(&self, key: &str) -> Option<&dyn Accessible>;

    /// Returns a mutable reference to the value under `key`.
    fn get_mut(&mut self, key: &str) -> Option<&mut dyn Accessible>;

    /// Inserts a value under `key`, creating or replacing the entry.
    ///
    /// Returns the previous value if the key existed. The value is
    /// handed back unchanged when its type does not match the declared
    /// value type.
    fn insert(
        &mut self,
        key: &str,
        value: Box<dyn Accessible>,
    ) -> Result<Option<Box<dyn Accessible>>, Box<dyn Accessible>>;

    /// Returns the keys in iteration order.
    fn keys(&self) -> Vec<String>;

    /// Returns the declared key identity.
    fn key_ident(&self) -> TypeIdent;

    /// Returns the declared value spec.
    fn value_spec(&self) -> TypeSpec;
}
