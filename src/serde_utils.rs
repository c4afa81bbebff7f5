/// Serde utility functions for common patterns
use serde::{Deserialize, Deserializer};

/// Deserialize a nullable column into `T`, mapping `null` to `T::default()`.
///
/// `#[serde(default)]` alone only covers a missing field.
///
/// Usage:
/// ```ignore
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Example {
///     #[serde(default, deserialize_with = "crate::serde_utils::null_as_default")]
///     description: String,
/// }
/// ```
pub fn null_as_default<'de, T, D>(de: D) -> Result<T, D::Error>
where
    T: Deserialize<'de> + Default,
    D: Deserializer<'de>,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}
