//! # Storage Module
//!
//! File-backed stores for saved characters and terrain maps, and the sprite
//! manifest scan.
//!
//! Every name that reaches the file system goes through [`sanitize_file_stem`]
//! first, so a client-chosen name can never leave its directory.

pub mod characters;
pub mod sprites;
pub mod terrain;

pub use characters::*;
pub use sprites::*;
pub use terrain::*;

/// Keeps only ASCII letters, digits, `_` and `-`.
///
/// # Examples
///
/// ```
/// use tactica::sanitize_file_stem;
///
/// assert_eq!(sanitize_file_stem("../Aria the Bold!"), "AriatheBold");
/// assert_eq!(sanitize_file_stem("cave_level-2"), "cave_level-2");
/// ```
pub fn sanitize_file_stem(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}
