use uuid::Uuid;

/// Generate a random, version 4 event identifier in its lowercase
/// hyphenated form (`xxxxxxxx-xxxx-4xxx-yxxx-xxxxxxxxxxxx`).
///
/// Randomness comes from the operating system's entropy source.
pub fn generate() -> String {
    Uuid::new_v4().hyphenated().to_string()
}
