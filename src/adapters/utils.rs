//! Validation helpers shared by configuration and the Wi-Fi adapter.

/// Every byte is in `0x20..=0x7E` (space through tilde).
///
/// Used for SSIDs and for header values such as the bearer token, where a
/// stray CR/LF would split the request.
pub(crate) fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}
