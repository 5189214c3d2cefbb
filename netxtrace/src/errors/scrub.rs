//! Removes IP address literals from free-form error text.
//!
//! Bracketed IPv6 endpoints are replaced first, then bare IPv6 literals,
//! then IPv4 literals. An attached `:port` is replaced together with the
//! address; everything else is kept verbatim.

use once_cell::sync::Lazy;
use regex::Regex;

pub const SCRUBBED: &str = "[scrubbed]";

const HEX: &str = "[0-9A-Fa-f]{1,4}";
const IPV4: &str = r"(?:(?:25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)\.){3}(?:25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)";
const PORT: &str = r"(?::\d{1,5})?";

static BRACKETED_IPV6: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"\[[0-9A-Fa-f.]*:[0-9A-Fa-f:.]*(?:%[0-9A-Za-z._-]+)?\]{PORT}"))
        .expect("valid bracketed IPv6 pattern")
});

static IPV6: Lazy<Regex> = Lazy::new(|| {
    // Alternatives are tried in order, so forms whose `::` sits further
    // right come first.
    let alternatives = [
        format!(r"\b(?:{HEX}:){{1,4}}:{IPV4}\b"),
        format!(r"\B::(?:[fF]{{4}}(?::0{{1,4}})?:)?{IPV4}\b"),
        format!(r"\b(?:{HEX}:){{7}}{HEX}\b"),
        format!(r"\b{HEX}:(?::{HEX}){{1,6}}\b"),
        format!(r"\b(?:{HEX}:){{1,2}}(?::{HEX}){{1,5}}\b"),
        format!(r"\b(?:{HEX}:){{1,3}}(?::{HEX}){{1,4}}\b"),
        format!(r"\b(?:{HEX}:){{1,4}}(?::{HEX}){{1,3}}\b"),
        format!(r"\b(?:{HEX}:){{1,5}}(?::{HEX}){{1,2}}\b"),
        format!(r"\b(?:{HEX}:){{1,6}}:{HEX}\b"),
        format!(r"\b(?:{HEX}:){{1,7}}:\B"),
        format!(r"\B:(?::{HEX}){{1,7}}\b"),
    ];
    Regex::new(&alternatives.join("|")).expect("valid IPv6 pattern")
});

static IPV4_WITH_PORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"\b{IPV4}{PORT}\b")).expect("valid IPv4 pattern"));

/// Replaces every IPv4/IPv6 literal in `message` with [`SCRUBBED`].
pub fn scrub(message: &str) -> String {
    let out = BRACKETED_IPV6.replace_all(message, SCRUBBED);
    let out = IPV6.replace_all(&out, SCRUBBED);
    IPV4_WITH_PORT.replace_all(&out, SCRUBBED).into_owned()
}
