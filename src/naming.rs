//! Mapping of addressing strings to valid downstream resource names.
//!
//! Logical address names are arbitrary strings; the resources created for
//! them downstream only accept lowercase alphanumerics and hyphens, with
//! 63 characters per dot-separated label. Sanitizing alone would let
//! distinct addresses collide (`foo@bar` and `foo~bar` both sanitize to
//! `foo-bar`), so a short digest of the original string is appended as a
//! second label to keep the mapping collision-free.

use sha2::{Digest, Sha256};

/// Maximum length of a single name label.
const MAX_LABEL_LEN: usize = 63;

/// Number of digest characters kept for the disambiguator label.
const DISAMBIGUATOR_LEN: usize = 10;

/// Maps an arbitrary addressing string to a valid resource name.
///
/// The result is `<sanitized-base>.<digest>` where the base is the input
/// lowercased with every disallowed character replaced by a hyphen
/// (trimmed so it never starts or ends with one, and truncated to 63
/// characters), and the digest is computed over the original, unsanitized
/// input. Two distinct inputs whose bases coincide after truncation are
/// still told apart by the digest label. Total and deterministic; never
/// fails.
#[must_use]
pub fn resource_name(raw: &str) -> String {
    let base = sanitize(raw);
    let digest = disambiguator(raw);

    if base.is_empty() {
        // Nothing of the input survived sanitization; the digest alone is
        // still a valid, deterministic name.
        return digest;
    }

    format!("{base}.{digest}")
}

/// Lowercases the input, substitutes disallowed characters with hyphens,
/// trims boundary hyphens and truncates to the label limit.
fn sanitize(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let substituted: String = lowered
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();

    let trimmed = substituted.trim_matches('-');
    let truncated = if trimmed.len() > MAX_LABEL_LEN {
        &trimmed[..MAX_LABEL_LEN]
    } else {
        trimmed
    };

    // Truncation may have cut mid-run of hyphens.
    truncated.trim_end_matches('-').to_string()
}

/// Computes the short digest label from the original input.
fn disambiguator(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    let mut encoded = hex::encode(hasher.finalize());
    encoded.truncate(DISAMBIGUATOR_LEN);
    encoded
}
