use lazy_static::lazy_static;
use regex::Regex;
use tracing::warn;

use crate::config::{MAX_TEXT_LENGTH, MAX_TOKEN_LENGTH};
use crate::types::{CandidateListing, Observation};

lazy_static! {
    /// Tokens are opaque alphanumeric identifiers, 1..=MAX_TOKEN_LENGTH chars.
    static ref TOKEN_RE: Regex =
        Regex::new(&format!("^[A-Za-z0-9]{{1,{MAX_TOKEN_LENGTH}}}$")).unwrap();
    static ref HTML_TAG_RE: Regex = Regex::new(r"<[^>]*>").unwrap();
}

/// Strips markup tags and truncates to the free-text limit.
pub fn sanitize_text(value: &str) -> String {
    let stripped = HTML_TAG_RE.replace_all(value, "");
    if stripped.chars().count() > MAX_TEXT_LENGTH {
        stripped.chars().take(MAX_TEXT_LENGTH).collect()
    } else {
        stripped.into_owned()
    }
}

fn coerce_price(price: Option<f64>) -> Option<f64> {
    price.filter(|p| p.is_finite() && *p > 0.0)
}

/// Validates and normalizes one candidate. Returns None (and logs the drop)
/// when the token, category, or ad type is unusable. An invalid price is
/// coerced to None, not grounds for rejection.
pub fn sanitize_candidate(candidate: CandidateListing) -> Option<Observation> {
    if !TOKEN_RE.is_match(&candidate.token) {
        warn!(token = %candidate.token, "dropping listing with invalid token");
        return None;
    }

    let category = match candidate.category.parse() {
        Ok(c) => c,
        Err(e) => {
            warn!(token = %candidate.token, "dropping listing: {e}");
            return None;
        }
    };

    let ad_type = match candidate.ad_type.parse() {
        Ok(a) => a,
        Err(e) => {
            warn!(token = %candidate.token, "dropping listing: {e}");
            return None;
        }
    };

    Some(Observation {
        token: candidate.token,
        category,
        subcategory: sanitize_text(&candidate.subcategory),
        ad_type,
        page_type: candidate.page_type,
        price: coerce_price(candidate.price),
        title: sanitize_text(&candidate.title),
        address: sanitize_text(&candidate.address),
        image_url: sanitize_text(&candidate.image_url),
        category_fields: candidate.category_fields,
        detail_fields: candidate.detail_fields,
        raw_data: candidate.raw_data,
    })
}

/// Validates a whole batch, silently dropping rejected candidates.
pub fn sanitize_batch(candidates: Vec<CandidateListing>) -> Vec<Observation> {
    candidates.into_iter().filter_map(sanitize_candidate).collect()
}
