//! Static reference data for the rule matcher: currency conversion rates
//! and Nigerian location abbreviation/synonym/region tables. Updates to
//! these tables are deployment events, not runtime-configurable.

use crate::types::Currency;

/// Conversion rate FROM the given currency TO USD. A snapshot, not a live
/// feed — updates to these rates are deployment events, not runtime config.
fn rate_to_usd(c: Currency) -> f64 {
    match c {
        Currency::Usd => 1.0,
        Currency::Ngn => 1.0 / 1_550.0,
        Currency::Eur => 1.08,
        Currency::Gbp => 1.27,
    }
}

/// Converts an amount from one currency to another via USD as the pivot.
/// Returns `None` only if either currency is unrecognized, which cannot
/// happen for the closed `Currency` enum — kept `Option` to mirror the
/// shape callers use for a genuinely missing-rate case upstream.
pub fn convert(amount: f64, from: Currency, to: Currency) -> Option<f64> {
    let usd = amount * rate_to_usd(from);
    Some(usd / rate_to_usd(to))
}

/// `(abbreviation, canonical)` pairs, matched case-insensitively in both
/// directions.
pub const LOCATION_ABBREVIATIONS: &[(&str, &str)] = &[
    ("los", "lagos"),
    ("fct", "abuja"),
    ("ph", "port harcourt"),
    ("pha", "port harcourt"),
    ("ib", "ibadan"),
    ("kd", "kaduna"),
    ("enu", "enugu"),
];

/// Country-name synonym pairs (informal/short form ↔ canonical).
pub const COUNTRY_SYNONYMS: &[(&str, &str)] = &[
    ("nig", "nigeria"),
    ("ng", "nigeria"),
    ("uk", "united kingdom"),
    ("gb", "united kingdom"),
    ("us", "united states"),
    ("usa", "united states"),
];

/// Same-region clusters of Nigerian cities. Two locations match at the
/// "region" tier iff they both appear in the same cluster. This is the
/// weakest matching tier, applied only as a last resort.
pub const NIGERIAN_REGION_CLUSTERS: &[&[&str]] = &[
    &["lagos", "ikeja", "lekki", "ikorodu", "epe", "badagry"],
    &["abuja", "garki", "wuse", "maitama", "gwarinpa"],
    &["port harcourt", "obio-akpor", "eleme"],
    &["ibadan", "ogbomoso", "iwo"],
    &["kano", "kaduna", "zaria"],
    &["enugu", "nsukka", "awka"],
];

/// Normalizes a free-text location fragment for comparison: lowercase,
/// trimmed, internal whitespace collapsed.
pub fn normalize_location(s: &str) -> String {
    s.trim()
        .to_ascii_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn expand_synonyms(needle: &str) -> Vec<String> {
    let mut out = vec![needle.to_string()];
    for (abbr, canon) in LOCATION_ABBREVIATIONS {
        if needle == *abbr {
            out.push(canon.to_string());
        } else if needle == *canon {
            out.push(abbr.to_string());
        }
    }
    for (syn, canon) in COUNTRY_SYNONYMS {
        if needle == *syn {
            out.push(canon.to_string());
        } else if needle == *canon {
            out.push(syn.to_string());
        }
    }
    out
}

fn region_cluster_of(loc: &str) -> Option<&'static [&'static str]> {
    NIGERIAN_REGION_CLUSTERS
        .iter()
        .find(|cluster| cluster.iter().any(|city| *city == loc))
        .copied()
}

/// Tier at which two (already-normalized) location strings matched, used
/// for reason-string generation. Ordered strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LocationMatchTier {
    Substring,
    Abbreviation,
    Region,
}

/// Compares a user-preferred location against a job's normalized location
/// fields (already lowercased) and returns the strongest tier at which
/// they match, or `None`.
pub fn match_location(preferred: &str, job_location_fields: &[&str]) -> Option<LocationMatchTier> {
    let preferred = normalize_location(preferred);

    for field in job_location_fields {
        let field = normalize_location(field);
        if field.is_empty() {
            continue;
        }
        if field.contains(&preferred) || preferred.contains(&field) {
            return Some(LocationMatchTier::Substring);
        }
    }

    let expansions = expand_synonyms(&preferred);
    for field in job_location_fields {
        let field = normalize_location(field);
        if expansions.iter().any(|e| e == &field) {
            return Some(LocationMatchTier::Abbreviation);
        }
    }

    if let Some(cluster) = region_cluster_of(&preferred) {
        for field in job_location_fields {
            let field = normalize_location(field);
            if cluster.iter().any(|city| *city == field) {
                return Some(LocationMatchTier::Region);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substring_tier_matches_before_abbreviation_tier() {
        assert_eq!(
            match_location("lagos", &["Lagos, Nigeria"]),
            Some(LocationMatchTier::Substring)
        );
    }

    #[test]
    fn abbreviation_matches_both_directions() {
        // Abbreviation expansion is an exact match against the normalized
        // field, not a substring search.
        assert_eq!(
            match_location("LOS", &["Lagos"]),
            Some(LocationMatchTier::Abbreviation)
        );
        assert_eq!(
            match_location("lagos", &["LOS"]),
            Some(LocationMatchTier::Abbreviation)
        );
    }

    #[test]
    fn region_cluster_matches_as_last_resort() {
        assert_eq!(
            match_location("ikeja", &["Lagos"]),
            Some(LocationMatchTier::Region)
        );
    }

    #[test]
    fn no_match_returns_none() {
        assert_eq!(match_location("kano", &["Lagos"]), None);
    }

    #[test]
    fn currency_conversion_round_trip_is_approximately_identity() {
        let usd = 100.0;
        let ngn = convert(usd, Currency::Usd, Currency::Ngn).unwrap();
        let back = convert(ngn, Currency::Ngn, Currency::Usd).unwrap();
        assert!((back - usd).abs() < 1e-6);
    }
}
