//! Lexical relevance scoring.
//!
//! Pure functions of (query, restaurant fields) — no index, no I/O. Each
//! query token is checked against restaurant fields in priority order
//! (name > cuisine tags > description > everything else) with simple
//! plural/singular variants, summed, scaled, and clamped to [0, 100].

use crate::models::{Restaurant, Review};

/// Empirically tuned multiplier from raw field points to the 0-100 scale.
const SCALE: f32 = 3.5;

const NAME_POINTS: f32 = 10.0;
const CUISINE_POINTS: f32 = 8.0;
const DESCRIPTION_POINTS: f32 = 5.0;
const OTHER_POINTS: f32 = 2.0;

/// How many review texts participate in the searchable text.
const MAX_SEARCHABLE_REVIEWS: usize = 10;

/// Score a restaurant against a query.
///
/// Each token earns points for the highest-priority field any of its
/// morphological variants appears in; a token is never counted twice.
pub fn keyword_score(query: &str, restaurant: &Restaurant, reviews: &[Review]) -> f32 {
    let name = restaurant.name.to_lowercase();
    let cuisines: Vec<String> = restaurant.cuisines.iter().map(|c| c.to_lowercase()).collect();
    let description = restaurant.description.to_lowercase();
    let other = other_fields_text(restaurant, reviews);

    let mut points = 0.0f32;
    for token in tokenize(query) {
        'token: for variant in variants(&token) {
            if name.contains(&variant) {
                points += NAME_POINTS;
                break 'token;
            }
            if cuisines.iter().any(|c| c.contains(&variant)) {
                points += CUISINE_POINTS;
                break 'token;
            }
            if description.contains(&variant) {
                points += DESCRIPTION_POINTS;
                break 'token;
            }
            if other.contains(&variant) {
                points += OTHER_POINTS;
                break 'token;
            }
        }
    }

    (points * SCALE).clamp(0.0, 100.0)
}

/// Post-filter re-scoring boost: +20 when the full query phrase appears
/// verbatim in the searchable text, plus up to +15 scaled by the fraction
/// of individual query terms present. Clamped to 100.
pub fn enhanced_score(base: f32, query: &str, searchable: &str) -> f32 {
    let text = searchable.to_lowercase();
    let phrase = query.trim().to_lowercase();

    let mut score = base;
    if !phrase.is_empty() && text.contains(&phrase) {
        score += 20.0;
    }

    let terms = tokenize(query);
    if !terms.is_empty() {
        let present = terms.iter().filter(|t| text.contains(t.as_str())).count();
        score += 15.0 * present as f32 / terms.len() as f32;
    }

    score.min(100.0)
}

/// Concatenation of every text field we search, lowercased. Field order
/// does not matter: only per-category presence does.
pub fn searchable_text(restaurant: &Restaurant, reviews: &[Review]) -> String {
    let mut parts: Vec<&str> = vec![
        &restaurant.name,
        &restaurant.description,
    ];
    parts.extend(restaurant.cuisines.iter().map(String::as_str));
    parts.push(&restaurant.neighborhood);
    parts.push(&restaurant.address);
    for review in reviews.iter().take(MAX_SEARCHABLE_REVIEWS) {
        parts.push(&review.text);
    }
    parts.extend(restaurant.features.iter().map(String::as_str));
    for day in &restaurant.opening_hours {
        parts.push(&day.hours);
    }
    parts.push(&restaurant.popular_times);
    parts.push(&restaurant.phone);
    parts.push(&restaurant.website);
    parts.push(&restaurant.price_text);

    parts.join(" ").to_lowercase()
}

fn other_fields_text(restaurant: &Restaurant, reviews: &[Review]) -> String {
    let mut parts: Vec<&str> = vec![&restaurant.neighborhood, &restaurant.address];
    for review in reviews.iter().take(MAX_SEARCHABLE_REVIEWS) {
        parts.push(&review.text);
    }
    parts.extend(restaurant.features.iter().map(String::as_str));
    for day in &restaurant.opening_hours {
        parts.push(&day.hours);
    }
    parts.push(&restaurant.popular_times);
    parts.push(&restaurant.phone);
    parts.push(&restaurant.website);
    parts.push(&restaurant.price_text);

    parts.join(" ").to_lowercase()
}

pub fn tokenize(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(|t| t.to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Morphological variants to tolerate plural/singular mismatch:
/// the token itself, "ies"→"y", stripped "es", stripped "s", appended "s".
fn variants(token: &str) -> Vec<String> {
    let mut out = vec![token.to_string()];

    if let Some(stem) = token.strip_suffix("ies") {
        if !stem.is_empty() {
            out.push(format!("{stem}y"));
        }
    }
    if let Some(stem) = token.strip_suffix("es") {
        if !stem.is_empty() {
            out.push(stem.to_string());
        }
    }
    if let Some(stem) = token.strip_suffix('s') {
        if !stem.is_empty() {
            out.push(stem.to_string());
        }
    }
    out.push(format!("{token}s"));

    out.dedup();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn restaurant(name: &str, cuisines: &[&str], description: &str) -> Restaurant {
        Restaurant {
            place_id: "p1".to_string(),
            name: name.to_string(),
            cuisines: cuisines.iter().map(|c| c.to_string()).collect(),
            description: description.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_name_match_scores_highest() {
        let r = restaurant("Bella Italia", &[], "");
        let score = keyword_score("italia", &r, &[]);
        assert_eq!(score, 10.0 * 3.5);
    }

    #[test]
    fn test_cuisine_match() {
        let r = restaurant("The Corner Spot", &["Italian", "Pizza"], "");
        let score = keyword_score("italian", &r, &[]);
        assert_eq!(score, 8.0 * 3.5);
    }

    #[test]
    fn test_description_match() {
        let r = restaurant("The Corner Spot", &[], "wood-fired oven pizzas");
        let score = keyword_score("oven", &r, &[]);
        assert_eq!(score, 5.0 * 3.5);
    }

    #[test]
    fn test_other_field_match() {
        let mut r = restaurant("The Corner Spot", &[], "");
        r.neighborhood = "Sea Point".to_string();
        let score = keyword_score("point", &r, &[]);
        assert_eq!(score, 2.0 * 3.5);
    }

    #[test]
    fn test_no_double_counting_across_fields() {
        // "pizza" appears in name AND cuisine AND description: only name counts
        let r = restaurant("Pizza Palace", &["Pizza"], "best pizza in town");
        let score = keyword_score("pizza", &r, &[]);
        assert_eq!(score, 10.0 * 3.5);
    }

    #[test]
    fn test_plural_query_matches_singular_field() {
        let r = restaurant("The Corner Spot", &["Burger"], "");
        let score = keyword_score("burgers", &r, &[]);
        assert_eq!(score, 8.0 * 3.5);
    }

    #[test]
    fn test_ies_query_matches_y_field() {
        let r = restaurant("The Corner Spot", &[], "famous for its green curry");
        // "curries" → "curry" variant
        let score = keyword_score("curries", &r, &[]);
        assert_eq!(score, 5.0 * 3.5);
    }

    #[test]
    fn test_score_clamped_at_100() {
        let r = restaurant(
            "Pizza Pasta Wine Bar Grill House Kitchen",
            &[],
            "",
        );
        let score = keyword_score("pizza pasta wine bar grill house kitchen", &r, &[]);
        assert_eq!(score, 100.0);
    }

    #[test]
    fn test_scorer_is_pure() {
        let r = restaurant("Bella Italia", &["Italian"], "romantic dinners");
        let a = keyword_score("romantic italian dinner", &r, &[]);
        let b = keyword_score("romantic italian dinner", &r, &[]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_review_text_counts_as_other_field() {
        let r = restaurant("The Corner Spot", &[], "");
        let reviews = vec![Review {
            author: "a".to_string(),
            rating: 5.0,
            text: "great milkshakes".to_string(),
        }];
        let score = keyword_score("milkshakes", &r, &reviews);
        assert_eq!(score, 2.0 * 3.5);
    }

    #[test]
    fn test_enhanced_verbatim_phrase_boost() {
        let score = enhanced_score(10.0, "sushi lunch", "quick sushi lunch spot");
        // +20 phrase, +15 both terms present
        assert_eq!(score, 45.0);
    }

    #[test]
    fn test_enhanced_partial_term_boost() {
        let score = enhanced_score(0.0, "sushi brunch", "quick sushi lunch spot");
        // No verbatim phrase; 1 of 2 terms present → +7.5
        assert_eq!(score, 7.5);
    }

    #[test]
    fn test_enhanced_clamps_at_100() {
        let score = enhanced_score(95.0, "sushi", "sushi sushi sushi");
        assert_eq!(score, 100.0);
    }

    #[test]
    fn test_tokenize_lowercases_and_splits() {
        assert_eq!(tokenize("  Cheap   SUSHI "), vec!["cheap", "sushi"]);
    }

    #[test]
    fn test_variants_ies() {
        let v = variants("curries");
        assert!(v.contains(&"curry".to_string()));
    }

    #[test]
    fn test_searchable_text_includes_hours_and_price() {
        let mut r = restaurant("Spot", &[], "");
        r.price_text = "R 150 per person".to_string();
        r.opening_hours = vec![crate::models::DayHours {
            day: "Monday".to_string(),
            hours: "9:00 AM to 5:00 PM".to_string(),
        }];
        let text = searchable_text(&r, &[]);
        assert!(text.contains("r 150 per person"));
        assert!(text.contains("9:00 am to 5:00 pm"));
    }
}
