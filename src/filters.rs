//! Title listing filters.
//!
//! The `genre` parameter may repeat (`?genre=scifi&genre=noir`), which the
//! plain `Query` extractor cannot express, so the raw query string is parsed
//! here with `url::form_urlencoded`. Semantics: OR across the genre slugs,
//! AND with every other filter.

use url::form_urlencoded;

/// TitleFilter
///
/// Accepted query parameters for GET /titles: partial case-insensitive
/// `name` match, exact `category` slug, one-or-many `genre` slugs, exact
/// `year`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TitleFilter {
    pub name: Option<String>,
    pub category: Option<String>,
    pub genre: Vec<String>,
    pub year: Option<i32>,
}

impl TitleFilter {
    /// Parses a raw query string. Unknown keys are ignored; a repeated
    /// scalar key keeps its last value (matching form semantics), while
    /// `genre` accumulates.
    pub fn parse(query: &str) -> Self {
        let mut filter = Self::default();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "name" if !value.is_empty() => filter.name = Some(value.into_owned()),
                "category" if !value.is_empty() => filter.category = Some(value.into_owned()),
                "genre" if !value.is_empty() => filter.genre.push(value.into_owned()),
                "year" => {
                    if let Ok(year) = value.parse() {
                        filter.year = Some(year);
                    }
                }
                _ => {}
            }
        }
        filter
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.genre.is_empty()
            && self.year.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_parses_to_empty_filter() {
        let filter = TitleFilter::parse("");
        assert!(filter.is_empty());
    }

    #[test]
    fn parses_all_scalar_filters() {
        let filter = TitleFilter::parse("name=dune&category=films&year=1984");
        assert_eq!(filter.name.as_deref(), Some("dune"));
        assert_eq!(filter.category.as_deref(), Some("films"));
        assert_eq!(filter.year, Some(1984));
        assert!(filter.genre.is_empty());
    }

    #[test]
    fn genre_accumulates_across_repeats() {
        let filter = TitleFilter::parse("genre=scifi&genre=noir&genre=drama");
        assert_eq!(filter.genre, vec!["scifi", "noir", "drama"]);
    }

    #[test]
    fn url_encoding_is_decoded() {
        let filter = TitleFilter::parse("name=the%20wall");
        assert_eq!(filter.name.as_deref(), Some("the wall"));
    }

    #[test]
    fn bad_year_and_unknown_keys_are_ignored() {
        let filter = TitleFilter::parse("year=soon&page=3&name=x");
        assert_eq!(filter.year, None);
        assert_eq!(filter.name.as_deref(), Some("x"));
    }
}
