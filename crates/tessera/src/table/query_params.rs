use std::fmt;

use url::form_urlencoded;

/// Ordered multimap over URL query-string pairs.
///
/// Keeps pairs in the order they were parsed or appended, so repeated keys
/// (`filters[status][]=a&filters[status][]=b`) survive a round trip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a query string; a leading `?` is ignored.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect()
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&str, &str) -> bool) {
        self.pairs.retain(|(k, v)| keep(k, v));
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn to_query_string(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&self.pairs)
            .finish()
    }
}

impl FromIterator<(String, String)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().collect(),
        }
    }
}

impl Extend<(String, String)> for QueryParams {
    fn extend<I: IntoIterator<Item = (String, String)>>(&mut self, iter: I) {
        self.pairs.extend(iter);
    }
}

impl fmt::Display for QueryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keeps_repeated_keys() {
        let params = QueryParams::parse("?filters%5Bstatus%5D%5B%5D=paid&filters[status][]=void&page=2");
        assert_eq!(
            params.get_all("filters[status][]").collect::<Vec<_>>(),
            vec!["paid", "void"]
        );
        assert_eq!(params.get("page"), Some("2"));
        assert_eq!(params.get("limit"), None);
    }

    #[test]
    fn test_serialization_round_trip() {
        let mut params = QueryParams::new();
        params.append("search", "ada lovelace");
        params.append("dateRange[from]", "2024-01-01");
        let encoded = params.to_query_string();
        assert_eq!(encoded, "search=ada+lovelace&dateRange%5Bfrom%5D=2024-01-01");
        assert_eq!(QueryParams::parse(&encoded), params);
    }
}
