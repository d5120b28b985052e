/// Ordered multimap of query parameters with canonical
/// `application/x-www-form-urlencoded` serialization.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryString {
    pairs: Vec<(String, String)>,
}

impl QueryString {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter, keeping any existing values for the same name.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((name.into(), value.into()));
    }

    /// Replaces every value stored under `name` with `value`.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.pairs.retain(|(existing, _)| *existing != name);
        self.pairs.push((name, value.into()));
    }

    pub fn get_first(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Canonical encoding, in insertion order.
    pub fn to_encoded_string(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (name, value) in &self.pairs {
            serializer.append_pair(name, value);
        }
        serializer.finish()
    }

    pub(crate) fn extend_from_encoded(&mut self, raw_query: &str) {
        for (name, value) in url::form_urlencoded::parse(raw_query.as_bytes()) {
            self.pairs.push((name.into_owned(), value.into_owned()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_preserves_insertion_order() {
        let mut query = QueryString::new();
        query.add("limit", "200");
        query.add("filter", "status eq \"ACTIVE\"");
        query.add("limit", "25");
        assert_eq!(
            query.to_encoded_string(),
            "limit=200&filter=status+eq+%22ACTIVE%22&limit=25"
        );
    }

    #[test]
    fn set_replaces_every_value() {
        let mut query = QueryString::new();
        query.add("after", "a");
        query.add("after", "b");
        query.set("after", "c");
        assert_eq!(query.iter().count(), 1);
        assert_eq!(query.get_first("after"), Some("c"));
    }

    #[test]
    fn extend_from_encoded_round_trips() {
        let mut query = QueryString::new();
        query.extend_from_encoded("q=hello+world&page=2");
        assert_eq!(query.get_first("q"), Some("hello world"));
        assert_eq!(query.get_first("page"), Some("2"));
    }
}
