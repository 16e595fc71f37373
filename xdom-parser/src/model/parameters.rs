use serde::{
    Serialize,
    ser::{SerializeMap, Serializer},
};

/// Ordered `key -> value` parameters carried by blocks and macro calls.
///
/// Insertion order is kept because it decides the order parameters are
/// printed back in, and a re-inserted key keeps its original position.
#[derive(Debug, Default, PartialEq, Eq, Clone, Hash)]
pub struct Parameters(Vec<(String, String)>);

impl Serialize for Parameters {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            state.serialize_entry(key, value)?;
        }
        state.end()
    }
}

impl Parameters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Set a parameter, replacing the value in place when the key exists.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(entry) = self.0.iter_mut().find(|(existing, _)| *existing == key) {
            entry.1 = value;
        } else {
            self.0.push((key, value));
        }
    }

    /// Builder-style [`Parameters::insert`].
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut parameters = Self::new();
        for (key, value) in iter {
            parameters.insert(key, value);
        }
        parameters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_insertion_order() {
        let parameters = Parameters::new()
            .with("zeta", "1")
            .with("alpha", "2")
            .with("mid", "3");
        let keys: Vec<_> = parameters.iter().map(|(key, _)| key).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn reinsert_replaces_in_place() {
        let mut parameters: Parameters = [("a", "1"), ("b", "2")].into_iter().collect();
        parameters.insert("a", "3");
        let pairs: Vec<_> = parameters.iter().collect();
        assert_eq!(pairs, vec![("a", "3"), ("b", "2")]);
        assert_eq!(parameters.len(), 2);
    }

    #[test]
    fn serializes_as_ordered_map() -> Result<(), serde_json::Error> {
        let parameters = Parameters::new().with("b", "x").with("a", "y");
        assert_eq!(serde_json::to_string(&parameters)?, r#"{"b":"x","a":"y"}"#);
        Ok(())
    }
}
