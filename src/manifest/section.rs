use serde::{Deserialize, Serialize};

/// Ordered header/value pairs of one manifest section
///
/// Header names are case-sensitive; assigning an existing header replaces its value
/// without moving it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    headers: Vec<(String, String)>,
}

impl Section {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.headers.iter().any(|(k, _)| k == name)
    }

    /// Sets a header, returning the previous value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        let value = value.into();
        match self.headers.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => Some(std::mem::replace(&mut entry.1, value)),
            None => {
                self.headers.push((name, value));
                None
            }
        }
    }

    /// Sets a header only when absent; returns whether it was inserted
    pub fn insert_if_absent(&mut self, name: &str, value: &str) -> bool {
        if self.contains(name) {
            return false;
        }
        self.headers.push((name.to_string(), value.to_string()));
        true
    }

    pub(crate) fn prepend_if_absent(&mut self, name: &str, value: &str) {
        if !self.contains(name) {
            self.headers.insert(0, (name.to_string(), value.to_string()));
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let index = self.headers.iter().position(|(k, _)| k == name)?;
        Some(self.headers.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Headers in emission order: `Name` first, the rest as stored
    pub fn ordered(&self) -> Vec<(&str, &str)> {
        let mut ordered: Vec<(&str, &str)> = self.iter().filter(|(k, _)| *k == "Name").collect();
        ordered.extend(self.iter().filter(|(k, _)| *k != "Name"));
        ordered
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Section {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut section = Section::new();
        for (k, v) in iter {
            section.insert(k, v);
        }
        section
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces_without_reordering() {
        let mut section: Section = [("A", "1"), ("B", "2")].into_iter().collect();
        assert_eq!(section.insert("A", "3"), Some("1".to_string()));
        let keys: Vec<&str> = section.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["A", "B"]);
        assert_eq!(section.get("A"), Some("3"));
    }

    #[test]
    fn test_name_is_ordered_first() {
        let section: Section = [("Sealed", "true"), ("Name", "com/example/")]
            .into_iter()
            .collect();
        assert_eq!(
            section.ordered(),
            vec![("Name", "com/example/"), ("Sealed", "true")]
        );
    }

    #[test]
    fn test_insert_if_absent() {
        let mut section = Section::new();
        assert!(section.insert_if_absent("Manifest-Version", "1.0"));
        assert!(!section.insert_if_absent("Manifest-Version", "2.0"));
        assert_eq!(section.get("Manifest-Version"), Some("1.0"));
    }

    #[test]
    fn test_headers_are_case_sensitive() {
        let section: Section = [("bar", "Bar")].into_iter().collect();
        assert_eq!(section.get("bar"), Some("Bar"));
        assert_eq!(section.get("Bar"), None);
    }
}
