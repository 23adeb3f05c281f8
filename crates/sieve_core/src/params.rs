use serde::{Deserialize, Serialize};

pub const SORT_KEY: &str = "sort";
pub const SIZE_KEY: &str = "size";
pub const PAGE_KEY: &str = "page";
pub const SELECT_KEY: &str = "select";

pub const ID_KEY: &str = "id";
pub const TXID_KEY: &str = "txid";
pub const PURL_KEY: &str = "purl";
pub const COMMIT_DATE_TIME_KEY: &str = "commitDateTime";
pub const DATASOURCES_PURL_KEY: &str = "datasources.purl";

pub const DATASET_NAME_KEY: &str = "datasetName";
pub const DATASET_NAME_FIELD: &str = "dataset.name";
pub const PACKAGES_ID_FIELD: &str = "packages.id";
pub const IS_CURRENT_KEY: &str = "isCurrent";
pub const IS_FORECAST_SAME_COURSE_KEY: &str = "isForecastSameCourse";
pub const IS_FORECAST_RECOMMENDATIONS_TAKEN_KEY: &str = "isForecastRecommendationsTaken";

pub const PAGING_KEYS: [&str; 4] = [SORT_KEY, SIZE_KEY, PAGE_KEY, SELECT_KEY];
pub const RESERVED_KEYS: [&str; 5] = [
    ID_KEY,
    TXID_KEY,
    PURL_KEY,
    COMMIT_DATE_TIME_KEY,
    DATASOURCES_PURL_KEY,
];

pub fn is_paging_key(key: &str) -> bool {
    PAGING_KEYS.contains(&key)
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterParams {
    entries: Vec<(String, String)>,
}

impl FilterParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(name, _)| *name == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.entries.iter().position(|(name, _)| name == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn strip_reserved(&mut self) {
        self.entries
            .retain(|(name, _)| !RESERVED_KEYS.contains(&name.as_str()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for FilterParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = FilterParams::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

pub fn split_list(value: &str) -> Vec<&str> {
    value
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{FilterParams, split_list};

    #[test]
    fn insert_replaces_in_place_and_keeps_order() {
        let mut params: FilterParams = [("b", "1"), ("a", "2")].into_iter().collect();
        params.insert("b", "3");
        params.insert("c", "4");
        let keys: Vec<_> = params.iter().map(|(key, _)| key).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
        assert_eq!(params.get("b"), Some("3"));
        assert_eq!(params.remove("a").as_deref(), Some("2"));
        assert!(!params.contains("a"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn strip_reserved_keeps_other_filters() {
        let mut params: FilterParams = [
            ("id", "1"),
            ("txid", "x"),
            ("purl", "pkg:npm/a"),
            ("commitDateTime", "gt.2024-01-01"),
            ("datasources.purl", "github.com/acme"),
            ("name", "fox"),
        ]
        .into_iter()
        .collect();
        params.strip_reserved();
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("name"), Some("fox"));
    }

    #[test]
    fn split_list_drops_blank_tokens() {
        assert_eq!(split_list(" a, ,b,,c "), vec!["a", "b", "c"]);
        assert!(split_list(" , ").is_empty());
    }
}
