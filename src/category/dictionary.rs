//! Label dictionaries: which mask value means which category name.
//!
//! On disk a dictionary is a JSON object from name to value, where the
//! value is a single-channel index (`"leaf": 3`) or an RGB triple
//! (`"leaf": [255, 0, 0]`).

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::PolymaskError;
use crate::geometry::LabelValue;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
enum DictValue {
    Index(u8),
    Color([u8; 3]),
}

impl From<DictValue> for LabelValue {
    fn from(value: DictValue) -> Self {
        match value {
            DictValue::Index(v) => LabelValue::Index(v),
            DictValue::Color(rgb) => LabelValue::Color(rgb),
        }
    }
}

impl From<LabelValue> for DictValue {
    fn from(value: LabelValue) -> Self {
        match value {
            LabelValue::Index(v) => DictValue::Index(v),
            LabelValue::Color(rgb) => DictValue::Color(rgb),
        }
    }
}

/// Mapping from mask value to category name.
///
/// Values are unique keys; several values may share one name. A dictionary
/// may also carry a category order: names listed there get ids `1..` in
/// that order on import, ahead of any name first seen in a mask.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelDictionary {
    entries: BTreeMap<LabelValue, String>,
    order: Vec<String>,
}

impl LabelDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the name for `value`.
    pub fn insert(&mut self, value: LabelValue, name: impl Into<String>) {
        self.entries.insert(value, name.into());
    }

    pub fn name_for(&self, value: LabelValue) -> Option<&str> {
        self.entries.get(&value).map(String::as_str)
    }

    pub fn contains(&self, value: LabelValue) -> bool {
        self.entries.contains_key(&value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Category names in id order; empty when ids follow first appearance.
    pub fn category_order(&self) -> &[String] {
        &self.order
    }

    pub fn with_category_order(mut self, names: Vec<String>) -> Self {
        self.order = names;
        self
    }

    /// Entries in ascending value order.
    pub fn iter(&self) -> impl Iterator<Item = (LabelValue, &str)> + '_ {
        self.entries.iter().map(|(value, name)| (*value, name.as_str()))
    }

    /// Build from `(name, value)` pairs.
    ///
    /// # Errors
    /// Returns [`PolymaskError::Validation`] if a value is background or if
    /// two names claim the same value.
    pub fn from_named<I, S>(pairs: I) -> Result<Self, PolymaskError>
    where
        I: IntoIterator<Item = (S, LabelValue)>,
        S: Into<String>,
    {
        let mut dictionary = Self::new();
        for (name, value) in pairs {
            let name = name.into();
            if value.is_background() {
                return Err(PolymaskError::validation(
                    "label dictionary",
                    name,
                    format!("value {value} is the background value"),
                ));
            }
            if let Some(existing) = dictionary.name_for(value) {
                return Err(PolymaskError::validation(
                    "label dictionary",
                    name.clone(),
                    format!("value {value} is already assigned to '{existing}'"),
                ));
            }
            dictionary.insert(value, name);
        }
        Ok(dictionary)
    }
}

impl Serialize for LabelDictionary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Names shared by several values keep the lowest value.
        let mut map = BTreeMap::new();
        for (value, name) in self.entries.iter().rev() {
            map.insert(name.as_str(), DictValue::from(*value));
        }
        map.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for LabelDictionary {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = BTreeMap::<String, DictValue>::deserialize(deserializer)?;
        Self::from_named(map.into_iter().map(|(name, v)| (name, LabelValue::from(v))))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_index_and_color_entries() {
        let dictionary: LabelDictionary =
            serde_json::from_str(r#"{"leaf": 3, "stem": [0, 255, 0]}"#).unwrap();
        assert_eq!(dictionary.name_for(LabelValue::Index(3)), Some("leaf"));
        assert_eq!(dictionary.name_for(LabelValue::Color([0, 255, 0])), Some("stem"));
        assert!(!dictionary.contains(LabelValue::Index(4)));
    }

    #[test]
    fn background_value_is_rejected() {
        let result: Result<LabelDictionary, _> = serde_json::from_str(r#"{"void": [0, 0, 0]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn duplicate_value_is_rejected() {
        let err = LabelDictionary::from_named([
            ("a", LabelValue::Index(1)),
            ("b", LabelValue::Index(1)),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("already assigned"));
    }

    #[test]
    fn category_order_is_not_part_of_the_json_map() {
        let dictionary = LabelDictionary::from_named([("b", LabelValue::Index(2))])
            .unwrap()
            .with_category_order(vec!["b".into(), "a".into()]);
        assert_eq!(dictionary.category_order(), ["b", "a"]);
        assert_eq!(serde_json::to_string(&dictionary).unwrap(), r#"{"b":2}"#);
    }

    #[test]
    fn serializes_as_name_to_value() {
        let dictionary = LabelDictionary::from_named([("cell", LabelValue::Color([1, 2, 3]))]).unwrap();
        let json = serde_json::to_string(&dictionary).unwrap();
        assert_eq!(json, r#"{"cell":[1,2,3]}"#);
    }
}
