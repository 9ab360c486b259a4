//
// Copyright (c) The SLP Directory Agent Contributors
//
// SPDX-License-Identifier: MIT
//

//! Attribute lists (§3 "Attributes").
//!
//! An ordered mapping from case-insensitive attribute tag to either a
//! boolean flag (tag present, no value) or a list of typed values.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// A single attribute value. SLP attribute lists are untyped on the wire;
/// the type tag here reflects how the value was declared at registration
/// time and drives filter-comparison semantics (§4.2).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrValue {
    String(String),
    Integer(i64),
    Bool(bool),
    Opaque(Vec<u8>),
}

impl Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::String(s) => write!(f, "{s}"),
            AttrValue::Integer(i) => write!(f, "{i}"),
            AttrValue::Bool(b) => write!(f, "{b}"),
            AttrValue::Opaque(bytes) => {
                write!(f, "\\FF{:02x}", bytes.len())?;
                for b in bytes {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
        }
    }
}

/// The values bound to one attribute tag: either a presence flag, or a
/// non-empty list of typed values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrEntry {
    Flag,
    Values(Vec<AttrValue>),
}

/// An ordered, case-insensitive attribute list.
///
/// Tags are normalized to upper case for lookup, but insertion order of
/// distinct tags is preserved via a side index so that wire encoders can
/// reproduce the registration order.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Attributes {
    order: Vec<String>,
    entries: BTreeMap<String, AttrEntry>,
}

impl Attributes {
    pub fn new() -> Attributes {
        Attributes::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn set_flag(&mut self, tag: impl AsRef<str>) {
        self.insert(tag, AttrEntry::Flag);
    }

    pub fn set_values(&mut self, tag: impl AsRef<str>, values: Vec<AttrValue>) {
        self.insert(tag, AttrEntry::Values(values));
    }

    fn insert(&mut self, tag: impl AsRef<str>, entry: AttrEntry) {
        let key = tag.as_ref().to_uppercase();
        if !self.entries.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.entries.insert(key, entry);
    }

    pub fn get(&self, tag: &str) -> Option<&AttrEntry> {
        self.entries.get(&tag.to_uppercase())
    }

    pub fn contains_tag(&self, tag: &str) -> bool {
        self.entries.contains_key(&tag.to_uppercase())
    }

    /// Tags in insertion order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrEntry)> {
        self.order
            .iter()
            .map(move |tag| (tag.as_str(), &self.entries[tag]))
    }

    /// Union with `other`, right-wins on conflicting tags (§3).
    pub fn merge(&mut self, other: &Attributes) {
        for tag in &other.order {
            let entry = other.entries[tag].clone();
            self.insert(tag, entry);
        }
    }

    /// Remove named tags entirely, or just the named values within a tag
    /// (§3). `tags` names whole tags to drop; `values` names
    /// `(tag, value)` pairs to remove from a values-list, leaving the
    /// tag present (possibly now empty, in which case it's dropped too).
    pub fn unmerge(&mut self, tags: &[String], values: &[(String, AttrValue)]) {
        for tag in tags {
            let key = tag.to_uppercase();
            if self.entries.remove(&key).is_some() {
                self.order.retain(|t| t != &key);
            }
        }
        for (tag, value) in values {
            let key = tag.to_uppercase();
            let Some(AttrEntry::Values(vals)) = self.entries.get_mut(&key)
            else {
                continue;
            };
            vals.retain(|v| v != value);
            if vals.is_empty() {
                self.entries.remove(&key);
                self.order.retain(|t| t != &key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_right_wins_on_conflict() {
        let mut a = Attributes::new();
        a.set_values("color", vec![AttrValue::Bool(true)]);
        let mut b = Attributes::new();
        b.set_values("color", vec![AttrValue::Bool(false)]);
        a.merge(&b);
        assert_eq!(a.get("COLOR"), Some(&AttrEntry::Values(vec![AttrValue::Bool(false)])));
    }

    #[test]
    fn merge_is_case_insensitive_union() {
        let mut a = Attributes::new();
        a.set_flag("Color");
        let mut b = Attributes::new();
        b.set_values("ppm", vec![AttrValue::Integer(10)]);
        a.merge(&b);
        assert!(a.contains_tag("COLOR"));
        assert!(a.contains_tag("ppm"));
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn unmerge_removes_named_tag() {
        let mut a = Attributes::new();
        a.set_flag("color");
        a.set_values("ppm", vec![AttrValue::Integer(10)]);
        a.unmerge(&["color".to_string()], &[]);
        assert!(!a.contains_tag("color"));
        assert!(a.contains_tag("ppm"));
    }

    #[test]
    fn unmerge_removes_single_value_and_drops_tag_when_empty() {
        let mut a = Attributes::new();
        a.set_values("ppm", vec![AttrValue::Integer(10)]);
        a.unmerge(&[], &[("ppm".to_string(), AttrValue::Integer(10))]);
        assert!(!a.contains_tag("ppm"));
    }

    #[test]
    fn insertion_order_preserved() {
        let mut a = Attributes::new();
        a.set_flag("b");
        a.set_flag("a");
        a.set_flag("c");
        assert_eq!(a.tags().collect::<Vec<_>>(), vec!["B", "A", "C"]);
    }
}
