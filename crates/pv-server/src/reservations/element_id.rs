//! Element id grammar: `<descriptor><number>`.
//!
//! The descriptor comes from a fixed catalogue and the number must fall in
//! that descriptor's inclusive range. Numbers are one or two decimal digits
//! without a leading zero.

use std::collections::BTreeMap;

use pv_core::config::{ElementRange, ElementsConfig};
use regex::Regex;

/// A syntactically valid element id, split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementId<'a> {
    pub descriptor: &'a str,
    pub number: u32,
}

/// Catalogue of reservable element classes.
#[derive(Debug, Clone)]
pub struct ElementCatalog {
    pattern: Regex,
    ranges: BTreeMap<String, ElementRange>,
}

impl ElementCatalog {
    pub fn from_config(config: &ElementsConfig) -> Result<Self, regex::Error> {
        let mut descriptors: Vec<&str> = config.classes.keys().map(String::as_str).collect();
        // Longest first, so a descriptor never shadows a longer one sharing its prefix.
        descriptors.sort_by_key(|d| std::cmp::Reverse(d.len()));
        let alternatives: Vec<String> = descriptors.iter().map(|d| regex::escape(d)).collect();

        let pattern = Regex::new(&format!(
            "^(?P<descriptor>{})(?P<number>[1-9][0-9]?)$",
            alternatives.join("|")
        ))?;

        Ok(Self {
            pattern,
            ranges: config.classes.clone(),
        })
    }

    /// Split `mid` into descriptor and number if it is a valid element id.
    pub fn parse<'a>(&self, mid: &'a str) -> Option<ElementId<'a>> {
        let caps = self.pattern.captures(mid)?;
        let descriptor = caps.name("descriptor")?.as_str();
        let number: u32 = caps.name("number")?.as_str().parse().ok()?;

        let range = self.ranges.get(descriptor)?;
        (range.from..=range.to)
            .contains(&number)
            .then_some(ElementId { descriptor, number })
    }

    pub fn is_valid(&self, mid: &str) -> bool {
        self.parse(mid).is_some()
    }
}
