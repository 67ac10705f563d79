use std::collections::HashMap;

use serde::Deserialize;

use crate::config::Preset;
use crate::error::Error;
use crate::policy::Policy;

/// A policy described in JSON: an optional preset to start from, followed by additions and
/// removals applied through the [`Policy`] builder, so the same name validation applies.
///
/// ```json
/// {
///   "preset": "basic",
///   "tags": ["img"],
///   "attributes": { "img": ["src", "alt"], ":all": ["title"] },
///   "protocols": { "img": { "src": ["https"] } },
///   "remove_enforced_attributes": { "a": ["rel"] },
///   "preserve_relative_links": true
/// }
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyFile {
    pub preset: Option<Preset>,
    pub tags: Vec<String>,
    pub remove_tags: Vec<String>,
    pub attributes: HashMap<String, Vec<String>>,
    pub remove_attributes: HashMap<String, Vec<String>>,
    pub enforced_attributes: HashMap<String, HashMap<String, String>>,
    pub remove_enforced_attributes: HashMap<String, Vec<String>>,
    pub protocols: HashMap<String, HashMap<String, Vec<String>>>,
    pub remove_protocols: HashMap<String, HashMap<String, Vec<String>>>,
    pub preserve_relative_links: Option<bool>,
}

fn strs(values: &[String]) -> Vec<&str> {
    values.iter().map(String::as_str).collect()
}

impl PolicyFile {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// Additions are applied before removals.
    pub fn into_policy(self) -> Result<Policy, Error> {
        let mut policy = self.preset.map_or_else(Policy::new, Preset::policy);

        policy.add_tags(&strs(&self.tags))?;
        for (tag, attributes) in &self.attributes {
            policy.add_attributes(tag, &strs(attributes))?;
        }
        for (tag, enforced) in &self.enforced_attributes {
            for (attribute, value) in enforced {
                policy.add_enforced_attribute(tag, attribute, value)?;
            }
        }
        for (tag, by_attribute) in &self.protocols {
            for (attribute, protocols) in by_attribute {
                policy.add_protocols(tag, attribute, &strs(protocols))?;
            }
        }

        for (tag, by_attribute) in &self.remove_protocols {
            for (attribute, protocols) in by_attribute {
                policy.remove_protocols(tag, attribute, &strs(protocols))?;
            }
        }
        for (tag, attributes) in &self.remove_enforced_attributes {
            for attribute in attributes {
                policy.remove_enforced_attribute(tag, attribute)?;
            }
        }
        for (tag, attributes) in &self.remove_attributes {
            policy.remove_attributes(tag, &strs(attributes))?;
        }
        policy.remove_tags(&strs(&self.remove_tags))?;

        if let Some(preserve) = self.preserve_relative_links {
            policy.preserve_relative_links(preserve);
        }
        Ok(policy)
    }
}
