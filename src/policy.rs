//! The allow-list consulted by the cleaner: which tags survive, which attributes they may carry,
//! which attributes are forced onto them, and which URL schemes link attributes may use.
//!
//! Tag and attribute names are compared case-insensitively; they are stored lowercased.
//! Attribute values (enforced values) keep the case they were given in.

use std::collections::{HashMap, HashSet};

use html5ever::LocalName;

use crate::config::basic::{BASIC_POLICY, BASIC_WITH_IMAGES_POLICY};
use crate::config::default::NONE_POLICY;
use crate::config::relaxed::RELAXED_POLICY;
use crate::config::restricted::SIMPLE_TEXT_POLICY;
use crate::error::Error;

/// Pseudo tag name whose grants apply to every tag, on top of the tag's own grants.
pub const ALL: &str = ":all";

lazy_static! {
    static ref ALL_TAGS: LocalName = LocalName::from(ALL);
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Policy {
    tags: HashSet<LocalName>,
    attributes: HashMap<LocalName, HashSet<LocalName>>,
    enforced_attributes: HashMap<LocalName, Vec<(LocalName, String)>>,
    protocols: HashMap<LocalName, HashMap<LocalName, HashSet<String>>>,
    preserve_relative_links: bool,
}

fn name(kind: &str, name: &str) -> Result<LocalName, Error> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::invalid_argument(format!(
            "{} name must not be empty",
            kind
        )));
    }
    Ok(LocalName::from(name.to_ascii_lowercase()))
}

fn names(kind: &str, names: &[&str]) -> Result<Vec<LocalName>, Error> {
    names.iter().map(|n| name(kind, n)).collect()
}

/// A concrete tag; the `:all` wildcard is rejected.
fn tag_name(tag: &str) -> Result<LocalName, Error> {
    let tag = name("tag", tag)?;
    if tag == *ALL_TAGS {
        return Err(Error::invalid_argument(format!(
            "{} is not a tag and cannot be allowed or removed",
            ALL
        )));
    }
    Ok(tag)
}

fn protocol_names(protocols: &[&str]) -> Result<Vec<String>, Error> {
    protocols
        .iter()
        .map(|protocol| {
            let protocol = protocol.trim();
            if protocol.is_empty() {
                Err(Error::invalid_argument("protocol must not be empty"))
            } else {
                Ok(protocol.to_ascii_lowercase())
            }
        })
        .collect()
}

impl Policy {
    /// An empty policy: no tags, so cleaning leaves only text.
    pub fn new() -> Self {
        Policy::default()
    }

    pub fn none() -> Self {
        NONE_POLICY.clone()
    }

    /// Simple inline formatting: `b`, `em`, `i`, `strong`, `u`. No attributes.
    pub fn simple_text() -> Self {
        SIMPLE_TEXT_POLICY.clone()
    }

    /// Common text tags, links with `rel="nofollow"` enforced, and quotes with cite URLs.
    pub fn basic() -> Self {
        BASIC_POLICY.clone()
    }

    /// [`Policy::basic`] plus `img` restricted to `http` and `https` sources.
    pub fn basic_with_images() -> Self {
        BASIC_WITH_IMAGES_POLICY.clone()
    }

    /// Broad text, table and image coverage, still protocol restricted.
    pub fn relaxed() -> Self {
        RELAXED_POLICY.clone()
    }

    pub fn add_tags(&mut self, tags: &[&str]) -> Result<&mut Self, Error> {
        let tags = tags
            .iter()
            .map(|tag| tag_name(tag))
            .collect::<Result<Vec<_>, _>>()?;
        self.tags.extend(tags);
        Ok(self)
    }

    /// Disallows the tags and forgets every attribute, enforced attribute and protocol keyed to
    /// them.
    pub fn remove_tags(&mut self, tags: &[&str]) -> Result<&mut Self, Error> {
        let tags = tags
            .iter()
            .map(|tag| tag_name(tag))
            .collect::<Result<Vec<_>, _>>()?;
        for tag in tags {
            self.tags.remove(&tag);
            self.attributes.remove(&tag);
            self.enforced_attributes.remove(&tag);
            self.protocols.remove(&tag);
        }
        Ok(self)
    }

    /// Allows the attributes on `tag`, which also allows the tag itself. `tag` may be [`ALL`].
    pub fn add_attributes(&mut self, tag: &str, attributes: &[&str]) -> Result<&mut Self, Error> {
        let tag = name("tag", tag)?;
        let attributes = names("attribute", attributes)?;
        if tag != *ALL_TAGS {
            self.tags.insert(tag.clone());
        }
        self.attributes.entry(tag).or_default().extend(attributes);
        Ok(self)
    }

    /// Removes grants from exactly the given key. Removing from [`ALL`] leaves grants made on
    /// specific tags in place.
    pub fn remove_attributes(
        &mut self,
        tag: &str,
        attributes: &[&str],
    ) -> Result<&mut Self, Error> {
        let tag = name("tag", tag)?;
        let attributes = names("attribute", attributes)?;
        if let Some(allowed) = self.attributes.get_mut(&tag) {
            for attribute in &attributes {
                allowed.remove(attribute);
            }
            if allowed.is_empty() {
                self.attributes.remove(&tag);
            }
        }
        Ok(self)
    }

    /// Forces `attribute="value"` onto every kept `tag`, replacing any value it came with.
    pub fn add_enforced_attribute(
        &mut self,
        tag: &str,
        attribute: &str,
        value: &str,
    ) -> Result<&mut Self, Error> {
        let tag = name("tag", tag)?;
        let attribute = name("attribute", attribute)?;
        if tag != *ALL_TAGS {
            self.tags.insert(tag.clone());
        }
        let enforced = self.enforced_attributes.entry(tag).or_default();
        match enforced.iter_mut().find(|(name, _)| *name == attribute) {
            Some(entry) => entry.1 = value.to_owned(),
            None => enforced.push((attribute, value.to_owned())),
        }
        Ok(self)
    }

    pub fn remove_enforced_attribute(
        &mut self,
        tag: &str,
        attribute: &str,
    ) -> Result<&mut Self, Error> {
        let tag = name("tag", tag)?;
        let attribute = name("attribute", attribute)?;
        if let Some(enforced) = self.enforced_attributes.get_mut(&tag) {
            enforced.retain(|(name, _)| *name != attribute);
            if enforced.is_empty() {
                self.enforced_attributes.remove(&tag);
            }
        }
        Ok(self)
    }

    /// Restricts `tag`'s `attribute` to URLs with one of the given schemes. The pseudo-protocol
    /// `#` allows in-page anchors.
    pub fn add_protocols(
        &mut self,
        tag: &str,
        attribute: &str,
        protocols: &[&str],
    ) -> Result<&mut Self, Error> {
        let tag = name("tag", tag)?;
        let attribute = name("attribute", attribute)?;
        let protocols = protocol_names(protocols)?;
        self.protocols
            .entry(tag)
            .or_default()
            .entry(attribute)
            .or_default()
            .extend(protocols);
        Ok(self)
    }

    /// Removing the last protocol of a pair lifts the restriction: the attribute then accepts any
    /// scheme.
    pub fn remove_protocols(
        &mut self,
        tag: &str,
        attribute: &str,
        protocols: &[&str],
    ) -> Result<&mut Self, Error> {
        let tag = name("tag", tag)?;
        let attribute = name("attribute", attribute)?;
        let protocols = protocol_names(protocols)?;
        if let Some(by_attribute) = self.protocols.get_mut(&tag) {
            if let Some(allowed) = by_attribute.get_mut(&attribute) {
                for protocol in &protocols {
                    allowed.remove(protocol);
                }
                if allowed.is_empty() {
                    by_attribute.remove(&attribute);
                }
            }
            if by_attribute.is_empty() {
                self.protocols.remove(&tag);
            }
        }
        Ok(self)
    }

    /// Keep relative links as they are instead of resolving them against the base URI (or
    /// dropping them when there is none).
    pub fn preserve_relative_links(&mut self, preserve: bool) -> &mut Self {
        self.preserve_relative_links = preserve;
        self
    }

    pub fn preserves_relative_links(&self) -> bool {
        self.preserve_relative_links
    }

    /// `tag` must already be lowercase.
    pub fn is_safe_tag(&self, tag: &LocalName) -> bool {
        self.tags.contains(tag)
    }

    /// Whether `attribute` is granted on `tag`, either directly or through [`ALL`]. Both names must
    /// already be lowercase.
    pub fn is_safe_attribute(&self, tag: &LocalName, attribute: &LocalName) -> bool {
        [tag, &*ALL_TAGS].iter().any(|key| {
            self.attributes
                .get(*key)
                .map_or(false, |allowed| allowed.contains(attribute))
        })
    }

    /// The schemes `attribute` on `tag` is restricted to, or `None` if it is unrestricted. A
    /// tag-specific entry shadows one made through [`ALL`].
    pub fn protocols(&self, tag: &LocalName, attribute: &LocalName) -> Option<&HashSet<String>> {
        let lookup = |key: &LocalName| {
            self.protocols
                .get(key)
                .and_then(|by_attribute| by_attribute.get(attribute))
        };
        lookup(tag)
            .or_else(|| lookup(&*ALL_TAGS))
            .filter(|allowed| !allowed.is_empty())
    }

    /// The forced value of `attribute` on `tag`, if any.
    pub fn enforced_attribute(&self, tag: &LocalName, attribute: &LocalName) -> Option<&str> {
        self.enforced_attributes(tag)
            .into_iter()
            .find(|(name, _)| *name == attribute)
            .map(|(_, value)| value)
    }

    /// Attributes forced onto `tag`, tag-specific entries first. A tag-specific entry shadows an
    /// [`ALL`] entry of the same name.
    pub fn enforced_attributes(&self, tag: &LocalName) -> Vec<(&LocalName, &str)> {
        let mut enforced: Vec<(&LocalName, &str)> = vec![];
        for key in [tag, &*ALL_TAGS].iter() {
            if let Some(entries) = self.enforced_attributes.get(*key) {
                for (name, value) in entries {
                    if !enforced.iter().any(|(seen, _)| *seen == name) {
                        enforced.push((name, value.as_str()));
                    }
                }
            }
        }
        enforced
    }
}
