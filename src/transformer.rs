use std::borrow::Cow;

use html5ever::tendril::StrTendril;
use html5ever::{Attribute, LocalName, QualName};
use url::Url;

use crate::arena_dom::{NodeData, Ref};
use crate::config::default::OPAQUE_TAGS;
use crate::policy::Policy;
use crate::protocol::{self, Protocol};

/// What happens to a source node when the tree is copied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// Copied, with its attributes filtered.
    Keep,
    /// Dropped, while its children take its place.
    Unwrap,
    /// Dropped together with everything beneath it.
    Remove,
}

/// A kept element after attribute filtering, plus how many attributes were dropped or rewritten
/// to get there.
#[derive(Debug)]
pub struct SafeElement {
    pub name: QualName,
    pub attrs: Vec<Attribute>,
    pub discarded: usize,
}

pub struct Transformer<'a> {
    policy: &'a Policy,
    base_uri: Option<&'a Url>,
}

impl<'a> Transformer<'a> {
    pub fn new(policy: &'a Policy, base_uri: Option<&'a Url>) -> Self {
        Transformer { policy, base_uri }
    }

    pub fn disposition(&self, node: Ref) -> Disposition {
        if !self.should_unwrap_node(node) {
            Disposition::Keep
        } else if self.should_remove_contents_when_unwrapped(node) {
            Disposition::Remove
        } else {
            Disposition::Unwrap
        }
    }

    fn should_unwrap_node(&self, node: Ref) -> bool {
        match node.data {
            NodeData::Document | NodeData::Text { .. } => false,
            NodeData::Doctype { .. }
            | NodeData::Comment { .. }
            | NodeData::ProcessingInstruction { .. } => true,
            NodeData::Element { ref name, .. } => {
                !self.policy.is_safe_tag(&lowercase(&name.local))
            }
        }
    }

    fn should_remove_contents_when_unwrapped(&self, node: Ref) -> bool {
        match node.data {
            NodeData::Document | NodeData::Text { .. } => false,
            NodeData::Doctype { .. }
            | NodeData::Comment { .. }
            | NodeData::ProcessingInstruction { .. } => true,
            NodeData::Element { ref name, .. } => OPAQUE_TAGS.contains(&lowercase(&name.local)),
        }
    }

    /// Filters the attributes of an allowed element and applies the attributes the policy
    /// enforces on it.
    pub fn safe_element(&self, name: &QualName, attrs: &[Attribute]) -> SafeElement {
        let tag = lowercase(&name.local);
        let mut discarded = 0;
        let mut safe_attrs: Vec<Attribute> = Vec::with_capacity(attrs.len());

        for attr in attrs {
            let key = attribute_key(&attr.name);
            match self.safe_attribute(&tag, &key, &attr.value) {
                Some(value) => safe_attrs.push(Attribute {
                    name: attr.name.clone(),
                    value,
                }),
                None => {
                    trace!("dropping {}={:?} from <{}>", key, &*attr.value, tag);
                    discarded += 1;
                }
            }
        }

        for (key, value) in self.policy.enforced_attributes(&tag) {
            match safe_attrs
                .iter_mut()
                .find(|attr| attribute_key(&attr.name) == *key)
            {
                Some(attr) => {
                    if &*attr.value != value {
                        trace!("overwriting {}={:?} on <{}>", key, &*attr.value, tag);
                        attr.value = StrTendril::from_slice(value);
                        discarded += 1;
                    }
                }
                None => safe_attrs.push(Attribute {
                    name: QualName::new(None, ns!(), key.clone()),
                    value: StrTendril::from_slice(value),
                }),
            }
        }

        SafeElement {
            name: name.clone(),
            attrs: safe_attrs,
            discarded,
        }
    }

    /// The value to keep for `key` on `tag`, or `None` if the attribute has to go.
    fn safe_attribute(
        &self,
        tag: &LocalName,
        key: &LocalName,
        value: &StrTendril,
    ) -> Option<StrTendril> {
        if !self.policy.is_safe_attribute(tag, key) {
            // An attribute that already carries its enforced value is left alone.
            return match self.policy.enforced_attribute(tag, key) {
                Some(enforced) if enforced == &**value => Some(value.clone()),
                _ => None,
            };
        }

        let allowed = self.policy.protocols(tag, key);
        match protocol::classify(value, allowed) {
            Protocol::Unrestricted => Some(value.clone()),
            Protocol::Allowed if self.policy.preserves_relative_links() => Some(value.clone()),
            Protocol::Allowed => match protocol::lowercase_scheme(value) {
                Cow::Borrowed(_) => Some(value.clone()),
                Cow::Owned(lowered) => Some(StrTendril::from_slice(&lowered)),
            },
            Protocol::Disallowed => None,
            Protocol::Relative if self.policy.preserves_relative_links() => Some(value.clone()),
            Protocol::Relative => {
                let allowed = allowed?;
                let resolved = self.base_uri?.join(value.trim()).ok()?;
                if allowed.contains(resolved.scheme()) {
                    Some(StrTendril::from_slice(resolved.as_str()))
                } else {
                    None
                }
            }
        }
    }
}

fn lowercase(name: &LocalName) -> LocalName {
    if name.bytes().any(|b| b.is_ascii_uppercase()) {
        LocalName::from(name.to_ascii_lowercase())
    } else {
        name.clone()
    }
}

/// The policy key of an attribute: its local name, qualified with its prefix if it has one
/// (`xlink:href`).
fn attribute_key(name: &QualName) -> LocalName {
    match name.prefix {
        Some(ref prefix) => {
            LocalName::from(format!("{}:{}", prefix, name.local).to_ascii_lowercase())
        }
        None => lowercase(&name.local),
    }
}
