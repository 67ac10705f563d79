use url::Url;

use crate::arena_dom::{append_text, create_element, Arena, Document, NodeData, Ref};
use crate::error::Error;
use crate::policy::Policy;
use crate::transformer::{Disposition, Transformer};

/// Upper bound on clean, serialize and re-parse rounds in [`Cleaner::clean_body_html`].
const MAX_PASSES: usize = 4;

/// Copies the policy-conformant part of a tree into a fresh one, or checks that nothing would be
/// lost by doing so. The source tree is never modified.
pub struct Cleaner<'p> {
    policy: &'p Policy,
}

impl<'p> Cleaner<'p> {
    pub fn new(policy: &'p Policy) -> Self {
        Cleaner { policy }
    }

    /// Builds a clean document of the same kind as `dirty`. Only body content is copied: the head,
    /// doctype and anything outside the body are left behind.
    pub fn clean<'arena>(&self, arena: Arena<'arena>, dirty: &Document<'_>) -> Document<'arena> {
        let clean = Document::shell(arena, dirty.kind(), dirty.base_uri().cloned());
        if let (Some(source), Some(dest)) = (dirty.body(), clean.body()) {
            let discarded =
                self.copy_safe_nodes(Some(arena), source, dirty.base_uri(), Some(dest));
            debug!("cleaned document, discarded {} nodes or attributes", discarded);
        }
        clean
    }

    /// Whether `document` already conforms: its head is empty and cleaning its body would not
    /// drop or rewrite anything. Enforced attributes that are merely missing do not count.
    pub fn is_valid(&self, document: &Document<'_>) -> Result<bool, Error> {
        let (head, body) = match (document.head(), document.body()) {
            (Some(head), Some(body)) => (head, body),
            _ => {
                return Err(Error::invalid_argument(
                    "document to validate has no head or body",
                ))
            }
        };

        if head.children().any(|child| !child.is_whitespace_text()) {
            debug!("document head is not empty");
            return Ok(false);
        }
        Ok(self.inspect(body, document.base_uri()) == 0)
    }

    /// Parses `body_html` as the content of a `body` element, cleans it and serializes the
    /// result.
    ///
    /// Unwrapping can leave nestings the tree builder never produces (`<a>` in `<a>`, `<li>` in
    /// `<li>`), which a browser re-parses into a different tree. The output is therefore
    /// re-parsed and cleaned again until it no longer changes.
    pub fn clean_body_html(
        &self,
        body_html: &str,
        base_uri: Option<&str>,
    ) -> Result<String, Error> {
        if body_html.is_empty() {
            return Ok(String::new());
        }
        let mut cleaned = self.clean_body_html_once(body_html, base_uri)?;
        for _ in 1..MAX_PASSES {
            let again = self.clean_body_html_once(&cleaned, base_uri)?;
            if again == cleaned {
                return Ok(cleaned);
            }
            trace!("output changed after re-parsing, cleaning again");
            cleaned = again;
        }
        debug!("output still changing after {} passes", MAX_PASSES);
        Ok(cleaned)
    }

    fn clean_body_html_once(
        &self,
        body_html: &str,
        base_uri: Option<&str>,
    ) -> Result<String, Error> {
        let arena = typed_arena::Arena::new();
        let dirty = Document::parse_body_fragment(&arena, body_html, base_uri);
        let clean = self.clean(&arena, &dirty);
        clean.to_html()
    }

    /// Like [`Cleaner::is_valid`] for body content, but any parse error also makes the markup
    /// invalid (a stray `</div>`, an `<html>` wrapper).
    pub fn is_valid_body_html(&self, body_html: &str) -> bool {
        let arena = typed_arena::Arena::new();
        let dirty = Document::parse_body_fragment(&arena, body_html, None);
        if !dirty.errors().is_empty() {
            debug!("body html has parse errors: {:?}", dirty.errors());
            return false;
        }
        match dirty.body() {
            Some(body) => self.inspect(body, None) == 0,
            None => true,
        }
    }

    /// Number of nodes or attributes cleaning `source` would discard, stopping at the first one.
    fn inspect(&self, source: Ref<'_>, base_uri: Option<&Url>) -> usize {
        self.copy_safe_nodes(None, source, base_uri, None)
    }

    /// Walks the children of `source` depth first and copies what the policy allows under `dest`.
    /// Without a destination nothing is allocated and the walk ends at the first discard.
    /// Returns the number of discarded nodes and attributes.
    fn copy_safe_nodes<'s, 'arena>(
        &self,
        arena: Option<Arena<'arena>>,
        source: Ref<'s>,
        base_uri: Option<&Url>,
        dest: Option<Ref<'arena>>,
    ) -> usize {
        let transformer = Transformer::new(self.policy, base_uri);
        let inspecting = arena.is_none() || dest.is_none();
        let mut discarded = 0;
        let mut stack: Vec<(Ref<'s>, Option<Ref<'arena>>)> = vec![];
        push_children(&mut stack, source, dest);

        while let Some((node, parent)) = stack.pop() {
            match transformer.disposition(node) {
                Disposition::Keep => match node.data {
                    NodeData::Text { ref contents } => {
                        if let (Some(arena), Some(parent)) = (arena, parent) {
                            append_text(arena, parent, &contents.borrow());
                        }
                    }
                    NodeData::Element {
                        ref name,
                        ref attrs,
                        ..
                    } => {
                        let safe = transformer.safe_element(name, &attrs.borrow());
                        discarded += safe.discarded;
                        let copy = match (arena, parent) {
                            (Some(arena), Some(parent)) => {
                                let element = create_element(arena, safe.name, safe.attrs);
                                parent.append(element);
                                Some(element)
                            }
                            _ => None,
                        };
                        push_children(&mut stack, node, copy);
                    }
                    _ => {}
                },
                Disposition::Unwrap => {
                    trace!("unwrapping {}", node);
                    discarded += 1;
                    push_children(&mut stack, node, parent);
                }
                Disposition::Remove => {
                    trace!("removing {}", node);
                    discarded += 1;
                }
            }

            if inspecting && discarded > 0 {
                break;
            }
        }
        discarded
    }
}

/// Pushes the children of `node` so that they pop off in document order.
fn push_children<'s, 'arena>(
    stack: &mut Vec<(Ref<'s>, Option<Ref<'arena>>)>,
    node: Ref<'s>,
    parent: Option<Ref<'arena>>,
) {
    let mut child = node.last_child.get();
    while let Some(current) = child {
        stack.push((current, parent));
        child = current.previous_sibling.get();
    }
}
