// Majority of the node and sink code in this file is from the html5ever project.
// https://github.com/servo/html5ever/blob/45b2fca5c6/html5ever/examples/arena.rs
//
// Copyright 2014-2017 The html5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::io;
use std::ptr;

use html5ever::interface::tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::serialize::{serialize, Serialize, SerializeOpts, Serializer, TraversalScope};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{parse_document, parse_fragment, Attribute, LocalName, ParseOpts, QualName};
use url::Url;

use crate::error::Error;

pub type Arena<'arena> = &'arena typed_arena::Arena<Node<'arena>>;

pub type Ref<'arena> = &'arena Node<'arena>;

pub type Link<'arena> = Cell<Option<Ref<'arena>>>;

pub fn create_element<'arena>(
    arena: Arena<'arena>,
    name: QualName,
    attrs: Vec<Attribute>,
) -> Ref<'arena> {
    arena.alloc(Node::new(NodeData::Element {
        name,
        attrs: RefCell::new(attrs),
        template_contents: None,
        mathml_annotation_xml_integration_point: false,
    }))
}

fn create_html_element<'arena>(arena: Arena<'arena>, local: LocalName) -> Ref<'arena> {
    create_element(arena, QualName::new(None, ns!(html), local), vec![])
}

/// Appends `text` to `parent`, merging it into the last child if that is already a text node.
pub fn append_text<'arena>(arena: Arena<'arena>, parent: Ref<'arena>, text: &StrTendril) {
    if let Some(&Node {
        data: NodeData::Text { ref contents },
        ..
    }) = parent.last_child.get()
    {
        contents.borrow_mut().push_tendril(text);
        return;
    }
    parent.append(arena.alloc(Node::new(NodeData::Text {
        contents: RefCell::new(text.clone()),
    })));
}

pub struct Sink<'arena> {
    pub arena: Arena<'arena>,
    pub document: Ref<'arena>,
    pub errors: RefCell<Vec<Cow<'static, str>>>,
}

/// Output of a parse: the document node plus every error the tree builder reported.
pub struct Parsed<'arena> {
    pub root: Ref<'arena>,
    pub errors: Vec<Cow<'static, str>>,
}

pub struct Node<'arena> {
    pub parent: Link<'arena>,
    pub next_sibling: Link<'arena>,
    pub previous_sibling: Link<'arena>,
    pub first_child: Link<'arena>,
    pub last_child: Link<'arena>,
    pub data: NodeData<'arena>,
}

pub enum NodeData<'arena> {
    Document,
    Doctype {
        name: StrTendril,
        public_id: StrTendril,
        system_id: StrTendril,
    },
    Text {
        contents: RefCell<StrTendril>,
    },
    Comment {
        contents: StrTendril,
    },
    Element {
        name: QualName,
        attrs: RefCell<Vec<Attribute>>,
        template_contents: Option<Ref<'arena>>,
        mathml_annotation_xml_integration_point: bool,
    },
    ProcessingInstruction {
        target: StrTendril,
        contents: StrTendril,
    },
}

impl<'arena> Node<'arena> {
    pub fn new(data: NodeData<'arena>) -> Self {
        Node {
            parent: Cell::new(None),
            previous_sibling: Cell::new(None),
            next_sibling: Cell::new(None),
            first_child: Cell::new(None),
            last_child: Cell::new(None),
            data,
        }
    }

    pub fn children(&self) -> Children<'arena> {
        Children {
            next: self.first_child.get(),
        }
    }

    /// First child element in the HTML namespace with the given local name.
    pub fn child_element(&self, local: &LocalName) -> Option<Ref<'arena>> {
        self.children().find(|child| match child.data {
            NodeData::Element { ref name, .. } => name.ns == ns!(html) && name.local == *local,
            _ => false,
        })
    }

    pub fn is_whitespace_text(&self) -> bool {
        match self.data {
            NodeData::Text { ref contents } => contents.borrow().trim().is_empty(),
            _ => false,
        }
    }

    pub fn detach(&self) {
        let parent = self.parent.take();
        let previous_sibling = self.previous_sibling.take();
        let next_sibling = self.next_sibling.take();

        if let Some(next_sibling) = next_sibling {
            next_sibling.previous_sibling.set(previous_sibling);
        } else if let Some(parent) = parent {
            parent.last_child.set(previous_sibling);
        }

        if let Some(previous_sibling) = previous_sibling {
            previous_sibling.next_sibling.set(next_sibling);
        } else if let Some(parent) = parent {
            parent.first_child.set(next_sibling);
        }
    }

    pub fn append(&'arena self, new_child: &'arena Self) {
        new_child.detach();
        new_child.parent.set(Some(self));
        if let Some(last_child) = self.last_child.take() {
            new_child.previous_sibling.set(Some(last_child));
            debug_assert!(last_child.next_sibling.get().is_none());
            last_child.next_sibling.set(Some(new_child));
        } else {
            debug_assert!(self.first_child.get().is_none());
            self.first_child.set(Some(new_child));
        }
        self.last_child.set(Some(new_child));
    }

    pub fn insert_before(&'arena self, new_sibling: &'arena Self) {
        new_sibling.detach();
        new_sibling.parent.set(self.parent.get());
        new_sibling.next_sibling.set(Some(self));
        if let Some(previous_sibling) = self.previous_sibling.take() {
            new_sibling.previous_sibling.set(Some(previous_sibling));
            debug_assert!(ptr::eq::<Node>(
                previous_sibling.next_sibling.get().unwrap(),
                self
            ));
            previous_sibling.next_sibling.set(Some(new_sibling));
        } else if let Some(parent) = self.parent.get() {
            debug_assert!(ptr::eq::<Node>(parent.first_child.get().unwrap(), self));
            parent.first_child.set(Some(new_sibling));
        }
        self.previous_sibling.set(Some(new_sibling));
    }
}

pub struct Children<'arena> {
    next: Option<Ref<'arena>>,
}

impl<'arena> Iterator for Children<'arena> {
    type Item = Ref<'arena>;

    fn next(&mut self) -> Option<Ref<'arena>> {
        let node = self.next?;
        self.next = node.next_sibling.get();
        Some(node)
    }
}

impl<'arena> fmt::Display for Node<'arena> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.data)
    }
}

impl<'arena> fmt::Display for NodeData<'arena> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeData::Document => write!(f, "Document"),
            NodeData::Doctype { name, .. } => write!(f, "Doctype: {}", name),
            NodeData::Text { contents } => write!(
                f,
                "Text: {}...",
                &contents.borrow().chars().take(10).collect::<String>()
            ),
            NodeData::ProcessingInstruction { .. } => write!(f, "ProcessingInstruction: ..."),
            NodeData::Comment { contents } => write!(
                f,
                "Comment: {}...",
                &contents.chars().take(10).collect::<String>()
            ),
            NodeData::Element { ref name, .. } => write!(f, "Element: {}", &name.local),
        }
    }
}

impl<'arena> Sink<'arena> {
    pub fn new(arena: Arena<'arena>) -> Self {
        Sink {
            arena,
            document: arena.alloc(Node::new(NodeData::Document)),
            errors: RefCell::new(vec![]),
        }
    }

    fn new_node(&self, data: NodeData<'arena>) -> Ref<'arena> {
        self.arena.alloc(Node::new(data))
    }

    fn append_common<P, A>(&self, child: NodeOrText<Ref<'arena>>, previous: P, append: A)
    where
        P: FnOnce() -> Option<Ref<'arena>>,
        A: FnOnce(Ref<'arena>),
    {
        let new_node = match child {
            NodeOrText::AppendText(text) => {
                // Append to an existing Text node if we have one.
                if let Some(&Node {
                    data: NodeData::Text { ref contents },
                    ..
                }) = previous()
                {
                    contents.borrow_mut().push_tendril(&text);
                    return;
                }
                self.new_node(NodeData::Text {
                    contents: RefCell::new(text),
                })
            }
            NodeOrText::AppendNode(node) => node,
        };

        append(new_node)
    }
}

impl<'arena> TreeSink for Sink<'arena> {
    type Handle = Ref<'arena>;
    type Output = Parsed<'arena>;
    type ElemName<'a>
        = &'a QualName
    where
        Self: 'a;

    fn finish(self) -> Parsed<'arena> {
        Parsed {
            root: self.document,
            errors: self.errors.into_inner(),
        }
    }

    fn parse_error(&self, msg: Cow<'static, str>) {
        self.errors.borrow_mut().push(msg);
    }

    fn get_document(&self) -> Ref<'arena> {
        self.document
    }

    fn set_quirks_mode(&self, _mode: QuirksMode) {}

    fn same_node(&self, x: &Ref<'arena>, y: &Ref<'arena>) -> bool {
        ptr::eq::<Node>(*x, *y)
    }

    fn elem_name(&self, target: &Ref<'arena>) -> Self::ElemName<'_> {
        match target.data {
            NodeData::Element { ref name, .. } => name,
            _ => panic!("not an element!"),
        }
    }

    fn get_template_contents(&self, target: &Ref<'arena>) -> Ref<'arena> {
        if let NodeData::Element {
            template_contents: Some(contents),
            ..
        } = target.data
        {
            contents
        } else {
            panic!("not a template element!")
        }
    }

    fn is_mathml_annotation_xml_integration_point(&self, target: &Ref<'arena>) -> bool {
        if let NodeData::Element {
            mathml_annotation_xml_integration_point,
            ..
        } = target.data
        {
            mathml_annotation_xml_integration_point
        } else {
            panic!("not an element!")
        }
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<Attribute>,
        flags: ElementFlags,
    ) -> Ref<'arena> {
        self.new_node(NodeData::Element {
            name,
            attrs: RefCell::new(attrs),
            template_contents: if flags.template {
                Some(self.new_node(NodeData::Document))
            } else {
                None
            },
            mathml_annotation_xml_integration_point: flags.mathml_annotation_xml_integration_point,
        })
    }

    fn create_comment(&self, text: StrTendril) -> Ref<'arena> {
        self.new_node(NodeData::Comment { contents: text })
    }

    fn create_pi(&self, target: StrTendril, data: StrTendril) -> Ref<'arena> {
        self.new_node(NodeData::ProcessingInstruction {
            target,
            contents: data,
        })
    }

    fn append(&self, parent: &Ref<'arena>, child: NodeOrText<Ref<'arena>>) {
        self.append_common(
            child,
            || parent.last_child.get(),
            |new_node| parent.append(new_node),
        )
    }

    fn append_before_sibling(&self, sibling: &Ref<'arena>, child: NodeOrText<Ref<'arena>>) {
        self.append_common(
            child,
            || sibling.previous_sibling.get(),
            |new_node| sibling.insert_before(new_node),
        )
    }

    fn append_based_on_parent_node(
        &self,
        element: &Ref<'arena>,
        prev_element: &Ref<'arena>,
        child: NodeOrText<Ref<'arena>>,
    ) {
        if element.parent.get().is_some() {
            self.append_before_sibling(element, child)
        } else {
            self.append(prev_element, child)
        }
    }

    fn append_doctype_to_document(
        &self,
        name: StrTendril,
        public_id: StrTendril,
        system_id: StrTendril,
    ) {
        self.document.append(self.new_node(NodeData::Doctype {
            name,
            public_id,
            system_id,
        }))
    }

    fn add_attrs_if_missing(&self, target: &Ref<'arena>, attrs: Vec<Attribute>) {
        let mut existing = if let NodeData::Element { ref attrs, .. } = target.data {
            attrs.borrow_mut()
        } else {
            panic!("not an element")
        };

        let existing_names = existing
            .iter()
            .map(|e| e.name.clone())
            .collect::<HashSet<_>>();
        existing.extend(
            attrs
                .into_iter()
                .filter(|attr| !existing_names.contains(&attr.name)),
        );
    }

    fn remove_from_parent(&self, target: &Ref<'arena>) {
        target.detach()
    }

    fn reparent_children(&self, node: &Ref<'arena>, new_parent: &Ref<'arena>) {
        let mut next_child = node.first_child.get();
        while let Some(child) = next_child {
            debug_assert!(ptr::eq::<Node>(child.parent.get().unwrap(), *node));
            next_child = child.next_sibling.get();
            new_parent.append(child)
        }
    }
}

enum SerializeOp<'arena> {
    Open(Ref<'arena>),
    Close(QualName),
}

// Implementation adapted from implementation for RcDom:
// https://github.com/servo/html5ever/blob/45b2fca5c6/markup5ever/rcdom.rs#L410
// Walks an explicit queue instead of recursing so deep trees cannot exhaust the stack.
impl Serialize for Ref<'_> {
    fn serialize<S>(&self, serializer: &mut S, traversal_scope: TraversalScope) -> io::Result<()>
    where
        S: Serializer,
    {
        let mut ops = VecDeque::new();
        match traversal_scope {
            TraversalScope::IncludeNode => ops.push_back(SerializeOp::Open(*self)),
            TraversalScope::ChildrenOnly(_) => {
                ops.extend(self.children().map(SerializeOp::Open));
            }
        }

        while let Some(op) = ops.pop_front() {
            match op {
                SerializeOp::Open(handle) => match handle.data {
                    NodeData::Element {
                        ref name,
                        ref attrs,
                        ..
                    } => {
                        serializer.start_elem(
                            name.clone(),
                            attrs.borrow().iter().map(|at| (&at.name, &at.value[..])),
                        )?;

                        ops.push_front(SerializeOp::Close(name.clone()));

                        let mut child_iter = handle.last_child.get();
                        while let Some(child) = child_iter {
                            child_iter = child.previous_sibling.get();
                            ops.push_front(SerializeOp::Open(child));
                        }
                    }

                    NodeData::Doctype { ref name, .. } => serializer.write_doctype(name)?,

                    NodeData::Text { ref contents } => serializer.write_text(&contents.borrow())?,

                    NodeData::Comment { ref contents } => serializer.write_comment(contents)?,

                    NodeData::ProcessingInstruction {
                        ref target,
                        ref contents,
                    } => serializer.write_processing_instruction(target, contents)?,

                    NodeData::Document => {
                        return Err(io::Error::new(
                            io::ErrorKind::Other,
                            "Can't serialize Document node itself",
                        ));
                    }
                },

                SerializeOp::Close(name) => serializer.end_elem(name)?,
            }
        }

        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentKind {
    /// A complete document with `html`, `head` and `body` elements.
    Full,
    /// Markup parsed in the context of a `body` element. Its nodes hang off a single `html` root.
    BodyFragment,
}

/// A parsed (or freshly built) tree together with the context it was parsed in.
pub struct Document<'arena> {
    root: Ref<'arena>,
    kind: DocumentKind,
    base_uri: Option<Url>,
    errors: Vec<Cow<'static, str>>,
}

impl<'arena> Document<'arena> {
    pub fn parse(arena: Arena<'arena>, html: &str, base_uri: Option<&str>) -> Self {
        let parsed = parse_document(Sink::new(arena), ParseOpts::default()).one(html);
        Document {
            root: parsed.root,
            kind: DocumentKind::Full,
            base_uri: parse_base_uri(base_uri),
            errors: parsed.errors,
        }
    }

    pub fn parse_body_fragment(arena: Arena<'arena>, html: &str, base_uri: Option<&str>) -> Self {
        let parsed = parse_fragment(
            Sink::new(arena),
            ParseOpts::default(),
            QualName::new(None, ns!(html), local_name!("body")),
            vec![],
        )
        .one(html);
        Document {
            root: parsed.root,
            kind: DocumentKind::BodyFragment,
            base_uri: parse_base_uri(base_uri),
            errors: parsed.errors,
        }
    }

    /// An empty document of the given kind: `html`, `head` and `body` for a full document, a bare
    /// `html` root for a body fragment.
    pub fn shell(arena: Arena<'arena>, kind: DocumentKind, base_uri: Option<Url>) -> Self {
        let root = arena.alloc(Node::new(NodeData::Document));
        let html = create_html_element(arena, local_name!("html"));
        root.append(html);
        if kind == DocumentKind::Full {
            html.append(create_html_element(arena, local_name!("head")));
            html.append(create_html_element(arena, local_name!("body")));
        }
        Document {
            root,
            kind,
            base_uri,
            errors: vec![],
        }
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn base_uri(&self) -> Option<&Url> {
        self.base_uri.as_ref()
    }

    pub fn errors(&self) -> &[Cow<'static, str>] {
        &self.errors
    }

    fn html(&self) -> Option<Ref<'arena>> {
        self.root.child_element(&local_name!("html"))
    }

    /// The `head` element. Body fragments have none.
    pub fn head(&self) -> Option<Ref<'arena>> {
        match self.kind {
            DocumentKind::Full => self.html()?.child_element(&local_name!("head")),
            DocumentKind::BodyFragment => None,
        }
    }

    /// The node whose children are the body content: the `body` element of a full document, or the
    /// `html` root of a body fragment.
    pub fn body(&self) -> Option<Ref<'arena>> {
        match self.kind {
            DocumentKind::Full => self.html()?.child_element(&local_name!("body")),
            DocumentKind::BodyFragment => self.html(),
        }
    }

    /// Serializes the whole document, or only the content of a body fragment.
    pub fn to_html(&self) -> Result<String, Error> {
        let scope = match self.kind {
            DocumentKind::Full => self.root,
            DocumentKind::BodyFragment => self.body().unwrap_or(self.root),
        };
        let mut output = vec![];
        serialize(
            &mut output,
            &scope,
            SerializeOpts {
                traversal_scope: TraversalScope::ChildrenOnly(None),
                ..Default::default()
            },
        )?;
        String::from_utf8(output)
            .map_err(|err| Error::Io(io::Error::new(io::ErrorKind::InvalidData, err)))
    }
}

fn parse_base_uri(base_uri: Option<&str>) -> Option<Url> {
    let base_uri = base_uri.map(str::trim).filter(|uri| !uri.is_empty())?;
    match Url::parse(base_uri) {
        Ok(url) => Some(url),
        Err(err) => {
            debug!("ignoring unusable base uri {:?}: {}", base_uri, err);
            None
        }
    }
}
