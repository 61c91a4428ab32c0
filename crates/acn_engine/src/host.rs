use std::collections::{HashMap, HashSet};
use std::sync::mpsc;

use acn_core::{NodeId, NodeLiveness, PageGeometry, Rect};
use acn_logging::{acn_debug, acn_trace};
use ego_tree::{NodeRef, Tree};
use scraper::{ElementRef, Html, Node, Selector};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    ChildList,
    CharacterData,
}

/// One change notification, reported against the node whose children or
/// text changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationRecord {
    pub kind: MutationKind,
    pub target: NodeId,
}

/// Receiving end of a subtree-wide mutation subscription.
pub struct MutationSubscription {
    pub id: SubscriptionId,
    pub records: mpsc::Receiver<MutationRecord>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HostError {
    #[error("document has no body yet")]
    NoDocument,
    #[error("node is not part of this document")]
    UnknownNode,
    #[error("node has no parent")]
    Orphan,
}

/// The live page tree as the scanner sees it.
pub trait HostTree {
    fn hostname(&self) -> &str;
    /// `None` until the document has a body.
    fn document(&self) -> Option<&Html>;
    fn subscribe(&mut self) -> MutationSubscription;
    fn unsubscribe(&mut self, id: SubscriptionId);
    /// Tags a node as an extracted message. Observers are not notified.
    fn mark_processed(&mut self, node: NodeId);
    /// Drops marks on nodes that are no longer attached.
    fn prune_marks(&mut self);
    /// Bumped whenever the whole document is swapped. Node ids from an earlier
    /// generation must not be used against the current one.
    fn generation(&self) -> u64;
}

/// Scraper-backed page tree with mutation notifications, a processed-node
/// marker, and a settable layout for active-item tracking.
pub struct HtmlTree {
    hostname: String,
    doc: Option<Html>,
    subscribers: Vec<(SubscriptionId, mpsc::Sender<MutationRecord>)>,
    next_subscription: u64,
    marked: HashSet<NodeId>,
    layout: HashMap<NodeId, Rect>,
    viewport_height: f32,
    scroll_y: f32,
    generation: u64,
}

impl HtmlTree {
    /// A page whose body has not been parsed yet.
    pub fn pending(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            doc: None,
            subscribers: Vec::new(),
            next_subscription: 0,
            marked: HashSet::new(),
            layout: HashMap::new(),
            viewport_height: 0.0,
            scroll_y: 0.0,
            generation: 0,
        }
    }

    pub fn parse(hostname: impl Into<String>, html: &str) -> Self {
        let mut tree = Self::pending(hostname);
        tree.doc = Some(Html::parse_document(html));
        tree
    }

    pub fn is_loaded(&self) -> bool {
        self.doc.is_some()
    }

    /// Swaps in the document parsed from `html` and reports it as one
    /// child-list mutation on the new body. Loads the document if none exists
    /// yet.
    ///
    /// The old arena is dropped with its nodes, so every handle into it goes
    /// stale; [`HostTree::generation`] tells holders to re-resolve them.
    pub fn replace_body(&mut self, html: &str) -> Result<(), HostError> {
        let incoming = Html::parse_document(html);
        let had_document = self.doc.is_some();
        self.doc = Some(incoming);
        self.generation += 1;
        self.marked.clear();
        self.layout.clear();
        if !had_document {
            acn_debug!("host {}: document loaded", self.hostname);
            return Ok(());
        }
        let body = self.body().ok_or(HostError::NoDocument)?;
        acn_debug!("host {}: document swapped, generation {}", self.hostname, self.generation);
        self.notify(MutationKind::ChildList, body);
        Ok(())
    }

    /// Parses `fragment` and appends its top-level nodes to `parent`.
    pub fn append_html(&mut self, parent: NodeId, fragment: &str) -> Result<Vec<NodeId>, HostError> {
        let parsed = Html::parse_fragment(fragment);
        let doc = self.doc.as_mut().ok_or(HostError::NoDocument)?;
        if doc.tree.get(parent).is_none() {
            return Err(HostError::UnknownNode);
        }
        let added: Vec<NodeId> = parsed
            .root_element()
            .children()
            .filter_map(|child| graft(&mut doc.tree, parent, child))
            .collect();
        self.notify(MutationKind::ChildList, parent);
        Ok(added)
    }

    /// Detaches `node` from its parent. The id stays valid but no longer connected.
    pub fn remove(&mut self, node: NodeId) -> Result<(), HostError> {
        let doc = self.doc.as_mut().ok_or(HostError::NoDocument)?;
        let mut target = doc.tree.get_mut(node).ok_or(HostError::UnknownNode)?;
        let parent = target.parent().map(|p| p.id()).ok_or(HostError::Orphan)?;
        target.detach();
        self.notify(MutationKind::ChildList, parent);
        Ok(())
    }

    /// Moves `node` to the end of its parent's children.
    pub fn move_to_end(&mut self, node: NodeId) -> Result<(), HostError> {
        let doc = self.doc.as_mut().ok_or(HostError::NoDocument)?;
        let parent = doc
            .tree
            .get(node)
            .ok_or(HostError::UnknownNode)?
            .parent()
            .map(|p| p.id())
            .ok_or(HostError::Orphan)?;
        if let Some(mut target) = doc.tree.get_mut(node) {
            target.detach();
        }
        if let Some(mut parent_mut) = doc.tree.get_mut(parent) {
            parent_mut.append_id(node);
        }
        self.notify(MutationKind::ChildList, parent);
        Ok(())
    }

    pub fn replace_inner_html(&mut self, node: NodeId, fragment: &str) -> Result<(), HostError> {
        let parsed = Html::parse_fragment(fragment);
        let doc = self.doc.as_mut().ok_or(HostError::NoDocument)?;
        if doc.tree.get(node).is_none() {
            return Err(HostError::UnknownNode);
        }
        detach_children(&mut doc.tree, node);
        for child in parsed.root_element().children() {
            graft(&mut doc.tree, node, child);
        }
        self.notify(MutationKind::ChildList, node);
        Ok(())
    }

    /// Replaces the text content of `node`.
    pub fn set_text(&mut self, node: NodeId, text: &str) -> Result<(), HostError> {
        let escaped = text
            .replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;");
        let parsed = Html::parse_fragment(&escaped);
        let doc = self.doc.as_mut().ok_or(HostError::NoDocument)?;
        if doc.tree.get(node).is_none() {
            return Err(HostError::UnknownNode);
        }
        detach_children(&mut doc.tree, node);
        for child in parsed.root_element().children() {
            graft(&mut doc.tree, node, child);
        }
        self.notify(MutationKind::CharacterData, node);
        Ok(())
    }

    pub fn body(&self) -> Option<NodeId> {
        self.doc.as_ref().and_then(body_id)
    }

    /// Connected elements matching `css`, in document order.
    pub fn select_ids(&self, css: &str) -> Vec<NodeId> {
        let (Some(doc), Ok(selector)) = (self.doc.as_ref(), Selector::parse(css)) else {
            return Vec::new();
        };
        doc.root_element().select(&selector).map(|el| el.id()).collect()
    }

    pub fn is_marked(&self, node: NodeId) -> bool {
        self.marked.contains(&node)
    }

    pub fn element(&self, node: NodeId) -> Option<ElementRef<'_>> {
        self.doc
            .as_ref()
            .and_then(|doc| doc.tree.get(node))
            .and_then(ElementRef::wrap)
    }

    pub fn set_viewport_height(&mut self, height: f32) {
        self.viewport_height = height;
    }

    pub fn scroll_y(&self) -> f32 {
        self.scroll_y
    }

    pub fn set_scroll_y(&mut self, y: f32) {
        self.scroll_y = y.max(0.0);
    }

    /// Document-relative placement of `node`; reported shifted by the scroll offset.
    pub fn set_layout(&mut self, node: NodeId, rect: Rect) {
        self.layout.insert(node, rect);
    }

    pub fn layout_of(&self, node: NodeId) -> Option<Rect> {
        self.layout.get(&node).copied()
    }

    fn notify(&mut self, kind: MutationKind, target: NodeId) {
        let record = MutationRecord { kind, target };
        acn_trace!("host {}: {:?} on {:?}", self.hostname, kind, target);
        self.subscribers.retain(|(_, tx)| tx.send(record).is_ok());
    }
}

impl HostTree for HtmlTree {
    fn hostname(&self) -> &str {
        &self.hostname
    }

    fn document(&self) -> Option<&Html> {
        self.doc.as_ref()
    }

    fn subscribe(&mut self) -> MutationSubscription {
        let (tx, rx) = mpsc::channel();
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, tx));
        MutationSubscription { id, records: rx }
    }

    fn unsubscribe(&mut self, id: SubscriptionId) {
        self.subscribers.retain(|(sub, _)| *sub != id);
    }

    fn mark_processed(&mut self, node: NodeId) {
        self.marked.insert(node);
    }

    fn prune_marks(&mut self) {
        let mut marked = std::mem::take(&mut self.marked);
        marked.retain(|node| self.is_connected(*node));
        self.marked = marked;
    }

    fn generation(&self) -> u64 {
        self.generation
    }
}

impl NodeLiveness for HtmlTree {
    fn is_connected(&self, node: NodeId) -> bool {
        let Some(doc) = self.doc.as_ref() else {
            return false;
        };
        let root = doc.tree.root().id();
        match doc.tree.get(node) {
            Some(found) if found.id() == root => true,
            Some(found) => found.ancestors().last().is_some_and(|top| top.id() == root),
            None => false,
        }
    }
}

impl PageGeometry for HtmlTree {
    fn viewport_height(&self) -> f32 {
        self.viewport_height
    }

    fn element_rect(&self, node: NodeId) -> Option<Rect> {
        self.layout.get(&node).map(|rect| Rect {
            top: rect.top - self.scroll_y,
            bottom: rect.bottom - self.scroll_y,
        })
    }
}

fn body_ref(doc: &Html) -> Option<NodeRef<'_, Node>> {
    doc.root_element()
        .children()
        .find(|child| matches!(child.value(), Node::Element(el) if el.name() == "body"))
}

fn body_id(doc: &Html) -> Option<NodeId> {
    body_ref(doc).map(|body| body.id())
}

fn detach_children(tree: &mut Tree<Node>, parent: NodeId) {
    let children: Vec<NodeId> = match tree.get(parent) {
        Some(node) => node.children().map(|child| child.id()).collect(),
        None => return,
    };
    for child in children {
        if let Some(mut node) = tree.get_mut(child) {
            node.detach();
        }
    }
}

/// Deep-copies `source` (from another tree) under `parent`.
fn graft(tree: &mut Tree<Node>, parent: NodeId, source: NodeRef<'_, Node>) -> Option<NodeId> {
    let id = tree.get_mut(parent)?.append(source.value().clone()).id();
    for child in source.children() {
        graft(tree, id, child);
    }
    Some(id)
}
