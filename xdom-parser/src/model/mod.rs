//! The document tree.
//!
//! An [`Xdom`] is an arena: nodes live in one vector and refer to each other
//! by [`NodeId`]. Children are owned through their parent's child list; the
//! parent link is a plain id used for ancestor walks.
use std::fmt;

use serde::{Serialize, Serializer};

use crate::Error;

mod block;
mod parameters;
mod reference;

pub use block::*;
pub use parameters::*;
pub use reference::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(usize);

impl NodeId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    block: Block,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    #[must_use]
    pub fn block(&self) -> &Block {
        &self.block
    }

    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// A document tree rooted at a [`Block::Document`].
#[derive(Clone, Debug, PartialEq)]
pub struct Xdom {
    nodes: Vec<Node>,
    root: NodeId,
    source: Option<DocumentReference>,
}

impl Default for Xdom {
    fn default() -> Self {
        Self::new()
    }
}

impl Xdom {
    /// An empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::with_root(Block::Document)
    }

    #[must_use]
    pub fn with_root(block: Block) -> Self {
        Self {
            nodes: vec![Node {
                block,
                parent: None,
                children: Vec::new(),
            }],
            root: NodeId(0),
            source: None,
        }
    }

    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The document this tree was read from, if known.
    #[must_use]
    pub fn source(&self) -> Option<&DocumentReference> {
        self.source.as_ref()
    }

    pub fn set_source(&mut self, source: Option<DocumentReference>) {
        self.source = source;
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    #[must_use]
    pub fn block(&self, id: NodeId) -> Option<&Block> {
        self.get(id).map(Node::block)
    }

    pub fn block_mut(&mut self, id: NodeId) -> Option<&mut Block> {
        self.nodes.get_mut(id.0).map(|node| &mut node.block)
    }

    /// Children of `id` in document order; empty for unknown ids.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map_or(&[], Node::children)
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(Node::parent)
    }

    /// Number of nodes reachable from the root.
    #[must_use]
    pub fn len(&self) -> usize {
        1 + self.descendants(self.root).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children(self.root).is_empty()
    }

    /// Walk from the parent of `id` up to the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |current| self.parent(*current))
    }

    /// Every node below `id`, in document (pre-)order.
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut pending: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        std::iter::from_fn(move || {
            let next = pending.pop()?;
            pending.extend(self.children(next).iter().rev().copied());
            Some(next)
        })
    }

    /// Append `block` as the last child of `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownNode`] when `parent` is not part of this tree.
    pub fn append_child(&mut self, parent: NodeId, block: Block) -> Result<NodeId, Error> {
        let id = NodeId(self.nodes.len());
        self.nodes
            .get_mut(parent.0)
            .ok_or(Error::UnknownNode(parent))?
            .children
            .push(id);
        self.nodes.push(Node {
            block,
            parent: Some(parent),
            children: Vec::new(),
        });
        Ok(id)
    }

    /// Move the content of `fragment` (the children of its root) under
    /// `parent`, after any existing children. Returns the ids of the moved
    /// top-level nodes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownNode`] when `parent` is not part of this tree.
    pub fn append_fragment(&mut self, parent: NodeId, fragment: Xdom) -> Result<Vec<NodeId>, Error> {
        if self.get(parent).is_none() {
            return Err(Error::UnknownNode(parent));
        }
        let Xdom {
            nodes, root: top, ..
        } = fragment;
        let mut slots: Vec<Option<Node>> = nodes.into_iter().map(Some).collect();
        let top_children = slots
            .get_mut(top.0)
            .and_then(Option::take)
            .map(|node| node.children)
            .unwrap_or_default();

        let mut moved = Vec::with_capacity(top_children.len());
        let mut pending: Vec<(NodeId, NodeId)> = top_children
            .into_iter()
            .rev()
            .map(|child| (child, parent))
            .collect();
        while let Some((old, new_parent)) = pending.pop() {
            let Some(node) = slots.get_mut(old.0).and_then(Option::take) else {
                continue;
            };
            let id = self.append_child(new_parent, node.block)?;
            if new_parent == parent {
                moved.push(id);
            }
            pending.extend(node.children.into_iter().rev().map(|child| (child, id)));
        }
        Ok(moved)
    }

    /// Create a node with no parent; it stays unreachable until adopted.
    pub(crate) fn push_detached(&mut self, block: Block) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            block,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Append detached nodes to `parent`'s children, in order.
    ///
    /// Each id must come from [`Xdom::push_detached`] and be adopted once.
    pub(crate) fn adopt(&mut self, parent: NodeId, children: &[NodeId]) -> Result<(), Error> {
        if self.get(parent).is_none() {
            return Err(Error::UnknownNode(parent));
        }
        for child in children {
            self.nodes
                .get_mut(child.0)
                .ok_or(Error::UnknownNode(*child))?
                .parent = Some(parent);
        }
        if let Some(node) = self.nodes.get_mut(parent.0) {
            node.children.extend_from_slice(children);
        }
        Ok(())
    }

    /// Owned nested copy of the subtree at `id`.
    #[must_use]
    pub fn tree(&self, id: NodeId) -> Option<BlockTree> {
        let node = self.get(id)?;
        Some(BlockTree {
            block: node.block.clone(),
            children: node
                .children
                .iter()
                .filter_map(|child| self.tree(*child))
                .collect(),
        })
    }
}

impl Serialize for Xdom {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.tree(self.root).serialize(serializer)
    }
}

/// A block with its children inline; handy for comparing shapes and for
/// serialization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BlockTree {
    pub block: Block,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<BlockTree>,
}

impl BlockTree {
    #[must_use]
    pub fn leaf(block: Block) -> Self {
        Self {
            block,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn new(block: Block, children: Vec<BlockTree>) -> Self {
        Self { block, children }
    }

    /// Copy the tree into an arena rooted at this block.
    ///
    /// # Errors
    ///
    /// Only fails if the arena loses track of a node it just created.
    pub fn into_xdom(self) -> Result<Xdom, Error> {
        fn append(xdom: &mut Xdom, parent: NodeId, tree: BlockTree) -> Result<(), Error> {
            let id = xdom.append_child(parent, tree.block)?;
            for child in tree.children {
                append(xdom, id, child)?;
            }
            Ok(())
        }

        let mut xdom = Xdom::with_root(self.block);
        let root = xdom.root();
        for child in self.children {
            append(&mut xdom, root, child)?;
        }
        Ok(xdom)
    }
}
