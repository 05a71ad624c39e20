//! The fork tree: every accepted block, adopted or not.
//!
//! Stored as a flat arena `hash -> {block, child hashes}` rather than a
//! pointer tree. The parent of a node is found through its block's
//! `prev_hash`, so walks in either direction are plain map lookups and
//! traversals are iterative.
//!
//! Nodes are never removed. Losing forks stay around so a later block can
//! still extend them and trigger a reorganization.

use std::collections::HashMap;

use murmur_core::{Block, BlockHash};

use crate::error::{LedgerError, Result};

#[derive(Debug, Clone)]
struct ForkNode {
    block: Block,
    /// Child hashes in insertion order.
    children: Vec<BlockHash>,
}

/// Rooted multiway tree of proof-of-work blocks.
#[derive(Debug, Default)]
pub struct ForkTree {
    nodes: HashMap<BlockHash, ForkNode>,
    root: Option<BlockHash>,
}

impl ForkTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a block.
    ///
    /// The first block ever inserted becomes the root regardless of its
    /// `prev_hash`. Every later block must have valid proof-of-work and a
    /// parent somewhere in the tree (not necessarily on the longest fork).
    /// Orphans are rejected, not buffered.
    pub fn insert(&mut self, block: Block) -> Result<BlockHash> {
        let hash = block.hash();

        // 1. Proof-of-work
        if !block.has_valid_pow() {
            return Err(LedgerError::InvalidProofOfWork(hash));
        }

        // 2. Idempotence
        if self.nodes.contains_key(&hash) {
            return Err(LedgerError::DuplicateBlock(hash));
        }

        // 3. Root
        if self.root.is_none() {
            self.root = Some(hash);
            self.nodes.insert(
                hash,
                ForkNode {
                    block,
                    children: Vec::new(),
                },
            );
            return Ok(hash);
        }

        // 4. Parent anywhere in the tree
        let parent = self
            .nodes
            .get_mut(&block.prev_hash)
            .ok_or(LedgerError::UnknownParent(block.prev_hash))?;
        parent.children.push(hash);

        self.nodes.insert(
            hash,
            ForkNode {
                block,
                children: Vec::new(),
            },
        );
        Ok(hash)
    }

    /// Route (root first) to the deepest block in the tree.
    ///
    /// Ties between equally deep tips go to the one reached first by a
    /// depth-first walk over children in insertion order, which is stable
    /// for the lifetime of the tree.
    pub fn longest_fork(&self) -> Vec<BlockHash> {
        let root = match self.root {
            Some(root) => root,
            None => return Vec::new(),
        };

        let mut best = (1usize, root);
        let mut stack = vec![(root, 1usize)];

        while let Some((hash, depth)) = stack.pop() {
            let Some(node) = self.nodes.get(&hash) else {
                continue;
            };
            if depth > best.0 {
                best = (depth, hash);
            }
            // Reverse so the first child is visited first.
            for child in node.children.iter().rev() {
                stack.push((*child, depth + 1));
            }
        }

        self.route_to(&best.1).unwrap_or_default()
    }

    /// Route (root first) to `hash`, or `None` if not in the tree.
    pub fn route_to(&self, hash: &BlockHash) -> Option<Vec<BlockHash>> {
        let root = self.root?;
        if !self.nodes.contains_key(hash) {
            return None;
        }

        let mut route = Vec::new();
        let mut current = *hash;
        loop {
            route.push(current);
            if current == root {
                break;
            }
            current = self.nodes.get(&current)?.block.prev_hash;
        }
        route.reverse();
        Some(route)
    }

    /// Blocks along a route, in route order. Unknown hashes are skipped.
    pub fn blocks_on(&self, route: &[BlockHash]) -> Vec<Block> {
        route
            .iter()
            .filter_map(|h| self.nodes.get(h).map(|n| n.block.clone()))
            .collect()
    }

    /// True if any block along `route` claims `name`.
    pub fn file_name_on_route(&self, name: &str, route: &[BlockHash]) -> bool {
        route
            .iter()
            .filter_map(|h| self.nodes.get(h))
            .any(|n| n.block.contains_file_name(name))
    }

    pub fn get(&self, hash: &BlockHash) -> Option<&Block> {
        self.nodes.get(hash).map(|n| &n.block)
    }

    pub fn contains(&self, hash: &BlockHash) -> bool {
        self.nodes.contains_key(hash)
    }

    pub fn children(&self, hash: &BlockHash) -> &[BlockHash] {
        self.nodes
            .get(hash)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn root(&self) -> Option<BlockHash> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
