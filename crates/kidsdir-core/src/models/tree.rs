//! Parent-linked records arranged as a forest.
//!
//! Categories and geographic areas arrive as flat lists where each record
//! names its parent. The backend enforces referential integrity, but a
//! manager-scoped or filtered listing can still hand us records whose
//! parent is missing, so orphans become roots. Cycles are broken at the
//! first record visited.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::Serialize;

/// A record that knows its own id, its parent and its sibling order.
pub trait TreeRecord {
    fn id(&self) -> &str;
    fn parent_id(&self) -> Option<&str>;
    fn display_order(&self) -> i32;
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode<T> {
    pub item: T,
    pub children: Vec<TreeNode<T>>,
}

impl<T> TreeNode<T> {
    /// Depth-first walk yielding each item with its depth (roots are 0).
    pub fn walk(&self) -> Vec<(usize, &T)> {
        let mut out = Vec::new();
        self.walk_into(0, &mut out);
        out
    }

    fn walk_into<'a>(&'a self, depth: usize, out: &mut Vec<(usize, &'a T)>) {
        out.push((depth, &self.item));
        for child in &self.children {
            child.walk_into(depth + 1, out);
        }
    }

    pub fn len(&self) -> usize {
        1 + self.children.iter().map(|c| c.len()).sum::<usize>()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Arrange flat records into a sorted forest.
pub fn build_tree<T: TreeRecord + Clone>(items: &[T]) -> Vec<TreeNode<T>> {
    let ids: HashSet<&str> = items.iter().map(|i| i.id()).collect();
    let mut children: HashMap<&str, Vec<&T>> = HashMap::new();
    let mut roots: Vec<&T> = Vec::new();

    for item in items {
        match item.parent_id() {
            Some(parent) if parent != item.id() && ids.contains(parent) => {
                children.entry(parent).or_default().push(item);
            }
            _ => roots.push(item),
        }
    }

    let mut visited = HashSet::new();
    let mut forest: Vec<TreeNode<T>> = roots
        .into_iter()
        .filter_map(|root| attach(root, &children, &mut visited))
        .collect();

    // Whatever is still unvisited hangs off a cycle
    for item in items {
        if !visited.contains(item.id()) {
            if let Some(node) = attach(item, &children, &mut visited) {
                forest.push(node);
            }
        }
    }

    sort_nodes(&mut forest);
    forest
}

fn attach<'a, T: TreeRecord + Clone>(
    item: &'a T,
    children: &HashMap<&'a str, Vec<&'a T>>,
    visited: &mut HashSet<&'a str>,
) -> Option<TreeNode<T>> {
    if !visited.insert(item.id()) {
        return None;
    }
    let kids = match children.get(item.id()) {
        Some(kids) => kids
            .iter()
            .filter_map(|kid| attach(*kid, children, visited))
            .collect(),
        None => Vec::new(),
    };
    Some(TreeNode {
        item: item.clone(),
        children: kids,
    })
}

fn sort_nodes<T: TreeRecord>(nodes: &mut [TreeNode<T>]) {
    nodes.sort_by(|a, b| {
        a.item
            .display_order()
            .cmp(&b.item.display_order())
            .then_with(|| crate::utils::cmp_ignore_case(a.item.name(), b.item.name()))
    });
    for node in nodes.iter_mut() {
        sort_nodes(&mut node.children);
    }
}

/// Parent chain of `id`, nearest first. Stops on a missing parent or a cycle.
pub fn ancestors<'a, T: TreeRecord>(items: &'a [T], id: &str) -> Vec<&'a T> {
    let by_id: HashMap<&str, &T> = items.iter().map(|i| (i.id(), i)).collect();
    let mut out = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    seen.insert(id);

    let mut current = by_id.get(id).and_then(|i| i.parent_id());
    while let Some(parent_id) = current {
        if !seen.insert(parent_id) {
            break;
        }
        match by_id.get(parent_id) {
            Some(parent) => {
                out.push(*parent);
                current = parent.parent_id();
            }
            None => break,
        }
    }
    out
}

/// `id` plus every record below it, breadth first.
pub fn descendant_ids<T: TreeRecord>(items: &[T], id: &str) -> Vec<String> {
    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
    for item in items {
        if let Some(parent) = item.parent_id() {
            children.entry(parent).or_default().push(item.id());
        }
    }

    let mut out = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = VecDeque::new();
    queue.push_back(id);
    while let Some(next) = queue.pop_front() {
        if !seen.insert(next) {
            continue;
        }
        out.push(next.to_string());
        if let Some(kids) = children.get(next) {
            queue.extend(kids.iter().copied());
        }
    }
    out
}
