//! Hiding the descendants of collapsed layout nodes.
//!
//! Descendants are found by a breadth-first walk over the layout's drawn
//! edges, so they follow exactly what the editor shows. A collapsed node stays
//! visible unless it is itself a descendant of a collapsed node (including
//! itself, through a cycle).

use std::collections::{BTreeSet, HashMap, VecDeque};

use crate::layout::TreeLayout;

/// Ids of every node below any node in `collapsed`.
pub fn hidden_nodes<'a, I>(layout: &TreeLayout, collapsed: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in &layout.edges {
        children
            .entry(edge.from.as_str())
            .or_default()
            .push(edge.to.as_str());
    }

    let mut hidden = BTreeSet::new();
    for root in collapsed {
        let mut queue: VecDeque<&str> = children.get(root).into_iter().flatten().copied().collect();
        while let Some(id) = queue.pop_front() {
            if hidden.insert(id.to_owned()) {
                queue.extend(children.get(id).into_iter().flatten().copied());
            }
        }
    }
    hidden
}

/// A copy of `layout` without hidden nodes and without edges touching them.
///
/// Positions, orphans and canvas size are kept so the view does not jump when
/// a subtree is toggled.
pub fn collapse<'a, I>(layout: &TreeLayout, collapsed: I) -> TreeLayout
where
    I: IntoIterator<Item = &'a str>,
{
    let hidden = hidden_nodes(layout, collapsed);
    TreeLayout {
        nodes: layout
            .nodes
            .iter()
            .filter(|n| !hidden.contains(&n.id))
            .cloned()
            .collect(),
        edges: layout
            .edges
            .iter()
            .filter(|e| !hidden.contains(&e.from) && !hidden.contains(&e.to))
            .cloned()
            .collect(),
        orphans: layout.orphans.clone(),
        canvas_width: layout.canvas_width,
        canvas_height: layout.canvas_height,
    }
}
