//! Embedded-template graph traversal.
//!
//! Visits a template and its embedded sub-templates in BFS (level order,
//! root first) or DFS (children before their parent) order. Traversal keeps
//! a visited-name set: revisiting a name means the graph loops back on
//! itself and fails instead of hanging.

use std::collections::{HashSet, VecDeque};

use entforge_domain::EntityTemplate;

use crate::error::BuildError;

/// Traversal order over the embedded-template tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraversalOrder {
    /// Breadth-first: root first, then level by level.
    #[default]
    Bfs,
    /// Depth-first with children visited before their parent, so leaves
    /// come out before anything that embeds them.
    Dfs,
}

/// Single-use iterator over a template's embedded-template tree.
pub struct TemplateGraphIterator<'a> {
    root: &'a EntityTemplate,
    order: TraversalOrder,
}

impl<'a> TemplateGraphIterator<'a> {
    pub fn new(root: &'a EntityTemplate, order: TraversalOrder) -> Self {
        Self { root, order }
    }

    /// Traverses the graph, applying `visit` to every template including
    /// the root.
    pub fn traverse<V>(&self, mut visit: V) -> Result<(), BuildError>
    where
        V: FnMut(&EntityTemplate),
    {
        let mut visited = HashSet::new();
        match self.order {
            TraversalOrder::Bfs => self.traverse_bfs(&mut visit, &mut visited),
            TraversalOrder::Dfs => self.traverse_dfs(self.root, &mut visit, &mut visited),
        }
    }

    /// Collects visited template names in traversal order. Convenience for
    /// callers (and tests) that only need the ordering.
    pub fn names(&self) -> Result<Vec<String>, BuildError> {
        let mut names = Vec::new();
        self.traverse(|template| {
            names.push(template.name().unwrap_or_default().to_string());
        })?;
        Ok(names)
    }

    fn traverse_bfs<V>(
        &self,
        visit: &mut V,
        visited: &mut HashSet<String>,
    ) -> Result<(), BuildError>
    where
        V: FnMut(&EntityTemplate),
    {
        let mut queue = VecDeque::new();
        queue.push_back(self.root);

        while let Some(current) = queue.pop_front() {
            mark_visited(current, visited)?;
            visit(current);
            for child in current.embedded() {
                queue.push_back(child);
            }
        }
        Ok(())
    }

    fn traverse_dfs<V>(
        &self,
        current: &EntityTemplate,
        visit: &mut V,
        visited: &mut HashSet<String>,
    ) -> Result<(), BuildError>
    where
        V: FnMut(&EntityTemplate),
    {
        mark_visited(current, visited)?;
        for child in current.embedded() {
            self.traverse_dfs(child, visit, visited)?;
        }
        visit(current);
        Ok(())
    }
}

fn mark_visited(
    template: &EntityTemplate,
    visited: &mut HashSet<String>,
) -> Result<(), BuildError> {
    let Some(name) = template.name() else {
        // Only a nameless root can occur; embedded templates are always
        // named by the loader.
        return Ok(());
    };
    if !visited.insert(name.to_ascii_lowercase()) {
        return Err(BuildError::CyclicTemplateGraph {
            name: name.to_string(),
        });
    }
    Ok(())
}
