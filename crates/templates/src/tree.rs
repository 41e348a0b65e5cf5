use std::collections::BTreeMap;

use crate::{display_path, ButtonItem, Result, TreeError};

/// A category node. One logical entity with two physical shapes: a bare
/// ordered button list, or a mapping of named children plus an explicit
/// order list and an optional button slot.
#[derive(Debug, Clone, PartialEq)]
pub enum Container {
    Leaf(Vec<ButtonItem>),
    Mixed {
        children: BTreeMap<String, Container>,
        sort_order: Vec<String>,
        buttons: Vec<ButtonItem>,
    },
}

impl Default for Container {
    fn default() -> Self {
        Self::empty()
    }
}

impl Container {
    pub fn empty() -> Self {
        Self::Mixed {
            children: BTreeMap::new(),
            sort_order: Vec::new(),
            buttons: Vec::new(),
        }
    }

    pub fn leaf(buttons: Vec<ButtonItem>) -> Self {
        Self::Leaf(buttons)
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    pub fn buttons(&self) -> &[ButtonItem] {
        match self {
            Self::Leaf(buttons) => buttons,
            Self::Mixed { buttons, .. } => buttons,
        }
    }

    pub fn buttons_mut(&mut self) -> &mut Vec<ButtonItem> {
        match self {
            Self::Leaf(buttons) => buttons,
            Self::Mixed { buttons, .. } => buttons,
        }
    }

    pub fn child(&self, name: &str) -> Option<&Container> {
        match self {
            Self::Leaf(_) => None,
            Self::Mixed { children, .. } => children.get(name),
        }
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Container> {
        match self {
            Self::Leaf(_) => None,
            Self::Mixed { children, .. } => children.get_mut(name),
        }
    }

    pub fn has_child(&self, name: &str) -> bool {
        self.child(name).is_some()
    }

    /// Child names in display order.
    pub fn child_order(&self) -> &[String] {
        match self {
            Self::Leaf(_) => &[],
            Self::Mixed { sort_order, .. } => sort_order,
        }
    }

    /// Converts a leaf container into a mixed one, keeping its buttons.
    /// The single shape-conversion point; a mixed container is unchanged.
    pub fn promote(&mut self) {
        if let Self::Leaf(buttons) = self {
            *self = Self::Mixed {
                children: BTreeMap::new(),
                sort_order: Vec::new(),
                buttons: std::mem::take(buttons),
            };
        }
    }

    /// Attaches a child, promoting a leaf shape first. The child mapping and
    /// the order list are updated together; the name goes to the end of the
    /// order. Callers are responsible for collision checks.
    pub fn insert_child(&mut self, name: String, child: Container) {
        self.promote();
        if let Self::Mixed {
            children,
            sort_order,
            ..
        } = self
        {
            if children.insert(name.clone(), child).is_none() {
                sort_order.push(name);
            }
        }
    }

    /// Detaches a child from both the mapping and the order list.
    pub fn remove_child(&mut self, name: &str) -> Option<Container> {
        match self {
            Self::Leaf(_) => None,
            Self::Mixed {
                children,
                sort_order,
                ..
            } => {
                let removed = children.remove(name);
                if removed.is_some() {
                    sort_order.retain(|entry| entry != name);
                }
                removed
            }
        }
    }
}

/// The shared category/button document. The root is a mixed container with
/// no name; it is never renamed, moved, or deleted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TemplateTree {
    pub root: Container,
}

impl TemplateTree {
    pub fn new() -> Self {
        Self {
            root: Container::empty(),
        }
    }

    /// Walks `path` one segment at a time from the root. The empty path
    /// resolves to the root itself.
    pub fn resolve(&self, path: &[String]) -> Result<&Container> {
        let mut current = &self.root;
        for (depth, segment) in path.iter().enumerate() {
            current = current
                .child(segment)
                .ok_or_else(|| TreeError::NotFound(display_path(&path[..=depth])))?;
        }
        Ok(current)
    }

    pub fn resolve_mut(&mut self, path: &[String]) -> Result<&mut Container> {
        let mut current = &mut self.root;
        for (depth, segment) in path.iter().enumerate() {
            current = current
                .child_mut(segment)
                .ok_or_else(|| TreeError::NotFound(display_path(&path[..=depth])))?;
        }
        Ok(current)
    }

    /// Resolves the container owning the node at `path`, together with the
    /// node's own name. The empty path has no parent.
    pub fn resolve_parent_mut<'a>(
        &'a mut self,
        path: &'a [String],
    ) -> Result<(&'a mut Container, &'a str)> {
        let (last, parent_path) = path
            .split_last()
            .ok_or_else(|| TreeError::ValidationFailure("the root has no parent".to_string()))?;
        let parent = self.resolve_mut(parent_path)?;
        if !parent.has_child(last) {
            return Err(TreeError::NotFound(display_path(path)));
        }
        Ok((parent, last))
    }

    pub fn contains(&self, path: &[String]) -> bool {
        self.resolve(path).is_ok()
    }
}
