use serde::{Deserialize, Serialize};

use crate::{
    display_path, ButtonItem, Container, Result, TemplateTree, TreeError, BUTTONS_KEY,
    SORT_ORDER_KEY,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveDirection {
    Up,
    Down,
}

/// Structural mutations over the template tree. Every command is a single
/// validated request: it either applies fully or returns an error with the
/// tree untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum TreeCommand {
    AddCategory {
        parent: Vec<String>,
        name: String,
    },
    AddButton {
        container: Vec<String>,
        label: String,
        text: String,
    },
    UpdateButton {
        container: Vec<String>,
        label: String,
        new_label: String,
        new_text: String,
    },
    RenameCategory {
        path: Vec<String>,
        new_name: String,
    },
    MoveCategory {
        path: Vec<String>,
        direction: MoveDirection,
    },
    MoveCategoryToParent {
        path: Vec<String>,
        new_parent: Vec<String>,
    },
    MoveButton {
        container: Vec<String>,
        label: String,
        direction: MoveDirection,
    },
    MoveButtonToContainer {
        container: Vec<String>,
        label: String,
        target: Vec<String>,
    },
    DeleteCategory {
        path: Vec<String>,
    },
    DeleteButton {
        container: Vec<String>,
        label: String,
    },
}

pub fn apply_command(tree: &mut TemplateTree, command: TreeCommand) -> Result<()> {
    match command {
        TreeCommand::AddCategory { parent, name } => add_category(tree, &parent, &name),
        TreeCommand::AddButton {
            container,
            label,
            text,
        } => add_button(tree, &container, label, text),
        TreeCommand::UpdateButton {
            container,
            label,
            new_label,
            new_text,
        } => update_button(tree, &container, &label, new_label, new_text),
        TreeCommand::RenameCategory { path, new_name } => rename_category(tree, &path, &new_name),
        TreeCommand::MoveCategory { path, direction } => move_category(tree, &path, direction),
        TreeCommand::MoveCategoryToParent { path, new_parent } => {
            move_category_to_parent(tree, &path, &new_parent)
        }
        TreeCommand::MoveButton {
            container,
            label,
            direction,
        } => move_button(tree, &container, &label, direction),
        TreeCommand::MoveButtonToContainer {
            container,
            label,
            target,
        } => move_button_to_container(tree, &container, &label, &target),
        TreeCommand::DeleteCategory { path } => delete_category(tree, &path),
        TreeCommand::DeleteButton { container, label } => delete_button(tree, &container, &label),
    }
}

fn validate_category_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(TreeError::ValidationFailure(
            "category name must not be empty".to_string(),
        ));
    }
    // The wire mapping reserves these slots inside every container.
    if name == BUTTONS_KEY || name == SORT_ORDER_KEY {
        return Err(TreeError::DuplicateKey(name.to_string()));
    }
    Ok(())
}

fn button_not_found(container: &[String], label: &str) -> TreeError {
    TreeError::NotFound(format!(
        "button '{}' in '{}'",
        label,
        display_path(container)
    ))
}

fn add_category(tree: &mut TemplateTree, parent: &[String], name: &str) -> Result<()> {
    validate_category_name(name)?;
    let container = tree.resolve_mut(parent)?;
    if container.has_child(name) {
        return Err(TreeError::DuplicateKey(name.to_string()));
    }
    container.insert_child(name.to_string(), Container::empty());
    Ok(())
}

fn add_button(tree: &mut TemplateTree, path: &[String], label: String, text: String) -> Result<()> {
    if label.trim().is_empty() || text.trim().is_empty() {
        return Err(TreeError::ValidationFailure(
            "button label and text must not be empty".to_string(),
        ));
    }
    let container = tree.resolve_mut(path)?;
    if container.buttons().iter().any(|b| b.label == label) {
        return Err(TreeError::DuplicateKey(label));
    }
    container.buttons_mut().push(ButtonItem::new(label, text));
    Ok(())
}

fn update_button(
    tree: &mut TemplateTree,
    path: &[String],
    label: &str,
    new_label: String,
    new_text: String,
) -> Result<()> {
    if new_label.trim().is_empty() || new_text.trim().is_empty() {
        return Err(TreeError::ValidationFailure(
            "button label and text must not be empty".to_string(),
        ));
    }
    let container = tree.resolve_mut(path)?;
    let buttons = container.buttons_mut();
    let idx = buttons
        .iter()
        .position(|b| b.label == label)
        .ok_or_else(|| button_not_found(path, label))?;
    if new_label != label && buttons.iter().any(|b| b.label == new_label) {
        return Err(TreeError::DuplicateKey(new_label));
    }
    buttons[idx] = ButtonItem::new(new_label, new_text);
    Ok(())
}

fn rename_category(tree: &mut TemplateTree, path: &[String], new_name: &str) -> Result<()> {
    if path.is_empty() {
        return Err(TreeError::ValidationFailure(
            "the root cannot be renamed".to_string(),
        ));
    }
    validate_category_name(new_name)?;
    let (parent, name) = tree.resolve_parent_mut(path)?;
    if new_name == name {
        return Ok(());
    }
    if parent.has_child(new_name) {
        return Err(TreeError::DuplicateKey(new_name.to_string()));
    }
    if let Container::Mixed {
        children,
        sort_order,
        ..
    } = parent
    {
        if let Some(node) = children.remove(name) {
            children.insert(new_name.to_string(), node);
            // Replace in place so the sibling position survives the rename.
            if let Some(slot) = sort_order.iter_mut().find(|entry| *entry == name) {
                *slot = new_name.to_string();
            }
        }
    }
    Ok(())
}

fn move_category(tree: &mut TemplateTree, path: &[String], direction: MoveDirection) -> Result<()> {
    if path.is_empty() {
        return Err(TreeError::ValidationFailure(
            "the root cannot be moved".to_string(),
        ));
    }
    let (parent, name) = tree.resolve_parent_mut(path)?;
    if let Container::Mixed { sort_order, .. } = parent {
        let idx = sort_order
            .iter()
            .position(|entry| entry == name)
            .ok_or_else(|| TreeError::NotFound(display_path(path)))?;
        let target = match direction {
            MoveDirection::Up => idx.checked_sub(1),
            MoveDirection::Down => {
                if idx + 1 < sort_order.len() {
                    Some(idx + 1)
                } else {
                    None
                }
            }
        };
        // Boundary moves succeed with no change.
        if let Some(new_idx) = target {
            sort_order.swap(idx, new_idx);
        }
    }
    Ok(())
}

fn move_category_to_parent(
    tree: &mut TemplateTree,
    path: &[String],
    new_parent: &[String],
) -> Result<()> {
    let Some((name, parent_path)) = path.split_last() else {
        return Err(TreeError::ValidationFailure(
            "the root cannot be moved".to_string(),
        ));
    };
    if new_parent.starts_with(path) {
        // Covers both the node itself and any of its descendants.
        return Err(TreeError::InvalidMoveTarget(display_path(new_parent)));
    }
    if !tree.resolve(parent_path)?.has_child(name) {
        return Err(TreeError::NotFound(display_path(path)));
    }
    if new_parent == parent_path {
        return Ok(());
    }

    let target = tree.resolve(new_parent)?;
    if target.has_child(name) {
        return Err(TreeError::DuplicateKey(name.clone()));
    }

    let subtree = {
        let (parent, name) = tree.resolve_parent_mut(path)?;
        parent
            .remove_child(name)
            .ok_or_else(|| TreeError::NotFound(display_path(path)))?
    };
    // The target cannot sit below the detached node, so this resolve is the
    // one validated above.
    let target = tree.resolve_mut(new_parent)?;
    target.insert_child(name.clone(), subtree);
    Ok(())
}

fn move_button(
    tree: &mut TemplateTree,
    path: &[String],
    label: &str,
    direction: MoveDirection,
) -> Result<()> {
    let container = tree.resolve_mut(path)?;
    let buttons = container.buttons_mut();
    let idx = buttons
        .iter()
        .position(|b| b.label == label)
        .ok_or_else(|| button_not_found(path, label))?;
    let target = match direction {
        MoveDirection::Up => idx.checked_sub(1),
        MoveDirection::Down => {
            if idx + 1 < buttons.len() {
                Some(idx + 1)
            } else {
                None
            }
        }
    };
    if let Some(new_idx) = target {
        let item = buttons.remove(idx);
        buttons.insert(new_idx, item);
    }
    Ok(())
}

fn move_button_to_container(
    tree: &mut TemplateTree,
    source: &[String],
    label: &str,
    target: &[String],
) -> Result<()> {
    if !tree
        .resolve(source)?
        .buttons()
        .iter()
        .any(|b| b.label == label)
    {
        return Err(button_not_found(source, label));
    }
    if source == target {
        return Ok(());
    }
    let target_container = tree.resolve(target)?;
    if target_container.buttons().iter().any(|b| b.label == label) {
        return Err(TreeError::DuplicateKey(label.to_string()));
    }

    let item = {
        let buttons = tree.resolve_mut(source)?.buttons_mut();
        let idx = buttons
            .iter()
            .position(|b| b.label == label)
            .ok_or_else(|| button_not_found(source, label))?;
        buttons.remove(idx)
    };
    tree.resolve_mut(target)?.buttons_mut().push(item);
    Ok(())
}

fn delete_category(tree: &mut TemplateTree, path: &[String]) -> Result<()> {
    if path.is_empty() {
        return Err(TreeError::ValidationFailure(
            "the root cannot be deleted".to_string(),
        ));
    }
    let (parent, name) = tree.resolve_parent_mut(path)?;
    parent.remove_child(name);
    Ok(())
}

fn delete_button(tree: &mut TemplateTree, path: &[String], label: &str) -> Result<()> {
    let container = tree.resolve_mut(path)?;
    let buttons = container.buttons_mut();
    let idx = buttons
        .iter()
        .position(|b| b.label == label)
        .ok_or_else(|| button_not_found(path, label))?;
    buttons.remove(idx);
    Ok(())
}
