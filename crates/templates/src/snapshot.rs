//! Wire and storage encoding of the template tree.
//!
//! A leaf container is encoded as a bare JSON array of buttons. A mixed
//! container is a JSON object: child categories under their own names, the
//! button list under `BUTTONS_KEY`, the child order under `SORT_ORDER_KEY`.
//! Decoding tolerates repeated names inside one object, an artifact of older
//! encoders: same-named mapping values merge recursively, for anything else
//! the last value wins.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{ButtonItem, Container, TemplateTree, BUTTONS_KEY, SORT_ORDER_KEY};

impl Serialize for Container {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Container::Leaf(buttons) => {
                let mut seq = serializer.serialize_seq(Some(buttons.len()))?;
                for button in buttons {
                    seq.serialize_element(button)?;
                }
                seq.end()
            }
            Container::Mixed {
                children,
                sort_order,
                buttons,
            } => {
                let mut map = serializer.serialize_map(None)?;
                for name in sort_order {
                    if let Some(child) = children.get(name) {
                        map.serialize_entry(name, child)?;
                    }
                }
                // A stale order list must not drop children from the wire.
                for (name, child) in children {
                    if !sort_order.contains(name) {
                        map.serialize_entry(name, child)?;
                    }
                }
                if !buttons.is_empty() {
                    map.serialize_entry(BUTTONS_KEY, buttons)?;
                }
                if !children.is_empty() {
                    map.serialize_entry(SORT_ORDER_KEY, sort_order)?;
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Container {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ContainerVisitor)
    }
}

struct ContainerVisitor;

impl<'de> Visitor<'de> for ContainerVisitor {
    type Value = Container;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a button list or a category mapping")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Container, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut buttons = Vec::new();
        while let Some(button) = seq.next_element::<ButtonItem>()? {
            buttons.push(button);
        }
        Ok(Container::Leaf(buttons))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Container, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut children: BTreeMap<String, Container> = BTreeMap::new();
        let mut sort_order = Vec::new();
        let mut buttons = Vec::new();
        while let Some(key) = map.next_key::<String>()? {
            if key == BUTTONS_KEY {
                buttons = map.next_value::<Vec<ButtonItem>>()?;
            } else if key == SORT_ORDER_KEY {
                sort_order = map.next_value::<Vec<String>>()?;
            } else {
                let value = map.next_value::<Container>()?;
                let merged = match children.remove(&key) {
                    Some(existing) => merge_containers(existing, value),
                    None => value,
                };
                children.insert(key, merged);
            }
        }
        Ok(Container::Mixed {
            children,
            sort_order,
            buttons,
        })
    }
}

fn merge_containers(first: Container, second: Container) -> Container {
    match (first, second) {
        (
            Container::Mixed {
                children: mut merged,
                sort_order: first_order,
                buttons: first_buttons,
            },
            Container::Mixed {
                children: second_children,
                sort_order: second_order,
                buttons: second_buttons,
            },
        ) => {
            for (name, value) in second_children {
                let combined = match merged.remove(&name) {
                    Some(existing) => merge_containers(existing, value),
                    None => value,
                };
                merged.insert(name, combined);
            }
            // The order list may come out stale; the boundary repair pass
            // settles it.
            Container::Mixed {
                children: merged,
                sort_order: if second_order.is_empty() {
                    first_order
                } else {
                    second_order
                },
                buttons: if second_buttons.is_empty() {
                    first_buttons
                } else {
                    second_buttons
                },
            }
        }
        (_, second) => second,
    }
}

impl Serialize for TemplateTree {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.root.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TemplateTree {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let root = Container::deserialize(deserializer)?;
        if root.is_leaf() {
            return Err(de::Error::custom("the tree root must be a mapping"));
        }
        Ok(TemplateTree { root })
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        apply_command, order_is_consistent, repair_order, ButtonItem, Container, TemplateTree,
        TreeCommand,
    };

    fn sample_tree() -> TemplateTree {
        let mut tree = TemplateTree::new();
        for command in [
            TreeCommand::AddCategory {
                parent: vec![],
                name: "Ortho".to_string(),
            },
            TreeCommand::AddCategory {
                parent: vec![],
                name: "Derm".to_string(),
            },
            TreeCommand::AddCategory {
                parent: vec!["Ortho".to_string()],
                name: "PreOp".to_string(),
            },
            TreeCommand::AddButton {
                container: vec!["Ortho".to_string(), "PreOp".to_string()],
                label: "Consent".to_string(),
                text: "Patient consents to the procedure.".to_string(),
            },
            TreeCommand::AddButton {
                container: vec!["Derm".to_string()],
                label: "Biopsy".to_string(),
                text: "Punch biopsy performed.".to_string(),
            },
        ] {
            apply_command(&mut tree, command).unwrap();
        }
        tree
    }

    #[test]
    fn round_trip_preserves_tree_and_bytes() {
        let tree = sample_tree();
        let encoded = serde_json::to_string(&tree).unwrap();
        let decoded: TemplateTree = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, tree);
        assert_eq!(serde_json::to_string(&decoded).unwrap(), encoded);
    }

    #[test]
    fn children_are_emitted_in_display_order() {
        let mut tree = sample_tree();
        apply_command(
            &mut tree,
            TreeCommand::MoveCategory {
                path: vec!["Derm".to_string()],
                direction: crate::MoveDirection::Up,
            },
        )
        .unwrap();

        let encoded = serde_json::to_string(&tree).unwrap();
        let derm = encoded.find("\"Derm\"").unwrap();
        let ortho = encoded.find("\"Ortho\"").unwrap();
        assert!(derm < ortho);
        assert!(encoded.contains("\"_sort_order\":[\"Derm\",\"Ortho\"]"));
    }

    #[test]
    fn leaf_containers_encode_as_bare_arrays() {
        let mut tree = TemplateTree::new();
        tree.root.insert_child(
            "Phrases".to_string(),
            Container::leaf(vec![ButtonItem::new("Hi", "Hello there")]),
        );

        let encoded = serde_json::to_string(&tree).unwrap();
        assert!(encoded.contains("\"Phrases\":[{\"label\":\"Hi\",\"text\":\"Hello there\"}]"));

        let decoded: TemplateTree = serde_json::from_str(&encoded).unwrap();
        assert!(decoded.root.child("Phrases").unwrap().is_leaf());
        assert_eq!(decoded, tree);
    }

    #[test]
    fn empty_document_round_trips() {
        let decoded: TemplateTree = serde_json::from_str("{}").unwrap();
        assert_eq!(decoded, TemplateTree::new());
        assert_eq!(serde_json::to_string(&decoded).unwrap(), "{}");
    }

    #[test]
    fn non_mapping_root_is_rejected() {
        assert!(serde_json::from_str::<TemplateTree>("[]").is_err());
        assert!(serde_json::from_str::<TemplateTree>("42").is_err());
        assert!(serde_json::from_str::<TemplateTree>("\"text\"").is_err());
    }

    #[test]
    fn duplicate_mapping_keys_merge_recursively() {
        let raw = r#"{
            "Ortho": {"A": {}, "_sort_order": ["A"]},
            "Ortho": {"B": {}, "_sort_order": ["B"]}
        }"#;
        let mut tree: TemplateTree = serde_json::from_str(raw).unwrap();
        repair_order(&mut tree.root);

        let ortho = tree.root.child("Ortho").unwrap();
        assert!(ortho.has_child("A"));
        assert!(ortho.has_child("B"));
        // The later order list wins, then repair appends the survivor.
        assert_eq!(ortho.child_order(), ["B".to_string(), "A".to_string()]);
        assert!(order_is_consistent(&tree.root));
    }

    #[test]
    fn duplicate_non_mapping_values_last_wins() {
        let raw = r#"{
            "Ortho": [{"label": "Old", "text": "old"}],
            "Ortho": {"PreOp": {}}
        }"#;
        let tree: TemplateTree = serde_json::from_str(raw).unwrap();
        let ortho = tree.root.child("Ortho").unwrap();
        assert!(!ortho.is_leaf());
        assert!(ortho.has_child("PreOp"));

        let raw = r#"{
            "Ortho": {"PreOp": {}},
            "Ortho": [{"label": "New", "text": "new"}]
        }"#;
        let tree: TemplateTree = serde_json::from_str(raw).unwrap();
        let ortho = tree.root.child("Ortho").unwrap();
        assert!(ortho.is_leaf());
        assert_eq!(ortho.buttons()[0].label, "New");
    }

    #[test]
    fn foreign_snapshot_without_order_lists_decodes_and_repairs() {
        let raw = r#"{
            "Zeta": {"(buttons)": [{"label": "Z", "text": "z"}]},
            "Alpha": {}
        }"#;
        let mut tree: TemplateTree = serde_json::from_str(raw).unwrap();
        repair_order(&mut tree.root);
        assert_eq!(
            tree.root.child_order(),
            ["Alpha".to_string(), "Zeta".to_string()]
        );
        assert_eq!(tree.root.child("Zeta").unwrap().buttons().len(), 1);
    }
}
