//! Tests for the presentation tree

#[cfg(test)]
mod tests {
    use crate::models::{NodeId, NodeKind, NodeTree, Position, RecordId, TreeError};

    /// root
    /// └── record#1
    ///     ├── property(text)
    ///     └── property_list(items)
    ///         └── list_item
    ///             └── record#2
    ///                 └── content(payload)
    struct Fixture {
        tree: NodeTree,
        outer: NodeId,
        text: NodeId,
        list: NodeId,
        item: NodeId,
        inner: NodeId,
        payload: NodeId,
    }

    fn fixture() -> Fixture {
        let mut tree = NodeTree::new();
        let root = tree.root();
        let outer = tree.alloc(NodeKind::Record {
            record: RecordId::new(1),
        });
        let text = tree.alloc(NodeKind::Property {
            slot: "text".to_string(),
        });
        let list = tree.alloc(NodeKind::PropertyList {
            slot: "items".to_string(),
        });
        let item = tree.alloc(NodeKind::ListItem);
        let inner = tree.alloc(NodeKind::Record {
            record: RecordId::new(2),
        });
        let payload = tree.alloc(NodeKind::Content {
            slot: "payload".to_string(),
        });

        tree.add(root, outer, Position::End).unwrap();
        tree.add(outer, text, Position::End).unwrap();
        tree.add(outer, list, Position::End).unwrap();
        tree.add(list, item, Position::End).unwrap();
        tree.add(item, inner, Position::End).unwrap();
        tree.add(inner, payload, Position::End).unwrap();

        Fixture {
            tree,
            outer,
            text,
            list,
            item,
            inner,
            payload,
        }
    }

    #[test]
    fn test_level_counts_ancestors() {
        let f = fixture();
        assert_eq!(f.tree.level(f.tree.root()), 0);
        assert_eq!(f.tree.level(f.outer), 1);
        assert_eq!(f.tree.level(f.payload), 5);
    }

    #[test]
    fn test_record_branch_index() {
        let f = fixture();
        assert_eq!(f.tree.record_branch_index(f.text), Some(0));
        assert_eq!(f.tree.record_branch_index(f.list), Some(1));
        // list_item -> property_list is branch 1 of record#1
        assert_eq!(f.tree.record_branch_index(f.item), Some(1));
        assert_eq!(f.tree.record_branch_index(f.payload), Some(0));
        // no record node above a top-level record
        assert_eq!(f.tree.record_branch_index(f.outer), None);
        assert_eq!(f.tree.record_branch_index(f.tree.root()), None);
    }

    #[test]
    fn test_record_level() {
        let f = fixture();
        assert_eq!(f.tree.record_level(f.text), Some(1));
        assert_eq!(f.tree.record_level(f.item), Some(2));
        assert_eq!(f.tree.record_level(f.inner), Some(3));
        assert_eq!(f.tree.record_level(f.outer), None);
    }

    #[test]
    fn test_enclosing_record_lookup() {
        let f = fixture();
        assert_eq!(f.tree.record_node(f.inner), Some(f.inner));
        assert_eq!(f.tree.record_node(f.item), Some(f.outer));
        assert_eq!(f.tree.record_of(f.payload), Some(RecordId::new(2)));
        assert_eq!(f.tree.parent_record(f.inner), Some(RecordId::new(1)));
        assert_eq!(f.tree.parent_record(f.outer), None);
        assert_eq!(f.tree.record_of(f.tree.root()), None);
    }

    #[test]
    fn test_tree_root_index() {
        let mut f = fixture();
        let second = f.tree.alloc(NodeKind::Record {
            record: RecordId::new(3),
        });
        let root = f.tree.root();
        f.tree.add(root, second, Position::At(0)).unwrap();
        assert_eq!(f.tree.tree_root_index(f.payload), Some(1));
        assert_eq!(f.tree.tree_root_index(second), Some(0));
        assert_eq!(f.tree.tree_root_index(root), None);
    }

    #[test]
    fn test_add_positions() {
        let mut tree = NodeTree::new();
        let root = tree.root();
        let a = tree.alloc(NodeKind::Record { record: RecordId::new(1) });
        let b = tree.alloc(NodeKind::Record { record: RecordId::new(2) });
        let c = tree.alloc(NodeKind::Record { record: RecordId::new(3) });

        assert_eq!(tree.add(root, a, Position::End).unwrap(), 0);
        assert_eq!(tree.add(root, b, Position::At(0)).unwrap(), 0);
        assert_eq!(tree.add(root, c, Position::At(2)).unwrap(), 2);
        assert_eq!(tree.children(root), &[b, a, c]);
        assert_eq!(tree.index_of(root, a), Some(1));
        assert_eq!(tree.parent_index(c), Some(2));
    }

    #[test]
    fn test_end_position_equals_len() {
        assert_eq!(Position::End.resolve(3), Position::At(3).resolve(3));
        assert_eq!(Position::At(4).resolve(3), None);
    }

    #[test]
    fn test_add_rejects_invalid_attachments() {
        let mut f = fixture();
        let root = f.tree.root();

        let err = f.tree.add(root, f.inner, Position::End).unwrap_err();
        assert!(matches!(err, TreeError::AlreadyAttached { .. }));

        let extra = f.tree.alloc(NodeKind::Record { record: RecordId::new(9) });
        let err = f.tree.add(f.item, extra, Position::End).unwrap_err();
        assert!(matches!(err, TreeError::CapacityExceeded { .. }));

        let err = f.tree.add(f.payload, extra, Position::End).unwrap_err();
        assert!(matches!(err, TreeError::CapacityExceeded { .. }));

        let err = f.tree.add(root, extra, Position::At(5)).unwrap_err();
        assert!(matches!(err, TreeError::PositionOutOfRange { len: 1, .. }));

        assert_eq!(f.tree.add(f.outer, root, Position::End), Err(TreeError::RootNotMovable));
        assert!(!f.tree.is_attached(extra));
    }

    #[test]
    fn test_remove_detaches_subtree() {
        let mut f = fixture();
        assert_eq!(f.tree.remove_child(f.list, f.item).unwrap(), 0);
        assert!(!f.tree.has_children(f.list));
        assert!(!f.tree.is_attached(f.inner));
        assert_eq!(f.tree.parent(f.item), None);
        // the detached subtree is still intact
        assert_eq!(f.tree.children(f.item), &[f.inner]);
        assert!(f.tree.remove_child(f.list, f.item).is_err());
    }

    #[test]
    fn test_snapshot_ignores_arena_handles() {
        let a = fixture();
        let mut b = NodeTree::new();
        // burn some arena slots so handles differ
        b.alloc(NodeKind::ListItem);
        b.alloc(NodeKind::ListItem);
        let root = b.root();
        let outer = b.alloc(NodeKind::Record { record: RecordId::new(1) });
        let text = b.alloc(NodeKind::Property { slot: "text".to_string() });
        let list = b.alloc(NodeKind::PropertyList { slot: "items".to_string() });
        let item = b.alloc(NodeKind::ListItem);
        let inner = b.alloc(NodeKind::Record { record: RecordId::new(2) });
        let payload = b.alloc(NodeKind::Content { slot: "payload".to_string() });
        b.add(root, outer, Position::End).unwrap();
        b.add(outer, text, Position::End).unwrap();
        b.add(outer, list, Position::End).unwrap();
        b.add(list, item, Position::End).unwrap();
        b.add(item, inner, Position::End).unwrap();
        b.add(inner, payload, Position::End).unwrap();

        assert_eq!(a.tree.snapshot(a.tree.root()), b.snapshot(b.root()));
        assert_eq!(
            a.tree.snapshot(a.tree.root()).child_records(),
            vec![RecordId::new(1)]
        );
    }

    #[test]
    fn test_descendants_preorder() {
        let f = fixture();
        assert_eq!(
            f.tree.descendants(f.outer),
            vec![f.outer, f.text, f.list, f.item, f.inner, f.payload]
        );
    }
}
