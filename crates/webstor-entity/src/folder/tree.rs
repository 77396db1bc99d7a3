//! Placement rules for folder moves.
//!
//! Cycle detection works on an explicit ancestor chain (the parent-id
//! walk from the proposed new parent up to the root) rather than on an
//! in-memory object graph, so the same classification runs identically
//! over rows fetched inside a database transaction and over plain ID
//! lists in tests.

use uuid::Uuid;

/// Upper bound on the ancestor walk. A chain longer than this is treated
/// as a cycle: legitimate trees never get close to this depth.
pub const MAX_ANCESTOR_WALK: usize = 1000;

/// Result of classifying a proposed folder move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovePlacement {
    /// The move keeps the tree acyclic.
    Allowed,
    /// The folder would become its own parent.
    SelfMove,
    /// The folder would be placed under one of its own descendants, or
    /// the ancestor walk exceeded [`MAX_ANCESTOR_WALK`].
    Cycle,
}

/// Classify a proposed move of `folder_id` under `new_parent_id`.
///
/// `parent_ancestors` is the chain from the proposed parent up to the
/// root, starting with the parent itself. Moving to the root
/// (`new_parent_id = None`) is always allowed.
pub fn classify_move(
    folder_id: Uuid,
    new_parent_id: Option<Uuid>,
    parent_ancestors: &[Uuid],
) -> MovePlacement {
    let Some(parent_id) = new_parent_id else {
        return MovePlacement::Allowed;
    };
    if parent_id == folder_id {
        return MovePlacement::SelfMove;
    }
    if parent_ancestors.len() > MAX_ANCESTOR_WALK {
        return MovePlacement::Cycle;
    }
    if parent_ancestors.contains(&folder_id) {
        return MovePlacement::Cycle;
    }
    MovePlacement::Allowed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_to_root_allowed() {
        let folder = Uuid::new_v4();
        assert_eq!(classify_move(folder, None, &[]), MovePlacement::Allowed);
    }

    #[test]
    fn test_self_move_rejected() {
        let folder = Uuid::new_v4();
        assert_eq!(
            classify_move(folder, Some(folder), &[folder]),
            MovePlacement::SelfMove
        );
    }

    #[test]
    fn test_move_under_descendant_rejected() {
        // root -> folder -> child -> grandchild; moving folder under grandchild
        let root = Uuid::new_v4();
        let folder = Uuid::new_v4();
        let child = Uuid::new_v4();
        let grandchild = Uuid::new_v4();
        let chain = [grandchild, child, folder, root];
        assert_eq!(
            classify_move(folder, Some(grandchild), &chain),
            MovePlacement::Cycle
        );
    }

    #[test]
    fn test_move_to_sibling_allowed() {
        let root = Uuid::new_v4();
        let folder = Uuid::new_v4();
        let sibling = Uuid::new_v4();
        let chain = [sibling, root];
        assert_eq!(
            classify_move(folder, Some(sibling), &chain),
            MovePlacement::Allowed
        );
    }

    #[test]
    fn test_pathological_depth_treated_as_cycle() {
        let folder = Uuid::new_v4();
        let parent = Uuid::new_v4();
        let mut chain = vec![parent];
        chain.extend((0..MAX_ANCESTOR_WALK + 1).map(|_| Uuid::new_v4()));
        assert_eq!(
            classify_move(folder, Some(parent), &chain),
            MovePlacement::Cycle
        );
    }
}
