//! The ownership graph between entities.
//!
//! Every foreign key that matters for deletion is declared here exactly once
//! as a directed [`Edge`] from a parent entity to the child column that
//! references it. Database foreign keys are `NO ACTION`; deletes are driven
//! by walking this table, so it is the single authority on what a delete
//! removes, refuses, or detaches.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    School,
    User,
    Course,
    Enrollment,
    Attendance,
    ResetToken,
    Message,
    Resource,
}

impl Entity {
    pub const fn table(self) -> &'static str {
        match self {
            Self::School => "schools",
            Self::User => "users",
            Self::Course => "courses",
            Self::Enrollment => "enrollments",
            Self::Attendance => "attendance",
            Self::ResetToken => "reset_tokens",
            Self::Message => "messages",
            Self::Resource => "resources",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// What happens to referencing rows when the parent is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    /// Delete the children (recursively).
    Cascade,
    /// Refuse the delete while any child exists.
    Restrict,
    /// Set the child column to NULL.
    Nullify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub name: &'static str,
    pub parent: Entity,
    pub child: Entity,
    /// Column on the child's table holding the parent's `id`.
    pub column: &'static str,
    pub on_delete: OnDelete,
}

const fn edge(
    name: &'static str,
    parent: Entity,
    child: Entity,
    column: &'static str,
    on_delete: OnDelete,
) -> Edge {
    Edge {
        name,
        parent,
        child,
        column,
        on_delete,
    }
}

/// All parent/child edges, in the order children are visited.
///
/// Course children come before anything that hangs off users so a school
/// delete clears course history before it reaches the users that authored
/// it.
pub const EDGES: &[Edge] = &[
    edge("course_enrollments", Entity::Course, Entity::Enrollment, "course_id", OnDelete::Cascade),
    edge("course_attendance", Entity::Course, Entity::Attendance, "course_id", OnDelete::Cascade),
    edge("course_messages", Entity::Course, Entity::Message, "course_id", OnDelete::Cascade),
    edge("course_resources", Entity::Course, Entity::Resource, "course_id", OnDelete::Cascade),
    edge("message_replies", Entity::Message, Entity::Message, "parent_id", OnDelete::Cascade),
    edge("school_courses", Entity::School, Entity::Course, "school_id", OnDelete::Cascade),
    edge("school_users", Entity::School, Entity::User, "school_id", OnDelete::Cascade),
    edge("user_enrollments", Entity::User, Entity::Enrollment, "user_id", OnDelete::Cascade),
    edge("user_reset_tokens", Entity::User, Entity::ResetToken, "user_id", OnDelete::Cascade),
    edge("user_attendance", Entity::User, Entity::Attendance, "user_id", OnDelete::Restrict),
    edge("attendance_verifier", Entity::User, Entity::Attendance, "verified_by", OnDelete::Nullify),
    edge("user_messages", Entity::User, Entity::Message, "user_id", OnDelete::Restrict),
    edge("user_resources", Entity::User, Entity::Resource, "uploaded_by", OnDelete::Restrict),
    edge("course_educator", Entity::User, Entity::Course, "educator_id", OnDelete::Restrict),
    edge("school_owner", Entity::User, Entity::School, "owner_id", OnDelete::Restrict),
];

/// Edges whose parent is `entity`, in declaration order.
pub fn children_of(entity: Entity) -> impl Iterator<Item = &'static Edge> {
    EDGES.iter().filter(move |e| e.parent == entity)
}

/// Edges that block deleting `entity` while children exist.
pub fn restricting(entity: Entity) -> impl Iterator<Item = &'static Edge> {
    children_of(entity).filter(|e| e.on_delete == OnDelete::Restrict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_edge_names_are_unique() {
        let names: HashSet<_> = EDGES.iter().map(|e| e.name).collect();
        assert_eq!(names.len(), EDGES.len());
    }

    #[test]
    fn test_course_delete_cascades_to_all_course_children() {
        let children: Vec<_> = children_of(Entity::Course)
            .map(|e| (e.child, e.on_delete))
            .collect();
        for child in [
            Entity::Enrollment,
            Entity::Attendance,
            Entity::Message,
            Entity::Resource,
        ] {
            assert!(children.contains(&(child, OnDelete::Cascade)), "{child}");
        }
    }

    #[test]
    fn test_user_history_restricts_delete() {
        let blocked: HashSet<_> = restricting(Entity::User).map(|e| e.child).collect();
        assert!(blocked.contains(&Entity::Attendance));
        assert!(blocked.contains(&Entity::Message));
        assert!(blocked.contains(&Entity::Resource));
        assert!(!blocked.contains(&Entity::Enrollment));
        assert!(!blocked.contains(&Entity::ResetToken));
    }

    #[test]
    fn test_school_courses_visited_before_school_users() {
        let order: Vec<_> = children_of(Entity::School).map(|e| e.child).collect();
        assert_eq!(order, vec![Entity::Course, Entity::User]);
    }

    #[test]
    fn test_graph_is_acyclic_apart_from_reply_threads() {
        fn reaches(from: Entity, target: Entity, seen: &mut HashSet<Entity>) -> bool {
            children_of(from)
                .filter(|e| e.on_delete == OnDelete::Cascade && e.child != e.parent)
                .any(|e| e.child == target || (seen.insert(e.child) && reaches(e.child, target, seen)))
        }
        for entity in [Entity::School, Entity::User, Entity::Course] {
            assert!(!reaches(entity, entity, &mut HashSet::new()), "{entity}");
        }
    }
}
