//! Access-control predicates. All pure: the caller supplies the acting user
//! and whatever membership facts the check needs, and rejects the request
//! before any mutation when a predicate returns false.

use db::models::{
    user::User,
    work_item::{Membership, WorkItem},
};
use uuid::Uuid;

/// Admins and supervisors see every item of a kind.
pub fn can_view_all(user: &User) -> bool {
    user.role.is_admin_or_supervisor()
}

/// Public items are visible to any authenticated user; private items only to
/// elevated roles, assignees, and viewers.
pub fn can_view(user: &User, item: &WorkItem, membership: &Membership) -> bool {
    if !item.is_private {
        return true;
    }

    user.role.is_admin_or_supervisor() || membership.includes(user.id)
}

pub fn can_create(user: &User) -> bool {
    user.role.is_admin_or_supervisor()
}

pub fn can_edit(user: &User) -> bool {
    user.role.is_admin_or_supervisor()
}

/// Status changes are open to assignees as well; viewers stay read-only.
pub fn can_update_status(user: &User, membership: &Membership) -> bool {
    user.role.is_admin_or_supervisor() || is_assignee(user.id, membership)
}

pub fn can_update_status_to_done(user: &User) -> bool {
    user.role.is_admin_or_supervisor()
}

pub fn can_delete(user: &User) -> bool {
    user.role.is_admin()
}

pub fn can_comment(user: &User, membership: &Membership) -> bool {
    can_update_status(user, membership)
}

pub fn can_delete_comment(user: &User) -> bool {
    user.role.is_admin()
}

pub fn can_manage_users(user: &User) -> bool {
    user.role.is_admin()
}

pub fn can_view_logs(user: &User) -> bool {
    user.role.is_admin_or_supervisor()
}

pub fn can_manage_oauth_settings(user: &User) -> bool {
    user.role.is_admin()
}

fn is_assignee(user_id: Uuid, membership: &Membership) -> bool {
    membership.assignees.contains(&user_id)
}
