//! Walking the organisation tree formed by `users.parent_id`.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{entity::sea_orm_active_enums::Role, models::User};

/// Breadth-first walk state. Each level is fed in with `absorb` until the frontier runs dry.
#[derive(Debug)]
pub struct DescendantWalk {
    visited: HashSet<Uuid>,
    frontier: Vec<Uuid>,
    descendants: Vec<Uuid>,
}

impl DescendantWalk {
    pub fn new(root: Uuid) -> Self {
        Self {
            visited: HashSet::from([root]),
            frontier: vec![root],
            descendants: Vec::new(),
        }
    }

    /// Ids whose children must be fetched next. Empty once the walk is complete.
    pub fn frontier(&self) -> &[Uuid] {
        &self.frontier
    }

    pub fn is_done(&self) -> bool {
        self.frontier.is_empty()
    }

    /// Accept the children of the current frontier. Already visited ids are skipped,
    /// so a cycle in the parent links cannot loop forever.
    pub fn absorb(&mut self, child_ids: impl IntoIterator<Item = Uuid>) {
        let mut next = Vec::new();
        for child in child_ids {
            if self.visited.insert(child) {
                self.descendants.push(child);
                next.push(child);
            }
        }
        self.frontier = next;
    }

    pub fn into_descendants(self) -> Vec<Uuid> {
        self.descendants
    }
}

/// Which users' orders a caller may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderScope {
    All,
    Users(Vec<Uuid>),
}

impl OrderScope {
    pub fn covers(&self, user_id: Uuid) -> bool {
        match self {
            OrderScope::All => true,
            OrderScope::Users(ids) => ids.contains(&user_id),
        }
    }
}

/// Whether `parent` may sit directly above `child` in the tree.
pub fn parent_role_allowed(child: Role, parent: Role) -> bool {
    child != Role::Admin && parent.rank() < child.rank()
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserNode {
    pub user: User,
    #[schema(no_recursion)]
    pub children: Vec<UserNode>,
}

fn sort_key(user: &User) -> (u8, String, String) {
    (
        user.role.rank(),
        user.company_name.to_lowercase(),
        user.username.to_lowercase(),
    )
}

/// Arrange a flat user list into a forest.
///
/// Users whose parent is absent from the list become roots. Users stuck in a
/// parent cycle are surfaced as roots as well rather than dropped.
pub fn build_forest(users: Vec<User>) -> Vec<UserNode> {
    let ids: HashSet<Uuid> = users.iter().map(|u| u.id).collect();
    let mut children: HashMap<Uuid, Vec<User>> = HashMap::new();
    let mut roots = Vec::new();

    for user in users {
        match user.parent_id.filter(|p| ids.contains(p) && *p != user.id) {
            Some(parent) => children.entry(parent).or_default().push(user),
            None => roots.push(user),
        }
    }

    roots.sort_by_key(sort_key);
    let mut forest: Vec<UserNode> = roots
        .into_iter()
        .map(|root| attach(root, &mut children))
        .collect();

    // Whatever is left hangs off a cycle.
    let mut orphans: Vec<User> = children.into_values().flatten().collect();
    orphans.sort_by_key(sort_key);
    forest.extend(orphans.into_iter().map(|u| UserNode {
        user: u,
        children: Vec::new(),
    }));

    forest
}

fn attach(user: User, children: &mut HashMap<Uuid, Vec<User>>) -> UserNode {
    let mut kids = children.remove(&user.id).unwrap_or_default();
    kids.sort_by_key(sort_key);
    let children_nodes = kids.into_iter().map(|k| attach(k, children)).collect();
    UserNode {
        user,
        children: children_nodes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(name: &str, role: Role, parent: Option<Uuid>) -> User {
        User {
            id: Uuid::new_v4(),
            username: name.to_string(),
            role,
            parent_id: parent,
            balance: 0,
            company_name: name.to_uppercase(),
            contact_name: String::new(),
            phone: String::new(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn walk_collects_every_level_once() {
        let root = Uuid::new_v4();
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mut walk = DescendantWalk::new(root);
        walk.absorb([a, b]);
        assert_eq!(walk.frontier(), &[a, b]);
        walk.absorb([c, a]);
        assert_eq!(walk.frontier(), &[c]);
        walk.absorb([root]);
        assert!(walk.is_done());
        assert_eq!(walk.into_descendants(), vec![a, b, c]);
    }

    #[test]
    fn scope_coverage() {
        let me = Uuid::new_v4();
        assert!(OrderScope::All.covers(me));
        let scope = OrderScope::Users(vec![me]);
        assert!(scope.covers(me));
        assert!(!scope.covers(Uuid::new_v4()));
    }

    #[test]
    fn parent_must_be_more_senior() {
        assert!(parent_role_allowed(Role::Seller, Role::Agency));
        assert!(parent_role_allowed(Role::Seller, Role::Admin));
        assert!(parent_role_allowed(Role::Agency, Role::Manager));
        assert!(!parent_role_allowed(Role::Manager, Role::Agency));
        assert!(!parent_role_allowed(Role::Agency, Role::Agency));
        assert!(!parent_role_allowed(Role::Admin, Role::Admin));
    }

    #[test]
    fn forest_nests_and_sorts() {
        let admin = user("admin", Role::Admin, None);
        let manager = user("m", Role::Manager, Some(admin.id));
        let agency_b = user("b-agency", Role::Agency, Some(manager.id));
        let agency_a = user("a-agency", Role::Agency, Some(manager.id));
        let seller = user("s", Role::Seller, Some(agency_a.id));
        let loose = user("loose", Role::Seller, Some(Uuid::new_v4()));

        let forest = build_forest(vec![
            seller.clone(),
            agency_b.clone(),
            loose.clone(),
            manager.clone(),
            agency_a.clone(),
            admin.clone(),
        ]);

        assert_eq!(forest.len(), 2);
        assert_eq!(forest[0].user.id, admin.id);
        assert_eq!(forest[1].user.id, loose.id);
        let agencies = &forest[0].children[0].children;
        assert_eq!(agencies[0].user.id, agency_a.id);
        assert_eq!(agencies[1].user.id, agency_b.id);
        assert_eq!(agencies[0].children[0].user.id, seller.id);
    }

    #[test]
    fn forest_survives_cycles() {
        let mut a = user("a", Role::Agency, None);
        let b = user("b", Role::Seller, Some(a.id));
        a.parent_id = Some(b.id);
        let forest = build_forest(vec![a, b]);
        assert_eq!(forest.len(), 2);
    }
}
