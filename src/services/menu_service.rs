use std::collections::BTreeSet;

use crate::authz::{descendants, Action};
use crate::database::models::{CreateMenu, Menu, Role, UpdateMenu};
use crate::database::Store;
use crate::tree::{assemble, TreeItem};
use crate::types::{MenuId, RoleId};

use super::caller::Caller;
use super::error::{ServiceError, ServiceResult};

const MAX_NAME_LEN: usize = 100;

/// Role → menu permission graph, rendered through the tree assembler
pub struct MenuService<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> MenuService<'a, S>
where
    S: Store + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Active menus related to the role. Unassigned ancestors are not pulled
    /// in, so an assigned child of an unassigned parent is rendered as a root.
    pub async fn menus_for_role(&self, role_id: RoleId) -> ServiceResult<Vec<TreeItem<Menu>>> {
        let menus = self.store.list_active_menus_for_role(role_id).await?;
        Ok(assemble(menus))
    }

    /// Navigation for the calling account's current role
    pub async fn user_menus(&self, caller: &Caller) -> ServiceResult<Vec<TreeItem<Menu>>> {
        self.menus_for_role(caller.role_id).await
    }

    /// Every menu, active or not, for administration
    pub async fn full_menu_tree(&self, caller: &Caller) -> ServiceResult<Vec<TreeItem<Menu>>> {
        caller.scope_for_action(self.store, Action::ManageMenus).await?;
        let menus = self.store.list_menus().await?;
        Ok(assemble(menus))
    }

    /// Roles an administrator can pick from when creating accounts
    pub async fn roles(&self, caller: &Caller) -> ServiceResult<Vec<Role>> {
        if !caller.kind().is_admin() {
            return Err(ServiceError::Forbidden(format!(
                "Role '{}' may not list roles",
                caller.role
            )));
        }
        Ok(self.store.list_roles().await?)
    }

    pub async fn role_assignments(&self, caller: &Caller, role_id: RoleId) -> ServiceResult<Vec<MenuId>> {
        caller.scope_for_action(self.store, Action::ManageMenus).await?;
        self.load_role(role_id).await?;
        let mut ids = self.store.list_assigned_menu_ids(role_id).await?;
        ids.sort();
        Ok(ids)
    }

    /// Replace the role's full relation set in one transaction. On failure
    /// the previous assignments remain intact.
    pub async fn replace_assignments(
        &self,
        caller: &Caller,
        role_id: RoleId,
        menu_ids: Vec<MenuId>,
    ) -> ServiceResult<Vec<MenuId>> {
        caller.scope_for_action(self.store, Action::ManageMenus).await?;
        self.load_role(role_id).await?;

        let wanted: BTreeSet<MenuId> = menu_ids.into_iter().collect();
        let known: BTreeSet<MenuId> = self.store.list_menus().await?.iter().map(|m| m.id).collect();
        let missing: Vec<String> = wanted
            .difference(&known)
            .map(|id| id.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ServiceError::NotFound(format!(
                "Menus not found: {}",
                missing.join(", ")
            )));
        }

        let ids: Vec<MenuId> = wanted.into_iter().collect();
        if let Err(e) = self.store.replace_assignments(role_id, &ids).await {
            tracing::error!("Replacing menus for role {} failed and was rolled back: {}", role_id, e);
            return Err(ServiceError::Integrity(format!(
                "Menu assignments for role {} were not changed",
                role_id
            )));
        }

        tracing::info!(
            "Role {} now has {} menus (set by '{}')",
            role_id,
            ids.len(),
            caller.username
        );
        Ok(ids)
    }

    pub async fn create_menu(&self, caller: &Caller, input: CreateMenu) -> ServiceResult<Menu> {
        let input = CreateMenu {
            name: validate_name(&input.name)?.to_string(),
            ..input
        };

        caller.scope_for_action(self.store, Action::ManageMenus).await?;
        if let Some(parent) = input.parent_id {
            self.load(parent).await?;
        }

        let menu = self.store.create_menu(&input).await?;
        tracing::info!("Menu {} ('{}') created by '{}'", menu.id, menu.name, caller.username);
        Ok(menu)
    }

    pub async fn update_menu(&self, caller: &Caller, id: MenuId, input: UpdateMenu) -> ServiceResult<Menu> {
        if input.name.is_none()
            && input.path.is_none()
            && input.icon.is_none()
            && input.parent_id.is_none()
            && input.order_no.is_none()
            && input.is_active.is_none()
        {
            return Err(ServiceError::validation("body", "No changes supplied"));
        }
        let name = input
            .name
            .as_deref()
            .map(validate_name)
            .transpose()?
            .map(str::to_string);

        caller.scope_for_action(self.store, Action::ManageMenus).await?;
        self.load(id).await?;

        if let Some(Some(parent)) = input.parent_id {
            self.load(parent).await?;
            let menus = self.store.list_menus().await?;
            if descendants(&menus, id).contains(&parent) {
                return Err(ServiceError::Conflict(format!(
                    "Menu {} cannot be moved under its own sub-menu {}",
                    id, parent
                )));
            }
        }

        let changes = UpdateMenu { name, ..input };
        let menu = self
            .store
            .update_menu(id, &changes)
            .await?
            .ok_or_else(|| menu_not_found(id))?;

        tracing::info!("Menu {} updated by '{}'", id, caller.username);
        Ok(menu)
    }

    /// Removes the menu together with its role relations
    pub async fn delete_menu(&self, caller: &Caller, id: MenuId) -> ServiceResult<()> {
        caller.scope_for_action(self.store, Action::ManageMenus).await?;
        self.load(id).await?;

        let children = self.store.count_child_menus(id).await?;
        if children > 0 {
            return Err(ServiceError::Conflict(format!(
                "Menu {} still has {} sub-menus",
                id, children
            )));
        }

        if !self.store.delete_menu(id).await? {
            return Err(menu_not_found(id));
        }
        tracing::info!("Menu {} deleted by '{}'", id, caller.username);
        Ok(())
    }

    async fn load(&self, id: MenuId) -> ServiceResult<Menu> {
        self.store
            .get_menu(id)
            .await?
            .ok_or_else(|| menu_not_found(id))
    }

    async fn load_role(&self, id: RoleId) -> ServiceResult<Role> {
        self.store
            .get_role(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Role {} not found", id)))
    }
}

fn menu_not_found(id: MenuId) -> ServiceError {
    ServiceError::NotFound(format!("Menu {} not found", id))
}

fn validate_name(raw: &str) -> ServiceResult<&str> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ServiceError::validation("name", "Menu name is required"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ServiceError::validation(
            "name",
            format!("Menu name must be at most {} characters", MAX_NAME_LEN),
        ));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MenuRepository;
    use crate::testing::MemoryStore;

    fn menu_ids(v: &[i32]) -> Vec<MenuId> {
        v.iter().map(|&i| MenuId(i)).collect()
    }

    /// (id, child ids) per root
    fn shape(items: &[TreeItem<Menu>]) -> Vec<(i32, Vec<i32>)> {
        items
            .iter()
            .map(|item| {
                (
                    item.node.id.get(),
                    item.children.iter().map(|c| c.node.id.get()).collect(),
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn role_menus_are_active_and_nested() {
        let store = MemoryStore::seeded();
        let service = MenuService::new(&store);

        let tree = service.menus_for_role(RoleId(2)).await.unwrap();
        assert_eq!(shape(&tree), vec![(1, vec![]), (2, vec![3])]);

        // Legacy (5) is assigned to sales but inactive
        let tree = service.menus_for_role(RoleId(3)).await.unwrap();
        assert_eq!(shape(&tree), vec![(1, vec![])]);
    }

    #[tokio::test]
    async fn role_without_relations_gets_empty_forest() {
        let store = MemoryStore::seeded();
        let tree = MenuService::new(&store).menus_for_role(RoleId(1)).await.unwrap();
        assert!(tree.is_empty());
    }

    #[tokio::test]
    async fn replace_then_read_is_exact() {
        let store = MemoryStore::seeded();
        let service = MenuService::new(&store);
        let admin = store.caller(1).await;

        let ids = service
            .replace_assignments(&admin, RoleId(2), menu_ids(&[10, 11]))
            .await
            .unwrap();
        assert_eq!(ids, menu_ids(&[10, 11]));

        let tree = service.menus_for_role(RoleId(2)).await.unwrap();
        assert_eq!(shape(&tree), vec![(10, vec![11])]);
        let total: usize = tree.iter().map(TreeItem::size).sum();
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn unassigned_ancestors_are_not_included() {
        let store = MemoryStore::seeded();
        let service = MenuService::new(&store);

        service
            .replace_assignments(&store.caller(1).await, RoleId(2), menu_ids(&[11, 3]))
            .await
            .unwrap();

        let tree = service.menus_for_role(RoleId(2)).await.unwrap();
        // Both orphans have order_no 1; id breaks the tie
        assert_eq!(shape(&tree), vec![(3, vec![]), (11, vec![])]);
    }

    #[tokio::test]
    async fn replace_deduplicates() {
        let store = MemoryStore::seeded();
        let ids = MenuService::new(&store)
            .replace_assignments(&store.caller(1).await, RoleId(3), menu_ids(&[4, 1, 4, 1]))
            .await
            .unwrap();
        assert_eq!(ids, menu_ids(&[1, 4]));
        assert_eq!(store.relations_for(3), vec![1, 4]);
    }

    #[tokio::test]
    async fn failed_replace_keeps_previous_assignments() {
        let store = MemoryStore::seeded();
        store.fail_next_assignment();

        let err = MenuService::new(&store)
            .replace_assignments(&store.caller(1).await, RoleId(2), menu_ids(&[10]))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Integrity(_)));
        assert_eq!(store.relations_for(2), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn replace_rejects_unknown_menus_and_roles() {
        let store = MemoryStore::seeded();
        let service = MenuService::new(&store);
        let admin = store.caller(1).await;

        let err = service
            .replace_assignments(&admin, RoleId(2), menu_ids(&[1, 404]))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(ref msg) if msg.contains("404")));
        assert_eq!(store.relations_for(2), vec![1, 2, 3]);

        let err = service
            .replace_assignments(&admin, RoleId(99), menu_ids(&[1]))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn only_superadmin_manages_assignments() {
        let store = MemoryStore::seeded();
        let err = MenuService::new(&store)
            .replace_assignments(&store.caller(2).await, RoleId(3), menu_ids(&[1]))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
        assert_eq!(store.relations_for(3), vec![1, 5]);
    }

    #[tokio::test]
    async fn full_tree_includes_inactive_menus() {
        let store = MemoryStore::seeded();
        let tree = MenuService::new(&store)
            .full_menu_tree(&store.caller(1).await)
            .await
            .unwrap();
        assert_eq!(
            shape(&tree),
            vec![(1, vec![]), (2, vec![3, 4]), (5, vec![]), (10, vec![11])]
        );
    }

    #[tokio::test]
    async fn role_assignments_are_sorted() {
        let store = MemoryStore::seeded();
        let ids = MenuService::new(&store)
            .role_assignments(&store.caller(1).await, RoleId(3))
            .await
            .unwrap();
        assert_eq!(ids, menu_ids(&[1, 5]));
    }

    #[tokio::test]
    async fn delete_menu_clears_relations_and_respects_children() {
        let store = MemoryStore::seeded();
        let service = MenuService::new(&store);
        let admin = store.caller(1).await;

        let err = service.delete_menu(&admin, MenuId(2)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        service.delete_menu(&admin, MenuId(3)).await.unwrap();
        assert!(store.get_menu(MenuId(3)).await.unwrap().is_none());
        assert_eq!(store.relations_for(2), vec![1, 2]);
    }

    #[tokio::test]
    async fn menu_cannot_move_under_own_child() {
        let store = MemoryStore::seeded();
        let err = MenuService::new(&store)
            .update_menu(
                &store.caller(1).await,
                MenuId(10),
                UpdateMenu {
                    parent_id: Some(Some(MenuId(11))),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn create_menu_under_existing_parent() {
        let store = MemoryStore::seeded();
        let service = MenuService::new(&store);
        let admin = store.caller(1).await;

        let menu = service
            .create_menu(
                &admin,
                CreateMenu {
                    name: "Audit Log".to_string(),
                    path: Some("/settings/audit".to_string()),
                    icon: None,
                    parent_id: Some(MenuId(2)),
                    order_no: 3,
                    is_active: true,
                },
            )
            .await
            .unwrap();
        assert_eq!(menu.parent_id, Some(MenuId(2)));

        let err = service
            .create_menu(
                &admin,
                CreateMenu {
                    name: "Lost".to_string(),
                    path: None,
                    icon: None,
                    parent_id: Some(MenuId(404)),
                    order_no: 0,
                    is_active: true,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn roles_are_listed_for_admins_only() {
        let store = MemoryStore::seeded();
        let service = MenuService::new(&store);

        let roles = service.roles(&store.caller(2).await).await.unwrap();
        assert_eq!(roles.len(), 3);

        assert!(matches!(
            service.roles(&store.caller(3).await).await,
            Err(ServiceError::Forbidden(_))
        ));
    }
}
