// org.rs — Organization/User/Membership stores. Slug and email uniqueness
// are enforced by a secondary linear scan over `list()` — small tenant
// counts make this adequate; a real deployment's "keyed store" would back
// it with a unique index instead.

use chrono::Utc;
use uuid::Uuid;

use crate::error::GatewayError;
use crate::model::{Membership, Organization, Role, User};
use crate::store::JsonStore;

pub struct OrgStore {
    inner: JsonStore<Organization>,
}

impl OrgStore {
    pub fn new(dir: impl AsRef<std::path::Path>) -> Result<Self, GatewayError> {
        Ok(Self { inner: JsonStore::new(dir)? })
    }

    pub fn create(&self, name: &str, slug: &str) -> Result<Organization, GatewayError> {
        if self.find_by_slug(slug)?.is_some() {
            return Err(GatewayError::Conflict(format!("organization slug '{slug}' already in use")));
        }
        let org = Organization {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug: slug.to_string(),
            created_at: Utc::now(),
        };
        self.inner.save(&org)?;
        Ok(org)
    }

    pub fn get(&self, id: Uuid) -> Result<Option<Organization>, GatewayError> {
        self.inner.get(&id.to_string())
    }

    pub fn list(&self) -> Result<Vec<Organization>, GatewayError> {
        self.inner.list()
    }

    pub fn find_by_slug(&self, slug: &str) -> Result<Option<Organization>, GatewayError> {
        Ok(self.inner.list()?.into_iter().find(|o| o.slug == slug))
    }
}

pub struct UserStore {
    inner: JsonStore<User>,
}

impl UserStore {
    pub fn new(dir: impl AsRef<std::path::Path>) -> Result<Self, GatewayError> {
        Ok(Self { inner: JsonStore::new(dir)? })
    }

    pub fn create(&self, email: &str, password_hash: &str) -> Result<User, GatewayError> {
        if self.find_by_email(email)?.is_some() {
            return Err(GatewayError::Conflict(format!("email '{email}' already registered")));
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            is_active: true,
            created_at: Utc::now(),
            last_login_at: None,
        };
        self.inner.save(&user)?;
        Ok(user)
    }

    pub fn get(&self, id: Uuid) -> Result<Option<User>, GatewayError> {
        self.inner.get(&id.to_string())
    }

    pub fn list(&self) -> Result<Vec<User>, GatewayError> {
        self.inner.list()
    }

    pub fn find_by_email(&self, email: &str) -> Result<Option<User>, GatewayError> {
        Ok(self.inner.list()?.into_iter().find(|u| u.email == email))
    }

    pub fn record_login(&self, id: Uuid) -> Result<User, GatewayError> {
        self.inner.update(&id.to_string(), |u| {
            u.last_login_at = Some(Utc::now());
            Ok(())
        })
    }
}

pub struct MembershipStore {
    inner: JsonStore<Membership>,
}

impl MembershipStore {
    pub fn new(dir: impl AsRef<std::path::Path>) -> Result<Self, GatewayError> {
        Ok(Self { inner: JsonStore::new(dir)? })
    }

    pub fn create(&self, org_id: Uuid, user_id: Uuid, role: Role) -> Result<Membership, GatewayError> {
        if self.find(org_id, user_id)?.is_some() {
            return Err(GatewayError::Conflict(format!(
                "user {user_id} is already a member of org {org_id}"
            )));
        }
        let membership = Membership {
            id: Uuid::new_v4(),
            org_id,
            user_id,
            role,
            created_at: Utc::now(),
        };
        self.inner.save(&membership)?;
        Ok(membership)
    }

    pub fn get(&self, id: Uuid) -> Result<Option<Membership>, GatewayError> {
        self.inner.get(&id.to_string())
    }

    pub fn list_for_org(&self, org_id: Uuid) -> Result<Vec<Membership>, GatewayError> {
        Ok(self.inner.list()?.into_iter().filter(|m| m.org_id == org_id).collect())
    }

    pub fn find(&self, org_id: Uuid, user_id: Uuid) -> Result<Option<Membership>, GatewayError> {
        Ok(self
            .inner
            .list()?
            .into_iter()
            .find(|m| m.org_id == org_id && m.user_id == user_id))
    }

    /// Every org a user belongs to, for `GET /auth/me`.
    pub fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Membership>, GatewayError> {
        Ok(self.inner.list()?.into_iter().filter(|m| m.user_id == user_id).collect())
    }

    /// Remove a membership, refusing to remove the organization's last
    /// OWNER — a strengthening spec.md itself does not name explicitly but
    /// that a sound membership model requires (see SPEC_FULL.md's ambient
    /// supplements).
    pub fn remove(&self, id: Uuid) -> Result<(), GatewayError> {
        let membership = self
            .inner
            .get(&id.to_string())?
            .ok_or_else(|| GatewayError::NotFound(id.to_string()))?;
        if membership.role == Role::Owner {
            let owners = self
                .list_for_org(membership.org_id)?
                .into_iter()
                .filter(|m| m.role == Role::Owner)
                .count();
            if owners <= 1 {
                return Err(GatewayError::Validation(
                    "cannot remove the last OWNER of an organization".to_string(),
                ));
            }
        }
        self.inner.delete(&id.to_string())?;
        Ok(())
    }
}
