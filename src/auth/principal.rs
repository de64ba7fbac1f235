use serde::Serialize;

/// The authenticated caller, resolved once per request and passed
/// explicitly into services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    /// Subject from the identity provider. Conversations are owned by this id.
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    /// Granted when `email` is listed in `auth.admin_emails`.
    pub is_admin: bool,
}

impl Principal {
    /// Whether this caller owns a resource owned by `owner_id`.
    pub fn owns(&self, owner_id: &str) -> bool {
        self.id == owner_id
    }

    /// Owners and admins may read; see [`Principal::owns`] for writes.
    pub fn can_read(&self, owner_id: &str) -> bool {
        self.is_admin || self.owns(owner_id)
    }
}
