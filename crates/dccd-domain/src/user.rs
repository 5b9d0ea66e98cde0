//! Archive member accounts as delivered by the user service.

use serde::{Deserialize, Serialize};

/// Role of an archive member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

/// An authenticated archive member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DccdUser {
    pub id: String,
    pub display_name: String,
    pub email: Option<String>,
    pub organisation: Option<String>,
    pub roles: Vec<Role>,
}

impl DccdUser {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            email: None,
            organisation: None,
            roles: vec![Role::User],
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }
}
