//! The authenticated caller.
//!
//! Authentication happens upstream; by the time a request reaches us the
//! caller is an opaque, already-verified principal. The HTTP layer builds a
//! [`Principal`] once per request and hands it to library operations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ShelfError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Admin,
    Founder,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Admin => "admin",
            Role::Founder => "founder",
        }
    }

    /// Admins and founders may publish, moderate and delete.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::Founder)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ShelfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "admin" => Ok(Role::Admin),
            "founder" => Ok(Role::Founder),
            other => Err(ShelfError::validation(format!("unknown role: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: String,
    pub display_name: String,
    pub role: Role,
}

impl Principal {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            role,
        }
    }

    /// Fail with `Forbidden` unless this principal is an admin or founder.
    pub fn require_staff(&self) -> Result<(), ShelfError> {
        if self.role.is_staff() {
            Ok(())
        } else {
            Err(ShelfError::Forbidden(
                "only admins and founders can do that".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staff_roles() {
        assert!(Principal::new("a", "Ana", Role::Admin).require_staff().is_ok());
        assert!(Principal::new("f", "Fe", Role::Founder)
            .require_staff()
            .is_ok());

        let err = Principal::new("s", "Sam", Role::Student)
            .require_staff()
            .unwrap_err();
        assert_eq!(err.kind(), "forbidden");
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(" Admin ".parse::<Role>().unwrap(), Role::Admin);
        assert!("teacher".parse::<Role>().is_err());
    }
}
