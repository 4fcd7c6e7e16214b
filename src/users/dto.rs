use serde::{Deserialize, Serialize};

use crate::credentials::CredentialHasher;
use crate::error::AppError;
use crate::users::repo_types::User;

const PASSWORD_MAX_CHARS: usize = 20;
const PAGE_MAX: u32 = 100;

/// Fields shared by every user shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBase {
    pub name: String,
    pub lastname: String,
    #[serde(default)]
    pub age: Option<i64>,
}

/// Request body for user creation. Everything but the identifier is required.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    #[serde(flatten)]
    pub base: UserBase,
    pub email: String,
    pub password: String,
    pub cv: String,
}

/// Request body for an update. `lastname` stays required as in the base;
/// the other fields are left untouched when absent.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateUser {
    #[serde(default)]
    pub name: Option<String>,
    pub lastname: String,
    #[serde(default)]
    pub age: Option<i64>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub cv: Option<String>,
}

impl UpdateUser {
    /// Writes the sent fields onto `user`, running a new password
    /// through `hasher` first. Identifier and email are never touched.
    pub fn apply(self, user: &mut User, hasher: &dyn CredentialHasher) -> anyhow::Result<()> {
        if let Some(password) = self.password {
            user.password = hasher.hash(&password)?;
        }
        if let Some(name) = self.name {
            user.name = name;
        }
        user.lastname = self.lastname;
        if let Some(age) = self.age {
            user.age = Some(age);
        }
        if let Some(cv) = self.cv {
            user.cv = cv;
        }
        Ok(())
    }
}

/// Request body confirming a deletion.
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteUser {
    #[serde(flatten)]
    pub base: UserBase,
    pub password: String,
}

impl DeleteUser {
    pub fn validate(&self) -> Result<(), AppError> {
        let len = self.password.chars().count();
        if len == 0 || len > PASSWORD_MAX_CHARS {
            return Err(AppError::Validation(format!(
                "password must be between 1 and {PASSWORD_MAX_CHARS} characters"
            )));
        }
        Ok(())
    }
}

/// The only user shape that leaves the service: no password, no CV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicUser {
    pub user_id: i64,
    #[serde(flatten)]
    pub base: UserBase,
    pub email: String,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            base: UserBase {
                name: user.name,
                lastname: user.lastname,
                age: user.age,
            },
            email: user.email,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub ok: bool,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub offset: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    PAGE_MAX
}

impl Pagination {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.limit > PAGE_MAX {
            return Err(AppError::Validation(format!(
                "limit must be less than or equal to {PAGE_MAX}"
            )));
        }
        Ok(())
    }
}
