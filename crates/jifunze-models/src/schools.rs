//! School (tenant root) models and DTOs.

use crate::ids::{PublicId, SchoolId};
use crate::value_types::Role;
use jifunze_core::PaginationParams;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A school. `owner_id` is the public id of the owning manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct School {
    pub id: SchoolId,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub owner_id: PublicId,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for creating a school. The caller becomes the owner.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSchoolDto {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateSchoolDto {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
}

impl UpdateSchoolDto {
    pub fn changed_fields(&self) -> Vec<&'static str> {
        [
            ("name", self.name.is_some()),
            ("address", self.address.is_some()),
            ("phone", self.phone.is_some()),
        ]
        .into_iter()
        .filter_map(|(field, present)| present.then_some(field))
        .collect()
    }
}

/// Assigns an existing user into a school under an expected role.
///
/// The assignment is rejected when `role` differs from the user's current
/// role; roles are never changed through this call.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AssignUserDto {
    pub user_id: PublicId,
    pub role: Role,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchoolFilterParams {
    pub name: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}
