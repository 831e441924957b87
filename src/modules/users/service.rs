use anyhow::anyhow;
use jifunze_auth::{Action, Claims, check_fields};
use jifunze_core::{AppError, Paginated};
use jifunze_models::relations::Entity;
use jifunze_models::{ChangePasswordDto, PublicId, UpdateUserDto, User, UserFilterParams, UserId};
use sqlx::PgPool;
use tracing::{debug, error, info, instrument};

use crate::cascade::{CascadeSummary, delete_cascade};
use crate::guard::{check_role_change, lock_member};
use crate::metrics;
use crate::modules::auth::credentials::CredentialService;
use crate::modules::auth::service::map_email_conflict;
use crate::utils::auth_helpers::{
    Visibility, authorize, caller_id, load_school_scope, load_user_scope,
};

pub(crate) const USER_COLUMNS: &str =
    "id, public_id, name, email, role, school_id, created_at, updated_at";

pub struct UserService;

impl UserService {
    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "users"))]
    pub async fn find_by_id(db: &PgPool, id: UserId) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("User not found")))
    }

    #[instrument(skip(db, claims), fields(user.public_id = %claims.sub, db.operation = "SELECT", db.table = "users"))]
    pub async fn get_me(db: &PgPool, claims: &Claims) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE public_id = $1"
        ))
        .bind(claims.sub)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::unauthorized(anyhow!("Account no longer exists")))
    }

    #[instrument(skip(db, claims, filters), fields(db.operation = "SELECT", db.table = "users"))]
    pub async fn list_users(
        db: &PgPool,
        claims: &Claims,
        filters: UserFilterParams,
    ) -> Result<Paginated<User>, AppError> {
        let mut conn = db.acquire().await?;

        let mut visibility = Visibility::for_claims(claims)?;
        match filters.school_id {
            Some(school_id) => {
                let school = load_school_scope(&mut conn, school_id).await?;
                authorize(Some(claims), Action::UserList, &school.target())?;
                visibility.school_id = Some(school_id);
            }
            None => authorize(Some(claims), Action::UserList, &visibility.target())?,
        }

        let limit = filters.pagination.limit();
        let offset = filters.pagination.offset();

        debug!(
            limit,
            offset,
            filter.school_id = ?visibility.school_id,
            filter.role = ?filters.role,
            "Fetching users"
        );

        const WHERE: &str = "FROM users u
             LEFT JOIN schools s ON s.id = u.school_id
             LEFT JOIN users o ON o.id = s.owner_id
             WHERE ($1::BIGINT IS NULL OR u.school_id = $1)
               AND ($2::UUID IS NULL OR o.public_id = $2)
               AND ($3::TEXT IS NULL OR u.role = $3)
               AND ($4::TEXT IS NULL OR u.name ILIKE '%' || $4 || '%')";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) {WHERE}"))
            .bind(visibility.school_id)
            .bind(visibility.owner)
            .bind(filters.role)
            .bind(filters.name.as_deref())
            .fetch_one(&mut *conn)
            .await?;

        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT u.id, u.public_id, u.name, u.email, u.role, u.school_id, u.created_at, u.updated_at
             {WHERE}
             ORDER BY u.created_at DESC, u.id DESC
             LIMIT $5 OFFSET $6"
        ))
        .bind(visibility.school_id)
        .bind(visibility.owner)
        .bind(filters.role)
        .bind(filters.name.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| {
            error!(error = %e, "Database error fetching users");
            AppError::from(e)
        })?;

        Ok(Paginated::new(users, total, &filters.pagination))
    }

    #[instrument(skip(db, claims), fields(user.public_id = %public_id, db.operation = "SELECT", db.table = "users"))]
    pub async fn get_user(
        db: &PgPool,
        claims: &Claims,
        public_id: PublicId,
    ) -> Result<User, AppError> {
        let mut conn = db.acquire().await?;

        let scope = load_user_scope(&mut conn, public_id).await?;
        authorize(Some(claims), Action::UserRead, &scope.target())?;

        Self::find_by_id(db, scope.id).await
    }

    #[instrument(skip(db, claims, dto), fields(user.public_id = %public_id, db.operation = "UPDATE", db.table = "users"))]
    pub async fn update_user(
        db: &PgPool,
        claims: &Claims,
        public_id: PublicId,
        dto: UpdateUserDto,
    ) -> Result<User, AppError> {
        if dto.is_empty() {
            return Err(AppError::bad_request(anyhow!("No fields to update")));
        }

        let mut tx = db.begin().await?;

        let scope = load_user_scope(&mut tx, public_id).await?;
        authorize(Some(claims), Action::UserUpdate, &scope.target())?;
        check_fields(claims.role, Entity::User, &dto.changed_fields())?;

        if let Some(role) = dto.role {
            let member = lock_member(&mut tx, public_id).await?;
            check_role_change(&mut tx, &member, role).await?;
        }

        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users
             SET name = COALESCE($1, name),
                 email = COALESCE($2, email),
                 role = COALESCE($3, role),
                 updated_at = NOW()
             WHERE id = $4
             RETURNING {USER_COLUMNS}"
        ))
        .bind(dto.name.as_deref())
        .bind(dto.email.as_ref())
        .bind(dto.role)
        .bind(scope.id)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_email_conflict)?;

        tx.commit().await?;

        info!(user.public_id = %user.public_id, fields = ?dto.changed_fields(), "User updated");
        Ok(user)
    }

    /// Deletes a user with their enrollments and reset tokens. Refused while
    /// the user still has attendance, messages, resources, courses or
    /// schools.
    #[instrument(skip(db, claims), fields(user.public_id = %public_id, db.operation = "DELETE", db.table = "users"))]
    pub async fn delete_user(
        db: &PgPool,
        claims: &Claims,
        public_id: PublicId,
    ) -> Result<CascadeSummary, AppError> {
        let mut tx = db.begin().await?;

        let scope = load_user_scope(&mut tx, public_id).await?;
        authorize(Some(claims), Action::UserDelete, &scope.target())?;

        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(scope.id)
            .execute(&mut *tx)
            .await?;

        let summary = delete_cascade(&mut tx, Entity::User, &[scope.id.into_inner()]).await?;
        tx.commit().await?;

        metrics::track_cascade_delete(Entity::User.table());
        info!(user.public_id = %public_id, "User deleted");

        Ok(summary)
    }

    #[instrument(skip_all, fields(user.public_id = %claims.sub))]
    pub async fn change_password(
        db: &PgPool,
        claims: &Claims,
        dto: ChangePasswordDto,
    ) -> Result<(), AppError> {
        let user_id = {
            let mut conn = db.acquire().await?;
            caller_id(&mut conn, claims).await?
        };

        CredentialService::change_password(db, user_id, &dto.current_password, &dto.new_password)
            .await
    }
}
