use anyhow::anyhow;
use jifunze_auth::{Action, Claims, Target, check_fields};
use jifunze_core::{AppError, Paginated};
use jifunze_models::relations::Entity;
use jifunze_models::{
    AssignUserDto, CreateSchoolDto, School, SchoolFilterParams, SchoolId, UpdateSchoolDto, User,
    UserFilterParams,
};
use sqlx::{PgConnection, PgPool};
use tracing::{debug, error, info, instrument};

use crate::cascade::{CascadeSummary, delete_cascade};
use crate::guard::{check_school_assignment, lock_member};
use crate::metrics;
use crate::modules::users::service::USER_COLUMNS;
use crate::utils::auth_helpers::{
    Visibility, authorize, caller_id, load_school_scope, load_user_scope,
};

const SCHOOL_SELECT: &str = "SELECT s.id, s.name, s.address, s.phone, o.public_id AS owner_id,
        s.created_at, s.updated_at
     FROM schools s
     JOIN users o ON o.id = s.owner_id";

pub struct SchoolService;

impl SchoolService {
    async fn fetch(conn: &mut PgConnection, id: SchoolId) -> Result<School, AppError> {
        sqlx::query_as::<_, School>(&format!("{SCHOOL_SELECT} WHERE s.id = $1"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("School not found")))
    }

    /// Creates a school owned by the calling manager. A manager without a
    /// current school is switched to the new one.
    #[instrument(skip(db, claims, dto), fields(school.name = %dto.name, db.operation = "INSERT", db.table = "schools"))]
    pub async fn create_school(
        db: &PgPool,
        claims: &Claims,
        dto: CreateSchoolDto,
    ) -> Result<School, AppError> {
        authorize(Some(claims), Action::SchoolCreate, &Target::none())?;

        let mut tx = db.begin().await?;
        let owner_id = caller_id(&mut tx, claims).await?;

        let id: SchoolId = sqlx::query_scalar(
            "INSERT INTO schools (name, address, phone, owner_id)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(&dto.name)
        .bind(&dto.address)
        .bind(&dto.phone)
        .bind(owner_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            error!(error = %e, "Database error creating school");
            AppError::from(e)
        })?;

        sqlx::query(
            "UPDATE users SET school_id = $1, updated_at = NOW()
             WHERE id = $2 AND school_id IS NULL",
        )
        .bind(id)
        .bind(owner_id)
        .execute(&mut *tx)
        .await?;

        let school = Self::fetch(&mut tx, id).await?;
        tx.commit().await?;

        metrics::track_school_created();
        info!(school.id = %school.id, school.name = %school.name, "School created successfully");

        Ok(school)
    }

    /// Managers see the schools they own, everyone else their own school.
    #[instrument(skip(db, claims, filters), fields(db.operation = "SELECT", db.table = "schools"))]
    pub async fn list_schools(
        db: &PgPool,
        claims: &Claims,
        filters: SchoolFilterParams,
    ) -> Result<Paginated<School>, AppError> {
        let visibility = Visibility::for_claims(claims)?;
        authorize(Some(claims), Action::SchoolRead, &visibility.target())?;

        let limit = filters.pagination.limit();
        let offset = filters.pagination.offset();
        debug!(limit, offset, filter.name = ?filters.name, "Fetching schools");

        const WHERE: &str = "WHERE ($1::BIGINT IS NULL OR s.id = $1)
               AND ($2::UUID IS NULL OR o.public_id = $2)
               AND ($3::TEXT IS NULL OR s.name ILIKE '%' || $3 || '%')";

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM schools s JOIN users o ON o.id = s.owner_id {WHERE}"
        ))
        .bind(visibility.school_id)
        .bind(visibility.owner)
        .bind(filters.name.as_deref())
        .fetch_one(db)
        .await?;

        let schools = sqlx::query_as::<_, School>(&format!(
            "{SCHOOL_SELECT} {WHERE} ORDER BY s.created_at DESC, s.id DESC LIMIT $4 OFFSET $5"
        ))
        .bind(visibility.school_id)
        .bind(visibility.owner)
        .bind(filters.name.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
        .map_err(|e| {
            error!(error = %e, "Database error fetching schools");
            AppError::from(e)
        })?;

        Ok(Paginated::new(schools, total, &filters.pagination))
    }

    #[instrument(skip(db, claims), fields(school.id = %id, db.operation = "SELECT", db.table = "schools"))]
    pub async fn get_school(db: &PgPool, claims: &Claims, id: SchoolId) -> Result<School, AppError> {
        let mut conn = db.acquire().await?;

        let scope = load_school_scope(&mut conn, id).await?;
        authorize(Some(claims), Action::SchoolRead, &scope.target())?;

        Self::fetch(&mut conn, id).await
    }

    #[instrument(skip(db, claims, dto), fields(school.id = %id, db.operation = "UPDATE", db.table = "schools"))]
    pub async fn update_school(
        db: &PgPool,
        claims: &Claims,
        id: SchoolId,
        dto: UpdateSchoolDto,
    ) -> Result<School, AppError> {
        let fields = dto.changed_fields();
        if fields.is_empty() {
            return Err(AppError::bad_request(anyhow!("No fields to update")));
        }

        let mut tx = db.begin().await?;

        let scope = load_school_scope(&mut tx, id).await?;
        authorize(Some(claims), Action::SchoolUpdate, &scope.target())?;
        check_fields(claims.role, Entity::School, &fields)?;

        sqlx::query(
            "UPDATE schools
             SET name = COALESCE($1, name),
                 address = COALESCE($2, address),
                 phone = COALESCE($3, phone),
                 updated_at = NOW()
             WHERE id = $4",
        )
        .bind(dto.name.as_deref())
        .bind(dto.address.as_deref())
        .bind(dto.phone.as_deref())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let school = Self::fetch(&mut tx, id).await?;
        tx.commit().await?;

        info!(school.id = %id, fields = ?fields, "School updated");
        Ok(school)
    }

    /// Deletes the school with its courses and non-manager members in one
    /// transaction. Managers whose current school it was move to another
    /// school they own, or to none.
    #[instrument(skip(db, claims), fields(school.id = %id, db.operation = "DELETE", db.table = "schools"))]
    pub async fn delete_school(
        db: &PgPool,
        claims: &Claims,
        id: SchoolId,
    ) -> Result<CascadeSummary, AppError> {
        let mut tx = db.begin().await?;

        let scope = load_school_scope(&mut tx, id).await?;
        authorize(Some(claims), Action::SchoolDelete, &scope.target())?;

        sqlx::query("SELECT id FROM schools WHERE id = $1 FOR UPDATE")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let moved = sqlx::query(
            "UPDATE users u
             SET school_id = (
                     SELECT s.id FROM schools s
                     WHERE s.owner_id = u.id AND s.id <> $1
                     ORDER BY s.id
                     LIMIT 1
                 ),
                 updated_at = NOW()
             WHERE u.role = 'manager' AND u.school_id = $1",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        debug!(count = moved.rows_affected(), "Managers moved off the deleted school");

        let summary = delete_cascade(&mut tx, Entity::School, &[id.into_inner()]).await?;
        tx.commit().await?;

        metrics::track_cascade_delete(Entity::School.table());
        info!(
            school.id = %id,
            courses = summary.deleted(Entity::Course),
            users = summary.deleted(Entity::User),
            "School deleted"
        );

        Ok(summary)
    }

    /// Moves a student or educator into this school. The user must
    /// currently belong to a school the same manager owns.
    #[instrument(skip(db, claims, dto), fields(school.id = %id, user.public_id = %dto.user_id, db.operation = "UPDATE", db.table = "users"))]
    pub async fn assign_user(
        db: &PgPool,
        claims: &Claims,
        id: SchoolId,
        dto: AssignUserDto,
    ) -> Result<User, AppError> {
        let mut tx = db.begin().await?;

        let school = load_school_scope(&mut tx, id).await?;
        authorize(Some(claims), Action::SchoolAssignUser, &school.target())?;

        let current = load_user_scope(&mut tx, dto.user_id).await?;
        authorize(Some(claims), Action::SchoolAssignUser, &current.target())?;

        let member = lock_member(&mut tx, dto.user_id).await?;
        check_school_assignment(&mut tx, &member, id, dto.role).await?;

        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET school_id = $1, updated_at = NOW()
             WHERE id = $2
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(member.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(school.id = %id, user.public_id = %user.public_id, "User assigned to school");
        Ok(user)
    }

    #[instrument(skip(db, claims, filters), fields(school.id = %id, db.operation = "SELECT", db.table = "users"))]
    pub async fn list_school_users(
        db: &PgPool,
        claims: &Claims,
        id: SchoolId,
        filters: UserFilterParams,
    ) -> Result<Paginated<User>, AppError> {
        let mut conn = db.acquire().await?;

        let scope = load_school_scope(&mut conn, id).await?;
        authorize(Some(claims), Action::SchoolListUsers, &scope.target())?;

        let limit = filters.pagination.limit();
        let offset = filters.pagination.offset();

        const WHERE: &str = "WHERE school_id = $1
               AND ($2::TEXT IS NULL OR role = $2)
               AND ($3::TEXT IS NULL OR name ILIKE '%' || $3 || '%')";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM users {WHERE}"))
            .bind(id)
            .bind(filters.role)
            .bind(filters.name.as_deref())
            .fetch_one(&mut *conn)
            .await?;

        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users {WHERE}
             ORDER BY created_at DESC, id DESC
             LIMIT $4 OFFSET $5"
        ))
        .bind(id)
        .bind(filters.role)
        .bind(filters.name.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *conn)
        .await?;

        Ok(Paginated::new(users, total, &filters.pagination))
    }
}
