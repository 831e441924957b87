//! Deletes driven by the relation table in [`jifunze_models::relations`].
//!
//! For each entity being removed, restricting edges are checked first, then
//! nullifying edges detach referencing rows and cascading edges recurse into
//! their children before the rows themselves are deleted. Everything runs on
//! one connection, normally inside the caller's transaction, so a refused
//! delete leaves nothing behind.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use jifunze_core::AppError;
use jifunze_models::relations::{Entity, OnDelete, children_of, restricting};
use sqlx::PgConnection;
use tracing::{debug, info, instrument};

use crate::guard::GuardError;

/// Rows touched by a cascading delete, per table.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CascadeSummary {
    pub deleted: BTreeMap<&'static str, u64>,
    pub detached: BTreeMap<&'static str, u64>,
}

impl CascadeSummary {
    pub fn deleted(&self, entity: Entity) -> u64 {
        self.deleted.get(entity.table()).copied().unwrap_or(0)
    }

    fn record_deleted(&mut self, entity: Entity, rows: u64) {
        if rows > 0 {
            *self.deleted.entry(entity.table()).or_default() += rows;
        }
    }

    fn record_detached(&mut self, entity: Entity, rows: u64) {
        if rows > 0 {
            *self.detached.entry(entity.table()).or_default() += rows;
        }
    }
}

type CascadeFuture<'a> = Pin<Box<dyn Future<Output = Result<(), AppError>> + Send + 'a>>;

/// Deletes `ids` of `entity` and everything that depends on them.
///
/// # Errors
///
/// Returns a `Conflict` naming the referencing table when a restricting
/// edge still has children.
#[instrument(skip(conn, ids), fields(cascade.root = %entity, cascade.count = ids.len()))]
pub async fn delete_cascade(
    conn: &mut PgConnection,
    entity: Entity,
    ids: &[i64],
) -> Result<CascadeSummary, AppError> {
    let mut summary = CascadeSummary::default();
    delete_rows(conn, entity, ids.to_vec(), &mut summary).await?;

    info!(
        cascade.root = %entity,
        deleted = ?summary.deleted,
        detached = ?summary.detached,
        "Cascading delete complete"
    );

    Ok(summary)
}

fn delete_rows<'a>(
    conn: &'a mut PgConnection,
    entity: Entity,
    ids: Vec<i64>,
    summary: &'a mut CascadeSummary,
) -> CascadeFuture<'a> {
    Box::pin(async move {
        if ids.is_empty() {
            return Ok(());
        }

        for edge in restricting(entity) {
            let sql = format!(
                "SELECT EXISTS (SELECT 1 FROM {} WHERE {} = ANY($1))",
                edge.child.table(),
                edge.column
            );
            let referenced: bool = sqlx::query_scalar(&sql)
                .bind(&ids)
                .fetch_one(&mut *conn)
                .await?;

            if referenced {
                debug!(edge = edge.name, "Delete refused by restricting edge");
                return Err(GuardError::HasDependents(edge.child.table()).into());
            }
        }

        for edge in children_of(entity) {
            match edge.on_delete {
                OnDelete::Restrict => {}
                OnDelete::Nullify => {
                    let sql = format!(
                        "UPDATE {table} SET {col} = NULL, updated_at = NOW() WHERE {col} = ANY($1)",
                        table = edge.child.table(),
                        col = edge.column
                    );
                    let result = sqlx::query(&sql).bind(&ids).execute(&mut *conn).await?;
                    summary.record_detached(edge.child, result.rows_affected());
                }
                OnDelete::Cascade => {
                    let sql = format!(
                        "SELECT id FROM {} WHERE {} = ANY($1)",
                        edge.child.table(),
                        edge.column
                    );
                    let child_ids: Vec<i64> = sqlx::query_scalar(&sql)
                        .bind(&ids)
                        .fetch_all(&mut *conn)
                        .await?;

                    delete_rows(&mut *conn, edge.child, child_ids, summary).await?;
                }
            }
        }

        let sql = format!("DELETE FROM {} WHERE id = ANY($1)", entity.table());
        let result = sqlx::query(&sql).bind(&ids).execute(&mut *conn).await?;
        summary.record_deleted(entity, result.rows_affected());

        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts_accumulate() {
        let mut summary = CascadeSummary::default();
        summary.record_deleted(Entity::Message, 2);
        summary.record_deleted(Entity::Message, 3);
        summary.record_deleted(Entity::Course, 0);

        assert_eq!(summary.deleted(Entity::Message), 5);
        assert_eq!(summary.deleted(Entity::Course), 0);
        assert!(!summary.deleted.contains_key("courses"));
    }

    #[test]
    fn test_detached_is_separate() {
        let mut summary = CascadeSummary::default();
        summary.record_detached(Entity::Attendance, 1);
        assert_eq!(summary.deleted(Entity::Attendance), 0);
        assert_eq!(summary.detached.get("attendance"), Some(&1));
    }
}
