//! User seeding functionality.
//!
//! Generates managers, educators and students with fake names. Every seeded
//! account gets its own bcrypt hash; hashing dominates seeding time, so it
//! runs on the rayon pool.

use std::time::Instant;

use anyhow::{Context, anyhow};
use fake::Fake;
use fake::faker::name::en::*;
use jifunze_core::hash_password;
use jifunze_models::{Role, SchoolId, UserId};
use rayon::prelude::*;
use sqlx::{PgConnection, PgPool};

use super::models::{SEED_EMAIL_DOMAIN, SEED_PASSWORD, UserSeed};

/// One user to generate, before hashing.
struct Pending {
    role: Role,
    school_id: Option<SchoolId>,
    group_idx: usize,
    user_idx: usize,
}

fn seed_email(name: &str, role: Role, group_idx: usize, user_idx: usize) -> String {
    let local: String = name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(".");

    format!(
        "{local}+{role}{}@{SEED_EMAIL_DOMAIN}",
        group_idx * 10_000 + user_idx
    )
}

fn generate(pending: Vec<Pending>) -> anyhow::Result<Vec<UserSeed>> {
    pending
        .into_par_iter()
        .map(|p| {
            let name: String = Name().fake();
            let password_hash =
                hash_password(SEED_PASSWORD).map_err(|e| anyhow!("Failed to hash password: {e}"))?;

            Ok(UserSeed {
                email: seed_email(&name, p.role, p.group_idx, p.user_idx),
                name,
                password_hash,
                role: p.role,
                school_id: p.school_id,
            })
        })
        .collect()
}

/// Generates one manager per school to be created.
pub fn generate_managers(count: usize) -> anyhow::Result<Vec<UserSeed>> {
    generate(
        (0..count)
            .map(|idx| Pending {
                role: Role::Manager,
                school_id: None,
                group_idx: idx,
                user_idx: 0,
            })
            .collect(),
    )
}

/// Generates educators and students for each school.
pub fn generate_members(
    school_ids: &[SchoolId],
    educators_per_school: usize,
    students_per_school: usize,
) -> anyhow::Result<Vec<UserSeed>> {
    let mut pending =
        Vec::with_capacity(school_ids.len() * (educators_per_school + students_per_school));

    for (school_idx, &school_id) in school_ids.iter().enumerate() {
        for user_idx in 0..educators_per_school {
            pending.push(Pending {
                role: Role::Educator,
                school_id: Some(school_id),
                group_idx: school_idx,
                user_idx,
            });
        }
        for user_idx in 0..students_per_school {
            pending.push(Pending {
                role: Role::Student,
                school_id: Some(school_id),
                group_idx: school_idx,
                user_idx,
            });
        }
    }

    generate(pending)
}

/// Inserts users in batches, returning ids in input order.
pub async fn insert_users_batch(db: &PgPool, users: &[UserSeed]) -> anyhow::Result<Vec<UserId>> {
    let start_time = Instant::now();
    let mut tx = db.begin().await?;

    // 5 params per user
    const BATCH_SIZE: usize = 1000;
    let mut all_ids = Vec::with_capacity(users.len());

    for chunk in users.chunks(BATCH_SIZE) {
        all_ids.extend(insert_users_chunk(&mut tx, chunk).await?);
    }

    tx.commit().await?;

    println!(
        "   ✓ Inserted {} users in {:?}",
        all_ids.len(),
        start_time.elapsed()
    );

    Ok(all_ids)
}

async fn insert_users_chunk(
    conn: &mut PgConnection,
    users: &[UserSeed],
) -> anyhow::Result<Vec<UserId>> {
    if users.is_empty() {
        return Ok(Vec::new());
    }

    let mut query =
        String::from("INSERT INTO users (name, email, password_hash, role, school_id) VALUES ");

    for i in 0..users.len() {
        if i > 0 {
            query.push_str(", ");
        }
        let p = i * 5;
        query.push_str(&format!(
            "(${}, ${}, ${}, ${}, ${})",
            p + 1,
            p + 2,
            p + 3,
            p + 4,
            p + 5
        ));
    }

    query.push_str(" RETURNING id");

    let mut q = sqlx::query_scalar::<_, UserId>(&query);
    for user in users {
        q = q
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role)
            .bind(user.school_id);
    }

    q.fetch_all(&mut *conn)
        .await
        .context("Failed to insert seeded users")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_email_is_unique_per_slot() {
        let a = seed_email("Ada Lovelace", Role::Student, 0, 1);
        let b = seed_email("Ada Lovelace", Role::Student, 1, 1);
        assert_eq!(a, format!("ada.lovelace+student1@{SEED_EMAIL_DOMAIN}"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_seed_email_strips_punctuation() {
        let email = seed_email("Mr. O'Neil Jr.", Role::Educator, 0, 0);
        assert_eq!(email, format!("mr.oneil.jr+educator0@{SEED_EMAIL_DOMAIN}"));
    }
}
