//! School seeding functionality.
//!
//! Provides functions for generating and inserting fake school data
//! into the database. Every school is owned by a freshly seeded manager.

use std::time::Instant;

use fake::Fake;
use fake::faker::address::en::*;
use fake::faker::phone_number::en::PhoneNumber;
use jifunze_models::{SchoolId, UserId};
use rayon::prelude::*;
use sqlx::{PgConnection, PgPool};

use super::models::SchoolSeed;

/// Generates one school per owner in parallel using Rayon
pub fn generate_schools(owner_ids: &[UserId]) -> Vec<SchoolSeed> {
    owner_ids
        .par_iter()
        .map(|&owner_id| {
            let city: String = CityName().fake();
            let street: String = StreetName().fake();
            let building: String = BuildingNumber().fake();
            let state: String = StateAbbr().fake();
            let zip: String = ZipCode().fake();

            SchoolSeed {
                name: format!("{city} {} School", CitySuffix().fake::<String>()),
                address: format!("{building} {street}, {city}, {state} {zip}"),
                phone: PhoneNumber().fake(),
                owner_id,
            }
        })
        .collect()
}

/// Inserts schools and points each owner's `school_id` at their school.
pub async fn insert_schools_batch(
    db: &PgPool,
    schools: &[SchoolSeed],
) -> anyhow::Result<Vec<SchoolId>> {
    let start_time = Instant::now();
    let mut tx = db.begin().await?;

    const BATCH_SIZE: usize = 500;
    let mut all_ids = Vec::with_capacity(schools.len());

    for chunk in schools.chunks(BATCH_SIZE) {
        all_ids.extend(insert_schools_chunk(&mut tx, chunk).await?);
    }

    sqlx::query(
        "UPDATE users u SET school_id = s.id, updated_at = NOW()
         FROM schools s
         WHERE s.owner_id = u.id AND s.id = ANY($1) AND u.school_id IS NULL",
    )
    .bind(&all_ids)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    println!(
        "   ✓ Inserted {} schools in {:?}",
        all_ids.len(),
        start_time.elapsed()
    );

    Ok(all_ids)
}

async fn insert_schools_chunk(
    conn: &mut PgConnection,
    schools: &[SchoolSeed],
) -> anyhow::Result<Vec<SchoolId>> {
    if schools.is_empty() {
        return Ok(Vec::new());
    }

    let mut query = String::from("INSERT INTO schools (name, address, phone, owner_id) VALUES ");

    for i in 0..schools.len() {
        if i > 0 {
            query.push_str(", ");
        }
        let p = i * 4;
        query.push_str(&format!("(${}, ${}, ${}, ${})", p + 1, p + 2, p + 3, p + 4));
    }

    query.push_str(" RETURNING id");

    let mut q = sqlx::query_scalar::<_, SchoolId>(&query);
    for school in schools {
        q = q
            .bind(&school.name)
            .bind(&school.address)
            .bind(&school.phone)
            .bind(school.owner_id);
    }

    Ok(q.fetch_all(&mut *conn).await?)
}
