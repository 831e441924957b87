//! Demo data seeding.
//!
//! Seeds whole tenants: a manager, the school they own, its educators and
//! students, courses taught by those educators and enrollments into them.
//! Seeded accounts share [`SEED_PASSWORD`] and an email under
//! [`SEED_EMAIL_DOMAIN`], which is how [`clear_seed`] finds them again.

mod courses;
mod models;
mod schools;
mod users;

use std::collections::HashMap;
use std::time::Instant;

use anyhow::anyhow;
use jifunze::cascade::delete_cascade;
use jifunze_models::relations::Entity;
use jifunze_models::{Role, SchoolId};
use sqlx::PgPool;

pub use models::{
    CourseRoster, CoursesPerSchool, SEED_EMAIL_DOMAIN, SEED_PASSWORD, SchoolMembers, SeedConfig,
    UsersPerSchool,
};

/// Counts of rows created by [`seed_all`].
#[derive(Debug, Default)]
pub struct SeedReport {
    pub schools: usize,
    pub users: usize,
    pub courses: usize,
    pub enrollments: u64,
}

pub async fn seed_all(db: &PgPool, config: SeedConfig) -> anyhow::Result<SeedReport> {
    let start_time = Instant::now();
    let mut report = SeedReport::default();

    println!("👤 Seeding {} managers...", config.num_schools);
    let managers = users::generate_managers(config.num_schools)?;
    let manager_ids = users::insert_users_batch(db, &managers).await?;
    report.users += manager_ids.len();

    println!("📚 Seeding {} schools...", manager_ids.len());
    let school_seeds = schools::generate_schools(&manager_ids);
    let school_ids = schools::insert_schools_batch(db, &school_seeds).await?;
    report.schools = school_ids.len();

    let educators = config.users_per_school.educators;
    let students = config.users_per_school.students;
    println!(
        "👥 Seeding {} educators and {} students per school...",
        educators, students
    );
    let member_seeds = users::generate_members(&school_ids, educators, students)?;
    let member_ids = users::insert_users_batch(db, &member_seeds).await?;
    report.users += member_ids.len();

    let mut by_school: HashMap<SchoolId, SchoolMembers> = school_ids
        .iter()
        .map(|&school_id| {
            let members = SchoolMembers {
                school_id,
                educators: Vec::with_capacity(educators),
                students: Vec::with_capacity(students),
            };
            (school_id, members)
        })
        .collect();

    for (seed, id) in member_seeds.iter().zip(member_ids) {
        let Some(members) = seed.school_id.and_then(|s| by_school.get_mut(&s)) else {
            continue;
        };
        match seed.role {
            Role::Educator => members.educators.push(id),
            Role::Student => members.students.push(id),
            Role::Manager => {}
        }
    }

    let members: Vec<SchoolMembers> = school_ids
        .iter()
        .filter_map(|id| by_school.remove(id))
        .collect();

    println!(
        "📖 Seeding {} courses per school...",
        config.courses_per_school.count
    );
    let course_seeds = courses::generate_courses(&members, config.courses_per_school.count);
    let course_ids = courses::insert_courses_batch(db, &course_seeds).await?;
    report.courses = course_ids.len();

    let mut rosters: HashMap<SchoolId, Vec<CourseRoster>> = HashMap::new();
    for (seed, course_id) in course_seeds.iter().zip(course_ids) {
        let students = members
            .iter()
            .find(|m| m.school_id == seed.school_id)
            .map(|m| m.students.clone())
            .unwrap_or_default();
        rosters
            .entry(seed.school_id)
            .or_default()
            .push(CourseRoster {
                course_id,
                students,
            });
    }

    println!("📝 Seeding enrollments...");
    let pairs: Vec<_> = rosters
        .values()
        .flat_map(|school_rosters| {
            courses::plan_enrollments(
                school_rosters,
                config.courses_per_school.enrollments_per_student,
            )
        })
        .collect();
    report.enrollments = courses::insert_enrollments(db, &pairs).await?;

    println!("\n✅ Seeding complete in {:?}", start_time.elapsed());
    println!(
        "   {} schools, {} users, {} courses, {} enrollments",
        report.schools, report.users, report.courses, report.enrollments
    );
    println!("   Seeded accounts use the password \"{SEED_PASSWORD}\"");

    Ok(report)
}

/// Removes every seeded school with its courses and members, then any
/// seeded account left over. Accounts outside the seed domain are kept.
pub async fn clear_seed(db: &PgPool) -> anyhow::Result<()> {
    let start_time = Instant::now();
    println!("🗑️  Clearing seeded data...");

    let mut tx = db.begin().await?;

    let school_ids: Vec<i64> = sqlx::query_scalar(
        "SELECT s.id FROM schools s
         JOIN users o ON o.id = s.owner_id
         WHERE o.email LIKE '%@' || $1",
    )
    .bind(SEED_EMAIL_DOMAIN)
    .fetch_all(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE users SET school_id = NULL, updated_at = NOW()
         WHERE role = 'manager' AND school_id = ANY($1)",
    )
    .bind(&school_ids)
    .execute(&mut *tx)
    .await?;

    let schools = delete_cascade(&mut tx, Entity::School, &school_ids)
        .await
        .map_err(|e| anyhow!("Failed to clear seeded schools: {e}"))?;

    let user_ids: Vec<i64> =
        sqlx::query_scalar("SELECT id FROM users WHERE email LIKE '%@' || $1")
            .bind(SEED_EMAIL_DOMAIN)
            .fetch_all(&mut *tx)
            .await?;

    let users = delete_cascade(&mut tx, Entity::User, &user_ids)
        .await
        .map_err(|e| anyhow!("Failed to clear seeded users: {e}"))?;

    tx.commit().await?;

    println!(
        "   ✓ Deleted {} schools, {} courses and {} users in {:?}",
        schools.deleted(Entity::School),
        schools.deleted(Entity::Course),
        schools.deleted(Entity::User) + users.deleted(Entity::User),
        start_time.elapsed()
    );

    Ok(())
}
