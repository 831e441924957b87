//! Course and enrollment seeding.

use std::time::Instant;

use fake::Fake;
use fake::faker::lorem::en::{Sentence, Word};
use jifunze_models::{CourseId, UserId};
use rayon::prelude::*;
use sqlx::{PgConnection, PgPool};

use super::models::{CourseRoster, CourseSeed, SchoolMembers};

const SUBJECTS: &[&str] = &[
    "Mathematics",
    "Biology",
    "Chemistry",
    "Physics",
    "History",
    "Geography",
    "Literature",
    "Kiswahili",
    "Computer Studies",
    "Art",
];

/// Generates `per_school` courses for each school, spreading them across the
/// school's educators. Titles stay unique within a school.
pub fn generate_courses(schools: &[SchoolMembers], per_school: usize) -> Vec<CourseSeed> {
    schools
        .par_iter()
        .filter(|school| !school.educators.is_empty())
        .flat_map_iter(|school| {
            (0..per_school).map(move |idx| {
                let subject = SUBJECTS[idx % SUBJECTS.len()];
                let level = idx / SUBJECTS.len() + 1;
                let flavour: String = Word().fake();

                CourseSeed {
                    title: format!("{subject} {level} ({flavour})"),
                    description: Sentence(6..12).fake(),
                    school_id: school.school_id,
                    educator_id: school.educators[idx % school.educators.len()],
                }
            })
        })
        .collect()
}

/// Pairs each student with `per_student` consecutive courses of their
/// school, wrapping around the course list.
pub fn plan_enrollments(rosters: &[CourseRoster], per_student: usize) -> Vec<(UserId, CourseId)> {
    if rosters.is_empty() {
        return Vec::new();
    }

    let per_student = per_student.min(rosters.len());
    let students = &rosters[0].students;

    students
        .iter()
        .enumerate()
        .flat_map(|(idx, &student)| {
            (0..per_student).map(move |offset| {
                let roster = &rosters[(idx + offset) % rosters.len()];
                (student, roster.course_id)
            })
        })
        .collect()
}

pub async fn insert_courses_batch(
    db: &PgPool,
    courses: &[CourseSeed],
) -> anyhow::Result<Vec<CourseId>> {
    let start_time = Instant::now();
    let mut tx = db.begin().await?;

    const BATCH_SIZE: usize = 1000;
    let mut all_ids = Vec::with_capacity(courses.len());

    for chunk in courses.chunks(BATCH_SIZE) {
        all_ids.extend(insert_courses_chunk(&mut tx, chunk).await?);
    }

    tx.commit().await?;

    println!(
        "   ✓ Inserted {} courses in {:?}",
        all_ids.len(),
        start_time.elapsed()
    );

    Ok(all_ids)
}

async fn insert_courses_chunk(
    conn: &mut PgConnection,
    courses: &[CourseSeed],
) -> anyhow::Result<Vec<CourseId>> {
    if courses.is_empty() {
        return Ok(Vec::new());
    }

    let mut query =
        String::from("INSERT INTO courses (title, description, school_id, educator_id) VALUES ");

    for i in 0..courses.len() {
        if i > 0 {
            query.push_str(", ");
        }
        let p = i * 4;
        query.push_str(&format!("(${}, ${}, ${}, ${})", p + 1, p + 2, p + 3, p + 4));
    }

    query.push_str(" RETURNING id");

    let mut q = sqlx::query_scalar::<_, CourseId>(&query);
    for course in courses {
        q = q
            .bind(&course.title)
            .bind(&course.description)
            .bind(course.school_id)
            .bind(course.educator_id);
    }

    Ok(q.fetch_all(&mut *conn).await?)
}

/// Inserts enrollments with UNNEST, skipping pairs that already exist.
pub async fn insert_enrollments(db: &PgPool, pairs: &[(UserId, CourseId)]) -> anyhow::Result<u64> {
    let start_time = Instant::now();

    let (user_ids, course_ids): (Vec<i64>, Vec<i64>) = pairs
        .iter()
        .map(|(user, course)| (user.into_inner(), course.into_inner()))
        .unzip();

    let inserted = sqlx::query(
        "INSERT INTO enrollments (user_id, course_id)
         SELECT * FROM UNNEST($1::BIGINT[], $2::BIGINT[])
         ON CONFLICT (user_id, course_id) DO NOTHING",
    )
    .bind(&user_ids)
    .bind(&course_ids)
    .execute(db)
    .await?
    .rows_affected();

    println!(
        "   ✓ Inserted {} enrollments in {:?}",
        inserted,
        start_time.elapsed()
    );

    Ok(inserted)
}
