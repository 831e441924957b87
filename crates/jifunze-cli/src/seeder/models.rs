//! Data models for database seeding configuration.
//!
//! This module contains configuration structures for controlling how
//! demo data is generated during seeding operations.

use jifunze_models::{CourseId, Role, SchoolId, UserId};

/// Domain carried by every seeded email, so seeded rows can be told apart
/// from real accounts when clearing.
pub const SEED_EMAIL_DOMAIN: &str = "seed.jifunze.test";

/// Password given to every seeded account.
pub const SEED_PASSWORD: &str = "password123";

/// Seed data for creating a school.
pub struct SchoolSeed {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub owner_id: UserId,
}

/// Seed data for creating a user.
pub struct UserSeed {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub school_id: Option<SchoolId>,
}

/// Seed data for creating a course.
pub struct CourseSeed {
    pub title: String,
    pub description: String,
    pub school_id: SchoolId,
    pub educator_id: UserId,
}

/// A course together with the students of its school.
pub struct CourseRoster {
    pub course_id: CourseId,
    pub students: Vec<UserId>,
}

/// Members of one seeded school.
#[derive(Clone)]
pub struct SchoolMembers {
    pub school_id: SchoolId,
    pub educators: Vec<UserId>,
    pub students: Vec<UserId>,
}

/// Configuration for number of users per school.
#[derive(Clone)]
pub struct UsersPerSchool {
    pub educators: usize,
    pub students: usize,
}

impl Default for UsersPerSchool {
    fn default() -> Self {
        Self {
            educators: 4,
            students: 30,
        }
    }
}

/// Configuration for courses per school.
#[derive(Clone)]
pub struct CoursesPerSchool {
    pub count: usize,
    /// Each student is enrolled into this many of the school's courses.
    pub enrollments_per_student: usize,
}

impl Default for CoursesPerSchool {
    fn default() -> Self {
        Self {
            count: 6,
            enrollments_per_student: 3,
        }
    }
}

/// Complete configuration for database seeding.
#[derive(Clone, Default)]
pub struct SeedConfig {
    pub num_schools: usize,
    pub users_per_school: UsersPerSchool,
    pub courses_per_school: CoursesPerSchool,
}

impl SeedConfig {
    /// Creates a new seed configuration with the specified number of schools.
    pub fn new(num_schools: usize) -> Self {
        Self {
            num_schools,
            ..Default::default()
        }
    }

    pub fn with_users(mut self, users: UsersPerSchool) -> Self {
        self.users_per_school = users;
        self
    }

    pub fn with_courses(mut self, courses: CoursesPerSchool) -> Self {
        self.courses_per_school = courses;
        self
    }

    /// Users per school, counting the owning manager.
    pub fn total_users_per_school(&self) -> usize {
        1 + self.users_per_school.educators + self.users_per_school.students
    }

    /// Enrollments per school; capped by the number of courses.
    pub fn total_enrollments_per_school(&self) -> usize {
        self.users_per_school.students
            * self
                .courses_per_school
                .enrollments_per_student
                .min(self.courses_per_school.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals_count_the_manager() {
        let config = SeedConfig::new(2);
        assert_eq!(config.total_users_per_school(), 35);
    }

    #[test]
    fn test_enrollments_capped_by_course_count() {
        let config = SeedConfig::new(1).with_courses(CoursesPerSchool {
            count: 2,
            enrollments_per_student: 5,
        });
        assert_eq!(config.total_enrollments_per_school(), 60);
    }
}
