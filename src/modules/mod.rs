pub mod attendance;
pub mod auth;
pub mod courses;
pub mod enrollments;
pub mod messages;
pub mod resources;
pub mod schools;
pub mod users;
