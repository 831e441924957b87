//! # Jifunze Models
//!
//! Domain models and DTOs for the Jifunze API.
//!
//! Entities are the API views of stored rows: any reference to a user is
//! rendered as its [`PublicId`], never as the internal numeric key.
//!
//! # Modules
//!
//! - [`ids`]: typed entity ids and the user [`PublicId`]
//! - [`value_types`]: [`Email`], [`Role`], [`AttendanceStatus`]
//! - [`auth`]: registration, login, refresh and password reset DTOs
//! - [`users`], [`schools`], [`courses`], [`enrollments`], [`attendance`],
//!   [`messages`], [`resources`]: entities and their DTOs
//! - [`relations`]: the parent/child edge table that drives deletes
//!
//! # Example
//!
//! ```ignore
//! use jifunze_models::relations::{children_of, Entity};
//!
//! for edge in children_of(Entity::Course) {
//!     println!("{} -> {}.{}", edge.parent, edge.child, edge.column);
//! }
//! ```

pub mod attendance;
pub mod auth;
pub mod courses;
pub mod enrollments;
pub mod ids;
pub mod messages;
pub mod relations;
pub mod resources;
pub mod schools;
pub mod users;
pub mod value_types;

pub use ids::{
    AttendanceId, CourseId, EnrollmentId, MessageId, PublicId, ResetTokenId, ResourceId, SchoolId,
    UserId,
};
pub use value_types::{AttendanceStatus, Email, Role, ValueTypeError};

pub use auth::{
    ForgotPasswordRequest, ForgotPasswordResponse, LoginRequest, LoginResponse, RegisterRequest,
    ResetPasswordRequest, TokenPairResponse,
};
pub use users::{ChangePasswordDto, UpdateUserDto, User, UserCredentials, UserFilterParams};
pub use schools::{AssignUserDto, CreateSchoolDto, School, SchoolFilterParams, UpdateSchoolDto};
pub use courses::{Course, CourseFilterParams, CreateCourseDto, UpdateCourseDto};
pub use enrollments::{CreateEnrollmentDto, Enrollment, EnrollmentFilterParams};
pub use attendance::{
    Attendance, AttendanceFilterParams, CreateAttendanceDto, UpdateAttendanceDto,
};
pub use messages::{CreateMessageDto, Message, MessageFilterParams, UpdateMessageDto};
pub use resources::{CreateResourceDto, Resource, ResourceFilterParams, UpdateResourceDto};
