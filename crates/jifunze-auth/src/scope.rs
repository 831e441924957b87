//! Scope Resolver: decides whether a caller may perform an action on a
//! target.
//!
//! [`authorize`] is a pure function of the caller's claims, the action and a
//! [`Target`] describing the resource's tenant and owners. Rules are applied
//! in a fixed order and the first failing rule decides the denial reason:
//!
//! 1. public actions are allowed for everyone, others need claims
//!    ([`DenyReason::Unauthenticated`])
//! 2. the caller's role must be listed for the action
//!    ([`DenyReason::InsufficientRole`])
//! 3. tenant-scoped actions need the target in the caller's school; a
//!    manager's tenant is every school they own ([`DenyReason::CrossTenant`])
//! 4. ownership narrowing for educators and students
//!    ([`DenyReason::Forbidden`]); managers are exempt inside their tenant
//!
//! Nothing is cached: callers build a fresh [`Target`] from live rows on
//! every request.

use anyhow::anyhow;
use jifunze_core::AppError;
use jifunze_models::{PublicId, Role, SchoolId};

use crate::claims::Claims;

const STUDENTS_UP: &[Role] = &[Role::Student, Role::Educator, Role::Manager];
const STAFF: &[Role] = &[Role::Educator, Role::Manager];
const MANAGERS: &[Role] = &[Role::Manager];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    SchoolCreate,
    SchoolRead,
    SchoolUpdate,
    SchoolDelete,
    SchoolAssignUser,
    SchoolListUsers,

    UserRead,
    UserUpdate,
    UserDelete,
    UserList,

    CourseList,
    CourseRead,
    CourseCreate,
    CourseUpdate,
    CourseDelete,

    EnrollmentCreate,
    EnrollmentDelete,
    EnrollmentRead,
    EnrollmentList,

    AttendanceCreate,
    AttendanceUpdate,
    AttendanceDelete,
    AttendanceRead,
    AttendanceList,

    MessageCreate,
    MessageRead,
    MessageList,
    MessageUpdate,
    MessageDelete,

    ResourceCreate,
    ResourceRead,
    ResourceList,
    ResourceUpdate,
    ResourceDelete,
}

/// How an action narrows access beyond the caller's tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    None,
    /// The caller must own the target.
    Owner,
    /// Students only reach targets they own; staff see the whole tenant.
    StudentSelf,
    /// Educators must teach the target's course.
    Teaches,
    /// Educators must teach the course, students must be enrolled in it.
    CourseMember,
}

#[derive(Debug, Clone, Copy)]
pub struct Policy {
    /// `None` means public.
    pub roles: Option<&'static [Role]>,
    pub tenant_scoped: bool,
    pub ownership: Ownership,
    /// A caller acting on their own account skips the tenant check.
    pub self_service: bool,
}

impl Policy {
    const fn public() -> Self {
        Self {
            roles: None,
            tenant_scoped: false,
            ownership: Ownership::None,
            self_service: false,
        }
    }

    const fn tenant(roles: &'static [Role], ownership: Ownership) -> Self {
        Self {
            roles: Some(roles),
            tenant_scoped: true,
            ownership,
            self_service: false,
        }
    }
}

impl Action {
    pub const fn policy(self) -> Policy {
        use Action::*;
        use Ownership as O;

        match self {
            SchoolCreate => Policy {
                roles: Some(MANAGERS),
                tenant_scoped: false,
                ownership: O::None,
                self_service: false,
            },
            SchoolRead => Policy::tenant(STUDENTS_UP, O::None),
            SchoolUpdate | SchoolDelete | SchoolAssignUser | SchoolListUsers => {
                Policy::tenant(MANAGERS, O::None)
            }

            UserRead => Policy {
                self_service: true,
                ..Policy::tenant(STUDENTS_UP, O::StudentSelf)
            },
            UserUpdate => Policy {
                self_service: true,
                ..Policy::tenant(STUDENTS_UP, O::Owner)
            },
            UserDelete => Policy::tenant(MANAGERS, O::None),
            UserList => Policy::tenant(STAFF, O::None),

            CourseList | CourseRead => Policy::public(),
            CourseCreate => Policy::tenant(STAFF, O::None),
            CourseUpdate | CourseDelete => Policy::tenant(STAFF, O::Teaches),

            EnrollmentCreate | EnrollmentDelete => Policy::tenant(MANAGERS, O::None),
            EnrollmentRead | EnrollmentList => Policy::tenant(STUDENTS_UP, O::StudentSelf),

            AttendanceCreate | AttendanceUpdate | AttendanceDelete => {
                Policy::tenant(STAFF, O::None)
            }
            AttendanceRead | AttendanceList => Policy::tenant(STUDENTS_UP, O::StudentSelf),

            MessageCreate | MessageRead | MessageList => {
                Policy::tenant(STUDENTS_UP, O::CourseMember)
            }
            MessageUpdate | MessageDelete => Policy::tenant(STUDENTS_UP, O::Owner),

            ResourceCreate => Policy::tenant(STAFF, O::Teaches),
            ResourceRead | ResourceList => Policy::tenant(STUDENTS_UP, O::CourseMember),
            ResourceUpdate | ResourceDelete => Policy::tenant(STAFF, O::Owner),
        }
    }

    /// Reads hide cross-tenant targets as not found.
    pub const fn is_read(self) -> bool {
        use Action::*;
        matches!(
            self,
            SchoolRead
                | SchoolListUsers
                | UserRead
                | UserList
                | CourseList
                | CourseRead
                | EnrollmentRead
                | EnrollmentList
                | AttendanceRead
                | AttendanceList
                | MessageRead
                | MessageList
                | ResourceRead
                | ResourceList
        )
    }
}

/// Tenant and ownership facts about the resource being acted on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Target {
    pub school_id: Option<SchoolId>,
    /// Manager owning `school_id`
    pub school_owner: Option<PublicId>,
    /// Author, uploader, subject user, or account holder
    pub owner: Option<PublicId>,
    /// Educator of the course the target belongs to
    pub educator: Option<PublicId>,
    /// Whether the caller is enrolled in the target's course
    pub enrolled: bool,
}

impl Target {
    /// A target with no tenant, for public and unscoped actions.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn school(school_id: SchoolId, owner: PublicId) -> Self {
        Self {
            school_id: Some(school_id),
            school_owner: Some(owner),
            ..Self::default()
        }
    }

    pub fn with_owner(mut self, owner: PublicId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_educator(mut self, educator: PublicId) -> Self {
        self.educator = Some(educator);
        self
    }

    pub fn with_enrollment(mut self, enrolled: bool) -> Self {
        self.enrolled = enrolled;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    Unauthenticated,
    InsufficientRole,
    CrossTenant,
    Forbidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }

    /// Converts a denial into the matching error. For read actions a
    /// cross-tenant denial becomes `NotFound`.
    pub fn into_result(self, action: Action) -> Result<(), AppError> {
        let reason = match self {
            Decision::Allow => return Ok(()),
            Decision::Deny(reason) => reason,
        };

        Err(match reason {
            DenyReason::Unauthenticated => {
                AppError::unauthorized(anyhow!("Authentication required"))
            }
            DenyReason::InsufficientRole => {
                AppError::insufficient_role(anyhow!("Your role may not perform this action"))
            }
            DenyReason::CrossTenant if action.is_read() => {
                AppError::not_found(anyhow!("Resource not found"))
            }
            DenyReason::CrossTenant => {
                AppError::cross_tenant(anyhow!("Resource belongs to another school"))
            }
            DenyReason::Forbidden => {
                AppError::forbidden(anyhow!("You do not have access to this resource"))
            }
        })
    }
}

pub fn authorize(claims: Option<&Claims>, action: Action, target: &Target) -> Decision {
    let policy = action.policy();

    let Some(roles) = policy.roles else {
        return Decision::Allow;
    };
    let Some(claims) = claims else {
        return Decision::Deny(DenyReason::Unauthenticated);
    };
    if !roles.contains(&claims.role) {
        return Decision::Deny(DenyReason::InsufficientRole);
    }
    if policy.self_service && target.owner == Some(claims.sub) {
        return Decision::Allow;
    }

    if policy.tenant_scoped && !in_tenant(claims, target) {
        return Decision::Deny(DenyReason::CrossTenant);
    }
    if claims.role == Role::Manager {
        return Decision::Allow;
    }

    let owns = target.owner == Some(claims.sub);
    let teaches = target.educator == Some(claims.sub);
    let allowed = match policy.ownership {
        Ownership::None => true,
        Ownership::Owner => owns,
        Ownership::StudentSelf => claims.role != Role::Student || owns,
        Ownership::Teaches => claims.role != Role::Educator || teaches,
        Ownership::CourseMember => match claims.role {
            Role::Educator => teaches,
            Role::Student => target.enrolled,
            Role::Manager => true,
        },
    };

    if allowed {
        Decision::Allow
    } else {
        Decision::Deny(DenyReason::Forbidden)
    }
}

fn in_tenant(claims: &Claims, target: &Target) -> bool {
    match claims.role {
        Role::Manager => target.school_owner.is_some() && target.school_owner == Some(claims.sub),
        Role::Educator | Role::Student => {
            target.school_id.is_some() && target.school_id == claims.school_id
        }
    }
}

/// Authorizes and converts a denial into an error in one step.
pub fn require(claims: Option<&Claims>, action: Action, target: &Target) -> Result<(), AppError> {
    authorize(claims, action, target).into_result(action)
}
