use farmgate_auth::{Role, Subject};
use farmgate_core::{CompanyId, UserId};

/// Header carrying the verified user id (set by the authentication gateway).
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying the verified role.
pub const ROLE_HEADER: &str = "x-user-role";
/// Header carrying the user's company, when the user belongs to one.
pub const COMPANY_ID_HEADER: &str = "x-company-id";

/// Acting identity for a request.
///
/// This is immutable and must be present for all administrative routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorContext {
    subject: Subject,
}

impl ActorContext {
    pub fn new(user_id: UserId, role: Role, company_id: Option<CompanyId>) -> Self {
        Self {
            subject: Subject::new(user_id, role, company_id),
        }
    }

    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    pub fn user_id(&self) -> &UserId {
        &self.subject.user_id
    }

    pub fn role(&self) -> Role {
        self.subject.role
    }
}
