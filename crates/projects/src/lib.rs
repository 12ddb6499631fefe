//! Projects and their role-scoped memberships.

pub mod membership;
pub mod project;

pub use membership::{MemberEntry, Membership};
pub use project::{NewProject, Project, ProjectPatch, ProjectSummary};
