use devtrack_core::UserId;

use crate::Role;

const ANY_MEMBER: &[Role] = &[Role::Admin, Role::Dev, Role::Viewer];
const WRITERS: &[Role] = &[Role::Admin, Role::Dev];
const ADMINS: &[Role] = &[Role::Admin];
const NOBODY: &[Role] = &[];

/// An intended operation within a project.
///
/// Actions that carry a narrow per-resource grant (ticket assignee, comment
/// author) embed the fact the grant depends on, so the decision stays pure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ViewProject,
    ListTickets,
    ListMembers,
    ReadTicket,
    CreateComment,
    CreateTicket,
    EditTicket,
    DeleteTicket,
    AddMember,
    UpdateProject,
    DeleteProject,
    /// Change only `status`/`order` of a ticket (drag-and-drop path).
    MoveTicket { assignee: Option<UserId> },
    EditComment { author: UserId },
    DeleteComment { author: UserId },
}

impl Action {
    /// Stable name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Action::ViewProject => "project.view",
            Action::ListTickets => "ticket.list",
            Action::ListMembers => "member.list",
            Action::ReadTicket => "ticket.read",
            Action::CreateComment => "comment.create",
            Action::CreateTicket => "ticket.create",
            Action::EditTicket => "ticket.edit",
            Action::DeleteTicket => "ticket.delete",
            Action::AddMember => "member.add",
            Action::UpdateProject => "project.update",
            Action::DeleteProject => "project.delete",
            Action::MoveTicket { .. } => "ticket.move",
            Action::EditComment { .. } => "comment.edit",
            Action::DeleteComment { .. } => "comment.delete",
        }
    }

    /// Coarse role table. Narrow grants are layered on top in `authorize`.
    pub fn allowed_roles(&self) -> &'static [Role] {
        match self {
            Action::ViewProject
            | Action::ListTickets
            | Action::ListMembers
            | Action::ReadTicket
            | Action::CreateComment => ANY_MEMBER,
            Action::CreateTicket
            | Action::EditTicket
            | Action::DeleteTicket
            | Action::MoveTicket { .. } => WRITERS,
            Action::AddMember | Action::UpdateProject | Action::DeleteProject => ADMINS,
            Action::EditComment { .. } | Action::DeleteComment { .. } => NOBODY,
        }
    }
}
