//! Ticket store: CRUD, filtering and board placement under project authorization.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use devtrack_auth::{Action, Principal};
use devtrack_core::{ProjectId, TicketId, UserId};
use devtrack_tickets::{
    NewTicket, Placement, Ticket, TicketFilter, TicketPatch, resolve_order, sort_for_board,
    sort_newest_first,
};

use crate::store::{Database, StoreTx};

use super::ServiceError;
use super::membership::{self, ensure, project_access};

/// A ticket with its assignee's email resolved for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketView {
    pub ticket: Ticket,
    pub assigned_to_email: Option<String>,
}

pub struct TicketService {
    db: Arc<dyn Database>,
}

impl TicketService {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Create a ticket in `project_id`.
    ///
    /// Checks run in order: authorization, assignee eligibility, title
    /// uniqueness. Without an explicit `order` the ticket is appended to its
    /// status lane.
    #[instrument(skip(self, principal, input), fields(user_id = %principal.id), err)]
    pub async fn create(
        &self,
        principal: &Principal,
        project_id: ProjectId,
        input: NewTicket,
    ) -> Result<TicketView, ServiceError> {
        let input = input.validate()?;

        let mut tx = self.db.begin().await?;
        let access = project_access(tx.as_mut(), principal, project_id).await?;
        ensure(principal, &access, &Action::CreateTicket)?;

        if let Some(assignee) = input.assigned_to {
            check_assignee(tx.as_mut(), project_id, assignee).await?;
        }

        let lane_max = tx.max_order(project_id, input.status).await?;
        let order = resolve_order(input.order, lane_max);
        let ticket = input.into_ticket(project_id, principal.id, order, Utc::now());
        tx.insert_ticket(&ticket).await?;

        let view = view_of(tx.as_mut(), ticket).await?;
        tx.commit().await?;

        info!(ticket_id = %view.ticket.id, project_id = %project_id, "ticket created");
        Ok(view)
    }

    pub async fn get(&self, principal: &Principal, ticket_id: TicketId) -> Result<TicketView, ServiceError> {
        let mut tx = self.db.begin().await?;
        let ticket = load(tx.as_mut(), ticket_id).await?;
        let access = project_access(tx.as_mut(), principal, ticket.project_id).await?;
        ensure(principal, &access, &Action::ReadTicket)?;
        view_of(tx.as_mut(), ticket).await
    }

    /// Board listing for one project: filtered, then sorted by `(status, order)`.
    #[instrument(skip(self, principal, filter), fields(user_id = %principal.id), err)]
    pub async fn list_by_project(
        &self,
        principal: &Principal,
        project_id: ProjectId,
        filter: &TicketFilter,
    ) -> Result<Vec<TicketView>, ServiceError> {
        let mut tx = self.db.begin().await?;
        let access = project_access(tx.as_mut(), principal, project_id).await?;
        ensure(principal, &access, &Action::ListTickets)?;

        let mut tickets: Vec<Ticket> = tx
            .tickets_in(&[project_id])
            .await?
            .into_iter()
            .filter(|t| filter.matches(t))
            .collect();
        sort_for_board(&mut tickets);
        views_of(tx.as_mut(), tickets).await
    }

    /// Tickets across every project the principal belongs to, newest first.
    pub async fn list_accessible(&self, principal: &Principal) -> Result<Vec<TicketView>, ServiceError> {
        let mut tx = self.db.begin().await?;
        let projects: Vec<ProjectId> = membership::list_projects_for(tx.as_mut(), principal.id)
            .await?
            .into_iter()
            .map(|s| s.project.id)
            .collect();
        let mut tickets = tx.tickets_in(&projects).await?;
        sort_newest_first(&mut tickets);
        views_of(tx.as_mut(), tickets).await
    }

    /// Partial update.
    ///
    /// A patch touching only `status`/`order` is a move, which the assignee
    /// may perform regardless of role. Anything else needs ADMIN or DEV, and
    /// is rejected wholesale otherwise.
    #[instrument(skip(self, principal, patch), fields(user_id = %principal.id), err)]
    pub async fn update(
        &self,
        principal: &Principal,
        ticket_id: TicketId,
        patch: TicketPatch,
    ) -> Result<TicketView, ServiceError> {
        let mut tx = self.db.begin().await?;
        let mut ticket = load(tx.as_mut(), ticket_id).await?;
        let access = project_access(tx.as_mut(), principal, ticket.project_id).await?;

        // Moving is the floor: writers and the assignee. Other fields need a writer role.
        ensure(
            principal,
            &access,
            &Action::MoveTicket {
                assignee: ticket.assigned_to,
            },
        )?;
        if !patch.touches_only_placement() {
            ensure(principal, &access, &Action::EditTicket)?;
        }

        if let Some(assignee) = patch.new_assignee() {
            check_assignee(tx.as_mut(), ticket.project_id, assignee).await?;
        }

        patch.apply(&mut ticket, Utc::now())?;
        tx.update_ticket(&ticket).await?;
        let view = view_of(tx.as_mut(), ticket).await?;
        tx.commit().await?;

        info!(ticket_id = %ticket_id, "ticket updated");
        Ok(view)
    }

    /// Drag-and-drop: write the target lane and position. Siblings keep their order.
    #[instrument(skip(self, principal), fields(user_id = %principal.id), err)]
    pub async fn reorder(
        &self,
        principal: &Principal,
        ticket_id: TicketId,
        placement: Placement,
    ) -> Result<TicketView, ServiceError> {
        let mut tx = self.db.begin().await?;
        let mut ticket = load(tx.as_mut(), ticket_id).await?;
        let access = project_access(tx.as_mut(), principal, ticket.project_id).await?;
        ensure(
            principal,
            &access,
            &Action::MoveTicket {
                assignee: ticket.assigned_to,
            },
        )?;

        placement.apply(&mut ticket, Utc::now());
        tx.update_ticket(&ticket).await?;
        let view = view_of(tx.as_mut(), ticket).await?;
        tx.commit().await?;

        info!(
            ticket_id = %ticket_id,
            status = %placement.status,
            order = placement.order,
            "ticket moved"
        );
        Ok(view)
    }

    #[instrument(skip(self, principal), fields(user_id = %principal.id), err)]
    pub async fn delete(&self, principal: &Principal, ticket_id: TicketId) -> Result<(), ServiceError> {
        let mut tx = self.db.begin().await?;
        let ticket = load(tx.as_mut(), ticket_id).await?;
        let access = project_access(tx.as_mut(), principal, ticket.project_id).await?;
        ensure(principal, &access, &Action::DeleteTicket)?;

        tx.delete_ticket(ticket_id).await?;
        tx.commit().await?;

        info!(ticket_id = %ticket_id, "ticket deleted");
        Ok(())
    }
}

pub(crate) async fn load(tx: &mut dyn StoreTx, ticket_id: TicketId) -> Result<Ticket, ServiceError> {
    tx.ticket_by_id(ticket_id)
        .await?
        .ok_or(ServiceError::NotFound("ticket"))
}

/// Assignees must be non-VIEWER members of the ticket's project.
async fn check_assignee(
    tx: &mut dyn StoreTx,
    project_id: ProjectId,
    assignee: UserId,
) -> Result<(), ServiceError> {
    match membership::get_role(tx, assignee, project_id).await? {
        None => Err(ServiceError::InvalidAssignee(
            "assignee must be a member of this project".into(),
        )),
        Some(role) if !role.can_be_assigned() => Err(ServiceError::InvalidAssignee(format!(
            "cannot assign tickets to {role} members"
        ))),
        Some(_) => Ok(()),
    }
}

async fn view_of(tx: &mut dyn StoreTx, ticket: Ticket) -> Result<TicketView, ServiceError> {
    let assigned_to_email = match ticket.assigned_to {
        Some(user) => tx.user_by_id(user).await?.map(|u| u.email),
        None => None,
    };
    Ok(TicketView {
        ticket,
        assigned_to_email,
    })
}

pub(crate) async fn views_of(
    tx: &mut dyn StoreTx,
    tickets: Vec<Ticket>,
) -> Result<Vec<TicketView>, ServiceError> {
    let mut emails: HashMap<UserId, Option<String>> = HashMap::new();
    let mut views = Vec::with_capacity(tickets.len());
    for ticket in tickets {
        let assigned_to_email = match ticket.assigned_to {
            Some(user) => {
                if !emails.contains_key(&user) {
                    let email = tx.user_by_id(user).await?.map(|u| u.email);
                    emails.insert(user, email);
                }
                emails.get(&user).cloned().flatten()
            }
            None => None,
        };
        views.push(TicketView {
            ticket,
            assigned_to_email,
        });
    }
    Ok(views)
}
