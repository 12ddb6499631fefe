use std::collections::HashMap;
use std::sync::Arc;

use devtrack_auth::Principal;
use devtrack_core::ProjectId;
use devtrack_tickets::{TicketStatus, sort_newest_first};

use crate::store::Database;

use super::ServiceError;
use super::membership;
use super::tickets::{TicketView, views_of};

pub const RECENT_ACTIVITY_LIMIT: usize = 10;

/// Ticket counts across the principal's projects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_projects: usize,
    pub total_tickets: usize,
    pub todo_tickets: usize,
    pub in_progress_tickets: usize,
    pub completed_tickets: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityItem {
    pub ticket: TicketView,
    pub project_name: String,
}

/// Read-only aggregates over everything a principal can see.
pub struct DashboardService {
    db: Arc<dyn Database>,
}

impl DashboardService {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    pub async fn stats(&self, principal: &Principal) -> Result<DashboardStats, ServiceError> {
        let mut tx = self.db.begin().await?;
        let projects: Vec<ProjectId> = membership::list_projects_for(tx.as_mut(), principal.id)
            .await?
            .into_iter()
            .map(|s| s.project.id)
            .collect();
        let tickets = tx.tickets_in(&projects).await?;

        let mut stats = DashboardStats {
            total_projects: projects.len(),
            total_tickets: tickets.len(),
            ..Default::default()
        };
        for ticket in &tickets {
            match ticket.status {
                TicketStatus::Todo => stats.todo_tickets += 1,
                TicketStatus::InProgress => stats.in_progress_tickets += 1,
                TicketStatus::Done => stats.completed_tickets += 1,
            }
        }
        Ok(stats)
    }

    /// The most recently created tickets across the principal's projects.
    pub async fn recent_activity(&self, principal: &Principal) -> Result<Vec<ActivityItem>, ServiceError> {
        let mut tx = self.db.begin().await?;
        let names: HashMap<ProjectId, String> = membership::list_projects_for(tx.as_mut(), principal.id)
            .await?
            .into_iter()
            .map(|s| (s.project.id, s.project.name))
            .collect();
        let projects: Vec<ProjectId> = names.keys().copied().collect();

        let mut tickets = tx.tickets_in(&projects).await?;
        sort_newest_first(&mut tickets);
        tickets.truncate(RECENT_ACTIVITY_LIMIT);

        Ok(views_of(tx.as_mut(), tickets)
            .await?
            .into_iter()
            .map(|view| ActivityItem {
                project_name: names
                    .get(&view.ticket.project_id)
                    .cloned()
                    .unwrap_or_default(),
                ticket: view,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use devtrack_auth::Role;
    use devtrack_tickets::Placement;

    use super::*;
    use crate::services::testing::Fixture;

    #[tokio::test]
    async fn stats_count_only_member_projects() {
        let fx = Fixture::new().await;
        let alice = fx.user("alice@example.com").await;
        let bob = fx.user("bob@example.com").await;
        let shared = fx.project(&alice, "Shared").await;
        let private = fx.project(&bob, "Private").await;
        fx.enroll(&alice, shared, &bob, Role::Dev).await;

        let t = fx.ticket(&alice, shared, "a").await;
        fx.ticket(&alice, shared, "b").await;
        fx.ticket(&bob, private, "c").await;
        fx.tickets
            .reorder(
                &alice,
                t.ticket.id,
                Placement {
                    status: TicketStatus::Done,
                    order: 1,
                },
            )
            .await
            .unwrap();

        let stats = fx.dashboard.stats(&alice).await.unwrap();
        assert_eq!(
            stats,
            DashboardStats {
                total_projects: 1,
                total_tickets: 2,
                todo_tickets: 1,
                in_progress_tickets: 0,
                completed_tickets: 1,
            }
        );
        assert_eq!(fx.dashboard.stats(&bob).await.unwrap().total_tickets, 3);
    }

    #[tokio::test]
    async fn recent_activity_is_capped_and_named() {
        let fx = Fixture::new().await;
        let alice = fx.user("alice@example.com").await;
        let project = fx.project(&alice, "Apollo").await;
        for i in 0..12 {
            fx.ticket(&alice, project, &format!("t{i}")).await;
        }

        let recent = fx.dashboard.recent_activity(&alice).await.unwrap();
        assert_eq!(recent.len(), RECENT_ACTIVITY_LIMIT);
        assert_eq!(recent[0].ticket.ticket.title, "t11");
        assert!(recent.iter().all(|item| item.project_name == "Apollo"));
    }
}
