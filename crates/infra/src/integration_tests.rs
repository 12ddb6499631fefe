//! End-to-end scenarios across identity, membership, tickets and the store.
//!
//! Verifies:
//! - Creator enrollment, title uniqueness and assignee eligibility together
//! - Project deletion cascades to tickets
//! - Concurrent duplicate creates resolve to exactly one winner

#[cfg(test)]
mod tests {
    use devtrack_auth::{DenyReason, Role};
    use devtrack_projects::NewProject;
    use devtrack_tickets::{IssueType, NewTicket, Placement, TicketFilter, TicketPatch, TicketStatus};

    use crate::services::ServiceError;
    use crate::services::testing::Fixture;

    #[tokio::test]
    async fn alice_bob_and_carol() {
        let fx = Fixture::new().await;
        let alice = fx.user("alice@example.com").await;
        let bob = fx.user("bob@example.com").await;
        let carol = fx.user("carol@example.com").await;

        let project = fx
            .projects
            .create(&alice, NewProject::new("P", None).unwrap())
            .await
            .unwrap();
        let listed = fx.projects.list(&alice).await.unwrap();
        assert_eq!(listed[0].role, Role::Admin);

        fx.enroll(&alice, project.id, &bob, Role::Dev).await;
        fx.enroll(&alice, project.id, &carol, Role::Viewer).await;

        let crash = fx.ticket(&bob, project.id, "Fix crash").await;
        assert_eq!(crash.ticket.order, 1);
        assert_eq!(crash.ticket.status, TicketStatus::Todo);

        let err = fx
            .tickets
            .create(&alice, project.id, NewTicket::titled("Fix crash"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::DuplicateTitle));

        let err = fx
            .tickets
            .update(
                &bob,
                crash.ticket.id,
                TicketPatch {
                    assigned_to: Some(Some(carol.id)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidAssignee(_)));

        let unchanged = fx.tickets.get(&carol, crash.ticket.id).await.unwrap();
        assert_eq!(unchanged.ticket.assigned_to, None);
    }

    #[tokio::test]
    async fn viewer_never_writes_tickets() {
        let fx = Fixture::new().await;
        let admin = fx.user("admin@example.com").await;
        let viewer = fx.user("viewer@example.com").await;
        let project = fx.project(&admin, "P").await;
        fx.enroll(&admin, project, &viewer, Role::Viewer).await;
        let ticket = fx.ticket(&admin, project, "t").await.ticket.id;

        let create = fx
            .tickets
            .create(&viewer, project, NewTicket::titled("mine"))
            .await
            .unwrap_err();
        let edit = fx
            .tickets
            .update(
                &viewer,
                ticket,
                TicketPatch {
                    title: Some("renamed".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        let delete = fx.tickets.delete(&viewer, ticket).await.unwrap_err();

        assert!(matches!(create, ServiceError::Forbidden(DenyReason::InsufficientRole)));
        assert!(matches!(edit, ServiceError::Forbidden(DenyReason::NotAssignee)));
        assert!(matches!(delete, ServiceError::Forbidden(DenyReason::InsufficientRole)));
        assert_eq!(fx.tickets.get(&admin, ticket).await.unwrap().ticket.title, "t");
    }

    #[tokio::test]
    async fn conjunctive_filters() {
        let fx = Fixture::new().await;
        let admin = fx.user("admin@example.com").await;
        let project = fx.project(&admin, "P").await;

        let specs = [
            ("done bug", IssueType::Bug, TicketStatus::Done),
            ("todo bug", IssueType::Bug, TicketStatus::Todo),
            ("done feature", IssueType::Feature, TicketStatus::Done),
            ("done bug 2", IssueType::Bug, TicketStatus::Done),
        ];
        for (title, issue_type, status) in specs {
            fx.tickets
                .create(
                    &admin,
                    project,
                    NewTicket {
                        issue_type,
                        status,
                        ..NewTicket::titled(title)
                    },
                )
                .await
                .unwrap();
        }

        let filter = TicketFilter {
            status: Some(TicketStatus::Done),
            issue_type: Some(IssueType::Bug),
            ..Default::default()
        };
        let listed = fx.tickets.list_by_project(&admin, project, &filter).await.unwrap();
        let titles: Vec<&str> = listed.iter().map(|v| v.ticket.title.as_str()).collect();
        assert_eq!(titles, ["done bug", "done bug 2"]);
    }

    #[tokio::test]
    async fn deleting_a_project_makes_its_tickets_not_found() {
        let fx = Fixture::new().await;
        let admin = fx.user("admin@example.com").await;
        let project = fx.project(&admin, "P").await;
        let a = fx.ticket(&admin, project, "a").await.ticket.id;
        let b = fx.ticket(&admin, project, "b").await.ticket.id;
        fx.comments.create(&admin, a, "note").await.unwrap();

        fx.projects.delete(&admin, project).await.unwrap();

        for id in [a, b] {
            let err = fx.tickets.get(&admin, id).await.unwrap_err();
            assert!(matches!(err, ServiceError::NotFound("ticket")));
        }
        assert!(fx.tickets.list_accessible(&admin).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_an_assignee_unassigns_their_tickets() {
        let fx = Fixture::new().await;
        let admin = fx.user("admin@example.com").await;
        let dev = fx.user("dev@example.com").await;
        let project = fx.project(&admin, "P").await;
        fx.enroll(&admin, project, &dev, Role::Dev).await;
        let ticket = fx
            .tickets
            .create(
                &admin,
                project,
                NewTicket {
                    assigned_to: Some(dev.id),
                    ..NewTicket::titled("t")
                },
            )
            .await
            .unwrap();
        fx.tickets
            .reorder(
                &dev,
                ticket.ticket.id,
                Placement {
                    status: TicketStatus::InProgress,
                    order: 3,
                },
            )
            .await
            .unwrap();

        fx.identity.delete_account(&dev).await.unwrap();

        let after = fx.tickets.get(&admin, ticket.ticket.id).await.unwrap();
        assert_eq!(after.ticket.assigned_to, None);
        assert_eq!(after.ticket.status, TicketStatus::InProgress);
        let members = fx.projects.list_members(&admin, project).await.unwrap();
        assert_eq!(members.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_duplicate_creates_have_one_winner() {
        let fx = Fixture::new().await;
        let admin = fx.user("admin@example.com").await;
        let project = fx.project(&admin, "P").await;

        let (first, second) = tokio::join!(
            fx.tickets.create(&admin, project, NewTicket::titled("race")),
            fx.tickets.create(&admin, project, NewTicket::titled("race")),
        );

        let outcomes = [first, second];
        let won = outcomes.iter().filter(|r| r.is_ok()).count();
        let lost = outcomes
            .iter()
            .filter(|r| matches!(r, Err(ServiceError::DuplicateTitle)))
            .count();
        assert_eq!((won, lost), (1, 1));
    }
}
