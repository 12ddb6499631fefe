//! `devtrack-infra`: persistence backends and the application services built on them.

pub mod services;
pub mod store;

pub use services::{
    ActivityItem, CommentService, CommentView, DashboardService, DashboardStats, ErrorKind,
    IdentityService, ProjectService, ServiceError, TicketService, TicketView,
};
pub use store::{Database, InMemoryDatabase, PostgresDatabase, StoreError};

mod integration_tests;
