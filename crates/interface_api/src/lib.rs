//! HTTP API Layer
//!
//! This crate provides the REST API for the expense approval system using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: Request handlers per audience (employee, manager, admin)
//! - **Middleware**: Authentication, tracing, audit logging
//! - **DTOs**: Request/Response data transfer objects (camelCase JSON)
//! - **Error Handling**: Consistent error responses
//!
//! Authorization is not a middleware concern: each handler asks the
//! caller's `Principal` for the action it is about to perform.
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState, Stores};
//!
//! let state = AppState::new(config, Stores::postgres(pool), notifier);
//! axum::serve(listener, create_router(state)).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod handlers;
pub mod dto;
pub mod auth;
pub mod notifier;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
    middleware as axum_middleware,
};
use tower_http::trace::TraceLayer;
use tower_http::cors::{CorsLayer, Any};

use domain_expense::adapters::{InMemoryApprovalRuleStore, InMemoryExpenseStore, InMemoryUserDirectory};
use domain_expense::{
    ApprovalRuleService, ApprovalRuleStore, ExpenseLifecycleManager, ExpenseStore, Notifier, UserDirectory,
    UserService,
};
use infra_db::{DatabasePool, PgApprovalRuleStore, PgExpenseStore, PgUserDirectory};

use crate::config::ApiConfig;
use crate::middleware::{auth_middleware, audit_middleware};
use crate::handlers::{expenses, health, manager, rules, users};

/// The store adapters the services run on
#[derive(Clone)]
pub struct Stores {
    pub expenses: Arc<dyn ExpenseStore>,
    pub rules: Arc<dyn ApprovalRuleStore>,
    pub users: Arc<dyn UserDirectory>,
}

impl Stores {
    pub fn postgres(pool: DatabasePool) -> Self {
        Self {
            expenses: Arc::new(PgExpenseStore::new(pool.clone())),
            rules: Arc::new(PgApprovalRuleStore::new(pool.clone())),
            users: Arc::new(PgUserDirectory::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            expenses: Arc::new(InMemoryExpenseStore::new()),
            rules: Arc::new(InMemoryApprovalRuleStore::new()),
            users: Arc::new(InMemoryUserDirectory::new()),
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub stores: Stores,
    pub expenses: Arc<ExpenseLifecycleManager>,
    pub rules: Arc<ApprovalRuleService>,
    pub users: Arc<UserService>,
}

impl AppState {
    pub fn new(config: ApiConfig, stores: Stores, notifier: Arc<dyn Notifier>) -> Self {
        let expenses = ExpenseLifecycleManager::new(stores.expenses.clone(), stores.rules.clone(), notifier)
            .with_default_currency(config.default_currency);
        let rules = ApprovalRuleService::new(stores.rules.clone(), stores.users.clone());
        let users = UserService::new(stores.users.clone());

        Self {
            config,
            stores,
            expenses: Arc::new(expenses),
            rules: Arc::new(rules),
            users: Arc::new(users),
        }
    }
}

/// Creates the main API router
///
/// # Returns
///
/// Configured Axum router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route("/api/v1/auth/bootstrap", post(users::bootstrap_admin));

    // Employee routes
    let employee_routes = Router::new()
        .route("/profile", get(users::profile))
        .route("/expenses", get(expenses::list_own_expenses).post(expenses::create_expense))
        .route("/expenses/:id/submit", put(expenses::submit_expense));

    // Manager routes
    let manager_routes = Router::new()
        .route("/pending", get(manager::list_pending))
        .route("/all", get(manager::list_all))
        .route("/update/:id", put(manager::decide_expense))
        .route("/expenses/:id/approvals", post(manager::cast_approval));

    // Approval rule routes
    let rule_routes = Router::new()
        .route("/", get(rules::list_rules).post(rules::create_rule))
        .route("/:id", get(rules::get_rule).put(rules::update_rule).delete(rules::delete_rule));

    // Admin routes
    let admin_routes = Router::new()
        .route("/users", get(users::list_users).post(users::create_user));

    // Protected API routes
    let api_routes = Router::new()
        .nest("/employee", employee_routes)
        .nest("/manager", manager_routes)
        .nest("/approval/rules", rule_routes)
        .nest("/admin", admin_routes)
        .route("/expenses/:id", get(expenses::get_expense))
        .layer(axum_middleware::from_fn_with_state(state.clone(), audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Combine all routes
    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
