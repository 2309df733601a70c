use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use smartmess_api::auth::{self, AppState, AppStateInner};
use smartmess_api::middleware::{require_admin, require_auth};
use smartmess_api::{admin, attendance, complaints, menus, notifications, ratings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "smartmess=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("SMARTMESS_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("SMARTMESS_DB_PATH").unwrap_or_else(|_| "smartmess.db".into());
    let host = std::env::var("SMARTMESS_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("SMARTMESS_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database
    let db = smartmess_db::Database::open(&PathBuf::from(&db_path))?;
    bootstrap_superadmin(&db).await?;

    // Shared state
    let state: AppState = Arc::new(AppStateInner { db, jwt_secret });

    let app = router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("SmartMess server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/admin/login", post(auth::admin_login))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/auth/logout", post(auth::logout))
        .route("/menu/today", get(menus::get_today))
        .route("/menu/date/{date}", get(menus::get_by_date))
        .route("/menu/weekly", get(menus::get_weekly))
        .route("/ratings", post(ratings::submit))
        .route("/ratings/my-ratings", get(ratings::my_ratings))
        .route(
            "/ratings/{id}",
            get(ratings::get_by_id)
                .put(ratings::update)
                .delete(ratings::delete),
        )
        .route(
            "/ratings/meal/{menu_id}/{meal_type}",
            get(ratings::meal_ratings),
        )
        .route("/complaints", post(complaints::submit))
        .route("/complaints/my-complaints", get(complaints::my_complaints))
        .route("/complaints/{id}", get(complaints::get_by_id))
        .route("/attendance", post(attendance::mark))
        .route("/attendance/today", get(attendance::today_status))
        .route("/attendance/history", get(attendance::history))
        .route("/notifications", get(notifications::list_for_student))
        .route("/notifications/{id}/read", post(notifications::mark_read))
        .route(
            "/notifications/unread-count",
            get(notifications::unread_count),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state.clone());

    let admin_routes = Router::new()
        .route("/admin/stats", get(admin::dashboard_stats))
        .route(
            "/admin/students",
            get(admin::list_students).post(admin::add_student),
        )
        .route("/admin/students/{id}/verify", put(admin::verify_student))
        .route(
            "/admin/students/{id}/toggle-status",
            put(admin::toggle_student_status),
        )
        .route("/admin/students/{id}", delete(admin::delete_student))
        .route("/admin/menu", get(menus::list).post(menus::upsert))
        .route(
            "/admin/menu/{id}",
            put(menus::update).delete(menus::delete),
        )
        .route("/ratings/analytics/average", get(ratings::analytics_average))
        .route("/admin/ratings", get(ratings::list_all))
        .route("/admin/ratings/stats", get(ratings::stats))
        .route("/admin/complaints", get(complaints::list))
        .route("/admin/complaints/{id}", put(complaints::update_status))
        .route("/admin/attendance", get(attendance::overview))
        .route("/admin/attendance/stats", get(attendance::weekly_stats))
        .route(
            "/admin/notifications",
            get(notifications::list_all).post(notifications::broadcast),
        )
        .route(
            "/admin/notifications/{id}",
            delete(notifications::delete),
        )
        // require_auth is the outer layer, so the principal is resolved
        // before the admin gate looks at it.
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes)
}

/// Seed a superadmin on first boot so a fresh deployment has a way in. Does
/// nothing once any admin exists.
async fn bootstrap_superadmin(db: &smartmess_db::Database) -> anyhow::Result<()> {
    if db.count_admins()? > 0 {
        return Ok(());
    }

    let (Ok(email), Ok(password)) = (
        std::env::var("SMARTMESS_ADMIN_EMAIL"),
        std::env::var("SMARTMESS_ADMIN_PASSWORD"),
    ) else {
        warn!(
            "No admin accounts exist and SMARTMESS_ADMIN_EMAIL/PASSWORD are unset; \
             admin login will be unavailable"
        );
        return Ok(());
    };
    let name = std::env::var("SMARTMESS_ADMIN_NAME").unwrap_or_else(|_| "Mess Admin".into());

    let hash = auth::hash_password(password).await?;
    db.create_admin(&Uuid::new_v4().to_string(), &name, &email, &hash, "superadmin")?;
    info!("Bootstrapped superadmin account {}", email);
    Ok(())
}
