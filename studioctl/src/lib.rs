//! Reservation and credit ledger engine.
//!
//! Accounts hold prepaid credits in expiring lots and spend them on bookable
//! spaces. Deductions always consume the soonest-to-expire lot first. A
//! booking that fits the operating calendar (business hours, closed dates,
//! the space's weekly schedule) confirms and charges immediately; anything
//! outside it becomes an exception booking that waits for admin approval and
//! pays a surcharge. Cancellations refund by a cutoff rule or an explicit
//! staff decision, with penalties tracked separately.
//!
//! The crate is layered the same way throughout:
//!
//! - [`api`]: HTTP handlers and request/response models (axum + utoipa)
//! - [`ledger`] / [`workflow`] / [`policy`] / [`conflict`]: domain services
//! - [`db`]: the transactional store, repositories and storage models
//!
//! [`Application`] wires the layers together: it seeds default business
//! hours, starts the stale-lot sweeper, and serves the router with graceful
//! shutdown.

pub mod api;
pub mod auth;
pub mod config;
pub mod conflict;
pub mod db;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod policy;
pub mod telemetry;
#[cfg(test)]
pub mod test_utils;
pub mod types;
pub mod workflow;

use axum::{
    Router,
    http::HeaderValue,
    routing::{delete, get, patch, post, put},
};
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use config::Config;

use crate::db::Store;
use crate::db::handlers::Calendar;
use crate::db::models::calendar::BusinessHoursEntry;
use crate::errors::Error;
use crate::events::NotificationCenter;
use crate::ledger::CreditLedger;
use crate::workflow::ReservationWorkflow;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub config: Config,
    pub events: NotificationCenter,
    pub ledger: CreditLedger,
    pub workflow: ReservationWorkflow,
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "studioctl",
        description = "Reservation and credit ledger engine: bookable spaces paid with expiring credit lots"
    ),
    paths(
        api::handlers::credits::get_own_balance,
        api::handlers::credits::list_own_lots,
        api::handlers::credits::list_own_history,
        api::handlers::credits::grant_credits,
        api::handlers::credits::deduct_credits,
        api::handlers::credits::extend_account_credits,
        api::handlers::credits::reactivate_account_credits,
        api::handlers::credits::list_account_lots,
        api::handlers::credits::list_account_history,
        api::handlers::credits::list_balances,
        api::handlers::credits::transfer_credits,
        api::handlers::credits::expire_stale,
        api::handlers::credits::extend_lot,
        api::handlers::credits::reactivate_lot,
        api::handlers::credits::deduct_from_lot,
        api::handlers::credits::transfer_from_lot,
        api::handlers::reservations::create_reservation,
        api::handlers::reservations::list_own_reservations,
        api::handlers::reservations::get_reservation,
        api::handlers::reservations::cancel_reservation,
        api::handlers::reservations::list_pending_reservations,
        api::handlers::reservations::approve_reservation,
        api::handlers::reservations::admin_cancel_reservation,
        api::handlers::reservations::create_external_reservation,
        api::handlers::spaces::list_spaces,
        api::handlers::spaces::get_space,
        api::handlers::spaces::list_space_schedules,
        api::handlers::spaces::create_space,
        api::handlers::spaces::update_space,
        api::handlers::spaces::create_schedule,
        api::handlers::spaces::deactivate_schedule,
        api::handlers::calendar::list_business_hours,
        api::handlers::calendar::list_closed_dates,
        api::handlers::calendar::upsert_business_hours,
        api::handlers::calendar::create_closed_date,
        api::handlers::calendar::deactivate_closed_date,
        api::handlers::events::stream_events,
    ),
    tags(
        (name = "credits", description = "Credit lots, balances and the ledger history"),
        (name = "reservations", description = "Booking, approval and cancellation"),
        (name = "spaces", description = "Bookable spaces and their weekly schedules"),
        (name = "calendar", description = "Business hours and closed dates"),
        (name = "events", description = "Live reservation change stream"),
    )
)]
struct ApiDoc;

fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    for origin in &config.cors.allowed_origins {
        origins.push(origin.parse::<HeaderValue>()?);
    }
    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any))
}

/// Build the application router: user and admin routes under `/api/v1`,
/// health check and docs at the root, CORS and request tracing layered on
/// top.
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let api_routes = Router::new()
        .route(
            "/reservations",
            post(api::handlers::reservations::create_reservation).get(api::handlers::reservations::list_own_reservations),
        )
        .route("/reservations/{id}", get(api::handlers::reservations::get_reservation))
        .route("/reservations/{id}/cancel", post(api::handlers::reservations::cancel_reservation))
        .route("/credits/balance", get(api::handlers::credits::get_own_balance))
        .route("/credits/lots", get(api::handlers::credits::list_own_lots))
        .route("/credits/history", get(api::handlers::credits::list_own_history))
        .route("/spaces", get(api::handlers::spaces::list_spaces))
        .route("/spaces/{id}", get(api::handlers::spaces::get_space))
        .route("/spaces/{id}/schedules", get(api::handlers::spaces::list_space_schedules))
        .route("/calendar/business-hours", get(api::handlers::calendar::list_business_hours))
        .route("/calendar/closed-dates", get(api::handlers::calendar::list_closed_dates))
        .route("/events", get(api::handlers::events::stream_events))
        .route(
            "/admin/reservations/pending",
            get(api::handlers::reservations::list_pending_reservations),
        )
        .route(
            "/admin/reservations/{id}/approve",
            post(api::handlers::reservations::approve_reservation),
        )
        .route(
            "/admin/reservations/{id}/cancel",
            post(api::handlers::reservations::admin_cancel_reservation),
        )
        .route(
            "/admin/reservations/external",
            post(api::handlers::reservations::create_external_reservation),
        )
        .route("/admin/accounts/{account_id}/credits", post(api::handlers::credits::grant_credits))
        .route(
            "/admin/accounts/{account_id}/credits/deduct",
            post(api::handlers::credits::deduct_credits),
        )
        .route(
            "/admin/accounts/{account_id}/credits/extend",
            post(api::handlers::credits::extend_account_credits),
        )
        .route(
            "/admin/accounts/{account_id}/credits/reactivate",
            post(api::handlers::credits::reactivate_account_credits),
        )
        .route("/admin/accounts/{account_id}/lots", get(api::handlers::credits::list_account_lots))
        .route(
            "/admin/accounts/{account_id}/history",
            get(api::handlers::credits::list_account_history),
        )
        .route("/admin/credits/balances", get(api::handlers::credits::list_balances))
        .route("/admin/credits/transfer", post(api::handlers::credits::transfer_credits))
        .route("/admin/credits/expire", post(api::handlers::credits::expire_stale))
        .route("/admin/lots/{lot_id}/extend", post(api::handlers::credits::extend_lot))
        .route("/admin/lots/{lot_id}/reactivate", post(api::handlers::credits::reactivate_lot))
        .route("/admin/lots/{lot_id}/deduct", post(api::handlers::credits::deduct_from_lot))
        .route("/admin/lots/{lot_id}/transfer", post(api::handlers::credits::transfer_from_lot))
        .route("/admin/spaces", post(api::handlers::spaces::create_space))
        .route("/admin/spaces/{id}", patch(api::handlers::spaces::update_space))
        .route("/admin/spaces/{id}/schedules", post(api::handlers::spaces::create_schedule))
        .route("/admin/schedules/{id}", delete(api::handlers::spaces::deactivate_schedule))
        .route(
            "/admin/calendar/business-hours/{day_of_week}",
            put(api::handlers::calendar::upsert_business_hours),
        )
        .route("/admin/calendar/closed-dates", post(api::handlers::calendar::create_closed_date))
        .route(
            "/admin/calendar/closed-dates/{id}",
            delete(api::handlers::calendar::deactivate_closed_date),
        )
        .with_state(state.clone());

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .nest("/api/v1", api_routes)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    let router = router.layer(create_cors_layer(&state.config)?).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Seed the default operating week on first startup: Monday through Friday
/// 09:00-18:00, Saturday 09:00-14:00, Sunday closed. A store that already has
/// business hours is left alone.
pub async fn seed_default_business_hours(store: &Store) -> anyhow::Result<()> {
    store
        .transaction(|state| {
            let mut calendar = Calendar::new(state);
            if calendar.has_business_hours() {
                debug!("business hours already present, skipping seed");
                return Ok(());
            }
            info!("seeding default business hours");
            for day in 0..7u8 {
                let entry = match day {
                    0 => BusinessHoursEntry {
                        day_of_week: day,
                        start_time: "00:00".to_string(),
                        end_time: "00:00".to_string(),
                        is_closed: true,
                    },
                    6 => BusinessHoursEntry {
                        day_of_week: day,
                        start_time: "09:00".to_string(),
                        end_time: "14:00".to_string(),
                        is_closed: false,
                    },
                    _ => BusinessHoursEntry {
                        day_of_week: day,
                        start_time: "09:00".to_string(),
                        end_time: "18:00".to_string(),
                        is_closed: false,
                    },
                };
                calendar.upsert_business_hours(entry);
            }
            Ok::<_, Error>(())
        })
        .await?;
    Ok(())
}

/// Container for background tasks and their lifecycle management.
pub struct BackgroundServices {
    background_tasks: Vec<tokio::task::JoinHandle<()>>,
    shutdown_token: tokio_util::sync::CancellationToken,
}

impl BackgroundServices {
    /// Gracefully shut down all background tasks
    pub async fn shutdown(self) {
        self.shutdown_token.cancel();
        for handle in self.background_tasks {
            let _ = handle.await;
        }
    }
}

/// Start the stale-lot sweeper (when enabled).
fn setup_background_services(
    ledger: CreditLedger,
    config: &Config,
    shutdown_token: tokio_util::sync::CancellationToken,
) -> BackgroundServices {
    let mut background_tasks = Vec::new();

    if config.sweeper.enabled {
        let interval = config.sweeper.interval;
        let token = shutdown_token.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        info!("stale-lot sweeper shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        ledger.expire_stale().await;
                    }
                }
            }
        });
        background_tasks.push(handle);
    }

    BackgroundServices {
        background_tasks,
        shutdown_token,
    }
}

/// The assembled application: state, router and background services.
///
/// 1. **Initialize**: [`Application::new`] validates configuration, seeds the
///    calendar, and starts background services
/// 2. **Serve**: [`Application::serve`] binds a TCP port and handles requests
/// 3. **Shutdown**: the shutdown future resolving stops the server and then
///    the background tasks
pub struct Application {
    router: Router,
    config: Config,
    bg_services: BackgroundServices,
}

impl Application {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("starting with configuration: {config:#?}");
        config.validate()?;

        let store = Store::new();
        seed_default_business_hours(&store).await?;

        let events = NotificationCenter::new();
        let ledger = CreditLedger::new(store.clone(), config.credits.default_expiry_days);
        let workflow = ReservationWorkflow::new(store.clone(), events.clone(), config.workflow_settings());

        let shutdown_token = tokio_util::sync::CancellationToken::new();
        let bg_services = setup_background_services(ledger.clone(), &config, shutdown_token);

        let state = AppState {
            store,
            config: config.clone(),
            events,
            ledger,
            workflow,
        };
        let router = build_router(state)?;

        Ok(Self {
            router,
            config,
            bg_services,
        })
    }

    /// Convert the application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> (axum_test::TestServer, BackgroundServices) {
        let server = axum_test::TestServer::new(self.router).expect("Failed to create test server");
        (server, self.bg_services)
    }

    /// Serve until the shutdown future resolves
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("listening on http://{bind_addr}");

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        self.bg_services.shutdown().await;
        Ok(())
    }
}
