use std::{net::SocketAddr, sync::Arc};

use http::HeaderValue;
use tokio::{signal, sync::mpsc};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};

use storefront_api as api;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = api::config::load_config()?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    // Init DB
    let db_pool = api::db::establish_connection_from_app_config(&cfg).await?;
    if cfg.auto_migrate {
        api::schema::create_all_tables(&db_pool).await.map_err(|e| {
            error!("Failed creating schema: {}", e);
            e
        })?;
    }
    let db_arc = Arc::new(db_pool);

    // Init events
    let (event_tx, event_rx) = mpsc::channel(cfg.event_channel_capacity);
    let event_sender = api::events::EventSender::new(event_tx);
    tokio::spawn(api::events::process_events(event_rx));

    // Delivery infrastructure
    let mail_queue = api::mailer::MailQueue::start(
        Arc::new(api::mailer::LogMailer),
        cfg.mail_queue_capacity,
    );
    let notifications = api::notifications::NotificationHub::new(cfg.notification_channel_capacity);

    // Auth
    let auth_service = Arc::new(api::auth::AuthService::new(
        &cfg.jwt_secret,
        cfg.jwt_expiration,
        cfg.refresh_token_expiration,
    ));

    // Aggregate app services used by HTTP handlers
    let services = api::handlers::AppServices {
        categories: api::services::CategoryService::new(
            db_arc.as_ref().clone(),
            event_sender.clone(),
        ),
        catalog: api::services::CatalogService::new(db_arc.as_ref().clone(), event_sender.clone()),
        offers: api::services::OfferService::new(db_arc.as_ref().clone(), event_sender.clone()),
        coupons: api::services::CouponService::new(db_arc.as_ref().clone(), event_sender.clone()),
        cart: api::services::CartService::new(db_arc.as_ref().clone(), event_sender.clone()),
        orders: api::services::OrderService::new(db_arc.as_ref().clone(), event_sender.clone()),
        wishlist: api::services::WishlistService::new(db_arc.as_ref().clone(), event_sender.clone()),
        addresses: api::services::AddressService::new(db_arc.as_ref().clone()),
        reviews: api::services::ReviewService::new(db_arc.as_ref().clone()),
        testimonials: api::services::TestimonialService::new(db_arc.as_ref().clone()),
        messages: api::services::MessageService::new(
            db_arc.as_ref().clone(),
            event_sender.clone(),
            notifications.clone(),
            mail_queue.clone(),
            cfg.admin_email.clone(),
        ),
        otp: api::auth::OtpService::new(
            db_arc.as_ref().clone(),
            auth_service.clone(),
            mail_queue.clone(),
            event_sender.clone(),
            cfg.otp_ttl_secs,
        ),
    };

    // Compose shared app state
    let app_state = Arc::new(api::AppState {
        db: db_arc.clone(),
        config: cfg.clone(),
        event_sender,
        services,
        auth: auth_service.clone(),
        notifications,
        mail_queue,
    });

    // Build CORS layer from config
    let configured_origins: Option<Vec<HeaderValue>> = cfg
        .cors_allowed_origins
        .as_ref()
        .map(|raw| {
            raw.split(',')
                .filter_map(|origin| {
                    let trimmed = origin.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        HeaderValue::from_str(trimmed).ok()
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty());

    let cors_layer = if let Some(origins) = configured_origins {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    } else if cfg.should_allow_permissive_cors() {
        info!("Using permissive CORS (explicit origins not configured)");
        CorsLayer::permissive()
    } else {
        error!("Missing CORS configuration; set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true");
        return Err(
            "Missing CORS configuration: set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true"
                .into(),
        );
    };

    let app = axum::Router::new()
        .route("/", axum::routing::get(|| async { "storefront-api up" }))
        .nest("/api/v1", api::api_v1_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors_layer)
        // Inject AuthService into request extensions for the extractor
        .layer(axum::middleware::from_fn_with_state(
            auth_service.clone(),
            |axum::extract::State(auth): axum::extract::State<Arc<api::auth::AuthService>>,
             mut req: axum::http::Request<axum::body::Body>,
             next: axum::middleware::Next| async move {
                req.extensions_mut().insert(auth);
                next.run(req).await
            },
        ))
        .with_state(app_state);

    // Bind and serve
    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    info!("storefront-api listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
