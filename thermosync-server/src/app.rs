use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::configs::{SchemaManager, Settings, Storage};
use crate::handles::*;
use crate::repositories::EventRepository;
use crate::services::{
    CalendarService, DeviceBridge, EventService, RecurringService, SchedulerService,
};

pub async fn create_app(settings: &Arc<Settings>) -> Router {
    let storage = Arc::new(
        Storage::new(settings.database.clone(), SchemaManager::default())
            .await
            .expect("Failed to initialize storage."),
    );

    let calendar = CalendarService::from_offset_str(&settings.timezone.offset)
        .expect("Invalid timezone offset in settings.");

    let bridge = Arc::new(DeviceBridge::new(storage.clone()));
    let event_service = Arc::new(EventService::new(storage.clone(), bridge.clone(), calendar));
    let recurring_service = RecurringService::new(storage.clone(), calendar);

    let scheduler = Arc::new(SchedulerService::new(
        EventRepository::new(storage.clone()),
        event_service.clone(),
        recurring_service,
        bridge.clone(),
        calendar,
    ));
    scheduler.spawn();

    let events = Router::new()
        .route("/", post(create_event))
        .route("/device/:device_id", get(get_events_by_device))
        .route("/:event_id", put(update_event).delete(delete_event))
        .route("/:event_id/start", post(start_event))
        .route("/:event_id/stop", post(stop_event))
        .route("/:event_id/disable", post(disable_event))
        .route("/:event_id/enable", post(enable_event))
        .with_state(EventState {
            event_service: event_service.clone(),
        });

    let devices = Router::new()
        .route("/", get(get_devices))
        .route("/:device_id", get(get_device))
        .route("/ws/:serial", get(device_ws))
        .with_state(DeviceState {
            bridge: bridge.clone(),
            storage: storage.clone(),
        });

    let observers = Router::new()
        .route("/ws", get(observer_ws))
        .with_state(DeviceState {
            bridge,
            storage,
        });

    Router::new()
        .nest("/events", events)
        .nest("/devices", devices)
        .nest("/observers", observers)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
