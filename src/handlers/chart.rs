//! HTTP surface: room creation and routing of `/api/chart/<name>/...` to
//! the room actor.

use std::convert::Infallible;

use log::{debug, error};
use warp::http::{Method, StatusCode};
use warp::path::FullPath;
use warp::reply::Response;
use warp::ws::Ws;
use warp::{Filter, Reply};

use crate::constants::{API_PATH, CHART_PATH, HEALTH_PATH, WEBSOCKET_PATH};
use crate::core::registry::RoomRegistry;
use crate::core::room::RoomHandle;
use crate::core::room_id::RoomId;
use crate::error::ChartRoomError;
use crate::handlers::websocket::{close_with_fault, handle_room_session};

/// Where a request goes once its path has been parsed
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    Health,
    /// `POST /api/chart`
    CreateRoom,
    /// `/api/chart/<name>/<rest>`; `rest` keeps its leading slash
    Room { id: RoomId, rest: String },
}

/// A request refused before it reaches any room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteRejection {
    pub status: StatusCode,
    pub body: &'static str,
}

impl RouteRejection {
    const NOT_FOUND: Self = Self {
        status: StatusCode::NOT_FOUND,
        body: "Not found",
    };
    const METHOD_NOT_ALLOWED: Self = Self {
        status: StatusCode::METHOD_NOT_ALLOWED,
        body: "Method not allowed",
    };
    const NAME_TOO_LONG: Self = Self {
        status: StatusCode::NOT_FOUND,
        body: "Name too long",
    };

    fn into_response(self) -> Response {
        warp::reply::with_status(self.body, self.status).into_response()
    }
}

/// Parse method and path into a [`Route`]
pub fn resolve_route(method: &Method, path: &str) -> std::result::Result<Route, RouteRejection> {
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();

    match segments[0] {
        HEALTH_PATH if segments.len() == 1 => Ok(Route::Health),
        API_PATH => match segments.get(1).copied() {
            Some(CHART_PATH) => {
                let name = segments.get(2).copied().unwrap_or("");
                if name.is_empty() {
                    return if *method == Method::POST {
                        Ok(Route::CreateRoom)
                    } else {
                        Err(RouteRejection::METHOD_NOT_ALLOWED)
                    };
                }

                let id = RoomId::resolve(name).map_err(|_| RouteRejection::NAME_TOO_LONG)?;
                let rest = format!("/{}", segments[3..].join("/"));
                Ok(Route::Room { id, rest })
            }
            _ => Err(RouteRejection::NOT_FOUND),
        },
        _ => Err(RouteRejection::NOT_FOUND),
    }
}

/// The whole route tree of the server
pub fn chart_routes(
    registry: RoomRegistry,
) -> impl Filter<Extract = (Response,), Error = Infallible> + Clone {
    warp::method()
        .and(warp::path::full())
        .and(optional_ws())
        .and(with_registry(registry))
        .and_then(handle_request)
}

// Upgrade requests carry a `Ws`; plain HTTP gets `None`
fn optional_ws() -> impl Filter<Extract = (Option<Ws>,), Error = Infallible> + Clone {
    warp::ws()
        .map(|ws: Ws| Some(ws))
        .or(warp::any().map(|| None::<Ws>))
        .unify()
}

// Helper function to include the room registry in request
fn with_registry(
    registry: RoomRegistry,
) -> impl Filter<Extract = (RoomRegistry,), Error = Infallible> + Clone {
    warp::any().map(move || registry.clone())
}

async fn handle_request(
    method: Method,
    path: FullPath,
    ws: Option<Ws>,
    registry: RoomRegistry,
) -> std::result::Result<Response, Infallible> {
    let route = match resolve_route(&method, path.as_str()) {
        Ok(route) => route,
        Err(rejection) => {
            debug!("{} {} rejected with {}", method, path.as_str(), rejection.status);
            return Ok(rejection.into_response());
        }
    };

    let response = match route {
        Route::Health => warp::reply::with_status("OK", StatusCode::OK).into_response(),
        Route::CreateRoom => create_room(),
        Route::Room { id, rest } => match registry.get_or_create(id) {
            Ok(room) => serve_room(room, &rest, ws),
            Err(e) => fault_response(e, ws),
        },
    };
    Ok(response)
}

// Hand out a fresh private identity; the room itself appears on first use
fn create_room() -> Response {
    let id = RoomId::new_unique();
    debug!("Issued private room id {}", id);
    warp::reply::with_header(id.to_string(), "Access-Control-Allow-Origin", "*").into_response()
}

// The room's own sub-routes, relative to `/api/chart/<name>`
fn serve_room(room: RoomHandle, rest: &str, ws: Option<Ws>) -> Response {
    match rest.strip_prefix('/') {
        Some(WEBSOCKET_PATH) => match ws {
            Some(ws) => ws
                .on_upgrade(move |socket| handle_room_session(socket, room))
                .into_response(),
            None => warp::reply::with_status("expected websocket", StatusCode::BAD_REQUEST)
                .into_response(),
        },
        _ => RouteRejection::NOT_FOUND.into_response(),
    }
}

// Last-resort fault reporting: 500 for HTTP, error frame + 1011 for upgrades
fn fault_response(err: ChartRoomError, ws: Option<Ws>) -> Response {
    error!("Request failed: {}", err);
    match ws {
        Some(ws) => ws
            .on_upgrade(move |socket| close_with_fault(socket, err))
            .into_response(),
        None => warp::reply::with_status(err.to_string(), StatusCode::INTERNAL_SERVER_ERROR)
            .into_response(),
    }
}
