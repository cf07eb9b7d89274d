use crate::host::{HostBook, HostBookError};
use crate::service::Waker;
use crate::wol::WakeError;
use log::info;
use rouille::{router, Request, Response};
use serde::Serialize;
use std::path::PathBuf;

impl From<WakeError> for Response {
    fn from(e: WakeError) -> Self {
        let status = match e {
            _ if e.is_input_error() => 400,
            WakeError::SendFailed { .. } => 502,
            _ => 503,
        };
        Response::text(e.to_string()).with_status_code(status)
    }
}

impl From<HostBookError> for Response {
    fn from(e: HostBookError) -> Self {
        Response::text(e.to_string()).with_status_code(500)
    }
}

#[derive(Serialize)]
struct WakeResponse {
    title: String,
    attempts: u32,
    // Datagrams the local stack accepted. Not a delivery confirmation.
    accepted: u32,
}

#[derive(Clone)]
pub struct AppState {
    pub book_path: PathBuf,
    pub waker: Waker,
}

fn list_hosts(state: &AppState) -> Result<Response, HostBookError> {
    let book = HostBook::load(&state.book_path)?;
    Ok(Response::json(&book))
}

// The router hands over the title already percent-decoded.
fn wake_host(state: &AppState, title: String) -> Result<Response, HostBookError> {
    let book = HostBook::load(&state.book_path)?;
    let host = match book.get(&title) {
        Some(host) => host,
        None => {
            return Ok(Response::text(format!("No host named {:?}", title)).with_status_code(404))
        }
    };
    Ok(match state.waker.wake(host) {
        Ok(sent) => Response::json(&WakeResponse {
            title,
            attempts: sent.attempts,
            accepted: sent.accepted,
        }),
        Err(e) => e.into(),
    })
}

fn varz() -> Response {
    let metrics = prometheus::gather();
    let encoder = prometheus::TextEncoder::new();
    match encoder.encode_to_string(&metrics) {
        Ok(text) => Response::text(text),
        Err(e) => Response::text(e.to_string()).with_status_code(500),
    }
}

pub fn handle(request: &Request, state: &AppState) -> Response {
    let response = router!(request,
        (GET) (/hosts) => {
            list_hosts(state).unwrap_or_else(Response::from)
        },
        (POST) (/hosts/{title: String}/wake) => {
            wake_host(state, title).unwrap_or_else(Response::from)
        },
        (GET) (/varz) => {
            varz()
        },
        _ => Response::empty_404()
    );
    info!(
        "{method} {request} {status}",
        method = request.method(),
        request = request.raw_url(),
        status = response.status_code,
    );
    response
}

pub fn serve(addr: &str, state: AppState) -> ! {
    info!("Starting server on {}...", addr);
    rouille::start_server(addr.to_string(), move |request| handle(request, &state))
}
