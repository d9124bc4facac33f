use std::borrow::Cow;
use std::error::Error;
use std::net::ToSocketAddrs;
use std::sync::mpsc::Sender;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use json::object;
use log::warn;
use tiny_http::{Method, Response};

use crate::host::{HostEvent, Status};
use crate::state::SessionState;

const HTML: &str = include_str!("home.html");

pub struct Server(tiny_http::Server);

/// What a request resolves to, before any response is built.
#[derive(Debug, PartialEq, Eq)]
enum Route {
    Home,
    Status,
    Control(HostEvent),
    MethodNotAllowed,
    NotFound,
}

fn route(method: &Method, url: &str) -> Route {
    let control = match url {
        "/" => return Route::Home,
        "/status.json" => return Route::Status,
        "/foreground" => HostEvent::Foreground,
        "/background" => HostEvent::Background,
        "/quick" => HostEvent::QuickLaunch,
        "/eula" => HostEvent::EulaAgreed,
        _ => return Route::NotFound,
    };
    if *method == Method::Post {
        Route::Control(control)
    } else {
        Route::MethodNotAllowed
    }
}

fn session_state(status: &Status) -> SessionState {
    status
        .session
        .as_ref()
        .map(|session| session.state())
        .unwrap_or(SessionState::Idle)
}

fn running_for(status: &Status) -> Option<u64> {
    let now = Instant::now();
    status
        .session
        .as_ref()
        .filter(|session| session.is_running())
        .map(|session| now.duration_since(session.started_at()).as_secs())
}

fn status_json(status: &Status) -> String {
    let obj = object! {
        state: session_state(status).to_string(),
        foreground: status.foreground,
        eula_agreed: status.eula_agreed,
        flash_available: status.flash_available,
        screen: status.screen.to_string(),
        flashes: status.session.as_ref().map(|session| session.flashes()),
        running_for: running_for(status)
    };
    json::stringify_pretty(obj, 2)
}

fn home_html(status: &Status) -> String {
    let strobe = match session_state(status) {
        SessionState::Running => {
            let since = status
                .session
                .as_ref()
                .map(|session| {
                    let duration = Instant::now().duration_since(session.started_at());
                    let formatter = timeago::Formatter::new();
                    Cow::from(formatter.convert(duration))
                })
                .unwrap_or_else(|| Cow::from("at an unknown time"));
            format!("🔵🔴⚪ Strobing, started {}", since)
        }
        SessionState::Stopping => String::from("🟡 Stopping"),
        SessionState::Idle if !status.eula_agreed => String::from("⚫ Off, waiting for EULA"),
        SessionState::Idle => String::from("⚫ Off"),
    };
    HTML.replace("$strobe$", &strobe)
        .replace("$screen$", &status.screen.to_string())
        .replace("$swatch$", &status.screen.css())
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Body {
    Html,
    Json,
    Text,
}

/// Status code, content kind and body for one request.
#[derive(Debug, PartialEq, Eq)]
struct Reply {
    code: u16,
    body: Body,
    text: String,
}

impl Reply {
    fn text(code: u16, text: &str) -> Reply {
        Reply {
            code,
            body: Body::Text,
            text: text.to_string(),
        }
    }
}

fn reply(route: Route, state: &RwLock<Status>, host: &Sender<HostEvent>) -> Reply {
    match route {
        Route::Home | Route::Status => {
            let current = { state.read().map(|status| status.clone()) };
            match (route, current) {
                (Route::Home, Ok(current)) => Reply {
                    code: 200,
                    body: Body::Html,
                    text: home_html(&current),
                },
                (_, Ok(current)) => Reply {
                    code: 200,
                    body: Body::Json,
                    text: status_json(&current),
                },
                (_, Err(_)) => Reply::text(500, "Status unavailable"),
            }
        }
        Route::Control(event) => match host.send(event) {
            Ok(()) => Reply::text(202, "Accepted"),
            Err(_) => {
                warn!("host loop gone, dropping {:?}", event);
                Reply::text(503, "Shutting down")
            }
        },
        Route::MethodNotAllowed => Reply::text(405, "Method not allowed"),
        Route::NotFound => Reply::text(404, "Not found"),
    }
}

impl Server {
    pub fn new<A>(addr: A) -> Result<Server, Box<dyn Error + Send + Sync + 'static>>
    where
        A: ToSocketAddrs,
    {
        tiny_http::Server::http(addr).map(Server)
    }

    pub fn handle_requests(&self, state: Arc<RwLock<Status>>, host: Sender<HostEvent>) {
        let json = "Content-type: application/json; charset=utf-8"
            .parse::<tiny_http::Header>()
            .unwrap();
        let html_content = "Content-type: text/html; charset=utf-8"
            .parse::<tiny_http::Header>()
            .unwrap();
        for request in self.0.incoming_requests() {
            let reply = reply(route(request.method(), request.url()), &state, &host);
            let response = Response::from_string(reply.text).with_status_code(reply.code);
            let response = match reply.body {
                Body::Html => response.with_header(html_content.clone()),
                Body::Json => response.with_header(json.clone()),
                Body::Text => response,
            };

            // Ignoring I/O errors that occur here so that we don't take down the process if there
            // is an issue sending the response.
            let _ = request.respond(response);
        }
    }

    pub fn shutdown(&self) {
        self.0.unblock();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::light::tests::Recorder;
    use crate::light::Color;
    use crate::pattern::BlinkPattern;
    use crate::scheduler::BlinkScheduler;

    #[test]
    fn routes() {
        assert_eq!(route(&Method::Get, "/"), Route::Home);
        assert_eq!(route(&Method::Get, "/status.json"), Route::Status);
        assert_eq!(
            route(&Method::Post, "/quick"),
            Route::Control(HostEvent::QuickLaunch)
        );
        assert_eq!(
            route(&Method::Post, "/eula"),
            Route::Control(HostEvent::EulaAgreed)
        );
        assert_eq!(route(&Method::Get, "/quick"), Route::MethodNotAllowed);
        assert_eq!(route(&Method::Post, "/nope"), Route::NotFound);
    }

    #[test]
    fn idle_status() {
        let status = Status {
            eula_agreed: true,
            ..Status::default()
        };
        let parsed = json::parse(&status_json(&status)).unwrap();
        assert_eq!(parsed["state"], "Idle");
        assert_eq!(parsed["screen"], "#CC000000");
        assert!(parsed["flashes"].is_null());
        assert!(parsed["running_for"].is_null());
        assert_eq!(parsed["eula_agreed"], true);
    }

    #[test]
    fn running_status() {
        let mut scheduler = BlinkScheduler::new();
        scheduler
            .start(
                Recorder::default(),
                BlinkPattern::from_millis(&[1]).unwrap(),
                Duration::from_millis(1),
            )
            .unwrap();
        thread::sleep(Duration::from_millis(10));
        let status = Status {
            foreground: true,
            eula_agreed: true,
            session: scheduler.handle(),
            ..Status::default()
        };
        let parsed = json::parse(&status_json(&status)).unwrap();
        assert_eq!(parsed["state"], "Running");
        assert_eq!(parsed["foreground"], true);
        assert!(parsed["flashes"].as_u64().unwrap() > 0);
        assert_eq!(parsed["running_for"], 0);
        assert!(home_html(&status).contains("Strobing, started"));
        assert!(scheduler.stop().is_some());
    }

    #[test]
    fn control_is_forwarded_to_the_host() {
        let state = RwLock::new(Status::default());
        let (tx, rx) = mpsc::channel();
        let accepted = reply(Route::Control(HostEvent::QuickLaunch), &state, &tx);
        assert_eq!(accepted, Reply::text(202, "Accepted"));
        assert_eq!(rx.try_recv(), Ok(HostEvent::QuickLaunch));

        drop(rx);
        let gone = reply(Route::Control(HostEvent::Background), &state, &tx);
        assert_eq!(gone.code, 503);
    }

    #[test]
    fn status_replies() {
        let state = RwLock::new(Status::default());
        let (tx, _rx) = mpsc::channel();
        let json = reply(Route::Status, &state, &tx);
        assert_eq!((json.code, json.body), (200, Body::Json));
        let html = reply(Route::Home, &state, &tx);
        assert_eq!((html.code, html.body), (200, Body::Html));
        assert!(html.text.contains("rgba(0, 0, 0, 0.80)"));
        assert_eq!(reply(Route::NotFound, &state, &tx).code, 404);
        assert_eq!(reply(Route::MethodNotAllowed, &state, &tx).code, 405);
    }

    #[test]
    fn home_page_waits_for_eula() {
        let status = Status {
            screen: Color::BLUE,
            ..Status::default()
        };
        let html = home_html(&status);
        assert!(html.contains("waiting for EULA"));
        assert!(html.contains("#FF0000FF"));
    }
}
