use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use travel_console::chat::ChatWidget;
use travel_console::chat_client::{ChatClient, Role};
use travel_console::config::ClientConfig;
use travel_console::coords::{parse_coordinates, Coordinate};
use travel_console::location_client::LocationClient;
use travel_console::log_client::LogClient;
use travel_console::logs::{LogFilters, LogSearchController, LogTableView};
use travel_console::map::view::{LikePlaceForm, MapView};
use travel_console::map::{GeolocationError, MapController};
use travel_console::markdown::renderer_for;
use travel_console::session::{FileSessionStore, SessionContext};
use travel_console::transport::ApiTransport;

const HELP: &str = "\
Commands:
  <text>                    send a chat message (coordinates are looked up directly)
  /clear                    clear the chat history
  /map <lat, lon> [| label] look up a point on the map
  /close                    close the info modal
  /locate [lat, lon]        recenter on a position (no argument: geolocation unavailable)
  /logs [query]             search logs from the first page
  /level <LEVEL>            filter logs by level
  /next, /prev              page through log results
  /quit                     exit";

/// Prints map widget updates to stdout.
struct ConsoleMapView {
    like_section: bool,
}

impl MapView for ConsoleMapView {
    fn set_view(&mut self, center: Coordinate, zoom: u8) {
        println!("[map] view {:.6}, {:.6} (zoom {})", center.latitude, center.longitude, zoom);
    }

    fn open_popup(&mut self, at: Coordinate, text: &str) {
        println!("[map] popup at {:.6}, {:.6}: {}", at.latitude, at.longitude, text);
    }

    fn close_popup(&mut self) {}

    fn set_modal_content(&mut self, html: &str) {
        println!("[modal] {}", html);
    }

    fn open_modal(&mut self) {
        println!("[modal] opened");
    }

    fn close_modal(&mut self) {
        println!("[modal] closed");
    }

    fn has_like_section(&self) -> bool {
        self.like_section
    }

    fn show_like_section(&mut self, form: Option<&LikePlaceForm>) {
        if let Some(form) = form {
            println!(
                "[like] {} ({}, {})",
                form.city_name, form.latitude, form.longitude
            );
        }
    }
}

fn print_logs(view: &LogTableView) {
    println!("[logs] {} (page {})", view.total_text, view.pager.page);
    if let Some(note) = &view.note {
        println!("[logs] note: {}", note);
    }
    for row in view.rows_html.split_inclusive("</tr>") {
        println!("{}", row);
    }
    println!(
        "[logs] prev {} / next {}",
        if view.pager.prev_disabled { "disabled" } else { "enabled" },
        if view.pager.next_disabled { "disabled" } else { "enabled" }
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_logging()?;

    let config = ClientConfig::from_env();
    tracing::info!("🗺️ Travel console starting up...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Configuration - Backend: {}, AI: {}, Authenticated: {}, Markdown: {}, Sanitize: {}",
        config.base_url,
        if config.page.ai_configured { "✅" } else { "❌" },
        if config.page.authenticated { "✅" } else { "❌" },
        if config.markdown { "✅" } else { "❌" },
        if config.sanitize { "✅" } else { "❌" }
    );

    let store = FileSessionStore::new(&config.session_file);
    let session = SessionContext::establish(&store)?;
    let renderer = renderer_for(config.markdown, config.sanitize);
    let transport = ApiTransport::new(config.base_url.clone());

    let lookup = Arc::new(LocationClient::new(
        transport.clone(),
        config.page.reverse_url.clone(),
    ));
    let mut chat = ChatWidget::new(
        session,
        Arc::new(ChatClient::new(transport.clone())),
        lookup.clone(),
        renderer.clone(),
    );
    let map = MapController::new(
        ConsoleMapView {
            like_section: config.page.authenticated,
        },
        lookup,
        renderer,
        config.page.clone(),
    );
    let mut logs = LogSearchController::new(Arc::new(LogClient::new(transport)));

    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (command, rest) = match line.split_once(' ') {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        match command {
            "" => continue,
            "/quit" | "/exit" => break,
            "/help" => println!("{}", HELP),
            "/clear" => {
                chat.clear().await;
                println!("[chat] cleared");
            }
            "/map" => {
                let (coords, label) = match rest.split_once('|') {
                    Some((coords, label)) => (coords, Some(label.trim())),
                    None => (rest, None),
                };
                match parse_coordinates(coords) {
                    Some(at) => {
                        match label {
                            Some(label) => map.on_search_result(at, label).await,
                            None => map.on_map_click(at).await,
                        };
                    }
                    None => println!("Not a coordinate: {}", coords),
                }
            }
            "/close" => map.close_modal(),
            "/locate" => match parse_coordinates(rest) {
                Some(at) => map.on_geolocation(Ok(at)),
                None => map.on_geolocation(Err(GeolocationError::Unsupported)),
            },
            "/logs" => {
                let filters = LogFilters {
                    q: rest.to_string(),
                    ..logs.filters().clone()
                };
                match logs.submit(filters).await {
                    Ok(view) => print_logs(view),
                    Err(e) => println!("[logs] {}", e),
                }
            }
            "/level" => {
                let filters = LogFilters {
                    level: rest.to_uppercase(),
                    ..logs.filters().clone()
                };
                match logs.submit(filters).await {
                    Ok(view) => print_logs(view),
                    Err(e) => println!("[logs] {}", e),
                }
            }
            "/next" => match logs.next().await {
                Ok(view) => print_logs(view),
                Err(e) => println!("[logs] {}", e),
            },
            "/prev" => match logs.previous().await {
                Ok(view) => print_logs(view),
                Err(e) => println!("[logs] {}", e),
            },
            _ => {
                let before = chat.transcript().len();
                chat.send(line).await;
                for entry in &chat.transcript()[before..] {
                    let who = match entry.message.role {
                        Role::User => "you",
                        Role::Assistant => "assistant",
                    };
                    println!("[{}] {}", who, entry.message.content);
                }
            }
        }
    }

    tracing::info!("Travel console shutting down");
    Ok(())
}

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    // Get log level from environment or default per build mode
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug,travel_console=trace,reqwest=info,hyper=info".to_string()
        } else {
            "warn,travel_console=info,reqwest=warn,hyper=warn".to_string()
        }
    });

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    // Logs go to stderr so they don't interleave with console output
    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Log level: {}", log_level);
    Ok(())
}
