//! Development server.
//!
//! Serves the output directory with `tiny_http` on its own thread while the
//! main thread watches and rebuilds. Ctrl+C unblocks the server and closes
//! the change aggregator, so both sides wind down.
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐
//! │   Main Thread   │     │  Server Thread   │
//! │ (watch + build) │     │  (HTTP Server)   │
//! └────────┬────────┘     └────────┬─────────┘
//!          ▼                       ▼
//!    Rebuild batches         Serve files
//!          └───────────┬───────────┘
//!                      ▼
//!              config.build.output
//! ```

use crate::config::SiteConfig;
use crate::generator::Generator;
use crate::log;
use crate::watch::{aggregator, watch_and_rebuild};
use anyhow::{Context, Result};
use std::{
    fs,
    io::Cursor,
    net::{IpAddr, SocketAddr},
    path::{Path, PathBuf},
    sync::Arc,
};
use tiny_http::{Header, Request, Response, Server, StatusCode};

/// Try binding to port, retry with incremented port if in use
const MAX_PORT_RETRIES: u16 = 10;

/// Build the site for the local address, then serve it until Ctrl+C,
/// rebuilding on change when `[serve] watch` is set.
pub fn serve_site(mut config: SiteConfig) -> Result<()> {
    let interface: IpAddr = config
        .serve
        .interface
        .parse()
        .with_context(|| format!("invalid interface `{}`", config.serve.interface))?;
    let (server, addr) = try_bind_port(interface, config.serve.port, MAX_PORT_RETRIES)?;
    config.site.url = local_url(addr);

    let mut generator = Generator::new(config)?;
    generator.build(None)?;

    let server = Arc::new(server);
    let config = generator.config();
    let changes = aggregator(config);
    let watch = config.serve.watch;
    let serve_root = config.build.output.clone();

    let (server_for_signal, changes_for_signal) = (Arc::clone(&server), Arc::clone(&changes));
    ctrlc::set_handler(move || {
        log!("serve"; "shutting down...");
        server_for_signal.unblock();
        changes_for_signal.close();
    })
    .context("Failed to set Ctrl+C handler")?;

    log!("serve"; "{}", generator.config().site.url);

    let handle = {
        let server = Arc::clone(&server);
        std::thread::spawn(move || {
            for request in server.incoming_requests() {
                if let Err(e) = handle_request(request, &serve_root) {
                    log!("serve"; "request error: {e}");
                }
            }
        })
    };

    if watch {
        watch_and_rebuild(&mut generator, &changes)?;
    }
    handle
        .join()
        .map_err(|_| anyhow::anyhow!("server thread panicked"))?;
    Ok(())
}

/// Site url for the address the server actually bound.
fn local_url(addr: SocketAddr) -> String {
    format!("http://{addr}")
}

/// Try to bind to a port, retrying with incremented port numbers if in use.
fn try_bind_port(interface: IpAddr, base_port: u16, max_retries: u16) -> Result<(Server, SocketAddr)> {
    let mut last_err = None;
    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                // Port 0 asks the OS for one; report what it picked
                let bound = server.server_addr().to_ip().unwrap_or(addr);
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, bound.port());
                }
                return Ok((server, bound));
            }
            Err(e) => last_err = Some(e),
        }
    }
    Err(anyhow::anyhow!(
        "Failed to bind after {} attempts (ports {}-{}): {}",
        max_retries,
        base_port,
        base_port.saturating_add(max_retries.saturating_sub(1)),
        last_err.map(|e| e.to_string()).unwrap_or_default()
    ))
}

// ============================================================================
// Request Handling
// ============================================================================

/// File to answer `url` with: the path itself, then `path.html` for
/// extensionless requests, then `path/index.html`.
pub fn resolve_request(serve_root: &Path, url: &str) -> Option<PathBuf> {
    // Decode URL-encoded characters (e.g., %20 → space)
    let url_path = urlencoding::decode(url)
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_default();
    let path_without_query = url_path.split(['?', '#']).next().unwrap_or(&url_path);
    let request_path = path_without_query.trim_matches('/');
    if request_path.split('/').any(|seg| seg == "..") {
        return None;
    }

    let local_path = serve_root.join(request_path);
    if local_path.is_file() {
        return Some(local_path);
    }
    if !request_path.is_empty() && Path::new(request_path).extension().is_none() {
        let with_html = serve_root.join(format!("{request_path}.html"));
        if with_html.is_file() {
            return Some(with_html);
        }
    }
    let index = local_path.join("index.html");
    index.is_file().then_some(index)
}

fn handle_request(request: Request, serve_root: &Path) -> Result<()> {
    match resolve_request(serve_root, request.url()) {
        Some(path) => serve_file(request, &path),
        None => serve_not_found(request),
    }
}

/// Serve a file with appropriate content type.
fn serve_file(request: Request, path: &Path) -> Result<()> {
    let content = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let response = Response::from_data(content).with_header(content_type_header(guess_content_type(path))?);
    request.respond(response)?;
    Ok(())
}

/// Serve 404 Not Found response.
fn serve_not_found(request: Request) -> Result<()> {
    let response = Response::new(
        StatusCode(404),
        vec![content_type_header("text/plain")?],
        Cursor::new("404 Not Found"),
        Some(13),
        None,
    );
    request.respond(response)?;
    Ok(())
}

fn content_type_header(value: &str) -> Result<Header> {
    Header::from_bytes("Content-Type", value).map_err(|()| anyhow::anyhow!("invalid header value {value}"))
}

/// Guess MIME content type from file extension.
///
/// Returns `application/octet-stream` for unknown extensions.
fn guess_content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        // Web content
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "application/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("xml") => "application/xml; charset=utf-8",

        // Images
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",

        // Fonts
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",

        // Documents and archives
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain; charset=utf-8",
        Some("zip") => "application/zip",

        _ => "application/octet-stream",
    }
}
