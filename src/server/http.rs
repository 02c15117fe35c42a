//! Blocking, single-threaded static file server.
//!
//! `StaticServer` is the idle state: configured and validated, not yet
//! listening. `bind` consumes it and returns a `BoundServer`, so a server
//! can only ever bind once. `BoundServer::serve_forever` handles requests
//! one at a time on the calling thread.
//!
//! CHANGELOG:
//! - 10/16/2026 - serve_forever reports a listener that dies; log listing failures
//! - 10/16/2026 - Initial implementation

use std::fs::File;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tiny_http::{Header, Method, Request, Response, Server};

use super::files::{self, Resolved};
use super::mime::{configure_mime_overrides, MimeTable};
use crate::config::ServeConfig;
use crate::error::{Error, Result};

const HTML_UTF8: &str = "text/html; charset=utf-8";

/// Configured server that has not bound its listener yet.
#[derive(Debug)]
pub struct StaticServer {
    root: PathBuf,
    addr: String,
    mime: MimeTable,
}

/// Server with a live listener.
pub struct BoundServer {
    server: Server,
    root: PathBuf,
    mime: MimeTable,
    /// Set by `unblock`; tells a closed listener apart from a dead one.
    stopping: AtomicBool,
}

impl StaticServer {
    /// Validate the root directory and build the MIME table.
    ///
    /// Fails if the root is missing, not a directory, or empty.
    pub fn new(config: &ServeConfig) -> Result<Self> {
        let root = validate_root(&config.root)?;
        Ok(Self {
            root,
            addr: config.addr(),
            mime: configure_mime_overrides(&config.mime_overrides),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Bind the listener. Failure is fatal; there is no retry.
    pub fn bind(self) -> Result<BoundServer> {
        let server =
            Server::http(self.addr.as_str()).map_err(|e| Error::bind(&self.addr, e.to_string()))?;
        let bound = BoundServer {
            server,
            root: self.root,
            mime: self.mime,
            stopping: AtomicBool::new(false),
        };
        tracing::info!(
            addr = %bound.display_addr(),
            root = %bound.root.display(),
            "serving"
        );
        Ok(bound)
    }
}

impl BoundServer {
    /// Actual listening address (resolves port 0).
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    fn display_addr(&self) -> String {
        self.local_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Handle requests until `unblock` is called.
    ///
    /// Returns `Ok` only after `unblock`. If the listener goes away on its
    /// own the loop ends with `Error::Serve`.
    pub fn serve_forever(&self) -> Result<()> {
        loop {
            match self.server.recv() {
                Ok(request) => self.handle(request),
                Err(_) if self.stopping.load(Ordering::SeqCst) => {
                    tracing::debug!("serve loop finished");
                    return Ok(());
                }
                Err(e) => {
                    tracing::error!(error = %e, "listener stopped");
                    return Err(Error::serve(e.to_string()));
                }
            }
        }
    }

    /// Wake one thread blocked in `serve_forever`, ending its loop cleanly.
    pub fn unblock(&self) {
        self.stopping.store(true, Ordering::SeqCst);
        self.server.unblock();
    }

    fn handle(&self, request: Request) {
        let method = request.method().clone();
        let url = request.url().to_string();

        let result = match method {
            Method::Get | Method::Head => self.respond_with_path(request, &url),
            _ => respond_error(request, 501, "Unsupported method"),
        };

        match result {
            Ok(status) => tracing::info!(method = %method, path = %url, status, "request"),
            Err(e) => tracing::warn!(method = %method, path = %url, error = %e, "response failed"),
        }
    }

    fn respond_with_path(&self, request: Request, url: &str) -> std::io::Result<u16> {
        match files::resolve(&self.root, url) {
            Resolved::File(path) => self.respond_file(request, &path),
            Resolved::Redirect(location) => {
                let mut response = Response::empty(301);
                if let Some(h) = header("Location", &location) {
                    response.add_header(h);
                }
                request.respond(response)?;
                Ok(301)
            }
            Resolved::Listing { dir, url_path } => match files::render_listing(&dir, &url_path) {
                Ok(html) => {
                    let mut response = Response::from_data(html.into_bytes());
                    if let Some(h) = header("Content-Type", HTML_UTF8) {
                        response.add_header(h);
                    }
                    request.respond(response)?;
                    Ok(200)
                }
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "listing failed");
                    respond_error(request, 404, "No permission to list directory")
                }
            },
            Resolved::NotFound => respond_error(request, 404, "File not found"),
        }
    }

    fn respond_file(&self, request: Request, path: &Path) -> std::io::Result<u16> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return respond_error(request, 404, "File not found")
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "open failed");
                return respond_error(request, 500, "Could not read file");
            }
        };

        let content_type = self.mime.content_type(path);
        let mut response = Response::from_file(file);
        if let Some(h) = header("Content-Type", &content_type) {
            response.add_header(h);
        }
        request.respond(response)?;
        Ok(200)
    }
}

/// Check the root directory exists, is a directory, and has something in
/// it.
pub fn validate_root(root: &Path) -> Result<PathBuf> {
    if !root.is_dir() {
        return Err(Error::RootNotFound {
            path: root.to_path_buf(),
        });
    }
    let mut entries = std::fs::read_dir(root)?;
    if entries.next().is_none() {
        return Err(Error::RootEmpty {
            path: root.to_path_buf(),
        });
    }
    Ok(root.to_path_buf())
}

fn header(name: &str, value: &str) -> Option<Header> {
    Header::from_bytes(name.as_bytes(), value.as_bytes()).ok()
}

fn respond_error(request: Request, code: u16, message: &str) -> std::io::Result<u16> {
    let body = format!(
        "<!DOCTYPE HTML>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Error response</title>\n</head>\n<body>\n<h1>Error response</h1>\n\
         <p>Error code: {}</p>\n<p>Message: {}.</p>\n</body>\n</html>\n",
        code,
        files::escape_html(message)
    );
    let mut response = Response::from_data(body.into_bytes()).with_status_code(code);
    if let Some(h) = header("Content-Type", HTML_UTF8) {
        response.add_header(h);
    }
    request.respond(response)?;
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, HashMap};
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::sync::Arc;
    use std::thread::JoinHandle;

    struct Reply {
        status: u16,
        headers: HashMap<String, String>,
        body: Vec<u8>,
    }

    /// Minimal HTTP/1.1 client: one request per connection.
    fn send(addr: SocketAddr, method: &str, path: &str) -> Reply {
        let mut stream = TcpStream::connect(addr).unwrap();
        write!(
            stream,
            "{} {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
            method, path
        )
        .unwrap();
        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).unwrap();

        let split = raw
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .expect("no header terminator");
        let head = String::from_utf8_lossy(&raw[..split]).to_string();
        let body = raw[split + 4..].to_vec();

        let mut lines = head.lines();
        let status: u16 = lines
            .next()
            .unwrap()
            .split_whitespace()
            .nth(1)
            .unwrap()
            .parse()
            .unwrap();
        let headers = lines
            .filter_map(|l| l.split_once(':'))
            .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
            .collect();
        Reply {
            status,
            headers,
            body,
        }
    }

    fn site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("index.html"),
            r#"<script type="module" src="instances.js"></script>"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("instances.js"), "export default init;").unwrap();
        std::fs::write(dir.path().join("instances_bg.wasm"), b"\0asm\x01\0\0\0").unwrap();
        std::fs::create_dir(dir.path().join("snippets")).unwrap();
        std::fs::write(dir.path().join("snippets").join("glue.js"), "").unwrap();
        dir
    }

    fn local_config(root: &Path) -> ServeConfig {
        ServeConfig {
            root: root.to_path_buf(),
            host: "127.0.0.1".to_string(),
            port: 0,
            ..ServeConfig::default()
        }
    }

    fn start(config: &ServeConfig) -> (Arc<BoundServer>, SocketAddr, JoinHandle<Result<()>>) {
        let server = Arc::new(StaticServer::new(config).unwrap().bind().unwrap());
        let addr = server.local_addr().unwrap();
        let worker = Arc::clone(&server);
        let handle = std::thread::spawn(move || worker.serve_forever());
        (server, addr, handle)
    }

    fn stop(server: Arc<BoundServer>, handle: JoinHandle<Result<()>>) {
        server.unblock();
        handle.join().unwrap().unwrap();
    }

    #[test]
    fn test_index_and_module_content_types() {
        let dir = site();
        let (server, addr, handle) = start(&local_config(dir.path()));

        let index = send(addr, "GET", "/index.html");
        assert_eq!(index.status, 200);
        assert_eq!(index.headers["content-type"], "text/html");
        assert!(String::from_utf8_lossy(&index.body).contains("instances.js"));

        let js = send(addr, "GET", "/instances.js");
        assert_eq!(js.status, 200);
        assert_eq!(js.headers["content-type"], "application/javascript");
        assert_eq!(js.body, b"export default init;");

        let wasm = send(addr, "GET", "/instances_bg.wasm");
        assert_eq!(wasm.status, 200);
        assert_eq!(wasm.headers["content-type"], "application/wasm");

        stop(server, handle);
    }

    #[test]
    fn test_missing_file_is_404() {
        let dir = site();
        let (server, addr, handle) = start(&local_config(dir.path()));

        let reply = send(addr, "GET", "/missing.wasm");
        assert_eq!(reply.status, 404);
        assert!(String::from_utf8_lossy(&reply.body).contains("File not found"));

        stop(server, handle);
    }

    #[test]
    fn test_root_path_serves_index() {
        let dir = site();
        let (server, addr, handle) = start(&local_config(dir.path()));

        let reply = send(addr, "GET", "/");
        assert_eq!(reply.status, 200);
        assert_eq!(reply.headers["content-type"], "text/html");

        stop(server, handle);
    }

    #[test]
    fn test_directory_redirect_and_listing() {
        let dir = site();
        let (server, addr, handle) = start(&local_config(dir.path()));

        let redirect = send(addr, "GET", "/snippets");
        assert_eq!(redirect.status, 301);
        assert_eq!(redirect.headers["location"], "/snippets/");

        let listing = send(addr, "GET", "/snippets/");
        assert_eq!(listing.status, 200);
        assert_eq!(listing.headers["content-type"], HTML_UTF8);
        assert!(String::from_utf8_lossy(&listing.body).contains(r#"href="glue.js""#));

        stop(server, handle);
    }

    #[test]
    fn test_traversal_stays_inside_root() {
        let outer = tempfile::tempdir().unwrap();
        std::fs::write(outer.path().join("secret.txt"), "nope").unwrap();
        let root = outer.path().join("web");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(root.join("index.html"), "ok").unwrap();

        let (server, addr, handle) = start(&local_config(&root));
        let reply = send(addr, "GET", "/../secret.txt");
        assert_eq!(reply.status, 404);
        stop(server, handle);
    }

    #[test]
    fn test_head_has_headers_but_no_body() {
        let dir = site();
        let (server, addr, handle) = start(&local_config(dir.path()));

        let reply = send(addr, "HEAD", "/instances.js");
        assert_eq!(reply.status, 200);
        assert_eq!(reply.headers["content-type"], "application/javascript");
        assert!(reply.body.is_empty());

        stop(server, handle);
    }

    #[test]
    fn test_unsupported_method_is_501() {
        let dir = site();
        let (server, addr, handle) = start(&local_config(dir.path()));

        let reply = send(addr, "DELETE", "/index.html");
        assert_eq!(reply.status, 501);
        assert!(dir.path().join("index.html").exists());

        stop(server, handle);
    }

    #[test]
    fn test_custom_overrides_replace_defaults() {
        let dir = site();
        let mut config = local_config(dir.path());
        config.mime_overrides = BTreeMap::new();
        config
            .mime_overrides
            .insert("wasm".to_string(), "application/x-test".to_string());
        let (server, addr, handle) = start(&config);

        let wasm = send(addr, "GET", "/instances_bg.wasm");
        assert_eq!(wasm.headers["content-type"], "application/x-test");

        // No .js override configured: falls back to the built-in table.
        let js = send(addr, "GET", "/instances.js");
        let builtin = mime_guess::from_ext("js")
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        assert_eq!(js.headers["content-type"], builtin);

        stop(server, handle);
    }

    #[test]
    fn test_second_bind_on_same_port_fails() {
        let dir = site();
        let first = StaticServer::new(&local_config(dir.path()))
            .unwrap()
            .bind()
            .unwrap();
        let port = first.local_addr().unwrap().port();

        let mut config = local_config(dir.path());
        config.port = port;
        match StaticServer::new(&config).unwrap().bind() {
            Err(Error::Bind { addr, .. }) => assert!(addr.ends_with(&port.to_string())),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("second bind on port {} should fail", port),
        }
        drop(first);
    }

    #[test]
    fn test_missing_root_fails_before_bind() {
        let dir = tempfile::tempdir().unwrap();
        let config = local_config(&dir.path().join("web"));
        assert!(matches!(
            StaticServer::new(&config),
            Err(Error::RootNotFound { .. })
        ));
    }

    #[test]
    fn test_empty_root_fails_before_bind() {
        let dir = tempfile::tempdir().unwrap();
        let config = local_config(dir.path());
        let err = StaticServer::new(&config).unwrap_err();
        assert!(matches!(err, Error::RootEmpty { .. }));
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_file_root_is_not_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("web");
        std::fs::write(&file, "").unwrap();
        assert!(matches!(
            validate_root(&file),
            Err(Error::RootNotFound { .. })
        ));
    }

    #[test]
    fn test_listener_dying_on_its_own_is_an_error() {
        let dir = site();
        let (server, _addr, handle) = start(&local_config(dir.path()));

        // Close the listener without going through `unblock`, the way a
        // failed accept thread would.
        server.server.unblock();
        match handle.join().unwrap() {
            Err(Error::Serve(_)) => {}
            Err(other) => panic!("unexpected error: {}", other),
            Ok(()) => panic!("a dead listener must not look like a clean stop"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_listing_is_404() {
        use std::os::unix::fs::PermissionsExt;

        let dir = site();
        let locked = dir.path().join("locked");
        std::fs::create_dir(&locked).unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();
        if std::fs::read_dir(&locked).is_ok() {
            // Running as root: permissions are not enforced.
            std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let (server, addr, handle) = start(&local_config(dir.path()));
        let reply = send(addr, "GET", "/locked/");
        stop(server, handle);
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(reply.status, 404);
        assert!(String::from_utf8_lossy(&reply.body).contains("No permission to list directory"));
    }
}
