//! REST configuration surface of the gateway.
//!
//! Request flow: CORS headers → OPTIONS short-circuit → prefix strip → route
//! lookup (miss → 404 envelope) → per-request recovery boundary → handler
//! (bind → validate → store op → envelope). The store is handed in at
//! construction and is the only state shared between requests.

pub mod code;
pub mod form;
pub mod forms;
mod handlers;

pub use code::{respond, Envelope, OK, PARAM_INVALID, ROUTE_NOT_FOUND, RULE_NOT_FOUND, SYSTEM_ERR};

use anyhow::{Context, Result};
use bytes::Bytes;
use gateconf_store::Store;
use http::{header, HeaderValue, Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::tokio::TokioIo;
use std::any::Any;
use std::backtrace::Backtrace;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

/// Everything a handler may look at for one request.
pub struct Ctx<'a> {
    pub store: &'a dyn Store,
    pub params: HashMap<String, String>,
    pub body: &'a [u8],
}

impl Ctx<'_> {
    pub fn param(&self, name: &str) -> &str {
        self.params.get(name).map(String::as_str).unwrap_or("")
    }
}

type HandlerFn = fn(&Ctx<'_>) -> Result<Response<Full<Bytes>>>;

pub struct ConfigApi {
    prefix: String,
    store: Arc<dyn Store>,
    routes: HashMap<Method, matchit::Router<HandlerFn>>,
}

impl ConfigApi {
    pub fn new(prefix: impl Into<String>, store: Arc<dyn Store>) -> Result<Self> {
        let mut api = Self {
            prefix: prefix.into(),
            store,
            routes: HashMap::new(),
        };
        api.init_routes()?;
        Ok(api)
    }

    fn route(&mut self, method: Method, path: &str, handler: HandlerFn) -> Result<()> {
        self.routes
            .entry(method.clone())
            .or_default()
            .insert(path, handler)
            .with_context(|| format!("register route {} {}", method, path))
    }

    fn init_routes(&mut self) -> Result<()> {
        use handlers::*;

        self.route(Method::GET, "/config", all_configs_get)?;

        // Proxy path rules
        self.route(Method::GET, "/plugin/proxy/pathrules", path_rules_get)?;
        self.route(Method::GET, "/plugin/proxy/pathrule/{id}", path_rule_get)?;
        self.route(Method::POST, "/plugin/proxy/pathrule", path_rule_post)?;
        self.route(Method::PUT, "/plugin/proxy/pathrule/{id}", path_rule_put)?;
        self.route(Method::DELETE, "/plugin/proxy/pathrule/{id}", path_rule_delete)?;

        // Proxy server rules
        self.route(Method::GET, "/plugin/proxy/srvrules", srv_rules_get)?;
        self.route(Method::GET, "/plugin/proxy/srvrule/{id}", srv_rule_get)?;
        self.route(Method::POST, "/plugin/proxy/srvrule", srv_rule_post)?;
        self.route(Method::PUT, "/plugin/proxy/srvrule/{id}", srv_rule_put)?;
        self.route(Method::DELETE, "/plugin/proxy/srvrule/{id}", srv_rule_delete)?;

        // Proxy reverse servers
        self.route(Method::GET, "/plugin/proxy/reversesrvgroups", reverse_srv_groups_get)?;
        self.route(Method::GET, "/plugin/proxy/reversesrv/{group}", reverse_srv_group_get)?;
        self.route(Method::PUT, "/plugin/proxy/reversesrv/{group}", reverse_srv_group_put)?;
        self.route(Method::DELETE, "/plugin/proxy/reversesrv/{group}", reverse_srv_group_delete)?;
        self.route(Method::GET, "/plugin/proxy/reversesrv/{group}/{id}", reverse_srv_get)?;
        self.route(Method::POST, "/plugin/proxy/reversesrv", reverse_srv_post)?;
        self.route(Method::PUT, "/plugin/proxy/reversesrv/{group}/{id}", reverse_srv_put)?;
        self.route(Method::DELETE, "/plugin/proxy/reversesrv/{group}/{id}", reverse_srv_delete)?;

        // Cache exceptions
        self.route(Method::GET, "/plugin/cache/rules", cache_rules_get)?;
        self.route(Method::GET, "/plugin/cache/rule/{id}", cache_rule_get)?;
        self.route(Method::POST, "/plugin/cache/rule", cache_rule_post)?;
        self.route(Method::PUT, "/plugin/cache/rule/{id}", cache_rule_put)?;
        self.route(Method::DELETE, "/plugin/cache/rule/{id}", cache_rule_delete)?;

        Ok(())
    }

    pub async fn serve(self: Arc<Self>, addr: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(addr).await?;
        info!("config api listening on {}", addr);
        loop {
            let (stream, _) = listener.accept().await?;
            let me = self.clone();
            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let conn = http1::Builder::new().serve_connection(
                    io,
                    service_fn(move |req| {
                        let me = me.clone();
                        async move { me.handle(req).await }
                    }),
                );
                if let Err(e) = conn.await {
                    error!("conn error: {e}");
                }
            });
        }
    }

    pub async fn handle(&self, req: Request<Incoming>) -> Result<Response<Full<Bytes>>, hyper::Error> {
        let (parts, body) = req.into_parts();
        let body = body.collect().await?.to_bytes();
        Ok(self.dispatch(&parts, body))
    }

    /// One request, start to finish. Body already collected so the handler
    /// chain stays synchronous and the recovery boundary can wrap it whole.
    pub fn dispatch(&self, parts: &http::request::Parts, body: Bytes) -> Response<Full<Bytes>> {
        let origin = parts.headers.get(header::ORIGIN).cloned();

        if parts.method == Method::OPTIONS {
            return with_cors(origin, simple(StatusCode::OK, Bytes::new()));
        }

        let path = parts.uri.path();
        let path = path.strip_prefix(self.prefix.as_str()).unwrap_or(path);

        let matched = self.routes.get(&parts.method).and_then(|r| r.at(path).ok());
        let resp = match matched {
            None => {
                info!("no route: {} {}", parts.method, path);
                respond(StatusCode::NOT_FOUND, &Envelope::route_not_found())
            }
            Some(m) => {
                debug!(form = %String::from_utf8_lossy(&body), "request with form");
                let params = m
                    .params
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect();
                let handler = *m.value;
                let ctx = Ctx {
                    store: self.store.as_ref(),
                    params,
                    body: &body,
                };
                recover(handler, &ctx)
            }
        };

        with_cors(origin, resp)
    }
}

/// Per-request recovery boundary. Both error results and panics end up as a
/// SystemErr envelope; nothing crosses uncaught and the process keeps
/// serving.
fn recover(handler: HandlerFn, ctx: &Ctx<'_>) -> Response<Full<Bytes>> {
    match panic::catch_unwind(AssertUnwindSafe(|| handler(ctx))) {
        Ok(Ok(resp)) => resp,
        Ok(Err(err)) => {
            error!("handler failed: {:#}", err);
            respond(StatusCode::OK, &Envelope::system_err(format!("error: {:#}", err)))
        }
        Err(payload) => {
            let msg = panic_message(payload.as_ref());
            error!("handler panicked: {}\n{}", msg, Backtrace::force_capture());
            respond(StatusCode::OK, &Envelope::system_err(format!("error: {}", msg)))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}

/// CORS headers go on every reply, handler-produced or not.
fn with_cors(origin: Option<HeaderValue>, mut resp: Response<Full<Bytes>>) -> Response<Full<Bytes>> {
    let headers = resp.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        origin.unwrap_or_else(|| HeaderValue::from_static("*")),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET,POST,PUT,DELETE,OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    resp
}

fn simple(status: StatusCode, body: Bytes) -> Response<Full<Bytes>> {
    Response::builder().status(status).body(Full::new(body)).unwrap()
}
