//! Radix-tree request router.
//!
//! One tree per HTTP method, O(path-length) lookup. A path that matches under
//! some other method is reported as such, so the app can answer 405 with an
//! `Allow` header instead of 404.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use matchit::Router as MatchitRouter;
use tracing::debug;

use crate::handler::{BoxedHandler, Handler};

/// Result of matching a method and path.
pub(crate) enum Route {
    Found(BoxedHandler, HashMap<String, String>),
    /// The path exists under these other methods.
    MethodNotAllowed(Vec<Method>),
    NotFound,
}

/// The application router. Build it once at startup and hand it to
/// [`App::builder`](crate::App::builder).
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Registers a handler for a method + path pair.
    ///
    /// Path parameters use `{name}` syntax:
    ///
    /// ```rust
    /// # use conneg::{Request, Response, Router};
    /// # use http::Method;
    /// # async fn get_item(_: Request) -> Response { Response::text("") }
    /// # async fn create_item(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::GET,  "/items/{id}", get_item)
    ///     .on(Method::POST, "/items",      create_item);
    /// ```
    ///
    /// # Panics
    ///
    /// On an invalid or conflicting path; routes are fixed at startup.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::GET, path, handler)
    }

    pub fn post(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::POST, path, handler)
    }

    pub fn put(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::PUT, path, handler)
    }

    pub fn patch(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::PATCH, path, handler)
    }

    pub fn delete(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::DELETE, path, handler)
    }

    /// Registers a built-in route unless the application already owns the
    /// path.
    pub(crate) fn insert_default(&mut self, method: Method, path: &str, handler: impl Handler) {
        let tree = self.routes.entry(method).or_default();
        if let Err(e) = tree.insert(path, handler.into_boxed_handler()) {
            debug!(path, error = %e, "built-in route shadowed by application route");
        }
    }

    pub(crate) fn lookup(&self, method: &Method, path: &str) -> Route {
        if let Some(matched) = self.routes.get(method).and_then(|tree| tree.at(path).ok()) {
            let params = matched.params.iter().map(|(k, v)| (k.to_owned(), v.to_owned())).collect();
            return Route::Found(Arc::clone(matched.value), params);
        }

        let mut allowed: Vec<Method> = self
            .routes
            .iter()
            .filter(|(m, tree)| *m != method && tree.at(path).is_ok())
            .map(|(m, _)| m.clone())
            .collect();
        if allowed.is_empty() {
            return Route::NotFound;
        }
        allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Route::MethodNotAllowed(allowed)
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Request, Response};

    async fn ok(_: Request) -> Response {
        Response::text("ok")
    }

    fn router() -> Router {
        Router::new().get("/items/{id}", ok).delete("/items/{id}", ok).post("/items", ok)
    }

    #[test]
    fn finds_with_params() {
        let Route::Found(_, params) = router().lookup(&Method::GET, "/items/7") else {
            panic!("expected match");
        };
        assert_eq!(params["id"], "7");
    }

    #[test]
    fn other_methods_are_listed() {
        let Route::MethodNotAllowed(allowed) = router().lookup(&Method::PUT, "/items/7") else {
            panic!("expected 405");
        };
        assert_eq!(allowed, [Method::DELETE, Method::GET]);
    }

    #[test]
    fn unknown_path() {
        assert!(matches!(router().lookup(&Method::GET, "/nope"), Route::NotFound));
    }

    #[test]
    fn defaults_do_not_override() {
        let mut router = router();
        router.insert_default(Method::POST, "/items", ok);
        router.insert_default(Method::GET, "/health", ok);
        assert!(matches!(router.lookup(&Method::GET, "/health"), Route::Found(..)));
    }
}
