//! Client route table.

use std::sync::Arc;

use tracing::debug;

use crate::guard::RouteGuard;
use crate::navigation::{Navigation, LOGIN_PATH};

pub struct RouteDef {
    pub pattern: &'static str,
    pub guarded: bool,
}

const fn open(pattern: &'static str) -> RouteDef {
    RouteDef { pattern, guarded: false }
}

const fn guarded(pattern: &'static str) -> RouteDef {
    RouteDef { pattern, guarded: true }
}

pub const ROUTES: &[RouteDef] = &[
    open("/"),
    open("/products"),
    open("/products/:category"),
    open("/foro"),
    open("/foro/:category"),
    open("/post/:id"),
    open("/registro"),
    open("/login"),
    guarded("/perfil"),
    open("/razas"),
    guarded("/crear-post"),
    guarded("/crear-evento"),
    open("/calendario"),
    open("/consejos"),
    open("/evento/:id"),
    open("/eventos"),
    open("/localizacion"),
    open("/blog"),
    open("/blog/experts"),
    open("/blog/news"),
    open("/blog/life"),
    open("/blog/consejos"),
];

/// Find the route matching `path`. `:name` segments match any non-empty segment.
pub fn resolve(path: &str) -> Option<&'static RouteDef> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    ROUTES.iter().find(|route| {
        let pattern: Vec<&str> = route.pattern.split('/').filter(|s| !s.is_empty()).collect();
        pattern.len() == segments.len()
            && pattern
                .iter()
                .zip(&segments)
                .all(|(p, s)| p.starts_with(':') || p == s)
    })
}

pub struct Router {
    guard: RouteGuard,
    navigation: Arc<Navigation>,
}

impl Router {
    pub fn new(guard: RouteGuard, navigation: Arc<Navigation>) -> Self {
        Self { guard, navigation }
    }

    /// Navigate to `path` and return where the user ends up
    pub fn open(&self, path: &str) -> String {
        match resolve(path) {
            None => {
                debug!("No route for {}, falling back to login", path);
                self.navigation.navigate_to(LOGIN_PATH);
            }
            Some(route) if route.guarded && !self.guard.can_activate() => {}
            Some(_) => self.navigation.navigate_to(path),
        }
        self.navigation.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_static_and_param_routes() {
        assert_eq!(resolve("/").unwrap().pattern, "/");
        assert_eq!(resolve("/perfil").unwrap().pattern, "/perfil");
        assert_eq!(resolve("/perfil/").unwrap().pattern, "/perfil");
        assert_eq!(resolve("/foro/salud").unwrap().pattern, "/foro/:category");
        assert_eq!(resolve("/post/12?ref=home").unwrap().pattern, "/post/:id");
        assert_eq!(resolve("/blog/news").unwrap().pattern, "/blog/news");
    }

    #[test]
    fn unknown_paths_do_not_resolve() {
        assert!(resolve("/inicio").is_none());
        assert!(resolve("/post").is_none());
        assert!(resolve("/post/1/edit").is_none());
    }

    #[test]
    fn only_account_pages_are_guarded() {
        let guarded: Vec<&str> = ROUTES.iter().filter(|r| r.guarded).map(|r| r.pattern).collect();
        assert_eq!(guarded, vec!["/perfil", "/crear-post", "/crear-evento"]);
    }
}
