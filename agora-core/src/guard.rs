//! Route guards deciding which views a session may open.

use crate::events::Navigation;

/// Landing view for signed-in users.
pub const HOME_PATH: &str = "/boards";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    /// Replace the current view; never a full reload.
    Redirect(Navigation),
}

#[derive(Debug, Clone)]
pub struct RouteGuard {
    login_path: String,
    home_path: String,
}

impl RouteGuard {
    pub fn new(login_path: impl Into<String>) -> Self {
        Self {
            login_path: login_path.into(),
            home_path: HOME_PATH.to_string(),
        }
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn home_path(&self) -> &str {
        &self.home_path
    }

    pub fn decide(&self, path: &str, authenticated: bool) -> GuardDecision {
        let path = path.split(['?', '#']).next().unwrap_or_default();

        if path.is_empty() || path == "/" {
            return self.redirect(if authenticated {
                &self.home_path
            } else {
                &self.login_path
            });
        }

        if is_under(path, &self.home_path) && !authenticated {
            return self.redirect(&self.login_path);
        }

        if is_under(path, &self.login_path) && authenticated {
            return self.redirect(&self.home_path);
        }

        GuardDecision::Allow
    }

    fn redirect(&self, target: &str) -> GuardDecision {
        tracing::debug!("Guard redirecting to {}", target);
        GuardDecision::Redirect(Navigation::InApp(target.to_string()))
    }
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self::new("/login")
    }
}

/// `path` equals `prefix` or lies below it.
fn is_under(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn redirect(path: &str) -> GuardDecision {
        GuardDecision::Redirect(Navigation::InApp(path.to_string()))
    }

    #[test]
    fn test_root_redirects_by_session() {
        let guard = RouteGuard::default();
        assert_eq!(guard.decide("/", true), redirect("/boards"));
        assert_eq!(guard.decide("/", false), redirect("/login"));
    }

    #[test]
    fn test_boards_require_session() {
        let guard = RouteGuard::default();
        assert_eq!(guard.decide("/boards/42", false), redirect("/login"));
        assert_eq!(guard.decide("/boards?page=1", false), redirect("/login"));
        assert_eq!(guard.decide("/boards/42", true), GuardDecision::Allow);
    }

    #[test]
    fn test_login_requires_anonymous() {
        let guard = RouteGuard::default();
        assert_eq!(guard.decide("/login/signUp", true), redirect("/boards"));
        assert_eq!(guard.decide("/login", false), GuardDecision::Allow);
    }

    #[test]
    fn test_prefix_match_respects_segments() {
        let guard = RouteGuard::default();
        assert_eq!(guard.decide("/boardsfoo", false), GuardDecision::Allow);
        assert_eq!(guard.decide("/about", false), GuardDecision::Allow);
    }

    #[test]
    fn test_redirects_are_in_app() {
        let GuardDecision::Redirect(nav) = RouteGuard::new("/signin").decide("/", false) else {
            panic!("expected redirect");
        };
        assert!(!nav.is_hard());
        assert_eq!(nav.path(), "/signin");
    }
}
