//! Route classification: which paths are public, which are reserved for some
//! roles, and where each role lands by default.

use crate::error::Error;
use crate::session::Role;
use log::*;
use service::config::Config;
use std::collections::{BTreeSet, HashSet};

/// Access category of a requested path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteClass {
    /// Auth pages. Only reachable without a session.
    Public,
    /// Any signed-in role may proceed.
    PrivateDefault,
    /// Only the listed roles may proceed.
    RoleRestricted(BTreeSet<Role>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RestrictedPrefix {
    prefix: String,
    allowed: BTreeSet<Role>,
}

/// Strips a trailing slash so `/signin/` and `/signin` are the same route.
fn normalize(path: &str) -> &str {
    let path = path.trim_end_matches('/');
    if path.is_empty() {
        "/"
    } else {
        path
    }
}

/// True when `path` is `prefix` itself or lies below it on a segment boundary.
pub(crate) fn is_under(path: &str, prefix: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// The fixed role-to-route table.
///
/// Public paths are matched exactly. Restricted prefixes are matched on segment
/// boundaries with the longest prefix winning. Everything else is
/// `PrivateDefault`.
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    public_paths: HashSet<String>,
    restricted: Vec<RestrictedPrefix>,
    sign_in_path: String,
    admin_home: String,
    user_home: String,
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self::new("/signin", "/admin/dashboard", "/protein-search")
            .public("/signin")
            .public("/signup")
            .public("/forgot-password")
            .public("/system/signin")
            .restrict("/admin", [Role::SuperAdmin, Role::Admin])
    }
}

impl RoutePolicy {
    /// An empty table: no public paths, no restricted prefixes.
    pub fn new(
        sign_in_path: impl Into<String>,
        admin_home: impl Into<String>,
        user_home: impl Into<String>,
    ) -> Self {
        Self {
            public_paths: HashSet::new(),
            restricted: Vec::new(),
            sign_in_path: normalize(&sign_in_path.into()).to_string(),
            admin_home: normalize(&admin_home.into()).to_string(),
            user_home: normalize(&user_home.into()).to_string(),
        }
    }

    pub fn public(mut self, path: &str) -> Self {
        self.public_paths.insert(normalize(path).to_string());
        self
    }

    /// Adds a role-restricted prefix. A later rule for the same prefix replaces
    /// the earlier one.
    pub fn restrict(mut self, prefix: &str, allowed: impl IntoIterator<Item = Role>) -> Self {
        let prefix = normalize(prefix).to_string();
        self.restricted.retain(|rule| rule.prefix != prefix);
        self.restricted.push(RestrictedPrefix {
            prefix,
            allowed: allowed.into_iter().collect(),
        });
        // Longest prefix first so the most specific rule is found first.
        self.restricted
            .sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
        self
    }

    /// Builds the table from configuration and checks that it is usable.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let mut policy = Self::new(
            config.sign_in_path.as_str(),
            config.admin_home_path.as_str(),
            config.user_home_path.as_str(),
        );
        for path in config.public_paths.iter().filter(|p| !p.is_empty()) {
            policy = policy.public(path);
        }
        for rule in config.restricted_prefixes.iter().filter(|r| !r.is_empty()) {
            let (prefix, roles) = parse_restriction(rule)?;
            policy = policy.restrict(&prefix, roles);
        }
        policy.validate()?;
        info!(
            "Route policy: {} public path(s), {} restricted prefix(es)",
            policy.public_paths.len(),
            policy.restricted.len()
        );
        Ok(policy)
    }

    /// Rejects tables that would bounce a client between two redirects:
    /// the sign-in page must be public and every role's home must admit it.
    pub fn validate(&self) -> Result<(), Error> {
        if self.classify(&self.sign_in_path) != RouteClass::Public {
            return Err(Error::config(format!(
                "sign-in path {} is not public",
                self.sign_in_path
            )));
        }
        for role in Role::ALL {
            let home = self.home_for(Some(role));
            match self.classify(home) {
                RouteClass::Public => {
                    return Err(Error::config(format!("home {home} of {role} is public")))
                }
                RouteClass::RoleRestricted(allowed) if !allowed.contains(&role) => {
                    return Err(Error::config(format!(
                        "home {home} of {role} is restricted to other roles"
                    )))
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn classify(&self, path: &str) -> RouteClass {
        let path = normalize(path);
        if self.public_paths.contains(path) {
            return RouteClass::Public;
        }
        self.restricted
            .iter()
            .find(|rule| is_under(path, &rule.prefix))
            .map(|rule| RouteClass::RoleRestricted(rule.allowed.clone()))
            .unwrap_or(RouteClass::PrivateDefault)
    }

    /// Canonical landing route for a role; the sign-in page when there is none.
    pub fn home_for(&self, role: Option<Role>) -> &str {
        match role {
            Some(Role::SuperAdmin) | Some(Role::Admin) => &self.admin_home,
            Some(Role::User) => &self.user_home,
            None => &self.sign_in_path,
        }
    }

    pub fn sign_in_path(&self) -> &str {
        &self.sign_in_path
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.public_paths.contains(normalize(path))
    }
}

/// Parses one `PREFIX=ROLE|ROLE` entry.
fn parse_restriction(rule: &str) -> Result<(String, Vec<Role>), Error> {
    let (prefix, roles) = rule
        .split_once('=')
        .ok_or_else(|| Error::config(format!("restricted prefix {rule:?} lacks '='")))?;
    let prefix = prefix.trim();
    if !prefix.starts_with('/') {
        return Err(Error::config(format!(
            "restricted prefix {prefix:?} must start with '/'"
        )));
    }
    let roles = roles
        .split('|')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(|tag| {
            tag.parse::<Role>()
                .map_err(|_| Error::config(format!("unknown role {tag:?} in {rule:?}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if roles.is_empty() {
        return Err(Error::config(format!("restricted prefix {prefix} allows no role")));
    }
    Ok((prefix.to_string(), roles))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Pattern {
    Exact(String),
    Prefix(String),
}

/// The deployer-controlled set of navigations the gate runs for.
///
/// `/section/:path*` and `/section/*` match `/section` and everything below it;
/// any other pattern matches exactly. Paths outside the set bypass the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationMatcher {
    patterns: Vec<Pattern>,
}

impl NavigationMatcher {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        let patterns = patterns
            .iter()
            .map(|p| p.as_ref().trim())
            .filter(|p| !p.is_empty())
            .map(|p| {
                match p
                    .strip_suffix("/:path*")
                    .or_else(|| p.strip_suffix("/*"))
                {
                    Some(prefix) => Pattern::Prefix(normalize(prefix).to_string()),
                    None => Pattern::Exact(normalize(p).to_string()),
                }
            })
            .collect();
        Self { patterns }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.gated_paths)
    }

    pub fn matches(&self, path: &str) -> bool {
        let path = normalize(path);
        self.patterns.iter().any(|pattern| match pattern {
            Pattern::Exact(exact) => exact == path,
            Pattern::Prefix(prefix) => is_under(path, prefix),
        })
    }
}
