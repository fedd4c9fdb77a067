//! The per-navigation access decision.
//!
//! Evaluation is synchronous and holds no state between navigations: the
//! caller hands over the [`Session`] read for this request and gets back a
//! [`Decision`]. Rules are tried in a fixed order and the first one that fires
//! wins:
//!
//! 1. signed in, public path: go home (auth pages are for signed-out clients)
//! 2. signed out, any other path: go to sign-in
//! 3. signed in, restricted path, role not admitted: go home
//! 4. otherwise: allow

use crate::route::{RouteClass, RoutePolicy};
use crate::session::Session;
use log::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Redirect(String),
}

impl Decision {
    pub fn is_allow(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn location(&self) -> Option<&str> {
        match self {
            Decision::Allow => None,
            Decision::Redirect(location) => Some(location),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AccessGate {
    policy: RoutePolicy,
}

impl AccessGate {
    pub fn new(policy: RoutePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RoutePolicy {
        &self.policy
    }

    pub fn evaluate(&self, session: &Session, path: &str) -> Decision {
        let class = self.policy.classify(path);
        let decision = self.decide(session, &class);
        trace!("{path} ({class:?}) -> {decision:?}");
        decision
    }

    /// Applies the rules to an already classified path.
    pub fn decide(&self, session: &Session, class: &RouteClass) -> Decision {
        let role = session.role();

        if session.is_authenticated() && *class == RouteClass::Public {
            return Decision::Redirect(self.policy.home_for(role).to_string());
        }

        if !session.is_authenticated() && *class != RouteClass::Public {
            return Decision::Redirect(self.policy.sign_in_path().to_string());
        }

        if let (Some(role), RouteClass::RoleRestricted(allowed)) = (role, class) {
            if !allowed.contains(&role) {
                debug!("Role {role} not admitted here, sending it home");
                return Decision::Redirect(self.policy.home_for(Some(role)).to_string());
            }
        }

        Decision::Allow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Role;
    use proptest::prelude::*;

    const PUBLIC: [&str; 4] = ["/signin", "/signup", "/forgot-password", "/system/signin"];

    fn gate() -> AccessGate {
        AccessGate::default()
    }

    fn user() -> Session {
        Session::signed_in("t1", Role::User)
    }

    #[test]
    fn signed_in_user_on_signin_goes_to_search() {
        assert_eq!(
            gate().evaluate(&user(), "/signin"),
            Decision::Redirect("/protein-search".to_string())
        );
    }

    #[test]
    fn anonymous_client_on_admin_goes_to_signin() {
        assert_eq!(
            gate().evaluate(&Session::anonymous(), "/admin/dashboard"),
            Decision::Redirect("/signin".to_string())
        );
    }

    #[test]
    fn user_on_admin_goes_home_not_to_an_error_page() {
        assert_eq!(
            gate().evaluate(&user(), "/admin/dashboard"),
            Decision::Redirect("/protein-search".to_string())
        );
    }

    #[test]
    fn admins_enter_the_admin_section() {
        for role in [Role::SuperAdmin, Role::Admin] {
            let session = Session::signed_in("t1", role);
            assert_eq!(gate().evaluate(&session, "/admin/dashboard"), Decision::Allow);
        }
    }

    #[test]
    fn anonymous_client_may_visit_auth_pages() {
        for path in PUBLIC {
            assert_eq!(gate().evaluate(&Session::anonymous(), path), Decision::Allow);
        }
    }

    #[test]
    fn token_with_malformed_role_is_treated_as_signed_out() {
        let session = Session::from_raw(Some("t1"), Some("MANAGER"));
        assert_eq!(
            gate().evaluate(&session, "/protein-search"),
            Decision::Redirect("/signin".to_string())
        );
        assert_eq!(gate().evaluate(&session, "/signin"), Decision::Allow);
    }

    #[test]
    fn public_rule_fires_before_the_role_check() {
        // A public path that also sits under a restricted prefix.
        let policy = RoutePolicy::default().public("/admin/signin");
        let gate = AccessGate::new(policy);
        let admin = Session::signed_in("t1", Role::Admin);

        assert_eq!(
            gate.evaluate(&admin, "/admin/signin"),
            Decision::Redirect("/admin/dashboard".to_string())
        );
        assert_eq!(
            gate.evaluate(&user(), "/admin/signin"),
            Decision::Redirect("/protein-search".to_string())
        );
    }

    #[test]
    fn decision_accessors() {
        assert!(Decision::Allow.is_allow());
        assert_eq!(Decision::Allow.location(), None);
        assert_eq!(
            Decision::Redirect("/signin".to_string()).location(),
            Some("/signin")
        );
    }

    fn any_role() -> impl Strategy<Value = Role> {
        prop_oneof![
            Just(Role::SuperAdmin),
            Just(Role::Admin),
            Just(Role::User)
        ]
    }

    fn any_path() -> impl Strategy<Value = String> {
        prop_oneof![
            prop::sample::select(PUBLIC.to_vec()).prop_map(str::to_string),
            "(/[a-z-]{1,10}){1,3}",
            "/admin(/[a-z]{1,8}){0,2}",
        ]
    }

    fn any_session() -> impl Strategy<Value = Session> {
        prop_oneof![
            Just(Session::anonymous()),
            ("[a-z0-9]{1,12}", any_role()).prop_map(|(token, role)| Session::signed_in(token, role)),
            ("[a-z0-9]{1,12}", "[A-Z_]{0,12}")
                .prop_map(|(token, tag)| Session::from_raw(Some(token.as_str()), Some(tag.as_str()))),
        ]
    }

    proptest! {
        #[test]
        fn public_paths_never_allow_a_signed_in_session(
            path in prop::sample::select(PUBLIC.to_vec()),
            token in "[a-z0-9]{1,12}",
            role in any_role(),
        ) {
            let gate = gate();
            let decision = gate.evaluate(&Session::signed_in(token, role), path);
            prop_assert_eq!(decision, Decision::Redirect(gate.policy().home_for(Some(role)).to_string()));
        }

        #[test]
        fn private_paths_send_anonymous_clients_to_signin(path in any_path()) {
            let gate = gate();
            prop_assume!(!gate.policy().is_public(&path));
            prop_assert_eq!(
                gate.evaluate(&Session::anonymous(), &path),
                Decision::Redirect("/signin".to_string())
            );
        }

        #[test]
        fn restricted_paths_admit_exactly_their_roles(
            suffix in "(/[a-z]{1,8}){0,2}",
            role in any_role(),
        ) {
            let gate = gate();
            let path = format!("/admin{suffix}");
            let decision = gate.evaluate(&Session::signed_in("t1", role), &path);
            if role.is_admin() {
                prop_assert_eq!(decision, Decision::Allow);
            } else {
                prop_assert_eq!(decision, Decision::Redirect(gate.policy().home_for(Some(role)).to_string()));
            }
        }

        #[test]
        fn every_pair_yields_allow_or_a_known_redirect(
            session in any_session(),
            path in any_path(),
        ) {
            let gate = gate();
            let policy = gate.policy();
            match gate.evaluate(&session, &path) {
                Decision::Allow => {}
                Decision::Redirect(location) => {
                    let known = [
                        policy.sign_in_path(),
                        policy.home_for(Some(Role::Admin)),
                        policy.home_for(Some(Role::User)),
                    ];
                    prop_assert!(known.contains(&location.as_str()));
                }
            }
        }

        #[test]
        fn following_a_redirect_lands_on_an_allowed_page(
            session in any_session(),
            path in any_path(),
        ) {
            let gate = gate();
            if let Decision::Redirect(location) = gate.evaluate(&session, &path) {
                prop_assert_eq!(gate.evaluate(&session, &location), Decision::Allow);
            }
        }
    }
}
