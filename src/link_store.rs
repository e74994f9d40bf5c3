// =============================================================================
// LinkStore — bidirectional email <-> PAR association
// =============================================================================
//
// Backs the EMAIL_MULTIPLE_PAR / PAR_MULTIPLE_EMAIL signals: every evaluated
// event links its email and PAR (when both are present), and the risk engine
// asks this store how many distinct PARs a given email has used and vice
// versa. The two maps are kept in lockstep under a single lock so a reader
// never observes one side updated without the other.
// =============================================================================

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;

#[derive(Default)]
struct Inner {
    email_to_pars: HashMap<String, HashSet<String>>,
    par_to_emails: HashMap<String, HashSet<String>>,
}

pub struct LinkStore {
    inner: RwLock<Inner>,
}

impl LinkStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Record an observed (email, par) pairing. A no-op if either side is
    /// blank — partial identity events never pollute the link graph.
    pub fn link(&self, email: &str, par: &str) {
        if email.trim().is_empty() || par.trim().is_empty() {
            return;
        }
        let mut inner = self.inner.write();
        inner
            .email_to_pars
            .entry(email.to_string())
            .or_default()
            .insert(par.to_string());
        inner
            .par_to_emails
            .entry(par.to_string())
            .or_default()
            .insert(email.to_string());
    }

    /// Distinct PARs ever seen paired with `email`.
    pub fn pars_for_email(&self, email: &str) -> HashSet<String> {
        self.inner
            .read()
            .email_to_pars
            .get(email)
            .cloned()
            .unwrap_or_default()
    }

    /// Distinct emails ever seen paired with `par`.
    pub fn emails_for_par(&self, par: &str) -> HashSet<String> {
        self.inner
            .read()
            .par_to_emails
            .get(par)
            .cloned()
            .unwrap_or_default()
    }
}

impl Default for LinkStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_is_symmetric() {
        let store = LinkStore::new();
        store.link("a@example.com", "par-1");
        assert!(store.pars_for_email("a@example.com").contains("par-1"));
        assert!(store.emails_for_par("par-1").contains("a@example.com"));
    }

    #[test]
    fn one_email_many_pars() {
        let store = LinkStore::new();
        store.link("a@example.com", "par-1");
        store.link("a@example.com", "par-2");
        store.link("a@example.com", "par-3");
        assert_eq!(store.pars_for_email("a@example.com").len(), 3);
    }

    #[test]
    fn one_par_many_emails() {
        let store = LinkStore::new();
        store.link("a@example.com", "par-1");
        store.link("b@example.com", "par-1");
        assert_eq!(store.emails_for_par("par-1").len(), 2);
    }

    #[test]
    fn blank_email_or_par_is_ignored() {
        let store = LinkStore::new();
        store.link("", "par-1");
        store.link("a@example.com", "");
        store.link("  ", "par-2");
        assert!(store.pars_for_email("a@example.com").is_empty());
        assert!(store.emails_for_par("par-1").is_empty());
        assert!(store.emails_for_par("par-2").is_empty());
    }

    #[test]
    fn duplicate_links_do_not_duplicate_entries() {
        let store = LinkStore::new();
        store.link("a@example.com", "par-1");
        store.link("a@example.com", "par-1");
        assert_eq!(store.pars_for_email("a@example.com").len(), 1);
    }

    #[test]
    fn unknown_email_or_par_returns_empty() {
        let store = LinkStore::new();
        assert!(store.pars_for_email("nobody@example.com").is_empty());
        assert!(store.emails_for_par("nonexistent").is_empty());
    }

    use proptest::prelude::*;

    proptest! {
        /// For any sequence of (email, par) pairs, every link observed is
        /// visible from both directions: `par ∈ parsForEmail(e) ⇔ e ∈
        /// emailsForPar(par)`.
        #[test]
        fn link_is_always_symmetric(
            pairs in proptest::collection::vec((0u32..8, 0u32..8), 1..30)
        ) {
            let store = LinkStore::new();
            for (e, p) in &pairs {
                store.link(&format!("user-{e}@example.com"), &format!("par-{p}"));
            }
            for (e, p) in &pairs {
                let email = format!("user-{e}@example.com");
                let par = format!("par-{p}");
                prop_assert!(store.pars_for_email(&email).contains(&par));
                prop_assert!(store.emails_for_par(&par).contains(&email));
            }
        }
    }
}
