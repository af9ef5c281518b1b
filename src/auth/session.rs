use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;

use crate::store::SessionSubject;

type HmacSha256 = Hmac<Sha256>;

const COOKIE_NAME: &str = "sid";
const TOKEN_BYTES: usize = 32;

/// Proof of a prior successful login, resolved from a request cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user_id: i64,
}

/// A freshly established session plus the header value that hands it to the
/// browser.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub set_cookie: String,
}

/// Server-side session registry.
///
/// Tokens are opaque random values; the cookie carries `token.tag` where the
/// tag is an HMAC over the token with the configured secret. A cookie that
/// fails the tag check never reaches the registry lookup.
pub struct SessionManager {
    key: Vec<u8>,
    active: Arc<Mutex<HashMap<String, i64>>>,
}

impl SessionManager {
    pub fn new(secret: &str) -> Self {
        Self {
            key: secret.as_bytes().to_vec(),
            active: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Establish a session for the subject and return the cookie to set.
    pub fn issue(&self, subject: &dyn SessionSubject) -> IssuedSession {
        let mut raw = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut raw);
        let token = URL_SAFE_NO_PAD.encode(raw);
        let tag = self.sign(&token);

        self.active
            .lock()
            .expect("session mutex poisoned")
            .insert(token.clone(), subject.subject_id());

        let set_cookie = format!("{COOKIE_NAME}={token}.{tag}; Path=/; HttpOnly; SameSite=Lax");
        IssuedSession { token, set_cookie }
    }

    /// Resolve the session named by a request's `Cookie` header, if the
    /// cookie is present, untampered, and still active.
    pub fn authenticate(&self, cookie_header: Option<&str>) -> Option<Session> {
        let value = cookie_header?
            .split(';')
            .map(str::trim)
            .find_map(|pair| {
                pair.strip_prefix(COOKIE_NAME)
                    .and_then(|rest| rest.strip_prefix('='))
            })?;
        let (token, tag) = value.split_once('.')?;

        let tag_bytes = URL_SAFE_NO_PAD.decode(tag).ok()?;
        let mut mac = HmacSha256::new_from_slice(&self.key).expect("hmac accepts any key length");
        mac.update(token.as_bytes());
        mac.verify_slice(&tag_bytes).ok()?;

        let guard = self.active.lock().expect("session mutex poisoned");
        guard.get(token).map(|user_id| Session {
            token: token.to_string(),
            user_id: *user_id,
        })
    }

    pub fn revoke(&self, token: &str) {
        self.active
            .lock()
            .expect("session mutex poisoned")
            .remove(token);
    }

    /// Cookie value that expires the session cookie on the client.
    pub fn clear_cookie() -> &'static str {
        "sid=; Path=/; HttpOnly; Max-Age=0"
    }

    fn sign(&self, token: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.key).expect("hmac accepts any key length");
        mac.update(token.as_bytes());
        URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Subject(i64);

    impl SessionSubject for Subject {
        fn subject_id(&self) -> i64 {
            self.0
        }
    }

    fn cookie_header(issued: &IssuedSession) -> String {
        issued
            .set_cookie
            .split(';')
            .next()
            .expect("cookie has a value segment")
            .to_string()
    }

    #[test]
    fn issued_cookie_authenticates() {
        let manager = SessionManager::new("test-secret");
        let issued = manager.issue(&Subject(7));

        let session = manager
            .authenticate(Some(&cookie_header(&issued)))
            .expect("cookie authenticates");
        assert_eq!(session.user_id, 7);
        assert_eq!(session.token, issued.token);
    }

    #[test]
    fn tampered_cookie_is_rejected() {
        let manager = SessionManager::new("test-secret");
        let issued = manager.issue(&Subject(7));

        let mut forged = cookie_header(&issued);
        // Flip a character in the token part; the tag no longer matches.
        let flipped = if forged.contains("sid=A") { 'B' } else { 'A' };
        let at = "sid=".len();
        forged.replace_range(at..at + 1, &flipped.to_string());

        assert!(manager.authenticate(Some(&forged)).is_none());
    }

    #[test]
    fn cookie_signed_with_other_secret_is_rejected() {
        let manager = SessionManager::new("test-secret");
        let other = SessionManager::new("other-secret");
        let issued = other.issue(&Subject(7));

        assert!(manager.authenticate(Some(&cookie_header(&issued))).is_none());
    }

    #[test]
    fn revoked_session_no_longer_authenticates() {
        let manager = SessionManager::new("test-secret");
        let issued = manager.issue(&Subject(7));
        let header = cookie_header(&issued);

        assert!(manager.authenticate(Some(&header)).is_some());
        manager.revoke(&issued.token);
        assert!(manager.authenticate(Some(&header)).is_none());
    }

    #[test]
    fn absent_or_unrelated_cookies_yield_no_session() {
        let manager = SessionManager::new("test-secret");
        assert!(manager.authenticate(None).is_none());
        assert!(manager.authenticate(Some("theme=dark")).is_none());
        assert!(manager.authenticate(Some("sid=missing-tag")).is_none());
    }
}
