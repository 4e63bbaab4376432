use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use std::collections::HashMap;

pub const PENDING_COOKIE: &str = "cur8tr_pending";

/// Wrong codes allowed before a pending registration is discarded.
pub const MAX_CODE_ATTEMPTS: u32 = 5;

/// A registration waiting for its emailed code.
#[derive(Debug, Clone)]
pub struct PendingRegistration {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub failed_attempts: u32,
}

#[derive(Debug)]
pub enum VerifyOutcome {
    /// No pending registration under that id.
    Missing,
    /// The code window passed; the record has been dropped.
    Expired,
    WrongCode,
    /// Too many wrong codes; the record has been dropped.
    TooManyAttempts,
    Verified(PendingRegistration),
}

/// In-memory pending registrations keyed by the id stored in the pending cookie.
pub struct PendingRegistrationStore {
    entries: HashMap<String, PendingRegistration>,
    ttl: Duration,
}

impl PendingRegistrationStore {
    pub fn new(ttl_minutes: i64) -> Self {
        Self {
            entries: HashMap::new(),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    /// Hold a registration until verified. Returns the record id and the code.
    pub fn insert(
        &mut self,
        username: String,
        email: String,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> (String, String) {
        self.clear_stale(now);

        let id = uuid::Uuid::now_v7().to_string();
        let code = generate_code();
        self.entries.insert(
            id.clone(),
            PendingRegistration {
                username,
                email,
                password_hash,
                code: code.clone(),
                expires_at: now + self.ttl,
                failed_attempts: 0,
            },
        );
        (id, code)
    }

    pub fn get(&self, id: &str, now: DateTime<Utc>) -> Option<&PendingRegistration> {
        self.entries.get(id).filter(|p| now < p.expires_at)
    }

    /// Check a code. A correct code consumes the record; an expired one is dropped.
    pub fn verify(&mut self, id: &str, code: &str, now: DateTime<Utc>) -> VerifyOutcome {
        let Some(pending) = self.entries.get_mut(id) else {
            return VerifyOutcome::Missing;
        };

        if now >= pending.expires_at {
            tracing::info!("Pending registration for {} expired", pending.username);
            self.entries.remove(id);
            return VerifyOutcome::Expired;
        }

        if pending.code != code.trim() {
            pending.failed_attempts += 1;
            if pending.failed_attempts < MAX_CODE_ATTEMPTS {
                return VerifyOutcome::WrongCode;
            }
            tracing::warn!(
                "Pending registration for {} dropped after {} wrong codes",
                pending.username,
                pending.failed_attempts
            );
            self.entries.remove(id);
            return VerifyOutcome::TooManyAttempts;
        }

        match self.entries.remove(id) {
            Some(pending) => VerifyOutcome::Verified(pending),
            None => VerifyOutcome::Missing,
        }
    }

    pub fn remove(&mut self, id: &str) {
        self.entries.remove(id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn clear_stale(&mut self, now: DateTime<Utc>) {
        self.entries.retain(|_, p| now < p.expires_at);
    }
}

pub fn pending_cookie(id: &str, ttl_minutes: i64, secure: bool) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/auth; Max-Age={}{}",
        PENDING_COOKIE,
        id,
        ttl_minutes * 60,
        if secure { "; Secure" } else { "" }
    )
}

pub fn clear_pending_cookie() -> String {
    format!("{}=; HttpOnly; SameSite=Lax; Path=/auth; Max-Age=0", PENDING_COOKIE)
}

/// Six-digit verification code.
pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    let code: u32 = rng.gen_range(100000..1000000);
    code.to_string()
}
