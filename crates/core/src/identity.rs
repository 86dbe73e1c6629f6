//! Identity directory: accounts, roles, approval and credentials.
//!
//! Identities are stored one per sharded directory:
//! `<data_dir>/identities/<s1>/<s2>/<id>/identity.yaml`.
//!
//! Email addresses are unique across the directory (compared after lowercasing). Patients are
//! approved at registration; doctors wait for an admin. Admin accounts cannot self-register and
//! are created by seeding only.

use crate::clock::Clock;
use crate::constants::{IDENTITY_FILENAME, MIN_PASSWORD_LEN};
use crate::store::DocumentStore;
use crate::{BookingError, BookingResult};
use chrono::{DateTime, Utc};
use medibook_types::{EmailAddress, NonEmptyText};
use medibook_uuid::RecordId;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = BookingError;

    /// Parses a role name case-insensitively. `user` is accepted as an alias of `patient`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "patient" | "user" => Ok(Role::Patient),
            "doctor" => Ok(Role::Doctor),
            "admin" => Ok(Role::Admin),
            other => Err(BookingError::InvalidInput(format!("unknown role: {other}"))),
        }
    }
}

/// A stored account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: RecordId,
    pub name: NonEmptyText,
    pub email: EmailAddress,
    /// Salted password hash in the format produced by the configured [`CredentialHasher`].
    pub credential: String,
    pub role: Role,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_approved_doctor(&self) -> bool {
        self.role == Role::Doctor && self.approved
    }
}

/// Unvalidated self-registration request.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Requested role; `None` means patient.
    pub role: Option<String>,
}

/// Validated fields for a new identity.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub name: NonEmptyText,
    pub email: EmailAddress,
    pub password: String,
    pub role: Role,
    pub approved: bool,
}

/// Hashes and verifies password credentials.
pub trait CredentialHasher: Send + Sync + fmt::Debug {
    fn hash(&self, password: &str) -> String;
    fn verify(&self, password: &str, credential: &str) -> bool;
}

/// Development hasher: `hmac-sha256$<salt hex>$<mac hex>`, an HMAC-SHA256 of the password keyed
/// by a random 16-byte salt.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256CredentialHasher;

impl Sha256CredentialHasher {
    const SCHEME: &'static str = "hmac-sha256";

    fn mac(salt: &[u8], password: &str) -> Option<Hmac<Sha256>> {
        let mut mac = Hmac::<Sha256>::new_from_slice(salt).ok()?;
        mac.update(password.as_bytes());
        Some(mac)
    }
}

impl CredentialHasher for Sha256CredentialHasher {
    fn hash(&self, password: &str) -> String {
        let mut salt = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt);
        // HMAC takes keys of any length, so the empty fallback is unreachable and never verifies.
        let tag = Self::mac(&salt, password)
            .map(|mac| hex::encode(mac.finalize().into_bytes()))
            .unwrap_or_default();
        format!("{}${}${}", Self::SCHEME, hex::encode(salt), tag)
    }

    fn verify(&self, password: &str, credential: &str) -> bool {
        let mut parts = credential.splitn(3, '$');
        let (Some(scheme), Some(salt_hex), Some(tag_hex)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return false;
        };
        if scheme != Self::SCHEME {
            return false;
        }
        let (Ok(salt), Ok(expected)) = (hex::decode(salt_hex), hex::decode(tag_hex)) else {
            return false;
        };

        Self::mac(&salt, password).is_some_and(|mac| mac.verify_slice(&expected).is_ok())
    }
}

/// Service over the identity collection.
#[derive(Clone, Debug)]
pub struct IdentityDirectory {
    store: DocumentStore<Identity>,
    hasher: Arc<dyn CredentialHasher>,
    clock: Arc<dyn Clock>,
    write_lock: Arc<Mutex<()>>,
}

impl IdentityDirectory {
    pub fn new(dir: PathBuf, hasher: Arc<dyn CredentialHasher>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: DocumentStore::new(dir, IDENTITY_FILENAME),
            hasher,
            clock,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Validates a self-registration and stores the new identity.
    ///
    /// # Errors
    ///
    /// - [`BookingError::InvalidInput`] for a blank name, malformed email, short password, an
    ///   unknown role or a request to register as admin
    /// - [`BookingError::Conflict`] if the email is already registered
    pub fn register(&self, registration: Registration) -> BookingResult<Identity> {
        let name = NonEmptyText::new(&registration.name)
            .map_err(|_| BookingError::InvalidInput("Name is required".into()))?;
        let email = EmailAddress::parse(&registration.email)
            .map_err(|_| BookingError::InvalidInput("Please include a valid email".into()))?;
        if registration.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(BookingError::InvalidInput(format!(
                "Please enter a password with {} or more characters",
                MIN_PASSWORD_LEN
            )));
        }

        let role = match registration.role.as_deref().map(str::trim) {
            None | Some("") => Role::Patient,
            Some(r) => r.parse()?,
        };
        if role == Role::Admin {
            return Err(BookingError::InvalidInput(
                "admin accounts cannot be self-registered".into(),
            ));
        }

        self.create(NewIdentity {
            name,
            email,
            password: registration.password,
            role,
            approved: role != Role::Doctor,
        })
    }

    /// Stores a new identity with an explicit role and approval flag.
    ///
    /// Used by [`IdentityDirectory::register`] and by seeding.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Conflict`] if the email is already registered, or
    /// [`BookingError::DataIntegrity`] if a stored identity cannot be read back.
    pub fn create(&self, new: NewIdentity) -> BookingResult<Identity> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| BookingError::LockPoisoned("identity directory"))?;

        if self
            .store
            .try_list()?
            .iter()
            .any(|existing| existing.email == new.email)
        {
            return Err(BookingError::Conflict("User already exists".into()));
        }

        let id = self.store.allocate_id()?;
        let identity = Identity {
            id: id.clone(),
            name: new.name,
            email: new.email,
            credential: self.hasher.hash(&new.password),
            role: new.role,
            approved: new.approved,
            created_at: self.clock.now(),
        };
        self.store.save(&id, &identity)?;

        tracing::info!(
            "registered {} identity {} (approved: {})",
            identity.role,
            identity.id,
            identity.approved
        );
        Ok(identity)
    }

    /// Checks an email/password pair.
    ///
    /// # Errors
    ///
    /// - [`BookingError::Unauthenticated`] for an unknown email or wrong password
    /// - [`BookingError::Unauthorized`] if the account is awaiting approval
    pub fn authenticate(&self, email: &str, password: &str) -> BookingResult<Identity> {
        let invalid = || BookingError::Unauthenticated("Invalid credentials".into());

        let identity = self.find_by_email(email)?.ok_or_else(invalid)?;
        if !self.hasher.verify(password, &identity.credential) {
            return Err(invalid());
        }
        if !identity.approved {
            return Err(BookingError::Unauthorized(
                "Your account is pending approval by an administrator".into(),
            ));
        }
        Ok(identity)
    }

    pub fn get(&self, id: &RecordId) -> BookingResult<Option<Identity>> {
        self.store.load(id)
    }

    /// Like [`IdentityDirectory::get`] but absent identities are [`BookingError::NotFound`].
    pub fn require(&self, id: &RecordId) -> BookingResult<Identity> {
        self.get(id)?
            .ok_or_else(|| BookingError::NotFound(format!("user {id} not found")))
    }

    /// Looks up an identity by email, case-insensitively. Malformed input finds nothing.
    pub fn find_by_email(&self, email: &str) -> BookingResult<Option<Identity>> {
        let Ok(email) = EmailAddress::parse(email) else {
            return Ok(None);
        };
        Ok(self.store.list().into_iter().find(|i| i.email == email))
    }

    /// Every identity, oldest first.
    pub fn list_all(&self) -> Vec<Identity> {
        let mut all = self.store.list();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        all
    }

    pub fn list_by_role(&self, role: Role) -> Vec<Identity> {
        self.list_all()
            .into_iter()
            .filter(|i| i.role == role)
            .collect()
    }

    pub fn list_unapproved_doctors(&self) -> Vec<Identity> {
        self.list_by_role(Role::Doctor)
            .into_iter()
            .filter(|i| !i.approved)
            .collect()
    }

    /// Sets the approval flag and returns the updated identity.
    pub fn set_approved(&self, id: &RecordId, approved: bool) -> BookingResult<Identity> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| BookingError::LockPoisoned("identity directory"))?;

        let mut identity = self.require(id)?;
        identity.approved = approved;
        self.store.save(id, &identity)?;
        Ok(identity)
    }

    /// Removes an identity. Returns `false` if it did not exist.
    pub fn delete(&self, id: &RecordId) -> BookingResult<bool> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| BookingError::LockPoisoned("identity directory"))?;
        self.store.delete(id)
    }

    /// Removes every identity.
    pub fn clear(&self) -> BookingResult<()> {
        self.store.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use tempfile::TempDir;

    fn directory(temp: &TempDir) -> IdentityDirectory {
        IdentityDirectory::new(
            temp.path().join("identities"),
            Arc::new(Sha256CredentialHasher),
            Arc::new(SystemClock),
        )
    }

    fn registration(email: &str, role: Option<&str>) -> Registration {
        Registration {
            name: "Sam Patel".into(),
            email: email.into(),
            password: "secret123".into(),
            role: role.map(str::to_string),
        }
    }

    #[test]
    fn hasher_verifies_own_hashes_only() {
        let hasher = Sha256CredentialHasher;
        let credential = hasher.hash("hunter22");

        assert!(credential.starts_with("hmac-sha256$"));
        assert!(hasher.verify("hunter22", &credential));
        assert!(!hasher.verify("hunter23", &credential));
        assert!(!hasher.verify("hunter22", "plaintext"));
        assert!(!hasher.verify("hunter22", "hmac-sha256$00$"));
        assert_ne!(credential, hasher.hash("hunter22"), "salts should differ");
    }

    #[test]
    fn patients_are_approved_doctors_are_not() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let dir = directory(&temp);

        let patient = dir
            .register(registration("pat@example.com", None))
            .expect("patient registration");
        let doctor = dir
            .register(registration("doc@example.com", Some("doctor")))
            .expect("doctor registration");

        assert_eq!(patient.role, Role::Patient);
        assert!(patient.approved);
        assert_eq!(doctor.role, Role::Doctor);
        assert!(!doctor.approved);
    }

    #[test]
    fn user_role_is_an_alias_for_patient() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let identity = directory(&temp)
            .register(registration("u@example.com", Some("user")))
            .expect("registration");
        assert_eq!(identity.role, Role::Patient);
    }

    #[test]
    fn register_validates_input() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let dir = directory(&temp);

        let mut blank_name = registration("a@example.com", None);
        blank_name.name = "  ".into();
        let mut short_password = registration("b@example.com", None);
        short_password.password = "12345".into();

        for bad in [
            blank_name,
            registration("not-an-email", None),
            short_password,
            registration("c@example.com", Some("admin")),
            registration("d@example.com", Some("nurse")),
        ] {
            let err = dir.register(bad).expect_err("registration should fail");
            assert!(matches!(err, BookingError::InvalidInput(_)), "got {err:?}");
        }
        assert!(dir.list_all().is_empty());
    }

    #[test]
    fn duplicate_email_conflicts_case_insensitively() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let dir = directory(&temp);
        dir.register(registration("pat@example.com", None))
            .expect("first registration");

        let err = dir
            .register(registration("PAT@Example.com", None))
            .expect_err("duplicate should fail");

        assert!(matches!(err, BookingError::Conflict(_)));
    }

    #[test]
    fn unreadable_identity_blocks_registration() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let dir = directory(&temp);
        let first = dir
            .register(registration("pat@example.com", None))
            .expect("first registration");
        let path = first
            .id
            .sharded_dir(&temp.path().join("identities"))
            .join(IDENTITY_FILENAME);
        std::fs::write(&path, "email: [").expect("corrupt identity");

        let err = dir
            .register(registration("pat@example.com", None))
            .expect_err("registration must not pass an unreadable directory");
        assert!(matches!(err, BookingError::DataIntegrity(_)), "got {err:?}");
    }

    #[test]
    fn authenticate_distinguishes_bad_credentials_from_pending_approval() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let dir = directory(&temp);
        dir.register(registration("pat@example.com", None))
            .expect("patient");
        let doctor = dir
            .register(registration("doc@example.com", Some("doctor")))
            .expect("doctor");

        assert!(dir.authenticate("pat@example.com", "secret123").is_ok());
        assert!(matches!(
            dir.authenticate("pat@example.com", "wrong-pass"),
            Err(BookingError::Unauthenticated(_))
        ));
        assert!(matches!(
            dir.authenticate("nobody@example.com", "secret123"),
            Err(BookingError::Unauthenticated(_))
        ));
        assert!(matches!(
            dir.authenticate("doc@example.com", "secret123"),
            Err(BookingError::Unauthorized(_))
        ));

        dir.set_approved(&doctor.id, true).expect("approve");
        assert!(dir.authenticate("doc@example.com", "secret123").is_ok());
    }

    #[test]
    fn list_unapproved_doctors_filters_role_and_flag() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let dir = directory(&temp);
        dir.register(registration("pat@example.com", None))
            .expect("patient");
        let pending = dir
            .register(registration("d1@example.com", Some("doctor")))
            .expect("doctor 1");
        let approved = dir
            .register(registration("d2@example.com", Some("doctor")))
            .expect("doctor 2");
        dir.set_approved(&approved.id, true).expect("approve");

        let unapproved = dir.list_unapproved_doctors();

        assert_eq!(unapproved.len(), 1);
        assert_eq!(unapproved[0].id, pending.id);
        assert_eq!(dir.list_by_role(Role::Doctor).len(), 2);
    }

    #[test]
    fn delete_removes_identity() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let dir = directory(&temp);
        let identity = dir
            .register(registration("pat@example.com", None))
            .expect("patient");

        assert!(dir.delete(&identity.id).expect("delete"));
        assert!(dir.get(&identity.id).expect("get").is_none());
        assert!(matches!(
            dir.require(&identity.id),
            Err(BookingError::NotFound(_))
        ));
    }
}
