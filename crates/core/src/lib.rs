//! # MediBook Core
//!
//! Core business logic for the MediBook appointment booking service.
//!
//! This crate contains the domain services and their file-backed storage:
//! - Identity registration, authentication and approval ([`identity`])
//! - Doctor profiles, public visibility and reviews ([`doctors`])
//! - Appointment booking, slot conflicts and the status lifecycle ([`ledger`])
//! - Administrative oversight ([`admin`])
//! - Per-request authorization ([`guard`])
//! - Best-effort outbound notifications ([`notifications`])
//! - Demonstration data import ([`seed`])
//!
//! **No API concerns**: tokens, HTTP servers and wire formats belong in `api-shared` and
//! `api-rest`.

pub mod admin;
pub mod clock;
pub mod config;
pub mod constants;
pub mod doctors;
pub mod error;
pub mod guard;
pub mod identity;
pub mod ledger;
pub mod notifications;
pub mod seed;
pub mod store;

pub use admin::{AdminOversight, DoctorRemoval};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{CoreConfig, ProfileDefaults};
pub use doctors::{
    ConsultationHours, DoctorDirectory, DoctorEntry, DoctorProfile, ProfileUpdate,
    RawProfileUpdate, Review, VisibilityReport,
};
pub use error::{BookingError, BookingResult};
pub use guard::Caller;
pub use identity::{
    CredentialHasher, Identity, IdentityDirectory, Registration, Role, Sha256CredentialHasher,
};
pub use ledger::{Appointment, AppointmentLedger, AppointmentStatus, BookingRequest};
pub use notifications::{LogNotifier, Notification, NotificationGateway, Notifier};
pub use seed::{SeedData, SeedSummary, Seeder};

pub use medibook_files::{FileMetadata, FilesError, FilesService};
pub use medibook_types::{EmailAddress, NonEmptyText};
pub use medibook_uuid::{BookingId, RecordId};

use std::sync::Arc;

/// Every core service, wired to one data directory.
///
/// Cloning is cheap; all clones share locks and configuration.
#[derive(Clone, Debug)]
pub struct Services {
    pub config: Arc<CoreConfig>,
    pub identities: IdentityDirectory,
    pub doctors: DoctorDirectory,
    pub ledger: AppointmentLedger,
    pub admin: AdminOversight,
    pub seeder: Seeder,
    pub files: FilesService,
}

impl Services {
    /// Builds the service graph.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Files`] if the uploads directory cannot be created.
    pub fn new(
        config: Arc<CoreConfig>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        hasher: Arc<dyn CredentialHasher>,
    ) -> BookingResult<Self> {
        let notifications = NotificationGateway::new(notifier);
        let identities =
            IdentityDirectory::new(config.identities_dir(), hasher, clock.clone());
        let doctors = DoctorDirectory::new(config.doctors_dir(), identities.clone(), clock.clone());
        let ledger = AppointmentLedger::new(
            config.appointments_dir(),
            identities.clone(),
            doctors.clone(),
            notifications.clone(),
            clock.clone(),
        );
        let admin = AdminOversight::new(
            identities.clone(),
            doctors.clone(),
            ledger.clone(),
            notifications,
            config.profile_defaults().clone(),
        );
        let seeder = Seeder::new(identities.clone(), doctors.clone(), ledger.clone(), clock);
        let files = FilesService::new(&config.uploads_dir())?;

        Ok(Self {
            config,
            identities,
            doctors,
            ledger,
            admin,
            seeder,
            files,
        })
    }

    /// Registers an account. Doctors also get a placeholder profile.
    ///
    /// # Errors
    ///
    /// See [`IdentityDirectory::register`].
    pub fn register_account(&self, registration: Registration) -> BookingResult<Identity> {
        let identity = self.identities.register(registration)?;
        if identity.role == Role::Doctor {
            self.doctors.create_placeholder(&identity)?;
        }
        Ok(identity)
    }
}
