//! Demonstration data import and wipe.
//!
//! Import replaces every appointment, doctor profile, doctor identity and admin identity with the
//! contents of a [`SeedData`] document. Patient identities are left in place. Destroy removes
//! everything.

use crate::clock::Clock;
use crate::doctors::{ConsultationHours, DoctorDirectory, DoctorProfile, Review};
use crate::identity::{IdentityDirectory, NewIdentity, Role};
use crate::ledger::AppointmentLedger;
use crate::{BookingError, BookingResult};
use medibook_types::{EmailAddress, NonEmptyText};
use serde::Deserialize;
use std::sync::Arc;

/// Seed document bundled with the crate.
pub const DEFAULT_SEED_YAML: &str = include_str!("../seed/doctors.yaml");

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedAccount {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SeedReview {
    pub name: String,
    pub rating: u8,
    pub comment: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SeedDoctor {
    pub name: String,
    pub email: String,
    pub password: String,
    pub specialty: String,
    pub qualifications: Vec<String>,
    pub experience: u32,
    #[serde(default)]
    pub consultation_hours: Option<ConsultationHours>,
    #[serde(default)]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub reviews: Vec<SeedReview>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedData {
    pub admin: SeedAccount,
    #[serde(default)]
    pub doctors: Vec<SeedDoctor>,
}

impl SeedData {
    /// Parses a seed document.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::YamlDeserialization`] for malformed YAML.
    pub fn from_yaml(yaml: &str) -> BookingResult<Self> {
        serde_yaml::from_str(yaml).map_err(BookingError::YamlDeserialization)
    }

    /// The bundled demonstration data.
    pub fn bundled() -> BookingResult<Self> {
        Self::from_yaml(DEFAULT_SEED_YAML)
    }
}

/// Counts reported after an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeedSummary {
    pub doctors: usize,
    pub reviews: usize,
}

/// Imports or wipes demonstration data.
#[derive(Clone, Debug)]
pub struct Seeder {
    identities: IdentityDirectory,
    doctors: DoctorDirectory,
    ledger: AppointmentLedger,
    clock: Arc<dyn Clock>,
}

impl Seeder {
    pub fn new(
        identities: IdentityDirectory,
        doctors: DoctorDirectory,
        ledger: AppointmentLedger,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            identities,
            doctors,
            ledger,
            clock,
        }
    }

    /// Replaces doctors, admins and appointments with `data`.
    ///
    /// Seeded accounts are approved. Each doctor's rating is computed from the seeded reviews.
    ///
    /// # Errors
    ///
    /// - [`BookingError::InvalidInput`] for a blank name, malformed email or out of range rating
    /// - [`BookingError::Conflict`] if a seeded email belongs to a remaining patient
    pub fn seed(&self, data: &SeedData) -> BookingResult<SeedSummary> {
        self.ledger.clear()?;
        self.doctors.clear()?;
        for identity in self.identities.list_all() {
            if identity.role != Role::Patient {
                self.identities.delete(&identity.id)?;
            }
        }

        let admin = self.identities.create(NewIdentity {
            name: NonEmptyText::new(&data.admin.name)?,
            email: EmailAddress::parse(&data.admin.email)?,
            password: data.admin.password.clone(),
            role: Role::Admin,
            approved: true,
        })?;
        tracing::info!("admin user created: {}", admin.email);

        let mut summary = SeedSummary::default();
        for doctor in &data.doctors {
            let identity = self.identities.create(NewIdentity {
                name: NonEmptyText::new(&doctor.name)?,
                email: EmailAddress::parse(&doctor.email)?,
                password: doctor.password.clone(),
                role: Role::Doctor,
                approved: true,
            })?;

            let now = self.clock.now();
            let reviews = doctor
                .reviews
                .iter()
                .map(|r| {
                    if !(1..=5).contains(&r.rating) {
                        return Err(BookingError::InvalidInput(format!(
                            "review rating for {} must be between 1 and 5",
                            doctor.name
                        )));
                    }
                    Ok(Review {
                        reviewer_id: None,
                        name: r.name.clone(),
                        rating: r.rating,
                        comment: r.comment.clone(),
                        created_at: now,
                    })
                })
                .collect::<BookingResult<Vec<_>>>()?;

            let mut profile = DoctorProfile {
                id: self.doctors.allocate_id()?,
                identity_id: identity.id.clone(),
                specialty: doctor.specialty.clone(),
                qualifications: doctor.qualifications.clone(),
                experience_years: doctor.experience,
                consultation_hours: doctor.consultation_hours.clone().unwrap_or_default(),
                profile_image: doctor.profile_image.clone(),
                contact_phone: doctor.contact_phone.clone(),
                location: doctor.location.clone(),
                reviews,
                rating: 0.0,
                review_count: 0,
                created_at: now,
                updated_at: now,
            };
            profile.recompute_rating();
            self.doctors.insert(&profile)?;

            summary.doctors += 1;
            summary.reviews += profile.review_count;
            tracing::info!("doctor user created: {}", identity.email);
        }

        tracing::info!(
            "seed complete: {} doctors, {} reviews",
            summary.doctors,
            summary.reviews
        );
        Ok(summary)
    }

    /// Removes every appointment, profile and identity.
    pub fn destroy(&self) -> BookingResult<()> {
        self.ledger.clear()?;
        self.doctors.clear()?;
        self.identities.clear()?;
        tracing::info!("all booking data destroyed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::guard::Caller;
    use crate::ledger::BookingRequest;
    use crate::notifications::{NotificationGateway, RecordingNotifier};
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        identities: IdentityDirectory,
        doctors: DoctorDirectory,
        ledger: AppointmentLedger,
        seeder: Seeder,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0)
                .single()
                .expect("valid instant"),
        ));
        let identities = IdentityDirectory::new(
            temp.path().join("identities"),
            Arc::new(crate::identity::Sha256CredentialHasher),
            clock.clone(),
        );
        let doctors =
            DoctorDirectory::new(temp.path().join("doctors"), identities.clone(), clock.clone());
        let ledger = AppointmentLedger::new(
            temp.path().join("appointments"),
            identities.clone(),
            doctors.clone(),
            NotificationGateway::new(Arc::new(RecordingNotifier::new())),
            clock.clone(),
        );
        let seeder = Seeder::new(identities.clone(), doctors.clone(), ledger.clone(), clock);
        Fixture {
            _temp: temp,
            identities,
            doctors,
            ledger,
            seeder,
        }
    }

    #[test]
    fn bundled_seed_parses() {
        let data = SeedData::bundled().expect("bundled seed should parse");
        assert_eq!(data.admin.email, "admin@example.com");
        assert!(!data.doctors.is_empty());
        assert!(data
            .doctors
            .iter()
            .all(|d| !d.specialty.is_empty() && d.experience > 0));
    }

    #[test]
    fn seed_creates_visible_doctors_with_computed_ratings() {
        let f = fixture();
        let data = SeedData::bundled().expect("seed");

        let summary = f.seeder.seed(&data).expect("seed");
        assert_eq!(summary.doctors, data.doctors.len());

        let listing = f.doctors.public_listing();
        assert_eq!(listing.len(), data.doctors.len());

        let priya = listing
            .iter()
            .find(|e| e.owner.as_ref().map(|o| o.name.as_str()) == Some("Dr. Priya Sharma"))
            .expect("seeded doctor is listed");
        assert_eq!(priya.profile.review_count, 3);
        assert!((priya.profile.rating - 14.0 / 3.0).abs() < 1e-9);

        let admin = f
            .identities
            .authenticate("admin@example.com", "adminpassword")
            .expect("seeded admin can sign in");
        assert!(admin.is_admin());
    }

    #[test]
    fn reseed_keeps_patients_and_drops_appointments() {
        let f = fixture();
        let data = SeedData::bundled().expect("seed");
        f.seeder.seed(&data).expect("first seed");

        let patient = f
            .identities
            .register(crate::identity::Registration {
                name: "Pat Lee".into(),
                email: "pat@example.com".into(),
                password: "secret123".into(),
                role: None,
            })
            .expect("patient");
        let doctor = &f.doctors.public_listing()[0];
        f.ledger
            .create(
                &Caller::Authenticated(patient.clone()),
                BookingRequest {
                    doctor_profile_id: doctor.profile.id.to_string(),
                    scheduled_at: Some("2030-02-01T10:00:00Z".into()),
                    ..BookingRequest::default()
                },
            )
            .expect("booking");

        f.seeder.seed(&data).expect("second seed");

        assert!(f.ledger.list_all().is_empty());
        assert!(f.identities.get(&patient.id).expect("get").is_some());
        assert_eq!(f.doctors.list_all().len(), data.doctors.len());
        assert_eq!(f.identities.list_by_role(Role::Admin).len(), 1);
    }

    #[test]
    fn seed_rejects_out_of_range_rating() {
        let f = fixture();
        let data = SeedData::from_yaml(
            r#"
admin: { name: Admin, email: admin@example.com, password: adminpassword }
doctors:
  - name: Dr. Bad
    email: bad@example.com
    password: password
    specialty: Cardiologist
    qualifications: [MD]
    experience: 3
    reviews:
      - { name: Someone, rating: 9, comment: Too high }
"#,
        )
        .expect("parses");

        assert!(matches!(
            f.seeder.seed(&data),
            Err(BookingError::InvalidInput(_))
        ));
    }

    #[test]
    fn from_yaml_rejects_unknown_fields() {
        let result = SeedData::from_yaml(
            "admin: { name: A, email: a@example.com, password: pw1234, extra: 1 }\n",
        );
        assert!(matches!(result, Err(BookingError::YamlDeserialization(_))));
    }

    #[test]
    fn destroy_removes_everything() {
        let f = fixture();
        f.seeder
            .seed(&SeedData::bundled().expect("seed"))
            .expect("seed");

        f.seeder.destroy().expect("destroy");

        assert!(f.identities.list_all().is_empty());
        assert!(f.doctors.list_all().is_empty());
        assert!(f.ledger.list_all().is_empty());
    }
}
