//! Integration tests for user registration and account maintenance.

use sicora_auth::config::{HashCost, MfaConfig};
use sicora_auth::users::{RegisterUserInput, UserService};
use sicora_core::error::SicoraError;
use sicora_core::models::role::UserRole;
use sicora_core::models::user::{NewUser, PolicyVersions};
use sicora_core::validation::{CharClass, Field, ValidationError};
use sicora_store::MemoryDb;
use sicora_store::repository::MemoryUserRepository;

fn config() -> MfaConfig {
    MfaConfig {
        pepper: Some("pepper".into()),
        hash_cost: HashCost {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        },
        policy_versions: PolicyVersions::new("2.0", "1.3", "1.1"),
        ..MfaConfig::default()
    }
}

fn setup() -> UserService<MemoryUserRepository> {
    UserService::new(MemoryUserRepository::new(MemoryDb::new()), config())
}

fn input(email: &str, document: &str, password: &str) -> RegisterUserInput {
    RegisterUserInput {
        user: NewUser {
            first_name: "Luisa".into(),
            last_name: "Fernanda Ortiz".into(),
            email: email.into(),
            document_number: document.into(),
            document_type: "CC".into(),
            role: UserRole::Learner,
            phone: None,
            ficha_id: Some("2670011".into()),
            sede_id: None,
        },
        password: password.into(),
    }
}

#[tokio::test]
async fn register_hashes_password_and_normalizes_email() {
    let service = setup();
    let user = service
        .register(input(" Luisa.Ortiz@SENA.edu.co ", "52001234", "Segura#2024x"))
        .await
        .unwrap();

    assert_eq!(user.email, "luisa.ortiz@sena.edu.co");
    assert!(user.is_active);
    assert!(!user.email_verified);
    assert!(user.legal_consent.is_none());
    let hash = user.password_hash.as_deref().unwrap();
    assert!(hash.starts_with("$argon2id$"));
    assert_ne!(hash, "Segura#2024x");
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let service = setup();
    service
        .register(input("luisa@sena.edu.co", "52001234", "Segura#2024x"))
        .await
        .unwrap();

    let err = service
        .register(input("LUISA@sena.edu.co", "52009999", "Segura#2024x"))
        .await
        .unwrap_err();
    assert!(matches!(err, SicoraError::DuplicateUser { ref field, .. } if field == "email"));

    let err = service
        .register(input("otra@sena.edu.co", "52001234", "Segura#2024x"))
        .await
        .unwrap_err();
    assert!(
        matches!(err, SicoraError::DuplicateUser { ref field, .. } if field == "document_number")
    );
}

#[tokio::test]
async fn weak_password_reports_the_missing_class() {
    let service = setup();
    let err = service
        .register(input("luisa@sena.edu.co", "52001234", "segura#2024x"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SicoraError::Validation(ValidationError::PasswordMissing(CharClass::Uppercase))
    ));

    let err = service
        .register(input("luisa@sena.edu.co", "52001234", "Short#1"))
        .await
        .unwrap_err();
    let SicoraError::Validation(validation) = err else {
        panic!("expected a validation error");
    };
    assert_eq!(validation.field(), Field::Password);
}

#[tokio::test]
async fn credentials_are_checked_uniformly() {
    let service = setup();
    service
        .register(input("luisa@sena.edu.co", "52001234", "Segura#2024x"))
        .await
        .unwrap();

    let user = service
        .verify_credentials("luisa@sena.edu.co", "Segura#2024x")
        .await
        .unwrap();
    assert_eq!(user.first_name, "Luisa");

    let wrong = service
        .verify_credentials("luisa@sena.edu.co", "Segura#2024y")
        .await
        .unwrap_err();
    let unknown = service
        .verify_credentials("nadie@sena.edu.co", "Segura#2024x")
        .await
        .unwrap_err();
    assert_eq!(wrong.to_string(), unknown.to_string());
}

#[tokio::test]
async fn legal_consent_tracks_published_versions() {
    let service = setup();
    let user = service
        .register(input("luisa@sena.edu.co", "52001234", "Segura#2024x"))
        .await
        .unwrap();
    assert!(service.needs_policy_update(user.id).await.unwrap());

    let user = service
        .accept_legal_policies(user.id, "192.168.1.20")
        .await
        .unwrap();
    assert!(user.can_access_system());
    assert!(!service.needs_policy_update(user.id).await.unwrap());
    let consent = user.legal_consent.unwrap();
    assert_eq!(consent.privacy_policy.version, "2.0");
    assert_eq!(consent.ip_address, "192.168.1.20");
}

#[tokio::test]
async fn account_maintenance() {
    let service = setup();
    let user = service
        .register(input("luisa@sena.edu.co", "52001234", "Segura#2024x"))
        .await
        .unwrap();

    let user = service.set_active(user.id, false).await.unwrap();
    assert!(!user.is_active);

    let user = service.verify_email(user.id).await.unwrap();
    assert!(user.email_verified);

    let err = service
        .assign_ficha(user.id, Some("12ab".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, SicoraError::Validation(_)));
    let user = service.assign_ficha(user.id, None).await.unwrap();
    assert!(user.ficha_id.is_none());
}
