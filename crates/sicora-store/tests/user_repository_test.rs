//! Integration tests for the in-memory user repository.

use chrono::{Duration, Utc};
use sicora_core::error::SicoraError;
use sicora_core::models::role::UserRole;
use sicora_core::models::user::{NewUser, User};
use sicora_core::repository::{SortDirection, UserFilter, UserRepository, UserSortField};
use sicora_store::MemoryDb;
use sicora_store::repository::MemoryUserRepository;

fn user(first: &str, email: &str, document: &str, role: UserRole, ficha: Option<&str>) -> User {
    User::new(NewUser {
        first_name: first.into(),
        last_name: "Pérez".into(),
        email: email.into(),
        document_number: document.into(),
        document_type: "CC".into(),
        role,
        phone: None,
        ficha_id: ficha.map(str::to_string),
        sede_id: None,
    })
    .unwrap()
}

/// Repository seeded with two learners in one cohort, an instructor and
/// an inactive admin.
async fn setup() -> (MemoryUserRepository, MemoryDb) {
    let db = MemoryDb::new();
    db.register_cohort("2558104", "Análisis y Desarrollo de Software")
        .await;
    let repo = MemoryUserRepository::new(db.clone());

    repo.create(user("Ana", "ana@sena.edu.co", "1000001", UserRole::Learner, Some("2558104")))
        .await
        .unwrap();
    repo.create(user("Bruno", "bruno@sena.edu.co", "1000002", UserRole::Learner, Some("2558104")))
        .await
        .unwrap();
    repo.create(user("Carla", "carla@sena.edu.co", "1000003", UserRole::Instructor, None))
        .await
        .unwrap();
    let mut admin = user("Diego", "diego@sena.edu.co", "1000004", UserRole::Admin, None);
    admin.deactivate();
    repo.create(admin).await.unwrap();

    (repo, db)
}

#[tokio::test]
async fn lookup_by_email_and_document() {
    let (repo, _) = setup().await;

    let by_email = repo.get_by_email("  ANA@sena.edu.co ").await.unwrap();
    assert_eq!(by_email.first_name, "Ana");

    let by_document = repo.get_by_document_number("1000003").await.unwrap();
    assert_eq!(by_document.role, UserRole::Instructor);

    let fetched = repo.get_by_id(by_email.id).await.unwrap();
    assert_eq!(fetched.email, "ana@sena.edu.co");

    assert!(repo.exists_by_email("bruno@sena.edu.co").await.unwrap());
    assert!(!repo.exists_by_email("nadie@sena.edu.co").await.unwrap());
    assert!(repo.exists_by_document_number("1000004").await.unwrap());

    let missing = repo.get_by_email("nadie@sena.edu.co").await;
    assert!(matches!(missing, Err(SicoraError::NotFound { .. })));
}

#[tokio::test]
async fn duplicate_email_or_document_is_rejected() {
    let (repo, _) = setup().await;

    let dup_email = user("Otra", "Ana@Sena.edu.co", "2000001", UserRole::Learner, None);
    let err = repo.create(dup_email).await.unwrap_err();
    assert!(matches!(err, SicoraError::DuplicateUser { ref field, .. } if field == "email"));

    let dup_document = user("Otra", "otra@sena.edu.co", "1000001", UserRole::Learner, None);
    let err = repo.create(dup_document).await.unwrap_err();
    assert!(
        matches!(err, SicoraError::DuplicateUser { ref field, .. } if field == "document_number")
    );
}

#[tokio::test]
async fn update_and_soft_delete() {
    let (repo, _) = setup().await;
    let mut ana = repo.get_by_email("ana@sena.edu.co").await.unwrap();

    ana.mark_logged_in();
    let updated = repo.update(ana.clone()).await.unwrap();
    assert!(updated.last_login.is_some());

    // Taking another user's email is a uniqueness violation.
    ana.email = "bruno@sena.edu.co".into();
    assert!(matches!(
        repo.update(ana.clone()).await,
        Err(SicoraError::DuplicateUser { .. })
    ));

    repo.delete(ana.id).await.unwrap();
    let deleted = repo.get_by_id(ana.id).await.unwrap();
    assert!(!deleted.is_active);
}

#[tokio::test]
async fn list_filters_sorts_and_pages() {
    let (repo, _) = setup().await;

    let learners = repo
        .list(UserFilter {
            role: Some(UserRole::Learner),
            sort_by: UserSortField::FirstName,
            sort_direction: SortDirection::Asc,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(learners.total, 2);
    let names: Vec<_> = learners.items.iter().map(|u| u.first_name.as_str()).collect();
    assert_eq!(names, ["Ana", "Bruno"]);

    let active = repo
        .list(UserFilter {
            is_active: Some(true),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(active.total, 3);

    let search = repo
        .list(UserFilter {
            search: Some("CARLA".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(search.total, 1);
    assert_eq!(search.items[0].first_name, "Carla");

    let by_program = repo
        .list(UserFilter {
            program: Some("Análisis y Desarrollo de Software".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_program.total, 2);

    let page_two = repo
        .list(UserFilter {
            page: 2,
            page_size: 3,
            sort_by: UserSortField::Email,
            sort_direction: SortDirection::Asc,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page_two.total, 4);
    assert_eq!(page_two.items.len(), 1);
    assert_eq!(page_two.items[0].email, "diego@sena.edu.co");
    assert_eq!(page_two.total_pages(), 2);
    assert!(!page_two.has_next());
    assert!(page_two.has_previous());
}

#[tokio::test]
async fn cohort_membership_lists_learners_only() {
    let (repo, _) = setup().await;
    let mut carla = repo.get_by_email("carla@sena.edu.co").await.unwrap();
    carla.assign_ficha(Some("2558104".into())).unwrap();
    repo.update(carla).await.unwrap();

    let cohort = repo.get_by_ficha("2558104").await.unwrap();
    assert_eq!(cohort.len(), 2);
    assert!(cohort.iter().all(User::is_learner));
}

#[tokio::test]
async fn bulk_create_reports_indexed_failures() {
    let (repo, _) = setup().await;

    let result = repo
        .bulk_create(vec![
            user("Elena", "elena@sena.edu.co", "3000001", UserRole::Learner, None),
            user("Fabio", "ana@sena.edu.co", "3000002", UserRole::Learner, None),
            user("Gina", "gina@sena.edu.co", "3000001", UserRole::Learner, None),
        ])
        .await
        .unwrap();

    assert_eq!(result.total, 3);
    assert_eq!(result.success, 1);
    assert_eq!(result.failed, 2);
    assert_eq!(result.errors[0].index, 1);
    assert_eq!(result.errors[0].field.as_deref(), Some("email"));
    assert_eq!(result.errors[1].index, 2);
    assert_eq!(result.errors[1].field.as_deref(), Some("document_number"));
}

#[tokio::test]
async fn bulk_update_status_and_delete() {
    let (repo, _) = setup().await;

    let mut bruno = repo.get_by_email("bruno@sena.edu.co").await.unwrap();
    bruno.phone = Some("3001112233".into());
    let result = repo
        .bulk_update(vec![
            ("bruno@sena.edu.co".into(), bruno),
            ("nadie@sena.edu.co".into(), user("Xavier", "xavier@sena.edu.co", "9999999", UserRole::Admin, None)),
        ])
        .await
        .unwrap();
    assert_eq!(result.success, 1);
    assert_eq!(result.errors[0].index, 1);
    assert_eq!(
        repo.get_by_email("bruno@sena.edu.co").await.unwrap().phone.as_deref(),
        Some("3001112233")
    );

    let result = repo
        .bulk_status_change(vec!["diego@sena.edu.co".into()], true)
        .await
        .unwrap();
    assert_eq!(result.success, 1);
    assert!(repo.get_by_email("diego@sena.edu.co").await.unwrap().is_active);

    let result = repo
        .bulk_delete(vec!["ana@sena.edu.co".into(), "bruno@sena.edu.co".into()])
        .await
        .unwrap();
    assert_eq!(result.success, 2);
    let counts = repo.active_inactive_count().await.unwrap();
    assert_eq!((counts.active, counts.inactive), (2, 2));
}

#[tokio::test]
async fn get_multiple_by_emails_skips_unknown() {
    let (repo, _) = setup().await;
    let users = repo
        .get_multiple_by_emails(&[
            "carla@sena.edu.co".into(),
            "nadie@sena.edu.co".into(),
            "ana@sena.edu.co".into(),
        ])
        .await
        .unwrap();
    let names: Vec<_> = users.iter().map(|u| u.first_name.as_str()).collect();
    assert_eq!(names, ["Carla", "Ana"]);
}

#[tokio::test]
async fn dashboard_aggregates() {
    let (repo, _) = setup().await;

    let by_role = repo.count_by_role().await.unwrap();
    assert_eq!(by_role.get(&UserRole::Learner), Some(&2));
    assert_eq!(by_role.get(&UserRole::Instructor), Some(&1));
    assert_eq!(by_role.get(&UserRole::Director), None);

    let by_program = repo.count_by_program().await.unwrap();
    assert_eq!(by_program.get("Análisis y Desarrollo de Software"), Some(&2));

    let counts = repo.active_inactive_count().await.unwrap();
    assert_eq!((counts.active, counts.inactive), (3, 1));

    let mut old = user("Hugo", "hugo@sena.edu.co", "4000001", UserRole::Learner, None);
    old.created_at = Utc::now() - Duration::days(30);
    repo.create(old).await.unwrap();

    let trend = repo.registration_trend(7).await.unwrap();
    assert_eq!(trend.len(), 7);
    assert_eq!(trend.get(&Utc::now().date_naive()), Some(&4));
    assert_eq!(trend.values().sum::<u64>(), 4);
}
