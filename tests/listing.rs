//! Listing, paging and single-record lookup semantics, plus the audit-log
//! collaborator's gating.

use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use zonewarden::audit;
use zonewarden::config::Config;
use zonewarden::db::models::record::{RecordListFilter, RecordQuery};
use zonewarden::db::paging::Paging;
use zonewarden::error::AppError;
use zonewarden::records::{repository, RecordService};

const ADMIN: i64 = 1;

async fn setup() -> (SqlitePool, RecordService) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory pool");

    sqlx::migrate!("./src/db/migrations")
        .run(&pool)
        .await
        .expect("migrations");

    zonewarden::db::seed_admin(&pool).await.expect("seed admin");

    let service = RecordService::new(pool.clone(), Arc::new(Config::default()));
    (pool, service)
}

async fn create_domain(pool: &SqlitePool, name: &str, kind: &str) -> i64 {
    sqlx::query("INSERT INTO domains (name, type) VALUES (?, ?)")
        .bind(name)
        .bind(kind)
        .execute(pool)
        .await
        .expect("insert domain")
        .last_insert_rowid()
}

async fn create_user(pool: &SqlitePool, name: &str) -> i64 {
    sqlx::query("INSERT INTO users (name, type) VALUES (?, 'user')")
        .bind(name)
        .execute(pool)
        .await
        .expect("insert user")
        .last_insert_rowid()
}

async fn grant(pool: &SqlitePool, user_id: i64, domain_id: i64) {
    sqlx::query("INSERT INTO permissions (user_id, domain_id) VALUES (?, ?)")
        .bind(user_id)
        .bind(domain_id)
        .execute(pool)
        .await
        .expect("insert permission");
}

async fn insert_record(pool: &SqlitePool, domain_id: i64, name: &str, rtype: &str, content: &str) -> i64 {
    sqlx::query("INSERT INTO records (domain_id, name, type, content, ttl, prio) VALUES (?, ?, ?, ?, 3600, 0)")
        .bind(domain_id)
        .bind(name)
        .bind(rtype)
        .bind(content)
        .execute(pool)
        .await
        .expect("insert record")
        .last_insert_rowid()
}

#[tokio::test]
async fn listing_excludes_soa_and_honors_permissions() {
    let (pool, svc) = setup().await;
    let d1 = create_domain(&pool, "example.com", "MASTER").await;
    let d2 = create_domain(&pool, "example.org", "MASTER").await;
    insert_record(&pool, d1, "example.com", "SOA", "ns1 hostmaster 1").await;
    insert_record(&pool, d1, "www.example.com", "A", "1.2.3.4").await;
    insert_record(&pool, d2, "www.example.org", "A", "5.6.7.8").await;

    let page = svc
        .list_records(ADMIN, &RecordListFilter::default(), &Paging::all())
        .await
        .expect("admin listing");
    assert_eq!(page.total_pages, 1);
    assert_eq!(page.items.len(), 2);
    assert!(page.items.iter().all(|r| r.rtype != "SOA"));

    let user = create_user(&pool, "alice").await;
    grant(&pool, user, d1).await;
    let page = svc
        .list_records(user, &RecordListFilter::default(), &Paging::all())
        .await
        .expect("user listing");
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].name, "www.example.com");
}

#[tokio::test]
async fn listing_applies_filters() {
    let (pool, svc) = setup().await;
    let d1 = create_domain(&pool, "example.com", "MASTER").await;
    let d2 = create_domain(&pool, "example.org", "MASTER").await;
    insert_record(&pool, d1, "www.example.com", "A", "1.2.3.4").await;
    insert_record(&pool, d1, "mail.example.com", "MX", "mx.example.com").await;
    insert_record(&pool, d2, "www.example.org", "A", "5.6.7.8").await;

    let filter = RecordListFilter {
        types: Some(vec!["A".to_string()]),
        ..Default::default()
    };
    let page = svc.list_records(ADMIN, &filter, &Paging::all()).await.expect("type filter");
    assert_eq!(page.items.len(), 2);

    let filter = RecordListFilter {
        domains: Some(vec![d1]),
        types: Some(vec!["A".to_string()]),
        ..Default::default()
    };
    let page = svc.list_records(ADMIN, &filter, &Paging::all()).await.expect("domain filter");
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].name, "www.example.com");

    let filter = RecordListFilter {
        query_name: Some("mail".to_string()),
        ..Default::default()
    };
    let page = svc.list_records(ADMIN, &filter, &Paging::all()).await.expect("name filter");
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].rtype, "MX");

    let filter = RecordListFilter {
        query_content: Some("5.6.7".to_string()),
        ..Default::default()
    };
    let page = svc.list_records(ADMIN, &filter, &Paging::all()).await.expect("content filter");
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].name, "www.example.org");
}

#[tokio::test]
async fn listing_pages_and_counts() {
    let (pool, svc) = setup().await;
    let d1 = create_domain(&pool, "example.com", "MASTER").await;
    for i in 0..5 {
        insert_record(&pool, d1, &format!("host{i}.example.com"), "A", &format!("10.0.0.{i}")).await;
    }

    let page = svc
        .list_records(ADMIN, &RecordListFilter::default(), &Paging::new(1, Some(2)))
        .await
        .expect("first page");
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].name, "host0.example.com");

    let page = svc
        .list_records(ADMIN, &RecordListFilter::default(), &Paging::new(3, Some(2)))
        .await
        .expect("last page");
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].name, "host4.example.com");
}

#[tokio::test]
async fn listing_sorts_by_allow_listed_fields() {
    let (pool, svc) = setup().await;
    let d1 = create_domain(&pool, "example.com", "MASTER").await;
    insert_record(&pool, d1, "alpha.example.com", "A", "1.1.1.1").await;
    insert_record(&pool, d1, "zulu.example.com", "A", "2.2.2.2").await;

    let filter = RecordListFilter {
        sort: Some("name-desc".to_string()),
        ..Default::default()
    };
    let page = svc.list_records(ADMIN, &filter, &Paging::all()).await.expect("sorted listing");
    assert_eq!(page.items[0].name, "zulu.example.com");

    let filter = RecordListFilter {
        sort: Some("password-asc".to_string()),
        ..Default::default()
    };
    let err = svc.list_records(ADMIN, &filter, &Paging::all()).await.unwrap_err();
    assert!(matches!(err, AppError::Semantic(_)));
}

#[tokio::test]
async fn find_distinguishes_missing_single_and_ambiguous() {
    let (pool, _svc) = setup().await;
    let d1 = create_domain(&pool, "example.com", "MASTER").await;
    let kept = insert_record(&pool, d1, "www.example.com", "A", "1.2.3.4").await;
    insert_record(&pool, d1, "www.example.com", "A", "1.2.3.5").await;

    let config = Config::default();
    let mut conn = pool.acquire().await.expect("conn");

    let query = RecordQuery {
        name: Some("missing.example.com".to_string()),
        ..Default::default()
    };
    let err = repository::find(&mut conn, &config, d1, &query).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let query = RecordQuery {
        name: Some("www.example.com".to_string()),
        ..Default::default()
    };
    let err = repository::find(&mut conn, &config, d1, &query).await.unwrap_err();
    assert!(matches!(err, AppError::Ambiguous(_)));

    // Narrowing by content pins it down to one row.
    let query = RecordQuery {
        name: Some("www.example.com".to_string()),
        content: Some("1.2.3.4".to_string()),
        ..Default::default()
    };
    let found = repository::find(&mut conn, &config, d1, &query).await.expect("find");
    assert_eq!(found.id, kept);

    // except_id removes the row being edited from consideration.
    let query = RecordQuery {
        name: Some("www.example.com".to_string()),
        except_id: Some(kept),
        ..Default::default()
    };
    let found = repository::find(&mut conn, &config, d1, &query).await.expect("find");
    assert_ne!(found.id, kept);

    let query = RecordQuery {
        rtype: Some("BOGUS".to_string()),
        ..Default::default()
    };
    let err = repository::find(&mut conn, &config, d1, &query).await.unwrap_err();
    assert!(matches!(err, AppError::Semantic(_)));
}

#[tokio::test]
async fn audit_log_requires_writable_domain_and_user() {
    let (pool, _svc) = setup().await;
    let master = create_domain(&pool, "example.com", "MASTER").await;
    let slave = create_domain(&pool, "secondary.example.com", "SLAVE").await;

    let entry = audit::add_log(&pool, master, ADMIN, "ADD: #1 www.example.com A 1.2.3.4")
        .await
        .expect("log entry");
    assert_eq!(entry.domain_id, master);
    assert_eq!(entry.log, "ADD: #1 www.example.com A 1.2.3.4");

    let err = audit::add_log(&pool, slave, ADMIN, "nope").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = audit::add_log(&pool, master, 4711, "nope").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
