extern crate failure;
extern crate futures;
extern crate futures_cpupool;
extern crate listings_lib;
extern crate r2d2;
extern crate r2d2_sqlite;

mod common;

use futures::Future;

use listings_lib::errors::Error;
use listings_lib::models::*;
use listings_lib::services::{EngagementService, ProductsService};

use common::{create_store, seed_user, service_as};

fn new_product(owner_email: &str, name: &str) -> NewProduct {
    NewProduct {
        name: name.to_string(),
        image: None,
        description: "Something useful".to_string(),
        tags: vec!["tools".to_string()],
        external_link: None,
        owner_email: owner_email.to_string(),
        owner_name: None,
    }
}

fn reporter(email: &str) -> ReporterMeta {
    ReporterMeta {
        user_email: email.to_string(),
        user_name: Some("Seeded User".to_string()),
        user_photo: None,
    }
}

fn is_forbidden(err: &failure::Error) -> bool {
    err.iter_chain().any(|c| match common::error_ref(c) {
        Some(&Error::Forbidden) => true,
        _ => false,
    })
}

fn is_not_found(err: &failure::Error) -> bool {
    err.iter_chain().any(|c| match common::error_ref(c) {
        Some(&Error::NotFound) => true,
        _ => false,
    })
}

#[test]
fn test_vote_sets_stay_disjoint_through_toggles() {
    let ctx = create_store();
    let owner_id = seed_user(&ctx, "pro@example.com", UserRole::User, true);
    let alice_id = seed_user(&ctx, "alice@example.com", UserRole::User, true);
    let bob_id = seed_user(&ctx, "bob@example.com", UserRole::User, true);

    let owner = service_as(&ctx, Some(owner_id), Some("pro@example.com"));
    let alice = service_as(&ctx, Some(alice_id), Some("alice@example.com"));
    let bob = service_as(&ctx, Some(bob_id), Some("bob@example.com"));

    let product = owner.create_product(new_product("pro@example.com", "Widget")).wait().unwrap();

    let summary = alice.vote_product(product.id, VoteDirection::Up).wait().unwrap();
    assert_eq!(summary.up_votes, vec!["alice@example.com".to_string()]);
    assert!(summary.down_votes.is_empty());

    // same direction again toggles the vote off
    let summary = alice.vote_product(product.id, VoteDirection::Up).wait().unwrap();
    assert!(summary.up_votes.is_empty());
    assert!(summary.down_votes.is_empty());

    // opposite direction moves the email between the sets
    alice.vote_product(product.id, VoteDirection::Up).wait().unwrap();
    let summary = alice.vote_product(product.id, VoteDirection::Down).wait().unwrap();
    assert!(summary.up_votes.is_empty());
    assert_eq!(summary.down_votes, vec!["alice@example.com".to_string()]);

    let summary = bob.vote_product(product.id, VoteDirection::Up).wait().unwrap();
    assert_eq!(summary.up_votes, vec!["bob@example.com".to_string()]);
    assert_eq!(summary.down_votes, vec!["alice@example.com".to_string()]);
    for email in &summary.up_votes {
        assert!(!summary.down_votes.contains(email));
    }

    // the sets are persisted on the product
    let stored = owner.get_product(product.id).wait().unwrap();
    assert_eq!(stored.up_votes, summary.up_votes);
    assert_eq!(stored.down_votes, summary.down_votes);
}

#[test]
fn test_vote_on_missing_product() {
    let ctx = create_store();
    let alice_id = seed_user(&ctx, "alice@example.com", UserRole::User, true);
    let alice = service_as(&ctx, Some(alice_id), Some("alice@example.com"));

    let err = alice.vote_product(ProductId(999), VoteDirection::Up).wait().unwrap_err();
    assert!(is_not_found(&err), "expected NotFound, got: {}", err);
}

#[test]
fn test_report_toggle_and_latched_flag() {
    let ctx = create_store();
    let owner_id = seed_user(&ctx, "pro@example.com", UserRole::User, true);
    let alice_id = seed_user(&ctx, "alice@example.com", UserRole::User, true);
    let moderator_id = seed_user(&ctx, "mod@example.com", UserRole::Moderator, true);

    let owner = service_as(&ctx, Some(owner_id), Some("pro@example.com"));
    let alice = service_as(&ctx, Some(alice_id), Some("alice@example.com"));
    let moderator = service_as(&ctx, Some(moderator_id), Some("mod@example.com"));

    let product = owner.create_product(new_product("pro@example.com", "Widget")).wait().unwrap();
    assert!(!product.is_reported);

    let toggle = alice.toggle_report(product.id, reporter("alice@example.com")).wait().unwrap();
    assert_eq!(toggle, ReportToggle { reported: true });
    assert!(owner.get_product(product.id).wait().unwrap().is_reported);

    let listed = moderator.list_product_reports(product.id).wait().unwrap();
    assert_eq!(listed.reports.len(), 1);
    assert_eq!(listed.reports[0].user_email, "alice@example.com");

    // second toggle removes the report row
    let toggle = alice.toggle_report(product.id, reporter("alice@example.com")).wait().unwrap();
    assert_eq!(toggle, ReportToggle { reported: false });
    let listed = moderator.list_product_reports(product.id).wait().unwrap();
    assert!(listed.reports.is_empty());

    // the reported flag stays latched even with zero reports left
    assert!(owner.get_product(product.id).wait().unwrap().is_reported);

    // a third toggle recreates the row
    let toggle = alice.toggle_report(product.id, reporter("alice@example.com")).wait().unwrap();
    assert_eq!(toggle, ReportToggle { reported: true });
    let listed = moderator.list_product_reports(product.id).wait().unwrap();
    assert_eq!(listed.reports.len(), 1);
}

#[test]
fn test_report_requires_matching_identity() {
    let ctx = create_store();
    let owner_id = seed_user(&ctx, "pro@example.com", UserRole::User, true);
    let alice_id = seed_user(&ctx, "alice@example.com", UserRole::User, true);

    let owner = service_as(&ctx, Some(owner_id), Some("pro@example.com"));
    let alice = service_as(&ctx, Some(alice_id), Some("alice@example.com"));

    let product = owner.create_product(new_product("pro@example.com", "Widget")).wait().unwrap();

    let err = alice
        .toggle_report(product.id, reporter("somebody@example.com"))
        .wait()
        .unwrap_err();
    assert!(is_forbidden(&err), "expected Forbidden, got: {}", err);
}

#[test]
fn test_reported_products_triage_is_moderator_only() {
    let ctx = create_store();
    let owner_id = seed_user(&ctx, "pro@example.com", UserRole::User, true);
    let alice_id = seed_user(&ctx, "alice@example.com", UserRole::User, true);
    let bob_id = seed_user(&ctx, "bob@example.com", UserRole::User, true);
    let moderator_id = seed_user(&ctx, "mod@example.com", UserRole::Moderator, true);

    let owner = service_as(&ctx, Some(owner_id), Some("pro@example.com"));
    let alice = service_as(&ctx, Some(alice_id), Some("alice@example.com"));
    let bob = service_as(&ctx, Some(bob_id), Some("bob@example.com"));
    let moderator = service_as(&ctx, Some(moderator_id), Some("mod@example.com"));

    let first = owner.create_product(new_product("pro@example.com", "First")).wait().unwrap();
    let second = owner.create_product(new_product("pro@example.com", "Second")).wait().unwrap();

    alice.toggle_report(first.id, reporter("alice@example.com")).wait().unwrap();
    bob.toggle_report(second.id, reporter("bob@example.com")).wait().unwrap();
    // two reports on the first product still yield one triage row
    bob.toggle_report(first.id, reporter("bob@example.com")).wait().unwrap();

    let reported = moderator.list_reported_products().wait().unwrap();
    assert_eq!(reported.len(), 2);
    let mut ids = reported.iter().map(|p| p.id).collect::<Vec<_>>();
    ids.sort();
    assert_eq!(ids, vec![first.id, second.id]);

    let err = alice.list_reported_products().wait().unwrap_err();
    assert!(is_forbidden(&err), "expected Forbidden, got: {}", err);

    let err = moderator.list_product_reports(ProductId(999)).wait().unwrap_err();
    assert!(is_not_found(&err), "expected NotFound, got: {}", err);
}
