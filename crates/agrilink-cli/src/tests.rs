use agrilink_core::{ListingStatus, ProductCategory, ValidationProfile};
use serde_json::json;

use super::*;
use crate::offline::{normalize_document, validate_document};

#[test]
fn missing_command_is_an_error() {
    assert!(Cli::try_parse_from(["agrilink"]).is_err());
}

#[test]
fn parses_validate_with_defaults() {
    let cli = Cli::try_parse_from(["agrilink", "validate", "draft.json"])
        .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Commands::Validate {
            ref file,
            form: false,
            profile: ProfileArg::Standard
        } if file.to_str() == Some("draft.json")
    ));
}

#[test]
fn parses_validate_form_with_strict_profile() {
    let cli = Cli::try_parse_from([
        "agrilink",
        "validate",
        "form.json",
        "--form",
        "--profile",
        "strict",
    ])
    .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Commands::Validate {
            form: true,
            profile: ProfileArg::Strict,
            ..
        }
    ));
}

#[test]
fn parses_normalize_mode() {
    let cli = Cli::try_parse_from(["agrilink", "normalize", "body.json", "--mode", "collection"])
        .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Commands::Normalize {
            mode: NormalizeMode::Collection,
            ..
        }
    ));
}

#[test]
fn parses_listings_list_filters() {
    let cli = Cli::try_parse_from([
        "agrilink",
        "listings",
        "list",
        "--category",
        "Grains",
        "--limit",
        "25",
        "--mine",
    ])
    .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Commands::Listings {
            dump_log: None,
            command: ListingsCommands::List {
                page: 1,
                limit: 25,
                category: Some(ProductCategory::Grains),
                mine: true,
                newest: false,
                ..
            }
        }
    ));
}

#[test]
fn rejects_unknown_category() {
    let err = Cli::try_parse_from(["agrilink", "listings", "list", "--category", "gadgets"])
        .unwrap_err();
    assert!(err.to_string().contains("unknown category"));
}

#[test]
fn parses_set_status_with_ids() {
    let cli = Cli::try_parse_from([
        "agrilink",
        "listings",
        "--dump-log",
        "api-log.json",
        "set-status",
        "--status",
        "out_of_stock",
        "a",
        "b",
    ])
    .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Commands::Listings {
            dump_log: Some(_),
            command: ListingsCommands::SetStatus {
                status: ListingStatus::OutOfStock,
                ref ids
            }
        } if ids.len() == 2
    ));
}

#[test]
fn set_status_requires_ids() {
    assert!(
        Cli::try_parse_from(["agrilink", "listings", "set-status", "--status", "active"]).is_err()
    );
}

#[test]
fn parses_listings_health() {
    let cli = Cli::try_parse_from(["agrilink", "listings", "health"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Commands::Listings {
            command: ListingsCommands::Health,
            ..
        }
    ));
}

#[test]
fn profile_arg_maps_onto_rule_profile() {
    assert_eq!(
        ValidationProfile::from(ProfileArg::Strict),
        ValidationProfile::Strict
    );
    assert_eq!(
        ValidationProfile::from(ProfileArg::Standard),
        ValidationProfile::Standard
    );
}

// ---------------------------------------------------------------------------
// Offline handlers
// ---------------------------------------------------------------------------

#[test]
fn validate_document_reports_rule_violations() {
    let payload = json!({
        "produceName": "Corn",
        "produceDescription": "Sweet corn",
        "category": "vegetables",
        "unitPrice": 0,
        "unitOfMeasurement": "bag",
        "quantityAvailable": 5,
        "minimumOrderQuantity": 6,
        "farmAddress": "64f1c2a9b3e4d5f6a7b8c9d0",
        "images": [{ "url": "https://cdn.agrilink.test/corn.jpg", "isPrimary": true }]
    });

    let result = validate_document(payload, false, ValidationProfile::Standard).unwrap();
    assert!(!result.is_valid);
    assert!(!result.errors_for("unitPrice").is_empty());
    assert!(!result.errors_for("minimumOrderQuantity").is_empty());
}

#[test]
fn validate_document_coerces_form_input() {
    let payload = json!({
        "produceName": "Corn",
        "produceDescription": "Sweet corn",
        "category": "vegetables",
        "unitPrice": "cheap",
        "unitOfMeasurement": "bag",
        "quantityAvailable": "10",
        "minimumOrderQuantity": "1",
        "farmAddress": "64f1c2a9b3e4d5f6a7b8c9d0",
        "images": [{ "url": "https://cdn.agrilink.test/corn.jpg", "isPrimary": true }]
    });

    let result = validate_document(payload, true, ValidationProfile::Standard).unwrap();
    assert_eq!(result.errors_for("unitPrice").len(), 1);
}

#[test]
fn validate_document_rejects_non_object_payload() {
    assert!(validate_document(json!([1, 2]), false, ValidationProfile::Standard).is_err());
}

#[test]
fn normalize_document_handles_each_mode() {
    let listing = normalize_document(
        &json!({ "data": { "data": { "_id": "lst_1", "produceName": "Yam" } } }),
        NormalizeMode::Listing,
    )
    .unwrap();
    assert_eq!(listing["_id"], "lst_1");

    let page = normalize_document(
        &json!({ "data": { "listings": [{ "id": "a" }] } }),
        NormalizeMode::Collection,
    )
    .unwrap();
    assert_eq!(page["listings"].as_array().unwrap().len(), 1);

    let error = normalize_document(
        &json!({ "statusCode": 404, "message": "Listing not found" }),
        NormalizeMode::Error,
    )
    .unwrap();
    assert_eq!(error["status"], 404);
    assert_eq!(error["message"], "Listing not found");
}

#[test]
fn normalize_document_fails_without_listing() {
    assert!(normalize_document(&json!({ "data": {} }), NormalizeMode::Listing).is_err());
}
