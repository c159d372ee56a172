//! CSV import rules over an in-memory database

use sqlx::SqlitePool;
use vmt_common::db::models::NewVehicle;
use vmt_common::db::{init_memory_database, maintenance, vehicles};
use vmt_common::parse::is_placeholder_date;
use vmt_common::Error;
use vmt_web::services::csv_import::DuplicateAction;
use vmt_web::services::{import_csv, DuplicatePolicy, ImportReport};

async fn setup() -> (SqlitePool, i64) {
    let pool = init_memory_database().await.unwrap();
    let vehicle = vehicles::create_vehicle(
        &pool,
        &NewVehicle {
            name: Some("Wagon".to_string()),
            year: 2012,
            make: "Volvo".to_string(),
            model: "V70".to_string(),
            vin: None,
            account_id: None,
        },
    )
    .await
    .unwrap();
    (pool, vehicle.id)
}

async fn import(pool: &SqlitePool, vehicle_id: i64, csv: &str, policy: DuplicatePolicy) -> ImportReport {
    import_csv(pool, vehicle_id, csv.as_bytes(), policy)
        .await
        .unwrap()
}

async fn record_count(pool: &SqlitePool, vehicle_id: i64) -> usize {
    maintenance::list_records(pool, Some(vehicle_id))
        .await
        .unwrap()
        .len()
}

fn assert_counts_add_up(report: &ImportReport) {
    assert_eq!(
        report.total_rows,
        report.imported_rows + report.duplicate_rows + report.skipped_rows
    );
}

#[tokio::test]
async fn test_undated_row_matches_on_mileage_and_description() {
    let (pool, id) = setup().await;
    let first = import(
        &pool,
        id,
        "Date,Mileage,Description\n,30000,Brake pads\n01/15/2023,12000,Oil change\n",
        DuplicatePolicy::Skip,
    )
    .await;
    assert_eq!(first.imported_rows, 2);

    let records = maintenance::list_records(&pool, Some(id)).await.unwrap();
    let undated = records.iter().find(|r| r.mileage == 30_000).unwrap();
    assert!(is_placeholder_date(undated.date));
    assert!(undated.date_estimated);

    let second = import(
        &pool,
        id,
        "Date,Mileage,Description\n,30000, BRAKE PADS \n,12000,Oil change\n02/01/2023,12000,Oil change\n",
        DuplicatePolicy::Skip,
    )
    .await;
    // The dated row differs by date; both undated rows match on mileage and description
    assert_eq!(second.duplicate_rows, 2);
    assert_eq!(second.imported_rows, 1);
    assert_eq!(second.duplicate_details[0].row, 2);
    assert_eq!(second.duplicate_details[0].date, None);
    assert_eq!(second.duplicate_details[1].existing_ids.len(), 1);
    assert_counts_add_up(&second);
    assert_eq!(record_count(&pool, id).await, 3);
}

#[tokio::test]
async fn test_repeated_rows_within_one_file() {
    let (pool, id) = setup().await;
    let csv = "Date,Mileage,Description,Cost\n03/01/2023,15000,Tire rotation,20\n03/01/2023,15000,Tire rotation,25\n";

    let skipped = import(&pool, id, csv, DuplicatePolicy::Skip).await;
    assert_eq!(skipped.imported_rows, 1);
    assert_eq!(skipped.duplicate_rows, 1);
    assert_eq!(skipped.duplicate_details[0].row, 3);
    assert_eq!(skipped.duplicate_details[0].action, DuplicateAction::Skipped);
    assert_eq!(record_count(&pool, id).await, 1);

    let (pool, id) = setup().await;
    let replaced = import(&pool, id, csv, DuplicatePolicy::Replace).await;
    assert_eq!(replaced.imported_rows, 2);
    assert_eq!(replaced.replaced_rows, 1);
    assert_eq!(replaced.duplicate_rows, 0);
    assert_counts_add_up(&replaced);

    let records = maintenance::list_records(&pool, Some(id)).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].cost, Some(25.0));
}

#[tokio::test]
async fn test_leading_byte_order_mark_is_ignored() {
    let (pool, id) = setup().await;
    let report = import(
        &pool,
        id,
        "\u{FEFF}Date,Mileage,Description\n05/05/2023,21000,Wiper blades\n",
        DuplicatePolicy::Skip,
    )
    .await;
    assert!(report.errors.is_empty());
    assert_eq!(report.imported_rows, 1);

    let records = maintenance::list_records(&pool, Some(id)).await.unwrap();
    assert_eq!(records[0].description, "Wiper blades");
    assert!(!records[0].date_estimated);
}

#[tokio::test]
async fn test_non_utf8_file_is_rejected() {
    let (pool, id) = setup().await;
    let result = import_csv(
        &pool,
        id,
        b"Date,Description\n01/02/2023,Vidange \xe9t\xe9\n",
        DuplicatePolicy::Skip,
    )
    .await;
    assert!(matches!(result, Err(Error::InvalidInput(_))));
    assert_eq!(record_count(&pool, id).await, 0);
}

#[tokio::test]
async fn test_missing_required_columns_import_nothing() {
    let (pool, id) = setup().await;

    let no_description = import(
        &pool,
        id,
        "Date,Mileage,Cost\n01/02/2023,1000,10\n",
        DuplicatePolicy::Skip,
    )
    .await;
    assert_eq!(no_description.errors.len(), 1);
    assert!(no_description.errors[0].contains("description"));
    assert_eq!(no_description.imported_rows, 0);
    assert!(!no_description.success());

    let no_date_or_mileage = import(
        &pool,
        id,
        "Description,Cost\nOil change,45\n",
        DuplicatePolicy::Skip,
    )
    .await;
    assert_eq!(no_date_or_mileage.errors.len(), 1);
    assert_eq!(no_date_or_mileage.imported_rows, 0);

    assert_eq!(record_count(&pool, id).await, 0);
}

#[tokio::test]
async fn test_row_counts_with_skipped_and_blank_rows() {
    let (pool, id) = setup().await;
    let csv = "Date,Mileage,Description\n\
               01/10/2023,11000,Oil change\n\
               01/20/2023,11500,\n\
               01/10/2023,11000,Oil change\n\
               ,,\n\
               02/10/2023,1e30,Coolant flush\n";
    let report = import(&pool, id, csv, DuplicatePolicy::Skip).await;

    assert_eq!(report.total_rows, 4);
    assert_eq!(report.imported_rows, 2);
    assert_eq!(report.duplicate_rows, 1);
    assert_eq!(report.skipped_rows, 1);
    assert_counts_add_up(&report);
    assert!(report
        .notes
        .contains(&"Row 3: no description, row skipped".to_string()));
    assert!(report
        .notes
        .contains(&"Row 6: invalid mileage '1e30', using 0".to_string()));

    let flush = maintenance::list_records(&pool, Some(id))
        .await
        .unwrap()
        .into_iter()
        .find(|r| r.description == "Coolant flush")
        .unwrap();
    assert_eq!(flush.mileage, 0);
}

#[tokio::test]
async fn test_notes_use_file_lines_across_quoted_newlines() {
    let (pool, id) = setup().await;
    let csv = "Date,Mileage,Description\n01/15/2023,12000,\"Oil change\nand filter\"\n02/15/2023,13000,\n";
    let report = import(&pool, id, csv, DuplicatePolicy::Skip).await;

    assert_eq!(report.imported_rows, 1);
    assert_eq!(report.notes, vec!["Row 4: no description, row skipped".to_string()]);
}
