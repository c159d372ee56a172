//! Repository behaviour against an in-memory database

use chrono::NaiveDate;
use sqlx::SqlitePool;
use vmt_common::config::ReminderConfig;
use vmt_common::db::models::{
    NewEmailSubscription, NewFuelEntry, NewFutureMaintenance, NewMaintenanceRecord,
    NewOilAnalysis, NewVehicle, RotationPattern, TireMeta, TreadDepths,
};
use vmt_common::db::{accounts, fuel, future, init_memory_database, maintenance, subscriptions, vehicles};
use vmt_common::mpg;
use vmt_common::parse::{placeholder_date, MAX_MILEAGE};
use vmt_common::reminders;
use vmt_common::Error;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn new_vehicle(name: Option<&str>, vin: Option<&str>) -> NewVehicle {
    NewVehicle {
        name: name.map(str::to_string),
        year: 2018,
        make: "Toyota".to_string(),
        model: "Tacoma".to_string(),
        vin: vin.map(str::to_string),
        account_id: None,
    }
}

async fn setup() -> (SqlitePool, i64) {
    let pool = init_memory_database().await.unwrap();
    let vehicle = vehicles::create_vehicle(&pool, &new_vehicle(Some("Taco"), None))
        .await
        .unwrap();
    (pool, vehicle.id)
}

// =============================================================================
// Vehicles
// =============================================================================

#[tokio::test]
async fn test_blank_name_is_generated_from_year_make_model() {
    let pool = init_memory_database().await.unwrap();
    let vehicle = vehicles::create_vehicle(&pool, &new_vehicle(Some("  "), Some(" 1ftfw1et5dfc10312 ")))
        .await
        .unwrap();

    assert_eq!(vehicle.name, "2018 Toyota Tacoma");
    assert_eq!(vehicle.vin.as_deref(), Some("1FTFW1ET5DFC10312"));

    let default_account = accounts::get_default_account(&pool, "owner").await.unwrap();
    assert_eq!(vehicle.account_id.as_deref(), Some(default_account.id.as_str()));
}

#[tokio::test]
async fn test_duplicate_name_and_vin_conflict() {
    let pool = init_memory_database().await.unwrap();
    vehicles::create_vehicle(&pool, &new_vehicle(Some("Taco"), Some("ABC123")))
        .await
        .unwrap();

    let err = vehicles::create_vehicle(&pool, &new_vehicle(Some("Taco"), None))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(ref m) if m == "A vehicle with this name already exists"));

    let err = vehicles::create_vehicle(&pool, &new_vehicle(Some("Other"), Some("abc123")))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(ref m) if m == "A vehicle with this VIN already exists"));
}

#[tokio::test]
async fn test_update_keeps_own_name_and_blank_vin_clears() {
    let pool = init_memory_database().await.unwrap();
    let vehicle = vehicles::create_vehicle(&pool, &new_vehicle(Some("Taco"), Some("ABC123")))
        .await
        .unwrap();

    let updated = vehicles::update_vehicle(&pool, vehicle.id, &new_vehicle(Some("Taco"), Some("")))
        .await
        .unwrap();
    assert_eq!(updated.name, "Taco");
    assert!(updated.vin.is_none());
    assert_eq!(updated.account_id, vehicle.account_id);
}

#[tokio::test]
async fn test_vehicle_validation() {
    let pool = init_memory_database().await.unwrap();

    let mut bad_year = new_vehicle(None, None);
    bad_year.year = 1850;
    assert!(matches!(
        vehicles::create_vehicle(&pool, &bad_year).await,
        Err(Error::InvalidInput(_))
    ));

    assert!(matches!(
        vehicles::create_vehicle(&pool, &new_vehicle(None, Some("12345678901234567890"))).await,
        Err(Error::InvalidInput(_))
    ));

    assert!(matches!(
        vehicles::delete_vehicle(&pool, 999).await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_current_mileage_spans_records_and_fuel() {
    let (pool, vehicle_id) = setup().await;
    assert_eq!(vehicles::current_mileage(&pool, vehicle_id).await.unwrap(), None);

    maintenance::create_record(
        &pool,
        &NewMaintenanceRecord {
            vehicle_id,
            date: Some(ymd(2024, 1, 10)),
            mileage: 41_000,
            description: "Wipers".to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    fuel::create_entry(
        &pool,
        &NewFuelEntry {
            vehicle_id,
            date: ymd(2024, 2, 1),
            mileage: 41_350,
            fuel_amount: 14.0,
            fuel_cost: 49.0,
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(vehicles::current_mileage(&pool, vehicle_id).await.unwrap(), Some(41_350));
}

// =============================================================================
// Maintenance records
// =============================================================================

#[tokio::test]
async fn test_missing_date_stores_placeholder() {
    let (pool, vehicle_id) = setup().await;
    let record = maintenance::create_record(
        &pool,
        &NewMaintenanceRecord {
            vehicle_id,
            date: None,
            mileage: 12_000,
            description: "  Timing belt ".to_string(),
            cost: Some(650.0),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(record.date, placeholder_date());
    assert!(record.date_estimated);
    assert_eq!(record.description, "Timing belt");
}

#[tokio::test]
async fn test_record_validation() {
    let (pool, vehicle_id) = setup().await;

    let blank = NewMaintenanceRecord {
        vehicle_id,
        date: Some(ymd(2024, 1, 1)),
        description: "   ".to_string(),
        ..Default::default()
    };
    assert!(matches!(
        maintenance::create_record(&pool, &blank).await,
        Err(Error::InvalidInput(_))
    ));

    let too_long = NewMaintenanceRecord {
        description: "x".repeat(501),
        ..blank.clone()
    };
    assert!(matches!(
        maintenance::create_record(&pool, &too_long).await,
        Err(Error::InvalidInput(_))
    ));

    let past_odometer_limit = NewMaintenanceRecord {
        description: "Oil".to_string(),
        mileage: MAX_MILEAGE + 1,
        ..blank.clone()
    };
    assert!(matches!(
        maintenance::create_record(&pool, &past_odometer_limit).await,
        Err(Error::InvalidInput(_))
    ));

    let huge_interval = NewMaintenanceRecord {
        description: "Oil".to_string(),
        is_oil_change: true,
        oil_change_interval: Some(i64::MAX),
        ..blank.clone()
    };
    assert!(matches!(
        maintenance::create_record(&pool, &huge_interval).await,
        Err(Error::InvalidInput(_))
    ));

    let unknown_vehicle = NewMaintenanceRecord {
        vehicle_id: 404,
        description: "Oil".to_string(),
        ..blank
    };
    assert!(matches!(
        maintenance::create_record(&pool, &unknown_vehicle).await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_tire_meta_round_trips_through_storage() {
    let (pool, vehicle_id) = setup().await;
    let mut tread = TreadDepths::default();
    tread.fl.inner = Some(8);
    tread.fl.middle = Some(9);
    tread.rr.outer = Some(6);

    let record = maintenance::create_record(
        &pool,
        &NewMaintenanceRecord {
            vehicle_id,
            date: Some(ymd(2024, 4, 2)),
            mileage: 30_000,
            description: "Tire rotation".to_string(),
            tire_meta: Some(TireMeta::new(
                Some(ymd(2024, 4, 2)),
                Some(RotationPattern::Cross),
                tread,
            )),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let meta = record.tire_meta().unwrap();
    assert_eq!(meta.rotation_pattern, Some(RotationPattern::Cross));
    assert_eq!(meta.tread.fl.middle, Some(9));
    assert_eq!(meta.tread.rr.outer, Some(6));
}

#[tokio::test]
async fn test_oil_analysis_links_to_oil_change() {
    let (pool, vehicle_id) = setup().await;
    let oil_change = maintenance::create_record(
        &pool,
        &NewMaintenanceRecord {
            vehicle_id,
            date: Some(ymd(2024, 1, 5)),
            mileage: 45_000,
            description: "Oil change".to_string(),
            is_oil_change: true,
            oil_type: Some("5W-30".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let analysis = maintenance::create_oil_analysis(
        &pool,
        &NewOilAnalysis {
            vehicle_id,
            analysis_date: ymd(2024, 1, 20),
            linked_oil_change_id: Some(oil_change.id),
            iron_level: Some(12.0),
            tbn: Some(6.5),
            coolant_contamination: Some(false),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(analysis.mileage, 45_000);
    assert_eq!(analysis.linked_oil_change_id, Some(oil_change.id));
    assert!(!analysis.is_oil_change);

    let analyses = maintenance::oil_analyses(&pool, vehicle_id).await.unwrap();
    assert_eq!(analyses.len(), 1);
    assert_eq!(analyses[0].iron_level, Some(12.0));

    // Linking to something that is not an oil change is rejected
    let bad = maintenance::create_oil_analysis(
        &pool,
        &NewOilAnalysis {
            vehicle_id,
            analysis_date: ymd(2024, 2, 1),
            linked_oil_change_id: Some(analysis.id),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(bad, Err(Error::InvalidInput(_))));
}

#[tokio::test]
async fn test_mileage_update_reports_lower_reading() {
    let (pool, vehicle_id) = setup().await;

    let first = maintenance::record_mileage_update(&pool, vehicle_id, 50_000, ymd(2024, 1, 1))
        .await
        .unwrap();
    assert_eq!(first.previous_mileage, None);
    assert!(!first.is_lower);

    let lower = maintenance::record_mileage_update(&pool, vehicle_id, 49_000, ymd(2024, 1, 2))
        .await
        .unwrap();
    assert_eq!(lower.previous_mileage, Some(50_000));
    assert!(lower.is_lower);

    let record = maintenance::get_record(&pool, lower.record_id).await.unwrap();
    assert_eq!(record.description, "Mileage Update");
}

#[tokio::test]
async fn test_summary_totals() {
    let (pool, vehicle_id) = setup().await;
    for (mileage, cost) in [(1_000, Some(100.0)), (2_000, Some(50.0)), (3_000, None)] {
        maintenance::create_record(
            &pool,
            &NewMaintenanceRecord {
                vehicle_id,
                date: Some(ymd(2024, 1, 1)),
                mileage,
                description: format!("Service at {mileage}"),
                cost,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    }

    let summary = maintenance::summary(&pool).await.unwrap();
    assert_eq!(summary.total_vehicles, 1);
    assert_eq!(summary.total_records, 3);
    assert_eq!(summary.total_cost, 150.0);
    assert_eq!(summary.average_cost_per_record, 50.0);

    let miles = maintenance::miles_driven_between(&pool, ymd(2024, 1, 1), ymd(2024, 12, 31))
        .await
        .unwrap();
    assert_eq!(miles, 2_000);
}

// =============================================================================
// Fuel entries
// =============================================================================

#[tokio::test]
async fn test_fuel_validation_and_mpg() {
    let (pool, vehicle_id) = setup().await;

    let base = NewFuelEntry {
        vehicle_id,
        date: ymd(2024, 3, 1),
        time: Some("08:15".to_string()),
        mileage: 10_000,
        fuel_amount: 10.0,
        fuel_cost: 35.0,
        fuel_type: Some("87".to_string()),
        driving_pattern: Some("Highway".to_string()),
        notes: None,
    };

    let entry = fuel::create_entry(&pool, &base).await.unwrap();
    assert_eq!(entry.driving_pattern.as_deref(), Some("highway"));
    assert_eq!(entry.price_per_gallon(), Some(3.5));

    for bad in [
        NewFuelEntry { fuel_amount: 0.0, ..base.clone() },
        NewFuelEntry { fuel_cost: -1.0, ..base.clone() },
        NewFuelEntry { fuel_amount: f64::INFINITY, ..base.clone() },
        NewFuelEntry { fuel_cost: f64::INFINITY, ..base.clone() },
        NewFuelEntry { mileage: MAX_MILEAGE + 1, ..base.clone() },
        NewFuelEntry { fuel_type: Some("kerosene".to_string()), ..base.clone() },
        NewFuelEntry { driving_pattern: Some("offroad".to_string()), ..base.clone() },
        NewFuelEntry { time: Some("8am".to_string()), ..base.clone() },
    ] {
        assert!(matches!(
            fuel::create_entry(&pool, &bad).await,
            Err(Error::InvalidInput(_))
        ));
    }

    fuel::create_entry(&pool, &NewFuelEntry { mileage: 10_300, ..base.clone() })
        .await
        .unwrap();
    fuel::create_entry(&pool, &NewFuelEntry { mileage: 10_600, fuel_amount: 12.0, ..base.clone() })
        .await
        .unwrap();

    let fill_ups = fuel::fill_ups(&pool, vehicle_id).await.unwrap();
    let summary = mpg::calculate(&fill_ups, &ReminderConfig::default().mpg_options());
    assert_eq!(summary.entries_count, 3);
    assert_eq!(summary.current.unwrap().mpg, 25.0);
    assert_eq!(summary.lifetime.unwrap().gallons, 22.0);
}

// =============================================================================
// Future maintenance and reminders
// =============================================================================

#[tokio::test]
async fn test_complete_recurring_item_schedules_next() {
    let (pool, vehicle_id) = setup().await;
    let item = future::create(
        &pool,
        &NewFutureMaintenance {
            vehicle_id,
            maintenance_type: "Air filter".to_string(),
            target_mileage: Some(45_000),
            is_recurring: true,
            recurrence_interval_miles: Some(15_000),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert!(item.is_active);
    assert_eq!(item.mileage_reminder, 100);
    assert_eq!(item.date_reminder, 30);

    let completion = future::complete(&pool, item.id, ymd(2024, 6, 1)).await.unwrap();
    assert!(!completion.completed.is_active);
    let next = completion.next.unwrap();
    assert_eq!(next.target_mileage, Some(60_000));
    assert!(next.is_active);

    let active = future::list_for_vehicle(&pool, vehicle_id, true).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, next.id);

    assert!(matches!(
        future::complete(&pool, item.id, ymd(2024, 6, 1)).await,
        Err(Error::InvalidInput(_))
    ));
}

#[tokio::test]
async fn test_simultaneous_completions_schedule_one_successor() {
    let (pool, vehicle_id) = setup().await;
    let item = future::create(
        &pool,
        &NewFutureMaintenance {
            vehicle_id,
            maintenance_type: "Cabin filter".to_string(),
            target_mileage: Some(45_000),
            is_recurring: true,
            recurrence_interval_miles: Some(15_000),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let today = ymd(2024, 6, 1);
    let (first, second) = tokio::join!(
        future::complete(&pool, item.id, today),
        future::complete(&pool, item.id, today),
    );
    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|r| matches!(r, Err(Error::InvalidInput(_)))));

    let active = future::list_for_vehicle(&pool, vehicle_id, true).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].target_mileage, Some(60_000));
}

#[tokio::test]
async fn test_future_item_requires_target() {
    let (pool, vehicle_id) = setup().await;
    let err = future::create(
        &pool,
        &NewFutureMaintenance {
            vehicle_id,
            maintenance_type: "Spark plugs".to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
async fn test_notification_feed_from_database() {
    let (pool, vehicle_id) = setup().await;
    let today = ymd(2024, 6, 1);

    maintenance::create_record(
        &pool,
        &NewMaintenanceRecord {
            vehicle_id,
            date: Some(ymd(2024, 5, 1)),
            mileage: 40_000,
            description: "Oil change".to_string(),
            is_oil_change: true,
            ..Default::default()
        },
    )
    .await
    .unwrap();
    maintenance::record_mileage_update(&pool, vehicle_id, 44_700, today)
        .await
        .unwrap();
    future::create(
        &pool,
        &NewFutureMaintenance {
            vehicle_id,
            maintenance_type: "Inspection".to_string(),
            target_date: Some(ymd(2024, 6, 20)),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let feed = reminders::notifications(&pool, today, &ReminderConfig::default())
        .await
        .unwrap();

    assert_eq!(feed.total_count, 2);
    assert!(!feed.has_overdue);
    assert!(feed
        .notifications
        .iter()
        .all(|n| n.urgency == reminders::Urgency::Medium));
}

// =============================================================================
// Subscriptions and accounts
// =============================================================================

#[tokio::test]
async fn test_subscription_lifecycle() {
    let (pool, vehicle_id) = setup().await;
    let sub = subscriptions::create(
        &pool,
        &NewEmailSubscription {
            vehicle_id,
            email_address: " Me@Example.com ".to_string(),
            reminder_frequency_days: 7,
        },
    )
    .await
    .unwrap();
    assert_eq!(sub.email_address, "me@example.com");
    assert!(sub.is_active);

    let dup = subscriptions::create(
        &pool,
        &NewEmailSubscription {
            vehicle_id,
            email_address: "me@example.com".to_string(),
            reminder_frequency_days: 7,
        },
    )
    .await;
    assert!(matches!(dup, Err(Error::Conflict(_))));

    let paused = subscriptions::set_active(&pool, sub.id, false).await.unwrap();
    assert!(!paused.is_active);
    assert!(subscriptions::list_active(&pool).await.unwrap().is_empty());

    subscriptions::delete(&pool, sub.id).await.unwrap();
    assert!(subscriptions::list(&pool).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_switching_default_account() {
    let pool = init_memory_database().await.unwrap();
    let original = accounts::get_default_account(&pool, "owner").await.unwrap();
    let work = accounts::create_account(&pool, "owner", "Work fleet").await.unwrap();
    assert!(!work.is_default);

    accounts::set_default_account(&pool, "owner", &work.id).await.unwrap();

    let default = accounts::get_default_account(&pool, "owner").await.unwrap();
    assert_eq!(default.id, work.id);
    let all = accounts::list_accounts(&pool, "owner").await.unwrap();
    assert_eq!(all.iter().filter(|a| a.is_default).count(), 1);
    assert!(all.iter().any(|a| a.id == original.id && !a.is_default));

    assert!(matches!(
        accounts::create_account(&pool, "owner", "Work fleet").await,
        Err(Error::Conflict(_))
    ));
}
