#![allow(clippy::unwrap_used)]

use chrono::NaiveDate;
use rust_decimal_macros::dec;

use super::*;

fn period(s: &str) -> Period {
    s.parse().unwrap()
}

fn saved_path(outcome: ChartOutcome) -> PathBuf {
    match outcome {
        ChartOutcome::Saved(path) => path,
        ChartOutcome::NoData => panic!("expected a saved chart"),
    }
}

#[test]
fn test_file_name_scheme() {
    let at = NaiveDate::from_ymd_opt(2025, 3, 7)
        .unwrap()
        .and_hms_milli_opt(14, 5, 9, 42)
        .unwrap();
    assert_eq!(
        chart_file_name(12, "monthly_trend", at),
        "user_12_monthly_trend_20250307140509042.svg"
    );
}

#[test]
fn test_empty_tables_produce_no_data() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("charts");
    let renderer = ChartRenderer::new(&out);

    assert_eq!(renderer.monthly_trend(&[], 1).unwrap(), ChartOutcome::NoData);
    assert_eq!(
        renderer.category_breakdown(&[], 1).unwrap(),
        ChartOutcome::NoData
    );
    assert_eq!(renderer.top_merchants(&[], 1).unwrap(), ChartOutcome::NoData);
    assert_eq!(
        renderer
            .budget_vs_actual(&[], 1, period("2025-03"))
            .unwrap(),
        ChartOutcome::NoData
    );
    // Nothing drawn, so the directory was never created
    assert!(!out.exists());
    assert_eq!(ChartOutcome::NoData.to_string(), "No data available to plot.");
}

#[test]
fn test_monthly_trend_saved() {
    let dir = tempfile::tempdir().unwrap();
    let renderer = ChartRenderer::new(dir.path().join("nested/out"));
    let rows = vec![
        MonthlyTotal {
            month: period("2025-03"),
            total: dec!(80),
        },
        MonthlyTotal {
            month: period("2025-04"),
            total: dec!(1000),
        },
    ];
    let path = saved_path(renderer.monthly_trend(&rows, 7).unwrap());

    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("user_7_monthly_trend_"));
    assert!(name.ends_with(".svg"));

    let body = std::fs::read_to_string(&path).unwrap();
    assert!(body.starts_with("<svg"));
    assert!(body.contains("Monthly Expense Trend"));
    assert!(body.contains("2025-04"));
}

#[test]
fn test_category_breakdown_saved_as_pie() {
    let dir = tempfile::tempdir().unwrap();
    let renderer = ChartRenderer::new(dir.path());
    let rows = vec![
        CategoryTotal {
            category: "Rent".into(),
            total: dec!(1000),
        },
        CategoryTotal {
            category: "Bills & Fees".into(),
            total: dec!(250),
        },
    ];
    let path = saved_path(renderer.category_breakdown(&rows, 3).unwrap());
    let body = std::fs::read_to_string(path).unwrap();
    assert!(body.contains("Rent (80.0%)"));
    assert!(body.contains("Bills &amp; Fees (20.0%)"));
}

#[test]
fn test_top_merchants_saved() {
    let dir = tempfile::tempdir().unwrap();
    let renderer = ChartRenderer::new(dir.path());
    let rows = vec![MerchantTotal {
        merchant: "Corner Cafe".into(),
        total: dec!(27.50),
    }];
    let path = saved_path(renderer.top_merchants(&rows, 3).unwrap());
    assert!(path
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("user_3_top_merchants_"));
    assert!(std::fs::read_to_string(path).unwrap().contains("Corner Cafe"));
}

#[test]
fn test_budget_vs_actual_file_name_includes_period() {
    let dir = tempfile::tempdir().unwrap();
    let renderer = ChartRenderer::new(dir.path());
    let rows = vec![BudgetComparison::new("Food".into(), dec!(100), dec!(80))];
    let path = saved_path(
        renderer
            .budget_vs_actual(&rows, 5, period("2025-03"))
            .unwrap(),
    );
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("user_5_budget_vs_actual_2025_03_"));
    let body = std::fs::read_to_string(path).unwrap();
    assert!(body.contains("Budget vs Actual Spending for 2025-03"));
}

#[test]
fn test_unwritable_output_dir_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    // A regular file where the directory should be
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "x").unwrap();

    let renderer = ChartRenderer::new(&blocker);
    let rows = vec![CategoryTotal {
        category: "Food".into(),
        total: dec!(1),
    }];
    let err = renderer.category_breakdown(&rows, 1).unwrap_err();
    assert!(matches!(err, ChartError::CreateDir { .. }));
    assert!(err.to_string().contains("not-a-dir"));
}

#[test]
fn test_save_keeps_earlier_chart_with_same_name() {
    let dir = tempfile::tempdir().unwrap();
    let renderer = ChartRenderer::new(dir.path());

    let first = saved_path(renderer.save("user_1_monthly_trend_x.svg", "<svg>a</svg>").unwrap());
    let second = saved_path(renderer.save("user_1_monthly_trend_x.svg", "<svg>b</svg>").unwrap());
    let third = saved_path(renderer.save("user_1_monthly_trend_x.svg", "<svg>c</svg>").unwrap());

    assert_eq!(first, dir.path().join("user_1_monthly_trend_x.svg"));
    assert_eq!(second, dir.path().join("user_1_monthly_trend_x_1.svg"));
    assert_eq!(third, dir.path().join("user_1_monthly_trend_x_2.svg"));
    assert_eq!(std::fs::read_to_string(&first).unwrap(), "<svg>a</svg>");
    assert_eq!(std::fs::read_to_string(&second).unwrap(), "<svg>b</svg>");
}

#[test]
fn test_back_to_back_renders_write_separate_files() {
    let dir = tempfile::tempdir().unwrap();
    let renderer = ChartRenderer::new(dir.path());
    let rows = vec![MerchantTotal {
        merchant: "Cafe".into(),
        total: dec!(12),
    }];
    renderer.top_merchants(&rows, 1).unwrap();
    renderer.top_merchants(&rows, 1).unwrap();
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
}
