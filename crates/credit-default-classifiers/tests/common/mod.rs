//! Synthetic credit-card records shared by the integration tests.
#![allow(dead_code)]

use credit_default_classifiers::config::{default_grid, SearchConfig};
use credit_default_classifiers::data_handling::{feature_columns, Table, ID_COLUMN, RAW_LABEL_COLUMN};
use credit_default_classifiers::metrics::Scoring;
use credit_default_classifiers::model_selection::ParamValue;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// One raw row; defaulters carry higher payment delays and lower limits.
fn synthetic_row(rng: &mut StdRng, id: usize, defaulted: bool) -> Vec<Option<f64>> {
    let delay_shift = if defaulted { 2 } else { 0 };
    let limit = if defaulted {
        rng.gen_range(10..120) as f64 * 1000.0
    } else {
        rng.gen_range(80..400) as f64 * 1000.0
    };

    let mut row = Vec::with_capacity(25);
    row.push(Some(id as f64));
    row.push(Some(limit));
    row.push(Some(rng.gen_range(1..=2) as f64)); // SEX
    row.push(Some(rng.gen_range(1..=4) as f64)); // EDUCATION
    row.push(Some(rng.gen_range(1..=3) as f64)); // MARRIAGE
    row.push(Some(rng.gen_range(21..70) as f64)); // AGE
    for _ in 0..6 {
        row.push(Some((rng.gen_range(-2..2) + delay_shift) as f64)); // PAY_*
    }
    for _ in 0..6 {
        row.push(Some(rng.gen_range(0.0..0.9) * limit)); // BILL_AMT*
    }
    for _ in 0..6 {
        let paid = if defaulted { rng.gen_range(0.0..2000.0) } else { rng.gen_range(1000.0..20000.0) };
        row.push(Some(paid)); // PAY_AMT*
    }
    row.push(Some(defaulted as i32 as f64));
    row
}

pub fn raw_columns() -> Vec<String> {
    let mut columns = vec![ID_COLUMN.to_string()];
    columns.extend(feature_columns());
    columns.push(RAW_LABEL_COLUMN.to_string());
    columns
}

/// A complete raw table with `n` rows of which `positives` defaulted,
/// interleaved so every stretch of rows mixes both classes.
pub fn raw_table(n: usize, positives: usize, seed: u64) -> Table {
    let mut rng = StdRng::seed_from_u64(seed);
    let rows = (0..n)
        .map(|i| {
            let defaulted = i * positives / n != (i + 1) * positives / n;
            synthetic_row(&mut rng, i + 1, defaulted)
        })
        .collect();
    Table::new(raw_columns(), rows)
}

/// The tuned grid with the epoch cap lowered so tests stay fast.
pub fn quick_search(n_splits: usize) -> SearchConfig {
    let mut grid = default_grid();
    grid.insert("classifier.max_iter", vec![ParamValue::Int(40)]);
    SearchConfig {
        n_splits,
        scoring: Scoring::BalancedAccuracy,
        parallel: true,
        grid,
    }
}

pub fn count_positives(table: &Table, label: &str) -> usize {
    let idx = table.column_index(label).unwrap();
    table.rows.iter().filter(|r| r[idx] == Some(1.0)).count()
}
