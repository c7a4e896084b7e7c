use dance_cohorts::schema::record;
use polars::prelude::*;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// One raw roster row: (dancer, year, season, session, class, location).
pub type Row<'a> = (&'a str, &'a str, &'a str, &'a str, &'a str, &'a str);

pub fn roster(rows: &[Row]) -> DataFrame {
    DataFrame::new(vec![
        Column::new(record::DANCER_ID.into(), rows.iter().map(|r| r.0).collect::<Vec<_>>()),
        Column::new(record::BIRTH_DATE.into(), vec!["03/15/2014"; rows.len()]),
        Column::new(record::YEAR.into(), rows.iter().map(|r| r.1).collect::<Vec<_>>()),
        Column::new(record::SEASON.into(), rows.iter().map(|r| r.2).collect::<Vec<_>>()),
        Column::new(record::SESSION.into(), rows.iter().map(|r| r.3).collect::<Vec<_>>()),
        Column::new(record::CLASS.into(), rows.iter().map(|r| r.4).collect::<Vec<_>>()),
        Column::new(record::LOCATION.into(), rows.iter().map(|r| r.5).collect::<Vec<_>>()),
        Column::new(
            record::SOURCE.into(),
            rows.iter()
                .map(|r| format!("{}-{}-{}{}.xlsx", r.4, r.1, r.2, r.3))
                .collect::<Vec<String>>(),
        ),
    ])
    .unwrap()
}
