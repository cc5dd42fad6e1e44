//! Wide-to-long reshaping and the metadata join.

use std::collections::BTreeMap;

use ev_sales_models::{Category, LongRecord, SeriesMetadata, WideRecord};

/// Pivots wide records into long records.
///
/// Each wide record yields one long record per [`Category`], in
/// `bev, phev, hev, totalldv` order. `attributes` is left empty; see
/// [`join_metadata`].
#[must_use]
pub fn melt(records: &[WideRecord]) -> Vec<LongRecord> {
    records
        .iter()
        .flat_map(|record| {
            Category::ALL.into_iter().map(move |category| LongRecord {
                series_id: category.series_id(),
                date: record.date,
                value: record.get(category),
                attributes: BTreeMap::new(),
            })
        })
        .collect()
}

/// Rebuilds wide records from long records produced by [`melt`].
///
/// Records whose `series_id` is not a known category are ignored. Output
/// is ordered by date.
#[must_use]
pub fn unmelt(records: &[LongRecord]) -> Vec<WideRecord> {
    let mut by_date: BTreeMap<chrono::NaiveDate, WideRecord> = BTreeMap::new();

    for record in records {
        let Some(category) = Category::from_series_id(&record.series_id) else {
            continue;
        };
        by_date
            .entry(record.date)
            .or_insert_with(|| WideRecord::empty(record.date))
            .set(category, record.value);
    }

    by_date.into_values().collect()
}

/// Left-joins `records` against `metadata` on `series_id`.
///
/// Records without a metadata entry are kept with empty attributes.
#[must_use]
pub fn join_metadata(records: Vec<LongRecord>, metadata: &SeriesMetadata) -> Vec<LongRecord> {
    let mut unmatched = 0usize;

    let joined: Vec<LongRecord> = records
        .into_iter()
        .map(|mut record| {
            match metadata.get(&record.series_id) {
                Some(attrs) => record.attributes.clone_from(attrs),
                None => unmatched += 1,
            }
            record
        })
        .collect();

    if unmatched > 0 {
        log::warn!("{unmatched} record(s) have no series metadata; attributes left empty");
    }

    joined
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn date(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    fn sample() -> Vec<WideRecord> {
        vec![
            WideRecord {
                date: date(2023, 1),
                bev: Some(1234),
                phev: Some(56),
                hev: Some(7),
                total_ldv: Some(1297),
            },
            WideRecord {
                date: date(2023, 2),
                bev: None,
                phev: Some(60),
                hev: Some(8),
                total_ldv: Some(1400),
            },
        ]
    }

    #[test]
    fn melts_one_row_per_category() {
        let long = melt(&sample()[..1]);

        let pairs: Vec<(&str, Option<i64>)> = long
            .iter()
            .map(|r| (r.series_id.as_str(), r.value))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("bev", Some(1234)),
                ("phev", Some(56)),
                ("hev", Some(7)),
                ("totalldv", Some(1297)),
            ]
        );
        assert!(long.iter().all(|r| r.date == date(2023, 1)));
    }

    #[test]
    fn melt_then_unmelt_round_trips() {
        let wide = sample();
        assert_eq!(unmelt(&melt(&wide)), wide);
    }

    #[test]
    fn empty_input_melts_to_empty_output() {
        assert!(melt(&[]).is_empty());
        assert!(unmelt(&[]).is_empty());
    }

    #[test]
    fn left_join_keeps_unmatched_rows() {
        let metadata = SeriesMetadata::new(BTreeMap::from([(
            "bev".to_owned(),
            BTreeMap::from([("description".to_owned(), "Battery electric".to_owned())]),
        )]));

        let joined = join_metadata(melt(&sample()[..1]), &metadata);

        assert_eq!(joined.len(), 4);
        assert_eq!(joined[0].attributes["description"], "Battery electric");
        assert!(joined[1..].iter().all(|r| r.attributes.is_empty()));
    }
}
