use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};

/// 秒级时间戳转为 UTC 时间，非法值回退到 Unix 纪元
pub fn from_unix(ts: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(ts, 0).unwrap_or_default()
}

pub fn opt_from_unix(ts: Option<i64>) -> Option<DateTime<Utc>> {
    ts.and_then(|t| DateTime::<Utc>::from_timestamp(t, 0))
}

/// 给定时刻所在自然月的第一秒（UTC）
pub fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_start() {
        let now = Utc.with_ymd_and_hms(2025, 3, 17, 14, 5, 9).unwrap();
        assert_eq!(
            month_start(now),
            Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_from_unix() {
        assert_eq!(from_unix(0).timestamp(), 0);
        assert_eq!(opt_from_unix(None), None);
        assert_eq!(opt_from_unix(Some(86400)).map(|d| d.timestamp()), Some(86400));
    }
}
