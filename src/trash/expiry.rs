use crate::clock::MILLIS_PER_DAY;

const MILLIS_PER_HOUR: i64 = 3_600_000;
const MILLIS_PER_MINUTE: i64 = 60_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiryStatus {
    pub label: String,
    pub expired: bool,
    pub indefinite: bool,
}

pub(crate) fn is_expired(deleted_at: i64, retention_millis: Option<i64>, now: i64) -> bool {
    match retention_millis {
        Some(retention) => now.saturating_sub(deleted_at) >= retention,
        None => false,
    }
}

pub(crate) fn expiry_status(
    deleted_at: i64,
    retention_millis: Option<i64>,
    now: i64,
) -> ExpiryStatus {
    let Some(retention) = retention_millis else {
        return ExpiryStatus {
            label: "Kept until emptied".into(),
            expired: false,
            indefinite: true,
        };
    };

    let remaining = deleted_at.saturating_add(retention) - now;
    if remaining <= 0 {
        return ExpiryStatus {
            label: "Expired".into(),
            expired: true,
            indefinite: false,
        };
    }

    let label = if remaining >= MILLIS_PER_DAY * 2 {
        format!("{}d left", remaining / MILLIS_PER_DAY)
    } else if remaining >= MILLIS_PER_DAY {
        let days = remaining / MILLIS_PER_DAY;
        let hours = (remaining % MILLIS_PER_DAY) / MILLIS_PER_HOUR;
        if hours == 0 {
            format!("{days}d left")
        } else {
            format!("{days}d {hours}h left")
        }
    } else if remaining >= MILLIS_PER_HOUR {
        format!("{}h left", ceil_div(remaining, MILLIS_PER_HOUR))
    } else {
        format!("{}m left", ceil_div(remaining, MILLIS_PER_MINUTE))
    };

    ExpiryStatus {
        label,
        expired: false,
        indefinite: false,
    }
}

fn ceil_div(value: i64, unit: i64) -> i64 {
    (value + unit - 1) / unit
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: i64 = MILLIS_PER_DAY;
    const RETENTION: Option<i64> = Some(30 * DAY);

    #[test]
    fn zero_retention_is_indefinite() {
        let status = expiry_status(0, None, 100 * DAY);
        assert_eq!(status.label, "Kept until emptied");
        assert!(status.indefinite);
        assert!(!status.expired);
        assert!(!is_expired(0, None, i64::MAX));
    }

    #[test]
    fn countdown_labels_shrink_with_time() {
        let deleted_at = 1_000 * DAY;
        assert_eq!(expiry_status(deleted_at, RETENTION, deleted_at + DAY).label, "29d left");
        assert_eq!(
            expiry_status(deleted_at, RETENTION, deleted_at + 28 * DAY + 19 * MILLIS_PER_HOUR)
                .label,
            "1d 5h left"
        );
        assert_eq!(
            expiry_status(deleted_at, RETENTION, deleted_at + 30 * DAY - 5 * MILLIS_PER_HOUR).label,
            "5h left"
        );
        assert_eq!(
            expiry_status(deleted_at, RETENTION, deleted_at + 30 * DAY - 90_000).label,
            "2m left"
        );
    }

    #[test]
    fn exactly_at_retention_is_expired() {
        let status = expiry_status(0, RETENTION, 30 * DAY);
        assert!(status.expired);
        assert_eq!(status.label, "Expired");
        assert!(is_expired(0, RETENTION, 30 * DAY));
        assert!(!is_expired(0, RETENTION, 30 * DAY - 1));
    }
}
