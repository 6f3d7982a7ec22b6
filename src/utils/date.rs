use chrono::{Datelike, NaiveDate};

const MONTHS_PT_BR: [&str; 12] = [
    "jan.", "fev.", "mar.", "abr.", "mai.", "jun.", "jul.", "ago.", "set.", "out.", "nov.", "dez.",
];

/// Day label as shown in the listing: "Hoje", "Ontem", or the pt-BR
/// day/month/year form. `today` is passed in so callers control the
/// reference day.
pub fn format_date_label(date: NaiveDate, today: NaiveDate) -> String {
    if date == today {
        return "Hoje".to_string();
    }

    if today.pred_opt() == Some(date) {
        return "Ontem".to_string();
    }

    format!(
        "{} de {} de {}",
        date.day(),
        MONTHS_PT_BR[date.month0() as usize],
        date.year()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_today_and_yesterday() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();

        assert_eq!(format_date_label(today, today), "Hoje");
        assert_eq!(
            format_date_label(NaiveDate::from_ymd_opt(2026, 8, 5).unwrap(), today),
            "Ontem"
        );
    }

    #[test]
    fn older_dates_use_pt_br_form() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();

        assert_eq!(
            format_date_label(NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(), today),
            "1 de ago. de 2026"
        );
        assert_eq!(
            format_date_label(NaiveDate::from_ymd_opt(2025, 12, 25).unwrap(), today),
            "25 de dez. de 2025"
        );
    }

    #[test]
    fn tomorrow_is_not_yesterday() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();

        assert_eq!(
            format_date_label(NaiveDate::from_ymd_opt(2026, 8, 7).unwrap(), today),
            "7 de ago. de 2026"
        );
    }
}
