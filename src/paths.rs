//! Document paths owned by a user.

use chrono::NaiveDate;

/// ISO `YYYY-MM-DD` key used for per-day documents.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Root account document created at sign-up.
pub fn user_root(uid: &str) -> String {
    format!("users/{}", uid)
}

pub fn user_profile(uid: &str) -> String {
    format!("users/{}/userProfile/{}", uid, uid)
}

pub fn calorie_budget(uid: &str, date: NaiveDate) -> String {
    format!("users/{}/calorieBudgets/{}", uid, date_key(date))
}

pub fn daily_stats(uid: &str, date: NaiveDate) -> String {
    format!("users/{}/dailyStats/{}", uid, date_key(date))
}

pub fn daily_stats_collection(uid: &str) -> String {
    format!("users/{}/dailyStats", uid)
}

pub fn todos(uid: &str) -> String {
    format!("users/{}/todos", uid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_scoped_to_the_user() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(user_profile("u1"), "users/u1/userProfile/u1");
        assert_eq!(calorie_budget("u1", date), "users/u1/calorieBudgets/2024-03-09");
        assert_eq!(daily_stats("u1", date), "users/u1/dailyStats/2024-03-09");
        assert_eq!(todos("u1"), "users/u1/todos");
    }
}
