use serde::Serialize;

/// Result of a list read as the client sees it. A failed read is reported as
/// such instead of being papered over with placeholder data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "lowercase")]
pub enum FetchOutcome<T> {
    Ready(T),
    Empty,
    Failed(String),
}

impl<T> FetchOutcome<Vec<T>> {
    pub fn from_list<E: std::fmt::Display>(result: Result<Vec<T>, E>, what: &str) -> Self {
        match result {
            Ok(items) if items.is_empty() => FetchOutcome::Empty,
            Ok(items) => FetchOutcome::Ready(items),
            Err(e) => {
                tracing::warn!(error = %e, what, "list fetch failed");
                FetchOutcome::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_list_results() {
        let ready: FetchOutcome<Vec<i32>> = FetchOutcome::from_list(Ok::<_, String>(vec![1]), "nums");
        assert_eq!(ready, FetchOutcome::Ready(vec![1]));

        let empty: FetchOutcome<Vec<i32>> = FetchOutcome::from_list(Ok::<_, String>(vec![]), "nums");
        assert_eq!(empty, FetchOutcome::Empty);

        let failed: FetchOutcome<Vec<i32>> =
            FetchOutcome::from_list(Err("disk gone".to_string()), "nums");
        assert_eq!(failed, FetchOutcome::Failed("disk gone".to_string()));
    }

    #[test]
    fn serializes_with_status_tag() {
        let value = serde_json::to_value(FetchOutcome::Ready(vec![1, 2])).unwrap();
        assert_eq!(value, serde_json::json!({ "status": "ready", "data": [1, 2] }));

        let value = serde_json::to_value(FetchOutcome::<Vec<i32>>::Empty).unwrap();
        assert_eq!(value, serde_json::json!({ "status": "empty" }));
    }
}
