use serde::{Deserialize, Deserializer};

pub mod auth;
pub mod dashboard;
pub mod orders;
pub mod price_policies;
pub mod products;
pub mod settlements;
pub mod users;

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`).
pub(crate) fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use uuid::Uuid;

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "super::nullable")]
        parent_id: Option<Option<Uuid>>,
    }

    #[test]
    fn nullable_keeps_absent_and_null_apart() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.parent_id, None);
        let null: Patch = serde_json::from_str(r#"{"parent_id": null}"#).unwrap();
        assert_eq!(null.parent_id, Some(None));
    }
}
