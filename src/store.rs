use std::collections::HashMap;
use std::ops::Range;

use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::user::{User, UserListQuery, UserListResponse, UserPayload};

pub const DEFAULT_PAGE: usize = 1;
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// In-memory user directory.
///
/// Mutations hold the write lock for the whole call, reads share the read
/// lock. Guards never escape a method, so callers in async handlers cannot
/// hold them across an await point.
#[derive(Debug, Default)]
pub struct UserStore {
    users: RwLock<HashMap<String, User>>,
}

/// Page request after defaults are applied. Both fields are at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: usize,
    pub page_size: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    /// Parses raw query values. Anything missing, non-numeric or below 1
    /// falls back to the default for that field.
    pub fn from_raw(page: Option<&str>, page_size: Option<&str>) -> Self {
        Self {
            page: parse_positive(page).unwrap_or(DEFAULT_PAGE),
            page_size: parse_positive(page_size).unwrap_or(DEFAULT_PAGE_SIZE),
        }
    }

    /// Index range of this page within `total` filtered records.
    /// Pages past the end yield an empty range at `total`.
    pub fn window(&self, total: usize) -> Range<usize> {
        let start = (self.page - 1).saturating_mul(self.page_size).min(total);
        let end = start.saturating_add(self.page_size).min(total);
        start..end
    }
}

fn parse_positive(raw: Option<&str>) -> Option<usize> {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|n| *n >= 1)
        .and_then(|n| usize::try_from(n).ok())
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, payload: UserPayload) -> User {
        let now = Utc::now();
        let user = User::from_payload(Uuid::new_v4().to_string(), payload, now, now);

        self.users.write().insert(user.id.clone(), user.clone());
        tracing::debug!(id = %user.id, "user inserted");
        user
    }

    pub fn get(&self, id: &str) -> Result<User, StoreError> {
        self.users
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }

    /// Replaces every client-writable field. `id` and `created_at` come from
    /// the existing record, `updated_at` is refreshed.
    pub fn update(&self, id: &str, payload: UserPayload) -> Result<User, StoreError> {
        let mut users = self.users.write();
        let existing = users
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;

        let updated_at = Utc::now().max(existing.updated_at);
        let updated = User::from_payload(id.to_string(), payload, existing.created_at, updated_at);
        *existing = updated.clone();
        Ok(updated)
    }

    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.users
            .write()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }

    /// Filters by country (case-insensitive, empty matches all), orders by
    /// `(created_at, id)` and returns one page plus the filtered total.
    pub fn list(&self, country: &str, pagination: Pagination) -> UserListResponse {
        let mut matched: Vec<User> = self
            .users
            .read()
            .values()
            .filter(|user| user.country_matches(country))
            .cloned()
            .collect();

        matched.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

        let total = matched.len();
        let users = matched.drain(pagination.window(total)).collect();
        UserListResponse { total, users }
    }

    pub fn list_query(&self, query: &UserListQuery) -> UserListResponse {
        let pagination = Pagination::from_raw(query.page.as_deref(), query.page_size.as_deref());
        self.list(query.country.as_deref().unwrap_or_default(), pagination)
    }

    pub(crate) fn len(&self) -> usize {
        self.users.read().len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn payload(first_name: &str, country: &str) -> UserPayload {
        UserPayload {
            first_name: first_name.into(),
            last_name: "Smith".into(),
            nickname: format!("{first_name}123"),
            password: "securepassword".into(),
            email: format!("{first_name}@example.com"),
            country: country.into(),
        }
    }

    fn seeded() -> UserStore {
        let store = UserStore::new();
        store.add(payload("Alice", "UK"));
        store.add(payload("Bob", "UK"));
        store.add(payload("Charlie", "uk"));
        store.add(payload("Shri", "India"));
        store
    }

    #[test]
    fn add_assigns_id_and_equal_timestamps() {
        let store = UserStore::new();
        let user = store.add(payload("Alice", "UK"));

        assert!(!user.id.is_empty());
        assert!(Uuid::parse_str(&user.id).is_ok());
        assert_eq!(user.created_at, user.updated_at);
        assert_eq!(user.first_name, "Alice");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn get_returns_what_add_returned() {
        let store = UserStore::new();
        let created = store.add(payload("Alice", "UK"));

        assert_eq!(store.get(&created.id), Ok(created));
    }

    #[test]
    fn get_unknown_id_is_not_found() {
        let store = UserStore::new();
        assert_eq!(
            store.get("missing"),
            Err(StoreError::NotFound {
                id: "missing".into()
            })
        );
    }

    #[test]
    fn update_preserves_id_and_created_at() {
        let store = UserStore::new();
        let created = store.add(payload("John", "US"));

        let updated = store.update(&created.id, payload("Jane", "US")).unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(updated.first_name, "Jane");
        assert_eq!(store.get(&created.id).unwrap(), updated);
    }

    #[test]
    fn update_replaces_wholesale() {
        let store = UserStore::new();
        let created = store.add(payload("John", "US"));

        let updated = store
            .update(
                &created.id,
                UserPayload {
                    first_name: "Jane".into(),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.first_name, "Jane");
        assert_eq!(updated.email, "");
        assert_eq!(updated.country, "");
        assert_eq!(updated.password, "");
    }

    #[test]
    fn update_unknown_id_is_not_found_and_changes_nothing() {
        let store = seeded();
        assert!(store.update("missing", payload("X", "UK")).is_err());
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn delete_then_get_is_not_found() {
        let store = UserStore::new();
        let created = store.add(payload("Test", "Canada"));

        assert_eq!(store.delete(&created.id), Ok(()));
        assert!(store.get(&created.id).is_err());
        assert!(store.delete(&created.id).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn list_filters_by_country_and_pages() {
        let store = seeded();

        let first = store.list("UK", Pagination { page: 1, page_size: 2 });
        assert_eq!(first.total, 3);
        assert_eq!(first.users.len(), 2);

        let second = store.list("UK", Pagination { page: 2, page_size: 2 });
        assert_eq!(second.total, 3);
        assert_eq!(second.users.len(), 1);

        let mut seen: HashSet<String> = first.users.iter().map(|u| u.id.clone()).collect();
        seen.extend(second.users.iter().map(|u| u.id.clone()));
        assert_eq!(seen.len(), 3);
        assert!(first
            .users
            .iter()
            .chain(second.users.iter())
            .all(|u| u.country.eq_ignore_ascii_case("uk")));
    }

    #[test]
    fn list_without_filter_returns_everything() {
        let store = seeded();
        let page = store.list("", Pagination::default());
        assert_eq!(page.total, 4);
        assert_eq!(page.users.len(), 4);
    }

    #[test]
    fn list_past_last_page_is_empty_with_total() {
        let store = seeded();
        let page = store.list("UK", Pagination { page: 5, page_size: 2 });
        assert_eq!(page.total, 3);
        assert!(page.users.is_empty());

        let huge = store.list("", Pagination { page: usize::MAX, page_size: usize::MAX });
        assert_eq!(huge.total, 4);
        assert!(huge.users.is_empty());
    }

    #[test]
    fn list_orders_by_creation() {
        let store = seeded();
        let page = store.list("", Pagination::default());
        let keys: Vec<_> = page.users.iter().map(|u| (u.created_at, u.id.clone())).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn pagination_defaults_for_bad_input() {
        assert_eq!(Pagination::from_raw(None, None), Pagination::default());
        assert_eq!(Pagination::from_raw(Some("0"), Some("-3")), Pagination::default());
        assert_eq!(Pagination::from_raw(Some("abc"), Some("")), Pagination::default());
        assert_eq!(
            Pagination::from_raw(Some("3"), Some("25")),
            Pagination { page: 3, page_size: 25 }
        );
    }

    #[test]
    fn window_clamps_to_total() {
        let p = Pagination { page: 2, page_size: 2 };
        assert_eq!(p.window(3), 2..3);
        assert_eq!(p.window(1), 1..1);
        assert_eq!(Pagination::default().window(0), 0..0);
    }

    #[test]
    fn concurrent_adds_are_not_lost() {
        let store = Arc::new(UserStore::new());
        let threads = 16;
        let per_thread = 50;

        let ids: Vec<String> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..threads)
                .map(|t| {
                    let store = Arc::clone(&store);
                    s.spawn(move || {
                        (0..per_thread)
                            .map(|i| store.add(payload(&format!("user{t}_{i}"), "UK")).id)
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        });

        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), threads * per_thread);
        assert_eq!(store.len(), threads * per_thread);
        assert_eq!(store.list("uk", Pagination::default()).total, threads * per_thread);
    }
}
