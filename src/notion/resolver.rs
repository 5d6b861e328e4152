//! Resolves (database, display name) pairs to page ids, creating a lookup
//! page on first reference. A run-scoped cache keeps resolution deterministic
//! and avoids duplicate creation within a single linear run; nothing persists
//! across runs, so every run re-queries the destination on first reference
//! per key.

use std::collections::{BTreeMap, HashMap};

use crate::error::Result;
use crate::notion::client::NotionClient;
use crate::notion::models::{
    CreatePageRequest, Icon, Parent, QueryDatabaseRequest, RichText, TitleEqualsFilter,
};
use crate::notion::property::PropertyValue;

/// Name of the title property on every lookup database.
pub const LOOKUP_TITLE: &str = "标题";

/// Query-before-create resolver with an in-memory cache. Single-threaded use
/// only; callers hold it `&mut`.
#[derive(Debug, Default)]
pub struct RelationResolver {
    cache: HashMap<(String, String), String>,
}

impl RelationResolver {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn prime(&mut self, database_id: &str, name: &str, page_id: &str) {
        self.cache
            .insert((database_id.into(), name.into()), page_id.into());
    }

    /// Returns the page id for `name` in the given database, creating the
    /// page (with the extra properties and icon) if it does not exist yet.
    /// Resolving the same (database, name) twice yields the same id.
    pub async fn resolve(
        &mut self,
        client: &NotionClient,
        name: &str,
        database_id: &str,
        icon_url: &str,
        mut extra_properties: BTreeMap<String, PropertyValue>,
    ) -> Result<String> {
        let key = (database_id.to_string(), name.to_string());
        if let Some(id) = self.cache.get(&key) {
            return Ok(id.clone());
        }

        let query = QueryDatabaseRequest {
            filter: Some(TitleEqualsFilter::new(LOOKUP_TITLE, name)),
            start_cursor: None,
            page_size: None,
        };
        let response = client.query_database(database_id, &query).await?;

        let page_id = match response.results.into_iter().next() {
            Some(page) => page.id,
            None => {
                extra_properties.insert(
                    LOOKUP_TITLE.into(),
                    PropertyValue::Title {
                        title: vec![RichText::text(name)],
                    },
                );
                let request = CreatePageRequest {
                    parent: Parent::database(database_id),
                    properties: extra_properties,
                    icon: Some(Icon::external(icon_url)),
                };
                client.create_page(&request).await?.id
            }
        };

        self.cache.insert(key, page_id.clone());
        Ok(page_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RetryPolicy;

    // A cached key must short-circuit before any transport use; the client
    // points at an unroutable endpoint to prove it.
    #[tokio::test]
    async fn cache_hit_skips_the_network() {
        let client =
            NotionClient::new("unused", RetryPolicy::immediate(1)).with_base_url("http://[::1]:1");
        let mut resolver = RelationResolver::new();
        resolver.prime("db-1", "剧情", "page-1");

        let id = resolver
            .resolve(&client, "剧情", "db-1", "https://example.com/icon.svg", BTreeMap::new())
            .await
            .unwrap();
        assert_eq!(id, "page-1");

        let again = resolver
            .resolve(&client, "剧情", "db-1", "https://example.com/icon.svg", BTreeMap::new())
            .await
            .unwrap();
        assert_eq!(again, "page-1");
    }

    #[tokio::test]
    async fn cache_is_keyed_per_database() {
        let client =
            NotionClient::new("unused", RetryPolicy::immediate(1)).with_base_url("http://[::1]:1");
        let mut resolver = RelationResolver::new();
        resolver.prime("db-1", "剧情", "page-1");
        resolver.prime("db-2", "剧情", "page-2");

        let one = resolver
            .resolve(&client, "剧情", "db-1", "icon", BTreeMap::new())
            .await
            .unwrap();
        let two = resolver
            .resolve(&client, "剧情", "db-2", "icon", BTreeMap::new())
            .await
            .unwrap();
        assert_ne!(one, two);
    }
}
