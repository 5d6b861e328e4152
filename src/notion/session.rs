//! One workspace session per run: the discovered table ids, the relation
//! resolver cache, and the date-hierarchy helpers, all as explicit fields
//! rather than process globals.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use regex::Regex;

use crate::calendar::{self, Bucket};
use crate::config::DatabaseNames;
use crate::error::{Result, SyncError};
use crate::notion::client::NotionClient;
use crate::notion::property::{date_payload, render_local, PropertyValue};
use crate::notion::resolver::RelationResolver;

pub const TAG_ICON_URL: &str = "https://www.notion.so/icons/tag_gray.svg";
pub const USER_ICON_URL: &str = "https://www.notion.so/icons/user-circle-filled_gray.svg";
pub const TARGET_ICON_URL: &str = "https://www.notion.so/icons/target_red.svg";

/// Property name for a bucket's date range.
const BUCKET_DATE: &str = "日期";

/// Extracts the 32-hex (optionally hyphenated) page id from a Notion URL.
pub fn extract_page_id(url: &str) -> Result<String> {
    let pattern = Regex::new(
        r"([a-f0-9]{32}|[a-f0-9]{8}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{12})",
    )
    .expect("page id pattern is valid");
    pattern
        .find(url)
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| SyncError::InvalidRootUrl(url.to_string()))
}

/// A connected workspace: transport plus the ids of the seven managed tables.
pub struct Workspace {
    pub client: NotionClient,
    pub movie_db: String,
    pub day_db: String,
    pub week_db: String,
    pub month_db: String,
    pub year_db: String,
    pub category_db: String,
    pub director_db: String,
    resolver: RelationResolver,
}

impl Workspace {
    /// Walks the root page's child blocks recursively, collects every
    /// `child_database` by title, and resolves the seven managed table ids.
    /// Any missing table is fatal.
    pub async fn connect(
        client: NotionClient,
        root_url: &str,
        names: &DatabaseNames,
    ) -> Result<Self> {
        let root_id = extract_page_id(root_url)?;
        let mut databases: HashMap<String, String> = HashMap::new();
        let mut pending = vec![root_id];
        while let Some(block_id) = pending.pop() {
            for block in client.list_children(&block_id).await? {
                if block.kind == "child_database" {
                    if let Some(db) = block.child_database {
                        databases.insert(db.title, block.id.clone());
                    }
                } else if block.has_children {
                    pending.push(block.id);
                }
            }
        }
        tracing::debug!("Discovered {} child databases", databases.len());

        let lookup = |name: &str| -> Result<String> {
            databases
                .get(name)
                .cloned()
                .ok_or_else(|| SyncError::MissingDatabase(name.to_string()))
        };

        Ok(Self {
            movie_db: lookup(&names.movie)?,
            day_db: lookup(&names.day)?,
            week_db: lookup(&names.week)?,
            month_db: lookup(&names.month)?,
            year_db: lookup(&names.year)?,
            category_db: lookup(&names.category)?,
            director_db: lookup(&names.director)?,
            client,
            resolver: RelationResolver::new(),
        })
    }

    /// Category lookup record, created on first reference.
    pub async fn category_id(&mut self, name: &str) -> Result<String> {
        self.resolver
            .resolve(&self.client, name, &self.category_db, TAG_ICON_URL, BTreeMap::new())
            .await
    }

    /// Director lookup record, created on first reference.
    pub async fn director_id(&mut self, name: &str) -> Result<String> {
        self.resolver
            .resolve(&self.client, name, &self.director_db, USER_ICON_URL, BTreeMap::new())
            .await
    }

    fn bucket_properties(bucket: &Bucket) -> BTreeMap<String, PropertyValue> {
        let mut properties = BTreeMap::new();
        properties.insert(
            BUCKET_DATE.into(),
            PropertyValue::Date {
                date: Some(date_payload(
                    render_local(&bucket.start),
                    bucket.end.as_ref().map(render_local),
                )),
            },
        );
        properties
    }

    async fn bucket_id(&mut self, bucket: Bucket, table: BucketTable) -> Result<String> {
        let database_id = match table {
            BucketTable::Week => self.week_db.clone(),
            BucketTable::Month => self.month_db.clone(),
            BucketTable::Year => self.year_db.clone(),
        };
        let properties = Self::bucket_properties(&bucket);
        self.resolver
            .resolve(&self.client, &bucket.name, &database_id, TARGET_ICON_URL, properties)
            .await
    }

    pub async fn year_bucket_id(&mut self, date: NaiveDate) -> Result<String> {
        self.bucket_id(calendar::year_bucket(date), BucketTable::Year).await
    }

    pub async fn month_bucket_id(&mut self, date: NaiveDate) -> Result<String> {
        self.bucket_id(calendar::month_bucket(date), BucketTable::Month).await
    }

    pub async fn week_bucket_id(&mut self, date: NaiveDate) -> Result<String> {
        self.bucket_id(calendar::week_bucket(date), BucketTable::Week).await
    }

    /// Day bucket with relation links to its containing year, month, and
    /// week buckets, each resolved bottom-up first.
    pub async fn day_bucket_id(&mut self, date: NaiveDate) -> Result<String> {
        let year = self.year_bucket_id(date).await?;
        let month = self.month_bucket_id(date).await?;
        let week = self.week_bucket_id(date).await?;

        let bucket = calendar::day_bucket(date);
        let mut properties = Self::bucket_properties(&bucket);
        properties.insert("年".into(), relation(year));
        properties.insert("月".into(), relation(month));
        properties.insert("周".into(), relation(week));

        self.resolver
            .resolve(&self.client, &bucket.name, &self.day_db, TARGET_ICON_URL, properties)
            .await
    }

    /// Adds the 年/月/周/日 relation properties for the given local date to a
    /// movie's property set.
    pub async fn attach_date_relations(
        &mut self,
        properties: &mut BTreeMap<String, PropertyValue>,
        date: NaiveDate,
    ) -> Result<()> {
        let year = self.year_bucket_id(date).await?;
        let month = self.month_bucket_id(date).await?;
        let week = self.week_bucket_id(date).await?;
        let day = self.day_bucket_id(date).await?;
        properties.insert("年".into(), relation(year));
        properties.insert("月".into(), relation(month));
        properties.insert("周".into(), relation(week));
        properties.insert("日".into(), relation(day));
        Ok(())
    }
}

/// The week/month/year tables share the plain bucket-resolution path; day
/// buckets are resolved separately since they carry relation links.
enum BucketTable {
    Week,
    Month,
    Year,
}

fn relation(id: String) -> PropertyValue {
    PropertyValue::Relation {
        relation: vec![crate::notion::models::RelationRef { id }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_compact_page_id() {
        let url = "https://www.notion.so/u/Films-0123456789abcdef0123456789abcdef";
        assert_eq!(
            extract_page_id(url).unwrap(),
            "0123456789abcdef0123456789abcdef"
        );
    }

    #[test]
    fn extracts_hyphenated_page_id() {
        let url = "https://www.notion.so/0a1b2c3d-4e5f-6789-abcd-ef0123456789?v=1";
        assert_eq!(
            extract_page_id(url).unwrap(),
            "0a1b2c3d-4e5f-6789-abcd-ef0123456789"
        );
    }

    #[test]
    fn rejects_urls_without_an_id() {
        assert!(matches!(
            extract_page_id("https://www.notion.so/just-a-slug"),
            Err(SyncError::InvalidRootUrl(_))
        ));
    }
}
