//! Reconciles the fetched watching history against the destination movie
//! table: fetch destination, fetch source, diff by the source URL, then
//! create, update in place, or skip. Strictly additive; nothing is deleted.

use std::collections::HashMap;

use crate::calendar;
use crate::douban::client::{fetch_all_interests, InterestPager};
use crate::douban::models::{parse_create_time, star_rating, Interest, WatchStatus};
use crate::error::Result;
use crate::notion::models::{CreatePageRequest, Icon, Page, Parent, UpdatePageRequest};
use crate::notion::property::{encode, FieldMap, FieldValue, PropertyKind, Schema};
use crate::notion::session::Workspace;

/// Field-name → kind declaration for the movie table.
pub fn movie_schema() -> Schema {
    let mut schema = Schema::new();
    schema.insert("电影名", PropertyKind::Title);
    schema.insert("短评", PropertyKind::RichText);
    schema.insert("导演", PropertyKind::Relation);
    schema.insert("演员", PropertyKind::MultiSelect);
    schema.insert("封面", PropertyKind::Files);
    schema.insert("分类", PropertyKind::Relation);
    schema.insert("状态", PropertyKind::Status);
    schema.insert("类型", PropertyKind::Select);
    schema.insert("评分", PropertyKind::Select);
    schema.insert("日期", PropertyKind::Date);
    schema.insert("简介", PropertyKind::RichText);
    schema.insert("豆瓣链接", PropertyKind::Url);
    schema
}

/// The watched-for-change fields of an existing destination record, keyed by
/// its source URL. Category relations are decoded to plain id strings so the
/// comparison against freshly resolved ids is by value.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieSnapshot {
    pub page_id: String,
    pub comment: Option<String>,
    pub status: Option<String>,
    pub timestamp: Option<i64>,
    pub rating: Option<String>,
    pub category_ids: Vec<String>,
}

fn decoded(page: &Page, name: &str) -> Option<FieldValue> {
    page.property(name)
        .and_then(|p| crate::notion::property::decode(&p))
}

fn text(page: &Page, name: &str) -> Option<String> {
    match decoded(page, name) {
        Some(FieldValue::Text(value)) => Some(value),
        _ => None,
    }
}

impl MovieSnapshot {
    /// Builds the (source URL, snapshot) pair for one destination page.
    /// Pages without a source URL cannot participate in reconciliation and
    /// yield `None`.
    pub fn from_page(page: &Page) -> Option<(String, Self)> {
        let url = text(page, "豆瓣链接")?;
        let timestamp = match decoded(page, "日期") {
            Some(FieldValue::Timestamp(ts)) => Some(ts),
            _ => None,
        };
        let category_ids = match decoded(page, "分类") {
            Some(FieldValue::RelationIds(ids)) => ids,
            _ => Vec::new(),
        };
        Some((
            url,
            Self {
                page_id: page.id.clone(),
                comment: text(page, "短评"),
                status: text(page, "状态"),
                timestamp,
                rating: text(page, "评分"),
                category_ids,
            },
        ))
    }
}

/// One source record projected into destination vocabulary. Entries without
/// a subject or a URL are malformed and never reach this type.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieFields {
    pub title: Option<String>,
    pub url: String,
    pub status: Option<String>,
    pub rating: Option<String>,
    pub comment: Option<String>,
    pub timestamp: Option<i64>,
    pub genres: Vec<String>,
    pub directors: Vec<String>,
    pub actors: Vec<String>,
    pub cover: Option<String>,
    pub kind: Option<String>,
}

impl MovieFields {
    pub fn from_interest(interest: &Interest) -> Option<Self> {
        let subject = interest.subject.as_ref()?;
        let url = subject.url.clone().filter(|u| !u.is_empty())?;

        let names = |people: &[crate::douban::models::Person]| -> Vec<String> {
            people.iter().filter_map(|p| p.name.clone()).collect()
        };

        Some(Self {
            title: subject.title.clone().filter(|t| !t.is_empty()),
            url,
            status: interest
                .status
                .as_deref()
                .and_then(WatchStatus::from_code)
                .map(|s| s.display().to_string()),
            rating: interest
                .rating
                .as_ref()
                .and_then(|r| r.value)
                .and_then(star_rating)
                .map(str::to_string),
            comment: interest.comment.clone().filter(|c| !c.is_empty()),
            timestamp: interest
                .create_time
                .as_deref()
                .and_then(parse_create_time),
            genres: subject.genres.clone(),
            directors: names(&subject.directors),
            actors: names(&subject.actors),
            cover: subject.cover_url(),
            kind: subject.kind.clone(),
        })
    }

    /// The five watched fields, re-encoded as a whole on any difference so
    /// clears-to-absent still propagate.
    fn watched_field_map(&self, category_ids: &[String]) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert("日期".into(), self.timestamp.map(FieldValue::Timestamp));
        fields.insert("短评".into(), self.comment.clone().map(FieldValue::Text));
        fields.insert("状态".into(), self.status.clone().map(FieldValue::Text));
        fields.insert("评分".into(), self.rating.clone().map(FieldValue::Text));
        fields.insert(
            "分类".into(),
            Some(FieldValue::RelationIds(category_ids.to_vec())),
        );
        fields
    }

    /// The full property set for the creation path.
    fn full_field_map(&self, category_ids: &[String], director_ids: &[String]) -> FieldMap {
        let mut fields = self.watched_field_map(category_ids);
        fields.insert("电影名".into(), self.title.clone().map(FieldValue::Text));
        fields.insert("豆瓣链接".into(), Some(FieldValue::Text(self.url.clone())));
        fields.insert("封面".into(), self.cover.clone().map(FieldValue::Text));
        fields.insert("类型".into(), self.kind.clone().map(FieldValue::Text));
        fields.insert(
            "演员".into(),
            if self.actors.is_empty() {
                None
            } else {
                Some(FieldValue::Strings(self.actors.clone()))
            },
        );
        fields.insert(
            "导演".into(),
            if director_ids.is_empty() {
                None
            } else {
                Some(FieldValue::RelationIds(director_ids.to_vec()))
            },
        );
        fields
    }
}

/// The reconciler's decision for one source record.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncAction {
    Create,
    Update { page_id: String },
    Skip,
}

/// Pure diff over the five watched fields. Any difference re-encodes the
/// whole watched set; full equality issues no write at all.
pub fn plan(
    existing: Option<&MovieSnapshot>,
    incoming: &MovieFields,
    category_ids: &[String],
) -> SyncAction {
    match existing {
        None => SyncAction::Create,
        Some(snapshot) => {
            let changed = snapshot.timestamp != incoming.timestamp
                || snapshot.comment != incoming.comment
                || snapshot.status != incoming.status
                || snapshot.rating != incoming.rating
                || snapshot.category_ids != category_ids;
            if changed {
                SyncAction::Update {
                    page_id: snapshot.page_id.clone(),
                }
            } else {
                SyncAction::Skip
            }
        }
    }
}

/// Counters for one reconciliation pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub created: u32,
    pub updated: u32,
    pub skipped: u32,
    pub malformed: u32,
}

/// One full reconciliation pass. Re-running with an unchanged source issues
/// zero additional writes.
pub async fn run<P: InterestPager + ?Sized>(
    workspace: &mut Workspace,
    source: &P,
    user: &str,
) -> Result<RunStats> {
    let schema = movie_schema();

    let pages = workspace.client.query_all(&workspace.movie_db).await?;
    let existing: HashMap<String, MovieSnapshot> = pages
        .iter()
        .filter_map(MovieSnapshot::from_page)
        .collect();
    tracing::info!("Found {} movies already in the destination", existing.len());

    let mut interests = Vec::new();
    for status in WatchStatus::ALL {
        interests.extend(fetch_all_interests(source, user, status).await?);
    }

    let mut stats = RunStats::default();
    for interest in &interests {
        let Some(fields) = MovieFields::from_interest(interest) else {
            tracing::warn!("Skipping interest without a subject");
            stats.malformed += 1;
            continue;
        };

        // Categories are a shared vocabulary growing monotonically; resolve
        // (and create) them before diffing so the comparison sees real ids.
        let mut category_ids = Vec::with_capacity(fields.genres.len());
        for genre in &fields.genres {
            category_ids.push(workspace.category_id(genre).await?);
        }

        match plan(existing.get(&fields.url), &fields, &category_ids) {
            SyncAction::Skip => stats.skipped += 1,
            SyncAction::Update { page_id } => {
                let mut properties = encode(&fields.watched_field_map(&category_ids), &schema);
                if let Some(date) = fields.timestamp.and_then(calendar::local_date) {
                    workspace.attach_date_relations(&mut properties, date).await?;
                }
                workspace
                    .client
                    .update_page(&page_id, &UpdatePageRequest { properties })
                    .await?;
                tracing::info!(
                    "Updated {}",
                    fields.title.as_deref().unwrap_or(&fields.url)
                );
                stats.updated += 1;
            }
            SyncAction::Create => {
                let mut director_ids = Vec::with_capacity(fields.directors.len());
                for director in &fields.directors {
                    director_ids.push(workspace.director_id(director).await?);
                }

                let mut properties =
                    encode(&fields.full_field_map(&category_ids, &director_ids), &schema);
                if let Some(date) = fields.timestamp.and_then(calendar::local_date) {
                    workspace.attach_date_relations(&mut properties, date).await?;
                }
                let request = CreatePageRequest {
                    parent: Parent::database(workspace.movie_db.as_str()),
                    properties,
                    icon: fields.cover.clone().map(Icon::external),
                };
                workspace.client.create_page(&request).await?;
                tracing::info!(
                    "Inserted {}",
                    fields.title.as_deref().unwrap_or(&fields.url)
                );
                stats.created += 1;
            }
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notion::property::PropertyValue;

    fn interest(rating: i64) -> Interest {
        serde_json::from_value(serde_json::json!({
            "subject": {
                "title": "花样年华",
                "url": "https://movie.douban.com/subject/1291557/",
                "genres": ["剧情", "爱情"],
                "directors": [{ "name": "王家卫" }],
                "actors": [{ "name": "梁朝伟" }, { "name": "张曼玉" }],
                "pic": { "normal": "https://img.example.com/p.webp" },
                "type": "movie"
            },
            "status": "done",
            "rating": { "value": rating },
            "comment": "经典",
            "create_time": "2024-01-01 20:15:42"
        }))
        .unwrap()
    }

    fn snapshot_matching(fields: &MovieFields, category_ids: Vec<String>) -> MovieSnapshot {
        MovieSnapshot {
            page_id: "page-1".into(),
            comment: fields.comment.clone(),
            status: fields.status.clone(),
            timestamp: fields.timestamp,
            rating: fields.rating.clone(),
            category_ids,
        }
    }

    #[test]
    fn unchanged_record_is_skipped() {
        let fields = MovieFields::from_interest(&interest(4)).unwrap();
        let ids = vec!["cat-1".to_string(), "cat-2".to_string()];
        let snapshot = snapshot_matching(&fields, ids.clone());

        assert_eq!(plan(Some(&snapshot), &fields, &ids), SyncAction::Skip);
    }

    #[test]
    fn rating_change_triggers_exactly_an_update() {
        let stored = MovieFields::from_interest(&interest(3)).unwrap();
        let ids = vec!["cat-1".to_string(), "cat-2".to_string()];
        let snapshot = snapshot_matching(&stored, ids.clone());
        assert_eq!(snapshot.rating.as_deref(), Some("⭐️⭐️⭐️"));

        let fresh = MovieFields::from_interest(&interest(4)).unwrap();
        assert_eq!(
            plan(Some(&snapshot), &fresh, &ids),
            SyncAction::Update {
                page_id: "page-1".into()
            }
        );
    }

    #[test]
    fn unknown_record_is_created() {
        let fields = MovieFields::from_interest(&interest(5)).unwrap();
        assert_eq!(plan(None, &fields, &[]), SyncAction::Create);
    }

    #[test]
    fn interest_without_subject_is_malformed() {
        let bare: Interest =
            serde_json::from_value(serde_json::json!({ "status": "done" })).unwrap();
        assert!(MovieFields::from_interest(&bare).is_none());
    }

    #[test]
    fn out_of_scale_rating_projects_to_absent() {
        let fields = MovieFields::from_interest(&interest(6)).unwrap();
        assert_eq!(fields.rating, None);

        // Absent rating still encodes the rest of the watched set.
        let encoded = encode(&fields.watched_field_map(&[]), &movie_schema());
        assert!(!encoded.contains_key("评分"));
        assert!(encoded.contains_key("状态"));
    }

    #[test]
    fn empty_genre_list_yields_an_empty_category_relation() {
        let raw = serde_json::json!({
            "subject": { "title": "t", "url": "https://movie.douban.com/subject/1/", "genres": [] },
            "status": "mark"
        });
        let bare: Interest = serde_json::from_value(raw).unwrap();
        let fields = MovieFields::from_interest(&bare).unwrap();
        assert!(fields.genres.is_empty());

        let encoded = encode(&fields.watched_field_map(&[]), &movie_schema());
        assert_eq!(
            encoded.get("分类"),
            Some(&PropertyValue::Relation { relation: vec![] })
        );
    }

    #[test]
    fn watched_field_map_covers_exactly_the_watched_set() {
        let fields = MovieFields::from_interest(&interest(4)).unwrap();
        let encoded = encode(&fields.watched_field_map(&["cat-1".into()]), &movie_schema());

        let mut keys: Vec<&str> = encoded.keys().map(String::as_str).collect();
        keys.sort_unstable();
        let mut expected = vec!["分类", "日期", "短评", "状态", "评分"];
        expected.sort_unstable();
        assert_eq!(keys, expected);
    }

    #[test]
    fn snapshot_round_trips_through_a_page() {
        let page: Page = serde_json::from_value(serde_json::json!({
            "id": "page-9",
            "properties": {
                "豆瓣链接": { "type": "url", "url": "https://movie.douban.com/subject/1291557/" },
                "短评": { "type": "rich_text", "rich_text": [
                    { "type": "text", "text": { "content": "经典" }, "plain_text": "经典" }
                ]},
                "状态": { "type": "status", "status": { "name": "看过" } },
                "评分": { "type": "select", "select": { "name": "⭐️⭐️⭐️⭐️" } },
                "日期": { "type": "date", "date": { "start": "2024-01-01T20:15:00.000+08:00" } },
                "分类": { "type": "relation", "relation": [ { "id": "cat-1" }, { "id": "cat-2" } ] },
                "人气": { "type": "formula", "formula": { "number": 3 } }
            }
        }))
        .unwrap();

        let (url, snapshot) = MovieSnapshot::from_page(&page).unwrap();
        assert_eq!(url, "https://movie.douban.com/subject/1291557/");
        assert_eq!(snapshot.page_id, "page-9");
        assert_eq!(snapshot.status.as_deref(), Some("看过"));
        assert_eq!(snapshot.category_ids, vec!["cat-1", "cat-2"]);

        // The freshly projected source record matches, so nothing is written.
        let fields = MovieFields::from_interest(&interest(4)).unwrap();
        let ids = vec!["cat-1".to_string(), "cat-2".to_string()];
        assert_eq!(plan(Some(&snapshot), &fields, &ids), SyncAction::Skip);
    }

    #[test]
    fn page_without_a_source_url_is_ignored() {
        let page: Page = serde_json::from_value(serde_json::json!({
            "id": "page-10",
            "properties": { "电影名": { "type": "title", "title": [] } }
        }))
        .unwrap();
        assert!(MovieSnapshot::from_page(&page).is_none());
    }
}
