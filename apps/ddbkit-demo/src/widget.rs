//! The `Widget` record and its data-access object.
//!
//! Widgets live in one table keyed by a derived `ID`, with a global index on
//! `WidgetGroup` + `WidgetId` for per-group listing.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use ddbkit_core::codec;
use ddbkit_core::expression::key;
use ddbkit_core::{Cursor, DdbKitResult, ExpressionBuilder, Page, Transaction, Worker};
use ddbkit_memory::{KeyAttribute, TableDefinition};
use ddbkit_model::DynamoStore;
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

/// Widget table name.
pub const TABLE_NAME: &str = "Widget";
/// Group index name.
pub const GROUP_INDEX_NAME: &str = "WidgetGroup-WidgetId-index";

/// Deterministic widget ID: hex MD5 of `"group:widget_id"`.
#[must_use]
pub fn gen_id(group: &str, widget_id: &str) -> String {
    hex::encode(Md5::digest(format!("{group}:{widget_id}").as_bytes()))
}

/// Table definition used when running against [`ddbkit_memory::MemoryStore`].
#[must_use]
pub fn widget_table() -> TableDefinition {
    TableDefinition::new(TABLE_NAME, KeyAttribute::string("ID")).with_global_index(
        GROUP_INDEX_NAME,
        KeyAttribute::string("WidgetGroup"),
        Some(KeyAttribute::string("WidgetId")),
    )
}

/// A widget. Empty fields are not stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Widget {
    /// Primary key, see [`gen_id`].
    #[serde(rename = "ID", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Owning group.
    #[serde(rename = "WidgetGroup", default, skip_serializing_if = "String::is_empty")]
    pub group: String,
    /// Identifier within the group.
    #[serde(rename = "WidgetId", default, skip_serializing_if = "String::is_empty")]
    pub widget_id: String,
    /// Display name.
    #[serde(rename = "Name", default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// First save.
    #[serde(rename = "CreateTime", default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
    /// Last save.
    #[serde(rename = "UpdateTime", default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<DateTime<Utc>>,
}

impl Widget {
    /// A widget with its ID derived from group and widget ID.
    #[must_use]
    pub fn new(group: impl Into<String>, widget_id: impl Into<String>) -> Self {
        let group = group.into();
        let widget_id = widget_id.into();
        Self {
            id: gen_id(&group, &widget_id),
            group,
            widget_id,
            ..Self::default()
        }
    }

    /// Set the name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Stamp the update time, and the create time on first save.
    pub fn touch(&mut self) {
        let now = Utc::now();
        self.create_time.get_or_insert(now);
        self.update_time = Some(now);
    }
}

/// Options for [`WidgetDao::query`].
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Exact widget ID.
    pub widget_id: Option<String>,
    /// Widget ID prefix; ignored when `widget_id` is set.
    pub widget_id_starts_with: Option<String>,
    /// Page size.
    pub limit: Option<i32>,
    /// Cursor from a previous page.
    pub offset: Cursor,
    /// Descending widget ID order.
    pub reverse: bool,
}

/// Data-access object for widgets.
#[derive(Debug, Clone)]
pub struct WidgetDao {
    store: Arc<dyn DynamoStore>,
}

impl WidgetDao {
    /// A DAO over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn DynamoStore>) -> Self {
        Self { store }
    }

    fn worker(&self) -> Worker {
        Worker::new(Arc::clone(&self.store)).table(TABLE_NAME)
    }

    /// Stamp and store a widget, deriving its ID if unset.
    pub async fn save(&self, widget: &mut Widget) -> DdbKitResult<()> {
        if widget.id.is_empty() {
            widget.id = gen_id(&widget.group, &widget.widget_id);
        }
        widget.touch();
        self.worker().save(widget).await
    }

    /// Delete a widget by ID. Deleting a missing widget succeeds.
    pub async fn delete(&self, id: &str) -> DdbKitResult<()> {
        self.worker().key("ID", id).delete().await
    }

    /// Fetch a widget by ID; `NotFound` when it does not exist.
    pub async fn get(&self, id: &str) -> DdbKitResult<Widget> {
        self.worker().key("ID", id).get().await
    }

    /// Look a widget up by group and widget ID through the group index.
    pub async fn find(&self, group: &str, widget_id: &str) -> DdbKitResult<Option<Widget>> {
        let page: Page<Widget> = self
            .worker()
            .index(GROUP_INDEX_NAME)
            .keys([("WidgetGroup", group), ("WidgetId", widget_id)])
            .query()
            .await?;
        Ok(page.items.into_iter().next())
    }

    /// One page of a group's widgets.
    pub async fn query(&self, group: &str, options: &QueryOptions) -> DdbKitResult<Page<Widget>> {
        let mut worker = self
            .worker()
            .index(GROUP_INDEX_NAME)
            .key("WidgetGroup", group)
            .offset(options.offset.clone())
            .reverse(options.reverse);
        if let Some(limit) = options.limit {
            worker = worker.limit(limit);
        }

        match (&options.widget_id, &options.widget_id_starts_with) {
            (Some(widget_id), _) => worker.key("WidgetId", widget_id.as_str()).query().await,
            (None, Some(prefix)) => {
                let expression = ExpressionBuilder::new()
                    .with_key_condition(
                        key("WidgetGroup")
                            .equal(group)
                            .and(key("WidgetId").begins_with(prefix.as_str())),
                    )
                    .build()?;
                worker.query_by_expression(&expression).await
            }
            (None, None) => worker.query().await,
        }
    }

    /// Stamp `UpdateTime` on every listed widget in one transaction.
    pub async fn touch_all(&self, ids: &[&str]) -> DdbKitResult<()> {
        let now = codec::to_attribute_value(&Utc::now())?;
        let mut tx = Transaction::new(Arc::clone(&self.store));
        for id in ids {
            tx.push(
                self.worker()
                    .key("ID", *id)
                    .to_update_item([("UpdateTime", now.clone())])?,
            );
        }
        tx.commit().await
    }
}

#[cfg(test)]
mod tests {
    use ddbkit_memory::MemoryStore;

    use super::*;

    fn dao() -> WidgetDao {
        WidgetDao::new(Arc::new(MemoryStore::new().with_table(widget_table())))
    }

    async fn seed(dao: &WidgetDao, group: &str, ids: &[&str]) {
        for id in ids {
            let mut widget = Widget::new(group, *id);
            dao.save(&mut widget).await.unwrap();
        }
    }

    fn widget_ids(page: &Page<Widget>) -> Vec<&str> {
        page.items.iter().map(|w| w.widget_id.as_str()).collect()
    }

    #[test]
    fn test_should_generate_md5_hex_id() {
        let id = gen_id("g", "w");
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id, gen_id("g", "w"));
        assert_ne!(gen_id("g", "w"), gen_id("g", "x"));
    }

    #[test]
    fn test_should_keep_create_time_on_touch() {
        let mut widget = Widget::new("g", "w");
        widget.touch();
        let created = widget.create_time;
        widget.touch();
        assert_eq!(widget.create_time, created);
        assert!(widget.update_time >= created);
    }

    #[tokio::test]
    async fn test_should_save_get_and_delete_widget() {
        let dao = dao();
        let mut widget = Widget::new("g", "w1").with_name("first");
        dao.save(&mut widget).await.unwrap();

        let got = dao.get(&widget.id).await.unwrap();
        assert_eq!(got, widget);

        dao.delete(&widget.id).await.unwrap();
        assert!(dao.get(&widget.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_should_find_widget_through_group_index() {
        let dao = dao();
        seed(&dao, "g", &["a", "b"]).await;

        let found = dao.find("g", "b").await.unwrap().unwrap();
        assert_eq!(found.id, gen_id("g", "b"));
        assert!(dao.find("g", "z").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_should_query_group_by_prefix() {
        let dao = dao();
        seed(&dao, "g", &["apple", "apricot", "banana"]).await;
        seed(&dao, "other", &["avocado"]).await;

        let page = dao
            .query("g", &QueryOptions {
                widget_id_starts_with: Some("ap".to_owned()),
                ..QueryOptions::default()
            })
            .await
            .unwrap();
        assert_eq!(widget_ids(&page), ["apple", "apricot"]);
    }

    #[tokio::test]
    async fn test_should_page_group_in_reverse() {
        let dao = dao();
        seed(&dao, "g", &["a", "b", "c"]).await;

        let options = QueryOptions {
            limit: Some(2),
            reverse: true,
            ..QueryOptions::default()
        };
        let first = dao.query("g", &options).await.unwrap();
        assert_eq!(widget_ids(&first), ["c", "b"]);

        let second = dao
            .query("g", &QueryOptions {
                offset: first.cursor.clone(),
                ..options
            })
            .await
            .unwrap();
        assert_eq!(widget_ids(&second), ["a"]);
        assert!(!second.has_more());
    }

    #[tokio::test]
    async fn test_should_touch_widgets_in_one_transaction() {
        let dao = dao();
        seed(&dao, "g", &["a", "b"]).await;
        let ids = [gen_id("g", "a"), gen_id("g", "b")];
        let before = dao.get(&ids[0]).await.unwrap().update_time;

        dao.touch_all(&[ids[0].as_str(), ids[1].as_str()])
            .await
            .unwrap();
        let after = dao.get(&ids[0]).await.unwrap().update_time;
        assert!(after >= before);
    }
}
