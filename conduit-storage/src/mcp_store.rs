//! Reference `MetadataStore`/`BlobStore` implementations (§3, §4.B, §4.E).
//!
//! `SqliteMetadataStore` persists the four MCP entity kinds over
//! `sqlx::SqlitePool`, with the secondary indexes the original models
//! (`TypeIndex`/`NameIndex` in
//! `original_source/.../models/mcp_function_call.py`) express as
//! DynamoDB local secondary indexes translated to ordinary SQL indexes.
//! `FilesystemBlobStore` offloads oversized call-record content and
//! serves packaged module archives from a directory tree, standing in
//! for the production blob store named only at its interface boundary
//! (§1).

use async_trait::async_trait;
use conduit_core::error::{ConduitError, Result};
use conduit_core::types::{
    CallFilter, CallStatus, CallUpdate, McpFunction, McpFunctionCall, McpModule, McpSetting, McpType, ModuleClassBinding,
    ReturnType,
};
use conduit_interfaces::blob::BlobStore;
use conduit_interfaces::metadata::MetadataStore;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};

use crate::error::StorageError;

pub struct SqliteMetadataStore {
    pool: SqlitePool,
}

impl SqliteMetadataStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(StorageError::from)?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS mcp_function (
                partition_key TEXT NOT NULL,
                name TEXT NOT NULL,
                mcp_type TEXT NOT NULL,
                description TEXT NOT NULL,
                data TEXT NOT NULL,
                annotations TEXT NOT NULL,
                module_name TEXT,
                class_name TEXT,
                function_name TEXT,
                return_type TEXT NOT NULL,
                is_async INTEGER NOT NULL,
                updated_by TEXT NOT NULL,
                PRIMARY KEY (partition_key, name)
            );
            CREATE INDEX IF NOT EXISTS mcp_function_type_index ON mcp_function (partition_key, mcp_type);

            CREATE TABLE IF NOT EXISTS mcp_module (
                partition_key TEXT NOT NULL,
                module_name TEXT NOT NULL,
                package_name TEXT,
                classes TEXT NOT NULL,
                source TEXT,
                updated_by TEXT NOT NULL,
                PRIMARY KEY (partition_key, module_name)
            );
            CREATE INDEX IF NOT EXISTS mcp_module_package_index ON mcp_module (partition_key, package_name);

            CREATE TABLE IF NOT EXISTS mcp_setting (
                partition_key TEXT NOT NULL,
                setting_id TEXT NOT NULL,
                setting TEXT NOT NULL,
                updated_by TEXT NOT NULL,
                PRIMARY KEY (partition_key, setting_id)
            );

            CREATE TABLE IF NOT EXISTS mcp_function_call (
                partition_key TEXT NOT NULL,
                call_uuid TEXT NOT NULL,
                name TEXT NOT NULL,
                mcp_type TEXT NOT NULL,
                arguments TEXT NOT NULL,
                status TEXT NOT NULL,
                has_content INTEGER NOT NULL,
                content TEXT,
                notes TEXT,
                time_spent_ms INTEGER,
                updated_by TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (partition_key, call_uuid)
            );
            CREATE INDEX IF NOT EXISTS mcp_function_call_type_index ON mcp_function_call (partition_key, mcp_type);
            CREATE INDEX IF NOT EXISTS mcp_function_call_name_index ON mcp_function_call (partition_key, name);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;
        Ok(())
    }
}

fn mcp_type_str(t: McpType) -> &'static str {
    match t {
        McpType::Tool => "tool",
        McpType::Resource => "resource",
        McpType::Prompt => "prompt",
    }
}

fn parse_mcp_type(s: &str) -> Result<McpType> {
    match s {
        "tool" => Ok(McpType::Tool),
        "resource" => Ok(McpType::Resource),
        "prompt" => Ok(McpType::Prompt),
        other => Err(ConduitError::Internal(format!("unknown mcp_type in storage: {other}"))),
    }
}

fn return_type_str(t: ReturnType) -> &'static str {
    match t {
        ReturnType::Text => "text",
        ReturnType::Image => "image",
        ReturnType::EmbeddedResource => "embedded_resource",
    }
}

fn parse_return_type(s: &str) -> ReturnType {
    match s {
        "image" => ReturnType::Image,
        "embedded_resource" => ReturnType::EmbeddedResource,
        _ => ReturnType::Text,
    }
}

fn status_str(s: CallStatus) -> &'static str {
    match s {
        CallStatus::Initial => "initial",
        CallStatus::InProcess => "in_process",
        CallStatus::Completed => "completed",
        CallStatus::Failed => "failed",
    }
}

fn parse_status(s: &str) -> CallStatus {
    match s {
        "in_process" => CallStatus::InProcess,
        "completed" => CallStatus::Completed,
        "failed" => CallStatus::Failed,
        _ => CallStatus::Initial,
    }
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn list_functions(&self, partition_key: &str) -> Result<Vec<McpFunction>> {
        let rows = sqlx::query(
            "SELECT name, mcp_type, description, data, annotations, module_name, class_name, function_name, return_type, is_async, updated_by FROM mcp_function WHERE partition_key = ?",
        )
        .bind(partition_key)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::from)?;

        rows.into_iter()
            .map(|row| {
                Ok(McpFunction {
                    name: row.try_get("name").map_err(StorageError::from)?,
                    mcp_type: parse_mcp_type(&row.try_get::<String, _>("mcp_type").map_err(StorageError::from)?)?,
                    description: row.try_get("description").map_err(StorageError::from)?,
                    data: serde_json::from_str(&row.try_get::<String, _>("data").map_err(StorageError::from)?)?,
                    annotations: serde_json::from_str(&row.try_get::<String, _>("annotations").map_err(StorageError::from)?)?,
                    module_name: row.try_get("module_name").map_err(StorageError::from)?,
                    class_name: row.try_get("class_name").map_err(StorageError::from)?,
                    function_name: row.try_get("function_name").map_err(StorageError::from)?,
                    return_type: parse_return_type(&row.try_get::<String, _>("return_type").map_err(StorageError::from)?),
                    is_async: row.try_get::<i64, _>("is_async").map_err(StorageError::from)? != 0,
                    updated_by: row.try_get("updated_by").map_err(StorageError::from)?,
                })
            })
            .collect()
    }

    async fn get_function(&self, partition_key: &str, name: &str) -> Result<Option<McpFunction>> {
        Ok(self.list_functions(partition_key).await?.into_iter().find(|f| f.name == name))
    }

    async fn put_function(&self, partition_key: &str, function: McpFunction) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO mcp_function
                (partition_key, name, mcp_type, description, data, annotations, module_name, class_name, function_name, return_type, is_async, updated_by)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(partition_key, name) DO UPDATE SET
                mcp_type = excluded.mcp_type, description = excluded.description, data = excluded.data,
                annotations = excluded.annotations, module_name = excluded.module_name, class_name = excluded.class_name,
                function_name = excluded.function_name, return_type = excluded.return_type, is_async = excluded.is_async,
                updated_by = excluded.updated_by"#,
        )
        .bind(partition_key)
        .bind(&function.name)
        .bind(mcp_type_str(function.mcp_type))
        .bind(&function.description)
        .bind(function.data.to_string())
        .bind(function.annotations.to_string())
        .bind(&function.module_name)
        .bind(&function.class_name)
        .bind(&function.function_name)
        .bind(return_type_str(function.return_type))
        .bind(function.is_async as i64)
        .bind(&function.updated_by)
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;
        Ok(())
    }

    async fn delete_function(&self, partition_key: &str, name: &str) -> Result<()> {
        sqlx::query("DELETE FROM mcp_function WHERE partition_key = ? AND name = ?")
            .bind(partition_key)
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    async fn get_module(&self, partition_key: &str, module_name: &str) -> Result<Option<McpModule>> {
        let row = sqlx::query("SELECT module_name, package_name, classes, source, updated_by FROM mcp_module WHERE partition_key = ? AND module_name = ?")
            .bind(partition_key)
            .bind(module_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        let Some(row) = row else { return Ok(None) };
        let classes: Vec<ModuleClassBinding> = serde_json::from_str(&row.try_get::<String, _>("classes").map_err(StorageError::from)?)?;
        Ok(Some(McpModule {
            module_name: row.try_get("module_name").map_err(StorageError::from)?,
            package_name: row.try_get("package_name").map_err(StorageError::from)?,
            classes,
            source: row.try_get("source").map_err(StorageError::from)?,
            updated_by: row.try_get("updated_by").map_err(StorageError::from)?,
        }))
    }

    async fn put_module(&self, partition_key: &str, module: McpModule) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO mcp_module (partition_key, module_name, package_name, classes, source, updated_by)
               VALUES (?, ?, ?, ?, ?, ?)
               ON CONFLICT(partition_key, module_name) DO UPDATE SET
                package_name = excluded.package_name, classes = excluded.classes, source = excluded.source,
                updated_by = excluded.updated_by"#,
        )
        .bind(partition_key)
        .bind(&module.module_name)
        .bind(&module.package_name)
        .bind(serde_json::to_string(&module.classes)?)
        .bind(&module.source)
        .bind(&module.updated_by)
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;
        Ok(())
    }

    async fn delete_module(&self, partition_key: &str, module_name: &str) -> Result<()> {
        sqlx::query("DELETE FROM mcp_module WHERE partition_key = ? AND module_name = ?")
            .bind(partition_key)
            .bind(module_name)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    async fn get_setting(&self, partition_key: &str, setting_id: &str) -> Result<Option<McpSetting>> {
        let row = sqlx::query("SELECT setting_id, setting, updated_by FROM mcp_setting WHERE partition_key = ? AND setting_id = ?")
            .bind(partition_key)
            .bind(setting_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        let Some(row) = row else { return Ok(None) };
        Ok(Some(McpSetting {
            setting_id: row.try_get("setting_id").map_err(StorageError::from)?,
            setting: serde_json::from_str(&row.try_get::<String, _>("setting").map_err(StorageError::from)?)?,
            updated_by: row.try_get("updated_by").map_err(StorageError::from)?,
        }))
    }

    async fn put_setting(&self, partition_key: &str, setting: McpSetting) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO mcp_setting (partition_key, setting_id, setting, updated_by)
               VALUES (?, ?, ?, ?)
               ON CONFLICT(partition_key, setting_id) DO UPDATE SET
                setting = excluded.setting, updated_by = excluded.updated_by"#,
        )
        .bind(partition_key)
        .bind(&setting.setting_id)
        .bind(setting.setting.to_string())
        .bind(&setting.updated_by)
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;
        Ok(())
    }

    async fn delete_setting(&self, partition_key: &str, setting_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM mcp_setting WHERE partition_key = ? AND setting_id = ?")
            .bind(partition_key)
            .bind(setting_id)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    async fn create_call(&self, partition_key: &str, mut call: McpFunctionCall) -> Result<McpFunctionCall> {
        if call.call_uuid.is_empty() {
            call.call_uuid = uuid::Uuid::new_v4().to_string();
        }
        sqlx::query(
            r#"INSERT INTO mcp_function_call
                (partition_key, call_uuid, name, mcp_type, arguments, status, has_content, content, notes, time_spent_ms, updated_by, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(partition_key)
        .bind(&call.call_uuid)
        .bind(&call.name)
        .bind(mcp_type_str(call.mcp_type))
        .bind(call.arguments.to_string())
        .bind(status_str(call.status))
        .bind(call.has_content as i64)
        .bind(&call.content)
        .bind(&call.notes)
        .bind(call.time_spent_ms.map(|v| v as i64))
        .bind(&call.updated_by)
        .bind(call.created_at.to_rfc3339())
        .bind(call.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;
        Ok(call)
    }

    async fn get_call(&self, partition_key: &str, call_uuid: &str) -> Result<Option<McpFunctionCall>> {
        let row = sqlx::query(
            "SELECT call_uuid, name, mcp_type, arguments, status, has_content, content, notes, time_spent_ms, updated_by, created_at, updated_at FROM mcp_function_call WHERE partition_key = ? AND call_uuid = ?",
        )
        .bind(partition_key)
        .bind(call_uuid)
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::from)?;
        let Some(row) = row else { return Ok(None) };
        row_to_call(row).map(Some)
    }

    async fn update_call(&self, partition_key: &str, call_uuid: &str, update: CallUpdate) -> Result<McpFunctionCall> {
        let existing = self
            .get_call(partition_key, call_uuid)
            .await?
            .ok_or_else(|| ConduitError::Internal(format!("call record {call_uuid} not found")))?;

        let status = update.status.unwrap_or(existing.status);
        let content = update.content.or(existing.content.clone());
        let has_content = update.has_content.unwrap_or(existing.has_content);
        let notes = update.notes.or(existing.notes.clone());
        let time_spent_ms = update.time_spent_ms.or(existing.time_spent_ms);
        let now = chrono::Utc::now();

        sqlx::query(
            "UPDATE mcp_function_call SET status = ?, has_content = ?, content = ?, notes = ?, time_spent_ms = ?, updated_at = ? WHERE partition_key = ? AND call_uuid = ?",
        )
        .bind(status_str(status))
        .bind(has_content as i64)
        .bind(&content)
        .bind(&notes)
        .bind(time_spent_ms.map(|v| v as i64))
        .bind(now.to_rfc3339())
        .bind(partition_key)
        .bind(call_uuid)
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(McpFunctionCall {
            status,
            has_content,
            content,
            notes,
            time_spent_ms,
            updated_at: now,
            ..existing
        })
    }

    async fn list_calls(&self, partition_key: &str, filter: CallFilter) -> Result<Vec<McpFunctionCall>> {
        let mut query = String::from(
            "SELECT call_uuid, name, mcp_type, arguments, status, has_content, content, notes, time_spent_ms, updated_by, created_at, updated_at FROM mcp_function_call WHERE partition_key = ?",
        );
        if filter.mcp_type.is_some() {
            query.push_str(" AND mcp_type = ?");
        }
        if filter.name.is_some() {
            query.push_str(" AND name = ?");
        }
        if filter.status.is_some() {
            query.push_str(" AND status = ?");
        }
        query.push_str(" ORDER BY created_at DESC LIMIT ? OFFSET ?");

        let mut q = sqlx::query(&query).bind(partition_key);
        if let Some(t) = filter.mcp_type {
            q = q.bind(mcp_type_str(t));
        }
        if let Some(ref n) = filter.name {
            q = q.bind(n);
        }
        if let Some(s) = filter.status {
            q = q.bind(status_str(s));
        }
        let limit = if filter.limit == 0 { 50 } else { filter.limit };
        q = q.bind(limit as i64).bind((filter.page_number.saturating_sub(1) * limit) as i64);

        let rows = q.fetch_all(&self.pool).await.map_err(StorageError::from)?;
        rows.into_iter().map(row_to_call).collect()
    }
}

fn row_to_call(row: sqlx::sqlite::SqliteRow) -> Result<McpFunctionCall> {
    Ok(McpFunctionCall {
        call_uuid: row.try_get("call_uuid").map_err(StorageError::from)?,
        name: row.try_get("name").map_err(StorageError::from)?,
        mcp_type: parse_mcp_type(&row.try_get::<String, _>("mcp_type").map_err(StorageError::from)?)?,
        arguments: serde_json::from_str(&row.try_get::<String, _>("arguments").map_err(StorageError::from)?)?,
        status: parse_status(&row.try_get::<String, _>("status").map_err(StorageError::from)?),
        has_content: row.try_get::<i64, _>("has_content").map_err(StorageError::from)? != 0,
        content: row.try_get("content").map_err(StorageError::from)?,
        notes: row.try_get("notes").map_err(StorageError::from)?,
        time_spent_ms: row.try_get::<Option<i64>, _>("time_spent_ms").map_err(StorageError::from)?.map(|v| v as u64),
        updated_by: row.try_get("updated_by").map_err(StorageError::from)?,
        created_at: chrono::DateTime::parse_from_rfc3339(&row.try_get::<String, _>("created_at").map_err(StorageError::from)?)
            .map_err(|e| ConduitError::Internal(e.to_string()))?
            .with_timezone(&chrono::Utc),
        updated_at: chrono::DateTime::parse_from_rfc3339(&row.try_get::<String, _>("updated_at").map_err(StorageError::from)?)
            .map_err(|e| ConduitError::Internal(e.to_string()))?
            .with_timezone(&chrono::Utc),
    })
}

/// Filesystem-backed blob store, standing in for the production blob
/// store named only at its interface boundary (§1). Keys map to
/// slash-joined relative paths under `base_dir`; callers use the
/// `mcp_content/{call_uuid}.json` and `{package_name}.zip` conventions
/// named in §6.
pub struct FilesystemBlobStore {
    base_dir: PathBuf,
}

impl FilesystemBlobStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.contains("..") {
            return Err(ConduitError::InvalidArgument(format!("unsafe blob key: {key}")));
        }
        Ok(self.base_dir.join(key))
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Resolves a path is within `base_dir` for tests exercising the blob
/// store without going through the trait's dynamic dispatch.
#[allow(dead_code)]
fn is_within(base_dir: &Path, path: &Path) -> bool {
    path.starts_with(base_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_core::types::{CallUpdate, McpType};

    async fn memory_store() -> SqliteMetadataStore {
        SqliteMetadataStore::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn round_trips_a_function() {
        let store = memory_store().await;
        let f = McpFunction {
            name: "echo".to_string(),
            mcp_type: McpType::Tool,
            description: "echoes its input".to_string(),
            data: serde_json::json!({"inputSchema": {"properties": {"msg": {"type": "string"}}, "required": ["msg"]}}),
            annotations: serde_json::json!({}),
            module_name: Some("echo_module".to_string()),
            class_name: Some("EchoHandler".to_string()),
            function_name: Some("echo".to_string()),
            return_type: ReturnType::Text,
            is_async: false,
            updated_by: "system".to_string(),
        };
        store.put_function("acme", f.clone()).await.unwrap();
        let fetched = store.get_function("acme", "echo").await.unwrap().unwrap();
        assert_eq!(fetched.name, "echo");
        assert_eq!(fetched.module_name.as_deref(), Some("echo_module"));

        let others_view = store.get_function("other-tenant", "echo").await.unwrap();
        assert!(others_view.is_none());
    }

    #[tokio::test]
    async fn call_record_state_machine_advances_forward() {
        let store = memory_store().await;
        let call = McpFunctionCall {
            call_uuid: uuid::Uuid::new_v4().to_string(),
            name: "echo".to_string(),
            mcp_type: McpType::Tool,
            arguments: serde_json::json!({"msg": "hi"}),
            status: CallStatus::Initial,
            has_content: false,
            content: None,
            notes: None,
            time_spent_ms: None,
            updated_by: "system".to_string(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        let created = store.create_call("acme", call).await.unwrap();
        let updated = store
            .update_call(
                "acme",
                &created.call_uuid,
                CallUpdate {
                    status: Some(CallStatus::Completed),
                    content: Some("hi".to_string()),
                    has_content: Some(false),
                    notes: None,
                    time_spent_ms: Some(12),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, CallStatus::Completed);
        assert_eq!(updated.content.as_deref(), Some("hi"));
    }

    #[tokio::test]
    async fn filesystem_blob_store_round_trips_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBlobStore::new(dir.path());
        store.put("mcp_content/abc.json", b"{\"a\":1}".to_vec()).await.unwrap();
        let got = store.get("mcp_content/abc.json").await.unwrap().unwrap();
        assert_eq!(got, b"{\"a\":1}");
        assert!(store.get("mcp_content/missing.json").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn blob_store_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBlobStore::new(dir.path());
        let err = store.get("../escape.json").await.unwrap_err();
        assert!(matches!(err, ConduitError::InvalidArgument(_)));
    }
}
