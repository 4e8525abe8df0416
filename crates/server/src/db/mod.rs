use anyhow::Result;
use chrono::{DateTime, Utc};
use shared::{
    Approval, ApprovalStatus, Deliverable, DeliverableStatus, Notification, Project, User,
    Version, VersionStatus,
};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

mod models;

pub use models::*;

const USER_COLUMNS: &str = "id, email, full_name, role, phone, whatsapp, created_at";
const PROJECT_COLUMNS: &str = "id, name, description, status, priority, client_id, manager_id, \
     progress, budget, start_date, due_date, created_at";
const DELIVERABLE_COLUMNS: &str =
    "id, project_id, title, status, requires_review, current_version_id, due_date, created_at";
const VERSION_COLUMNS: &str = "id, deliverable_id, version_number, status, file_name, file_url, \
     file_size, mime_type, uploaded_by, created_at";
const APPROVAL_COLUMNS: &str =
    "id, version_id, approver_id, method, status, token, comment, responded_at, created_at";
const NOTIFICATION_COLUMNS: &str =
    "id, user_id, channel, type, title, message, severity, action_url, status, created_at";

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

fn rfc3339(value: Option<DateTime<Utc>>) -> Option<String> {
    value.map(|dt| dt.to_rfc3339())
}

fn id(value: Option<Uuid>) -> Option<String> {
    value.map(|id| id.to_string())
}

impl Database {
    pub async fn new(path: &str) -> Result<Self> {
        // Ensure the directory exists
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Concurrent writers wait for the lock instead of failing at once.
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Private database living as long as its single connection.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    pub async fn run_migrations(&self) -> Result<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT UNIQUE NOT NULL,
                full_name TEXT,
                role TEXT NOT NULL DEFAULT 'client',
                phone TEXT,
                whatsapp TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS projects (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                status TEXT NOT NULL DEFAULT 'planning',
                priority TEXT NOT NULL DEFAULT 'medium',
                client_id TEXT REFERENCES users(id),
                manager_id TEXT REFERENCES users(id),
                progress INTEGER NOT NULL DEFAULT 0,
                budget REAL,
                start_date DATETIME,
                due_date DATETIME,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS deliverables (
                id TEXT PRIMARY KEY,
                project_id TEXT NOT NULL REFERENCES projects(id),
                title TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'draft',
                requires_review BOOLEAN NOT NULL DEFAULT 1,
                current_version_id TEXT,
                due_date DATETIME,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS versions (
                id TEXT PRIMARY KEY,
                deliverable_id TEXT NOT NULL REFERENCES deliverables(id),
                version_number INTEGER NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                file_name TEXT,
                file_url TEXT,
                file_size INTEGER,
                mime_type TEXT,
                uploaded_by TEXT REFERENCES users(id),
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS approvals (
                id TEXT PRIMARY KEY,
                version_id TEXT NOT NULL REFERENCES versions(id),
                approver_id TEXT NOT NULL REFERENCES users(id),
                method TEXT NOT NULL DEFAULT 'in-app',
                status TEXT NOT NULL DEFAULT 'pending',
                token TEXT UNIQUE,
                comment TEXT,
                responded_at DATETIME,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS notifications (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id),
                channel TEXT NOT NULL DEFAULT 'in-app',
                type TEXT NOT NULL DEFAULT 'general',
                title TEXT NOT NULL,
                message TEXT NOT NULL,
                severity TEXT NOT NULL DEFAULT 'info',
                action_url TEXT,
                status TEXT NOT NULL DEFAULT 'unread',
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        ];

        for statement in statements {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        tracing::info!("Database migrations completed");
        Ok(())
    }

    // User operations
    pub async fn create_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (id, email, full_name, role, phone, whatsapp) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(user.id.to_string())
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(user.role.as_str())
        .bind(&user.phone)
        .bind(&user.whatsapp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = ?",
            USER_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    // Project operations
    pub async fn create_project(&self, project: &Project) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO projects
                (id, name, description, status, priority, client_id, manager_id,
                 progress, budget, start_date, due_date)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(project.id.to_string())
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.status.as_str())
        .bind(project.priority.as_str())
        .bind(id(project.client_id))
        .bind(id(project.manager_id))
        .bind(i64::from(project.progress))
        .bind(project.budget)
        .bind(rfc3339(project.start_date))
        .bind(rfc3339(project.due_date))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_projects(&self) -> Result<Vec<Project>> {
        let rows = sqlx::query_as::<_, ProjectRow>(&format!(
            "SELECT {} FROM projects ORDER BY created_at DESC, name",
            PROJECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Project::try_from).collect()
    }

    // Deliverable operations
    pub async fn create_deliverable(&self, deliverable: &Deliverable) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO deliverables
                (id, project_id, title, status, requires_review, current_version_id, due_date)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(deliverable.id.to_string())
        .bind(deliverable.project_id.to_string())
        .bind(&deliverable.title)
        .bind(deliverable.status.as_str())
        .bind(deliverable.requires_review)
        .bind(id(deliverable.current_version_id))
        .bind(rfc3339(deliverable.due_date))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_deliverable(&self, id: Uuid) -> Result<Option<Deliverable>> {
        let row = sqlx::query_as::<_, DeliverableRow>(&format!(
            "SELECT {} FROM deliverables WHERE id = ?",
            DELIVERABLE_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Deliverable::try_from).transpose()
    }

    // Version operations

    /// Insert a version and make it the deliverable's current one.
    pub async fn create_version(&self, version: &Version) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO versions
                (id, deliverable_id, version_number, status, file_name, file_url,
                 file_size, mime_type, uploaded_by)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(version.id.to_string())
        .bind(version.deliverable_id.to_string())
        .bind(i64::from(version.version_number))
        .bind(version.status.as_str())
        .bind(&version.file_name)
        .bind(&version.file_url)
        .bind(version.file_size.map(|size| size as i64))
        .bind(&version.mime_type)
        .bind(id(version.uploaded_by))
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE deliverables SET current_version_id = ? WHERE id = ?")
            .bind(version.id.to_string())
            .bind(version.deliverable_id.to_string())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn get_version(&self, id: Uuid) -> Result<Option<Version>> {
        let row = sqlx::query_as::<_, VersionRow>(&format!(
            "SELECT {} FROM versions WHERE id = ?",
            VERSION_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Version::try_from).transpose()
    }

    // Approval operations
    pub async fn create_approval(&self, approval: &Approval) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO approvals (id, version_id, approver_id, method, status, token)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(approval.id.to_string())
        .bind(approval.version_id.to_string())
        .bind(approval.approver_id.to_string())
        .bind(approval.method.as_str())
        .bind(approval.status.as_str())
        .bind(&approval.token)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_approval_by_token(&self, token: &str) -> Result<Option<Approval>> {
        let row = sqlx::query_as::<_, ApprovalRow>(&format!(
            "SELECT {} FROM approvals WHERE token = ?",
            APPROVAL_COLUMNS
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Approval::try_from).transpose()
    }

    /// Record the answer to the pending approval holding `token`.
    ///
    /// The approval, its version and the owning deliverable are updated in
    /// one transaction so the version status always matches the approval.
    /// The approval is claimed by a conditional update, so of two answers
    /// racing for the same token only one wins. Returns `None` when no
    /// pending approval carries the token.
    pub async fn resolve_approval(
        &self,
        token: &str,
        status: ApprovalStatus,
        comment: Option<&str>,
    ) -> Result<Option<Approval>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ApprovalRow>(&format!(
            "UPDATE approvals SET status = ?, comment = ?, responded_at = ? \
             WHERE token = ? AND status = ? \
             RETURNING {}",
            APPROVAL_COLUMNS
        ))
        .bind(status.as_str())
        .bind(comment)
        .bind(Utc::now().to_rfc3339())
        .bind(token)
        .bind(ApprovalStatus::Pending.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        sqlx::query("UPDATE versions SET status = ? WHERE id = ?")
            .bind(VersionStatus::from(status).as_str())
            .bind(&row.version_id)
            .execute(&mut *tx)
            .await?;

        if let Some(deliverable_status) = deliverable_status_for(status) {
            sqlx::query("UPDATE deliverables SET status = ? WHERE current_version_id = ?")
                .bind(deliverable_status.as_str())
                .bind(&row.version_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(Some(Approval::try_from(row)?))
    }

    // Notification operations
    pub async fn create_notification(&self, notification: &Notification) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications
                (id, user_id, channel, type, title, message, severity, action_url, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(notification.id.to_string())
        .bind(notification.user_id.to_string())
        .bind(notification.channel.as_str())
        .bind(&notification.kind)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.severity.as_str())
        .bind(&notification.action_url)
        .bind(notification.status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_notifications(&self, user_id: Uuid) -> Result<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            "SELECT {} FROM notifications WHERE user_id = ? ORDER BY created_at DESC",
            NOTIFICATION_COLUMNS
        ))
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Notification::try_from).collect()
    }

    /// Returns false when no notification has this id.
    pub async fn mark_notification_read(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("UPDATE notifications SET status = 'read' WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// A rejected version sends its deliverable back for revision.
fn deliverable_status_for(status: ApprovalStatus) -> Option<DeliverableStatus> {
    match status {
        ApprovalStatus::Approved => Some(DeliverableStatus::Approved),
        ApprovalStatus::Rejected => Some(DeliverableStatus::Revision),
        ApprovalStatus::Pending => None,
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use shared::{Channel, NotificationStatus, ProjectStatus, Severity};

    #[tokio::test]
    async fn test_projects_round_trip() {
        let db = Database::in_memory().await.unwrap();
        db.create_project(&project("Brand Refresh", ProjectStatus::Completed))
            .await
            .unwrap();
        db.create_project(&project("Mobile App", ProjectStatus::Active))
            .await
            .unwrap();

        let projects = db.list_projects().await.unwrap();
        assert_eq!(projects.len(), 2);
        assert!(projects.iter().all(|p| p.created_at.is_some()));
        assert_eq!(
            projects.iter().filter(|p| p.status == ProjectStatus::Active).count(),
            1
        );
    }

    #[tokio::test]
    async fn test_create_version_sets_current_version() {
        let db = Database::in_memory().await.unwrap();
        let seeded = seed(&db).await;

        let deliverable = db.get_deliverable(seeded.deliverable.id).await.unwrap().unwrap();
        assert_eq!(deliverable.current_version_id, Some(seeded.version.id));
    }

    #[tokio::test]
    async fn test_approve_updates_version_and_deliverable() {
        let db = Database::in_memory().await.unwrap();
        let seeded = seed(&db).await;
        pending_approval(&db, &seeded, "APP-AB12C9").await;

        let approval = db
            .resolve_approval("APP-AB12C9", ApprovalStatus::Approved, Some("looks great"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(approval.status, ApprovalStatus::Approved);
        assert!(approval.responded_at.is_some());

        let version = db.get_version(seeded.version.id).await.unwrap().unwrap();
        assert_eq!(version.status, VersionStatus::Approved);
        let deliverable = db.get_deliverable(seeded.deliverable.id).await.unwrap().unwrap();
        assert_eq!(deliverable.status, DeliverableStatus::Approved);

        let stored = db.get_approval_by_token("APP-AB12C9").await.unwrap().unwrap();
        assert_eq!(stored.comment.as_deref(), Some("looks great"));
    }

    #[tokio::test]
    async fn test_reject_sends_deliverable_to_revision() {
        let db = Database::in_memory().await.unwrap();
        let seeded = seed(&db).await;
        pending_approval(&db, &seeded, "APP-ZZ0099").await;

        db.resolve_approval("APP-ZZ0099", ApprovalStatus::Rejected, None)
            .await
            .unwrap()
            .unwrap();

        let version = db.get_version(seeded.version.id).await.unwrap().unwrap();
        assert_eq!(version.status, VersionStatus::Rejected);
        let deliverable = db.get_deliverable(seeded.deliverable.id).await.unwrap().unwrap();
        assert_eq!(deliverable.status, DeliverableStatus::Revision);
    }

    #[tokio::test]
    async fn test_resolved_token_cannot_be_reused() {
        let db = Database::in_memory().await.unwrap();
        let seeded = seed(&db).await;
        pending_approval(&db, &seeded, "APP-111111").await;

        assert!(db
            .resolve_approval("APP-111111", ApprovalStatus::Approved, None)
            .await
            .unwrap()
            .is_some());
        assert!(db
            .resolve_approval("APP-111111", ApprovalStatus::Rejected, None)
            .await
            .unwrap()
            .is_none());
        assert!(db
            .resolve_approval("APP-UNKNOWN", ApprovalStatus::Approved, None)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_racing_answers_resolve_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nexaflow.db");
        let db = Database::new(path.to_str().unwrap()).await.unwrap();
        db.run_migrations().await.unwrap();
        let seeded = seed(&db).await;

        for round in 0..10 {
            let token = format!("APP-RACE{:02}", round);
            pending_approval(&db, &seeded, &token).await;

            let (approved, rejected) = tokio::join!(
                db.resolve_approval(&token, ApprovalStatus::Approved, None),
                db.resolve_approval(&token, ApprovalStatus::Rejected, None),
            );
            let approved = approved.unwrap();
            let rejected = rejected.unwrap();
            assert!(approved.is_some() != rejected.is_some());

            let winner = approved.or(rejected).unwrap();
            let stored = db.get_approval_by_token(&token).await.unwrap().unwrap();
            assert_eq!(stored.status, winner.status);
        }
    }

    #[tokio::test]
    async fn test_notifications_mark_read() {
        let db = Database::in_memory().await.unwrap();
        let seeded = seed(&db).await;

        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: seeded.approver.id,
            channel: Channel::InApp,
            kind: "approval".to_string(),
            title: "New version".to_string(),
            message: "Homepage Mockups v2 is ready".to_string(),
            severity: Severity::Info,
            action_url: None,
            status: NotificationStatus::Unread,
            created_at: None,
        };
        db.create_notification(&notification).await.unwrap();

        assert!(db.mark_notification_read(notification.id).await.unwrap());
        assert!(!db.mark_notification_read(Uuid::new_v4()).await.unwrap());

        let stored = db.list_notifications(seeded.approver.id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status, NotificationStatus::Read);
        assert_eq!(stored[0].kind, "approval");
    }
}
