//! 发放条件 PostgreSQL 仓储
//!
//! 满足记录以 (criterion_id, user_id) 为主键，唯一性由数据库保证。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use super::traits::{BadgeCatalog, CriterionStore};
use crate::error::{IssuanceError, Result};
use crate::models::{
    Badge, Criterion, CriterionRule, EmailTemplate, NewCriterion, SatisfactionRecord,
};

#[derive(sqlx::FromRow)]
struct CriterionRow {
    id: i64,
    course_id: i64,
    badge_id: String,
    rule: Json<CriterionRule>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CriterionRow> for Criterion {
    fn from(row: CriterionRow) -> Self {
        Self {
            id: row.id,
            course_id: row.course_id,
            badge_id: row.badge_id,
            rule: row.rule.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SatisfactionRow {
    criterion_id: i64,
    user_id: i64,
    met_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct BadgeRow {
    id: String,
    name: String,
    email_subject: Option<String>,
    email_body: Option<String>,
    email_footer: Option<String>,
}

impl From<BadgeRow> for Badge {
    fn from(row: BadgeRow) -> Self {
        let email = match (row.email_subject, row.email_body) {
            (Some(subject), Some(body)) => Some(EmailTemplate::new(
                subject,
                body,
                row.email_footer.unwrap_or_default(),
            )),
            _ => None,
        };
        Self {
            id: row.id,
            name: row.name,
            email,
        }
    }
}

/// 发放条件仓储
pub struct PgCriterionStore {
    pool: PgPool,
}

impl PgCriterionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 执行内置迁移
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| IssuanceError::Database(e.into()))?;
        Ok(())
    }
}

#[async_trait]
impl CriterionStore for PgCriterionStore {
    async fn criteria_for_course(&self, course_id: i64) -> Result<Vec<Criterion>> {
        let rows = sqlx::query_as::<_, CriterionRow>(
            r#"
            SELECT id, course_id, badge_id, rule, created_at, updated_at
            FROM obf_criteria
            WHERE course_id = $1
            ORDER BY id
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Criterion::from).collect())
    }

    async fn get_criterion(&self, criterion_id: i64) -> Result<Option<Criterion>> {
        let row = sqlx::query_as::<_, CriterionRow>(
            r#"
            SELECT id, course_id, badge_id, rule, created_at, updated_at
            FROM obf_criteria
            WHERE id = $1
            "#,
        )
        .bind(criterion_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Criterion::from))
    }

    async fn create_criterion(&self, criterion: NewCriterion) -> Result<Criterion> {
        let row = sqlx::query_as::<_, CriterionRow>(
            r#"
            INSERT INTO obf_criteria (course_id, badge_id, rule, created_at, updated_at)
            VALUES ($1, $2, $3, NOW(), NOW())
            RETURNING id, course_id, badge_id, rule, created_at, updated_at
            "#,
        )
        .bind(criterion.course_id)
        .bind(&criterion.badge_id)
        .bind(Json(&criterion.rule))
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn update_rule(&self, criterion_id: i64, rule: CriterionRule) -> Result<Criterion> {
        let row = sqlx::query_as::<_, CriterionRow>(
            r#"
            UPDATE obf_criteria
            SET rule = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, course_id, badge_id, rule, created_at, updated_at
            "#,
        )
        .bind(criterion_id)
        .bind(Json(&rule))
        .fetch_optional(&self.pool)
        .await?;

        row.map(Criterion::from)
            .ok_or(IssuanceError::CriterionNotFound(criterion_id))
    }

    async fn is_satisfied(&self, criterion_id: i64, user_id: i64) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM obf_criterion_met
                WHERE criterion_id = $1 AND user_id = $2
            )
            "#,
        )
        .bind(criterion_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn mark_satisfied(
        &self,
        criterion_id: i64,
        user_id: i64,
        met_at: DateTime<Utc>,
    ) -> Result<SatisfactionRecord> {
        // 冲突时不返回行，据此判定并发写入中的后到者
        let row = sqlx::query_as::<_, SatisfactionRow>(
            r#"
            INSERT INTO obf_criterion_met (criterion_id, user_id, met_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (criterion_id, user_id) DO NOTHING
            RETURNING criterion_id, user_id, met_at
            "#,
        )
        .bind(criterion_id)
        .bind(user_id)
        .bind(met_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e
                && db.is_foreign_key_violation()
            {
                return IssuanceError::CriterionNotFound(criterion_id);
            }
            IssuanceError::Database(e)
        })?;

        match row {
            Some(row) => Ok(SatisfactionRecord {
                criterion_id: row.criterion_id,
                user_id: row.user_id,
                met_at: row.met_at,
            }),
            None => Err(IssuanceError::AlreadySatisfied {
                criterion_id,
                user_id,
            }),
        }
    }

    async fn delete_criteria_for_course(&self, course_id: i64) -> Result<u64> {
        // obf_criterion_met 通过 ON DELETE CASCADE 一并删除
        let result = sqlx::query("DELETE FROM obf_criteria WHERE course_id = $1")
            .bind(course_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl BadgeCatalog for PgCriterionStore {
    async fn get_badge(&self, badge_id: &str) -> Result<Option<Badge>> {
        let row = sqlx::query_as::<_, BadgeRow>(
            r#"
            SELECT id, name, email_subject, email_body, email_footer
            FROM obf_badges
            WHERE id = $1
            "#,
        )
        .bind(badge_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Badge::from))
    }

    async fn save_badge(&self, badge: &Badge) -> Result<()> {
        let (subject, body, footer) = match &badge.email {
            Some(email) => (
                Some(email.subject.as_str()),
                Some(email.body.as_str()),
                Some(email.footer.as_str()),
            ),
            None => (None, None, None),
        };

        sqlx::query(
            r#"
            INSERT INTO obf_badges (id, name, email_subject, email_body, email_footer, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name,
                email_subject = EXCLUDED.email_subject,
                email_body = EXCLUDED.email_body,
                email_footer = EXCLUDED.email_footer,
                updated_at = NOW()
            "#,
        )
        .bind(&badge.id)
        .bind(&badge.name)
        .bind(subject)
        .bind(body)
        .bind(footer)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
