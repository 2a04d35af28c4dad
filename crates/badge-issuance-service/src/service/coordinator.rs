//! 徽章发放协调器
//!
//! 对单个 (条件, 用户) 完成一次发放：解析收件地址和邮件内容，调用外部服务，
//! 成功后写入满足记录。
//!
//! ## 幂等
//!
//! 1. 进程内占用表拦截同一进程的并发请求
//! 2. 外部调用前再次检查满足记录
//! 3. `mark_satisfied` 的唯一约束作为最终裁决
//!
//! 跨进程并发时，两个实例可能都通过第 2 步并各自调用外部服务，
//! 后写入者在第 3 步得到 `AlreadySatisfied`，此时外部服务已被调用两次。

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use obf_shared::observability::metrics;
use tracing::{debug, error, info, instrument, warn};

use super::dto::IssuanceOutcome;
use super::inflight::InflightClaims;
use crate::client::{BadgeIssuingService, IssueBadgeRequest};
use crate::error::{IssuanceError, Result};
use crate::host::UserDirectory;
use crate::models::{Badge, Criterion, EmailTemplate};
use crate::repository::{BadgeCatalog, CriterionStore};

/// 发放协调器
pub struct IssuanceCoordinator {
    store: Arc<dyn CriterionStore>,
    badges: Arc<dyn BadgeCatalog>,
    users: Arc<dyn UserDirectory>,
    issuer: Arc<dyn BadgeIssuingService>,
    claims: InflightClaims,
    call_timeout: Duration,
}

impl IssuanceCoordinator {
    pub fn new(
        store: Arc<dyn CriterionStore>,
        badges: Arc<dyn BadgeCatalog>,
        users: Arc<dyn UserDirectory>,
        issuer: Arc<dyn BadgeIssuingService>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            store,
            badges,
            users,
            issuer,
            claims: InflightClaims::new(),
            call_timeout,
        }
    }

    /// 解析收件地址：已配置背包时使用背包邮箱，否则使用账号邮箱
    pub async fn resolve_recipients(&self, user_id: i64) -> Result<Vec<String>> {
        if let Some(backpack) = self.users.get_backpack(user_id).await? {
            return Ok(vec![backpack.email]);
        }

        let user = self
            .users
            .get_user(user_id)
            .await?
            .ok_or(IssuanceError::UserNotFound(user_id))?;
        Ok(vec![user.email])
    }

    /// 解析邮件内容：徽章自定义邮件优先，否则使用默认模板
    pub async fn resolve_email(&self, badge_id: &str) -> Result<EmailTemplate> {
        match self.badges.get_badge(badge_id).await? {
            Some(badge) => Ok(badge.effective_email()),
            None => {
                debug!(badge_id, "徽章未配置本地邮件，使用默认模板");
                Ok(Badge::new(badge_id, "").effective_email())
            }
        }
    }

    /// 发放徽章并写入满足记录
    #[instrument(skip(self, criterion), fields(criterion_id = criterion.id, badge_id = %criterion.badge_id))]
    pub async fn issue(
        &self,
        criterion: &Criterion,
        user_id: i64,
        event_time: DateTime<Utc>,
    ) -> Result<IssuanceOutcome> {
        let Some(_claim) = self.claims.try_claim(criterion.id, user_id) else {
            return Ok(IssuanceOutcome::InProgress);
        };

        if self.store.is_satisfied(criterion.id, user_id).await? {
            debug!("用户已满足该条件，跳过发放");
            return Ok(IssuanceOutcome::AlreadySatisfied);
        }

        let recipients = self.resolve_recipients(user_id).await?;
        let email = self.resolve_email(&criterion.badge_id).await?;
        let request = IssueBadgeRequest::new(&criterion.badge_id, recipients, event_time, email);

        let start = Instant::now();
        let result = match tokio::time::timeout(self.call_timeout, self.issuer.issue_badge(&request))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(IssuanceError::ServiceUnavailable(format!(
                "外部发放调用超时（{} ms）",
                self.call_timeout.as_millis()
            ))),
        };
        let elapsed = start.elapsed().as_secs_f64();

        if let Err(e) = result {
            metrics::record_badge_issuance(e.error_code(), elapsed);
            if e.requires_operator_alert() {
                error!(user_id, error = %e, "徽章发放失败，需要运维处理证书");
            } else {
                warn!(user_id, error = %e, retryable = e.is_retryable(), "徽章发放失败");
            }
            return Err(e);
        }
        metrics::record_badge_issuance("issued", elapsed);

        match self
            .store
            .mark_satisfied(criterion.id, user_id, event_time)
            .await
        {
            Ok(record) => {
                info!(user_id, "徽章发放成功");
                Ok(IssuanceOutcome::Issued(record))
            }
            Err(IssuanceError::AlreadySatisfied { .. }) => {
                warn!(
                    user_id,
                    "满足记录已由并发请求写入，本次外部发放为重复投递（at-least-once）"
                );
                Ok(IssuanceOutcome::AlreadySatisfied)
            }
            Err(e) => {
                metrics::record_reconciliation_hazard();
                error!(
                    criterion_id = criterion.id,
                    user_id,
                    error = %e,
                    "徽章已对外发放但满足记录写入失败，需要人工对账"
                );
                Err(IssuanceError::StorageWriteFailure {
                    criterion_id: criterion.id,
                    user_id,
                    reason: e.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockBadgeIssuingService;
    use crate::host::MockUserDirectory;
    use crate::models::{Backpack, CriterionRule, RuleCondition, SatisfactionRecord, User};
    use crate::repository::{InMemoryCriterionStore, MockBadgeCatalog, MockCriterionStore};
    use crate::models::NewCriterion;

    fn users_with_backpack(backpack: Option<&'static str>) -> MockUserDirectory {
        let mut users = MockUserDirectory::new();
        users
            .expect_get_backpack()
            .returning(move |user_id| {
                Ok(backpack.map(|email| Backpack {
                    user_id,
                    email: email.to_string(),
                }))
            });
        users
            .expect_get_user()
            .returning(|id| Ok(Some(User::new(id, format!("u{id}@example.com")))));
        users
    }

    fn empty_catalog() -> MockBadgeCatalog {
        let mut badges = MockBadgeCatalog::new();
        badges.expect_get_badge().returning(|_| Ok(None));
        badges
    }

    fn criterion(id: i64) -> Criterion {
        Criterion {
            id,
            course_id: 42,
            badge_id: "B1".to_string(),
            rule: CriterionRule::all(vec![RuleCondition::Completed]),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn coordinator(
        store: Arc<dyn CriterionStore>,
        users: MockUserDirectory,
        issuer: MockBadgeIssuingService,
    ) -> IssuanceCoordinator {
        IssuanceCoordinator::new(
            store,
            Arc::new(empty_catalog()),
            Arc::new(users),
            Arc::new(issuer),
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn test_backpack_address_preferred() {
        let c = coordinator(
            Arc::new(InMemoryCriterionStore::new()),
            users_with_backpack(Some("u7@backpack.example")),
            MockBadgeIssuingService::new(),
        );
        assert_eq!(
            c.resolve_recipients(7).await.unwrap(),
            vec!["u7@backpack.example".to_string()]
        );
    }

    #[tokio::test]
    async fn test_default_address_without_backpack() {
        let c = coordinator(
            Arc::new(InMemoryCriterionStore::new()),
            users_with_backpack(None),
            MockBadgeIssuingService::new(),
        );
        assert_eq!(
            c.resolve_recipients(7).await.unwrap(),
            vec!["u7@example.com".to_string()]
        );
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let mut users = MockUserDirectory::new();
        users.expect_get_backpack().returning(|_| Ok(None));
        users.expect_get_user().returning(|_| Ok(None));
        let c = coordinator(
            Arc::new(InMemoryCriterionStore::new()),
            users,
            MockBadgeIssuingService::new(),
        );

        let err = c.resolve_recipients(7).await.unwrap_err();
        assert!(matches!(err, IssuanceError::UserNotFound(7)));
    }

    #[tokio::test]
    async fn test_custom_email_used_when_set() {
        let mut badges = MockBadgeCatalog::new();
        badges.expect_get_badge().returning(|id| {
            Ok(Some(
                Badge::new(id, "Rust").with_email(EmailTemplate::new("Hi", "Body", "Foot")),
            ))
        });
        let c = IssuanceCoordinator::new(
            Arc::new(InMemoryCriterionStore::new()),
            Arc::new(badges),
            Arc::new(users_with_backpack(None)),
            Arc::new(MockBadgeIssuingService::new()),
            Duration::from_secs(1),
        );

        let email = c.resolve_email("B1").await.unwrap();
        assert_eq!(email.subject, "Hi");
        assert_eq!(email.footer, "Foot");
    }

    #[tokio::test]
    async fn test_default_email_when_badge_unknown() {
        let c = coordinator(
            Arc::new(InMemoryCriterionStore::new()),
            users_with_backpack(None),
            MockBadgeIssuingService::new(),
        );
        assert_eq!(c.resolve_email("B1").await.unwrap(), EmailTemplate::default());
    }

    #[tokio::test]
    async fn test_issue_twice_calls_service_once() {
        let store = Arc::new(InMemoryCriterionStore::new());
        let created = store
            .create_criterion(NewCriterion::new(
                42,
                "B1",
                CriterionRule::all(vec![RuleCondition::Completed]),
            ))
            .await
            .unwrap();

        let mut issuer = MockBadgeIssuingService::new();
        issuer
            .expect_issue_badge()
            .withf(|req| req.recipients == vec!["u7@example.com".to_string()])
            .times(1)
            .returning(|_| Ok(()));

        let c = coordinator(store.clone(), users_with_backpack(None), issuer);
        let now = Utc::now();

        let first = c.issue(&created, 7, now).await.unwrap();
        assert!(matches!(first, IssuanceOutcome::Issued(_)));
        let second = c.issue(&created, 7, now).await.unwrap();
        assert_eq!(second, IssuanceOutcome::AlreadySatisfied);
        assert_eq!(store.satisfaction_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_call_does_not_mark_satisfied() {
        let mut store = MockCriterionStore::new();
        store.expect_is_satisfied().returning(|_, _| Ok(false));
        store.expect_mark_satisfied().never();

        let mut issuer = MockBadgeIssuingService::new();
        issuer
            .expect_issue_badge()
            .returning(|_| Err(IssuanceError::ServiceUnavailable("reset".to_string())));

        let c = coordinator(Arc::new(store), users_with_backpack(None), issuer);
        let err = c.issue(&criterion(1), 7, Utc::now()).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_timeout_is_service_unavailable() {
        let mut store = MockCriterionStore::new();
        store.expect_is_satisfied().returning(|_, _| Ok(false));
        store.expect_mark_satisfied().never();

        struct SlowIssuer;

        #[async_trait::async_trait]
        impl BadgeIssuingService for SlowIssuer {
            async fn issue_badge(&self, _request: &IssueBadgeRequest) -> Result<()> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            }

            async fn get_certificate_expiration_date(&self) -> Result<DateTime<Utc>> {
                Ok(Utc::now())
            }
        }

        let c = IssuanceCoordinator::new(
            Arc::new(store),
            Arc::new(empty_catalog()),
            Arc::new(users_with_backpack(None)),
            Arc::new(SlowIssuer),
            Duration::from_millis(50),
        );

        let err = c.issue(&criterion(1), 7, Utc::now()).await.unwrap_err();
        assert!(matches!(err, IssuanceError::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_storage_failure_after_issue_is_reported() {
        let mut store = MockCriterionStore::new();
        store.expect_is_satisfied().returning(|_, _| Ok(false));
        store
            .expect_mark_satisfied()
            .returning(|_, _, _| Err(IssuanceError::Database(sqlx::Error::PoolTimedOut)));

        let mut issuer = MockBadgeIssuingService::new();
        issuer.expect_issue_badge().times(1).returning(|_| Ok(()));

        let c = coordinator(Arc::new(store), users_with_backpack(None), issuer);
        let err = c.issue(&criterion(3), 7, Utc::now()).await.unwrap_err();

        assert!(matches!(
            err,
            IssuanceError::StorageWriteFailure {
                criterion_id: 3,
                user_id: 7,
                ..
            }
        ));
        assert!(err.requires_operator_alert());
    }

    #[tokio::test]
    async fn test_lost_race_is_no_op() {
        let mut store = MockCriterionStore::new();
        store.expect_is_satisfied().returning(|_, _| Ok(false));
        store.expect_mark_satisfied().returning(|criterion_id, user_id, _| {
            Err(IssuanceError::AlreadySatisfied {
                criterion_id,
                user_id,
            })
        });

        let mut issuer = MockBadgeIssuingService::new();
        issuer.expect_issue_badge().returning(|_| Ok(()));

        let c = coordinator(Arc::new(store), users_with_backpack(None), issuer);
        let outcome = c.issue(&criterion(1), 7, Utc::now()).await.unwrap();
        assert_eq!(outcome, IssuanceOutcome::AlreadySatisfied);
    }

    #[tokio::test]
    async fn test_record_uses_event_time() {
        let mut store = MockCriterionStore::new();
        store.expect_is_satisfied().returning(|_, _| Ok(false));
        store
            .expect_mark_satisfied()
            .returning(|criterion_id, user_id, met_at| {
                Ok(SatisfactionRecord {
                    criterion_id,
                    user_id,
                    met_at,
                })
            });
        let mut issuer = MockBadgeIssuingService::new();
        issuer.expect_issue_badge().returning(|_| Ok(()));

        let c = coordinator(Arc::new(store), users_with_backpack(None), issuer);
        let event_time = Utc::now() - chrono::Duration::hours(1);
        let outcome = c.issue(&criterion(1), 7, event_time).await.unwrap();

        match outcome {
            IssuanceOutcome::Issued(record) => assert_eq!(record.met_at, event_time),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
