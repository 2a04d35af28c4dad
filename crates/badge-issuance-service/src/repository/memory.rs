//! 进程内发放条件存储
//!
//! 单实例部署与测试使用。所有写操作在同一把写锁内完成，
//! 因此"检查是否已满足 + 写入记录"是原子的。

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::traits::{BadgeCatalog, CriterionStore};
use crate::error::{IssuanceError, Result};
use crate::models::{Badge, Criterion, CriterionRule, NewCriterion, SatisfactionRecord};

#[derive(Default)]
struct State {
    next_id: i64,
    criteria: BTreeMap<i64, Criterion>,
    records: HashMap<(i64, i64), SatisfactionRecord>,
    badges: HashMap<String, Badge>,
}

/// 进程内存储
#[derive(Default)]
pub struct InMemoryCriterionStore {
    state: RwLock<State>,
}

impl InMemoryCriterionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前满足记录总数
    pub fn satisfaction_count(&self) -> usize {
        self.state.read().records.len()
    }
}

#[async_trait]
impl CriterionStore for InMemoryCriterionStore {
    async fn criteria_for_course(&self, course_id: i64) -> Result<Vec<Criterion>> {
        let state = self.state.read();
        Ok(state
            .criteria
            .values()
            .filter(|c| c.course_id == course_id)
            .cloned()
            .collect())
    }

    async fn get_criterion(&self, criterion_id: i64) -> Result<Option<Criterion>> {
        Ok(self.state.read().criteria.get(&criterion_id).cloned())
    }

    async fn create_criterion(&self, criterion: NewCriterion) -> Result<Criterion> {
        let mut state = self.state.write();
        state.next_id += 1;
        let now = Utc::now();
        let created = Criterion {
            id: state.next_id,
            course_id: criterion.course_id,
            badge_id: criterion.badge_id,
            rule: criterion.rule,
            created_at: now,
            updated_at: now,
        };
        state.criteria.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_rule(&self, criterion_id: i64, rule: CriterionRule) -> Result<Criterion> {
        let mut state = self.state.write();
        let criterion = state
            .criteria
            .get_mut(&criterion_id)
            .ok_or(IssuanceError::CriterionNotFound(criterion_id))?;
        criterion.rule = rule;
        criterion.updated_at = Utc::now();
        Ok(criterion.clone())
    }

    async fn is_satisfied(&self, criterion_id: i64, user_id: i64) -> Result<bool> {
        Ok(self
            .state
            .read()
            .records
            .contains_key(&(criterion_id, user_id)))
    }

    async fn mark_satisfied(
        &self,
        criterion_id: i64,
        user_id: i64,
        met_at: DateTime<Utc>,
    ) -> Result<SatisfactionRecord> {
        let mut state = self.state.write();
        if !state.criteria.contains_key(&criterion_id) {
            return Err(IssuanceError::CriterionNotFound(criterion_id));
        }
        if state.records.contains_key(&(criterion_id, user_id)) {
            return Err(IssuanceError::AlreadySatisfied {
                criterion_id,
                user_id,
            });
        }

        let record = SatisfactionRecord {
            criterion_id,
            user_id,
            met_at,
        };
        state
            .records
            .insert((criterion_id, user_id), record.clone());
        Ok(record)
    }

    async fn delete_criteria_for_course(&self, course_id: i64) -> Result<u64> {
        let mut state = self.state.write();
        let removed: Vec<i64> = state
            .criteria
            .values()
            .filter(|c| c.course_id == course_id)
            .map(|c| c.id)
            .collect();

        for id in &removed {
            state.criteria.remove(id);
        }
        state
            .records
            .retain(|(criterion_id, _), _| !removed.contains(criterion_id));

        Ok(removed.len() as u64)
    }
}

#[async_trait]
impl BadgeCatalog for InMemoryCriterionStore {
    async fn get_badge(&self, badge_id: &str) -> Result<Option<Badge>> {
        Ok(self.state.read().badges.get(badge_id).cloned())
    }

    async fn save_badge(&self, badge: &Badge) -> Result<()> {
        self.state
            .write()
            .badges
            .insert(badge.id.clone(), badge.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RuleCondition;

    fn rule() -> CriterionRule {
        CriterionRule::all(vec![RuleCondition::Completed])
    }

    #[tokio::test]
    async fn test_criteria_for_course_empty() {
        let store = InMemoryCriterionStore::new();
        assert!(store.criteria_for_course(42).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_satisfied_is_unique() {
        let store = InMemoryCriterionStore::new();
        let criterion = store
            .create_criterion(NewCriterion::new(42, "B1", rule()))
            .await
            .unwrap();

        assert!(!store.is_satisfied(criterion.id, 7).await.unwrap());
        store
            .mark_satisfied(criterion.id, 7, Utc::now())
            .await
            .unwrap();
        assert!(store.is_satisfied(criterion.id, 7).await.unwrap());

        let err = store
            .mark_satisfied(criterion.id, 7, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, IssuanceError::AlreadySatisfied { .. }));
        assert_eq!(store.satisfaction_count(), 1);
    }

    #[tokio::test]
    async fn test_mark_satisfied_unknown_criterion() {
        let store = InMemoryCriterionStore::new();
        let err = store.mark_satisfied(99, 7, Utc::now()).await.unwrap_err();
        assert!(matches!(err, IssuanceError::CriterionNotFound(99)));
    }

    #[tokio::test]
    async fn test_delete_cascades_only_target_course() {
        let store = InMemoryCriterionStore::new();
        let a = store
            .create_criterion(NewCriterion::new(42, "B1", rule()))
            .await
            .unwrap();
        let b = store
            .create_criterion(NewCriterion::new(42, "B2", rule()))
            .await
            .unwrap();
        let other = store
            .create_criterion(NewCriterion::new(43, "B1", rule()))
            .await
            .unwrap();
        store.mark_satisfied(a.id, 7, Utc::now()).await.unwrap();
        store.mark_satisfied(other.id, 7, Utc::now()).await.unwrap();

        let removed = store.delete_criteria_for_course(42).await.unwrap();

        assert_eq!(removed, 2);
        assert!(store.criteria_for_course(42).await.unwrap().is_empty());
        assert!(store.get_criterion(b.id).await.unwrap().is_none());
        assert_eq!(store.criteria_for_course(43).await.unwrap(), vec![other.clone()]);
        assert!(!store.is_satisfied(a.id, 7).await.unwrap());
        assert!(store.is_satisfied(other.id, 7).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_rule() {
        let store = InMemoryCriterionStore::new();
        let criterion = store
            .create_criterion(NewCriterion::new(42, "B1", rule()))
            .await
            .unwrap();

        let new_rule = CriterionRule::all(vec![RuleCondition::MinGrade { grade: 50.0 }]);
        let updated = store
            .update_rule(criterion.id, new_rule.clone())
            .await
            .unwrap();
        assert_eq!(updated.rule, new_rule);
        assert_eq!(
            store.get_criterion(criterion.id).await.unwrap().unwrap().rule,
            new_rule
        );

        let err = store.update_rule(999, rule()).await.unwrap_err();
        assert!(matches!(err, IssuanceError::CriterionNotFound(999)));
    }

    #[tokio::test]
    async fn test_badge_catalog() {
        let store = InMemoryCriterionStore::new();
        assert!(store.get_badge("B1").await.unwrap().is_none());

        store.save_badge(&Badge::new("B1", "Rust")).await.unwrap();
        assert_eq!(store.get_badge("B1").await.unwrap().unwrap().name, "Rust");
    }
}
