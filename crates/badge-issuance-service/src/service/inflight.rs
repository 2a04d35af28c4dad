//! 进程内发放占用表
//!
//! 同一进程内并发处理同一 (条件, 用户) 时，只有先占用者继续调用外部服务。
//! 跨进程的最终唯一性仍由存储层的 `mark_satisfied` 保证。

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

type ClaimKey = (i64, i64);

/// 发放占用表
#[derive(Clone, Default)]
pub struct InflightClaims {
    claims: Arc<DashMap<ClaimKey, ()>>,
}

impl InflightClaims {
    pub fn new() -> Self {
        Self::default()
    }

    /// 尝试占用，已被占用时返回 None
    pub fn try_claim(&self, criterion_id: i64, user_id: i64) -> Option<ClaimGuard> {
        let key = (criterion_id, user_id);
        match self.claims.entry(key) {
            Entry::Occupied(_) => {
                debug!(criterion_id, user_id, "发放已在处理中");
                None
            }
            Entry::Vacant(entry) => {
                entry.insert(());
                Some(ClaimGuard {
                    key,
                    claims: self.claims.clone(),
                })
            }
        }
    }

    pub fn is_claimed(&self, criterion_id: i64, user_id: i64) -> bool {
        self.claims.contains_key(&(criterion_id, user_id))
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}

/// 占用守卫，Drop 时释放
pub struct ClaimGuard {
    key: ClaimKey,
    claims: Arc<DashMap<ClaimKey, ()>>,
}

impl Drop for ClaimGuard {
    fn drop(&mut self) {
        self.claims.remove(&self.key);
    }
}
