//! 内存存储后端
//!
//! 语义与 SQLite 后端一致，用于测试和无需持久化的部署。进程退出后数据丢失。

use crate::error::LnAuthResult;
use crate::store::backend::ChallengeStore;
use crate::types::{Challenge, ChallengeId, ChallengeStatus, Response, ResponseStatus};
use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Tables {
    next_challenge_id: ChallengeId,
    next_response_id: i64,
    challenges: Vec<Challenge>,
    responses: Vec<Response>,
}

/// 内存存储后端
#[derive(Debug, Default)]
pub struct MemoryChallengeStore {
    tables: RwLock<Tables>,
}

impl MemoryChallengeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChallengeStore for MemoryChallengeStore {
    async fn init(&self) -> LnAuthResult<()> {
        Ok(())
    }

    async fn create(&self, nonce: &str, now: i64) -> LnAuthResult<ChallengeId> {
        let mut tables = self.tables.write().await;
        tables.next_challenge_id += 1;
        let id = tables.next_challenge_id;
        tables.challenges.push(Challenge {
            id,
            nonce: nonce.to_string(),
            created: now,
            updated: None,
            status: ChallengeStatus::New,
        });
        Ok(id)
    }

    async fn find_by_nonce(&self, nonce: &str) -> LnAuthResult<Vec<Challenge>> {
        let tables = self.tables.read().await;
        Ok(tables
            .challenges
            .iter()
            .filter(|c| c.nonce == nonce)
            .cloned()
            .collect())
    }

    async fn mark_used(&self, id: ChallengeId, now: i64) -> LnAuthResult<bool> {
        let mut tables = self.tables.write().await;
        match tables
            .challenges
            .iter_mut()
            .find(|c| c.id == id && c.status == ChallengeStatus::New)
        {
            Some(challenge) => {
                challenge.status = ChallengeStatus::Used;
                challenge.updated = Some(now);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn record_response(
        &self,
        challenge_id: ChallengeId,
        signature: &str,
        key: &str,
        status: ResponseStatus,
        now: i64,
    ) -> LnAuthResult<i64> {
        let mut tables = self.tables.write().await;
        tables.next_response_id += 1;
        let id = tables.next_response_id;
        tables.responses.push(Response {
            id,
            challenge_id,
            created: now,
            signature: signature.to_string(),
            key: key.to_string(),
            status,
        });
        Ok(id)
    }

    async fn responses_for(&self, challenge_id: ChallengeId) -> LnAuthResult<Vec<Response>> {
        let tables = self.tables.read().await;
        Ok(tables
            .responses
            .iter()
            .filter(|r| r.challenge_id == challenge_id)
            .cloned()
            .collect())
    }

    async fn delete_expired_new(&self, cutoff: i64) -> LnAuthResult<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.challenges.len();
        tables
            .challenges
            .retain(|c| !(c.status == ChallengeStatus::New && c.created <= cutoff));
        Ok((before - tables.challenges.len()) as u64)
    }

    async fn delete_responses_for_keys(&self, keys: &[String]) -> LnAuthResult<u64> {
        let keys: HashSet<&str> = keys.iter().map(String::as_str).collect();
        let mut tables = self.tables.write().await;
        let before = tables.responses.len();
        tables.responses.retain(|r| !keys.contains(r.key.as_str()));
        Ok((before - tables.responses.len()) as u64)
    }

    async fn count(&self) -> LnAuthResult<u64> {
        Ok(self.tables.read().await.challenges.len() as u64)
    }
}
