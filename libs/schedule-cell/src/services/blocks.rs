use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{BlockApproval, ScheduleBlock, ScheduleError, SubmitBlockRequest};

/// Registry of date blocks and their approval workflow. Submission creates a
/// Pending block; an authorized approver decides it exactly once.
pub struct BlockService {
    blocks: DashMap<Uuid, ScheduleBlock>,
    by_professional: DashMap<Uuid, Vec<Uuid>>,
}

impl BlockService {
    pub fn new() -> Self {
        Self {
            blocks: DashMap::new(),
            by_professional: DashMap::new(),
        }
    }

    pub fn submit(&self, request: SubmitBlockRequest) -> Result<ScheduleBlock, ScheduleError> {
        if request.reason.trim().is_empty() {
            return Err(ScheduleError::Validation(
                "Block reason cannot be empty".to_string(),
            ));
        }
        if request.kind.last_date() < request.kind.first_date() {
            return Err(ScheduleError::Validation(
                "Block end date precedes its start date".to_string(),
            ));
        }
        let today = Utc::now().date_naive();
        if request.kind.first_date() < today {
            return Err(ScheduleError::Validation(
                "Blocks cannot cover past dates".to_string(),
            ));
        }

        let block = ScheduleBlock {
            id: Uuid::new_v4(),
            professional_id: request.professional_id,
            kind: request.kind,
            reason: request.reason,
            approval: BlockApproval::Pending,
            active: true,
            submitted_at: Utc::now(),
        };

        self.by_professional
            .entry(block.professional_id)
            .or_default()
            .push(block.id);
        self.blocks.insert(block.id, block.clone());

        info!(
            "Block {} submitted for professional {} ({:?})",
            block.id, block.professional_id, block.kind
        );
        Ok(block)
    }

    /// Decide a Pending block. The transition happens at most once; deciding
    /// anything else is a caller bug surfaced as InvalidState.
    pub fn decide(
        &self,
        block_id: Uuid,
        approver_id: Uuid,
        approve: bool,
        rejection_reason: Option<String>,
    ) -> Result<ScheduleBlock, ScheduleError> {
        let mut block = self
            .blocks
            .get_mut(&block_id)
            .ok_or_else(|| ScheduleError::NotFound(format!("Block {} not found", block_id)))?;

        if !block.active {
            return Err(ScheduleError::InvalidState(
                "Block has been deactivated".to_string(),
            ));
        }
        if !block.approval.is_pending() {
            return Err(ScheduleError::InvalidState(
                "Block has already been decided".to_string(),
            ));
        }

        block.approval = if approve {
            BlockApproval::Approved {
                approver_id,
                decided_at: Utc::now(),
            }
        } else {
            let rejection_reason = rejection_reason
                .filter(|r| !r.trim().is_empty())
                .ok_or_else(|| {
                    ScheduleError::Validation("Rejection requires a reason".to_string())
                })?;
            BlockApproval::Rejected {
                approver_id,
                decided_at: Utc::now(),
                rejection_reason,
            }
        };

        info!(
            "Block {} decided by {}: {}",
            block_id,
            approver_id,
            if approve { "approved" } else { "rejected" }
        );
        Ok(block.clone())
    }

    /// Soft deactivation. The block stops affecting availability but its
    /// audit trail is retained.
    pub fn deactivate(&self, block_id: Uuid) -> Result<ScheduleBlock, ScheduleError> {
        let mut block = self
            .blocks
            .get_mut(&block_id)
            .ok_or_else(|| ScheduleError::NotFound(format!("Block {} not found", block_id)))?;

        block.active = false;
        debug!("Block {} deactivated", block_id);
        Ok(block.clone())
    }

    pub fn get(&self, block_id: Uuid) -> Option<ScheduleBlock> {
        self.blocks.get(&block_id).map(|b| b.clone())
    }

    pub fn list_for_professional(&self, professional_id: Uuid) -> Vec<ScheduleBlock> {
        let ids = self
            .by_professional
            .get(&professional_id)
            .map(|e| e.clone())
            .unwrap_or_default();

        let mut blocks: Vec<ScheduleBlock> = ids
            .iter()
            .filter_map(|id| self.blocks.get(id).map(|b| b.clone()))
            .collect();
        blocks.sort_by_key(|b| b.submitted_at);
        blocks
    }

    /// The blocks the slot generator must honor for this professional.
    pub fn approved_blocks(&self, professional_id: Uuid) -> Vec<ScheduleBlock> {
        self.list_for_professional(professional_id)
            .into_iter()
            .filter(|b| b.active && b.approval.is_approved())
            .collect()
    }
}

impl Default for BlockService {
    fn default() -> Self {
        Self::new()
    }
}
