//! WhatsApp 群发任务实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "broadcasts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(column_type = "Text")]
    pub message: String,
    pub status: String,
    pub total: i32,
    pub sent: i32,
    pub failed: i32,
    pub created_by: i64,
    pub min_delay_ms: i64,
    pub max_delay_ms: i64,
    pub finished_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::broadcast_recipients::Entity")]
    Recipients,
}

impl Related<super::broadcast_recipients::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Recipients.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_broadcast(self) -> crate::models::messaging::entities::Broadcast {
        use crate::models::messaging::entities::{Broadcast, BroadcastStatus};
        use crate::utils::time::{from_unix, opt_from_unix};

        Broadcast {
            id: self.id,
            message: self.message,
            status: self.status.parse().unwrap_or(BroadcastStatus::Paused),
            total: self.total,
            sent: self.sent,
            failed: self.failed,
            created_by: self.created_by,
            min_delay_ms: self.min_delay_ms,
            max_delay_ms: self.max_delay_ms,
            finished_at: opt_from_unix(self.finished_at),
            created_at: from_unix(self.created_at),
            updated_at: from_unix(self.updated_at),
        }
    }
}
