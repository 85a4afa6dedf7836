//! 群发接收人实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "broadcast_recipients")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub broadcast_id: i64,
    pub student_id: Option<i64>,
    pub name: Option<String>,
    pub phone: String,
    pub status: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub error: Option<String>,
    pub sent_at: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::broadcasts::Entity",
        from = "Column::BroadcastId",
        to = "super::broadcasts::Column::Id",
        on_delete = "Cascade"
    )]
    Broadcast,
}

impl Related<super::broadcasts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Broadcast.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_recipient(self) -> crate::models::messaging::entities::BroadcastRecipient {
        use crate::models::messaging::entities::{BroadcastRecipient, RecipientStatus};
        use crate::utils::time::opt_from_unix;

        BroadcastRecipient {
            id: self.id,
            broadcast_id: self.broadcast_id,
            student_id: self.student_id,
            name: self.name,
            phone: self.phone,
            status: self.status.parse().unwrap_or(RecipientStatus::Pending),
            error: self.error,
            sent_at: opt_from_unix(self.sent_at),
        }
    }
}
