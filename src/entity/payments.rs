//! 收款实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub student_id: i64,
    pub description: String,
    pub kind: String,
    pub amount_cents: i64,
    pub due_date: Date,
    pub status: String,
    pub provider: String,
    pub external_id: Option<String>,
    pub payment_url: Option<String>,
    pub billing_type: Option<String>,
    pub paid_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::students::Entity",
        from = "Column::StudentId",
        to = "super::students::Column::Id",
        on_delete = "Cascade"
    )]
    Student,
}

impl Related<super::students::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_payment(self) -> crate::models::payments::entities::Payment {
        use crate::models::payments::entities::{
            Payment, PaymentKind, PaymentProvider, PaymentStatus,
        };
        use crate::utils::time::{from_unix, opt_from_unix};

        Payment {
            id: self.id,
            student_id: self.student_id,
            description: self.description,
            kind: self.kind.parse().unwrap_or(PaymentKind::Other),
            amount_cents: self.amount_cents,
            due_date: self.due_date,
            status: self.status.parse().unwrap_or(PaymentStatus::Pending),
            provider: self.provider.parse().unwrap_or(PaymentProvider::Manual),
            external_id: self.external_id,
            payment_url: self.payment_url,
            billing_type: self.billing_type,
            paid_at: opt_from_unix(self.paid_at),
            created_at: from_unix(self.created_at),
            updated_at: from_unix(self.updated_at),
        }
    }
}
