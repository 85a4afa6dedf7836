//! 公告实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "announcements")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub audience: String,
    pub class_name: Option<String>,
    pub pinned: bool,
    pub author_id: i64,
    pub published_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::AuthorId",
        to = "super::users::Column::Id",
        on_delete = "Cascade"
    )]
    Author,
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_announcement(self) -> crate::models::announcements::entities::Announcement {
        use crate::models::announcements::entities::{Announcement, Audience};
        use crate::utils::time::from_unix;

        Announcement {
            id: self.id,
            title: self.title,
            content: self.content,
            audience: self.audience.parse().unwrap_or(Audience::All),
            class_name: self.class_name,
            pinned: self.pinned,
            author_id: self.author_id,
            published_at: from_unix(self.published_at),
            updated_at: from_unix(self.updated_at),
        }
    }
}
