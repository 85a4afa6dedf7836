//! 学习资料实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "materials")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub title: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub subject_id: Option<i64>,
    pub class_name: String,
    pub file_token: Option<String>,
    pub link_url: Option<String>,
    pub uploaded_by: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::files::Entity",
        from = "Column::FileToken",
        to = "super::files::Column::DownloadToken",
        on_delete = "SetNull"
    )]
    File,
}

impl Related<super::files::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::File.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_material(self) -> crate::models::materials::entities::Material {
        use crate::models::materials::entities::Material;
        use crate::utils::time::from_unix;

        Material {
            id: self.id,
            title: self.title,
            description: self.description,
            subject_id: self.subject_id,
            class_name: self.class_name,
            file_token: self.file_token,
            link_url: self.link_url,
            uploaded_by: self.uploaded_by,
            created_at: from_unix(self.created_at),
            updated_at: from_unix(self.updated_at),
        }
    }
}
