//! SeaORM Entity for reviews table

use sea_orm::entity::prelude::*;

/// Book genre, stored as a short code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(Some(10))")]
pub enum Genre {
    #[sea_orm(string_value = "FICT")]
    Fiction,
    #[sea_orm(string_value = "NFICT")]
    NonFiction,
    #[sea_orm(string_value = "SCI_FI")]
    ScienceFiction,
    #[sea_orm(string_value = "MYST")]
    Mystery,
    #[sea_orm(string_value = "ROM")]
    Romance,
    #[sea_orm(string_value = "THRILL")]
    Thriller,
    #[sea_orm(string_value = "HORROR")]
    Horror,
    #[sea_orm(string_value = "FANTASY")]
    Fantasy,
    #[sea_orm(string_value = "BIOG")]
    Biography,
    #[sea_orm(string_value = "HIST")]
    Historical,
    #[sea_orm(string_value = "CHILD")]
    Children,
    #[sea_orm(string_value = "OTHER")]
    Other,
}

impl Genre {
    /// Parse a genre code, e.g. from a form field or URL segment.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::try_from_value(&code.to_uppercase()).ok()
    }

    pub fn code(&self) -> String {
        self.to_value()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "reviews")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Owning user. Immutable after creation.
    pub user_id: i32,
    pub title: String,
    pub author: String,
    pub genre: Genre,
    #[sea_orm(column_type = "Text")]
    pub body: String,
    /// Displayed rating. Starts at the owner's rating and is recomputed as
    /// the running mean over the original rating plus all comment ratings.
    pub rating: f64,
    /// The owner's originally-entered rating, a fixed entrant in the mean.
    pub original_rating: i32,
    pub created_at: DateTime,
    /// Attachment columns. All null when no file was uploaded.
    pub file_name: Option<String>,
    pub file_title: Option<String>,
    pub file_keywords: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub file_description: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(has_many = "super::comments::Entity")]
    Comments,
    #[sea_orm(has_many = "super::review_memberships::Entity")]
    Memberships,
    #[sea_orm(has_many = "super::join_requests::Entity")]
    JoinRequests,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::comments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl Related<super::review_memberships::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Memberships.def()
    }
}

impl Related<super::join_requests::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::JoinRequests.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
