use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct Couple {
    pub id: i64,
    pub name: String,
}
