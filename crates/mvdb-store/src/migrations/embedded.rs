//! SQL compiled into the binary, in application order

/// One schema step
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub id: &'static str,
    pub sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    id: "001_initial_schema",
    sql: include_str!("../../migrations/001_initial_schema.sql"),
}];

pub fn get_migrations() -> Vec<Migration> {
    MIGRATIONS.to_vec()
}
