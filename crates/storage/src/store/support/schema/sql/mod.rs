#![forbid(unsafe_code)]

mod changes;
mod core;
mod documents;
mod indexes;
mod pragmas;
mod votes;

pub(super) fn full_schema_sql() -> String {
    let mut sql = String::new();
    sql.push_str(pragmas::SQL);
    sql.push_str(core::SQL);
    sql.push_str(documents::SQL);
    sql.push_str(changes::SQL);
    sql.push_str(votes::SQL);
    sql.push_str(indexes::SQL);
    sql
}
